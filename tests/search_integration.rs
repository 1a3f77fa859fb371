//! End-to-end tests: CSV dataset -> partition files on disk -> queries.

use munidx::index::fingerprint::FingerprintParams;
use munidx::index::{build_all, BuildOptions, DirectoryStore, MunicipalRecord};
use munidx::ingest::parse_csv;
use munidx::query::{PartitionCache, QueryEngine, Strategy};
use munidx::IndexError;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// Code shared by many rows across partitions
const SHARED_CODE: &str = "9990001";

/// Dataset with a header row, three regular UFs, one excluded UF and enough
/// "Campo..." names and shared codes to exceed the display limit
fn dataset() -> String {
    let mut csv = String::from("TOM;IBGE;NOME_TOM;NOME_IBGE;UF\n");
    csv.push_str("7107;3550308;SAO PAULO;São Paulo;SP\n");
    csv.push_str("6291;3509502;CAMPINAS;Campinas;SP\n");
    csv.push_str("6001;3304557;RIO DE JANEIRO;Rio de Janeiro;rj\n");
    csv.push_str("4123;3110004;CAMPANHA;Campanha;MG\n");
    csv.push_str("9701;;BUENOS AIRES;;EX\n");

    for i in 0..24 {
        let uf = ["SP", "MG", "RJ"][i % 3];
        csv.push_str(&format!(
            "{};{};CAMPO {:02};Campo {:02};{}\n",
            8000 + i,
            SHARED_CODE,
            i,
            i,
            uf
        ));
    }
    csv
}

fn build_fixture() -> TempDir {
    let dir = tempdir().unwrap();
    let records = parse_csv(dataset().as_bytes()).unwrap();

    let mut options = BuildOptions::new(dir.path());
    options.params = FingerprintParams {
        iterations: 1,
        output_len: 32,
    };
    options.worker_threads = 2;
    options.generated_at = Some(1_700_000_000_000);
    options.silent = true;
    build_all(records, &options).unwrap();

    dir
}

fn engine(dir: &Path) -> QueryEngine<DirectoryStore> {
    QueryEngine::new(Arc::new(PartitionCache::new(DirectoryStore::new(dir))))
}

#[test]
fn test_build_writes_one_file_per_partition() {
    let dir = build_fixture();

    let mut names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();

    assert_eq!(
        names,
        vec![
            "municipios_hash_MG.dat",
            "municipios_hash_RJ.dat",
            "municipios_hash_SP.dat"
        ]
    );
}

#[test]
fn test_partition_query_is_case_insensitive() {
    let dir = build_fixture();
    let engine = engine(dir.path());

    let lower = engine.search("sp").unwrap();
    let upper = engine.search("SP").unwrap();

    assert_eq!(lower.strategy, Strategy::Partition);
    assert_eq!(lower.records, upper.records);
    assert_eq!(lower.total, 10);
    assert!(lower.records.iter().all(|r| r.partition_code == "SP"));
    assert!(lower.records.iter().all(|r| r.fingerprint.as_ref().is_some_and(|f| f.len() == 64)));

    // Stored in name order
    let names: Vec<_> = lower.records.iter().map(|r| r.name_tom.to_lowercase()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_partition_query_loads_once() {
    let dir = build_fixture();
    let engine = engine(dir.path());

    engine.search("SP").unwrap();
    engine.search("sp").unwrap();

    let status = engine.cache().status();
    assert_eq!(status.loads, 1);
    assert_eq!(status.hits, 1);
}

#[test]
fn test_code_query_is_uncapped_across_partitions() {
    let dir = build_fixture();
    let outcome = engine(dir.path()).search(SHARED_CODE).unwrap();

    assert_eq!(outcome.strategy, Strategy::Code);
    assert_eq!(outcome.records.len(), 24);
    assert_eq!(outcome.omitted, 0);

    let ufs: std::collections::BTreeSet<_> =
        outcome.records.iter().map(|r| r.partition_code.as_str()).collect();
    assert_eq!(ufs.len(), 3);
}

#[test]
fn test_code_query_matches_tom_code() {
    let dir = build_fixture();
    let outcome = engine(dir.path()).search("7107").unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].ibge_code, "3550308");
}

#[test]
fn test_name_query_sorted_and_truncated() {
    let dir = build_fixture();
    let outcome = engine(dir.path()).search("cam").unwrap();

    assert_eq!(outcome.strategy, Strategy::Name);
    // 24 "Campo" rows plus Campinas and Campanha
    assert_eq!(outcome.total, 26);
    assert_eq!(outcome.records.len(), 20);
    assert_eq!(outcome.omitted, 6);

    let keys: Vec<_> = outcome
        .records
        .iter()
        .map(|r| (r.partition_code.clone(), r.name_tom.to_lowercase()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(outcome.records[0].name_tom, "CAMPANHA");
}

#[test]
fn test_excluded_partition_is_not_searchable() {
    let dir = build_fixture();
    let engine = engine(dir.path());

    assert!(engine.search("EX").unwrap().is_empty());
    assert!(engine.search("buenos").unwrap().is_empty());
}

#[test]
fn test_missing_partition_is_empty() {
    let dir = build_fixture();
    let outcome = engine(dir.path()).search("AM").unwrap();

    assert!(outcome.is_empty());
    assert!(outcome.failures.is_empty());
}

#[test]
fn test_corrupt_partition_is_skipped_in_scans() {
    let dir = build_fixture();
    fs::write(dir.path().join("municipios_hash_RJ.dat"), b"NOTMUNHASH").unwrap();

    let engine = engine(dir.path());
    let outcome = engine.search(SHARED_CODE).unwrap();

    // RJ rows are lost, the rest survive
    assert_eq!(outcome.records.len(), 16);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].partition, "RJ");

    let direct = engine.search("rj").unwrap();
    assert!(direct.is_empty());
    assert_eq!(direct.failures.len(), 1);
}

#[test]
fn test_truncated_partition_reports_truncation() {
    let dir = build_fixture();
    let path = dir.path().join("municipios_hash_MG.dat");
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();

    let outcome = engine(dir.path()).search("mg").unwrap();
    assert!(matches!(
        outcome.failures[0].error,
        IndexError::Truncated { context: "record" }
    ));
}

#[test]
fn test_rebuild_is_byte_identical() {
    let first = build_fixture();
    let second = build_fixture();

    for code in ["SP", "MG", "RJ"] {
        let name = format!("municipios_hash_{}.dat", code);
        assert_eq!(
            fs::read(first.path().join(&name)).unwrap(),
            fs::read(second.path().join(&name)).unwrap()
        );
    }
}

#[test]
fn test_row_without_uf_does_not_block_other_partitions() {
    let dir = tempdir().unwrap();
    let csv = "6291;3509502;CAMPINAS;Campinas;SP\n1234;9999999;NOWHERE;Nowhere;\n";
    let records = parse_csv(csv.as_bytes()).unwrap();

    let mut options = BuildOptions::new(dir.path());
    options.params = FingerprintParams {
        iterations: 1,
        output_len: 32,
    };
    options.silent = true;
    let summary = build_all(records, &options).unwrap();

    assert_eq!(summary.partitions.len(), 1);
    assert!(dir.path().join("municipios_hash_SP.dat").exists());
    assert!(engine(dir.path()).search("9999999").unwrap().is_empty());
}

#[test]
fn test_loaded_records_keep_all_fields() {
    let dir = build_fixture();
    let outcome = engine(dir.path()).search("3304557").unwrap();

    let rio = &outcome.records[0];
    let expected = MunicipalRecord::new("6001", "3304557", "RIO DE JANEIRO", "Rio de Janeiro", "RJ");
    assert_eq!(rio.tom_code, expected.tom_code);
    assert_eq!(rio.name_tom, expected.name_tom);
    assert_eq!(rio.name_ibge, expected.name_ibge);
    assert_eq!(rio.partition_code, expected.partition_code);
}

#[test]
fn test_cli_build_and_search() {
    let work = tempdir().unwrap();
    let csv = work.path().join("municipios.csv");
    fs::write(&csv, dataset()).unwrap();
    let out = work.path().join("idx");
    let config = work.path().join("absent.json");

    let build = Command::new(env!("CARGO_BIN_EXE_munidx"))
        .arg("--config")
        .arg(&config)
        .args(["build", "--quiet", "--iterations", "1", "--out"])
        .arg(&out)
        .arg(&csv)
        .output()
        .expect("Failed to run munidx build");
    assert!(build.status.success(), "{}", String::from_utf8_lossy(&build.stderr));
    assert!(out.join("municipios_hash_SP.dat").exists());

    let search = Command::new(env!("CARGO_BIN_EXE_munidx"))
        .arg("--config")
        .arg(&config)
        .args(["search", "--dir"])
        .arg(&out)
        .args(["cam"])
        .output()
        .expect("Failed to run munidx search");
    assert!(search.status.success());

    let stdout = String::from_utf8_lossy(&search.stdout);
    assert!(stdout.contains("CAMPANHA"));
    assert!(stdout.contains("6 more result(s) not shown (26 total)"));
}
