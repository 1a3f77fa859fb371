use crate::error::{IndexError, Result};
use crate::index::fingerprint::{derive, FingerprintParams};
use crate::index::store::partition_file_name;
use crate::index::types::{is_partition_code, now_millis, IndexHeader, MunicipalRecord, Timestamp};
use crate::index::writer::write_partition_file;
use crate::ingest::group_by_partition;
use crate::utils::progress::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Result of building one partition file
#[derive(Debug, Clone)]
pub struct BuiltPartition {
    pub code: String,
    pub path: PathBuf,
    pub records: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Builds partition index files, deriving fingerprints on a bounded pool
pub struct PartitionBuilder {
    params: FingerprintParams,
    pool: rayon::ThreadPool,
}

impl PartitionBuilder {
    /// Create a builder with `worker_threads` derivation workers (0 = CPU count)
    pub fn new(params: FingerprintParams, worker_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("munidx-derive-{}", i))
            .build()
            .map_err(|e| IndexError::Derivation {
                reason: format!("failed to start worker pool: {}", e),
            })?;

        Ok(Self { params, pool })
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Build a partition file stamped with the current time
    pub fn build(&self, code: &str, records: &[MunicipalRecord], path: &Path) -> Result<BuiltPartition> {
        self.build_at(code, records, path, now_millis())
    }

    /// Build a partition file with a fixed generation timestamp.
    ///
    /// The same input and timestamp always produce the same bytes. Nothing is
    /// written unless every fingerprint was derived.
    pub fn build_at(
        &self,
        code: &str,
        records: &[MunicipalRecord],
        path: &Path,
        generated_at: Timestamp,
    ) -> Result<BuiltPartition> {
        self.build_with_progress(code, records, path, generated_at, None)
    }

    /// Like [`build_at`](Self::build_at), ticking `progress` once per record
    pub fn build_with_progress(
        &self,
        code: &str,
        records: &[MunicipalRecord],
        path: &Path,
        generated_at: Timestamp,
        progress: Option<&ProgressBar>,
    ) -> Result<BuiltPartition> {
        let start = Instant::now();
        let code = code.to_uppercase();

        let fingerprinted = self.fingerprint_with_progress(&code, records, progress)?;

        let header = IndexHeader::new(code.clone(), generated_at, fingerprinted.len());
        let bytes = write_partition_file(path, &header, &fingerprinted)?;

        let elapsed = start.elapsed();
        tracing::debug!(
            partition = %code,
            records = fingerprinted.len(),
            bytes,
            elapsed_ms = elapsed.as_millis() as u64,
            "partition written"
        );

        Ok(BuiltPartition {
            code,
            path: path.to_path_buf(),
            records: fingerprinted.len(),
            bytes,
            elapsed,
        })
    }

    /// Validate, sort and fingerprint a partition without touching disk.
    ///
    /// Records come back ordered by display name (case-insensitive), ties in
    /// input order.
    pub fn fingerprint_partition(
        &self,
        code: &str,
        records: &[MunicipalRecord],
    ) -> Result<Vec<MunicipalRecord>> {
        self.fingerprint_with_progress(code, records, None)
    }

    fn fingerprint_with_progress(
        &self,
        code: &str,
        records: &[MunicipalRecord],
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<MunicipalRecord>> {
        let code = code.to_uppercase();
        if !is_partition_code(&code) {
            return Err(IndexError::InvalidPartitionCode { code });
        }
        if let Some(stray) = records.iter().find(|r| r.partition_code != code) {
            return Err(IndexError::PartitionMismatch {
                expected: code,
                found: stray.partition_code.clone(),
                ibge_code: stray.ibge_code.clone(),
            });
        }

        // Stable sort, so position encodes (name, input order)
        let mut ordered: Vec<&MunicipalRecord> = records.iter().collect();
        ordered.sort_by_cached_key(|r| r.display_name().to_lowercase());

        // Workers share nothing but the accumulator; arrival order is arbitrary
        let accumulator = Mutex::new(Vec::with_capacity(ordered.len()));

        // install() returns only once every task has finished
        self.pool.install(|| {
            ordered
                .par_iter()
                .enumerate()
                .try_for_each(|(position, record)| -> Result<()> {
                    let fingerprint = derive(record, &self.params)?;
                    let done = (*record).clone().with_fingerprint(fingerprint);

                    accumulator
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((position, done));

                    if let Some(pb) = progress {
                        pb.inc(1);
                    }
                    Ok(())
                })
        })?;

        let mut pairs = accumulator
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        pairs.sort_unstable_by_key(|(position, _)| *position);

        Ok(pairs.into_iter().map(|(_, record)| record).collect())
    }
}

/// Options for building a whole dataset
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub out_dir: PathBuf,
    pub params: FingerprintParams,
    /// 0 means use the number of CPUs
    pub worker_threads: usize,
    /// Partition codes that are never written
    pub excluded_partitions: Vec<String>,
    /// Fixed generation timestamp; `None` stamps each file with the current time
    pub generated_at: Option<Timestamp>,
    pub silent: bool,
}

impl BuildOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            params: FingerprintParams::default(),
            worker_threads: 0,
            excluded_partitions: vec!["EX".to_string()],
            generated_at: None,
            silent: false,
        }
    }

    fn is_excluded(&self, code: &str) -> bool {
        self.excluded_partitions
            .iter()
            .any(|ex| ex.eq_ignore_ascii_case(code))
    }
}

/// Outcome of a full dataset build
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub partitions: Vec<BuiltPartition>,
    /// Partition codes that were present in the input but excluded
    pub skipped: Vec<String>,
    pub elapsed: Duration,
}

impl BuildSummary {
    pub fn total_records(&self) -> usize {
        self.partitions.iter().map(|p| p.records).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.partitions.iter().map(|p| p.bytes).sum()
    }
}

/// Build one index file per partition.
///
/// Partitions are processed one after another, in code order; each one is
/// fully parallel inside. The first failing partition aborts the run, files
/// already written stay in place.
pub fn build_all(records: Vec<MunicipalRecord>, options: &BuildOptions) -> Result<BuildSummary> {
    let start = Instant::now();
    fs::create_dir_all(&options.out_dir).map_err(|e| IndexError::io(&options.out_dir, e))?;

    let groups = group_by_partition(records);
    let mut summary = BuildSummary::default();

    let builder = PartitionBuilder::new(options.params, options.worker_threads)?;
    tracing::info!(
        partitions = groups.len(),
        workers = builder.worker_count(),
        iterations = options.params.iterations,
        "building partition indexes"
    );

    for (code, group) in groups {
        if options.is_excluded(&code) {
            tracing::info!(partition = %code, records = group.len(), "partition excluded");
            summary.skipped.push(code);
            continue;
        }

        let progress_bar = if !options.silent {
            let pb = ProgressBar::new(group.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap()
                    .progress_chars("█▓▒░  "),
            );
            pb.set_message(format!("UF {}", code));
            Some(pb)
        } else {
            None
        };

        let path = options.out_dir.join(partition_file_name(&code));
        let generated_at = options.generated_at.unwrap_or_else(now_millis);

        let result =
            builder.build_with_progress(&code, &group, &path, generated_at, progress_bar.as_ref());

        let built = match result {
            Ok(built) => built,
            Err(e) => {
                if let Some(pb) = progress_bar {
                    pb.finish_and_clear();
                }
                return Err(e);
            }
        };

        if let Some(pb) = progress_bar {
            pb.finish_with_message(format!("UF {} ({} bytes)", code, built.bytes));
        }

        summary.partitions.push(built);
    }

    summary.elapsed = start.elapsed();
    tracing::info!(
        partitions = summary.partitions.len(),
        records = summary.total_records(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "build finished"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::reader::read_partition_file;
    use tempfile::tempdir;

    const FAST: FingerprintParams = FingerprintParams {
        iterations: 16,
        output_len: 32,
    };

    fn sp_records() -> Vec<MunicipalRecord> {
        vec![
            MunicipalRecord::new("7107", "3550308", "SAO PAULO", "São Paulo", "SP"),
            MunicipalRecord::new("6291", "3509502", "campinas", "Campinas", "SP"),
            MunicipalRecord::new("6999", "3548500", "", "Santos", "SP"),
            MunicipalRecord::new("6213", "3501608", "AMERICANA", "Americana", "SP"),
            MunicipalRecord::new("6215", "3501609", "americana", "Americana II", "SP"),
        ]
    }

    #[test]
    fn test_fingerprints_in_name_order() {
        let builder = PartitionBuilder::new(FAST, 4).unwrap();
        let out = builder.fingerprint_partition("SP", &sp_records()).unwrap();

        let names: Vec<_> = out.iter().map(|r| r.display_name()).collect();
        // Case-insensitive ties keep input order
        assert_eq!(names, vec!["AMERICANA", "americana", "campinas", "Santos", "SAO PAULO"]);
        assert!(out.iter().all(|r| r.fingerprint.is_some()));
    }

    #[test]
    fn test_fingerprints_match_sequential_derivation() {
        let builder = PartitionBuilder::new(FAST, 3).unwrap();
        let out = builder.fingerprint_partition("sp", &sp_records()).unwrap();

        for record in &out {
            let mut raw = record.clone();
            raw.fingerprint = None;
            assert_eq!(record.fingerprint.as_deref(), Some(derive(&raw, &FAST).unwrap().as_str()));
        }
    }

    #[test]
    fn test_mismatched_partition_is_rejected() {
        let mut records = sp_records();
        records.push(MunicipalRecord::new("6001", "3304557", "RIO DE JANEIRO", "Rio de Janeiro", "RJ"));

        let builder = PartitionBuilder::new(FAST, 2).unwrap();
        let err = builder.fingerprint_partition("SP", &records).unwrap_err();
        assert!(matches!(err, IndexError::PartitionMismatch { ref found, .. } if found == "RJ"));
    }

    #[test]
    fn test_invalid_code_is_rejected() {
        let builder = PartitionBuilder::new(FAST, 1).unwrap();
        assert!(matches!(
            builder.fingerprint_partition("S1", &[]),
            Err(IndexError::InvalidPartitionCode { .. })
        ));
    }

    #[test]
    fn test_empty_partition_writes_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(partition_file_name("AC"));
        let builder = PartitionBuilder::new(FAST, 2).unwrap();

        let built = builder.build_at("ac", &[], &path, 1).unwrap();
        assert_eq!(built.records, 0);

        let (header, records) = read_partition_file(&path, "AC").unwrap();
        assert_eq!(header.partition_code, "AC");
        assert_eq!(header.record_count, 0);
        assert!(records.is_empty());
    }

    #[test]
    fn test_builds_are_byte_identical() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.dat");
        let second = dir.path().join("second.dat");

        let records = sp_records();
        PartitionBuilder::new(FAST, 4)
            .unwrap()
            .build_at("SP", &records, &first, 1_700_000_000_000)
            .unwrap();
        PartitionBuilder::new(FAST, 1)
            .unwrap()
            .build_at("SP", &records, &second, 1_700_000_000_000)
            .unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_derivation_failure_leaves_no_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(partition_file_name("SP"));
        let broken = FingerprintParams {
            iterations: 0,
            output_len: 32,
        };

        let builder = PartitionBuilder::new(broken, 2).unwrap();
        let err = builder.build_at("SP", &sp_records(), &path, 0).unwrap_err();
        assert!(matches!(err, IndexError::Derivation { .. }));
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_build_stamps_current_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(partition_file_name("SP"));
        let before = now_millis();

        let built = PartitionBuilder::new(FAST, 2)
            .unwrap()
            .build("SP", &sp_records(), &path)
            .unwrap();
        assert_eq!(built.records, 5);
        assert_eq!(built.bytes, fs::metadata(&path).unwrap().len());

        let (header, _) = read_partition_file(&path, "SP").unwrap();
        assert!(header.generated_at >= before);
        assert!(header.generated_at <= now_millis());
    }

    #[test]
    fn test_build_all_skips_excluded_partitions() {
        let dir = tempdir().unwrap();
        let mut records = sp_records();
        records.push(MunicipalRecord::new("9701", "", "BUENOS AIRES", "", "EX"));
        records.push(MunicipalRecord::new("6001", "3304557", "RIO DE JANEIRO", "Rio de Janeiro", "RJ"));

        let mut options = BuildOptions::new(dir.path().join("out"));
        options.params = FAST;
        options.worker_threads = 2;
        options.silent = true;

        let summary = build_all(records, &options).unwrap();
        let codes: Vec<_> = summary.partitions.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["RJ", "SP"]);
        assert_eq!(summary.skipped, vec!["EX"]);
        assert_eq!(summary.total_records(), 6);
        assert!(!dir.path().join("out").join(partition_file_name("EX")).exists());
    }
}
