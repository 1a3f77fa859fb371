//! Reading the municipality dataset.
//!
//! The dataset is a `;`-separated file with columns TOM, IBGE, name (TOM),
//! name (IBGE), UF. An optional header row is detected and skipped.

use crate::error::{IndexError, Result};
use crate::index::types::{is_partition_code, MunicipalRecord};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const FIELD_SEPARATOR: char = ';';
const MIN_FIELDS: usize = 5;

/// Remove quotes and surrounding whitespace
pub fn sanitize(field: &str) -> String {
    field.replace('"', "").trim().to_string()
}

fn is_header(line: &str) -> bool {
    let upper = line.to_uppercase();
    upper.contains("IBGE") || upper.contains("UF")
}

/// Parse records from a reader.
///
/// Blank lines are ignored. Rows with too few fields, without a two-letter
/// UF, or with neither name, are skipped with a warning. Invalid UTF-8 is an error.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<MunicipalRecord>> {
    let reader = BufReader::new(reader);
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| IndexError::Ingest {
            line: line_no,
            reason: e.to_string(),
        })?;
        let line = line.trim().trim_start_matches('\u{feff}');

        if line.is_empty() {
            continue;
        }
        if idx == 0 && is_header(line) {
            continue;
        }

        let parts: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if parts.len() < MIN_FIELDS {
            tracing::warn!(line = line_no, fields = parts.len(), "skipping short row");
            continue;
        }

        let record = MunicipalRecord::new(
            sanitize(parts[0]),
            sanitize(parts[1]),
            sanitize(parts[2]),
            sanitize(parts[3]),
            sanitize(parts[4]),
        );

        if !is_partition_code(&record.partition_code) {
            tracing::warn!(line = line_no, uf = %record.partition_code, "skipping row with invalid UF");
            continue;
        }
        if record.name_tom.is_empty() && record.name_ibge.is_empty() {
            tracing::warn!(line = line_no, "skipping row without a name");
            continue;
        }

        records.push(record);
    }

    Ok(records)
}

/// Load records from a CSV file
pub fn load_csv(path: &Path) -> Result<Vec<MunicipalRecord>> {
    let file = File::open(path).map_err(|e| IndexError::io(path, e))?;
    let records = parse_csv(file)?;
    tracing::info!(path = %path.display(), records = records.len(), "dataset loaded");
    Ok(records)
}

/// Group records by partition code, sorted by code, keeping input order
pub fn group_by_partition(records: Vec<MunicipalRecord>) -> BTreeMap<String, Vec<MunicipalRecord>> {
    let mut groups: BTreeMap<String, Vec<MunicipalRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.partition_code.clone())
            .or_default()
            .push(record);
    }
    groups
}
