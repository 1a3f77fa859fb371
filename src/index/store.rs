//! On-disk layout of a partition index directory.
//!
//! One file per partition, named `municipios_hash_<UF>.dat`.

use crate::error::{IndexError, Result};
use crate::index::reader::read_partition_file;
use crate::index::types::{is_partition_code, MunicipalRecord};
use globset::{Glob, GlobMatcher};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const FILE_PREFIX: &str = "municipios_hash_";
pub const FILE_EXTENSION: &str = "dat";

/// File name for a partition code
pub fn partition_file_name(code: &str) -> String {
    format!("{}{}.{}", FILE_PREFIX, code.to_uppercase(), FILE_EXTENSION)
}

/// Extract the partition code from a file name, if it follows the convention
pub fn partition_code_from_file_name(name: &str) -> Option<String> {
    let code = name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXTENSION)?
        .strip_suffix('.')?;
    is_partition_code(code).then(|| code.to_uppercase())
}

/// Where the query side gets partition contents from
pub trait PartitionSource: Send + Sync {
    /// Codes of every partition currently available, sorted
    fn list(&self) -> Result<Vec<String>>;

    /// Load one partition. `Ok(None)` means no data exists for the code.
    fn load(&self, code: &str) -> Result<Option<Vec<MunicipalRecord>>>;
}

/// Partition files in a single directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
    matcher: GlobMatcher,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let pattern = format!("{}*.{}", FILE_PREFIX, FILE_EXTENSION);
        let matcher = Glob::new(&pattern)
            .expect("static glob pattern is valid")
            .compile_matcher();
        Self {
            dir: dir.into(),
            matcher,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for a partition code
    pub fn partition_path(&self, code: &str) -> PathBuf {
        self.dir.join(partition_file_name(code))
    }

    /// Every partition file present, sorted by code
    pub fn partition_files(&self) -> Result<Vec<(String, PathBuf)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(IndexError::io(&self.dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| IndexError::io(&self.dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !self.matcher.is_match(name) {
                continue;
            }
            if let Some(code) = partition_code_from_file_name(name) {
                files.push((code, entry.path()));
            }
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

impl PartitionSource for DirectoryStore {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self
            .partition_files()?
            .into_iter()
            .map(|(code, _)| code)
            .collect())
    }

    fn load(&self, code: &str) -> Result<Option<Vec<MunicipalRecord>>> {
        let path = self.partition_path(code);
        match read_partition_file(&path, code) {
            Ok((header, records)) => {
                tracing::debug!(
                    partition = %header.partition_code,
                    version = header.version,
                    records = records.len(),
                    generated_at = header.generated_at,
                    "loaded partition file"
                );
                Ok(Some(records))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
