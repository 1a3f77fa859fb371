/// File signature written at the start of every partition index
pub const SIGNATURE: &str = "MUNHASH";

/// Current version of the partition index format
pub const FORMAT_VERSION: i32 = 1;

/// Unix epoch milliseconds
pub type Timestamp = i64;

/// One municipality
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MunicipalRecord {
    pub tom_code: String,
    pub ibge_code: String,
    pub name_tom: String,
    pub name_ibge: String,
    /// Two-letter region code, uppercase
    pub partition_code: String,
    /// Lowercase hex; only present on built or loaded records
    pub fingerprint: Option<String>,
}

impl MunicipalRecord {
    pub fn new(
        tom_code: impl Into<String>,
        ibge_code: impl Into<String>,
        name_tom: impl Into<String>,
        name_ibge: impl Into<String>,
        partition_code: impl Into<String>,
    ) -> Self {
        Self {
            tom_code: tom_code.into(),
            ibge_code: ibge_code.into(),
            name_tom: name_tom.into(),
            name_ibge: name_ibge.into(),
            partition_code: partition_code.into().to_uppercase(),
            fingerprint: None,
        }
    }

    /// Preferred name: the TOM spelling, or the IBGE one when TOM is empty
    pub fn display_name(&self) -> &str {
        if self.name_tom.is_empty() {
            &self.name_ibge
        } else {
            &self.name_tom
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: String) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }
}

/// Header of a partition index file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    pub signature: String,
    pub version: i32,
    pub partition_code: String,
    pub generated_at: Timestamp,
    pub record_count: i32,
}

impl IndexHeader {
    pub fn new(partition_code: impl Into<String>, generated_at: Timestamp, record_count: usize) -> Self {
        Self {
            signature: SIGNATURE.to_string(),
            version: FORMAT_VERSION,
            partition_code: partition_code.into(),
            generated_at,
            record_count: record_count as i32,
        }
    }
}

/// Returns true if `code` is a valid partition code (two ASCII letters)
pub fn is_partition_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Current time as a header timestamp
pub fn now_millis() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or(0)
}
