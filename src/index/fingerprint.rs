//! Per-record fingerprints.
//!
//! A fingerprint is PBKDF2-HMAC-SHA256 over the record's fields, salted with
//! the IBGE code and a fixed pepper. The derivation is deliberately slow; it
//! is the only CPU-heavy step of an index build.

use crate::error::{IndexError, Result};
use crate::index::types::MunicipalRecord;
use sha2::Sha256;

/// Mixed into every salt. Changing it changes every fingerprint.
pub const PEPPER: &str = "PBKDF2_DEMOSYNC_V1";

pub const DEFAULT_ITERATIONS: u32 = 50_000;
pub const DEFAULT_OUTPUT_LEN: usize = 32;

/// Cost parameters for fingerprint derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintParams {
    pub iterations: u32,
    /// Derived key length in bytes
    pub output_len: usize,
}

impl Default for FingerprintParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            output_len: DEFAULT_OUTPUT_LEN,
        }
    }
}

/// Build the password string for a record.
///
/// Fields are written in the order tom, ibge, name_tom, name_ibge,
/// partition_code, each as `<byte-length>:<value>;`. The format is frozen.
pub fn password(record: &MunicipalRecord) -> String {
    let fields = [
        &record.tom_code,
        &record.ibge_code,
        &record.name_tom,
        &record.name_ibge,
        &record.partition_code,
    ];

    let mut out = String::with_capacity(fields.iter().map(|f| f.len() + 4).sum());
    for field in fields {
        out.push_str(&field.len().to_string());
        out.push(':');
        out.push_str(field);
        out.push(';');
    }
    out
}

/// Salt for a record: `<ibge>|<pepper>`
pub fn salt(ibge_code: &str) -> Vec<u8> {
    format!("{}|{}", ibge_code, PEPPER).into_bytes()
}

/// Derive the lowercase hex fingerprint of a record
pub fn derive(record: &MunicipalRecord, params: &FingerprintParams) -> Result<String> {
    if params.iterations == 0 {
        return Err(IndexError::Derivation {
            reason: "iteration count must be positive".to_string(),
        });
    }
    if params.output_len == 0 {
        return Err(IndexError::Derivation {
            reason: "output length must be positive".to_string(),
        });
    }

    let mut key = vec![0u8; params.output_len];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        password(record).as_bytes(),
        &salt(&record.ibge_code),
        params.iterations,
        &mut key,
    );

    Ok(hex::encode(key))
}
