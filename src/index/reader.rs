use crate::error::{IndexError, Result};
use crate::index::types::*;
use crate::utils::{read_i32_le, read_i64_le, read_string};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Decode a whole partition index from bytes
pub fn decode(bytes: &[u8]) -> Result<(IndexHeader, Vec<MunicipalRecord>)> {
    let mut reader = bytes;
    decode_from(&mut reader)
}

/// Decode a whole partition index from a reader.
///
/// Reads exactly `record_count` records; trailing bytes are not inspected.
pub fn decode_from<R: Read>(reader: &mut R) -> Result<(IndexHeader, Vec<MunicipalRecord>)> {
    let header = read_header_from(reader)?;

    let count = header.record_count as usize;
    // Don't trust the count for preallocation beyond a sane bound
    let mut records = Vec::with_capacity(count.min(16 * 1024));

    for _ in 0..count {
        let tom_code = field(read_string(reader), "record")?;
        let ibge_code = field(read_string(reader), "record")?;
        let name_tom = field(read_string(reader), "record")?;
        let name_ibge = field(read_string(reader), "record")?;
        let partition_code = field(read_string(reader), "record")?;
        let fingerprint = field(read_string(reader), "record")?;

        records.push(MunicipalRecord {
            tom_code,
            ibge_code,
            name_tom,
            name_ibge,
            partition_code,
            fingerprint: (!fingerprint.is_empty()).then_some(fingerprint),
        });
    }

    Ok((header, records))
}

/// Read and validate only the header.
///
/// The version is exposed but not branched on; version 1 is the only layout.
pub fn read_header_from<R: Read>(reader: &mut R) -> Result<IndexHeader> {
    let signature = field(read_string(reader), "signature")?;
    if signature != SIGNATURE {
        return Err(IndexError::format(format!(
            "bad signature {:?}, expected {:?}",
            signature, SIGNATURE
        )));
    }

    let version = field(read_i32_le(reader), "header")?;
    let partition_code = field(read_string(reader), "header")?;
    let generated_at = field(read_i64_le(reader), "header")?;
    let record_count = field(read_i32_le(reader), "header")?;

    if record_count < 0 {
        return Err(IndexError::format(format!(
            "negative record count {}",
            record_count
        )));
    }

    Ok(IndexHeader {
        signature,
        version,
        partition_code,
        generated_at,
        record_count,
    })
}

/// Read a partition index file from disk
pub fn read_partition_file(path: &Path, code: &str) -> Result<(IndexHeader, Vec<MunicipalRecord>)> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(IndexError::NotFound {
                code: code.to_string(),
            });
        }
        Err(e) => return Err(IndexError::io(path, e)),
    };

    decode(&bytes)
}

/// Read only the header of a partition index file
pub fn read_header(path: &Path) -> Result<IndexHeader> {
    let file = File::open(path).map_err(|e| IndexError::io(path, e))?;
    let mut reader = BufReader::new(file);
    read_header_from(&mut reader)
}

/// Map a primitive read failure onto the index error taxonomy
fn field<T>(result: io::Result<T>, context: &'static str) -> Result<T> {
    result.map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => IndexError::Truncated { context },
        _ => IndexError::format(format!("{}: {}", context, e)),
    })
}
