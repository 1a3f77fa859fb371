use crate::error::{IndexError, Result};
use crate::index::types::*;
use crate::utils::{write_i32_le, write_i64_le, write_string};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Encode a partition into the binary index layout.
///
/// The record count written is the length of `records`; the header's own
/// count is ignored so the two can never disagree.
pub fn encode(header: &IndexHeader, records: &[MunicipalRecord]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64 + records.len() * 128);
    // Writing into a Vec cannot fail
    let _ = encode_into(&mut buf, header, records);
    buf
}

/// Encode a partition into any writer
pub fn encode_into<W: Write>(
    writer: &mut W,
    header: &IndexHeader,
    records: &[MunicipalRecord],
) -> io::Result<()> {
    // Header
    write_string(writer, &header.signature)?;
    write_i32_le(writer, header.version)?;
    write_string(writer, &header.partition_code)?;
    write_i64_le(writer, header.generated_at)?;
    write_i32_le(writer, records.len() as i32)?;

    // Records
    for record in records {
        write_string(writer, &record.tom_code)?;
        write_string(writer, &record.ibge_code)?;
        write_string(writer, &record.name_tom)?;
        write_string(writer, &record.name_ibge)?;
        write_string(writer, &record.partition_code)?;
        write_string(writer, record.fingerprint.as_deref().unwrap_or(""))?;
    }

    Ok(())
}

/// Write a partition file, replacing any previous one.
///
/// Bytes go to a sibling temp file that is renamed into place, so a failed
/// write never leaves a partial file at `path`. Returns the file size.
pub fn write_partition_file(
    path: &Path,
    header: &IndexHeader,
    records: &[MunicipalRecord],
) -> Result<u64> {
    let tmp_path = temp_path(path);

    let written = write_temp(&tmp_path, header, records);
    let size = match written {
        Ok(size) => size,
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(IndexError::io(&tmp_path, e));
        }
    };

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(IndexError::io(path, e));
    }

    Ok(size)
}

fn write_temp(tmp_path: &Path, header: &IndexHeader, records: &[MunicipalRecord]) -> io::Result<u64> {
    let mut file = BufWriter::new(File::create(tmp_path)?);
    encode_into(&mut file, header, records)?;
    file.flush()?;

    let file = file.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
