//! Primitive encoders for the partition index layout.
//!
//! Strings are written as a 7-bit variable-length byte count followed by the
//! UTF-8 bytes; integers are little-endian.

use std::io::{self, Read, Write};

/// Largest string the decoder will allocate for (16 MiB).
pub const MAX_STRING_LEN: u32 = 16 * 1024 * 1024;

/// Encode a u32 as a variable-length integer
pub fn encode_varint(mut value: u32, buf: &mut Vec<u8>) {
    loop {
        if value < 0x80 {
            buf.push(value as u8);
            break;
        }
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
}

/// Read a variable-length u32 from a stream
pub fn read_varint<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut result: u32 = 0;
    let mut shift = 0;
    let mut byte = [0u8; 1];

    loop {
        if shift >= 35 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "varint overflows u32",
            ));
        }

        reader.read_exact(&mut byte)?;
        result |= ((byte[0] & 0x7F) as u32) << shift;

        if byte[0] & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;
    }
}

/// Write a length-prefixed UTF-8 string
pub fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    let bytes = value.as_bytes();
    let mut prefix = Vec::with_capacity(5);
    encode_varint(bytes.len() as u32, &mut prefix);
    writer.write_all(&prefix)?;
    writer.write_all(bytes)
}

/// Read a length-prefixed UTF-8 string
pub fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let len = read_varint(reader)?;
    if len > MAX_STRING_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("string length {} exceeds limit", len),
        ));
    }

    let mut bytes = vec![0u8; len as usize];
    reader.read_exact(&mut bytes)?;

    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write an i32 in little-endian format
pub fn write_i32_le<W: Write>(writer: &mut W, value: i32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read an i32 in little-endian format
pub fn read_i32_le<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Write an i64 in little-endian format
pub fn write_i64_le<W: Write>(writer: &mut W, value: i64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read an i64 in little-endian format
pub fn read_i64_le<R: Read>(reader: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}
