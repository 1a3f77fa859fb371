use crate::error::{IndexError, Result};
use crate::index::reader::read_header;
use crate::index::store::DirectoryStore;
use crate::index::types::{IndexHeader, Timestamp};
use std::path::{Path, PathBuf};

/// Header-level facts about one partition file
#[derive(Debug)]
pub struct PartitionStats {
    pub code: String,
    pub path: PathBuf,
    pub size: u64,
    /// Header, or the reason it could not be read
    pub header: std::result::Result<IndexHeader, IndexError>,
}

/// Read the header of every partition file in `dir`, sorted by code.
///
/// Record bodies are never decoded. A file whose header is unreadable is
/// still listed, carrying its error.
pub fn collect(dir: &Path) -> Result<Vec<PartitionStats>> {
    let store = DirectoryStore::new(dir);
    let mut stats = Vec::new();

    for (code, path) in store.partition_files()? {
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let header = read_header(&path);
        if let Err(e) = &header {
            tracing::warn!(partition = %code, error = %e, "unreadable partition header");
        }
        stats.push(PartitionStats {
            code,
            path,
            size,
            header,
        });
    }

    Ok(stats)
}

/// Display index statistics
pub fn show_stats(dir: &Path) -> anyhow::Result<()> {
    let stats = collect(dir)?;

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Index location:   {}", dir.display());
    println!("Partition files:  {}", stats.len());

    if stats.is_empty() {
        println!();
        println!("No partition files found.");
        return Ok(());
    }

    println!();
    println!(
        "  {:4} {:>7} {:>9} {:>12}  {}",
        "UF", "Version", "Records", "Size", "Generated"
    );

    let mut total_records: u64 = 0;
    let mut total_size: u64 = 0;
    let mut unreadable = 0;

    for s in &stats {
        total_size += s.size;
        match &s.header {
            Ok(header) => {
                total_records += header.record_count as u64;
                println!(
                    "  {:4} {:>7} {:>9} {:>12}  {}",
                    s.code,
                    header.version,
                    header.record_count,
                    format_size(s.size),
                    format_timestamp(header.generated_at)
                );
            }
            Err(e) => {
                unreadable += 1;
                println!("  {:4} unreadable: {}", s.code, e);
            }
        }
    }

    println!();
    println!("Total records:    {}", total_records);
    println!("Total size:       {}", format_size(total_size));
    if unreadable > 0 {
        println!("Unreadable files: {}", unreadable);
    }

    Ok(())
}

/// Format byte size to human readable
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format a millisecond timestamp as UTC `YYYY-MM-DD HH:MM:SS`
fn format_timestamp(ts: Timestamp) -> String {
    let secs = ts.div_euclid(1000);
    let days = secs.div_euclid(86_400);
    let rem = secs.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian date
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}
