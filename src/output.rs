//! Terminal formatting for search results, cache status and build summaries

use crate::index::BuildSummary;
use crate::query::{CacheStatus, SearchOutcome};
use std::io::{self, Write};
use std::time::Duration;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

const NAME_WIDTH: usize = 38;
const HASH_PREFIX: usize = 8;

fn color_choice(color: bool) -> ColorChoice {
    if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// Shorten a name to the table column, marking the cut with `...`
pub fn truncate_name(name: &str) -> String {
    if name.chars().count() <= NAME_WIDTH {
        name.to_string()
    } else {
        let kept: String = name.chars().take(NAME_WIDTH - 3).collect();
        format!("{}...", kept)
    }
}

/// Print a search outcome as a table
pub fn print_outcome(outcome: &SearchOutcome, color: bool) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice(color));
    write_outcome(&mut stdout, outcome)
}

/// Write a search outcome as a table: rows, omission notice, failures
pub fn write_outcome<W: WriteColor>(out: &mut W, outcome: &SearchOutcome) -> io::Result<()> {
    if outcome.records.is_empty() {
        writeln!(out, "No municipality found for '{}'.", outcome.query)?;
    } else {
        out.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(
            out,
            "{:<4} {:<9} {:<6} {:<width$} {}",
            "UF",
            "IBGE",
            "TOM",
            "NAME",
            "HASH",
            width = NAME_WIDTH
        )?;
        out.reset()?;

        for record in &outcome.records {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(out, "{:<4}", record.partition_code)?;
            out.reset()?;

            write!(out, " {:<9} {:<6} ", record.ibge_code, record.tom_code)?;
            write!(
                out,
                "{:<width$} ",
                truncate_name(record.display_name()),
                width = NAME_WIDTH
            )?;

            let hash = record
                .fingerprint
                .as_deref()
                .map(|h| h.get(..HASH_PREFIX).unwrap_or(h))
                .unwrap_or("-");
            out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            writeln!(out, "{}", hash)?;
            out.reset()?;
        }
    }

    if outcome.is_truncated() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        writeln!(
            out,
            "... {} more result(s) not shown ({} total).",
            outcome.omitted, outcome.total
        )?;
        out.reset()?;
    }

    for failure in &outcome.failures {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        write!(out, "skipped {}", failure.partition)?;
        out.reset()?;
        writeln!(out, ": {}", failure.error)?;
    }

    Ok(())
}

/// Print the elapsed time of one query
pub fn print_elapsed(elapsed: Duration, color: bool) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice(color));
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    writeln!(stdout, "({} ms)", elapsed.as_millis())?;
    stdout.reset()
}

/// Print what the partition cache holds
pub fn print_cache_status(status: &CacheStatus, color: bool) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice(color));
    write_cache_status(&mut stdout, status)
}

pub fn write_cache_status<W: WriteColor>(out: &mut W, status: &CacheStatus) -> io::Result<()> {
    if status.partitions.is_empty() {
        writeln!(out, "Cache is empty.")?;
    } else {
        writeln!(
            out,
            "{} partition(s) cached, {} record(s):",
            status.partitions.len(),
            status.total_records()
        )?;
        for (code, count) in &status.partitions {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(out, "  {:<4}", code)?;
            out.reset()?;
            writeln!(out, " {}", count)?;
        }
    }

    writeln!(
        out,
        "Hits: {}  Misses: {}  Loads: {}  Hit rate: {:.1}%",
        status.hits,
        status.misses,
        status.loads,
        status.hit_rate() * 100.0
    )
}

/// Print per-partition results of a build
pub fn print_build_summary(summary: &BuildSummary) {
    for built in &summary.partitions {
        println!(
            "  {:<4} {:>6} records {:>10} bytes {:>8} ms  {}",
            built.code,
            built.records,
            built.bytes,
            built.elapsed.as_millis(),
            built.path.display()
        );
    }
    for code in &summary.skipped {
        println!("  {:<4} skipped", code);
    }
    println!(
        "Built {} partition(s), {} records, {} bytes in {:.2}s",
        summary.partitions.len(),
        summary.total_records(),
        summary.total_bytes(),
        summary.elapsed.as_secs_f64()
    );
}
