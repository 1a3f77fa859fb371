//! Interactive query loop

use crate::index::store::PartitionSource;
use crate::output;
use crate::query::QueryEngine;
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::time::Instant;

/// One line of shell input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Exit,
    Help,
    Cache,
    Clear,
    Empty,
    Query(String),
}

/// Interpret a line; anything that is not a command is a query
pub fn parse_command(line: &str) -> ShellCommand {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => ShellCommand::Empty,
        "exit" | "sair" | "quit" => ShellCommand::Exit,
        "help" | "ajuda" | "?" => ShellCommand::Help,
        "cache" => ShellCommand::Cache,
        "clear" | "limpar" => ShellCommand::Clear,
        _ => ShellCommand::Query(line.to_string()),
    }
}

fn print_help() {
    println!("Queries:");
    println!("  <UF>           two letters, every municipality of that UF (e.g. SP)");
    println!("  <code>         4+ digits, exact TOM or IBGE code (e.g. 3550308)");
    println!("  <text>         part of a municipality name (e.g. campinas)");
    println!();
    println!("Commands:");
    println!("  cache          show loaded partitions");
    println!("  clear, limpar  clear the screen");
    println!("  help, ajuda    show this help");
    println!("  exit, sair     leave");
}

fn clear_screen() -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "\x1b[2J\x1b[H")?;
    stdout.flush()
}

/// Run the shell on stdin until `exit` or end of input
pub fn run<S: PartitionSource>(engine: &QueryEngine<S>, color: bool) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    println!("Municipality index shell. Type 'help' for commands.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read input")?;

        match parse_command(&line) {
            ShellCommand::Exit => break,
            ShellCommand::Empty => {}
            ShellCommand::Help => print_help(),
            ShellCommand::Clear => clear_screen()?,
            ShellCommand::Cache => {
                output::print_cache_status(&engine.cache().status(), color)?;
            }
            ShellCommand::Query(query) => {
                let start = Instant::now();
                match engine.search(&query) {
                    Ok(outcome) => {
                        output::print_outcome(&outcome, color)?;
                        output::print_elapsed(start.elapsed(), color)?;
                    }
                    Err(e) => {
                        tracing::error!(%query, error = %e, "search failed");
                        eprintln!("Search failed: {}", e);
                    }
                }
            }
        }
    }

    Ok(())
}
