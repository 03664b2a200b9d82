//! Interactive read/eval/print loop.

use crate::database::Database;
use anyhow::Result;
use log::debug;
use std::io::{BufRead, Write};

pub const PROMPT: &str = "db > ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Tables,
    Help,
}

impl MetaCommand {
    /// Parses a line starting with `.`
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            ".exit" => Some(MetaCommand::Exit),
            ".tables" => Some(MetaCommand::Tables),
            ".help" => Some(MetaCommand::Help),
            _ => None,
        }
    }
}

pub fn print_banner<W: Write>(output: &mut W) -> Result<()> {
    writeln!(output, "slotdb {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(output, "Type .help for usage")?;
    Ok(())
}

fn print_help<W: Write>(output: &mut W) -> Result<()> {
    writeln!(output, "Statements:")?;
    writeln!(output, "  INSERT INTO <table> [(col, ...)] VALUES (value, ...);")?;
    writeln!(output, "  SELECT <cols | *> FROM <table> [WHERE col = value];")?;
    writeln!(output, "Meta commands:")?;
    writeln!(output, "  .tables   list tables")?;
    writeln!(output, "  .help     show this message")?;
    writeln!(output, "  .exit     flush and quit")?;
    Ok(())
}

/// Runs the loop until `.exit` or end of input.
///
/// Statement errors are printed and the loop continues; only I/O errors on
/// `input` or `output` end it early.
pub fn run<R: BufRead, W: Write>(database: &Database, mut input: R, output: &mut W) -> Result<()> {
    print_banner(output)?;

    let mut line = String::new();
    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }

        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        debug!("Read command: {}", command);

        if command.starts_with('.') {
            match MetaCommand::parse(command) {
                Some(MetaCommand::Exit) => {
                    writeln!(output, "Exiting")?;
                    break;
                }
                Some(MetaCommand::Tables) => {
                    writeln!(output, "Listing tables (not yet implemented)")?
                }
                Some(MetaCommand::Help) => print_help(output)?,
                None => writeln!(output, "Unrecognized command '{}'", command)?,
            }
            continue;
        }

        match database.execute_sql(command) {
            Ok(result) => writeln!(output, "{}", result)?,
            Err(e) => writeln!(output, "Error: {:#}", e)?,
        }
    }

    if let Err(e) = database.flush() {
        writeln!(output, "Error: {:#}", e)?;
    }
    Ok(())
}
