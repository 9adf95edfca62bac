use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Look up magnetic core dimensions and derived metrics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the core identifiers available in a dataset
    Cores(CoresArgs),
    /// Show how dataset headers map to field keys and display labels
    Columns(ColumnsArgs),
    /// Resolve a core and print its dimensions and calculated values
    Lookup(LookupArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Dataset file (.csv, .tsv, .xlsx, .xls, .ods); falls back to `data` in --config
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Worksheet to read from a workbook (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of a delimited input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML configuration file with defaults, aliases, and extra metrics
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Text shown for values that cannot be determined
    #[arg(long)]
    pub placeholder: Option<String>,
}

#[derive(Debug, Args)]
pub struct CoresArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Core identifier, matched ignoring case and surrounding spaces (e.g. "E 5", "RM 6")
    #[arg(long = "core")]
    pub core: String,
    /// Print only this dimension, given as a header label or field key
    #[arg(short = 'f', long = "field")]
    pub field: Option<String>,
    /// Report every row sharing the identifier instead of the first
    #[arg(long = "all")]
    pub all: bool,
    /// Additional calculated values using `name=expression`
    #[arg(long = "metric", action = clap::ArgAction::Append)]
    pub metrics: Vec<String>,
    /// Output format
    #[arg(long = "format", default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
