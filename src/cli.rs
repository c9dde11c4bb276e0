use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Load CSV directories into MySQL with hint-driven column types", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create and bulk-load one table per CSV file in a directory
    Load(LoadArgs),
    /// Show the table definition and SQL planned for one CSV file
    Plan(PlanArgs),
    /// Resolve a single type hint to its canonical type
    Resolve(ResolveArgs),
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Directory containing the CSV files; its name is the default database name
    #[arg(short = 'd', long = "dir")]
    pub dir: PathBuf,
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// YAML file of fixed hints (`table: {column: hint}`) used instead of the generator
    #[arg(long)]
    pub hints: Option<PathBuf>,
    /// Target database (overrides configuration and directory name)
    #[arg(long)]
    pub database: Option<String>,
    /// Database host
    #[arg(long)]
    pub host: Option<String>,
    /// Database port
    #[arg(long)]
    pub port: Option<u16>,
    /// Database user
    #[arg(short, long)]
    pub user: Option<String>,
    /// Read files client-side with LOAD DATA LOCAL INFILE
    #[arg(long)]
    pub local_infile: bool,
    /// Maximum schema repairs per table
    #[arg(long)]
    pub max_repairs: Option<usize>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<char>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum PlanFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// CSV file to plan
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// YAML file of fixed hints used instead of the generator
    #[arg(long)]
    pub hints: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: PlanFormat,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<char>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Raw hint text, e.g. `VARCHAR(10)VARCHAR(20)`
    pub hint: String,
}

pub fn parse_delimiter(value: &str) -> Result<char, String> {
    match value {
        "tab" | "\t" => Ok('\t'),
        "comma" | "," => Ok(','),
        "|" | "pipe" => Ok('|'),
        ";" | "semicolon" => Ok(';'),
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
            Ok(first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_names_map_to_characters() {
        assert_eq!(parse_delimiter("tab"), Ok('\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(';'));
        assert_eq!(parse_delimiter("#"), Ok('#'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }
}
