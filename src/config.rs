//! Run configuration: database connection, hint generator and load options.
//!
//! Loaded from an optional YAML file, then overridden by command-line flags and
//! the `CSV2DB_DB_PASSWORD` environment variable. The resulting value is passed
//! explicitly to the loader; nothing here is global.

use std::{env, fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

pub const PASSWORD_ENV: &str = "CSV2DB_DB_PASSWORD";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    pub database: DatabaseConfig,
    pub generator: GeneratorConfig,
    pub load: LoadOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    /// Target schema; defaults to the input directory's name.
    pub database: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: None,
            database: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Rows per column shown to the generator.
    pub sample_rows: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "gpt-oss:20b".to_string(),
            temperature: 0.0,
            timeout_secs: 300,
            connect_timeout_secs: 10,
            sample_rows: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadOptions {
    pub delimiter: char,
    pub quote: char,
    pub line_terminator: String,
    pub ignore_lines: u32,
    /// Use `LOAD DATA LOCAL INFILE` (client-side file) instead of a server path.
    pub local_infile: bool,
    /// Upper bound on schema repairs for one table before giving up.
    pub max_repairs: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            line_terminator: "\n".to_string(),
            ignore_lines: 1,
            local_infile: false,
            max_repairs: 32,
        }
    }
}

impl LoaderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading configuration {path:?}"))?;
        let config: LoaderConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing configuration {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn apply_env(&mut self) {
        if let Ok(password) = env::var(PASSWORD_ENV) {
            self.database.password = Some(password);
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.load.delimiter.is_ascii(),
            "Load delimiter must be ASCII"
        );
        ensure!(self.load.quote.is_ascii(), "Quote character must be ASCII");
        ensure!(
            !self.load.line_terminator.is_empty(),
            "Line terminator cannot be empty"
        );
        ensure!(
            self.load.max_repairs > 0,
            "max_repairs must be at least 1"
        );
        ensure!(
            self.generator.sample_rows > 0,
            "generator.sample_rows must be at least 1"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "database:\n  host: db.internal\n  port: 3307").unwrap();
        writeln!(file, "load:\n  local_infile: true\n  delimiter: ';'").unwrap();

        let config = LoaderConfig::load(file.path()).expect("load config");
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 3307);
        assert_eq!(config.database.user, "root");
        assert!(config.load.local_infile);
        assert_eq!(config.load.delimiter, ';');
        assert_eq!(config.load.line_terminator, "\n");
        assert_eq!(config.generator.sample_rows, 20);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "database:\n  hostname: nope").unwrap();
        assert!(LoaderConfig::load(file.path()).is_err());
    }

    #[test]
    fn zero_repairs_fails_validation() {
        let mut config = LoaderConfig::default();
        config.load.max_repairs = 0;
        assert!(config.validate().is_err());
    }
}
