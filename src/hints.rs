//! Producers of raw per-column type hints.
//!
//! [`OllamaHintSource`] asks a local text-generation server; [`FixedHintSource`]
//! reads hints from a YAML file for offline runs. Either way the output is an
//! opaque string handed to [`hint::resolve`](crate::hint::resolve).

use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use anyhow::{Context, Result, anyhow};
use log::debug;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{config::GeneratorConfig, source::ColumnSample};

pub trait HintSource {
    fn hint(&mut self, table: &str, column: &ColumnSample) -> Result<String>;
}

/// Removes the line breaks, spaces and backticks models like to wrap answers in.
pub fn normalize_response(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '`')
        .collect()
}

pub fn build_prompt(column: &ColumnSample) -> String {
    let values = column.values.join("\n");
    format!(
        "{values}\n\n\
         The strings above are one column of a CSV file and '{name}' is its title. \
         Reply with only the MySQL type best suited to store them. \
         If the title mentions a year, month, day, time or date, use DATE, DATETIME or TIME. \
         When choosing date, datetime, time or timestamp, work out the order of year, month and day \
         from the strings and print the format after the type: (%Y%m%d) for year-month-day digits, \
         (%Y%m) when there is no day, (%Y-%m-%d) for year-month-day with dashes, \
         (%m-%d-%Y) for month-day-year. \
         Do not add PRIMARY, the field name, explanations or comments. \
         Always give VARCHAR a size. Use INT instead of TINYINT, SMALLINT or MEDIUMINT.",
        name = column.name
    )
}

pub struct OllamaHintSource {
    agent: ureq::Agent,
    url: String,
    model: String,
    temperature: f32,
}

impl OllamaHintSource {
    pub fn new(config: &GeneratorConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .timeout_connect(Duration::from_secs(config.connect_timeout_secs))
            .build();
        Self {
            agent,
            url: format!("{}/api/generate", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }
}

impl HintSource for OllamaHintSource {
    fn hint(&mut self, table: &str, column: &ColumnSample) -> Result<String> {
        let body = json!({
            "model": self.model,
            "prompt": build_prompt(column),
            "stream": false,
            "options": { "temperature": self.temperature },
        });
        let response: Value = match self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_json(&body)
        {
            Ok(resp) => resp
                .into_json()
                .with_context(|| format!("Decoding generator response for {table}.{}", column.name))?,
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                return Err(anyhow!("Generator returned HTTP {code}: {text}"));
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("Requesting hint for {table}.{}", column.name)));
            }
        };
        let text = response["response"]
            .as_str()
            .ok_or_else(|| anyhow!("Generator response has no 'response' text"))?;
        let hint = normalize_response(text);
        debug!("{table}.{}: hint '{hint}'", column.name);
        Ok(hint)
    }
}

/// Hints read from YAML shaped as `table: { column: hint }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FixedHintSource {
    tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl FixedHintSource {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("Reading hints {path:?}"))?;
        serde_yaml::from_str(&raw).with_context(|| format!("Parsing hints {path:?}"))
    }

    pub fn insert(&mut self, table: &str, column: &str, hint: &str) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(column.to_string(), hint.to_string());
    }
}

impl HintSource for FixedHintSource {
    /// Missing entries yield an empty hint, which resolves to `text`.
    fn hint(&mut self, table: &str, column: &ColumnSample) -> Result<String> {
        Ok(self
            .tables
            .get(table)
            .and_then(|columns| columns.get(&column.name))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample(name: &str, values: &[&str]) -> ColumnSample {
        ColumnSample {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn normalize_strips_whitespace_and_fences() {
        assert_eq!(normalize_response(" VARCHAR(20)\n"), "VARCHAR(20)");
        assert_eq!(normalize_response("`DATE (%Y-%m-%d)`"), "DATE(%Y-%m-%d)");
    }

    #[test]
    fn prompt_contains_values_and_title() {
        let prompt = build_prompt(&sample("ride_date", &["20240101", "20240102"]));
        assert!(prompt.starts_with("20240101\n20240102\n"));
        assert!(prompt.contains("'ride_date' is its title"));
    }

    #[test]
    fn fixed_hints_load_from_yaml() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "rides:\n  id: INT\n  day: DATE(%Y%m%d)").unwrap();

        let mut source = FixedHintSource::load(file.path()).expect("load hints");
        assert_eq!(source.hint("rides", &sample("id", &[])).unwrap(), "INT");
        assert_eq!(source.hint("rides", &sample("other", &[])).unwrap(), "");
        assert_eq!(source.hint("missing", &sample("id", &[])).unwrap(), "");
    }
}
