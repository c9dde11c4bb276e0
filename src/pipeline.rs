//! Directory runs: sample, hint, plan and load every CSV file in turn.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use log::{info, warn};

use crate::{
    config::LoaderConfig,
    database::Database,
    hints::HintSource,
    loader::{LoadReport, Loader},
    schema::{self, TableDefinition},
    source::{self, FileSample},
    temporal,
};

/// A planned table together with what it was planned from.
#[derive(Debug, Clone)]
pub struct TablePlan {
    pub definition: TableDefinition,
    pub sample: FileSample,
    pub hints: Vec<String>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub loaded: Vec<LoadReport>,
    pub failed: Vec<(PathBuf, String)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Samples `path`, collects one hint per column and builds the table definition.
pub fn plan_table<H: HintSource + ?Sized>(
    path: &Path,
    hints: &mut H,
    config: &LoaderConfig,
    encoding: &'static Encoding,
) -> Result<TablePlan> {
    let table = schema::table_name_for(path)
        .ok_or_else(|| anyhow!("Cannot derive a table name from {path:?}"))?;
    let delimiter = config.load.delimiter as u8;
    let sample = source::sample_columns(path, config.generator.sample_rows, delimiter, encoding)?;
    let mut raw_hints = Vec::with_capacity(sample.columns.len());
    for column in &sample.columns {
        let hint = hints
            .hint(&table, column)
            .with_context(|| format!("Getting type hint for {table}.{}", column.name))?;
        raw_hints.push(hint);
    }
    let definition = TableDefinition::from_hints(&table, &sample.column_names(), &raw_hints);
    report_temporal_matches(&definition, &sample);
    Ok(TablePlan {
        definition,
        sample,
        hints: raw_hints,
    })
}

fn report_temporal_matches(definition: &TableDefinition, sample: &FileSample) {
    for (column, sampled) in definition.columns.iter().zip(&sample.columns) {
        let (Some(rule), schema::ColumnType::Temporal(kind)) = (&column.transform, column.column_type)
        else {
            continue;
        };
        let (matched, considered) = temporal::sample_match_count(kind, &rule.format, &sampled.values);
        if matched < considered {
            warn!(
                "{}.{}: format '{}' parses {matched} of {considered} sampled value(s)",
                definition.name, column.name, rule.format
            );
        }
    }
}

/// Loads every CSV file in `dir`, one table at a time.
///
/// A file that fails (planning or loading) is recorded in the summary and the
/// run moves on to the next file.
pub fn run_directory<D, H>(
    dir: &Path,
    config: &LoaderConfig,
    hints: &mut H,
    db: &mut D,
    encoding: &'static Encoding,
) -> Result<RunSummary>
where
    D: Database,
    H: HintSource + ?Sized,
{
    let files = source::list_csv_files(dir)?;
    info!("Found {} CSV file(s) in {:?}", files.len(), dir);
    let mut summary = RunSummary::default();
    let mut loader = Loader::new(db, &config.load);
    for path in files {
        let mut definition = match plan_table(&path, &mut *hints, config, encoding) {
            Ok(plan) => plan.definition,
            Err(err) => {
                warn!("Skipping {:?}: {err:#}", path);
                summary.failed.push((path, format!("{err:#}")));
                continue;
            }
        };
        let absolute = path.canonicalize().unwrap_or_else(|_| path.clone());
        match loader.load_table(&mut definition, &absolute) {
            Ok(report) => summary.loaded.push(report),
            Err(err) => summary.failed.push((path, err.to_string())),
        }
    }
    info!(
        "Run finished: {} table(s) loaded, {} failed",
        summary.loaded.len(),
        summary.failed.len()
    );
    Ok(summary)
}
