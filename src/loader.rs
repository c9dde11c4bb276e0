//! Self-healing bulk load of one table.
//!
//! The loader walks an explicit state machine:
//!
//! ```text
//! Building -> Loading -> Succeeded
//!                |  ^
//!                v  |
//!            Repairing -> Failed
//! ```
//!
//! `Building` drops and recreates the table. `Loading` runs the `LOAD DATA`
//! statement; a recognized rejection moves to `Repairing`, which widens the
//! offending column in place with `ALTER TABLE` and loads again. Every repair
//! strictly widens the column, and the number of repairs is capped by
//! [`RetryPolicy`]. Repairs are committed as they happen and are not rolled
//! back when the table finally fails; [`LoadError::repairs`] lists them.

use std::path::Path;

use log::{error, info, warn};
use thiserror::Error;

use crate::{
    config::LoadOptions,
    database::Database,
    failure::{self, DbError, FailureClass, Rejection, Unrecognized},
    schema::{ColumnOrigin, ColumnType, SHORT_TEXT_CAPACITY, TableDefinition},
};

/// Longest VARCHAR, in characters, a utf8mb4 row can hold.
pub const VARCHAR_MAX_CHARS: u64 = 16_383;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_repairs: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_repairs: 32 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Building,
    Loading,
    Repairing(Rejection),
    Succeeded,
    Failed(LoadFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Loaded,
    Rejected { class: String, column: String },
    Unrecognized(String),
}

/// One execution of the bulk load statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAttempt {
    pub number: usize,
    pub outcome: AttemptOutcome,
}

/// A column alteration issued while repairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRepair {
    pub column: String,
    pub class: String,
    pub from: ColumnType,
    pub to: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub table: String,
    pub attempts: Vec<LoadAttempt>,
    pub repairs: Vec<SchemaRepair>,
    /// Rows in the table after loading, when the count query succeeded.
    pub rows: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
    #[error("could not build table: {0}")]
    Build(DbError),
    #[error(transparent)]
    Unrecognized(#[from] Unrecognized),
    #[error("column '{0}' is not part of the table definition")]
    UnknownColumn(String),
    #[error("could not read the declared length of column '{column}': {error}")]
    Metadata { column: String, error: DbError },
    #[error("column '{0}' has no usable declared length")]
    UnknownLength(String),
    #[error("repairing column '{column}' to {target} would not widen {current}")]
    RepairStalled {
        column: String,
        current: ColumnType,
        target: ColumnType,
    },
    #[error("could not alter column '{column}': {error}")]
    Repair { column: String, error: DbError },
    #[error("gave up after {0} repair(s)")]
    RetryLimit(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("loading table '{table}' failed after {} attempt(s): {failure}", .attempts.len())]
pub struct LoadError {
    pub table: String,
    pub attempts: Vec<LoadAttempt>,
    /// Alterations already committed; the table is left in this state.
    pub repairs: Vec<SchemaRepair>,
    #[source]
    pub failure: LoadFailure,
}

/// Column type after a value-too-long rejection on a column of `length` characters.
pub fn widened_length(length: u64) -> ColumnType {
    let doubled = length.saturating_mul(2);
    if doubled > VARCHAR_MAX_CHARS {
        ColumnType::Text
    } else {
        ColumnType::Varchar(doubled as u32)
    }
}

pub struct Loader<'a, D: Database> {
    db: &'a mut D,
    options: LoadOptions,
    policy: RetryPolicy,
}

impl<'a, D: Database> Loader<'a, D> {
    pub fn new(db: &'a mut D, options: &LoadOptions) -> Self {
        Self {
            db,
            options: options.clone(),
            policy: RetryPolicy {
                max_repairs: options.max_repairs,
            },
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Creates the table from `def` and loads `source` into it, repairing as needed.
    ///
    /// `def` is updated in place with every repair, so on return it matches
    /// the table's final schema.
    pub fn load_table(
        &mut self,
        def: &mut TableDefinition,
        source: &Path,
    ) -> Result<LoadReport, LoadError> {
        let load_sql = def.load_sql(source, &self.options);
        let mut attempts: Vec<LoadAttempt> = Vec::new();
        let mut repairs: Vec<SchemaRepair> = Vec::new();
        let mut state = LoadState::Building;

        loop {
            state = match state {
                LoadState::Building => match self.build(def) {
                    Ok(()) => LoadState::Loading,
                    Err(err) => LoadState::Failed(LoadFailure::Build(err)),
                },
                LoadState::Loading => {
                    let number = attempts.len() + 1;
                    info!("[attempt {number}] Loading {:?} into '{}'", source, def.name);
                    match self.db.execute(&load_sql).and_then(|_| self.db.commit()) {
                        Ok(()) => {
                            attempts.push(LoadAttempt {
                                number,
                                outcome: AttemptOutcome::Loaded,
                            });
                            LoadState::Succeeded
                        }
                        Err(err) => {
                            warn!("[attempt {number}] {err}");
                            match failure::classify(&err) {
                                Ok(rejection) => {
                                    attempts.push(LoadAttempt {
                                        number,
                                        outcome: AttemptOutcome::Rejected {
                                            class: rejection.class.to_string(),
                                            column: rejection.column.clone(),
                                        },
                                    });
                                    LoadState::Repairing(rejection)
                                }
                                Err(unrecognized) => {
                                    attempts.push(LoadAttempt {
                                        number,
                                        outcome: AttemptOutcome::Unrecognized(err.to_string()),
                                    });
                                    LoadState::Failed(unrecognized.into())
                                }
                            }
                        }
                    }
                }
                LoadState::Repairing(rejection) => {
                    if repairs.len() >= self.policy.max_repairs {
                        LoadState::Failed(LoadFailure::RetryLimit(repairs.len()))
                    } else {
                        match self.repair(def, &rejection) {
                            Ok(repair) => {
                                repairs.push(repair);
                                LoadState::Loading
                            }
                            Err(failure) => LoadState::Failed(failure),
                        }
                    }
                }
                LoadState::Succeeded => {
                    let rows = match self.db.row_count(&def.name) {
                        Ok(rows) => Some(rows),
                        Err(err) => {
                            warn!("Could not count rows in '{}': {err}", def.name);
                            None
                        }
                    };
                    info!(
                        "Loaded '{}' after {} attempt(s), {} repair(s)",
                        def.name,
                        attempts.len(),
                        repairs.len()
                    );
                    return Ok(LoadReport {
                        table: def.name.clone(),
                        attempts,
                        repairs,
                        rows,
                    });
                }
                LoadState::Failed(failure) => {
                    error!("Giving up on '{}': {failure}", def.name);
                    if !repairs.is_empty() {
                        warn!(
                            "Table '{}' keeps {} committed column alteration(s)",
                            def.name,
                            repairs.len()
                        );
                    }
                    return Err(LoadError {
                        table: def.name.clone(),
                        attempts,
                        repairs,
                        failure,
                    });
                }
            };
        }
    }

    fn build(&mut self, def: &TableDefinition) -> Result<(), DbError> {
        self.db.execute(&def.drop_sql())?;
        self.db.execute(&def.create_sql())?;
        self.db.commit()
    }

    /// Widens the rejected column and records the new type in `def`.
    ///
    /// A temporal column keeps its `STR_TO_DATE` staging after it becomes
    /// text: the retry reuses the statement rendered before the first
    /// attempt, so the transform left in `def` is the one actually applied.
    fn repair(
        &mut self,
        def: &mut TableDefinition,
        rejection: &Rejection,
    ) -> Result<SchemaRepair, LoadFailure> {
        let column = rejection.column.clone();
        let current = def
            .column(&column)
            .map(|c| c.column_type)
            .ok_or_else(|| LoadFailure::UnknownColumn(column.clone()))?;
        let target = match rejection.class {
            FailureClass::ValueTooLong => {
                let length = self
                    .db
                    .column_max_length(&def.name, &column)
                    .map_err(|error| LoadFailure::Metadata {
                        column: column.clone(),
                        error,
                    })?;
                match length {
                    Some(length) if length > 0 => widened_length(length),
                    _ => return Err(LoadFailure::UnknownLength(column)),
                }
            }
            FailureClass::ValueTruncated | FailureClass::IncorrectValue => {
                ColumnType::Varchar(SHORT_TEXT_CAPACITY)
            }
        };
        if !current.widens_to(&target) {
            return Err(LoadFailure::RepairStalled {
                column,
                current,
                target,
            });
        }

        info!("Column '{column}' ({}): {current} -> {target}", rejection.class);
        let alter = def.alter_column_sql(&column, &target);
        self.db
            .execute(&alter)
            .and_then(|_| self.db.commit())
            .map_err(|error| LoadFailure::Repair {
                column: column.clone(),
                error,
            })?;
        if let Some(definition) = def.column_mut(&column) {
            definition.column_type = target;
            definition.origin = ColumnOrigin::Repaired;
        }
        Ok(SchemaRepair {
            column,
            class: rejection.class.to_string(),
            from: current,
            to: target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widened_length_doubles() {
        assert_eq!(widened_length(50), ColumnType::Varchar(100));
        assert_eq!(widened_length(1), ColumnType::Varchar(2));
    }

    #[test]
    fn widened_length_switches_to_text_past_varchar_limit() {
        assert_eq!(widened_length(8_191), ColumnType::Varchar(16_382));
        assert_eq!(widened_length(8_192), ColumnType::Text);
        assert_eq!(widened_length(u64::MAX), ColumnType::Text);
    }

    #[test]
    fn load_error_message_counts_attempts() {
        let err = LoadError {
            table: "t".to_string(),
            attempts: vec![LoadAttempt {
                number: 1,
                outcome: AttemptOutcome::Unrecognized("boom".to_string()),
            }],
            repairs: Vec::new(),
            failure: LoadFailure::RetryLimit(0),
        };
        assert_eq!(
            err.to_string(),
            "loading table 't' failed after 1 attempt(s): gave up after 0 repair(s)"
        );
    }
}
