//! Table definitions built from resolved hints, and the SQL rendered from them.
//!
//! A [`TableDefinition`] is the ordered list of columns for one source file.
//! Temporal columns are staged through a user variable during the bulk load
//! and converted with `STR_TO_DATE`; every other column loads directly.
//!
//! ## Column planning
//!
//! - Unresolvable hint: unconstrained `text`.
//! - Temporal hint whose format lacks a day, month or year (or has no format
//!   at all): demoted to `varchar(10)`.
//! - Hint count different from the column count: every column becomes `text`.

use std::{fmt, path::Path};

use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

use crate::{
    config::LoadOptions,
    hint::{self, HintError, ResolvedType},
    temporal::{self, TemporalKind},
};

/// Capacity used when a column is demoted or repaired to short text.
pub const SHORT_TEXT_CAPACITY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Int,
    Double,
    Float,
    Varchar(u32),
    Text,
    Temporal(TemporalKind),
}

impl ColumnType {
    pub fn sql(&self) -> String {
        match self {
            ColumnType::Int => "INT".to_string(),
            ColumnType::Double => "DOUBLE".to_string(),
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::Varchar(len) => format!("VARCHAR({len})"),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Temporal(kind) => kind.sql_name().to_ascii_uppercase(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ColumnType::Varchar(_) | ColumnType::Text)
    }

    /// True when `target` accepts strictly more values than `self`.
    ///
    /// Numeric and temporal types widen into any text type; bounded text only
    /// widens into longer bounded text or `text`.
    pub fn widens_to(&self, target: &ColumnType) -> bool {
        match (self, target) {
            (ColumnType::Text, _) => false,
            (ColumnType::Varchar(current), ColumnType::Varchar(next)) => next > current,
            (ColumnType::Varchar(_), ColumnType::Text) => true,
            (ColumnType::Varchar(_), _) => false,
            (_, target) => target.is_text(),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql())
    }
}

/// How a column's type was arrived at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnOrigin {
    Resolved,
    Unresolvable(String),
    IncompleteDate(String),
    CountMismatch,
    Repaired,
}

impl fmt::Display for ColumnOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnOrigin::Resolved => f.write_str("resolved"),
            ColumnOrigin::Unresolvable(reason) => write!(f, "unresolvable ({reason})"),
            ColumnOrigin::IncompleteDate(format) => write!(f, "incomplete date '{format}'"),
            ColumnOrigin::CountMismatch => f.write_str("hint count mismatch"),
            ColumnOrigin::Repaired => f.write_str("repaired during load"),
        }
    }
}

/// `column = STR_TO_DATE(@variable, 'format')` applied after staging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformRule {
    pub variable: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
    pub transform: Option<TransformRule>,
    pub origin: ColumnOrigin,
}

impl ColumnDefinition {
    fn text(name: &str, origin: ColumnOrigin) -> Self {
        Self {
            name: name.to_string(),
            column_type: ColumnType::Text,
            transform: None,
            origin,
        }
    }
}

/// Applies consumer-side rules to one resolver outcome.
pub fn plan_column(
    index: usize,
    name: &str,
    resolved: Result<ResolvedType, HintError>,
) -> ColumnDefinition {
    let resolved = match resolved {
        Ok(resolved) => resolved,
        Err(err) => {
            debug!("Column '{name}' hint unresolvable: {err}");
            return ColumnDefinition::text(name, ColumnOrigin::Unresolvable(err.to_string()));
        }
    };
    let column_type = match resolved {
        ResolvedType::Int => ColumnType::Int,
        ResolvedType::Double => ColumnType::Double,
        ResolvedType::Float => ColumnType::Float,
        ResolvedType::Varchar(len) => ColumnType::Varchar(len),
        ResolvedType::Text => ColumnType::Text,
        ResolvedType::Temporal { kind, format } => {
            let format = format
                .as_deref()
                .map(temporal::normalize_format)
                .unwrap_or_default();
            if !temporal::has_full_date(&format) {
                return ColumnDefinition {
                    name: name.to_string(),
                    column_type: ColumnType::Varchar(SHORT_TEXT_CAPACITY),
                    transform: None,
                    origin: ColumnOrigin::IncompleteDate(format),
                };
            }
            return ColumnDefinition {
                name: name.to_string(),
                column_type: ColumnType::Temporal(kind),
                transform: Some(TransformRule {
                    variable: format!("@col{index}"),
                    format,
                }),
                origin: ColumnOrigin::Resolved,
            };
        }
    };
    ColumnDefinition {
        name: name.to_string(),
        column_type,
        transform: None,
        origin: ColumnOrigin::Resolved,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    /// Builds a definition from one hint per column, in column order.
    pub fn from_hints<S: AsRef<str>>(name: &str, columns: &[String], hints: &[S]) -> Self {
        if columns.len() != hints.len() {
            warn!(
                "Table '{name}': {} hint(s) for {} column(s); defaulting every column to TEXT",
                hints.len(),
                columns.len()
            );
            return Self {
                name: name.to_string(),
                columns: columns
                    .iter()
                    .map(|c| ColumnDefinition::text(c, ColumnOrigin::CountMismatch))
                    .collect(),
            };
        }
        let columns = columns
            .iter()
            .zip(hints)
            .enumerate()
            .map(|(idx, (column, hint))| plan_column(idx, column, hint::resolve(hint.as_ref())))
            .collect();
        Self {
            name: name.to_string(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnDefinition> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", quote_identifier(&self.name))
    }

    pub fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.column_type.sql()))
            .join(", ");
        format!("CREATE TABLE {} ({columns})", quote_identifier(&self.name))
    }

    pub fn alter_column_sql(&self, column: &str, column_type: &ColumnType) -> String {
        format!(
            "ALTER TABLE {} MODIFY {} {}",
            quote_identifier(&self.name),
            quote_identifier(column),
            column_type.sql()
        )
    }

    /// `LOAD DATA` statement for the whole file, staging temporal columns.
    pub fn load_sql(&self, source: &Path, options: &LoadOptions) -> String {
        let path = source.to_string_lossy().replace('\\', "/");
        let targets = self
            .columns
            .iter()
            .map(|c| match &c.transform {
                Some(rule) => rule.variable.clone(),
                None => quote_identifier(&c.name),
            })
            .join(", ");
        let mut sql = format!(
            "LOAD DATA {}INFILE {}\nINTO TABLE {}\nFIELDS TERMINATED BY {} ENCLOSED BY {}\nLINES TERMINATED BY {}\nIGNORE {} LINES\n({targets})",
            if options.local_infile { "LOCAL " } else { "" },
            temporal::quote_sql_string(&path),
            quote_identifier(&self.name),
            temporal::quote_sql_string(&options.delimiter.to_string()),
            temporal::quote_sql_string(&options.quote.to_string()),
            temporal::quote_sql_string(&options.line_terminator),
            options.ignore_lines,
        );
        let assignments = self
            .columns
            .iter()
            .filter_map(|c| {
                c.transform.as_ref().map(|rule| {
                    format!(
                        "{} = {}",
                        quote_identifier(&c.name),
                        temporal::str_to_date_expr(&rule.variable, &rule.format)
                    )
                })
            })
            .join(", ");
        if !assignments.is_empty() {
            sql.push_str("\nSET ");
            sql.push_str(&assignments);
        }
        sql
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Table name for a source file: its stem.
pub fn table_name_for(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
        .filter(|stem| !stem.is_empty())
}
