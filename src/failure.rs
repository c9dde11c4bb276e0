//! Classification of bulk-load rejections reported by the database.

use std::{fmt, sync::OnceLock};

use regex::Regex;
use thiserror::Error;

/// Error surfaced by a [`Database`](crate::database::Database) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("database error{}: {message}", code_label(.code))]
pub struct DbError {
    pub code: Option<u16>,
    pub message: String,
}

fn code_label(code: &Option<u16>) -> String {
    code.map(|code| format!(" {code}")).unwrap_or_default()
}

impl DbError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

/// Rejections the loader knows how to repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// 1406 `ER_DATA_TOO_LONG`
    ValueTooLong,
    /// 1265 `WARN_DATA_TRUNCATED`
    ValueTruncated,
    /// 1366 `ER_TRUNCATED_WRONG_VALUE_FOR_FIELD`
    IncorrectValue,
}

impl FailureClass {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1406 => Some(FailureClass::ValueTooLong),
            1265 => Some(FailureClass::ValueTruncated),
            1366 => Some(FailureClass::IncorrectValue),
            _ => None,
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureClass::ValueTooLong => "value too long",
            FailureClass::ValueTruncated => "value truncated",
            FailureClass::IncorrectValue => "incorrect scalar value",
        };
        f.write_str(label)
    }
}

fn column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"column '(.+?)'").expect("valid column pattern"))
}

/// Pulls the offending column name out of a MySQL error message.
///
/// Messages look like `Data too long for column 'email' at row 1` or
/// `Incorrect integer value: 'N61' for column 'route' at row 3`. The first
/// `column '...'` token wins; `None` means the rejection cannot be repaired.
pub fn extract_column(message: &str) -> Option<String> {
    column_pattern()
        .captures(message)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// A recognized rejection together with the column it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub class: FailureClass,
    pub column: String,
}

/// Why a database error could not be turned into a [`Rejection`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unrecognized {
    #[error("unrecognized database error: {0}")]
    Class(DbError),
    #[error("no column name in {class} error: {error}")]
    Column { class: FailureClass, error: DbError },
}

pub fn classify(error: &DbError) -> Result<Rejection, Unrecognized> {
    let class = error
        .code
        .and_then(FailureClass::from_code)
        .ok_or_else(|| Unrecognized::Class(error.clone()))?;
    let column = extract_column(&error.message).ok_or_else(|| Unrecognized::Column {
        class,
        error: error.clone(),
    })?;
    Ok(Rejection { class, column })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_column_from_known_messages() {
        assert_eq!(
            extract_column("Data too long for column 'email' at row 1").as_deref(),
            Some("email")
        );
        assert_eq!(
            extract_column("Data truncated for column 'fare' at row 428").as_deref(),
            Some("fare")
        );
        assert_eq!(
            extract_column("Incorrect integer value: 'N61' for column '노선번호' at row 3")
                .as_deref(),
            Some("노선번호")
        );
    }

    #[test]
    fn db_error_display_includes_code_when_known() {
        assert_eq!(
            DbError::new(1406, "Data too long").to_string(),
            "database error 1406: Data too long"
        );
        assert_eq!(
            DbError::other("connection reset").to_string(),
            "database error: connection reset"
        );
    }

    #[test]
    fn extraction_fails_without_quoted_column() {
        assert_eq!(extract_column("Data too long at row 1"), None);
        assert_eq!(extract_column("column '' at row 2"), None);
    }

    #[test]
    fn classify_recognizes_three_codes() {
        let rejection = classify(&DbError::new(1406, "Data too long for column 'a' at row 1"))
            .expect("recognized");
        assert_eq!(rejection.class, FailureClass::ValueTooLong);
        assert_eq!(rejection.column, "a");
        assert_eq!(FailureClass::from_code(1265), Some(FailureClass::ValueTruncated));
        assert_eq!(FailureClass::from_code(1366), Some(FailureClass::IncorrectValue));
        assert_eq!(FailureClass::from_code(1062), None);
    }

    #[test]
    fn classify_rejects_unknown_codes_and_missing_columns() {
        let unknown = DbError::new(1062, "Duplicate entry '1' for key 'PRIMARY'");
        assert_eq!(classify(&unknown), Err(Unrecognized::Class(unknown.clone())));

        let no_column = DbError::new(1406, "Data too long");
        assert!(matches!(
            classify(&no_column),
            Err(Unrecognized::Column {
                class: FailureClass::ValueTooLong,
                ..
            })
        ));

        let no_code = DbError::other("connection reset");
        assert!(matches!(classify(&no_code), Err(Unrecognized::Class(_))));
    }
}
