//! Reduction of free-form type hints to one canonical column type.
//!
//! A hint such as `VARCHAR(10)VARCHAR(20)` or `date(%Y-%m-%d) time(%Y-%m-%d)`
//! is tokenized by keyword, checked for stray text, and the set of kinds is
//! reconciled: numeric kinds by priority, varchar by longest length, temporal
//! kinds by a shared format. Anything else is unresolvable.

use std::{collections::BTreeSet, fmt, sync::OnceLock};

use regex::Regex;
use thiserror::Error;

use crate::temporal::TemporalKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeKind {
    Int,
    Double,
    Float,
    Decimal,
    Varchar,
    Text,
    Date,
    DateTime,
    Time,
    Timestamp,
}

impl TypeKind {
    fn from_keyword(keyword: &str) -> Option<Self> {
        let kind = match keyword.to_ascii_lowercase().as_str() {
            "int" => TypeKind::Int,
            "double" => TypeKind::Double,
            "float" => TypeKind::Float,
            "decimal" => TypeKind::Decimal,
            "varchar" => TypeKind::Varchar,
            "text" => TypeKind::Text,
            "date" => TypeKind::Date,
            "datetime" => TypeKind::DateTime,
            "time" => TypeKind::Time,
            "timestamp" => TypeKind::Timestamp,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeKind::Int | TypeKind::Double | TypeKind::Float | TypeKind::Decimal
        )
    }

    pub fn temporal(self) -> Option<TemporalKind> {
        match self {
            TypeKind::Date => Some(TemporalKind::Date),
            TypeKind::DateTime => Some(TemporalKind::DateTime),
            TypeKind::Time => Some(TemporalKind::Time),
            TypeKind::Timestamp => Some(TemporalKind::Timestamp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeToken {
    pub kind: TypeKind,
    /// Text inside the parentheses, empty when none were given.
    pub parameter: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedType {
    Int,
    Double,
    Float,
    Varchar(u32),
    Text,
    Temporal {
        kind: TemporalKind,
        format: Option<String>,
    },
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedType::Int => f.write_str("int"),
            ResolvedType::Double => f.write_str("double"),
            ResolvedType::Float => f.write_str("float"),
            ResolvedType::Varchar(len) => write!(f, "varchar({len})"),
            ResolvedType::Text => f.write_str("text"),
            ResolvedType::Temporal { kind, format } => match format {
                Some(format) => write!(f, "{kind}({format})"),
                None => write!(f, "{kind}"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HintError {
    #[error("hint is empty")]
    Empty,
    #[error("unexpected text '{text}' at offset {offset}")]
    StrayText { offset: usize, text: String },
    #[error("no type keyword found")]
    NoTokens,
    #[error("hint mixes incompatible kinds: {0}")]
    MixedKinds(String),
    #[error("temporal formats disagree: '{first}' vs '{other}'")]
    ConflictingFormats { first: String, other: String },
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(datetime|timestamp|int|double|float|decimal|varchar|text|date|time)(?:\((.*?)\))?",
        )
        .expect("valid hint token pattern")
    })
}

fn stray_text(hint: &str, start: usize, end: usize) -> Result<(), HintError> {
    let gap = &hint[start..end];
    if gap.trim().is_empty() {
        Ok(())
    } else {
        Err(HintError::StrayText {
            offset: start,
            text: gap.trim().to_string(),
        })
    }
}

/// Splits a hint into keyword tokens, rejecting any non-whitespace leftovers.
pub fn tokenize(hint: &str) -> Result<Vec<TypeToken>, HintError> {
    if hint.trim().is_empty() {
        return Err(HintError::Empty);
    }
    let mut tokens = Vec::new();
    let mut last_end = 0usize;
    for captures in token_pattern().captures_iter(hint) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        stray_text(hint, last_end, whole.start())?;
        let kind = TypeKind::from_keyword(&captures[1]).ok_or(HintError::NoTokens)?;
        let parameter = captures
            .get(2)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        tokens.push(TypeToken { kind, parameter });
        last_end = whole.end();
    }
    stray_text(hint, last_end, hint.len())?;
    if tokens.is_empty() {
        return Err(HintError::NoTokens);
    }
    Ok(tokens)
}

/// Resolves a hint string to one canonical type. `Err` means unresolvable.
pub fn resolve(hint: &str) -> Result<ResolvedType, HintError> {
    let tokens = tokenize(hint)?;
    let kinds: BTreeSet<TypeKind> = tokens.iter().map(|t| t.kind).collect();

    if kinds.iter().all(|k| k.is_numeric()) {
        return Ok(resolve_numeric(&kinds));
    }
    if kinds.iter().all(|k| *k == TypeKind::Varchar) {
        let longest = tokens
            .iter()
            .map(|t| varchar_length(&t.parameter))
            .max()
            .unwrap_or(0);
        return Ok(ResolvedType::Varchar(longest));
    }
    if kinds.iter().all(|k| *k == TypeKind::Text) {
        return Ok(ResolvedType::Text);
    }
    if kinds.iter().all(|k| k.temporal().is_some()) {
        return resolve_temporal(&tokens, &kinds);
    }
    let names = kinds
        .iter()
        .map(|k| format!("{k:?}").to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(", ");
    Err(HintError::MixedKinds(names))
}

/// Length carried by a varchar parameter. Anything but plain ASCII digits
/// counts as 0; lengths past `u32::MAX` saturate.
fn varchar_length(parameter: &str) -> u32 {
    if parameter.is_empty() || !parameter.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    parameter.parse().unwrap_or(u32::MAX)
}

fn resolve_numeric(kinds: &BTreeSet<TypeKind>) -> ResolvedType {
    if kinds.contains(&TypeKind::Double) {
        ResolvedType::Double
    } else if kinds.contains(&TypeKind::Float) || kinds.contains(&TypeKind::Decimal) {
        ResolvedType::Float
    } else {
        ResolvedType::Int
    }
}

fn resolve_temporal(
    tokens: &[TypeToken],
    kinds: &BTreeSet<TypeKind>,
) -> Result<ResolvedType, HintError> {
    let first = &tokens[0].parameter;
    if let Some(other) = tokens.iter().find(|t| &t.parameter != first) {
        return Err(HintError::ConflictingFormats {
            first: first.clone(),
            other: other.parameter.clone(),
        });
    }
    let kind = if kinds.len() == 1 {
        tokens[0].kind.temporal().unwrap_or(TemporalKind::DateTime)
    } else {
        TemporalKind::DateTime
    };
    let format = if first.is_empty() {
        None
    } else {
        Some(first.clone())
    };
    Ok(ResolvedType::Temporal { kind, format })
}
