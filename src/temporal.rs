//! Date/time format handling shared by hint resolution and the bulk loader.
//!
//! Hints carry MySQL `STR_TO_DATE` patterns (`%Y-%m-%d`, `%Y%m%d`, ...). This
//! module normalizes those patterns, decides whether they pin down a full
//! calendar date, renders the load-time transform expression, and translates
//! them to chrono patterns so sampled values can be checked locally.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalKind {
    Date,
    DateTime,
    Time,
    Timestamp,
}

impl TemporalKind {
    pub fn sql_name(self) -> &'static str {
        match self {
            TemporalKind::Date => "date",
            TemporalKind::DateTime => "datetime",
            TemporalKind::Time => "time",
            TemporalKind::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for TemporalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// Strips surrounding whitespace and one layer of matching quotes.
pub fn normalize_format(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ['\'', '"'] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].trim().to_string();
        }
    }
    trimmed.to_string()
}

fn specifiers(format: &str) -> impl Iterator<Item = char> + '_ {
    let mut chars = format.chars();
    std::iter::from_fn(move || {
        loop {
            match chars.next()? {
                '%' => return chars.next(),
                _ => continue,
            }
        }
    })
}

/// True when the pattern names a year, a month and a day.
///
/// Partial dates such as `%Y%m` cannot be parsed into a DATE column, so
/// callers demote those columns to bounded text.
pub fn has_full_date(format: &str) -> bool {
    let mut year = false;
    let mut month = false;
    let mut day = false;
    for spec in specifiers(format) {
        match spec {
            'Y' | 'y' => year = true,
            'm' | 'c' | 'b' | 'M' => month = true,
            'd' | 'e' => day = true,
            _ => {}
        }
    }
    year && month && day
}

/// Renders a single-quoted SQL literal, escaping quotes, backslashes and control characters.
pub fn quote_sql_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// `STR_TO_DATE(@staged, 'format')`
pub fn str_to_date_expr(variable: &str, format: &str) -> String {
    format!("STR_TO_DATE({variable}, {})", quote_sql_string(format))
}

/// Translates a MySQL date pattern into a chrono pattern.
///
/// Returns `None` when the pattern uses a specifier chrono has no equivalent for.
pub fn to_chrono_format(format: &str) -> Option<String> {
    let mut out = String::with_capacity(format.len() + 4);
    let mut chars = format.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        let mapped = match chars.next()? {
            'Y' => "%Y",
            'y' => "%y",
            'm' | 'c' => "%m",
            'd' | 'e' => "%d",
            'H' | 'k' => "%H",
            'h' | 'I' | 'l' => "%I",
            'i' => "%M",
            's' | 'S' => "%S",
            'p' => "%p",
            'b' => "%b",
            'M' => "%B",
            'a' => "%a",
            'W' => "%A",
            'j' => "%j",
            'f' => "%6f",
            'T' => "%H:%M:%S",
            'r' => "%I:%M:%S %p",
            '%' => "%%",
            _ => return None,
        };
        out.push_str(mapped);
    }
    Some(out)
}

/// Counts non-empty values the pattern parses, returned as `(matched, considered)`.
///
/// Diagnostic only; a low ratio is logged but never changes the column type.
pub fn sample_match_count(kind: TemporalKind, format: &str, values: &[String]) -> (usize, usize) {
    let Some(pattern) = to_chrono_format(format) else {
        return (0, 0);
    };
    let mut matched = 0usize;
    let mut considered = 0usize;
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        considered += 1;
        let parses = match kind {
            TemporalKind::Time => NaiveTime::parse_from_str(value, &pattern).is_ok(),
            _ => {
                NaiveDateTime::parse_from_str(value, &pattern).is_ok()
                    || NaiveDate::parse_from_str(value, &pattern).is_ok()
            }
        };
        if parses {
            matched += 1;
        }
    }
    (matched, considered)
}
