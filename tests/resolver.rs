use csv2db::{
    hint::{HintError, ResolvedType, resolve},
    schema::{ColumnType, plan_column},
    temporal::TemporalKind,
};
use proptest::prelude::*;

fn canonical(hint: &str) -> Option<String> {
    resolve(hint).ok().map(|resolved| resolved.to_string())
}

#[test]
fn documented_examples_resolve() {
    assert_eq!(canonical("int").as_deref(), Some("int"));
    assert_eq!(canonical("VARCHAR(10)VARCHAR(20)").as_deref(), Some("varchar(20)"));
    assert_eq!(
        canonical("date(%Y-%m-%d)date(%Y-%m-%d)").as_deref(),
        Some("date(%Y-%m-%d)")
    );
    assert_eq!(
        canonical("date(%Y-%m-%d)time(%Y-%m-%d)").as_deref(),
        Some("datetime(%Y-%m-%d)")
    );
    assert_eq!(canonical("int varchar(5)"), None);
    assert_eq!(canonical("garbage text here int"), None);
}

#[test]
fn generator_style_answers_resolve() {
    assert_eq!(resolve("INT"), Ok(ResolvedType::Int));
    assert_eq!(resolve("DECIMAL(10,2)"), Ok(ResolvedType::Float));
    assert_eq!(
        resolve("DATE(%Y%m%d)"),
        Ok(ResolvedType::Temporal {
            kind: TemporalKind::Date,
            format: Some("%Y%m%d".to_string()),
        })
    );
    assert_eq!(
        resolve("TIMESTAMP(%Y-%m-%d %H:%i:%s)"),
        Ok(ResolvedType::Temporal {
            kind: TemporalKind::Timestamp,
            format: Some("%Y-%m-%d %H:%i:%s".to_string()),
        })
    );
    assert!(matches!(resolve("INTEGER"), Err(HintError::StrayText { .. })));
    assert!(matches!(resolve("VARCHAR(20) NOT NULL"), Err(HintError::StrayText { .. })));
}

#[test]
fn consumer_demotes_partial_dates_and_defaults_unresolvable() {
    let month = plan_column(0, "ym", resolve("date(%Y%m)"));
    assert_eq!(month.column_type, ColumnType::Varchar(10));
    let no_year = plan_column(0, "md", resolve("date(%m-%d)"));
    assert_eq!(no_year.column_type, ColumnType::Varchar(10));
    let junk = plan_column(0, "x", resolve("it depends"));
    assert_eq!(junk.column_type, ColumnType::Text);
    let full = plan_column(0, "d", resolve("datetime('%Y-%m-%d')"));
    assert_eq!(full.column_type, ColumnType::Temporal(TemporalKind::DateTime));
}

fn numeric_keyword() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("int"),
        Just("INT"),
        Just("double"),
        Just("Double"),
        Just("float"),
        Just("decimal(8,2)"),
        Just("DECIMAL"),
    ]
}

proptest! {
    #[test]
    fn numeric_priority_ignores_order_and_repetition(
        tokens in prop::collection::vec(numeric_keyword(), 1..8),
        separator in prop_oneof![Just(""), Just(" "), Just("\t")],
    ) {
        let hint = tokens.join(separator);
        let lowered: Vec<String> = tokens.iter().map(|t| t.to_ascii_lowercase()).collect();
        let expected = if lowered.iter().any(|t| t.starts_with("double")) {
            ResolvedType::Double
        } else if lowered.iter().any(|t| t.starts_with("float") || t.starts_with("decimal")) {
            ResolvedType::Float
        } else {
            ResolvedType::Int
        };
        prop_assert_eq!(resolve(&hint), Ok(expected));
    }

    #[test]
    fn varchar_resolves_to_longest(lengths in prop::collection::vec(0u32..5000, 1..6)) {
        let hint = lengths
            .iter()
            .map(|len| format!("varchar({len})"))
            .collect::<Vec<_>>()
            .join(" ");
        let longest = *lengths.iter().max().unwrap();
        prop_assert_eq!(resolve(&hint), Ok(ResolvedType::Varchar(longest)));
    }
}
