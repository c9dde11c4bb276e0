use std::fmt::Write as _;

use crate::schema::TableDefinition;

const HEADERS: [&str; 5] = ["column", "hint", "type", "load", "origin"];

/// Renders a column plan as an aligned plain-text table.
///
/// `hints` pairs with the definition's columns; missing entries render empty.
pub fn render_plan(definition: &TableDefinition, hints: &[String]) -> String {
    let rows = definition
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let load = match &column.transform {
                Some(rule) => format!("{} via {}", rule.variable, rule.format),
                None => "direct".to_string(),
            };
            [
                column.name.clone(),
                hints.get(idx).cloned().unwrap_or_default(),
                column.column_type.sql(),
                load,
                column.origin.to_string(),
            ]
        })
        .collect::<Vec<_>>();

    let mut widths = HEADERS.map(display_width);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "table: {}", definition.name);
    let _ = writeln!(output, "{}", format_row(&HEADERS.map(str::to_string), &widths));
    let _ = writeln!(output, "{}", format_row(&widths.map(|w| "-".repeat(w)), &widths));
    for row in &rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cell.replace(['\n', '\r', '\t'], " ");
        line.push_str(&cell);
        line.push_str(&" ".repeat(width.saturating_sub(display_width(&cell))));
    }
    line.trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}
