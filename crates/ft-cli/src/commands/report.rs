//! Report command for aggregated usage.
//!
//! This module implements `ft report`, which groups every loaded record by
//! the requested dimensions and lists the totals, longest first.

use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;

use ft_core::{Aggregation, Grouper, Tracker};

use super::format_duration;

const COLUMN_GAP: &str = "  ";

/// Runs the report command. Groups by category when `group_by` is empty.
pub fn run<W: Write>(
    writer: &mut W,
    tracker: &Tracker,
    group_by: &[String],
    filters: &HashMap<String, String>,
    json: bool,
) -> Result<()> {
    let groupers = if group_by.is_empty() {
        vec![Grouper::Category.as_str().to_string()]
    } else {
        group_by.to_vec()
    };

    let mut rows = tracker.get_aggregations(&groupers, filters)?;
    rows.sort_by(|a, b| b.duration.cmp(&a.duration));

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&rows)?)?;
    } else {
        write!(writer, "{}", format_report(&rows, &groupers))?;
    }
    Ok(())
}

/// Formats aggregations as an aligned table with a total line.
pub fn format_report(rows: &[Aggregation], groupers: &[String]) -> String {
    if rows.is_empty() {
        return "No activity recorded.\n".to_string();
    }

    let header: Vec<String> = groupers
        .iter()
        .map(|g| g.to_uppercase())
        .chain(std::iter::once("TIME".to_string()))
        .collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            groupers
                .iter()
                .map(|g| row.groupers.get(g).map(ToString::to_string).unwrap_or_default())
                .chain(std::iter::once(format_duration(row.duration)))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            std::iter::once(&header)
                .chain(&body)
                .map(|cells| cells[col].chars().count())
                .max()
                .unwrap_or_default()
        })
        .collect();

    let mut lines: Vec<String> = std::iter::once(&header)
        .chain(&body)
        .map(|cells| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join(COLUMN_GAP)
                .trim_end()
                .to_string()
        })
        .collect();

    let total: i64 = rows.iter().map(|row| row.duration).sum();
    lines.push(String::new());
    lines.push(format!("Total: {}", format_duration(total)));

    let mut output = lines.join("\n");
    output.push('\n');
    output
}
