//! Overview output for the terminal
//!
//! Global invariants enforced:
//! - Column order matches the HTML table
//! - Byte-for-byte identical output across runs

use crate::dataset::{Dataset, Row, TotalsMap};
use crate::layout::{layout_table, CellContent, LayoutOptions, RenderedCell, TableLayout};
use serde::Serialize;

const FIRST_COLUMN_WIDTH: usize = 24;
const COLUMN_WIDTH: usize = 16;

/// JSON shape of the Overview
#[derive(Debug, Serialize)]
pub struct OverviewReport<'a> {
    pub columns: Vec<String>,
    pub rows: &'a [Row],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<&'a TotalsMap>,
}

/// Flattened column labels, `Title - subtitle` for nested columns
pub fn flat_labels(layout: &TableLayout, delimiter: &str) -> Vec<String> {
    let mut subtitles = layout.subheader.iter();
    let mut labels = Vec::new();
    for cell in &layout.header {
        if layout.header_rows() == 2 && cell.rowspan == 1 {
            for sub in subtitles.by_ref().take(cell.colspan) {
                labels.push(format!("{}{}{}", cell.label, delimiter, sub));
            }
        } else {
            labels.push(cell.label.clone());
        }
    }
    labels
}

/// Render the Overview as an aligned text table
pub fn render_text(overview: &Dataset, options: &LayoutOptions) -> String {
    let layout = layout_table(overview, options, 0);
    let labels = flat_labels(&layout, &options.delimiter);

    let mut output = String::new();
    output.push_str(&render_line(labels.iter().map(String::as_str)));
    output.push('\n');

    for row in &layout.rows {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        output.push_str(&render_line(cells.iter().map(String::as_str)));
        output.push('\n');
    }
    output
}

/// Render the Overview as pretty JSON: columns, rows and totals
pub fn render_json(overview: &Dataset) -> String {
    let report = OverviewReport {
        columns: overview.columns(),
        rows: &overview.rows,
        totals: overview.totals.as_ref(),
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}

fn render_line<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells
        .enumerate()
        .map(|(i, c)| {
            let width = if i == 0 { FIRST_COLUMN_WIDTH } else { COLUMN_WIDTH };
            truncate_or_pad(c, width)
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end()
        .to_string()
}

fn cell_text(cell: &RenderedCell) -> String {
    match &cell.content {
        CellContent::Empty => "-".to_string(),
        CellContent::Text { .. } => cell.raw.clone(),
        CellContent::Metric { value, percent } => match percent {
            Some(pct) => format!("{} ({})", value, pct),
            None => value.clone(),
        },
    }
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::build_overview;
    use crate::registry::ModalityEntry;

    fn overview() -> Dataset {
        let ds = Dataset::from_json_str(
            r#"[{"Format": "Intan", "NeuroConv - Interface": true},
                {"Format": "Plexon", "NeuroConv - Interface": false}]"#,
        )
        .unwrap();
        let entry = ModalityEntry::new("rec", "Ecephys - Recording", ds, &[]);
        build_overview(&[entry], &[])
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&overview(), &LayoutOptions::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Modality"));
        assert!(lines[0].contains("Known Formats"));
        assert!(lines[0].contains("NeuroConv - I..."));
        assert!(lines[1].starts_with("Ecephys - Recording"));
        assert!(lines[1].contains("1 (50.0%)"));
        assert!(lines[2].starts_with("Total"));
    }

    #[test]
    fn test_render_json() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&overview())).unwrap();
        assert_eq!(json["columns"][0], "Modality");
        assert_eq!(json["rows"][0]["Known Formats"], 2);
        let total = &json["totals"]["Total"]["NeuroConv - Interface"];
        assert_eq!(total["value"], 1);
        assert_eq!(total["total"], 2);
    }

    #[test]
    fn test_truncate_or_pad() {
        assert_eq!(truncate_or_pad("abc", 5), "abc  ");
        assert_eq!(truncate_or_pad("abcdefgh", 6), "abc...");
    }
}
