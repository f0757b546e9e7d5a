//! Table layout - pure header/row model for one dataset
//!
//! Derives merged two-level headers from delimited column names, orders
//! columns by priority, and resolves every cell into a [`RenderedCell`].
//! Nothing here produces markup; `html.rs` is the only consumer that does.
//!
//! Global invariants enforced:
//! - Source rows are never mutated (the Format/Versions fold is derived)
//! - The subtitle row lines up with the data cells, group by group
//! - Identical input yields an identical layout

use crate::aggregate::KNOWN_FORMATS_COLUMN;
use crate::color::fraction_to_color;
use crate::dataset::{CellValue, Dataset, Metric, Row, Tally, TextCell, MODALITY_COLUMN};
use std::borrow::Cow;
use std::collections::HashMap;

/// Separator between a column's title and subtitle, and within text cells
pub const DEFAULT_DELIMITER: &str = " - ";

/// Background opacity for coverage colors
pub const DEFAULT_CELL_OPACITY: f64 = 0.4;

pub const FORMAT_COLUMN: &str = "Format";
pub const VERSIONS_COLUMN: &str = "Versions";

/// Column titles in display order; unlisted titles follow in source order
pub fn default_column_order() -> Vec<String> {
    [
        MODALITY_COLUMN,
        KNOWN_FORMATS_COLUMN,
        FORMAT_COLUMN,
        "Suffixes",
        "Example Data",
        "Neo",
        "SpikeInterface",
        "ROIExtractors",
        "NeuroConv",
        "NWB GUIDE",
        "Status",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Layout knobs shared by every tab
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub column_order: Vec<String>,
    pub delimiter: String,
    pub cell_opacity: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            column_order: default_column_order(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            cell_opacity: DEFAULT_CELL_OPACITY,
        }
    }
}

/// One cell of the top header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub label: String,
    pub colspan: usize,
    pub rowspan: usize,
    pub sticky: bool,
}

/// Visible content of a data cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Empty,
    Text {
        title: String,
        subtitle: Option<String>,
    },
    Metric {
        value: String,
        /// e.g. `"66.7%"`; absent without a non-zero value and total
        percent: Option<String>,
    },
}

/// A fully resolved data cell
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCell {
    pub content: CellContent,
    /// `#RRGGBBAA` coverage color
    pub background: Option<String>,
    /// Opened in a new browsing context when the cell is activated
    pub url: Option<String>,
    /// Raw value, written to `data-value`
    pub raw: String,
    pub sticky: bool,
}

/// Complete layout for one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub header: Vec<HeaderCell>,
    /// Second header row; empty when no column has a subtitle
    pub subheader: Vec<String>,
    pub rows: Vec<Vec<RenderedCell>>,
    pub sticky_columns: usize,
}

impl TableLayout {
    pub fn header_rows(&self) -> usize {
        if self.subheader.is_empty() {
            1
        } else {
            2
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum HeaderGroup {
    Single(String),
    Nested {
        title: String,
        /// (full column name, subtitle)
        columns: Vec<(String, String)>,
    },
}

impl HeaderGroup {
    fn columns(&self) -> Vec<&str> {
        match self {
            HeaderGroup::Single(c) => vec![c.as_str()],
            HeaderGroup::Nested { columns, .. } => {
                columns.iter().map(|(c, _)| c.as_str()).collect()
            }
        }
    }
}

/// Split `s` at the first delimiter into (title, subtitle)
pub fn split_title<'a>(s: &'a str, delimiter: &str) -> (&'a str, Option<&'a str>) {
    match s.split_once(delimiter) {
        Some((title, subtitle)) => (title, Some(subtitle)),
        None => (s, None),
    }
}

/// Stable sort of columns by the priority of their title
pub fn order_columns(
    mut columns: Vec<String>,
    priority: &[String],
    delimiter: &str,
) -> Vec<String> {
    columns.sort_by_key(|c| {
        let (title, _) = split_title(c, delimiter);
        priority
            .iter()
            .position(|p| p == title)
            .unwrap_or(usize::MAX)
    });
    columns
}

fn group_columns(columns: &[String], delimiter: &str) -> Vec<HeaderGroup> {
    let mut groups: Vec<HeaderGroup> = Vec::new();
    let mut nested_at: HashMap<&str, usize> = HashMap::new();

    for column in columns {
        match split_title(column, delimiter) {
            (title, Some(subtitle)) => {
                if let Some(&i) = nested_at.get(title) {
                    if let HeaderGroup::Nested { columns, .. } = &mut groups[i] {
                        columns.push((column.clone(), subtitle.to_string()));
                    }
                } else {
                    nested_at.insert(title, groups.len());
                    groups.push(HeaderGroup::Nested {
                        title: title.to_string(),
                        columns: vec![(column.clone(), subtitle.to_string())],
                    });
                }
            }
            (_, None) => groups.push(HeaderGroup::Single(column.clone())),
        }
    }
    groups
}

/// Format cell with the row's Versions appended as its subtitle
fn folded_format<'a>(row: &'a Row, delimiter: &str) -> Cow<'a, CellValue> {
    let format = row.get(FORMAT_COLUMN);
    let versions = row
        .get(VERSIONS_COLUMN)
        .map(CellValue::raw_display)
        .filter(|v| !v.is_empty());

    match (format, versions) {
        (Some(CellValue::Text(t)), Some(versions)) => {
            let suffix = format!("{}{}", delimiter, versions);
            if t.text.ends_with(&suffix) {
                return Cow::Borrowed(&row[FORMAT_COLUMN]);
            }
            Cow::Owned(CellValue::Text(TextCell {
                text: format!("{}{}", t.text, suffix),
                url: t.url.clone(),
            }))
        }
        (Some(cell), _) => Cow::Borrowed(cell),
        (None, _) => Cow::Owned(CellValue::Empty),
    }
}

/// Resolve one cell against its (optional) tally
pub fn render_cell(
    cell: &CellValue,
    tally: Option<Tally>,
    options: &LayoutOptions,
    sticky: bool,
) -> RenderedCell {
    match cell {
        CellValue::Empty => RenderedCell {
            content: CellContent::Empty,
            background: None,
            url: None,
            raw: String::new(),
            sticky,
        },
        CellValue::Text(t) => {
            let (title, subtitle) = split_title(&t.text, &options.delimiter);
            RenderedCell {
                content: CellContent::Text {
                    title: title.to_string(),
                    subtitle: subtitle.map(str::to_string),
                },
                background: None,
                url: t.url.clone(),
                raw: t.text.clone(),
                sticky,
            }
        }
        CellValue::Metric(m) => {
            let value = m.value.as_f64();
            let total = tally.map(|t| t.total as f64);

            let percent = match total {
                Some(total) if value != 0.0 && total != 0.0 => Some(format_percent(value, total)),
                _ => None,
            };

            // A bare flag is its own fraction of one
            let color_total = total.or(match m.value {
                Metric::Flag(_) => Some(1.0),
                Metric::Number(_) => None,
            });
            let background = color_total
                .filter(|t| *t != 0.0)
                .map(|t| fraction_to_color(value / t, options.cell_opacity));

            RenderedCell {
                content: CellContent::Metric {
                    value: m.value.display(),
                    percent,
                },
                background,
                url: m.url.clone(),
                raw: m.value.display(),
                sticky,
            }
        }
    }
}

/// `100 * value / total` to one decimal, rounding halves up
fn format_percent(value: f64, total: f64) -> String {
    let pct = 100.0 * value / total;
    format!("{:.1}%", (pct * 10.0).round() / 10.0)
}

/// Lay out a dataset, pinning the first `sticky_columns` columns
pub fn layout_table(
    dataset: &Dataset,
    options: &LayoutOptions,
    sticky_columns: usize,
) -> TableLayout {
    let priority = &options.column_order;
    let mut columns = order_columns(dataset.columns(), priority, &options.delimiter);

    let fold_versions = columns.iter().any(|c| c == FORMAT_COLUMN)
        && columns.iter().any(|c| c == VERSIONS_COLUMN);
    if fold_versions {
        columns.retain(|c| c != VERSIONS_COLUMN);
    }

    let groups = group_columns(&columns, &options.delimiter);
    let nested = groups
        .iter()
        .any(|g| matches!(g, HeaderGroup::Nested { .. }));
    let header_rows = if nested { 2 } else { 1 };

    let header = groups
        .iter()
        .enumerate()
        .map(|(i, group)| match group {
            HeaderGroup::Single(column) => HeaderCell {
                label: column.clone(),
                colspan: 1,
                rowspan: header_rows,
                sticky: i < sticky_columns,
            },
            HeaderGroup::Nested { title, columns } => HeaderCell {
                label: title.clone(),
                colspan: columns.len(),
                rowspan: 1,
                sticky: i < sticky_columns,
            },
        })
        .collect();

    let subheader = groups
        .iter()
        .flat_map(|g| match g {
            HeaderGroup::Single(_) => Vec::new(),
            HeaderGroup::Nested { columns, .. } => {
                columns.iter().map(|(_, s)| s.clone()).collect()
            }
        })
        .collect();

    let ordered: Vec<&str> = groups.iter().flat_map(HeaderGroup::columns).collect();

    let rows = dataset
        .rows
        .iter()
        .map(|row| {
            let modality = row.get(MODALITY_COLUMN).and_then(CellValue::as_text);
            ordered
                .iter()
                .enumerate()
                .map(|(i, &column)| {
                    let cell = if fold_versions && column == FORMAT_COLUMN {
                        folded_format(row, &options.delimiter)
                    } else {
                        row.get(column)
                            .map(Cow::Borrowed)
                            .unwrap_or(Cow::Owned(CellValue::Empty))
                    };
                    let tally = modality.and_then(|m| dataset.tally(m, column));
                    render_cell(&cell, tally, options, i < sticky_columns)
                })
                .collect()
        })
        .collect();

    TableLayout {
        header,
        subheader,
        rows,
        sticky_columns,
    }
}
