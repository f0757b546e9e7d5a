//! Overview aggregation - per-modality coverage of boolean columns
//!
//! Global invariants enforced:
//! - Aggregates are strictly derived from the registry entries
//! - Overview columns are ordered by first sighting across modalities
//! - The Total row is always last
//! - Association overrides only ever replace a `total`, never a `value`

use crate::dataset::{CellValue, Dataset, Row, Tally, TotalsMap, MODALITY_COLUMN};
use crate::registry::ModalityEntry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Overview column holding each modality's row count
pub const KNOWN_FORMATS_COLUMN: &str = "Known Formats";

/// Label of the summary row and its totals entry
pub const TOTAL_LABEL: &str = "Total";

/// Redefines `target`'s denominator as `source`'s true-count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Association {
    pub target: String,
    pub source: String,
}

impl Association {
    pub fn new(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
        }
    }
}

/// GUIDE coverage is measured against formats NeuroConv can read, and
/// SpikeInterface extractor coverage against formats Neo can read.
pub fn default_associations() -> Vec<Association> {
    vec![
        Association::new("NWB GUIDE", "NeuroConv - Interface"),
        Association::new("SpikeInterface - Extractor", "Neo - Raw IO"),
    ]
}

/// Build the Overview dataset from the (already filtered) entries.
///
/// The returned dataset carries its totals map and an explicit column order
/// of `Modality`, every boolean column in first-seen order, then
/// `Known Formats`.
pub fn build_overview(entries: &[ModalityEntry], associations: &[Association]) -> Dataset {
    let mut overview_columns = vec![MODALITY_COLUMN.to_string()];
    let mut totals = TotalsMap::new();
    let mut rows = Vec::with_capacity(entries.len() + 1);

    for entry in entries {
        let tallies = totals.entry(entry.modality.clone()).or_default();
        count_flags(&entry.dataset, tallies, &mut overview_columns);

        let mut row = Row::new();
        row.insert(
            MODALITY_COLUMN.to_string(),
            CellValue::text(&entry.modality),
        );
        row.insert(
            KNOWN_FORMATS_COLUMN.to_string(),
            CellValue::number(entry.dataset.len() as f64),
        );
        for (column, tally) in tallies.iter() {
            row.insert(column.clone(), CellValue::number(tally.value as f64));
        }
        rows.push(row);
    }

    apply_associations(&mut totals, associations);

    let known_formats: usize = entries.iter().map(|e| e.dataset.len()).sum();
    let column_totals = sum_columns(&totals);

    let mut total_row = Row::new();
    total_row.insert(MODALITY_COLUMN.to_string(), CellValue::text(TOTAL_LABEL));
    total_row.insert(
        KNOWN_FORMATS_COLUMN.to_string(),
        CellValue::number(known_formats as f64),
    );
    for (column, tally) in &column_totals {
        total_row.insert(column.clone(), CellValue::number(tally.value as f64));
    }
    rows.push(total_row);
    totals.insert(TOTAL_LABEL.to_string(), column_totals);

    overview_columns.push(KNOWN_FORMATS_COLUMN.to_string());

    Dataset {
        rows,
        totals: Some(totals),
        column_hint: Some(overview_columns),
    }
}

/// Count true values and rows for every boolean column of one dataset
fn count_flags(
    dataset: &Dataset,
    tallies: &mut IndexMap<String, Tally>,
    overview_columns: &mut Vec<String>,
) {
    for row in &dataset.rows {
        for (column, cell) in row {
            if let Some(flag) = cell.as_flag() {
                if !overview_columns.contains(column) {
                    overview_columns.push(column.clone());
                }
                let tally = tallies.entry(column.clone()).or_default();
                tally.total += 1;
                if flag {
                    tally.value += 1;
                }
            }
        }
    }
}

fn apply_associations(totals: &mut TotalsMap, associations: &[Association]) {
    for tallies in totals.values_mut() {
        for assoc in associations {
            let source = tallies.get(&assoc.source).map(|t| t.value);
            if let (Some(value), Some(target)) = (source, tallies.get_mut(&assoc.target)) {
                target.total = value;
            }
        }
    }
}

fn sum_columns(totals: &TotalsMap) -> IndexMap<String, Tally> {
    let mut summed: IndexMap<String, Tally> = IndexMap::new();
    for tallies in totals.values() {
        for (column, tally) in tallies {
            let entry = summed.entry(column.clone()).or_default();
            entry.value += tally.value;
            entry.total += tally.total;
        }
    }
    summed
}
