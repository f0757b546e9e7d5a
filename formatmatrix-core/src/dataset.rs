//! Dataset model - rows of resolved cell values
//!
//! Cells are resolved once at ingestion into a tagged [`CellValue`], so the
//! aggregator and layout engine never re-inspect raw JSON.
//!
//! Global invariants enforced:
//! - Row column order is the order keys appear in the source file
//! - Column union is derived on demand, never cached on the dataset
//! - Source rows are never mutated after load

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Column holding the modality label in overview rows
pub const MODALITY_COLUMN: &str = "Modality";

/// A single row: column name to resolved cell value, in source order
pub type Row = IndexMap<String, CellValue>;

/// Numeric payload of a metric cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Flag(bool),
    Number(f64),
}

impl Metric {
    /// Numeric view used for percentages and color fractions
    pub fn as_f64(self) -> f64 {
        match self {
            Metric::Flag(true) => 1.0,
            Metric::Flag(false) => 0.0,
            Metric::Number(n) => n,
        }
    }

    /// Display form: `true`/`false` for flags, integers without a fraction
    pub fn display(self) -> String {
        match self {
            Metric::Flag(b) => b.to_string(),
            Metric::Number(n) => format_number(n),
        }
    }

    fn to_json(self) -> Value {
        match self {
            Metric::Flag(b) => Value::Bool(b),
            Metric::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Value::from(n as i64),
            Metric::Number(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

/// Text cell, optionally linking somewhere
#[derive(Debug, Clone, PartialEq)]
pub struct TextCell {
    pub text: String,
    pub url: Option<String>,
}

/// Boolean or numeric cell, optionally linking somewhere
#[derive(Debug, Clone, PartialEq)]
pub struct MetricCell {
    pub value: Metric,
    pub url: Option<String>,
}

/// Resolved cell value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(TextCell),
    Metric(MetricCell),
}

impl CellValue {
    pub fn text(text: impl Into<String>) -> Self {
        CellValue::Text(TextCell {
            text: text.into(),
            url: None,
        })
    }

    pub fn flag(value: bool) -> Self {
        CellValue::Metric(MetricCell {
            value: Metric::Flag(value),
            url: None,
        })
    }

    pub fn number(value: f64) -> Self {
        CellValue::Metric(MetricCell {
            value: Metric::Number(value),
            url: None,
        })
    }

    /// Boolean value, if this cell resolves to one (wrapped or bare)
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            CellValue::Metric(MetricCell {
                value: Metric::Flag(b),
                ..
            }) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(t) => Some(&t.text),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(t) => t.url.as_deref(),
            CellValue::Metric(m) => m.url.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Resolve a raw JSON value into a cell
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::flag(b),
            Value::Number(n) => n.as_f64().map(CellValue::number).unwrap_or_default(),
            Value::String(s) => CellValue::text(s),
            Value::Array(_) => CellValue::text(value.to_string()),
            Value::Object(mut obj) => {
                let url = match obj.remove("url") {
                    Some(Value::String(u)) if !u.is_empty() => Some(u),
                    _ => None,
                };
                match obj.remove("value") {
                    Some(Value::Bool(b)) => CellValue::Metric(MetricCell {
                        value: Metric::Flag(b),
                        url,
                    }),
                    Some(Value::Number(n)) => match n.as_f64() {
                        Some(f) => CellValue::Metric(MetricCell {
                            value: Metric::Number(f),
                            url,
                        }),
                        None => CellValue::Empty,
                    },
                    Some(Value::String(text)) => CellValue::Text(TextCell { text, url }),
                    _ => CellValue::Empty,
                }
            }
        }
    }

    /// Raw value as written into the `data-value` attribute
    pub fn raw_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(t) => t.text.clone(),
            CellValue::Metric(m) => m.value.display(),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(CellValue::from_json)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (value, url) = match self {
            CellValue::Empty => return serializer.serialize_none(),
            CellValue::Text(t) => (Value::String(t.text.clone()), t.url.as_deref()),
            CellValue::Metric(m) => (m.value.to_json(), m.url.as_deref()),
        };
        match url {
            None => value.serialize(serializer),
            Some(url) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("value", &value)?;
                map.serialize_entry("url", url)?;
                map.end()
            }
        }
    }
}

/// True-count and denominator for one (modality, column) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub value: u64,
    pub total: u64,
}

/// Totals map: modality label -> column -> tally
pub type TotalsMap = IndexMap<String, IndexMap<String, Tally>>;

/// An ordered sequence of rows plus optional per-modality totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    pub rows: Vec<Row>,
    #[serde(skip)]
    pub totals: Option<TotalsMap>,
    /// Explicit column order; when absent the union of row keys is used
    #[serde(skip)]
    pub column_hint: Option<Vec<String>>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            totals: None,
            column_hint: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names: the explicit hint if set, else the union of all row keys
    /// in first-seen order
    pub fn columns(&self) -> Vec<String> {
        if let Some(hint) = &self.column_hint {
            return hint.clone();
        }
        let mut seen: IndexMap<&str, ()> = IndexMap::new();
        for row in &self.rows {
            for key in row.keys() {
                seen.entry(key.as_str()).or_insert(());
            }
        }
        seen.into_keys().map(str::to_string).collect()
    }

    /// Tally for a (modality, column) pair, if totals are attached
    pub fn tally(&self, modality: &str, column: &str) -> Option<Tally> {
        self.totals
            .as_ref()
            .and_then(|t| t.get(modality))
            .and_then(|cols| cols.get(column))
            .copied()
    }

    /// Parse a dataset from a JSON array of row objects
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: Vec<Value> = serde_json::from_str(content)
            .context("dataset must be a JSON array")?;
        let mut rows = Vec::with_capacity(raw.len());
        for (i, value) in raw.into_iter().enumerate() {
            match value {
                Value::Object(obj) => {
                    let row: Row = obj
                        .into_iter()
                        .map(|(k, v)| (k, CellValue::from_json(v)))
                        .collect();
                    rows.push(row);
                }
                other => anyhow::bail!(
                    "row {} must be a JSON object (got {})",
                    i,
                    json_kind(&other)
                ),
            }
        }
        Ok(Self::new(rows))
    }

    /// Load a dataset from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("failed to parse dataset: {}", path.display()))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Format a number the way the page shows it: integral values without a
/// trailing `.0`
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
