//! Tab controller - which table is active, mirrored into `?tab=`
//!
//! Exactly one tab is active at any time. Unknown ids never fail; they fall
//! back to the first tab (the Overview) with a warning.

use anyhow::Result;
use std::borrow::Cow;
use tracing::warn;

/// Id of the synthesized Overview tab
pub const OVERVIEW_TAB_ID: &str = "overview";

/// Label of the synthesized Overview tab
pub const OVERVIEW_LABEL: &str = "Overview";

/// Query parameter carrying the active tab id
pub const TAB_QUERY_PARAM: &str = "tab";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: String,
    pub label: String,
}

impl TabInfo {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A tab control as it should be drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabState {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabController {
    tabs: Vec<TabInfo>,
    active: usize,
}

impl TabController {
    /// Create a controller with `requested` active, falling back to the
    /// first tab if it is unknown
    pub fn new(tabs: Vec<TabInfo>, requested: &str) -> Result<Self> {
        if tabs.is_empty() {
            anyhow::bail!("at least one tab is required");
        }
        let mut controller = Self { tabs, active: 0 };
        controller.select(requested);
        Ok(controller)
    }

    pub fn tabs(&self) -> &[TabInfo] {
        &self.tabs
    }

    pub fn active(&self) -> &TabInfo {
        &self.tabs[self.active]
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }

    /// Activate `id`; unknown ids select the first tab
    pub fn select(&mut self, id: &str) -> &TabInfo {
        self.active = match self.position(id) {
            Some(i) => i,
            None => {
                warn!(tab = id, fallback = %self.tabs[0].id, "no table found for tab");
                0
            }
        };
        self.active()
    }

    /// Every tab with its selection mark; exactly one is selected
    pub fn tab_states(&self) -> Vec<TabState> {
        self.tabs
            .iter()
            .enumerate()
            .map(|(i, t)| TabState {
                id: t.id.clone(),
                label: t.label.clone(),
                selected: i == self.active,
            })
            .collect()
    }

    /// `query` with `tab` set to the active id; other parameters untouched
    pub fn sync_query(&self, query: &str) -> String {
        set_query_param(query, TAB_QUERY_PARAM, &self.active().id)
    }
}

/// Initial tab id from a URL query string, or `default` if absent
pub fn initial_tab_from_query(query: &str, default: &str) -> String {
    query_pairs(query)
        .find(|(k, _)| k == TAB_QUERY_PARAM)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Set `key=value` in a query string.
///
/// The first existing `key` pair is replaced in place and later duplicates
/// are dropped; if `key` is absent the pair is appended. Every other pair is
/// kept verbatim. A leading `?` is accepted and not emitted.
pub fn set_query_param(query: &str, key: &str, value: &str) -> String {
    let (k, v) = (urlencoding::encode(key), urlencoding::encode(value));
    let encoded = format!("{}={}", k, v);
    let mut pieces: Vec<Cow<'_, str>> = Vec::new();
    let mut replaced = false;

    for piece in raw_pieces(query) {
        let (raw_key, _) = piece.split_once('=').unwrap_or((piece, ""));
        if decode_component(raw_key) == key {
            if !replaced {
                pieces.push(Cow::Owned(encoded.clone()));
                replaced = true;
            }
        } else {
            pieces.push(Cow::Borrowed(piece));
        }
    }
    if !replaced {
        pieces.push(Cow::Owned(encoded));
    }
    pieces.join("&")
}

fn raw_pieces(query: &str) -> impl Iterator<Item = &str> {
    query
        .strip_prefix('?')
        .unwrap_or(query)
        .split('&')
        .filter(|p| !p.is_empty())
}

fn query_pairs(query: &str) -> impl Iterator<Item = (String, Cow<'_, str>)> {
    raw_pieces(query).map(|piece| {
        let (k, v) = piece.split_once('=').unwrap_or((piece, ""));
        (decode_component(k).into_owned(), decode_component(v))
    })
}

/// Decode a form-encoded component; malformed input is returned as-is
fn decode_component(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['+', '%']) {
        return Cow::Borrowed(raw);
    }
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Owned(spaced),
    }
}
