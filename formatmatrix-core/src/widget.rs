//! Matrix widget - one tabbed compatibility table
//!
//! All state is owned by the widget instance: the filtered tables, the
//! Overview built from them, and the active tab. Nothing is global, so
//! several widgets can coexist.

use crate::aggregate::{build_overview, default_associations, Association};
use crate::dataset::Dataset;
use crate::layout::{layout_table, LayoutOptions, TableLayout};
use crate::registry::{ModalityEntry, Registry};
use crate::tabs::{TabController, TabInfo, OVERVIEW_LABEL, OVERVIEW_TAB_ID};
use anyhow::Result;
use tracing::{debug, info};

/// Columns pinned on modality tabs
pub const DEFAULT_STICKY_COLUMNS: usize = 3;

/// Columns pinned on the Overview tab
pub const OVERVIEW_STICKY_COLUMNS: usize = 1;

pub const DEFAULT_TITLE: &str = "NWB Format Support";

/// Presentation settings for a widget
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSettings {
    pub layout: LayoutOptions,
    pub associations: Vec<Association>,
    /// Sticky column count for every tab except the Overview
    pub sticky_columns: usize,
    /// Page title for the rendered document
    pub title: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            layout: LayoutOptions::default(),
            associations: default_associations(),
            sticky_columns: DEFAULT_STICKY_COLUMNS,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

/// Everything needed to build a widget
#[derive(Debug, Clone)]
pub struct WidgetOptions {
    pub registry: Registry,
    /// Modality keywords; empty shows every modality
    pub filter: Vec<String>,
    /// Initially active tab id
    pub tab: String,
    pub settings: WidgetSettings,
}

impl WidgetOptions {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            filter: Vec::new(),
            tab: OVERVIEW_TAB_ID.to_string(),
            settings: WidgetSettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatrixWidget {
    /// Overview first, then the filtered modalities in registry order
    tables: Vec<ModalityEntry>,
    tabs: TabController,
    settings: WidgetSettings,
}

impl MatrixWidget {
    /// Filter the registry, build the Overview once, and pick the initial tab
    pub fn new(options: WidgetOptions) -> Result<Self> {
        let WidgetOptions {
            registry,
            filter,
            tab,
            settings,
        } = options;

        let modalities = registry.filter(&filter);
        let overview = build_overview(&modalities, &settings.associations);
        debug!(
            modalities = modalities.len(),
            overview_rows = overview.len(),
            "built overview"
        );

        let mut tables = Vec::with_capacity(modalities.len() + 1);
        let overview = ModalityEntry::new(OVERVIEW_TAB_ID, OVERVIEW_LABEL, overview, &[]);
        tables.push(overview);
        tables.extend(modalities);

        let tabs = TabController::new(
            tables
                .iter()
                .map(|t| TabInfo::new(&t.id, &t.modality))
                .collect(),
            &tab,
        )?;

        Ok(Self {
            tables,
            tabs,
            settings,
        })
    }

    pub fn tables(&self) -> &[ModalityEntry] {
        &self.tables
    }

    pub fn settings(&self) -> &WidgetSettings {
        &self.settings
    }

    pub fn tab_controller(&self) -> &TabController {
        &self.tabs
    }

    pub fn overview(&self) -> &Dataset {
        &self.tables[0].dataset
    }

    pub fn table(&self, id: &str) -> Option<&ModalityEntry> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn active(&self) -> &ModalityEntry {
        let id = &self.tabs.active().id;
        self.table(id).unwrap_or(&self.tables[0])
    }

    /// Switch tabs and lay out the newly active table
    pub fn select(&mut self, id: &str) -> TableLayout {
        self.tabs.select(id);
        self.active_layout()
    }

    pub fn sticky_columns_for(&self, id: &str) -> usize {
        if id == OVERVIEW_TAB_ID {
            OVERVIEW_STICKY_COLUMNS
        } else {
            self.settings.sticky_columns
        }
    }

    pub fn layout(&self, id: &str) -> Option<TableLayout> {
        self.table(id).map(|t| self.layout_entry(t))
    }

    pub fn active_layout(&self) -> TableLayout {
        let entry = self.active();
        info!(tab = %entry.id, rows = entry.dataset.len(), "creating table");
        self.layout_entry(entry)
    }

    fn layout_entry(&self, entry: &ModalityEntry) -> TableLayout {
        layout_table(
            &entry.dataset,
            &self.settings.layout,
            self.sticky_columns_for(&entry.id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        let rec = Dataset::from_json_str(
            r#"[{"Format": "Intan", "Versions": "RHD",
                 "NeuroConv - Interface": true, "NWB GUIDE": true},
                {"Format": "Plexon", "NeuroConv - Interface": false, "NWB GUIDE": false}]"#,
        )
        .unwrap();
        let beh_json = r#"[{"Format": "DeepLabCut", "NeuroConv - Interface": true}]"#;
        let beh = Dataset::from_json_str(beh_json).unwrap();
        let ecephys = &["ecephys", "recording"];
        Registry::new(vec![
            ModalityEntry::new("ecepys-recording", "Ecephys - Recording", rec, ecephys),
            ModalityEntry::new("behavior", "Behavior", beh, &["behavior"]),
        ])
    }

    #[test]
    fn test_overview_is_first_tab() {
        let widget = MatrixWidget::new(WidgetOptions::new(registry())).unwrap();
        let ids: Vec<&str> = widget.tables().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["overview", "ecepys-recording", "behavior"]);
        assert_eq!(widget.active().id, OVERVIEW_TAB_ID);
    }

    #[test]
    fn test_filter_limits_tables() {
        let mut options = WidgetOptions::new(registry());
        options.filter = vec!["behavior".to_string()];
        let widget = MatrixWidget::new(options).unwrap();
        assert_eq!(widget.tables().len(), 2);
        // Overview row for Behavior plus the Total row
        assert_eq!(widget.overview().len(), 2);
    }

    #[test]
    fn test_unknown_initial_tab_falls_back() {
        let mut options = WidgetOptions::new(registry());
        options.tab = "missing".to_string();
        let widget = MatrixWidget::new(options).unwrap();
        assert_eq!(widget.active().id, OVERVIEW_TAB_ID);
    }

    #[test]
    fn test_select_switches_layout() {
        let mut widget = MatrixWidget::new(WidgetOptions::new(registry())).unwrap();
        let layout = widget.select("ecepys-recording");
        assert_eq!(widget.active().id, "ecepys-recording");
        assert_eq!(layout.sticky_columns, DEFAULT_STICKY_COLUMNS);
        assert!(layout.header.iter().all(|h| h.label != "Versions"));

        let layout = widget.select(OVERVIEW_TAB_ID);
        assert_eq!(layout.sticky_columns, OVERVIEW_STICKY_COLUMNS);
    }

    #[test]
    fn test_repeated_layout_is_stable() {
        let mut widget = MatrixWidget::new(WidgetOptions::new(registry())).unwrap();
        let first = widget.select("ecepys-recording");
        widget.select(OVERVIEW_TAB_ID);
        let second = widget.select("ecepys-recording");
        assert_eq!(first, second);
    }
}
