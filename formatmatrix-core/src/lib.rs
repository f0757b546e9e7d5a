//! formatmatrix core library - data-format support matrix as a tabbed HTML page

#![deny(warnings)]

// Global invariants enforced in this crate:
// - No global mutable state; every widget owns its tables and active tab
// - No randomness, clocks, threads, or async
// - Deterministic traversal order must be explicit
// - Source datasets are never mutated after load
// - Identical input yields byte-for-byte identical output

pub mod aggregate;
pub mod color;
pub mod config;
pub mod dataset;
pub mod html;
pub mod layout;
pub mod registry;
pub mod report;
pub mod tabs;
pub mod widget;

pub use color::fraction_to_color;
pub use config::ResolvedConfig;
pub use dataset::{CellValue, Dataset, Tally};
pub use html::render_page;
pub use registry::{ModalityEntry, Registry};
pub use widget::{MatrixWidget, WidgetOptions, WidgetSettings};

use anyhow::Result;

/// Load the configured registry and build a widget from it
pub fn build_widget(
    config: &ResolvedConfig,
    filter: &[String],
    tab: Option<&str>,
) -> Result<MatrixWidget> {
    let registry = Registry::load(&config.data_dir, &config.modalities)?;
    MatrixWidget::new(WidgetOptions {
        registry,
        filter: filter.to_vec(),
        tab: tab.unwrap_or(&config.default_tab).to_string(),
        settings: config.settings.clone(),
    })
}
