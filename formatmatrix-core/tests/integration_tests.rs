//! Integration tests: fixture datasets through registry, overview and layout

use formatmatrix_core::aggregate::{KNOWN_FORMATS_COLUMN, TOTAL_LABEL};
use formatmatrix_core::dataset::{Metric, Row, Tally, MODALITY_COLUMN};
use formatmatrix_core::layout::CellContent;
use formatmatrix_core::registry::default_modalities;
use formatmatrix_core::tabs::OVERVIEW_TAB_ID;
use formatmatrix_core::{CellValue, MatrixWidget, Registry, WidgetOptions};
use std::path::PathBuf;

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join("tables")
}

fn registry() -> Registry {
    Registry::load(&fixture_dir(), &default_modalities()).unwrap()
}

fn widget() -> MatrixWidget {
    MatrixWidget::new(WidgetOptions::new(registry())).unwrap()
}

fn count(row: &Row, column: &str) -> Option<f64> {
    match row.get(column) {
        Some(CellValue::Metric(m)) => match m.value {
            Metric::Number(n) => Some(n),
            Metric::Flag(_) => None,
        },
        _ => None,
    }
}

fn overview_row<'a>(widget: &'a MatrixWidget, modality: &str) -> &'a Row {
    widget
        .overview()
        .rows
        .iter()
        .find(|r| r.get(MODALITY_COLUMN).and_then(CellValue::as_text) == Some(modality))
        .unwrap_or_else(|| panic!("no overview row for {}", modality))
}

#[test]
fn test_registry_loads_all_fixtures() {
    let registry = registry();
    assert_eq!(registry.len(), 6);
    assert_eq!(registry.entries()[0].dataset.len(), 4);
}

#[test]
fn test_known_formats_match_row_counts() {
    let widget = widget();
    for entry in &widget.tables()[1..] {
        let row = overview_row(&widget, &entry.modality);
        assert_eq!(
            count(row, KNOWN_FORMATS_COLUMN),
            Some(entry.dataset.len() as f64),
            "{}",
            entry.modality
        );
    }
}

#[test]
fn test_true_counts_per_modality() {
    let widget = widget();
    let row = overview_row(&widget, "Ecephys - Recording");
    assert_eq!(count(row, "Neo - Raw IO"), Some(3.0));
    assert_eq!(count(row, "SpikeInterface - Extractor"), Some(2.0));
    assert_eq!(count(row, "NeuroConv - Interface"), Some(3.0));
    assert_eq!(count(row, "NWB GUIDE"), Some(2.0));

    let overview = widget.overview();
    assert_eq!(
        overview.tally("Ophys - Imaging", "ROIExtractors - Imaging"),
        Some(Tally { value: 2, total: 3 })
    );
}

#[test]
fn test_association_overrides() {
    let overview = widget().overview().clone();

    // GUIDE measured against NeuroConv-supported formats
    let modalities = [
        "Ecephys - Recording",
        "Ecephys - Sorting",
        "Ophys - Imaging",
    ];
    for modality in modalities {
        let guide = overview.tally(modality, "NWB GUIDE").unwrap();
        let interface = overview.tally(modality, "NeuroConv - Interface").unwrap();
        assert_eq!(guide.total, interface.value, "{}", modality);
    }

    // SpikeInterface measured against Neo where Neo is tracked
    let si = overview
        .tally("Ecephys - Recording", "SpikeInterface - Extractor")
        .unwrap();
    assert_eq!(si, Tally { value: 2, total: 3 });

    // no Neo column for sorting, so the row count stands
    let si = overview
        .tally("Ecephys - Sorting", "SpikeInterface - Extractor")
        .unwrap();
    assert_eq!(si, Tally { value: 3, total: 3 });

    // icephys GUIDE appears in one row only; NeuroConv supports one format
    let guide = overview.tally("Icephys", "NWB GUIDE").unwrap();
    assert_eq!(guide, Tally { value: 0, total: 1 });
}

#[test]
fn test_total_row() {
    let widget = widget();
    let total = widget.overview().rows.last().unwrap();
    assert_eq!(total[MODALITY_COLUMN].as_text(), Some(TOTAL_LABEL));
    assert_eq!(count(total, KNOWN_FORMATS_COLUMN), Some(16.0));
    assert_eq!(count(total, "NeuroConv - Interface"), Some(13.0));
    assert_eq!(count(total, "NWB GUIDE"), Some(8.0));
    assert_eq!(count(total, "Neo - Raw IO"), Some(4.0));

    let overview = widget.overview();
    let guide = overview.tally(TOTAL_LABEL, "NWB GUIDE").unwrap();
    assert_eq!((guide.value, guide.total), (8, 13));
    assert_eq!(
        overview.tally(TOTAL_LABEL, "SpikeInterface - Extractor"),
        Some(Tally { value: 5, total: 6 })
    );
}

#[test]
fn test_total_row_equals_sum_of_modality_rows() {
    let widget = widget();
    let overview = widget.overview();
    let (modality_rows, total) = overview.rows.split_at(overview.rows.len() - 1);
    for column in overview.columns().iter().skip(1) {
        let sum: f64 = modality_rows.iter().filter_map(|r| count(r, column)).sum();
        assert_eq!(count(&total[0], column), Some(sum), "{}", column);
    }
}

#[test]
fn test_overview_layout() {
    let widget = widget();
    let layout = widget.layout(OVERVIEW_TAB_ID).unwrap();
    let labels: Vec<&str> = layout.header.iter().map(|h| h.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "Modality",
            "Known Formats",
            "Neo",
            "SpikeInterface",
            "ROIExtractors",
            "NeuroConv",
            "NWB GUIDE"
        ]
    );
    assert_eq!(
        layout.subheader,
        vec![
            "Raw IO",
            "Extractor",
            "Imaging",
            "Segmentation",
            "Interface"
        ]
    );
    assert_eq!(layout.sticky_columns, 1);
    // six modalities plus Total
    assert_eq!(layout.rows.len(), 7);

    // Ecephys - Recording, NWB GUIDE: 2 of 3 NeuroConv-supported formats
    let guide = layout.rows[0].last().unwrap();
    assert_eq!(
        guide.content,
        CellContent::Metric {
            value: "2".into(),
            percent: Some("66.7%".into())
        }
    );
    assert!(guide.background.is_some());
}

#[test]
fn test_modality_layout_folds_versions() {
    let widget = widget();
    let layout = widget.layout("ecepys-recording").unwrap();
    assert!(layout.header.iter().all(|h| h.label != "Versions"));
    assert_eq!(layout.header[0].label, "Format");
    assert_eq!(layout.header[1].label, "Suffixes");
    assert_eq!(layout.rows[0][0].raw, "Blackrock - 2.3");
    assert_eq!(layout.rows[1][0].raw, "Intan");
    assert_eq!(layout.sticky_columns, 3);

    // Neo link survives layout
    let neo = "https://neo.readthedocs.io/en/latest/rawio.html";
    let urls: Vec<Option<&str>> = layout.rows[0].iter().map(|c| c.url.as_deref()).collect();
    assert!(urls.contains(&Some(neo)));
}

#[test]
fn test_filter_and_fallback() {
    let mut options = WidgetOptions::new(registry());
    options.filter = vec!["ophys".to_string()];
    let widget = MatrixWidget::new(options).unwrap();
    let ids: Vec<&str> = widget.tables().iter().map(|t| t.id.as_str()).collect();
    let expected = vec!["overview", "ophys-imaging", "ophys-segmentation"];
    assert_eq!(ids, expected);
    let total = widget.overview().rows.last().unwrap();
    assert_eq!(count(total, KNOWN_FORMATS_COLUMN), Some(5.0));

    let mut options = WidgetOptions::new(registry());
    options.filter = vec!["electrophysiology".to_string()];
    let widget = MatrixWidget::new(options).unwrap();
    assert_eq!(widget.tables().len(), 7);
}

#[test]
fn test_unknown_tab_selects_overview() {
    let mut options = WidgetOptions::new(registry());
    options.tab = "ecephys".to_string();
    let mut widget = MatrixWidget::new(options).unwrap();
    assert_eq!(widget.active().id, OVERVIEW_TAB_ID);

    widget.select("behavior");
    assert_eq!(widget.active().id, "behavior");
    let query = widget.tab_controller().sync_query("lang=en");
    assert_eq!(query, "lang=en&tab=behavior");

    widget.select("missing");
    assert_eq!(widget.active().id, OVERVIEW_TAB_ID);
}

#[test]
fn test_missing_dataset_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = Registry::load(dir.path(), &default_modalities()).unwrap_err();
    assert!(format!("{:#}", err).contains("ecephys_recording.json"));
}
