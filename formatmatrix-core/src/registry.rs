//! Modality registry - the keyword-tagged datasets a widget can show
//!
//! Entries are immutable once loaded. Filtering never fails: an empty match
//! falls back to the full registry with a warning.

use crate::dataset::Dataset;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Static description of a modality: where its data lives and how to find it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModalitySpec {
    /// Tab id, also written to the `tab` URL parameter
    pub id: String,
    /// Human-readable modality label, e.g. "Ecephys - Recording"
    pub modality: String,
    /// Dataset file name, relative to the data directory
    pub file: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ModalitySpec {
    fn new(id: &str, modality: &str, file: &str, keywords: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            modality: modality.to_string(),
            file: file.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// The six modalities of the published matrix.
///
/// The `ecepys-` ids are the ones published URLs already point at.
pub fn default_modalities() -> Vec<ModalitySpec> {
    vec![
        ModalitySpec::new(
            "ecepys-recording",
            "Ecephys - Recording",
            "ecephys_recording.json",
            &["ecephys", "recording"],
        ),
        ModalitySpec::new(
            "ecepys-sorting",
            "Ecephys - Sorting",
            "ecephys_sorting.json",
            &["ecephys", "sorting"],
        ),
        ModalitySpec::new("icephys", "Icephys", "icephys.json", &["icephys"]),
        ModalitySpec::new(
            "ophys-imaging",
            "Ophys - Imaging",
            "ophys_imaging.json",
            &["ophys", "imaging"],
        ),
        ModalitySpec::new(
            "ophys-segmentation",
            "Ophys - Segmentation",
            "ophys_segmentation.json",
            &["ophys", "segmentation"],
        ),
        ModalitySpec::new("behavior", "Behavior", "behavior.json", &["behavior"]),
    ]
}

/// A loaded registry entry
#[derive(Debug, Clone, PartialEq)]
pub struct ModalityEntry {
    pub id: String,
    pub modality: String,
    pub dataset: Dataset,
    pub keywords: Vec<String>,
}

impl ModalityEntry {
    pub fn new(
        id: impl Into<String>,
        modality: impl Into<String>,
        dataset: Dataset,
        keywords: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            modality: modality.into(),
            dataset,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// True when any of this entry's keywords appears in `filter`
    pub fn matches(&self, filter: &[String]) -> bool {
        self.keywords.iter().any(|k| filter.contains(k))
    }
}

/// Ordered, immutable list of modality entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    entries: Vec<ModalityEntry>,
}

impl Registry {
    pub fn new(entries: Vec<ModalityEntry>) -> Self {
        Self { entries }
    }

    /// Load every spec's dataset from `data_dir`
    pub fn load(data_dir: &Path, specs: &[ModalitySpec]) -> Result<Self> {
        let mut entries = Vec::with_capacity(specs.len());
        for spec in specs {
            let path = data_dir.join(&spec.file);
            let dataset = Dataset::load(&path)?;
            debug!(id = %spec.id, rows = dataset.len(), "loaded dataset");
            entries.push(ModalityEntry {
                id: spec.id.clone(),
                modality: spec.modality.clone(),
                dataset,
                keywords: spec.keywords.clone(),
            });
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ModalityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose keywords intersect `filter`.
    ///
    /// An empty filter keeps everything. A filter that matches nothing falls
    /// back to the full registry and logs a warning.
    pub fn filter(&self, filter: &[String]) -> Vec<ModalityEntry> {
        if filter.is_empty() {
            return self.entries.clone();
        }

        let matched: Vec<ModalityEntry> = self
            .entries
            .iter()
            .filter(|e| e.matches(filter))
            .cloned()
            .collect();

        if matched.is_empty() {
            warn!(?filter, "no tables found for filter, showing all modalities");
            return self.entries.clone();
        }
        matched
    }
}
