//! Configuration file support for formatmatrix
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.formatmatrixrc.json` in project root
//! 3. `formatmatrix.config.json` in project root
//! 4. `"formatmatrix"` key in `package.json`
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::aggregate::{default_associations, Association, TOTAL_LABEL};
use crate::layout::{default_column_order, LayoutOptions, DEFAULT_CELL_OPACITY, DEFAULT_DELIMITER};
use crate::registry::{default_modalities, ModalitySpec};
use crate::tabs::{OVERVIEW_LABEL, OVERVIEW_TAB_ID};
use crate::widget::{WidgetSettings, DEFAULT_STICKY_COLUMNS, DEFAULT_TITLE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Dataset directory used when none is configured, relative to the project root
pub const DEFAULT_DATA_DIR: &str = "data";

/// formatmatrix configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixConfig {
    /// Directory holding the modality JSON files (default: `data`)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Column titles in display order
    #[serde(default)]
    pub column_order: Option<Vec<String>>,

    /// Total overrides: `target`'s denominator becomes `source`'s true-count
    #[serde(default)]
    pub associations: Option<Vec<Association>>,

    /// Title/subtitle separator in column names and text cells (default: " - ")
    #[serde(default)]
    pub delimiter: Option<String>,

    /// Pinned columns on modality tabs (default: 3)
    #[serde(default)]
    pub sticky_columns: Option<usize>,

    /// Opacity of coverage colors, 0.0 to 1.0 (default: 0.4)
    #[serde(default)]
    pub cell_opacity: Option<f64>,

    /// Tab shown when none is requested (default: overview)
    #[serde(default)]
    pub default_tab: Option<String>,

    /// Page title
    #[serde(default)]
    pub title: Option<String>,

    /// Modality registry (default: the six published modalities)
    #[serde(default)]
    pub modalities: Option<Vec<ModalitySpec>>,
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Dataset directory, absolute when resolved against a project root
    pub data_dir: PathBuf,
    pub modalities: Vec<ModalitySpec>,
    pub settings: WidgetSettings,
    pub default_tab: String,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl MatrixConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(opacity) = self.cell_opacity {
            if !(0.0..=1.0).contains(&opacity) {
                anyhow::bail!("cell_opacity must be in 0.0..=1.0 (got {})", opacity);
            }
        }

        if let Some(ref delimiter) = self.delimiter {
            if delimiter.is_empty() {
                anyhow::bail!("delimiter must not be empty");
            }
        }

        if self.sticky_columns == Some(0) {
            anyhow::bail!("sticky_columns must be at least 1");
        }

        if let Some(ref associations) = self.associations {
            for assoc in associations {
                if assoc.target == assoc.source {
                    anyhow::bail!(
                        "association target and source must differ (got {:?})",
                        assoc.target
                    );
                }
            }
        }

        if let Some(ref modalities) = self.modalities {
            let mut ids = HashSet::new();
            let mut labels = HashSet::new();
            for spec in modalities {
                if spec.id.is_empty() {
                    anyhow::bail!("modality id must not be empty");
                }
                if spec.modality.is_empty() {
                    anyhow::bail!("modality label for {:?} must not be empty", spec.id);
                }
                if spec.file.is_empty() {
                    anyhow::bail!("modality file for {:?} must not be empty", spec.id);
                }
                if spec.id == OVERVIEW_TAB_ID {
                    anyhow::bail!("modality id {:?} is reserved for the overview", spec.id);
                }
                if spec.modality == TOTAL_LABEL || spec.modality == OVERVIEW_LABEL {
                    anyhow::bail!("modality label {:?} is reserved", spec.modality);
                }
                if !ids.insert(spec.id.as_str()) {
                    anyhow::bail!("duplicate modality id: {}", spec.id);
                }
                if !labels.insert(spec.modality.as_str()) {
                    anyhow::bail!("duplicate modality label: {}", spec.modality);
                }
            }
        }

        Ok(())
    }

    /// Resolve config into the form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let layout = LayoutOptions {
            column_order: self
                .column_order
                .clone()
                .unwrap_or_else(default_column_order),
            delimiter: self
                .delimiter
                .clone()
                .unwrap_or_else(|| DEFAULT_DELIMITER.to_string()),
            cell_opacity: self.cell_opacity.unwrap_or(DEFAULT_CELL_OPACITY),
        };

        let settings = WidgetSettings {
            layout,
            associations: self
                .associations
                .clone()
                .unwrap_or_else(default_associations),
            sticky_columns: self.sticky_columns.unwrap_or(DEFAULT_STICKY_COLUMNS),
            title: self
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        };

        Ok(ResolvedConfig {
            data_dir: self
                .data_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            modalities: self.modalities.clone().unwrap_or_else(default_modalities),
            settings,
            default_tab: self
                .default_tab
                .clone()
                .unwrap_or_else(|| OVERVIEW_TAB_ID.to_string()),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        MatrixConfig::default().resolve()
    }
}

/// Discover and load a config file from the project root
///
/// Search order:
/// 1. `.formatmatrixrc.json`
/// 2. `formatmatrix.config.json`
/// 3. `"formatmatrix"` key in `package.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(MatrixConfig, PathBuf)>> {
    for name in [".formatmatrixrc.json", "formatmatrix.config.json"] {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }

    let pkg_path = project_root.join("package.json");
    if pkg_path.exists() {
        if let Some(config) = load_from_package_json(&pkg_path)? {
            return Ok(Some((config, pkg_path)));
        }
    }

    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<MatrixConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: MatrixConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load config from the "formatmatrix" key in package.json
fn load_from_package_json(path: &Path) -> Result<Option<MatrixConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let pkg: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    match pkg.get("formatmatrix") {
        Some(value) => {
            let config: MatrixConfig = serde_json::from_value(value.clone())
                .with_context(|| format!("invalid formatmatrix config in {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("invalid formatmatrix config in {}", path.display()))?;
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
///
/// A relative `data_dir` is resolved against the directory holding the
/// config file, or the project root when running on defaults.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (MatrixConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    if resolved.data_dir.is_relative() {
        let base = source_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(project_root);
        resolved.data_dir = base.join(&resolved.data_dir);
    }
    resolved.config_path = source_path;
    Ok(resolved)
}
