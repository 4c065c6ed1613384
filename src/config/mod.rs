//! Configuration management
//!
//! Handles TOML configuration parsing and validation. The configuration is
//! read once at startup and is read-only afterwards; command-line flags are
//! applied on top by the CLI layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::RoleCatalog;
use crate::constants::{
    APP_NAME, CONFIG_FILE_NAME, DEFAULT_BACKUP_INTERVAL, DEFAULT_CHUNK_SIZE, DEFAULT_REPORT_TITLE,
    DEFAULT_TOOLTIP_MAX_WIDTH, LARGE_DOCUMENT_BYTES, LARGE_DOCUMENT_GROWTH_RATIO,
    MEDIUM_DOCUMENT_GROWTH_RATIO, SMALL_DOCUMENT_BYTES, SMALL_DOCUMENT_GROWTH_RATIO,
    TOOLTIP_MAX_WIDTH_MAX, TOOLTIP_MAX_WIDTH_MIN,
};
use crate::enrich::assets::{self, Theme};
use crate::enrich::chunked::{ChunkOptions, GrowthThresholds, InjectedAssets};
use crate::exclusion::{self, ExclusionSet};

/// Origin reported for exclusion patterns listed in the config file itself
pub const INLINE_PATTERNS_ORIGIN: &str = "config:exclusions.patterns";

/// Configuration errors are fatal to the invoking operation
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidField { field: String, message: String },
}

impl ConfigError {
    fn field(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfiguration {
    pub exclusions: ExclusionSettings,
    pub tooltips: TooltipSettings,
    pub report: ReportSettings,
    /// Site-specific role descriptions added to the role catalog
    pub roles: BTreeMap<String, String>,
}

/// Principal exclusion settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExclusionSettings {
    pub enabled: bool,
    /// Pattern file, one pattern per line; relative paths resolve against the config file
    pub pattern_file: Option<PathBuf>,
    /// Inline patterns, checked after the pattern file's
    pub patterns: Vec<String>,
}

/// Tooltip enrichment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TooltipSettings {
    pub enabled: bool,
    pub theme: Theme,
    pub max_width: u32,
    pub chunk_size: usize,
    pub backup_interval: usize,
    pub keyboard_navigation: bool,
    pub filtering: bool,
    pub growth: GrowthSettings,
}

impl Default for TooltipSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            theme: Theme::Dark,
            max_width: DEFAULT_TOOLTIP_MAX_WIDTH,
            chunk_size: DEFAULT_CHUNK_SIZE,
            backup_interval: DEFAULT_BACKUP_INTERVAL,
            keyboard_navigation: true,
            filtering: true,
            growth: GrowthSettings::default(),
        }
    }
}

/// Per-chunk growth limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrowthSettings {
    pub small_document_bytes: usize,
    pub large_document_bytes: usize,
    pub small_ratio: f64,
    pub medium_ratio: f64,
    pub large_ratio: f64,
}

impl Default for GrowthSettings {
    fn default() -> Self {
        Self {
            small_document_bytes: SMALL_DOCUMENT_BYTES,
            large_document_bytes: LARGE_DOCUMENT_BYTES,
            small_ratio: SMALL_DOCUMENT_GROWTH_RATIO,
            medium_ratio: MEDIUM_DOCUMENT_GROWTH_RATIO,
            large_ratio: LARGE_DOCUMENT_GROWTH_RATIO,
        }
    }
}

impl From<&GrowthSettings> for GrowthThresholds {
    fn from(settings: &GrowthSettings) -> Self {
        GrowthThresholds {
            small_document_bytes: settings.small_document_bytes,
            large_document_bytes: settings.large_document_bytes,
            small_ratio: settings.small_ratio,
            medium_ratio: settings.medium_ratio,
            large_ratio: settings.large_ratio,
        }
    }
}

/// Base report settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSettings {
    pub title: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: DEFAULT_REPORT_TITLE.to_string(),
        }
    }
}

impl AuditConfiguration {
    /// Per-user config location, e.g. `~/.config/permaudit/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE_NAME))
    }

    /// Parse and validate a TOML configuration file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: AuditConfiguration = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let (Some(file), Some(base)) = (config.exclusions.pattern_file.as_ref(), path.parent()) {
            if file.is_relative() {
                config.exclusions.pattern_file = Some(base.join(file));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load an explicit config file, or the per-user default when it exists,
    /// or fall back to built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        match Self::default_config_path() {
            Some(path) if path.is_file() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Check value ranges and cross-field consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tooltips = &self.tooltips;
        if tooltips.chunk_size == 0 {
            return Err(ConfigError::field("tooltips.chunk_size", "must be at least 1"));
        }
        if tooltips.backup_interval == 0 {
            return Err(ConfigError::field("tooltips.backup_interval", "must be at least 1"));
        }
        if !(TOOLTIP_MAX_WIDTH_MIN..=TOOLTIP_MAX_WIDTH_MAX).contains(&tooltips.max_width) {
            return Err(ConfigError::field(
                "tooltips.max_width",
                format!(
                    "{} is outside {}..={}",
                    tooltips.max_width, TOOLTIP_MAX_WIDTH_MIN, TOOLTIP_MAX_WIDTH_MAX
                ),
            ));
        }

        let growth = &tooltips.growth;
        for (field, ratio) in [
            ("tooltips.growth.small_ratio", growth.small_ratio),
            ("tooltips.growth.medium_ratio", growth.medium_ratio),
            ("tooltips.growth.large_ratio", growth.large_ratio),
        ] {
            if !ratio.is_finite() || ratio <= 1.0 {
                return Err(ConfigError::field(field, format!("{} must be greater than 1.0", ratio)));
            }
        }
        if growth.small_document_bytes == 0 || growth.small_document_bytes >= growth.large_document_bytes {
            return Err(ConfigError::field(
                "tooltips.growth.small_document_bytes",
                "must be non-zero and below tooltips.growth.large_document_bytes",
            ));
        }

        let exclusions = &self.exclusions;
        if exclusions.enabled && exclusions.pattern_file.is_none() && exclusions.patterns.is_empty() {
            return Err(ConfigError::field(
                "exclusions",
                "enabled but neither pattern_file nor patterns is set",
            ));
        }

        if self.report.title.trim().is_empty() {
            return Err(ConfigError::field("report.title", "must not be empty"));
        }

        Ok(())
    }

    /// Compile the configured exclusion patterns. Empty when exclusions are disabled.
    pub fn exclusion_set(&self) -> Result<ExclusionSet, ConfigError> {
        if !self.exclusions.enabled {
            return Ok(ExclusionSet::default());
        }

        let mut set = match &self.exclusions.pattern_file {
            Some(path) => ExclusionSet::load(path)?,
            None => ExclusionSet::default(),
        };
        set.extend(exclusion::compile_from(INLINE_PATTERNS_ORIGIN, &self.exclusions.patterns));
        Ok(set)
    }

    /// Chunking, growth limits and tooltip assets for an enrichment run
    pub fn chunk_options(&self) -> ChunkOptions {
        let tooltips = &self.tooltips;
        ChunkOptions {
            chunk_size: tooltips.chunk_size,
            backup_interval: tooltips.backup_interval,
            thresholds: GrowthThresholds::from(&tooltips.growth),
            assets: Some(InjectedAssets {
                style: assets::generate_styles(tooltips.theme, tooltips.max_width),
                behavior: assets::generate_behavior(tooltips.keyboard_navigation, tooltips.filtering),
            }),
        }
    }

    /// Feature tags reported in the run summary
    pub fn features(&self) -> Vec<String> {
        let tooltips = &self.tooltips;
        let mut features = vec![
            "interactive-tooltips".to_string(),
            "chunked-processing".to_string(),
            "growth-safety-checks".to_string(),
            format!("theme-{}", tooltips.theme),
        ];
        if tooltips.keyboard_navigation {
            features.push("keyboard-navigation".to_string());
        }
        if tooltips.filtering {
            features.push("row-filtering".to_string());
        }
        features
    }

    pub fn role_catalog(&self) -> RoleCatalog {
        RoleCatalog::with_custom_descriptions(self.roles.clone())
    }
}
