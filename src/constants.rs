//! Global constants for permaudit
//!
//! Centralized location for application-wide constants

/// Application name, used for the config directory and log prefixes
pub const APP_NAME: &str = "permaudit";

/// Config file name inside the per-user config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default number of tooltip entries annotated per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 300;

/// Write a numbered backup snapshot every N chunks (and always after the last)
pub const DEFAULT_BACKUP_INTERVAL: usize = 5;

/// Default tooltip max width in pixels
pub const DEFAULT_TOOLTIP_MAX_WIDTH: u32 = 400;

/// Bounds for the tooltip max width
pub const TOOLTIP_MAX_WIDTH_MIN: u32 = 150;
pub const TOOLTIP_MAX_WIDTH_MAX: u32 = 1200;

/// Documents below this size (bytes, before a chunk) use the small growth ratio
pub const SMALL_DOCUMENT_BYTES: usize = 500 * 1024;

/// Documents above this size (bytes, before a chunk) use the large growth ratio
pub const LARGE_DOCUMENT_BYTES: usize = 2 * 1024 * 1024;

/// Maximum growth ratio per chunk for small, medium and large documents
pub const SMALL_DOCUMENT_GROWTH_RATIO: f64 = 5.0;
pub const MEDIUM_DOCUMENT_GROWTH_RATIO: f64 = 3.0;
pub const LARGE_DOCUMENT_GROWTH_RATIO: f64 = 2.0;

/// Default report title
pub const DEFAULT_REPORT_TITLE: &str = "vSphere Permissions Audit";

/// CSS class of the annotation wrapper span
pub const TOOLTIP_CLASS: &str = "perm-tooltip";

/// CSS class of the hidden tooltip body inside the wrapper span
pub const TOOLTIP_TEXT_CLASS: &str = "perm-tooltip-text";
