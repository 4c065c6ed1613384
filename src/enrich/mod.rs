//! Report enrichment module
//!
//! Handles:
//! - Building tooltip entries from permission records and the role catalog
//! - Rendering tooltip content fragments
//! - Annotating report table cells with interactive tooltips
//! - Injecting tooltip styles and scripts
//! - Chunked, growth-checked enrichment of large documents

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::catalog::RoleCatalog;
use crate::models::{PermissionRecord, TooltipDetails, TooltipEntry};

pub mod annotator;
pub mod assets;
pub mod chunked;
pub mod tooltip;

/// Escape text for use in HTML content and double-quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Build the tooltip payload for one record
pub fn entry_from_record(record: &PermissionRecord, catalog: &RoleCatalog) -> TooltipEntry {
    TooltipEntry {
        entity_name: record.entity.clone(),
        entity_type: record.entity_type.clone(),
        principal: record.principal.clone(),
        role: record.role.clone(),
        role_description: catalog.describe(&record.role),
        inherited: record.inherited,
        propagate: record.propagate,
        details: TooltipDetails {
            created_date: record.created_date,
            modified_date: record.modified_date,
            source: record.source,
            capabilities: catalog.capabilities_of(&record.role),
        },
    }
}

/// Build tooltip entries keyed by entity identifier.
/// Bindings that share an identifier collapse into the first one seen.
pub fn build_entries(records: &[PermissionRecord], catalog: &RoleCatalog) -> BTreeMap<String, TooltipEntry> {
    let mut entries = BTreeMap::new();
    for record in records {
        entries
            .entry(record.entity_identifier().to_string())
            .or_insert_with(|| entry_from_record(record, catalog));
    }
    entries
}

/// Load a tooltip side-channel file (JSON object of key to entry)
pub fn load_entries(path: &Path) -> Result<BTreeMap<String, TooltipEntry>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read tooltip data {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid tooltip data in {}", path.display()))
}

/// Write a tooltip side-channel file
pub fn save_entries(path: &Path, entries: &BTreeMap<String, TooltipEntry>) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(path, json).with_context(|| format!("Failed to write tooltip data {}", path.display()))
}
