//! Permission record loading
//!
//! Reads the JSON array of permission records produced by the inventory
//! walker. Each element is parsed on its own: an element that is malformed
//! or carries unknown fields is skipped and reported, the rest of the run
//! continues.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::models::PermissionRecord;

/// A record that could not be used
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// Zero-based position in the input array
    pub index: usize,
    pub reason: String,
}

/// Records loaded from one input file
#[derive(Debug, Clone, Default)]
pub struct RecordLoad {
    pub records: Vec<PermissionRecord>,
    pub skipped: Vec<SkippedRecord>,
}

/// Parse records from JSON text
pub fn parse_records(content: &str) -> Result<RecordLoad> {
    let value: Value = serde_json::from_str(content).context("Permission records are not valid JSON")?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(anyhow!(
                "Permission records must be a JSON array, found {}",
                json_kind(&other)
            ))
        }
    };

    let mut load = RecordLoad::default();
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<PermissionRecord>(item) {
            Ok(record) => load.records.push(record),
            Err(err) => {
                warn!("Skipping permission record #{}: {}", index, err);
                load.skipped.push(SkippedRecord {
                    index,
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(load)
}

/// Read records from a file
pub fn load_records(path: &Path) -> Result<RecordLoad> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read permission records {}", path.display()))?;
    parse_records(&content).with_context(|| format!("Invalid permission records in {}", path.display()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
