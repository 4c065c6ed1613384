//! Data models module
//!
//! Defines core data structures:
//! - PermissionRecord: one principal-to-role binding on one managed object
//! - PermissionGroup: semantic bucket a record is reported under
//! - TooltipEntry: enrichment payload keyed by entity identifier
//! - EnrichmentSummary: machine-readable record of one enrichment run

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[cfg(test)]
mod tests;

/// Where a binding was defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionSource {
    /// Global permission defined at the platform root
    Global,
    /// Permission defined directly on an inventory object
    Object,
}

impl fmt::Display for PermissionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionSource::Global => write!(f, "Global"),
            PermissionSource::Object => write!(f, "Object"),
        }
    }
}

/// Derive the stable lookup key for an (entity, principal, role) binding.
///
/// Lower-cases every part, joins them with `_` and replaces whitespace runs,
/// `/` and `\` with `_`, so the same logical binding always maps to the same key.
pub fn derive_entity_identifier(entity: &str, principal: &str, role: &str) -> String {
    let joined = format!("{}_{}_{}", entity.trim(), principal.trim(), role.trim()).to_lowercase();

    let mut identifier = String::with_capacity(joined.len());
    let mut in_whitespace = false;
    for ch in joined.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                identifier.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        match ch {
            '/' | '\\' => identifier.push('_'),
            other => identifier.push(other),
        }
    }
    identifier
}

/// One principal-to-role binding on one managed object.
///
/// `entity_identifier` is computed from entity, principal and role at
/// construction and on deserialization; it is never read from input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RecordFields")]
pub struct PermissionRecord {
    /// Display name of the managed object
    pub entity: String,
    /// Inventory type tag (VirtualMachine, HostSystem, Datacenter, ...)
    pub entity_type: String,
    /// Domain-qualified or local security principal
    pub principal: String,
    /// Role name
    pub role: String,
    /// Whether the binding was inherited from a parent object
    pub inherited: bool,
    /// Whether the binding applies to descendant objects
    pub propagate: bool,
    /// Global or object-level binding
    pub source: PermissionSource,
    /// Creation timestamp, when the inventory walker could read it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    /// Last modification timestamp, when the inventory walker could read it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<DateTime<Utc>>,
    entity_identifier: String,
}

impl PermissionRecord {
    /// Create an object-level, non-inherited, propagating binding
    pub fn new(
        entity: impl Into<String>,
        entity_type: impl Into<String>,
        principal: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        RecordFields {
            entity: entity.into(),
            entity_type: entity_type.into(),
            principal: principal.into(),
            role: role.into(),
            inherited: false,
            propagate: true,
            source: PermissionSource::Object,
            created_date: None,
            modified_date: None,
            entity_identifier: None,
        }
        .into()
    }

    pub fn with_source(mut self, source: PermissionSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_flags(mut self, inherited: bool, propagate: bool) -> Self {
        self.inherited = inherited;
        self.propagate = propagate;
        self
    }

    pub fn with_dates(mut self, created: Option<DateTime<Utc>>, modified: Option<DateTime<Utc>>) -> Self {
        self.created_date = created;
        self.modified_date = modified;
        self
    }

    /// Stable, case-insensitive key of this binding
    pub fn entity_identifier(&self) -> &str {
        &self.entity_identifier
    }
}

/// Wire shape of a permission record as emitted by the inventory walker.
/// Unknown fields are rejected at this boundary.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RecordFields {
    entity: String,
    entity_type: String,
    principal: String,
    role: String,
    #[serde(default)]
    inherited: bool,
    #[serde(default = "default_propagate")]
    propagate: bool,
    #[serde(default = "default_source")]
    source: PermissionSource,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    modified_date: Option<DateTime<Utc>>,
    // Accepted so serialized records can be read back; always recomputed.
    #[serde(default)]
    #[allow(dead_code)]
    entity_identifier: Option<String>,
}

fn default_propagate() -> bool {
    true
}

fn default_source() -> PermissionSource {
    PermissionSource::Object
}

impl From<RecordFields> for PermissionRecord {
    fn from(fields: RecordFields) -> Self {
        let entity_identifier = derive_entity_identifier(&fields.entity, &fields.principal, &fields.role);
        PermissionRecord {
            entity: fields.entity,
            entity_type: fields.entity_type,
            principal: fields.principal,
            role: fields.role,
            inherited: fields.inherited,
            propagate: fields.propagate,
            source: fields.source,
            created_date: fields.created_date,
            modified_date: fields.modified_date,
            entity_identifier,
        }
    }
}

/// Parse a best-effort timestamp: RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or
/// `YYYY-MM-DDTHH:MM:SS` (UTC). Anything else, including "N/A", becomes `None`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Render an optional timestamp the way reports and tooltips show it
pub fn format_timestamp(value: Option<&DateTime<Utc>>) -> String {
    match value {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "N/A".to_string(),
    }
}

/// Semantic bucket a permission record is reported under.
/// Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermissionGroup {
    Global,
    VirtualMachine,
    VMHost,
    Cluster,
    Datastore,
    Folder,
    Datacenter,
    Network,
    ResourcePool,
    Other,
}

impl PermissionGroup {
    pub const ALL: [PermissionGroup; 10] = [
        PermissionGroup::Global,
        PermissionGroup::VirtualMachine,
        PermissionGroup::VMHost,
        PermissionGroup::Cluster,
        PermissionGroup::Datastore,
        PermissionGroup::Folder,
        PermissionGroup::Datacenter,
        PermissionGroup::Network,
        PermissionGroup::ResourcePool,
        PermissionGroup::Other,
    ];

    /// Section heading used in rendered reports
    pub fn title(&self) -> &'static str {
        match self {
            PermissionGroup::Global => "Global Permissions",
            PermissionGroup::VirtualMachine => "Virtual Machines",
            PermissionGroup::VMHost => "Hosts",
            PermissionGroup::Cluster => "Clusters",
            PermissionGroup::Datastore => "Datastores",
            PermissionGroup::Folder => "Folders",
            PermissionGroup::Datacenter => "Datacenters",
            PermissionGroup::Network => "Networks",
            PermissionGroup::ResourcePool => "Resource Pools",
            PermissionGroup::Other => "Other Objects",
        }
    }
}

impl fmt::Display for PermissionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Enrichment payload for one binding, keyed by its entity identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipEntry {
    pub entity_name: String,
    pub entity_type: String,
    pub principal: String,
    pub role: String,
    pub role_description: String,
    pub inherited: bool,
    pub propagate: bool,
    pub details: TooltipDetails,
}

/// Secondary tooltip detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipDetails {
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_date: Option<DateTime<Utc>>,
    pub source: PermissionSource,
    /// Capabilities granted by the role, in catalog order
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Chunking statistics of an enrichment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingSummary {
    pub chunk_size: usize,
    pub total_chunks: usize,
    pub processing_time_seconds: f64,
    pub processing_rate_per_second: f64,
}

/// Machine-readable summary of a completed enrichment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentSummary {
    pub input_file: String,
    pub output_file: String,
    /// Annotation spans actually placed in the document
    pub tooltips_added: usize,
    /// Tooltip entries fed through the annotator
    pub entries_processed: usize,
    pub chunking: ChunkingSummary,
    /// RFC 3339 completion time
    pub enhancement_timestamp: String,
    pub features: Vec<String>,
}
