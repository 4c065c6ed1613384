#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Wrapper text that marks one placed tooltip
pub const TOOLTIP_OPEN: &str = "<span class=\"perm-tooltip\" tabindex=\"0\">";

/// A temp directory holding one audit's inputs and outputs
pub struct AuditFixture {
    pub temp_dir: TempDir,
}

impl AuditFixture {
    pub fn new() -> Self {
        AuditFixture {
            temp_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).unwrap()
    }

    /// An empty config file, so a per-user config never leaks into a test
    pub fn write_default_config(&self) -> PathBuf {
        self.write("config.toml", "")
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path().join(name).exists()
    }

    /// Three bindings, one per group: a VM, a cluster and a datacenter
    pub fn write_three_records(&self) -> PathBuf {
        self.write(
            "records.json",
            r#"[
  {"entity": "VM-Web01", "entityType": "VirtualMachine", "principal": "CORP\\web-admins", "role": "Administrator",
   "propagate": true, "createdDate": "2024-03-01T09:30:00Z"},
  {"entity": "Cluster-Prod", "entityType": "ClusterComputeResource", "principal": "CORP\\ops", "role": "Read-only"},
  {"entity": "DC-East", "entityType": "Datacenter", "principal": "CORP\\auditors", "role": "NoAccess", "inherited": true}
]"#,
        )
    }

    /// `count` bindings with distinct objects and principals, spread over three groups
    pub fn write_records(&self, count: usize) -> PathBuf {
        let kinds = [
            ("VM-App", "VirtualMachine", "Administrator"),
            ("Cluster-", "ClusterComputeResource", "Read-only"),
            ("DC-", "Datacenter", "NoAccess"),
        ];
        let records: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                let (prefix, entity_type, role) = kinds[i % kinds.len()];
                serde_json::json!({
                    "entity": format!("{}{:03}", prefix, i),
                    "entityType": entity_type,
                    "principal": format!("CORP\\team-{:03}", i),
                    "role": role,
                    "propagate": i % 2 == 0,
                    "createdDate": "2024-03-01T09:30:00Z",
                })
            })
            .collect();
        self.write("records.json", &serde_json::to_string_pretty(&records).unwrap())
    }
}

pub fn count_tooltips(document: &str) -> usize {
    document.matches(TOOLTIP_OPEN).count()
}
