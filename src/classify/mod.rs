//! Permission classification
//!
//! Assigns every permission record to exactly one report group: global
//! bindings first, then by inventory type prefix, falling back to Other.

use std::collections::BTreeMap;

use crate::models::{PermissionGroup, PermissionRecord, PermissionSource};

/// Records bucketed by group. Every group is present, even when empty.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub groups: BTreeMap<PermissionGroup, Vec<PermissionRecord>>,
    pub counts: BTreeMap<PermissionGroup, usize>,
}

impl Classification {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Groups with at least one record, in report order
    pub fn non_empty(&self) -> impl Iterator<Item = (&PermissionGroup, &Vec<PermissionRecord>)> {
        self.groups.iter().filter(|(_, records)| !records.is_empty())
    }
}

/// Ordered entity type rules; the first prefix hit wins
const TYPE_RULES: &[(PermissionGroup, &[&str])] = &[
    (PermissionGroup::VirtualMachine, &["virtualmachine", "vm"]),
    (PermissionGroup::VMHost, &["hostsystem", "vmhost", "esxi"]),
    (PermissionGroup::Cluster, &["clustercomputeresource", "cluster"]),
    (PermissionGroup::Datastore, &["datastore"]),
    (PermissionGroup::Folder, &["folder"]),
    (PermissionGroup::Datacenter, &["datacenter"]),
    (
        PermissionGroup::Network,
        &["network", "distributedvirtualswitch", "distributedvirtualportgroup"],
    ),
    (PermissionGroup::ResourcePool, &["resourcepool"]),
];

/// Pick the group for a single record
pub fn group_for(record: &PermissionRecord) -> PermissionGroup {
    if record.source == PermissionSource::Global {
        return PermissionGroup::Global;
    }

    let entity_type = record.entity_type.trim().to_ascii_lowercase();
    for (group, prefixes) in TYPE_RULES {
        let hit = prefixes.iter().any(|prefix| {
            // "VM*" would otherwise swallow "VMHost"
            entity_type.starts_with(prefix)
                && !(*prefix == "vm" && entity_type.starts_with("vmhost"))
        });
        if hit {
            return *group;
        }
    }

    PermissionGroup::Other
}

/// Bucket records by group and count them
pub fn classify(records: &[PermissionRecord]) -> Classification {
    let mut classification = Classification {
        groups: PermissionGroup::ALL.iter().map(|g| (*g, Vec::new())).collect(),
        counts: PermissionGroup::ALL.iter().map(|g| (*g, 0)).collect(),
    };

    for record in records {
        let group = group_for(record);
        classification.groups.entry(group).or_default().push(record.clone());
        *classification.counts.entry(group).or_insert(0) += 1;
    }

    classification
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entity_type: &str) -> PermissionRecord {
        PermissionRecord::new("obj", entity_type, "DOMAIN\\user", "Read-only")
    }

    #[test]
    fn test_global_source_wins_over_type() {
        let r = record("VirtualMachine").with_source(PermissionSource::Global);
        assert_eq!(group_for(&r), PermissionGroup::Global);
    }

    #[test]
    fn test_type_prefixes() {
        let cases = [
            ("VirtualMachine", PermissionGroup::VirtualMachine),
            ("VM", PermissionGroup::VirtualMachine),
            ("VMTemplate", PermissionGroup::VirtualMachine),
            ("HostSystem", PermissionGroup::VMHost),
            ("VMHost", PermissionGroup::VMHost),
            ("ESXiHost", PermissionGroup::VMHost),
            ("ClusterComputeResource", PermissionGroup::Cluster),
            ("Cluster", PermissionGroup::Cluster),
            ("Datastore", PermissionGroup::Datastore),
            ("DatastoreCluster", PermissionGroup::Datastore),
            ("Folder", PermissionGroup::Folder),
            ("Datacenter", PermissionGroup::Datacenter),
            ("Network", PermissionGroup::Network),
            ("DistributedVirtualSwitch", PermissionGroup::Network),
            ("DistributedVirtualPortgroup", PermissionGroup::Network),
            ("ResourcePool", PermissionGroup::ResourcePool),
            ("VirtualApp", PermissionGroup::Other),
            ("", PermissionGroup::Other),
        ];

        for (entity_type, expected) in cases {
            assert_eq!(group_for(&record(entity_type)), expected, "entity type '{}'", entity_type);
        }
    }

    #[test]
    fn test_type_matching_ignores_case() {
        assert_eq!(group_for(&record("virtualmachine")), PermissionGroup::VirtualMachine);
        assert_eq!(group_for(&record("HOSTSYSTEM")), PermissionGroup::VMHost);
    }

    #[test]
    fn test_all_groups_present_when_empty() {
        let classification = classify(&[]);
        assert_eq!(classification.groups.len(), PermissionGroup::ALL.len());
        assert_eq!(classification.counts.len(), PermissionGroup::ALL.len());
        assert!(classification.counts.values().all(|count| *count == 0));
        assert_eq!(classification.non_empty().count(), 0);
    }

    #[test]
    fn test_each_record_lands_in_exactly_one_group() {
        let types = [
            "VirtualMachine", "HostSystem", "ClusterComputeResource", "Datastore", "Folder",
            "Datacenter", "Network", "ResourcePool", "VirtualApp", "VMHost",
        ];
        for entity_type in types {
            for source in [PermissionSource::Global, PermissionSource::Object] {
                let r = record(entity_type).with_source(source);
                let classification = classify(std::slice::from_ref(&r));
                let hits: usize = classification
                    .groups
                    .values()
                    .map(|records| records.iter().filter(|x| **x == r).count())
                    .sum();
                assert_eq!(hits, 1, "{} / {:?}", entity_type, source);
                assert_eq!(classification.total(), 1);
            }
        }
    }

    #[test]
    fn test_counts_match_groups() {
        let records = vec![
            record("VirtualMachine"),
            record("VirtualMachine"),
            record("Datacenter"),
            record("Folder").with_source(PermissionSource::Global),
        ];
        let classification = classify(&records);
        assert_eq!(classification.counts[&PermissionGroup::VirtualMachine], 2);
        assert_eq!(classification.counts[&PermissionGroup::Datacenter], 1);
        assert_eq!(classification.counts[&PermissionGroup::Global], 1);
        assert_eq!(classification.counts[&PermissionGroup::Folder], 0);
        for (group, records) in &classification.groups {
            assert_eq!(classification.counts[group], records.len());
        }
    }
}
