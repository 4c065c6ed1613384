//! Role catalog
//!
//! Immutable lookup from well-known role names to a description and the list
//! of capabilities the role grants. Built once at startup and passed by
//! reference; unknown roles fail soft.

use std::collections::HashMap;

/// Placeholder capability reported for roles not in the catalog
pub const CUSTOM_ROLE_CAPABILITY: &str = "Custom role - privileges not enumerated";

#[derive(Debug, Clone)]
struct RoleInfo {
    description: String,
    capabilities: Vec<String>,
}

const BUILTIN_ROLES: &[(&str, &str, &[&str])] = &[
    (
        "Administrator",
        "Full administrative access to all objects and operations",
        &[
            "All Privileges",
            "Manage permissions and roles",
            "Configure hosts, clusters and datastores",
            "Create, modify and delete virtual machines",
            "Manage networking and storage",
        ],
    ),
    (
        "Read-only",
        "View the state and details of objects without making changes",
        &[
            "View objects and their properties",
            "View performance data",
            "Browse datastores",
        ],
    ),
    (
        "NoAccess",
        "Explicitly denies all access to the object and its children",
        &["No privileges - access explicitly denied"],
    ),
    (
        "VirtualMachinePowerUser",
        "Interact with and reconfigure virtual machines, including snapshots",
        &[
            "Power on, power off, suspend and reset",
            "Console interaction",
            "Change virtual machine configuration",
            "Create, revert and remove snapshots",
            "Add or remove virtual devices",
            "Schedule tasks",
        ],
    ),
    (
        "VirtualMachineUser",
        "Interact with virtual machines without changing their configuration",
        &[
            "Power on, power off, suspend and reset",
            "Console interaction",
            "Configure CD media and floppy media",
            "Schedule tasks",
        ],
    ),
    (
        "ResourcePoolAdministrator",
        "Manage resource pools and the virtual machines placed in them",
        &[
            "Create, modify and delete child resource pools",
            "Move virtual machines between resource pools",
            "Assign virtual machines to resource pools",
            "Manage permissions on child objects",
            "Create and configure virtual machines",
        ],
    ),
    (
        "DatastoreConsumer",
        "Consume datastore space for virtual disks and snapshots",
        &["Allocate space on datastores"],
    ),
    (
        "NetworkAdministrator",
        "Assign virtual machines to networks and manage network configuration",
        &[
            "Assign networks to virtual machines",
            "Configure network settings",
            "Move and remove networks",
        ],
    ),
];

/// Role name to description and capability lookup
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    roles: HashMap<String, RoleInfo>,
}

impl RoleCatalog {
    /// Catalog of the platform's well-known system roles
    pub fn builtin() -> Self {
        let roles = BUILTIN_ROLES
            .iter()
            .map(|(name, description, capabilities)| {
                (
                    name.to_string(),
                    RoleInfo {
                        description: description.to_string(),
                        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
                    },
                )
            })
            .collect();

        Self { roles }
    }

    /// Built-in catalog plus site-specific role descriptions.
    /// Custom entries never replace a built-in role.
    pub fn with_custom_descriptions<I>(custom: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut catalog = Self::builtin();
        for (name, description) in custom {
            catalog.roles.entry(name).or_insert_with(|| RoleInfo {
                description,
                capabilities: vec![CUSTOM_ROLE_CAPABILITY.to_string()],
            });
        }
        catalog
    }

    pub fn describe(&self, role: &str) -> String {
        match self.roles.get(role) {
            Some(info) => info.description.clone(),
            None => format!("Custom role: {}", role),
        }
    }

    pub fn capabilities_of(&self, role: &str) -> Vec<String> {
        match self.roles.get(role) {
            Some(info) => info.capabilities.clone(),
            None => vec![CUSTOM_ROLE_CAPABILITY.to_string()],
        }
    }

    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
