use crate::error::OrchestratorError;
use crate::target::{TargetInstance, TargetRole};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source of the VMs a run can target.
pub trait Inventory: Send + Sync {
    /// Current view of the inventory. Builders take one snapshot per build so
    /// role assignment is never stale across runs.
    fn snapshot(&self) -> Result<InventorySnapshot, OrchestratorError>;
}

/// Point-in-time copy of the known targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default, alias = "vms")]
    pub targets: Vec<TargetInstance>,
}

impl InventorySnapshot {
    pub fn new(targets: Vec<TargetInstance>) -> Self {
        Self { targets }
    }

    /// Names of every target with `role`, in inventory order.
    pub fn find_by_role(&self, role: TargetRole) -> Vec<&str> {
        self.targets
            .iter()
            .filter(|t| t.role == role)
            .map(|t| t.name.as_str())
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<&TargetInstance> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Target names must be unique.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        let mut seen = std::collections::HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.name.as_str()) {
                return Err(OrchestratorError::Config(format!(
                    "duplicate target name in inventory: {}",
                    target.name
                )));
            }
        }
        Ok(())
    }
}

/// Fixed in-memory inventory.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    snapshot: InventorySnapshot,
}

impl StaticInventory {
    pub fn new(targets: Vec<TargetInstance>) -> Self {
        Self {
            snapshot: InventorySnapshot::new(targets),
        }
    }
}

impl Inventory for StaticInventory {
    fn snapshot(&self) -> Result<InventorySnapshot, OrchestratorError> {
        self.snapshot.validate()?;
        Ok(self.snapshot.clone())
    }
}

/// Inventory kept in a YAML file with a `targets:` (or legacy `vms:`) list.
/// The file is re-read on every snapshot so that VMs created by an earlier
/// stage are visible to the next one.
#[derive(Debug, Clone)]
pub struct YamlInventory {
    path: PathBuf,
}

impl YamlInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Inventory for YamlInventory {
    fn snapshot(&self) -> Result<InventorySnapshot, OrchestratorError> {
        if !self.path.exists() {
            return Err(OrchestratorError::Config(format!(
                "inventory file not found: {}",
                self.path.display()
            )));
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let snapshot: InventorySnapshot = serde_yaml::from_str(&contents)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
