use crate::error::OrchestratorError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Class of target a command template is addressed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum TargetRole {
    Manager,
    Worker,
    /// Host-level commands, bound to a logical bucket instead of a VM.
    Host,
}

impl TargetRole {
    pub const ALL: [TargetRole; 3] = [TargetRole::Manager, TargetRole::Worker, TargetRole::Host];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetRole::Manager => "manager",
            TargetRole::Worker => "worker",
            TargetRole::Host => "host",
        }
    }
}

impl fmt::Display for TargetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetRole {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manager" => Ok(TargetRole::Manager),
            "worker" => Ok(TargetRole::Worker),
            // "none" is what older template files call host-level commands
            "host" | "none" => Ok(TargetRole::Host),
            _ => Err(OrchestratorError::UnknownRole(s.to_string())),
        }
    }
}

impl TryFrom<String> for TargetRole {
    type Error = OrchestratorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetRole> for String {
    fn from(role: TargetRole) -> Self {
        role.as_str().to_string()
    }
}

/// A VM known to the inventory. The engine only reads these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetInstance {
    #[serde(alias = "vm_instance")]
    pub name: String,
    #[serde(alias = "vm_type")]
    pub role: TargetRole,
    #[serde(default, alias = "external_ip", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl TargetInstance {
    pub fn new(name: impl Into<String>, role: TargetRole) -> Self {
        Self {
            name: name.into(),
            role,
            address: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_roles_and_legacy_alias() {
        assert_eq!("manager".parse::<TargetRole>().unwrap(), TargetRole::Manager);
        assert_eq!("WORKER".parse::<TargetRole>().unwrap(), TargetRole::Worker);
        assert_eq!("none".parse::<TargetRole>().unwrap(), TargetRole::Host);
    }

    #[test]
    fn unknown_role_is_an_error() {
        let err = "gateway".parse::<TargetRole>().unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownRole(ref r) if r == "gateway"));
    }

    #[test]
    fn deserializes_legacy_vm_entry() {
        let yaml = "vm_instance: node-1\nvm_type: worker\nexternal_ip: 10.0.0.7\n";
        let target: TargetInstance = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(target.name, "node-1");
        assert_eq!(target.role, TargetRole::Worker);
        assert_eq!(target.address.as_deref(), Some("10.0.0.7"));
    }
}
