//! Core domain types

use berth_protocol::LabelSelector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Label key binding a daemon session to the sidecar that owns it
pub const SESSION_OWNER_LABEL_KEY: &str = "sidecar-session-owner";

/// Number of container identifier characters kept in the ownership label
pub const OWNER_ID_LENGTH: usize = 12;

/// Value of the ownership label for one sidecar container
///
/// Built from the container identifier, truncated the same way the engine
/// shortens identifiers for display so that it fits label value limits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnershipLabel(String);

impl OwnershipLabel {
    /// Create the label for a sidecar container
    pub fn for_container(container_id: &str) -> Self {
        Self(container_id.chars().take(OWNER_ID_LENGTH).collect())
    }

    /// Get the label value
    pub fn value(&self) -> &str {
        &self.0
    }

    /// Selector matching every session owned by this sidecar
    pub fn selector(&self) -> LabelSelector {
        LabelSelector::new(SESSION_OWNER_LABEL_KEY, self.0.clone())
    }
}

impl fmt::Display for OwnershipLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", SESSION_OWNER_LABEL_KEY, self.0)
    }
}

/// A running (or created) sidecar container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarIdentity {
    /// Full container identifier
    pub container_id: String,
}

impl SidecarIdentity {
    /// Create a new identity
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
        }
    }

    /// Ownership label for sessions anchored in this container
    pub fn ownership_label(&self) -> OwnershipLabel {
        OwnershipLabel::for_container(&self.container_id)
    }
}

/// Operating system of the container engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsType {
    Linux,
    Windows,
}

impl FromStr for OsType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(OsType::Linux),
            "windows" => Ok(OsType::Windows),
            other => Err(format!("unsupported container engine OS type: {:?}", other)),
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsType::Linux => write!(f, "linux"),
            OsType::Windows => write!(f, "windows"),
        }
    }
}

/// Facts about the container engine needed to build specifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineMetadata {
    pub os_type: OsType,
}

impl EngineMetadata {
    /// Create engine metadata
    pub fn new(os_type: OsType) -> Self {
        Self { os_type }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership_label_truncates() {
        let label = OwnershipLabel::for_container(
            "4f3c2b1a0e9d8c7b6a5f4e3d2c1b0a9f8e7d6c5b4a3f2e1d0c9b8a7f6e5d4c3b",
        );
        assert_eq!(label.value(), "4f3c2b1a0e9d");
        assert_eq!(label.to_string(), "sidecar-session-owner=4f3c2b1a0e9d");
    }

    #[test]
    fn test_ownership_label_short_id() {
        let label = SidecarIdentity::new("abc").ownership_label();
        assert_eq!(label.value(), "abc");
        assert_eq!(label.selector().key, SESSION_OWNER_LABEL_KEY);
    }

    #[test]
    fn test_os_type_parse() {
        assert_eq!("Linux".parse::<OsType>(), Ok(OsType::Linux));
        assert_eq!("windows".parse::<OsType>(), Ok(OsType::Windows));
        assert!("plan9".parse::<OsType>().is_err());
    }
}
