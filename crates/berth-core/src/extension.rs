//! Schema of the `x-berth` descriptor extension
//!
//! The extension block is decoded strictly: unknown keys anywhere in the block
//! are errors, so a misspelled option fails loudly instead of being dropped.
//!
//! ```yaml
//! x-berth:
//!   forward:
//!     web:
//!       source: tcp:localhost:8080
//!       destination: network://backend:tcp:api:80
//!   sync:
//!     defaults:
//!       configuration:
//!         ignore:
//!           vcs: true
//!     data:
//!       alpha: ./app
//!       beta: volume://cache
//! ```

use berth_protocol::configuration::{
    ProbeMode, ScanMode, SocketOverwriteMode, StageMode, SymlinkMode, SynchronizationMode,
    WatchMode,
};
use berth_protocol::{ForwardingConfiguration, SynchronizationConfiguration};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::naming::DEFAULTS_ENTRY_NAME;

/// Key of the extension block at the descriptor root
pub const EXTENSION_KEY: &str = "x-berth";

/// Permission bits written as an octal string (`"0644"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(pub u32);

impl Serialize for FileMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:04o}", self.0))
    }
}

impl<'de> Deserialize<'de> for FileMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let digits = raw.trim().trim_start_matches("0o");
        u32::from_str_radix(digits, 8)
            .map(FileMode)
            .map_err(|_| serde::de::Error::custom(format!("invalid octal mode {:?}", raw)))
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

/// `symlink` section of a synchronization configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SymlinkSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<SymlinkMode>,
}

/// `watch` section of a synchronization configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct WatchSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<WatchMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<u32>,
}

/// `ignore` section of a synchronization configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct IgnoreSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcs: Option<bool>,
}

/// `permissions` section of a synchronization configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct PermissionsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_file_mode: Option<FileMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_directory_mode: Option<FileMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_group: Option<String>,
}

/// Synchronization configuration as written by users
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SyncConfigurationSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<SynchronizationMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entry_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_staging_file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_mode: Option<ProbeMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_mode: Option<ScanMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_mode: Option<StageMode>,
    #[serde(skip_serializing_if = "is_default")]
    pub symlink: SymlinkSection,
    #[serde(skip_serializing_if = "is_default")]
    pub watch: WatchSection,
    #[serde(skip_serializing_if = "is_default")]
    pub ignore: IgnoreSection,
    #[serde(skip_serializing_if = "is_default")]
    pub permissions: PermissionsSection,
}

impl SyncConfigurationSchema {
    /// Flatten into the record the daemon understands
    pub fn to_configuration(&self) -> SynchronizationConfiguration {
        SynchronizationConfiguration {
            mode: self.mode,
            max_entry_count: self.max_entry_count,
            max_staging_file_size: self.max_staging_file_size,
            probe_mode: self.probe_mode,
            scan_mode: self.scan_mode,
            stage_mode: self.stage_mode,
            symlink_mode: self.symlink.mode,
            watch_mode: self.watch.mode,
            watch_polling_interval: self.watch.polling_interval,
            ignores: self.ignore.paths.clone(),
            ignore_vcs: self.ignore.vcs,
            default_file_mode: self.permissions.default_file_mode.map(|m| m.0),
            default_directory_mode: self.permissions.default_directory_mode.map(|m| m.0),
            default_owner: self.permissions.default_owner.clone(),
            default_group: self.permissions.default_group.clone(),
        }
    }
}

/// `socket` section of a forwarding configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SocketSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite_mode: Option<SocketOverwriteMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<FileMode>,
}

/// Forwarding configuration as written by users
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ForwardConfigurationSchema {
    #[serde(skip_serializing_if = "is_default")]
    pub socket: SocketSection,
}

impl ForwardConfigurationSchema {
    /// Flatten into the record the daemon understands
    pub fn to_configuration(&self) -> ForwardingConfiguration {
        ForwardingConfiguration {
            socket_overwrite_mode: self.socket.overwrite_mode,
            socket_owner: self.socket.owner.clone(),
            socket_group: self.socket.group.clone(),
            socket_permission_mode: self.socket.permission_mode.map(|m| m.0),
        }
    }
}

/// One entry under `x-berth.forward`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ForwardEntry {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub configuration: ForwardConfigurationSchema,
    pub configuration_source: ForwardConfigurationSchema,
    pub configuration_destination: ForwardConfigurationSchema,
}

/// One entry under `x-berth.sync`
///
/// `source`/`destination` are accepted as spellings of `alpha`/`beta`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SyncEntry {
    #[serde(alias = "source")]
    pub alpha: Option<String>,
    #[serde(alias = "destination")]
    pub beta: Option<String>,
    pub configuration: SyncConfigurationSchema,
    #[serde(alias = "configurationSource")]
    pub configuration_alpha: SyncConfigurationSchema,
    #[serde(alias = "configurationDestination")]
    pub configuration_beta: SyncConfigurationSchema,
}

/// Configuration-only defaults for forwarding sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ForwardDefaults {
    #[serde(skip_serializing_if = "is_default")]
    pub configuration: ForwardConfigurationSchema,
    #[serde(skip_serializing_if = "is_default")]
    pub configuration_source: ForwardConfigurationSchema,
    #[serde(skip_serializing_if = "is_default")]
    pub configuration_destination: ForwardConfigurationSchema,
}

/// Configuration-only defaults for synchronization sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SyncDefaults {
    #[serde(skip_serializing_if = "is_default")]
    pub configuration: SyncConfigurationSchema,
    #[serde(skip_serializing_if = "is_default")]
    pub configuration_alpha: SyncConfigurationSchema,
    #[serde(skip_serializing_if = "is_default")]
    pub configuration_beta: SyncConfigurationSchema,
}

impl ForwardEntry {
    /// Whether the entry names any endpoint
    pub fn declares_endpoints(&self) -> bool {
        self.source.is_some() || self.destination.is_some()
    }

    /// Keep only the configuration part of the entry
    pub fn into_defaults(self) -> ForwardDefaults {
        ForwardDefaults {
            configuration: self.configuration,
            configuration_source: self.configuration_source,
            configuration_destination: self.configuration_destination,
        }
    }
}

impl SyncEntry {
    /// Whether the entry names any endpoint
    pub fn declares_endpoints(&self) -> bool {
        self.alpha.is_some() || self.beta.is_some()
    }

    /// Keep only the configuration part of the entry
    pub fn into_defaults(self) -> SyncDefaults {
        SyncDefaults {
            configuration: self.configuration,
            configuration_alpha: self.configuration_alpha,
            configuration_beta: self.configuration_beta,
        }
    }
}

/// The decoded `x-berth` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Extension {
    pub forward: BTreeMap<String, ForwardEntry>,
    pub sync: BTreeMap<String, SyncEntry>,
}

impl Extension {
    /// Decode the extension block from its YAML value
    pub fn from_value(value: &serde_yaml::Value) -> Result<Self, serde_yaml::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value.clone())
    }

    /// Remove and return the reserved forwarding `defaults` entry
    pub fn take_forward_defaults(&mut self) -> Option<ForwardEntry> {
        self.forward.remove(DEFAULTS_ENTRY_NAME)
    }

    /// Remove and return the reserved synchronization `defaults` entry
    pub fn take_sync_defaults(&mut self) -> Option<SyncEntry> {
        self.sync.remove(DEFAULTS_ENTRY_NAME)
    }

    /// Whether no sessions or defaults are declared
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.sync.is_empty()
    }
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(yaml: &str) -> Result<Extension, serde_yaml::Error> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        Extension::from_value(&value)
    }

    #[test]
    fn test_decode_sessions() {
        let extension = decode(
            r#"
forward:
  web:
    source: tcp:localhost:8080
    destination: network://backend:tcp:api:80
    configuration:
      socket:
        overwriteMode: overwrite
sync:
  data:
    alpha: ./app
    beta: volume://cache
    configuration:
      mode: one-way-replica
      ignore:
        paths: [node_modules]
        vcs: true
    configurationBeta:
      permissions:
        defaultFileMode: "0644"
"#,
        )
        .unwrap();

        let web = &extension.forward["web"];
        assert_eq!(web.source.as_deref(), Some("tcp:localhost:8080"));
        assert_eq!(
            web.configuration.to_configuration().socket_overwrite_mode,
            Some(SocketOverwriteMode::Overwrite)
        );

        let data = &extension.sync["data"];
        let configuration = data.configuration.to_configuration();
        assert_eq!(configuration.mode, Some(SynchronizationMode::OneWayReplica));
        assert_eq!(configuration.ignores, Some(vec!["node_modules".to_string()]));
        assert_eq!(configuration.ignore_vcs, Some(true));
        assert_eq!(
            data.configuration_beta.to_configuration().default_file_mode,
            Some(0o644)
        );
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(decode("sync:\n  data:\n    alpha: ./a\n    beta: volume://c\n    mdoe: x\n").is_err());
        assert!(decode("sync:\n  data:\n    configuration:\n      watch:\n        interval: 5\n").is_err());
        assert!(decode("synchronization: {}\n").is_err());
    }

    #[test]
    fn test_source_destination_aliases() {
        let extension = decode(
            "sync:\n  data:\n    source: ./a\n    destination: volume://c\n    configurationDestination:\n      watch:\n        mode: force-poll\n",
        )
        .unwrap();
        let data = &extension.sync["data"];
        assert_eq!(data.alpha.as_deref(), Some("./a"));
        assert_eq!(data.beta.as_deref(), Some("volume://c"));
        assert_eq!(data.configuration_beta.watch.mode, Some(WatchMode::ForcePoll));
    }

    #[test]
    fn test_take_defaults() {
        let mut extension = decode(
            "sync:\n  defaults:\n    configuration:\n      mode: two-way-resolved\n  data:\n    alpha: ./a\n    beta: volume://c\n",
        )
        .unwrap();
        let defaults = extension.take_sync_defaults().unwrap();
        assert!(!defaults.declares_endpoints());
        assert_eq!(extension.sync.len(), 1);
        assert!(extension.take_forward_defaults().is_none());
    }

    #[test]
    fn test_file_mode() {
        let mode: FileMode = serde_yaml::from_str("\"0755\"").unwrap();
        assert_eq!(mode, FileMode(0o755));
        assert_eq!(mode.to_string(), "0755");
        assert!(serde_yaml::from_str::<FileMode>("\"0999\"").is_err());
    }

    #[test]
    fn test_null_block_is_empty() {
        assert!(Extension::from_value(&serde_yaml::Value::Null)
            .unwrap()
            .is_empty());
    }
}
