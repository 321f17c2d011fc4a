//! Session configuration records
//!
//! Every field is optional. An unset field means "let the daemon pick its
//! built-in default". Records are layered with [`SynchronizationConfiguration::merge`]
//! and [`ForwardingConfiguration::merge`], where the higher layer wins field by
//! field.
//!
//! A record used for one endpoint of a session (alpha/beta, source/destination)
//! is *endpoint-specific*. Some fields only make sense for the session as a
//! whole and are rejected in endpoint-specific records.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest permission mode accepted for files, directories and sockets
pub const MAX_PERMISSION_MODE: u32 = 0o777;

/// Errors raised when validating a configuration record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A session-wide field appeared in an endpoint-specific record
    #[error("{field} cannot be specified on an endpoint-specific basis")]
    IllegalFieldForRole { field: &'static str },

    /// A field carries a value the daemon cannot accept
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Conflict-resolution behavior of a synchronization session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SynchronizationMode {
    TwoWaySafe,
    TwoWayResolved,
    OneWaySafe,
    OneWayReplica,
}

/// How filesystem behavior (case sensitivity, executability) is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeMode {
    Probe,
    Assume,
}

/// How filesystem scans are performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    Full,
    Accelerated,
}

/// Where incoming files are staged before being moved into place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageMode {
    Internal,
    Neighboring,
}

/// How symbolic links are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymlinkMode {
    Ignore,
    Portable,
    PosixRaw,
}

/// How filesystem changes are detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchMode {
    Portable,
    ForcePoll,
    NoWatch,
}

/// Behavior when a forwarding listener socket path already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SocketOverwriteMode {
    Leave,
    Overwrite,
}

/// Configuration for a synchronization session or one of its endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynchronizationConfiguration {
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symlink_mode: Option<SymlinkMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_mode: Option<WatchMode>,
    /// Polling interval in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_polling_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignores: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_vcs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_file_mode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_directory_mode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_group: Option<String>,
}

impl SynchronizationConfiguration {
    /// Check that the record is legal for its role.
    ///
    /// `endpoint_specific` is true for alpha/beta records.
    pub fn ensure_valid(&self, endpoint_specific: bool) -> Result<(), ConfigurationError> {
        if endpoint_specific {
            if self.mode.is_some() {
                return Err(ConfigurationError::IllegalFieldForRole {
                    field: "synchronization mode",
                });
            }
            if self.symlink_mode.is_some() {
                return Err(ConfigurationError::IllegalFieldForRole {
                    field: "symbolic link mode",
                });
            }
            if self.ignores.is_some() {
                return Err(ConfigurationError::IllegalFieldForRole {
                    field: "ignores",
                });
            }
            if self.ignore_vcs.is_some() {
                return Err(ConfigurationError::IllegalFieldForRole {
                    field: "VCS ignore mode",
                });
            }
        }

        if self.watch_polling_interval == Some(0) {
            return Err(ConfigurationError::InvalidValue {
                field: "watch polling interval",
                reason: "must be greater than zero".to_string(),
            });
        }

        if let Some(ignores) = &self.ignores {
            for ignore in ignores {
                let pattern = ignore.strip_prefix('!').unwrap_or(ignore);
                if pattern.trim().is_empty() {
                    return Err(ConfigurationError::InvalidValue {
                        field: "ignores",
                        reason: format!("empty ignore pattern ({:?})", ignore),
                    });
                }
            }
        }

        if let Some(mode) = self.default_file_mode {
            ensure_permission_mode("default file mode", mode)?;
        }
        if let Some(mode) = self.default_directory_mode {
            ensure_permission_mode("default directory mode", mode)?;
        }
        ensure_principal("default owner", self.default_owner.as_deref())?;
        ensure_principal("default group", self.default_group.as_deref())?;

        Ok(())
    }

    /// Overlay `higher` on top of `self`; set fields in `higher` win.
    pub fn merge(&self, higher: &Self) -> Self {
        Self {
            mode: higher.mode.or(self.mode),
            max_entry_count: higher.max_entry_count.or(self.max_entry_count),
            max_staging_file_size: higher.max_staging_file_size.or(self.max_staging_file_size),
            probe_mode: higher.probe_mode.or(self.probe_mode),
            scan_mode: higher.scan_mode.or(self.scan_mode),
            stage_mode: higher.stage_mode.or(self.stage_mode),
            symlink_mode: higher.symlink_mode.or(self.symlink_mode),
            watch_mode: higher.watch_mode.or(self.watch_mode),
            watch_polling_interval: higher.watch_polling_interval.or(self.watch_polling_interval),
            ignores: higher.ignores.clone().or_else(|| self.ignores.clone()),
            ignore_vcs: higher.ignore_vcs.or(self.ignore_vcs),
            default_file_mode: higher.default_file_mode.or(self.default_file_mode),
            default_directory_mode: higher.default_directory_mode.or(self.default_directory_mode),
            default_owner: higher
                .default_owner
                .clone()
                .or_else(|| self.default_owner.clone()),
            default_group: higher
                .default_group
                .clone()
                .or_else(|| self.default_group.clone()),
        }
    }
}

/// Configuration for a forwarding session or one of its endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForwardingConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_overwrite_mode: Option<SocketOverwriteMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_permission_mode: Option<u32>,
}

impl ForwardingConfiguration {
    /// Check that the record is legal.
    ///
    /// Every forwarding field is meaningful both session-wide and per
    /// endpoint, so `endpoint_specific` does not restrict anything today.
    pub fn ensure_valid(&self, _endpoint_specific: bool) -> Result<(), ConfigurationError> {
        if let Some(mode) = self.socket_permission_mode {
            ensure_permission_mode("socket permission mode", mode)?;
        }
        ensure_principal("socket owner", self.socket_owner.as_deref())?;
        ensure_principal("socket group", self.socket_group.as_deref())?;
        Ok(())
    }

    /// Overlay `higher` on top of `self`; set fields in `higher` win.
    pub fn merge(&self, higher: &Self) -> Self {
        Self {
            socket_overwrite_mode: higher.socket_overwrite_mode.or(self.socket_overwrite_mode),
            socket_owner: higher
                .socket_owner
                .clone()
                .or_else(|| self.socket_owner.clone()),
            socket_group: higher
                .socket_group
                .clone()
                .or_else(|| self.socket_group.clone()),
            socket_permission_mode: higher.socket_permission_mode.or(self.socket_permission_mode),
        }
    }
}

fn ensure_permission_mode(field: &'static str, mode: u32) -> Result<(), ConfigurationError> {
    if mode == 0 || mode > MAX_PERMISSION_MODE {
        return Err(ConfigurationError::InvalidValue {
            field,
            reason: format!("{:o} is outside 1..=777", mode),
        });
    }
    Ok(())
}

fn ensure_principal(field: &'static str, value: Option<&str>) -> Result<(), ConfigurationError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ConfigurationError::InvalidValue {
            field,
            reason: "must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}
