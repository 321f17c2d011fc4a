//! User configuration for berth

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::extension::{ForwardDefaults, SyncDefaults};
use crate::types::OsType;

/// Default address of the session daemon
pub const DEFAULT_DAEMON_ADDRESS: &str = "127.0.0.1:22250";

/// Default sidecar image repository; the tag is the berth version
pub const DEFAULT_SIDECAR_REPOSITORY: &str = "berthio/sidecar";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BerthConfig {
    /// Session daemon connection
    pub daemon: DaemonConfig,

    /// Sidecar container settings
    pub sidecar: SidecarConfig,

    /// Container engine overrides
    pub engine: EngineConfig,

    /// Lowest-precedence session configuration, applied to every project
    pub defaults: GlobalDefaults,
}

/// `[daemon]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// `host:port` the daemon listens on
    pub address: String,

    /// How long to wait for the daemon to accept a connection
    #[serde(with = "super::serde_utils::duration_secs")]
    pub connect_timeout: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_DAEMON_ADDRESS.to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// `[sidecar]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidecarConfig {
    /// Image override; the versioned default image is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl SidecarConfig {
    /// Image the sidecar service runs
    pub fn image(&self) -> String {
        self.image
            .clone()
            .unwrap_or_else(|| format!("{}:{}", DEFAULT_SIDECAR_REPOSITORY, crate::VERSION))
    }
}

/// `[engine]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Skip the engine metadata query and assume this OS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_type: Option<OsType>,
}

/// `[defaults]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalDefaults {
    /// Defaults for forwarding sessions
    pub forward: ForwardDefaults,

    /// Defaults for synchronization sessions
    pub sync: SyncDefaults,
}
