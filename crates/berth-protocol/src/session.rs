//! Session specifications and daemon-reported session state

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::configuration::{ForwardingConfiguration, SynchronizationConfiguration};
use crate::url::SessionUrl;

/// Daemon-assigned session identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the daemon left the identifier blank
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The two kinds of session the daemon manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Forwarding,
    Synchronization,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Forwarding => write!(f, "forwarding"),
            SessionKind::Synchronization => write!(f, "synchronization"),
        }
    }
}

/// Desired state of a forwarding session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingSpecification {
    pub name: String,
    pub source: SessionUrl,
    pub destination: SessionUrl,
    #[serde(default)]
    pub configuration: ForwardingConfiguration,
    #[serde(default)]
    pub configuration_source: ForwardingConfiguration,
    #[serde(default)]
    pub configuration_destination: ForwardingConfiguration,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ForwardingSpecification {
    /// Whether a live session already realizes this specification.
    ///
    /// Names and labels are matched by the caller; this compares endpoints and
    /// every configuration field.
    pub fn is_realized_by(&self, state: &ForwardingSessionState) -> bool {
        let live = &state.specification;
        live.source == self.source
            && live.destination == self.destination
            && live.configuration == self.configuration
            && live.configuration_source == self.configuration_source
            && live.configuration_destination == self.configuration_destination
    }
}

/// Desired state of a synchronization session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizationSpecification {
    pub name: String,
    pub alpha: SessionUrl,
    pub beta: SessionUrl,
    #[serde(default)]
    pub configuration: SynchronizationConfiguration,
    #[serde(default)]
    pub configuration_alpha: SynchronizationConfiguration,
    #[serde(default)]
    pub configuration_beta: SynchronizationConfiguration,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl SynchronizationSpecification {
    /// Whether a live session already realizes this specification.
    pub fn is_realized_by(&self, state: &SynchronizationSessionState) -> bool {
        let live = &state.specification;
        live.alpha == self.alpha
            && live.beta == self.beta
            && live.configuration == self.configuration
            && live.configuration_alpha == self.configuration_alpha
            && live.configuration_beta == self.configuration_beta
    }
}

/// Coarse session status reported by the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Watching,
    Scanning,
    Staging,
    Transitioning,
    Forwarding,
    Paused,
    Halted,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionStatus::Disconnected => "Disconnected",
            SessionStatus::Connecting => "Connecting",
            SessionStatus::Watching => "Watching for changes",
            SessionStatus::Scanning => "Scanning files",
            SessionStatus::Staging => "Staging files",
            SessionStatus::Transitioning => "Applying changes",
            SessionStatus::Forwarding => "Forwarding connections",
            SessionStatus::Paused => "Paused",
            SessionStatus::Halted => "Halted on error",
        };
        f.write_str(text)
    }
}

/// A forwarding session as held by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingSessionState {
    pub identifier: SessionId,
    pub specification: ForwardingSpecification,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// A synchronization session as held by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizationSessionState {
    pub identifier: SessionId,
    pub specification: SynchronizationSpecification,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
