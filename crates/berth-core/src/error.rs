//! Core error types for berth

use berth_protocol::{ConfigurationError, ProtocolError, SessionKind};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for berth
#[derive(Error, Debug)]
pub enum BerthError {
    /// Invalid descriptor or session definitions
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Engine or orchestrator failure
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// Session daemon failure
    #[error("Daemon error: {0}")]
    Daemon(#[from] DaemonError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Endpoint classification errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// The endpoint is malformed or not allowed in its position
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// A forwarding source that is not TCP-based
    #[error("unsupported transport in {endpoint:?}: only TCP forwarding sources are supported")]
    UnsupportedTransport { endpoint: String },

    /// A forwarding destination that is not a network reference
    #[error("expected a network endpoint, got {endpoint:?}")]
    ExpectedNetworkEndpoint { endpoint: String },

    /// A synchronization endpoint using a protocol other than local or volume
    #[error("unsupported protocol in {endpoint:?}: only local and volume endpoints can be synchronized")]
    UnsupportedProtocol { endpoint: String },

    /// A synchronization pair without exactly one volume endpoint
    #[error("exactly one synchronization endpoint must be a volume (got {alpha:?} and {beta:?})")]
    AmbiguousVolumeRole { alpha: String, beta: String },

    /// A local path could not be resolved
    #[error("unable to resolve path {path:?}: {reason}")]
    PathResolutionFailed { path: String, reason: String },
}

/// Kind of resource a session can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Network,
    Volume,
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyKind::Network => write!(f, "network"),
            DependencyKind::Volume => write!(f, "volume"),
        }
    }
}

/// Layer a session configuration came from, lowest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigurationTier {
    /// User configuration file
    Global,
    /// The descriptor's `defaults` entry
    Defaults,
    /// The session entry itself
    Session,
}

impl std::fmt::Display for ConfigurationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationTier::Global => write!(f, "global defaults"),
            ConfigurationTier::Defaults => write!(f, "project defaults"),
            ConfigurationTier::Session => write!(f, "session definition"),
        }
    }
}

/// Errors detected before any daemon interaction
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The descriptor already defines a service with the sidecar's name
    #[error("project already contains a service named {name:?}")]
    ServiceNameConflict { name: String },

    /// A `defaults` entry declared endpoint addresses
    #[error("{kind} defaults must not declare endpoints")]
    DefaultsMustNotDeclareEndpoints { kind: SessionKind },

    /// A session name outside the naming grammar
    #[error("invalid {kind} session name {name:?}")]
    InvalidSessionName { kind: SessionKind, name: String },

    /// A session entry lacks an endpoint
    #[error("{kind} session {session:?} is missing its {endpoint} endpoint")]
    MissingEndpoint {
        kind: SessionKind,
        session: String,
        endpoint: &'static str,
    },

    /// An endpoint of a session failed classification
    #[error("invalid endpoint in session {session:?}: {source}")]
    Endpoint {
        session: String,
        #[source]
        source: EndpointError,
    },

    /// A configuration layer failed validation
    #[error("invalid {role} configuration in {tier} for {session:?}: {source}")]
    Configuration {
        session: String,
        role: &'static str,
        tier: ConfigurationTier,
        #[source]
        source: ConfigurationError,
    },

    /// A session references a network or volume the project does not declare
    #[error("undefined {kind} {name:?} referenced by sessions")]
    UndefinedDependency { kind: DependencyKind, name: String },

    /// The extension block could not be decoded
    #[error("invalid x-berth section: {0}")]
    InvalidExtension(#[source] serde_yaml::Error),

    /// The descriptor itself could not be decoded
    #[error("invalid project file: {0}")]
    InvalidDescriptor(#[source] serde_yaml::Error),
}

/// Failures of the container engine or orchestrator
#[derive(Error, Debug)]
pub enum CollaboratorError {
    /// Engine metadata could not be queried
    #[error("unable to query container engine metadata: {0}")]
    MetadataUnavailable(String),

    /// An orchestrator operation failed
    #[error("{operation} failed: {message}")]
    Orchestrator { operation: String, message: String },

    /// No sidecar container exists for the project
    #[error("unable to find sidecar container for project {project:?}")]
    SidecarNotFound { project: String },

    /// More than one sidecar container exists for the project
    #[error("found {count} sidecar containers for project {project:?}")]
    MultipleSidecars { project: String, count: usize },
}

/// Session daemon failures
#[derive(Error, Debug)]
pub enum DaemonError {
    /// Could not reach the daemon
    #[error("unable to connect to session daemon at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Connecting took longer than allowed
    #[error("timed out connecting to session daemon at {address}")]
    Timeout { address: String },

    /// The daemon rejected a request
    #[error("unable to {operation} {target}: {message}")]
    Rpc {
        operation: String,
        target: String,
        message: String,
    },

    /// The daemon answered with the wrong kind of response
    #[error("unexpected response to {operation}: {response}")]
    UnexpectedResponse { operation: String, response: String },

    /// The daemon closed the connection mid-request
    #[error("session daemon closed the connection")]
    ConnectionClosed,

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
