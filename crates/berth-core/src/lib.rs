//! berth-core: Core types, descriptor model and validation for berth
//!
//! This crate provides the error taxonomy, configuration, the Compose
//! descriptor model, the `x-berth` extension schema and the endpoint
//! classifier shared by the reconciler and the CLI.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod extension;
pub mod naming;
pub mod project;
pub mod types;

pub use endpoint::{Classifier, Endpoint};
pub use error::{
    BerthError, CollaboratorError, ConfigError, ConfigurationTier, DaemonError, DependencyKind,
    EndpointError, ValidationError,
};
pub use extension::Extension;
pub use project::{Project, Service};
pub use types::{EngineMetadata, OsType, OwnershipLabel, SidecarIdentity};

/// berth version, used for the sidecar image tag and version label
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
