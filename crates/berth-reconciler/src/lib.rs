//! berth-reconciler: Sidecar injection and session reconciliation
//!
//! Builds session specifications and the sidecar service from a project,
//! binds them to the running sidecar container, and drives the session
//! daemon until its sessions match. [`lifecycle::ComposeLifecycle`] ties
//! these steps to the orchestrator's project commands.

pub mod daemon;
pub mod engine;
pub mod lifecycle;
pub mod reconcile;
pub mod reify;
pub mod sidecar;
pub mod spec;

pub use daemon::{DaemonConnector, SessionDaemon, TcpConnector};
pub use engine::{ComposeBackend, DockerComposeCli, DockerEngine, EngineQuery};
pub use lifecycle::ComposeLifecycle;
pub use reconcile::{reconcile, OwnedSessions, Report};
pub use reify::ReifiedSpecifications;
pub use sidecar::ProjectView;
pub use spec::{build, BuildContext, Plan, Specifications};
