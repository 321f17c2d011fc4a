//! Session daemon access
//!
//! The reconciler only talks to the daemon through [`SessionDaemon`], so the
//! driver can be exercised against an in-memory daemon in tests. A
//! [`DaemonConnector`] opens one connection per reconciliation pass; the
//! connection is closed when the returned daemon handle is dropped, on every
//! exit path.

mod client;

pub use client::{TcpConnector, TcpDaemonClient};

use async_trait::async_trait;
use berth_core::DaemonError;
use berth_protocol::{
    ForwardingSessionState, ForwardingSpecification, SessionId, SessionKind, Selection,
    SynchronizationSessionState, SynchronizationSpecification,
};

/// Operations the session daemon exposes
#[async_trait]
pub trait SessionDaemon: Send {
    /// List forwarding sessions matching a selection
    async fn list_forwarding(
        &mut self,
        selection: &Selection,
    ) -> Result<Vec<ForwardingSessionState>, DaemonError>;

    /// List synchronization sessions matching a selection
    async fn list_synchronization(
        &mut self,
        selection: &Selection,
    ) -> Result<Vec<SynchronizationSessionState>, DaemonError>;

    /// Create a forwarding session
    async fn create_forwarding(
        &mut self,
        specification: &ForwardingSpecification,
    ) -> Result<SessionId, DaemonError>;

    /// Create a synchronization session
    async fn create_synchronization(
        &mut self,
        specification: &SynchronizationSpecification,
    ) -> Result<SessionId, DaemonError>;

    /// Terminate sessions; idempotent
    async fn terminate(&mut self, kind: SessionKind, selection: &Selection)
        -> Result<(), DaemonError>;

    /// Pause sessions; idempotent
    async fn pause(&mut self, kind: SessionKind, selection: &Selection) -> Result<(), DaemonError>;

    /// Resume sessions; idempotent
    async fn resume(&mut self, kind: SessionKind, selection: &Selection)
        -> Result<(), DaemonError>;

    /// Run a synchronization cycle; blocks until done unless `background`
    async fn flush(&mut self, selection: &Selection, background: bool) -> Result<(), DaemonError>;
}

/// Opens daemon connections
#[async_trait]
pub trait DaemonConnector: Send + Sync {
    type Daemon: SessionDaemon;

    /// Connect to the daemon
    async fn connect(&self) -> Result<Self::Daemon, DaemonError>;
}
