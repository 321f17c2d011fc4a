//! Operations on every session a sidecar owns

use tracing::info;

use berth_core::{DaemonError, OwnershipLabel};
use berth_protocol::{ForwardingSessionState, SessionKind, Selection, SynchronizationSessionState};

use crate::daemon::SessionDaemon;

/// Sessions carrying one owner label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedSessions {
    pub forwarding: Vec<ForwardingSessionState>,
    pub synchronization: Vec<SynchronizationSessionState>,
}

impl OwnedSessions {
    /// Whether no sessions are owned
    pub fn is_empty(&self) -> bool {
        self.forwarding.is_empty() && self.synchronization.is_empty()
    }

    /// Total number of owned sessions
    pub fn len(&self) -> usize {
        self.forwarding.len() + self.synchronization.len()
    }
}

/// List sessions owned by a sidecar
pub async fn list_owned<D>(daemon: &mut D, owner: &OwnershipLabel) -> Result<OwnedSessions, DaemonError>
where
    D: SessionDaemon + ?Sized,
{
    let (forwarding, synchronization) = super::driver::list(daemon, owner).await?;
    Ok(OwnedSessions {
        forwarding,
        synchronization,
    })
}

/// Pause sessions owned by a sidecar
pub async fn pause_owned<D>(daemon: &mut D, owner: &OwnershipLabel) -> Result<(), DaemonError>
where
    D: SessionDaemon + ?Sized,
{
    info!("Pausing sessions owned by {}", owner);
    let selection = Selection::from(owner.selector());
    daemon.pause(SessionKind::Forwarding, &selection).await?;
    daemon.pause(SessionKind::Synchronization, &selection).await
}

/// Resume sessions owned by a sidecar
pub async fn resume_owned<D>(daemon: &mut D, owner: &OwnershipLabel) -> Result<(), DaemonError>
where
    D: SessionDaemon + ?Sized,
{
    super::driver::resume(daemon, owner).await
}

/// Terminate sessions owned by a sidecar
pub async fn terminate_owned<D>(daemon: &mut D, owner: &OwnershipLabel) -> Result<(), DaemonError>
where
    D: SessionDaemon + ?Sized,
{
    info!("Terminating sessions owned by {}", owner);
    let selection = Selection::from(owner.selector());
    daemon.terminate(SessionKind::Forwarding, &selection).await?;
    daemon
        .terminate(SessionKind::Synchronization, &selection)
        .await
}
