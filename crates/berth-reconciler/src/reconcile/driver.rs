//! The reconciliation pass
//!
//! Phases run strictly in order on one daemon connection:
//!
//! 1. list the sessions carrying the owner label
//! 2. classify and diff against the desired set
//! 3. prune, one batched terminate per kind
//! 4. resume everything under the label
//! 5. create missing sessions
//! 6. flush newly created synchronization sessions, blocking
//!
//! The first failing call aborts the pass. Nothing is recorded between
//! passes, so running again converges from wherever the last one stopped.

use tracing::{debug, info};

use berth_core::{DaemonError, OwnershipLabel};
use berth_protocol::{
    ForwardingSessionState, ForwardingSpecification, SessionId, SessionKind, Selection,
    SynchronizationSessionState, SynchronizationSpecification,
};

use super::plan::{classify, diff, Changes};
use crate::daemon::SessionDaemon;
use crate::reify::ReifiedSpecifications;

/// What a pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub pruned_forwarding: Vec<SessionId>,
    pub pruned_synchronization: Vec<SessionId>,
    pub created_forwarding: Vec<SessionId>,
    pub created_synchronization: Vec<SessionId>,
}

impl Report {
    /// Whether the pass left every session as it found it
    pub fn is_unchanged(&self) -> bool {
        self.pruned_forwarding.is_empty()
            && self.pruned_synchronization.is_empty()
            && self.created_forwarding.is_empty()
            && self.created_synchronization.is_empty()
    }
}

/// Bring the daemon's sessions in line with `desired`
pub async fn reconcile<D>(
    desired: &ReifiedSpecifications,
    daemon: &mut D,
) -> Result<Report, DaemonError>
where
    D: SessionDaemon + ?Sized,
{
    let owner = desired.owner();
    let (forwarding, synchronization) = list(daemon, owner).await?;

    let forwarding_changes = diff(
        desired.forwarding(),
        classify(desired.forwarding(), &forwarding),
    );
    let synchronization_changes = diff(
        desired.synchronization(),
        classify(desired.synchronization(), &synchronization),
    );
    debug!(
        forwarding_prune = forwarding_changes.prune.len(),
        forwarding_create = forwarding_changes.create.len(),
        synchronization_prune = synchronization_changes.prune.len(),
        synchronization_create = synchronization_changes.create.len(),
        "Computed session changes"
    );

    let Changes {
        prune: pruned_forwarding,
        create: create_forwarding,
    } = forwarding_changes;
    let Changes {
        prune: pruned_synchronization,
        create: create_synchronization,
    } = synchronization_changes;

    prune(daemon, SessionKind::Forwarding, &pruned_forwarding).await?;
    prune(daemon, SessionKind::Synchronization, &pruned_synchronization).await?;

    resume(daemon, owner).await?;

    let created_forwarding = create_forwarding_sessions(daemon, &create_forwarding).await?;
    let created_synchronization =
        create_synchronization_sessions(daemon, &create_synchronization).await?;

    flush(daemon, &created_synchronization).await?;

    Ok(Report {
        pruned_forwarding,
        pruned_synchronization,
        created_forwarding,
        created_synchronization,
    })
}

/// List both kinds of session under the owner label
pub async fn list<D>(
    daemon: &mut D,
    owner: &OwnershipLabel,
) -> Result<(Vec<ForwardingSessionState>, Vec<SynchronizationSessionState>), DaemonError>
where
    D: SessionDaemon + ?Sized,
{
    let selection = Selection::from(owner.selector());
    let forwarding = daemon.list_forwarding(&selection).await?;
    let synchronization = daemon.list_synchronization(&selection).await?;
    debug!(
        owner = %owner,
        forwarding = forwarding.len(),
        synchronization = synchronization.len(),
        "Listed owned sessions"
    );
    Ok((forwarding, synchronization))
}

/// Terminate sessions by identifier; no call when there is nothing to prune
pub async fn prune<D>(
    daemon: &mut D,
    kind: SessionKind,
    identifiers: &[SessionId],
) -> Result<(), DaemonError>
where
    D: SessionDaemon + ?Sized,
{
    if identifiers.is_empty() {
        return Ok(());
    }
    info!("Pruning {} {} session(s)", identifiers.len(), kind);
    daemon
        .terminate(kind, &Selection::from(identifiers.to_vec()))
        .await
}

/// Resume every session under the owner label
pub async fn resume<D>(daemon: &mut D, owner: &OwnershipLabel) -> Result<(), DaemonError>
where
    D: SessionDaemon + ?Sized,
{
    info!("Resuming sessions owned by {}", owner);
    let selection = Selection::from(owner.selector());
    daemon.resume(SessionKind::Forwarding, &selection).await?;
    daemon
        .resume(SessionKind::Synchronization, &selection)
        .await
}

/// Create forwarding sessions in order, returning their identifiers
pub async fn create_forwarding_sessions<D>(
    daemon: &mut D,
    specifications: &[&ForwardingSpecification],
) -> Result<Vec<SessionId>, DaemonError>
where
    D: SessionDaemon + ?Sized,
{
    let mut created = Vec::with_capacity(specifications.len());
    for specification in specifications {
        info!("Creating forwarding session {}", specification.name);
        created.push(daemon.create_forwarding(specification).await?);
    }
    Ok(created)
}

/// Create synchronization sessions in order, returning their identifiers
pub async fn create_synchronization_sessions<D>(
    daemon: &mut D,
    specifications: &[&SynchronizationSpecification],
) -> Result<Vec<SessionId>, DaemonError>
where
    D: SessionDaemon + ?Sized,
{
    let mut created = Vec::with_capacity(specifications.len());
    for specification in specifications {
        info!("Creating synchronization session {}", specification.name);
        created.push(daemon.create_synchronization(specification).await?);
    }
    Ok(created)
}

/// Wait for an initial cycle of the given synchronization sessions
pub async fn flush<D>(daemon: &mut D, identifiers: &[SessionId]) -> Result<(), DaemonError>
where
    D: SessionDaemon + ?Sized,
{
    if identifiers.is_empty() {
        return Ok(());
    }
    info!(
        "Waiting for initial synchronization of {} session(s)",
        identifiers.len()
    );
    daemon
        .flush(&Selection::from(identifiers.to_vec()), false)
        .await
}
