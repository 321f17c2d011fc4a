//! In-memory session daemon for tests

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use berth_core::DaemonError;
use berth_protocol::{
    ForwardingSessionState, ForwardingSpecification, SessionId, SessionKind, SessionStatus,
    Selection, SynchronizationSessionState, SynchronizationSpecification,
};

use crate::daemon::{DaemonConnector, SessionDaemon};

/// A recorded daemon call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(SessionKind),
    Create(SessionKind, String),
    Terminate(SessionKind, Selection),
    Pause(SessionKind),
    Resume(SessionKind),
    Flush(Selection, bool),
}

/// Holds sessions in vectors and records every call in order
#[derive(Debug, Default)]
pub struct MockDaemon {
    pub forwarding: Vec<ForwardingSessionState>,
    pub synchronization: Vec<SynchronizationSessionState>,
    pub calls: Vec<Call>,
    /// Operation that fails instead of running
    pub fail_on: Option<&'static str>,
    pub(crate) next_id: u32,
}

impl MockDaemon {
    pub fn seed_forwarding(&mut self, specification: ForwardingSpecification) -> SessionId {
        let identifier = self.allocate("fwd");
        self.forwarding.push(ForwardingSessionState {
            identifier: identifier.clone(),
            specification,
            status: SessionStatus::Forwarding,
            last_error: None,
        });
        identifier
    }

    pub fn seed_synchronization(
        &mut self,
        specification: SynchronizationSpecification,
    ) -> SessionId {
        let identifier = self.allocate("sync");
        self.synchronization.push(SynchronizationSessionState {
            identifier: identifier.clone(),
            specification,
            status: SessionStatus::Watching,
            last_error: None,
        });
        identifier
    }

    fn allocate(&mut self, prefix: &str) -> SessionId {
        self.next_id += 1;
        SessionId::new(format!("{}_{}", prefix, self.next_id))
    }

    fn check(&self, operation: &str, target: &str) -> Result<(), DaemonError> {
        if self.fail_on == Some(operation) {
            return Err(DaemonError::Rpc {
                operation: operation.to_string(),
                target: target.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn selects(
    selection: &Selection,
    identifier: &SessionId,
    labels: &std::collections::BTreeMap<String, String>,
) -> bool {
    match selection {
        Selection::Identifiers(ids) => ids.contains(identifier),
        Selection::Labels(selector) => selector.matches(labels),
    }
}

fn set_status(
    daemon: &mut MockDaemon,
    kind: SessionKind,
    selection: &Selection,
    forwarding: SessionStatus,
    synchronization: SessionStatus,
) {
    match kind {
        SessionKind::Forwarding => daemon
            .forwarding
            .iter_mut()
            .filter(|s| selects(selection, &s.identifier, &s.specification.labels))
            .for_each(|s| s.status = forwarding),
        SessionKind::Synchronization => daemon
            .synchronization
            .iter_mut()
            .filter(|s| selects(selection, &s.identifier, &s.specification.labels))
            .for_each(|s| s.status = synchronization),
    }
}

#[async_trait]
impl SessionDaemon for MockDaemon {
    async fn list_forwarding(
        &mut self,
        selection: &Selection,
    ) -> Result<Vec<ForwardingSessionState>, DaemonError> {
        self.calls.push(Call::List(SessionKind::Forwarding));
        self.check("list", "forwarding sessions")?;
        Ok(self
            .forwarding
            .iter()
            .filter(|s| selects(selection, &s.identifier, &s.specification.labels))
            .cloned()
            .collect())
    }

    async fn list_synchronization(
        &mut self,
        selection: &Selection,
    ) -> Result<Vec<SynchronizationSessionState>, DaemonError> {
        self.calls.push(Call::List(SessionKind::Synchronization));
        self.check("list", "synchronization sessions")?;
        Ok(self
            .synchronization
            .iter()
            .filter(|s| selects(selection, &s.identifier, &s.specification.labels))
            .cloned()
            .collect())
    }

    async fn create_forwarding(
        &mut self,
        specification: &ForwardingSpecification,
    ) -> Result<SessionId, DaemonError> {
        self.calls.push(Call::Create(
            SessionKind::Forwarding,
            specification.name.clone(),
        ));
        self.check(
            "create",
            &format!("forwarding session {:?}", specification.name),
        )?;
        Ok(self.seed_forwarding(specification.clone()))
    }

    async fn create_synchronization(
        &mut self,
        specification: &SynchronizationSpecification,
    ) -> Result<SessionId, DaemonError> {
        self.calls.push(Call::Create(
            SessionKind::Synchronization,
            specification.name.clone(),
        ));
        self.check(
            "create",
            &format!("synchronization session {:?}", specification.name),
        )?;
        Ok(self.seed_synchronization(specification.clone()))
    }

    async fn terminate(
        &mut self,
        kind: SessionKind,
        selection: &Selection,
    ) -> Result<(), DaemonError> {
        self.calls.push(Call::Terminate(kind, selection.clone()));
        self.check("terminate", &format!("{} sessions", kind))?;
        match kind {
            SessionKind::Forwarding => self
                .forwarding
                .retain(|s| !selects(selection, &s.identifier, &s.specification.labels)),
            SessionKind::Synchronization => self
                .synchronization
                .retain(|s| !selects(selection, &s.identifier, &s.specification.labels)),
        }
        Ok(())
    }

    async fn pause(&mut self, kind: SessionKind, selection: &Selection) -> Result<(), DaemonError> {
        self.calls.push(Call::Pause(kind));
        self.check("pause", &format!("{} sessions", kind))?;
        set_status(
            self,
            kind,
            selection,
            SessionStatus::Paused,
            SessionStatus::Paused,
        );
        Ok(())
    }

    async fn resume(
        &mut self,
        kind: SessionKind,
        selection: &Selection,
    ) -> Result<(), DaemonError> {
        self.calls.push(Call::Resume(kind));
        self.check("resume", &format!("{} sessions", kind))?;
        set_status(
            self,
            kind,
            selection,
            SessionStatus::Forwarding,
            SessionStatus::Watching,
        );
        Ok(())
    }

    async fn flush(&mut self, selection: &Selection, background: bool) -> Result<(), DaemonError> {
        self.calls.push(Call::Flush(selection.clone(), background));
        self.check("flush", "synchronization sessions")
    }
}

/// Connector handing out a shared [`MockDaemon`], one guard per connection
#[derive(Debug, Default, Clone)]
pub struct MockConnector {
    pub daemon: Arc<Mutex<MockDaemon>>,
    /// Refuse connections
    pub unreachable: bool,
}

#[async_trait]
impl DaemonConnector for MockConnector {
    type Daemon = OwnedMutexGuard<MockDaemon>;

    async fn connect(&self) -> Result<Self::Daemon, DaemonError> {
        if self.unreachable {
            return Err(DaemonError::Timeout {
                address: "mock".to_string(),
            });
        }
        Ok(self.daemon.clone().lock_owned().await)
    }
}

#[async_trait]
impl SessionDaemon for OwnedMutexGuard<MockDaemon> {
    async fn list_forwarding(
        &mut self,
        selection: &Selection,
    ) -> Result<Vec<ForwardingSessionState>, DaemonError> {
        (**self).list_forwarding(selection).await
    }

    async fn list_synchronization(
        &mut self,
        selection: &Selection,
    ) -> Result<Vec<SynchronizationSessionState>, DaemonError> {
        (**self).list_synchronization(selection).await
    }

    async fn create_forwarding(
        &mut self,
        specification: &ForwardingSpecification,
    ) -> Result<SessionId, DaemonError> {
        (**self).create_forwarding(specification).await
    }

    async fn create_synchronization(
        &mut self,
        specification: &SynchronizationSpecification,
    ) -> Result<SessionId, DaemonError> {
        (**self).create_synchronization(specification).await
    }

    async fn terminate(
        &mut self,
        kind: SessionKind,
        selection: &Selection,
    ) -> Result<(), DaemonError> {
        (**self).terminate(kind, selection).await
    }

    async fn pause(&mut self, kind: SessionKind, selection: &Selection) -> Result<(), DaemonError> {
        (**self).pause(kind, selection).await
    }

    async fn resume(
        &mut self,
        kind: SessionKind,
        selection: &Selection,
    ) -> Result<(), DaemonError> {
        (**self).resume(kind, selection).await
    }

    async fn flush(&mut self, selection: &Selection, background: bool) -> Result<(), DaemonError> {
        (**self).flush(selection, background).await
    }
}
