//! Project lifecycle with session reconciliation
//!
//! [`ComposeLifecycle`] wraps the orchestrator so that every project command
//! also keeps the project's sessions in step: sessions are reconciled when
//! the sidecar comes up, paused when it stops and terminated when the
//! project goes down. The sidecar is always handled on its own before the
//! user's services.

use tracing::{debug, info};

use berth_core::config::BerthConfig;
use berth_core::{BerthError, EngineMetadata, Project, SidecarIdentity};

use crate::daemon::DaemonConnector;
use crate::engine::{locate_sidecar, require_sidecar, ComposeBackend, ComposeCommand, EngineQuery};
use crate::reconcile::{self, OwnedSessions, Report};
use crate::spec::{self, BuildContext, Plan};

/// Orchestrator, engine and daemon bound to one configuration
pub struct ComposeLifecycle<B, E, C> {
    backend: B,
    engine: E,
    connector: C,
    config: BerthConfig,
}

impl<B, E, C> ComposeLifecycle<B, E, C>
where
    B: ComposeBackend,
    E: EngineQuery,
    C: DaemonConnector,
{
    pub fn new(backend: B, engine: E, connector: C, config: BerthConfig) -> Self {
        Self {
            backend,
            engine,
            connector,
            config,
        }
    }

    /// Engine metadata, honoring a configured OS override
    pub async fn metadata(&self) -> Result<EngineMetadata, BerthError> {
        match self.config.engine.os_type {
            Some(os_type) => {
                debug!(%os_type, "Using configured engine OS type");
                Ok(EngineMetadata::new(os_type))
            }
            None => Ok(self.engine.metadata().await?),
        }
    }

    /// Build the plan for a project
    pub async fn plan(&self, project: &Project) -> Result<Plan, BerthError> {
        spec::ensure_no_sidecar_conflict(project)?;
        let metadata = self.metadata().await?;
        let plan = spec::build(
            project,
            BuildContext {
                metadata,
                defaults: &self.config.defaults,
                sidecar: &self.config.sidecar,
            },
        )?;
        debug!(
            project = %plan.name(),
            sessions = plan.specifications.len(),
            "Built project plan"
        );
        Ok(plan)
    }

    /// Pull images for every service, the sidecar included
    pub async fn pull(&self, project: &Project) -> Result<(), BerthError> {
        let plan = self.plan(project).await?;
        self.backend
            .run(ComposeCommand::Pull, &plan.with_sidecar(), false)
            .await?;
        Ok(())
    }

    /// Create containers without starting them
    pub async fn create(&self, project: &Project) -> Result<(), BerthError> {
        let plan = self.plan(project).await?;
        self.backend
            .run(ComposeCommand::Create, &plan.sidecar_only(), true)
            .await?;
        self.backend
            .run(ComposeCommand::Create, &plan.with_sidecar_disabled(), false)
            .await?;
        Ok(())
    }

    /// Bring the project up and reconcile its sessions
    pub async fn up(&self, project: &Project) -> Result<Report, BerthError> {
        let plan = self.plan(project).await?;

        self.pause_sessions(plan.name()).await?;
        self.backend
            .run(ComposeCommand::Stop, &plan.sidecar_only(), true)
            .await?;
        self.backend
            .run(ComposeCommand::Up, &plan.sidecar_only(), true)
            .await?;

        let sidecar = require_sidecar(&self.engine, plan.name()).await?;
        let report = self.reconcile(&plan, &sidecar).await?;

        self.backend
            .run(ComposeCommand::Up, &plan.with_sidecar_disabled(), false)
            .await?;
        Ok(report)
    }

    /// Start existing containers and reconcile sessions
    pub async fn start(&self, project: &Project) -> Result<Report, BerthError> {
        let plan = self.plan(project).await?;

        self.backend
            .run(ComposeCommand::Start, &plan.sidecar_only(), true)
            .await?;
        let sidecar = require_sidecar(&self.engine, plan.name()).await?;
        let report = self.reconcile(&plan, &sidecar).await?;

        self.backend
            .run(ComposeCommand::Start, &plan.with_sidecar_disabled(), false)
            .await?;
        Ok(report)
    }

    /// Pause sessions, then stop every container
    pub async fn stop(&self, project: &Project) -> Result<(), BerthError> {
        let plan = self.plan(project).await?;
        self.pause_sessions(plan.name()).await?;
        self.backend
            .run(ComposeCommand::Stop, &plan.with_sidecar(), false)
            .await?;
        Ok(())
    }

    /// Terminate sessions, then remove the project
    pub async fn down(&self, project: &Project) -> Result<(), BerthError> {
        let plan = self.plan(project).await?;
        if let Some(sidecar) = locate_sidecar(&self.engine, plan.name()).await? {
            let mut daemon = self.connector.connect().await?;
            reconcile::terminate_owned(&mut daemon, &sidecar.ownership_label()).await?;
        }
        self.backend
            .run(ComposeCommand::Down, &plan.with_sidecar(), false)
            .await?;
        Ok(())
    }

    /// List sessions, then the project's containers.
    ///
    /// Returns `None` when the project has no sidecar.
    pub async fn ps(&self, project: &Project) -> Result<Option<OwnedSessions>, BerthError> {
        let plan = self.plan(project).await?;
        let sessions = self.sessions(plan.name()).await?;
        self.backend
            .run(ComposeCommand::Ps, &plan.with_sidecar(), false)
            .await?;
        Ok(sessions)
    }

    /// Sessions owned by the project's sidecar, if it exists
    pub async fn sessions(&self, project_name: &str) -> Result<Option<OwnedSessions>, BerthError> {
        match locate_sidecar(&self.engine, project_name).await? {
            Some(sidecar) => {
                let mut daemon = self.connector.connect().await?;
                let sessions =
                    reconcile::list_owned(&mut daemon, &sidecar.ownership_label()).await?;
                Ok(Some(sessions))
            }
            None => Ok(None),
        }
    }

    /// Pause the sessions of a running project
    pub async fn pause(&self, project: &Project) -> Result<(), BerthError> {
        let sidecar = require_sidecar(&self.engine, &project.name).await?;
        let mut daemon = self.connector.connect().await?;
        reconcile::pause_owned(&mut daemon, &sidecar.ownership_label()).await?;
        Ok(())
    }

    /// Resume the sessions of a running project
    pub async fn resume(&self, project: &Project) -> Result<(), BerthError> {
        let sidecar = require_sidecar(&self.engine, &project.name).await?;
        let mut daemon = self.connector.connect().await?;
        reconcile::resume_owned(&mut daemon, &sidecar.ownership_label()).await?;
        Ok(())
    }

    async fn pause_sessions(&self, project_name: &str) -> Result<(), BerthError> {
        if let Some(sidecar) = locate_sidecar(&self.engine, project_name).await? {
            let mut daemon = self.connector.connect().await?;
            reconcile::pause_owned(&mut daemon, &sidecar.ownership_label()).await?;
        }
        Ok(())
    }

    async fn reconcile(&self, plan: &Plan, sidecar: &SidecarIdentity) -> Result<Report, BerthError> {
        let desired = plan
            .specifications
            .clone()
            .reify(sidecar, &self.engine.daemon_host());

        let mut daemon = self.connector.connect().await?;
        let report = reconcile::reconcile(&desired, &mut daemon).await?;
        info!(
            project = %plan.name(),
            pruned = report.pruned_forwarding.len() + report.pruned_synchronization.len(),
            created = report.created_forwarding.len() + report.created_synchronization.len(),
            "Reconciled sessions"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{FakeEngine, Invocation, RecordingBackend};
    use crate::reconcile::testing::{Call, MockConnector};
    use crate::sidecar::SIDECAR_SERVICE_NAME;
    use berth_core::{CollaboratorError, OsType, ValidationError};
    use berth_protocol::SessionKind;

    const PROJECT: &str = r#"
services:
  web:
    image: nginx
  worker:
    image: busybox
    volumes:
      - cache:/cache
networks:
  backend: {}
volumes:
  cache: {}
x-berth:
  forward:
    web:
      source: tcp:localhost:8080
      destination: network://backend:tcp:web:80
  sync:
    data:
      alpha: ./app
      beta: volume://cache
"#;

    const SIDECAR_ID: &str = "0123456789abcdef0123456789abcdef";

    fn project() -> Project {
        Project::from_yaml(PROJECT, "demo", "/srv/demo").unwrap()
    }

    fn lifecycle(
        sidecars: &[&str],
    ) -> ComposeLifecycle<RecordingBackend, FakeEngine, MockConnector> {
        ComposeLifecycle::new(
            RecordingBackend::default(),
            FakeEngine::new(sidecars),
            MockConnector::default(),
            BerthConfig::default(),
        )
    }

    fn sidecar_only() -> Option<Vec<String>> {
        Some(vec![SIDECAR_SERVICE_NAME.to_string()])
    }

    fn user_services() -> Option<Vec<String>> {
        Some(vec!["web".to_string(), "worker".to_string()])
    }

    #[tokio::test]
    async fn test_up_reconciles_between_sidecar_and_services() {
        let lifecycle = lifecycle(&[SIDECAR_ID]);
        let report = lifecycle.up(&project()).await.unwrap();
        assert_eq!(report.created_forwarding.len(), 1);
        assert_eq!(report.created_synchronization.len(), 1);

        let invocations = lifecycle.backend.invocations();
        let commands: Vec<(ComposeCommand, Option<Vec<String>>)> = invocations
            .iter()
            .map(|i| (i.command, i.services.clone()))
            .collect();
        assert_eq!(
            commands,
            vec![
                (ComposeCommand::Stop, sidecar_only()),
                (ComposeCommand::Up, sidecar_only()),
                (ComposeCommand::Up, user_services()),
            ]
        );

        let daemon = lifecycle.connector.daemon.lock().await;
        assert_eq!(daemon.forwarding.len(), 1);
        assert_eq!(daemon.synchronization.len(), 1);
        assert!(daemon.calls.contains(&Call::Pause(SessionKind::Forwarding)));
    }

    #[tokio::test]
    async fn test_up_twice_is_idempotent() {
        let lifecycle = lifecycle(&[SIDECAR_ID]);
        lifecycle.up(&project()).await.unwrap();
        let report = lifecycle.up(&project()).await.unwrap();
        assert!(report.is_unchanged());
    }

    #[tokio::test]
    async fn test_up_without_sidecar_container_fails_before_services() {
        let lifecycle = lifecycle(&[]);
        let err = lifecycle.up(&project()).await.unwrap_err();
        assert!(matches!(
            err,
            BerthError::Collaborator(berth_core::CollaboratorError::SidecarNotFound { .. })
        ));
        assert!(!lifecycle
            .backend
            .invocations()
            .iter()
            .any(|i| i.services == user_services()));
    }

    #[tokio::test]
    async fn test_create_handles_sidecar_alone_first() {
        let lifecycle = lifecycle(&[]);
        lifecycle.create(&project()).await.unwrap();
        assert_eq!(
            lifecycle.backend.invocations(),
            vec![
                Invocation {
                    command: ComposeCommand::Create,
                    services: sidecar_only(),
                    ignore_orphans: true,
                },
                Invocation {
                    command: ComposeCommand::Create,
                    services: user_services(),
                    ignore_orphans: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_down_terminates_sessions_first() {
        let lifecycle = lifecycle(&[SIDECAR_ID]);
        lifecycle.up(&project()).await.unwrap();

        lifecycle.down(&project()).await.unwrap();
        let daemon = lifecycle.connector.daemon.lock().await;
        assert!(daemon.forwarding.is_empty());
        assert!(daemon.synchronization.is_empty());

        let last = lifecycle.backend.invocations().pop().unwrap();
        assert_eq!(last.command, ComposeCommand::Down);
        assert_eq!(last.services, None);
    }

    #[tokio::test]
    async fn test_down_without_sidecar_skips_daemon() {
        let lifecycle = ComposeLifecycle::new(
            RecordingBackend::default(),
            FakeEngine::new(&[]),
            MockConnector {
                unreachable: true,
                ..Default::default()
            },
            BerthConfig::default(),
        );
        lifecycle.down(&project()).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_pauses_sessions() {
        let lifecycle = lifecycle(&[SIDECAR_ID]);
        lifecycle.up(&project()).await.unwrap();
        lifecycle.stop(&project()).await.unwrap();

        let daemon = lifecycle.connector.daemon.lock().await;
        assert!(daemon
            .forwarding
            .iter()
            .all(|s| s.status == berth_protocol::SessionStatus::Paused));
    }

    #[tokio::test]
    async fn test_ps_lists_sessions() {
        let lifecycle = lifecycle(&[SIDECAR_ID]);
        lifecycle.up(&project()).await.unwrap();

        let sessions = lifecycle.ps(&project()).await.unwrap().unwrap();
        assert_eq!(sessions.len(), 2);

        let none = self::lifecycle(&[]).ps(&project()).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_ps_rejects_multiple_sidecars() {
        let lifecycle = lifecycle(&["a", "b"]);
        assert!(lifecycle.ps(&project()).await.is_err());
    }

    #[tokio::test]
    async fn test_os_override_skips_engine_query() {
        let mut config = BerthConfig::default();
        config.engine.os_type = Some(OsType::Windows);
        let lifecycle = ComposeLifecycle::new(
            RecordingBackend::default(),
            FakeEngine::new(&[]),
            MockConnector::default(),
            config,
        );
        let plan = lifecycle.plan(&project()).await.unwrap();
        assert_eq!(
            plan.specifications.synchronization["data"].beta.path(),
            "c:\\volumes\\cache"
        );
    }

    #[tokio::test]
    async fn test_sidecar_name_conflict_reported_before_engine_query() {
        let yaml = PROJECT.replace("  worker:", "  berth:");
        let project = Project::from_yaml(&yaml, "demo", "/srv/demo").unwrap();
        let lifecycle = ComposeLifecycle::new(
            RecordingBackend::default(),
            FakeEngine::unreachable(),
            MockConnector::default(),
            BerthConfig::default(),
        );

        let err = lifecycle.plan(&project).await.unwrap_err();
        assert!(matches!(
            err,
            BerthError::Validation(ValidationError::ServiceNameConflict { .. })
        ));

        let err = lifecycle.up(&project).await.unwrap_err();
        assert!(matches!(err, BerthError::Validation(_)));
        assert!(lifecycle.backend.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_engine_fails_plan() {
        let lifecycle = ComposeLifecycle::new(
            RecordingBackend::default(),
            FakeEngine::unreachable(),
            MockConnector::default(),
            BerthConfig::default(),
        );
        let err = lifecycle.plan(&project()).await.unwrap_err();
        assert!(matches!(
            err,
            BerthError::Collaborator(CollaboratorError::MetadataUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_pause_and_resume_require_sidecar() {
        let lifecycle = lifecycle(&[]);
        assert!(lifecycle.pause(&project()).await.is_err());
        assert!(lifecycle.resume(&project()).await.is_err());
    }
}
