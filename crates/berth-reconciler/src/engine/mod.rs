//! Container engine collaborators
//!
//! [`EngineQuery`] answers questions about the engine (its platform and
//! which containers exist); [`ComposeBackend`] performs project operations.
//! Both are traits so the lifecycle can run against fakes in tests.

mod compose;
mod docker;

pub use compose::{ComposeBackend, ComposeCommand, DockerComposeCli};
pub use docker::{DockerEngine, DEFAULT_DAEMON_HOST};

use async_trait::async_trait;
use tracing::debug;

use berth_core::{CollaboratorError, EngineMetadata, SidecarIdentity};

/// Read-only engine queries
#[async_trait]
pub trait EngineQuery: Send + Sync {
    /// Platform information used to lay out sidecar mounts
    async fn metadata(&self) -> Result<EngineMetadata, CollaboratorError>;

    /// Identifiers of sidecar containers belonging to `project`
    async fn find_sidecars(&self, project: &str) -> Result<Vec<String>, CollaboratorError>;

    /// Address through which the session daemon reaches the engine
    fn daemon_host(&self) -> String;
}

/// Find the sidecar of `project`, if one exists.
///
/// More than one sidecar container is an error.
pub async fn locate_sidecar<E>(
    engine: &E,
    project: &str,
) -> Result<Option<SidecarIdentity>, CollaboratorError>
where
    E: EngineQuery + ?Sized,
{
    let mut containers = engine.find_sidecars(project).await?;
    match containers.len() {
        0 => {
            debug!(project, "No sidecar container found");
            Ok(None)
        }
        1 => {
            let id = containers.remove(0);
            debug!(project, container = %id, "Located sidecar container");
            Ok(Some(SidecarIdentity::new(id)))
        }
        count => Err(CollaboratorError::MultipleSidecars {
            project: project.to_string(),
            count,
        }),
    }
}

/// Find the sidecar of `project`, which must exist
pub async fn require_sidecar<E>(
    engine: &E,
    project: &str,
) -> Result<SidecarIdentity, CollaboratorError>
where
    E: EngineQuery + ?Sized,
{
    locate_sidecar(engine, project)
        .await?
        .ok_or_else(|| CollaboratorError::SidecarNotFound {
            project: project.to_string(),
        })
}


#[cfg(test)]
mod tests {
    use super::testing::FakeEngine;
    use super::*;

    #[tokio::test]
    async fn test_locate_sidecar() {
        assert_eq!(locate_sidecar(&FakeEngine::new(&[]), "demo").await.unwrap(), None);

        let found = locate_sidecar(&FakeEngine::new(&["abc"]), "demo")
            .await
            .unwrap();
        assert_eq!(found, Some(SidecarIdentity::new("abc")));

        let err = locate_sidecar(&FakeEngine::new(&["abc", "def"]), "demo")
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::MultipleSidecars { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_require_sidecar_missing() {
        let err = require_sidecar(&FakeEngine::new(&[]), "demo")
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::SidecarNotFound { ref project } if project == "demo"));
    }
}
