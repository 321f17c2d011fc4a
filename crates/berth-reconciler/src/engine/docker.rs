//! Docker engine queries over the engine API

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::Docker;
use tracing::debug;

use berth_core::{CollaboratorError, EngineMetadata, OsType};

use super::EngineQuery;
use crate::sidecar::{COMPOSE_PROJECT_LABEL_KEY, SIDECAR_ROLE_LABEL_KEY, SIDECAR_ROLE_LABEL_VALUE};

/// Engine address used when `DOCKER_HOST` is unset
#[cfg(unix)]
pub const DEFAULT_DAEMON_HOST: &str = "unix:///var/run/docker.sock";

/// Engine address used when `DOCKER_HOST` is unset
#[cfg(windows)]
pub const DEFAULT_DAEMON_HOST: &str = "npipe:////./pipe/docker_engine";

/// Docker engine client
#[derive(Debug, Clone)]
pub struct DockerEngine {
    docker: Docker,
    host: String,
}

impl DockerEngine {
    /// Connect using the local defaults (`DOCKER_HOST` or the platform socket)
    pub fn connect() -> Result<Self, CollaboratorError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| CollaboratorError::MetadataUnavailable(e.to_string()))?;
        let host = std::env::var("DOCKER_HOST")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_DAEMON_HOST.to_string());
        debug!(host = %host, "Connected to container engine");
        Ok(Self { docker, host })
    }
}

/// Label filters selecting the sidecar of one project
pub(crate) fn sidecar_filters(project: &str) -> HashMap<String, Vec<String>> {
    let mut filters = HashMap::new();
    filters.insert(
        "label".to_string(),
        vec![
            format!("{}={}", COMPOSE_PROJECT_LABEL_KEY, project),
            format!("{}={}", SIDECAR_ROLE_LABEL_KEY, SIDECAR_ROLE_LABEL_VALUE),
        ],
    );
    filters
}

#[async_trait]
impl EngineQuery for DockerEngine {
    async fn metadata(&self) -> Result<EngineMetadata, CollaboratorError> {
        let info = self
            .docker
            .info()
            .await
            .map_err(|e| CollaboratorError::MetadataUnavailable(e.to_string()))?;
        let os_type = info
            .os_type
            .as_deref()
            .ok_or_else(|| {
                CollaboratorError::MetadataUnavailable("engine did not report an OS type".into())
            })?
            .parse::<OsType>()
            .map_err(CollaboratorError::MetadataUnavailable)?;
        Ok(EngineMetadata::new(os_type))
    }

    async fn find_sidecars(&self, project: &str) -> Result<Vec<String>, CollaboratorError> {
        let options = ListContainersOptions::<String> {
            all: true,
            filters: sidecar_filters(project),
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| CollaboratorError::Orchestrator {
                operation: "list containers".to_string(),
                message: e.to_string(),
            })?;
        Ok(containers.into_iter().filter_map(|c| c.id).collect())
    }

    fn daemon_host(&self) -> String {
        self.host.clone()
    }
}
