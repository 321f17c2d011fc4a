//! The sidecar service and project views
//!
//! The sidecar is a hidden service added to every project. It mounts the
//! volumes and joins the networks that sessions reference, so the daemon can
//! reach them through the container engine.
//!
//! # Views
//!
//! Lifecycle commands hand the orchestrator one of three derived views of a
//! [`Plan`]:
//!
//! - [`Plan::with_sidecar`]: every service, sidecar included
//! - [`Plan::sidecar_only`]: only the sidecar is acted on
//! - [`Plan::with_sidecar_disabled`]: the user's services are acted on; the
//!   sidecar stays defined so it is not treated as an orphan
//!
//! Views are built by value; the plan itself is never changed.

use std::collections::BTreeMap;

use berth_core::endpoint::volume_mount_root;
use berth_core::project::{ServiceVolume, VolumeMount};
use berth_core::{OsType, Project, Service};

use crate::spec::{Dependencies, Plan};

/// Name of the injected service
pub const SIDECAR_SERVICE_NAME: &str = "berth";

/// Label marking the sidecar container
pub const SIDECAR_ROLE_LABEL_KEY: &str = "io.berth.sidecar.role";

/// Value of [`SIDECAR_ROLE_LABEL_KEY`] on the sidecar
pub const SIDECAR_ROLE_LABEL_VALUE: &str = "sidecar";

/// Label recording which berth version created the sidecar
pub const SIDECAR_VERSION_LABEL_KEY: &str = "io.berth.sidecar.version";

/// Label the orchestrator puts on every container of a project
pub const COMPOSE_PROJECT_LABEL_KEY: &str = "com.docker.compose.project";

/// Build the sidecar service definition
pub fn sidecar_service(image: &str, dependencies: &Dependencies, os_type: OsType) -> Service {
    let mut labels = BTreeMap::new();
    labels.insert(
        SIDECAR_ROLE_LABEL_KEY.to_string(),
        SIDECAR_ROLE_LABEL_VALUE.to_string(),
    );
    labels.insert(
        SIDECAR_VERSION_LABEL_KEY.to_string(),
        berth_core::VERSION.to_string(),
    );

    Service {
        image: Some(image.to_string()),
        volumes: dependencies
            .volumes
            .iter()
            .map(|v| ServiceVolume::Long(VolumeMount::volume(v, volume_mount_root(os_type, v))))
            .collect(),
        networks: dependencies
            .networks
            .iter()
            .map(|n| (n.clone(), None))
            .collect(),
        depends_on: BTreeMap::new(),
        labels,
        extra: BTreeMap::new(),
    }
}

/// A project as presented to one orchestrator call
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectView {
    /// Full project definition, sidecar included
    pub project: Project,
    /// Services the call targets; `None` means all of them
    pub services: Option<Vec<String>>,
}

impl ProjectView {
    /// Whether the view targets nothing at all
    pub fn is_empty(&self) -> bool {
        matches!(&self.services, Some(services) if services.is_empty())
    }
}

impl Plan {
    /// Every service including the sidecar
    pub fn with_sidecar(&self) -> ProjectView {
        ProjectView {
            project: self.project.clone(),
            services: None,
        }
    }

    /// Only the sidecar
    pub fn sidecar_only(&self) -> ProjectView {
        ProjectView {
            project: self.project.clone(),
            services: Some(vec![SIDECAR_SERVICE_NAME.to_string()]),
        }
    }

    /// The user's services, with the sidecar defined but not acted on
    pub fn with_sidecar_disabled(&self) -> ProjectView {
        ProjectView {
            project: self.project.clone(),
            services: Some(self.services.clone()),
        }
    }

    /// Project name
    pub fn name(&self) -> &str {
        &self.project.name
    }
}
