//! Specification builder
//!
//! # Build Pass
//!
//! 1. Reject projects that already define the sidecar service
//! 2. Decode the `x-berth` block strictly
//! 3. Pull out the per-kind `defaults` entries
//! 4. For each session: check the name, classify endpoints, merge the three
//!    configuration tiers, record network and volume dependencies
//! 5. Check every dependency is declared by the project
//! 6. Make consumers of dependency volumes wait for the sidecar
//! 7. Add the sidecar service with the dependencies attached
//!
//! The caller's project is never modified; the augmented copy lives in the
//! returned [`Plan`].

use std::collections::{BTreeMap, BTreeSet};

use berth_core::config::{GlobalDefaults, SidecarConfig};
use berth_core::extension::{
    ForwardConfigurationSchema, ForwardDefaults, ForwardEntry, SyncConfigurationSchema,
    SyncDefaults, SyncEntry, EXTENSION_KEY,
};
use berth_core::naming::is_valid_session_name;
use berth_core::project::ServiceDependency;
use berth_core::{
    Classifier, DependencyKind, EngineMetadata, Endpoint, Extension, Project, ValidationError,
};
use berth_protocol::{
    ForwardingSpecification, SessionKind, SynchronizationConfiguration,
    SynchronizationSpecification,
};
use tracing::debug;

use super::merge::{merge_tiers, Layered};
use super::Specifications;
use crate::sidecar::{sidecar_service, SIDECAR_SERVICE_NAME};

/// Networks and volumes the sidecar must be attached to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    pub networks: BTreeSet<String>,
    pub volumes: BTreeSet<String>,
}

impl Dependencies {
    /// Record whatever resource an endpoint lives in
    fn record(&mut self, endpoint: &Endpoint) {
        match endpoint {
            Endpoint::Local { .. } => {}
            Endpoint::Volume { volume, .. } => {
                self.volumes.insert(volume.clone());
            }
            Endpoint::Network { network, .. } => {
                self.networks.insert(network.clone());
            }
        }
    }

    /// Fail on the first dependency the project does not declare
    fn ensure_declared(&self, project: &Project) -> Result<(), ValidationError> {
        if let Some(name) = self
            .networks
            .iter()
            .find(|n| !project.networks.contains_key(*n))
        {
            return Err(ValidationError::UndefinedDependency {
                kind: DependencyKind::Network,
                name: name.clone(),
            });
        }
        if let Some(name) = self
            .volumes
            .iter()
            .find(|v| !project.volumes.contains_key(*v))
        {
            return Err(ValidationError::UndefinedDependency {
                kind: DependencyKind::Volume,
                name: name.clone(),
            });
        }
        Ok(())
    }
}

/// Inputs to a build pass besides the project itself
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    /// Container engine facts (volume mount paths depend on the OS)
    pub metadata: EngineMetadata,
    /// Lowest-precedence configuration tier
    pub defaults: &'a GlobalDefaults,
    /// Sidecar image selection
    pub sidecar: &'a SidecarConfig,
}

/// Result of a build pass
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Project with the sidecar added and ordering constraints applied
    pub project: Project,
    /// Names of the services the caller declared, without the sidecar
    pub services: Vec<String>,
    /// Desired sessions, still holding sidecar placeholders
    pub specifications: Specifications,
    /// Resources the sidecar is attached to
    pub dependencies: Dependencies,
}

/// Build the desired sessions and the sidecar-augmented project.
///
/// Pure with respect to its inputs: the same project and context always
/// produce the same plan.
pub fn build(project: &Project, context: BuildContext<'_>) -> Result<Plan, ValidationError> {
    ensure_no_sidecar_conflict(project)?;

    let mut extension = match project.extension(EXTENSION_KEY) {
        Some(value) => Extension::from_value(value).map_err(ValidationError::InvalidExtension)?,
        None => Extension::default(),
    };

    let forward_defaults = match extension.take_forward_defaults() {
        Some(entry) if entry.declares_endpoints() => {
            return Err(ValidationError::DefaultsMustNotDeclareEndpoints {
                kind: SessionKind::Forwarding,
            })
        }
        Some(entry) => entry.into_defaults(),
        None => ForwardDefaults::default(),
    };
    let sync_defaults = match extension.take_sync_defaults() {
        Some(entry) if entry.declares_endpoints() => {
            return Err(ValidationError::DefaultsMustNotDeclareEndpoints {
                kind: SessionKind::Synchronization,
            })
        }
        Some(entry) => entry.into_defaults(),
        None => SyncDefaults::default(),
    };

    let classifier = Classifier::new(&project.working_dir, context.metadata.os_type);
    let mut dependencies = Dependencies::default();
    let mut specifications = Specifications::default();

    for (name, entry) in &extension.forward {
        let specification = build_forwarding(
            name,
            entry,
            &classifier,
            &context.defaults.forward,
            &forward_defaults,
            &mut dependencies,
        )?;
        specifications.forwarding.insert(name.clone(), specification);
    }

    for (name, entry) in &extension.sync {
        let specification = build_synchronization(
            name,
            entry,
            &classifier,
            &context.defaults.sync,
            &sync_defaults,
            &mut dependencies,
        )?;
        specifications.synchronization.insert(name.clone(), specification);
    }

    dependencies.ensure_declared(project)?;

    let mut augmented = project.clone();
    for (service_name, service) in augmented.services.iter_mut() {
        if service.mounts_any(dependencies.volumes.iter()) {
            debug!(service = %service_name, "Service waits for the sidecar");
            service
                .depends_on
                .insert(SIDECAR_SERVICE_NAME.to_string(), ServiceDependency::started());
        }
    }
    augmented.services.insert(
        SIDECAR_SERVICE_NAME.to_string(),
        sidecar_service(&context.sidecar.image(), &dependencies, context.metadata.os_type),
    );

    Ok(Plan {
        project: augmented,
        services: project.service_names(),
        specifications,
        dependencies,
    })
}

/// Reject projects that already define a service named like the sidecar
pub fn ensure_no_sidecar_conflict(project: &Project) -> Result<(), ValidationError> {
    if project.services.contains_key(SIDECAR_SERVICE_NAME) {
        return Err(ValidationError::ServiceNameConflict {
            name: SIDECAR_SERVICE_NAME.to_string(),
        });
    }
    Ok(())
}

fn build_forwarding(
    name: &str,
    entry: &ForwardEntry,
    classifier: &Classifier,
    global: &ForwardDefaults,
    defaults: &ForwardDefaults,
    dependencies: &mut Dependencies,
) -> Result<ForwardingSpecification, ValidationError> {
    if !is_valid_session_name(name) {
        return Err(ValidationError::InvalidSessionName {
            kind: SessionKind::Forwarding,
            name: name.to_string(),
        });
    }

    let source = required(SessionKind::Forwarding, name, "source", &entry.source)?;
    let destination = required(SessionKind::Forwarding, name, "destination", &entry.destination)?;

    let endpoint_error = |source| ValidationError::Endpoint {
        session: name.to_string(),
        source,
    };
    let source = classifier.forwarding_source(source).map_err(endpoint_error)?;
    let destination = classifier
        .forwarding_destination(destination)
        .map_err(endpoint_error)?;
    debug!(session = name, ?source, ?destination, "Classified forwarding endpoints");

    dependencies.record(&source);
    dependencies.record(&destination);

    let forward = |schema: &ForwardConfigurationSchema| schema.to_configuration();
    Ok(ForwardingSpecification {
        name: name.to_string(),
        source: source.to_url(),
        destination: destination.to_url(),
        configuration: merge_slot(
            name,
            "session",
            false,
            forward(&global.configuration),
            forward(&defaults.configuration),
            forward(&entry.configuration),
        )?,
        configuration_source: merge_slot(
            name,
            "source",
            true,
            forward(&global.configuration_source),
            forward(&defaults.configuration_source),
            forward(&entry.configuration_source),
        )?,
        configuration_destination: merge_slot(
            name,
            "destination",
            true,
            forward(&global.configuration_destination),
            forward(&defaults.configuration_destination),
            forward(&entry.configuration_destination),
        )?,
        labels: BTreeMap::new(),
    })
}

fn build_synchronization(
    name: &str,
    entry: &SyncEntry,
    classifier: &Classifier,
    global: &SyncDefaults,
    defaults: &SyncDefaults,
    dependencies: &mut Dependencies,
) -> Result<SynchronizationSpecification, ValidationError> {
    if !is_valid_session_name(name) {
        return Err(ValidationError::InvalidSessionName {
            kind: SessionKind::Synchronization,
            name: name.to_string(),
        });
    }

    let alpha = required(SessionKind::Synchronization, name, "alpha", &entry.alpha)?;
    let beta = required(SessionKind::Synchronization, name, "beta", &entry.beta)?;

    let (alpha, beta) = classifier
        .synchronization_pair(alpha, beta)
        .map_err(|source| ValidationError::Endpoint {
            session: name.to_string(),
            source,
        })?;
    debug!(session = name, ?alpha, ?beta, "Classified synchronization endpoints");

    dependencies.record(&alpha);
    dependencies.record(&beta);

    let sync = |schema: &SyncConfigurationSchema| -> SynchronizationConfiguration {
        schema.to_configuration()
    };
    Ok(SynchronizationSpecification {
        name: name.to_string(),
        alpha: alpha.to_url(),
        beta: beta.to_url(),
        configuration: merge_slot(
            name,
            "session",
            false,
            sync(&global.configuration),
            sync(&defaults.configuration),
            sync(&entry.configuration),
        )?,
        configuration_alpha: merge_slot(
            name,
            "alpha",
            true,
            sync(&global.configuration_alpha),
            sync(&defaults.configuration_alpha),
            sync(&entry.configuration_alpha),
        )?,
        configuration_beta: merge_slot(
            name,
            "beta",
            true,
            sync(&global.configuration_beta),
            sync(&defaults.configuration_beta),
            sync(&entry.configuration_beta),
        )?,
        labels: BTreeMap::new(),
    })
}

fn required<'e>(
    kind: SessionKind,
    session: &str,
    endpoint: &'static str,
    value: &'e Option<String>,
) -> Result<&'e str, ValidationError> {
    value
        .as_deref()
        .ok_or_else(|| ValidationError::MissingEndpoint {
            kind,
            session: session.to_string(),
            endpoint,
        })
}

fn merge_slot<C: Layered>(
    session: &str,
    role: &'static str,
    endpoint_specific: bool,
    global: C,
    defaults: C,
    entry: C,
) -> Result<C, ValidationError> {
    merge_tiers(&global, &defaults, &entry, endpoint_specific).map_err(|(tier, source)| {
        ValidationError::Configuration {
            session: session.to_string(),
            role,
            tier,
            source,
        }
    })
}
