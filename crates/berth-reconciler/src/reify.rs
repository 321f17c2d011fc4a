//! Identity reification
//!
//! Specifications are built before the sidecar container exists, so every URL
//! pointing into the sidecar is a placeholder. Once the orchestrator has
//! created the sidecar, [`Specifications::reify`] consumes the built
//! specifications and returns [`ReifiedSpecifications`]: placeholders are
//! rewritten into container URLs and every specification carries the
//! ownership label. Only reified specifications can be reconciled.

use std::collections::BTreeMap;

use berth_core::types::SESSION_OWNER_LABEL_KEY;
use berth_core::{OwnershipLabel, SidecarIdentity};
use berth_protocol::{ForwardingSpecification, SynchronizationSpecification};

use crate::spec::Specifications;

/// Specifications bound to a concrete sidecar container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReifiedSpecifications {
    owner: OwnershipLabel,
    forwarding: BTreeMap<String, ForwardingSpecification>,
    synchronization: BTreeMap<String, SynchronizationSpecification>,
}

impl ReifiedSpecifications {
    /// Label binding these sessions to their sidecar
    pub fn owner(&self) -> &OwnershipLabel {
        &self.owner
    }

    /// Desired forwarding sessions by name
    pub fn forwarding(&self) -> &BTreeMap<String, ForwardingSpecification> {
        &self.forwarding
    }

    /// Desired synchronization sessions by name
    pub fn synchronization(&self) -> &BTreeMap<String, SynchronizationSpecification> {
        &self.synchronization
    }
}

impl Specifications {
    /// Bind the specifications to the sidecar container.
    ///
    /// `daemon_host` is the engine address the daemon uses to reach the
    /// container, the same one the orchestrator talks to.
    pub fn reify(self, sidecar: &SidecarIdentity, daemon_host: &str) -> ReifiedSpecifications {
        let owner = sidecar.ownership_label();
        let container = sidecar.container_id.as_str();

        let forwarding = self
            .forwarding
            .into_iter()
            .map(|(name, mut specification)| {
                specification.source.reify(container, daemon_host);
                specification.destination.reify(container, daemon_host);
                stamp(&mut specification.labels, &owner);
                (name, specification)
            })
            .collect();

        let synchronization = self
            .synchronization
            .into_iter()
            .map(|(name, mut specification)| {
                specification.alpha.reify(container, daemon_host);
                specification.beta.reify(container, daemon_host);
                stamp(&mut specification.labels, &owner);
                (name, specification)
            })
            .collect();

        ReifiedSpecifications {
            owner,
            forwarding,
            synchronization,
        }
    }
}

fn stamp(labels: &mut BTreeMap<String, String>, owner: &OwnershipLabel) {
    labels.insert(
        SESSION_OWNER_LABEL_KEY.to_string(),
        owner.value().to_string(),
    );
}
