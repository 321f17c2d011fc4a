//! Session specifications built from a descriptor
//!
//! [`build`] turns a project's `x-berth` block into desired session
//! specifications plus the sidecar service that anchors them. Specifications
//! come out with placeholder URLs for anything inside the sidecar; they only
//! become usable after [`Specifications::reify`](crate::reify) once the sidecar
//! container exists.

mod builder;
pub mod merge;

pub use builder::{build, ensure_no_sidecar_conflict, BuildContext, Dependencies, Plan};

use berth_protocol::{ForwardingSpecification, SynchronizationSpecification};
use std::collections::BTreeMap;

/// Desired sessions, keyed by session name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Specifications {
    pub forwarding: BTreeMap<String, ForwardingSpecification>,
    pub synchronization: BTreeMap<String, SynchronizationSpecification>,
}

impl Specifications {
    /// Whether no sessions are desired
    pub fn is_empty(&self) -> bool {
        self.forwarding.is_empty() && self.synchronization.is_empty()
    }

    /// Total number of desired sessions
    pub fn len(&self) -> usize {
        self.forwarding.len() + self.synchronization.len()
    }
}
