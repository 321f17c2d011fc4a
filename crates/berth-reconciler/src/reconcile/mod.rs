//! Session reconciliation
//!
//! Compares the sessions a sidecar owns against its reified specifications
//! and issues the daemon calls that close the gap.

mod driver;
mod owned;
pub mod plan;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::{
    create_forwarding_sessions, create_synchronization_sessions, flush, list, prune, reconcile,
    resume, Report,
};
pub use owned::{list_owned, pause_owned, resume_owned, terminate_owned, OwnedSessions};
