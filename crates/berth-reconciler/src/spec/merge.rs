//! Three-tier configuration merging
//!
//! Every configuration slot of a session (session-wide plus one per endpoint)
//! is assembled from three layers, lowest precedence first:
//!
//! 1. global defaults from the user's configuration file
//! 2. the descriptor's `defaults` entry for the session kind
//! 3. the session entry itself
//!
//! Each layer is validated on its own before merging, so an illegal field is
//! reported against the layer that introduced it.

use berth_core::ConfigurationTier;
use berth_protocol::{ConfigurationError, ForwardingConfiguration, SynchronizationConfiguration};

/// A configuration record that can be validated and layered
pub trait Layered: Sized {
    /// Check the record is legal for its role
    fn ensure_valid(&self, endpoint_specific: bool) -> Result<(), ConfigurationError>;

    /// Overlay `higher` on top of `self`
    fn overlay(&self, higher: &Self) -> Self;
}

impl Layered for SynchronizationConfiguration {
    fn ensure_valid(&self, endpoint_specific: bool) -> Result<(), ConfigurationError> {
        SynchronizationConfiguration::ensure_valid(self, endpoint_specific)
    }

    fn overlay(&self, higher: &Self) -> Self {
        self.merge(higher)
    }
}

impl Layered for ForwardingConfiguration {
    fn ensure_valid(&self, endpoint_specific: bool) -> Result<(), ConfigurationError> {
        ForwardingConfiguration::ensure_valid(self, endpoint_specific)
    }

    fn overlay(&self, higher: &Self) -> Self {
        self.merge(higher)
    }
}

/// Validate and merge the three layers of one configuration slot.
///
/// On failure, returns the tier whose layer was rejected.
pub fn merge_tiers<C: Layered>(
    global: &C,
    defaults: &C,
    session: &C,
    endpoint_specific: bool,
) -> Result<C, (ConfigurationTier, ConfigurationError)> {
    global
        .ensure_valid(endpoint_specific)
        .map_err(|e| (ConfigurationTier::Global, e))?;
    defaults
        .ensure_valid(endpoint_specific)
        .map_err(|e| (ConfigurationTier::Defaults, e))?;
    session
        .ensure_valid(endpoint_specific)
        .map_err(|e| (ConfigurationTier::Session, e))?;

    Ok(global.overlay(defaults).overlay(session))
}
