//! Request and response messages exchanged with the session daemon
//!
//! Each message is one JSON object tagged by `type`. The client sends a single
//! [`DaemonRequest`] and waits for exactly one [`DaemonResponse`] before sending
//! the next; there is no pipelining.
//!
//! # Message Flow
//!
//! 1. `list_*` with a label selection returns `forwarding_sessions` or
//!    `synchronization_sessions`
//! 2. `create_*` returns `created` with the new identifier
//! 3. `terminate`, `pause`, `resume` and `flush` return `ok`
//! 4. Any failure returns `error` with a description

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::selection::Selection;
use crate::session::{
    ForwardingSessionState, ForwardingSpecification, SessionId, SessionKind,
    SynchronizationSessionState, SynchronizationSpecification,
};

/// Request sent to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonRequest {
    /// List forwarding sessions
    ListForwarding { selection: Selection },

    /// List synchronization sessions
    ListSynchronization { selection: Selection },

    /// Create a forwarding session
    CreateForwarding {
        specification: ForwardingSpecification,
    },

    /// Create a synchronization session
    CreateSynchronization {
        specification: SynchronizationSpecification,
    },

    /// Terminate sessions
    Terminate {
        kind: SessionKind,
        selection: Selection,
    },

    /// Pause sessions
    Pause {
        kind: SessionKind,
        selection: Selection,
    },

    /// Resume sessions
    Resume {
        kind: SessionKind,
        selection: Selection,
    },

    /// Force a synchronization cycle
    Flush {
        selection: Selection,
        /// When false the daemon answers only after the cycle completes
        background: bool,
    },
}

impl DaemonRequest {
    /// Short operation name used in logs and errors
    pub fn operation(&self) -> &'static str {
        match self {
            DaemonRequest::ListForwarding { .. } | DaemonRequest::ListSynchronization { .. } => {
                "list"
            }
            DaemonRequest::CreateForwarding { .. } | DaemonRequest::CreateSynchronization { .. } => {
                "create"
            }
            DaemonRequest::Terminate { .. } => "terminate",
            DaemonRequest::Pause { .. } => "pause",
            DaemonRequest::Resume { .. } => "resume",
            DaemonRequest::Flush { .. } => "flush",
        }
    }
}

/// Response sent by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonResponse {
    /// Result of `list_forwarding`
    ForwardingSessions {
        sessions: Vec<ForwardingSessionState>,
    },

    /// Result of `list_synchronization`
    SynchronizationSessions {
        sessions: Vec<SynchronizationSessionState>,
    },

    /// Result of `create_*`
    Created { identifier: SessionId },

    /// Generic success
    Ok,

    /// Request failed
    Error { message: String },
}

impl DaemonResponse {
    /// Reject listings the reconciler cannot act on.
    ///
    /// Every listed session must carry a non-empty identifier, otherwise it
    /// could never be pruned.
    pub fn ensure_valid(&self) -> Result<(), ProtocolError> {
        let blank = match self {
            DaemonResponse::ForwardingSessions { sessions } => sessions
                .iter()
                .find(|s| s.identifier.is_empty())
                .map(|s| s.specification.name.clone()),
            DaemonResponse::SynchronizationSessions { sessions } => sessions
                .iter()
                .find(|s| s.identifier.is_empty())
                .map(|s| s.specification.name.clone()),
            DaemonResponse::Created { identifier } if identifier.is_empty() => {
                return Err(ProtocolError::InvalidListing(
                    "created session has an empty identifier".to_string(),
                ))
            }
            _ => None,
        };

        match blank {
            Some(name) => Err(ProtocolError::InvalidListing(format!(
                "session {:?} has an empty identifier",
                name
            ))),
            None => Ok(()),
        }
    }
}
