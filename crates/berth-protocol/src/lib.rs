//! berth-protocol: Wire protocol between berth and the session daemon
//!
//! This crate defines the messages exchanged with the long-running session
//! daemon: session URLs, configuration records, session specifications and
//! states, selections, and the newline-delimited JSON codec that frames them.

pub mod codec;
pub mod configuration;
pub mod error;
pub mod message;
pub mod selection;
pub mod session;
pub mod url;

pub use codec::{ClientCodec, JsonLinesCodec, ServerCodec, MAX_LINE_LENGTH};
pub use configuration::{ConfigurationError, ForwardingConfiguration, SynchronizationConfiguration};
pub use error::ProtocolError;
pub use message::{DaemonRequest, DaemonResponse};
pub use selection::{LabelSelector, Selection};
pub use session::{
    ForwardingSessionState, ForwardingSpecification, SessionId, SessionKind, SessionStatus,
    SynchronizationSessionState, SynchronizationSpecification,
};
pub use url::SessionUrl;
