//! TCP client for the session daemon
//!
//! One JSON request per line, one JSON response per line, strictly
//! alternating on a single connection.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use berth_core::config::DaemonConfig;
use berth_core::DaemonError;
use berth_protocol::{
    ClientCodec, DaemonRequest, DaemonResponse, ForwardingSessionState, ForwardingSpecification,
    SessionId, SessionKind, Selection, SynchronizationSessionState, SynchronizationSpecification,
};

use super::{DaemonConnector, SessionDaemon};

/// A connected daemon client
#[derive(Debug)]
pub struct TcpDaemonClient {
    address: String,
    framed: Framed<TcpStream, ClientCodec>,
}

impl TcpDaemonClient {
    /// Connect to the daemon at `address`
    pub async fn connect(address: &str) -> Result<Self, DaemonError> {
        debug!("Connecting to session daemon at {}", address);

        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| DaemonError::Connect {
                address: address.to_string(),
                source,
            })?;

        Ok(Self {
            address: address.to_string(),
            framed: Framed::new(stream, ClientCodec::new()),
        })
    }

    /// Get the address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Send one request and wait for its response.
    ///
    /// Daemon-reported errors are turned into [`DaemonError::Rpc`] naming
    /// `target`.
    async fn call(
        &mut self,
        request: DaemonRequest,
        target: &str,
    ) -> Result<DaemonResponse, DaemonError> {
        let operation = request.operation();
        trace!(address = self.address(), operation, target, "Sending daemon request");

        self.framed.send(request).await?;
        let response = match self.framed.next().await {
            Some(response) => response?,
            None => return Err(DaemonError::ConnectionClosed),
        };
        response.ensure_valid()?;

        match response {
            DaemonResponse::Error { message } => Err(DaemonError::Rpc {
                operation: operation.to_string(),
                target: target.to_string(),
                message,
            }),
            other => Ok(other),
        }
    }

    async fn call_ok(&mut self, request: DaemonRequest, target: &str) -> Result<(), DaemonError> {
        let operation = request.operation();
        match self.call(request, target).await? {
            DaemonResponse::Ok => Ok(()),
            other => Err(unexpected(operation, &other)),
        }
    }
}

fn unexpected(operation: &str, response: &DaemonResponse) -> DaemonError {
    DaemonError::UnexpectedResponse {
        operation: operation.to_string(),
        response: format!("{:?}", response),
    }
}

fn describe(kind: SessionKind, selection: &Selection) -> String {
    format!("{} sessions {}", kind, selection)
}

#[async_trait]
impl SessionDaemon for TcpDaemonClient {
    async fn list_forwarding(
        &mut self,
        selection: &Selection,
    ) -> Result<Vec<ForwardingSessionState>, DaemonError> {
        let target = describe(SessionKind::Forwarding, selection);
        let request = DaemonRequest::ListForwarding {
            selection: selection.clone(),
        };
        match self.call(request, &target).await? {
            DaemonResponse::ForwardingSessions { sessions } => Ok(sessions),
            other => Err(unexpected("list", &other)),
        }
    }

    async fn list_synchronization(
        &mut self,
        selection: &Selection,
    ) -> Result<Vec<SynchronizationSessionState>, DaemonError> {
        let target = describe(SessionKind::Synchronization, selection);
        let request = DaemonRequest::ListSynchronization {
            selection: selection.clone(),
        };
        match self.call(request, &target).await? {
            DaemonResponse::SynchronizationSessions { sessions } => Ok(sessions),
            other => Err(unexpected("list", &other)),
        }
    }

    async fn create_forwarding(
        &mut self,
        specification: &ForwardingSpecification,
    ) -> Result<SessionId, DaemonError> {
        let target = format!("forwarding session {:?}", specification.name);
        let request = DaemonRequest::CreateForwarding {
            specification: specification.clone(),
        };
        match self.call(request, &target).await? {
            DaemonResponse::Created { identifier } => Ok(identifier),
            other => Err(unexpected("create", &other)),
        }
    }

    async fn create_synchronization(
        &mut self,
        specification: &SynchronizationSpecification,
    ) -> Result<SessionId, DaemonError> {
        let target = format!("synchronization session {:?}", specification.name);
        let request = DaemonRequest::CreateSynchronization {
            specification: specification.clone(),
        };
        match self.call(request, &target).await? {
            DaemonResponse::Created { identifier } => Ok(identifier),
            other => Err(unexpected("create", &other)),
        }
    }

    async fn terminate(
        &mut self,
        kind: SessionKind,
        selection: &Selection,
    ) -> Result<(), DaemonError> {
        let target = describe(kind, selection);
        let request = DaemonRequest::Terminate {
            kind,
            selection: selection.clone(),
        };
        self.call_ok(request, &target).await
    }

    async fn pause(&mut self, kind: SessionKind, selection: &Selection) -> Result<(), DaemonError> {
        let target = describe(kind, selection);
        let request = DaemonRequest::Pause {
            kind,
            selection: selection.clone(),
        };
        self.call_ok(request, &target).await
    }

    async fn resume(
        &mut self,
        kind: SessionKind,
        selection: &Selection,
    ) -> Result<(), DaemonError> {
        let target = describe(kind, selection);
        let request = DaemonRequest::Resume {
            kind,
            selection: selection.clone(),
        };
        self.call_ok(request, &target).await
    }

    async fn flush(&mut self, selection: &Selection, background: bool) -> Result<(), DaemonError> {
        let target = describe(SessionKind::Synchronization, selection);
        let request = DaemonRequest::Flush {
            selection: selection.clone(),
            background,
        };
        self.call_ok(request, &target).await
    }
}

/// Connects to the daemon over TCP with a timeout
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Create a connector for `address`
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
        }
    }

    /// Create a connector from the `[daemon]` configuration section
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self::new(config.address.clone(), config.connect_timeout)
    }

    /// Get the address
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl DaemonConnector for TcpConnector {
    type Daemon = TcpDaemonClient;

    async fn connect(&self) -> Result<TcpDaemonClient, DaemonError> {
        let address = self.address();
        let client = tokio::time::timeout(self.connect_timeout, TcpDaemonClient::connect(address))
            .await
            .map_err(|_| DaemonError::Timeout {
                address: address.to_string(),
            })??;
        debug!(address = client.address(), "Connected to session daemon");
        Ok(client)
    }
}
