pub mod channel;
pub mod manager;
pub mod simulated;
pub mod ws;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

pub use manager::{ConnectionHandle, ConnectionManager};

/// Lifecycle of the single logical connection to the telemetry source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Connection state together with the time of the last transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub since: jiff::Timestamp,
}

impl ConnectionStatus {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state,
            since: jiff::Timestamp::now(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Everything the transport delivers to the engine, in delivery order.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The connection moved to a new state.
    State(ConnectionStatus),
    /// A raw inbound payload.
    Message(String),
}

/// Timing and buffering knobs for the connection manager.
#[derive(Debug, Clone, Copy)]
pub struct TransportSettings {
    /// Fixed delay before reconnecting after a close or error.
    pub reconnect_delay: Duration,
    /// Capacity of the event channel handed to the consumer.
    pub event_buffer: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
            event_buffer: 100,
        }
    }
}

/// Establishes sessions with a telemetry source.
///
/// The connection manager calls `connect` every time it (re)enters the
/// connecting state. A returned link is used until it reports a close or an
/// error, then dropped.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Error type for failed connection attempts.
    type Error: std::error::Error + Send + Sync + 'static;
    /// The session type produced by a successful handshake.
    type Link: Link;

    async fn connect(&self) -> Result<Self::Link, Self::Error>;

    /// Human readable endpoint description, used in logs.
    fn endpoint(&self) -> String;
}

/// One established session with a telemetry source.
///
/// `recv` must be cancellation safe: the manager races it against outbound
/// sends and control requests.
#[async_trait]
pub trait Link: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Next inbound payload, or `None` once the peer closed the session.
    async fn recv(&mut self) -> Option<Result<String, Self::Error>>;

    async fn send(&mut self, message: String) -> Result<(), Self::Error>;

    /// Close the session from our side. Errors are irrelevant at this point.
    async fn close(&mut self);
}
