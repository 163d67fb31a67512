//! In-process transport.
//!
//! A [`ChannelConnector`] accepts whatever sessions its [`SessionFeeder`]
//! offers, in order. Each accepted session is backed by a pair of channels
//! whose far end is a [`RemotePeer`]: delivering on the peer makes a message
//! arrive on the link, dropping the peer closes the session.

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::{Connector, Link};

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("connection refused: {0}")]
    Refused(String),

    #[error("no more sessions will be offered")]
    Exhausted,

    #[error("remote peer is gone")]
    PeerGone,
}

enum Offer {
    Accept(ChannelLink),
    Refuse(String),
}

pub struct ChannelConnector {
    offers: Mutex<mpsc::UnboundedReceiver<Offer>>,
    name: String,
}

impl ChannelConnector {
    pub fn new(name: impl Into<String>) -> (Self, SessionFeeder) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            offers: Mutex::new(rx),
            name: name.into(),
        };
        (connector, SessionFeeder { offers: tx })
    }
}

#[async_trait]
impl Connector for ChannelConnector {
    type Error = ChannelError;
    type Link = ChannelLink;

    /// Waits until the feeder offers the next session.
    async fn connect(&self) -> Result<ChannelLink, ChannelError> {
        let offer = self.offers.lock().await.recv().await;
        match offer {
            Some(Offer::Accept(link)) => Ok(link),
            Some(Offer::Refuse(reason)) => Err(ChannelError::Refused(reason)),
            None => Err(ChannelError::Exhausted),
        }
    }

    fn endpoint(&self) -> String {
        format!("channel://{}", self.name)
    }
}

/// Decides the outcome of upcoming connection attempts.
#[derive(Clone)]
pub struct SessionFeeder {
    offers: mpsc::UnboundedSender<Offer>,
}

impl SessionFeeder {
    /// Let the next connection attempt succeed.
    pub fn accept(&self) -> RemotePeer {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let link = ChannelLink {
            inbound: inbound_rx,
            outbound: outbound_tx,
        };
        let _ = self.offers.send(Offer::Accept(link));

        RemotePeer {
            inbound: inbound_tx,
            outbound: outbound_rx,
        }
    }

    /// Let the next connection attempt fail.
    pub fn refuse(&self, reason: impl Into<String>) {
        let _ = self.offers.send(Offer::Refuse(reason.into()));
    }
}

pub struct ChannelLink {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Link for ChannelLink {
    type Error = ChannelError;

    async fn recv(&mut self) -> Option<Result<String, ChannelError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn send(&mut self, message: String) -> Result<(), ChannelError> {
        self.outbound
            .send(message)
            .map_err(|_| ChannelError::PeerGone)
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}

/// The telemetry source's side of an accepted session.
pub struct RemotePeer {
    inbound: mpsc::UnboundedSender<String>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl RemotePeer {
    /// Push a raw payload to the client. Returns `false` once the client
    /// closed the session.
    pub fn deliver(&self, message: impl Into<String>) -> bool {
        self.inbound.send(message.into()).is_ok()
    }

    /// Next message the client sent over this session.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    pub fn try_next_sent(&mut self) -> Option<String> {
        self.outbound.try_recv().ok()
    }

    /// Resolves once the client closed its end of the session.
    pub async fn closed(&self) {
        self.inbound.closed().await
    }

    /// Drop the session from the source side.
    pub fn hang_up(self) {}
}
