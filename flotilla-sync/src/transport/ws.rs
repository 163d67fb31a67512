use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, protocol::Message},
};
use tracing::{debug, warn};

use super::{Connector, Link};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("websocket error: {0}")]
    Protocol(#[from] tungstenite::Error),

    #[error("websocket handshake timed out after {0:?}")]
    Timeout(Duration),
}

/// Connects to a telemetry source speaking JSON over a websocket.
pub struct WsConnector {
    url: String,
    connect_timeout: Duration,
}

impl WsConnector {
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Give up on a TCP connect plus upgrade handshake after `timeout`.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Error = WsError;
    type Link = WsLink;

    async fn connect(&self) -> Result<WsLink, WsError> {
        let (stream, response) =
            tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
                .await
                .map_err(|_| WsError::Timeout(self.connect_timeout))??;
        debug!(status = %response.status(), "Websocket handshake complete");
        Ok(WsLink { stream })
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}

pub struct WsLink {
    stream: WsStream,
}

#[async_trait]
impl Link for WsLink {
    type Error = WsError;

    async fn recv(&mut self) -> Option<Result<String, WsError>> {
        loop {
            let frame = match self.stream.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e.into())),
            };

            match frame {
                Message::Text(text) => return Some(Ok(text.as_str().to_owned())),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(e) => warn!(error = %e, "Dropping non UTF-8 binary frame"),
                },
                Message::Close(frame) => {
                    debug!(?frame, "Close frame received");
                    return None;
                }
                // pings are answered by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn send(&mut self, message: String) -> Result<(), WsError> {
        self.stream.send(Message::text(message)).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "Websocket close failed");
        }
    }
}
