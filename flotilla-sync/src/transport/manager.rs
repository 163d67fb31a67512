use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use super::{
    ConnectionState, ConnectionStatus, Connector, Link, TransportEvent, TransportSettings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Disconnect,
    Reconnect,
}

/// Where the connection worker goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connect,
    Backoff,
    Halted,
    Shutdown,
}

/// Owns the reconnecting connection worker.
///
/// Created with [`ConnectionManager::spawn`], which also hands out the event
/// receiver. The worker lives until [`ConnectionManager::shutdown`] is called
/// or the manager is dropped.
pub struct ConnectionManager {
    handle: ConnectionHandle,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn spawn<C: Connector>(
        connector: C,
        settings: TransportSettings,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        Self::spawn_with_cancel(connector, settings, &CancellationToken::new())
    }

    /// Like [`ConnectionManager::spawn`], but the worker also stops when
    /// `parent` is cancelled.
    pub fn spawn_with_cancel<C: Connector>(
        connector: C,
        settings: TransportSettings,
        parent: &CancellationToken,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::channel(settings.event_buffer);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::channel(settings.event_buffer);
        let (status_tx, status_rx) =
            watch::channel(ConnectionStatus::new(ConnectionState::Disconnected));

        let cancel = parent.child_token();
        let endpoint = connector.endpoint();

        let worker = Worker {
            connector,
            settings,
            events: events_tx,
            status: status_tx,
            control: control_rx,
            outbound: outbound_rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run(endpoint));

        let handle = ConnectionHandle {
            control: control_tx,
            outbound: outbound_tx,
            status: status_rx,
        };

        (
            Self {
                handle,
                cancel,
                task: Some(task),
            },
            events_rx,
        )
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Stop the worker and wait for it to finish.
    ///
    /// Already delivered messages stay delivered; nothing is rolled back.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "Connection worker terminated abnormally");
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Cloneable access to a running connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    control: mpsc::UnboundedSender<Control>,
    outbound: mpsc::Sender<String>,
    status: watch::Receiver<ConnectionStatus>,
}

impl ConnectionHandle {
    /// Current connection state and when it was entered.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Latest-value view of the connection state. Intermediate states may be
    /// skipped by a slow observer; the event stream never skips them.
    pub fn watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Fire-and-forget send. Silently dropped unless connected.
    pub fn send(&self, message: impl Into<String>) {
        if !self.status().is_connected() {
            trace!("Dropping outbound message while not connected");
            return;
        }

        if let Err(e) = self.outbound.try_send(message.into()) {
            debug!(error = %e, "Dropping outbound message");
        }
    }

    /// Close the connection and stay disconnected until [`Self::reconnect`].
    pub fn disconnect(&self) {
        let _ = self.control.send(Control::Disconnect);
    }

    /// Start a fresh connection attempt right away, skipping any backoff.
    pub fn reconnect(&self) {
        let _ = self.control.send(Control::Reconnect);
    }
}

struct Worker<C: Connector> {
    connector: C,
    settings: TransportSettings,
    events: mpsc::Sender<TransportEvent>,
    status: watch::Sender<ConnectionStatus>,
    control: mpsc::UnboundedReceiver<Control>,
    outbound: mpsc::Receiver<String>,
    cancel: CancellationToken,
}

impl<C: Connector> Worker<C> {
    #[instrument(name = "connection", skip_all, fields(%endpoint))]
    async fn run(mut self, endpoint: String) {
        info!("Connection worker started");

        let mut phase = Phase::Connect;
        while phase != Phase::Shutdown {
            phase = match phase {
                Phase::Connect => self.connect().await,
                Phase::Backoff => self.backoff().await,
                Phase::Halted => self.halted().await,
                Phase::Shutdown => Phase::Shutdown,
            };
        }

        // The consumer may already be gone or stalled, so never wait here.
        if self.status.borrow().state != ConnectionState::Disconnected {
            let status = ConnectionStatus::new(ConnectionState::Disconnected);
            self.status.send_replace(status);
            let _ = self.events.try_send(TransportEvent::State(status));
        }
        info!("Connection worker stopped");
    }

    async fn connect(&mut self) -> Phase {
        self.transition(ConnectionState::Connecting).await;

        let attempt = tokio::select! {
            _ = self.cancel.cancelled() => return Phase::Shutdown,
            control = self.control.recv() => {
                return match control {
                    Some(Control::Disconnect) => {
                        info!("Disconnect requested while connecting");
                        self.transition(ConnectionState::Disconnected).await;
                        Phase::Halted
                    }
                    Some(Control::Reconnect) => Phase::Connect,
                    None => Phase::Shutdown,
                };
            }
            result = self.connector.connect() => result,
        };

        match attempt {
            Ok(link) => {
                info!("Connected");
                self.transition(ConnectionState::Connected).await;
                self.session(link).await
            }
            Err(e) => {
                warn!(error = %e, "Connection attempt failed");
                self.transition(ConnectionState::Disconnected).await;
                Phase::Backoff
            }
        }
    }

    async fn session(&mut self, mut link: C::Link) -> Phase {
        // One inbound message waiting for room in the event channel. The link
        // is not read again until it has been handed over.
        let mut pending: Option<String> = None;

        let next = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    link.close().await;
                    break Phase::Shutdown;
                }
                permit = self.events.reserve(), if pending.is_some() => match permit {
                    Ok(permit) => {
                        if let Some(message) = pending.take() {
                            permit.send(TransportEvent::Message(message));
                        }
                    }
                    Err(_) => {
                        info!("Event consumer dropped, closing connection");
                        link.close().await;
                        break Phase::Shutdown;
                    }
                },
                inbound = link.recv(), if pending.is_none() => match inbound {
                    Some(Ok(message)) => pending = Some(message),
                    Some(Err(e)) => {
                        warn!(error = %e, "Connection lost");
                        break Phase::Backoff;
                    }
                    None => {
                        info!("Connection closed by peer");
                        break Phase::Backoff;
                    }
                },
                Some(message) = self.outbound.recv() => {
                    if let Err(e) = link.send(message).await {
                        warn!(error = %e, "Send failed, dropping connection");
                        break Phase::Backoff;
                    }
                }
                control = self.control.recv() => match control {
                    Some(Control::Disconnect) => {
                        info!("Disconnect requested");
                        link.close().await;
                        break Phase::Halted;
                    }
                    Some(Control::Reconnect) => {
                        info!("Reconnect requested");
                        link.close().await;
                        break Phase::Connect;
                    }
                    None => {
                        link.close().await;
                        break Phase::Shutdown;
                    }
                },
            }
        };

        // Anything queued for the old session is not carried over.
        if pending.is_some() {
            debug!("Dropping undelivered message from the closed session");
        }
        while self.outbound.try_recv().is_ok() {}

        if next != Phase::Shutdown {
            self.transition(ConnectionState::Disconnected).await;
        }
        next
    }

    async fn backoff(&mut self) -> Phase {
        debug!(
            delay_ms = self.settings.reconnect_delay.as_millis() as u64,
            "Waiting before reconnect"
        );

        let delay = sleep(self.settings.reconnect_delay);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Phase::Shutdown,
                _ = &mut delay => return Phase::Connect,
                control = self.control.recv() => match control {
                    Some(Control::Disconnect) => return Phase::Halted,
                    Some(Control::Reconnect) => return Phase::Connect,
                    None => return Phase::Shutdown,
                },
                Some(_) = self.outbound.recv() => {
                    trace!("Dropping outbound message while disconnected");
                }
            }
        }
    }

    async fn halted(&mut self) -> Phase {
        info!("Connection halted until reconnect is requested");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return Phase::Shutdown,
                control = self.control.recv() => match control {
                    Some(Control::Reconnect) => return Phase::Connect,
                    Some(Control::Disconnect) => {}
                    None => return Phase::Shutdown,
                },
                Some(_) = self.outbound.recv() => {
                    trace!("Dropping outbound message while halted");
                }
            }
        }
    }

    /// Publish a state change. Re-entering the current state is not a change.
    async fn transition(&mut self, state: ConnectionState) {
        if self.status.borrow().state == state {
            return;
        }

        let status = ConnectionStatus::new(state);
        self.status.send_replace(status);
        debug!(%state, "Connection state changed");

        // A vanished consumer is noticed on the next inbound message. A
        // stalled one must not hold up shutdown.
        tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!(%state, "Shutdown while publishing state change");
            }
            _ = self.events.send(TransportEvent::State(status)) => {}
        }
    }
}
