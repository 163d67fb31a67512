use flotilla_core::DroneId;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::store::EntityStore;

/// Published once for every selection call, whatever its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionEvent {
    pub selected: Option<DroneId>,
}

/// A request to change the selection, from the UI or the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest(pub Option<DroneId>);

/// Cloneable inbound side of the bridge.
///
/// Handed to the renderer (marker clicks) and to UI code alike, so every
/// selection goes through the same path in the engine.
#[derive(Debug, Clone)]
pub struct SelectionSender {
    tx: mpsc::UnboundedSender<SelectionRequest>,
}

impl SelectionSender {
    /// Request `selection`. Returns `false` if the engine is gone.
    pub fn select(&self, selection: Option<DroneId>) -> bool {
        self.tx.send(SelectionRequest(selection)).is_ok()
    }

    pub fn deselect(&self) -> bool {
        self.select(None)
    }
}

/// Receives [`SelectionEvent`]s from the bridge it subscribed to.
#[derive(Debug)]
pub struct SelectionSubscription {
    rx: mpsc::UnboundedReceiver<SelectionEvent>,
}

impl SelectionSubscription {
    pub async fn recv(&mut self) -> Option<SelectionEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SelectionEvent> {
        self.rx.try_recv().ok()
    }
}

/// Single source of truth for what is selected.
///
/// Selection state itself lives in the [`EntityStore`]; the bridge writes it
/// and tells every subscriber about it.
pub struct SelectionBridge {
    subscribers: Vec<mpsc::UnboundedSender<SelectionEvent>>,
    requests: mpsc::UnboundedSender<SelectionRequest>,
}

impl SelectionBridge {
    /// Create the bridge together with the receiving end of its requests.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SelectionRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = Self {
            subscribers: Vec::new(),
            requests: tx,
        };
        (bridge, rx)
    }

    pub fn sender(&self) -> SelectionSender {
        SelectionSender {
            tx: self.requests.clone(),
        }
    }

    pub fn subscribe(&mut self) -> SelectionSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        SelectionSubscription { rx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Set the selection and notify every subscriber exactly once.
    ///
    /// Selecting the current value again still notifies.
    pub fn select(&mut self, store: &mut EntityStore, selection: Option<DroneId>) -> SelectionEvent {
        store.set_selected(selection.clone());

        let event = SelectionEvent {
            selected: selection,
        };
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        debug!(
            selected = ?event.selected,
            subscribers = self.subscribers.len(),
            "Selection changed"
        );

        event
    }
}
