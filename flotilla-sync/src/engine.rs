use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use flotilla_core::{Drone, DroneId, TrajectoryPoint};
use jiff::{SignedDuration, Timestamp};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::SyncConfig;
use crate::projection::{self, Classifier, FilterPredicate, FleetStats};
use crate::render::Renderer;
use crate::selection::{SelectionBridge, SelectionRequest, SelectionSender, SelectionSubscription};
use crate::state::{FleetState, MessageCounters, Routed};
use crate::transport::{ConnectionStatus, TransportEvent};

/// The single writer of the fleet state.
///
/// Consumes the transport event stream and selection requests, applies them
/// in arrival order and drives the renderer. Everything else reads through a
/// [`FleetView`].
pub struct SyncEngine {
    state: Arc<RwLock<FleetState>>,
    classifier: Arc<dyn Classifier>,
    bridge: SelectionBridge,
    requests: mpsc::UnboundedReceiver<SelectionRequest>,
    events: mpsc::Receiver<TransportEvent>,
}

impl SyncEngine {
    pub fn new(config: &SyncConfig, events: mpsc::Receiver<TransportEvent>) -> Self {
        let (bridge, requests) = SelectionBridge::new();

        Self {
            state: Arc::new(RwLock::new(FleetState::new(config))),
            classifier: Arc::new(config.classifier()),
            bridge,
            requests,
            events,
        }
    }

    /// Replace the registration classifier used by views.
    pub fn with_classifier<C>(mut self, classifier: C) -> Self
    where
        C: Classifier + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn view(&self) -> FleetView {
        FleetView {
            state: Arc::clone(&self.state),
            classifier: Arc::clone(&self.classifier),
            selection: self.bridge.sender(),
        }
    }

    /// Sender for selection requests, typically handed to the renderer.
    pub fn selection_sender(&self) -> SelectionSender {
        self.bridge.sender()
    }

    /// Subscribe to selection changes. Must be called before [`Self::run`].
    pub fn subscribe(&mut self) -> SelectionSubscription {
        self.bridge.subscribe()
    }

    /// Process events until the transport goes away or `cancel` fires.
    #[instrument(name = "sync_engine", skip_all)]
    pub async fn run<R: Renderer>(mut self, mut renderer: R, cancel: CancellationToken) {
        info!(
            subscribers = self.bridge.subscriber_count(),
            "Sync engine started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event, &mut renderer),
                    None => {
                        info!("Transport closed, stopping sync engine");
                        break;
                    }
                },
                Some(request) = self.requests.recv() => {
                    self.handle_selection(request, &mut renderer);
                }
            }
        }

        info!("Sync engine stopped");
    }

    fn handle_event<R: Renderer>(&mut self, event: TransportEvent, renderer: &mut R) {
        match event {
            TransportEvent::State(status) => {
                info!(state = %status.state, "Connection state changed");
                write(&self.state).set_connection(status);
            }
            TransportEvent::Message(raw) => {
                let routed = write(&self.state).route(&raw, Timestamp::now());
                match routed {
                    Routed::Drone(drone) => renderer.update_drone_marker(&drone),
                    Routed::Path { id, points } => renderer.update_trajectory(&id, &points),
                    Routed::Skipped => {}
                }
            }
        }
    }

    fn handle_selection<R: Renderer>(&mut self, request: SelectionRequest, renderer: &mut R) {
        let target = {
            let mut state = write(&self.state);
            let event = self.bridge.select(state.entities_mut(), request.0);
            event
                .selected
                .as_ref()
                .and_then(|id| state.entities().get(id))
        };

        match target {
            Some(drone) => renderer.center_on(&drone),
            None => debug!("Nothing to center on"),
        }
    }
}

/// Cheap, cloneable read access to the fleet state.
///
/// Every method returns an owned snapshot; no lock outlives the call.
#[derive(Clone)]
pub struct FleetView {
    state: Arc<RwLock<FleetState>>,
    classifier: Arc<dyn Classifier>,
    selection: SelectionSender,
}

impl FleetView {
    pub fn drone(&self, id: &DroneId) -> Option<Drone> {
        read(&self.state).entities().get(id)
    }

    /// All known drones, sorted by id.
    pub fn drones(&self) -> Vec<Drone> {
        read(&self.state).entities().all()
    }

    pub fn trajectory(&self, id: &DroneId) -> Vec<TrajectoryPoint> {
        read(&self.state).trajectories().get(id)
    }

    /// Drones matching `predicate`, sorted by name.
    pub fn project(&self, predicate: &FilterPredicate) -> Vec<Drone> {
        projection::project(&self.drones(), predicate, self.classifier.as_ref())
    }

    pub fn stats(&self) -> FleetStats {
        projection::stats(&self.drones(), self.classifier.as_ref())
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn selected(&self) -> Option<DroneId> {
        read(&self.state).entities().selected().cloned()
    }

    pub fn connection(&self) -> ConnectionStatus {
        read(&self.state).connection()
    }

    pub fn counters(&self) -> MessageCounters {
        read(&self.state).counters()
    }

    pub fn last_message_at(&self) -> Option<Timestamp> {
        read(&self.state).last_message_at()
    }

    /// Drones whose last update is older than `max_age`.
    pub fn stale(&self, max_age: SignedDuration) -> Vec<Drone> {
        let now = Timestamp::now();
        self.drones()
            .into_iter()
            .filter(|drone| drone.is_stale(now, max_age))
            .collect()
    }

    /// Queue a selection change. Returns `false` if the engine is gone.
    pub fn select(&self, selection: Option<DroneId>) -> bool {
        self.selection.select(selection)
    }
}

fn read(state: &RwLock<FleetState>) -> RwLockReadGuard<'_, FleetState> {
    state.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(state: &RwLock<FleetState>) -> RwLockWriteGuard<'_, FleetState> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}
