use std::sync::{Arc, Mutex};
use std::time::Duration;

use flotilla_core::{Drone, DroneId, DroneStatus, TrajectoryPoint};
use flotilla_sync::transport::channel::{ChannelConnector, RemotePeer, SessionFeeder};
use flotilla_sync::{
    Classification, Classifier, ConnectionManager, ConnectionState, FilterPredicate, FleetView,
    NullRenderer, Renderer, SelectionEvent, SyncConfig, SyncEngine,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Marker(DroneId, u8),
    Trajectory(DroneId, usize),
    Center(DroneId),
}

#[derive(Clone, Default)]
struct RecordingRenderer {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingRenderer {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn update_drone_marker(&mut self, drone: &Drone) {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Marker(drone.id.clone(), drone.battery.get()));
    }

    fn update_trajectory(&mut self, id: &DroneId, points: &[TrajectoryPoint]) {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Trajectory(id.clone(), points.len()));
    }

    fn center_on(&mut self, drone: &Drone) {
        self.calls.lock().unwrap().push(Call::Center(drone.id.clone()));
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn drone_update(id: &str, name: &str, registration: &str, status: &str, battery: u8) -> String {
    format!(
        r#"{{"type":"drone_update","drone":{{"id":"{id}","name":"{name}","status":"{status}",
        "battery":{battery},"latitude":40.7128,"longitude":-74.006,"altitude":120,"speed":15,
        "lastUpdate":"2025-03-01T12:00:00Z","registration":"{registration}"}}}}"#
    )
}

fn path_update(id: &str, n: usize) -> String {
    format!(
        r#"{{"type":"flight_path_update","path":{{"droneId":"{id}",
        "coordinates":[{},40.7128],"timestamp":"2025-03-01T12:00:00Z"}}}}"#,
        -74.006 + n as f64 * 0.001
    )
}

struct Harness {
    view: FleetView,
    renderer: RecordingRenderer,
    feeder: SessionFeeder,
    manager: ConnectionManager,
    engine: JoinHandle<()>,
    cancel: CancellationToken,
}

fn start(config: SyncConfig) -> (Harness, flotilla_sync::SelectionSubscription) {
    init_tracing();
    let (connector, feeder) = ChannelConnector::new("engine");
    let (manager, events) = ConnectionManager::spawn(connector, config.transport_settings());

    let mut engine = SyncEngine::new(&config, events);
    let subscription = engine.subscribe();
    let view = engine.view();
    let renderer = RecordingRenderer::default();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(engine.run(renderer.clone(), cancel.clone()));

    let harness = Harness {
        view,
        renderer,
        feeder,
        manager,
        engine: task,
        cancel,
    };
    (harness, subscription)
}

async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

async fn connect(harness: &Harness) -> RemotePeer {
    let peer = harness.feeder.accept();
    let view = harness.view.clone();
    eventually("connection", || {
        view.connection().state == ConnectionState::Connected
    })
    .await;
    peer
}

#[tokio::test]
async fn malformed_messages_do_not_halt_the_stream() {
    let (harness, _subscription) = start(SyncConfig::default());
    let peer = connect(&harness).await;
    let d1 = DroneId::from("d1");

    peer.deliver(drone_update("d1", "Alpha-1", "B-1021", "active", 85));
    peer.deliver("{ not json");
    peer.deliver(r#"{"type":"unknown_kind","drone":{"id":"d1","battery":1}}"#);
    peer.deliver(r#"{"drone":{"id":"d1"}}"#);
    peer.deliver(drone_update("d1", "Alpha-1", "B-1021", "active", 60));

    let view = harness.view.clone();
    eventually("second update", || view.counters().drone_updates == 2).await;

    assert_eq!(harness.view.drone(&d1).unwrap().battery.get(), 60);
    let counters = harness.view.counters();
    assert_eq!(counters.malformed, 2);
    assert_eq!(counters.ignored, 1);
    assert_eq!(
        harness.renderer.calls(),
        vec![Call::Marker(d1.clone(), 85), Call::Marker(d1, 60)]
    );
    assert!(harness.view.last_message_at().is_some());

    harness.cancel.cancel();
    harness.engine.await.unwrap();
    harness.manager.shutdown().await;
}

#[tokio::test]
async fn trajectories_are_bounded_and_rendered_whole() {
    let config = SyncConfig {
        trajectory_capacity: std::num::NonZeroUsize::new(10).unwrap(),
        ..SyncConfig::default()
    };
    let (harness, _subscription) = start(config);
    let peer = connect(&harness).await;
    let d2 = DroneId::from("d2");

    for n in 0..15 {
        peer.deliver(path_update("d2", n));
    }

    let view = harness.view.clone();
    eventually("path updates", || view.counters().path_updates == 15).await;

    let path = harness.view.trajectory(&d2);
    assert_eq!(path.len(), 10);
    assert!((path[0].coordinates.longitude - (-74.006 + 0.005)).abs() < 1e-9);

    let calls = harness.renderer.calls();
    assert_eq!(calls.len(), 15);
    assert_eq!(calls[0], Call::Trajectory(d2.clone(), 1));
    assert_eq!(calls[14], Call::Trajectory(d2, 10));

    harness.cancel.cancel();
    harness.engine.await.unwrap();
    harness.manager.shutdown().await;
}

#[tokio::test]
async fn selection_reaches_subscribers_and_centers_the_map() {
    let (harness, mut subscription) = start(SyncConfig::default());
    let peer = connect(&harness).await;
    let d1 = DroneId::from("d1");

    peer.deliver(drone_update("d1", "Alpha-1", "B-1021", "active", 85));
    let view = harness.view.clone();
    eventually("first drone", || view.drone(&"d1".into()).is_some()).await;

    // twice, as a marker click followed by a list click would
    assert!(harness.view.select(Some(d1.clone())));
    assert!(harness.view.select(Some(d1.clone())));

    let expected = SelectionEvent {
        selected: Some(d1.clone()),
    };
    assert_eq!(subscription.recv().await, Some(expected.clone()));
    assert_eq!(subscription.recv().await, Some(expected));
    assert_eq!(harness.view.selected(), Some(d1.clone()));

    let centers = || -> Vec<Call> {
        harness
            .renderer
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Center(_)))
            .collect()
    };
    eventually("centering", || centers().len() == 2).await;
    assert_eq!(centers(), vec![Call::Center(d1.clone()), Call::Center(d1)]);

    assert!(harness.view.select(None));
    assert_eq!(
        subscription.recv().await,
        Some(SelectionEvent { selected: None })
    );
    assert_eq!(harness.view.selected(), None);

    harness.cancel.cancel();
    harness.engine.await.unwrap();
    harness.manager.shutdown().await;
}

#[tokio::test]
async fn view_projects_and_counts_the_fleet() {
    let (harness, _subscription) = start(SyncConfig::default());
    let peer = connect(&harness).await;

    peer.deliver(drone_update("d1", "Alpha-1", "B-1021", "active", 85));
    peer.deliver(drone_update("d2", "Beta-2", "N-7781", "inactive", 45));
    peer.deliver(drone_update("d3", "Gamma-3", "N-2201", "restricted", 92));
    peer.deliver(drone_update("d4", "Delta-4", "N-3310", "active", 67));

    let view = harness.view.clone();
    eventually("fleet", || view.drones().len() == 4).await;

    let stats = harness.view.stats();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.active, 2);
    assert_eq!((stats.allowed, stats.restricted), (1, 1));

    let restricted_active = FilterPredicate::builder()
        .include_allowed(false)
        .status(DroneStatus::Active)
        .build();
    let projected = harness.view.project(&restricted_active);
    assert_eq!(projected.len(), 1);
    assert_eq!(projected[0].id.as_str(), "d4");

    // every snapshot is old by now
    assert_eq!(harness.view.stale(jiff::SignedDuration::from_secs(60)).len(), 4);

    harness.cancel.cancel();
    harness.engine.await.unwrap();
    harness.manager.shutdown().await;
}

/// Allows only N-series registrations.
struct NSeries;

impl Classifier for NSeries {
    fn classify(&self, registration: &str) -> Classification {
        if registration.starts_with("N-") {
            Classification::Allowed
        } else {
            Classification::Restricted
        }
    }
}

#[tokio::test]
async fn views_use_the_installed_classifier() {
    init_tracing();
    let config = SyncConfig::default();
    let (connector, feeder) = ChannelConnector::new("classifier");
    let (manager, events) = ConnectionManager::spawn(connector, config.transport_settings());

    let engine = SyncEngine::new(&config, events).with_classifier(NSeries);
    let view = engine.view();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(engine.run(NullRenderer, cancel.clone()));

    let peer = feeder.accept();
    peer.deliver(drone_update("d1", "Alpha-1", "B-1021", "active", 85));
    peer.deliver(drone_update("d4", "Delta-4", "N-3310", "active", 67));

    let watched = view.clone();
    eventually("fleet", || watched.drones().len() == 2).await;

    assert_eq!(
        view.classifier().classify("N-3310"),
        Classification::Allowed
    );
    let stats = view.stats();
    assert_eq!((stats.allowed, stats.restricted), (1, 1));

    let allowed_only = FilterPredicate::builder().include_restricted(false).build();
    let projected = view.project(&allowed_only);
    assert_eq!(projected.len(), 1);
    assert_eq!(projected[0].id.as_str(), "d4");

    cancel.cancel();
    task.await.unwrap();
    manager.shutdown().await;
}

#[tokio::test]
async fn engine_stops_when_the_transport_goes_away() {
    let (harness, _subscription) = start(SyncConfig::default());
    let _peer = connect(&harness).await;

    harness.manager.shutdown().await;

    tokio::time::timeout(Duration::from_secs(5), harness.engine)
        .await
        .expect("engine kept running")
        .unwrap();
    assert_eq!(
        harness.view.connection().state,
        ConnectionState::Disconnected
    );
}
