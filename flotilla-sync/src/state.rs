use flotilla_core::{Drone, DroneId, TrajectoryPoint};
use jiff::Timestamp;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::SyncConfig;
use crate::decode::{Inbound, decode};
use crate::store::{EntityStore, TrajectoryStore};
use crate::transport::{ConnectionState, ConnectionStatus};

/// How many inbound messages ended up where.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MessageCounters {
    pub drone_updates: u64,
    pub path_updates: u64,
    /// Drone updates rejected as older than the stored snapshot.
    pub stale: u64,
    /// Well-formed messages of an unknown kind.
    pub ignored: u64,
    pub malformed: u64,
}

/// What a routed message changed, for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Drone(Drone),
    Path {
        id: DroneId,
        points: Vec<TrajectoryPoint>,
    },
    Skipped,
}

/// Everything the engine knows about the fleet.
///
/// Only the engine task mutates it; everyone else reads through
/// [`crate::engine::FleetView`].
#[derive(Debug)]
pub struct FleetState {
    entities: EntityStore,
    trajectories: TrajectoryStore,
    connection: ConnectionStatus,
    counters: MessageCounters,
    last_message_at: Option<Timestamp>,
}

impl FleetState {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            entities: EntityStore::new(config.ordering),
            trajectories: TrajectoryStore::new(config.trajectory_capacity),
            connection: ConnectionStatus::new(ConnectionState::Disconnected),
            counters: MessageCounters::default(),
            last_message_at: None,
        }
    }

    /// Decode one raw payload and apply it.
    ///
    /// A payload that fails to decode is counted and dropped; it never
    /// touches the stores.
    pub fn route(&mut self, raw: &str, received_at: Timestamp) -> Routed {
        self.last_message_at = Some(received_at);

        match decode(raw) {
            Ok(Inbound::Drone(drone)) => {
                let outcome = self.entities.apply(drone.clone());
                if outcome.is_applied() {
                    self.counters.drone_updates += 1;
                    trace!(id = %drone.id, ?outcome, "Drone updated");
                    Routed::Drone(drone)
                } else {
                    self.counters.stale += 1;
                    debug!(id = %drone.id, "Ignoring stale drone update");
                    Routed::Skipped
                }
            }
            Ok(Inbound::Path(update)) => {
                self.trajectories.append(&update.drone_id, update.point);
                self.counters.path_updates += 1;
                Routed::Path {
                    points: self.trajectories.get(&update.drone_id),
                    id: update.drone_id,
                }
            }
            Ok(Inbound::Ignored { kind }) => {
                self.counters.ignored += 1;
                debug!(%kind, "Ignoring message of unknown kind");
                Routed::Skipped
            }
            Err(e) => {
                self.counters.malformed += 1;
                warn!(error = %e, "Discarding malformed message");
                Routed::Skipped
            }
        }
    }

    pub fn set_connection(&mut self, status: ConnectionStatus) {
        self.connection = status;
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityStore {
        &mut self.entities
    }

    pub fn trajectories(&self) -> &TrajectoryStore {
        &self.trajectories
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn counters(&self) -> MessageCounters {
        self.counters
    }

    /// Arrival time of the most recent payload, decodable or not.
    pub fn last_message_at(&self) -> Option<Timestamp> {
        self.last_message_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2025-03-01T12:00:00Z";

    fn drone_update(id: &str, battery: u8) -> String {
        format!(
            r#"{{"type":"drone_update","drone":{{"id":"{id}","name":"Alpha-1","status":"active",
            "battery":{battery},"latitude":40.7,"longitude":-74.0,"altitude":120,"speed":15,
            "lastUpdate":"{NOW}","registration":"B-1021"}}}}"#
        )
    }

    fn path_update(id: &str, lon: f64) -> String {
        format!(
            r#"{{"type":"flight_path_update","path":{{"droneId":"{id}","coordinates":[{lon},40.7],
            "timestamp":"{NOW}"}}}}"#
        )
    }

    fn state() -> FleetState {
        FleetState::new(&SyncConfig::default())
    }

    #[test]
    fn drone_updates_reach_the_entity_store() {
        let mut state = state();
        let now: Timestamp = NOW.parse().unwrap();

        assert!(matches!(
            state.route(&drone_update("d1", 85), now),
            Routed::Drone(_)
        ));
        state.route(&drone_update("d1", 60), now);

        let drone = state.entities().get(&"d1".into()).unwrap();
        assert_eq!(drone.battery.get(), 60);
        assert_eq!(state.counters().drone_updates, 2);
        assert_eq!(state.last_message_at(), Some(now));
    }

    #[test]
    fn path_updates_return_the_whole_path() {
        let mut state = state();
        let now: Timestamp = NOW.parse().unwrap();

        state.route(&path_update("d1", -74.0), now);
        let routed = state.route(&path_update("d1", -74.1), now);

        let Routed::Path { id, points } = routed else {
            panic!("expected a path update");
        };
        assert_eq!(id.as_str(), "d1");
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].coordinates.longitude, -74.1);
        // paths may precede the first snapshot
        assert!(state.entities().is_empty());
    }

    #[test]
    fn unknown_and_malformed_messages_do_not_mutate() {
        let mut state = state();
        let now: Timestamp = NOW.parse().unwrap();
        state.route(&drone_update("d1", 85), now);
        let before = state.entities().all();

        assert_eq!(
            state.route(r#"{"type":"unknown_kind","drone":{}}"#, now),
            Routed::Skipped
        );
        assert_eq!(state.route("{{{", now), Routed::Skipped);
        assert_eq!(
            state.route(r#"{"type":"flight_path_update","path":{"droneId":"d1"}}"#, now),
            Routed::Skipped
        );

        assert_eq!(state.entities().all(), before);
        assert!(state.trajectories().ids().is_empty());
        assert_eq!(state.counters().ignored, 1);
        assert_eq!(state.counters().malformed, 2);

        // and the next good message still goes through
        state.route(&drone_update("d1", 40), now);
        assert_eq!(state.entities().get(&"d1".into()).unwrap().battery.get(), 40);
    }
}
