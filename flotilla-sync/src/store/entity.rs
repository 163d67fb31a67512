use std::collections::HashMap;

use flotilla_core::{Drone, DroneId};
use serde::Deserialize;

/// How an incoming snapshot is ordered against the stored one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateOrdering {
    /// Last arrival wins, even when it carries an older `lastUpdate`.
    #[default]
    Arrival,
    /// Snapshots older than the stored one are rejected.
    Timestamp,
}

/// What [`EntityStore::apply`] did with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// First snapshot for this id.
    Inserted,
    /// Replaced the stored snapshot.
    Replaced,
    /// Rejected because it is older than the stored snapshot.
    Stale,
}

impl ApplyOutcome {
    pub fn is_applied(self) -> bool {
        !matches!(self, ApplyOutcome::Stale)
    }
}

/// Latest known snapshot per drone, plus the current selection.
#[derive(Debug, Default)]
pub struct EntityStore {
    drones: HashMap<DroneId, Drone>,
    selected: Option<DroneId>,
    ordering: UpdateOrdering,
}

impl EntityStore {
    pub fn new(ordering: UpdateOrdering) -> Self {
        Self {
            ordering,
            ..Self::default()
        }
    }

    /// Insert or replace the snapshot for `drone.id`.
    pub fn apply(&mut self, drone: Drone) -> ApplyOutcome {
        match self.drones.get_mut(&drone.id) {
            None => {
                self.drones.insert(drone.id.clone(), drone);
                ApplyOutcome::Inserted
            }
            Some(current) => {
                if self.ordering == UpdateOrdering::Timestamp
                    && drone.last_update < current.last_update
                {
                    return ApplyOutcome::Stale;
                }
                *current = drone;
                ApplyOutcome::Replaced
            }
        }
    }

    pub fn get(&self, id: &DroneId) -> Option<Drone> {
        self.drones.get(id).cloned()
    }

    /// Copy of every drone, sorted by id.
    pub fn all(&self) -> Vec<Drone> {
        let mut drones: Vec<Drone> = self.drones.values().cloned().collect();
        drones.sort_by(|a, b| a.id.cmp(&b.id));
        drones
    }

    pub fn len(&self) -> usize {
        self.drones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drones.is_empty()
    }

    pub fn set_selected(&mut self, selected: Option<DroneId>) {
        self.selected = selected;
    }

    pub fn selected(&self) -> Option<&DroneId> {
        self.selected.as_ref()
    }
}
