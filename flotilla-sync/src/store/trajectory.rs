use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;

use flotilla_core::{DroneId, TrajectoryPoint};

use crate::config::DEFAULT_TRAJECTORY_CAPACITY;

/// Bounded recent flight path per drone.
///
/// Points are kept in arrival order. Once a path holds `capacity` points the
/// oldest one is evicted for every new one.
#[derive(Debug)]
pub struct TrajectoryStore {
    paths: HashMap<DroneId, VecDeque<TrajectoryPoint>>,
    capacity: NonZeroUsize,
}

impl TrajectoryStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            paths: HashMap::new(),
            capacity,
        }
    }

    pub fn append(&mut self, id: &DroneId, point: TrajectoryPoint) {
        let capacity = self.capacity.get();
        let path = self
            .paths
            .entry(id.clone())
            .or_insert_with(|| VecDeque::with_capacity(capacity));

        if path.len() == capacity {
            path.pop_front();
        }
        path.push_back(point);
    }

    /// Copy of the path for `id`, oldest first. Empty if nothing was recorded.
    pub fn get(&self, id: &DroneId) -> Vec<TrajectoryPoint> {
        self.paths
            .get(id)
            .map(|path| path.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len_of(&self, id: &DroneId) -> usize {
        self.paths.get(id).map_or(0, VecDeque::len)
    }

    /// Ids with at least one recorded point.
    pub fn ids(&self) -> Vec<DroneId> {
        let mut ids: Vec<DroneId> = self.paths.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for TrajectoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_TRAJECTORY_CAPACITY)
    }
}
