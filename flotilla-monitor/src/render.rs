use flotilla_core::{Drone, DroneId, TrajectoryPoint};
use flotilla_sync::Renderer;
use tracing::{info, trace};

/// Renders the fleet into the log.
///
/// Marker and path updates are far too frequent for `info`, so they go to
/// `trace`; map centering is what an operator asked for and is logged at
/// `info`.
#[derive(Debug, Default)]
pub struct TracingRenderer {
    frames: u64,
}

impl TracingRenderer {
    /// Number of marker and path updates drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for TracingRenderer {
    fn update_drone_marker(&mut self, drone: &Drone) {
        self.frames += 1;
        trace!(
            id = %drone.id,
            status = %drone.status,
            battery = %drone.battery,
            latitude = drone.position.latitude,
            longitude = drone.position.longitude,
            "Marker updated"
        );
    }

    fn update_trajectory(&mut self, id: &DroneId, points: &[TrajectoryPoint]) {
        self.frames += 1;
        trace!(%id, points = points.len(), "Trajectory updated");
    }

    fn center_on(&mut self, drone: &Drone) {
        info!(
            id = %drone.id,
            name = %drone.name,
            latitude = drone.position.latitude,
            longitude = drone.position.longitude,
            "Centering map on drone"
        );
    }
}
