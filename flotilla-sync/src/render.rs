use flotilla_core::{Drone, DroneId, TrajectoryPoint};

/// The map collaborator fed by the engine.
///
/// Called from the engine task after each applied change, never while the
/// fleet state is locked. A renderer that lets the user pick drones should
/// hold a [`crate::selection::SelectionSender`] and report picks through it.
pub trait Renderer: Send + 'static {
    fn update_drone_marker(&mut self, drone: &Drone);

    fn update_trajectory(&mut self, id: &DroneId, points: &[TrajectoryPoint]);

    fn center_on(&mut self, drone: &Drone);
}

/// Renderer for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn update_drone_marker(&mut self, _drone: &Drone) {}

    fn update_trajectory(&mut self, _id: &DroneId, _points: &[TrajectoryPoint]) {}

    fn center_on(&mut self, _drone: &Drone) {}
}
