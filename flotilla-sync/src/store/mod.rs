pub mod entity;
pub mod trajectory;

pub use entity::{ApplyOutcome, EntityStore, UpdateOrdering};
pub use trajectory::TrajectoryStore;
