pub mod api;
pub mod config;
pub mod render;
pub mod report;

use flotilla_sync::{ConnectionHandle, FleetView};

pub use config::{Config, ConfigError, TransportConfig};

// Shared by every HTTP handler
#[derive(Clone)]
pub struct AppState {
    pub view: FleetView,
    pub connection: ConnectionHandle,
}
