pub mod connection;
pub mod drones;
pub mod error;
pub mod models;
pub mod selection;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Fleet routes
        .route("/drones", get(drones::list_drones))
        .route("/drones/{id}", get(drones::get_drone))
        .route("/drones/{id}/path", get(drones::get_path))
        .route("/stats", get(drones::get_stats))
        // Selection
        .route(
            "/selection",
            get(selection::get_selection).put(selection::put_selection),
        )
        // Connection
        .route("/connection", get(connection::get_connection))
        .route("/connection/disconnect", post(connection::disconnect))
        .route("/connection/reconnect", post(connection::reconnect))
        .route("/health", get(health_handler))
}

async fn health_handler() -> &'static str {
    "OK"
}
