use axum::{
    Json,
    extract::{Path, Query, State},
};
use flotilla_core::{Drone, DroneId, TrajectoryPoint};
use flotilla_sync::FleetStats;

use super::error::ApiError;
use super::models::{ApiResponse, DroneQuery};
use crate::AppState;

// Filtered drone list, sorted by name
pub async fn list_drones(
    State(state): State<AppState>,
    Query(query): Query<DroneQuery>,
) -> Json<ApiResponse<Vec<Drone>>> {
    let predicate = query.predicate();
    Json(ApiResponse::ok(state.view.project(&predicate)))
}

pub async fn get_drone(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Drone>>, ApiError> {
    state
        .view
        .drone(&DroneId::from(id.as_str()))
        .map(|drone| Json(ApiResponse::ok(drone)))
        .ok_or_else(|| ApiError::NotFound(format!("Drone '{id}' not found")))
}

// A path can exist before the first snapshot of its drone arrives
pub async fn get_path(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<TrajectoryPoint>>>, ApiError> {
    let id = DroneId::from(id);
    let path = state.view.trajectory(&id);

    if path.is_empty() && state.view.drone(&id).is_none() {
        return Err(ApiError::NotFound(format!("Drone '{id}' not found")));
    }
    Ok(Json(ApiResponse::ok(path)))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<ApiResponse<FleetStats>> {
    Json(ApiResponse::ok(state.view.stats()))
}
