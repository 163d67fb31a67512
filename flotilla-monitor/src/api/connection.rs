use axum::{Json, extract::State, http::StatusCode};
use flotilla_sync::ConnectionStatus;

use super::models::{ApiResponse, ConnectionResponse};
use crate::AppState;

pub async fn get_connection(State(state): State<AppState>) -> Json<ApiResponse<ConnectionResponse>> {
    let status = state.connection.status();
    Json(ApiResponse::ok(ConnectionResponse {
        state: status.state,
        since: status.since,
        last_message_at: state.view.last_message_at(),
        counters: state.view.counters(),
    }))
}

pub async fn disconnect(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<ConnectionStatus>>) {
    state.connection.disconnect();
    let response = ApiResponse::ok(state.connection.status()).with_message("Disconnect requested");
    (StatusCode::ACCEPTED, Json(response))
}

pub async fn reconnect(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<ConnectionStatus>>) {
    state.connection.reconnect();
    let response = ApiResponse::ok(state.connection.status()).with_message("Reconnect requested");
    (StatusCode::ACCEPTED, Json(response))
}
