use axum::{Json, extract::State, http::StatusCode};

use super::error::ApiError;
use super::models::{ApiResponse, SelectionBody};
use crate::AppState;

pub async fn get_selection(State(state): State<AppState>) -> Json<ApiResponse<SelectionBody>> {
    Json(ApiResponse::ok(SelectionBody {
        id: state.view.selected(),
    }))
}

/// Queue a selection change. Applied by the sync engine shortly after.
pub async fn put_selection(
    State(state): State<AppState>,
    Json(body): Json<SelectionBody>,
) -> Result<(StatusCode, Json<ApiResponse<SelectionBody>>), ApiError> {
    if let Some(id) = &body.id
        && state.view.drone(id).is_none()
    {
        return Err(ApiError::NotFound(format!("Drone '{id}' not found")));
    }

    if !state.view.select(body.id.clone()) {
        return Err(ApiError::Unavailable("Sync engine is not running".to_string()));
    }

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::ok(body))))
}
