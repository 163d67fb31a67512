use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::models::ApiResponse;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}
