//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use skimsim_core::CommandError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Command refused by the controller (start while busy, analyze without logs)
    Conflict(CommandError),

    // Resource errors
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Conflict(err) => {
                tracing::debug!("Command refused: {}", err);
                (StatusCode::CONFLICT, err.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<CommandError> for AppError {
    fn from(err: CommandError) -> Self {
        AppError::Conflict(err)
    }
}
