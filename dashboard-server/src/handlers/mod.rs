//! HTTP handlers

pub mod health;
pub mod dashboard;
pub mod session;
pub mod attack;
pub mod analysis;

use axum::http::Uri;

use crate::AppError;

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
