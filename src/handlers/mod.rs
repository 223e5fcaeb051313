pub mod admin;
pub mod auth;
pub mod questions;

use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::MessageResponse;

/// HealthResponse
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// root
///
/// [Public Route] Service banner.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service banner", body = MessageResponse))
)]
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Geography Question Bank API".to_string(),
    })
}

/// health_check
///
/// [Public Route] Liveness probe. Does not touch the database.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}
