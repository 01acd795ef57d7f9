//! Lightweight service health endpoint used for readiness checks and tests.

use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::SharedStore;

/// Basic response payload describing API health.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    /// `ok` when the archive store answers, `degraded` otherwise.
    pub status: String,
}

/// Health check endpoint probing the archive store.
#[openapi(tag = "Health")]
#[get("/health")]
pub async fn health_check(store: &State<SharedStore>) -> Json<HealthResponse> {
    let status = match store.count_in_thread(0).await {
        Ok(_) => "ok",
        Err(e) => {
            log::warn!("health check: store unavailable: {}", e);
            "degraded"
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
    })
}
