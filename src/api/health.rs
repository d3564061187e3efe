use actix_web::{HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::database;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: String,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> impl Responder {
    let database = match database::get().await {
        Ok(db) => match db.health_check().await {
            Ok(_) => "connected".to_string(),
            Err(_) => "unreachable".to_string(),
        },
        Err(_) => "unreachable".to_string(),
    };

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "academy-user-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        timestamp: chrono::Utc::now().timestamp(),
    })
}
