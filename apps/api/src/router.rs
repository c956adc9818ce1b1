use std::sync::Arc;

use axum::{
    Json,
    Router,
    routing::get,
};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use catalog_cell::router::treatment_routes;
use patient_cell::router::patient_routes;
use schedule_cell::router::schedule_routes;
use shared_config::AppConfig;
use user_cell::router::user_routes;

async fn health(config: Arc<AppConfig>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "configured": config.is_configured()
    }))
}

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let health_state = state.clone();

    Router::new()
        .route("/", get(|| async { "Amae Clinic API is running!" }))
        .route("/health", get(move || health(health_state.clone())))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/treatments", treatment_routes(state.clone()))
        .nest("/schedules", schedule_routes(state))
}
