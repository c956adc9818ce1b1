use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{ActorContext, ClinicRole};
use shared_models::error::AppError;

use crate::models::{CatalogError, TreatmentInput, TreatmentQuery};
use crate::services::TreatmentService;

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        let message = e.to_string();
        match e {
            CatalogError::NotFound => AppError::NotFound(message),
            CatalogError::InUse => AppError::Conflict(message),
            CatalogError::ValidationError(_) => AppError::ValidationError(message),
            CatalogError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn list_treatments(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<TreatmentQuery>,
) -> Result<Json<Value>, AppError> {
    let service = TreatmentService::new(&config);
    let treatments = service.list_treatments(query.active_only.unwrap_or(false)).await?;

    Ok(Json(json!({
        "treatments": treatments,
        "total": treatments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_treatment(
    State(config): State<Arc<AppConfig>>,
    Path(treatment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = TreatmentService::new(&config);
    Ok(Json(json!(service.get_treatment(treatment_id).await?)))
}

#[axum::debug_handler]
pub async fn create_treatment(
    State(config): State<Arc<AppConfig>>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<TreatmentInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    actor.require_role(&[ClinicRole::Admin])?;

    let service = TreatmentService::new(&config);
    let treatment = service.create_treatment(request).await?;

    Ok((StatusCode::CREATED, Json(json!(treatment))))
}

#[axum::debug_handler]
pub async fn update_treatment(
    State(config): State<Arc<AppConfig>>,
    Path(treatment_id): Path<Uuid>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<TreatmentInput>,
) -> Result<Json<Value>, AppError> {
    actor.require_role(&[ClinicRole::Admin])?;

    let service = TreatmentService::new(&config);
    Ok(Json(json!(service.update_treatment(treatment_id, request).await?)))
}

#[axum::debug_handler]
pub async fn toggle_treatment(
    State(config): State<Arc<AppConfig>>,
    Path(treatment_id): Path<Uuid>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Value>, AppError> {
    actor.require_role(&[ClinicRole::Admin])?;

    let service = TreatmentService::new(&config);
    let treatment = service.toggle_treatment(treatment_id).await?;
    info!("Treatment {} is now {}", treatment.id, if treatment.is_active { "active" } else { "inactive" });

    Ok(Json(json!(treatment)))
}

#[axum::debug_handler]
pub async fn delete_treatment(
    State(config): State<Arc<AppConfig>>,
    Path(treatment_id): Path<Uuid>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Value>, AppError> {
    actor.require_role(&[ClinicRole::Admin])?;

    let service = TreatmentService::new(&config);
    service.delete_treatment(treatment_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Treatment deleted"
    })))
}
