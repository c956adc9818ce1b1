use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::ActorContext;
use shared_models::error::AppError;

use crate::models::{PatientError, PatientInput, PatientSearchQuery};
use crate::services::PatientService;

impl From<PatientError> for AppError {
    fn from(e: PatientError) -> Self {
        let message = e.to_string();
        match e {
            PatientError::NotFound => AppError::NotFound(message),
            PatientError::DpiAlreadyExists { .. } | PatientError::HasAppointments => AppError::Conflict(message),
            PatientError::InvalidDateOfBirth | PatientError::ValidationError(_) => {
                AppError::ValidationError(message)
            }
            PatientError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn list_patients(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patients = service.list_patients().await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<PatientInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let created_by = Uuid::parse_str(&actor.id)
        .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))?;

    let service = PatientService::new(&config);
    let patient = service.create_patient(request, created_by).await?;

    Ok((StatusCode::CREATED, Json(json!(patient))))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patient = service.get_patient(patient_id).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<PatientInput>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patient = service.update_patient(patient_id, request).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    service.delete_patient(patient_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Patient deleted"
    })))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patients = service.search_patients(query).await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}
