// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::auth::ActorContext;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentInput, AppointmentQuery, ConflictCandidate,
    ConflictCheckQuery, ConflictCheckResponse, StatusUpdateRequest,
};
use crate::router::AppointmentState;

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        let message = e.to_string();
        match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::ConflictDetected(msg) => AppError::Conflict(msg),
            AppointmentError::ConflictUnverified(msg) => AppError::ExternalService(msg),
            AppointmentError::InvalidDuration(_)
            | AppointmentError::ValidationError(_) => AppError::ValidationError(message),
            AppointmentError::InvalidStatusTransition { .. } => AppError::BadRequest(message),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.booking.list_appointments(&query).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<AppointmentInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = state.booking.create_appointment(request).await?;
    info!("Appointment {} booked by {}", appointment.id, actor.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Appointment booked successfully"
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.get_appointment(appointment_id).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<AppointmentInput>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.update_appointment(appointment_id, request).await?;
    info!("Appointment {} updated by {}", appointment_id, actor.id);

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.update_status(appointment_id, request.status).await?;
    info!("Appointment {} set to {} by {}", appointment_id, request.status, actor.id);

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": format!("Appointment status changed to {}", request.status)
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Value>, AppError> {
    state.booking.delete_appointment(appointment_id).await?;
    info!("Appointment {} deleted by {}", appointment_id, actor.id);

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}

/// Advisory check used by the scheduling form while the user edits.
#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<AppointmentState>>,
    Query(params): Query<ConflictCheckQuery>,
) -> Result<Json<ConflictCheckResponse>, AppError> {
    let candidate = ConflictCandidate::from(params);
    if candidate.is_out_of_range() {
        return Err(AppError::ValidationError(
            "Appointment date and duration are out of range".to_string(),
        ));
    }
    let result = state.booking.conflict_service().check_conflict(&candidate).await;
    Ok(Json(ConflictCheckResponse::from(result)))
}

#[axum::debug_handler]
pub async fn get_valid_transitions(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.get_appointment(appointment_id).await?;
    let transitions = state.booking
        .lifecycle_service()
        .get_valid_transitions(appointment.status);

    Ok(Json(json!({
        "current_status": appointment.status,
        "valid_transitions": transitions
    })))
}
