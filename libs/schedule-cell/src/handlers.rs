use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{ActorContext, ClinicRole};
use shared_models::error::AppError;

use crate::models::{ScheduleError, ScheduleInput, ScheduleQuery};
use crate::services::ScheduleService;

impl From<ScheduleError> for AppError {
    fn from(e: ScheduleError) -> Self {
        let message = e.to_string();
        match e {
            ScheduleError::NotFound => AppError::NotFound(message),
            ScheduleError::InvalidDay(_) | ScheduleError::InvalidTimeRange => AppError::ValidationError(message),
            ScheduleError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn list_schedules(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&config);
    let schedules = service.list_schedules(&query).await?;

    Ok(Json(json!({
        "schedules": schedules,
        "total": schedules.len()
    })))
}

#[axum::debug_handler]
pub async fn create_schedule(
    State(config): State<Arc<AppConfig>>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<ScheduleInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    actor.require_role(&[ClinicRole::Admin])?;

    let service = ScheduleService::new(&config);
    let schedule = service.create_schedule(request).await?;
    Ok((StatusCode::CREATED, Json(json!(schedule))))
}

#[axum::debug_handler]
pub async fn update_schedule(
    State(config): State<Arc<AppConfig>>,
    Path(schedule_id): Path<Uuid>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<ScheduleInput>,
) -> Result<Json<Value>, AppError> {
    actor.require_role(&[ClinicRole::Admin])?;

    let service = ScheduleService::new(&config);
    Ok(Json(json!(service.update_schedule(schedule_id, request).await?)))
}

#[axum::debug_handler]
pub async fn toggle_schedule(
    State(config): State<Arc<AppConfig>>,
    Path(schedule_id): Path<Uuid>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Value>, AppError> {
    actor.require_role(&[ClinicRole::Admin])?;

    let service = ScheduleService::new(&config);
    Ok(Json(json!(service.toggle_schedule(schedule_id).await?)))
}

#[axum::debug_handler]
pub async fn delete_schedule(
    State(config): State<Arc<AppConfig>>,
    Path(schedule_id): Path<Uuid>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Value>, AppError> {
    actor.require_role(&[ClinicRole::Admin])?;

    let service = ScheduleService::new(&config);
    service.delete_schedule(schedule_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Schedule deleted"
    })))
}
