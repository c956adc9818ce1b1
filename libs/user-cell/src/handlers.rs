use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{ActorContext, ClinicRole};
use shared_models::error::AppError;

use crate::models::{ChangePasswordRequest, CreateUserRequest, UpdateUserRequest, UserError};
use crate::services::UserService;

impl From<UserError> for AppError {
    fn from(e: UserError) -> Self {
        let message = e.to_string();
        match e {
            UserError::NotFound => AppError::NotFound(message),
            UserError::EmailAlreadyExists(_) => AppError::Conflict(message),
            UserError::CannotDeactivateSelf => AppError::BadRequest(message),
            UserError::ValidationError(_) => AppError::ValidationError(message),
            UserError::PasswordHash => AppError::Internal(message),
            UserError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

fn require_admin(actor: &ActorContext) -> Result<(), AppError> {
    actor.require_role(&[ClinicRole::Admin])
}

#[axum::debug_handler]
pub async fn list_users(
    State(config): State<Arc<AppConfig>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Value>, AppError> {
    require_admin(&actor)?;

    let users = UserService::new(&config).list_users().await?;
    Ok(Json(json!({
        "users": users,
        "total": users.len()
    })))
}

/// Open to every role: the scheduling screens need the doctor list.
#[axum::debug_handler]
pub async fn list_doctors(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let doctors = UserService::new(&config).list_doctors().await?;
    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn create_user(
    State(config): State<Arc<AppConfig>>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&actor)?;

    let user = UserService::new(&config).create_user(request).await?;
    Ok((StatusCode::CREATED, Json(json!(user))))
}

#[axum::debug_handler]
pub async fn get_user(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Value>, AppError> {
    require_admin(&actor)?;

    let user = UserService::new(&config).get_user(user_id).await?;
    Ok(Json(json!(user)))
}

#[axum::debug_handler]
pub async fn update_user(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&actor)?;

    let user = UserService::new(&config).update_user(user_id, request).await?;
    Ok(Json(json!(user)))
}

#[axum::debug_handler]
pub async fn toggle_user(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Value>, AppError> {
    require_admin(&actor)?;
    let acting_user = Uuid::parse_str(&actor.id)
        .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))?;

    let user = UserService::new(&config).toggle_user(user_id, acting_user).await?;
    Ok(Json(json!(user)))
}

#[axum::debug_handler]
pub async fn change_password(
    State(config): State<Arc<AppConfig>>,
    Extension(actor): Extension<ActorContext>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&actor)?;

    UserService::new(&config)
        .change_password(request.user_id, &request.new_password)
        .await?;

    Ok(Json(json!({ "success": true })))
}
