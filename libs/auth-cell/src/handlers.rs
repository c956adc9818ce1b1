use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::ActorContext;
use shared_models::error::AppError;
use shared_utils::jwt::{issue_token, validate_token};
use shared_utils::password::verify_password;
use user_cell::models::UserError;
use user_cell::services::UserService;

use crate::models::{AuthError, LoginRequest, LoginResponse};

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        let message = e.to_string();
        match e {
            AuthError::InvalidCredentials => AppError::Auth(message),
            AuthError::MissingCredentials => AppError::ValidationError(message),
            AuthError::TokenSigning(_) => AppError::Internal(message),
            AuthError::User(inner) => inner.into(),
        }
    }
}

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AuthError::MissingCredentials.into());
    }

    let credentials = UserService::new(&config)
        .find_credentials(&request.email)
        .await
        .map_err(AuthError::from)?
        .ok_or(AuthError::InvalidCredentials)?;

    let Some(hash) = credentials.password_hash.as_deref() else {
        warn!("Login attempt for {} which has no password set", credentials.user.email);
        return Err(AuthError::InvalidCredentials.into());
    };

    // A malformed stored hash is treated as a mismatch.
    if !verify_password(&request.password, hash).unwrap_or(false) {
        debug!("Wrong password for {}", credentials.user.email);
        return Err(AuthError::InvalidCredentials.into());
    }

    if !credentials.user.is_active {
        warn!("Login attempt for disabled account {}", credentials.user.email);
        return Err(AuthError::InvalidCredentials.into());
    }

    let user = credentials.user;
    let actor = ActorContext {
        id: user.id.to_string(),
        email: Some(user.email.clone()),
        full_name: Some(user.full_name.clone()),
        role: user.role,
        issued_at: None,
    };

    let token = issue_token(&actor, &config.supabase_jwt_secret, config.jwt_expiry_hours)
        .map_err(AuthError::TokenSigning)?;

    info!("{} signed in as {}", user.email, user.role);

    Ok(Json(LoginResponse {
        access_token: token.access_token,
        token_type: token.token_type,
        expires_at: token.expires_at,
        user,
    }))
}

/// Current session plus the stored profile, so role changes show up
/// before the token expires.
#[axum::debug_handler]
pub async fn me(
    State(config): State<Arc<AppConfig>>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Value>, AppError> {
    let user_id = Uuid::parse_str(&actor.id)
        .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))?;

    let profile = match UserService::new(&config).get_user(user_id).await {
        Ok(user) => Some(user),
        Err(UserError::NotFound) => return Err(AppError::Auth("Account no longer exists".to_string())),
        Err(e) => {
            warn!("Profile lookup failed for {}: {}", actor.id, e);
            None
        }
    };

    Ok(Json(json!({
        "user": actor,
        "profile": profile
    })))
}

#[axum::debug_handler]
pub async fn verify(
    State(config): State<Arc<AppConfig>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Json<Value> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Json(json!({ "valid": false }));
    };

    match validate_token(bearer.token(), &config.supabase_jwt_secret) {
        Ok(actor) => Json(json!({
            "valid": true,
            "user_id": actor.id,
            "role": actor.role
        })),
        Err(reason) => {
            debug!("Token rejected: {}", reason);
            Json(json!({ "valid": false }))
        }
    }
}

/// Tokens are stateless; the client just discards its copy.
#[axum::debug_handler]
pub async fn logout(Extension(actor): Extension<ActorContext>) -> Json<Value> {
    info!("User {} signed out", actor.id);
    Json(json!({ "success": true }))
}
