use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn user_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route("/doctors", get(handlers::list_doctors))
        .route("/change-password", post(handlers::change_password))
        .route("/{user_id}", get(handlers::get_user).put(handlers::update_user))
        .route("/{user_id}/toggle", patch(handlers::toggle_user))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
