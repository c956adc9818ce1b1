use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Any staff member may read the catalog; writes are checked for ADMIN in the handlers.
pub fn treatment_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_treatments).post(handlers::create_treatment))
        .route(
            "/{treatment_id}",
            get(handlers::get_treatment)
                .put(handlers::update_treatment)
                .delete(handlers::delete_treatment),
        )
        .route("/{treatment_id}/toggle", patch(handlers::toggle_treatment))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
