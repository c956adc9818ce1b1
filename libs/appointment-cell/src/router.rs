// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::booking::AppointmentBookingService;
use crate::services::consistency::SchedulingGuard;
use crate::services::store::{AppointmentStore, SupabaseAppointmentStore};

pub struct AppointmentState {
    pub booking: AppointmentBookingService,
}

pub fn appointment_routes(config: Arc<AppConfig>) -> Router {
    let store = Arc::new(SupabaseAppointmentStore::new(SupabaseClient::new(&config)));
    appointment_routes_with_store(config, store)
}

pub fn appointment_routes_with_store(config: Arc<AppConfig>, store: Arc<dyn AppointmentStore>) -> Router {
    let state = Arc::new(AppointmentState {
        booking: AppointmentBookingService::new(&config, store, Arc::new(SchedulingGuard::new())),
    });

    // Every appointment operation requires an authenticated staff member
    Router::new()
        .route("/", get(handlers::list_appointments).post(handlers::create_appointment))
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/{appointment_id}/transitions", get(handlers::get_valid_transitions))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
