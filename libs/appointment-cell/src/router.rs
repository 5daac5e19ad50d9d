// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        // Patient side
        .route("/", post(handlers::book_appointment))
        .route("/", get(handlers::list_my_appointments))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/pay", post(handlers::pay_appointment))
        // Doctor portal
        .route("/doctor", get(handlers::doctor_appointments))
        .route("/doctor/dashboard", get(handlers::doctor_dashboard))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        // Admin portal
        .route("/all", get(handlers::all_appointments))
        .route("/overview", get(handlers::clinic_overview))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}

/// Slot preview routes, nested under the doctor directory by the app router
/// so the picker URL reads `/doctors/{id}/slots`.
pub fn slot_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{doctor_id}/slots", get(handlers::available_slots))
        .with_state(state)
}
