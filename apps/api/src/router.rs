use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::{appointment_routes, slot_routes};
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Medibook API is running!" }))
        .nest(
            "/doctors",
            doctor_routes(state.clone()).merge(slot_routes(state.clone())),
        )
        .nest("/patients", patient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state))
}
