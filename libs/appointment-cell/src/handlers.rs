// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use doctor_cell::services::doctor::DoctorService;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{BookSlotRequest, BookingError, CancelActor};
use crate::services::booking::BookingCoordinator;
use crate::services::slots;

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        BookingError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
        BookingError::AppointmentNotFound => {
            AppError::NotFound("Appointment not found".to_string())
        }
        BookingError::DoctorUnavailable => {
            AppError::Conflict("Doctor is not accepting bookings".to_string())
        }
        BookingError::SlotTaken => {
            AppError::Conflict("Appointment slot already booked".to_string())
        }
        BookingError::Unauthorized => {
            AppError::Auth("Not authorized for this appointment".to_string())
        }
        BookingError::InvalidTransition { from } => AppError::BadRequest(format!(
            "Appointment cannot change in status {}",
            from
        )),
        BookingError::InvalidSlot(msg) => AppError::BadRequest(msg),
        BookingError::Store(msg) => AppError::Database(msg),
    }
}

fn actor_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Malformed account identifier".to_string()))
}

fn require_doctor(user: &User) -> Result<Uuid, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth("Doctor account required".to_string()));
    }
    actor_id(user)
}

fn require_admin(user: &User) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Admin account required".to_string()));
    }
    Ok(())
}

// ==============================================================================
// PATIENT-FACING HANDLERS
// ==============================================================================

/// Open slots for one doctor over the rolling booking window. Public: the
/// slot picker renders before login.
#[axum::debug_handler]
pub async fn available_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);
    let doctor = service.get_doctor(doctor_id, None).await.map_err(|e| match e {
        doctor_cell::models::DoctorError::NotFound => {
            AppError::NotFound("Doctor not found".to_string())
        }
        other => AppError::Database(other.to_string()),
    })?;

    let days = slots::generate(&doctor.slots_booked, Utc::now());

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor.id,
        "available": doctor.available,
        "days": days
    })))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = actor_id(&user)?;

    let coordinator = BookingCoordinator::new(&state, auth.token());
    let appointment = coordinator
        .book(request, patient_id, Utc::now())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked"
    })))
}

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = actor_id(&user)?;

    let coordinator = BookingCoordinator::new(&state, auth.token());
    let appointments = coordinator
        .appointments_for_patient(patient_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = if user.is_admin() {
        CancelActor::Admin
    } else if user.is_doctor() {
        CancelActor::Doctor(actor_id(&user)?)
    } else {
        CancelActor::Patient(actor_id(&user)?)
    };

    let coordinator = BookingCoordinator::new(&state, auth.token());
    let appointment = coordinator
        .cancel(appointment_id, actor)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn pay_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = actor_id(&user)?;

    let coordinator = BookingCoordinator::new(&state, auth.token());
    let appointment = coordinator
        .mark_paid(appointment_id, patient_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Payment recorded"
    })))
}

// ==============================================================================
// DOCTOR-FACING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;

    let coordinator = BookingCoordinator::new(&state, auth.token());
    let appointments = coordinator
        .appointments_for_doctor(doctor_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;

    let coordinator = BookingCoordinator::new(&state, auth.token());
    let appointment = coordinator
        .complete(appointment_id, doctor_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}

#[axum::debug_handler]
pub async fn doctor_dashboard(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;

    let coordinator = BookingCoordinator::new(&state, auth.token());
    let dashboard = coordinator
        .doctor_dashboard(doctor_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "dashboard": dashboard
    })))
}

// ==============================================================================
// ADMIN-FACING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn all_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let coordinator = BookingCoordinator::new(&state, auth.token());
    let appointments = coordinator
        .all_appointments()
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn clinic_overview(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let coordinator = BookingCoordinator::new(&state, auth.token());
    let overview = coordinator
        .clinic_overview()
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "overview": overview
    })))
}
