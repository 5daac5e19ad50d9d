// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    ChangeAvailabilityRequest, DoctorError, RegisterDoctorRequest, UpdateDoctorProfileRequest,
};
use crate::services::doctor::DoctorService;

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::SlotTaken => AppError::Conflict("Appointment slot already booked".to_string()),
        DoctorError::ValidationError(msg) => AppError::BadRequest(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn own_doctor_id(user: &User) -> Result<Uuid, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Auth("Doctor account required".to_string()));
    }
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Malformed doctor identifier".to_string()))
}

/// Public doctor directory for the booking frontends.
#[axum::debug_handler]
pub async fn list_doctors(State(state): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);
    let doctors = service.list_doctors(None).await.map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctors": doctors
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);
    let doctor = service
        .get_doctor(doctor_id, None)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

/// Admin-only doctor registration.
#[axum::debug_handler]
pub async fn register_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RegisterDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Not authorized to register doctors".to_string()));
    }

    let service = DoctorService::new(&state);
    let doctor = service
        .register_doctor(request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
        "message": "Doctor registered"
    })))
}

/// Toggle whether a doctor accepts bookings. Doctors flip their own flag;
/// admins may flip anyone's.
#[axum::debug_handler]
pub async fn change_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ChangeAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let is_self = user.id == doctor_id.to_string();
    if !is_self && !user.is_admin() {
        return Err(AppError::Auth(
            "Not authorized to change this doctor's availability".to_string(),
        ));
    }

    let service = DoctorService::new(&state);
    let doctor = service
        .set_availability(doctor_id, request.available, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
        "message": "Availability updated"
    })))
}

#[axum::debug_handler]
pub async fn get_own_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = own_doctor_id(&user)?;

    let service = DoctorService::new(&state);
    let doctor = service
        .get_doctor(doctor_id, Some(auth.token()))
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn update_own_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = own_doctor_id(&user)?;

    let service = DoctorService::new(&state);
    let doctor = service
        .update_profile(doctor_id, request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
        "message": "Profile updated"
    })))
}
