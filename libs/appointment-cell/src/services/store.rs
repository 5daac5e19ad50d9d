// libs/appointment-cell/src/services/store.rs
//
// Core-facing boundaries of the booking path. The coordinator talks to the
// doctor record, the patient record, and the appointment ledger only through
// these traits, so the storage side can arbitrate write races (and tests can
// substitute an in-process store with the same contract).
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use doctor_cell::models::{Doctor, DoctorError, SlotDate, SlotTime};
use doctor_cell::services::doctor::DoctorService;
use patient_cell::models::{Patient, PatientError};
use patient_cell::services::patient::PatientService;

use crate::models::{Appointment, AppointmentStatus, BookingError};

#[async_trait]
pub trait DoctorStore: Send + Sync {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, BookingError>;

    /// Reserve one (date, time) slot. The store itself must arbitrate
    /// concurrent reservations of the same slot: of two racing calls exactly
    /// one may succeed, the other sees [`BookingError::SlotTaken`].
    async fn reserve_slot(
        &self,
        doctor_id: Uuid,
        date: &SlotDate,
        time: &SlotTime,
    ) -> Result<Doctor, BookingError>;

    /// Drop a reservation. Releasing a slot nobody holds is a no-op.
    async fn release_slot(
        &self,
        doctor_id: Uuid,
        date: &SlotDate,
        time: &SlotTime,
    ) -> Result<(), BookingError>;

    async fn count_doctors(&self) -> Result<usize, BookingError>;
}

#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn find_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, BookingError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create(&self, appointment: &Appointment) -> Result<Appointment, BookingError>;

    async fn find(&self, appointment_id: Uuid) -> Result<Option<Appointment>, BookingError>;

    async fn set_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, BookingError>;

    async fn set_paid(&self, appointment_id: Uuid) -> Result<Appointment, BookingError>;

    /// Newest first.
    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, BookingError>;

    /// Newest first.
    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, BookingError>;

    /// Newest first.
    async fn list_all(&self) -> Result<Vec<Appointment>, BookingError>;
}

fn map_doctor_error(e: DoctorError) -> BookingError {
    match e {
        DoctorError::NotFound => BookingError::DoctorNotFound,
        DoctorError::SlotTaken => BookingError::SlotTaken,
        DoctorError::ValidationError(msg) => BookingError::InvalidSlot(msg),
        DoctorError::DatabaseError(msg) => BookingError::Store(msg),
    }
}

fn map_patient_error(e: PatientError) -> BookingError {
    match e {
        PatientError::NotFound => BookingError::PatientNotFound,
        PatientError::ValidationError(msg) => BookingError::InvalidSlot(msg),
        PatientError::DatabaseError(msg) => BookingError::Store(msg),
    }
}

// ==============================================================================
// PRODUCTION IMPLEMENTATIONS
// ==============================================================================

/// Doctor store backed by the doctor cell's conditional slot writes. Built
/// per request, carrying the caller's bearer token the way the services do.
pub struct BackedDoctorStore {
    service: DoctorService,
    auth_token: String,
}

impl BackedDoctorStore {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self {
            service: DoctorService::new(config),
            auth_token: auth_token.to_string(),
        }
    }
}

#[async_trait]
impl DoctorStore for BackedDoctorStore {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, BookingError> {
        self.service
            .find_doctor(doctor_id, Some(&self.auth_token))
            .await
            .map_err(map_doctor_error)
    }

    async fn reserve_slot(
        &self,
        doctor_id: Uuid,
        date: &SlotDate,
        time: &SlotTime,
    ) -> Result<Doctor, BookingError> {
        self.service
            .reserve_slot(doctor_id, date, time, &self.auth_token)
            .await
            .map_err(map_doctor_error)
    }

    async fn release_slot(
        &self,
        doctor_id: Uuid,
        date: &SlotDate,
        time: &SlotTime,
    ) -> Result<(), BookingError> {
        self.service
            .release_slot(doctor_id, date, time, &self.auth_token)
            .await
            .map_err(map_doctor_error)
    }

    async fn count_doctors(&self) -> Result<usize, BookingError> {
        let doctors = self
            .service
            .list_doctors(Some(&self.auth_token))
            .await
            .map_err(map_doctor_error)?;
        Ok(doctors.len())
    }
}

pub struct BackedPatientStore {
    service: PatientService,
    auth_token: String,
}

impl BackedPatientStore {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self {
            service: PatientService::new(config),
            auth_token: auth_token.to_string(),
        }
    }
}

#[async_trait]
impl PatientStore for BackedPatientStore {
    async fn find_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, BookingError> {
        self.service
            .find_patient(patient_id, &self.auth_token)
            .await
            .map_err(map_patient_error)
    }
}

pub struct BackedAppointmentStore {
    supabase: SupabaseClient,
    auth_token: String,
}

impl BackedAppointmentStore {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            auth_token: auth_token.to_string(),
        }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Appointment>, BookingError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(&self.auth_token), None)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| BookingError::Store(format!("Failed to parse appointments: {}", e)))
    }

    async fn patch(&self, appointment_id: Uuid, update: Value) -> Result<Appointment, BookingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(&self.auth_token),
                Some(update),
                Some(return_representation()),
            )
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or(BookingError::AppointmentNotFound)?;

        serde_json::from_value(row)
            .map_err(|e| BookingError::Store(format!("Failed to parse updated appointment: {}", e)))
    }
}

#[async_trait]
impl AppointmentStore for BackedAppointmentStore {
    async fn create(&self, appointment: &Appointment) -> Result<Appointment, BookingError> {
        let body = serde_json::to_value(appointment)
            .map_err(|e| BookingError::Store(format!("Failed to encode appointment: {}", e)))?;

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(&self.auth_token),
                Some(body),
                Some(return_representation()),
            )
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::Store("Failed to create appointment".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| BookingError::Store(format!("Failed to parse created appointment: {}", e)))
    }

    async fn find(&self, appointment_id: Uuid) -> Result<Option<Appointment>, BookingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    async fn set_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, BookingError> {
        self.patch(appointment_id, json!({ "status": status.to_string() }))
            .await
    }

    async fn set_paid(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.patch(appointment_id, json!({ "paid": true })).await
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, BookingError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=booked_at.desc",
            patient_id
        );
        self.fetch(&path).await
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, BookingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=booked_at.desc",
            doctor_id
        );
        self.fetch(&path).await
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, BookingError> {
        self.fetch("/rest/v1/appointments?order=booked_at.desc").await
    }
}
