// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::models::{Address, Doctor, SlotDate, SlotTime};
use patient_cell::models::Patient;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A committed booking. Doctor and patient data are copied in at commit time
/// so the record still reads correctly after either profile is edited later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_date: SlotDate,
    pub slot_time: SlotTime,
    pub doctor: DoctorSnapshot,
    pub patient: PatientSnapshot,
    /// Fee owed, frozen from the doctor's rate at booking time.
    pub amount: i64,
    pub status: AppointmentStatus,
    pub paid: bool,
    pub booked_at: DateTime<Utc>,
}

/// One appointment lifecycle state. `Completed` and `Cancelled` are both
/// terminal, so a record can never be both at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSnapshot {
    pub name: String,
    pub email: String,
    pub speciality: String,
    pub degree: String,
    pub fees: i64,
    pub address: Address,
    pub image_url: Option<String>,
}

impl From<&Doctor> for DoctorSnapshot {
    fn from(doctor: &Doctor) -> Self {
        Self {
            name: doctor.name.clone(),
            email: doctor.email.clone(),
            speciality: doctor.speciality.clone(),
            degree: doctor.degree.clone(),
            fees: doctor.fees,
            address: doctor.address.clone(),
            image_url: doctor.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub image_url: Option<String>,
}

impl From<&Patient> for PatientSnapshot {
    fn from(patient: &Patient) -> Self {
        Self {
            name: patient.name.clone(),
            email: patient.email.clone(),
            phone: patient.phone.clone(),
            dob: patient.dob,
            gender: patient.gender.clone(),
            image_url: patient.image_url.clone(),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub doctor_id: Uuid,
    pub slot_date: SlotDate,
    pub slot_time: SlotTime,
}

/// Who is asking for a cancellation. Patients and doctors may only touch
/// their own bookings; admins may cancel anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelActor {
    Patient(Uuid),
    Doctor(Uuid),
    Admin,
}

// ==============================================================================
// DASHBOARD MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorDashboard {
    pub earnings: i64,
    pub appointments: usize,
    pub patients: usize,
    pub latest_appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicOverview {
    pub doctors: usize,
    pub appointments: usize,
    pub patients: usize,
    pub latest_appointments: Vec<Appointment>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Doctor is not accepting bookings")]
    DoctorUnavailable,

    #[error("Appointment slot already booked")]
    SlotTaken,

    #[error("Not authorized for this appointment")]
    Unauthorized,

    #[error("Appointment cannot change in status {from}")]
    InvalidTransition { from: AppointmentStatus },

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Store failure: {0}")]
    Store(String),
}
