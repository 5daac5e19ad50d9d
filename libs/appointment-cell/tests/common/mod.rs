// Shared fixtures for appointment-cell integration tests: in-process stores
// honoring the same contracts as the backed ones, in particular the rule
// that slot reservation is arbitrated inside the store.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentStatus, BookingError};
use appointment_cell::services::booking::BookingCoordinator;
use appointment_cell::services::notify::{BookingNotice, BookingNotifier};
use appointment_cell::services::store::{AppointmentStore, DoctorStore, PatientStore};
use doctor_cell::models::{Address, Doctor, SlotDate, SlotTime};
use patient_cell::models::{Address as PatientAddress, Patient};

pub fn booking_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap()
}

pub fn slot_date(key: &str) -> SlotDate {
    key.parse().expect("test slot date")
}

pub fn slot_time(label: &str) -> SlotTime {
    label.parse().expect("test slot time")
}

pub fn test_doctor(fees: i64) -> Doctor {
    let now = booking_instant();
    Doctor {
        id: Uuid::new_v4(),
        name: "Dr. Richard James".to_string(),
        email: "richard.james@medibook.example".to_string(),
        speciality: "General physician".to_string(),
        degree: "MBBS".to_string(),
        experience: "4 Years".to_string(),
        about: "General physician with a focus on preventive care".to_string(),
        fees,
        available: true,
        address: Address {
            line1: "17th Cross, Richmond".to_string(),
            line2: "Circle, Ring Road".to_string(),
        },
        image_url: None,
        slots_booked: Default::default(),
        slots_version: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn test_patient(name: &str) -> Patient {
    let now = booking_instant();
    Patient {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: "0000000000".to_string(),
        address: PatientAddress::default(),
        dob: None,
        gender: None,
        image_url: None,
        created_at: now,
        updated_at: now,
    }
}

// ==============================================================================
// IN-MEMORY STORES
// ==============================================================================

#[derive(Default)]
pub struct InMemoryDoctorStore {
    doctors: Mutex<HashMap<Uuid, Doctor>>,
}

impl InMemoryDoctorStore {
    pub fn with_doctors(doctors: Vec<Doctor>) -> Arc<Self> {
        Arc::new(Self {
            doctors: Mutex::new(doctors.into_iter().map(|d| (d.id, d)).collect()),
        })
    }

    pub fn doctor(&self, doctor_id: Uuid) -> Doctor {
        self.doctors
            .lock()
            .unwrap()
            .get(&doctor_id)
            .cloned()
            .expect("doctor present")
    }
}

#[async_trait]
impl DoctorStore for InMemoryDoctorStore {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, BookingError> {
        Ok(self.doctors.lock().unwrap().get(&doctor_id).cloned())
    }

    async fn reserve_slot(
        &self,
        doctor_id: Uuid,
        date: &SlotDate,
        time: &SlotTime,
    ) -> Result<Doctor, BookingError> {
        let mut doctors = self.doctors.lock().unwrap();
        let doctor = doctors
            .get_mut(&doctor_id)
            .ok_or(BookingError::DoctorNotFound)?;

        if !doctor.slots_booked.reserve(*date, *time) {
            return Err(BookingError::SlotTaken);
        }
        doctor.slots_version += 1;
        Ok(doctor.clone())
    }

    async fn release_slot(
        &self,
        doctor_id: Uuid,
        date: &SlotDate,
        time: &SlotTime,
    ) -> Result<(), BookingError> {
        let mut doctors = self.doctors.lock().unwrap();
        let doctor = doctors
            .get_mut(&doctor_id)
            .ok_or(BookingError::DoctorNotFound)?;

        doctor.slots_booked.release(date, time);
        doctor.slots_version += 1;
        Ok(())
    }

    async fn count_doctors(&self) -> Result<usize, BookingError> {
        Ok(self.doctors.lock().unwrap().len())
    }
}

#[derive(Default)]
pub struct InMemoryPatientStore {
    patients: Mutex<HashMap<Uuid, Patient>>,
}

impl InMemoryPatientStore {
    pub fn with_patients(patients: Vec<Patient>) -> Arc<Self> {
        Arc::new(Self {
            patients: Mutex::new(patients.into_iter().map(|p| (p.id, p)).collect()),
        })
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn find_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, BookingError> {
        Ok(self.patients.lock().unwrap().get(&patient_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: Mutex<Vec<Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<Appointment> {
        self.appointments.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn create(&self, appointment: &Appointment) -> Result<Appointment, BookingError> {
        let mut appointments = self.appointments.lock().unwrap();
        appointments.push(appointment.clone());
        Ok(appointment.clone())
    }

    async fn find(&self, appointment_id: Uuid) -> Result<Option<Appointment>, BookingError> {
        Ok(self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .find(|apt| apt.id == appointment_id)
            .cloned())
    }

    async fn set_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, BookingError> {
        let mut appointments = self.appointments.lock().unwrap();
        let appointment = appointments
            .iter_mut()
            .find(|apt| apt.id == appointment_id)
            .ok_or(BookingError::AppointmentNotFound)?;

        appointment.status = status;
        Ok(appointment.clone())
    }

    async fn set_paid(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        let mut appointments = self.appointments.lock().unwrap();
        let appointment = appointments
            .iter_mut()
            .find(|apt| apt.id == appointment_id)
            .ok_or(BookingError::AppointmentNotFound)?;

        appointment.paid = true;
        Ok(appointment.clone())
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, BookingError> {
        let mut matching: Vec<Appointment> = self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|apt| apt.patient_id == patient_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.booked_at.cmp(&a.booked_at));
        Ok(matching)
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, BookingError> {
        let mut matching: Vec<Appointment> = self
            .appointments
            .lock()
            .unwrap()
            .iter()
            .filter(|apt| apt.doctor_id == doctor_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.booked_at.cmp(&a.booked_at));
        Ok(matching)
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, BookingError> {
        let mut all = self.appointments.lock().unwrap().clone();
        all.sort_by(|a, b| b.booked_at.cmp(&a.booked_at));
        Ok(all)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<BookingNotice>>,
}

impl RecordingNotifier {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl BookingNotifier for RecordingNotifier {
    async fn booking_confirmed(&self, notice: &BookingNotice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

// ==============================================================================
// HARNESS
// ==============================================================================

pub struct TestClinic {
    pub doctors: Arc<InMemoryDoctorStore>,
    pub patients: Arc<InMemoryPatientStore>,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub coordinator: Arc<BookingCoordinator>,
}

impl TestClinic {
    pub fn with(doctors: Vec<Doctor>, patients: Vec<Patient>) -> Self {
        let doctors = InMemoryDoctorStore::with_doctors(doctors);
        let patients = InMemoryPatientStore::with_patients(patients);
        let appointments = InMemoryAppointmentStore::empty();
        let notifier = RecordingNotifier::empty();

        let coordinator = Arc::new(BookingCoordinator::with_stores(
            doctors.clone(),
            patients.clone(),
            appointments.clone(),
            notifier.clone(),
        ));

        Self {
            doctors,
            patients,
            appointments,
            notifier,
            coordinator,
        }
    }
}
