// libs/appointment-cell/src/services/booking.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentStatus, BookSlotRequest, BookingError, CancelActor, ClinicOverview,
    DoctorDashboard, DoctorSnapshot, PatientSnapshot,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::notify::{BookingNotice, BookingNotifier, WebhookNotifier};
use crate::services::store::{
    AppointmentStore, BackedAppointmentStore, BackedDoctorStore, BackedPatientStore, DoctorStore,
    PatientStore,
};

/// Commits and unwinds slot reservations against the authoritative stores.
///
/// The client computes its slot picker from a fetched snapshot, so whatever
/// it asks for is re-validated here against live state before anything is
/// written. Slot arbitration itself lives behind [`DoctorStore`]: the store
/// decides which of two racing reservations lands.
pub struct BookingCoordinator {
    doctors: Arc<dyn DoctorStore>,
    patients: Arc<dyn PatientStore>,
    appointments: Arc<dyn AppointmentStore>,
    notifier: Arc<dyn BookingNotifier>,
    lifecycle: AppointmentLifecycleService,
}

impl BookingCoordinator {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self::with_stores(
            Arc::new(BackedDoctorStore::new(config, auth_token)),
            Arc::new(BackedPatientStore::new(config, auth_token)),
            Arc::new(BackedAppointmentStore::new(config, auth_token)),
            Arc::new(WebhookNotifier::new(config)),
        )
    }

    pub fn with_stores(
        doctors: Arc<dyn DoctorStore>,
        patients: Arc<dyn PatientStore>,
        appointments: Arc<dyn AppointmentStore>,
        notifier: Arc<dyn BookingNotifier>,
    ) -> Self {
        Self {
            doctors,
            patients,
            appointments,
            notifier,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Book one slot for one patient. At most one appointment can ever hold
    /// a given (doctor, date, time); a lost race surfaces as
    /// [`BookingError::SlotTaken`], which is an expected outcome for the
    /// caller, not a fault.
    pub async fn book(
        &self,
        request: BookSlotRequest,
        patient_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, BookingError> {
        info!(
            "Booking slot {} {} with doctor {} for patient {}",
            request.slot_date, request.slot_time, request.doctor_id, patient_id
        );

        let doctor = self
            .doctors
            .find_doctor(request.doctor_id)
            .await?
            .ok_or(BookingError::DoctorNotFound)?;

        if !doctor.available {
            return Err(BookingError::DoctorUnavailable);
        }

        // Fast-path rejection on the snapshot we just read; the store's
        // conditional write below remains the authoritative check.
        if doctor
            .slots_booked
            .is_booked(&request.slot_date, &request.slot_time)
        {
            return Err(BookingError::SlotTaken);
        }

        let doctor = self
            .doctors
            .reserve_slot(request.doctor_id, &request.slot_date, &request.slot_time)
            .await?;

        let patient = match self.patients.find_patient(patient_id).await? {
            Some(patient) => patient,
            None => {
                self.unwind_reservation(&request).await;
                return Err(BookingError::PatientNotFound);
            }
        };

        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id: doctor.id,
            slot_date: request.slot_date,
            slot_time: request.slot_time,
            doctor: DoctorSnapshot::from(&doctor),
            patient: PatientSnapshot::from(&patient),
            amount: doctor.fees,
            status: AppointmentStatus::Pending,
            paid: false,
            booked_at: now,
        };

        let appointment = match self.appointments.create(&appointment).await {
            Ok(created) => created,
            Err(e) => {
                self.unwind_reservation(&request).await;
                return Err(e);
            }
        };

        self.notifier
            .booking_confirmed(&BookingNotice {
                doctor_email: appointment.doctor.email.clone(),
                doctor_name: appointment.doctor.name.clone(),
                patient_name: appointment.patient.name.clone(),
                slot_date: appointment.slot_date.to_string(),
                slot_time: appointment.slot_time.to_string(),
            })
            .await;

        info!("Appointment {} booked", appointment.id);
        Ok(appointment)
    }

    /// Cancel an appointment and give the slot back. Patients and doctors
    /// may only cancel their own; cancellation of a finished or already
    /// cancelled appointment is rejected.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        actor: CancelActor,
    ) -> Result<Appointment, BookingError> {
        debug!("Cancelling appointment {}", appointment_id);

        let appointment = self
            .appointments
            .find(appointment_id)
            .await?
            .ok_or(BookingError::AppointmentNotFound)?;

        let authorized = match actor {
            CancelActor::Patient(id) => id == appointment.patient_id,
            CancelActor::Doctor(id) => id == appointment.doctor_id,
            CancelActor::Admin => true,
        };
        if !authorized {
            return Err(BookingError::Unauthorized);
        }

        self.lifecycle
            .validate_transition(&appointment.status, &AppointmentStatus::Cancelled)?;

        let cancelled = self
            .appointments
            .set_status(appointment_id, AppointmentStatus::Cancelled)
            .await?;

        self.doctors
            .release_slot(
                cancelled.doctor_id,
                &cancelled.slot_date,
                &cancelled.slot_time,
            )
            .await?;

        info!("Appointment {} cancelled", appointment_id);
        Ok(cancelled)
    }

    /// Mark a consultation as held. The slot stays in the doctor's map: it
    /// was consumed, not freed.
    pub async fn complete(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
    ) -> Result<Appointment, BookingError> {
        debug!("Completing appointment {}", appointment_id);

        let appointment = self
            .appointments
            .find(appointment_id)
            .await?
            .ok_or(BookingError::AppointmentNotFound)?;

        if appointment.doctor_id != doctor_id {
            return Err(BookingError::Unauthorized);
        }

        self.lifecycle
            .validate_transition(&appointment.status, &AppointmentStatus::Completed)?;

        let completed = self
            .appointments
            .set_status(appointment_id, AppointmentStatus::Completed)
            .await?;

        info!("Appointment {} completed", appointment_id);
        Ok(completed)
    }

    /// Record payment against a live appointment. Checkout itself happens
    /// elsewhere; this is only the stored outcome.
    pub async fn mark_paid(
        &self,
        appointment_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Appointment, BookingError> {
        let appointment = self
            .appointments
            .find(appointment_id)
            .await?
            .ok_or(BookingError::AppointmentNotFound)?;

        if appointment.patient_id != patient_id {
            return Err(BookingError::Unauthorized);
        }

        if appointment.status == AppointmentStatus::Cancelled {
            return Err(BookingError::InvalidTransition {
                from: appointment.status,
            });
        }

        self.appointments.set_paid(appointment_id).await
    }

    pub async fn appointments_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, BookingError> {
        self.appointments.list_for_patient(patient_id).await
    }

    pub async fn appointments_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<Appointment>, BookingError> {
        self.appointments.list_for_doctor(doctor_id).await
    }

    pub async fn all_appointments(&self) -> Result<Vec<Appointment>, BookingError> {
        self.appointments.list_all().await
    }

    /// Doctor-portal dashboard: earnings count consultations that were held
    /// or paid for, patients are counted once each.
    pub async fn doctor_dashboard(&self, doctor_id: Uuid) -> Result<DoctorDashboard, BookingError> {
        let appointments = self.appointments.list_for_doctor(doctor_id).await?;

        let earnings = appointments
            .iter()
            .filter(|apt| apt.status == AppointmentStatus::Completed || apt.paid)
            .map(|apt| apt.amount)
            .sum();

        let patients = appointments
            .iter()
            .map(|apt| apt.patient_id)
            .collect::<HashSet<_>>()
            .len();

        let total = appointments.len();
        let latest_appointments = appointments.into_iter().take(5).collect();

        Ok(DoctorDashboard {
            earnings,
            appointments: total,
            patients,
            latest_appointments,
        })
    }

    /// Admin-portal overview across the whole clinic.
    pub async fn clinic_overview(&self) -> Result<ClinicOverview, BookingError> {
        let doctors = self.doctors.count_doctors().await?;
        let appointments = self.appointments.list_all().await?;

        let patients = appointments
            .iter()
            .map(|apt| apt.patient_id)
            .collect::<HashSet<_>>()
            .len();

        let total = appointments.len();
        let latest_appointments = appointments.into_iter().take(5).collect();

        Ok(ClinicOverview {
            doctors,
            appointments: total,
            patients,
            latest_appointments,
        })
    }

    /// Give a slot back after a booking failed downstream of the
    /// reservation. Best effort: the failure being unwound is what the
    /// caller will see either way.
    async fn unwind_reservation(&self, request: &BookSlotRequest) {
        if let Err(e) = self
            .doctors
            .release_slot(request.doctor_id, &request.slot_date, &request.slot_time)
            .await
        {
            warn!(
                "Failed to release slot {} {} for doctor {} after aborted booking: {}",
                request.slot_date, request.slot_time, request.doctor_id, e
            );
        }
    }
}
