// libs/doctor-cell/src/services/doctor.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{
    Doctor, DoctorError, RegisterDoctorRequest, SlotDate, SlotTime, UpdateDoctorProfileRequest,
};

/// How many times a conditional slot-map write is retried when another
/// booking got in between the read and the write.
const MAX_SLOT_WRITE_ATTEMPTS: usize = 4;

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Public listing for the booking frontends. Includes the booked-slot
    /// map so clients can grey out taken slots without another round trip.
    pub async fn list_doctors(&self, auth_token: Option<&str>) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors");

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, "/rest/v1/doctors?order=name.asc", auth_token, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let doctors: Vec<Doctor> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Doctor>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }

    pub async fn find_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<Doctor>, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let doctor = serde_json::from_value(row).map_err(|e| {
                    DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e))
                })?;
                Ok(Some(doctor))
            }
            None => Ok(None),
        }
    }

    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Doctor, DoctorError> {
        self.find_doctor(doctor_id, auth_token)
            .await?
            .ok_or(DoctorError::NotFound)
    }

    /// Admin-side registration of a new doctor record.
    pub async fn register_doctor(
        &self,
        request: RegisterDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        if request.name.trim().is_empty() || request.email.trim().is_empty() {
            return Err(DoctorError::ValidationError(
                "Doctor name and email are required".to_string(),
            ));
        }
        if request.fees < 0 {
            return Err(DoctorError::ValidationError(
                "Consultation fee cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let doctor_data = json!({
            "name": request.name,
            "email": request.email,
            "speciality": request.speciality,
            "degree": request.degree,
            "experience": request.experience,
            "about": request.about,
            "fees": request.fees,
            "address": request.address,
            "image_url": request.image_url,
            "available": true,
            "slots_booked": {},
            "slots_version": 0,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctors",
                Some(auth_token),
                Some(doctor_data),
                Some(return_representation()),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::DatabaseError("Failed to create doctor".to_string()))?;

        let doctor: Doctor = serde_json::from_value(row).map_err(|e| {
            DoctorError::DatabaseError(format!("Failed to parse created doctor: {}", e))
        })?;

        info!("Doctor {} registered", doctor.id);
        Ok(doctor)
    }

    /// Flip whether the doctor accepts bookings at all.
    pub async fn set_availability(
        &self,
        doctor_id: Uuid,
        available: bool,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Setting availability for doctor {} to {}", doctor_id, available);

        let update = json!({
            "available": available,
            "updated_at": Utc::now().to_rfc3339()
        });

        self.patch_doctor(&format!("/rest/v1/doctors?id=eq.{}", doctor_id), update, auth_token)
            .await?
            .ok_or(DoctorError::NotFound)
    }

    pub async fn update_profile(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorProfileRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Updating profile for doctor {}", doctor_id);

        let mut update = serde_json::Map::new();
        if let Some(fees) = request.fees {
            if fees < 0 {
                return Err(DoctorError::ValidationError(
                    "Consultation fee cannot be negative".to_string(),
                ));
            }
            update.insert("fees".to_string(), json!(fees));
        }
        if let Some(about) = request.about {
            update.insert("about".to_string(), json!(about));
        }
        if let Some(address) = request.address {
            update.insert("address".to_string(), json!(address));
        }
        if let Some(available) = request.available {
            update.insert("available".to_string(), json!(available));
        }
        if let Some(image_url) = request.image_url {
            update.insert("image_url".to_string(), json!(image_url));
        }
        update.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        self.patch_doctor(
            &format!("/rest/v1/doctors?id=eq.{}", doctor_id),
            Value::Object(update),
            auth_token,
        )
        .await?
        .ok_or(DoctorError::NotFound)
    }

    /// Reserve one slot in the doctor's map, with the store arbitrating
    /// concurrent writers: the PATCH is filtered on the slot-map version the
    /// reader observed, so of two racing bookings exactly one write lands.
    /// The loser re-reads and either reports the slot taken or retries.
    pub async fn reserve_slot(
        &self,
        doctor_id: Uuid,
        date: &SlotDate,
        time: &SlotTime,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        for attempt in 0..MAX_SLOT_WRITE_ATTEMPTS {
            let doctor = self.get_doctor(doctor_id, Some(auth_token)).await?;

            if doctor.slots_booked.is_booked(date, time) {
                debug!(
                    "Slot {} {} already booked for doctor {}",
                    date, time, doctor_id
                );
                return Err(DoctorError::SlotTaken);
            }

            let mut next_map = doctor.slots_booked.clone();
            next_map.reserve(*date, *time);

            if let Some(updated) = self
                .write_slot_map(doctor_id, doctor.slots_version, &next_map, auth_token)
                .await?
            {
                info!(
                    "Reserved slot {} {} for doctor {} (attempt {})",
                    date, time, doctor_id, attempt + 1
                );
                return Ok(updated);
            }

            debug!(
                "Slot map for doctor {} moved underneath us, re-reading (attempt {})",
                doctor_id,
                attempt + 1
            );
        }

        warn!(
            "Persistent slot-map contention for doctor {} at {} {}",
            doctor_id, date, time
        );
        Err(DoctorError::DatabaseError(
            "Slot reservation contention persisted".to_string(),
        ))
    }

    /// Remove one slot from the doctor's map after a cancellation. Releasing
    /// a slot nobody holds is a no-op; the day key itself is never removed.
    pub async fn release_slot(
        &self,
        doctor_id: Uuid,
        date: &SlotDate,
        time: &SlotTime,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        for _attempt in 0..MAX_SLOT_WRITE_ATTEMPTS {
            let doctor = self.get_doctor(doctor_id, Some(auth_token)).await?;

            if !doctor.slots_booked.is_booked(date, time) {
                return Ok(());
            }

            let mut next_map = doctor.slots_booked.clone();
            next_map.release(date, time);

            if self
                .write_slot_map(doctor_id, doctor.slots_version, &next_map, auth_token)
                .await?
                .is_some()
            {
                info!("Released slot {} {} for doctor {}", date, time, doctor_id);
                return Ok(());
            }
        }

        Err(DoctorError::DatabaseError(
            "Slot release contention persisted".to_string(),
        ))
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    /// Conditional slot-map write: lands only when nobody else has written
    /// since `observed_version` was read. None means the condition failed.
    async fn write_slot_map(
        &self,
        doctor_id: Uuid,
        observed_version: i64,
        next_map: &crate::models::SlotMap,
        auth_token: &str,
    ) -> Result<Option<Doctor>, DoctorError> {
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&slots_version=eq.{}",
            doctor_id, observed_version
        );
        let update = json!({
            "slots_booked": next_map,
            "slots_version": observed_version + 1,
            "updated_at": Utc::now().to_rfc3339()
        });

        self.patch_doctor(&path, update, auth_token).await
    }

    async fn patch_doctor(
        &self,
        path: &str,
        update: Value,
        auth_token: &str,
    ) -> Result<Option<Doctor>, DoctorError> {
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                path,
                Some(auth_token),
                Some(update),
                Some(return_representation()),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let doctor = serde_json::from_value(row).map_err(|e| {
                    DoctorError::DatabaseError(format!("Failed to parse updated doctor: {}", e))
                })?;
                Ok(Some(doctor))
            }
            None => Ok(None),
        }
    }
}
