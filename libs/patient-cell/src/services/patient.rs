// libs/patient-cell/src/services/patient.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{Patient, PatientError, UpdatePatientProfileRequest};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn find_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Patient>, PatientError> {
        debug!("Fetching patient: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let patient = serde_json::from_value(row).map_err(|e| {
                    PatientError::DatabaseError(format!("Failed to parse patient: {}", e))
                })?;
                Ok(Some(patient))
            }
            None => Ok(None),
        }
    }

    pub async fn get_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        self.find_patient(patient_id, auth_token)
            .await?
            .ok_or(PatientError::NotFound)
    }

    pub async fn update_profile(
        &self,
        patient_id: Uuid,
        request: UpdatePatientProfileRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating profile for patient {}", patient_id);

        let mut update = serde_json::Map::new();
        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(PatientError::ValidationError(
                    "Name cannot be empty".to_string(),
                ));
            }
            update.insert("name".to_string(), json!(name));
        }
        if let Some(phone) = request.phone {
            update.insert("phone".to_string(), json!(phone));
        }
        if let Some(address) = request.address {
            update.insert("address".to_string(), json!(address));
        }
        if let Some(dob) = request.dob {
            update.insert("dob".to_string(), json!(dob));
        }
        if let Some(gender) = request.gender {
            update.insert("gender".to_string(), json!(gender));
        }
        if let Some(image_url) = request.image_url {
            update.insert("image_url".to_string(), json!(image_url));
        }
        update.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update)),
                Some(return_representation()),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(PatientError::NotFound)?;
        let patient: Patient = serde_json::from_value(row).map_err(|e| {
            PatientError::DatabaseError(format!("Failed to parse updated patient: {}", e))
        })?;

        Ok(patient)
    }
}
