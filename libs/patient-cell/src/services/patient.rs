use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{NewPatient, PatientError, UserRecord, USER_COLUMNS};
use crate::services::password::hash_password;

pub struct PatientService {
    supabase: Arc<SupabaseClient>,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserRecord, PatientError> {
        debug!("Fetching user: {}", user_id);

        let query = format!("id=eq.{}&select={}", user_id, USER_COLUMNS);
        let rows: Vec<UserRecord> = self.supabase.select("users", &query).await?;

        rows.into_iter().next().ok_or(PatientError::NotFound)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, PatientError> {
        debug!("Looking up user by email");

        let query = format!(
            "email=eq.{}&select={}&limit=1",
            urlencoding::encode(email),
            USER_COLUMNS
        );
        let rows: Vec<UserRecord> = self.supabase.select("users", &query).await?;

        Ok(rows.into_iter().next())
    }

    /// Creates a patient account; the password is stored as an Argon2 hash.
    pub async fn create_patient(&self, patient: &NewPatient) -> Result<UserRecord, PatientError> {
        validate_new_patient(patient)?;
        let email = patient.normalized_email();

        let password_hash = hash_password(&patient.password)?;

        let row = json!({
            "firstname": patient.firstname.trim(),
            "lastname": patient.lastname.trim(),
            "email": email,
            "password": password_hash,
            "is_doctor": false
        });

        let created: UserRecord = self.supabase.insert("users", row).await.map_err(|e| {
            if e.is_conflict() {
                PatientError::EmailAlreadyExists { email: email.clone() }
            } else {
                PatientError::DatabaseError(e)
            }
        })?;

        info!("Created patient account {}", created.id);
        Ok(created)
    }

    /// Returns the existing account for the email, or creates one. The flag is
    /// `true` when a new account was written.
    pub async fn find_or_create(&self, patient: &NewPatient) -> Result<(UserRecord, bool), PatientError> {
        validate_new_patient(patient)?;
        let email = patient.normalized_email();

        if let Some(existing) = self.find_by_email(&email).await? {
            debug!("Reusing existing patient {}", existing.id);
            return Ok((existing, false));
        }

        match self.create_patient(patient).await {
            Ok(created) => Ok((created, true)),
            Err(PatientError::EmailAlreadyExists { .. }) => {
                warn!("Patient created concurrently, re-reading by email");
                self.find_by_email(&email)
                    .await?
                    .map(|user| (user, false))
                    .ok_or(PatientError::NotFound)
            }
            Err(e) => Err(e),
        }
    }
}

fn validate_new_patient(patient: &NewPatient) -> Result<(), PatientError> {
    let required = [
        ("firstname", &patient.firstname),
        ("lastname", &patient.lastname),
        ("email", &patient.email),
        ("password", &patient.password),
    ];

    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(PatientError::ValidationError(format!("{} is required", field)));
    }

    if !patient.email.contains('@') {
        return Err(PatientError::ValidationError("email is not valid".to_string()));
    }

    Ok(())
}
