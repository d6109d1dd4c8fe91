use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::{NewNotification, NotificationService};
use patient_cell::PatientService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::User;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::messages;

pub struct AppointmentLifecycleService {
    supabase: Arc<SupabaseClient>,
    patients: PatientService,
    notifications: NotificationService,
}

impl AppointmentLifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            patients: PatientService::with_client(Arc::clone(&supabase)),
            notifications: NotificationService::with_client(Arc::clone(&supabase)),
            supabase,
        }
    }

    /// Only a scheduled appointment can be completed or cancelled.
    pub fn validate_status_transition(
        &self,
        current: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        match (current, next) {
            (AppointmentStatus::Scheduled, AppointmentStatus::Completed)
            | (AppointmentStatus::Scheduled, AppointmentStatus::Cancelled) => Ok(()),
            (from, to) => {
                warn!("Invalid status transition attempted: {} -> {}", from, to);
                Err(AppointmentError::InvalidStatusTransition { from, to })
            }
        }
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let query = format!("id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self.supabase.select("appointments", &query).await?;

        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    pub async fn mark_completed(
        &self,
        caller_id: Uuid,
        appointment_id: Uuid,
        doctor_name: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id).await?;

        if !appointment.involves(caller_id) {
            return Err(AppointmentError::Unauthorized(
                "Only the patient or doctor of this appointment can complete it".to_string(),
            ));
        }
        self.validate_status_transition(appointment.status, AppointmentStatus::Completed)?;

        let updated = self.set_status(appointment_id, AppointmentStatus::Completed).await?;
        let patient = self.patients.get_user(updated.user_id).await?;

        self.notifications
            .deliver_all(vec![
                NewNotification::new(updated.user_id, messages::patient_completed(doctor_name)),
                NewNotification::new(
                    updated.doctor_id,
                    messages::doctor_completed(&patient.firstname, &patient.lastname),
                ),
            ])
            .await;

        info!("Appointment {} completed by {}", appointment_id, caller_id);
        Ok(updated)
    }

    /// Cancelling frees the slot for later searches.
    pub async fn cancel_appointment(
        &self,
        caller: &User,
        caller_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id).await?;

        if !appointment.involves(caller_id) && !caller.can_book_for_walk_ins() {
            return Err(AppointmentError::Unauthorized(
                "Not authorized to cancel this appointment".to_string(),
            ));
        }
        self.validate_status_transition(appointment.status, AppointmentStatus::Cancelled)?;

        let updated = self.set_status(appointment_id, AppointmentStatus::Cancelled).await?;
        let patient = self.patients.get_user(updated.user_id).await?;

        self.notifications
            .deliver_all(vec![
                NewNotification::new(updated.user_id, messages::patient_cancelled(updated.date, updated.time)),
                NewNotification::new(
                    updated.doctor_id,
                    messages::doctor_cancelled(&patient.firstname, &patient.lastname, updated.date, updated.time),
                ),
            ])
            .await;

        info!("Appointment {} cancelled by {}", appointment_id, caller_id);
        Ok(updated)
    }

    /// Doctors see the appointments they hold; everyone else sees their own.
    pub async fn list_for_caller(&self, caller: &User, caller_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        if caller.is_admin {
            return Err(AppointmentError::ValidationError(
                "Admins should use the admin endpoint".to_string(),
            ));
        }

        let user = self.patients.get_user(caller_id).await?;
        let column = if user.is_doctor { "doctor_id" } else { "user_id" };
        debug!("Listing appointments by {} for {}", column, caller_id);

        let query = format!("{}=eq.{}&order=date.desc,time.desc", column, caller_id);
        Ok(self.supabase.select("appointments", &query).await?)
    }

    /// Moves a still-scheduled appointment to `status`. A transition that
    /// landed in between leaves zero rows updated.
    async fn set_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let filter = format!("id=eq.{}&status=eq.{}", appointment_id, AppointmentStatus::Scheduled);
        let patch = json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339()
        });

        let rows: Vec<Appointment> = self.supabase.update("appointments", &filter, patch).await?;
        if let Some(updated) = rows.into_iter().next() {
            return Ok(updated);
        }

        let current = self.get_appointment(appointment_id).await?;
        warn!(
            "Appointment {} moved to {} before it could become {}",
            appointment_id, current.status, status
        );
        Err(AppointmentError::InvalidStatusTransition { from: current.status, to: status })
    }
}
