use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use notification_cell::{NewNotification, NotificationService};
use patient_cell::PatientService;
use payment_cell::services::payment::new_completed_payment;
use payment_cell::{PaymentProof, PaymentService};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookingCommand, BookingOutcome,
    SlotAdjustment, SlotResolution, SlotTime, WalkInBooking,
};
use crate::services::messages;
use crate::services::slot::SlotResolver;

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    resolver: SlotResolver,
    patients: PatientService,
    payments: PaymentService,
    notifications: NotificationService,
    reservation_attempts: u32,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)), config)
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, config: &AppConfig) -> Self {
        Self {
            resolver: SlotResolver::new(Arc::clone(&supabase), &config.slot_search),
            patients: PatientService::with_client(Arc::clone(&supabase)),
            payments: PaymentService::with_client(Arc::clone(&supabase), config),
            notifications: NotificationService::with_client(Arc::clone(&supabase)),
            reservation_attempts: config.slot_search.reservation_attempts.max(1),
            supabase,
        }
    }

    /// Books a paid appointment for `patient_id`.
    ///
    /// The charge is verified with the gateway before anything is written. The
    /// appointment is reserved first, then the payment is recorded; if the
    /// payment write fails the reservation is cancelled again. Notifications
    /// are best effort.
    pub async fn book_appointment(
        &self,
        patient_id: Uuid,
        command: &BookingCommand,
        proof: &PaymentProof,
    ) -> Result<BookingOutcome, AppointmentError> {
        info!(
            "Booking request: patient {} doctor {} on {} at {}",
            patient_id, command.doctor_id, command.date, command.requested_time
        );

        self.payments.verify_settlement(proof).await?;
        let patient = self.patients.get_user(patient_id).await?;

        let (appointment, adjustment) = self
            .reserve(command.doctor_id, patient_id, command.date, command.requested_time)
            .await?;

        let payment = new_completed_payment(
            proof,
            command.doctor_id,
            patient_id,
            command.date,
            &appointment.time.to_string(),
        );

        if let Err(e) = self.payments.record_payment(payment).await {
            error!(
                "Payment {} could not be recorded, releasing appointment {}: {}",
                proof.transaction_id, appointment.id, e
            );
            self.release(appointment.id).await;
            return Err(e.into());
        }

        self.notifications
            .deliver_all(vec![
                NewNotification::new(
                    patient_id,
                    messages::patient_booked(&command.doctor_name, appointment.date, appointment.time, &adjustment),
                ),
                NewNotification::new(
                    command.doctor_id,
                    messages::doctor_booked(&patient.firstname, &patient.lastname, appointment.date, appointment.time),
                ),
            ])
            .await;

        info!("Appointment {} booked at {}", appointment.id, appointment.time);
        Ok(BookingOutcome { appointment, adjustment })
    }

    /// Front-desk booking for a walk-in patient; no payment is taken.
    pub async fn book_by_receptionist(
        &self,
        caller: &User,
        walk_in: &WalkInBooking,
    ) -> Result<BookingOutcome, AppointmentError> {
        if !caller.can_book_for_walk_ins() {
            return Err(AppointmentError::Unauthorized(
                "Only receptionists can book on behalf of patients".to_string(),
            ));
        }

        let booking = &walk_in.booking;

        // Check the window before touching the users table.
        if let SlotResolution::Exhausted { last_checked } = self
            .resolver
            .resolve(booking.doctor_id, booking.date, booking.requested_time)
            .await?
        {
            return Err(AppointmentError::SlotUnavailable {
                requested: booking.requested_time,
                last_checked,
            });
        }

        let doctor_name = if booking.doctor_name.is_empty() {
            let doctor = self.patients.get_user(booking.doctor_id).await?;
            format!("{} {}", doctor.firstname, doctor.lastname)
        } else {
            booking.doctor_name.clone()
        };

        let (patient, created) = self.patients.find_or_create(&walk_in.patient).await?;
        if created {
            info!("Registered walk-in patient {}", patient.id);
        }

        let (appointment, adjustment) = self
            .reserve(booking.doctor_id, patient.id, booking.date, booking.requested_time)
            .await?;

        self.notifications
            .deliver_all(vec![
                NewNotification::new(
                    patient.id,
                    messages::walk_in_patient_booked(
                        &doctor_name,
                        appointment.date,
                        appointment.time,
                        &adjustment,
                    ),
                ),
                // The doctor sees the names as typed at the desk.
                NewNotification::new(
                    booking.doctor_id,
                    messages::walk_in_doctor_booked(
                        &walk_in.patient.firstname,
                        &walk_in.patient.lastname,
                        appointment.date,
                        appointment.time,
                        &adjustment,
                    ),
                ),
            ])
            .await;

        info!("Walk-in appointment {} booked by {}", appointment.id, caller.id);
        Ok(BookingOutcome { appointment, adjustment })
    }

    /// Resolves a slot and inserts the appointment there. A uniqueness
    /// violation means another booking won that slot, so the search runs again
    /// from the originally requested time.
    pub async fn reserve(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        requested: SlotTime,
    ) -> Result<(Appointment, SlotAdjustment), AppointmentError> {
        let mut contested = requested;

        for attempt in 1..=self.reservation_attempts {
            let (time, shift_count) = match self.resolver.resolve(doctor_id, date, requested).await? {
                SlotResolution::Found { time, shift_count } => (time, shift_count),
                SlotResolution::Exhausted { last_checked } => {
                    return Err(AppointmentError::SlotUnavailable { requested, last_checked });
                }
            };

            let row = json!({
                "date": date,
                "time": time,
                "doctor_id": doctor_id,
                "user_id": patient_id,
                "status": AppointmentStatus::Scheduled
            });

            match self.supabase.insert::<Appointment>("appointments", row).await {
                Ok(appointment) => {
                    debug!("Reserved {} for doctor {} on attempt {}", time, doctor_id, attempt);
                    let adjustment = SlotAdjustment::from_shift(requested, shift_count, self.resolver.step_minutes());
                    return Ok((appointment, adjustment));
                }
                Err(e) if e.is_conflict() => {
                    warn!(
                        "Slot {} for doctor {} on {} taken concurrently (attempt {}/{})",
                        time, doctor_id, date, attempt, self.reservation_attempts
                    );
                    contested = time;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppointmentError::SlotContended { time: contested })
    }

    async fn release(&self, appointment_id: Uuid) {
        let patch = json!({
            "status": AppointmentStatus::Cancelled,
            "updated_at": Utc::now().to_rfc3339()
        });
        let filter = format!("id=eq.{}", appointment_id);

        if let Err(e) = self
            .supabase
            .update::<Appointment>("appointments", &filter, patch)
            .await
        {
            error!("Failed to release appointment {}: {}", appointment_id, e);
        }
    }
}
