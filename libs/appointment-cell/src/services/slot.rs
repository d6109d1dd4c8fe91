use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::SlotSearchConfig;
use shared_database::SupabaseClient;

use crate::models::{AppointmentError, SlotResolution, SlotTime};

/// Linear probe for the first free slot at or after a requested time.
///
/// Candidates are `requested + attempt * step` for `attempt` in
/// `0..max_attempts`. A slot is taken when any non-cancelled appointment
/// exists for the same doctor, date and time. The probe stops at the end of
/// the day instead of wrapping onto the next one.
pub struct SlotResolver {
    supabase: Arc<SupabaseClient>,
    max_attempts: u32,
    step_minutes: u32,
}

impl SlotResolver {
    pub fn new(supabase: Arc<SupabaseClient>, search: &SlotSearchConfig) -> Self {
        Self {
            supabase,
            max_attempts: search.max_attempts,
            step_minutes: search.step_minutes,
        }
    }

    pub fn step_minutes(&self) -> u32 {
        self.step_minutes
    }

    pub async fn is_taken(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: SlotTime,
    ) -> Result<bool, AppointmentError> {
        let query = format!(
            "doctor_id=eq.{}&date=eq.{}&time=eq.{}&status=neq.Cancelled&select=id&limit=1",
            doctor_id, date, time
        );
        let rows: Vec<Value> = self.supabase.select("appointments", &query).await?;

        Ok(!rows.is_empty())
    }

    pub async fn resolve(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        requested: SlotTime,
    ) -> Result<SlotResolution, AppointmentError> {
        let mut last_checked = requested;

        for attempt in 0..self.max_attempts {
            let Some(candidate) = requested.checked_add_minutes(attempt * self.step_minutes) else {
                debug!("Slot search for doctor {} reached end of day after {}", doctor_id, last_checked);
                break;
            };
            last_checked = candidate;

            if !self.is_taken(doctor_id, date, candidate).await? {
                if attempt > 0 {
                    info!(
                        "Requested {} for doctor {} on {} is taken, next free slot is {}",
                        requested, doctor_id, date, candidate
                    );
                }
                return Ok(SlotResolution::Found { time: candidate, shift_count: attempt });
            }
        }

        Ok(SlotResolution::Exhausted { last_checked })
    }
}
