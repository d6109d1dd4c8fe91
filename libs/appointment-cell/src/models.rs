use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use patient_cell::{NewPatient, PatientError};
use payment_cell::PaymentError;
use shared_database::DatabaseError;
use shared_models::error::AppError;

// ==============================================================================
// SLOT TIME
// ==============================================================================

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Wall-clock time of a slot, minute precision, rendered as zero-padded `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(SlotTime)
    }

    pub fn parse(value: &str) -> Result<Self, AppointmentError> {
        let value = value.trim();
        let parsed = NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .map_err(|_| AppointmentError::InvalidTime(value.to_string()))?;

        SlotTime::from_hm(parsed.hour(), parsed.minute())
            .ok_or_else(|| AppointmentError::InvalidTime(value.to_string()))
    }

    /// `None` when the result would fall on the next day.
    pub fn checked_add_minutes(self, minutes: u32) -> Option<Self> {
        let total = self.minute_of_day().checked_add(minutes)?;
        if total >= MINUTES_PER_DAY {
            return None;
        }
        SlotTime::from_hm(total / 60, total % 60)
    }

    pub fn minute_of_day(self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl FromStr for SlotTime {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotTime::parse(s)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SlotTime::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "Scheduled"),
            AppointmentStatus::Completed => write!(f, "Completed"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Rows arrive snake_case from the store and leave camelCase over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Appointment {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub doctor_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub has_feedback: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.doctor_id == user_id
    }
}

// ==============================================================================
// SLOT RESOLUTION
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotResolution {
    Found { time: SlotTime, shift_count: u32 },
    Exhausted { last_checked: SlotTime },
}

/// How far a booking landed from the time the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAdjustment {
    NoShift,
    Shifted { original_time: SlotTime, minutes: u32 },
}

impl SlotAdjustment {
    pub fn from_shift(original_time: SlotTime, shift_count: u32, step_minutes: u32) -> Self {
        if shift_count == 0 {
            SlotAdjustment::NoShift
        } else {
            SlotAdjustment::Shifted { original_time, minutes: shift_count * step_minutes }
        }
    }

    pub fn is_shifted(&self) -> bool {
        matches!(self, SlotAdjustment::Shifted { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingOutcome {
    pub appointment: Appointment,
    pub adjustment: SlotAdjustment,
}

/// What callers get back from either booking route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub is_alternative_slot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_requested_time: Option<SlotTime>,
    pub time_adjustment_minutes: u32,
}

impl From<BookingOutcome> for BookingResponse {
    fn from(outcome: BookingOutcome) -> Self {
        let (original_requested_time, time_adjustment_minutes) = match outcome.adjustment {
            SlotAdjustment::NoShift => (None, 0),
            SlotAdjustment::Shifted { original_time, minutes } => (Some(original_time), minutes),
        };

        BookingResponse {
            appointment: outcome.appointment,
            is_alternative_slot: outcome.adjustment.is_shifted(),
            original_requested_time,
            time_adjustment_minutes,
        }
    }
}

// ==============================================================================
// COMMANDS
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BookingCommand {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub requested_time: SlotTime,
    /// Empty when a front-desk booking did not name the doctor.
    pub doctor_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkInBooking {
    pub patient: NewPatient,
    pub booking: BookingCommand,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doctor_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(alias = "doctorname")]
    pub doctor_name: Option<String>,
    #[serde(alias = "transactionId")]
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub amount: serde_json::Value,
}

impl BookAppointmentRequest {
    pub fn to_command(&self) -> Result<BookingCommand, AppointmentError> {
        let doctor_id = required(&self.doctor_id, "doctorId")?;
        let date = required(&self.date, "date")?;
        let time = required(&self.time, "time")?;
        let doctor_name = required(&self.doctor_name, "doctorname")?;

        build_command(doctor_id, date, time, doctor_name)
    }

    pub fn payment_intent_id(&self) -> Result<&str, AppointmentError> {
        required(&self.payment_intent_id, "paymentIntentId")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientDetails {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Patient fields may be sent at the top level or nested under `patientDetails`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceptionistBookingRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub patient_details: Option<PatientDetails>,
    pub doctor_id: Option<String>,
    #[serde(alias = "doctorname")]
    pub doctor_name: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

impl ReceptionistBookingRequest {
    pub fn to_walk_in(&self) -> Result<WalkInBooking, AppointmentError> {
        let nested = self.patient_details.clone().unwrap_or_default();
        let pick = |top: &Option<String>, inner: Option<String>| {
            present(top).map(str::to_string).or_else(|| inner.filter(|v| !v.trim().is_empty()))
        };

        let fields = (
            pick(&self.firstname, nested.firstname),
            pick(&self.lastname, nested.lastname),
            pick(&self.email, nested.email),
            pick(&self.password, nested.password),
            present(&self.doctor_id),
            present(&self.date),
            present(&self.time),
        );

        let (
            Some(firstname),
            Some(lastname),
            Some(email),
            Some(password),
            Some(doctor_id),
            Some(date),
            Some(time),
        ) = fields
        else {
            return Err(AppointmentError::ValidationError("All fields are required".to_string()));
        };

        let doctor_name = present(&self.doctor_name).unwrap_or_default();

        Ok(WalkInBooking {
            patient: NewPatient { firstname, lastname, email, password },
            booking: build_command(doctor_id, date, time, doctor_name)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteAppointmentRequest {
    pub appointid: Option<Uuid>,
    #[serde(default)]
    pub doctorname: String,
    /// Accepted for compatibility; the stored appointment's doctor is used.
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelAppointmentRequest {
    pub appointid: Option<Uuid>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, AppointmentError> {
    present(value).ok_or_else(|| AppointmentError::ValidationError(format!("{} is required", field)))
}

fn build_command(
    doctor_id: &str,
    date: &str,
    time: &str,
    doctor_name: &str,
) -> Result<BookingCommand, AppointmentError> {
    let doctor_id = Uuid::parse_str(doctor_id)
        .map_err(|_| AppointmentError::ValidationError("doctorId is not a valid id".to_string()))?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppointmentError::ValidationError("date must be YYYY-MM-DD".to_string()))?;

    Ok(BookingCommand {
        doctor_id,
        date,
        requested_time: SlotTime::parse(time)?,
        doctor_name: doctor_name.to_string(),
    })
}

// ==============================================================================
// ERROR MODELS
// ==============================================================================

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("No available slots found between {requested} and {last_checked}")]
    SlotUnavailable { requested: SlotTime, last_checked: SlotTime },

    #[error("Slot {time} was taken by a concurrent booking, please try again")]
    SlotContended { time: SlotTime },

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Appointment cannot move from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotUnavailable { requested, last_checked } => AppError::SlotUnavailable {
                requested: requested.to_string(),
                last_checked: last_checked.to_string(),
            },
            AppointmentError::SlotContended { .. }
            | AppointmentError::InvalidStatusTransition { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidTime(_) => AppError::ValidationError(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::Unauthorized(msg) => AppError::Forbidden(msg),
            AppointmentError::Patient(e) => e.into(),
            AppointmentError::Payment(e) => e.into(),
            AppointmentError::DatabaseError(e) => AppError::Database(e.to_string()),
        }
    }
}
