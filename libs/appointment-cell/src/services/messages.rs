//! Notification texts sent to patients and doctors.

use chrono::NaiveDate;

use crate::models::{SlotAdjustment, SlotTime};

pub fn shift_suffix(adjustment: &SlotAdjustment) -> String {
    match adjustment {
        SlotAdjustment::NoShift => String::new(),
        SlotAdjustment::Shifted { original_time, minutes } => {
            format!(" (originally requested {}, moved by {} minutes)", original_time, minutes)
        }
    }
}

pub fn patient_booked(doctor_name: &str, date: NaiveDate, time: SlotTime, adjustment: &SlotAdjustment) -> String {
    format!(
        "You booked an appointment with Dr. {} for {} {}{}",
        doctor_name,
        date,
        time,
        shift_suffix(adjustment)
    )
}

pub fn doctor_booked(patient_first: &str, patient_last: &str, date: NaiveDate, time: SlotTime) -> String {
    format!(
        "You have an appointment with {} {} on {} at {}",
        patient_first, patient_last, date, time
    )
}

pub fn walk_in_patient_booked(
    doctor_name: &str,
    date: NaiveDate,
    time: SlotTime,
    adjustment: &SlotAdjustment,
) -> String {
    format!(
        "You have an appointment with Dr. {} on {} at {}{}",
        doctor_name,
        date,
        time,
        shift_suffix(adjustment)
    )
}

pub fn walk_in_doctor_booked(
    patient_first: &str,
    patient_last: &str,
    date: NaiveDate,
    time: SlotTime,
    adjustment: &SlotAdjustment,
) -> String {
    format!(
        "{}{}",
        doctor_booked(patient_first, patient_last, date, time),
        shift_suffix(adjustment)
    )
}

pub fn patient_completed(doctor_name: &str) -> String {
    format!("Your appointment with {} has been completed", doctor_name)
}

pub fn doctor_completed(patient_first: &str, patient_last: &str) -> String {
    format!("Your appointment with {} {} has been completed", patient_first, patient_last)
}

pub fn patient_cancelled(date: NaiveDate, time: SlotTime) -> String {
    format!("Your appointment on {} at {} has been cancelled", date, time)
}

pub fn doctor_cancelled(patient_first: &str, patient_last: &str, date: NaiveDate, time: SlotTime) -> String {
    format!(
        "Your appointment with {} {} on {} at {} has been cancelled",
        patient_first, patient_last, date, time
    )
}
