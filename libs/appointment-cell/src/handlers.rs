use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use payment_cell::services::payment::proof_from_request;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, BookAppointmentRequest, BookingResponse, CancelAppointmentRequest,
    CompleteAppointmentRequest, ReceptionistBookingRequest,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::lifecycle::AppointmentLifecycleService;

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))
}

fn appointment_id(value: Option<Uuid>) -> Result<Uuid, AppError> {
    value.ok_or_else(|| AppError::ValidationError("appointid is required".to_string()))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let patient_id = caller_id(&user)?;
    let command = request.to_command()?;
    let proof = proof_from_request(request.payment_intent_id()?, &request.amount)?;

    let outcome = AppointmentBookingService::new(&state)
        .book_appointment(patient_id, &command, &proof)
        .await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(outcome))))
}

#[axum::debug_handler]
pub async fn book_by_receptionist(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<ReceptionistBookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if !user.can_book_for_walk_ins() {
        return Err(AppError::Forbidden("Only receptionists can book on behalf of patients".to_string()));
    }

    let walk_in = request.to_walk_in()?;
    let outcome = AppointmentBookingService::new(&state)
        .book_by_receptionist(&user, &walk_in)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Appointment booked successfully",
            "data": BookingResponse::from(outcome)
        })),
    ))
}

#[axum::debug_handler]
pub async fn mark_completed(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CompleteAppointmentRequest>,
) -> Result<(StatusCode, Json<&'static str>), AppError> {
    let caller = caller_id(&user)?;
    let appointment = appointment_id(request.appointid)?;

    AppointmentLifecycleService::new(&state)
        .mark_completed(caller, appointment, &request.doctorname)
        .await?;

    Ok((StatusCode::CREATED, Json("Appointment completed")))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_id(&user)?;
    let appointment = appointment_id(request.appointid)?;

    let cancelled = AppointmentLifecycleService::new(&state)
        .cancel_appointment(&user, caller, appointment)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled",
        "data": cancelled
    })))
}

#[axum::debug_handler]
pub async fn get_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let caller = caller_id(&user)?;

    let appointments = AppointmentLifecycleService::new(&state)
        .list_for_caller(&user, caller)
        .await?;

    Ok(Json(appointments))
}
