//! Appointment route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use parlour_core::AppointmentId;

use super::{ApiJson, ApiQuery};
use crate::error::Result;
use crate::services::appointments::BookingRequest;
use crate::state::AppState;

/// Booking request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub time_slot: String,
}

/// Booking response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub message: &'static str,
    pub booking_id: AppointmentId,
}

/// `?date=` query.
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    #[serde(default)]
    pub date: String,
}

/// Availability response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedSlotsResponse {
    pub booked_slots: Vec<String>,
}

/// POST /api/appointments
///
/// Answers 201 once the booking is stored, whether or not the confirmation
/// emails went out.
#[instrument(skip_all)]
pub async fn book(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BookRequest>,
) -> Result<(StatusCode, Json<BookResponse>)> {
    let outcome = state
        .scheduler()
        .book_slot(BookingRequest {
            name: &body.name,
            phone: &body.phone,
            email: &body.email,
            date: &body.date,
            service: &body.service,
            time_slot: &body.time_slot,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BookResponse {
            message: "Appointment booked successfully",
            booking_id: outcome.record().id,
        }),
    ))
}

/// GET /api/appointments?date=YYYY-MM-DD
#[instrument(skip_all)]
pub async fn booked_slots(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Json<BookedSlotsResponse>> {
    let booked_slots = state.scheduler().list_booked_slots(&query.date).await?;
    Ok(Json(BookedSlotsResponse { booked_slots }))
}
