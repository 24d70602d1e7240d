//! Appointment domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use parlour_core::{AppointmentId, Email, Phone};

/// A booked slot. Never updated or deleted once created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub name: String,
    pub phone: Phone,
    pub email: Email,
    pub date: NaiveDate,
    pub service: String,
    /// Opaque slot label such as `10:00-10:30`.
    pub time_slot: String,
    pub created_at: DateTime<Utc>,
}

/// A validated booking request ready to persist.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub name: String,
    pub phone: Phone,
    pub email: Email,
    pub date: NaiveDate,
    pub service: String,
    pub time_slot: String,
}
