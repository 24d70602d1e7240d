//! Appointment scheduling.
//!
//! One booking per `(date, time slot)`. The slot check is a fast path only;
//! the store's unique constraint is what makes two concurrent requests for
//! the same slot resolve to one booking and one `SlotTaken`.

use chrono::NaiveDate;
use thiserror::Error;

use parlour_core::{Email, Phone};

use super::Delivery;
use crate::config::BusinessConfig;
use crate::db::{AppointmentStore, RepositoryError};
use crate::models::{Appointment, NewAppointment};
use crate::services::email::{self, NotificationError, Notifier};

/// Errors from booking or listing slots.
#[derive(Debug, Error)]
pub enum BookingError {
    /// A field is missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Someone already holds this slot.
    #[error("slot already booked")]
    SlotTaken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A booking request as received.
#[derive(Debug, Clone, Copy)]
pub struct BookingRequest<'a> {
    pub name: &'a str,
    pub phone: &'a str,
    pub email: &'a str,
    pub date: &'a str,
    pub service: &'a str,
    pub time_slot: &'a str,
}

/// Books slots and tells the customer and the owner about it.
pub struct Scheduler<'a> {
    appointments: &'a dyn AppointmentStore,
    notifier: &'a dyn Notifier,
    business: &'a BusinessConfig,
}

impl<'a> Scheduler<'a> {
    /// Create a scheduler.
    #[must_use]
    pub const fn new(
        appointments: &'a dyn AppointmentStore,
        notifier: &'a dyn Notifier,
        business: &'a BusinessConfig,
    ) -> Self {
        Self {
            appointments,
            notifier,
            business,
        }
    }

    /// Book a slot, then notify the customer and the owner.
    ///
    /// The booking stands once it is stored; notification failures only turn
    /// the outcome into [`Delivery::Undelivered`].
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidInput` for missing or malformed fields,
    /// `BookingError::SlotTaken` if the slot is booked and
    /// `BookingError::Repository` if the write fails.
    pub async fn book_slot(
        &self,
        request: BookingRequest<'_>,
    ) -> Result<Delivery<Appointment>, BookingError> {
        let new = validate(request)?;

        if self
            .appointments
            .find_appointment_by_slot(new.date, &new.time_slot)
            .await?
            .is_some()
        {
            return Err(BookingError::SlotTaken);
        }

        let appointment = self
            .appointments
            .insert_appointment(new)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => BookingError::SlotTaken,
                other => BookingError::Repository(other),
            })?;

        tracing::info!(
            booking_id = %appointment.id,
            date = %appointment.date,
            time_slot = %appointment.time_slot,
            "Appointment booked"
        );

        Ok(match self.notify(&appointment).await {
            Ok(()) => Delivery::Delivered(appointment),
            Err(error) => Delivery::Undelivered {
                record: appointment,
                error,
            },
        })
    }

    /// Both messages are attempted; the first failure is reported.
    async fn notify(&self, appointment: &Appointment) -> Result<(), NotificationError> {
        let customer = match email::booking_confirmation(&self.business.name, appointment) {
            Ok(message) => self.notifier.send(message).await,
            Err(e) => Err(e),
        };
        if let Err(ref e) = customer {
            tracing::warn!(
                booking_id = %appointment.id,
                to = %appointment.email,
                error = %e,
                "Booking confirmation not sent"
            );
        }

        let owner = match email::booking_alert(&self.business.owner_email, appointment) {
            Ok(message) => self.notifier.send(message).await,
            Err(e) => Err(e),
        };
        if let Err(ref e) = owner {
            tracing::warn!(
                booking_id = %appointment.id,
                to = %self.business.owner_email,
                error = %e,
                "Owner booking alert not sent"
            );
        }

        customer.and(owner)
    }

    /// Time slots already booked on a date.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidInput` if the date is empty or not
    /// `YYYY-MM-DD`.
    pub async fn list_booked_slots(&self, date: &str) -> Result<Vec<String>, BookingError> {
        let date = parse_date(date)?;
        let appointments = self.appointments.list_appointments_on(date).await?;
        Ok(appointments.into_iter().map(|a| a.time_slot).collect())
    }
}

fn required<'s>(value: &'s str, field: &str) -> Result<&'s str, BookingError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BookingError::InvalidInput(format!("{field} is required")));
    }
    Ok(value)
}

fn parse_date(date: &str) -> Result<NaiveDate, BookingError> {
    let date = required(date, "date")?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| BookingError::InvalidInput("date must be YYYY-MM-DD".to_string()))
}

fn validate(request: BookingRequest<'_>) -> Result<NewAppointment, BookingError> {
    let name = required(request.name, "name")?;
    let phone = Phone::parse(request.phone)
        .map_err(|e| BookingError::InvalidInput(e.to_string()))?;
    let email =
        Email::parse(request.email).map_err(|e| BookingError::InvalidInput(e.to_string()))?;
    let date = parse_date(request.date)?;
    let service = required(request.service, "service")?;
    let time_slot = required(request.time_slot, "timeSlot")?;

    Ok(NewAppointment {
        name: name.to_string(),
        phone,
        email,
        date,
        service: service.to_string(),
        time_slot: time_slot.to_string(),
    })
}
