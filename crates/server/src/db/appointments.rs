//! Appointment queries.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use parlour_core::AppointmentId;

use super::{
    AppointmentStore, PgStore, RepositoryError, map_unique_violation, parse_email_column,
    parse_phone_column,
};
use crate::models::{Appointment, NewAppointment};

const APPOINTMENT_COLUMNS: &str = "id, name, phone, email, date, service, time_slot, created_at";

#[derive(sqlx::FromRow)]
struct AppointmentRow {
    id: i32,
    name: String,
    phone: String,
    email: String,
    date: NaiveDate,
    service: String,
    time_slot: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = RepositoryError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AppointmentId::new(row.id),
            name: row.name,
            phone: parse_phone_column(&row.phone)?,
            email: parse_email_column(&row.email)?,
            date: row.date,
            service: row.service,
            time_slot: row.time_slot,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn find_appointment_by_slot(
        &self,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<Option<Appointment>, RepositoryError> {
        let row: Option<AppointmentRow> = sqlx::query_as(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE date = $1 AND time_slot = $2"
        ))
        .bind(date)
        .bind(time_slot)
        .fetch_optional(self.pool())
        .await?;

        row.map(Appointment::try_from).transpose()
    }

    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, RepositoryError> {
        let row: AppointmentRow = sqlx::query_as(&format!(
            r"
            INSERT INTO appointments (name, phone, email, date, service, time_slot)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {APPOINTMENT_COLUMNS}
            "
        ))
        .bind(&appointment.name)
        .bind(&appointment.phone)
        .bind(&appointment.email)
        .bind(appointment.date)
        .bind(&appointment.service)
        .bind(&appointment.time_slot)
        .fetch_one(self.pool())
        .await
        .map_err(map_unique_violation)?;

        row.try_into()
    }

    async fn list_appointments_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let rows: Vec<AppointmentRow> = sqlx::query_as(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE date = $1 ORDER BY created_at, id"
        ))
        .bind(date)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Appointment::try_from).collect()
    }
}
