use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentQuery, AppointmentRecord, AppointmentStatus, BookedSlot,
};

/// Persistence boundary for appointments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Active appointments of `doctor_id` starting within `[day_start, day_end]`,
    /// ordered by start time, without `exclude_id`.
    async fn find_active_for_doctor(
        &self,
        doctor_id: Uuid,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<BookedSlot>>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>>;

    async fn list(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>>;

    async fn insert(&self, record: &AppointmentRecord) -> Result<Appointment>;

    async fn update(&self, id: Uuid, record: &AppointmentRecord) -> Result<Appointment>;

    async fn update_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Appointment>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// `appointments` table behind PostgREST.
pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

#[derive(Debug, Deserialize)]
struct PatientName {
    first_name: String,
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct BookedSlotRow {
    id: Uuid,
    appointment_date: DateTime<Utc>,
    duration_minutes: i32,
    status: AppointmentStatus,
    patient: Option<PatientName>,
}

impl From<BookedSlotRow> for BookedSlot {
    fn from(row: BookedSlotRow) -> Self {
        let patient_name = row
            .patient
            .map(|p| format!("{} {}", p.first_name, p.last_name))
            .unwrap_or_else(|| "another patient".to_string());

        Self {
            id: row.id,
            appointment_date: row.appointment_date,
            duration_minutes: row.duration_minutes,
            status: row.status,
            patient_name,
        }
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    urlencoding::encode(&value.to_rfc3339_opts(SecondsFormat::Millis, true)).into_owned()
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    fn single(rows: Vec<Value>) -> Result<Appointment> {
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Appointment write returned no rows"))?;
        Ok(serde_json::from_value(row)?)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_active_for_doctor(
        &self,
        doctor_id: Uuid,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<BookedSlot>> {
        let active = AppointmentStatus::ACTIVE
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let mut query_parts = vec![
            "select=id,appointment_date,duration_minutes,status,patient:patients(first_name,last_name)".to_string(),
            format!("doctor_id=eq.{}", doctor_id),
            format!("appointment_date=gte.{}", timestamp(day_start)),
            format!("appointment_date=lte.{}", timestamp(day_end)),
            format!("status=in.({})", active),
        ];

        if let Some(exclude) = exclude_id {
            query_parts.push(format!("id=neq.{}", exclude));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=appointment_date.asc",
            query_parts.join("&")
        );
        debug!("Fetching active appointments for doctor {}", doctor_id);

        let rows: Vec<BookedSlotRow> = self.supabase
            .request(Method::GET, &path, None, None)
            .await?;

        Ok(rows.into_iter().map(BookedSlot::from).collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Appointment> = self.supabase
            .request(Method::GET, &path, None, None)
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>> {
        let mut query_parts = Vec::new();

        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from) = query.from_date {
            query_parts.push(format!("appointment_date=gte.{}", timestamp(from)));
        }
        if let Some(to) = query.to_date {
            query_parts.push(format!("appointment_date=lte.{}", timestamp(to)));
        }
        query_parts.push("order=appointment_date.asc".to_string());
        if let Some(limit) = query.limit {
            query_parts.push(format!("limit={}", limit));
        }

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let rows: Vec<Appointment> = self.supabase
            .request(Method::GET, &path, None, None)
            .await?;
        Ok(rows)
    }

    async fn insert(&self, record: &AppointmentRecord) -> Result<Appointment> {
        let rows = self.supabase
            .request_returning(
                Method::POST,
                "/rest/v1/appointments",
                None,
                serde_json::to_value(record)?,
            )
            .await?;
        Self::single(rows)
    }

    async fn update(&self, id: Uuid, record: &AppointmentRecord) -> Result<Appointment> {
        let mut body = serde_json::to_value(record)?;
        body["updated_at"] = json!(Utc::now());

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows = self.supabase
            .request_returning(Method::PATCH, &path, None, body)
            .await?;
        Self::single(rows)
    }

    async fn update_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Appointment> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows = self.supabase
            .request_returning(
                Method::PATCH,
                &path,
                None,
                json!({ "status": status, "updated_at": Utc::now() }),
            )
            .await?;
        Self::single(rows)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let _: Value = self.supabase
            .request(Method::DELETE, &path, None, None)
            .await?;
        Ok(())
    }
}
