use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Schedule, ScheduleError, ScheduleInput, ScheduleQuery};

const SELECT: &str = "select=*,doctor:users(full_name)";

pub struct ScheduleService {
    supabase: SupabaseClient,
}

fn db_error(e: anyhow::Error) -> ScheduleError {
    ScheduleError::DatabaseError(e.to_string())
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn write(&self, method: Method, path: &str, body: Value) -> Result<Schedule, ScheduleError> {
        let rows = self.supabase
            .request_returning(method, path, None, body)
            .await
            .map_err(db_error)?;

        let row = rows.into_iter().next().ok_or(ScheduleError::NotFound)?;
        serde_json::from_value(row).map_err(|e| db_error(e.into()))
    }

    /// Weekly blocks ordered by day, then start time.
    pub async fn list_schedules(&self, query: &ScheduleQuery) -> Result<Vec<Schedule>, ScheduleError> {
        let mut query_parts = vec![SELECT.to_string()];
        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(day) = query.day_of_week {
            query_parts.push(format!("day_of_week=eq.{}", day));
        }
        query_parts.push("order=day_of_week.asc,start_time.asc".to_string());

        let path = format!("/rest/v1/schedules?{}", query_parts.join("&"));
        self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(db_error)
    }

    pub async fn get_schedule(&self, schedule_id: Uuid) -> Result<Schedule, ScheduleError> {
        let path = format!("/rest/v1/schedules?{}&id=eq.{}", SELECT, schedule_id);
        let rows: Vec<Schedule> = self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(db_error)?;
        rows.into_iter().next().ok_or(ScheduleError::NotFound)
    }

    pub async fn create_schedule(&self, input: ScheduleInput) -> Result<Schedule, ScheduleError> {
        input.validate()?;
        let body = serde_json::to_value(&input).map_err(|e| db_error(e.into()))?;

        let schedule = self.write(Method::POST, "/rest/v1/schedules", body).await?;
        info!(
            "Schedule {} added for doctor {} on {}",
            schedule.id, schedule.doctor_id, schedule.day_name()
        );
        Ok(schedule)
    }

    pub async fn update_schedule(&self, schedule_id: Uuid, input: ScheduleInput) -> Result<Schedule, ScheduleError> {
        input.validate()?;
        let body = serde_json::to_value(&input).map_err(|e| db_error(e.into()))?;

        let path = format!("/rest/v1/schedules?id=eq.{}", schedule_id);
        self.write(Method::PATCH, &path, body).await
    }

    pub async fn toggle_schedule(&self, schedule_id: Uuid) -> Result<Schedule, ScheduleError> {
        let current = self.get_schedule(schedule_id).await?;
        debug!("Toggling schedule {} (active: {})", schedule_id, current.is_active);

        let path = format!("/rest/v1/schedules?id=eq.{}", schedule_id);
        self.write(Method::PATCH, &path, json!({ "is_active": !current.is_active })).await
    }

    pub async fn delete_schedule(&self, schedule_id: Uuid) -> Result<(), ScheduleError> {
        self.get_schedule(schedule_id).await?;

        let path = format!("/rest/v1/schedules?id=eq.{}", schedule_id);
        let _: Value = self.supabase
            .request(Method::DELETE, &path, None, None)
            .await
            .map_err(db_error)?;

        info!("Schedule {} deleted", schedule_id);
        Ok(())
    }
}
