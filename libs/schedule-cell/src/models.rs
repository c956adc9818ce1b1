use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const DAY_NAMES: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

/// A weekly working block of one doctor. `day_of_week` is 0 (Sunday) to 6 (Saturday).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<DoctorName>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorName {
    pub full_name: String,
}

impl Schedule {
    pub fn day_name(&self) -> &'static str {
        day_name(self.day_of_week)
    }
}

pub fn day_name(day_of_week: i16) -> &'static str {
    usize::try_from(day_of_week)
        .ok()
        .and_then(|i| DAY_NAMES.get(i))
        .copied()
        .unwrap_or("Unknown")
}

/// Accepts both `HH:MM` (form input) and `HH:MM:SS` (database).
fn time_of_day<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub doctor_id: Uuid,
    pub day_of_week: i16,
    #[serde(deserialize_with = "time_of_day")]
    pub start_time: NaiveTime,
    #[serde(deserialize_with = "time_of_day")]
    pub end_time: NaiveTime,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl ScheduleInput {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !(0..=6).contains(&self.day_of_week) {
            return Err(ScheduleError::InvalidDay(self.day_of_week));
        }
        if self.start_time >= self.end_time {
            return Err(ScheduleError::InvalidTimeRange);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleQuery {
    pub doctor_id: Option<Uuid>,
    pub day_of_week: Option<i16>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Schedule not found")]
    NotFound,

    #[error("Day of week must be between 0 (Sunday) and 6 (Saturday), got {0}")]
    InvalidDay(i16),

    #[error("Start time must be before end time")]
    InvalidTimeRange,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
