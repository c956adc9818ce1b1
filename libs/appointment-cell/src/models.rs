// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::fmt;
use std::str::FromStr;

pub const MIN_DURATION_MINUTES: i32 = 15;
pub const DURATION_STEP_MINUTES: i32 = 15;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub treatment_id: Option<Uuid>,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Attended,
    Cancelled,
    NoShow,
    Rescheduled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Attended,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
        AppointmentStatus::Rescheduled,
    ];

    /// Statuses that occupy the doctor's time slot.
    pub const ACTIVE: [AppointmentStatus; 2] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
    ];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Attended => "ATTENDED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::NoShow => "NO_SHOW",
            AppointmentStatus::Rescheduled => "RESCHEDULED",
        }
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Scheduled
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppointmentError::ValidationError(format!("Unknown status '{}'", s)))
    }
}

/// Half-open `[start, end)` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    /// `None` when the end falls outside the representable calendar.
    pub fn from_start(start: DateTime<Utc>, duration_minutes: i32) -> Option<Self> {
        let end = start.checked_add_signed(Duration::minutes(i64::from(duration_minutes)))?;
        Some(Self { start, end })
    }

    /// Back-to-back intervals do not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn display_range(&self) -> String {
        format!("{} - {}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// An existing appointment as seen by the conflict query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookedSlot {
    pub id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub patient_name: String,
}

impl BookedSlot {
    pub fn interval(&self) -> Option<TimeInterval> {
        TimeInterval::from_start(self.appointment_date, self.duration_minutes)
    }
}

// ==============================================================================
// CONFLICT CHECK MODELS
// ==============================================================================

/// The four conflict-relevant form fields plus the appointment being edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictCandidate {
    pub doctor_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub exclude_id: Option<Uuid>,
}

impl ConflictCandidate {
    pub fn for_slot(doctor_id: Uuid, start: DateTime<Utc>, duration_minutes: i32) -> Self {
        Self {
            doctor_id: Some(doctor_id),
            date: Some(start.date_naive()),
            time: Some(start.time()),
            duration_minutes: Some(duration_minutes),
            exclude_id: None,
        }
    }

    pub fn excluding(mut self, appointment_id: Uuid) -> Self {
        self.exclude_id = Some(appointment_id);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.doctor_id.is_some()
            && self.date.is_some()
            && self.time.is_some()
            && self.duration_minutes.map_or(false, |minutes| minutes > 0)
    }

    pub fn interval(&self) -> Option<TimeInterval> {
        let start = self.date?.and_time(self.time?).and_utc();
        let minutes = self.duration_minutes.filter(|m| *m > 0)?;
        TimeInterval::from_start(start, minutes)
    }

    /// All four fields are present but the slot cannot be placed on the calendar.
    pub fn is_out_of_range(&self) -> bool {
        self.is_complete() && (self.interval().is_none() || self.day_bounds().is_none())
    }

    /// Inclusive bounds of the candidate's calendar day.
    pub fn day_bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let date = self.date?;
        let day_start = date.and_time(NaiveTime::MIN).and_utc();
        let day_end = date.and_hms_milli_opt(23, 59, 59, 999)?.and_utc();
        Some((day_start, day_end))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConflictResult {
    /// A required field was missing; nothing was queried.
    NotChecked,
    Clear,
    Conflict {
        appointment: BookedSlot,
        message: String,
    },
    /// The store could not be queried.
    Unverified {
        message: String,
        blocks_submission: bool,
    },
}

impl ConflictResult {
    pub fn has_conflict(&self) -> bool {
        match self {
            ConflictResult::Conflict { .. } => true,
            ConflictResult::Unverified { blocks_submission, .. } => *blocks_submission,
            ConflictResult::NotChecked | ConflictResult::Clear => false,
        }
    }

    pub fn was_checked(&self) -> bool {
        matches!(self, ConflictResult::Clear | ConflictResult::Conflict { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ConflictResult::Conflict { message, .. } => Some(message),
            ConflictResult::Unverified { message, blocks_submission: true } => Some(message),
            _ => None,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Full appointment payload, used for create (POST) and replace (PUT).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentInput {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub treatment_id: Option<Uuid>,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub reason: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

impl AppointmentInput {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        validate_duration(self.duration_minutes)?;
        if self.reason.trim().is_empty() {
            return Err(AppointmentError::ValidationError(
                "Reason for the appointment is required".to_string(),
            ));
        }
        if TimeInterval::from_start(self.appointment_date, self.duration_minutes).is_none() {
            return Err(AppointmentError::ValidationError(
                "Appointment end is out of range".to_string(),
            ));
        }
        Ok(())
    }
}

/// Row written to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRecord {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub treatment_id: Option<Uuid>,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
}

impl AppointmentRecord {
    pub fn from_input(input: AppointmentInput, status: AppointmentStatus) -> Self {
        Self {
            patient_id: input.patient_id,
            doctor_id: input.doctor_id,
            treatment_id: input.treatment_id,
            appointment_date: input.appointment_date,
            duration_minutes: input.duration_minutes,
            reason: input.reason.trim().to_string(),
            notes: input.notes.filter(|n| !n.trim().is_empty()),
            status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentQuery {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
}

/// Query string of `GET /conflicts/check`; every field is optional so a
/// half-filled form gets a "not checked" answer instead of a 400.
/// Forms submit untouched inputs as `field=`, which counts as missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConflictCheckQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub doctor_id: Option<Uuid>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub duration_minutes: Option<i32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub exclude_id: Option<Uuid>,
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl From<ConflictCheckQuery> for ConflictCandidate {
    fn from(query: ConflictCheckQuery) -> Self {
        Self {
            doctor_id: query.doctor_id,
            date: query.date,
            time: query.time,
            duration_minutes: query.duration_minutes,
            exclude_id: query.exclude_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictCheckResponse {
    pub checked: bool,
    pub has_conflict: bool,
    pub message: Option<String>,
    pub conflicting_appointment: Option<BookedSlot>,
}

impl From<ConflictResult> for ConflictCheckResponse {
    fn from(result: ConflictResult) -> Self {
        let checked = result.was_checked();
        let has_conflict = result.has_conflict();
        let message = result.message().map(str::to_string);
        let conflicting_appointment = match result {
            ConflictResult::Conflict { appointment, .. } => Some(appointment),
            _ => None,
        };

        Self {
            checked,
            has_conflict,
            message,
            conflicting_appointment,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("{0}")]
    ConflictDetected(String),

    #[error("Could not verify the doctor's availability: {0}")]
    ConflictUnverified(String),

    #[error("Invalid duration {0}: must be at least 15 minutes and a multiple of 15")]
    InvalidDuration(i32),

    #[error("Status change from {from} to {to} is not allowed")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

pub fn validate_duration(duration_minutes: i32) -> Result<(), AppointmentError> {
    if duration_minutes < MIN_DURATION_MINUTES || duration_minutes % DURATION_STEP_MINUTES != 0 {
        return Err(AppointmentError::InvalidDuration(duration_minutes));
    }
    Ok(())
}
