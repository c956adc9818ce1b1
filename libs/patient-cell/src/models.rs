use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_utils::validation::{is_blank, normalize_dpi, validate_dpi, validate_email, validate_phone};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub dpi: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age_on(&self, today: NaiveDate) -> u32 {
        today.years_since(self.date_of_birth).unwrap_or(0)
    }
}

/// Payload for create (POST) and full edit (PUT).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientInput {
    pub dpi: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
}

impl PatientInput {
    pub fn validate(&self, today: NaiveDate) -> Result<(), PatientError> {
        if !validate_dpi(&self.dpi) {
            return Err(PatientError::ValidationError("DPI must contain 13 digits".to_string()));
        }
        if is_blank(&self.first_name) || is_blank(&self.last_name) {
            return Err(PatientError::ValidationError("First and last name are required".to_string()));
        }
        if self.date_of_birth > today {
            return Err(PatientError::InvalidDateOfBirth);
        }
        if !validate_phone(&self.phone) {
            return Err(PatientError::ValidationError(format!("Invalid phone number: {}", self.phone)));
        }
        if let Some(email) = self.email.as_deref().filter(|e| !is_blank(e)) {
            if !validate_email(email) {
                return Err(PatientError::ValidationError(format!("Invalid email: {}", email)));
            }
        }
        if let Some(phone) = self.emergency_contact_phone.as_deref().filter(|p| !is_blank(p)) {
            if !validate_phone(phone) {
                return Err(PatientError::ValidationError(
                    "Invalid emergency contact phone".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Trimmed copy with the DPI stored without spaces and blank optionals dropped.
    pub fn normalized(self) -> Self {
        fn opt(value: Option<String>) -> Option<String> {
            value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        Self {
            dpi: normalize_dpi(&self.dpi),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            phone: self.phone.trim().to_string(),
            email: opt(self.email),
            address: opt(self.address),
            emergency_contact_name: opt(self.emergency_contact_name),
            emergency_contact_phone: opt(self.emergency_contact_phone),
            blood_type: opt(self.blood_type),
            allergies: opt(self.allergies),
            medical_history: opt(self.medical_history),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientSearchQuery {
    /// Matched against names, DPI and phone.
    pub q: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("A patient with DPI {dpi} already exists")]
    DpiAlreadyExists { dpi: String },

    #[error("Date of birth cannot be in the future")]
    InvalidDateOfBirth,

    #[error("Patient still has appointments")]
    HasAppointments,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
