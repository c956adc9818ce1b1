use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Treatment {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: Option<i32>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentInput {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: Option<i32>,
}

impl TreatmentInput {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::ValidationError("Treatment name is required".to_string()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(CatalogError::ValidationError("Price must be zero or more".to_string()));
        }
        if matches!(self.duration_minutes, Some(minutes) if minutes <= 0) {
            return Err(CatalogError::ValidationError("Duration must be positive".to_string()));
        }
        Ok(())
    }

    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: self.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            // Stored with two decimals, as shown on the price list.
            price: (self.price * 100.0).round() / 100.0,
            duration_minutes: self.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreatmentQuery {
    pub active_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("Treatment not found")]
    NotFound,

    #[error("Treatment is referenced by appointments")]
    InUse,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
