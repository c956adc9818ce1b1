use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::ClinicRole;
use shared_utils::password::check_password_policy;
use shared_utils::validation::{is_blank, validate_email};

/// Staff account as exposed by the API. The password hash never leaves the service layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: ClinicRole,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Row used only for login.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCredentials {
    #[serde(flatten)]
    pub user: StaffUser,
    pub password_hash: Option<String>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: ClinicRole,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), UserError> {
        if !validate_email(self.email.trim()) {
            return Err(UserError::ValidationError(format!("Invalid email: {}", self.email)));
        }
        if is_blank(&self.full_name) {
            return Err(UserError::ValidationError("Full name is required".to_string()));
        }
        check_password_policy(&self.password).map_err(UserError::ValidationError)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: String,
    pub role: ClinicRole,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), UserError> {
        if is_blank(&self.full_name) {
            return Err(UserError::ValidationError("Full name is required".to_string()));
        }
        Ok(())
    }

    pub fn normalized(self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            role: self.role,
            phone: blank_to_none(self.phone),
            specialization: blank_to_none(self.specialization),
            license_number: blank_to_none(self.license_number),
        }
    }
}

/// Row inserted for a new account.
#[derive(Debug, Clone, Serialize)]
pub struct NewUserRecord {
    pub email: String,
    pub full_name: String,
    pub role: ClinicRole,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub is_active: bool,
    pub password_hash: String,
}

impl NewUserRecord {
    pub fn from_request(request: CreateUserRequest, password_hash: String) -> Self {
        Self {
            email: request.email.trim().to_lowercase(),
            full_name: request.full_name.trim().to_string(),
            role: request.role,
            phone: blank_to_none(request.phone),
            specialization: blank_to_none(request.specialization),
            license_number: blank_to_none(request.license_number),
            is_active: true,
            password_hash,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub user_id: Uuid,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("A user with email {0} already exists")]
    EmailAlreadyExists(String),

    #[error("You cannot deactivate your own account")]
    CannotDeactivateSelf,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Password hashing failed")]
    PasswordHash,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credentials_row_splits_hash_from_profile() {
        let row = json!({
            "id": Uuid::new_v4(),
            "email": "doc@clinic.test",
            "full_name": "Dr. Test",
            "role": "DOCTOR",
            "phone": null,
            "specialization": "Pediatría",
            "license_number": null,
            "is_active": true,
            "created_at": null,
            "password_hash": "$argon2id$v=19$..."
        });

        let creds: UserCredentials = serde_json::from_value(row).unwrap();
        assert_eq!(creds.user.role, ClinicRole::Doctor);
        assert!(creds.password_hash.is_some());
        assert!(serde_json::to_value(&creds.user).unwrap().get("password_hash").is_none());
    }

    #[test]
    fn create_request_checks_email_and_password() {
        let request = CreateUserRequest {
            email: "front@clinic.test".to_string(),
            password: "12345".to_string(),
            full_name: "Recepción".to_string(),
            role: ClinicRole::Receptionist,
            phone: None,
            specialization: None,
            license_number: None,
        };
        assert!(matches!(request.validate(), Err(UserError::ValidationError(_))));

        let request = CreateUserRequest { password: "123456".to_string(), ..request };
        assert!(request.validate().is_ok());

        let request = CreateUserRequest { email: "front".to_string(), ..request };
        assert!(request.validate().is_err());
    }

    #[test]
    fn new_record_lowercases_email() {
        let request = CreateUserRequest {
            email: " Doc@Clinic.Test ".to_string(),
            password: "123456".to_string(),
            full_name: "Dr. Test".to_string(),
            role: ClinicRole::Doctor,
            phone: Some("".to_string()),
            specialization: Some("Cardiología".to_string()),
            license_number: None,
        };
        let record = NewUserRecord::from_request(request, "hash".to_string());
        assert_eq!(record.email, "doc@clinic.test");
        assert_eq!(record.phone, None);
        assert!(record.is_active);
    }
}
