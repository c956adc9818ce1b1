use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use user_cell::models::{StaffUser, UserError};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: StaffUser,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    /// Unknown email, wrong password and disabled account all look the same
    /// to the caller.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    #[error(transparent)]
    User(#[from] UserError),
}
