use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClinicRole {
    Admin,
    Doctor,
    Receptionist,
}

impl fmt::Display for ClinicRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClinicRole::Admin => write!(f, "ADMIN"),
            ClinicRole::Doctor => write!(f, "DOCTOR"),
            ClinicRole::Receptionist => write!(f, "RECEPTIONIST"),
        }
    }
}

impl FromStr for ClinicRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(ClinicRole::Admin),
            "DOCTOR" => Ok(ClinicRole::Doctor),
            "RECEPTIONIST" => Ok(ClinicRole::Receptionist),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub full_name: Option<String>,
    pub iat: Option<u64>,
}

/// The authenticated staff member behind a request.
///
/// Inserted into request extensions by the auth middleware; handlers take it
/// with `Extension<ActorContext>` instead of reading any process-wide session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorContext {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: ClinicRole,
    pub issued_at: Option<DateTime<Utc>>,
}

impl ActorContext {
    pub fn has_role(&self, roles: &[ClinicRole]) -> bool {
        roles.contains(&self.role)
    }

    pub fn require_role(&self, roles: &[ClinicRole]) -> Result<(), AppError> {
        if self.has_role(roles) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role {} is not allowed to perform this action",
                self.role
            )))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: ClinicRole) -> ActorContext {
        ActorContext {
            id: "u-1".to_string(),
            email: None,
            full_name: None,
            role,
            issued_at: None,
        }
    }

    #[test]
    fn role_gate_rejects_other_roles() {
        let receptionist = actor(ClinicRole::Receptionist);
        assert!(receptionist.require_role(&[ClinicRole::Admin]).is_err());
        assert!(receptionist
            .require_role(&[ClinicRole::Admin, ClinicRole::Receptionist])
            .is_ok());
    }

    #[test]
    fn roles_round_trip_through_wire_names() {
        assert_eq!("doctor".parse::<ClinicRole>(), Ok(ClinicRole::Doctor));
        assert_eq!(ClinicRole::Receptionist.to_string(), "RECEPTIONIST");
        let json = serde_json::to_string(&ClinicRole::Admin).unwrap();
        assert_eq!(json, "\"ADMIN\"");
    }
}
