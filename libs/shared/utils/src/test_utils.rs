use std::sync::Arc;
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{ActorContext, ClinicRole};

use crate::jwt::issue_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: ClinicRole,
}

impl TestUser {
    pub fn new(email: &str, role: ClinicRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role,
        }
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, ClinicRole::Admin)
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, ClinicRole::Doctor)
    }

    pub fn receptionist(email: &str) -> Self {
        Self::new(email, ClinicRole::Receptionist)
    }

    pub fn to_actor(&self) -> ActorContext {
        ActorContext {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            full_name: Some("Test User".to_string()),
            role: self.role,
            issued_at: None,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        issue_token(&user.to_actor(), secret, exp_hours.unwrap_or(24))
            .expect("test secret is never empty")
            .access_token
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn bearer(user: &TestUser, secret: &str) -> String {
        format!("Bearer {}", Self::create_test_token(user, secret, None))
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn patient_response(patient_id: &str, first_name: &str, last_name: &str) -> serde_json::Value {
        json!({
            "id": patient_id,
            "dpi": "1234567890101",
            "first_name": first_name,
            "last_name": last_name,
            "date_of_birth": "1990-01-01",
            "gender": "F",
            "phone": "5555-0101",
            "email": "patient@example.com",
            "address": null,
            "emergency_contact_name": null,
            "emergency_contact_phone": null,
            "blood_type": "O+",
            "allergies": null,
            "medical_history": null,
            "created_by": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        appointment_id: &str,
        patient_id: &str,
        doctor_id: &str,
        start: &str,
        duration_minutes: i32,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "treatment_id": null,
            "appointment_date": start,
            "duration_minutes": duration_minutes,
            "status": status,
            "reason": "Consulta general",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    /// Row shape returned by the conflict query (appointment joined with patient name).
    pub fn booked_slot_response(
        appointment_id: &str,
        start: &str,
        duration_minutes: i32,
        status: &str,
        first_name: &str,
        last_name: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "appointment_date": start,
            "duration_minutes": duration_minutes,
            "status": status,
            "patient": { "first_name": first_name, "last_name": last_name }
        })
    }

    pub fn treatment_response(treatment_id: &str, name: &str, price: f64) -> serde_json::Value {
        json!({
            "id": treatment_id,
            "name": name,
            "description": null,
            "price": price,
            "duration_minutes": 30,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn schedule_response(schedule_id: &str, doctor_id: &str, day_of_week: i32) -> serde_json::Value {
        json!({
            "id": schedule_id,
            "doctor_id": doctor_id,
            "day_of_week": day_of_week,
            "start_time": "08:00:00",
            "end_time": "17:00:00",
            "is_active": true
        })
    }

    pub fn user_response(user_id: &str, email: &str, role: &str) -> serde_json::Value {
        json!({
            "id": user_id,
            "email": email,
            "full_name": "Dr. Test",
            "role": role,
            "phone": null,
            "specialization": null,
            "license_number": null,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
