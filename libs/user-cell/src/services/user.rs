use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::ClinicRole;
use shared_utils::password::{check_password_policy, hash_password};

use crate::models::{
    CreateUserRequest, NewUserRecord, StaffUser, UpdateUserRequest, UserCredentials, UserError,
};

const PROFILE_COLUMNS: &str =
    "id,email,full_name,role,phone,specialization,license_number,is_active,created_at";

pub struct UserService {
    supabase: SupabaseClient,
}

fn db_error(e: anyhow::Error) -> UserError {
    UserError::DatabaseError(e.to_string())
}

fn decode<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Option<T>, UserError> {
    rows.into_iter()
        .next()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| db_error(e.into()))
}

impl UserService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, UserError> {
        self.supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(db_error)
    }

    async fn patch(&self, user_id: Uuid, body: Value) -> Result<StaffUser, UserError> {
        let path = format!("/rest/v1/users?id=eq.{}&select={}", user_id, PROFILE_COLUMNS);
        let rows = self.supabase
            .request_returning(Method::PATCH, &path, None, body)
            .await
            .map_err(db_error)?;
        decode(rows)?.ok_or(UserError::NotFound)
    }

    pub async fn list_users(&self) -> Result<Vec<StaffUser>, UserError> {
        let path = format!("/rest/v1/users?select={}&order=created_at.desc", PROFILE_COLUMNS);
        self.fetch(&path).await
    }

    /// Active doctors by name, for appointment and schedule pickers.
    pub async fn list_doctors(&self) -> Result<Vec<StaffUser>, UserError> {
        let path = format!(
            "/rest/v1/users?select={}&role=eq.{}&is_active=eq.true&order=full_name.asc",
            PROFILE_COLUMNS,
            ClinicRole::Doctor
        );
        self.fetch(&path).await
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<StaffUser, UserError> {
        let path = format!("/rest/v1/users?select={}&id=eq.{}", PROFILE_COLUMNS, user_id);
        self.fetch(&path).await?.into_iter().next().ok_or(UserError::NotFound)
    }

    /// Profile plus password hash, looked up by (case-insensitive) email.
    pub async fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, UserError> {
        let email = email.trim().to_lowercase();
        let path = format!(
            "/rest/v1/users?select={},password_hash&email=eq.{}",
            PROFILE_COLUMNS,
            urlencoding::encode(&email)
        );
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<StaffUser, UserError> {
        request.validate()?;

        if self.find_credentials(&request.email).await?.is_some() {
            warn!("Attempt to register existing email {}", request.email);
            return Err(UserError::EmailAlreadyExists(request.email.trim().to_lowercase()));
        }

        let password_hash = hash_password(&request.password).map_err(|_| UserError::PasswordHash)?;
        let record = NewUserRecord::from_request(request, password_hash);
        let body = serde_json::to_value(&record).map_err(|e| db_error(e.into()))?;

        let path = format!("/rest/v1/users?select={}", PROFILE_COLUMNS);
        let rows = self.supabase
            .request_returning(Method::POST, &path, None, body)
            .await
            .map_err(db_error)?;

        let user: StaffUser = decode(rows)?
            .ok_or_else(|| UserError::DatabaseError("User insert returned no rows".to_string()))?;
        info!("Created {} account {}", user.role, user.email);
        Ok(user)
    }

    pub async fn update_user(&self, user_id: Uuid, request: UpdateUserRequest) -> Result<StaffUser, UserError> {
        request.validate()?;
        let body = serde_json::to_value(request.normalized()).map_err(|e| db_error(e.into()))?;
        self.patch(user_id, body).await
    }

    /// Flip `is_active`. An admin cannot lock themselves out.
    pub async fn toggle_user(&self, user_id: Uuid, acting_user: Uuid) -> Result<StaffUser, UserError> {
        let current = self.get_user(user_id).await?;
        if current.is_active && user_id == acting_user {
            return Err(UserError::CannotDeactivateSelf);
        }

        debug!("Toggling user {} (active: {})", user_id, current.is_active);
        self.patch(user_id, json!({ "is_active": !current.is_active })).await
    }

    pub async fn change_password(&self, user_id: Uuid, new_password: &str) -> Result<(), UserError> {
        check_password_policy(new_password).map_err(UserError::ValidationError)?;
        let password_hash = hash_password(new_password).map_err(|_| UserError::PasswordHash)?;

        self.patch(user_id, json!({ "password_hash": password_hash })).await?;
        info!("Password changed for user {}", user_id);
        Ok(())
    }
}
