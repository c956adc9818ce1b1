use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CatalogError, Treatment, TreatmentInput};

pub struct TreatmentService {
    supabase: SupabaseClient,
}

fn db_error(e: anyhow::Error) -> CatalogError {
    CatalogError::DatabaseError(e.to_string())
}

fn first(rows: Vec<Treatment>) -> Result<Treatment, CatalogError> {
    rows.into_iter().next().ok_or(CatalogError::NotFound)
}

impl TreatmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn write(&self, method: Method, path: &str, body: Value) -> Result<Treatment, CatalogError> {
        let rows = self.supabase
            .request_returning(method, path, None, body)
            .await
            .map_err(db_error)?;

        let treatments = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Treatment>, _>>()
            .map_err(|e| db_error(e.into()))?;
        first(treatments)
    }

    /// Catalog ordered by name; `active_only` hides disabled treatments.
    pub async fn list_treatments(&self, active_only: bool) -> Result<Vec<Treatment>, CatalogError> {
        let path = if active_only {
            "/rest/v1/treatments?is_active=eq.true&order=name.asc"
        } else {
            "/rest/v1/treatments?order=name.asc"
        };

        self.supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(db_error)
    }

    pub async fn get_treatment(&self, treatment_id: Uuid) -> Result<Treatment, CatalogError> {
        let path = format!("/rest/v1/treatments?id=eq.{}", treatment_id);
        let rows: Vec<Treatment> = self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(db_error)?;
        first(rows)
    }

    pub async fn create_treatment(&self, input: TreatmentInput) -> Result<Treatment, CatalogError> {
        input.validate()?;
        let input = input.normalized();

        let mut body = serde_json::to_value(&input).map_err(|e| db_error(e.into()))?;
        body["is_active"] = json!(true);

        let treatment = self.write(Method::POST, "/rest/v1/treatments", body).await?;
        info!("Treatment {} added to catalog", treatment.name);
        Ok(treatment)
    }

    pub async fn update_treatment(&self, treatment_id: Uuid, input: TreatmentInput) -> Result<Treatment, CatalogError> {
        input.validate()?;
        let input = input.normalized();

        let mut body = serde_json::to_value(&input).map_err(|e| db_error(e.into()))?;
        body["updated_at"] = json!(Utc::now());

        let path = format!("/rest/v1/treatments?id=eq.{}", treatment_id);
        self.write(Method::PATCH, &path, body).await
    }

    /// Flip `is_active`; returns the stored treatment.
    pub async fn toggle_treatment(&self, treatment_id: Uuid) -> Result<Treatment, CatalogError> {
        let current = self.get_treatment(treatment_id).await?;
        debug!("Toggling treatment {} (active: {})", treatment_id, current.is_active);

        let path = format!("/rest/v1/treatments?id=eq.{}", treatment_id);
        self.write(
            Method::PATCH,
            &path,
            json!({ "is_active": !current.is_active, "updated_at": Utc::now() }),
        )
        .await
    }

    pub async fn delete_treatment(&self, treatment_id: Uuid) -> Result<(), CatalogError> {
        self.get_treatment(treatment_id).await?;

        let path = format!("/rest/v1/treatments?id=eq.{}", treatment_id);
        let result: anyhow::Result<Value> = self.supabase
            .request(Method::DELETE, &path, None, None)
            .await;

        match result {
            Ok(_) => {
                info!("Treatment {} deleted", treatment_id);
                Ok(())
            }
            Err(e) if e.to_string().starts_with("Constraint violation") => Err(CatalogError::InUse),
            Err(e) => Err(db_error(e)),
        }
    }
}
