use anyhow::Result;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Patient, PatientError, PatientInput, PatientSearchQuery};

const DEFAULT_SEARCH_LIMIT: i32 = 50;

pub struct PatientService {
    supabase: SupabaseClient,
}

fn db_error(e: anyhow::Error) -> PatientError {
    PatientError::DatabaseError(e.to_string())
}

fn parse_rows(rows: Vec<Value>) -> Result<Vec<Patient>> {
    Ok(rows
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<_>, _>>()?)
}

/// Characters that would break a PostgREST `or=(...)` filter.
fn sanitize_term(term: &str) -> String {
    term.chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '%'))
        .collect::<String>()
        .trim()
        .to_string()
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>, PatientError> {
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, "/rest/v1/patients?order=created_at.desc", None, None)
            .await
            .map_err(db_error)?;
        parse_rows(rows).map_err(db_error)
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        debug!("Fetching patient: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(db_error)?;

        parse_rows(rows)
            .map_err(db_error)?
            .into_iter()
            .next()
            .ok_or(PatientError::NotFound)
    }

    async fn find_by_dpi(&self, dpi: &str) -> Result<Option<Patient>, PatientError> {
        let path = format!("/rest/v1/patients?dpi=eq.{}", urlencoding::encode(dpi));
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(db_error)?;
        Ok(parse_rows(rows).map_err(db_error)?.into_iter().next())
    }

    pub async fn create_patient(&self, input: PatientInput, created_by: Uuid) -> Result<Patient, PatientError> {
        input.validate(Utc::now().date_naive())?;
        let input = input.normalized();
        debug!("Registering patient with DPI {}", input.dpi);

        if self.find_by_dpi(&input.dpi).await?.is_some() {
            warn!("Duplicate DPI rejected: {}", input.dpi);
            return Err(PatientError::DpiAlreadyExists { dpi: input.dpi });
        }

        let mut body = serde_json::to_value(&input).map_err(|e| db_error(e.into()))?;
        body["created_by"] = json!(created_by);

        let rows = self.supabase
            .request_returning(Method::POST, "/rest/v1/patients", None, body)
            .await
            .map_err(db_error)?;

        let patient = parse_rows(rows)
            .map_err(db_error)?
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Patient insert returned no rows".to_string()))?;

        info!("Patient {} registered", patient.id);
        Ok(patient)
    }

    pub async fn update_patient(&self, patient_id: Uuid, input: PatientInput) -> Result<Patient, PatientError> {
        input.validate(Utc::now().date_naive())?;
        let input = input.normalized();

        if let Some(other) = self.find_by_dpi(&input.dpi).await? {
            if other.id != patient_id {
                return Err(PatientError::DpiAlreadyExists { dpi: input.dpi });
            }
        }

        let mut body = serde_json::to_value(&input).map_err(|e| db_error(e.into()))?;
        body["updated_at"] = json!(Utc::now());

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let rows = self.supabase
            .request_returning(Method::PATCH, &path, None, body)
            .await
            .map_err(db_error)?;

        parse_rows(rows)
            .map_err(db_error)?
            .into_iter()
            .next()
            .ok_or(PatientError::NotFound)
    }

    pub async fn delete_patient(&self, patient_id: Uuid) -> Result<(), PatientError> {
        self.get_patient(patient_id).await?;

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Result<Value> = self.supabase.request(Method::DELETE, &path, None, None).await;

        match result {
            Ok(_) => {
                info!("Patient {} deleted", patient_id);
                Ok(())
            }
            // Appointments reference the patient.
            Err(e) if e.to_string().starts_with("Constraint violation") => Err(PatientError::HasAppointments),
            Err(e) => Err(db_error(e)),
        }
    }

    pub async fn search_patients(&self, query: PatientSearchQuery) -> Result<Vec<Patient>, PatientError> {
        debug!("Searching patients with query: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(term) = query.q.as_deref().map(sanitize_term).filter(|t| !t.is_empty()) {
            let pattern = urlencoding::encode(&format!("*{}*", term)).into_owned();
            query_parts.push(format!(
                "or=(first_name.ilike.{p},last_name.ilike.{p},dpi.ilike.{p},phone.ilike.{p})",
                p = pattern
            ));
        }

        query_parts.push("order=first_name.asc".to_string());
        query_parts.push(format!("limit={}", query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)));
        query_parts.push(format!("offset={}", query.offset.unwrap_or(0)));

        let path = format!("/rest/v1/patients?{}", query_parts.join("&"));
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(db_error)?;

        parse_rows(rows).map_err(db_error)
    }
}
