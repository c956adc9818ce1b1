use reqwest::Method;
use serde_json::{json, Value};
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, header};

use shared_config::AppConfig;
use shared_database::SupabaseClient;

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "secret".to_string(),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn request_sends_api_key_and_parses_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/treatments"))
        .and(header("apikey", "test-anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let rows: Vec<Value> = client
        .request(Method::GET, "/rest/v1/treatments", None, None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn returning_requests_ask_for_representation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/treatments"))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": "t-1" }])))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let rows = client
        .request_returning(Method::POST, "/rest/v1/treatments", Some("token"), json!({ "name": "x" }))
        .await
        .unwrap();

    assert_eq!(rows[0]["id"], "t-1");
}

#[tokio::test]
async fn empty_body_decodes_as_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let body: Value = client
        .request(Method::DELETE, "/rest/v1/patients?id=eq.p-1", None, None)
        .await
        .unwrap();

    assert!(body.is_null());
}

#[tokio::test]
async fn error_statuses_become_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(401).set_body_string("jwt expired"))
        .mount(&server)
        .await;

    let client = SupabaseClient::new(&config_for(&server));
    let err = client
        .request::<Value>(Method::GET, "/rest/v1/users", None, None)
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Authentication error"));
}
