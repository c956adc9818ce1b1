use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::router::auth_routes;
use shared_utils::jwt::validate_token;
use shared_utils::password::hash_password;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn routes(server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::with_supabase_url(&server.uri());
    (auth_routes(config.to_arc()), config)
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn login_request(email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "email": email, "password": password }).to_string()))
        .unwrap()
}

async fn mount_account(server: &MockServer, user_id: &str, password: &str, active: bool) {
    let mut row = MockSupabaseResponses::user_response(user_id, "doc@clinic.test", "DOCTOR");
    row["password_hash"] = json!(hash_password(password).unwrap());
    row["is_active"] = json!(active);

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.doc@clinic.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn login_issues_token_for_valid_credentials() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4().to_string();
    mount_account(&server, &user_id, "secret123", true).await;

    let (router, config) = routes(&server);
    let (status, body) = send(router, login_request("Doc@Clinic.test", "secret123")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["id"], user_id);
    assert!(body["user"].get("password_hash").is_none());

    let actor = validate_token(body["access_token"].as_str().unwrap(), &config.jwt_secret).unwrap();
    assert_eq!(actor.id, user_id);
    assert_eq!(actor.role.to_string(), "DOCTOR");
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let server = MockServer::start().await;
    mount_account(&server, &Uuid::new_v4().to_string(), "secret123", true).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.nobody@clinic.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (router, _) = routes(&server);
    let (wrong_status, wrong_body) = send(router.clone(), login_request("doc@clinic.test", "nope-nope")).await;
    let (unknown_status, unknown_body) = send(router, login_request("nobody@clinic.test", "secret123")).await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["error"], "Invalid email or password");
}

#[tokio::test]
async fn disabled_accounts_cannot_sign_in() {
    let server = MockServer::start().await;
    mount_account(&server, &Uuid::new_v4().to_string(), "secret123", false).await;

    let (router, _) = routes(&server);
    let (status, _) = send(router, login_request("doc@clinic.test", "secret123")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn blank_credentials_are_a_validation_error() {
    let server = MockServer::start().await;
    let (router, _) = routes(&server);

    let (status, _) = send(router, login_request("  ", "")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn me_requires_a_token_and_returns_profile() {
    let server = MockServer::start().await;
    let user = TestUser::receptionist("front@clinic.test");

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_response(&user.id, &user.email, "RECEPTIONIST")
        ])))
        .mount(&server)
        .await;

    let (router, config) = routes(&server);

    let anonymous = Request::builder().uri("/me").body(Body::empty()).unwrap();
    let (status, _) = send(router.clone(), anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authed = Request::builder()
        .uri("/me")
        .header("authorization", JwtTestUtils::bearer(&user, &config.jwt_secret))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router, authed).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user.id);
    assert_eq!(body["user"]["role"], "RECEPTIONIST");
    assert_eq!(body["profile"]["email"], "front@clinic.test");
}

#[tokio::test]
async fn verify_reports_expired_tokens_as_invalid() {
    let server = MockServer::start().await;
    let user = TestUser::admin("admin@clinic.test");
    let (router, config) = routes(&server);

    let verify = |token: String| {
        Request::builder()
            .method("POST")
            .uri("/verify")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    let fresh = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));
    let (_, body) = send(router.clone(), verify(fresh)).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["role"], "ADMIN");

    let expired = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);
    let (_, body) = send(router, verify(expired)).await;
    assert_eq!(body["valid"], false);
}
