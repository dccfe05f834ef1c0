use std::{sync::Arc, time::Duration};

use axum::Router;
use chrono::Utc;
use reqwest::{header::{CONTENT_TYPE, LOCATION}, Client, StatusCode};
use serde_json::json;
use tokio::net::TcpListener;
use wiremock::{matchers::{body_json, header, method, path}, Mock, MockServer, ResponseTemplate};

use crate::{
    arithmetic_handler::arithmetic_router,
    build_http_client,
    config::SlackConfig,
    db::{AccessToken, SqliteTokenStore, TokenStore},
    errors::AppError,
    router::{slack_router, AppState},
    signature::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER},
};

const SIGNING_SECRET: &str = "test-signing-secret";

async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind ephemeral port");
    let address = listener.local_addr().expect("listener should have an address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{}", address)
}

fn http_client() -> Client {
    build_http_client(Duration::from_secs(5)).expect("http client should build")
}

fn config(slack_api_url: String, arithmetic_url: String) -> SlackConfig {
    SlackConfig {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        signing_secret: SIGNING_SECRET.to_string(),
        slack_api_url,
        arithmetic_url,
        db_path: "unused.db".into(),
        encryption_key: None,
        http_timeout_secs: 5,
    }
}

struct TestApp {
    url: String,
    slack: MockServer,
    store: Arc<SqliteTokenStore>,
    client: Client,
}

impl TestApp {
    async fn start() -> TestApp {
        let store = Arc::new(SqliteTokenStore::in_memory(None).expect("in-memory store should open"));
        TestApp::start_with(store.clone(), store).await
    }

    async fn start_with(store: Arc<SqliteTokenStore>, token_store: Arc<dyn TokenStore>) -> TestApp {
        let slack = MockServer::start().await;
        let arithmetic_url = spawn(arithmetic_router()).await;

        let state = AppState::new(config(slack.uri(), arithmetic_url), http_client(), token_store);
        let url = spawn(slack_router(state)).await;

        TestApp { url, slack, store, client: http_client() }
    }

    async fn post_signed(&self, route: &str, content_type: &str, body: &str) -> reqwest::Response {
        let timestamp = Utc::now().timestamp();
        let signature = SignatureVerifier::new(SIGNING_SECRET).sign(timestamp, body.as_bytes());

        self.client
            .post(format!("{}{}", self.url, route))
            .header(CONTENT_TYPE, content_type)
            .header(TIMESTAMP_HEADER, timestamp.to_string())
            .header(SIGNATURE_HEADER, signature)
            .body(body.to_string())
            .send()
            .await
            .expect("request should complete")
    }

    async fn command(&self, text: &str) -> reqwest::Response {
        let body: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("team_id", "T1")
            .append_pair("user_id", "U1")
            .append_pair("command", "/plus")
            .append_pair("text", text)
            .finish();

        self.post_signed("/cmd/plus", "application/x-www-form-urlencoded", &body).await
    }

    async fn event(&self, payload: serde_json::Value) -> reqwest::Response {
        self.post_signed("/event/handle", "application/json", &payload.to_string()).await
    }

    async fn install(&self, query: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/install{}", self.url, query))
            .send()
            .await
            .expect("request should complete")
    }
}

/// Store whose writes always fail.
struct BrokenStore;

impl TokenStore for BrokenStore {
    fn put(&self, _: &AccessToken) -> Result<(), AppError> {
        Err(AppError::UnexpectedError("disk full".to_string()))
    }

    fn get(&self, _: &str) -> Result<Option<String>, AppError> {
        Err(AppError::UnexpectedError("disk full".to_string()))
    }

    fn delete(&self, _: &str) -> Result<(), AppError> {
        Err(AppError::UnexpectedError("disk full".to_string()))
    }
}

fn oauth_success(team_id: &str, token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "ok": true,
        "app_id": "A1",
        "access_token": token,
        "token_type": "bot",
        "team": {"id": team_id, "name": "Team"},
    }))
}

#[tokio::test]
async fn arithmetic_service_adds_numbers() {
    let url = spawn(arithmetic_router()).await;

    let response = http_client().post(format!("{}/", url)).json(&json!({"num1": 3, "num2": 4})).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<serde_json::Value>().await.unwrap(), json!({"sum": 7}));

    let response = http_client().post(format!("{}/", url)).body(r#"{"num1": 3}{"num2": 9}"#).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<serde_json::Value>().await.unwrap(), json!({"sum": 3}));

    let response = http_client().post(format!("{}/", url)).body("{\"num1\": \"x\"}").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().starts_with("error reading request body: "));
}

#[tokio::test]
async fn install_stores_token_and_redirects() {
    let app = TestApp::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth.v2.access"))
        .respond_with(oauth_success("T1", "xoxb-first"))
        .up_to_n_times(1)
        .mount(&app.slack)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth.v2.access"))
        .respond_with(oauth_success("T1", "xoxb-second"))
        .mount(&app.slack)
        .await;

    let response = app.install("?code=first").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[LOCATION], "slack://app?team=T1&id=A1&tab=about");
    assert_eq!(app.store.get("T1").unwrap(), Some("xoxb-first".to_string()));

    let response = app.install("?code=second").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(app.store.get("T1").unwrap(), Some("xoxb-second".to_string()));
}

#[tokio::test]
async fn install_declined_or_missing_code() {
    let app = TestApp::start().await;

    let response = app.install("?error=access_denied").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "error installing app");

    let response = app.install("").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "missing mandatory 'code' query parameter");
}

#[tokio::test]
async fn install_reports_exchange_failure() {
    let app = TestApp::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth.v2.access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "invalid_code"})))
        .mount(&app.slack)
        .await;

    let response = app.install("?code=bad").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await.unwrap();
    assert!(body.starts_with("error exchanging temporary code for access token: "));
    assert!(body.contains("invalid_code"));
}

#[tokio::test]
async fn install_reports_storage_failure() {
    let store = Arc::new(SqliteTokenStore::in_memory(None).unwrap());
    let app = TestApp::start_with(store, Arc::new(BrokenStore)).await;
    Mock::given(method("POST"))
        .and(path("/oauth.v2.access"))
        .respond_with(oauth_success("T1", "xoxb-1"))
        .mount(&app.slack)
        .await;

    let response = app.install("?code=good").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await.unwrap().starts_with("error storing slack access token: "));
}

#[tokio::test]
async fn plus_command_sends_sum_to_user() {
    let app = TestApp::start().await;
    app.store.put(&AccessToken::new("T1", "xoxb-1")).unwrap();
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("Authorization", "Bearer xoxb-1"))
        .and(body_json(json!({"channel": "U1", "text": "Sum is 7"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "channel": "D1", "ts": "1.1"})))
        .expect(1)
        .mount(&app.slack)
        .await;

    let response = app.command("3 4").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn plus_command_rejects_bad_arguments() {
    let app = TestApp::start().await;

    let response = app.command("3 4 5").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "invalid number of input parameters provided");

    let response = app.command("3").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.command("a 4").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().starts_with("invalid 1st input parameter: "));
}

#[tokio::test]
async fn plus_command_without_team_is_rejected() {
    let app = TestApp::start().await;

    let response = app.post_signed("/cmd/plus", "application/x-www-form-urlencoded", "user_id=U1&command=%2Fplus&text=1+2").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "invalid slash command payload: missing team_id");
}

#[tokio::test]
async fn plus_command_without_token_is_a_server_error() {
    let app = TestApp::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.slack)
        .await;

    let response = app.command("1 2").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await.unwrap().starts_with("error reading slack access token: "));
}

#[tokio::test]
async fn plus_command_reports_send_failure() {
    let app = TestApp::start().await;
    app.store.put(&AccessToken::new("T1", "xoxb-revoked")).unwrap();
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "token_revoked"})))
        .mount(&app.slack)
        .await;

    let response = app.command("1 2").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "error sending slack message: Slack error: token_revoked");
}

#[tokio::test]
async fn invalid_signature_never_reaches_handlers() {
    let app = TestApp::start().await;
    app.store.put(&AccessToken::new("T1", "xoxb-1")).unwrap();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(0)
        .mount(&app.slack)
        .await;

    let timestamp = Utc::now().timestamp().to_string();
    for route in ["/cmd/plus", "/event/handle"] {
        let response = app.client
            .post(format!("{}{}", app.url, route))
            .header(TIMESTAMP_HEADER, &timestamp)
            .header(SIGNATURE_HEADER, "v0=0000000000000000000000000000000000000000000000000000000000000000")
            .body("team_id=T1&user_id=U1&text=1+2")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.text().await.unwrap().starts_with("error verifying slack signature: "));

        let unsigned = app.client.post(format!("{}{}", app.url, route)).body("{}").send().await.unwrap();
        assert_eq!(unsigned.status(), StatusCode::UNAUTHORIZED);
    }

    let uninstall = json!({"type": "event_callback", "team_id": "T1", "event": {"type": "app_uninstalled"}});
    let response = app.client
        .post(format!("{}/event/handle", app.url))
        .header(TIMESTAMP_HEADER, &timestamp)
        .header(SIGNATURE_HEADER, SignatureVerifier::new("wrong secret").sign(Utc::now().timestamp(), uninstall.to_string().as_bytes()))
        .body(uninstall.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.get("T1").unwrap(), Some("xoxb-1".to_string()));
}

#[tokio::test]
async fn url_verification_echoes_challenge() {
    let app = TestApp::start().await;

    let response = app.event(json!({"token": "t", "challenge": "abc123", "type": "url_verification"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), r#"{"challenge":"abc123"}"#);

    let response = app.event(json!({"type": "url_verification"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rate_limited_is_acknowledged() {
    let app = TestApp::start().await;

    let response = app.event(json!({"type": "app_rate_limited", "team_id": "T1", "minute_rate_limited": 1518467820})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ack");
}

#[tokio::test]
async fn app_uninstalled_removes_token() {
    let app = TestApp::start().await;
    app.store.put(&AccessToken::new("T1", "xoxb-1")).unwrap();
    app.store.put(&AccessToken::new("T2", "xoxb-2")).unwrap();

    let uninstall = json!({"type": "event_callback", "team_id": "T1", "event": {"type": "app_uninstalled"}});
    let response = app.event(uninstall.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.store.get("T1").unwrap(), None);
    assert_eq!(app.store.get("T2").unwrap(), Some("xoxb-2".to_string()));

    let response = app.event(uninstall).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn app_uninstalled_reports_storage_failure() {
    let store = Arc::new(SqliteTokenStore::in_memory(None).unwrap());
    let app = TestApp::start_with(store, Arc::new(BrokenStore)).await;

    let response = app.event(json!({"type": "event_callback", "team_id": "T1", "event": {"type": "app_uninstalled"}})).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "error handling app uninstallation: Unexpected error: disk full");
}

#[tokio::test]
async fn unknown_events_are_bad_requests() {
    let app = TestApp::start().await;

    let response = app.event(json!({"type": "event_callback", "team_id": "T1", "event": {"type": "app_mention"}})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "no handler for event of type app_mention");

    let response = app.event(json!({"type": "block_actions"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "invalid event type sent from slack: block_actions");
}
