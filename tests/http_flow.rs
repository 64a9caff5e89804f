use anyhow::{anyhow, Result};
use async_trait::async_trait;
use otpd::{
    api::{self, handlers::types::OtpResponse, ServerConfig},
    otp::{Notifier, OtpCode, OtpConfig, OtpService},
};
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde_json::json;
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, task::JoinHandle};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<HashMap<String, String>>,
}

impl RecordingNotifier {
    fn last_code(&self, identity: &str) -> Result<String> {
        self.sent
            .lock()
            .map_err(|_| anyhow!("notifier lock poisoned"))?
            .get(identity)
            .cloned()
            .ok_or_else(|| anyhow!("no code sent to {identity}"))
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, identity: &str, code: &OtpCode) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow!("notifier lock poisoned"))?
            .insert(identity.to_string(), code.expose().to_string());
        Ok(())
    }
}

struct TestServer {
    addr: SocketAddr,
    notifier: Arc<RecordingNotifier>,
    client: Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start(config: OtpConfig) -> Result<Self> {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = Arc::new(OtpService::new(config, notifier.clone())?);
        let app = api::router(service, &ServerConfig::default());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service()).await;
        });

        Ok(Self {
            addr,
            notifier,
            client: Client::new(),
            handle,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn send_otp(&self, body: serde_json::Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/api/send-otp"))
            .json(&body)
            .send()
            .await?)
    }

    async fn verify_otp(&self, body: serde_json::Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/api/verify-otp"))
            .json(&body)
            .send()
            .await?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn send_and_verify_over_http() -> Result<()> {
    let server = TestServer::start(OtpConfig::new()).await?;
    let identity = "+15551234567";

    let response = server.send_otp(json!({"number": identity})).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: OtpResponse = response.json().await?;
    assert!(body.success);
    assert_eq!(body.message, "OTP sent successfully");

    let code = server.notifier.last_code(identity)?;
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    let wrong = if code == "000000" { "111111" } else { "000000" };
    let response = server
        .verify_otp(json!({"userNumber": identity, "genOtp": wrong}))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: OtpResponse = response.json().await?;
    assert!(!body.success);
    assert_eq!(body.message, "Invalid OTP");

    let response = server
        .verify_otp(json!({"userNumber": identity, "genOtp": code}))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: OtpResponse = response.json().await?;
    assert!(body.success);
    assert_eq!(body.message, "OTP verified successfully");

    // single use
    let response = server
        .verify_otp(json!({"userNumber": identity, "genOtp": code}))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn reissue_invalidates_previous_code() -> Result<()> {
    let server = TestServer::start(OtpConfig::new()).await?;
    let identity = "+15557654321";

    server.send_otp(json!({"number": identity})).await?;
    let first = server.notifier.last_code(identity)?;
    server.send_otp(json!({"number": identity})).await?;
    let second = server.notifier.last_code(identity)?;

    if first != second {
        let response = server
            .verify_otp(json!({"userNumber": identity, "genOtp": first}))
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = server
        .verify_otp(json!({"userNumber": identity, "genOtp": second}))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn send_limit_answers_429_with_retry_after() -> Result<()> {
    let server = TestServer::start(OtpConfig::new().with_send_limit(2)).await?;

    for _ in 0..2 {
        let response = server.send_otp(json!({"number": "+15550001111"})).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = server.send_otp(json!({"number": "+15550001111"})).await?;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let body: OtpResponse = response.json().await?;
    assert!(!body.success);
    assert_eq!(body.retry_after_seconds, retry_after);
    assert!(retry_after.is_some_and(|seconds| seconds > 0 && seconds <= 600));

    // other identities are unaffected
    let response = server.send_otp(json!({"number": "+15550002222"})).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_are_rejected() -> Result<()> {
    let server = TestServer::start(OtpConfig::new()).await?;

    let response = server
        .client
        .post(server.url("/api/send-otp"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server.send_otp(json!({"phone": "+15551234567"})).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server.verify_otp(json!({"userNumber": "+15551234567"})).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: OtpResponse = response.json().await?;
    assert_eq!(body.message, "Invalid OTP");

    // the server keeps serving
    let response = server.client.get(server.url("/health")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn legacy_field_names_are_accepted() -> Result<()> {
    let server = TestServer::start(OtpConfig::new()).await?;

    let response = server.send_otp(json!({"Number": 15_551_230_000_u64})).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let code = server.notifier.last_code("15551230000")?;
    let numeric: u64 = code.parse()?;
    let response = server
        .verify_otp(json!({"UserNumber": 15_551_230_000_u64, "GenOtp": numeric}))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn health_reports_pending_records() -> Result<()> {
    let server = TestServer::start(OtpConfig::new()).await?;
    server.send_otp(json!({"number": "+15559990000"})).await?;

    let response = server.client.get(server.url("/health")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(body["pendingRecords"], 1);
    Ok(())
}
