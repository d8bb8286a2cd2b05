//! HTTP route handlers for Lodge.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use lodge_common::LodgeError;
use lodge_common::constants::routes;
use serde::Serialize;

use crate::state::AppState;
use crate::verification::{fingerprint, normalize_subject};

mod health;
mod verification;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/metrics", get(health::metrics))

        // Verification endpoints
        .route(routes::ISSUE, post(verification::issue_code))
        .route(routes::VALIDATE, post(verification::validate_code))

        // Admin endpoints (expose behind an internal listener in production)
        .nest("/admin", admin_routes())

        // Add shared state
        .with_state(state)
}

/// Admin routes (code inspection and revocation, stats)
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/codes/{email}", get(code_status).delete(revoke_code))
        .route("/stats", get(get_stats))
}

/// Hint sent with transient failures
const RETRY_AFTER_SECS: &str = "1";

/// Error response wrapper mapping [`LodgeError`] onto HTTP
pub struct ApiError(pub LodgeError);

impl From<LodgeError> for ApiError {
    fn from(err: LodgeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let mut response =
            (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response();
        if self.0.is_retryable() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}

// === Admin Handlers ===

/// Drop any pending code for an email. Idempotent.
async fn revoke_code(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<StatusCode, ApiError> {
    let subject = normalize_subject(&email)?;
    let removed = state.store.delete(&subject)?;

    tracing::info!(
        subject = %fingerprint(&subject),
        removed = removed,
        "Verification code revoked"
    );

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct CodeStatusResponse {
    pending: bool,
    /// Expiry of the pending code (Unix epoch seconds)
    expires_at: Option<i64>,
}

/// Whether an email has a pending code. The code itself is never returned.
async fn code_status(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<CodeStatusResponse>, ApiError> {
    let subject = normalize_subject(&email)?;
    let entry = state.store.get(&subject)?;

    Ok(Json(CodeStatusResponse {
        pending: entry.is_some(),
        expires_at: entry.map(|e| e.expires_at.timestamp()),
    }))
}

#[derive(Serialize)]
struct StatsResponse {
    uptime_secs: u64,
    pending_codes: usize,
    shards: usize,
    code_ttl_secs: u64,
}

async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, ApiError> {
    Ok(Json(StatsResponse {
        uptime_secs: state.started_at.elapsed().as_secs(),
        pending_codes: state.store.len()?,
        shards: state.store.shard_count(),
        code_ttl_secs: state.config.verification.code_ttl_secs,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::delivery::testing::RecordingSink;
    use crate::verification::EntryAction;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use lodge_common::{Clock, ManualClock};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        state: AppState,
        sink: Arc<RecordingSink>,
        clock: Arc<ManualClock>,
    }

    fn build(config: AppConfig, sink: RecordingSink) -> TestApp {
        let sink = Arc::new(sink);
        let clock = Arc::new(ManualClock::starting_now());
        let state = AppState::with_clock(config, sink.clone(), clock.clone()).unwrap();
        TestApp {
            router: create_router(state.clone()),
            state,
            sink,
            clock,
        }
    }

    fn app() -> TestApp {
        build(AppConfig::default(), RecordingSink::default())
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(router, request).await
    }

    async fn issue(app: &TestApp, email: &str) -> (StatusCode, Value) {
        post_json(&app.router, routes::ISSUE, json!({ "email": email })).await
    }

    async fn validate(app: &TestApp, email: &str, code: &str) -> (StatusCode, Value) {
        post_json(
            &app.router,
            routes::VALIDATE,
            json!({ "email": email, "code": code }),
        )
        .await
    }

    fn wrong(code: &str) -> &'static str {
        if code == "000000" { "111111" } else { "000000" }
    }

    #[tokio::test]
    async fn test_issue_then_validate_once() {
        let app = app();

        let (status, body) = issue(&app, "Guest@Example.com").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sent"], true);
        assert_eq!(body["expires_in_secs"], 300);
        assert_eq!(
            body["expires_at"],
            (app.clock.now() + chrono::Duration::seconds(300)).timestamp()
        );

        // Subject is normalized, so any casing of the address works
        let code = app.sink.last_code("guest@example.com").unwrap();
        let (status, body) = validate(&app, "guest@example.com", &code).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (_, body) = validate(&app, "GUEST@example.com", &code).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_wrong_code_then_right_code() {
        let app = app();
        issue(&app, "guest@example.com").await;
        let code = app.sink.last_code("guest@example.com").unwrap();

        let (status, body) = validate(&app, "guest@example.com", wrong(&code)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);

        let (_, body) = validate(&app, "guest@example.com", &code).await;
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn test_expired_code_rejected() {
        let app = app();
        issue(&app, "guest@example.com").await;
        let code = app.sink.last_code("guest@example.com").unwrap();

        app.clock.advance(chrono::Duration::seconds(301));

        let (_, body) = validate(&app, "guest@example.com", &code).await;
        assert_eq!(body["success"], false);
        assert_eq!(app.state.store.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_email_is_bad_request() {
        let app = app();

        let (status, body) = issue(&app, "   ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("email"));

        let (status, _) = validate(&app, "not-an-email", "123456").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(app.sink.count(), 0);
    }

    #[tokio::test]
    async fn test_delivery_failure_still_reports_sent() {
        let app = build(AppConfig::default(), RecordingSink::failing());

        let (status, body) = issue(&app, "guest@example.com").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sent"], true);
        assert_eq!(app.state.store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_a_failed_validation() {
        let mut config = AppConfig::default();
        config.verification.shards = 1;
        let app = build(config, RecordingSink::default());
        issue(&app, "guest@example.com").await;

        // A handler panicking mid-update poisons the only shard
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            app.state.store.inspect("guest@example.com", |_| -> ((), EntryAction) {
                panic!("poison")
            })
        }));

        let (status, body) = validate(&app, "guest@example.com", "123456").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.get("success").is_none());

        let request = Request::builder()
            .method("POST")
            .uri(routes::VALIDATE)
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "email": "guest@example.com", "code": "123456" }).to_string(),
            ))
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");

        let request = Request::builder().uri("/ready").body(Body::empty()).unwrap();
        let (status, _) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_admin_revoke() {
        let app = app();
        issue(&app, "guest@example.com").await;
        let code = app.sink.last_code("guest@example.com").unwrap();

        let request = Request::builder()
            .method("DELETE")
            .uri("/admin/codes/guest@example.com")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = validate(&app, "guest@example.com", &code).await;
        assert_eq!(body["success"], false);

        // Revoking again is a no-op
        let request = Request::builder()
            .method("DELETE")
            .uri("/admin/codes/guest@example.com")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_admin_code_status_hides_code() {
        let app = app();
        let uri = "/admin/codes/Guest@Example.com";

        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pending"], false);
        assert_eq!(body["expires_at"], Value::Null);

        let (_, issued) = issue(&app, "guest@example.com").await;

        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pending"], true);
        assert_eq!(body["expires_at"], issued["expires_at"]);
        assert!(body.get("code").is_none());
    }

    #[tokio::test]
    async fn test_client_errors_carry_no_retry_hint() {
        let app = app();
        let request = Request::builder()
            .method("POST")
            .uri(routes::ISSUE)
            .header("content-type", "application/json")
            .body(Body::from(json!({ "email": "" }).to_string()))
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let app = app();

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        issue(&app, "a@example.com").await;
        issue(&app, "b@example.com").await;
        let code = app.sink.last_code("a@example.com").unwrap();
        validate(&app, "a@example.com", wrong(&code)).await;
        validate(&app, "a@example.com", &code).await;

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["issued"], 2);
        assert_eq!(body["mismatched"], 1);
        assert_eq!(body["consumed"], 1);
        assert_eq!(body["pending_codes"], 1);

        let request = Request::builder().uri("/admin/stats").body(Body::empty()).unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pending_codes"], 1);
        assert_eq!(body["shards"], 16);
    }
}
