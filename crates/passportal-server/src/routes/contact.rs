//! Contact form endpoint: `POST /api/contact`.
//!
//! Runs the submission pipeline in a fixed order, short-circuiting on the
//! first decisive outcome: rate limit → honeypot → fill-time → CAPTCHA
//! (when configured) → sanitize/validate → delivery. Bot drops are masked
//! as success here — the guard reports them honestly and this layer
//! chooses the deception.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{debug, info, warn};

use passportal_core::guard::ScreenOutcome;
use passportal_core::ratelimit::RateDecision;
use passportal_core::sanitize::sanitize_submission;
use passportal_core::submission::SubmissionPayload;

use crate::error::AppError;
use crate::mail::{ContactEmail, DeliveryOutcome, dispatch};
use crate::state::AppState;

const SENT_MESSAGE: &str = "Message sent successfully!";
const RECEIVED_MESSAGE: &str =
    "Message received! Email delivery is not configured in this environment.";

/// Build the `/api/contact` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/contact", post(submit_contact))
}

/// Success body. Identical for real sends, silently-dropped bots, and
/// no-credential acknowledgments; the caller cannot tell them apart.
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

impl ContactResponse {
    fn ok(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_owned(),
        })
    }
}

/// Handle a contact/demo form submission.
async fn submit_contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SubmissionPayload>,
) -> Result<Json<ContactResponse>, AppError> {
    let client_ip = client_ip(&headers);

    // Rate limit first — the only rejection the caller can tell apart.
    if state.limiter.check(&client_ip).await == RateDecision::Limited {
        return Err(AppError::RateLimited);
    }

    // Honeypot and fill-time screen. Drops get the success shape.
    let now_millis = state.clock.now().timestamp_millis();
    if let ScreenOutcome::SilentlyDropped(reason) = state.screen_policy.screen(&payload, now_millis)
    {
        info!(
            client_ip = %client_ip,
            reason = reason.as_str(),
            "submission silently dropped"
        );
        return Ok(ContactResponse::ok(SENT_MESSAGE));
    }

    // CAPTCHA, only when a server secret is configured.
    if let Some(verifier) = &state.verifier {
        let token = payload
            .turnstile_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::BadRequest("Security verification required".to_owned()))?;
        verifier.verify(token, &client_ip).await?;
    }

    // Sanitize and validate; all field errors come back together.
    let sanitized = sanitize_submission(&payload)?;

    let received_at = state.clock.now();
    let email = ContactEmail::compose(&sanitized, received_at, &client_ip);

    match dispatch(state.mailer.as_ref(), &email).await {
        DeliveryOutcome::Sent => {
            info!(client_ip = %client_ip, kind = ?sanitized.kind, "contact email sent");
            Ok(ContactResponse::ok(SENT_MESSAGE))
        }
        DeliveryOutcome::AcceptedNoCredentials => {
            debug!(
                client_ip = %client_ip,
                name = %sanitized.name,
                email = %sanitized.email,
                "form data received without delivery"
            );
            Ok(ContactResponse::ok(RECEIVED_MESSAGE))
        }
        DeliveryOutcome::DeliveryFailed(reason) => {
            warn!(client_ip = %client_ip, error = %reason, "contact email delivery failed");
            Err(AppError::Internal(reason))
        }
    }
}

/// Client address for rate limiting and audit: first `x-forwarded-for`
/// entry, then `x-real-ip`, then `"unknown"`.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map_or_else(|| "unknown".to_owned(), ToOwned::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use passportal_core::guard::ScreenPolicy;
    use passportal_core::ratelimit::{MemoryRateLimiter, SystemClock};

    use crate::captcha::TurnstileVerifier;
    use crate::mail::Mailer;
    use crate::mail::test_support::RecordingMailer;

    use super::*;

    fn state(mailer: Option<Arc<RecordingMailer>>) -> Arc<AppState> {
        Arc::new(AppState {
            limiter: Arc::new(MemoryRateLimiter::new(Duration::seconds(60), 3)),
            clock: Arc::new(SystemClock),
            screen_policy: ScreenPolicy::default(),
            verifier: None,
            mailer: mailer.map(|m| m as Arc<dyn Mailer>),
        })
    }

    fn app(state: Arc<AppState>) -> Router {
        router().with_state(state)
    }

    fn valid_body() -> Value {
        json!({
            "name": "Ann Lee",
            "email": "ann@example.com",
            "company": "",
            "interest": "platform",
            "message": "Interested in a demo please.",
            "timestamp": Utc::now().timestamp_millis() - 5000,
        })
    }

    fn request(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    // ── success paths ────────────────────────────────────────────────

    #[tokio::test]
    async fn valid_submission_without_credentials_is_acknowledged() {
        let app = app(state(None));
        let response = app.oneshot(request(&valid_body())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert!(body["message"].as_str().unwrap().contains("received"));
    }

    #[tokio::test]
    async fn valid_submission_with_mailer_sends_email() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app(state(Some(Arc::clone(&mailer))));
        let response = app.oneshot(request(&valid_body())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], json!(SENT_MESSAGE));

        let sent = mailer.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "New Contact Form Message");
        assert_eq!(sent[0].reply_to, "ann@example.com");
        assert!(sent[0].html_body.contains("Ann Lee"));
        assert!(sent[0].html_body.contains("from 203.0.113.9"));
    }

    #[tokio::test]
    async fn demo_type_selects_demo_subject() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app(state(Some(Arc::clone(&mailer))));
        let mut body = valid_body();
        body["type"] = json!("demo");

        let response = app.oneshot(request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(mailer.sent_emails()[0].subject, "New Demo Request");
    }

    // ── bot masking ──────────────────────────────────────────────────

    #[tokio::test]
    async fn honeypot_masked_as_success_and_nothing_sent() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app(state(Some(Arc::clone(&mailer))));
        let mut body = valid_body();
        body["website"] = json!("https://spam.example");

        let response = app.oneshot(request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], json!(SENT_MESSAGE));
        assert!(mailer.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn too_fast_submission_masked_as_success_and_nothing_sent() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app(state(Some(Arc::clone(&mailer))));
        let mut body = valid_body();
        body["timestamp"] = json!(Utc::now().timestamp_millis() - 500);

        let response = app.oneshot(request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert!(mailer.sent_emails().is_empty());
    }

    // ── validation ───────────────────────────────────────────────────

    #[tokio::test]
    async fn short_message_returns_field_errors_and_nothing_sent() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app(state(Some(Arc::clone(&mailer))));
        let mut body = valid_body();
        body["message"] = json!("hi");

        let response = app.oneshot(request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("validation_failed"));
        assert!(body["errors"]["message"].is_string());
        assert!(mailer.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn multiple_bad_fields_reported_together() {
        let app = app(state(None));
        let mut body = valid_body();
        body["name"] = json!("A1");
        body["email"] = json!("not-an-email");
        body["message"] = json!("hi");

        let response = app.oneshot(request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        for field in ["name", "email", "message"] {
            assert!(body["errors"][field].is_string(), "missing error for {field}");
        }
    }

    // ── rate limiting ────────────────────────────────────────────────

    #[tokio::test]
    async fn fourth_rapid_submission_is_rate_limited() {
        let app = app(state(None));

        for _ in 0..3 {
            let response = app.clone().oneshot(request(&valid_body())).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.oneshot(request(&valid_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("rate_limited"));
    }

    #[tokio::test]
    async fn rate_limit_keys_on_forwarded_address() {
        let app = app(state(None));

        for _ in 0..3 {
            app.clone().oneshot(request(&valid_body())).await.unwrap();
        }

        let other = Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "198.51.100.7")
            .body(Body::from(valid_body().to_string()))
            .unwrap();
        let response = app.oneshot(other).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // ── captcha gating ───────────────────────────────────────────────

    #[tokio::test]
    async fn missing_token_rejected_when_captcha_enabled() {
        let mut state = state(None);
        // The verifier is never called for a missing token, so the
        // endpoint does not need to resolve.
        Arc::get_mut(&mut state).unwrap().verifier = Some(
            TurnstileVerifier::with_endpoint("shh", "http://127.0.0.1:1/siteverify").unwrap(),
        );
        let app = app(state);

        let response = app.oneshot(request(&valid_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            json!("Security verification required")
        );
    }

    // ── delivery failure ─────────────────────────────────────────────

    #[tokio::test]
    async fn delivery_failure_returns_generic_500() {
        let mailer = Arc::new(RecordingMailer::failing());
        let app = app(state(Some(mailer)));

        let response = app.oneshot(request(&valid_body())).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("internal_error"));
        assert!(!body["message"].as_str().unwrap().contains("simulated"));
    }

    // ── client ip extraction ─────────────────────────────────────────

    #[test]
    fn client_ip_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.7".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn client_ip_falls_back_to_real_ip_then_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.7".parse().unwrap());
        assert_eq!(client_ip(&headers), "198.51.100.7");

        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}
