//! Cloudflare Turnstile token verification.
//!
//! The server exchanges the client-supplied token with the siteverify API
//! over HTTPS and requires an explicit success flag in the response. The
//! request carries an explicit timeout.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

const SITEVERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from token verification.
#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    /// Failed to construct the HTTP client.
    #[error("failed to build verification client: {0}")]
    Client(String),

    /// The verification service rejected the token.
    #[error("token rejected: {codes:?}")]
    Rejected { codes: Vec<String> },

    /// The verification service could not be reached or its response could
    /// not be decoded.
    #[error("siteverify request failed: {0}")]
    Request(String),
}

/// Siteverify response body. Only the success flag and error codes matter.
#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Client for the Turnstile siteverify API.
#[derive(Debug, Clone)]
pub struct TurnstileVerifier {
    client: reqwest::Client,
    secret_key: String,
    endpoint: String,
}

impl TurnstileVerifier {
    /// Verifier against the production siteverify endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`CaptchaError::Client`] if the HTTP client cannot be built.
    pub fn new(secret_key: impl Into<String>) -> Result<Self, CaptchaError> {
        Self::with_endpoint(secret_key, SITEVERIFY_URL)
    }

    /// Verifier against an explicit endpoint. Tests point this at a
    /// loopback fake.
    ///
    /// # Errors
    ///
    /// Returns [`CaptchaError::Client`] if the HTTP client cannot be built.
    pub fn with_endpoint(
        secret_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, CaptchaError> {
        let client = reqwest::Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .build()
            .map_err(|e| CaptchaError::Client(e.to_string()))?;

        Ok(Self {
            client,
            secret_key: secret_key.into(),
            endpoint: endpoint.into(),
        })
    }

    /// Exchange a client token with the verification service.
    ///
    /// # Errors
    ///
    /// [`CaptchaError::Rejected`] when the service answers without the
    /// success flag; [`CaptchaError::Request`] when it cannot be reached or
    /// answers garbage.
    pub async fn verify(&self, token: &str, remote_ip: &str) -> Result<(), CaptchaError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[
                ("secret", self.secret_key.as_str()),
                ("response", token),
                ("remoteip", remote_ip),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "siteverify request failed");
                CaptchaError::Request(e.to_string())
            })?;

        let body: SiteverifyResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "siteverify response could not be decoded");
            CaptchaError::Request(e.to_string())
        })?;

        if body.success {
            debug!("turnstile verification passed");
            Ok(())
        } else {
            warn!(codes = ?body.error_codes, "turnstile verification failed");
            Err(CaptchaError::Rejected {
                codes: body.error_codes,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Deserialize)]
    struct VerifyParams {
        secret: String,
        response: String,
    }

    /// Serve a fake siteverify endpoint on a loopback port and return its
    /// URL. Accepts only the given secret/solution pair.
    async fn fake_siteverify(secret: &'static str, solution: &'static str) -> String {
        let handler = move |Form(params): Form<VerifyParams>| async move {
            if params.secret == secret && params.response == solution {
                Json(json!({ "success": true }))
            } else {
                Json(json!({ "success": false, "error-codes": ["invalid-input-response"] }))
            }
        };
        let app = Router::new().route("/siteverify", post(handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/siteverify")
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let endpoint = fake_siteverify("shh", "good-token").await;
        let verifier = TurnstileVerifier::with_endpoint("shh", endpoint).unwrap();
        assert!(verifier.verify("good-token", "203.0.113.9").await.is_ok());
    }

    #[tokio::test]
    async fn rejects_invalid_token() {
        let endpoint = fake_siteverify("shh", "good-token").await;
        let verifier = TurnstileVerifier::with_endpoint("shh", endpoint).unwrap();
        let err = verifier.verify("bad-token", "203.0.113.9").await.unwrap_err();
        assert!(matches!(err, CaptchaError::Rejected { .. }));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected_not_a_request_error() {
        let endpoint = fake_siteverify("shh", "good-token").await;
        let verifier = TurnstileVerifier::with_endpoint("wrong", endpoint).unwrap();
        let err = verifier.verify("good-token", "203.0.113.9").await.unwrap_err();
        assert!(matches!(err, CaptchaError::Rejected { .. }));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_request_error() {
        // Nothing listens on this port.
        let verifier =
            TurnstileVerifier::with_endpoint("shh", "http://127.0.0.1:1/siteverify").unwrap();
        let err = verifier.verify("token", "203.0.113.9").await.unwrap_err();
        assert!(matches!(err, CaptchaError::Request(_)));
    }
}
