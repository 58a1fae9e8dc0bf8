//! Shared application state.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. The guard pieces are trait objects so tests can
//! substitute deterministic clocks, limiters, and mailers.

use std::sync::Arc;

use passportal_core::guard::ScreenPolicy;
use passportal_core::ratelimit::{Clock, RateLimiter};

use crate::captcha::TurnstileVerifier;
use crate::mail::Mailer;

/// Shared state passed to all HTTP handlers.
pub struct AppState {
    /// Per-client request throttle.
    pub limiter: Arc<dyn RateLimiter>,
    /// Time source for the fill-time screen and audit timestamps.
    pub clock: Arc<dyn Clock>,
    /// Honeypot / fill-time thresholds.
    pub screen_policy: ScreenPolicy,
    /// CAPTCHA verifier (None — verification not enforced).
    pub verifier: Option<TurnstileVerifier>,
    /// Email delivery (None — mail credentials unconfigured; submissions
    /// are acknowledged but not sent).
    pub mailer: Option<Arc<dyn Mailer>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
