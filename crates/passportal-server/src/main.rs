//! Passportal contact API entry point.
//!
//! Resolves configuration once at startup, builds the submission-guard
//! state, and serves the contact endpoint with graceful shutdown. Mail and
//! CAPTCHA capabilities switch off cleanly when their secrets are absent,
//! so the server runs unchanged in preview environments.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::http::HeaderValue;
use chrono::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use passportal_core::guard::ScreenPolicy;
use passportal_core::ratelimit::{MemoryRateLimiter, SystemClock};

use passportal_server::captcha::TurnstileVerifier;
use passportal_server::config::ServerConfig;
use passportal_server::mail::{Mailer, SmtpMailer};
use passportal_server::routes;
use passportal_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(
        captcha_enabled = config.captcha_enabled(),
        mail_configured = config.mail_configured(),
        "passportal starting"
    );

    let state = build_app_state(&config)?;
    let app = build_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "passportal server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("passportal server stopped");
    Ok(())
}

/// Build the shared application state from resolved configuration.
fn build_app_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let limiter = Arc::new(MemoryRateLimiter::new(
        Duration::seconds(i64::try_from(config.rate_window_secs).unwrap_or(60)),
        config.rate_max_requests,
    ));

    let verifier = config
        .turnstile
        .as_ref()
        .map(|t| TurnstileVerifier::new(t.secret_key.as_str()))
        .transpose()
        .context("failed to build turnstile verifier")?;

    let mailer: Option<Arc<dyn Mailer>> = match &config.mail {
        Some(mail) => {
            info!(relay = %mail.smtp_host, port = mail.smtp_port, "SMTP delivery enabled");
            Some(Arc::new(
                SmtpMailer::from_config(mail).context("failed to build SMTP mailer")?,
            ))
        }
        None => {
            info!("mail credentials not configured, submissions will be acknowledged only");
            None
        }
    };

    Ok(Arc::new(AppState {
        limiter,
        clock: Arc::new(SystemClock),
        screen_policy: ScreenPolicy::new(Duration::milliseconds(config.min_fill_ms)),
        verifier,
        mailer,
    }))
}

/// Build the Axum router with all routes and middleware.
fn build_router(state: Arc<AppState>) -> Router {
    // Bound concurrent submissions; each may hold an SMTP session and a
    // verification round-trip.
    let contact_routes = routes::contact::router()
        .layer(tower::limit::ConcurrencyLimitLayer::new(16));

    // CORS — the form posts JSON from browser pages.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .merge(contact_routes)
        .merge(routes::health::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
