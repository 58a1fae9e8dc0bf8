//! Server configuration for Passportal.
//!
//! All configuration comes from environment variables, resolved once at
//! startup. Mail and CAPTCHA are optional capabilities: leaving their
//! variables unset switches the behavior off (submissions acknowledged
//! without delivery; no verification enforced) instead of failing.

use std::net::SocketAddr;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Rate-limit window in seconds.
    pub rate_window_secs: u64,
    /// Requests allowed per window, per client address.
    pub rate_max_requests: u32,
    /// Minimum believable form fill time in milliseconds.
    pub min_fill_ms: i64,
    /// SMTP delivery configuration (None — credentials unset, submissions
    /// are acknowledged but not delivered).
    pub mail: Option<MailConfig>,
    /// Turnstile configuration (None — CAPTCHA not enforced).
    pub turnstile: Option<TurnstileConfig>,
}

/// Configuration for the SMTP relay session.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Mail account address. Used as sender, recipient, and SMTP username;
    /// the submitter's address goes into Reply-To.
    pub account: String,
    /// Mail account password.
    pub password: String,
    /// SMTP relay hostname.
    pub smtp_host: String,
    /// SMTP relay port (implicit TLS).
    pub smtp_port: u16,
    /// SMTP connection timeout in seconds.
    pub smtp_timeout_secs: u64,
}

/// Configuration for Cloudflare Turnstile verification.
#[derive(Debug, Clone)]
pub struct TurnstileConfig {
    /// Server-side secret exchanged with the siteverify API.
    pub secret_key: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT` — port to bind on (binds to `0.0.0.0`)
    /// - `PASSPORTAL_BIND_ADDR` — full bind address (overrides `PORT`, default: `127.0.0.1:8300`)
    /// - `PASSPORTAL_LOG_LEVEL` — log filter (default: `info`)
    /// - `PASSPORTAL_RATE_WINDOW` — rate-limit window seconds (default: `60`)
    /// - `PASSPORTAL_RATE_MAX` — requests per window per client (default: `3`)
    /// - `PASSPORTAL_MIN_FILL_MS` — minimum form fill time in ms (default: `3000`)
    /// - `CONTACT_EMAIL` / `CONTACT_EMAIL_PASSWORD` — mail account; both must
    ///   be set and non-empty to enable delivery
    /// - `PASSPORTAL_SMTP_HOST` — SMTP relay hostname (default: `smtpout.secureserver.net`)
    /// - `PASSPORTAL_SMTP_PORT` — SMTP relay port, implicit TLS (default: `465`)
    /// - `PASSPORTAL_SMTP_TIMEOUT` — SMTP timeout seconds (default: `10`)
    /// - `TURNSTILE_SECRET_KEY` — enables CAPTCHA verification when set
    #[must_use]
    pub fn from_env() -> Self {
        // Priority: PASSPORTAL_BIND_ADDR > PORT > default 127.0.0.1:8300
        let bind_addr = if let Ok(addr) = std::env::var("PASSPORTAL_BIND_ADDR") {
            addr.parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8300)))
        } else if let Ok(port_str) = std::env::var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(8300);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], 8300))
        };

        let log_level = std::env::var("PASSPORTAL_LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());

        let rate_window_secs = std::env::var("PASSPORTAL_RATE_WINDOW")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let rate_max_requests = std::env::var("PASSPORTAL_RATE_MAX")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        let min_fill_ms = std::env::var("PASSPORTAL_MIN_FILL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        // Mail delivery — enabled only when both credentials are present.
        let mail = match (
            std::env::var("CONTACT_EMAIL"),
            std::env::var("CONTACT_EMAIL_PASSWORD"),
        ) {
            (Ok(account), Ok(password)) if !account.is_empty() && !password.is_empty() => {
                Some(MailConfig {
                    account,
                    password,
                    smtp_host: std::env::var("PASSPORTAL_SMTP_HOST")
                        .unwrap_or_else(|_| "smtpout.secureserver.net".to_owned()),
                    smtp_port: std::env::var("PASSPORTAL_SMTP_PORT")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(465),
                    smtp_timeout_secs: std::env::var("PASSPORTAL_SMTP_TIMEOUT")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(10),
                })
            }
            _ => None,
        };

        // CAPTCHA — enabled when the server-side secret is set.
        let turnstile = std::env::var("TURNSTILE_SECRET_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|secret_key| TurnstileConfig { secret_key });

        Self {
            bind_addr,
            log_level,
            rate_window_secs,
            rate_max_requests,
            min_fill_ms,
            mail,
            turnstile,
        }
    }

    /// Whether SMTP delivery is configured.
    #[must_use]
    pub fn mail_configured(&self) -> bool {
        self.mail.is_some()
    }

    /// Whether CAPTCHA verification is enforced.
    #[must_use]
    pub fn captcha_enabled(&self) -> bool {
        self.turnstile.is_some()
    }
}
