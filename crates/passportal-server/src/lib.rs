//! HTTP server and delivery service for the Passportal contact pipeline.
//!
//! The submission guard itself lives in `passportal-core`; this crate wires
//! it to the outside world: the `/api/contact` endpoint, environment-based
//! configuration, Turnstile verification, and SMTP delivery.

pub mod captcha;
pub mod config;
pub mod error;
pub mod mail;
pub mod routes;
pub mod state;
