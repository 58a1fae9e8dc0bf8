//! Field sanitization and validation.
//!
//! Every check runs against the raw (trimmed) input first; HTML escaping
//! happens only after a field has passed. Escaping before validating would
//! corrupt the length and character-class checks (`O'Brien` becomes
//! `O&#x27;Brien` — 11 characters and a `&` that was never typed).
//!
//! Failures accumulate across fields instead of short-circuiting, so one
//! round trip tells the client everything that is wrong.

use std::borrow::Cow;

use email_address::EmailAddress;

use crate::error::ValidationErrors;
use crate::submission::{Interest, SubmissionKind, SubmissionPayload};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const EMAIL_MAX_CHARS: usize = 254;
pub const COMPANY_MAX_CHARS: usize = 200;
pub const MESSAGE_MIN_CHARS: usize = 10;
pub const MESSAGE_MAX_CHARS: usize = 5000;

/// Escape `& < > " '` for safe embedding in HTML.
///
/// Returns the input unchanged (borrowed) when nothing needs escaping.
#[must_use]
pub fn html_escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut escaped = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// A submission whose fields have been validated and HTML-escaped.
///
/// Free-text fields are safe to embed in HTML as-is. `message` keeps its
/// newlines; they become `<br>` at render time, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedSubmission {
    pub kind: SubmissionKind,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub interest: Option<Interest>,
    pub message: String,
}

/// Validate and sanitize a raw payload.
///
/// # Errors
///
/// Returns [`ValidationErrors`] with one entry per failed field. All fields
/// are checked; nothing short-circuits.
pub fn sanitize_submission(
    payload: &SubmissionPayload,
) -> Result<SanitizedSubmission, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = collect(validate_name(&payload.name), "name", &mut errors);
    let email = collect(validate_email(&payload.email), "email", &mut errors);
    let company = collect(validate_company(&payload.company), "company", &mut errors);
    let interest = collect(validate_interest(&payload.interest), "interest", &mut errors);
    let message = collect(validate_message(&payload.message), "message", &mut errors);

    match (name, email, company, interest, message) {
        (Some(name), Some(email), Some(company), Some(interest), Some(message))
            if errors.is_empty() =>
        {
            Ok(SanitizedSubmission {
                kind: payload.kind(),
                name,
                email,
                company,
                interest,
                message,
            })
        }
        _ => Err(errors),
    }
}

fn collect<T>(
    result: Result<T, String>,
    field: &'static str,
    errors: &mut ValidationErrors,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(reason) => {
            errors.push(field, reason);
            None
        }
    }
}

// ── Per-field checks ─────────────────────────────────────────────────

fn validate_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("name is required".to_owned());
    }
    let chars = name.chars().count();
    if chars < NAME_MIN_CHARS {
        return Err(format!("name must be at least {NAME_MIN_CHARS} characters"));
    }
    if chars > NAME_MAX_CHARS {
        return Err(format!("name must be at most {NAME_MAX_CHARS} characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '\'' || c == '-')
    {
        return Err("name may only contain letters, spaces, apostrophes, and hyphens".to_owned());
    }
    Ok(html_escape(name).into_owned())
}

fn validate_email(raw: &str) -> Result<String, String> {
    let email = raw.trim().to_ascii_lowercase();
    if email.is_empty() {
        return Err("email is required".to_owned());
    }
    if email.chars().count() > EMAIL_MAX_CHARS {
        return Err(format!("email must be at most {EMAIL_MAX_CHARS} characters"));
    }
    if !EmailAddress::is_valid(&email) {
        return Err("email address is not valid".to_owned());
    }
    // EmailAddress accepts dotless domains like `ann@localhost`; a contact
    // address must have a routable domain.
    let Some((local, domain)) = email.rsplit_once('@') else {
        return Err("email address is not valid".to_owned());
    };
    if !domain.contains('.') {
        return Err("email domain is not valid".to_owned());
    }
    Ok(html_escape(&normalize_email(local, domain)).into_owned())
}

/// Gmail ignores dots in the local part and routes `+tag` suffixes to the
/// same inbox; canonicalize so repeat submissions collapse to one address.
fn normalize_email(local: &str, domain: &str) -> String {
    match domain {
        "gmail.com" | "googlemail.com" => {
            let base = local.split('+').next().unwrap_or(local);
            format!("{}@{domain}", base.replace('.', ""))
        }
        _ => format!("{local}@{domain}"),
    }
}

fn validate_company(raw: &str) -> Result<Option<String>, String> {
    let company = raw.trim();
    if company.is_empty() {
        return Ok(None);
    }
    if company.chars().count() > COMPANY_MAX_CHARS {
        return Err(format!("company must be at most {COMPANY_MAX_CHARS} characters"));
    }
    Ok(Some(html_escape(company).into_owned()))
}

fn validate_interest(raw: &str) -> Result<Option<Interest>, String> {
    let interest = raw.trim();
    if interest.is_empty() {
        return Ok(None);
    }
    interest
        .parse()
        .map(Some)
        .map_err(|_| "interest must be one of the offered areas".to_owned())
}

fn validate_message(raw: &str) -> Result<String, String> {
    let message = raw.trim();
    if message.is_empty() {
        return Err("message is required".to_owned());
    }
    let chars = message.chars().count();
    if chars < MESSAGE_MIN_CHARS {
        return Err(format!("message must be at least {MESSAGE_MIN_CHARS} characters"));
    }
    if chars > MESSAGE_MAX_CHARS {
        return Err(format!("message must be at most {MESSAGE_MAX_CHARS} characters"));
    }
    Ok(html_escape(message).into_owned())
}
