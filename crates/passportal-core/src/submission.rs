//! Untrusted submission payload and its enumerated fields.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// A contact/demo form submission exactly as received from the client.
///
/// Every field is attacker-controlled. Nothing here may be embedded in an
/// email body or a response until it has passed through
/// [`crate::sanitize::sanitize_submission`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub interest: String,
    #[serde(default)]
    pub message: String,
    /// Honeypot. The form hides this field; humans leave it empty.
    #[serde(default)]
    pub website: Option<String>,
    /// Client-side submit-intent time, unix milliseconds. Absent when the
    /// client does not report one, in which case the fill-time screen is
    /// skipped.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// CAPTCHA proof-of-humanity token.
    #[serde(default, rename = "turnstileToken")]
    pub turnstile_token: Option<String>,
    /// `"demo"` for demo requests; anything else is a plain contact message.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl SubmissionPayload {
    /// The submission kind encoded in the `type` field.
    #[must_use]
    pub fn kind(&self) -> SubmissionKind {
        SubmissionKind::from_type_field(self.kind.as_deref())
    }
}

/// What the sender asked for. Drives the email subject and label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionKind {
    #[default]
    Contact,
    Demo,
}

impl SubmissionKind {
    /// Map the wire-level `type` field; only the literal `"demo"` selects
    /// [`SubmissionKind::Demo`].
    #[must_use]
    pub fn from_type_field(value: Option<&str>) -> Self {
        match value {
            Some("demo") => Self::Demo,
            _ => Self::Contact,
        }
    }

    /// Email subject line for this kind of submission.
    #[must_use]
    pub fn subject(self) -> &'static str {
        match self {
            Self::Demo => "New Demo Request",
            Self::Contact => "New Contact Form Message",
        }
    }

    /// Human label used in the email body heading.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Demo => "Demo Request",
            Self::Contact => "Contact Form",
        }
    }
}

/// Allowed values for the `interest` field.
///
/// Anything outside this set is a validation failure, never passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Platform,
    Compliance,
    Implementation,
    Integration,
    Enterprise,
    Other,
}

impl Interest {
    /// Wire value, identical to what the form submits.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Compliance => "compliance",
            Self::Implementation => "implementation",
            Self::Integration => "integration",
            Self::Enterprise => "enterprise",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `interest` value was not in the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown area of interest")]
pub struct UnknownInterest;

impl FromStr for Interest {
    type Err = UnknownInterest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "platform" => Ok(Self::Platform),
            "compliance" => Ok(Self::Compliance),
            "implementation" => Ok(Self::Implementation),
            "integration" => Ok(Self::Integration),
            "enterprise" => Ok(Self::Enterprise),
            "other" => Ok(Self::Other),
            _ => Err(UnknownInterest),
        }
    }
}
