//! Pre-validation bot screening: honeypot and fill-time checks.

use chrono::Duration;

use crate::submission::SubmissionPayload;

/// Why a submission was classified as a bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The hidden `website` field was filled in.
    HoneypotFilled,
    /// The form came back faster than a human can fill it.
    SubmittedTooFast,
}

impl DropReason {
    /// Stable label for log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HoneypotFilled => "honeypot_filled",
            Self::SubmittedTooFast => "submitted_too_fast",
        }
    }
}

/// Outcome of the bot screen.
///
/// `SilentlyDropped` is an explicit policy value, not an error: the HTTP
/// layer answers with the same success shape as a real submission so the
/// sender cannot tell it was detected, and performs no delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenOutcome {
    Accepted,
    SilentlyDropped(DropReason),
}

impl ScreenOutcome {
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Screening thresholds.
#[derive(Debug, Clone)]
pub struct ScreenPolicy {
    /// Minimum believable time between form render and submit.
    pub min_fill_time: Duration,
}

impl Default for ScreenPolicy {
    fn default() -> Self {
        Self {
            min_fill_time: Duration::milliseconds(3000),
        }
    }
}

impl ScreenPolicy {
    #[must_use]
    pub fn new(min_fill_time: Duration) -> Self {
        Self { min_fill_time }
    }

    /// Screen a submission. `now_millis` is the server receipt time as unix
    /// milliseconds, compared against the client-reported submit-intent
    /// timestamp.
    ///
    /// The honeypot is checked first; a submission with no timestamp skips
    /// the fill-time check. A timestamp in the future also drops — the
    /// elapsed time is below the threshold either way.
    #[must_use]
    pub fn screen(&self, payload: &SubmissionPayload, now_millis: i64) -> ScreenOutcome {
        if payload
            .website
            .as_deref()
            .is_some_and(|w| !w.trim().is_empty())
        {
            return ScreenOutcome::SilentlyDropped(DropReason::HoneypotFilled);
        }

        if let Some(submitted_at) = payload.timestamp {
            let elapsed = now_millis.saturating_sub(submitted_at);
            if elapsed < self.min_fill_time.num_milliseconds() {
                return ScreenOutcome::SilentlyDropped(DropReason::SubmittedTooFast);
            }
        }

        ScreenOutcome::Accepted
    }
}
