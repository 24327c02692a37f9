//! Driven port supplying raw availability payloads.
//!
//! Adapters hide how payloads are captured (stored rows, files on disk, an
//! authenticated HTTP session). Failures carry an explicit kind so the
//! monitor can tell a lapsed session apart from a bad payload.

use async_trait::async_trait;
use serde::Serialize;

use super::define_port_error;
use crate::domain::{CourseId, PayloadCandidate};

const SESSION_KEYWORDS: &[&str] = &["session", "login", "auth", "unauthorized"];

/// Request for the payload candidates covering one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRequest {
    /// Course the caller wants to read.
    pub course_id: CourseId,
    /// Bypass any freshness window and capture anew.
    pub force_refresh: bool,
}

/// Candidates returned by a source, tagged with how they were obtained.
///
/// `captured` is true only when the source reached upstream during this call.
/// Replays of stored or on-disk payloads say nothing about the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateBatch {
    /// Payload candidates, in no particular order.
    pub candidates: Vec<PayloadCandidate>,
    /// True when the candidates came from a live upstream capture.
    pub captured: bool,
}

impl CandidateBatch {
    /// Candidates fetched from upstream during this call.
    #[must_use]
    pub const fn live(candidates: Vec<PayloadCandidate>) -> Self {
        Self {
            candidates,
            captured: true,
        }
    }

    /// Candidates replayed from data captured earlier.
    #[must_use]
    pub const fn replayed(candidates: Vec<PayloadCandidate>) -> Self {
        Self {
            candidates,
            captured: false,
        }
    }
}

/// Result of a best-effort session recovery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryOutcome {
    /// True when the session is usable again.
    pub ok: bool,
    /// Explanation when recovery did not succeed.
    pub reason: Option<String>,
}

impl RecoveryOutcome {
    /// Successful recovery.
    #[must_use]
    pub const fn recovered() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    /// Failed recovery with an explanation.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

define_port_error! {
    /// Errors surfaced while collecting payloads.
    pub enum AvailabilitySourceError {
        /// The shared upstream session is missing, rejected, or lapsed.
        Session { message: String } =>
            "upstream session failure: {message}",
        /// A payload was unavailable or unusable.
        Payload { message: String } =>
            "upstream payload failure: {message}",
        /// Network or IO failed before a payload was produced.
        Transport { message: String } =>
            "upstream transport failure: {message}",
    }
}

impl AvailabilitySourceError {
    /// Classify free-form failure text.
    ///
    /// Text mentioning a session, login, or authorisation problem becomes a
    /// [`AvailabilitySourceError::Session`]; anything else is transport.
    ///
    /// # Examples
    /// ```
    /// use seat_monitor::domain::ports::AvailabilitySourceError;
    ///
    /// let error = AvailabilitySourceError::from_message("Redirected to LOGIN page");
    /// assert!(error.is_session());
    /// assert!(!AvailabilitySourceError::from_message("connection reset").is_session());
    /// ```
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        let text: String = message.into();
        let lowered = text.to_lowercase();
        if SESSION_KEYWORDS
            .iter()
            .any(|keyword| lowered.contains(keyword))
        {
            Self::Session { message: text }
        } else {
            Self::Transport { message: text }
        }
    }

    /// Return whether this failure concerns the shared session.
    #[must_use]
    pub const fn is_session(&self) -> bool {
        matches!(self, Self::Session { .. })
    }
}

/// Port for reading availability payloads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// Collect the candidate payloads for one course.
    async fn collect_candidates(
        &self,
        request: &CandidateRequest,
    ) -> Result<CandidateBatch, AvailabilitySourceError>;

    /// Try to restore the shared session.
    ///
    /// Never fails; internal problems are reported as `ok = false`. The
    /// default reports that recovery is not supported.
    async fn try_auto_recover(&self, reason: &str) -> RecoveryOutcome {
        RecoveryOutcome::failed(format!("auto recovery is not supported ({reason})"))
    }
}

#[cfg(test)]
mod tests {
    //! Classification coverage for source errors.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Session expired", true)]
    #[case("redirected to Login", true)]
    #[case("AUTH cookie missing", true)]
    #[case("401 Unauthorized", true)]
    #[case("connection reset by peer", false)]
    #[case("payload too large", false)]
    fn free_text_is_classified_by_keyword(#[case] message: &str, #[case] session: bool) {
        assert_eq!(
            AvailabilitySourceError::from_message(message).is_session(),
            session
        );
    }

    struct NoRecovery;

    #[async_trait]
    impl AvailabilitySource for NoRecovery {
        async fn collect_candidates(
            &self,
            _request: &CandidateRequest,
        ) -> Result<CandidateBatch, AvailabilitySourceError> {
            Ok(CandidateBatch::default())
        }
    }

    #[tokio::test]
    async fn default_recovery_is_unsupported() {
        let outcome = NoRecovery.try_auto_recover("expired").await;
        assert!(!outcome.ok);
        assert!(
            outcome
                .reason
                .is_some_and(|reason| reason.contains("not supported"))
        );
    }
}
