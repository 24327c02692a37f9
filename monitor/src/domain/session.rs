//! Health of the single shared upstream session.
//!
//! Every scan shares one authenticated upstream session. Stores keep exactly
//! one [`SharedSession`] record and write it last-writer-wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// The session was last seen working.
    Ok,
    /// The session lapsed or was rejected upstream.
    Expired,
}

/// Singleton record describing the shared upstream session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSession {
    /// Stored state; see [`SharedSession::effective_state`] for the clock view.
    pub state: SessionState,
    /// When the session is expected to lapse.
    pub expires_at: Option<DateTime<Utc>>,
    /// Last time a refresh or recovery confirmed the session.
    pub last_validated_at: Option<DateTime<Utc>>,
    /// Reason recorded by the most recent expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reason: Option<String>,
}

impl SharedSession {
    /// Build a healthy session valid until `expires_at`.
    #[must_use]
    pub fn ok(expires_at: DateTime<Utc>, validated_at: DateTime<Utc>) -> Self {
        Self {
            state: SessionState::Ok,
            expires_at: Some(expires_at),
            last_validated_at: Some(validated_at),
            last_reason: None,
        }
    }

    /// Build an expired session recording `reason`.
    #[must_use]
    pub fn expired(reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            state: SessionState::Expired,
            expires_at: None,
            last_validated_at: Some(at),
            last_reason: Some(reason.into()),
        }
    }

    /// Return true when the stored state is `Ok` but the expiry has passed.
    ///
    /// # Examples
    /// ```
    /// use chrono::{Duration, Utc};
    /// use seat_monitor::domain::SharedSession;
    ///
    /// let now = Utc::now();
    /// let session = SharedSession::ok(now - Duration::hours(1), now - Duration::hours(2));
    /// assert!(session.is_clock_expired(now));
    /// ```
    #[must_use]
    pub fn is_clock_expired(&self, now: DateTime<Utc>) -> bool {
        self.state == SessionState::Ok && self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    /// State after folding in the clock check.
    #[must_use]
    pub fn effective_state(&self, now: DateTime<Utc>) -> SessionState {
        if self.is_clock_expired(now) {
            SessionState::Expired
        } else {
            self.state
        }
    }

    /// Effective state of an optional record; absence counts as expired.
    #[must_use]
    pub fn effective_state_of(session: Option<&Self>, now: DateTime<Utc>) -> SessionState {
        session.map_or(SessionState::Expired, |value| value.effective_state(now))
    }
}
