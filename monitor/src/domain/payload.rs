//! Captured availability payloads and the course facts derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::tracking::CourseId;

/// One raw payload offered by an availability source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadCandidate {
    /// Raw payload text exactly as captured.
    pub raw_payload: String,
    /// When the upstream produced the payload.
    pub generated_at: DateTime<Utc>,
    /// Where the payload came from (URL or file path), when known.
    pub source_path: Option<String>,
}

/// Singleton record holding the most recently captured payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPayload {
    /// Raw payload text.
    pub raw_payload: String,
    /// Origin of the payload, when known.
    pub source_path: Option<String>,
    /// Lowercase hex SHA-256 of `raw_payload`.
    pub content_hash: String,
    /// Generation timestamp of the payload.
    pub generated_at: DateTime<Utc>,
}

impl CachedPayload {
    /// Build the cache record for a selected candidate.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use seat_monitor::domain::{CachedPayload, PayloadCandidate};
    ///
    /// let cached = CachedPayload::from_candidate(PayloadCandidate {
    ///     raw_payload: "[]".to_owned(),
    ///     generated_at: Utc::now(),
    ///     source_path: None,
    /// });
    /// assert_eq!(cached.content_hash.len(), 64);
    /// ```
    #[must_use]
    pub fn from_candidate(candidate: PayloadCandidate) -> Self {
        let content_hash = content_hash(&candidate.raw_payload);
        Self {
            raw_payload: candidate.raw_payload,
            source_path: candidate.source_path,
            content_hash,
            generated_at: candidate.generated_at,
        }
    }

    /// Re-offer the cached payload as a source candidate.
    #[must_use]
    pub fn to_candidate(&self) -> PayloadCandidate {
        PayloadCandidate {
            raw_payload: self.raw_payload.clone(),
            generated_at: self.generated_at,
            source_path: self.source_path.clone(),
        }
    }
}

fn content_hash(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Denormalised fact about a course, refreshed on every successful parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Course identifier.
    pub course_id: CourseId,
    /// Display name extracted from the payload.
    pub display_name: String,
    /// Last known open-seat count.
    pub open_seats: i64,
    /// When the fact was last written.
    pub updated_at: DateTime<Utc>,
}

/// Pick the most recently generated candidate.
///
/// Ties go to the candidate appearing later in `candidates`.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use seat_monitor::domain::{PayloadCandidate, select_latest_candidate};
///
/// let at = Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).single().expect("valid time");
/// let first = PayloadCandidate { raw_payload: "a".into(), generated_at: at, source_path: None };
/// let second = PayloadCandidate { raw_payload: "b".into(), generated_at: at, source_path: None };
/// let latest = select_latest_candidate(vec![first, second]).expect("candidate");
/// assert_eq!(latest.raw_payload, "b");
/// ```
#[must_use]
pub fn select_latest_candidate(candidates: Vec<PayloadCandidate>) -> Option<PayloadCandidate> {
    candidates
        .into_iter()
        .max_by_key(|candidate| candidate.generated_at)
}
