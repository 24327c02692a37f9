//! Operator settings loaded via OrthoConfig.
//!
//! Every field is optional in the environment (`SEAT_MONITOR_*`) or config
//! file; accessors resolve defaults and validate the rest.

use std::path::PathBuf;

use chrono::Duration;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::{LoopSchedule, SeatMonitorConfig};

const DEFAULT_INTERVAL_SECONDS: u64 = 60;
const DEFAULT_JITTER_SECONDS: u64 = 0;
const DEFAULT_SESSION_DURATION_MINUTES: i64 = 90;
const DEFAULT_REFRESH_INTERVAL_MINUTES: i64 = 15;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 20;
/// Upper bound for minute-valued settings: one week.
const MAX_DURATION_MINUTES: i64 = 7 * 24 * 60;
const DEFAULT_STATE_PATH: &str = ".data/seat-monitor.json";

/// Invalid or missing settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `source_mode` named no known mode.
    #[error("source mode must be one of stored, directory, http; got '{value}'")]
    UnknownSourceMode {
        /// Rejected text.
        value: String,
    },
    /// `upstream_url` did not parse.
    #[error("upstream url '{value}' is invalid: {message}")]
    InvalidUpstreamUrl {
        /// Rejected text.
        value: String,
        /// Parser message.
        message: String,
    },
    /// A setting required by the selected mode is absent.
    #[error("setting {name} is required for the selected source mode")]
    MissingSetting {
        /// Environment variable name.
        name: &'static str,
    },
}

/// Where availability payloads come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Replay the payload held in the store.
    Stored,
    /// Read capture files from `payload_dir`.
    Directory,
    /// Fetch `upstream_url` with the configured cookie.
    Http,
}

impl SourceMode {
    /// Parse a mode name, ignoring case and surrounding whitespace.
    ///
    /// `db`, `filesystem`, and `browser` are accepted as aliases.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSourceMode`] for any other text.
    ///
    /// # Examples
    /// ```
    /// use seat_monitor::config::SourceMode;
    ///
    /// assert_eq!(SourceMode::parse(" HTTP "), Ok(SourceMode::Http));
    /// assert!(SourceMode::parse("carrier-pigeon").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_lowercase().as_str() {
            "stored" | "db" => Ok(Self::Stored),
            "directory" | "filesystem" => Ok(Self::Directory),
            "http" | "browser" => Ok(Self::Http),
            _ => Err(ConfigError::UnknownSourceMode {
                value: raw.to_owned(),
            }),
        }
    }
}

/// Settings for the seat monitor binary.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SEAT_MONITOR")]
pub struct MonitorSettings {
    /// Seconds between scan cycles.
    pub interval_seconds: Option<u64>,
    /// Maximum random deviation applied to each interval.
    pub jitter_seconds: Option<u64>,
    /// Minutes a refreshed session is trusted.
    pub session_duration_minutes: Option<i64>,
    /// Minutes a captured payload is reused without refreshing.
    pub refresh_interval_minutes: Option<i64>,
    /// Upstream request timeout in seconds.
    pub request_timeout_seconds: Option<u64>,
    /// `stored`, `directory`, or `http`.
    pub source_mode: Option<String>,
    /// Directory holding capture files for the `directory` mode.
    pub payload_dir: Option<PathBuf>,
    /// Class-data endpoint for the `http` mode.
    pub upstream_url: Option<String>,
    /// Cookie header sent with upstream requests.
    pub cookie_header: Option<String>,
    /// Address alerted when the shared session lapses.
    pub owner_alert_email: Option<String>,
    /// JSON state file.
    pub state_path: Option<PathBuf>,
}

impl MonitorSettings {
    /// Polling schedule built from the interval and jitter settings.
    #[must_use]
    pub fn loop_schedule(&self) -> LoopSchedule {
        LoopSchedule::from_secs(
            self.interval_seconds.unwrap_or(DEFAULT_INTERVAL_SECONDS),
            self.jitter_seconds.unwrap_or(DEFAULT_JITTER_SECONDS),
        )
    }

    /// Session lifetime granted after a refresh or recovery, between one
    /// minute and one week.
    #[must_use]
    pub fn session_duration(&self) -> Duration {
        bounded_minutes(
            self.session_duration_minutes
                .unwrap_or(DEFAULT_SESSION_DURATION_MINUTES),
            1,
        )
    }

    /// Window during which a captured payload is reused, at most one week.
    #[must_use]
    pub fn refresh_window(&self) -> Duration {
        bounded_minutes(
            self.refresh_interval_minutes
                .unwrap_or(DEFAULT_REFRESH_INTERVAL_MINUTES),
            0,
        )
    }

    /// Upstream request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.request_timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS)
                .max(1),
        )
    }

    /// Selected source mode; `stored` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSourceMode`] for unrecognised text.
    pub fn source_mode(&self) -> Result<SourceMode, ConfigError> {
        self.source_mode
            .as_deref()
            .map_or(Ok(SourceMode::Stored), SourceMode::parse)
    }

    /// Capture directory, required by the `directory` mode.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] when unset.
    pub fn payload_dir(&self) -> Result<PathBuf, ConfigError> {
        self.payload_dir.clone().ok_or(ConfigError::MissingSetting {
            name: "SEAT_MONITOR_PAYLOAD_DIR",
        })
    }

    /// Parsed upstream endpoint, required by the `http` mode.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] when unset and
    /// [`ConfigError::InvalidUpstreamUrl`] when it does not parse.
    pub fn upstream_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .upstream_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingSetting {
                name: "SEAT_MONITOR_UPSTREAM_URL",
            })?;
        Url::parse(raw).map_err(|error| ConfigError::InvalidUpstreamUrl {
            value: raw.to_owned(),
            message: error.to_string(),
        })
    }

    /// State file path, falling back to `.data/seat-monitor.json`.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.state_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH))
    }

    /// Engine configuration derived from these settings.
    #[must_use]
    pub fn monitor_config(&self) -> SeatMonitorConfig {
        SeatMonitorConfig {
            session_duration: self.session_duration(),
            owner_alert_email: self
                .owner_alert_email
                .as_deref()
                .map(str::trim)
                .filter(|email| !email.is_empty())
                .map(str::to_owned),
        }
    }
}

fn bounded_minutes(minutes: i64, floor: i64) -> Duration {
    Duration::minutes(minutes.clamp(floor, MAX_DURATION_MINUTES))
}
