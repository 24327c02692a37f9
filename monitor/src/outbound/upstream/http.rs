//! Reqwest-backed capture of the upstream class-data endpoint.
//!
//! The adapter owns transport details only: the cookie-authenticated GET,
//! timeout handling, and mapping HTTP outcomes to source error kinds.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use reqwest::{Client, StatusCode, Url, header};
use tracing::debug;

use super::refreshing::PayloadCapture;
use crate::domain::ports::{AvailabilitySourceError, RecoveryOutcome};
use crate::domain::{CourseId, PayloadCandidate};

const DEFAULT_USER_AGENT: &str = "seat-monitor/0.1";
const LOGIN_MARKERS: &[&str] = &["login", "passport", "duo", "sign in"];

/// [`PayloadCapture`] issuing one GET per capture with a session cookie.
pub struct HttpPayloadCapture {
    client: Client,
    endpoint: Url,
    cookie_header: Option<String>,
    clock: Arc<dyn Clock>,
}

impl HttpPayloadCapture {
    /// Build a capture with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        timeout: Duration,
        cookie_header: Option<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            cookie_header: cookie_header.filter(|cookie| !cookie.trim().is_empty()),
            clock,
        })
    }

    async fn fetch(&self) -> Result<String, AvailabilitySourceError> {
        let Some(cookie) = self.cookie_header.as_deref() else {
            return Err(AvailabilitySourceError::session(
                "cookie header is empty; login session is missing",
            ));
        };

        let response = self
            .client
            .get(self.endpoint.clone())
            .header(header::ACCEPT, "application/xml,text/xml,application/json,*/*;q=0.1")
            .header(header::COOKIE, cookie)
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        classify_body(&body)
    }
}

#[async_trait]
impl PayloadCapture for HttpPayloadCapture {
    async fn capture(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<PayloadCandidate>, AvailabilitySourceError> {
        let raw_payload = self.fetch().await?;
        debug!(
            course_id = %course_id,
            bytes = raw_payload.len(),
            "upstream payload fetched"
        );
        Ok(vec![PayloadCandidate {
            raw_payload,
            generated_at: self.clock.utc(),
            source_path: Some(self.endpoint.to_string()),
        }])
    }

    /// Probe the endpoint once; the session is usable when the probe succeeds.
    async fn recover(&self, reason: &str) -> RecoveryOutcome {
        debug!(reason, "probing upstream session");
        match self.fetch().await {
            Ok(_) => RecoveryOutcome::recovered(),
            Err(error) => RecoveryOutcome::failed(error.to_string()),
        }
    }
}

fn classify_body(body: &str) -> Result<String, AvailabilitySourceError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(AvailabilitySourceError::payload("upstream returned an empty body"));
    }
    let lowered = trimmed.to_lowercase();
    if lowered.contains("<html") && LOGIN_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return Err(AvailabilitySourceError::session(
            "upstream returned a login page; session is expired",
        ));
    }
    Ok(trimmed.to_owned())
}

fn map_transport_error(error: reqwest::Error) -> AvailabilitySourceError {
    if error.is_timeout() {
        AvailabilitySourceError::transport(format!("request timed out: {error}"))
    } else {
        AvailabilitySourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &str) -> AvailabilitySourceError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AvailabilitySourceError::session(message)
        }
        _ => AvailabilitySourceError::transport(message),
    }
}

fn body_preview(body: &str) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = body.split_whitespace().collect::<Vec<_>>().join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Coverage for the non-network mapping helpers.

    use super::*;
    use crate::test_support::{MutableClock, reference_time};
    use rstest::rstest;

    #[rstest]
    #[case::unauthorized(StatusCode::UNAUTHORIZED, true)]
    #[case::forbidden(StatusCode::FORBIDDEN, true)]
    #[case::not_found(StatusCode::NOT_FOUND, false)]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, false)]
    fn auth_statuses_map_to_session_errors(#[case] status: StatusCode, #[case] session: bool) {
        let error = map_status_error(status, "<error/>");
        assert_eq!(error.is_session(), session, "{status} mapped to {error:?}");
    }

    #[rstest]
    fn login_pages_are_session_errors() {
        let error = classify_body("<html><body>Passport York login</body></html>")
            .expect_err("login page");
        assert!(error.is_session());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn empty_bodies_are_payload_errors(#[case] body: &str) {
        let error = classify_body(body).expect_err("empty body");
        assert!(matches!(error, AvailabilitySourceError::Payload { .. }));
    }

    #[rstest]
    fn data_bodies_are_trimmed() {
        let body = classify_body("\n<classdata/>\n").expect("data body");
        assert_eq!(body, "<classdata/>");
    }

    #[rstest]
    fn long_bodies_are_truncated_in_previews() {
        let preview = body_preview(&"x ".repeat(200));
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 163);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_cookie_is_a_session_failure() {
        let endpoint = Url::parse("http://127.0.0.1:9/getClassData.jsp").expect("url");
        let capture = HttpPayloadCapture::new(
            endpoint,
            Duration::from_secs(1),
            Some("   ".to_owned()),
            Arc::new(MutableClock::new(reference_time())),
        )
        .expect("client");
        let course = CourseId::new("ABC123").expect("course");

        let error = capture.capture(&course).await.expect_err("no cookie");
        assert!(error.is_session());
        assert!(!capture.recover("expired").await.ok);
    }
}
