//! Source replaying the payload already held by the store.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{
    AvailabilitySource, AvailabilitySourceError, CandidateBatch, CandidateRequest, MonitorStore,
};

/// [`AvailabilitySource`] offering the stored cached payload, if any.
///
/// Another process is expected to keep the cache current; recovery is not
/// supported.
pub struct StoredPayloadSource {
    store: Arc<dyn MonitorStore>,
}

impl StoredPayloadSource {
    /// Read candidates from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn MonitorStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AvailabilitySource for StoredPayloadSource {
    async fn collect_candidates(
        &self,
        _request: &CandidateRequest,
    ) -> Result<CandidateBatch, AvailabilitySourceError> {
        let cached = self
            .store
            .cached_payload()
            .await
            .map_err(|error| AvailabilitySourceError::transport(error.to_string()))?;
        Ok(CandidateBatch::replayed(
            cached.iter().map(|payload| payload.to_candidate()).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    //! Coverage for the stored-payload source.

    use super::*;
    use crate::domain::ports::{MockMonitorStore, MonitorStoreError};
    use crate::domain::{CachedPayload, CourseId};
    use crate::test_support::{candidate, reference_time};
    use rstest::rstest;

    fn request() -> CandidateRequest {
        CandidateRequest {
            course_id: CourseId::new("ABC123").expect("course"),
            force_refresh: true,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn offers_the_cached_payload() {
        let mut store = MockMonitorStore::new();
        store.expect_cached_payload().times(1).returning(|| {
            Ok(Some(CachedPayload::from_candidate(candidate(
                "[]",
                reference_time(),
            ))))
        });
        let source = StoredPayloadSource::new(Arc::new(store));

        let batch = source.collect_candidates(&request()).await.expect("collect");
        assert_eq!(batch.candidates, vec![candidate("[]", reference_time())]);
        assert!(!batch.captured);
    }

    #[rstest]
    #[tokio::test]
    async fn empty_cache_offers_nothing() {
        let mut store = MockMonitorStore::new();
        store.expect_cached_payload().returning(|| Ok(None));
        let source = StoredPayloadSource::new(Arc::new(store));

        let batch = source.collect_candidates(&request()).await.expect("collect");
        assert!(batch.candidates.is_empty());
        assert!(!source.try_auto_recover("expired").await.ok);
    }

    #[rstest]
    #[tokio::test]
    async fn store_failures_are_transport_errors() {
        let mut store = MockMonitorStore::new();
        store
            .expect_cached_payload()
            .returning(|| Err(MonitorStoreError::connection("offline")));
        let source = StoredPayloadSource::new(Arc::new(store));

        let error = source.collect_candidates(&request()).await.expect_err("fails");
        assert!(matches!(error, AvailabilitySourceError::Transport { .. }));
    }
}
