//! Service facade running the locate, fetch, expand, and categorize pipeline
//! behind a single entry point.

use std::sync::Arc;

use crate::expand::expand_feed;
use crate::model::{AddressQuery, Horizon, ScheduleSnapshot, civic_now};
use crate::ports::{AddressDirectory, FeedSource, PortError};

/// Entry point consumers talk to: address lookups for the setup flow and the
/// full schedule pipeline for one address.
///
/// The ports share one pooled HTTP client; dropping the service releases the
/// connections with it.
pub struct RamasseService {
    directory: Arc<dyn AddressDirectory>,
    source: Arc<dyn FeedSource>,
}

impl RamasseService {
    /// Create a service bound to the given ports.
    #[must_use]
    pub fn new(directory: Arc<dyn AddressDirectory>, source: Arc<dyn FeedSource>) -> Self {
        Self { directory, source }
    }

    /// Street names for the guided setup flow.
    ///
    /// An empty list means the lookup degraded; offer free-text entry
    /// instead of failing.
    pub async fn streets(&self) -> Vec<String> {
        self.directory.streets().await
    }

    /// Civic numbers for a street, with the same degradation contract as
    /// [`RamasseService::streets`].
    pub async fn civic_numbers(&self, street: &str) -> Vec<String> {
        self.directory.civic_numbers(street).await
    }

    /// Run the pipeline for one address and produce a fresh snapshot.
    ///
    /// A portal response without any schedule fragment yields an empty
    /// snapshot rather than an error; consumers decide what "no data" means
    /// for them.
    ///
    /// # Errors
    ///
    /// [`PortError::Network`] when the portal or feed is unreachable,
    /// [`PortError::InvalidAddress`] when the portal does not serve the
    /// address, and [`PortError::Parse`] when the feed bytes are unusable.
    pub async fn get_schedule(&self, query: &AddressQuery) -> Result<ScheduleSnapshot, PortError> {
        let fetched = self.source.fetch_feed(query).await.map_err(|err| {
            tracing::error!(street = %query.street, error = %err, "feed fetch failed");
            err
        })?;
        let now = civic_now();
        let Some(bytes) = fetched else {
            tracing::warn!(
                street = %query.street,
                civic = %query.civic_number,
                "portal published no schedule fragment; snapshot is empty"
            );
            return Ok(ScheduleSnapshot::empty(now));
        };
        let horizon = Horizon::starting(now.date_naive());
        let occurrences = expand_feed(&bytes, &horizon).map_err(|err| {
            tracing::error!(error = %err, "feed expansion failed");
            err
        })?;
        let snapshot = ScheduleSnapshot::assemble(occurrences, now);
        tracing::debug!(count = snapshot.all_occurrences.len(), "snapshot assembled");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::model::Category;

    const WEEKLY: &str = include_str!("expand/tests/weekly.ics");

    struct EmptyDirectory;

    #[async_trait]
    impl AddressDirectory for EmptyDirectory {
        async fn streets(&self) -> Vec<String> {
            Vec::new()
        }

        async fn civic_numbers(&self, _street: &str) -> Vec<String> {
            Vec::new()
        }
    }

    struct StaticFeed {
        payload: Option<Vec<u8>>,
    }

    #[async_trait]
    impl FeedSource for StaticFeed {
        async fn fetch_feed(
            &self,
            _query: &AddressQuery,
        ) -> Result<Option<Vec<u8>>, PortError> {
            Ok(self.payload.clone())
        }
    }

    struct RejectingFeed;

    #[async_trait]
    impl FeedSource for RejectingFeed {
        async fn fetch_feed(
            &self,
            _query: &AddressQuery,
        ) -> Result<Option<Vec<u8>>, PortError> {
            Err(PortError::InvalidAddress)
        }
    }

    fn service_with(source: Arc<dyn FeedSource>) -> RamasseService {
        RamasseService::new(Arc::new(EmptyDirectory), source)
    }

    fn query() -> AddressQuery {
        AddressQuery::new("Avenue Principale", "123")
    }

    #[test_log::test(tokio::test)]
    async fn weekly_feed_builds_a_sorted_categorized_snapshot() {
        let service = service_with(Arc::new(StaticFeed {
            payload: Some(WEEKLY.as_bytes().to_vec()),
        }));

        let snapshot = service.get_schedule(&query()).await.unwrap();

        // The fixture rule is unbounded, so a year-long horizon always holds
        // 52 or 53 Mondays regardless of when the test runs.
        let count = snapshot.all_occurrences.len();
        assert!((52..=53).contains(&count), "unexpected count {count}");
        assert_eq!(snapshot.for_category(Category::Waste).len(), count);
        assert!(snapshot
            .all_occurrences
            .iter()
            .zip(snapshot.all_occurrences.iter().skip(1))
            .all(|(earlier, later)| earlier.date <= later.date));
    }

    #[tokio::test]
    async fn categorized_lists_are_a_subset_of_the_overall_list() {
        let service = service_with(Arc::new(StaticFeed {
            payload: Some(WEEKLY.as_bytes().to_vec()),
        }));

        let snapshot = service.get_schedule(&query()).await.unwrap();
        for category in Category::ALL {
            for occurrence in snapshot.for_category(category) {
                assert!(snapshot.all_occurrences.contains(occurrence));
            }
        }
    }

    #[tokio::test]
    async fn missing_fragment_yields_an_empty_snapshot() {
        let service = service_with(Arc::new(StaticFeed { payload: None }));

        let snapshot = service.get_schedule(&query()).await.unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.by_category.len(), Category::ALL.len());
    }

    #[tokio::test]
    async fn port_errors_propagate_unchanged() {
        let service = service_with(Arc::new(RejectingFeed));

        let err = service.get_schedule(&query()).await.unwrap_err();
        assert!(matches!(err, PortError::InvalidAddress));
    }

    #[tokio::test]
    async fn malformed_feed_surfaces_a_parse_error() {
        let service = service_with(Arc::new(StaticFeed {
            payload: Some(b"pas un calendrier".to_vec()),
        }));

        let err = service.get_schedule(&query()).await.unwrap_err();
        assert!(matches!(err, PortError::Parse(_)));
    }

    #[tokio::test]
    async fn repeated_runs_agree_on_the_same_feed() {
        let service = service_with(Arc::new(StaticFeed {
            payload: Some(WEEKLY.as_bytes().to_vec()),
        }));

        let first = service.get_schedule(&query()).await.unwrap();
        let second = service.get_schedule(&query()).await.unwrap();
        assert_eq!(first.all_occurrences, second.all_occurrences);
        assert_eq!(first.by_category, second.by_category);
    }

    #[tokio::test]
    async fn directory_passthrough_preserves_degradation() {
        let service = service_with(Arc::new(StaticFeed { payload: None }));
        assert!(service.streets().await.is_empty());
        assert!(service.civic_numbers("Avenue Principale").await.is_empty());
    }
}
