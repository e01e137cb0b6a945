//! Query execution against the catalog, with politeness and dedup.
//!
//! One harvester instance serves a whole session. Each query gets a
//! randomized politeness sleep, the standard retry envelope, and its
//! results filtered against the Tracking Store so no record reaches the
//! detector twice, in this session or any earlier one.

use crate::catalog::{CatalogClient, SearchPage};
use crate::error::Result;
use crate::models::CatalogRecord;
use crate::network::{retry_async, HttpClient, RetryConfig};
use crate::tracking::TrackingStore;
use tracing::debug;

/// What one executed query yielded.
#[derive(Debug)]
pub struct QueryOutcome {
    /// Records the catalog returned, before dedup.
    pub fetched: usize,
    /// Records not seen before, in catalog order.
    pub fresh: Vec<CatalogRecord>,
    /// Records dropped as already analyzed.
    pub skipped: u64,
}

/// Executes catalog queries for a harvest session.
pub struct Harvester {
    catalog: CatalogClient,
    http: HttpClient,
    retry: RetryConfig,
}

impl Harvester {
    pub fn new(http: HttpClient, catalog: CatalogClient) -> Self {
        Self {
            catalog,
            http,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry envelope (tests, aggressive schedules).
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch one search page, politely and with retries.
    pub async fn fetch_page(&self, query: &str, limit: u32) -> Result<SearchPage> {
        self.http.politeness_sleep().await;
        retry_async(&self.retry, || self.catalog.search(query, limit)).await
    }

    /// Execute one query end to end: fetch, then drop records already in
    /// the Tracking Store by external key or by (title, author) signature.
    pub async fn run_query(
        &self,
        tracking: &TrackingStore,
        query: &str,
        limit: u32,
    ) -> Result<QueryOutcome> {
        let page = self.fetch_page(query, limit).await?;
        let fetched = page.records.len();
        let (fresh, skipped) = partition_fresh(tracking, page.records)?;

        debug!(
            target: "performance",
            query,
            fetched,
            fresh = fresh.len(),
            skipped,
            "Query executed"
        );

        Ok(QueryOutcome {
            fetched,
            fresh,
            skipped,
        })
    }
}

/// Split records into unseen ones and a count of already-analyzed ones.
pub fn partition_fresh(
    tracking: &TrackingStore,
    records: Vec<CatalogRecord>,
) -> Result<(Vec<CatalogRecord>, u64)> {
    let mut fresh = Vec::with_capacity(records.len());
    let mut skipped = 0u64;

    for record in records {
        if tracking.has_analyzed(&record.external_key)? {
            skipped += 1;
            continue;
        }
        let author = record.primary_author().unwrap_or_default();
        if tracking.has_signature(&record.title, author)? {
            skipped += 1;
            continue;
        }
        fresh.push(record);
    }

    Ok((fresh, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector;
    use tempfile::TempDir;

    fn record(key: &str, title: &str, author: &str) -> CatalogRecord {
        CatalogRecord {
            external_key: key.into(),
            title: title.into(),
            authors: vec![author.into()],
            subjects: vec![],
            first_publish_year: None,
            publisher: None,
            isbns: vec![],
            cover_id: None,
        }
    }

    #[test]
    fn test_partition_drops_known_keys_and_signatures() {
        let dir = TempDir::new().unwrap();
        let tracking = TrackingStore::new(dir.path().join("tracking.sqlite")).unwrap();

        let seen = record("/works/OL1W", "Foundation", "Isaac Asimov");
        let analysis = detector::analyze_record(&seen, "volume_patterns_advanced");
        tracking.record_analysis(&analysis.book).unwrap();
        tracking.flush().unwrap();

        let batch = vec![
            // Same key.
            seen.clone(),
            // Different key, same (title, author) signature.
            record("/works/OL9W", "foundation", "ISAAC ASIMOV"),
            // Genuinely new.
            record("/works/OL2W", "Dune", "Frank Herbert"),
        ];

        let (fresh, skipped) = partition_fresh(&tracking, batch).unwrap();
        assert_eq!(skipped, 2);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].external_key, "/works/OL2W");
    }

    #[test]
    fn test_partition_preserves_order() {
        let dir = TempDir::new().unwrap();
        let tracking = TrackingStore::new(dir.path().join("tracking.sqlite")).unwrap();

        let batch = vec![
            record("/works/OL1W", "A Title", "X"),
            record("/works/OL2W", "B Title", "Y"),
        ];
        let (fresh, skipped) = partition_fresh(&tracking, batch).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(fresh[0].external_key, "/works/OL1W");
        assert_eq!(fresh[1].external_key, "/works/OL2W");
    }
}
