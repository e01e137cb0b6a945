//! Harvest session orchestration.
//!
//! Drives the strategy plans in priority order: execute queries, feed
//! fresh records through the detector, batch analysis rows into the
//! Tracking Store, drain candidates into the curator at each strategy
//! boundary, and checkpoint on a fixed query cadence. A failed query is
//! skipped, as is a record whose tracking write fails; a cancelled session
//! still drains, records metrics, and writes a final checkpoint.

use crate::cancel::CancellationToken;
use crate::checkpoint::CheckpointFile;
use crate::config::HarvestConfig;
use crate::curator::CuratedStore;
use crate::detector::{self, CandidateAggregator};
use crate::error::Result;
use crate::harvester::Harvester;
use crate::models::{SeriesHint, SessionStats, StrategyMetrics, TrackingStats};
use crate::planner::QueryPlan;
use crate::tracking::TrackingStore;
use chrono::Utc;
use std::time::Instant;
use tracing::{info, warn};

/// Final accounting for one session run.
#[derive(Debug)]
pub struct SessionReport {
    pub stats: SessionStats,
    /// Series promoted during this session.
    pub new_series: u64,
    pub cancelled: bool,
    /// Lifetime view over the Tracking Store.
    pub tracking: TrackingStats,
}

/// One harvest session over a set of query plans.
pub struct HarvestSession {
    harvester: Harvester,
    tracking: TrackingStore,
    curator: CuratedStore,
    checkpoint: CheckpointFile,
    cancel: CancellationToken,
    /// Stop once this many records have been processed.
    target: u64,
    stats: SessionStats,
}

impl HarvestSession {
    pub fn new(
        harvester: Harvester,
        tracking: TrackingStore,
        curator: CuratedStore,
        checkpoint: CheckpointFile,
        cancel: CancellationToken,
        target: u64,
    ) -> Self {
        Self {
            harvester,
            tracking,
            curator,
            checkpoint,
            cancel,
            target: target.max(1),
            stats: SessionStats::default(),
        }
    }

    /// Run the plans to completion, target, or cancellation.
    pub async fn run(&mut self, plans: &[QueryPlan]) -> Result<SessionReport> {
        info!(
            strategies = plans.len(),
            target = self.target,
            curated = self.curator.len(),
            "Starting harvest session"
        );
        let session_date = Utc::now().format("%Y-%m-%d").to_string();

        for plan in plans {
            if self.cancel.is_cancelled() || self.target_reached() {
                break;
            }
            self.run_strategy(plan, &session_date).await?;
        }

        self.tracking.flush()?;
        self.write_checkpoint()?;

        let report = SessionReport {
            stats: self.stats.clone(),
            new_series: self.stats.series_promoted,
            cancelled: self.cancel.is_cancelled(),
            tracking: self.tracking.stats()?,
        };
        info!(
            books = report.stats.books_processed,
            skipped = report.stats.books_skipped,
            new_series = report.new_series,
            cancelled = report.cancelled,
            "Harvest session finished"
        );
        Ok(report)
    }

    /// Promote enrichment hints into the curated database.
    pub fn apply_hints(&mut self, hints: &[SeriesHint]) -> Result<u64> {
        let mut promoted = 0u64;
        for hint in hints {
            if self.curator.promote_hint(hint)? {
                promoted += 1;
                self.stats.series_promoted += 1;
            }
        }
        Ok(promoted)
    }

    fn target_reached(&self) -> bool {
        self.stats.books_processed >= self.target
    }

    async fn run_strategy(&mut self, plan: &QueryPlan, session_date: &str) -> Result<()> {
        let strategy = plan.strategy.as_str();
        let started = Instant::now();
        let mut aggregator = CandidateAggregator::new();
        let mut books_found = 0u64;
        let mut books_analyzed = 0u64;
        let mut series_detected = 0u64;
        let mut api_calls = 0u64;

        info!(
            strategy,
            queries = plan.queries.len(),
            limit = plan.limit,
            "Starting strategy"
        );

        for query in &plan.queries {
            if self.cancel.is_cancelled() {
                info!(strategy, "Cancellation requested, closing out strategy");
                break;
            }
            if self.target_reached() {
                info!(strategy, target = self.target, "Record target reached");
                break;
            }

            api_calls += 1;
            self.stats.api_calls += 1;
            match self.harvester.run_query(&self.tracking, query, plan.limit).await {
                Ok(outcome) => {
                    books_found += outcome.fetched as u64;
                    self.stats.books_skipped += outcome.skipped;

                    for record in &outcome.fresh {
                        if self.target_reached() {
                            break;
                        }
                        let analysis = detector::analyze_record(record, strategy);
                        if let Err(e) = self.tracking.record_analysis(&analysis.book) {
                            // The key stays un-analyzed and is re-offered
                            // in a later run.
                            warn!(
                                target: "database",
                                strategy,
                                key = %record.external_key,
                                error = %e,
                                "Tracking write failed, record skipped"
                            );
                            self.stats.books_skipped += 1;
                            continue;
                        }
                        match &analysis.detection {
                            Some((hit, score)) => {
                                aggregator.add(record, hit, *score);
                                series_detected += 1;
                            }
                            None => aggregator.add_unmatched(record),
                        }
                        books_analyzed += 1;
                        self.stats.books_processed += 1;
                    }
                }
                Err(e) => {
                    // One failed query never fails the strategy.
                    warn!(target: "error", strategy, query, error = %e, "Query failed, skipping");
                }
            }

            self.stats.queries_executed += 1;
            if self.stats.queries_executed % HarvestConfig::CHECKPOINT_EVERY_QUERIES as u64 == 0 {
                self.write_checkpoint()?;
            }
        }

        for candidate in aggregator.drain() {
            if self.curator.promote(&candidate, strategy)? {
                self.stats.series_promoted += 1;
            }
        }

        let execution_time_ms = started.elapsed().as_millis() as u64;
        let success_rate = if books_analyzed > 0 {
            series_detected as f64 / books_analyzed as f64
        } else {
            0.0
        };
        self.tracking.record_strategy(&StrategyMetrics {
            strategy_name: strategy.to_string(),
            session_date: session_date.to_string(),
            books_found,
            books_analyzed,
            series_detected,
            execution_time_ms,
            api_calls,
            success_rate,
        })?;

        info!(
            target: "performance",
            strategy,
            books_found,
            books_analyzed,
            series_detected,
            execution_time_ms,
            "Strategy finished"
        );
        Ok(())
    }

    fn write_checkpoint(&self) -> Result<()> {
        self.checkpoint
            .write(&self.stats, self.stats.series_promoted)
    }
}
