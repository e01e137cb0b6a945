//! Centralized configuration for the Stacks pipeline.
//!
//! Constant tables for network politeness, harvest thresholds, and the
//! on-disk layout of session state.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "Stacks";
    pub const USER_AGENT: &'static str =
        concat!("stacks-harvester/", env!("CARGO_PKG_VERSION"));
    pub const LOG_FILE_MAX_BYTES: u64 = 10_485_760; // 10MB
    pub const LOG_FILE_BACKUP_COUNT: u32 = 5;
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
    /// Idle connections kept per host; the aggregate pool stays under 50
    /// because the pipeline talks to at most a handful of hosts.
    pub const POOL_MAX_IDLE_PER_HOST: usize = 10;
    pub const MAX_RETRIES: u32 = 3;

    /// Randomized politeness sleep between catalog requests.
    pub const POLITENESS_MIN: Duration = Duration::from_millis(50);
    pub const POLITENESS_MAX: Duration = Duration::from_millis(150);
    /// Fallback pushback sleep when a 429 carries no Retry-After header.
    pub const RATE_LIMIT_FALLBACK: Duration = Duration::from_secs(5);

    pub const DEFAULT_CATALOG_BASE: &'static str = "https://openlibrary.org";

    pub const SPARQL_ENDPOINT: &'static str = "https://query.wikidata.org/sparql";
    /// Minimum gap between SPARQL requests.
    pub const SPARQL_MIN_GAP: Duration = Duration::from_millis(500);
    pub const SPARQL_TIMEOUT: Duration = Duration::from_secs(10);
    pub const SPARQL_CACHE_TTL: Duration = Duration::from_secs(3 * 60 * 60);

    pub const WIKIPEDIA_LANG: &'static str = "en";
}

/// Harvest session thresholds and cadences.
pub struct HarvestConfig;

impl HarvestConfig {
    /// Default per-session record target.
    pub const DEFAULT_TARGET: u64 = 100_000;
    /// Default promotion confidence threshold (CLI-overridable).
    pub const PROMOTION_CONFIDENCE: u8 = 75;
    /// Enrichment hints below this confidence are not forwarded.
    pub const ENRICHMENT_CONFIDENCE: u8 = 85;
    /// Checkpoint cadence, in queries.
    pub const CHECKPOINT_EVERY_QUERIES: u32 = 25;
    /// Tracking Store commit cadence, in records.
    pub const COMMIT_EVERY_RECORDS: u32 = 25;
    /// Candidates need at least this many supporting records.
    pub const MIN_SUPPORTING_RECORDS: usize = 2;
    /// Series names shorter than this are rejected.
    pub const MIN_SERIES_NAME_LEN: usize = 3;
    /// Keyword list cap per curated entry.
    pub const MAX_KEYWORDS: usize = 10;
    /// Title-variation list cap per curated entry.
    pub const MAX_VARIATIONS: usize = 6;
    /// ISBN samples kept in provenance.
    pub const MAX_ISBN_SAMPLES: usize = 3;
}

/// Resolved on-disk layout for a harvest session.
///
/// Every path can be overridden individually; `new` applies the standard
/// layout under a single data directory.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    /// Curated series database (JSON array).
    pub curated_db: PathBuf,
    /// Tracking Store (SQLite).
    pub tracking_db: PathBuf,
    /// Session checkpoint (JSON, last-writer-wins).
    pub checkpoint: PathBuf,
    /// Directory receiving timestamped curated-db backups.
    pub backups_dir: PathBuf,
    /// Structured log file.
    pub log_file: PathBuf,
}

impl SessionPaths {
    /// Standard layout under `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            curated_db: dir.join("series_database.json"),
            tracking_db: dir.join("tracking.sqlite"),
            checkpoint: dir.join("session_checkpoint.json"),
            backups_dir: dir.join("backups"),
            log_file: dir.join("logs").join("harvest.log"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_politeness_window_is_sane() {
        assert!(NetworkConfig::POLITENESS_MIN < NetworkConfig::POLITENESS_MAX);
        assert!(NetworkConfig::REQUEST_TIMEOUT > NetworkConfig::CONNECT_TIMEOUT);
    }

    #[test]
    fn test_session_paths_layout() {
        let paths = SessionPaths::new("/data/stacks");
        assert!(paths.curated_db.ends_with("series_database.json"));
        assert!(paths.tracking_db.ends_with("tracking.sqlite"));
        assert!(paths.backups_dir.ends_with("backups"));
    }
}
