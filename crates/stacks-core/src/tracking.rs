//! Durable tracking of analyzed records and per-strategy metrics.
//!
//! SQLite store answering "has external_key X been analyzed?" in O(log n)
//! and guaranteeing that no record is re-submitted to the Detector across
//! sessions. Single-writer, multi-reader within a session.

use crate::config::HarvestConfig;
use crate::error::{Result, StacksError};
use crate::models::{hash_signature, AnalyzedBook, StrategyMetrics, TrackingStats};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

struct TrackingInner {
    conn: Connection,
    /// Writes since the last commit. A transaction is open iff > 0.
    pending_writes: u32,
}

/// SQLite-backed Tracking Store.
///
/// Writes are batched: a commit happens at least every
/// [`HarvestConfig::COMMIT_EVERY_RECORDS`] records to bound data loss on
/// crash. Reads need no transaction and observe pending writes because they
/// share the connection.
pub struct TrackingStore {
    db_path: PathBuf,
    inner: Arc<Mutex<TrackingInner>>,
    commit_every: u32,
}

impl TrackingStore {
    /// Create or open the store at the given path.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_commit_interval(db_path, HarvestConfig::COMMIT_EVERY_RECORDS)
    }

    /// Create or open the store with a custom commit cadence.
    pub fn with_commit_interval(db_path: impl Into<PathBuf>, commit_every: u32) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StacksError::io_with_path(e, parent))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout=30000;
            PRAGMA synchronous=NORMAL;
            ",
        )?;
        Self::ensure_schema(&conn)?;

        Ok(Self {
            db_path,
            inner: Arc::new(Mutex::new(TrackingInner {
                conn,
                pending_writes: 0,
            })),
            commit_every: commit_every.max(1),
        })
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS analyzed_books (
                external_key TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                primary_author TEXT NOT NULL,
                analyzed_at TEXT NOT NULL,
                series_detected INTEGER NOT NULL,
                detected_series_name TEXT,
                confidence INTEGER NOT NULL,
                processing_ms INTEGER NOT NULL,
                source_strategy TEXT NOT NULL,
                isbn TEXT,
                publication_year INTEGER,
                hash_signature TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_analyzed_hash
                ON analyzed_books(hash_signature);

            CREATE TABLE IF NOT EXISTS strategy_metrics (
                strategy_name TEXT NOT NULL,
                session_date TEXT NOT NULL,
                books_found INTEGER NOT NULL,
                books_analyzed INTEGER NOT NULL,
                series_detected INTEGER NOT NULL,
                execution_time_ms INTEGER NOT NULL,
                api_calls INTEGER NOT NULL,
                success_rate REAL NOT NULL,
                PRIMARY KEY (strategy_name, session_date)
            );
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, TrackingInner>> {
        self.inner.lock().map_err(|_| StacksError::Database {
            message: "Failed to acquire tracking store lock".to_string(),
            source: None,
        })
    }

    /// The database path.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Check whether an external key has already been analyzed.
    pub fn has_analyzed(&self, external_key: &str) -> Result<bool> {
        let inner = self.lock()?;
        let found: Option<i64> = inner
            .conn
            .query_row(
                "SELECT 1 FROM analyzed_books WHERE external_key = ?1",
                params![external_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Check whether a (title, author) pair is known under any external key.
    pub fn has_signature(&self, title: &str, author: &str) -> Result<bool> {
        let signature = hash_signature(title, author);
        let inner = self.lock()?;
        let found: Option<i64> = inner
            .conn
            .query_row(
                "SELECT 1 FROM analyzed_books WHERE hash_signature = ?1 LIMIT 1",
                params![signature],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Upsert an analysis outcome by external key.
    ///
    /// The hash signature is computed here so callers can't record an
    /// inconsistent one. Commits are batched; call [`flush`](Self::flush) at
    /// session end.
    pub fn record_analysis(&self, book: &AnalyzedBook) -> Result<()> {
        let signature = hash_signature(&book.title, &book.primary_author);
        let mut inner = self.lock()?;

        if inner.pending_writes == 0 {
            inner.conn.execute_batch("BEGIN")?;
        }

        let result = inner.conn.execute(
            "INSERT INTO analyzed_books (external_key, title, primary_author, analyzed_at,
                                         series_detected, detected_series_name, confidence,
                                         processing_ms, source_strategy, isbn,
                                         publication_year, hash_signature)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(external_key) DO UPDATE SET
                 title=excluded.title,
                 primary_author=excluded.primary_author,
                 analyzed_at=excluded.analyzed_at,
                 series_detected=excluded.series_detected,
                 detected_series_name=excluded.detected_series_name,
                 confidence=excluded.confidence,
                 processing_ms=excluded.processing_ms,
                 source_strategy=excluded.source_strategy,
                 isbn=excluded.isbn,
                 publication_year=excluded.publication_year,
                 hash_signature=excluded.hash_signature",
            params![
                book.external_key,
                book.title,
                book.primary_author,
                book.analyzed_at.to_rfc3339(),
                book.series_detected,
                book.detected_series_name,
                book.confidence.min(100),
                book.processing_ms,
                book.source_strategy,
                book.isbn,
                book.publication_year,
                signature,
            ],
        );

        match result {
            Ok(_) => {
                inner.pending_writes += 1;
                if inner.pending_writes >= self.commit_every {
                    inner.conn.execute_batch("COMMIT")?;
                    inner.pending_writes = 0;
                    debug!(target: "database", "Committed analysis batch");
                }
                Ok(())
            }
            Err(e) => {
                // Roll back the open batch; the key stays un-analyzed and
                // will be re-offered in a later run.
                if !inner.conn.is_autocommit() {
                    let _ = inner.conn.execute_batch("ROLLBACK");
                }
                inner.pending_writes = 0;
                Err(e.into())
            }
        }
    }

    /// Append a strategy-metrics row. Re-running a strategy on the same day
    /// replaces that day's row.
    pub fn record_strategy(&self, metrics: &StrategyMetrics) -> Result<()> {
        let inner = self.lock()?;
        inner.conn.execute(
            "INSERT OR REPLACE INTO strategy_metrics
                 (strategy_name, session_date, books_found, books_analyzed,
                  series_detected, execution_time_ms, api_calls, success_rate)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                metrics.strategy_name,
                metrics.session_date,
                metrics.books_found,
                metrics.books_analyzed,
                metrics.series_detected,
                metrics.execution_time_ms,
                metrics.api_calls,
                metrics.success_rate,
            ],
        )?;
        Ok(())
    }

    /// Commit any pending analysis writes.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.pending_writes > 0 {
            inner.conn.execute_batch("COMMIT")?;
            inner.pending_writes = 0;
        }
        Ok(())
    }

    /// Aggregate statistics over everything analyzed so far.
    pub fn stats(&self) -> Result<TrackingStats> {
        let inner = self.lock()?;

        let (total_analyzed, series_found, avg_processing_ms, last_analysis): (
            u64,
            u64,
            Option<f64>,
            Option<String>,
        ) = inner.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(series_detected), 0),
                    AVG(processing_ms),
                    MAX(analyzed_at)
             FROM analyzed_books",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let strategies_used: u64 = inner.conn.query_row(
            "SELECT COUNT(DISTINCT strategy_name) FROM strategy_metrics",
            [],
            |row| row.get(0),
        )?;

        let last_analysis = last_analysis
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        let detection_rate = if total_analyzed > 0 {
            series_found as f64 / total_analyzed as f64
        } else {
            0.0
        };

        Ok(TrackingStats {
            total_analyzed,
            series_found,
            strategies_used,
            avg_processing_ms: avg_processing_ms.unwrap_or(0.0),
            last_analysis,
            detection_rate,
        })
    }
}

impl Drop for TrackingStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(target: "database", "Failed to flush tracking store on drop: {}", e);
        }
    }
}
