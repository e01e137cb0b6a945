//! Core data model for the series discovery pipeline.
//!
//! Persistent entities (`AnalyzedBook`, `CuratedSeries`, `StrategyMetrics`,
//! `SessionCheckpoint`) carry serde derives; `CatalogRecord` and
//! `SeriesCandidate` are session-local and never hit disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single search-result entry returned by the catalog.
///
/// Absent fields are explicit absence, never default empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    /// Opaque identifier from the catalog (e.g. `/works/OL45883W`).
    pub external_key: String,
    pub title: String,
    /// Ordered author list; the first entry is the primary author.
    pub authors: Vec<String>,
    pub subjects: Vec<String>,
    pub first_publish_year: Option<i32>,
    pub publisher: Option<String>,
    pub isbns: Vec<String>,
    pub cover_id: Option<i64>,
}

impl CatalogRecord {
    /// The first listed author, if any.
    pub fn primary_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }
}

/// Durable record of a single analysis outcome. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzedBook {
    pub external_key: String,
    pub title: String,
    pub primary_author: String,
    pub analyzed_at: DateTime<Utc>,
    pub series_detected: bool,
    pub detected_series_name: Option<String>,
    /// Clamped to [0, 100].
    pub confidence: u8,
    pub processing_ms: u64,
    pub source_strategy: String,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    /// md5 of lowercased `"title|author"`, for cross-key dedup.
    pub hash_signature: String,
}

/// md5 signature of lowercased `"title|author"`.
pub fn hash_signature(title: &str, author: &str) -> String {
    let digest = md5::compute(format!(
        "{}|{}",
        title.to_lowercase(),
        author.to_lowercase()
    ));
    format!("{:x}", digest)
}

/// In-memory evidence for one (series, author) pair within a session.
///
/// Promoted or discarded when the aggregator is drained; never persisted.
#[derive(Debug, Clone)]
pub struct SeriesCandidate {
    pub series_name: String,
    pub primary_author: String,
    pub supporting_records: Vec<CatalogRecord>,
    pub confidence_scores: Vec<u8>,
    pub detection_patterns: BTreeSet<String>,
}

impl SeriesCandidate {
    pub fn new(series_name: impl Into<String>, primary_author: impl Into<String>) -> Self {
        Self {
            series_name: series_name.into(),
            primary_author: primary_author.into(),
            supporting_records: Vec::new(),
            confidence_scores: Vec::new(),
            detection_patterns: BTreeSet::new(),
        }
    }

    /// Highest confidence seen across supporting records.
    pub fn max_confidence(&self) -> u8 {
        self.confidence_scores.iter().copied().max().unwrap_or(0)
    }

    /// Mean confidence across supporting records.
    pub fn average_confidence(&self) -> f64 {
        if self.confidence_scores.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.confidence_scores.iter().map(|&c| c as u32).sum();
        sum as f64 / self.confidence_scores.len() as f64
    }
}

/// Category of a curated series, voted from subject frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesCategory {
    Roman,
    Bd,
    Manga,
}

impl SeriesCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesCategory::Roman => "roman",
            SeriesCategory::Bd => "bd",
            SeriesCategory::Manga => "manga",
        }
    }
}

impl std::fmt::Display for SeriesCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured explanation of how a curated entry was produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesProvenance {
    pub record_count: usize,
    pub detection_patterns: Vec<String>,
    pub average_confidence: f64,
    /// Up to three sample ISBNs from supporting records.
    pub isbn_samples: Vec<String>,
    /// Distinct publication years, ascending.
    pub publication_years: Vec<i32>,
}

/// An accepted series in the curated database. Append-mostly; `name` is
/// unique case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CuratedSeries {
    pub name: String,
    pub authors: Vec<String>,
    pub category: SeriesCategory,
    pub volumes_estimated: u32,
    pub keywords: Vec<String>,
    pub title_variations: Vec<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    pub source_tag: String,
    pub confidence_score: u8,
    pub detected_at: DateTime<Utc>,
    pub provenance: SeriesProvenance,
}

/// Per-strategy execution metrics, appended once per (strategy, session day).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyMetrics {
    pub strategy_name: String,
    /// Session date, `YYYY-MM-DD`.
    pub session_date: String,
    pub books_found: u64,
    pub books_analyzed: u64,
    pub series_detected: u64,
    pub execution_time_ms: u64,
    pub api_calls: u64,
    /// `series_detected / books_analyzed`, 0 when nothing was analyzed.
    pub success_rate: f64,
}

/// Running counters for one harvest session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionStats {
    pub books_processed: u64,
    pub books_skipped: u64,
    pub api_calls: u64,
    pub queries_executed: u64,
    pub series_promoted: u64,
}

/// Durable snapshot of session counters, overwritten on every write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionCheckpoint {
    pub stats: SessionStats,
    pub timestamp: DateTime<Utc>,
    pub new_series_count: u64,
}

/// A structured series hint produced by the Enrichment Service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesHint {
    pub name: String,
    pub author: String,
    /// Clamped to [0, 100].
    pub confidence: u8,
    /// `wikidata_enrichment` or `wikipedia_enrichment`.
    pub source: String,
}

/// Aggregate view over the Tracking Store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingStats {
    pub total_analyzed: u64,
    pub series_found: u64,
    pub strategies_used: u64,
    pub avg_processing_ms: f64,
    pub last_analysis: Option<DateTime<Utc>>,
    /// `series_found / total_analyzed`, 0 when the store is empty.
    pub detection_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_signature_is_case_insensitive() {
        assert_eq!(
            hash_signature("Foundation", "Isaac Asimov"),
            hash_signature("foundation", "ISAAC ASIMOV"),
        );
        assert_ne!(
            hash_signature("Foundation", "Isaac Asimov"),
            hash_signature("Foundation and Empire", "Isaac Asimov"),
        );
    }

    #[test]
    fn test_candidate_confidence_aggregates() {
        let mut candidate = SeriesCandidate::new("Foundation", "isaac asimov");
        assert_eq!(candidate.max_confidence(), 0);

        candidate.confidence_scores.extend([70, 90, 80]);
        assert_eq!(candidate.max_confidence(), 90);
        assert!((candidate.average_confidence() - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_curated_series_json_round_trip() {
        let entry = CuratedSeries {
            name: "Foundation".into(),
            authors: vec!["Isaac Asimov".into()],
            category: SeriesCategory::Roman,
            volumes_estimated: 3,
            keywords: vec!["foundation".into(), "foundation series".into()],
            title_variations: vec!["Foundation".into(), "The Foundation".into()],
            exclusions: vec![],
            source_tag: "volume_patterns_advanced".into(),
            confidence_score: 95,
            detected_at: Utc::now(),
            provenance: SeriesProvenance {
                record_count: 3,
                detection_patterns: vec!["explicit_book_number".into()],
                average_confidence: 90.0,
                isbn_samples: vec!["9780553293357".into()],
                publication_years: vec![1951, 1952, 1953],
            },
        };

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: CuratedSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
        // Re-serializing produces a JSON-equal value.
        let json2 = serde_json::to_string(&parsed).unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&json).unwrap(),
            serde_json::from_str::<serde_json::Value>(&json2).unwrap()
        );
    }

    #[test]
    fn test_category_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&SeriesCategory::Manga).unwrap(),
            "\"manga\""
        );
        let parsed: SeriesCategory = serde_json::from_str("\"bd\"").unwrap();
        assert_eq!(parsed, SeriesCategory::Bd);
    }
}
