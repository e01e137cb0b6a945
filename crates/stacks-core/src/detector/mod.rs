//! Series detection over catalog record titles.
//!
//! Decides per record whether a title encodes a volume of a series,
//! extracts the series name, scores the evidence, and accumulates it
//! across records. The same [`detect_series_in_title`] entry point serves
//! as the lightweight check used by the library CRUD surface on user
//! titles.

pub mod aggregator;
pub mod patterns;
pub mod scoring;

pub use aggregator::CandidateAggregator;
pub use patterns::PatternFamily;

use crate::models::{AnalyzedBook, CatalogRecord};
use chrono::Utc;
use std::time::Instant;

/// Words never accepted as a series name.
pub const STOPLIST: &[&str] = &["the", "a", "an", "and", "or", "but"];

/// Candidate names shorter than this are rejected at detection time.
const MIN_NAME_CHARS: usize = 3;

/// A successful title match.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionHit {
    pub series_name: String,
    /// Explicit volume number, when the pattern captured one.
    pub volume: Option<u32>,
    pub pattern_name: &'static str,
    pub family: PatternFamily,
}

/// Outcome of analyzing one catalog record.
#[derive(Debug, Clone)]
pub struct RecordAnalysis {
    /// Row for the Tracking Store, recorded whether or not anything matched.
    pub book: AnalyzedBook,
    /// The hit and its confidence, when a candidate was extracted.
    pub detection: Option<(DetectionHit, u8)>,
}

/// Collapse whitespace and trim.
pub fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Match a title against the pattern library, first-match-wins.
///
/// Returns `None` when no pattern matches, or when the matched name is
/// shorter than three characters or a stoplist word.
pub fn detect_series_in_title(title: &str) -> Option<DetectionHit> {
    let normalized = normalize_title(title);
    if normalized.is_empty() {
        return None;
    }

    for pattern in patterns::library() {
        let Some(caps) = pattern.regex.captures(&normalized) else {
            continue;
        };

        let raw = caps.name("name").map(|m| m.as_str()).unwrap_or_default();
        let name = raw.trim().trim_end_matches([',', ':', ';', '-']).trim();

        if name.chars().count() < MIN_NAME_CHARS {
            return None;
        }
        if STOPLIST.contains(&name.to_lowercase().as_str()) {
            return None;
        }

        let volume = caps
            .name("vol")
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .or_else(|| caps.name("ord").and_then(|m| patterns::ordinal_value(m.as_str())))
            .or_else(|| caps.name("roman").and_then(|m| patterns::roman_value(m.as_str())));

        return Some(DetectionHit {
            series_name: name.to_string(),
            volume,
            pattern_name: pattern.name,
            family: pattern.family,
        });
    }

    None
}

/// Analyze one record: detect, score, and build the durable analysis row.
pub fn analyze_record(record: &CatalogRecord, source_strategy: &str) -> RecordAnalysis {
    let started = Instant::now();

    let detection = detect_series_in_title(&record.title).map(|hit| {
        let score = scoring::score_record(&hit, record);
        (hit, score)
    });

    let processing_ms = started.elapsed().as_millis() as u64;
    let primary_author = record.primary_author().unwrap_or_default().to_string();

    let book = AnalyzedBook {
        external_key: record.external_key.clone(),
        title: record.title.clone(),
        primary_author: primary_author.clone(),
        analyzed_at: Utc::now(),
        series_detected: detection.is_some(),
        detected_series_name: detection.as_ref().map(|(hit, _)| hit.series_name.clone()),
        confidence: detection.as_ref().map(|&(_, score)| score).unwrap_or(0),
        processing_ms,
        source_strategy: source_strategy.to_string(),
        isbn: record.isbns.first().cloned(),
        publication_year: record.first_publish_year,
        hash_signature: crate::models::hash_signature(&record.title, &primary_author),
    };

    RecordAnalysis { book, detection }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_explicit_volume() {
        let hit = detect_series_in_title("Second Foundation, Book 3").unwrap();
        assert_eq!(hit.series_name, "Second Foundation");
        assert_eq!(hit.volume, Some(3));
        assert_eq!(hit.family, PatternFamily::ExplicitNumbering);
    }

    #[test]
    fn test_rejects_stoplist_name() {
        assert!(detect_series_in_title("The: Book 1").is_none());
    }

    #[test]
    fn test_rejects_short_name() {
        assert!(detect_series_in_title("Ab: Book 2").is_none());
    }

    #[test]
    fn test_plain_title_has_no_hit() {
        assert!(detect_series_in_title("Foundation").is_none());
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let hit = detect_series_in_title("  Naruto:   Vol.  5 ").unwrap();
        assert_eq!(hit.series_name, "Naruto");
        assert_eq!(hit.volume, Some(5));
    }

    #[test]
    fn test_analyze_record_always_builds_a_row() {
        let record = CatalogRecord {
            external_key: "/works/OL3W".into(),
            title: "The: Book 1".into(),
            authors: vec!["Nobody".into()],
            subjects: vec![],
            first_publish_year: None,
            publisher: None,
            isbns: vec![],
            cover_id: None,
        };
        let analysis = analyze_record(&record, "volume_patterns_advanced");
        assert!(!analysis.book.series_detected);
        assert!(analysis.book.detected_series_name.is_none());
        assert_eq!(analysis.book.confidence, 0);
        assert!(analysis.detection.is_none());
        assert!(!analysis.book.hash_signature.is_empty());
    }

    #[test]
    fn test_analyze_record_with_detection() {
        let record = CatalogRecord {
            external_key: "/works/OL4W".into(),
            title: "Naruto: Vol. 2".into(),
            authors: vec!["Masashi Kishimoto".into()],
            subjects: vec!["manga".into(), "shonen".into()],
            first_publish_year: Some(2000),
            publisher: Some("Shueisha".into()),
            isbns: vec!["9781569319000".into()],
            cover_id: None,
        };
        let analysis = analyze_record(&record, "franchise_universe_scan");
        assert!(analysis.book.series_detected);
        assert_eq!(analysis.book.detected_series_name.as_deref(), Some("Naruto"));
        assert!(analysis.book.confidence >= 85);
        assert_eq!(analysis.book.isbn.as_deref(), Some("9781569319000"));
    }
}
