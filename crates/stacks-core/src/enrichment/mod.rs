//! Series enrichment from external knowledge bases.
//!
//! Two read-only sources produce [`SeriesHint`]s: structured Wikidata
//! SPARQL queries and prose extraction from Wikipedia summaries. Hints
//! are deduplicated by lowercased name (highest confidence wins) and
//! only forwarded above the enrichment confidence threshold. A failure
//! in one source never blocks the other.

pub mod wikidata;
pub mod wikipedia;

pub use wikidata::WikidataClient;
pub use wikipedia::WikipediaClient;

use crate::config::HarvestConfig;
use crate::error::Result;
use crate::models::SeriesHint;
use crate::network::HttpClient;
use std::collections::HashMap;
use tracing::warn;

/// Keep one hint per lowercased name, preferring the highest confidence.
pub fn dedup_hints(hints: Vec<SeriesHint>) -> Vec<SeriesHint> {
    let mut best: HashMap<String, SeriesHint> = HashMap::new();
    for hint in hints {
        let key = hint.name.to_lowercase();
        match best.get(&key) {
            Some(existing) if existing.confidence >= hint.confidence => {}
            _ => {
                best.insert(key, hint);
            }
        }
    }
    let mut result: Vec<SeriesHint> = best.into_values().collect();
    result.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| a.name.cmp(&b.name))
    });
    result
}

/// Drop hints below the forwarding threshold.
pub fn filter_hints(hints: Vec<SeriesHint>, threshold: u8) -> Vec<SeriesHint> {
    hints
        .into_iter()
        .filter(|h| h.confidence >= threshold)
        .collect()
}

/// Facade over both enrichment sources.
pub struct EnrichmentService {
    wikidata: WikidataClient,
    wikipedia: WikipediaClient,
}

impl EnrichmentService {
    pub fn new(http: HttpClient) -> Self {
        Self {
            wikidata: WikidataClient::new(http.clone()),
            wikipedia: WikipediaClient::new(http),
        }
    }

    pub fn wikidata(&self) -> &WikidataClient {
        &self.wikidata
    }

    pub fn wikipedia(&self) -> &WikipediaClient {
        &self.wikipedia
    }

    /// All forwardable series hints for an author, both sources combined.
    pub async fn author_hints(&self, author: &str) -> Result<Vec<SeriesHint>> {
        let mut hints = Vec::new();

        match self.wikidata.author_series_hints(author).await {
            Ok(found) => hints.extend(found),
            Err(e) => warn!(target: "error", author, error = %e, "Wikidata enrichment failed"),
        }
        match self.wikipedia.author_series_hints(author).await {
            Ok(found) => hints.extend(found),
            Err(e) => warn!(target: "error", author, error = %e, "Wikipedia enrichment failed"),
        }

        Ok(filter_hints(
            dedup_hints(hints),
            HarvestConfig::ENRICHMENT_CONFIDENCE,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(name: &str, confidence: u8, source: &str) -> SeriesHint {
        SeriesHint {
            name: name.into(),
            author: "Terry Pratchett".into(),
            confidence,
            source: source.into(),
        }
    }

    #[test]
    fn test_dedup_keeps_highest_confidence() {
        let hints = vec![
            hint("Discworld", 88, "wikipedia_enrichment"),
            hint("discworld", 90, "wikidata_enrichment"),
            hint("Long Earth", 86, "wikipedia_enrichment"),
        ];
        let deduped = dedup_hints(hints);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].name, "discworld");
        assert_eq!(deduped[0].confidence, 90);
        assert_eq!(deduped[0].source, "wikidata_enrichment");
    }

    #[test]
    fn test_filter_applies_threshold_inclusively() {
        let hints = vec![hint("A Series", 85, "s"), hint("B Series", 84, "s")];
        let kept = filter_hints(hints, 85);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "A Series");
    }
}
