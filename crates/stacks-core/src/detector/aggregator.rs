//! Session-local candidate accumulation.
//!
//! Detection hits stream in per record; the aggregator keys them by
//! `(series name, primary author)` lowercased and merges related names at
//! drain time. Volumes of one series often extract slightly different
//! names (`Foundation and Empire` vs `Second Foundation`), so draining
//! also merges same-author candidates that share a significant name token
//! and attaches undetected records whose whole title equals a candidate
//! name.

use super::{scoring, DetectionHit, STOPLIST};
use crate::models::{CatalogRecord, SeriesCandidate};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Minimum character length for a merge token.
const MIN_TOKEN_CHARS: usize = 4;

/// Name tokens too generic to merge on, beyond the detection stoplist.
const MERGE_STOPWORDS: &[&str] = &[
    "book", "part", "volume", "series", "saga", "tales", "chronicles", "first", "second", "third",
    "fourth", "fifth",
];

/// Pattern name recorded for records attached by exact-title match.
const TITLE_MATCH_PATTERN: &str = "title_exact_match";

/// Accumulates per-record detection evidence for one session.
#[derive(Debug, Default)]
pub struct CandidateAggregator {
    candidates: HashMap<(String, String), SeriesCandidate>,
    unmatched: Vec<CatalogRecord>,
}

impl CandidateAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Fold one detection hit into its candidate.
    ///
    /// The same catalog record may arrive again from another query; its
    /// evidence is only counted once per candidate.
    pub fn add(&mut self, record: &CatalogRecord, hit: &DetectionHit, score: u8) {
        let author = record.primary_author().unwrap_or_default();
        let key = (hit.series_name.to_lowercase(), author.to_lowercase());

        let candidate = self
            .candidates
            .entry(key)
            .or_insert_with(|| SeriesCandidate::new(hit.series_name.clone(), author));

        if candidate
            .supporting_records
            .iter()
            .any(|r| r.external_key == record.external_key)
        {
            return;
        }

        candidate.supporting_records.push(record.clone());
        candidate.confidence_scores.push(score);
        candidate
            .detection_patterns
            .insert(hit.pattern_name.to_string());
    }

    /// Remember a record no pattern matched. At drain time it may still
    /// support a candidate whose name equals the whole title.
    pub fn add_unmatched(&mut self, record: &CatalogRecord) {
        self.unmatched.push(record.clone());
    }

    /// Close out the session's evidence: merge related candidates, attach
    /// exact-title records, and return the final candidate list. The
    /// aggregator is left empty.
    pub fn drain(&mut self) -> Vec<SeriesCandidate> {
        let candidates: Vec<SeriesCandidate> =
            std::mem::take(&mut self.candidates).into_values().collect();
        let unmatched = std::mem::take(&mut self.unmatched);

        let mut merged = merge_related(candidates);
        attach_unmatched(&mut merged, unmatched);

        merged.sort_by(|a, b| {
            b.supporting_records
                .len()
                .cmp(&a.supporting_records.len())
                .then_with(|| a.series_name.cmp(&b.series_name))
        });
        merged
    }
}

/// Merge same-author candidates that share a significant name token.
///
/// The merged candidate takes the shared token as its name, with casing
/// recovered from a supporting title.
fn merge_related(candidates: Vec<SeriesCandidate>) -> Vec<SeriesCandidate> {
    let mut by_author: BTreeMap<String, Vec<SeriesCandidate>> = BTreeMap::new();
    for candidate in candidates {
        by_author
            .entry(candidate.primary_author.to_lowercase())
            .or_default()
            .push(candidate);
    }

    let mut result = Vec::new();
    for (_, group) in by_author {
        result.extend(merge_author_group(group));
    }
    result
}

fn merge_author_group(group: Vec<SeriesCandidate>) -> Vec<SeriesCandidate> {
    if group.len() < 2 {
        return group;
    }

    // Count candidates per significant token.
    let mut token_counts: BTreeMap<String, usize> = BTreeMap::new();
    for candidate in &group {
        for token in significant_tokens(&candidate.series_name) {
            *token_counts.entry(token).or_default() += 1;
        }
    }

    let mut shared: Vec<(String, usize)> = token_counts
        .into_iter()
        .filter(|&(_, count)| count >= 2)
        .collect();
    // Most widely shared token first; ties break alphabetically.
    shared.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut remaining = group;
    let mut result = Vec::new();

    for (token, _) in shared {
        let (matching, rest): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|c| significant_tokens(&c.series_name).contains(&token));
        remaining = rest;

        match matching.len() {
            0 => continue,
            1 => remaining.extend(matching),
            _ => {
                debug!(
                    token,
                    merged = matching.len(),
                    "Merging related series candidates"
                );
                result.push(merge_into_one(&token, matching));
            }
        }
    }

    result.extend(remaining);
    result
}

/// Collapse candidates into one named after the shared token.
fn merge_into_one(token: &str, parts: Vec<SeriesCandidate>) -> SeriesCandidate {
    let author = parts[0].primary_author.clone();
    let name = parts
        .iter()
        .flat_map(|c| c.supporting_records.iter())
        .find_map(|r| cased_token(&r.title, token))
        .or_else(|| parts.iter().find_map(|c| cased_token(&c.series_name, token)))
        .unwrap_or_else(|| token.to_string());

    let mut merged = SeriesCandidate::new(name, author);
    for part in parts {
        for (record, score) in part
            .supporting_records
            .into_iter()
            .zip(part.confidence_scores)
        {
            if merged
                .supporting_records
                .iter()
                .any(|r| r.external_key == record.external_key)
            {
                continue;
            }
            merged.supporting_records.push(record);
            merged.confidence_scores.push(score);
        }
        merged.detection_patterns.extend(part.detection_patterns);
    }
    merged
}

/// Attach undetected records whose normalized title equals a candidate
/// name, author permitting.
fn attach_unmatched(candidates: &mut [SeriesCandidate], unmatched: Vec<CatalogRecord>) {
    for record in unmatched {
        let title_lower = super::normalize_title(&record.title).to_lowercase();
        let author_lower = record.primary_author().unwrap_or_default().to_lowercase();

        let Some(candidate) = candidates.iter_mut().find(|c| {
            c.series_name.to_lowercase() == title_lower
                && (author_lower.is_empty() || c.primary_author.to_lowercase() == author_lower)
        }) else {
            continue;
        };

        if candidate
            .supporting_records
            .iter()
            .any(|r| r.external_key == record.external_key)
        {
            continue;
        }

        let score = scoring::metadata_score(&record);
        candidate.confidence_scores.push(score);
        candidate.supporting_records.push(record);
        candidate
            .detection_patterns
            .insert(TITLE_MATCH_PATTERN.to_string());
    }
}

/// Lowercased name tokens eligible for merging.
fn significant_tokens(name: &str) -> Vec<String> {
    name.split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|t| !STOPLIST.contains(&t.as_str()))
        .filter(|t| !MERGE_STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Find `token` case-insensitively in `text` and return it as written.
fn cased_token(text: &str, token: &str) -> Option<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .find(|t| t.to_lowercase() == token)
        .map(str::to_string)
}
