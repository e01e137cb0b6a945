//! Curated database: validation, promotion, and safe persistence.
//!
//! The curated database is a JSON array of accepted series, loaded once
//! per session. Promotion is gated by a fixed predicate; every write is
//! preceded by a timestamped backup of the previous file and performed
//! atomically. A failed backup aborts the write.

use crate::config::{HarvestConfig, SessionPaths};
use crate::error::{Result, StacksError};
use crate::models::{
    CuratedSeries, SeriesCandidate, SeriesCategory, SeriesHint, SeriesProvenance,
};
use crate::storage;
use chrono::Utc;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Backups kept per curated database file.
const BACKUP_KEEP: usize = 5;

/// Subject fragments that vote for the manga category.
const MANGA_TOKENS: &[&str] = &[
    "manga",
    "anime",
    "light novel",
    "shonen",
    "shojo",
    "seinen",
    "josei",
    "kodansha",
    "shogakukan",
    "shueisha",
    "viz media",
    "yen press",
];

/// Subject fragments that vote for the comic / graphic album category.
const BD_TOKENS: &[&str] = &[
    "comic",
    "graphic novel",
    "bande dessinée",
    "dargaud",
    "dupuis",
    "casterman",
    "marvel",
    "dc comics",
];

/// Why a candidate was not promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    TooFewRecords,
    LowConfidence,
    AlreadyCurated,
    NameTooShort,
    NameIsNumeric,
}

/// The curated series database, held in memory for the session.
pub struct CuratedStore {
    path: PathBuf,
    backups_dir: PathBuf,
    entries: Vec<CuratedSeries>,
    /// Lowercased names, for case-insensitive uniqueness.
    names: HashSet<String>,
    promotion_threshold: u8,
}

impl CuratedStore {
    /// Load the curated database, or start empty if the file is absent.
    pub fn load(paths: &SessionPaths, promotion_threshold: u8) -> Result<Self> {
        let entries: Vec<CuratedSeries> =
            storage::read_json(&paths.curated_db)?.unwrap_or_default();
        let names = entries
            .iter()
            .map(|e| e.name.to_lowercase())
            .collect::<HashSet<_>>();

        info!(
            target: "database",
            entries = entries.len(),
            path = %paths.curated_db.display(),
            "Loaded curated database"
        );

        Ok(Self {
            path: paths.curated_db.clone(),
            backups_dir: paths.backups_dir.clone(),
            entries,
            names,
            promotion_threshold,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive membership check.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    pub fn entries(&self) -> &[CuratedSeries] {
        &self.entries
    }

    /// Apply the promotion predicate without writing anything.
    pub fn evaluate(&self, candidate: &SeriesCandidate) -> std::result::Result<(), RejectionReason> {
        if candidate.supporting_records.len() < HarvestConfig::MIN_SUPPORTING_RECORDS {
            return Err(RejectionReason::TooFewRecords);
        }
        if candidate.max_confidence() < self.promotion_threshold {
            return Err(RejectionReason::LowConfidence);
        }
        if self.contains(&candidate.series_name) {
            return Err(RejectionReason::AlreadyCurated);
        }
        let name = candidate.series_name.trim();
        if name.chars().count() <= HarvestConfig::MIN_SERIES_NAME_LEN {
            return Err(RejectionReason::NameTooShort);
        }
        if name.chars().all(|c| c.is_ascii_digit()) {
            return Err(RejectionReason::NameIsNumeric);
        }
        Ok(())
    }

    /// Promote a candidate if it passes validation, persisting immediately.
    ///
    /// Returns `Ok(true)` when a new entry was written. Backup or write
    /// failures abort the session; the previous file is never left in a
    /// partially written state.
    pub fn promote(&mut self, candidate: &SeriesCandidate, source_tag: &str) -> Result<bool> {
        if let Err(reason) = self.evaluate(candidate) {
            debug!(
                series = %candidate.series_name,
                ?reason,
                records = candidate.supporting_records.len(),
                max_confidence = candidate.max_confidence(),
                "Candidate rejected"
            );
            return Ok(false);
        }

        let entry = build_entry(candidate, source_tag);
        info!(
            series = %entry.name,
            category = %entry.category,
            confidence = entry.confidence_score,
            records = entry.provenance.record_count,
            "Promoting series to curated database"
        );

        self.append_and_persist(entry)?;
        Ok(true)
    }

    /// Promote an enrichment hint, bypassing the multi-record requirement.
    ///
    /// Hints come pre-filtered by confidence; only name uniqueness and the
    /// basic name checks apply.
    pub fn promote_hint(&mut self, hint: &SeriesHint) -> Result<bool> {
        let name = hint.name.trim();
        if self.contains(name)
            || name.chars().count() <= HarvestConfig::MIN_SERIES_NAME_LEN
            || name.chars().all(|c| c.is_ascii_digit())
        {
            return Ok(false);
        }

        let entry = CuratedSeries {
            name: name.to_string(),
            authors: if hint.author.is_empty() {
                Vec::new()
            } else {
                vec![hint.author.clone()]
            },
            category: SeriesCategory::Roman,
            volumes_estimated: 0,
            keywords: vec![name.to_lowercase()],
            title_variations: vec![name.to_string()],
            exclusions: Vec::new(),
            source_tag: hint.source.clone(),
            confidence_score: hint.confidence,
            detected_at: Utc::now(),
            provenance: SeriesProvenance {
                record_count: 0,
                detection_patterns: vec![hint.source.clone()],
                average_confidence: hint.confidence as f64,
                isbn_samples: Vec::new(),
                publication_years: Vec::new(),
            },
        };

        info!(
            series = %entry.name,
            source = %hint.source,
            confidence = hint.confidence,
            "Promoting enrichment hint"
        );
        self.append_and_persist(entry)?;
        Ok(true)
    }

    fn append_and_persist(&mut self, entry: CuratedSeries) -> Result<()> {
        self.backup_current()?;

        let name_lower = entry.name.to_lowercase();
        self.entries.push(entry);

        storage::write_json_atomic(&self.path, &self.entries).map_err(|e| {
            // Roll the in-memory state back so a retried session stays
            // consistent with the file.
            self.entries.pop();
            StacksError::CuratedWrite {
                message: e.to_string(),
                path: self.path.clone(),
            }
        })?;

        self.names.insert(name_lower);
        Ok(())
    }

    /// Copy the current database file into the backups directory with a
    /// timestamp suffix, pruning old backups beyond [`BACKUP_KEEP`].
    fn backup_current(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        fs::create_dir_all(&self.backups_dir).map_err(|e| StacksError::BackupFailed {
            message: e.to_string(),
            path: self.backups_dir.clone(),
        })?;

        let stem = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "series_database.json".to_string());
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        let mut backup_path = self.backups_dir.join(format!("{}.backup-{}", stem, stamp));
        // Several promotions can land within one second.
        let mut n = 1;
        while backup_path.exists() {
            backup_path = self
                .backups_dir
                .join(format!("{}.backup-{}-{}", stem, stamp, n));
            n += 1;
        }

        fs::copy(&self.path, &backup_path).map_err(|e| StacksError::BackupFailed {
            message: e.to_string(),
            path: backup_path.clone(),
        })?;
        debug!(target: "database", "Backed up curated database to {}", backup_path.display());

        self.prune_backups(&stem);
        Ok(())
    }

    fn prune_backups(&self, stem: &str) {
        let Ok(dir) = fs::read_dir(&self.backups_dir) else {
            return;
        };
        let prefix = format!("{}.backup-", stem);
        let mut backups: Vec<PathBuf> = dir
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().starts_with(&prefix))
                    .unwrap_or(false)
            })
            .collect();
        if backups.len() <= BACKUP_KEEP {
            return;
        }
        // Timestamp suffixes sort lexicographically; oldest first.
        backups.sort();
        for stale in &backups[..backups.len() - BACKUP_KEEP] {
            if let Err(e) = fs::remove_file(stale) {
                warn!("Failed to prune backup {}: {}", stale.display(), e);
            }
        }
    }
}

/// Build the curated entry for a validated candidate.
fn build_entry(candidate: &SeriesCandidate, source_tag: &str) -> CuratedSeries {
    let name = candidate.series_name.trim().to_string();
    let category = vote_category(candidate);

    CuratedSeries {
        name: name.clone(),
        authors: if candidate.primary_author.is_empty() {
            Vec::new()
        } else {
            vec![candidate.primary_author.clone()]
        },
        category,
        volumes_estimated: candidate.supporting_records.len() as u32,
        keywords: build_keywords(&name, candidate),
        title_variations: build_variations(&name),
        exclusions: Vec::new(),
        source_tag: source_tag.to_string(),
        confidence_score: candidate.max_confidence(),
        detected_at: Utc::now(),
        provenance: build_provenance(candidate),
    }
}

/// Vote a category from subject fragments across supporting records.
///
/// Manga needs a strict majority over bd and at least two votes; bd needs
/// at least two votes; everything else is a prose series.
fn vote_category(candidate: &SeriesCandidate) -> SeriesCategory {
    let mut manga = 0usize;
    let mut bd = 0usize;

    for record in &candidate.supporting_records {
        for subject in &record.subjects {
            let lowered = subject.to_lowercase();
            if MANGA_TOKENS.iter().any(|t| lowered.contains(t)) {
                manga += 1;
            }
            if BD_TOKENS.iter().any(|t| lowered.contains(t)) {
                bd += 1;
            }
        }
    }

    if manga > bd && manga >= 2 {
        SeriesCategory::Manga
    } else if bd >= 2 {
        SeriesCategory::Bd
    } else {
        SeriesCategory::Roman
    }
}

/// Lowercased search keywords, capped and deduplicated.
fn build_keywords(name: &str, candidate: &SeriesCandidate) -> Vec<String> {
    let base = name.to_lowercase();
    let mut keywords = vec![
        base.clone(),
        format!("{} series", base),
        format!("{} saga", base),
        format!("the {}", base),
        format!("{} collection", base),
    ];

    // Short author names contribute their family name.
    let author = &candidate.primary_author;
    let author_tokens: Vec<&str> = author.split_whitespace().collect();
    if author_tokens.len() <= 3 {
        if let Some(last) = author_tokens.last() {
            if last.chars().count() > 2 {
                keywords.push(last.to_lowercase());
            }
        }
    }

    // The most recurrent meaningful subjects across supporting records.
    let mut subject_counts: Vec<(String, usize)> = Vec::new();
    for record in &candidate.supporting_records {
        for subject in &record.subjects {
            let lowered = subject.to_lowercase();
            match subject_counts.iter_mut().find(|(s, _)| *s == lowered) {
                Some((_, count)) => *count += 1,
                None => subject_counts.push((lowered, 1)),
            }
        }
    }
    subject_counts.retain(|(s, count)| *count > 1 && s.chars().count() > 3);
    subject_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    keywords.extend(subject_counts.into_iter().take(3).map(|(s, _)| s));

    let mut seen = HashSet::new();
    keywords.retain(|k| seen.insert(k.clone()));
    keywords.truncate(HarvestConfig::MAX_KEYWORDS);
    keywords
}

/// Title variations used for shelf matching, capped.
fn build_variations(name: &str) -> Vec<String> {
    let mut variations = vec![name.to_string()];

    // Toggle the leading article.
    if let Some(stripped) = name.strip_prefix("The ") {
        variations.push(stripped.to_string());
    } else {
        variations.push(format!("The {}", name));
    }

    variations.push(format!("{} Series", name));
    variations.push(format!("{} Saga", name));
    variations.push(format!("{} Chronicles", name));
    variations.push(format!("{} Collection", name));

    let mut seen = HashSet::new();
    variations.retain(|v| seen.insert(v.clone()));
    variations.truncate(HarvestConfig::MAX_VARIATIONS);
    variations
}

fn build_provenance(candidate: &SeriesCandidate) -> SeriesProvenance {
    let isbn_samples: Vec<String> = candidate
        .supporting_records
        .iter()
        .filter_map(|r| r.isbns.first().cloned())
        .take(HarvestConfig::MAX_ISBN_SAMPLES)
        .collect();

    let mut publication_years: Vec<i32> = candidate
        .supporting_records
        .iter()
        .filter_map(|r| r.first_publish_year)
        .collect();
    publication_years.sort_unstable();
    publication_years.dedup();

    SeriesProvenance {
        record_count: candidate.supporting_records.len(),
        detection_patterns: candidate.detection_patterns.iter().cloned().collect(),
        average_confidence: candidate.average_confidence(),
        isbn_samples,
        publication_years,
    }
}
