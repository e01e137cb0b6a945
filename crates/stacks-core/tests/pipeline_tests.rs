//! End-to-end pipeline tests, offline: catalog records go through the
//! detector, the aggregator, and the curator against a temp data dir.

use stacks_core::config::{HarvestConfig, SessionPaths};
use stacks_core::curator::CuratedStore;
use stacks_core::detector::{self, CandidateAggregator};
use stacks_core::harvester::partition_fresh;
use stacks_core::models::{CatalogRecord, CuratedSeries, SeriesCategory};
use stacks_core::storage;
use stacks_core::tracking::TrackingStore;
use tempfile::TempDir;

fn record(key: &str, title: &str, author: &str, subjects: &[&str]) -> CatalogRecord {
    CatalogRecord {
        external_key: key.into(),
        title: title.into(),
        authors: vec![author.into()],
        subjects: subjects.iter().map(|s| s.to_string()).collect(),
        first_publish_year: Some(1951),
        publisher: Some("Gnome Press".into()),
        isbns: vec![format!("97805532{}", key.len())],
        cover_id: None,
    }
}

/// Run records through detection and aggregation as the session does.
fn aggregate(records: &[CatalogRecord], strategy: &str) -> CandidateAggregator {
    let mut aggregator = CandidateAggregator::new();
    for rec in records {
        let analysis = detector::analyze_record(rec, strategy);
        match &analysis.detection {
            Some((hit, score)) => aggregator.add(rec, hit, *score),
            None => aggregator.add_unmatched(rec),
        }
    }
    aggregator
}

#[test]
fn foundation_volumes_become_one_curated_series() {
    let dir = TempDir::new().unwrap();
    let paths = SessionPaths::new(dir.path());
    let mut curator = CuratedStore::load(&paths, HarvestConfig::PROMOTION_CONFIDENCE).unwrap();

    let records = [
        record("/works/OL1W", "Foundation", "Isaac Asimov", &["science fiction"]),
        record(
            "/works/OL2W",
            "Foundation and Empire, Book 2",
            "Isaac Asimov",
            &["science fiction"],
        ),
        record(
            "/works/OL3W",
            "Second Foundation, Book 3",
            "Isaac Asimov",
            &["science fiction"],
        ),
    ];

    let mut aggregator = aggregate(&records, "volume_patterns_advanced");
    let candidates = aggregator.drain();
    assert_eq!(candidates.len(), 1);

    let mut promoted = 0;
    for candidate in &candidates {
        if curator.promote(candidate, "volume_patterns_advanced").unwrap() {
            promoted += 1;
        }
    }
    assert_eq!(promoted, 1);

    let on_disk: Vec<CuratedSeries> = storage::read_json(&paths.curated_db).unwrap().unwrap();
    assert_eq!(on_disk.len(), 1);
    let entry = &on_disk[0];
    assert_eq!(entry.name, "Foundation");
    assert_eq!(entry.authors, vec!["Isaac Asimov".to_string()]);
    assert_eq!(entry.category, SeriesCategory::Roman);
    assert_eq!(entry.provenance.record_count, 3);
    assert!(entry.confidence_score >= HarvestConfig::PROMOTION_CONFIDENCE);
    assert!(entry.keywords.contains(&"foundation".to_string()));
    assert!(entry.title_variations.contains(&"The Foundation".to_string()));
}

#[test]
fn a_single_supporting_record_is_not_promoted() {
    let dir = TempDir::new().unwrap();
    let paths = SessionPaths::new(dir.path());
    let mut curator = CuratedStore::load(&paths, HarvestConfig::PROMOTION_CONFIDENCE).unwrap();

    let records = [record(
        "/works/OL1W",
        "Hyperion, Book 1",
        "Dan Simmons",
        &["science fiction"],
    )];
    let mut aggregator = aggregate(&records, "volume_patterns_advanced");

    for candidate in aggregator.drain() {
        assert!(!curator.promote(&candidate, "volume_patterns_advanced").unwrap());
    }
    assert!(curator.is_empty());
    // Nothing promoted, nothing written.
    assert!(!paths.curated_db.exists());
}

#[test]
fn manga_subjects_vote_the_manga_category() {
    let dir = TempDir::new().unwrap();
    let paths = SessionPaths::new(dir.path());
    let mut curator = CuratedStore::load(&paths, HarvestConfig::PROMOTION_CONFIDENCE).unwrap();

    let records = [
        record(
            "/works/OL1W",
            "One Piece, Vol. 1",
            "Eiichiro Oda",
            &["manga", "shonen"],
        ),
        record(
            "/works/OL2W",
            "One Piece, Vol. 2",
            "Eiichiro Oda",
            &["manga", "pirates"],
        ),
    ];
    let mut aggregator = aggregate(&records, "franchise_universe_scan");
    for candidate in aggregator.drain() {
        curator.promote(&candidate, "franchise_universe_scan").unwrap();
    }

    let on_disk: Vec<CuratedSeries> = storage::read_json(&paths.curated_db).unwrap().unwrap();
    assert_eq!(on_disk.len(), 1);
    assert_eq!(on_disk[0].name, "One Piece");
    assert_eq!(on_disk[0].category, SeriesCategory::Manga);
}

#[test]
fn curated_names_are_not_repromoted_in_later_sessions() {
    let dir = TempDir::new().unwrap();
    let paths = SessionPaths::new(dir.path());

    let records = [
        record("/works/OL1W", "Dune, Book 1", "Frank Herbert", &["science fiction"]),
        record("/works/OL2W", "Dune, Book 2", "Frank Herbert", &["science fiction"]),
    ];

    {
        let mut curator =
            CuratedStore::load(&paths, HarvestConfig::PROMOTION_CONFIDENCE).unwrap();
        let mut aggregator = aggregate(&records, "volume_patterns_advanced");
        let candidates = aggregator.drain();
        assert!(curator.promote(&candidates[0], "volume_patterns_advanced").unwrap());
    }

    // A fresh session reloads the database and refuses the duplicate.
    let mut curator = CuratedStore::load(&paths, HarvestConfig::PROMOTION_CONFIDENCE).unwrap();
    assert_eq!(curator.len(), 1);
    let mut aggregator = aggregate(&records, "volume_patterns_advanced");
    let candidates = aggregator.drain();
    assert!(!curator.promote(&candidates[0], "volume_patterns_advanced").unwrap());

    let on_disk: Vec<CuratedSeries> = storage::read_json(&paths.curated_db).unwrap().unwrap();
    assert_eq!(on_disk.len(), 1);
}

#[test]
fn tracking_store_shields_the_detector_across_sessions() {
    let dir = TempDir::new().unwrap();
    let paths = SessionPaths::new(dir.path());

    let batch = vec![
        record("/works/OL1W", "Dune, Book 1", "Frank Herbert", &[]),
        record("/works/OL2W", "Dune, Book 2", "Frank Herbert", &[]),
    ];

    {
        let tracking = TrackingStore::new(&paths.tracking_db).unwrap();
        for rec in &batch {
            let analysis = detector::analyze_record(rec, "volume_patterns_advanced");
            tracking.record_analysis(&analysis.book).unwrap();
        }
        // Drop flushes pending writes.
    }

    let tracking = TrackingStore::new(&paths.tracking_db).unwrap();
    let (fresh, skipped) = partition_fresh(&tracking, batch).unwrap();
    assert!(fresh.is_empty());
    assert_eq!(skipped, 2);

    let stats = tracking.stats().unwrap();
    assert_eq!(stats.total_analyzed, 2);
    assert_eq!(stats.series_found, 2);
}

#[test]
fn every_curated_write_is_preceded_by_a_backup() {
    let dir = TempDir::new().unwrap();
    let paths = SessionPaths::new(dir.path());
    let mut curator = CuratedStore::load(&paths, HarvestConfig::PROMOTION_CONFIDENCE).unwrap();

    let sets: [[CatalogRecord; 2]; 3] = [
        [
            record("/works/OL1W", "Dune, Book 1", "Frank Herbert", &[]),
            record("/works/OL2W", "Dune, Book 2", "Frank Herbert", &[]),
        ],
        [
            record("/works/OL3W", "Hyperion, Book 1", "Dan Simmons", &[]),
            record("/works/OL4W", "Hyperion, Book 2", "Dan Simmons", &[]),
        ],
        [
            record("/works/OL5W", "Earthsea, Book 1", "Ursula K. Le Guin", &[]),
            record("/works/OL6W", "Earthsea, Book 2", "Ursula K. Le Guin", &[]),
        ],
    ];

    for set in &sets {
        let mut aggregator = aggregate(set, "volume_patterns_advanced");
        for candidate in aggregator.drain() {
            curator.promote(&candidate, "volume_patterns_advanced").unwrap();
        }
    }

    // Three writes: the first had no file to back up, the next two did.
    let backups = std::fs::read_dir(&paths.backups_dir).unwrap().count();
    assert_eq!(backups, 2);
    let on_disk: Vec<CuratedSeries> = storage::read_json(&paths.curated_db).unwrap().unwrap();
    assert_eq!(on_disk.len(), 3);
}
