//! Confidence scoring for detected series candidates.
//!
//! Scores are 0–100, stored clamped. The formula rewards explicit volume
//! numbering and record completeness, and penalizes anthology-style titles.

use super::patterns::PatternFamily;
use super::DetectionHit;
use crate::models::CatalogRecord;

const BASE_SCORE: i32 = 60;

/// Title terms that suggest a compilation rather than a series volume.
const MALUS_TERMS: &[&str] = &[
    "anthology",
    "collection",
    "best of",
    "selected",
    "complete works",
];

/// Score a detection hit against the record it came from.
pub fn score_record(hit: &DetectionHit, record: &CatalogRecord) -> u8 {
    let mut score = BASE_SCORE;

    score += volume_bonus(hit.volume);
    score += metadata_bonus(record);
    score += family_bonus(hit.family);
    score -= compilation_malus(&record.title);

    score.clamp(0, 100) as u8
}

/// Score for a record attached to a candidate without a pattern match
/// (e.g. a standalone title equal to the series name).
pub fn metadata_score(record: &CatalogRecord) -> u8 {
    (BASE_SCORE + metadata_bonus(record) - compilation_malus(&record.title)).clamp(0, 100) as u8
}

fn volume_bonus(volume: Option<u32>) -> i32 {
    match volume {
        Some(v) if (1..=50).contains(&v) => 25,
        Some(v) if v > 50 => 10,
        _ => 0,
    }
}

fn metadata_bonus(record: &CatalogRecord) -> i32 {
    let mut bonus = 0;
    if !record.subjects.is_empty() {
        bonus += 10;
    }
    if record.publisher.is_some() {
        bonus += 5;
    }
    if record.first_publish_year.is_some() {
        bonus += 5;
    }
    bonus
}

fn family_bonus(family: PatternFamily) -> i32 {
    match family {
        PatternFamily::ExplicitNumbering => 30,
        PatternFamily::CycleKeyword => 25,
        PatternFamily::ColonSubtitle => 20,
        PatternFamily::HashNumber => 20,
        PatternFamily::Trilogy
        | PatternFamily::FormatTag
        | PatternFamily::SeasonArc
        | PatternFamily::Composite => 0,
    }
}

fn compilation_malus(title: &str) -> i32 {
    let lowered = title.to_lowercase();
    let occurrences: usize = MALUS_TERMS
        .iter()
        .map(|term| lowered.matches(term).count())
        .sum();
    (occurrences as i32) * 15
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, subjects: &[&str], publisher: Option<&str>, year: Option<i32>) -> CatalogRecord {
        CatalogRecord {
            external_key: "/works/OL1W".into(),
            title: title.into(),
            authors: vec!["Isaac Asimov".into()],
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            first_publish_year: year,
            publisher: publisher.map(str::to_string),
            isbns: vec![],
            cover_id: None,
        }
    }

    fn hit(volume: Option<u32>, family: PatternFamily) -> DetectionHit {
        DetectionHit {
            series_name: "Foundation".into(),
            volume,
            pattern_name: "book_number",
            family,
        }
    }

    #[test]
    fn test_explicit_volume_with_full_metadata() {
        let r = record(
            "Foundation and Empire, Book 2",
            &["science fiction"],
            Some("Gnome Press"),
            Some(1952),
        );
        // 60 + 25 (volume) + 10 + 5 + 5 (metadata) + 30 (family) = 135 -> 100
        assert_eq!(score_record(&hit(Some(2), PatternFamily::ExplicitNumbering), &r), 100);
    }

    #[test]
    fn test_bare_title_scores_base_plus_family() {
        let r = record("Naruto: Vol. 5", &[], None, None);
        // 60 + 25 + 30 = 115 -> 100; without volume: 60 + 20 = 80
        assert_eq!(score_record(&hit(Some(5), PatternFamily::ExplicitNumbering), &r), 100);
        assert_eq!(score_record(&hit(None, PatternFamily::ColonSubtitle), &r), 80);
    }

    #[test]
    fn test_large_volume_gets_reduced_bonus() {
        let r = record("One Piece, Vol. 101", &[], None, None);
        // 60 + 10 + 30 = 100
        assert_eq!(score_record(&hit(Some(101), PatternFamily::ExplicitNumbering), &r), 100);
        // Volume 0 earns nothing: 60 + 30 = 90
        assert_eq!(score_record(&hit(Some(0), PatternFamily::ExplicitNumbering), &r), 90);
    }

    #[test]
    fn test_compilation_malus_applies_per_occurrence() {
        let r = record("The Best of the Best of Science Fiction Anthology", &[], None, None);
        // 60 + 0 (no volume) + 0 (no metadata) + 0 (composite) - 45 = 15
        assert_eq!(score_record(&hit(None, PatternFamily::Composite), &r), 15);
    }

    #[test]
    fn test_metadata_score_for_attached_records() {
        let r = record("Foundation", &["science fiction"], Some("Gnome Press"), Some(1951));
        assert_eq!(metadata_score(&r), 80);
        let bare = record("Foundation", &[], None, None);
        assert_eq!(metadata_score(&bare), 60);
    }

    #[test]
    fn test_score_never_exceeds_bounds() {
        let r = record(
            "Anthology collection best of selected complete works anthology",
            &[],
            None,
            None,
        );
        let s = score_record(&hit(None, PatternFamily::Composite), &r);
        assert_eq!(s, 0);
    }
}
