//! Strategy planner: enumerates query plans over the catalog search endpoint.
//!
//! Pure and deterministic, a function of the constant tables in
//! [`tables`]. Each strategy yields a named list of query strings, a
//! per-query page-size hint, and a priority used for cross-strategy
//! ordering.

pub mod tables;

use crate::error::{Result, StacksError};

/// The named mining strategies, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    VolumePatternsAdvanced,
    ProlificAuthorsDeep,
    FranchiseUniverseScan,
    GenreSeriesMining,
    PublisherSeriesDiscovery,
    YearDecadeAnalysis,
    LanguageInternational,
    AwardWinnersSeries,
    SubjectClassification,
    IsbnSystematicScan,
    CollectionAnthologyMining,
    CharacterNameAnalysis,
    TranslatorSeriesDiscovery,
    ObscurePatternsMining,
}

impl StrategyKind {
    /// All strategies, in declaration (= priority) order.
    pub const ALL: &'static [StrategyKind] = &[
        StrategyKind::VolumePatternsAdvanced,
        StrategyKind::ProlificAuthorsDeep,
        StrategyKind::FranchiseUniverseScan,
        StrategyKind::GenreSeriesMining,
        StrategyKind::PublisherSeriesDiscovery,
        StrategyKind::YearDecadeAnalysis,
        StrategyKind::LanguageInternational,
        StrategyKind::AwardWinnersSeries,
        StrategyKind::SubjectClassification,
        StrategyKind::IsbnSystematicScan,
        StrategyKind::CollectionAnthologyMining,
        StrategyKind::CharacterNameAnalysis,
        StrategyKind::TranslatorSeriesDiscovery,
        StrategyKind::ObscurePatternsMining,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::VolumePatternsAdvanced => "volume_patterns_advanced",
            StrategyKind::ProlificAuthorsDeep => "prolific_authors_deep",
            StrategyKind::FranchiseUniverseScan => "franchise_universe_scan",
            StrategyKind::GenreSeriesMining => "genre_series_mining",
            StrategyKind::PublisherSeriesDiscovery => "publisher_series_discovery",
            StrategyKind::YearDecadeAnalysis => "year_decade_analysis",
            StrategyKind::LanguageInternational => "language_international",
            StrategyKind::AwardWinnersSeries => "award_winners_series",
            StrategyKind::SubjectClassification => "subject_classification",
            StrategyKind::IsbnSystematicScan => "isbn_systematic_scan",
            StrategyKind::CollectionAnthologyMining => "collection_anthology_mining",
            StrategyKind::CharacterNameAnalysis => "character_name_analysis",
            StrategyKind::TranslatorSeriesDiscovery => "translator_series_discovery",
            StrategyKind::ObscurePatternsMining => "obscure_patterns_mining",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// Page-size hint for each query of this strategy.
    pub fn limit(&self) -> u32 {
        match self {
            StrategyKind::VolumePatternsAdvanced => 150,
            StrategyKind::ProlificAuthorsDeep => 200,
            StrategyKind::FranchiseUniverseScan => 100,
            StrategyKind::GenreSeriesMining => 120,
            StrategyKind::PublisherSeriesDiscovery => 80,
            StrategyKind::YearDecadeAnalysis => 90,
            StrategyKind::LanguageInternational => 70,
            StrategyKind::AwardWinnersSeries => 60,
            StrategyKind::SubjectClassification => 110,
            StrategyKind::IsbnSystematicScan => 50,
            StrategyKind::CollectionAnthologyMining => 85,
            StrategyKind::CharacterNameAnalysis => 75,
            StrategyKind::TranslatorSeriesDiscovery => 40,
            StrategyKind::ObscurePatternsMining => 25,
        }
    }

    /// Cross-strategy execution priority (lower runs first).
    pub fn priority(&self) -> u8 {
        match self {
            StrategyKind::VolumePatternsAdvanced => 1,
            StrategyKind::ProlificAuthorsDeep => 2,
            StrategyKind::FranchiseUniverseScan => 3,
            StrategyKind::GenreSeriesMining => 4,
            StrategyKind::PublisherSeriesDiscovery => 5,
            StrategyKind::YearDecadeAnalysis => 6,
            StrategyKind::LanguageInternational => 7,
            StrategyKind::AwardWinnersSeries => 8,
            StrategyKind::SubjectClassification => 9,
            StrategyKind::IsbnSystematicScan => 10,
            StrategyKind::CollectionAnthologyMining => 11,
            StrategyKind::CharacterNameAnalysis => 12,
            StrategyKind::TranslatorSeriesDiscovery => 13,
            StrategyKind::ObscurePatternsMining => 15,
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One strategy's worth of queries, ready for the harvester.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub strategy: StrategyKind,
    pub queries: Vec<String>,
    pub limit: u32,
    pub priority: u8,
}

/// Produce all plans in priority order.
pub fn plans() -> Vec<QueryPlan> {
    StrategyKind::ALL.iter().map(|&kind| plan_for(kind)).collect()
}

/// Produce plans restricted to the named strategies, preserving priority
/// order. Unknown names fail fast with [`StacksError::UnknownStrategy`].
pub fn plans_for(names: &[String]) -> Result<Vec<QueryPlan>> {
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let kind = StrategyKind::from_str(name)
            .ok_or_else(|| StacksError::UnknownStrategy(name.clone()))?;
        selected.push(kind);
    }
    selected.sort_by_key(|k| k.priority());
    selected.dedup();
    Ok(selected.into_iter().map(plan_for).collect())
}

/// The query list for a single strategy.
pub fn plan_for(kind: StrategyKind) -> QueryPlan {
    let queries = match kind {
        StrategyKind::VolumePatternsAdvanced => {
            let mut q = Vec::new();
            for word in tables::VOLUME_WORDS {
                for n in 1..=5 {
                    q.push(format!("\"{} {}\"", word, n));
                }
            }
            for ordinal in tables::ORDINAL_WORDS {
                q.push(format!("\"{} Volume\"", ordinal));
                q.push(format!("\"{} Book\"", ordinal));
            }
            q
        }
        StrategyKind::ProlificAuthorsDeep => tables::PROLIFIC_AUTHORS
            .iter()
            .map(|a| format!("author:\"{}\" AND series", a))
            .collect(),
        StrategyKind::FranchiseUniverseScan => tables::FRANCHISES
            .iter()
            .flat_map(|f| {
                [
                    format!("title:\"{}\"", f),
                    format!("subject:\"{}\"", f),
                ]
            })
            .collect(),
        StrategyKind::GenreSeriesMining => tables::GENRES
            .iter()
            .map(|g| format!("subject:\"{}\" AND series", g))
            .collect(),
        StrategyKind::PublisherSeriesDiscovery => tables::PUBLISHERS
            .iter()
            .map(|p| format!("publisher:\"{}\" AND series", p))
            .collect(),
        StrategyKind::YearDecadeAnalysis => tables::DECADES
            .iter()
            .map(|y| format!("publish_year:[{} TO {}] AND series", y, y + 9))
            .collect(),
        StrategyKind::LanguageInternational => tables::LANGUAGE_CODES
            .iter()
            .map(|c| format!("language:{} AND series", c))
            .collect(),
        StrategyKind::AwardWinnersSeries => tables::AWARDS
            .iter()
            .map(|a| format!("subject:\"{}\"", a))
            .collect(),
        StrategyKind::SubjectClassification => tables::SUBJECTS
            .iter()
            .map(|s| format!("subject:\"{}\" AND series", s))
            .collect(),
        StrategyKind::IsbnSystematicScan => tables::ISBN_PREFIXES
            .iter()
            .map(|p| format!("isbn:{}*", p))
            .collect(),
        StrategyKind::CollectionAnthologyMining => tables::COLLECTION_TERMS
            .iter()
            .map(|t| format!("title:\"{}\"", t))
            .collect(),
        StrategyKind::CharacterNameAnalysis => tables::CHARACTER_NAMES
            .iter()
            .map(|c| format!("title:\"{}\"", c))
            .collect(),
        StrategyKind::TranslatorSeriesDiscovery => tables::TRANSLATORS
            .iter()
            .map(|t| format!("contributor:\"{}\"", t))
            .collect(),
        StrategyKind::ObscurePatternsMining => {
            let mut q = Vec::new();
            for word in tables::OBSCURE_VOLUME_WORDS {
                for n in 1..=3 {
                    q.push(format!("\"{} {}\"", word, n));
                }
            }
            q.extend(
                tables::OBSCURE_FORMATS
                    .iter()
                    .map(|f| format!("title:\"{}\"", f)),
            );
            q
        }
    };

    QueryPlan {
        strategy: kind,
        queries,
        limit: kind.limit(),
        priority: kind.priority(),
    }
}
