//! The ordered series-title pattern library.
//!
//! Patterns are data: each entry pairs a precompiled regex with a family
//! used by the scorer. Evaluation is first-match-wins, so the explicit
//! numbering forms sit ahead of the generic subtitle splitters.

use regex::Regex;
use std::sync::OnceLock;

/// Family of a title pattern; drives the confidence bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternFamily {
    /// `Vol./Volume/Tome/Book/Part/Episode/Chapter N`, foreign volume
    /// words, roman numerals, ordinal-book forms.
    ExplicitNumbering,
    /// `#N` suffix.
    HashNumber,
    /// Colon or dash subtitle split.
    ColonSubtitle,
    /// series/saga/cycle/chronicles/collection keyword.
    CycleKeyword,
    /// trilogy/tetralogy/quartet/quintet tail.
    Trilogy,
    /// Parenthetical format tag (manga, light novel, ...).
    FormatTag,
    /// Season/arc/year numbering.
    SeasonArc,
    /// Author-title composite (`Asimov's Foundation`).
    Composite,
}

/// One entry of the pattern library.
pub struct SeriesPattern {
    pub name: &'static str,
    pub family: PatternFamily,
    pub regex: Regex,
}

fn pattern(name: &'static str, family: PatternFamily, re: &str) -> SeriesPattern {
    SeriesPattern {
        name,
        family,
        // The library is static; a bad pattern is a programming error.
        regex: Regex::new(re).unwrap_or_else(|e| panic!("invalid pattern {}: {}", name, e)),
    }
}

/// The compiled library, built once.
pub fn library() -> &'static [SeriesPattern] {
    static LIBRARY: OnceLock<Vec<SeriesPattern>> = OnceLock::new();
    LIBRARY.get_or_init(|| {
        use PatternFamily::*;
        vec![
            pattern(
                "volume_number",
                ExplicitNumbering,
                r"(?i)^(?P<name>.+?)[,:]?\s+vol(?:ume)?\.?\s*(?P<vol>\d+)\b",
            ),
            pattern(
                "tome_number",
                ExplicitNumbering,
                r"(?i)^(?P<name>.+?)[,:]?\s+tome\s+(?P<vol>\d+)\b",
            ),
            pattern(
                "book_number",
                ExplicitNumbering,
                r"(?i)^(?P<name>.+?)[,:]?\s+book\s+(?P<vol>\d+)\b",
            ),
            pattern(
                "part_number",
                ExplicitNumbering,
                r"(?i)^(?P<name>.+?)[,:]?\s+part\s+(?P<vol>\d+)\b",
            ),
            pattern(
                "episode_number",
                ExplicitNumbering,
                r"(?i)^(?P<name>.+?)[,:]?\s+episode\s+(?P<vol>\d+)\b",
            ),
            pattern(
                "chapter_number",
                ExplicitNumbering,
                r"(?i)^(?P<name>.+?)[,:]?\s+chapter\s+(?P<vol>\d+)\b",
            ),
            pattern(
                "foreign_volume",
                ExplicitNumbering,
                r"(?i)^(?P<name>.+?)[,:]?\s+(?:band|teil|parte|deel|bind)\s+(?P<vol>\d+)\b",
            ),
            pattern(
                "hash_number",
                HashNumber,
                r"^(?P<name>.+?)\s*#(?P<vol>\d+)\b",
            ),
            pattern(
                "ordinal_book_of",
                ExplicitNumbering,
                r"(?i)^the\s+(?P<ord>first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth)\s+book\s+of\s+(?:the\s+)?(?P<name>.+)$",
            ),
            pattern(
                "roman_numeral",
                ExplicitNumbering,
                r"^(?P<name>.+?)\s+(?P<roman>II|III|IV|V|VI|VII|VIII|IX|X)$",
            ),
            pattern(
                "series_keyword",
                CycleKeyword,
                r"(?i)^(?:the\s+)?(?P<name>.+?)\s+series\b",
            ),
            pattern(
                "saga_keyword",
                CycleKeyword,
                r"(?i)^(?:the\s+)?(?P<name>.+?)\s+saga\b",
            ),
            pattern(
                "chronicles_keyword",
                CycleKeyword,
                r"(?i)^(?:the\s+)?(?P<name>.+?)\s+chronicles\b",
            ),
            pattern(
                "cycle_keyword",
                CycleKeyword,
                r"(?i)^(?:the\s+)?(?P<name>.+?)\s+cycle\b",
            ),
            pattern(
                "collection_keyword",
                CycleKeyword,
                r"(?i)^(?:the\s+)?(?P<name>.+?)\s+collection\b",
            ),
            pattern(
                "keyword_of",
                CycleKeyword,
                r"(?i)^(?:the\s+)?(?:chronicles|tales|legends|saga)\s+of\s+(?:the\s+)?(?P<name>.+)$",
            ),
            pattern(
                "trilogy_tail",
                Trilogy,
                r"(?i)^(?:the\s+)?(?P<name>.+?)\s+(?:trilogy|tetralogy|quartet|quintet)\b",
            ),
            pattern(
                "season_number",
                SeasonArc,
                r"(?i)^(?P<name>.+?)[,:]?\s+season\s+(?P<vol>\d+)\b",
            ),
            pattern(
                "arc_number",
                SeasonArc,
                r"(?i)^(?P<name>.+?)[,:]?\s+(?:arc|year)\s+(?P<vol>\d+)\b",
            ),
            pattern(
                "format_tag",
                FormatTag,
                r"(?i)^(?P<name>.+?)\s*\((?:manga|light novel|graphic novel|comics?)\)",
            ),
            pattern(
                "possessive_composite",
                Composite,
                r"^(?P<owner>[A-Z][A-Za-z.]+)'s\s+(?P<name>.+)$",
            ),
            pattern(
                "colon_subtitle",
                ColonSubtitle,
                r"^(?P<name>[^:]{3,}?):\s+.+$",
            ),
            pattern(
                "dash_subtitle",
                ColonSubtitle,
                r"^(?P<name>.{3,}?)\s+[-\u{2013}]\s+.+$",
            ),
        ]
    })
}

/// Numeric value of a captured ordinal word.
pub fn ordinal_value(word: &str) -> Option<u32> {
    let value = match word.to_lowercase().as_str() {
        "first" => 1,
        "second" => 2,
        "third" => 3,
        "fourth" => 4,
        "fifth" => 5,
        "sixth" => 6,
        "seventh" => 7,
        "eighth" => 8,
        "ninth" => 9,
        "tenth" => 10,
        _ => return None,
    };
    Some(value)
}

/// Numeric value of a captured roman numeral (II through X).
pub fn roman_value(numeral: &str) -> Option<u32> {
    let value = match numeral {
        "II" => 2,
        "III" => 3,
        "IV" => 4,
        "V" => 5,
        "VI" => 6,
        "VII" => 7,
        "VIII" => 8,
        "IX" => 9,
        "X" => 10,
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_match(title: &str) -> Option<(&'static str, String)> {
        for p in library() {
            if let Some(caps) = p.regex.captures(title) {
                return Some((p.name, caps["name"].to_string()));
            }
        }
        None
    }

    #[test]
    fn test_explicit_numbering_wins_over_subtitle() {
        let (name, captured) = first_match("Naruto: Vol. 5").unwrap();
        assert_eq!(name, "volume_number");
        assert_eq!(captured, "Naruto");
    }

    #[test]
    fn test_book_number_with_comma() {
        let (name, captured) = first_match("Foundation and Empire, Book 2").unwrap();
        assert_eq!(name, "book_number");
        assert_eq!(captured, "Foundation and Empire");
    }

    #[test]
    fn test_keyword_of_form() {
        let (name, captured) = first_match("The Chronicles of Amber").unwrap();
        assert_eq!(name, "keyword_of");
        assert_eq!(captured, "Amber");
    }

    #[test]
    fn test_series_keyword_strips_article() {
        let (name, captured) = first_match("The Dark Tower Series").unwrap();
        assert_eq!(name, "series_keyword");
        assert_eq!(captured, "Dark Tower");
    }

    #[test]
    fn test_hash_number() {
        let (name, captured) = first_match("Saga #12").unwrap();
        assert_eq!(name, "hash_number");
        assert_eq!(captured, "Saga");
    }

    #[test]
    fn test_colon_subtitle_is_a_fallback() {
        let (name, captured) = first_match("Dune: The Machine Crusade").unwrap();
        assert_eq!(name, "colon_subtitle");
        assert_eq!(captured, "Dune");
    }

    #[test]
    fn test_no_match_for_plain_title() {
        assert!(first_match("Foundation").is_none());
    }

    #[test]
    fn test_ordinal_and_roman_values() {
        assert_eq!(ordinal_value("Second"), Some(2));
        assert_eq!(ordinal_value("eleventh"), None);
        assert_eq!(roman_value("IX"), Some(9));
        assert_eq!(roman_value("XI"), None);
    }
}
