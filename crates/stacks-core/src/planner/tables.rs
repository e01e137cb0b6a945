//! Constant tables feeding the strategy planner.
//!
//! Patterns are data, not code: the planner only formats these tables into
//! query strings, so tuning a sweep never touches control flow.

/// Volume words used for explicit-numbering sweeps.
pub const VOLUME_WORDS: &[&str] = &["Volume", "Tome", "Vol.", "Book", "Part"];

/// Ordinal words combined with volume nouns.
pub const ORDINAL_WORDS: &[&str] = &[
    "Second", "Third", "Fourth", "Fifth", "Sixth", "Seventh", "Eighth",
];

/// Authors with deep multi-volume back catalogs.
pub const PROLIFIC_AUTHORS: &[&str] = &[
    "Terry Pratchett",
    "Isaac Asimov",
    "Agatha Christie",
    "Brandon Sanderson",
    "Robin Hobb",
    "Ursula K. Le Guin",
    "Bernard Cornwell",
    "Anne McCaffrey",
    "R.A. Salvatore",
    "Mercedes Lackey",
    "Danielle Steel",
    "Louis L'Amour",
];

/// Franchise and shared-universe names.
pub const FRANCHISES: &[&str] = &[
    "Star Wars",
    "Star Trek",
    "Warhammer",
    "Dragonlance",
    "Forgotten Realms",
    "Doctor Who",
    "Conan",
    "Dune",
    "Middle-earth",
];

/// Genres with a high density of multi-volume works.
pub const GENRES: &[&str] = &[
    "fantasy",
    "science fiction",
    "mystery",
    "romance",
    "thriller",
    "horror",
    "historical fiction",
    "young adult",
];

/// Publishers known for long-running series lines.
pub const PUBLISHERS: &[&str] = &[
    "Tor Books",
    "Del Rey",
    "Ace Books",
    "Harlequin",
    "Scholastic",
    "Penguin",
    "Gallimard",
    "Hachette",
];

/// First year of each decade swept by the temporal strategy.
pub const DECADES: &[i32] = &[1950, 1960, 1970, 1980, 1990, 2000, 2010, 2020];

/// MARC language codes for international sweeps.
pub const LANGUAGE_CODES: &[&str] = &["fre", "ger", "spa", "ita", "jpn", "por"];

/// Award subjects whose winners skew toward series fiction.
pub const AWARDS: &[&str] = &[
    "Hugo Award",
    "Nebula Award",
    "Locus Award",
    "World Fantasy Award",
    "Prix Goncourt",
];

/// Library-subject classifications mined directly.
pub const SUBJECTS: &[&str] = &[
    "juvenile fiction",
    "detective and mystery stories",
    "adventure stories",
    "graphic novels",
    "comic books, strips",
    "space opera",
];

/// ISBN-13 prefixes scanned systematically (large trade-fiction ranges).
pub const ISBN_PREFIXES: &[&str] = &["978030", "978044", "978045", "978055", "978076"];

/// Collection and anthology title terms.
pub const COLLECTION_TERMS: &[&str] = &[
    "chronicles",
    "saga",
    "cycle",
    "omnibus",
    "collected works",
    "trilogy",
];

/// Recurring character names that anchor long series.
pub const CHARACTER_NAMES: &[&str] = &[
    "Hercule Poirot",
    "Sherlock Holmes",
    "Jack Reacher",
    "Harry Bosch",
    "Arsène Lupin",
    "Geralt",
];

/// Translators whose catalogs map to imported series.
pub const TRANSLATORS: &[&str] = &[
    "Anthea Bell",
    "Edith Grossman",
    "Jay Rubin",
    "Ros Schwartz",
];

/// Alternate-language volume words for obscure-pattern mining.
pub const OBSCURE_VOLUME_WORDS: &[&str] = &["Band", "Teil", "Parte", "Deel", "Bind"];

/// Rare format phrasings mined alongside the alternate-language words.
pub const OBSCURE_FORMATS: &[&str] = &["light novel", "fix-up novel", "serial novel"];
