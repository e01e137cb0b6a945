//! Wikipedia prose extraction.
//!
//! Pulls the lead section of an author's article (REST summary first,
//! action API as fallback) and mines it for series mentions with a small
//! set of prose patterns. Known franchise names get a flat high
//! confidence; generic phrases are stoplisted.

use crate::config::NetworkConfig;
use crate::error::{Result, StacksError};
use crate::models::SeriesHint;
use crate::network::HttpClient;
use crate::planner::tables::FRANCHISES;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Hint source tag.
const SOURCE_TAG: &str = "wikipedia_enrichment";

/// Confidence for an explicit "<Name> series/saga/trilogy" mention.
const NAMED_SERIES_CONFIDENCE: u8 = 86;
/// Confidence for an "nth book in the <Name>" construction.
const ORDINAL_MENTION_CONFIDENCE: u8 = 90;
/// Confidence for a known franchise name appearing in the prose.
const FRANCHISE_CONFIDENCE: u8 = 92;

/// Capitalized phrases that read like series names but never are.
const PROSE_STOPLIST: &[&str] = &[
    "new york times",
    "sunday times",
    "united states",
    "united kingdom",
    "best selling",
    "bestselling",
    "award winning",
    "science fiction",
    "young adult",
];

#[derive(Debug, Deserialize)]
struct RestSummary {
    #[serde(default)]
    extract: String,
}

#[derive(Debug, Deserialize)]
struct ActionResponse {
    query: Option<ActionQuery>,
}

#[derive(Debug, Deserialize)]
struct ActionQuery {
    #[serde(default)]
    pages: HashMap<String, ActionPage>,
}

#[derive(Debug, Deserialize)]
struct ActionPage {
    extract: Option<String>,
}

/// Client for the public Wikipedia APIs.
pub struct WikipediaClient {
    http: HttpClient,
    lang: String,
}

impl WikipediaClient {
    pub fn new(http: HttpClient) -> Self {
        Self::with_lang(http, NetworkConfig::WIKIPEDIA_LANG)
    }

    pub fn with_lang(http: HttpClient, lang: impl Into<String>) -> Self {
        Self {
            http,
            lang: lang.into(),
        }
    }

    /// The lead extract of a page via the REST summary endpoint.
    ///
    /// A missing page is `Ok(None)`, not an error.
    pub async fn page_summary(&self, title: &str) -> Result<Option<String>> {
        let url = format!(
            "https://{}.wikipedia.org/api/rest_v1/page/summary/{}",
            self.lang,
            urlencoding::encode(&title.replace(' ', "_"))
        );
        let response = match self.http.get(&url).await {
            Ok(response) => response,
            Err(StacksError::RemoteStatus { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let summary: RestSummary =
            response
                .json()
                .await
                .map_err(|e| StacksError::MalformedResponse {
                    query: title.to_string(),
                    message: e.to_string(),
                })?;
        Ok((!summary.extract.is_empty()).then_some(summary.extract))
    }

    /// The plain-text intro of a page via the action API.
    pub async fn page_intro(&self, title: &str) -> Result<Option<String>> {
        let url = format!(
            "https://{}.wikipedia.org/w/api.php?action=query&prop=extracts&explaintext=1&exintro=1&redirects=1&format=json&titles={}",
            self.lang,
            urlencoding::encode(title)
        );
        let response = self.http.get(&url).await?;
        let body: ActionResponse =
            response
                .json()
                .await
                .map_err(|e| StacksError::MalformedResponse {
                    query: title.to_string(),
                    message: e.to_string(),
                })?;

        let extract = body
            .query
            .into_iter()
            .flat_map(|q| q.pages.into_values())
            .find_map(|p| p.extract)
            .filter(|e| !e.is_empty());
        Ok(extract)
    }

    /// Series hints extracted from an author's article lead.
    pub async fn author_series_hints(&self, author: &str) -> Result<Vec<SeriesHint>> {
        let text = match self.page_summary(author).await? {
            Some(text) => text,
            None => match self.page_intro(author).await? {
                Some(text) => text,
                None => {
                    debug!(target: "cache", author, "No Wikipedia article found");
                    return Ok(Vec::new());
                }
            },
        };
        Ok(extract_series_hints(&text, author))
    }
}

/// Mine a prose extract for series mentions.
pub fn extract_series_hints(text: &str, author: &str) -> Vec<SeriesHint> {
    let mut hints = Vec::new();

    for caps in named_series_re().captures_iter(text) {
        if let Some(name) = clean_name(&caps["name"]) {
            hints.push(hint(name, author, NAMED_SERIES_CONFIDENCE));
        }
    }
    for caps in ordinal_mention_re().captures_iter(text) {
        if let Some(name) = clean_name(&caps["name"]) {
            hints.push(hint(name, author, ORDINAL_MENTION_CONFIDENCE));
        }
    }
    for franchise in FRANCHISES {
        if text.contains(franchise) {
            hints.push(hint(franchise.to_string(), author, FRANCHISE_CONFIDENCE));
        }
    }

    hints
}

/// `the <Name> series|saga|trilogy` with a capitalized name.
fn named_series_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:the\s+)?(?P<name>[A-Z][A-Za-z'\u{2019}-]+(?:\s+(?:(?:of|the|and)\s+)?[A-Z][A-Za-z'\u{2019}-]+){0,4})\s+(?:series|saga|trilogy)\b",
        )
        .unwrap_or_else(|e| panic!("invalid prose pattern: {}", e))
    })
}

/// `first book in the <Name>` and kin.
fn ordinal_mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Case-insensitivity is spelled out per word so the name capture
        // keeps its capitalization requirement.
        Regex::new(
            r"(?:[Ff]irst|[Ss]econd|[Tt]hird|[Ff]ourth|[Ff]ifth|[Ll]atest|[Ff]inal)\s+(?:book|novel|volume|installment)\s+(?:in|of)\s+(?:the\s+)?(?P<name>[A-Z][A-Za-z'\u{2019}-]+(?:\s+[A-Z][A-Za-z'\u{2019}-]+){0,4})",
        )
        .unwrap_or_else(|e| panic!("invalid prose pattern: {}", e))
    })
}

fn clean_name(raw: &str) -> Option<String> {
    let name = raw.trim().trim_end_matches([',', '.', ';']).trim();
    if name.chars().count() < 3 {
        return None;
    }
    if PROSE_STOPLIST.contains(&name.to_lowercase().as_str()) {
        return None;
    }
    Some(name.to_string())
}

fn hint(name: String, author: &str, confidence: u8) -> SeriesHint {
    SeriesHint {
        name,
        author: author.to_string(),
        confidence,
        source: SOURCE_TAG.to_string(),
    }
}
