//! Wikidata SPARQL client.
//!
//! Read-only queries against the public SPARQL endpoint, throttled to one
//! request per 500 ms and cached for three hours per (query kind, value).
//! Entity rows are merged by QID, keeping the longest description and
//! genre seen across bindings.

use crate::config::NetworkConfig;
use crate::error::{Result, StacksError};
use crate::models::SeriesHint;
use crate::network::HttpClient;
use chrono::NaiveDate;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use mini_moka::sync::Cache;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Confidence assigned to structured Wikidata series results.
const WIKIDATA_CONFIDENCE: u8 = 90;

/// Hint source tag.
const SOURCE_TAG: &str = "wikidata_enrichment";

/// A book series entity.
#[derive(Debug, Clone, PartialEq)]
pub struct WikidataSeries {
    pub qid: String,
    pub label: String,
    pub description: Option<String>,
    pub genre: Option<String>,
}

/// A single written work entity.
#[derive(Debug, Clone, PartialEq)]
pub struct WikidataBook {
    pub qid: String,
    pub title: String,
    pub published: Option<NaiveDate>,
    /// Ordinal within its series, when the query carries one.
    pub volume: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

/// Throttled, cached SPARQL client.
pub struct WikidataClient {
    http: HttpClient,
    endpoint: String,
    limiter: DefaultDirectRateLimiter,
    cache: Cache<(String, String), String>,
}

impl WikidataClient {
    pub fn new(http: HttpClient) -> Self {
        Self::with_endpoint(http, NetworkConfig::SPARQL_ENDPOINT)
    }

    pub fn with_endpoint(http: HttpClient, endpoint: impl Into<String>) -> Self {
        // One request per SPARQL_MIN_GAP.
        let quota = Quota::with_period(NetworkConfig::SPARQL_MIN_GAP)
            .unwrap_or_else(|| Quota::per_second(std::num::NonZeroU32::MIN));
        Self {
            http,
            endpoint: endpoint.into(),
            limiter: RateLimiter::direct(quota),
            cache: Cache::builder()
                .time_to_live(NetworkConfig::SPARQL_CACHE_TTL)
                .build(),
        }
    }

    /// Book series attributed to an author, merged by QID.
    pub async fn author_series(&self, author: &str) -> Result<Vec<WikidataSeries>> {
        let query = format!(
            r#"SELECT ?series ?seriesLabel ?description ?genreLabel WHERE {{
  ?author rdfs:label "{author}"@en .
  ?series wdt:P50 ?author ;
          wdt:P31/wdt:P279* wd:Q277759 .
  OPTIONAL {{ ?series schema:description ?description . FILTER(LANG(?description) = "en") }}
  OPTIONAL {{ ?series wdt:P136 ?genre . }}
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "en". }}
}} LIMIT 50"#,
            author = sparql_escape(author)
        );
        let body = self.execute("author_series", author, &query).await?;
        Ok(parse_series(&body, author)?)
    }

    /// Standalone written works attributed to an author (series members
    /// are excluded; they arrive through [`Self::series_books`]).
    pub async fn author_books(&self, author: &str) -> Result<Vec<WikidataBook>> {
        let query = format!(
            r#"SELECT ?book ?bookLabel ?published WHERE {{
  ?author rdfs:label "{author}"@en .
  ?book wdt:P50 ?author ;
        wdt:P31/wdt:P279* wd:Q47461344 .
  FILTER NOT EXISTS {{ ?book wdt:P179 ?anySeries . }}
  OPTIONAL {{ ?book wdt:P577 ?published . }}
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "en". }}
}} LIMIT 200"#,
            author = sparql_escape(author)
        );
        let body = self.execute("author_books", author, &query).await?;
        parse_books(&body, "book", "bookLabel")
    }

    /// Volumes belonging to a named series, with their series ordinal.
    pub async fn series_books(&self, series: &str) -> Result<Vec<WikidataBook>> {
        let query = format!(
            r#"SELECT ?book ?bookLabel ?published ?ordinal WHERE {{
  ?series rdfs:label "{series}"@en ;
          wdt:P31/wdt:P279* wd:Q277759 .
  ?book p:P179 ?membership .
  ?membership ps:P179 ?series .
  OPTIONAL {{ ?membership pq:P1545 ?ordinal . }}
  OPTIONAL {{ ?book wdt:P577 ?published . }}
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "en". }}
}} LIMIT 200"#,
            series = sparql_escape(series)
        );
        let body = self.execute("series_books", series, &query).await?;
        parse_books(&body, "book", "bookLabel")
    }

    /// Author series as forwardable hints.
    pub async fn author_series_hints(&self, author: &str) -> Result<Vec<SeriesHint>> {
        let series = self.author_series(author).await?;
        Ok(series
            .into_iter()
            .map(|s| SeriesHint {
                name: s.label,
                author: author.to_string(),
                confidence: WIKIDATA_CONFIDENCE,
                source: SOURCE_TAG.to_string(),
            })
            .collect())
    }

    /// Run a SPARQL query, throttled, with the response body cached per
    /// (kind, value) for the cache TTL.
    async fn execute(&self, kind: &str, value: &str, query: &str) -> Result<String> {
        let key = (kind.to_string(), value.to_lowercase());
        if let Some(cached) = self.cache.get(&key) {
            debug!(target: "cache", kind, value, "SPARQL cache hit");
            return Ok(cached);
        }

        self.limiter.until_ready().await;

        let url = format!(
            "{}?query={}&format=json",
            self.endpoint,
            urlencoding::encode(query)
        );
        let response = self
            .http
            .get_with_timeout(
                &url,
                &[("Accept", "application/sparql-results+json")],
                NetworkConfig::SPARQL_TIMEOUT,
            )
            .await?;
        let body = response.text().await.map_err(StacksError::from)?;

        self.cache.insert(key, body.clone());
        Ok(body)
    }
}

/// Trailing QID of an entity URI.
fn qid_from_uri(uri: &str) -> Option<&str> {
    let tail = uri.rsplit('/').next()?;
    (tail.starts_with('Q') && tail[1..].chars().all(|c| c.is_ascii_digit())).then_some(tail)
}

/// Parse a Wikidata point-in-time value (`+1996-05-01T00:00:00Z`).
fn parse_wikidata_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.strip_prefix('+').unwrap_or(raw);
    let date_part = trimmed.split('T').next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn parse_series(body: &str, query: &str) -> Result<Vec<WikidataSeries>> {
    let response: SparqlResponse =
        serde_json::from_str(body).map_err(|e| StacksError::MalformedResponse {
            query: query.to_string(),
            message: e.to_string(),
        })?;

    // Bindings repeat per optional value; merge by QID keeping the longest
    // description and genre.
    let mut merged: BTreeMap<String, WikidataSeries> = BTreeMap::new();
    for binding in response.results.bindings {
        let Some(qid) = binding
            .get("series")
            .and_then(|v| qid_from_uri(&v.value))
            .map(str::to_string)
        else {
            continue;
        };
        let Some(label) = binding.get("seriesLabel").map(|v| v.value.clone()) else {
            continue;
        };
        // A label that fell back to the bare QID is useless.
        if label == qid {
            continue;
        }
        let description = binding.get("description").map(|v| v.value.clone());
        let genre = binding.get("genreLabel").map(|v| v.value.clone());

        let entry = merged.entry(qid.clone()).or_insert_with(|| WikidataSeries {
            qid,
            label,
            description: None,
            genre: None,
        });
        keep_longest(&mut entry.description, description);
        keep_longest(&mut entry.genre, genre);
    }

    Ok(merged.into_values().collect())
}

fn parse_books(body: &str, entity_var: &str, label_var: &str) -> Result<Vec<WikidataBook>> {
    let response: SparqlResponse =
        serde_json::from_str(body).map_err(|e| StacksError::MalformedResponse {
            query: entity_var.to_string(),
            message: e.to_string(),
        })?;

    let mut merged: BTreeMap<String, WikidataBook> = BTreeMap::new();
    for binding in response.results.bindings {
        let Some(qid) = binding
            .get(entity_var)
            .and_then(|v| qid_from_uri(&v.value))
            .map(str::to_string)
        else {
            continue;
        };
        let Some(title) = binding.get(label_var).map(|v| v.value.clone()) else {
            continue;
        };
        if title == qid {
            continue;
        }
        let published = binding
            .get("published")
            .and_then(|v| parse_wikidata_date(&v.value));

        let volume = binding
            .get("ordinal")
            .and_then(|v| v.value.parse::<u32>().ok());

        let entry = merged.entry(qid.clone()).or_insert_with(|| WikidataBook {
            qid,
            title,
            published: None,
            volume: None,
        });
        // Earliest publication wins when bindings disagree.
        if let Some(date) = published {
            entry.published = Some(entry.published.map_or(date, |d| d.min(date)));
        }
        if entry.volume.is_none() {
            entry.volume = volume;
        }
    }

    Ok(merged.into_values().collect())
}

fn keep_longest(slot: &mut Option<String>, candidate: Option<String>) {
    if let Some(value) = candidate {
        if slot.as_ref().map_or(true, |s| s.len() < value.len()) {
            *slot = Some(value);
        }
    }
}

/// Escape a literal for embedding in a SPARQL string.
fn sparql_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qid_from_uri() {
        assert_eq!(
            qid_from_uri("http://www.wikidata.org/entity/Q3244512"),
            Some("Q3244512")
        );
        assert_eq!(qid_from_uri("http://www.wikidata.org/entity/P50"), None);
        assert_eq!(qid_from_uri("not a uri"), None);
    }

    #[test]
    fn test_wikidata_date_parsing() {
        assert_eq!(
            parse_wikidata_date("+1983-11-24T00:00:00Z"),
            NaiveDate::from_ymd_opt(1983, 11, 24)
        );
        assert_eq!(
            parse_wikidata_date("1983-11-24T00:00:00Z"),
            NaiveDate::from_ymd_opt(1983, 11, 24)
        );
        assert_eq!(parse_wikidata_date("unknown"), None);
    }

    #[test]
    fn test_series_bindings_merge_by_qid() {
        let body = r#"{
            "results": {
                "bindings": [
                    {
                        "series": {"value": "http://www.wikidata.org/entity/Q694"},
                        "seriesLabel": {"value": "Discworld"},
                        "description": {"value": "fantasy series"},
                        "genreLabel": {"value": "fantasy"}
                    },
                    {
                        "series": {"value": "http://www.wikidata.org/entity/Q694"},
                        "seriesLabel": {"value": "Discworld"},
                        "description": {"value": "comic fantasy book series by Terry Pratchett"},
                        "genreLabel": {"value": "comic fantasy"}
                    },
                    {
                        "series": {"value": "http://www.wikidata.org/entity/Q11679"},
                        "seriesLabel": {"value": "Q11679"}
                    }
                ]
            }
        }"#;

        let series = parse_series(body, "Terry Pratchett").unwrap();
        // The label-less entity is dropped; the duplicate is merged.
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].qid, "Q694");
        assert_eq!(series[0].label, "Discworld");
        assert_eq!(
            series[0].description.as_deref(),
            Some("comic fantasy book series by Terry Pratchett")
        );
        assert_eq!(series[0].genre.as_deref(), Some("comic fantasy"));
    }

    #[test]
    fn test_book_bindings_keep_earliest_date() {
        let body = r#"{
            "results": {
                "bindings": [
                    {
                        "book": {"value": "http://www.wikidata.org/entity/Q693"},
                        "bookLabel": {"value": "The Colour of Magic"},
                        "published": {"value": "+1985-01-01T00:00:00Z"}
                    },
                    {
                        "book": {"value": "http://www.wikidata.org/entity/Q693"},
                        "bookLabel": {"value": "The Colour of Magic"},
                        "published": {"value": "+1983-11-24T00:00:00Z"}
                    }
                ]
            }
        }"#;

        let books = parse_books(body, "book", "bookLabel").unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "The Colour of Magic");
        assert_eq!(books[0].published, NaiveDate::from_ymd_opt(1983, 11, 24));
    }

    #[test]
    fn test_series_ordinal_becomes_the_volume_number() {
        let body = r#"{
            "results": {
                "bindings": [
                    {
                        "book": {"value": "http://www.wikidata.org/entity/Q693"},
                        "bookLabel": {"value": "The Colour of Magic"},
                        "ordinal": {"value": "1"}
                    },
                    {
                        "book": {"value": "http://www.wikidata.org/entity/Q719"},
                        "bookLabel": {"value": "The Light Fantastic"}
                    }
                ]
            }
        }"#;

        let books = parse_books(body, "book", "bookLabel").unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].volume, Some(1));
        assert_eq!(books[1].volume, None);
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        assert!(matches!(
            parse_series("<html>rate limited</html>", "x"),
            Err(StacksError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_sparql_escape() {
        assert_eq!(sparql_escape(r#"O"Brien"#), r#"O\"Brien"#);
    }
}
