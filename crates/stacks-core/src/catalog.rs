//! Open Library search client.
//!
//! Thin, typed wrapper over `GET <base>/search.json`. Resilience (retry,
//! pushback, politeness sleeps) lives in the harvester; this module only
//! shapes requests and parses responses.

use crate::config::NetworkConfig;
use crate::error::{Result, StacksError};
use crate::models::CatalogRecord;
use crate::network::HttpClient;
use serde::Deserialize;
use tracing::debug;

/// Fields requested from the search endpoint.
const SEARCH_FIELDS: &str =
    "key,title,author_name,subject,first_publish_year,publisher,isbn,number_of_pages_median,cover_i";

/// Raw search response envelope.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "numFound", default)]
    num_found: u64,
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

/// One `docs` entry. Every field except `key` may be absent.
#[derive(Debug, Deserialize)]
struct SearchDoc {
    key: String,
    title: Option<String>,
    #[serde(default)]
    author_name: Vec<String>,
    #[serde(default)]
    subject: Vec<String>,
    first_publish_year: Option<i32>,
    #[serde(default)]
    publisher: Vec<String>,
    #[serde(default)]
    isbn: Vec<String>,
    cover_i: Option<i64>,
}

/// Result of one search query.
#[derive(Debug)]
pub struct SearchPage {
    /// Total hits reported by the catalog, beyond this page.
    pub num_found: u64,
    pub records: Vec<CatalogRecord>,
}

/// Client for the public book catalog.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: HttpClient,
    base_url: String,
}

impl CatalogClient {
    /// Create a client against the default catalog base URL.
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, NetworkConfig::DEFAULT_CATALOG_BASE)
    }

    /// Create a client against a custom catalog base URL.
    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http, base_url }
    }

    /// The search URL for a query, with the standard field list.
    fn search_url(&self, query: &str, limit: u32) -> String {
        format!(
            "{}/search.json?q={}&limit={}&fields={}",
            self.base_url,
            urlencoding::encode(query),
            limit,
            SEARCH_FIELDS
        )
    }

    /// Run one search query and parse the `docs` array.
    ///
    /// Docs without a usable title are dropped; the catalog's identity is
    /// trusted as-is. A body that is not the expected JSON shape is a
    /// [`StacksError::MalformedResponse`] carrying the offending query.
    pub async fn search(&self, query: &str, limit: u32) -> Result<SearchPage> {
        let url = self.search_url(query, limit);
        let response = self.http.get(&url).await?;

        let body: SearchResponse =
            response
                .json()
                .await
                .map_err(|e| StacksError::MalformedResponse {
                    query: query.to_string(),
                    message: e.to_string(),
                })?;

        let records: Vec<CatalogRecord> = body
            .docs
            .into_iter()
            .filter_map(doc_to_record)
            .collect();

        debug!(
            target: "request",
            query,
            num_found = body.num_found,
            parsed = records.len(),
            "Catalog search page"
        );

        Ok(SearchPage {
            num_found: body.num_found,
            records,
        })
    }
}

fn doc_to_record(doc: SearchDoc) -> Option<CatalogRecord> {
    let title = doc.title?;
    if title.trim().is_empty() {
        return None;
    }
    Some(CatalogRecord {
        external_key: doc.key,
        title,
        authors: doc.author_name,
        subjects: doc.subject,
        first_publish_year: doc.first_publish_year,
        publisher: doc.publisher.into_iter().next(),
        isbns: doc.isbn,
        cover_id: doc.cover_i,
    })
}
