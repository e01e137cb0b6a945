//! Polite HTTP client shared across remote services.
//!
//! Wraps reqwest with the pipeline's politeness policies: capped connection
//! pool, total and connect timeouts, mandatory User-Agent, randomized
//! inter-request sleep, and 429 pushback surfaced as a typed error.

use crate::config::{AppConfig, NetworkConfig};
use crate::error::{Result, StacksError};
use rand::Rng;
use reqwest::{header, Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client with the pipeline's politeness defaults baked in.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a client with the standard timeouts and pool caps.
    pub fn new() -> Result<Self> {
        Self::with_timeout(NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Create a client with a custom total-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(NetworkConfig::CONNECT_TIMEOUT)
            .pool_max_idle_per_host(NetworkConfig::POOL_MAX_IDLE_PER_HOST)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| StacksError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                cause: Some(e.to_string()),
            })?;

        Ok(Self { client })
    }

    /// Get a reference to the underlying reqwest client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Sleep for a randomized politeness interval (50–150 ms).
    pub async fn politeness_sleep(&self) {
        let millis = {
            let mut rng = rand::rng();
            rng.random_range(
                NetworkConfig::POLITENESS_MIN.as_millis() as u64
                    ..=NetworkConfig::POLITENESS_MAX.as_millis() as u64,
            )
        };
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    /// GET a URL and classify the response status.
    ///
    /// 2xx passes through; 429 becomes [`StacksError::RateLimited`] with the
    /// server-indicated delay; everything else becomes
    /// [`StacksError::RemoteStatus`] so the retry layer can classify it.
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.get_with_headers(url, &[]).await
    }

    /// GET with extra request headers.
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Response> {
        self.request(url, headers, None).await
    }

    /// GET with extra headers and a per-request timeout that overrides the
    /// client-wide one.
    pub async fn get_with_timeout(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Response> {
        self.request(url, headers, Some(timeout)).await
    }

    async fn request(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<Response> {
        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(*key, *value);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StacksError::Timeout(timeout.unwrap_or(NetworkConfig::REQUEST_TIMEOUT))
            } else {
                StacksError::Network {
                    message: format!("GET {} failed: {}", url, e),
                    cause: Some(e.to_string()),
                }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(target: "request", url, status = status.as_u16());
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            warn!(target: "request", url, retry_after, "Rate limited");
            return Err(StacksError::RateLimited {
                service: extract_domain(url),
                retry_after_secs: retry_after,
            });
        }

        Err(StacksError::RemoteStatus {
            status: status.as_u16(),
            query: url.to_string(),
        })
    }
}

/// Extract the host from a URL for error reporting.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}
