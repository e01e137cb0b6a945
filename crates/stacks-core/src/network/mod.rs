//! HTTP plumbing shared by the catalog and enrichment clients.

pub mod client;
pub mod retry;

pub use client::HttpClient;
pub use retry::{retry_async, RetryConfig};
