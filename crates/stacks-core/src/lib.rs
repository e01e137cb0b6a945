//! Stacks core: series discovery and detection pipeline.
//!
//! Mines a public book catalog for multi-volume series, scores the
//! evidence, and curates accepted series into a JSON database that the
//! library application matches shelves against. The pipeline is a chain
//! of mostly-pure stages:
//!
//! - [`planner`] enumerates named query strategies over the catalog
//! - [`harvester`] executes queries politely and dedups against [`tracking`]
//! - [`detector`] extracts and scores series candidates from titles
//! - [`curator`] validates candidates and persists the curated database
//! - [`enrichment`] adds series hints from Wikidata and Wikipedia
//! - [`session`] orchestrates a run with checkpoints and cancellation

pub mod cancel;
pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod curator;
pub mod detector;
pub mod enrichment;
pub mod error;
pub mod harvester;
pub mod models;
pub mod network;
pub mod planner;
pub mod session;
pub mod storage;
pub mod tracking;

pub use cancel::CancellationToken;
pub use catalog::CatalogClient;
pub use checkpoint::CheckpointFile;
pub use curator::CuratedStore;
pub use error::{Result, StacksError};
pub use harvester::Harvester;
pub use network::HttpClient;
pub use session::{HarvestSession, SessionReport};
pub use tracking::TrackingStore;
