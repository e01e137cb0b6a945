//! Stacks harvester - series discovery over a public book catalog.
//!
//! This binary runs one harvest session: planned catalog queries, series
//! detection, curation into the JSON series database, and optional
//! enrichment from Wikidata and Wikipedia. Ctrl-C cancels gracefully.

use clap::Parser;
use stacks_core::catalog::CatalogClient;
use stacks_core::checkpoint::CheckpointFile;
use stacks_core::config::{AppConfig, HarvestConfig, SessionPaths};
use stacks_core::curator::CuratedStore;
use stacks_core::enrichment::EnrichmentService;
use stacks_core::error::{Result, StacksError};
use stacks_core::harvester::Harvester;
use stacks_core::network::HttpClient;
use stacks_core::planner::{self, StrategyKind};
use stacks_core::session::HarvestSession;
use stacks_core::tracking::TrackingStore;
use stacks_core::CancellationToken;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "stacks-harvester")]
#[command(about = "Series discovery harvester for the Stacks library")]
#[command(version)]
struct Args {
    /// Records to process before stopping
    #[arg(long, default_value_t = HarvestConfig::DEFAULT_TARGET)]
    target: u64,

    /// Run only the named strategies (repeatable)
    #[arg(long = "strategy")]
    strategies: Vec<String>,

    /// Promotion confidence threshold (0-100)
    #[arg(long, default_value_t = HarvestConfig::PROMOTION_CONFIDENCE)]
    confidence: u8,

    /// Catalog base URL override
    #[arg(long, env = "STACKS_CATALOG_URL")]
    catalog_url: Option<String>,

    /// Data directory for the curated database, tracking store and logs
    #[arg(long, env = "STACKS_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Enrich these authors from Wikidata and Wikipedia after the harvest
    /// (repeatable)
    #[arg(long = "enrich-author")]
    enrich_authors: Vec<String>,

    /// List the available strategies and exit
    #[arg(long)]
    list_strategies: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.list_strategies {
        for kind in StrategyKind::ALL {
            println!("{:2}  {}", kind.priority(), kind.as_str());
        }
        return;
    }

    let paths = SessionPaths::new(&args.data_dir);
    if let Err(e) = init_logging(&paths, args.debug) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(e.exit_code());
    }

    match run(args, paths).await {
        Ok(()) => {}
        Err(e) => {
            error!(target: "error", "Harvest failed: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(args: Args, paths: SessionPaths) -> Result<()> {
    if args.confidence > 100 {
        return Err(StacksError::Validation {
            field: "confidence".to_string(),
            message: format!("must be 0-100, got {}", args.confidence),
        });
    }
    if args.target == 0 {
        return Err(StacksError::Validation {
            field: "target".to_string(),
            message: "must be at least 1".to_string(),
        });
    }

    // Plans are validated before the first remote request.
    let plans = if args.strategies.is_empty() {
        planner::plans()
    } else {
        planner::plans_for(&args.strategies)?
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        target = args.target,
        confidence = args.confidence,
        strategies = plans.len(),
        data_dir = %args.data_dir.display(),
        "Starting {}", AppConfig::APP_NAME
    );

    let http = HttpClient::new()?;
    let catalog = match &args.catalog_url {
        Some(url) => CatalogClient::with_base_url(http.clone(), url.clone()),
        None => CatalogClient::new(http.clone()),
    };
    let harvester = Harvester::new(http.clone(), catalog);
    let tracking = TrackingStore::new(&paths.tracking_db)?;
    let curator = CuratedStore::load(&paths, args.confidence)?;
    let checkpoint = CheckpointFile::new(&paths.checkpoint);

    info!(
        target: "health_check",
        tracking_db = %paths.tracking_db.display(),
        curated = curator.len(),
        "Stores opened"
    );

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("Cancellation requested, finishing current query...");
        handler_token.cancel();
    })
    .map_err(|e| StacksError::Config {
        message: format!("Failed to install signal handler: {}", e),
    })?;

    let mut session = HarvestSession::new(
        harvester,
        tracking,
        curator,
        checkpoint,
        cancel,
        args.target,
    );
    let report = session.run(&plans).await?;

    if !args.enrich_authors.is_empty() {
        let enrichment = EnrichmentService::new(http);
        for author in &args.enrich_authors {
            match enrichment.author_hints(author).await {
                Ok(hints) => {
                    let promoted = session.apply_hints(&hints)?;
                    info!(author, hints = hints.len(), promoted, "Author enriched");
                }
                Err(e) => warn!(target: "error", author, error = %e, "Enrichment failed"),
            }
        }
    }

    info!(
        books_processed = report.stats.books_processed,
        books_skipped = report.stats.books_skipped,
        queries = report.stats.queries_executed,
        api_calls = report.stats.api_calls,
        new_series = report.new_series,
        total_analyzed = report.tracking.total_analyzed,
        detection_rate = %format!("{:.1}%", report.tracking.detection_rate * 100.0),
        cancelled = report.cancelled,
        "Session summary"
    );
    Ok(())
}

/// Compact console logging on stderr plus structured JSON in the session
/// log file, size-rotated at startup.
fn init_logging(paths: &SessionPaths, debug: bool) -> Result<()> {
    rotate_log(paths)?;
    if let Some(parent) = paths.log_file.parent() {
        fs::create_dir_all(parent).map_err(|e| StacksError::io_with_path(e, parent))?;
    }
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_file)
        .map_err(|e| StacksError::io_with_path(e, &paths.log_file))?;

    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter);
    let file = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(Arc::new(log_file))
        .with_filter(EnvFilter::new(default_level));

    tracing_subscriber::registry().with(console).with(file).init();
    Ok(())
}

/// Shift `harvest.log` through numbered backups once it exceeds the size
/// cap, keeping at most [`AppConfig::LOG_FILE_BACKUP_COUNT`] old files.
fn rotate_log(paths: &SessionPaths) -> Result<()> {
    let log = &paths.log_file;
    let size = match fs::metadata(log) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(()),
    };
    if size < AppConfig::LOG_FILE_MAX_BYTES {
        return Ok(());
    }

    let numbered = |n: u32| log.with_extension(format!("log.{}", n));
    let last = numbered(AppConfig::LOG_FILE_BACKUP_COUNT);
    if last.exists() {
        fs::remove_file(&last).map_err(|e| StacksError::io_with_path(e, &last))?;
    }
    for n in (1..AppConfig::LOG_FILE_BACKUP_COUNT).rev() {
        let from = numbered(n);
        if from.exists() {
            let to = numbered(n + 1);
            fs::rename(&from, &to).map_err(|e| StacksError::io_with_path(e, &to))?;
        }
    }
    fs::rename(log, numbered(1)).map_err(|e| StacksError::io_with_path(e, log))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_repeatable_flags() {
        let args = Args::parse_from([
            "stacks-harvester",
            "--target",
            "5000",
            "--strategy",
            "volume_patterns_advanced",
            "--strategy",
            "prolific_authors_deep",
            "--enrich-author",
            "Terry Pratchett",
            "--debug",
        ]);
        assert_eq!(args.target, 5000);
        assert_eq!(args.strategies.len(), 2);
        assert_eq!(args.enrich_authors, vec!["Terry Pratchett".to_string()]);
        assert!(args.debug);
        assert_eq!(args.confidence, HarvestConfig::PROMOTION_CONFIDENCE);
    }

    #[test]
    fn test_env_overrides_fill_missing_flags() {
        std::env::set_var("STACKS_DATA_DIR", "/srv/stacks-data");
        std::env::set_var("STACKS_CATALOG_URL", "http://localhost:8080");

        let args = Args::parse_from(["stacks-harvester"]);
        assert_eq!(args.data_dir, PathBuf::from("/srv/stacks-data"));
        assert_eq!(args.catalog_url.as_deref(), Some("http://localhost:8080"));

        // An explicit flag wins over the environment.
        let args = Args::parse_from(["stacks-harvester", "--data-dir", "/srv/override"]);
        assert_eq!(args.data_dir, PathBuf::from("/srv/override"));

        std::env::remove_var("STACKS_DATA_DIR");
        std::env::remove_var("STACKS_CATALOG_URL");
    }

    #[test]
    fn test_log_rotation_shifts_numbered_files() {
        let dir = TempDir::new().unwrap();
        let paths = SessionPaths::new(dir.path());
        fs::create_dir_all(paths.log_file.parent().unwrap()).unwrap();

        // An oversized current log and one existing backup.
        fs::write(
            &paths.log_file,
            vec![b'x'; AppConfig::LOG_FILE_MAX_BYTES as usize],
        )
        .unwrap();
        fs::write(paths.log_file.with_extension("log.1"), b"old").unwrap();

        rotate_log(&paths).unwrap();

        assert!(!paths.log_file.exists());
        assert!(paths.log_file.with_extension("log.1").exists());
        assert_eq!(
            fs::read(paths.log_file.with_extension("log.2")).unwrap(),
            b"old"
        );
    }

    #[test]
    fn test_undersized_log_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let paths = SessionPaths::new(dir.path());
        fs::create_dir_all(paths.log_file.parent().unwrap()).unwrap();
        fs::write(&paths.log_file, b"small").unwrap();

        rotate_log(&paths).unwrap();
        assert!(paths.log_file.exists());
        assert!(!paths.log_file.with_extension("log.1").exists());
    }
}
