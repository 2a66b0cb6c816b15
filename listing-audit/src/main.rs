//! listing-audit - Listing integrity checks
//!
//! Reads a batch of listing messages (queue envelope, array, or single
//! object) from a file or stdin, evaluates every listing, upserts the
//! results, and prints the batch report as JSON on stdout.

use anyhow::{Context, Result};
use clap::Parser;
use listing_audit::batch::{parse_batch, ListingAuditor};
use listing_audit::checks::AddressBackend;
use listing_audit::clients::{
    AddressAutocomplete, AddressValidator, Classifier, GoogleAddressValidationClient,
    GooglePlacesAutocompleteClient, OpenAiClassifier,
};
use listing_audit::orchestrator::{CheckOrchestrator, OrchestratorConfig};
use listing_audit::store::{ListingStore, MemoryListingStore, SqliteListingStore};
use listing_common::config::{AddressStrategy, ConfigResolver, TomlConfig};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "listing-audit")]
#[command(about = "Evaluate business listings against integrity checks")]
#[command(version)]
struct Args {
    /// Batch document to process ("-" reads stdin)
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Path to configuration file
    #[arg(short, long, env = "LISTING_AUDIT_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(short, long, env = "LISTING_AUDIT_DATABASE")]
    database: Option<PathBuf>,

    /// Address authenticity strategy (overrides config)
    #[arg(long, value_parser = clap::value_parser!(AddressStrategy))]
    address_strategy: Option<AddressStrategy>,

    /// Evaluate without writing to the database
    #[arg(long)]
    dry_run: bool,

    /// Records evaluated at the same time (overrides config)
    #[arg(long)]
    max_concurrent_records: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Installed before config resolution, which logs
    let filter_handle = init_tracing();

    let mut config = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;
    apply_overrides(&mut config, &args);

    if let Some(handle) = filter_handle {
        handle
            .reload(EnvFilter::new(config.logging.filter_directive()))
            .context("Failed to apply configured log level")?;
    }

    info!("Starting listing-audit");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Address strategy: {}", config.address.strategy);

    let classifier: Arc<dyn Classifier> = Arc::new(
        OpenAiClassifier::from_config(&config.classifier)
            .context("Failed to configure classification client")?,
    );
    let sampling = OpenAiClassifier::sampling_from(&config.classifier);
    let address = build_address_backend(&config)?;

    let orchestrator = Arc::new(CheckOrchestrator::standard(
        OrchestratorConfig::from(&config.orchestrator),
        classifier,
        sampling,
        address,
    ));
    info!("Registered {} checks", orchestrator.count());

    let store: Arc<dyn ListingStore> = if args.dry_run {
        warn!("Dry run: results will not be persisted");
        Arc::new(MemoryListingStore::new())
    } else {
        let db_path = config.database.resolved_path();
        info!("Database: {}", db_path.display());
        Arc::new(
            SqliteListingStore::open(&db_path)
                .await
                .with_context(|| format!("Failed to open database {}", db_path.display()))?,
        )
    };

    let document = read_input(&args.input)?;
    let items = parse_batch(&document).context("Failed to parse batch document")?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let auditor = ListingAuditor::new(orchestrator, store)
        .with_max_concurrent_records(config.orchestrator.max_concurrent_records)
        .with_cancellation(cancel);
    let report = auditor.process_batch(items).await;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to encode batch report")?
    );

    if report.failed > 0 {
        warn!("{} of {} records failed", report.failed, report.results.len());
    }
    Ok(())
}

fn apply_overrides(config: &mut TomlConfig, args: &Args) {
    if let Some(path) = &args.database {
        config.database.path = Some(path.clone());
    }
    if let Some(strategy) = args.address_strategy {
        config.address.strategy = strategy;
    }
    if let Some(limit) = args.max_concurrent_records {
        config.orchestrator.max_concurrent_records = limit;
    }
}

/// `RUST_LOG` wins for the whole run
///
/// Without it, logging starts at `info` and the returned handle swaps in the
/// configured level once the config file is read.
fn init_tracing() -> Option<reload::Handle<EnvFilter, Registry>> {
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    (!from_env).then_some(handle)
}

fn build_address_backend(config: &TomlConfig) -> Result<AddressBackend> {
    Ok(match config.address.strategy {
        AddressStrategy::Validation => {
            let client: Arc<dyn AddressValidator> = Arc::new(
                GoogleAddressValidationClient::from_config(&config.address)
                    .context("Failed to configure address validation client")?,
            );
            AddressBackend::Validation(client)
        }
        AddressStrategy::Autocomplete => {
            let client: Arc<dyn AddressAutocomplete> = Arc::new(
                GooglePlacesAutocompleteClient::from_config(&config.address)
                    .context("Failed to configure address autocomplete client")?,
            );
            AddressBackend::Autocomplete(client)
        }
    })
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read batch from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))
    }
}

/// Cancel in-flight evaluations on Ctrl+C
async fn shutdown_signal(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            warn!("Received Ctrl+C, cancelling in-flight evaluations");
            cancel.cancel();
        }
        Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
    }
}
