//! esexport - parallel sliced-scroll exporter
//!
//! Exports every document matching a query from an Elasticsearch cluster,
//! scrolling through several slices of the result set at once.
//!
//! # Usage
//!
//! ```bash
//! esexport --index logs --slices 4 --output logs.jsonl \
//!     --query '{"size": 1000, "query": {"match_all": {}}}'
//! ```

use std::sync::Arc;
use tracing::{Level, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use esexport::cli::CliInterface;
use esexport::client::EsClient;
use esexport::error::Result;
use esexport::export::{
    CursorOptions, DocumentSink, ExportCoordinator, ExportPlan, ExportReport, JsonLWriter,
    LogProgressObserver, NullSink, ProgressBarObserver, ProgressObserver,
};

/// Application entry point
#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle subcommands or run the export
///
/// # Returns
/// * `Result<bool>` - Whether every slice succeeded
async fn run() -> Result<bool> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(true);
    }

    let report = run_export(&cli).await?;
    print_report(&report);

    Ok(report.is_success())
}

/// Build the backend, sink and coordinator from the CLI and run the export
async fn run_export(cli: &CliInterface) -> Result<ExportReport> {
    let config = cli.config();
    let query = cli.parse_query()?;
    let backend = Arc::new(EsClient::new(&config.connection)?);

    let file_writer = match &cli.args().output {
        Some(path) => Some(Arc::new(JsonLWriter::new(path).await?)),
        None => None,
    };
    let sink: Arc<dyn DocumentSink> = match &file_writer {
        Some(writer) => writer.clone(),
        None => Arc::new(NullSink::new()),
    };

    let observer: Arc<dyn ProgressObserver> = if cli.show_progress() {
        Arc::new(ProgressBarObserver::new())
    } else {
        Arc::new(LogProgressObserver)
    };

    let plan = ExportPlan {
        slices: config.export.slices,
        slice_field: config.export.slice_field.clone(),
        query,
    };

    let report = ExportCoordinator::new(backend, plan, sink)
        .with_progress(observer)
        .with_poll_interval(config.progress_interval())
        .with_options(CursorOptions {
            trace_queries: config.logging.trace_queries,
        })
        .execute()
        .await?;

    if let Some(writer) = &file_writer {
        match writer.file_size().await {
            Ok(bytes) => println!("Output file: {} bytes", bytes),
            Err(e) => warn!("{}", e),
        }
    }

    Ok(report)
}

/// Print the outcome of every slice
fn print_report(report: &ExportReport) {
    println!();
    for partition in &report.partitions {
        match &partition.result {
            Ok(()) => println!(
                "Slice {}: {} documents in {:?}",
                partition.slice, partition.documents, partition.elapsed
            ),
            Err(e) => println!(
                "Slice {}: failed after {} documents: {}",
                partition.slice, partition.documents, e
            ),
        }
    }
    if let Some(e) = &report.sink_error {
        println!("Output: {}", e);
    }
    println!(
        "Exported {} documents in {} ms",
        report.documents_exported, report.elapsed_ms
    );
}

/// Initialize logging system based on verbosity level
fn initialize_logging(cli: &CliInterface) {
    let level: Level = cli.config().logging.level.to_tracing_level();

    // RUST_LOG directives win over the configured level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    // Configure timestamps
    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
