//! Command-line interface for esexport
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Turning the query argument into a search body

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use crate::config::{Config, LogLevel};
use crate::error::{EsExportError, Result};

const EXAMPLES: &str = "Examples:
    esexport --slices 2 --output out.jsonl --query '{\"_source\":[\"false\"], \"size\": 1000, \"query\":{\"bool\":{\"filter\":{\"term\":{\"field\":\"value\"}}}}}'";

/// Export every document matching a query using parallel sliced scrolls
#[derive(Parser, Debug)]
#[command(
    name = "esexport",
    version,
    about = "Parallel sliced-scroll exporter for Elasticsearch",
    after_help = EXAMPLES
)]
pub struct CliArgs {
    /// Elasticsearch host
    #[arg(long, value_name = "URL")]
    pub host: Option<String>,

    /// Query to slice (JSON search body)
    #[arg(long, value_name = "JSON", default_value = "{}")]
    pub query: String,

    /// Routing passed to the query
    #[arg(long, value_name = "ROUTING")]
    pub routing: Option<String>,

    /// Search context TTL used to search and scroll
    #[arg(long = "scroll-ttl", alias = "searchContextTTL", value_name = "TTL")]
    pub scroll_ttl: Option<String>,

    /// Index to search (appended to the search URL)
    #[arg(long, value_name = "INDEX")]
    pub index: Option<String>,

    /// Document type (appended to the search URL)
    #[arg(long = "type", value_name = "TYPE")]
    pub doc_type: Option<String>,

    /// Number of slices
    #[arg(long, alias = "sliceSize", value_name = "N")]
    pub slices: Option<usize>,

    /// The field used to slice the query
    #[arg(long = "slice-field", alias = "sliceField", value_name = "FIELD")]
    pub slice_field: Option<String>,

    /// Output file (JSON Lines); documents are discarded when omitted
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Disable the progress bar
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Log each slice's query, total and timings
    #[arg(long, env = "ESEXPORTDEBUG", value_parser = clap::builder::FalseyValueParser::new())]
    pub debug: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for esexport
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version,

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface from the process arguments
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Create a CLI interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and merge with arguments
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, args);
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Parse the query argument into a search body
    ///
    /// # Returns
    /// * `Result<Value>` - JSON object, or `MalformedQuery`
    pub fn parse_query(&self) -> Result<Value> {
        parse_query(&self.args.query)
    }

    /// Whether the progress bar should be drawn
    pub fn show_progress(&self) -> bool {
        self.config.export.show_progress && !self.args.quiet
    }

    /// Apply CLI arguments to configuration
    ///
    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_connection_args(config, args);
        Self::apply_export_args(config, args);
        Self::apply_logging_args(config, args);
    }

    /// Apply connection-related CLI arguments to configuration
    fn apply_connection_args(config: &mut Config, args: &CliArgs) {
        let conn = &mut config.connection;

        if let Some(host) = &args.host {
            conn.host = host.clone();
        }
        if let Some(index) = &args.index {
            conn.index = index.clone();
        }
        if let Some(doc_type) = &args.doc_type {
            conn.doc_type = doc_type.clone();
        }
        if let Some(routing) = &args.routing {
            conn.routing = routing.clone();
        }
        if let Some(ttl) = &args.scroll_ttl {
            conn.scroll_ttl = ttl.clone();
        }
        if let Some(timeout) = args.timeout {
            conn.timeout = timeout;
        }
    }

    /// Apply export-related CLI arguments to configuration
    fn apply_export_args(config: &mut Config, args: &CliArgs) {
        if let Some(slices) = args.slices {
            config.export.slices = slices;
        }
        if let Some(field) = &args.slice_field {
            config.export.slice_field = Some(field.clone()).filter(|f| !f.is_empty());
        }
        if args.no_progress {
            config.export.show_progress = false;
        }
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose || args.debug {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };

        if args.debug {
            config.logging.trace_queries = true;
        }
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - True if subcommand was handled, false to continue
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Version) => {
                println!("esexport version {}", env!("CARGO_PKG_VERSION"));
                Ok(true)
            }
            Some(Commands::Config { show, validate }) => {
                if *validate {
                    self.validate_config_file();
                }
                if *show {
                    println!("{}", self.config.to_toml()?);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Validate configuration file
    fn validate_config_file(&self) {
        let path = self
            .args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path);
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("Configuration file does not exist, defaults apply");
            return;
        }

        match Config::load_from_file(Some(path.as_path())).and_then(|c| c.validate()) {
            Ok(()) => println!("Configuration is valid"),
            Err(e) => println!("Configuration is invalid: {}", e),
        }
    }
}

/// Parse a JSON search body
///
/// The body must be a JSON object; anything else cannot carry a slice clause.
pub fn parse_query(query: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(query)
        .map_err(|e| EsExportError::MalformedQuery(format!("Error parsing query: {e}")))?;

    if !value.is_object() {
        return Err(EsExportError::MalformedQuery(
            "query must be a JSON object".to_string(),
        ));
    }

    Ok(value)
}
