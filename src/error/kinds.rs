use std::{fmt, io};

/// Crate-wide `Result` type using [`EsExportError`] as the error.
pub type Result<T> = std::result::Result<T, EsExportError>;

/// Top-level error type for export operations.
#[derive(Debug)]
pub enum EsExportError {
    /// Slice index is out of range for the slice count.
    InvalidPartition { index: usize, count: usize },

    /// The base query could not be parsed or merged with the slice clause.
    MalformedQuery(String),

    /// A search or scroll request failed.
    Transport(TransportError),

    /// The backend answered from a subset of its shards.
    IncompleteShardResponse {
        total: u64,
        successful: u64,
        failed: u64,
    },

    /// The cursor already failed and cannot continue.
    CursorFailed { slice: usize },

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// Writing documents to the output failed.
    Sink(String),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Errors raised by the HTTP transport.
#[derive(Debug)]
pub enum TransportError {
    /// The request could not be sent or the connection dropped.
    Request(String),

    /// The backend answered with a non-200 status.
    Status { status: u16, body: String },

    /// The response body was not a valid search response.
    Decode(String),

    /// The configured host is not a usable URL.
    InvalidHost(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

impl EsExportError {
    /// Whether this error ends only the slice that raised it.
    ///
    /// Everything else aborts the export before any slice starts.
    pub fn is_partition_fatal(&self) -> bool {
        matches!(
            self,
            EsExportError::Transport(_)
                | EsExportError::IncompleteShardResponse { .. }
                | EsExportError::CursorFailed { .. }
                | EsExportError::Sink(_)
        )
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for EsExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EsExportError::InvalidPartition { index, count } => {
                write!(f, "Invalid partition: slice {index} is out of range for {count} slices")
            }
            EsExportError::MalformedQuery(msg) => write!(f, "Malformed query: {msg}"),
            EsExportError::Transport(e) => write!(f, "Transport error: {e}"),
            EsExportError::IncompleteShardResponse {
                total,
                successful,
                failed,
            } => write!(
                f,
                "Response incomplete (shards response: [total: {total}, successful: {successful}, failed: {failed}])"
            ),
            EsExportError::CursorFailed { slice } => {
                write!(f, "Cursor for slice {slice} already failed")
            }
            EsExportError::Config(e) => write!(f, "Configuration error: {e}"),
            EsExportError::Io(e) => write!(f, "I/O error: {e}"),
            EsExportError::Sink(msg) => write!(f, "Output error: {msg}"),
            EsExportError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Request(msg) => write!(f, "Request failed: {msg}"),
            TransportError::Status { status, .. } => {
                write!(f, "Unexpected response received: {status}")
            }
            TransportError::Decode(msg) => write!(f, "Error decoding response: {msg}"),
            TransportError::InvalidHost(host) => write!(f, "Invalid host URL: {host}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for EsExportError {}
impl std::error::Error for TransportError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to EsExportError ========================= */

impl From<io::Error> for EsExportError {
    fn from(err: io::Error) -> Self {
        EsExportError::Io(err)
    }
}

impl From<TransportError> for EsExportError {
    fn from(err: TransportError) -> Self {
        EsExportError::Transport(err)
    }
}

impl From<ConfigError> for EsExportError {
    fn from(err: ConfigError) -> Self {
        EsExportError::Config(err)
    }
}

impl From<reqwest::Error> for EsExportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EsExportError::Transport(TransportError::Decode(err.to_string()))
        } else {
            EsExportError::Transport(TransportError::Request(err.to_string()))
        }
    }
}
