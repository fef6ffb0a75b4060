use thiserror::Error;

/// Canonical error taxonomy for the plugin server.
///
/// Classification guidance:
/// - [`SseError::MalformedHeader`]: a call-metadata header is present but cannot be decoded
/// - [`SseError::UnknownFunction`]: the selected function id is not in the catalog
/// - [`SseError::RowShape`]: an inbound row carries fewer duals than the function reads
/// - [`SseError::CardinalityOverrun`] / [`SseError::CardinalityUnderrun`]: the row count
///   disagrees with the declared cardinality
/// - [`SseError::Cancelled`]: the peer aborted the call or stopped reading
/// - [`SseError::Transport`]: any other inbound stream failure
/// - [`SseError::Remote`]: a status returned by a plugin server, seen from the client side
/// - [`SseError::InvalidConfig`]: environment / TLS material problems at startup
/// - [`SseError::Io`]: raw filesystem/network IO failures from std APIs
///
/// Every variant terminates the current call only.
#[derive(Debug, Error)]
pub enum SseError {
    /// Header entry present in call metadata but undecodable.
    ///
    /// Examples:
    /// - binary metadata value that is not valid base64
    /// - bytes that do not parse as the expected protobuf message
    /// - negative cardinality
    #[error("malformed header '{key}': {reason}")]
    MalformedHeader { key: &'static str, reason: String },

    /// Function id outside the advertised set, including the invalid sentinel.
    #[error("unknown function id {0}")]
    UnknownFunction(i32),

    /// Row lacks the columns the selected function consumes.
    #[error("row {row} has {actual} duals, function '{function}' needs at least {required}")]
    RowShape {
        function: &'static str,
        row: u64,
        required: usize,
        actual: usize,
    },

    /// More rows arrived than the call header declared.
    #[error("cardinality overrun: declared {declared} rows, received row #{received}")]
    CardinalityOverrun { declared: u64, received: u64 },

    /// Stream closed before the declared number of rows arrived.
    #[error("cardinality underrun: declared {declared} rows, stream closed after {received}")]
    CardinalityUnderrun { declared: u64, received: u64 },

    /// Peer aborted the call or the outbound side was dropped.
    #[error("call cancelled: {0}")]
    Cancelled(String),

    /// Inbound stream failure other than cancellation, or an unreachable server.
    #[error("transport error: {0}")]
    Transport(String),

    /// Status returned by the server; `code` is the numeric gRPC status code.
    #[error("remote call failed with status {code}: {message}")]
    Remote { code: i32, message: String },

    /// Invalid or inconsistent process configuration.
    ///
    /// Examples:
    /// - unparsable port or policy value in the environment
    /// - missing PEM file in the TLS directory
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transparent std IO failures.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SseError {
    /// Short stable label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SseError::MalformedHeader { .. } => "malformed_header",
            SseError::UnknownFunction(_) => "unknown_function",
            SseError::RowShape { .. } => "row_shape",
            SseError::CardinalityOverrun { .. } => "cardinality_overrun",
            SseError::CardinalityUnderrun { .. } => "cardinality_underrun",
            SseError::Cancelled(_) => "cancelled",
            SseError::Transport(_) => "transport",
            SseError::Remote { .. } => "remote",
            SseError::InvalidConfig(_) => "invalid_config",
            SseError::Io(_) => "io",
        }
    }
}

/// Standard plugin result alias.
pub type Result<T> = std::result::Result<T, SseError>;
