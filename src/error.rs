// ---------------------------------------------------------------------------
// RelayError
// ---------------------------------------------------------------------------

/// Errors raised by the relay hub.
///
/// Only `Bind` and `Serve` are fatal; everything else is scoped to a single
/// dispatch or a single connection.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("malformed payload for {event}: {reason}")]
    MalformedPayload { event: String, reason: String },

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

impl RelayError {
    /// Stable machine-readable code used in error frames and HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Bind { .. } => "BIND_ERROR",
            RelayError::Serve(_) => "SERVE_ERROR",
            RelayError::Connection(_) => "CONNECTION_ERROR",
            RelayError::MalformedPayload { .. } => "MALFORMED_PAYLOAD",
            RelayError::UnknownEvent(_) => "UNKNOWN_EVENT",
            RelayError::InvalidFrame(_) => "INVALID_FRAME",
        }
    }
}
