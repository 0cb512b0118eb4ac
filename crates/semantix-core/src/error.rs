use thiserror::Error;

/// Errors surfaced by the message bridge.
///
/// These never escape the storage facade: every facade method catches,
/// logs, and substitutes a documented sentinel so callers see "key
/// absent" rather than a distinguishable transport failure.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("request {0} timed out")]
    Timeout(String),

    #[error("bridge transport closed")]
    TransportClosed,

    #[error("host rejected request: {0}")]
    Rejected(String),

    #[error("malformed response payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
