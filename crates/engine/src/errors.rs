use thiserror::Error;

/// Typed error hierarchy for the analytics engine.
///
/// Library-internal errors use specific variants; application code wraps with
/// `anyhow::Context` for propagation.
#[derive(Error, Debug)]
pub enum EngineError {
    // -- Caller misuse ------------------------------------------------------
    #[error("invalid simulation config: {0}")]
    Config(String),

    // -- Data noise ---------------------------------------------------------
    #[error("malformed activity record: {reason}")]
    InputShape { reason: String },

    // -- Forwarded errors ---------------------------------------------------
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
