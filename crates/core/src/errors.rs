use chrono::NaiveDate;
use thiserror::Error;

/// Unified error type for the entire wheel-ledger-core library.
/// Every fallible public function returns `Result<T, LedgerError>`.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ── Lot accounting ──────────────────────────────────────────────
    /// A sell transaction asked for more shares than the FIFO queue holds.
    /// The original data source silently saturated here; failing loudly
    /// surfaces data-entry errors instead of masking them.
    #[error(
        "Insufficient lots for {symbol} on {date}: selling {requested} shares, only {available} tracked"
    )]
    InsufficientLots {
        symbol: String,
        date: NaiveDate,
        requested: f64,
        available: f64,
    },

    // ── Input records ───────────────────────────────────────────────
    #[error("Malformed amount '{value}' in funding record dated '{date}'")]
    MalformedAmount { value: String, date: String },

    #[error("Malformed date '{0}' in funding record")]
    MalformedDate(String),

    #[error("Transaction validation failed: {0}")]
    Validation(String),

    // ── Serialization ───────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}
