use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::LedgerError;

/// Side of a stock trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    /// Acquiring shares — opens a new FIFO lot
    Buy,
    /// Disposing of shares — consumes lots front-to-back
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "Buy"),
            TradeSide::Sell => write!(f, "Sell"),
        }
    }
}

/// A single stock trade as recorded by the brokerage export.
///
/// Transactions are assumed chronological per symbol; the engine replays
/// them in the order supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTransaction {
    /// Unique identifier
    pub id: Uuid,

    /// Trade date (no time component — daily granularity)
    pub date: NaiveDate,

    /// Buy or Sell
    pub side: TradeSide,

    /// Ticker symbol, uppercased (e.g., "AAPL")
    pub symbol: String,

    /// Number of shares traded (always positive; fractional allowed)
    pub shares: f64,

    /// Per-share execution price
    pub price: f64,

    /// Signed cash effect of the trade, excluding commission
    pub amount: f64,

    /// Commission charged by the broker
    pub commission: f64,
}

impl StockTransaction {
    pub fn new(
        date: NaiveDate,
        side: TradeSide,
        symbol: impl Into<String>,
        shares: f64,
        price: f64,
        amount: f64,
        commission: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            side,
            symbol: symbol.into().to_uppercase(),
            shares,
            price,
            amount,
            commission,
        }
    }
}

/// Funding record type string for deposits. Other kinds pass through
/// untouched; only deposits feed the capital-base calculations.
pub const FUNDING_DEPOSIT: &str = "Deposit";

/// Date format used by the funding export (e.g. "August 25 2025").
const FUNDING_DATE_FORMAT: &str = "%B %d %Y";

/// A raw funding record as it comes off the account-statement boundary.
///
/// Dates arrive in a human-readable long form and amounts as currency
/// strings ("$10,000"); the engine owns this parsing and collects a
/// diagnostic for every row it has to skip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingTransaction {
    /// Date in long form, e.g. "August 25 2025"
    pub date: String,

    /// Record kind, e.g. "Deposit"
    pub kind: String,

    /// Amount as a currency string, e.g. "$10,000"
    pub amount: String,
}

impl FundingTransaction {
    pub fn new(
        date: impl Into<String>,
        kind: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            kind: kind.into(),
            amount: amount.into(),
        }
    }

    /// Whether this record is a cash deposit.
    #[must_use]
    pub fn is_deposit(&self) -> bool {
        self.kind == FUNDING_DEPOSIT
    }

    /// Parse the long-form date ("August 25 2025").
    pub fn parse_date(&self) -> Result<NaiveDate, LedgerError> {
        NaiveDate::parse_from_str(self.date.trim(), FUNDING_DATE_FORMAT)
            .map_err(|_| LedgerError::MalformedDate(self.date.clone()))
    }

    /// Parse the currency-string amount, stripping `$` and thousands commas.
    pub fn parse_amount(&self) -> Result<f64, LedgerError> {
        let cleaned: String = self
            .amount
            .trim()
            .chars()
            .filter(|c| *c != '$' && *c != ',')
            .collect();
        cleaned
            .parse::<f64>()
            .map_err(|_| LedgerError::MalformedAmount {
                value: self.amount.clone(),
                date: self.date.clone(),
            })
    }
}
