use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shares covered by one option contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// What an option transaction does to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionAction {
    /// Opens the position and collects premium
    #[serde(rename = "Sell to Open")]
    SellToOpen,
    /// Closes (or rolls) the position by paying premium back
    #[serde(rename = "Buy to Close")]
    BuyToClose,
    /// The option expired worthless
    Expired,
    /// The short option was assigned
    Assigned,
    /// The option was exercised
    Exercised,
}

impl std::fmt::Display for OptionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionAction::SellToOpen => write!(f, "Sell to Open"),
            OptionAction::BuyToClose => write!(f, "Buy to Close"),
            OptionAction::Expired => write!(f, "Expired"),
            OptionAction::Assigned => write!(f, "Assigned"),
            OptionAction::Exercised => write!(f, "Exercised"),
        }
    }
}

/// Call or Put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Call => write!(f, "Call"),
            OptionType::Put => write!(f, "Put"),
        }
    }
}

/// Lifecycle state of an option position. Transitions are one-way
/// (Open → terminal); the only exception is the read-time reclassification
/// of an Open position past its expiry to Expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionStatus {
    Open,
    Expired,
    Assigned,
    Exercised,
    #[serde(rename = "Closed Early")]
    ClosedEarly,
    Rolled,
}

impl std::fmt::Display for OptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionStatus::Open => write!(f, "Open"),
            OptionStatus::Expired => write!(f, "Expired"),
            OptionStatus::Assigned => write!(f, "Assigned"),
            OptionStatus::Exercised => write!(f, "Exercised"),
            OptionStatus::ClosedEarly => write!(f, "Closed Early"),
            OptionStatus::Rolled => write!(f, "Rolled"),
        }
    }
}

/// One leg of an option position's history, as recorded by the brokerage
/// export. Legs sharing a `position_id` aggregate into one `OptionPosition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionTransaction {
    /// Unique identifier
    pub id: Uuid,

    /// Trade date
    pub date: NaiveDate,

    /// What this leg does to the position
    pub action: OptionAction,

    /// Underlying ticker symbol, uppercased
    pub symbol: String,

    /// Call or Put
    pub option_type: OptionType,

    /// Strike price
    pub strike: f64,

    /// Contract expiry date
    pub expiry: NaiveDate,

    /// Number of contracts
    pub contracts: u32,

    /// Premium cash effect: positive for credit, negative for debit
    pub premium: f64,

    /// Underlying stock price at trade time (covered-call capital fallback)
    pub stock_price: f64,

    /// Commission charged for this leg
    pub commission: f64,

    /// Groups legs into one position; empty ids are skipped with a warning
    pub position_id: String,

    /// Free-text notes; a Buy to Close mentioning "roll" marks the position Rolled
    pub notes: String,
}

impl OptionTransaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        date: NaiveDate,
        action: OptionAction,
        symbol: impl Into<String>,
        option_type: OptionType,
        strike: f64,
        expiry: NaiveDate,
        contracts: u32,
        premium: f64,
        stock_price: f64,
        commission: f64,
        position_id: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            action,
            symbol: symbol.into().to_uppercase(),
            option_type,
            strike,
            expiry,
            contracts,
            premium,
            stock_price,
            commission,
            position_id: position_id.into(),
            notes: notes.into(),
        }
    }
}

/// An aggregated option position: all legs sharing one position id, plus
/// the derived premium, capital, and return metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPosition {
    /// Unique key grouping the legs
    pub position_id: String,

    pub symbol: String,
    pub option_type: OptionType,
    pub strike: f64,
    pub expiry: NaiveDate,
    pub contracts: u32,

    /// Lifecycle state (includes the read-time lazy-expiry projection)
    pub status: OptionStatus,

    /// Date of the opening leg, if one was recorded
    pub open_date: Option<NaiveDate>,

    /// Date of the closing leg, or the expiry for lazily expired positions
    pub close_date: Option<NaiveDate>,

    /// Premium credited on opening legs
    pub premium_collected: f64,

    /// Premium debited on closing legs (stored positive)
    pub premium_paid: f64,

    /// premium_collected − premium_paid − commissions
    pub net_premium: f64,

    /// Total commissions across all legs (counted once in net premium)
    pub commissions: f64,

    /// Best case: keeping the full collected premium
    pub max_profit: f64,

    /// Whole days between open and close (0 if same day)
    pub days_held: i64,

    /// Whole days between open and expiry, floored at 1
    pub days_to_expiry: i64,

    /// net_premium / capital × 100
    pub percent_return: f64,

    /// percent_return annualized over the planned holding period
    /// (days to expiry, not actual days held)
    pub annualized_return: f64,

    /// Capital requirement: CSP collateral for Puts, underlying cost
    /// basis (or trade-time price fallback) for covered Calls
    pub capital: f64,
}

impl OptionPosition {
    /// Whether the position is still open (after the lazy-expiry projection).
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == OptionStatus::Open
    }

    /// Whether the position reached any terminal state.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status != OptionStatus::Open
    }
}
