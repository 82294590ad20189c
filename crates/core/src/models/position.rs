use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A batch of shares acquired in one Buy transaction, tracked until
/// fully sold. Owned exclusively by the lot tracker's per-symbol queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// Date the shares were bought
    pub open_date: NaiveDate,

    /// Shares remaining in this lot (shrinks on partial sells, never negative)
    pub shares: f64,

    /// Per-share price paid
    pub price: f64,

    /// Cost basis remaining: amount paid + commission, reduced
    /// proportionally on partial sells
    pub cost_basis: f64,
}

impl Lot {
    pub fn new(open_date: NaiveDate, shares: f64, price: f64, cost_basis: f64) -> Self {
        Self {
            open_date,
            shares,
            price,
            cost_basis,
        }
    }
}

/// Whether a position row represents still-held shares or a completed sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionKind {
    /// Remaining open lots for a symbol, merged into one row
    Open,
    /// The lots consumed by one specific Sell transaction
    Closed,
}

impl std::fmt::Display for PositionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionKind::Open => write!(f, "open"),
            PositionKind::Closed => write!(f, "closed"),
        }
    }
}

/// A stock position derived from FIFO lot replay.
///
/// A closed Position is produced exactly once per Sell transaction (it may
/// cover several lots); an open Position is produced at most once per symbol
/// and merges all remaining lots. Every lot contributes to exactly one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub kind: PositionKind,

    /// Shares covered by this row
    pub shares: f64,

    /// Share-weighted average buy price of the lots behind this row
    pub avg_buy_price: f64,

    /// Execution price of the closing sale (closed rows only)
    pub avg_sell_price: f64,

    /// Cost basis of the covered lots (amount + commission)
    pub cost_basis: f64,

    /// Sale amount minus commission (closed rows only)
    pub sale_proceeds: f64,

    /// sale_proceeds − cost_basis (closed rows only)
    pub realized_pnl: f64,

    /// realized_pnl / cost_basis × 100 (closed rows only)
    pub return_pct: f64,

    /// Earliest open date among the covered lots
    pub open_date: NaiveDate,

    /// Sell date (closed rows only)
    pub close_date: Option<NaiveDate>,

    /// Current market price from the injected quote map (open rows;
    /// missing symbol defaults to 0.0)
    pub current_price: f64,

    /// current_price × shares (open rows only)
    pub market_value: f64,

    /// market_value − cost_basis (open rows only)
    pub unrealized_pnl: f64,

    /// unrealized_pnl / cost_basis × 100 (open rows only)
    pub unrealized_pct: f64,
}

impl Position {
    /// Whether this row represents still-held shares.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.kind == PositionKind::Open
    }

    /// Whether this row represents a completed sale.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.kind == PositionKind::Closed
    }
}
