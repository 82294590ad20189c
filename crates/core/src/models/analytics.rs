use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What kind of holding a detail row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailKind {
    Call,
    Put,
    Stock,
}

impl std::fmt::Display for DetailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetailKind::Call => write!(f, "Call"),
            DetailKind::Put => write!(f, "Put"),
            DetailKind::Stock => write!(f, "Stock"),
        }
    }
}

/// One contribution inside a daily-return bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDetail {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: DetailKind,
    pub amount: f64,
}

/// Premiums and realized stock gains bucketed by calendar date.
///
/// Option net premiums land on the position's open date; realized stock
/// P&L lands on the sale's close date. Serialized in the camelCase shape
/// the chart layer expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReturn {
    pub date: NaiveDate,
    pub premiums: f64,
    pub stock_gains: f64,
    pub total_returns: f64,
    pub premium_details: Vec<TradeDetail>,
    pub stock_details: Vec<TradeDetail>,
}

/// One open holding shown without double counting: a covered call stands
/// in for its underlying stock (using the stock's cost basis).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionDetail {
    pub symbol: String,
    pub kind: DetailKind,
    pub amount: f64,
}

/// Capital deployed into one sector: open stock cost basis plus open
/// cash-secured-put collateral. Covered-call capital is excluded — it is
/// already counted against the underlying stock entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorExposure {
    pub sector: String,
    pub amount: f64,
    pub positions: Vec<PositionDetail>,
}

/// Derived available-capital figure, not a live brokerage balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashPosition {
    /// Capital currently tied up: open CSP collateral + open stock cost basis
    pub active_capital: f64,

    /// deposits + premiums + realized P&L − active capital
    pub dry_powder: f64,
}

/// Win/loss statistics over completed trades. Shared between closed stock
/// positions (realized P&L) and non-open option positions (net premium).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeStats {
    pub closed_count: usize,
    pub win_count: usize,
    pub loss_count: usize,
    /// win_count / closed_count × 100
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
}

/// Aggregated P&L per underlying symbol, across stock and option activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub symbol: String,
    /// Sum of option net premiums for this symbol
    pub premiums_collected: f64,
    /// Realized stock P&L from closed positions
    pub stock_pnl: f64,
    /// premiums_collected + stock_pnl
    pub total_pnl: f64,
    /// Capital currently deployed (open option capital + open stock cost basis)
    pub capital: f64,
}

/// Detailed metrics for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDetails {
    pub symbol: String,
    pub total_premium_collected: f64,
    pub total_stock_pnl: f64,
    pub option_trade_count: usize,
    pub current_capital: f64,
    /// Average planned days-to-expiry across all option positions
    pub average_dte: f64,
    /// Average percent return across positions with a nonzero return
    pub avg_option_return: f64,
    pub total_pnl: f64,
    /// This symbol's share of overall portfolio P&L
    pub percent_of_overall_pnl: f64,
}

/// Weekly-return compliance bands against the 1% target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeeklyStatus {
    /// At or above 1%
    Compliant,
    /// Between 0.5% and 1%
    Warning,
    /// Below 0.5%
    Violation,
}

impl std::fmt::Display for WeeklyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeeklyStatus::Compliant => write!(f, "compliant"),
            WeeklyStatus::Warning => write!(f, "warning"),
            WeeklyStatus::Violation => write!(f, "violation"),
        }
    }
}

/// P&L for the Monday-to-Sunday week containing the evaluation date:
/// premiums collected on positions opened this week plus realized stock
/// P&L closed this week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPerformance {
    pub week_start: NaiveDate,
    pub weekly_pnl: f64,
    pub weekly_return_pct: f64,
    pub days_remaining: i64,
    pub status: WeeklyStatus,
    pub target_weekly_return: f64,
}

/// An injected end-of-month savings balance ("YYYY-MM").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBalance {
    pub month: String,
    pub balance: f64,
}

/// Net worth for one month: savings balance plus the brokerage value,
/// replayed as of month end for past months and live for the current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorthMonth {
    pub month: String,
    pub savings_balance: f64,
    pub brokerage_balance: f64,
    pub total_net_worth: f64,
}

/// Where a skipped input record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticSource {
    Funding,
    OptionTransaction,
}

/// A record the engine had to skip, kept so callers can decide whether to
/// log-and-continue or abort. Skipping is best-effort accounting; losing
/// rows silently is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDiagnostic {
    pub source: DiagnosticSource,
    pub detail: String,
}

/// Cumulative and annualized time-weighted return, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWeightedReturn {
    pub cumulative_pct: f64,
    pub annualized_pct: f64,
}

/// Full portfolio analytics, recomputed from scratch on every call.
/// Purely a view — nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    /// Evaluation date this snapshot was computed for
    pub as_of: NaiveDate,

    // ── Premiums ────────────────────────────────────────────────────
    /// Headline metric: sum of *positive* net premiums only
    pub total_premiums: f64,
    /// Sum of all net premiums including losses
    pub net_premiums: f64,
    /// Gross premium collected on positions with a positive net premium
    pub collected_premiums: f64,
    pub premium_per_day: f64,
    pub largest_premium: f64,
    pub smallest_premium: f64,
    pub average_premium: f64,
    /// Σ net premium / days-to-expiry over open positions
    pub daily_theta: f64,

    // ── Capital ─────────────────────────────────────────────────────
    /// Capital across all option positions (open and closed)
    pub total_capital: f64,
    /// Capital across open option positions (Puts and Calls)
    pub options_active_capital: f64,
    /// Open CSP collateral + open stock cost basis (covered-call capital
    /// excluded to avoid double counting)
    pub total_active_capital: f64,

    // ── Counts ──────────────────────────────────────────────────────
    pub open_options_count: usize,
    pub closed_options_count: usize,
    pub option_trades_count: usize,
    pub stock_trades_count: usize,
    pub total_trades_count: usize,
    pub days_since_start: i64,
    pub avg_return_per_trade: f64,

    // ── Portfolio ───────────────────────────────────────────────────
    pub total_deposits: f64,
    pub total_stock_pnl: f64,
    /// deposits + total premiums + realized stock P&L
    pub total_portfolio_value: f64,
    pub total_portfolio_profit: f64,
    pub total_portfolio_profit_pct: f64,

    // ── Series & returns ────────────────────────────────────────────
    pub daily_returns: Vec<DailyReturn>,
    pub time_weighted_return: TimeWeightedReturn,

    /// Input rows skipped while computing this snapshot
    pub diagnostics: Vec<InputDiagnostic>,
}
