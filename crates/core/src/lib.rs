pub mod errors;
pub mod models;
pub mod services;

use std::collections::HashMap;

use chrono::NaiveDate;

use errors::LedgerError;
use models::{
    analytics::{
        AnalyticsSnapshot, CashPosition, DailyReturn, InputDiagnostic, MonthlyBalance,
        NetWorthMonth, PositionDetail, SectorExposure, SymbolDetails, SymbolSummary, TradeStats,
        WeeklyPerformance,
    },
    option::{OptionPosition, OptionTransaction},
    position::Position,
    transaction::{FundingTransaction, StockTransaction, TradeSide},
};
use services::{
    analytics_service::AnalyticsService, lot_service::LotTracker,
    option_service::OptionAggregator, returns_service::ReturnCalculator,
};

/// Main entry point for the wheel-ledger core library.
/// Holds the transaction ledger and all services that derive state from it.
///
/// Positions, analytics, and returns are never stored — every accessor
/// replays the ledger, so repeated calls with unchanged inputs produce
/// identical output.
#[must_use]
pub struct WheelLedger {
    stock_transactions: Vec<StockTransaction>,
    option_transactions: Vec<OptionTransaction>,
    funding: Vec<FundingTransaction>,
    savings: Vec<MonthlyBalance>,
    /// Injected current prices per symbol; missing symbols value at 0.
    prices: HashMap<String, f64>,
    /// Injected symbol → sector map; missing symbols group under "Other".
    sectors: HashMap<String, String>,
    lot_tracker: LotTracker,
    option_aggregator: OptionAggregator,
    return_calculator: ReturnCalculator,
    analytics_service: AnalyticsService,
}

impl std::fmt::Debug for WheelLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WheelLedger")
            .field("stock_transactions", &self.stock_transactions.len())
            .field("option_transactions", &self.option_transactions.len())
            .field("funding", &self.funding.len())
            .field("priced_symbols", &self.prices.len())
            .finish()
    }
}

impl WheelLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            stock_transactions: Vec::new(),
            option_transactions: Vec::new(),
            funding: Vec::new(),
            savings: Vec::new(),
            prices: HashMap::new(),
            sectors: HashMap::new(),
            lot_tracker: LotTracker::new(),
            option_aggregator: OptionAggregator::new(),
            return_calculator: ReturnCalculator::new(),
            analytics_service: AnalyticsService::new(),
        }
    }

    // ── Ledger Management ───────────────────────────────────────────

    /// Record a stock buy or sell. The ledger is kept in chronological
    /// order regardless of insertion order.
    pub fn add_stock_transaction(
        &mut self,
        date: NaiveDate,
        side: TradeSide,
        symbol: &str,
        shares: f64,
        price: f64,
        amount: f64,
        commission: f64,
    ) -> Result<uuid::Uuid, LedgerError> {
        if symbol.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Stock transaction symbol must not be empty".to_string(),
            ));
        }
        if shares <= 0.0 {
            return Err(LedgerError::Validation(format!(
                "Stock transaction share count must be positive, got {shares}"
            )));
        }
        let tx = StockTransaction::new(date, side, symbol, shares, price, amount, commission);
        let id = tx.id;
        self.stock_transactions.push(tx);
        self.stock_transactions.sort_by_key(|t| t.date);
        Ok(id)
    }

    /// Record an option transaction (build it with `OptionTransaction::new`).
    /// The ledger is kept in chronological order regardless of insertion order.
    pub fn add_option_transaction(
        &mut self,
        tx: OptionTransaction,
    ) -> Result<uuid::Uuid, LedgerError> {
        if tx.contracts == 0 {
            return Err(LedgerError::Validation(
                "Option transaction contract count must be positive".to_string(),
            ));
        }
        let id = tx.id;
        self.option_transactions.push(tx);
        self.option_transactions.sort_by_key(|t| t.date);
        Ok(id)
    }

    /// Record a raw funding row as exported by the broker. Rows are kept
    /// verbatim; parsing happens at read time with diagnostics for rows
    /// that fail.
    pub fn add_funding_record(&mut self, record: FundingTransaction) {
        self.funding.push(record);
    }

    /// Set the end-of-month savings balance for a "YYYY-MM" month,
    /// replacing any existing entry for that month.
    pub fn set_savings_balance(&mut self, month: &str, balance: f64) {
        match self.savings.iter_mut().find(|s| s.month == month) {
            Some(entry) => entry.balance = balance,
            None => self.savings.push(MonthlyBalance {
                month: month.to_string(),
                balance,
            }),
        }
        self.savings.sort_by(|a, b| a.month.cmp(&b.month));
    }

    /// Remove a stock transaction by its ID. Returns `true` if found.
    pub fn remove_stock_transaction(&mut self, id: uuid::Uuid) -> bool {
        let before = self.stock_transactions.len();
        self.stock_transactions.retain(|t| t.id != id);
        self.stock_transactions.len() != before
    }

    /// Remove an option transaction by its ID. Returns `true` if found.
    pub fn remove_option_transaction(&mut self, id: uuid::Uuid) -> bool {
        let before = self.option_transactions.len();
        self.option_transactions.retain(|t| t.id != id);
        self.option_transactions.len() != before
    }

    /// All stock transactions, oldest first.
    #[must_use]
    pub fn stock_transactions(&self) -> &[StockTransaction] {
        &self.stock_transactions
    }

    /// All option transactions, oldest first.
    #[must_use]
    pub fn option_transactions(&self) -> &[OptionTransaction] {
        &self.option_transactions
    }

    /// All raw funding rows, in insertion order.
    #[must_use]
    pub fn funding_records(&self) -> &[FundingTransaction] {
        &self.funding
    }

    // ── Prices & Sectors ────────────────────────────────────────────

    /// Set the current price used to value an open stock position.
    pub fn set_price(&mut self, symbol: &str, price: f64) {
        self.prices.insert(symbol.to_uppercase(), price);
    }

    /// Replace the whole price map at once.
    pub fn set_prices(&mut self, prices: HashMap<String, f64>) {
        self.prices = prices;
    }

    /// Assign a symbol to a sector for exposure grouping.
    pub fn set_sector(&mut self, symbol: &str, sector: &str) {
        self.sectors
            .insert(symbol.to_uppercase(), sector.to_string());
    }

    /// Replace the whole sector map at once.
    pub fn set_sectors(&mut self, sectors: HashMap<String, String>) {
        self.sectors = sectors;
    }

    // ── Positions ───────────────────────────────────────────────────

    /// FIFO stock positions: one closed record per sale plus at most one
    /// open record per held symbol, valued from the injected prices.
    pub fn stock_positions(&self) -> Result<Vec<Position>, LedgerError> {
        self.lot_tracker
            .positions(&self.stock_transactions, &self.prices)
    }

    /// Average cost basis per share of current holdings, per symbol.
    pub fn cost_basis_per_share(&self) -> Result<HashMap<String, f64>, LedgerError> {
        self.lot_tracker
            .cost_basis_per_share(&self.stock_transactions)
    }

    /// Option positions evaluated as of a given date. Open positions whose
    /// expiry has passed are reported as expired without being stored so.
    pub fn option_positions_as_of(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<OptionPosition>, LedgerError> {
        self.option_aggregator
            .positions(&self.option_transactions, &self.stock_transactions, as_of)
    }

    /// Option positions evaluated as of today.
    pub fn option_positions(&self) -> Result<Vec<OptionPosition>, LedgerError> {
        self.option_positions_as_of(Self::today())
    }

    /// Open stock positions only.
    pub fn open_stock_positions(&self) -> Result<Vec<Position>, LedgerError> {
        let mut positions = self.stock_positions()?;
        positions.retain(|p| p.is_open());
        Ok(positions)
    }

    /// Closed stock positions only.
    pub fn closed_stock_positions(&self) -> Result<Vec<Position>, LedgerError> {
        let mut positions = self.stock_positions()?;
        positions.retain(|p| p.is_closed());
        Ok(positions)
    }

    /// Stock positions for one symbol (case-insensitive).
    pub fn stock_positions_for_symbol(&self, symbol: &str) -> Result<Vec<Position>, LedgerError> {
        let upper = symbol.to_uppercase();
        let mut positions = self.stock_positions()?;
        positions.retain(|p| p.symbol == upper);
        Ok(positions)
    }

    /// Option positions for one symbol (case-insensitive), as of a date.
    pub fn option_positions_for_symbol(
        &self,
        symbol: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<OptionPosition>, LedgerError> {
        let upper = symbol.to_uppercase();
        let mut positions = self.option_positions_as_of(as_of)?;
        positions.retain(|p| p.symbol == upper);
        Ok(positions)
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Full analytics snapshot as of a given date.
    pub fn analytics_as_of(&self, as_of: NaiveDate) -> Result<AnalyticsSnapshot, LedgerError> {
        self.analytics_service.snapshot(
            &self.stock_transactions,
            &self.option_transactions,
            &self.funding,
            &self.prices,
            as_of,
        )
    }

    /// Full analytics snapshot as of today.
    pub fn analytics(&self) -> Result<AnalyticsSnapshot, LedgerError> {
        self.analytics_as_of(Self::today())
    }

    /// Total deposits plus diagnostics for funding rows that failed to parse.
    #[must_use]
    pub fn total_deposits(&self) -> (f64, Vec<InputDiagnostic>) {
        self.analytics_service.total_deposits(&self.funding)
    }

    /// Option premiums and realized stock P&L bucketed per calendar date.
    pub fn daily_returns_as_of(&self, as_of: NaiveDate) -> Result<Vec<DailyReturn>, LedgerError> {
        let option_positions = self.option_positions_as_of(as_of)?;
        let stock_positions = self.stock_positions()?;
        Ok(self
            .analytics_service
            .daily_returns(&option_positions, &stock_positions))
    }

    /// Daily return series serialized to JSON for the chart layer.
    pub fn daily_returns_json_as_of(&self, as_of: NaiveDate) -> Result<String, LedgerError> {
        let returns = self.daily_returns_as_of(as_of)?;
        serde_json::to_string(&returns)
            .map_err(|e| LedgerError::Serialization(format!("Failed to serialize daily returns: {e}")))
    }

    /// Capital exposure grouped by sector, largest first.
    pub fn sector_exposure_as_of(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<SectorExposure>, LedgerError> {
        let option_positions = self.option_positions_as_of(as_of)?;
        let stock_positions = self.stock_positions()?;
        Ok(self.analytics_service.sector_exposure(
            &stock_positions,
            &option_positions,
            &self.sectors,
        ))
    }

    /// Open holdings without double counting covered calls, largest first.
    pub fn position_details_as_of(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<PositionDetail>, LedgerError> {
        let option_positions = self.option_positions_as_of(as_of)?;
        let stock_positions = self.stock_positions()?;
        Ok(self
            .analytics_service
            .position_details(&stock_positions, &option_positions))
    }

    /// Active capital vs. dry powder as of a given date.
    pub fn cash_position_as_of(&self, as_of: NaiveDate) -> Result<CashPosition, LedgerError> {
        let snapshot = self.analytics_as_of(as_of)?;
        Ok(self.analytics_service.cash_position(&snapshot))
    }

    /// Aggregate P&L per symbol, sorted by symbol.
    pub fn symbol_summaries_as_of(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<SymbolSummary>, LedgerError> {
        let option_positions = self.option_positions_as_of(as_of)?;
        let stock_positions = self.stock_positions()?;
        Ok(self
            .analytics_service
            .symbol_summaries(&stock_positions, &option_positions))
    }

    /// Detailed metrics for a single symbol (case-insensitive).
    pub fn symbol_details_as_of(
        &self,
        symbol: &str,
        as_of: NaiveDate,
    ) -> Result<SymbolDetails, LedgerError> {
        let upper = symbol.to_uppercase();
        let snapshot = self.analytics_as_of(as_of)?;
        let option_positions = self.option_positions_as_of(as_of)?;
        let stock_positions = self.stock_positions()?;
        Ok(self.analytics_service.symbol_details(
            &upper,
            &stock_positions,
            &option_positions,
            snapshot.total_portfolio_profit,
        ))
    }

    /// Win/loss statistics over closed stock positions.
    pub fn stock_trade_stats(&self) -> Result<TradeStats, LedgerError> {
        let stock_positions = self.stock_positions()?;
        Ok(self.analytics_service.stock_stats(&stock_positions))
    }

    /// Win/loss statistics over option positions that reached a terminal state.
    pub fn option_trade_stats_as_of(&self, as_of: NaiveDate) -> Result<TradeStats, LedgerError> {
        let option_positions = self.option_positions_as_of(as_of)?;
        Ok(self.analytics_service.option_stats(&option_positions))
    }

    /// P&L for the Monday-to-Sunday week containing `as_of`, graded
    /// against the weekly return target.
    pub fn weekly_performance_as_of(
        &self,
        as_of: NaiveDate,
    ) -> Result<WeeklyPerformance, LedgerError> {
        let snapshot = self.analytics_as_of(as_of)?;
        let option_positions = self.option_positions_as_of(as_of)?;
        let stock_positions = self.stock_positions()?;
        Ok(self.analytics_service.weekly_performance(
            &stock_positions,
            &option_positions,
            snapshot.total_portfolio_value,
            as_of,
        ))
    }

    /// Monthly net worth across injected savings balances: past months use
    /// the replayed month-end brokerage value, the current month the live one.
    pub fn net_worth_as_of(&self, as_of: NaiveDate) -> Result<Vec<NetWorthMonth>, LedgerError> {
        let snapshot = self.analytics_as_of(as_of)?;
        self.analytics_service.net_worth(
            &self.savings,
            &self.stock_transactions,
            &self.option_transactions,
            &self.funding,
            snapshot.total_portfolio_value,
            as_of,
        )
    }

    // ── Returns ─────────────────────────────────────────────────────

    /// Portfolio value reconstructed purely from the ledger as of `date`.
    pub fn portfolio_value_as_of(&self, date: NaiveDate) -> Result<f64, LedgerError> {
        self.return_calculator.portfolio_value_as_of(
            &self.funding,
            &self.option_transactions,
            &self.stock_transactions,
            date,
        )
    }

    /// Deposit-adjusted time-weighted return (cumulative and annualized,
    /// both in percent) as of a given date.
    pub fn time_weighted_return_as_of(
        &self,
        as_of: NaiveDate,
    ) -> Result<models::analytics::TimeWeightedReturn, LedgerError> {
        self.return_calculator.time_weighted_return(
            &self.funding,
            &self.option_transactions,
            &self.stock_transactions,
            as_of,
        )
    }

    /// Time-weighted return as of today.
    pub fn time_weighted_return(
        &self,
    ) -> Result<models::analytics::TimeWeightedReturn, LedgerError> {
        self.time_weighted_return_as_of(Self::today())
    }

    // ── Export / Import ─────────────────────────────────────────────

    /// Export all stock transactions as a JSON string.
    pub fn export_stock_transactions_to_json(&self) -> Result<String, LedgerError> {
        serde_json::to_string_pretty(&self.stock_transactions).map_err(|e| {
            LedgerError::Serialization(format!("Failed to serialize stock transactions: {e}"))
        })
    }

    /// Export all option transactions as a JSON string.
    pub fn export_option_transactions_to_json(&self) -> Result<String, LedgerError> {
        serde_json::to_string_pretty(&self.option_transactions).map_err(|e| {
            LedgerError::Serialization(format!("Failed to serialize option transactions: {e}"))
        })
    }

    /// Import stock transactions from a JSON string. Returns the number
    /// imported; the ledger is re-sorted chronologically afterwards.
    pub fn import_stock_transactions_from_json(
        &mut self,
        json: &str,
    ) -> Result<usize, LedgerError> {
        let transactions: Vec<StockTransaction> = serde_json::from_str(json)?;
        let count = transactions.len();
        self.stock_transactions.extend(transactions);
        self.stock_transactions.sort_by_key(|t| t.date);
        Ok(count)
    }

    /// Import option transactions from a JSON string. Returns the number
    /// imported; the ledger is re-sorted chronologically afterwards.
    pub fn import_option_transactions_from_json(
        &mut self,
        json: &str,
    ) -> Result<usize, LedgerError> {
        let transactions: Vec<OptionTransaction> = serde_json::from_str(json)?;
        let count = transactions.len();
        self.option_transactions.extend(transactions);
        self.option_transactions.sort_by_key(|t| t.date);
        Ok(count)
    }

    // ── Convenience Helpers ─────────────────────────────────────────

    /// Stock transactions for one symbol (case-insensitive), oldest first.
    #[must_use]
    pub fn stock_transactions_for_symbol(&self, symbol: &str) -> Vec<&StockTransaction> {
        let upper = symbol.to_uppercase();
        self.stock_transactions
            .iter()
            .filter(|t| t.symbol == upper)
            .collect()
    }

    /// Option transactions for one symbol (case-insensitive), oldest first.
    #[must_use]
    pub fn option_transactions_for_symbol(&self, symbol: &str) -> Vec<&OptionTransaction> {
        let upper = symbol.to_uppercase();
        self.option_transactions
            .iter()
            .filter(|t| t.symbol == upper)
            .collect()
    }

    /// Date of the earliest transaction in either ledger.
    #[must_use]
    pub fn earliest_transaction_date(&self) -> Option<NaiveDate> {
        let stock = self.stock_transactions.first().map(|t| t.date);
        let option = self.option_transactions.first().map(|t| t.date);
        match (stock, option) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Total number of recorded transactions across both ledgers.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.stock_transactions.len() + self.option_transactions.len()
    }

    // ── Internal ────────────────────────────────────────────────────

    fn today() -> NaiveDate {
        chrono::Utc::now().date_naive()
    }
}

impl Default for WheelLedger {
    fn default() -> Self {
        Self::new()
    }
}
