use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate};
use log::debug;

use crate::errors::LedgerError;
use crate::models::analytics::{
    AnalyticsSnapshot, CashPosition, DailyReturn, DetailKind, DiagnosticSource, InputDiagnostic,
    MonthlyBalance, NetWorthMonth, PositionDetail, SectorExposure, SymbolDetails, SymbolSummary,
    TradeDetail, TradeStats, WeeklyPerformance, WeeklyStatus,
};
use crate::models::option::{OptionPosition, OptionTransaction, OptionType};
use crate::models::position::Position;
use crate::models::transaction::{FundingTransaction, StockTransaction};
use crate::services::lot_service::LotTracker;
use crate::services::option_service::OptionAggregator;
use crate::services::returns_service::ReturnCalculator;

/// Sector bucket for symbols missing from the injected sector map.
pub const SECTOR_OTHER: &str = "Other";

/// Weekly return target, in percent.
const TARGET_WEEKLY_RETURN: f64 = 1.0;

/// Reduces positions, option positions, and funding records into
/// portfolio-level numbers and time series.
///
/// Every method recomputes from scratch; there is no cache and no
/// persisted derived state.
pub struct AnalyticsService {
    lot_tracker: LotTracker,
    option_aggregator: OptionAggregator,
    return_calculator: ReturnCalculator,
}

impl AnalyticsService {
    pub fn new() -> Self {
        Self {
            lot_tracker: LotTracker::new(),
            option_aggregator: OptionAggregator::new(),
            return_calculator: ReturnCalculator::new(),
        }
    }

    /// Compute the full analytics snapshot as of `as_of`.
    pub fn snapshot(
        &self,
        stock_transactions: &[StockTransaction],
        option_transactions: &[OptionTransaction],
        funding: &[FundingTransaction],
        prices: &HashMap<String, f64>,
        as_of: NaiveDate,
    ) -> Result<AnalyticsSnapshot, LedgerError> {
        let option_positions =
            self.option_aggregator
                .positions(option_transactions, stock_transactions, as_of)?;
        let stock_positions = self.lot_tracker.positions(stock_transactions, prices)?;

        let mut total_premiums = 0.0;
        let mut net_premiums = 0.0;
        let mut collected_premiums = 0.0;
        let mut largest_premium = 0.0;
        let mut smallest_premium: Option<f64> = None;
        let mut premium_count = 0usize;
        let mut daily_theta = 0.0;

        let mut total_capital = 0.0;
        let mut options_active_capital = 0.0;
        let mut total_active_capital = 0.0;

        let mut open_options_count = 0usize;
        let mut closed_options_count = 0usize;
        let mut total_returns = 0.0;
        let mut return_count = 0usize;
        let mut earliest_open: Option<NaiveDate> = None;

        for pos in &option_positions {
            if pos.is_open() {
                open_options_count += 1;
                if pos.days_to_expiry > 0 {
                    daily_theta += pos.net_premium / pos.days_to_expiry as f64;
                }
            } else {
                closed_options_count += 1;
            }

            net_premiums += pos.net_premium;
            if pos.net_premium > 0.0 {
                total_premiums += pos.net_premium;
                collected_premiums += pos.premium_collected;
                premium_count += 1;
                if pos.net_premium > largest_premium {
                    largest_premium = pos.net_premium;
                }
                smallest_premium = Some(match smallest_premium {
                    Some(s) => s.min(pos.net_premium),
                    None => pos.net_premium,
                });
            }

            if pos.capital > 0.0 {
                total_capital += pos.capital;
                if pos.is_open() {
                    options_active_capital += pos.capital;
                    // Only cash-secured puts count toward active capital;
                    // covered-call capital already sits in the stock position
                    if pos.option_type == OptionType::Put {
                        total_active_capital += pos.capital;
                    }
                }
            }

            if pos.percent_return != 0.0 {
                total_returns += pos.percent_return;
                return_count += 1;
            }

            if let Some(open) = pos.open_date {
                earliest_open = Some(match earliest_open {
                    Some(d) => d.min(open),
                    None => open,
                });
            }
        }

        let premium_per_day = match earliest_open {
            Some(earliest) => {
                let days = (as_of - earliest).num_days();
                if days > 0 {
                    total_premiums / days as f64
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        let avg_return_per_trade = if return_count > 0 {
            total_returns / return_count as f64
        } else {
            0.0
        };
        let average_premium = if premium_count > 0 {
            total_premiums / premium_count as f64
        } else {
            0.0
        };

        let (total_deposits, mut diagnostics) = self.total_deposits(funding);
        for tx in option_transactions {
            if tx.position_id.is_empty() {
                diagnostics.push(InputDiagnostic {
                    source: DiagnosticSource::OptionTransaction,
                    detail: format!(
                        "transaction {} ({} {} on {}) has no position id",
                        tx.id, tx.action, tx.symbol, tx.date
                    ),
                });
            }
        }

        let mut total_stock_pnl = 0.0;
        let mut open_stock_count = 0usize;
        let mut closed_stock_count = 0usize;
        for pos in &stock_positions {
            if pos.is_closed() {
                total_stock_pnl += pos.realized_pnl;
                closed_stock_count += 1;
            } else {
                total_active_capital += pos.cost_basis;
                open_stock_count += 1;
            }
        }

        let days_since_start = stock_transactions
            .iter()
            .map(|t| t.date)
            .min()
            .map_or(0, |earliest| (as_of - earliest).num_days());

        let option_trades_count = option_positions.len();
        let stock_trades_count = open_stock_count + closed_stock_count;

        let total_portfolio_value = total_deposits + total_premiums + total_stock_pnl;
        let total_portfolio_profit = total_premiums + total_stock_pnl;
        let total_portfolio_profit_pct = if total_deposits > 0.0 {
            (total_portfolio_profit / total_deposits) * 100.0
        } else {
            0.0
        };

        let daily_returns = self.daily_returns(&option_positions, &stock_positions);
        let time_weighted_return = self.return_calculator.time_weighted_return(
            funding,
            option_transactions,
            stock_transactions,
            as_of,
        )?;

        Ok(AnalyticsSnapshot {
            as_of,
            total_premiums,
            net_premiums,
            collected_premiums,
            premium_per_day,
            largest_premium,
            smallest_premium: smallest_premium.unwrap_or(0.0),
            average_premium,
            daily_theta,
            total_capital,
            options_active_capital,
            total_active_capital,
            open_options_count,
            closed_options_count,
            option_trades_count,
            stock_trades_count,
            total_trades_count: option_trades_count + stock_trades_count,
            days_since_start,
            avg_return_per_trade,
            total_deposits,
            total_stock_pnl,
            total_portfolio_value,
            total_portfolio_profit,
            total_portfolio_profit_pct,
            daily_returns,
            time_weighted_return,
            diagnostics,
        })
    }

    /// Sum deposit records, collecting a diagnostic for every row whose
    /// date or amount fails to parse. Other funding kinds pass through.
    pub fn total_deposits(
        &self,
        funding: &[FundingTransaction],
    ) -> (f64, Vec<InputDiagnostic>) {
        let mut total = 0.0;
        let mut diagnostics = Vec::new();

        for record in funding.iter().filter(|f| f.is_deposit()) {
            match (record.parse_date(), record.parse_amount()) {
                (Ok(_), Ok(amount)) => total += amount,
                (date_result, amount_result) => {
                    let reason = date_result
                        .err()
                        .or(amount_result.err())
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    debug!("Skipping funding record: {reason}");
                    diagnostics.push(InputDiagnostic {
                        source: DiagnosticSource::Funding,
                        detail: reason,
                    });
                }
            }
        }

        (total, diagnostics)
    }

    /// Bucket option net premiums (by open date) and realized stock P&L
    /// (by close date) into one record per calendar date, ascending.
    pub fn daily_returns(
        &self,
        option_positions: &[OptionPosition],
        stock_positions: &[Position],
    ) -> Vec<DailyReturn> {
        // BTreeMap keys give the ascending date order directly
        let mut buckets: BTreeMap<NaiveDate, DailyReturn> = BTreeMap::new();

        for pos in option_positions {
            let Some(open_date) = pos.open_date else {
                continue;
            };
            let bucket = buckets
                .entry(open_date)
                .or_insert_with(|| Self::empty_bucket(open_date));
            bucket.premiums += pos.net_premium;
            bucket.premium_details.push(TradeDetail {
                symbol: pos.symbol.clone(),
                kind: Self::option_detail_kind(pos.option_type),
                amount: pos.net_premium,
            });
        }

        for pos in stock_positions {
            if !pos.is_closed() {
                continue;
            }
            let Some(close_date) = pos.close_date else {
                continue;
            };
            let bucket = buckets
                .entry(close_date)
                .or_insert_with(|| Self::empty_bucket(close_date));
            bucket.stock_gains += pos.realized_pnl;
            bucket.stock_details.push(TradeDetail {
                symbol: pos.symbol.clone(),
                kind: DetailKind::Stock,
                amount: pos.realized_pnl,
            });
        }

        buckets
            .into_values()
            .map(|mut bucket| {
                bucket.total_returns = bucket.premiums + bucket.stock_gains;
                bucket
            })
            .collect()
    }

    /// Capital exposure by sector: open stock cost basis plus open
    /// cash-secured-put collateral, grouped via the injected sector map
    /// (unmapped symbols fall into "Other"). Covered calls are skipped —
    /// their capital is the stock's, already counted.
    pub fn sector_exposure(
        &self,
        stock_positions: &[Position],
        option_positions: &[OptionPosition],
        sectors: &HashMap<String, String>,
    ) -> Vec<SectorExposure> {
        let mut by_sector: HashMap<String, SectorExposure> = HashMap::new();

        let mut add = |sector: String, detail: PositionDetail| {
            let entry = by_sector
                .entry(sector.clone())
                .or_insert_with(|| SectorExposure {
                    sector,
                    amount: 0.0,
                    positions: Vec::new(),
                });
            entry.amount += detail.amount;
            entry.positions.push(detail);
        };

        for pos in stock_positions.iter().filter(|p| p.is_open()) {
            add(
                Self::sector_for(&pos.symbol, sectors),
                PositionDetail {
                    symbol: pos.symbol.clone(),
                    kind: DetailKind::Stock,
                    amount: pos.cost_basis,
                },
            );
        }

        for pos in option_positions
            .iter()
            .filter(|p| p.is_open() && p.option_type == OptionType::Put)
        {
            add(
                Self::sector_for(&pos.symbol, sectors),
                PositionDetail {
                    symbol: pos.symbol.clone(),
                    kind: DetailKind::Put,
                    amount: pos.capital,
                },
            );
        }

        let mut exposures: Vec<SectorExposure> = by_sector
            .into_values()
            .filter(|e| e.amount > 0.0)
            .collect();

        // Largest exposure first; ties broken by name to stay deterministic
        exposures.sort_by(|a, b| {
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.sector.cmp(&b.sector))
        });
        exposures
    }

    /// Individual open holdings without double counting: a covered call is
    /// shown instead of its underlying stock (one entry per symbol, carrying
    /// the stock's cost basis), then stocks with no call, then open CSPs.
    pub fn position_details(
        &self,
        stock_positions: &[Position],
        option_positions: &[OptionPosition],
    ) -> Vec<PositionDetail> {
        let mut details = Vec::new();

        // Symbols whose open stock is written against an open call
        let mut covered: HashMap<String, f64> = HashMap::new();
        for opt in option_positions
            .iter()
            .filter(|p| p.is_open() && p.option_type == OptionType::Call)
        {
            if let Some(stock) = stock_positions
                .iter()
                .find(|p| p.is_open() && p.symbol == opt.symbol)
            {
                covered.insert(opt.symbol.clone(), stock.cost_basis);
            }
        }

        for (symbol, cost_basis) in &covered {
            details.push(PositionDetail {
                symbol: symbol.clone(),
                kind: DetailKind::Call,
                amount: *cost_basis,
            });
        }

        for pos in stock_positions.iter().filter(|p| p.is_open()) {
            if !covered.contains_key(&pos.symbol) {
                details.push(PositionDetail {
                    symbol: pos.symbol.clone(),
                    kind: DetailKind::Stock,
                    amount: pos.cost_basis,
                });
            }
        }

        for pos in option_positions
            .iter()
            .filter(|p| p.is_open() && p.option_type == OptionType::Put)
        {
            details.push(PositionDetail {
                symbol: pos.symbol.clone(),
                kind: DetailKind::Put,
                amount: pos.capital,
            });
        }

        details.sort_by(|a, b| {
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        details
    }

    /// Derived available-capital figure from an existing snapshot.
    pub fn cash_position(&self, snapshot: &AnalyticsSnapshot) -> CashPosition {
        let active_capital = snapshot.total_active_capital;
        CashPosition {
            active_capital,
            dry_powder: snapshot.total_deposits
                + snapshot.total_premiums
                + snapshot.total_stock_pnl
                - active_capital,
        }
    }

    /// Aggregate P&L and deployed capital per symbol, sorted by symbol.
    pub fn symbol_summaries(
        &self,
        stock_positions: &[Position],
        option_positions: &[OptionPosition],
    ) -> Vec<SymbolSummary> {
        let mut by_symbol: HashMap<String, SymbolSummary> = HashMap::new();

        let blank = |symbol: &str| SymbolSummary {
            symbol: symbol.to_string(),
            premiums_collected: 0.0,
            stock_pnl: 0.0,
            total_pnl: 0.0,
            capital: 0.0,
        };

        for opt in option_positions {
            let entry = by_symbol
                .entry(opt.symbol.clone())
                .or_insert_with(|| blank(&opt.symbol));
            entry.premiums_collected += opt.net_premium;
            if opt.is_open() {
                entry.capital += opt.capital;
            }
        }

        for pos in stock_positions {
            let entry = by_symbol
                .entry(pos.symbol.clone())
                .or_insert_with(|| blank(&pos.symbol));
            if pos.is_closed() {
                entry.stock_pnl += pos.realized_pnl;
            } else {
                entry.capital += pos.cost_basis;
            }
        }

        let mut summaries: Vec<SymbolSummary> = by_symbol
            .into_values()
            .map(|mut s| {
                s.total_pnl = s.premiums_collected + s.stock_pnl;
                s
            })
            .collect();
        summaries.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        summaries
    }

    /// Detailed metrics for one symbol. `portfolio_total_pnl` scales the
    /// percent-of-overall figure (0 → percentage left at 0).
    pub fn symbol_details(
        &self,
        symbol: &str,
        stock_positions: &[Position],
        option_positions: &[OptionPosition],
        portfolio_total_pnl: f64,
    ) -> SymbolDetails {
        let mut details = SymbolDetails {
            symbol: symbol.to_string(),
            total_premium_collected: 0.0,
            total_stock_pnl: 0.0,
            option_trade_count: 0,
            current_capital: 0.0,
            average_dte: 0.0,
            avg_option_return: 0.0,
            total_pnl: 0.0,
            percent_of_overall_pnl: 0.0,
        };

        let mut total_dte = 0.0;
        let mut total_return = 0.0;
        let mut return_count = 0usize;

        for opt in option_positions.iter().filter(|p| p.symbol == symbol) {
            details.total_premium_collected += opt.net_premium;
            details.option_trade_count += 1;
            total_dte += opt.days_to_expiry as f64;
            if opt.percent_return != 0.0 {
                total_return += opt.percent_return;
                return_count += 1;
            }
            if opt.is_open() {
                details.current_capital += opt.capital;
            }
        }

        if details.option_trade_count > 0 {
            details.average_dte = total_dte / details.option_trade_count as f64;
        }
        if return_count > 0 {
            details.avg_option_return = total_return / return_count as f64;
        }

        for pos in stock_positions.iter().filter(|p| p.symbol == symbol) {
            if pos.is_closed() {
                details.total_stock_pnl += pos.realized_pnl;
            } else {
                details.current_capital += pos.cost_basis;
            }
        }

        details.total_pnl = details.total_premium_collected + details.total_stock_pnl;
        if portfolio_total_pnl != 0.0 {
            details.percent_of_overall_pnl = (details.total_pnl / portfolio_total_pnl) * 100.0;
        }

        details
    }

    /// Win/loss statistics over closed stock positions.
    pub fn stock_stats(&self, stock_positions: &[Position]) -> TradeStats {
        Self::trade_stats(
            stock_positions
                .iter()
                .filter(|p| p.is_closed())
                .map(|p| p.realized_pnl),
        )
    }

    /// Win/loss statistics over option positions that reached a terminal
    /// state, graded by net premium.
    pub fn option_stats(&self, option_positions: &[OptionPosition]) -> TradeStats {
        Self::trade_stats(
            option_positions
                .iter()
                .filter(|p| p.is_closed())
                .map(|p| p.net_premium),
        )
    }

    fn trade_stats(outcomes: impl Iterator<Item = f64>) -> TradeStats {
        let mut stats = TradeStats::default();
        let mut total_wins = 0.0;
        let mut total_losses = 0.0;

        for outcome in outcomes {
            stats.closed_count += 1;
            if outcome > 0.0 {
                stats.win_count += 1;
                total_wins += outcome;
            } else if outcome < 0.0 {
                stats.loss_count += 1;
                total_losses += outcome;
            }
        }

        if stats.closed_count > 0 {
            stats.win_rate = (stats.win_count as f64 / stats.closed_count as f64) * 100.0;
        }
        if stats.win_count > 0 {
            stats.avg_win = total_wins / stats.win_count as f64;
        }
        if stats.loss_count > 0 {
            stats.avg_loss = total_losses / stats.loss_count as f64;
        }
        stats
    }

    /// Weekly P&L for the Monday-to-Sunday week containing `as_of`:
    /// premiums collected on option positions opened this week plus
    /// realized stock P&L from sales closed this week.
    pub fn weekly_performance(
        &self,
        stock_positions: &[Position],
        option_positions: &[OptionPosition],
        portfolio_value: f64,
        as_of: NaiveDate,
    ) -> WeeklyPerformance {
        let days_since_monday = i64::from(as_of.weekday().num_days_from_monday());
        let week_start = as_of - Duration::days(days_since_monday);
        let week_end = week_start + Duration::days(6);
        let in_week = |date: NaiveDate| date >= week_start && date <= week_end;

        let mut weekly_pnl = 0.0;
        for pos in option_positions {
            if pos.open_date.is_some_and(in_week) {
                weekly_pnl += pos.premium_collected;
            }
        }
        for pos in stock_positions.iter().filter(|p| p.is_closed()) {
            if pos.close_date.is_some_and(in_week) {
                weekly_pnl += pos.realized_pnl;
            }
        }

        let weekly_return_pct = if portfolio_value > 0.0 {
            (weekly_pnl / portfolio_value) * 100.0
        } else {
            0.0
        };

        let status = if weekly_return_pct < 0.5 {
            WeeklyStatus::Violation
        } else if weekly_return_pct < TARGET_WEEKLY_RETURN {
            WeeklyStatus::Warning
        } else {
            WeeklyStatus::Compliant
        };

        WeeklyPerformance {
            week_start,
            weekly_pnl,
            weekly_return_pct,
            days_remaining: (week_end - as_of).num_days().max(0),
            status,
            target_weekly_return: TARGET_WEEKLY_RETURN,
        }
    }

    /// Monthly net worth: injected savings balance plus the brokerage
    /// value — live for the current month, replayed as of month end for
    /// past months. Rows with an unparseable month are skipped.
    pub fn net_worth(
        &self,
        savings: &[MonthlyBalance],
        stock_transactions: &[StockTransaction],
        option_transactions: &[OptionTransaction],
        funding: &[FundingTransaction],
        live_portfolio_value: f64,
        as_of: NaiveDate,
    ) -> Result<Vec<NetWorthMonth>, LedgerError> {
        let current_month = as_of.format("%Y-%m").to_string();
        let mut rows = Vec::with_capacity(savings.len());

        for entry in savings {
            let brokerage_balance = if entry.month == current_month {
                live_portfolio_value
            } else {
                let Some(month_end) = Self::end_of_month(&entry.month) else {
                    debug!("Skipping net-worth row with unparseable month '{}'", entry.month);
                    continue;
                };
                self.return_calculator.portfolio_value_as_of(
                    funding,
                    option_transactions,
                    stock_transactions,
                    month_end,
                )?
            };

            rows.push(NetWorthMonth {
                month: entry.month.clone(),
                savings_balance: entry.balance,
                brokerage_balance,
                total_net_worth: entry.balance + brokerage_balance,
            });
        }

        Ok(rows)
    }

    fn end_of_month(month: &str) -> Option<NaiveDate> {
        let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").ok()?;
        let next_month_first = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
        };
        next_month_first.pred_opt()
    }

    fn sector_for(symbol: &str, sectors: &HashMap<String, String>) -> String {
        sectors
            .get(symbol)
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| SECTOR_OTHER.to_string())
    }

    fn option_detail_kind(option_type: OptionType) -> DetailKind {
        match option_type {
            OptionType::Call => DetailKind::Call,
            OptionType::Put => DetailKind::Put,
        }
    }

    fn empty_bucket(date: NaiveDate) -> DailyReturn {
        DailyReturn {
            date,
            premiums: 0.0,
            stock_gains: 0.0,
            total_returns: 0.0,
            premium_details: Vec::new(),
            stock_details: Vec::new(),
        }
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}
