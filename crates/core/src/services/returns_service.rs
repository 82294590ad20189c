use std::collections::HashMap;

use chrono::NaiveDate;
use log::{debug, warn};

use crate::errors::LedgerError;
use crate::models::analytics::TimeWeightedReturn;
use crate::models::option::OptionTransaction;
use crate::models::transaction::{FundingTransaction, StockTransaction};
use crate::services::lot_service::LotTracker;
use crate::services::option_service::OptionAggregator;

/// A consolidated deposit event: all same-day deposits summed.
struct CashFlow {
    date: NaiveDate,
    amount: f64,
}

/// Computes a cash-flow-neutral return measure by geometrically linking
/// deposit-delimited sub-periods, because raw portfolio-value growth is
/// distorted by new deposits.
///
/// Everything here is a pure replay over filtered transaction subsets —
/// no incremental state, no caching.
pub struct ReturnCalculator {
    lot_tracker: LotTracker,
    option_aggregator: OptionAggregator,
}

impl ReturnCalculator {
    pub fn new() -> Self {
        Self {
            lot_tracker: LotTracker::new(),
            option_aggregator: OptionAggregator::new(),
        }
    }

    /// Reconstruct the portfolio value as of `date`: deposits to date,
    /// plus net premiums of option positions built from transactions to
    /// date, plus realized stock P&L from sales to date.
    pub fn portfolio_value_as_of(
        &self,
        funding: &[FundingTransaction],
        option_transactions: &[OptionTransaction],
        stock_transactions: &[StockTransaction],
        date: NaiveDate,
    ) -> Result<f64, LedgerError> {
        let mut value = 0.0;

        for record in funding.iter().filter(|f| f.is_deposit()) {
            match (record.parse_date(), record.parse_amount()) {
                (Ok(deposit_date), Ok(amount)) if deposit_date <= date => value += amount,
                (Ok(_), Ok(_)) => {}
                _ => debug!("Skipping malformed funding record dated '{}'", record.date),
            }
        }

        let option_subset: Vec<OptionTransaction> = option_transactions
            .iter()
            .filter(|t| t.date <= date)
            .cloned()
            .collect();
        let stock_subset: Vec<StockTransaction> = stock_transactions
            .iter()
            .filter(|t| t.date <= date)
            .cloned()
            .collect();

        for pos in self
            .option_aggregator
            .positions(&option_subset, &stock_subset, date)?
        {
            value += pos.net_premium;
        }

        // Only realized P&L counts here, so no quote map is needed
        let no_prices = HashMap::new();
        for pos in self.lot_tracker.positions(&stock_subset, &no_prices)? {
            if pos.is_closed() {
                value += pos.realized_pnl;
            }
        }

        Ok(value)
    }

    /// Cumulative and annualized time-weighted return as of `as_of`,
    /// in percent. Returns (0, 0) when there are no deposits.
    pub fn time_weighted_return(
        &self,
        funding: &[FundingTransaction],
        option_transactions: &[OptionTransaction],
        stock_transactions: &[StockTransaction],
        as_of: NaiveDate,
    ) -> Result<TimeWeightedReturn, LedgerError> {
        let flows = Self::deposit_flows(funding);
        if flows.is_empty() {
            return Ok(TimeWeightedReturn {
                cumulative_pct: 0.0,
                annualized_pct: 0.0,
            });
        }

        let mut period_returns = Vec::with_capacity(flows.len());

        // The first deposit is the starting capital base of period 1
        let mut start_value = flows[0].amount;

        for flow in &flows[1..] {
            // Value the day before the deposit, to exclude the incoming cash
            let before = flow.date.pred_opt().unwrap_or(flow.date);
            let end_value = self.portfolio_value_as_of(
                funding,
                option_transactions,
                stock_transactions,
                before,
            )?;

            period_returns.push(Self::period_return(start_value, end_value));
            start_value = end_value + flow.amount;
        }

        // Final sub-period: last roll-forward to the current value
        let current_value = self.portfolio_value_as_of(
            funding,
            option_transactions,
            stock_transactions,
            as_of,
        )?;
        period_returns.push(Self::period_return(start_value, current_value));

        // Geometric linking: (1 + R1) × (1 + R2) × … − 1
        let cumulative = period_returns
            .iter()
            .fold(1.0, |acc, r| acc * (1.0 + r))
            - 1.0;

        let days_active = (as_of - flows[0].date).num_days().max(1) as f64;
        let annualized = if 1.0 + cumulative > 0.0 {
            (1.0 + cumulative).powf(365.0 / days_active) - 1.0
        } else {
            -1.0 // total loss; a negative base has no real power
        };

        Ok(TimeWeightedReturn {
            cumulative_pct: cumulative * 100.0,
            annualized_pct: annualized * 100.0,
        })
    }

    /// Parse deposit records into cash-flow events, consolidate same-day
    /// deposits into one event, and sort ascending. Malformed records are
    /// skipped here; the analytics snapshot reports them as diagnostics.
    fn deposit_flows(funding: &[FundingTransaction]) -> Vec<CashFlow> {
        let mut flows: Vec<CashFlow> = Vec::new();

        for record in funding.iter().filter(|f| f.is_deposit()) {
            match (record.parse_date(), record.parse_amount()) {
                (Ok(date), Ok(amount)) => flows.push(CashFlow { date, amount }),
                _ => debug!("Skipping malformed funding record dated '{}'", record.date),
            }
        }

        flows.sort_by_key(|f| f.date);

        let mut consolidated: Vec<CashFlow> = Vec::new();
        for flow in flows {
            match consolidated.last_mut() {
                Some(last) if last.date == flow.date => last.amount += flow.amount,
                _ => consolidated.push(flow),
            }
        }
        consolidated
    }

    /// Sub-period return. A non-positive start value would divide by zero;
    /// it is treated as a zero-return period so the geometric chain keeps
    /// its length instead of silently dropping the period.
    fn period_return(start_value: f64, end_value: f64) -> f64 {
        if start_value > 0.0 {
            (end_value - start_value) / start_value
        } else {
            warn!(
                "TWR sub-period with non-positive start value {start_value}; counting it as a zero-return period"
            );
            0.0
        }
    }
}

impl Default for ReturnCalculator {
    fn default() -> Self {
        Self::new()
    }
}
