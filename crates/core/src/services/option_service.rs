use std::collections::HashMap;

use chrono::NaiveDate;
use log::warn;

use crate::errors::LedgerError;
use crate::models::option::{
    OptionAction, OptionPosition, OptionStatus, OptionTransaction, OptionType,
    CONTRACT_MULTIPLIER,
};
use crate::models::transaction::StockTransaction;
use crate::services::lot_service::LotTracker;

/// Groups option transactions sharing a position id into one
/// `OptionPosition` and classifies its lifecycle.
///
/// Pure recompute per call: the lazy-expiry reclassification is a read-time
/// projection against the supplied evaluation date, never a mutation of
/// stored history.
pub struct OptionAggregator {
    lot_tracker: LotTracker,
}

impl OptionAggregator {
    pub fn new() -> Self {
        Self {
            lot_tracker: LotTracker::new(),
        }
    }

    /// Aggregate transactions into positions, evaluated as of `as_of`.
    ///
    /// `stock_transactions` supply the underlying cost basis for
    /// covered-call capital requirements; a symbol with no tracked holdings
    /// falls back to the trade-time stock price.
    pub fn positions(
        &self,
        transactions: &[OptionTransaction],
        stock_transactions: &[StockTransaction],
        as_of: NaiveDate,
    ) -> Result<Vec<OptionPosition>, LedgerError> {
        let stock_cost_basis = self.lot_tracker.cost_basis_per_share(stock_transactions)?;

        let mut by_id: HashMap<String, OptionPosition> = HashMap::new();

        for tx in transactions {
            if tx.position_id.is_empty() {
                warn!(
                    "Option transaction {} ({} {} on {}) has no position id; skipping",
                    tx.id, tx.action, tx.symbol, tx.date
                );
                continue;
            }

            let pos = by_id
                .entry(tx.position_id.clone())
                .or_insert_with(|| Self::blank_position(tx));

            match tx.action {
                OptionAction::SellToOpen => {
                    pos.open_date = Some(tx.date);
                    pos.premium_collected += tx.premium;
                    pos.commissions += tx.commission;
                    pos.capital = Self::capital_requirement(tx, &stock_cost_basis);
                }
                OptionAction::BuyToClose => {
                    pos.premium_paid += tx.premium.abs();
                    pos.commissions += tx.commission;
                    pos.close_date = Some(tx.date);
                    pos.status = if tx.notes.to_lowercase().contains("roll") {
                        OptionStatus::Rolled
                    } else {
                        OptionStatus::ClosedEarly
                    };
                }
                OptionAction::Expired => {
                    pos.close_date = Some(tx.date);
                    pos.status = OptionStatus::Expired;
                }
                OptionAction::Assigned => {
                    pos.close_date = Some(tx.date);
                    pos.status = OptionStatus::Assigned;
                }
                OptionAction::Exercised => {
                    pos.close_date = Some(tx.date);
                    pos.status = OptionStatus::Exercised;
                }
            }
        }

        let mut positions: Vec<OptionPosition> = by_id
            .into_values()
            .map(|pos| Self::finalize(pos, as_of))
            .collect();

        // Explicit sort — output order must never depend on map iteration.
        positions.sort_by(|a, b| {
            a.open_date
                .cmp(&b.open_date)
                .then_with(|| a.position_id.cmp(&b.position_id))
        });

        Ok(positions)
    }

    fn blank_position(tx: &OptionTransaction) -> OptionPosition {
        OptionPosition {
            position_id: tx.position_id.clone(),
            symbol: tx.symbol.clone(),
            option_type: tx.option_type,
            strike: tx.strike,
            expiry: tx.expiry,
            contracts: tx.contracts,
            status: OptionStatus::Open,
            open_date: None,
            close_date: None,
            premium_collected: 0.0,
            premium_paid: 0.0,
            net_premium: 0.0,
            commissions: 0.0,
            max_profit: 0.0,
            days_held: 0,
            days_to_expiry: 0,
            percent_return: 0.0,
            annualized_return: 0.0,
            capital: 0.0,
        }
    }

    /// Capital tied up by the position. A cash-secured put reserves the
    /// full strike value; a covered call is backed by stock already owned,
    /// so its capital is the underlying's cost basis (trade-time price when
    /// no holdings are tracked, e.g. a naked call or a data gap).
    fn capital_requirement(
        tx: &OptionTransaction,
        stock_cost_basis: &HashMap<String, f64>,
    ) -> f64 {
        let contracts = f64::from(tx.contracts);
        match tx.option_type {
            OptionType::Put => tx.strike * contracts * CONTRACT_MULTIPLIER,
            OptionType::Call => match stock_cost_basis.get(&tx.symbol) {
                Some(per_share) => per_share * contracts * CONTRACT_MULTIPLIER,
                None => tx.stock_price * contracts * CONTRACT_MULTIPLIER,
            },
        }
    }

    /// Compute derived metrics and apply the lazy-expiry projection.
    fn finalize(mut pos: OptionPosition, as_of: NaiveDate) -> OptionPosition {
        pos.net_premium = pos.premium_collected - pos.premium_paid - pos.commissions;
        pos.max_profit = pos.premium_collected;

        if let (Some(open), Some(close)) = (pos.open_date, pos.close_date) {
            pos.days_held = (close - open).num_days();
        }

        if let Some(open) = pos.open_date {
            // Floored at 1 so same-day expiries don't divide by zero
            pos.days_to_expiry = (pos.expiry - open).num_days().max(1);
        }

        if pos.capital > 0.0 {
            pos.percent_return = (pos.net_premium / pos.capital) * 100.0;
            if pos.days_to_expiry > 0 {
                // Annualize over the planned holding period (to expiry), not
                // actual days held, so early closes don't distort the yield
                pos.annualized_return =
                    (pos.percent_return / pos.days_to_expiry as f64) * 365.0;
            }
        }

        // Read-time projection: an Open position past its expiry reports as
        // Expired without any stored-state mutation
        if pos.status == OptionStatus::Open && pos.close_date.is_none() && as_of > pos.expiry {
            pos.status = OptionStatus::Expired;
            pos.close_date = Some(pos.expiry);
        }

        pos
    }
}

impl Default for OptionAggregator {
    fn default() -> Self {
        Self::new()
    }
}
