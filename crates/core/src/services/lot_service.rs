use std::collections::{HashMap, VecDeque};

use crate::errors::LedgerError;
use crate::models::position::{Lot, Position, PositionKind};
use crate::models::transaction::{StockTransaction, TradeSide};

/// Tolerance for share-count comparisons, so fractional-share arithmetic
/// doesn't leave phantom dust lots behind.
const SHARE_EPSILON: f64 = 1e-9;

/// Converts a chronological stream of buy/sell transactions into FIFO lots
/// and realized-close records.
///
/// Pure business logic — no I/O. Every call replays from scratch; repeated
/// calls with unchanged inputs produce identical output.
pub struct LotTracker;

impl LotTracker {
    pub fn new() -> Self {
        Self
    }

    /// Replay all transactions and produce the combined open + closed
    /// position list.
    ///
    /// One closed Position per Sell transaction; at most one open Position
    /// per symbol, merging its remaining lots and priced from `prices`
    /// (missing symbol → price 0.0). Sorted by symbol ascending, open rows
    /// before closed, then open date ascending.
    pub fn positions(
        &self,
        transactions: &[StockTransaction],
        prices: &HashMap<String, f64>,
    ) -> Result<Vec<Position>, LedgerError> {
        let (lots_by_symbol, mut positions) = self.replay(transactions)?;

        for (symbol, lots) in &lots_by_symbol {
            if lots.is_empty() {
                continue;
            }

            let total_shares: f64 = lots.iter().map(|l| l.shares).sum();
            if total_shares <= SHARE_EPSILON {
                continue;
            }
            let total_cost_basis: f64 = lots.iter().map(|l| l.cost_basis).sum();
            let open_date = lots
                .iter()
                .map(|l| l.open_date)
                .min()
                .unwrap_or_else(|| lots[0].open_date);

            let current_price = prices.get(symbol).copied().unwrap_or(0.0);
            let market_value = current_price * total_shares;
            let unrealized_pnl = market_value - total_cost_basis;
            let unrealized_pct = if total_cost_basis > 0.0 {
                (unrealized_pnl / total_cost_basis) * 100.0
            } else {
                0.0
            };

            positions.push(Position {
                symbol: symbol.clone(),
                kind: PositionKind::Open,
                shares: total_shares,
                avg_buy_price: total_cost_basis / total_shares,
                avg_sell_price: 0.0,
                cost_basis: total_cost_basis,
                sale_proceeds: 0.0,
                realized_pnl: 0.0,
                return_pct: 0.0,
                open_date,
                close_date: None,
                current_price,
                market_value,
                unrealized_pnl,
                unrealized_pct,
            });
        }

        // Explicit sort — output order must never depend on map iteration.
        positions.sort_by(|a, b| {
            a.symbol
                .cmp(&b.symbol)
                .then_with(|| match (a.kind, b.kind) {
                    (PositionKind::Open, PositionKind::Closed) => std::cmp::Ordering::Less,
                    (PositionKind::Closed, PositionKind::Open) => std::cmp::Ordering::Greater,
                    _ => std::cmp::Ordering::Equal,
                })
                .then_with(|| a.open_date.cmp(&b.open_date))
        });

        Ok(positions)
    }

    /// Average cost basis per share of each symbol's *current* holdings,
    /// after FIFO consumption. Used for covered-call capital requirements.
    pub fn cost_basis_per_share(
        &self,
        transactions: &[StockTransaction],
    ) -> Result<HashMap<String, f64>, LedgerError> {
        let (lots_by_symbol, _) = self.replay(transactions)?;

        let mut per_share = HashMap::new();
        for (symbol, lots) in lots_by_symbol {
            let total_shares: f64 = lots.iter().map(|l| l.shares).sum();
            if total_shares <= SHARE_EPSILON {
                continue;
            }
            let total_cost_basis: f64 = lots.iter().map(|l| l.cost_basis).sum();
            per_share.insert(symbol, total_cost_basis / total_shares);
        }
        Ok(per_share)
    }

    /// Run the FIFO replay: buys append lots, sells consume them front to
    /// back, emitting one closed Position per Sell. Returns the remaining
    /// lot queues and the closed records.
    fn replay(
        &self,
        transactions: &[StockTransaction],
    ) -> Result<(HashMap<String, VecDeque<Lot>>, Vec<Position>), LedgerError> {
        let mut lots_by_symbol: HashMap<String, VecDeque<Lot>> = HashMap::new();
        let mut closed = Vec::new();

        for tx in transactions {
            match tx.side {
                TradeSide::Buy => {
                    lots_by_symbol.entry(tx.symbol.clone()).or_default().push_back(
                        Lot::new(tx.date, tx.shares, tx.price, tx.amount + tx.commission),
                    );
                }
                TradeSide::Sell => {
                    let lots = lots_by_symbol.entry(tx.symbol.clone()).or_default();
                    let available: f64 = lots.iter().map(|l| l.shares).sum();
                    if tx.shares > available + SHARE_EPSILON {
                        return Err(LedgerError::InsufficientLots {
                            symbol: tx.symbol.clone(),
                            date: tx.date,
                            requested: tx.shares,
                            available,
                        });
                    }

                    closed.push(Self::consume_lots(lots, tx));
                }
            }
        }

        Ok((lots_by_symbol, closed))
    }

    /// Consume lots FIFO to satisfy one Sell, splitting the front lot
    /// proportionally when the sale covers only part of it.
    fn consume_lots(lots: &mut VecDeque<Lot>, tx: &StockTransaction) -> Position {
        let sale_proceeds = tx.amount - tx.commission;
        let mut remaining = tx.shares;
        let mut consumed: Vec<Lot> = Vec::new();
        let mut cost_basis_sold = 0.0;

        while remaining > SHARE_EPSILON {
            let Some(mut front) = lots.pop_front() else {
                break; // guarded by the availability check in replay()
            };

            if front.shares <= remaining + SHARE_EPSILON {
                // Whole lot sold
                remaining -= front.shares;
                cost_basis_sold += front.cost_basis;
                consumed.push(front);
            } else {
                // Partial lot: split cost basis proportionally and keep the
                // shrunken remainder at the front of the queue
                let fraction = remaining / front.shares;
                let cost_fraction = front.cost_basis * fraction;
                consumed.push(Lot::new(front.open_date, remaining, front.price, cost_fraction));
                cost_basis_sold += cost_fraction;

                front.shares -= remaining;
                front.cost_basis -= cost_fraction;
                lots.push_front(front);
                remaining = 0.0;
            }
        }

        let total_shares: f64 = consumed.iter().map(|l| l.shares).sum();
        let weighted_price: f64 = consumed.iter().map(|l| l.price * l.shares).sum();
        let avg_buy_price = if total_shares > 0.0 {
            weighted_price / total_shares
        } else {
            0.0
        };
        let open_date = consumed
            .iter()
            .map(|l| l.open_date)
            .min()
            .unwrap_or(tx.date);

        let realized_pnl = sale_proceeds - cost_basis_sold;
        let return_pct = if cost_basis_sold > 0.0 {
            (realized_pnl / cost_basis_sold) * 100.0
        } else {
            0.0
        };

        Position {
            symbol: tx.symbol.clone(),
            kind: PositionKind::Closed,
            shares: total_shares,
            avg_buy_price,
            avg_sell_price: tx.price,
            cost_basis: cost_basis_sold,
            sale_proceeds,
            realized_pnl,
            return_pct,
            open_date,
            close_date: Some(tx.date),
            current_price: 0.0,
            market_value: 0.0,
            unrealized_pnl: 0.0,
            unrealized_pct: 0.0,
        }
    }
}

impl Default for LotTracker {
    fn default() -> Self {
        Self::new()
    }
}
