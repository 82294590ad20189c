// ═══════════════════════════════════════════════════════════════════
// Facade Tests — WheelLedger end-to-end: ledger management, derived
// views, JSON export/import
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use std::collections::HashMap;

use wheel_ledger_core::errors::LedgerError;
use wheel_ledger_core::models::option::{
    OptionAction, OptionStatus, OptionTransaction, OptionType,
};
use wheel_ledger_core::models::position::PositionKind;
use wheel_ledger_core::models::transaction::{FundingTransaction, TradeSide};
use wheel_ledger_core::WheelLedger;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn csp(date: NaiveDate, symbol: &str, strike: f64, expiry: NaiveDate, premium: f64, id: &str) -> OptionTransaction {
    OptionTransaction::new(
        date, OptionAction::SellToOpen, symbol, OptionType::Put, strike, expiry, 1, premium,
        0.0, 0.0, id, "",
    )
}

// ═══════════════════════════════════════════════════════════════════
//  Ledger management
// ═══════════════════════════════════════════════════════════════════

#[test]
fn transactions_are_kept_chronological_regardless_of_insertion_order() {
    let mut ledger = WheelLedger::new();
    ledger
        .add_stock_transaction(d(2025, 2, 1), TradeSide::Buy, "AAPL", 5.0, 10.0, 50.0, 0.0)
        .unwrap();
    ledger
        .add_stock_transaction(d(2025, 1, 2), TradeSide::Buy, "AAPL", 10.0, 8.0, 80.0, 0.0)
        .unwrap();

    let dates: Vec<NaiveDate> = ledger.stock_transactions().iter().map(|t| t.date).collect();
    assert_eq!(dates, vec![d(2025, 1, 2), d(2025, 2, 1)]);
}

#[test]
fn rejects_empty_symbol_and_non_positive_shares() {
    let mut ledger = WheelLedger::new();

    assert!(matches!(
        ledger.add_stock_transaction(d(2025, 1, 2), TradeSide::Buy, "  ", 10.0, 8.0, 80.0, 0.0),
        Err(LedgerError::Validation(_))
    ));
    assert!(matches!(
        ledger.add_stock_transaction(d(2025, 1, 2), TradeSide::Buy, "AAPL", 0.0, 8.0, 0.0, 0.0),
        Err(LedgerError::Validation(_))
    ));
    assert_eq!(ledger.transaction_count(), 0);
}

#[test]
fn rejects_zero_contract_option_transactions() {
    let mut ledger = WheelLedger::new();
    let mut tx = csp(d(2025, 1, 6), "PLTR", 20.0, d(2025, 2, 21), 100.0, "P1");
    tx.contracts = 0;

    assert!(matches!(
        ledger.add_option_transaction(tx),
        Err(LedgerError::Validation(_))
    ));
}

#[test]
fn remove_transaction_by_id() {
    let mut ledger = WheelLedger::new();
    let id = ledger
        .add_stock_transaction(d(2025, 1, 2), TradeSide::Buy, "AAPL", 10.0, 8.0, 80.0, 0.0)
        .unwrap();

    assert!(ledger.remove_stock_transaction(id));
    assert!(!ledger.remove_stock_transaction(id));
    assert_eq!(ledger.transaction_count(), 0);
}

#[test]
fn symbol_filters_are_case_insensitive() {
    let mut ledger = WheelLedger::new();
    ledger
        .add_stock_transaction(d(2025, 1, 2), TradeSide::Buy, "aapl", 10.0, 8.0, 80.0, 0.0)
        .unwrap();
    ledger
        .add_stock_transaction(d(2025, 1, 3), TradeSide::Buy, "MSFT", 5.0, 100.0, 500.0, 0.0)
        .unwrap();

    assert_eq!(ledger.stock_transactions_for_symbol("Aapl").len(), 1);
    assert_eq!(ledger.stock_transactions_for_symbol("msft").len(), 1);
    assert!(ledger.stock_transactions_for_symbol("NVDA").is_empty());
}

#[test]
fn earliest_transaction_date_spans_both_ledgers() {
    let mut ledger = WheelLedger::new();
    assert!(ledger.earliest_transaction_date().is_none());

    ledger
        .add_option_transaction(csp(d(2025, 1, 6), "PLTR", 20.0, d(2025, 2, 21), 100.0, "P1"))
        .unwrap();
    ledger
        .add_stock_transaction(d(2025, 1, 2), TradeSide::Buy, "AAPL", 10.0, 8.0, 80.0, 0.0)
        .unwrap();

    assert_eq!(ledger.earliest_transaction_date(), Some(d(2025, 1, 2)));
}

#[test]
fn savings_balance_replaces_existing_month() {
    let mut ledger = WheelLedger::new();
    ledger.set_savings_balance("2025-01", 1000.0);
    ledger.set_savings_balance("2025-01", 1500.0);
    ledger.add_funding_record(FundingTransaction::new("January 01 2025", "Deposit", "$100"));

    let rows = ledger.net_worth_as_of(d(2025, 1, 31)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].savings_balance, 1500.0);
}

// ═══════════════════════════════════════════════════════════════════
//  Derived views
// ═══════════════════════════════════════════════════════════════════

#[test]
fn stock_positions_use_injected_prices() {
    let mut ledger = WheelLedger::new();
    ledger
        .add_stock_transaction(d(2025, 1, 2), TradeSide::Buy, "AAPL", 10.0, 10.0, 100.0, 0.0)
        .unwrap();
    ledger.set_price("aapl", 12.0);

    let positions = ledger.stock_positions().unwrap();
    assert_eq!(positions[0].market_value, 120.0);
    assert!((positions[0].unrealized_pnl - 20.0).abs() < 1e-9);
}

#[test]
fn option_positions_lazy_expire_per_evaluation_date() {
    let mut ledger = WheelLedger::new();
    ledger
        .add_option_transaction(csp(d(2025, 1, 6), "PLTR", 20.0, d(2025, 1, 17), 100.0, "P1"))
        .unwrap();

    let open = ledger.option_positions_as_of(d(2025, 1, 10)).unwrap();
    assert_eq!(open[0].status, OptionStatus::Open);

    let expired = ledger.option_positions_as_of(d(2025, 1, 20)).unwrap();
    assert_eq!(expired[0].status, OptionStatus::Expired);

    // The stored ledger is untouched: an earlier view still sees it open
    let open_again = ledger.option_positions_as_of(d(2025, 1, 10)).unwrap();
    assert_eq!(open_again[0].status, OptionStatus::Open);
}

#[test]
fn analytics_flow_through_the_facade() {
    let mut ledger = WheelLedger::new();
    ledger.add_funding_record(FundingTransaction::new("January 01 2025", "Deposit", "$10,000"));
    ledger
        .add_option_transaction(csp(d(2025, 1, 6), "PLTR", 20.0, d(2025, 2, 21), 100.0, "P1"))
        .unwrap();
    ledger
        .add_stock_transaction(d(2025, 1, 2), TradeSide::Buy, "AAPL", 10.0, 10.0, 100.0, 0.0)
        .unwrap();
    ledger
        .add_stock_transaction(d(2025, 1, 15), TradeSide::Sell, "AAPL", 10.0, 12.0, 120.0, 0.0)
        .unwrap();

    let snapshot = ledger.analytics_as_of(d(2025, 1, 31)).unwrap();
    assert_eq!(snapshot.total_deposits, 10_000.0);
    assert_eq!(snapshot.total_premiums, 100.0);
    assert_eq!(snapshot.total_stock_pnl, 20.0);
    assert_eq!(snapshot.total_portfolio_value, 10_120.0);

    let (deposits, diagnostics) = ledger.total_deposits();
    assert_eq!(deposits, 10_000.0);
    assert!(diagnostics.is_empty());

    let value = ledger.portfolio_value_as_of(d(2025, 1, 31)).unwrap();
    assert_eq!(value, 10_120.0);

    let twr = ledger.time_weighted_return_as_of(d(2025, 1, 31)).unwrap();
    assert!((twr.cumulative_pct - 1.2).abs() < 1e-9);

    let cash = ledger.cash_position_as_of(d(2025, 1, 31)).unwrap();
    assert_eq!(cash.active_capital, 2000.0);
    assert_eq!(cash.dry_powder, 8120.0);
}

#[test]
fn position_filters_split_open_and_closed() {
    let mut ledger = WheelLedger::new();
    ledger
        .add_stock_transaction(d(2025, 1, 2), TradeSide::Buy, "AAPL", 10.0, 10.0, 100.0, 0.0)
        .unwrap();
    ledger
        .add_stock_transaction(d(2025, 1, 15), TradeSide::Sell, "AAPL", 4.0, 12.0, 48.0, 0.0)
        .unwrap();
    ledger
        .add_stock_transaction(d(2025, 1, 3), TradeSide::Buy, "MSFT", 5.0, 100.0, 500.0, 0.0)
        .unwrap();

    let open = ledger.open_stock_positions().unwrap();
    assert_eq!(open.len(), 2);
    assert!(open.iter().all(|p| p.kind == PositionKind::Open));

    let closed = ledger.closed_stock_positions().unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].symbol, "AAPL");

    let aapl = ledger.stock_positions_for_symbol("aapl").unwrap();
    assert_eq!(aapl.len(), 2);
}

#[test]
fn option_positions_filter_by_symbol() {
    let mut ledger = WheelLedger::new();
    ledger
        .add_option_transaction(csp(d(2025, 1, 6), "PLTR", 20.0, d(2025, 2, 21), 100.0, "P1"))
        .unwrap();
    ledger
        .add_option_transaction(csp(d(2025, 1, 13), "NVDA", 10.0, d(2025, 2, 21), 50.0, "P2"))
        .unwrap();

    let pltr = ledger
        .option_positions_for_symbol("pltr", d(2025, 1, 31))
        .unwrap();
    assert_eq!(pltr.len(), 1);
    assert_eq!(pltr[0].position_id, "P1");
}

#[test]
fn daily_returns_export_as_json() {
    let mut ledger = WheelLedger::new();
    ledger
        .add_option_transaction(csp(d(2025, 1, 6), "PLTR", 20.0, d(2025, 2, 21), 100.0, "P1"))
        .unwrap();

    let json = ledger.daily_returns_json_as_of(d(2025, 1, 31)).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed[0]["premiums"], serde_json::json!(100.0));
    assert_eq!(parsed[0]["totalReturns"], serde_json::json!(100.0));
}

#[test]
fn sector_exposure_uses_injected_sectors() {
    let mut ledger = WheelLedger::new();
    ledger
        .add_stock_transaction(d(2025, 1, 2), TradeSide::Buy, "MSFT", 5.0, 100.0, 500.0, 0.0)
        .unwrap();
    ledger.set_sector("msft", "Technology");

    let exposures = ledger.sector_exposure_as_of(d(2025, 1, 31)).unwrap();
    assert_eq!(exposures.len(), 1);
    assert_eq!(exposures[0].sector, "Technology");
    assert_eq!(exposures[0].amount, 500.0);
}

#[test]
fn insufficient_lots_surface_through_derived_views() {
    let mut ledger = WheelLedger::new();
    ledger
        .add_stock_transaction(d(2025, 1, 2), TradeSide::Sell, "AAPL", 10.0, 12.0, 120.0, 0.0)
        .unwrap();

    assert!(matches!(
        ledger.stock_positions(),
        Err(LedgerError::InsufficientLots { .. })
    ));
    assert!(matches!(
        ledger.analytics_as_of(d(2025, 1, 31)),
        Err(LedgerError::InsufficientLots { .. })
    ));
}

// ═══════════════════════════════════════════════════════════════════
//  Export / import
// ═══════════════════════════════════════════════════════════════════

#[test]
fn stock_transactions_roundtrip_through_json() {
    let mut ledger = WheelLedger::new();
    ledger
        .add_stock_transaction(d(2025, 1, 2), TradeSide::Buy, "AAPL", 10.0, 10.0, 100.0, 0.0)
        .unwrap();
    ledger
        .add_stock_transaction(d(2025, 1, 15), TradeSide::Sell, "AAPL", 10.0, 12.0, 120.0, 0.0)
        .unwrap();

    let json = ledger.export_stock_transactions_to_json().unwrap();

    let mut restored = WheelLedger::new();
    let count = restored.import_stock_transactions_from_json(&json).unwrap();
    assert_eq!(count, 2);
    assert_eq!(restored.stock_transactions(), ledger.stock_transactions());

    let positions = restored.stock_positions().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].kind, PositionKind::Closed);
}

#[test]
fn option_transactions_roundtrip_through_json() {
    let mut ledger = WheelLedger::new();
    ledger
        .add_option_transaction(csp(d(2025, 1, 6), "PLTR", 20.0, d(2025, 2, 21), 100.0, "P1"))
        .unwrap();

    let json = ledger.export_option_transactions_to_json().unwrap();

    let mut restored = WheelLedger::new();
    let count = restored.import_option_transactions_from_json(&json).unwrap();
    assert_eq!(count, 1);
    assert_eq!(restored.option_transactions(), ledger.option_transactions());
}

#[test]
fn import_of_invalid_json_is_a_serialization_error() {
    let mut ledger = WheelLedger::new();
    assert!(matches!(
        ledger.import_stock_transactions_from_json("not json"),
        Err(LedgerError::Serialization(_))
    ));
}

#[test]
fn replacing_price_and_sector_maps_wholesale() {
    let mut ledger = WheelLedger::new();
    ledger
        .add_stock_transaction(d(2025, 1, 2), TradeSide::Buy, "AAPL", 10.0, 10.0, 100.0, 0.0)
        .unwrap();

    let mut prices = HashMap::new();
    prices.insert("AAPL".to_string(), 15.0);
    ledger.set_prices(prices);

    let positions = ledger.stock_positions().unwrap();
    assert_eq!(positions[0].market_value, 150.0);
}
