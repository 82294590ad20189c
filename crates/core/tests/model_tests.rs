use chrono::NaiveDate;
use serde_json::json;

use wheel_ledger_core::models::analytics::{
    DailyReturn, DetailKind, NetWorthMonth, TradeDetail, WeeklyStatus,
};
use wheel_ledger_core::models::option::{
    OptionAction, OptionStatus, OptionTransaction, OptionType, CONTRACT_MULTIPLIER,
};
use wheel_ledger_core::models::position::PositionKind;
use wheel_ledger_core::models::transaction::{FundingTransaction, StockTransaction, TradeSide};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
//  StockTransaction
// ═══════════════════════════════════════════════════════════════════

mod stock_transaction {
    use super::*;

    #[test]
    fn new_uppercases_symbol() {
        let tx = StockTransaction::new(d(2025, 1, 2), TradeSide::Buy, "aapl", 10.0, 10.0, 100.0, 0.0);
        assert_eq!(tx.symbol, "AAPL");
    }

    #[test]
    fn new_assigns_unique_ids() {
        let a = StockTransaction::new(d(2025, 1, 2), TradeSide::Buy, "AAPL", 10.0, 10.0, 100.0, 0.0);
        let b = StockTransaction::new(d(2025, 1, 2), TradeSide::Buy, "AAPL", 10.0, 10.0, 100.0, 0.0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn trade_side_display() {
        assert_eq!(TradeSide::Buy.to_string(), "Buy");
        assert_eq!(TradeSide::Sell.to_string(), "Sell");
    }

    #[test]
    fn serde_roundtrip() {
        let tx = StockTransaction::new(d(2025, 1, 2), TradeSide::Sell, "MSFT", 5.0, 100.0, 500.0, 1.0);
        let json = serde_json::to_string(&tx).unwrap();
        let back: StockTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, back);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  FundingTransaction
// ═══════════════════════════════════════════════════════════════════

mod funding_transaction {
    use super::*;

    #[test]
    fn parses_long_form_date() {
        let record = FundingTransaction::new("August 25 2025", "Deposit", "$100");
        assert_eq!(record.parse_date().unwrap(), d(2025, 8, 25));
    }

    #[test]
    fn trims_whitespace_before_parsing_date() {
        let record = FundingTransaction::new("  January 01 2025 ", "Deposit", "$100");
        assert_eq!(record.parse_date().unwrap(), d(2025, 1, 1));
    }

    #[test]
    fn rejects_malformed_date() {
        let record = FundingTransaction::new("not a date", "Deposit", "$100");
        assert!(record.parse_date().is_err());
    }

    #[test]
    fn parses_currency_amount_with_symbol_and_commas() {
        let record = FundingTransaction::new("August 25 2025", "Deposit", "$10,000");
        assert_eq!(record.parse_amount().unwrap(), 10_000.0);
    }

    #[test]
    fn parses_plain_decimal_amount() {
        let record = FundingTransaction::new("August 25 2025", "Deposit", "1,234.56");
        assert!((record.parse_amount().unwrap() - 1234.56).abs() < 1e-9);
    }

    #[test]
    fn rejects_malformed_amount() {
        let record = FundingTransaction::new("August 25 2025", "Deposit", "ten dollars");
        assert!(record.parse_amount().is_err());
    }

    #[test]
    fn only_deposit_kind_counts_as_deposit() {
        assert!(FundingTransaction::new("August 25 2025", "Deposit", "$1").is_deposit());
        assert!(!FundingTransaction::new("August 25 2025", "Withdrawal", "$1").is_deposit());
        assert!(!FundingTransaction::new("August 25 2025", "deposit", "$1").is_deposit());
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Option models
// ═══════════════════════════════════════════════════════════════════

mod option_models {
    use super::*;

    #[test]
    fn contract_multiplier_is_100() {
        assert_eq!(CONTRACT_MULTIPLIER, 100.0);
    }

    #[test]
    fn new_uppercases_symbol() {
        let tx = OptionTransaction::new(
            d(2025, 1, 6),
            OptionAction::SellToOpen,
            "pltr",
            OptionType::Put,
            20.0,
            d(2025, 1, 17),
            1,
            100.0,
            22.0,
            0.0,
            "P1",
            "",
        );
        assert_eq!(tx.symbol, "PLTR");
    }

    #[test]
    fn action_serializes_with_broker_spelling() {
        assert_eq!(
            serde_json::to_value(OptionAction::SellToOpen).unwrap(),
            json!("Sell to Open")
        );
        assert_eq!(
            serde_json::to_value(OptionAction::BuyToClose).unwrap(),
            json!("Buy to Close")
        );
        let back: OptionAction = serde_json::from_value(json!("Sell to Open")).unwrap();
        assert_eq!(back, OptionAction::SellToOpen);
    }

    #[test]
    fn status_serializes_closed_early_with_space() {
        assert_eq!(
            serde_json::to_value(OptionStatus::ClosedEarly).unwrap(),
            json!("Closed Early")
        );
        let back: OptionStatus = serde_json::from_value(json!("Closed Early")).unwrap();
        assert_eq!(back, OptionStatus::ClosedEarly);
    }

    #[test]
    fn status_display() {
        assert_eq!(OptionStatus::Open.to_string(), "Open");
        assert_eq!(OptionStatus::ClosedEarly.to_string(), "Closed Early");
        assert_eq!(OptionStatus::Rolled.to_string(), "Rolled");
    }

    #[test]
    fn option_type_display() {
        assert_eq!(OptionType::Call.to_string(), "Call");
        assert_eq!(OptionType::Put.to_string(), "Put");
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Analytics models
// ═══════════════════════════════════════════════════════════════════

mod analytics_models {
    use super::*;

    #[test]
    fn trade_detail_kind_serializes_as_type() {
        let detail = TradeDetail {
            symbol: "PLTR".into(),
            kind: DetailKind::Put,
            amount: 100.0,
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["type"], json!("Put"));
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn daily_return_serializes_camel_case() {
        let dr = DailyReturn {
            date: d(2025, 1, 15),
            premiums: 50.0,
            stock_gains: 20.0,
            total_returns: 70.0,
            premium_details: vec![],
            stock_details: vec![],
        };
        let value = serde_json::to_value(&dr).unwrap();
        assert_eq!(value["stockGains"], json!(20.0));
        assert_eq!(value["totalReturns"], json!(70.0));
        assert!(value.get("stock_gains").is_none());
    }

    #[test]
    fn net_worth_serializes_camel_case() {
        let row = NetWorthMonth {
            month: "2025-01".into(),
            savings_balance: 1000.0,
            brokerage_balance: 2000.0,
            total_net_worth: 3000.0,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["savingsBalance"], json!(1000.0));
        assert_eq!(value["totalNetWorth"], json!(3000.0));
    }

    #[test]
    fn weekly_status_display() {
        assert_eq!(WeeklyStatus::Compliant.to_string(), "compliant");
        assert_eq!(WeeklyStatus::Warning.to_string(), "warning");
        assert_eq!(WeeklyStatus::Violation.to_string(), "violation");
    }

    #[test]
    fn position_kind_display() {
        assert_eq!(PositionKind::Open.to_string(), "open");
        assert_eq!(PositionKind::Closed.to_string(), "closed");
    }
}
