use analytics::{
    compute_trade_metrics, AnalyticsEngine, AnalyticsError, RULE_VIOLATION_THRESHOLD_PCT,
};
use chrono::{Duration, NaiveDate};
use core_types::{ClosedTrade, LegPrices, TradeContext, TradeEntry, TradeExit, WinLoss};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

/// Prices in cents, 0.00 to 50.00.
fn price() -> impl Strategy<Value = Decimal> {
    (0i64..=5_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Whole-dollar amounts, zero included so the guards are exercised.
fn amount() -> impl Strategy<Value = Decimal> {
    prop_oneof![Just(Decimal::ZERO), (1i64..=10_000).prop_map(Decimal::from)]
}

prop_compose! {
    fn trade_pair()(
        entry_price in price(),
        exit_price in price(),
        credit in price(),
        lots in 0i64..=20,
        max_loss in amount(),
        margin in amount(),
        held in -5i64..=120,
    ) -> (TradeEntry, TradeExit) {
        let entry = TradeEntry {
            entry_date: base_date(),
            lots: Decimal::from(lots),
            spread_entry_price: entry_price,
            credit_received: credit,
            max_loss,
            margin_used: margin,
            context: TradeContext::default(),
        };
        let exit = TradeExit {
            exit_date: base_date() + Duration::days(held),
            spread_exit_price: exit_price,
            legs: LegPrices::default(),
            adjustment_made: None,
            exit_emotion: None,
            rule_broken: None,
        };
        (entry, exit)
    }
}

prop_compose! {
    /// Closed trades with pairwise distinct exit dates.
    fn distinct_day_history()(
        pnls in prop::collection::vec(-50_000i64..=50_000, 0..40),
    ) -> Vec<ClosedTrade> {
        pnls.into_iter()
            .enumerate()
            .map(|(i, cents)| ClosedTrade {
                trade_id: i as i64 + 1,
                exit_date: base_date() + Duration::days(i as i64),
                realized_pnl: Decimal::new(cents, 2),
            })
            .collect()
    }
}

proptest! {
    #[test]
    fn risk_utilization_is_never_negative((entry, exit) in trade_pair()) {
        let metrics = compute_trade_metrics(&entry, &exit).unwrap();
        prop_assert!(metrics.risk_utilization_pct >= Decimal::ZERO);
    }

    #[test]
    fn violation_flag_tracks_threshold((entry, exit) in trade_pair()) {
        let metrics = compute_trade_metrics(&entry, &exit).unwrap();
        let over = metrics.risk_utilization_pct > RULE_VIOLATION_THRESHOLD_PCT;
        prop_assert_eq!(metrics.rule_violation_flag == 1, over);
        prop_assert!(metrics.rule_violation_flag <= 1);
    }

    #[test]
    fn win_requires_strictly_positive_pnl((entry, exit) in trade_pair()) {
        let metrics = compute_trade_metrics(&entry, &exit).unwrap();
        prop_assert_eq!(metrics.win_loss == WinLoss::Win, metrics.realized_pnl > Decimal::ZERO);
    }

    #[test]
    fn zero_margin_zeroes_both_returns((entry, exit) in trade_pair()) {
        let entry = TradeEntry { margin_used: Decimal::ZERO, ..entry };
        let metrics = compute_trade_metrics(&entry, &exit).unwrap();
        prop_assert_eq!(metrics.return_on_margin_pct, Decimal::ZERO);
        prop_assert_eq!(metrics.yield_per_trade, Decimal::ZERO);
    }

    #[test]
    fn drawdown_bounds_hold(history in distinct_day_history()) {
        let report = AnalyticsEngine::new().compute_portfolio_metrics(&history).unwrap();
        prop_assert!(report.max_drawdown <= Decimal::ZERO);
        prop_assert!(report.current_drawdown >= report.max_drawdown);
        prop_assert_eq!(report.equity_curve.len(), history.len());
        for point in &report.equity_curve {
            prop_assert!(point.drawdown <= Decimal::ZERO);
            prop_assert!(point.running_max >= point.equity);
        }
        let total: Decimal = history.iter().map(|t| t.realized_pnl).sum();
        prop_assert_eq!(report.cumulative_pnl, total);
    }

    #[test]
    fn shuffled_history_gives_identical_report(
        (history, shuffled) in distinct_day_history()
            .prop_flat_map(|h| (Just(h.clone()), Just(h).prop_shuffle()))
    ) {
        let engine = AnalyticsEngine::new();
        prop_assert_eq!(
            engine.compute_portfolio_metrics(&history).unwrap(),
            engine.compute_portfolio_metrics(&shuffled).unwrap()
        );
    }
}

/// The calculator accepts a trade whose P&L is close to the `Decimal` limit; the
/// portfolio totals over two of them must come back as an error.
#[test]
fn accepted_trades_that_overflow_the_portfolio_totals_are_an_error() {
    let entry = TradeEntry {
        entry_date: base_date(),
        lots: Decimal::from_i128_with_scale(5 * 10_i128.pow(26), 0),
        spread_entry_price: Decimal::ONE,
        credit_received: Decimal::ONE,
        max_loss: Decimal::from(10_000_000_000i64),
        margin_used: Decimal::from(10_000_000_000i64),
        context: TradeContext::default(),
    };
    let exit = TradeExit {
        exit_date: base_date() + Duration::days(3),
        spread_exit_price: Decimal::ZERO,
        legs: LegPrices::default(),
        adjustment_made: None,
        exit_emotion: None,
        rule_broken: None,
    };
    let metrics = compute_trade_metrics(&entry, &exit).unwrap();
    assert_eq!(
        metrics.realized_pnl,
        Decimal::from_i128_with_scale(5 * 10_i128.pow(28), 0)
    );

    let history: Vec<ClosedTrade> = (1..=2)
        .map(|id| ClosedTrade {
            trade_id: id,
            exit_date: exit.exit_date,
            realized_pnl: metrics.realized_pnl,
        })
        .collect();
    let err = AnalyticsEngine::new()
        .compute_portfolio_metrics(&history)
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::Overflow(_)));
}
