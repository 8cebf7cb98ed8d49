use crate::error::AnalyticsError;
use core_types::{TradeEntry, TradeExit, TradeFields, TradeMetrics, WinLoss};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Contract multiplier applied to spread prices.
pub const MULTIPLIER: Decimal = dec!(100);

/// Risk utilization above this percentage flags the trade as a rule violation.
pub const RULE_VIOLATION_THRESHOLD_PCT: Decimal = dec!(60);

const HUNDRED: Decimal = dec!(100);

/// Computes the realized metrics of a credit trade being closed.
///
/// Profit accrues when the cost to close is below the credit taken in, so P&L is
/// `entry - exit`. Zero denominators (margin, max loss, max profit) yield a zero
/// metric rather than an error. Fails with `InvalidInput` before computing
/// anything when the entry violates its constraints.
pub fn compute_trade_metrics(
    entry: &TradeEntry,
    exit: &TradeExit,
) -> Result<TradeMetrics, AnalyticsError> {
    entry.validate()?;

    let days_in_trade = exit
        .exit_date
        .signed_duration_since(entry.entry_date)
        .num_days();

    let price_move = entry.spread_entry_price - exit.spread_exit_price;
    let realized_pnl = mul(
        "realized_pnl",
        mul("realized_pnl", price_move, entry.lots)?,
        MULTIPLIER,
    )?;

    let win_loss = if realized_pnl > Decimal::ZERO {
        WinLoss::Win
    } else {
        WinLoss::Loss
    };

    let yield_per_trade = guarded_div("yield_per_trade", realized_pnl, entry.margin_used)?;
    let return_on_margin_pct = mul("return_on_margin_pct", yield_per_trade, HUNDRED)?;

    let max_profit = mul(
        "max_profit",
        mul("max_profit", entry.credit_received, entry.lots)?,
        MULTIPLIER,
    )?;
    let exit_efficiency_pct = mul(
        "exit_efficiency_pct",
        guarded_div("exit_efficiency_pct", realized_pnl, max_profit)?,
        HUNDRED,
    )?;

    let risk_utilization_pct = mul(
        "risk_utilization_pct",
        guarded_div("risk_utilization_pct", realized_pnl.abs(), entry.max_loss)?,
        HUNDRED,
    )?;
    let rule_violation_flag = u8::from(risk_utilization_pct > RULE_VIOLATION_THRESHOLD_PCT);

    if days_in_trade < 0 {
        tracing::warn!(
            entry_date = %entry.entry_date,
            exit_date = %exit.exit_date,
            days_in_trade,
            "Exit date precedes entry date."
        );
    }
    tracing::debug!(
        symbol = %entry.context.symbol,
        %realized_pnl,
        %risk_utilization_pct,
        rule_violation_flag,
        "Computed trade metrics."
    );

    Ok(TradeMetrics {
        days_in_trade,
        multiplier: MULTIPLIER,
        realized_pnl,
        win_loss,
        return_on_margin_pct,
        yield_per_trade,
        max_profit,
        exit_efficiency_pct,
        risk_utilization_pct,
        rule_violation_flag,
    })
}

/// Parses the entry and exit columns of key-to-value records, then computes
/// the trade metrics.
///
/// Any missing, blank or non-numeric required field fails with `InvalidInput`
/// naming the field.
pub fn compute_trade_metrics_from_fields(
    entry_fields: &TradeFields,
    exit_fields: &TradeFields,
) -> Result<TradeMetrics, AnalyticsError> {
    let entry = TradeEntry::from_fields(entry_fields)?;
    let exit = TradeExit::from_fields(exit_fields)?;
    compute_trade_metrics(&entry, &exit)
}

fn mul(metric: &'static str, a: Decimal, b: Decimal) -> Result<Decimal, AnalyticsError> {
    a.checked_mul(b).ok_or(AnalyticsError::Overflow(metric))
}

/// Division that degrades to zero when the denominator is zero.
fn guarded_div(
    metric: &'static str,
    numerator: Decimal,
    denominator: Decimal,
) -> Result<Decimal, AnalyticsError> {
    if denominator.is_zero() {
        return Ok(Decimal::ZERO);
    }
    numerator
        .checked_div(denominator)
        .ok_or(AnalyticsError::Overflow(metric))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_types::{columns, CoreError, LegPrices, TradeContext};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(
        price: Decimal,
        lots: Decimal,
        credit: Decimal,
        max_loss: Decimal,
        margin: Decimal,
    ) -> TradeEntry {
        TradeEntry {
            entry_date: date(2023, 1, 1),
            lots,
            spread_entry_price: price,
            credit_received: credit,
            max_loss,
            margin_used: margin,
            context: TradeContext {
                symbol: "SPX".into(),
                strategy: "Credit Spread".into(),
                ..TradeContext::default()
            },
        }
    }

    fn exit(price: Decimal, exit_date: NaiveDate) -> TradeExit {
        TradeExit {
            exit_date,
            spread_exit_price: price,
            legs: LegPrices::default(),
            adjustment_made: None,
            exit_emotion: None,
            rule_broken: None,
        }
    }

    fn approx(actual: Decimal, expected: Decimal) -> bool {
        (actual - expected).abs() < dec!(0.01)
    }

    #[test]
    fn half_profit_take_on_a_single_lot() {
        let metrics = compute_trade_metrics(
            &entry(dec!(2.00), dec!(1), dec!(2.00), dec!(300), dec!(300)),
            &exit(dec!(1.00), date(2023, 1, 10)),
        )
        .unwrap();

        assert_eq!(metrics.realized_pnl, dec!(100));
        assert_eq!(metrics.days_in_trade, 9);
        assert_eq!(metrics.max_profit, dec!(200));
        assert_eq!(metrics.multiplier, dec!(100));
        assert_eq!(metrics.win_loss, WinLoss::Win);
        assert!(approx(metrics.return_on_margin_pct, dec!(33.33)));
        assert!(approx(metrics.yield_per_trade, dec!(0.3333)));
        assert_eq!(metrics.exit_efficiency_pct, dec!(50));
        assert!(approx(metrics.risk_utilization_pct, dec!(33.33)));
        assert_eq!(metrics.rule_violation_flag, 0);
    }

    #[test]
    fn zero_margin_yields_zero_returns() {
        let metrics = compute_trade_metrics(
            &entry(dec!(2.00), dec!(3), dec!(2.00), dec!(300), dec!(0)),
            &exit(dec!(0.50), date(2023, 1, 5)),
        )
        .unwrap();

        assert_eq!(metrics.realized_pnl, dec!(450));
        assert_eq!(metrics.return_on_margin_pct, Decimal::ZERO);
        assert_eq!(metrics.yield_per_trade, Decimal::ZERO);
    }

    #[test]
    fn zero_credit_and_zero_max_loss_are_guarded() {
        let metrics = compute_trade_metrics(
            &entry(dec!(1.00), dec!(1), dec!(0), dec!(0), dec!(100)),
            &exit(dec!(3.00), date(2023, 1, 2)),
        )
        .unwrap();

        assert_eq!(metrics.max_profit, Decimal::ZERO);
        assert_eq!(metrics.exit_efficiency_pct, Decimal::ZERO);
        assert_eq!(metrics.risk_utilization_pct, Decimal::ZERO);
        assert_eq!(metrics.rule_violation_flag, 0);
    }

    #[test]
    fn losing_trade_has_positive_risk_utilization_and_flags_violation() {
        // Paid 4.00 to close a 2.00 credit: -200 on 300 risk.
        let metrics = compute_trade_metrics(
            &entry(dec!(2.00), dec!(1), dec!(2.00), dec!(300), dec!(300)),
            &exit(dec!(4.00), date(2023, 1, 20)),
        )
        .unwrap();

        assert_eq!(metrics.realized_pnl, dec!(-200));
        assert_eq!(metrics.win_loss, WinLoss::Loss);
        assert!(metrics.risk_utilization_pct > Decimal::ZERO);
        assert!(approx(metrics.risk_utilization_pct, dec!(66.67)));
        assert_eq!(metrics.rule_violation_flag, 1);
        assert!(metrics.is_rule_violation());
        assert_eq!(metrics.exit_efficiency_pct, dec!(-100));
    }

    #[test]
    fn exactly_sixty_percent_is_not_a_violation() {
        // 0.60 * 100 = 60 on 100 risk.
        let metrics = compute_trade_metrics(
            &entry(dec!(1.00), dec!(1), dec!(1.00), dec!(100), dec!(100)),
            &exit(dec!(1.60), date(2023, 1, 2)),
        )
        .unwrap();

        assert_eq!(metrics.risk_utilization_pct, dec!(60));
        assert_eq!(metrics.rule_violation_flag, 0);
    }

    #[test]
    fn scratch_trade_is_a_loss() {
        let metrics = compute_trade_metrics(
            &entry(dec!(1.50), dec!(2), dec!(1.50), dec!(200), dec!(200)),
            &exit(dec!(1.50), date(2023, 1, 1)),
        )
        .unwrap();

        assert_eq!(metrics.realized_pnl, Decimal::ZERO);
        assert_eq!(metrics.win_loss, WinLoss::Loss);
        assert_eq!(metrics.days_in_trade, 0);
    }

    #[test]
    fn exit_before_entry_gives_negative_days() {
        let metrics = compute_trade_metrics(
            &entry(dec!(2.00), dec!(1), dec!(2.00), dec!(300), dec!(300)),
            &exit(dec!(1.00), date(2022, 12, 30)),
        )
        .unwrap();
        assert_eq!(metrics.days_in_trade, -2);
    }

    #[test]
    fn negative_margin_is_invalid_input() {
        let err = compute_trade_metrics(
            &entry(dec!(2.00), dec!(1), dec!(2.00), dec!(300), dec!(-1)),
            &exit(dec!(1.00), date(2023, 1, 10)),
        )
        .unwrap_err();
        let AnalyticsError::InvalidInput(CoreError::InvalidInput(field, _)) = &err else {
            panic!("expected InvalidInput, got {err:?}");
        };
        assert_eq!(field, columns::MARGIN_USED);
    }

    #[test]
    fn pnl_beyond_decimal_range_is_an_overflow_error() {
        let err = compute_trade_metrics(
            &entry(dec!(1), Decimal::MAX, dec!(1), dec!(300), dec!(300)),
            &exit(dec!(0), date(2023, 1, 10)),
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::Overflow("realized_pnl")));
    }

    #[test]
    fn field_maps_are_parsed_before_computation() {
        let entry_fields: TradeFields = [
            (columns::ENTRY_DATE, "2023-01-01"),
            (columns::LOTS, "1"),
            (columns::SPREAD_ENTRY_PRICE, "2.00"),
            (columns::CREDIT_RECEIVED, "2.00"),
            (columns::MAX_LOSS, "300"),
            (columns::MARGIN_USED, "300"),
        ]
        .into_iter()
        .collect();
        let exit_fields: TradeFields = [
            (columns::EXIT_DATE, "2023-01-10"),
            (columns::SPREAD_EXIT_PRICE, "1.00"),
        ]
        .into_iter()
        .collect();

        let metrics = compute_trade_metrics_from_fields(&entry_fields, &exit_fields).unwrap();
        assert_eq!(metrics.realized_pnl, dec!(100));

        let mut bad_exit = exit_fields.clone();
        bad_exit.insert(columns::SPREAD_EXIT_PRICE, "one dollar");
        let err = compute_trade_metrics_from_fields(&entry_fields, &bad_exit).unwrap_err();
        let AnalyticsError::InvalidInput(CoreError::InvalidInput(field, _)) = &err else {
            panic!("expected InvalidInput, got {err:?}");
        };
        assert_eq!(field, columns::SPREAD_EXIT_PRICE);

        let mut missing_lots = entry_fields.clone();
        missing_lots.insert(columns::LOTS, "");
        assert!(compute_trade_metrics_from_fields(&missing_lots, &exit_fields).is_err());
    }
}
