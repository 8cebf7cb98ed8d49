//! Terminal rendering. Values are shown as computed; only formatting and
//! sign colors are applied.

use analytics::PortfolioReport;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use core_types::{TradeMetrics, TradeRecord, TradeStatus};
use rust_decimal::Decimal;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn money(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded.abs())
    }
}

fn pct(value: Decimal) -> String {
    format!("{:.2}%", value.round_dp(2))
}

/// Green for gains, red for losses, default for zero.
fn signed_cell(text: String, value: Decimal) -> Cell {
    let cell = Cell::new(text).set_alignment(CellAlignment::Right);
    if value > Decimal::ZERO {
        cell.fg(Color::Green)
    } else if value < Decimal::ZERO {
        cell.fg(Color::Red)
    } else {
        cell
    }
}

fn opt_text(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

pub fn trades_table(records: &[TradeRecord]) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "ID", "Status", "Entry", "Symbol", "Strategy", "Lots", "Entry Px", "Exit", "Exit Px",
        "Days", "P&L", "Result",
    ]);

    for record in records {
        let entry = &record.entry;
        let exit_date = record.exit.as_ref().map(|e| e.exit_date.to_string());
        let exit_price = record.exit.as_ref().map(|e| e.spread_exit_price.to_string());
        let mut row = vec![
            Cell::new(record.id),
            Cell::new(record.status),
            Cell::new(entry.entry_date),
            Cell::new(&entry.context.symbol),
            Cell::new(&entry.context.strategy),
            Cell::new(entry.lots),
            Cell::new(entry.spread_entry_price),
            Cell::new(opt_text(exit_date.as_deref())),
            Cell::new(opt_text(exit_price.as_deref())),
        ];
        match (&record.status, &record.metrics) {
            (TradeStatus::Closed, Some(metrics)) => {
                row.push(Cell::new(metrics.days_in_trade));
                row.push(signed_cell(money(metrics.realized_pnl), metrics.realized_pnl));
                row.push(Cell::new(metrics.win_loss));
            }
            _ => row.extend([Cell::new("-"), Cell::new("-"), Cell::new("-")]),
        }
        table.add_row(row);
    }
    table
}

pub fn metrics_table(metrics: &TradeMetrics) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Metric", "Value"]);
    let violation = if metrics.is_rule_violation() { "YES" } else { "no" };
    table
        .add_row(vec![Cell::new("Days in trade"), Cell::new(metrics.days_in_trade)])
        .add_row(vec![
            Cell::new("Realized P&L"),
            signed_cell(money(metrics.realized_pnl), metrics.realized_pnl),
        ])
        .add_row(vec![Cell::new("Result"), Cell::new(metrics.win_loss)])
        .add_row(vec![
            Cell::new("Return on margin"),
            signed_cell(pct(metrics.return_on_margin_pct), metrics.return_on_margin_pct),
        ])
        .add_row(vec![
            Cell::new("Yield per trade"),
            Cell::new(metrics.yield_per_trade.round_dp(4)),
        ])
        .add_row(vec![Cell::new("Max profit"), Cell::new(money(metrics.max_profit))])
        .add_row(vec![
            Cell::new("Exit efficiency"),
            signed_cell(pct(metrics.exit_efficiency_pct), metrics.exit_efficiency_pct),
        ])
        .add_row(vec![
            Cell::new("Risk utilization"),
            Cell::new(pct(metrics.risk_utilization_pct)),
        ])
        .add_row(vec![Cell::new("Rule violation"), Cell::new(violation)]);
    table
}

pub fn portfolio_table(report: &PortfolioReport) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Metric", "Value"]);
    let ratio = |value: Option<Decimal>| {
        value.map_or("-".to_string(), |v| v.round_dp(2).to_string())
    };
    table
        .add_row(vec![
            Cell::new("Cumulative P&L"),
            signed_cell(money(report.cumulative_pnl), report.cumulative_pnl),
        ])
        .add_row(vec![Cell::new("Total trades"), Cell::new(report.total_trades)])
        .add_row(vec![
            Cell::new("Wins / Losses"),
            Cell::new(format!("{} / {}", report.winning_trades, report.losing_trades)),
        ])
        .add_row(vec![Cell::new("Win rate"), Cell::new(pct(report.win_rate_pct))])
        .add_row(vec![Cell::new("Average win"), Cell::new(money(report.average_win))])
        .add_row(vec![Cell::new("Average loss"), Cell::new(money(report.average_loss))])
        .add_row(vec![
            Cell::new("Expectancy"),
            signed_cell(money(report.expectancy), report.expectancy),
        ])
        .add_row(vec![Cell::new("Profit factor"), Cell::new(ratio(report.profit_factor))])
        .add_row(vec![Cell::new("Payoff ratio"), Cell::new(ratio(report.payoff_ratio))])
        .add_row(vec![
            Cell::new("Current drawdown"),
            signed_cell(money(report.current_drawdown), report.current_drawdown),
        ])
        .add_row(vec![
            Cell::new("Max drawdown"),
            signed_cell(money(report.max_drawdown), report.max_drawdown),
        ]);
    table
}

pub fn equity_curve_table(report: &PortfolioReport) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Exit", "Trade", "P&L", "Equity", "Peak", "Drawdown"]);
    for point in &report.equity_curve {
        table.add_row(vec![
            Cell::new(point.exit_date),
            Cell::new(point.trade_id),
            signed_cell(money(point.realized_pnl), point.realized_pnl),
            signed_cell(money(point.equity), point.equity),
            Cell::new(money(point.running_max)),
            signed_cell(money(point.drawdown), point.drawdown),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_formats_sign_before_currency() {
        assert_eq!(money(dec!(1234.5)), "$1234.50");
        assert_eq!(money(dec!(-50)), "-$50.00");
        assert_eq!(money(dec!(-0.001)), "$0.00");
    }

    #[test]
    fn percentages_round_to_two_places() {
        assert_eq!(pct(dec!(33.333333)), "33.33%");
    }

    #[test]
    fn empty_report_renders_every_metric() {
        let rendered = portfolio_table(&PortfolioReport::new()).to_string();
        assert!(rendered.contains("Cumulative P&L"));
        assert!(rendered.contains("Max drawdown"));
        assert!(rendered.contains("$0.00"));
    }
}
