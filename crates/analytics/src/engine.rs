use crate::error::AnalyticsError;
use crate::report::{EquityPoint, PortfolioReport};
use core_types::ClosedTrade;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// A stateless calculator for portfolio statistics over the closed-trade set.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for portfolio analytics.
    ///
    /// # Arguments
    ///
    /// * `closed_trades` - Every closed trade, in any order.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `PortfolioReport`, or an `Overflow` error when
    /// a running total leaves the `Decimal` range. An empty input yields the
    /// zeroed report.
    pub fn compute_portfolio_metrics(
        &self,
        closed_trades: &[ClosedTrade],
    ) -> Result<PortfolioReport, AnalyticsError> {
        let mut report = PortfolioReport::new();

        if closed_trades.is_empty() {
            return Ok(report);
        }

        // Drawdown is path-dependent, so the curve is built in exit order.
        // `sort_by_key` is stable: same-day exits keep their input order.
        let mut ordered: Vec<&ClosedTrade> = closed_trades.iter().collect();
        ordered.sort_by_key(|t| t.exit_date);

        self.calculate_equity_curve(&ordered, &mut report)?;
        self.calculate_expectancy(&ordered, &mut report)?;

        tracing::debug!(
            total_trades = report.total_trades,
            cumulative_pnl = %report.cumulative_pnl,
            max_drawdown = %report.max_drawdown,
            expectancy = %report.expectancy,
            "Computed portfolio metrics."
        );

        Ok(report)
    }

    /// Single pass with two accumulators: running equity and its high-water mark.
    fn calculate_equity_curve(
        &self,
        ordered: &[&ClosedTrade],
        report: &mut PortfolioReport,
    ) -> Result<(), AnalyticsError> {
        let mut equity = Decimal::ZERO;
        let mut running_max: Option<Decimal> = None;
        let mut max_drawdown = Decimal::ZERO;

        report.equity_curve.reserve(ordered.len());
        for trade in ordered {
            equity = equity
                .checked_add(trade.realized_pnl)
                .ok_or(AnalyticsError::Overflow("equity"))?;
            let peak = running_max.map_or(equity, |peak| peak.max(equity));
            running_max = Some(peak);

            let drawdown = equity
                .checked_sub(peak)
                .ok_or(AnalyticsError::Overflow("drawdown"))?;
            max_drawdown = max_drawdown.min(drawdown);

            report.equity_curve.push(EquityPoint {
                trade_id: trade.trade_id,
                exit_date: trade.exit_date,
                realized_pnl: trade.realized_pnl,
                equity,
                running_max: peak,
                drawdown,
            });
        }

        report.cumulative_pnl = equity;
        report.max_drawdown = max_drawdown;
        report.current_drawdown = report
            .equity_curve
            .last()
            .map_or(Decimal::ZERO, |point| point.drawdown);
        Ok(())
    }

    /// Win/loss partition and expectancy. A zero-P&L trade is a loss.
    fn calculate_expectancy(
        &self,
        ordered: &[&ClosedTrade],
        report: &mut PortfolioReport,
    ) -> Result<(), AnalyticsError> {
        report.total_trades = ordered.len();

        for trade in ordered {
            if trade.realized_pnl > Decimal::ZERO {
                report.winning_trades += 1;
                report.gross_profit = report
                    .gross_profit
                    .checked_add(trade.realized_pnl)
                    .ok_or(AnalyticsError::Overflow("gross_profit"))?;
            } else {
                report.losing_trades += 1;
                report.gross_loss = report
                    .gross_loss
                    .checked_add(trade.realized_pnl.abs())
                    .ok_or(AnalyticsError::Overflow("gross_loss"))?;
            }
        }

        // Counts are at least one here, so these divisions cannot overflow.
        let total = Decimal::from(report.total_trades);
        let win_rate = Decimal::from(report.winning_trades) / total;
        let loss_rate = Decimal::from(report.losing_trades) / total;

        if report.winning_trades > 0 {
            report.average_win = report.gross_profit / Decimal::from(report.winning_trades);
        }
        if report.losing_trades > 0 {
            report.average_loss = report.gross_loss / Decimal::from(report.losing_trades);
        }

        if report.gross_loss > Decimal::ZERO {
            report.profit_factor = Some(
                report
                    .gross_profit
                    .checked_div(report.gross_loss)
                    .ok_or(AnalyticsError::Overflow("profit_factor"))?,
            );
        }
        if report.average_loss > Decimal::ZERO {
            report.payoff_ratio = Some(
                report
                    .average_win
                    .checked_div(report.average_loss)
                    .ok_or(AnalyticsError::Overflow("payoff_ratio"))?,
            );
        }

        report.expectancy = (win_rate * report.average_win)
            .checked_sub(loss_rate * report.average_loss)
            .ok_or(AnalyticsError::Overflow("expectancy"))?;
        report.win_rate_pct = win_rate * dec!(100);
        report.loss_rate_pct = loss_rate * dec!(100);
        Ok(())
    }
}
