use chrono::NaiveDate;
use core_types::TradeId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One step of the equity curve, taken at a trade's exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub trade_id: TradeId,
    pub exit_date: NaiveDate,
    pub realized_pnl: Decimal,
    /// Cumulative realized P&L up to and including this trade.
    pub equity: Decimal,
    /// High-water mark of the equity curve so far.
    pub running_max: Decimal,
    /// `equity - running_max`, never positive.
    pub drawdown: Decimal,
}

/// Portfolio-level statistics over every closed trade.
///
/// This struct is the output of the `AnalyticsEngine`. It is rebuilt from the
/// closed-trade set on every query and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioReport {
    // I. Profitability
    pub cumulative_pnl: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub profit_factor: Option<Decimal>, // None when there is no gross loss

    // II. Drawdown
    pub current_drawdown: Decimal,
    pub max_drawdown: Decimal,

    // III. Trade statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: Decimal,
    pub loss_rate_pct: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub payoff_ratio: Option<Decimal>, // None when the average loss is zero
    pub expectancy: Decimal,

    // IV. Path
    pub equity_curve: Vec<EquityPoint>,
}

impl PortfolioReport {
    /// Creates the zeroed report returned for an empty trade history.
    pub fn new() -> Self {
        Self {
            cumulative_pnl: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            profit_factor: None,
            current_drawdown: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate_pct: Decimal::ZERO,
            loss_rate_pct: Decimal::ZERO,
            average_win: Decimal::ZERO,
            average_loss: Decimal::ZERO,
            payoff_ratio: None,
            expectancy: Decimal::ZERO,
            equity_curve: Vec::new(),
        }
    }
}

impl Default for PortfolioReport {
    fn default() -> Self {
        Self::new()
    }
}
