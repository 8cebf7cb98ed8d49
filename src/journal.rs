use analytics::{compute_trade_metrics, AnalyticsEngine, PortfolioReport};
use anyhow::{ensure, Result};
use core_types::{ClosedTrade, TradeEntry, TradeExit, TradeId, TradeMetrics, TradeRecord};
use database::{DbError, TradeFilter, TradeStore};

/// Application service tying the trade store to the analytics engine.
///
/// It holds no state of its own: every portfolio query reloads the closed
/// trades from the store.
pub struct Journal<S> {
    store: S,
    engine: AnalyticsEngine,
}

impl<S: TradeStore> Journal<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            engine: AnalyticsEngine::new(),
        }
    }

    /// Records a new open trade and returns its id.
    pub async fn open_trade(&self, entry: &TradeEntry) -> Result<TradeId> {
        entry.validate()?;
        Ok(self.store.append(entry).await?)
    }

    /// Closes an open trade: computes its metrics once and persists them with
    /// the exit. Returns the closed record.
    pub async fn close_trade(&self, id: TradeId, exit: TradeExit) -> Result<TradeRecord> {
        let mut record = self.store.get(id).await?;
        if !record.status.can_close() {
            return Err(DbError::AlreadyClosed(id).into());
        }

        let metrics = compute_trade_metrics(&record.entry, &exit)?;
        self.store.close(id, &exit, &metrics).await?;
        record.close(exit, metrics)?;
        Ok(record)
    }

    /// Appends an already-closed trade, e.g. from an imported journal. The
    /// trade is written in one step, so a failed write never leaves it open.
    pub async fn record_closed_trade(
        &self,
        entry: &TradeEntry,
        exit: &TradeExit,
        metrics: &TradeMetrics,
    ) -> Result<TradeId> {
        entry.validate()?;
        Ok(self.store.append_closed(entry, exit, metrics).await?)
    }

    pub async fn trades(&self, filter: TradeFilter) -> Result<Vec<TradeRecord>> {
        Ok(self.store.list(filter).await?)
    }

    /// Recomputes the portfolio statistics from the current closed-trade set.
    pub async fn portfolio_report(&self) -> Result<PortfolioReport> {
        let records = self.store.list(TradeFilter::Closed).await?;
        let closed: Vec<ClosedTrade> = records.iter().filter_map(TradeRecord::as_closed).collect();
        ensure!(
            closed.len() == records.len(),
            "{} closed trade(s) are missing exit data",
            records.len() - closed.len()
        );
        Ok(self.engine.compute_portfolio_metrics(&closed)?)
    }
}
