use crate::DbError;
use core_types::{
    columns, TradeEntry, TradeExit, TradeFields, TradeId, TradeMetrics, TradeRecord, TradeStatus,
};
use sqlx::sqlite::{Sqlite, SqlitePool, SqliteRow};
use sqlx::{Column, QueryBuilder, Row};
use std::future::Future;
use std::str::FromStr;

/// Which trades a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradeFilter {
    Open,
    Closed,
    #[default]
    All,
}

impl TradeFilter {
    fn status(&self) -> Option<TradeStatus> {
        match self {
            TradeFilter::Open => Some(TradeStatus::Open),
            TradeFilter::Closed => Some(TradeStatus::Closed),
            TradeFilter::All => None,
        }
    }
}

impl FromStr for TradeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(TradeFilter::Open),
            "closed" => Ok(TradeFilter::Closed),
            "all" => Ok(TradeFilter::All),
            other => Err(format!("unknown trade filter '{other}'")),
        }
    }
}

/// The narrow interface through which the application reads and writes trades.
///
/// The store owns identifier assignment and status transitions.
pub trait TradeStore {
    /// Records a new trade as `OPEN` and returns its freshly assigned id.
    fn append(&self, entry: &TradeEntry) -> impl Future<Output = Result<TradeId, DbError>> + Send;

    /// Records a trade that is already `CLOSED`, with its exit and computed
    /// attributes, in a single write. Returns its freshly assigned id.
    fn append_closed(
        &self,
        entry: &TradeEntry,
        exit: &TradeExit,
        metrics: &TradeMetrics,
    ) -> impl Future<Output = Result<TradeId, DbError>> + Send;

    /// Moves an `OPEN` trade to `CLOSED`, storing its exit and computed
    /// attributes in the same write.
    fn close(
        &self,
        id: TradeId,
        exit: &TradeExit,
        metrics: &TradeMetrics,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    fn get(&self, id: TradeId) -> impl Future<Output = Result<TradeRecord, DbError>> + Send;

    /// Returns the matching trades in ascending id order.
    fn list(&self, filter: TradeFilter)
    -> impl Future<Output = Result<Vec<TradeRecord>, DbError>> + Send;
}

/// `TradeStore` backed by a single SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteTradeStore {
    pool: SqlitePool,
}

impl SqliteTradeStore {
    /// Creates a new store over a shared connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts one row built from `fields` and returns the assigned id.
    async fn insert(&self, fields: &TradeFields) -> Result<TradeId, DbError> {
        let mut query = QueryBuilder::<Sqlite>::new("INSERT INTO trades (");
        let mut names = query.separated(", ");
        for (key, _) in fields.iter() {
            names.push(quoted_column(key)?);
        }
        query.push(") VALUES (");
        let mut values = query.separated(", ");
        for (_, value) in fields.iter() {
            values.push_bind(value.to_string());
        }
        query.push(") RETURNING \"Trade_ID\"");

        let id: TradeId = query.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(id)
    }
}

impl TradeStore for SqliteTradeStore {
    async fn append(&self, entry: &TradeEntry) -> Result<TradeId, DbError> {
        let mut fields = entry.to_fields();
        fields.insert(columns::TRADE_STATUS, TradeStatus::Open.as_str());
        let id = self.insert(&fields).await?;

        tracing::info!(
            trade_id = id,
            symbol = %entry.context.symbol,
            strategy = %entry.context.strategy,
            "Recorded new trade."
        );
        Ok(id)
    }

    async fn append_closed(
        &self,
        entry: &TradeEntry,
        exit: &TradeExit,
        metrics: &TradeMetrics,
    ) -> Result<TradeId, DbError> {
        let mut fields = entry.to_fields();
        fields.extend(exit.to_fields());
        fields.extend(metrics.to_fields());
        fields.insert(columns::TRADE_STATUS, TradeStatus::Closed.as_str());
        let id = self.insert(&fields).await?;

        tracing::info!(
            trade_id = id,
            symbol = %entry.context.symbol,
            realized_pnl = %metrics.realized_pnl,
            "Recorded closed trade."
        );
        Ok(id)
    }

    async fn close(
        &self,
        id: TradeId,
        exit: &TradeExit,
        metrics: &TradeMetrics,
    ) -> Result<(), DbError> {
        let mut fields = exit.to_fields();
        fields.extend(metrics.to_fields());
        fields.insert(columns::TRADE_STATUS, TradeStatus::Closed.as_str());

        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT \"Trade_Status\" FROM trades WHERE \"Trade_ID\" = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let status: TradeStatus = status.ok_or(DbError::NotFound(id))?.parse()?;
        if !status.can_close() {
            return Err(DbError::AlreadyClosed(id));
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE trades SET ");
        let mut assignments = query.separated(", ");
        for (key, value) in fields.iter() {
            assignments.push(format!("{} = ", quoted_column(key)?));
            assignments.push_bind_unseparated(value.to_string());
        }
        query.push(" WHERE \"Trade_ID\" = ");
        query.push_bind(id);
        query.push(" AND \"Trade_Status\" = ");
        query.push_bind(TradeStatus::Open.as_str());
        query.build().execute(&mut *tx).await?;

        tx.commit().await?;

        tracing::info!(
            trade_id = id,
            realized_pnl = %metrics.realized_pnl,
            win_loss = %metrics.win_loss,
            "Closed trade."
        );
        Ok(())
    }

    async fn get(&self, id: TradeId) -> Result<TradeRecord, DbError> {
        let row = sqlx::query("SELECT * FROM trades WHERE \"Trade_ID\" = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound(id))?;
        row_to_record(&row)
    }

    async fn list(&self, filter: TradeFilter) -> Result<Vec<TradeRecord>, DbError> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM trades");
        if let Some(status) = filter.status() {
            query.push(" WHERE \"Trade_Status\" = ");
            query.push_bind(status.as_str());
        }
        query.push(" ORDER BY \"Trade_ID\" ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        tracing::debug!(?filter, count = rows.len(), "Listed trades.");

        rows.iter().map(row_to_record).collect()
    }
}

/// Quotes a journal column name for use as an SQL identifier. Only known
/// columns are accepted, which keeps arbitrary text out of the statement.
fn quoted_column(key: &str) -> Result<String, DbError> {
    if columns::ALL.contains(&key) {
        Ok(format!("\"{key}\""))
    } else {
        Err(DbError::UnknownColumn(key.to_string()))
    }
}

/// Reads a row into its key-to-value form and parses it.
fn row_to_record(row: &SqliteRow) -> Result<TradeRecord, DbError> {
    let mut fields = TradeFields::new();
    for column in row.columns() {
        let name = column.name();
        if name == columns::TRADE_ID {
            let id: i64 = row.try_get(column.ordinal())?;
            fields.insert(name, id.to_string());
        } else if let Some(value) = row.try_get::<Option<String>, _>(column.ordinal())? {
            fields.insert(name, value);
        }
    }
    Ok(TradeRecord::from_fields(&fields)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{connect_in_memory, run_migrations};
    use chrono::NaiveDate;
    use core_types::{LegPrices, TradeContext, WinLoss};
    use rust_decimal_macros::dec;

    async fn store() -> SqliteTradeStore {
        let pool = connect_in_memory().await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteTradeStore::new(pool)
    }

    fn entry(symbol: &str) -> TradeEntry {
        TradeEntry {
            entry_date: NaiveDate::from_ymd_opt(2023, 10, 27).unwrap(),
            lots: dec!(1),
            spread_entry_price: dec!(5.00),
            credit_received: dec!(5.00),
            max_loss: dec!(500),
            margin_used: dec!(500),
            context: TradeContext {
                symbol: symbol.to_string(),
                strategy: "Iron Condor".to_string(),
                direction: Some("Neutral".to_string()),
                dte_entry: Some(30),
                ..TradeContext::default()
            },
        }
    }

    fn exit() -> TradeExit {
        TradeExit {
            exit_date: NaiveDate::from_ymd_opt(2023, 11, 1).unwrap(),
            spread_exit_price: dec!(2.00),
            legs: LegPrices::default(),
            adjustment_made: Some("rolled put side".to_string()),
            exit_emotion: None,
            rule_broken: None,
        }
    }

    fn metrics() -> TradeMetrics {
        TradeMetrics {
            days_in_trade: 5,
            multiplier: dec!(100),
            realized_pnl: dec!(300.00),
            win_loss: WinLoss::Win,
            return_on_margin_pct: dec!(60),
            yield_per_trade: dec!(0.6),
            max_profit: dec!(500),
            exit_efficiency_pct: dec!(60),
            risk_utilization_pct: dec!(60),
            rule_violation_flag: 0,
        }
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids_and_opens_trade() {
        let store = store().await;
        let first = store.append(&entry("SPX")).await.unwrap();
        let second = store.append(&entry("RUT")).await.unwrap();
        assert_eq!(first, 1);
        assert!(second > first);

        let record = store.get(first).await.unwrap();
        assert_eq!(record.status, TradeStatus::Open);
        assert_eq!(record.entry, entry("SPX"));
        assert!(record.exit.is_none());
        assert!(record.metrics.is_none());
    }

    #[tokio::test]
    async fn close_stores_exit_and_metrics() {
        let store = store().await;
        let id = store.append(&entry("SPX")).await.unwrap();
        store.close(id, &exit(), &metrics()).await.unwrap();

        let record = store.get(id).await.unwrap();
        assert_eq!(record.status, TradeStatus::Closed);
        assert_eq!(record.exit, Some(exit()));
        assert_eq!(record.metrics, Some(metrics()));
        assert_eq!(record.as_closed().unwrap().realized_pnl, dec!(300));
    }

    #[tokio::test]
    async fn append_closed_writes_a_closed_trade_in_one_step() {
        let store = store().await;
        let id = store
            .append_closed(&entry("SPX"), &exit(), &metrics())
            .await
            .unwrap();

        let record = store.get(id).await.unwrap();
        assert_eq!(record.status, TradeStatus::Closed);
        assert_eq!(record.entry, entry("SPX"));
        assert_eq!(record.exit, Some(exit()));
        assert_eq!(record.metrics, Some(metrics()));
        assert!(store.list(TradeFilter::Open).await.unwrap().is_empty());

        let err = store.close(id, &exit(), &metrics()).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyClosed(i) if i == id));
    }

    #[tokio::test]
    async fn closing_twice_is_rejected() {
        let store = store().await;
        let id = store.append(&entry("SPX")).await.unwrap();
        store.close(id, &exit(), &metrics()).await.unwrap();
        let err = store.close(id, &exit(), &metrics()).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyClosed(i) if i == id));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = store().await;
        assert!(matches!(store.get(42).await, Err(DbError::NotFound(42))));
        assert!(matches!(
            store.close(42, &exit(), &metrics()).await,
            Err(DbError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = store().await;
        let a = store.append(&entry("SPX")).await.unwrap();
        let b = store.append(&entry("RUT")).await.unwrap();
        store.close(a, &exit(), &metrics()).await.unwrap();

        let open = store.list(TradeFilter::Open).await.unwrap();
        let closed = store.list(TradeFilter::Closed).await.unwrap();
        let all = store.list(TradeFilter::All).await.unwrap();

        assert_eq!(open.iter().map(|r| r.id).collect::<Vec<_>>(), vec![b]);
        assert_eq!(closed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a]);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn unparseable_stored_values_surface_as_corrupt() {
        let store = store().await;
        let id = store.append(&entry("SPX")).await.unwrap();
        sqlx::query("UPDATE trades SET \"Lots\" = 'two' WHERE \"Trade_ID\" = ?")
            .bind(id)
            .execute(&store.pool)
            .await
            .unwrap();

        assert!(matches!(store.get(id).await, Err(DbError::Corrupt(_))));
    }

    #[test]
    fn filters_parse_from_text() {
        assert_eq!("Closed".parse::<TradeFilter>().unwrap(), TradeFilter::Closed);
        assert!("pending".parse::<TradeFilter>().is_err());
    }
}
