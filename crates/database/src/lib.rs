//! # Trade Journal Database Crate
//!
//! This crate is the journal's persistence collaborator: the only place that
//! assigns trade ids, changes a trade's status, or touches the database file.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** Encapsulates all SQL. The rest of the application sees the
//!   narrow `TradeStore` interface (`append`, `close`, `get`, `list`).
//! - **Key-to-value rows:** The `trades` table mirrors the journal's column
//!   layout. Rows are read into `TradeFields` maps and parsed by `core-types`,
//!   so a hand-edited value that no longer parses surfaces as `DbError::Corrupt`.
//! - **Asynchronous & Pooled:** All operations are asynchronous over a `sqlx`
//!   SQLite pool.
//!
//! ## Public API
//!
//! - `connect` / `connect_in_memory`: Establish the connection pool.
//! - `run_migrations`: Apply the embedded schema migrations.
//! - `TradeStore` / `SqliteTradeStore`: The store interface and its SQLite implementation.
//! - `DbError`: The specific error types that can be returned from this crate.

pub mod connection;
pub mod error;
pub mod repository;

pub use connection::{connect, connect_in_memory, run_migrations};
pub use error::DbError;
pub use repository::{SqliteTradeStore, TradeFilter, TradeStore};
