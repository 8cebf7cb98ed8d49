//! # Trade Journal Analytics Engine
//!
//! This crate turns journal entries into performance numbers. It is the only
//! place in the workspace where metrics are computed.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** No I/O and no knowledge of the trade store. It depends only
//!   on `core-types`.
//! - **Stateless Calculation:** Every call is a deterministic function of its
//!   arguments. The portfolio view is recomputed from the closed-trade set on
//!   every request and nothing is cached between calls.
//!
//! ## Public API
//!
//! - `compute_trade_metrics`: Realized metrics for one trade at close time.
//! - `compute_trade_metrics_from_fields`: The same, starting from key-to-value records.
//! - `AnalyticsEngine`: Portfolio statistics (equity curve, drawdown, expectancy).
//! - `PortfolioReport` / `EquityPoint`: The portfolio result types.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

pub mod calculator;
pub mod engine;
pub mod error;
pub mod report;

pub use calculator::{
    compute_trade_metrics, compute_trade_metrics_from_fields, MULTIPLIER,
    RULE_VIOLATION_THRESHOLD_PCT,
};
pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use report::{EquityPoint, PortfolioReport};
