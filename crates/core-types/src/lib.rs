//! # Trade Journal Core Types
//!
//! The shared vocabulary of the journal: trade records, their entry, exit and
//! computed attributes, and the key-to-value form records take when they cross
//! the storage and import boundaries. This crate has no dependencies on any
//! other workspace crate.

pub mod enums;
pub mod error;
pub mod fields;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{TradeStatus, WinLoss};
pub use error::CoreError;
pub use fields::{columns, TradeFields};
pub use structs::{
    ClosedTrade, LegPrices, TradeContext, TradeEntry, TradeExit, TradeId, TradeMetrics,
    TradeRecord,
};
