//! Key-to-value representation of a trade record.
//!
//! Records cross the persistence and import boundaries as string maps keyed by
//! the journal's column names. Parsing a map into typed values is where
//! missing or malformed input is rejected.

use crate::error::CoreError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Column names of the journal, in their canonical export order.
pub mod columns {
    pub const TRADE_ID: &str = "Trade_ID";
    pub const TRADE_STATUS: &str = "Trade_Status";

    // Entry
    pub const ENTRY_DATE: &str = "Entry_Date";
    pub const SYMBOL: &str = "Symbol";
    pub const STRATEGY: &str = "Strategy";
    pub const DIRECTION: &str = "Direction";
    pub const LOTS: &str = "Lots";
    pub const WIDTH: &str = "Width";
    pub const CREDIT_RECEIVED: &str = "Credit_Received";
    pub const MAX_LOSS: &str = "Max_Loss";
    pub const MARGIN_USED: &str = "Margin_Used";
    pub const DTE_ENTRY: &str = "DTE_Entry";
    pub const SPREAD_ENTRY_PRICE: &str = "Spread_Entry_Price";
    pub const SHORT_LEG_ENTRY: &str = "Short_Leg_Entry";
    pub const LONG_LEG_ENTRY: &str = "Long_Leg_Entry";
    pub const SHORT_CALL_ENTRY: &str = "Short_Call_Entry";
    pub const LONG_CALL_ENTRY: &str = "Long_Call_Entry";
    pub const SHORT_PUT_ENTRY: &str = "Short_Put_Entry";
    pub const LONG_PUT_ENTRY: &str = "Long_Put_Entry";
    pub const SELL_STRIKE_DELTA: &str = "Sell_Strike_Delta";
    pub const IV_ENTRY: &str = "IV_Entry";
    pub const IV_PERCENTILE_ENTRY: &str = "IV_Percentile_Entry";
    pub const IV_HV_PERCENT: &str = "IV_HV_Percent";
    pub const VIX_ENTRY: &str = "VIX_Entry";
    pub const PLANNED_EXIT_PERCENT: &str = "Planned_Exit_Percent";
    pub const ENTRY_CONFIDENCE: &str = "Entry_Confidence";
    pub const ENTRY_NOTES: &str = "Entry_Notes";

    // Exit
    pub const EXIT_DATE: &str = "Exit_Date";
    pub const SPREAD_EXIT_PRICE: &str = "Spread_Exit_Price";
    pub const SHORT_LEG_EXIT: &str = "Short_Leg_Exit";
    pub const LONG_LEG_EXIT: &str = "Long_Leg_Exit";
    pub const SHORT_CALL_EXIT: &str = "Short_Call_Exit";
    pub const LONG_CALL_EXIT: &str = "Long_Call_Exit";
    pub const SHORT_PUT_EXIT: &str = "Short_Put_Exit";
    pub const LONG_PUT_EXIT: &str = "Long_Put_Exit";
    pub const ADJUSTMENT_MADE: &str = "Adjustment_Made";
    pub const EXIT_EMOTION: &str = "Exit_Emotion";
    pub const RULE_BROKEN: &str = "Rule_Broken";
    pub const RULE_BROKEN_WHICH: &str = "Rule_Broken_Which";

    // Computed
    pub const DAYS_IN_TRADE: &str = "Days_in_Trade";
    pub const MULTIPLIER: &str = "Multiplier";
    pub const REALIZED_PNL: &str = "Realized_PnL";
    pub const WIN_LOSS: &str = "Win_Loss";
    pub const RETURN_ON_MARGIN_PCT: &str = "Return_on_Margin_%";
    pub const YIELD_PER_TRADE: &str = "Yield_per_Trade";
    pub const MAX_PROFIT: &str = "Max_Profit";
    pub const EXIT_EFFICIENCY_PCT: &str = "Exit_Efficiency_%";
    pub const RISK_UTILIZATION_PCT: &str = "Risk_Utilization_%";
    pub const RULE_VIOLATION_FLAG: &str = "Rule_Violation_Flag";

    pub const ALL: &[&str] = &[
        TRADE_ID,
        TRADE_STATUS,
        ENTRY_DATE,
        SYMBOL,
        STRATEGY,
        DIRECTION,
        LOTS,
        WIDTH,
        CREDIT_RECEIVED,
        MAX_LOSS,
        MARGIN_USED,
        DTE_ENTRY,
        SPREAD_ENTRY_PRICE,
        SHORT_LEG_ENTRY,
        LONG_LEG_ENTRY,
        SHORT_CALL_ENTRY,
        LONG_CALL_ENTRY,
        SHORT_PUT_ENTRY,
        LONG_PUT_ENTRY,
        SELL_STRIKE_DELTA,
        IV_ENTRY,
        IV_PERCENTILE_ENTRY,
        IV_HV_PERCENT,
        VIX_ENTRY,
        PLANNED_EXIT_PERCENT,
        ENTRY_CONFIDENCE,
        ENTRY_NOTES,
        EXIT_DATE,
        SPREAD_EXIT_PRICE,
        SHORT_LEG_EXIT,
        LONG_LEG_EXIT,
        SHORT_CALL_EXIT,
        LONG_CALL_EXIT,
        SHORT_PUT_EXIT,
        LONG_PUT_EXIT,
        ADJUSTMENT_MADE,
        EXIT_EMOTION,
        RULE_BROKEN,
        RULE_BROKEN_WHICH,
        DAYS_IN_TRADE,
        MULTIPLIER,
        REALIZED_PNL,
        WIN_LOSS,
        RETURN_ON_MARGIN_PCT,
        YIELD_PER_TRADE,
        MAX_PROFIT,
        EXIT_EFFICIENCY_PCT,
        RISK_UTILIZATION_PCT,
        RULE_VIOLATION_FLAG,
    ];
}

/// Parses a decimal, accepting scientific notation as spreadsheets often emit it.
pub fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, CoreError> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| CoreError::InvalidInput(field.to_string(), format!("'{raw}' is not a number")))
}

/// Parses a calendar date in `YYYY-MM-DD` form. A trailing time component is ignored.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, CoreError> {
    let raw = raw.trim();
    let date_part = raw.split(|c: char| c == ' ' || c == 'T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| {
        CoreError::InvalidInput(field.to_string(), format!("'{raw}' is not a YYYY-MM-DD date"))
    })
}

/// Rejects negative amounts for fields that must be zero or positive.
pub fn require_non_negative(field: &str, value: Decimal) -> Result<Decimal, CoreError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CoreError::InvalidInput(
            field.to_string(),
            format!("{value} must be zero or positive"),
        ));
    }
    Ok(value)
}

/// A trade record as a key-to-value mapping.
///
/// Blank values are treated exactly like absent keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFields(BTreeMap<String, String>);

impl TradeFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Inserts `value` only when present.
    pub fn insert_opt<T: ToString>(&mut self, key: &str, value: Option<&T>) {
        if let Some(value) = value {
            self.0.insert(key.to_string(), value.to_string());
        }
    }

    /// Copies every entry of `other` into this map, overwriting duplicates.
    pub fn extend(&mut self, other: TradeFields) {
        self.0.extend(other.0);
    }

    /// Returns the trimmed value, or `None` when absent or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn require_text(&self, key: &str) -> Result<String, CoreError> {
        self.get(key)
            .map(str::to_string)
            .ok_or_else(|| missing(key))
    }

    pub fn optional_text(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    pub fn require_decimal(&self, key: &str) -> Result<Decimal, CoreError> {
        let raw = self.get(key).ok_or_else(|| missing(key))?;
        parse_decimal(key, raw)
    }

    pub fn optional_decimal(&self, key: &str) -> Result<Option<Decimal>, CoreError> {
        self.get(key).map(|raw| parse_decimal(key, raw)).transpose()
    }

    pub fn require_date(&self, key: &str) -> Result<NaiveDate, CoreError> {
        let raw = self.get(key).ok_or_else(|| missing(key))?;
        parse_date(key, raw)
    }

    /// Parses an integer column. Spreadsheets store integers as `5.0`, so an
    /// integral decimal is accepted too.
    pub fn optional_integer(&self, key: &str) -> Result<Option<i64>, CoreError> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        let value = parse_decimal(key, raw)?;
        if !value.fract().is_zero() {
            return Err(CoreError::InvalidInput(
                key.to_string(),
                format!("'{raw}' is not a whole number"),
            ));
        }
        rust_decimal::prelude::ToPrimitive::to_i64(&value)
            .map(Some)
            .ok_or_else(|| {
                CoreError::InvalidInput(key.to_string(), format!("'{raw}' is out of range"))
            })
    }

    pub fn require_integer(&self, key: &str) -> Result<i64, CoreError> {
        self.optional_integer(key)?.ok_or_else(|| missing(key))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TradeFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn missing(key: &str) -> CoreError {
    CoreError::InvalidInput(key.to_string(), "required field is missing".to_string())
}
