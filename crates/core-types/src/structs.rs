use crate::enums::{TradeStatus, WinLoss};
use crate::error::CoreError;
use crate::fields::{columns, require_non_negative, TradeFields};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier assigned by the trade store. Never reused.
pub type TradeId = i64;

/// Individual leg prices of a multi-leg position.
///
/// Two-leg spreads fill the `short_leg`/`long_leg` pair, iron condors the four
/// call/put legs. They are informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegPrices {
    pub short_leg: Option<Decimal>,
    pub long_leg: Option<Decimal>,
    pub short_call: Option<Decimal>,
    pub long_call: Option<Decimal>,
    pub short_put: Option<Decimal>,
    pub long_put: Option<Decimal>,
}

/// Column names for one side (entry or exit) of the leg prices.
struct LegColumns([&'static str; 6]);

const ENTRY_LEGS: LegColumns = LegColumns([
    columns::SHORT_LEG_ENTRY,
    columns::LONG_LEG_ENTRY,
    columns::SHORT_CALL_ENTRY,
    columns::LONG_CALL_ENTRY,
    columns::SHORT_PUT_ENTRY,
    columns::LONG_PUT_ENTRY,
]);

const EXIT_LEGS: LegColumns = LegColumns([
    columns::SHORT_LEG_EXIT,
    columns::LONG_LEG_EXIT,
    columns::SHORT_CALL_EXIT,
    columns::LONG_CALL_EXIT,
    columns::SHORT_PUT_EXIT,
    columns::LONG_PUT_EXIT,
]);

impl LegPrices {
    fn from_fields(fields: &TradeFields, cols: &LegColumns) -> Result<Self, CoreError> {
        let [sl, ll, sc, lc, sp, lp] = cols.0;
        Ok(Self {
            short_leg: fields.optional_decimal(sl)?,
            long_leg: fields.optional_decimal(ll)?,
            short_call: fields.optional_decimal(sc)?,
            long_call: fields.optional_decimal(lc)?,
            short_put: fields.optional_decimal(sp)?,
            long_put: fields.optional_decimal(lp)?,
        })
    }

    fn write_fields(&self, fields: &mut TradeFields, cols: &LegColumns) {
        let [sl, ll, sc, lc, sp, lp] = cols.0;
        fields.insert_opt(sl, self.short_leg.as_ref());
        fields.insert_opt(ll, self.long_leg.as_ref());
        fields.insert_opt(sc, self.short_call.as_ref());
        fields.insert_opt(lc, self.long_call.as_ref());
        fields.insert_opt(sp, self.short_put.as_ref());
        fields.insert_opt(lp, self.long_put.as_ref());
    }
}

/// Descriptive context recorded at entry. None of it takes part in the metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeContext {
    pub symbol: String,
    pub strategy: String,
    pub direction: Option<String>,
    pub width: Option<Decimal>,
    pub dte_entry: Option<i64>,
    pub sell_strike_delta: Option<Decimal>,
    pub legs: LegPrices,
    pub iv_entry: Option<Decimal>,
    pub iv_percentile_entry: Option<Decimal>,
    pub iv_hv_pct: Option<Decimal>,
    pub vix_entry: Option<Decimal>,
    pub planned_exit_pct: Option<Decimal>,
    /// Self-assessed conviction, 1 to 5.
    pub entry_confidence: Option<u8>,
    pub notes: Option<String>,
}

/// The entry side of a trade. Immutable once the trade is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEntry {
    pub entry_date: NaiveDate,
    pub lots: Decimal,
    pub spread_entry_price: Decimal,
    pub credit_received: Decimal,
    /// Risk capital committed to the position.
    pub max_loss: Decimal,
    pub margin_used: Decimal,
    pub context: TradeContext,
}

impl TradeEntry {
    /// Checks the constraints the metric formulas rely on.
    pub fn validate(&self) -> Result<(), CoreError> {
        require_non_negative(columns::LOTS, self.lots)?;
        require_non_negative(columns::MAX_LOSS, self.max_loss)?;
        require_non_negative(columns::MARGIN_USED, self.margin_used)?;
        if let Some(confidence) = self.context.entry_confidence {
            if !(1..=5).contains(&confidence) {
                return Err(CoreError::InvalidInput(
                    columns::ENTRY_CONFIDENCE.to_string(),
                    format!("{confidence} is outside 1..=5"),
                ));
            }
        }
        Ok(())
    }

    /// Parses and validates the entry columns of a record.
    pub fn from_fields(fields: &TradeFields) -> Result<Self, CoreError> {
        let entry_confidence = fields
            .optional_integer(columns::ENTRY_CONFIDENCE)?
            .map(|c| {
                u8::try_from(c).map_err(|_| {
                    CoreError::InvalidInput(
                        columns::ENTRY_CONFIDENCE.to_string(),
                        format!("{c} is outside 1..=5"),
                    )
                })
            })
            .transpose()?;

        let entry = Self {
            entry_date: fields.require_date(columns::ENTRY_DATE)?,
            lots: fields.require_decimal(columns::LOTS)?,
            spread_entry_price: fields.require_decimal(columns::SPREAD_ENTRY_PRICE)?,
            credit_received: fields.require_decimal(columns::CREDIT_RECEIVED)?,
            max_loss: fields.require_decimal(columns::MAX_LOSS)?,
            margin_used: fields.require_decimal(columns::MARGIN_USED)?,
            context: TradeContext {
                symbol: fields.optional_text(columns::SYMBOL).unwrap_or_default(),
                strategy: fields.optional_text(columns::STRATEGY).unwrap_or_default(),
                direction: fields.optional_text(columns::DIRECTION),
                width: fields.optional_decimal(columns::WIDTH)?,
                dte_entry: fields.optional_integer(columns::DTE_ENTRY)?,
                sell_strike_delta: fields.optional_decimal(columns::SELL_STRIKE_DELTA)?,
                legs: LegPrices::from_fields(fields, &ENTRY_LEGS)?,
                iv_entry: fields.optional_decimal(columns::IV_ENTRY)?,
                iv_percentile_entry: fields.optional_decimal(columns::IV_PERCENTILE_ENTRY)?,
                iv_hv_pct: fields.optional_decimal(columns::IV_HV_PERCENT)?,
                vix_entry: fields.optional_decimal(columns::VIX_ENTRY)?,
                planned_exit_pct: fields.optional_decimal(columns::PLANNED_EXIT_PERCENT)?,
                entry_confidence,
                notes: fields.optional_text(columns::ENTRY_NOTES),
            },
        };
        entry.validate()?;
        Ok(entry)
    }

    pub fn to_fields(&self) -> TradeFields {
        let mut fields = TradeFields::new();
        let ctx = &self.context;
        fields.insert(columns::ENTRY_DATE, self.entry_date.to_string());
        fields.insert(columns::SYMBOL, ctx.symbol.clone());
        fields.insert(columns::STRATEGY, ctx.strategy.clone());
        fields.insert_opt(columns::DIRECTION, ctx.direction.as_ref());
        fields.insert(columns::LOTS, self.lots.to_string());
        fields.insert_opt(columns::WIDTH, ctx.width.as_ref());
        fields.insert(columns::CREDIT_RECEIVED, self.credit_received.to_string());
        fields.insert(columns::MAX_LOSS, self.max_loss.to_string());
        fields.insert(columns::MARGIN_USED, self.margin_used.to_string());
        fields.insert_opt(columns::DTE_ENTRY, ctx.dte_entry.as_ref());
        fields.insert(columns::SPREAD_ENTRY_PRICE, self.spread_entry_price.to_string());
        ctx.legs.write_fields(&mut fields, &ENTRY_LEGS);
        fields.insert_opt(columns::SELL_STRIKE_DELTA, ctx.sell_strike_delta.as_ref());
        fields.insert_opt(columns::IV_ENTRY, ctx.iv_entry.as_ref());
        fields.insert_opt(columns::IV_PERCENTILE_ENTRY, ctx.iv_percentile_entry.as_ref());
        fields.insert_opt(columns::IV_HV_PERCENT, ctx.iv_hv_pct.as_ref());
        fields.insert_opt(columns::VIX_ENTRY, ctx.vix_entry.as_ref());
        fields.insert_opt(columns::PLANNED_EXIT_PERCENT, ctx.planned_exit_pct.as_ref());
        fields.insert_opt(columns::ENTRY_CONFIDENCE, ctx.entry_confidence.as_ref());
        fields.insert_opt(columns::ENTRY_NOTES, ctx.notes.as_ref());
        fields
    }
}

/// The exit side of a trade, supplied once when the trade is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeExit {
    pub exit_date: NaiveDate,
    /// Cost to close the spread.
    pub spread_exit_price: Decimal,
    pub legs: LegPrices,
    pub adjustment_made: Option<String>,
    pub exit_emotion: Option<String>,
    /// Which trading rule was broken, if any.
    pub rule_broken: Option<String>,
}

impl TradeExit {
    pub fn from_fields(fields: &TradeFields) -> Result<Self, CoreError> {
        let rule_broken = fields.optional_text(columns::RULE_BROKEN_WHICH).or_else(|| {
            fields
                .get(columns::RULE_BROKEN)
                .filter(|v| is_truthy(v))
                .map(|_| "unspecified".to_string())
        });
        Ok(Self {
            exit_date: fields.require_date(columns::EXIT_DATE)?,
            spread_exit_price: fields.require_decimal(columns::SPREAD_EXIT_PRICE)?,
            legs: LegPrices::from_fields(fields, &EXIT_LEGS)?,
            adjustment_made: fields.optional_text(columns::ADJUSTMENT_MADE),
            exit_emotion: fields.optional_text(columns::EXIT_EMOTION),
            rule_broken,
        })
    }

    pub fn to_fields(&self) -> TradeFields {
        let mut fields = TradeFields::new();
        fields.insert(columns::EXIT_DATE, self.exit_date.to_string());
        fields.insert(columns::SPREAD_EXIT_PRICE, self.spread_exit_price.to_string());
        self.legs.write_fields(&mut fields, &EXIT_LEGS);
        fields.insert_opt(columns::ADJUSTMENT_MADE, self.adjustment_made.as_ref());
        fields.insert_opt(columns::EXIT_EMOTION, self.exit_emotion.as_ref());
        let broken = if self.rule_broken.is_some() { "Yes" } else { "No" };
        fields.insert(columns::RULE_BROKEN, broken);
        fields.insert_opt(columns::RULE_BROKEN_WHICH, self.rule_broken.as_ref());
        fields
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "yes" | "y" | "true" | "1"
    )
}

/// Realized performance of a single closed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeMetrics {
    /// Calendar days between entry and exit. Negative when the exit predates the entry.
    pub days_in_trade: i64,
    pub multiplier: Decimal,
    pub realized_pnl: Decimal,
    pub win_loss: WinLoss,
    pub return_on_margin_pct: Decimal,
    pub yield_per_trade: Decimal,
    pub max_profit: Decimal,
    pub exit_efficiency_pct: Decimal,
    /// Share of the committed risk consumed, always non-negative.
    pub risk_utilization_pct: Decimal,
    /// `1` when the trade used more than the allowed share of its risk, else `0`.
    pub rule_violation_flag: u8,
}

impl TradeMetrics {
    pub fn is_rule_violation(&self) -> bool {
        self.rule_violation_flag == 1
    }

    pub fn from_fields(fields: &TradeFields) -> Result<Self, CoreError> {
        let win_loss = fields.require_text(columns::WIN_LOSS)?.parse()?;
        let flag = fields.require_integer(columns::RULE_VIOLATION_FLAG)?;
        let rule_violation_flag = match flag {
            0 | 1 => flag as u8,
            other => {
                return Err(CoreError::InvalidInput(
                    columns::RULE_VIOLATION_FLAG.to_string(),
                    format!("{other} is not 0 or 1"),
                ));
            }
        };
        Ok(Self {
            days_in_trade: fields.require_integer(columns::DAYS_IN_TRADE)?,
            multiplier: fields.require_decimal(columns::MULTIPLIER)?,
            realized_pnl: fields.require_decimal(columns::REALIZED_PNL)?,
            win_loss,
            return_on_margin_pct: fields.require_decimal(columns::RETURN_ON_MARGIN_PCT)?,
            yield_per_trade: fields.require_decimal(columns::YIELD_PER_TRADE)?,
            max_profit: fields.require_decimal(columns::MAX_PROFIT)?,
            exit_efficiency_pct: fields.require_decimal(columns::EXIT_EFFICIENCY_PCT)?,
            risk_utilization_pct: fields.require_decimal(columns::RISK_UTILIZATION_PCT)?,
            rule_violation_flag,
        })
    }

    pub fn to_fields(&self) -> TradeFields {
        let mut fields = TradeFields::new();
        fields.insert(columns::DAYS_IN_TRADE, self.days_in_trade.to_string());
        fields.insert(columns::MULTIPLIER, self.multiplier.to_string());
        fields.insert(columns::REALIZED_PNL, self.realized_pnl.to_string());
        fields.insert(columns::WIN_LOSS, self.win_loss.as_str());
        fields.insert(columns::RETURN_ON_MARGIN_PCT, self.return_on_margin_pct.to_string());
        fields.insert(columns::YIELD_PER_TRADE, self.yield_per_trade.to_string());
        fields.insert(columns::MAX_PROFIT, self.max_profit.to_string());
        fields.insert(columns::EXIT_EFFICIENCY_PCT, self.exit_efficiency_pct.to_string());
        fields.insert(columns::RISK_UTILIZATION_PCT, self.risk_utilization_pct.to_string());
        fields.insert(columns::RULE_VIOLATION_FLAG, self.rule_violation_flag.to_string());
        fields
    }
}

/// A journal entry with its lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: TradeId,
    pub status: TradeStatus,
    pub entry: TradeEntry,
    pub exit: Option<TradeExit>,
    pub metrics: Option<TradeMetrics>,
}

impl TradeRecord {
    pub fn open(id: TradeId, entry: TradeEntry) -> Self {
        Self {
            id,
            status: TradeStatus::Open,
            entry,
            exit: None,
            metrics: None,
        }
    }

    /// Transitions the record to `Closed`, attaching exit and computed attributes.
    /// A record can only be closed once.
    pub fn close(&mut self, exit: TradeExit, metrics: TradeMetrics) -> Result<(), CoreError> {
        if !self.status.can_close() {
            return Err(CoreError::InvalidTransition(
                self.id,
                format!("trade is already {}", self.status),
            ));
        }
        self.exit = Some(exit);
        self.metrics = Some(metrics);
        self.status = TradeStatus::Closed;
        Ok(())
    }

    /// The view the portfolio engine consumes. `None` while the trade is open.
    pub fn as_closed(&self) -> Option<ClosedTrade> {
        match (self.status, &self.exit, &self.metrics) {
            (TradeStatus::Closed, Some(exit), Some(metrics)) => Some(ClosedTrade {
                trade_id: self.id,
                exit_date: exit.exit_date,
                realized_pnl: metrics.realized_pnl,
            }),
            _ => None,
        }
    }

    pub fn from_fields(fields: &TradeFields) -> Result<Self, CoreError> {
        let id = fields.require_integer(columns::TRADE_ID)?;
        let status: TradeStatus = fields.require_text(columns::TRADE_STATUS)?.parse()?;
        let entry = TradeEntry::from_fields(fields)?;
        let (exit, metrics) = match status {
            TradeStatus::Open => (None, None),
            TradeStatus::Closed => (
                Some(TradeExit::from_fields(fields)?),
                Some(TradeMetrics::from_fields(fields)?),
            ),
        };
        Ok(Self {
            id,
            status,
            entry,
            exit,
            metrics,
        })
    }

    pub fn to_fields(&self) -> TradeFields {
        let mut fields = TradeFields::new();
        fields.insert(columns::TRADE_ID, self.id.to_string());
        fields.insert(columns::TRADE_STATUS, self.status.as_str());
        fields.extend(self.entry.to_fields());
        if let Some(exit) = &self.exit {
            fields.extend(exit.to_fields());
        }
        if let Some(metrics) = &self.metrics {
            fields.extend(metrics.to_fields());
        }
        fields
    }
}

/// The minimal projection of a closed trade needed for portfolio analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub trade_id: TradeId,
    pub exit_date: NaiveDate,
    pub realized_pnl: Decimal,
}
