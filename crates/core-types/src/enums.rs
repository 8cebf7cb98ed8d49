use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a journal entry. A trade moves `Open -> Closed` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "OPEN",
            TradeStatus::Closed => "CLOSED",
        }
    }

    /// Returns true when a trade in this status may be closed.
    pub fn can_close(&self) -> bool {
        matches!(self, TradeStatus::Open)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(TradeStatus::Open),
            "CLOSED" => Ok(TradeStatus::Closed),
            other => Err(CoreError::InvalidInput(
                "Trade_Status".to_string(),
                format!("unknown status '{other}'"),
            )),
        }
    }
}

/// Outcome label of a closed trade. Zero P&L is a `Loss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinLoss {
    Win,
    Loss,
}

impl WinLoss {
    pub fn as_str(&self) -> &'static str {
        match self {
            WinLoss::Win => "Win",
            WinLoss::Loss => "Loss",
        }
    }
}

impl fmt::Display for WinLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WinLoss {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Win" => Ok(WinLoss::Win),
            "Loss" => Ok(WinLoss::Loss),
            other => Err(CoreError::InvalidInput(
                "Win_Loss".to_string(),
                format!("unknown label '{other}'"),
            )),
        }
    }
}
