//! Open position and trade records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }
}

/// State of the position state machine on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Flat,
    Long,
    Short,
    Bankrupt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: PositionSide,
    pub units: f64,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == PositionSide::Short
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.units * self.side.sign()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    Long,
    Short,
    Rebalance,
}

impl From<PositionSide> for TradeKind {
    fn from(side: PositionSide) -> Self {
        match side {
            PositionSide::Long => TradeKind::Long,
            PositionSide::Short => TradeKind::Short,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: TradeKind,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub units: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_before: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_after: Option<f64>,
    pub note: String,
    /// Still open on the last simulated day, marked to the last price.
    #[serde(default)]
    pub open: bool,
}

impl Trade {
    pub fn is_rebalance(&self) -> bool {
        self.direction == TradeKind::Rebalance
    }

    /// Counted in `total_trades`, but not a win or a loss.
    pub fn is_open(&self) -> bool {
        self.open
    }
}
