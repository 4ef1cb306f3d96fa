//! Simulation parameters for a single backtest run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::TrendgridError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    BuyAndHold,
    SingleMa,
    DualMa,
}

impl StrategyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyMode::BuyAndHold => "buy_and_hold",
            StrategyMode::SingleMa => "single_ma",
            StrategyMode::DualMa => "dual_ma",
        }
    }
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy_and_hold" => Ok(StrategyMode::BuyAndHold),
            "single_ma" => Ok(StrategyMode::SingleMa),
            "dual_ma" => Ok(StrategyMode::DualMa),
            other => Err(format!(
                "unknown strategy mode '{other}' (expected buy_and_hold, single_ma or dual_ma)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    LongOnly,
    LongShort,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::LongOnly => "long_only",
            TradeDirection::LongShort => "long_short",
        }
    }

    pub fn allows_short(&self) -> bool {
        matches!(self, TradeDirection::LongShort)
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long_only" => Ok(TradeDirection::LongOnly),
            "long_short" => Ok(TradeDirection::LongShort),
            other => Err(format!(
                "unknown trade direction '{other}' (expected long_only or long_short)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub initial_cash: f64,
    pub leverage: f64,
    pub fee_rate: f64,
    pub slippage: f64,
    pub strategy_mode: StrategyMode,
    pub ma_fast: usize,
    pub ma_slow: usize,
    pub trade_direction: TradeDirection,
    pub enable_rebalance: bool,
    pub enable_yield: bool,
    pub annual_yield: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            initial_cash: 100_000.0,
            leverage: 2.0,
            fee_rate: 0.001,
            slippage: 0.0005,
            strategy_mode: StrategyMode::BuyAndHold,
            ma_fast: 20,
            ma_slow: 60,
            trade_direction: TradeDirection::LongOnly,
            enable_rebalance: true,
            enable_yield: false,
            annual_yield: 0.04,
            start_date: None,
            end_date: None,
        }
    }
}

impl SimulationParams {
    /// Reject configurations that must never reach the state machine.
    pub fn validate(&self) -> Result<(), TrendgridError> {
        let invalid = |reason: String| Err(TrendgridError::InvalidParams { reason });

        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return invalid(format!("initial_cash must be positive, got {}", self.initial_cash));
        }
        if !(self.leverage.is_finite() && self.leverage > 0.0) {
            return invalid(format!("leverage must be positive, got {}", self.leverage));
        }
        if !(self.fee_rate.is_finite() && self.fee_rate >= 0.0) {
            return invalid(format!("fee_rate must be non-negative, got {}", self.fee_rate));
        }
        if !(self.slippage.is_finite() && (0.0..1.0).contains(&self.slippage)) {
            return invalid(format!("slippage must be in [0, 1), got {}", self.slippage));
        }
        if !self.annual_yield.is_finite() || self.annual_yield < 0.0 {
            return invalid(format!(
                "annual_yield must be non-negative, got {}",
                self.annual_yield
            ));
        }

        match self.strategy_mode {
            StrategyMode::BuyAndHold => {}
            StrategyMode::SingleMa => {
                if self.ma_fast == 0 {
                    return invalid("ma_fast must be at least 1".to_string());
                }
            }
            StrategyMode::DualMa => {
                if self.ma_fast == 0 {
                    return invalid("ma_fast must be at least 1".to_string());
                }
                if self.ma_slow <= self.ma_fast {
                    return invalid(format!(
                        "dual_ma requires ma_slow > ma_fast (got fast={}, slow={})",
                        self.ma_fast, self.ma_slow
                    ));
                }
            }
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return invalid(format!("start_date {start} is after end_date {end}"));
            }
        }

        Ok(())
    }
}
