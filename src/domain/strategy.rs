//! Saved strategy records and their store key.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::backtest::SimulationResult;
use super::params::{SimulationParams, StrategyMode, TradeDirection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedStrategy {
    pub id: String,
    pub name: String,
    pub asset: String,
    pub strategy_type: StrategyMode,
    pub direction: TradeDirection,
    pub ma_fast: Option<usize>,
    pub ma_slow: Option<usize>,
    pub leverage: f64,
    pub total_return: f64,
    pub cagr: f64,
    pub mdd: f64,
    pub sharpe: f64,
    pub calmar: f64,
    pub backtest_period: String,
    pub created_at: NaiveDateTime,
    pub params: SimulationParams,
}

impl SavedStrategy {
    pub fn from_backtest(
        name: &str,
        asset: &str,
        params: &SimulationParams,
        result: &SimulationResult,
        created_at: NaiveDateTime,
    ) -> Self {
        let (ma_fast, ma_slow) = match params.strategy_mode {
            StrategyMode::BuyAndHold => (None, None),
            StrategyMode::SingleMa => (Some(params.ma_fast), None),
            StrategyMode::DualMa => (Some(params.ma_fast), Some(params.ma_slow)),
        };
        let backtest_period = backtest_period(
            result.equity_curve.first().map(|p| p.date),
            result.equity_curve.last().map(|p| p.date),
        );

        let mut saved = SavedStrategy {
            id: String::new(),
            name: name.to_string(),
            asset: asset.to_string(),
            strategy_type: params.strategy_mode,
            direction: params.trade_direction,
            ma_fast,
            ma_slow,
            leverage: params.leverage,
            total_return: result.total_return,
            cagr: result.cagr,
            mdd: result.mdd,
            sharpe: result.sharpe_ratio,
            calmar: result.calmar_ratio,
            backtest_period,
            created_at,
            params: params.clone(),
        };
        saved.id = strategy_id(&saved);
        saved
    }
}

fn backtest_period(first: Option<NaiveDate>, last: Option<NaiveDate>) -> String {
    match (first, last) {
        (Some(first), Some(last)) => format!("{first} ~ {last}"),
        _ => String::new(),
    }
}

/// `{asset}_{type}_{fast|0}_{slow|fast}_{leverage}x_{period}`, stripped of
/// characters that are not legal in store keys.
pub fn strategy_id(strategy: &SavedStrategy) -> String {
    let fast = strategy.ma_fast.unwrap_or(0);
    let slow = strategy.ma_slow.or(strategy.ma_fast).unwrap_or(0);
    // {:?} keeps the fractional part, so 2.0 renders as "2.0" and not "2"
    let raw = format!(
        "{}_{}_{}_{}_{:?}x_{}",
        strategy.asset, strategy.strategy_type, fast, slow, strategy.leverage, strategy.backtest_period
    );
    sanitize_key(&raw)
}

pub fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            ' ' | '#' | '$' | '[' | ']' => None,
            '~' | '.' => Some('_'),
            '/' => Some('-'),
            other => Some(other),
        })
        .collect()
}
