//! Backtest runner: one parameter set against one price series.
//!
//! `run_backtest` is pure given its inputs, so the optimizer calls it
//! concurrently against a shared `PriceSeries`.

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

use super::error::TrendgridError;
use super::metrics::{Metrics, YearlyStat, round_dp};
use super::params::SimulationParams;
use super::portfolio::EquityPoint;
use super::position::Trade;
use super::price_series::{MIN_PRICE_POINTS, PriceSeries};
use super::signal::generate_signals;
use super::simulator::simulate;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearlyReturn {
    pub year: i32,
    #[serde(rename = "return")]
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearlyDrawdown {
    pub year: i32,
    pub mdd: f64,
}

/// Metrics rounded to 2 decimals; percentages throughout, `mdd` included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub total_return: f64,
    pub cagr: f64,
    pub mdd: f64,
    pub mdd_start: Option<NaiveDate>,
    pub mdd_end: Option<NaiveDate>,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub yearly_returns: Vec<YearlyReturn>,
    pub yearly_mdd: Vec<YearlyDrawdown>,
}

impl SimulationResult {
    fn from_run(metrics: Metrics, equity_curve: Vec<EquityPoint>, trades: Vec<Trade>) -> Self {
        let round_yearly = |stats: &[YearlyStat]| -> Vec<(i32, f64)> {
            stats.iter().map(|s| (s.year, round_dp(s.value, 2))).collect()
        };

        SimulationResult {
            total_return: round_dp(metrics.total_return, 2),
            cagr: round_dp(metrics.cagr, 2),
            mdd: round_dp(metrics.drawdown.max_drawdown * 100.0, 2),
            mdd_start: metrics.drawdown.peak_date,
            mdd_end: metrics.drawdown.trough_date,
            sharpe_ratio: round_dp(metrics.sharpe_ratio, 2),
            sortino_ratio: round_dp(metrics.sortino_ratio, 2),
            calmar_ratio: round_dp(metrics.calmar_ratio, 2),
            total_trades: metrics.total_trades,
            win_rate: round_dp(metrics.win_rate, 2),
            profit_factor: round_dp(metrics.profit_factor, 2),
            equity_curve,
            trades: trades.into_iter().map(round_trade).collect(),
            yearly_returns: round_yearly(&metrics.yearly_returns)
                .into_iter()
                .map(|(year, value)| YearlyReturn { year, value })
                .collect(),
            yearly_mdd: round_yearly(&metrics.yearly_mdd)
                .into_iter()
                .map(|(year, mdd)| YearlyDrawdown { year, mdd })
                .collect(),
        }
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.equity_curve.last().map(|p| p.value)
    }
}

fn round_trade(trade: Trade) -> Trade {
    Trade {
        entry_price: round_dp(trade.entry_price, 2),
        exit_price: round_dp(trade.exit_price, 2),
        units: round_dp(trade.units, 4),
        pnl: round_dp(trade.pnl, 2),
        pnl_pct: round_dp(trade.pnl_pct, 2),
        cash_before: trade.cash_before.map(|c| round_dp(c, 2)),
        cash_after: trade.cash_after.map(|c| round_dp(c, 2)),
        ..trade
    }
}

/// Validate, window, simulate and measure one parameter set.
pub fn run_backtest(series: &PriceSeries, params: &SimulationParams) -> Result<SimulationResult, TrendgridError> {
    params.validate()?;

    let points = series.window(params.start_date, params.end_date);
    if points.len() < MIN_PRICE_POINTS {
        return Err(TrendgridError::InsufficientData {
            rows: points.len(),
            minimum: MIN_PRICE_POINTS,
        });
    }

    let signals = generate_signals(points, params);
    let outcome = simulate(points, &signals, params);
    let portfolio = outcome.portfolio;

    debug!(
        "{} {} fast={} slow={} lev={}: {} days from index {}, {} trades{}",
        params.strategy_mode,
        params.trade_direction,
        params.ma_fast,
        params.ma_slow,
        params.leverage,
        portfolio.equity_curve.len(),
        signals.valid_start_index,
        portfolio.trades.len(),
        if portfolio.bankrupt { ", bankrupt" } else { "" }
    );

    let metrics = Metrics::compute(&portfolio.equity_curve, &portfolio.trades, params.initial_cash);
    Ok(SimulationResult::from_run(metrics, portfolio.equity_curve, portfolio.trades))
}
