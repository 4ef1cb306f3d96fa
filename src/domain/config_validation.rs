//! Configuration validation.
//!
//! Validates every section before a run, and provides the typed readers the
//! CLI uses to build parameters once validation has passed. Missing keys fall
//! back to the `SimulationParams` / `GridSpec` defaults; present but
//! malformed values are errors.

use std::str::FromStr;

use chrono::NaiveDate;

use crate::domain::error::TrendgridError;
use crate::domain::optimizer::{GridSpec, SortKey};
use crate::domain::params::{SimulationParams, StrategyMode, TradeDirection};
use crate::ports::config_port::ConfigPort;

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TrendgridError {
    TrendgridError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn present(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse `[section] key` with `FromStr`, or return `default` when absent.
pub fn read_value<T>(config: &dyn ConfigPort, section: &str, key: &str, default: T) -> Result<T, TrendgridError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match present(config, section, key) {
        None => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|e: T::Err| invalid(section, key, format!("cannot parse '{s}': {e}"))),
    }
}

pub fn read_bool(config: &dyn ConfigPort, section: &str, key: &str, default: bool) -> Result<bool, TrendgridError> {
    match present(config, section, key) {
        None => Ok(default),
        Some(s) => match s.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(invalid(section, key, format!("expected a boolean, got '{s}'"))),
        },
    }
}

pub fn read_date(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<NaiveDate>, TrendgridError> {
    match present(config, section, key) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))),
    }
}

/// Comma-separated list; an absent key yields `default`, an empty one is an error.
pub fn read_list<T>(config: &dyn ConfigPort, section: &str, key: &str, default: Vec<T>) -> Result<Vec<T>, TrendgridError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = config.get_string(section, key) else {
        return Ok(default);
    };
    let items = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>()
                .map_err(|e| invalid(section, key, format!("cannot parse '{s}': {e}")))
        })
        .collect::<Result<Vec<T>, _>>()?;
    if items.is_empty() {
        return Err(invalid(section, key, "list must not be empty"));
    }
    Ok(items)
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), TrendgridError> {
    match present(config, "data", "dir") {
        Some(_) => Ok(()),
        None => Err(TrendgridError::ConfigMissing {
            section: "data".to_string(),
            key: "dir".to_string(),
        }),
    }
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TrendgridError> {
    let defaults = SimulationParams::default();
    validate_initial_cash(config, defaults.initial_cash)?;
    validate_leverage(config, defaults.leverage)?;
    validate_costs(config, &defaults)?;
    validate_yield(config, &defaults)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TrendgridError> {
    let defaults = SimulationParams::default();
    let mode = read_value(config, "strategy", "mode", defaults.strategy_mode)?;
    read_value(config, "strategy", "direction", defaults.trade_direction)?;
    let fast: usize = read_value(config, "strategy", "ma_fast", defaults.ma_fast)?;
    let slow: usize = read_value(config, "strategy", "ma_slow", defaults.ma_slow)?;

    if mode != StrategyMode::BuyAndHold && fast == 0 {
        return Err(invalid("strategy", "ma_fast", "ma_fast must be at least 1"));
    }
    if mode == StrategyMode::DualMa && slow <= fast {
        return Err(invalid(
            "strategy",
            "ma_slow",
            format!("dual_ma requires ma_slow > ma_fast (got {slow} <= {fast})"),
        ));
    }
    Ok(())
}

pub fn validate_optimize_config(config: &dyn ConfigPort) -> Result<(), TrendgridError> {
    let defaults = GridSpec::default();
    read_list::<StrategyMode>(config, "optimize", "strategy_modes", defaults.strategy_modes)?;
    read_list::<TradeDirection>(config, "optimize", "directions", defaults.directions)?;

    let fast = read_list::<usize>(config, "optimize", "ma_fast_range", defaults.ma_fast_range)?;
    if fast.contains(&0) {
        return Err(invalid("optimize", "ma_fast_range", "periods must be at least 1"));
    }
    let slow = read_list::<usize>(config, "optimize", "ma_slow_range", defaults.ma_slow_range)?;
    if slow.contains(&0) {
        return Err(invalid("optimize", "ma_slow_range", "periods must be at least 1"));
    }
    let leverage = read_list::<f64>(config, "optimize", "leverage_range", defaults.leverage_range)?;
    if leverage.iter().any(|l| !(l.is_finite() && *l > 0.0)) {
        return Err(invalid("optimize", "leverage_range", "leverage values must be positive"));
    }

    let top_n: usize = read_value(config, "optimize", "top_n", defaults.top_n)?;
    if top_n == 0 {
        return Err(invalid("optimize", "top_n", "top_n must be at least 1"));
    }
    let workers: usize = read_value(config, "optimize", "workers", defaults.workers)?;
    if workers == 0 {
        return Err(invalid("optimize", "workers", "workers must be at least 1"));
    }
    read_value::<SortKey>(config, "optimize", "sort_by", defaults.sort_by)?;
    Ok(())
}

fn validate_initial_cash(config: &dyn ConfigPort, default: f64) -> Result<(), TrendgridError> {
    let value: f64 = read_value(config, "backtest", "initial_cash", default)?;
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid("backtest", "initial_cash", "initial_cash must be positive"));
    }
    Ok(())
}

fn validate_leverage(config: &dyn ConfigPort, default: f64) -> Result<(), TrendgridError> {
    let value: f64 = read_value(config, "backtest", "leverage", default)?;
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid("backtest", "leverage", "leverage must be positive"));
    }
    Ok(())
}

fn validate_costs(config: &dyn ConfigPort, defaults: &SimulationParams) -> Result<(), TrendgridError> {
    let fee: f64 = read_value(config, "backtest", "fee_rate", defaults.fee_rate)?;
    if !(fee.is_finite() && fee >= 0.0) {
        return Err(invalid("backtest", "fee_rate", "fee_rate must be non-negative"));
    }
    let slippage: f64 = read_value(config, "backtest", "slippage", defaults.slippage)?;
    if !(0.0..1.0).contains(&slippage) {
        return Err(invalid("backtest", "slippage", "slippage must be in [0, 1)"));
    }
    Ok(())
}

fn validate_yield(config: &dyn ConfigPort, defaults: &SimulationParams) -> Result<(), TrendgridError> {
    read_bool(config, "backtest", "enable_rebalance", defaults.enable_rebalance)?;
    read_bool(config, "backtest", "enable_yield", defaults.enable_yield)?;
    let value: f64 = read_value(config, "backtest", "annual_yield", defaults.annual_yield)?;
    if !(value.is_finite() && value >= 0.0) {
        return Err(invalid("backtest", "annual_yield", "annual_yield must be non-negative"));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), TrendgridError> {
    let start = read_date(config, "backtest", "start_date")?;
    let end = read_date(config, "backtest", "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid("backtest", "start_date", "start_date must be before end_date"));
        }
    }
    Ok(())
}
