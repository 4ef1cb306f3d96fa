//! Fill simulation: slippage, position sizing and fees.
//!
//! Slippage and fee rates are fractions (0.0005 = 5 bps). Entries fold the
//! fee into the unit count; exits and rebalances charge it against cash.

use super::position::{Position, PositionSide};

/// Long entry (buy): execution_price = market_price * (1 + slippage)
pub fn apply_slippage_long_entry(market_price: f64, slippage: f64) -> f64 {
    market_price * (1.0 + slippage)
}

/// Short entry (sell short): execution_price = market_price * (1 - slippage)
pub fn apply_slippage_short_entry(market_price: f64, slippage: f64) -> f64 {
    market_price * (1.0 - slippage)
}

/// Long exit (sell): execution_price = market_price * (1 - slippage)
pub fn apply_slippage_long_exit(market_price: f64, slippage: f64) -> f64 {
    market_price * (1.0 - slippage)
}

/// Short exit (buy to cover): execution_price = market_price * (1 + slippage)
pub fn apply_slippage_short_exit(market_price: f64, slippage: f64) -> f64 {
    market_price * (1.0 + slippage)
}

pub fn entry_execution_price(side: PositionSide, market_price: f64, slippage: f64) -> f64 {
    match side {
        PositionSide::Long => apply_slippage_long_entry(market_price, slippage),
        PositionSide::Short => apply_slippage_short_entry(market_price, slippage),
    }
}

pub fn exit_execution_price(side: PositionSide, market_price: f64, slippage: f64) -> f64 {
    match side {
        PositionSide::Long => apply_slippage_long_exit(market_price, slippage),
        PositionSide::Short => apply_slippage_short_exit(market_price, slippage),
    }
}

/// units = (cash * leverage) / entry_price / (1 + fee_rate)
pub fn entry_units(cash: f64, leverage: f64, entry_price: f64, fee_rate: f64) -> f64 {
    if entry_price <= 0.0 {
        return 0.0;
    }
    cash * leverage / entry_price / (1.0 + fee_rate)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub exit_price: f64,
    pub gross_pnl: f64,
    pub fee: f64,
    pub net_pnl: f64,
}

/// Settle a close of `position` at `market_price`.
pub fn settle_exit(position: &Position, market_price: f64, slippage: f64, fee_rate: f64) -> ExitFill {
    let exit_price = exit_execution_price(position.side, market_price, slippage);
    let gross_pnl = (exit_price - position.entry_price) * position.units * position.side.sign();
    let fee = exit_price * position.units * fee_rate;
    ExitFill {
        exit_price,
        gross_pnl,
        fee,
        net_pnl: gross_pnl - fee,
    }
}

/// Fee on the unit-count change of a rebalance.
pub fn rebalance_fee(current_units: f64, target_units: f64, price: f64, fee_rate: f64) -> f64 {
    (target_units - current_units).abs() * price * fee_rate
}

/// `numerator / denominator * 100`, or 0 when the denominator is not positive.
pub fn percent_of(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}
