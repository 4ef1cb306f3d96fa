//! Day-by-day position simulation.
//!
//! For each day from the signal's `valid_start_index`:
//! 1. Accrue cash yield on a long position (previous close), mark to market.
//! 2. With a position open, equity below `BANKRUPTCY_FRACTION` of initial
//!    cash is terminal: emit a zero equity point and stop. A flat book after
//!    a losing close keeps trading on whatever cash is left.
//! 3. Emit the day's equity point (rounded to cents).
//! 4. On the first day of a new calendar month, rebalance an open position.
//! 5. Exit transition (LONG on sell, SHORT on buy), then entry transition
//!    from FLAT on the same day's signals.

use chrono::{Datelike, NaiveDate};

use super::metrics::round_dp;
use super::params::SimulationParams;
use super::portfolio::Portfolio;
use super::position::{MachineState, PositionSide};
use super::price_series::PricePoint;
use super::signal::Signals;

pub const BANKRUPTCY_FRACTION: f64 = 0.15;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub portfolio: Portfolio,
}

impl SimulationOutcome {
    pub fn is_bankrupt(&self) -> bool {
        self.portfolio.bankrupt
    }
}

fn month_changed(prev: NaiveDate, curr: NaiveDate) -> bool {
    (prev.year(), prev.month()) != (curr.year(), curr.month())
}

/// LONG on sell / SHORT on buy -> FLAT. Returns the side that was closed.
pub fn apply_exit(
    portfolio: &mut Portfolio,
    point: &PricePoint,
    buy: bool,
    sell: bool,
    params: &SimulationParams,
) -> Option<PositionSide> {
    let should_exit = match portfolio.state() {
        MachineState::Long => sell,
        MachineState::Short => buy,
        MachineState::Flat | MachineState::Bankrupt => false,
    };
    if !should_exit {
        return None;
    }
    portfolio.close(point.price, point.date, params.slippage, params.fee_rate)
}

/// FLAT -> LONG on buy, FLAT -> SHORT on sell when shorting is allowed.
pub fn apply_entry(
    portfolio: &mut Portfolio,
    point: &PricePoint,
    buy: bool,
    sell: bool,
    params: &SimulationParams,
) -> Option<PositionSide> {
    if portfolio.state() != MachineState::Flat || portfolio.cash <= 0.0 {
        return None;
    }
    let side = if buy {
        PositionSide::Long
    } else if sell && params.trade_direction.allows_short() {
        PositionSide::Short
    } else {
        return None;
    };
    portfolio
        .open(
            side,
            point.price,
            point.date,
            params.leverage,
            params.slippage,
            params.fee_rate,
        )
        .then_some(side)
}

pub fn simulate(points: &[PricePoint], signals: &Signals, params: &SimulationParams) -> SimulationOutcome {
    let mut portfolio = Portfolio::new(params.initial_cash);
    let floor = params.initial_cash * BANKRUPTCY_FRACTION;
    let start = signals.valid_start_index.min(points.len());
    let days = &points[start..];

    for (offset, point) in days.iter().enumerate() {
        let i = start + offset;
        let prev = if offset > 0 { Some(&days[offset - 1]) } else { None };

        if params.enable_yield {
            if let Some(prev) = prev {
                portfolio.accrue_yield(prev.price, params.annual_yield);
            }
        }
        let equity = portfolio.equity(point.price);

        if !portfolio.is_flat() && equity < floor {
            log::debug!(
                "bankrupt on {}: equity {:.2} below floor {:.2}",
                point.date,
                equity,
                floor
            );
            portfolio.mark_bankrupt(point.date);
            break;
        }

        portfolio.record_equity(point.date, round_dp(equity, 2));

        if params.enable_rebalance && !portfolio.is_flat() && portfolio.cash > 0.0 {
            if let Some(prev) = prev {
                if month_changed(prev.date, point.date) {
                    portfolio.rebalance(point.price, point.date, params.leverage, params.fee_rate, equity);
                }
            }
        }

        let buy = signals.buy.get(i).copied().unwrap_or(false);
        let sell = signals.sell.get(i).copied().unwrap_or(false);
        apply_exit(&mut portfolio, point, buy, sell, params);
        apply_entry(&mut portfolio, point, buy, sell, params);
    }

    if !portfolio.bankrupt {
        if let Some(last) = days.last() {
            portfolio.record_open_position(last.price, last.date);
        }
    }

    SimulationOutcome { portfolio }
}
