//! Per-run cash/position state, equity curve and trade log.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::execution::{
    entry_execution_price, entry_units, percent_of, rebalance_fee, settle_exit,
};
use super::position::{MachineState, Position, PositionSide, Trade, TradeKind};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Mutable state owned by exactly one simulation.
///
/// At most one position is open at a time; `position` is `None` when flat.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_cash: f64,
    pub position: Option<Position>,
    pub bankrupt: bool,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Portfolio {
            cash: initial_cash,
            initial_cash,
            position: None,
            bankrupt: false,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn state(&self) -> MachineState {
        if self.bankrupt {
            return MachineState::Bankrupt;
        }
        match self.position.as_ref().map(|p| p.side) {
            None => MachineState::Flat,
            Some(PositionSide::Long) => MachineState::Long,
            Some(PositionSide::Short) => MachineState::Short,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn units(&self) -> f64 {
        self.position.as_ref().map_or(0.0, |p| p.units)
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.position
            .as_ref()
            .map_or(0.0, |p| p.unrealized_pnl(price))
    }

    /// cash + unrealized P&L at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.unrealized_pnl(price)
    }

    /// Credit one day of cash yield on a long position, valued at the previous close.
    /// Returns the amount credited.
    pub fn accrue_yield(&mut self, prev_price: f64, annual_yield: f64) -> f64 {
        let units = match &self.position {
            Some(pos) if pos.is_long() => pos.units,
            _ => return 0.0,
        };
        let accrued = prev_price * (annual_yield / TRADING_DAYS_PER_YEAR) * units;
        self.cash += accrued;
        accrued
    }

    pub fn record_equity(&mut self, date: NaiveDate, value: f64) {
        self.equity_curve.push(EquityPoint { date, value });
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    /// Terminal transition: flatten the book and stop accepting activity.
    pub fn mark_bankrupt(&mut self, date: NaiveDate) {
        self.record_equity(date, 0.0);
        self.position = None;
        self.bankrupt = true;
    }

    /// FLAT -> LONG/SHORT. Returns false (and does nothing) unless flat with positive cash.
    pub fn open(
        &mut self,
        side: PositionSide,
        market_price: f64,
        date: NaiveDate,
        leverage: f64,
        slippage: f64,
        fee_rate: f64,
    ) -> bool {
        if self.bankrupt || self.position.is_some() || self.cash <= 0.0 {
            return false;
        }
        let entry_price = entry_execution_price(side, market_price, slippage);
        let units = entry_units(self.cash, leverage, entry_price, fee_rate);
        self.position = Some(Position {
            side,
            units,
            entry_price,
            entry_date: date,
        });
        true
    }

    /// LONG/SHORT -> FLAT. Realizes net P&L into cash and logs the trade.
    pub fn close(
        &mut self,
        market_price: f64,
        date: NaiveDate,
        slippage: f64,
        fee_rate: f64,
    ) -> Option<PositionSide> {
        let position = self.position.take()?;
        let fill = settle_exit(&position, market_price, slippage, fee_rate);
        let cash_before = self.cash;

        self.record_trade(Trade {
            direction: position.side.into(),
            entry_date: position.entry_date,
            exit_date: date,
            entry_price: position.entry_price,
            exit_price: fill.exit_price,
            units: position.units,
            pnl: fill.net_pnl,
            pnl_pct: percent_of(fill.net_pnl, cash_before),
            cash_before: Some(cash_before),
            cash_after: Some(cash_before + fill.net_pnl),
            note: String::new(),
            open: false,
        });

        self.cash += fill.net_pnl;
        Some(position.side)
    }

    /// Reset leverage drift: realize P&L, resize to `cash * leverage / price`,
    /// and charge the fee on the unit delta. The side does not change.
    pub fn rebalance(
        &mut self,
        price: f64,
        date: NaiveDate,
        leverage: f64,
        fee_rate: f64,
        current_equity: f64,
    ) {
        let Some(position) = self.position.as_mut() else {
            return;
        };

        self.cash += position.unrealized_pnl(price);
        let target_units = self.cash * leverage / price;
        let fee = rebalance_fee(position.units, target_units, price, fee_rate);
        self.cash -= fee;

        let note = format!("leverage reset: {:.2} -> {:.2}", position.units, target_units);
        position.units = target_units;
        position.entry_price = price;

        self.trades.push(Trade {
            direction: TradeKind::Rebalance,
            entry_date: date,
            exit_date: date,
            entry_price: price,
            exit_price: price,
            units: target_units,
            pnl: -fee,
            pnl_pct: percent_of(-fee, current_equity),
            cash_before: None,
            cash_after: None,
            note,
            open: false,
        });
    }

    /// Log a still-open position marked to `price` (no exit costs). The book is unchanged.
    pub fn record_open_position(&mut self, price: f64, date: NaiveDate) {
        let Some(position) = self.position.clone() else {
            return;
        };
        let pnl = position.unrealized_pnl(price);
        self.record_trade(Trade {
            direction: position.side.into(),
            entry_date: position.entry_date,
            exit_date: date,
            entry_price: position.entry_price,
            exit_price: price,
            units: position.units,
            pnl,
            pnl_pct: percent_of(pnl, self.cash),
            cash_before: Some(self.cash),
            cash_after: Some(self.cash + pnl),
            note: "open at end of data".to_string(),
            open: true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn new_portfolio_is_flat() {
        let portfolio = Portfolio::new(100_000.0);
        assert_eq!(portfolio.state(), MachineState::Flat);
        assert!((portfolio.cash - 100_000.0).abs() < f64::EPSILON);
        assert_eq!(portfolio.units(), 0.0);
        assert!(portfolio.trades.is_empty());
        assert!(portfolio.equity_curve.is_empty());
    }

    #[test]
    fn open_long_sizes_with_leverage() {
        let mut portfolio = Portfolio::new(100_000.0);
        assert!(portfolio.open(PositionSide::Long, 100.0, d(1, 2), 2.0, 0.0, 0.0));
        assert_eq!(portfolio.state(), MachineState::Long);
        assert!((portfolio.units() - 2000.0).abs() < 1e-9);
        // cash untouched by entry; fee is folded into units
        assert!((portfolio.cash - 100_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn open_refused_when_already_positioned() {
        let mut portfolio = Portfolio::new(100_000.0);
        assert!(portfolio.open(PositionSide::Long, 100.0, d(1, 2), 1.0, 0.0, 0.0));
        assert!(!portfolio.open(PositionSide::Short, 100.0, d(1, 3), 1.0, 0.0, 0.0));
        assert_eq!(portfolio.state(), MachineState::Long);
    }

    #[test]
    fn open_refused_without_cash() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.cash = 0.0;
        assert!(!portfolio.open(PositionSide::Long, 100.0, d(1, 2), 1.0, 0.0, 0.0));
        assert!(portfolio.is_flat());
    }

    #[test]
    fn close_long_realizes_pnl() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.open(PositionSide::Long, 100.0, d(1, 2), 1.0, 0.0, 0.0);
        let closed = portfolio.close(110.0, d(1, 10), 0.0, 0.0);

        assert_eq!(closed, Some(PositionSide::Long));
        assert!(portfolio.is_flat());
        assert!((portfolio.cash - 110_000.0).abs() < 1e-6);

        let trade = &portfolio.trades[0];
        assert_eq!(trade.direction, TradeKind::Long);
        assert!((trade.pnl - 10_000.0).abs() < 1e-6);
        assert!((trade.pnl_pct - 10.0).abs() < 1e-9);
        assert_eq!(trade.cash_before, Some(100_000.0));
        assert_eq!(trade.entry_date, d(1, 2));
        assert_eq!(trade.exit_date, d(1, 10));
    }

    #[test]
    fn close_short_profits_on_decline() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.open(PositionSide::Short, 100.0, d(1, 2), 1.0, 0.0, 0.0);
        assert!((portfolio.equity(90.0) - 110_000.0).abs() < 1e-6);
        portfolio.close(90.0, d(1, 5), 0.0, 0.0);
        assert!((portfolio.cash - 110_000.0).abs() < 1e-6);
        assert_eq!(portfolio.trades[0].direction, TradeKind::Short);
    }

    #[test]
    fn close_when_flat_is_noop() {
        let mut portfolio = Portfolio::new(100_000.0);
        assert_eq!(portfolio.close(10.0, d(1, 2), 0.0, 0.0), None);
        assert!(portfolio.trades.is_empty());
    }

    #[test]
    fn rebalance_resets_units_and_entry() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.open(PositionSide::Long, 100.0, d(1, 30), 2.0, 0.0, 0.0);
        let equity = portfolio.equity(110.0);
        portfolio.rebalance(110.0, d(2, 1), 2.0, 0.001, equity);

        // cash 100000 + 2000 * 10 = 120000, target 120000 * 2 / 110
        let target: f64 = 240_000.0 / 110.0;
        let fee = (target - 2000.0).abs() * 110.0 * 0.001;
        let pos = portfolio.position.as_ref().unwrap();
        assert!((pos.units - target).abs() < 1e-9);
        assert!((pos.entry_price - 110.0).abs() < f64::EPSILON);
        assert_eq!(pos.entry_date, d(1, 30));
        assert!((portfolio.cash - (120_000.0 - fee)).abs() < 1e-6);

        let trade = &portfolio.trades[0];
        assert!(trade.is_rebalance());
        assert!(trade.pnl <= 0.0);
        assert_eq!(trade.entry_date, trade.exit_date);
        assert_eq!(portfolio.state(), MachineState::Long);
    }

    #[test]
    fn yield_accrues_only_when_long() {
        let mut portfolio = Portfolio::new(100_000.0);
        assert_eq!(portfolio.accrue_yield(100.0, 0.04), 0.0);

        portfolio.open(PositionSide::Short, 100.0, d(1, 2), 1.0, 0.0, 0.0);
        assert_eq!(portfolio.accrue_yield(100.0, 0.04), 0.0);
        portfolio.close(100.0, d(1, 3), 0.0, 0.0);

        portfolio.open(PositionSide::Long, 100.0, d(1, 4), 1.0, 0.0, 0.0);
        let accrued = portfolio.accrue_yield(100.0, 0.0252);
        // 100 * 0.0001 * 1000 units
        assert!((accrued - 10.0).abs() < 1e-9);
    }

    #[test]
    fn bankruptcy_is_terminal() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.open(PositionSide::Long, 100.0, d(1, 2), 3.0, 0.0, 0.0);
        portfolio.mark_bankrupt(d(1, 3));
        assert_eq!(portfolio.state(), MachineState::Bankrupt);
        assert_eq!(portfolio.equity_curve.last().unwrap().value, 0.0);
        assert!(!portfolio.open(PositionSide::Long, 100.0, d(1, 4), 1.0, 0.0, 0.0));
    }

    #[test]
    fn open_position_record_keeps_book() {
        let mut portfolio = Portfolio::new(1_000.0);
        portfolio.open(PositionSide::Long, 10.0, d(1, 2), 1.0, 0.0, 0.0);
        portfolio.record_open_position(12.0, d(1, 9));
        assert_eq!(portfolio.state(), MachineState::Long);
        assert_eq!(portfolio.trades.len(), 1);
        assert!((portfolio.trades[0].pnl - 200.0).abs() < 1e-9);
        assert_eq!(portfolio.trades[0].note, "open at end of data");
    }
}
