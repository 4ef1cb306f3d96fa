//! Performance metrics and statistics.
//!
//! Values here are unrounded; rounding to 2 decimals happens once, when the
//! `SimulationResult` is built.

use chrono::{Datelike, NaiveDate};

use super::portfolio::EquityPoint;
use super::position::Trade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.0;
pub const RISK_FREE_RATE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawdown {
    /// Fraction in [0, 1].
    pub max_drawdown: f64,
    pub peak_date: Option<NaiveDate>,
    pub trough_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearlyStat {
    pub year: i32,
    /// Percent.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub cagr: f64,
    pub drawdown: Drawdown,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub yearly_returns: Vec<YearlyStat>,
    pub yearly_mdd: Vec<YearlyStat>,
}

impl Metrics {
    pub fn compute(equity_curve: &[EquityPoint], trades: &[Trade], initial_cash: f64) -> Self {
        let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
            return Metrics::empty();
        };

        let total_return = if initial_cash > 0.0 {
            (last.value / initial_cash - 1.0) * 100.0
        } else {
            0.0
        };

        let days = (last.date - first.date).num_days();
        let cagr = if days > 0 {
            ((1.0 + total_return / 100.0).powf(DAYS_PER_YEAR / days as f64) - 1.0) * 100.0
        } else {
            0.0
        };

        let drawdown = compute_drawdown(equity_curve);
        let returns = daily_returns(equity_curve);
        let sharpe_ratio = compute_sharpe(&returns, RISK_FREE_RATE);
        let sortino_ratio = compute_sortino(&returns, RISK_FREE_RATE);
        let calmar_ratio = if drawdown.max_drawdown > 0.0 {
            cagr / (drawdown.max_drawdown * 100.0)
        } else {
            0.0
        };

        let mut total_trades = 0usize;
        let mut wins = 0usize;
        let mut total_profit = 0.0_f64;
        let mut total_loss = 0.0_f64;
        for trade in trades.iter().filter(|t| !t.is_rebalance()) {
            total_trades += 1;
            if trade.is_open() {
                continue;
            }
            if trade.pnl > 0.0 {
                wins += 1;
                total_profit += trade.pnl;
            } else {
                total_loss += trade.pnl;
            }
        }
        let total_loss = total_loss.abs();

        let win_rate = if total_trades > 0 {
            wins as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };
        let profit_factor = if total_loss > 0.0 {
            total_profit / total_loss
        } else {
            0.0
        };

        let (yearly_returns, yearly_mdd) = compute_yearly(equity_curve);

        Metrics {
            total_return,
            cagr,
            drawdown,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            total_trades,
            win_rate,
            profit_factor,
            yearly_returns,
            yearly_mdd,
        }
    }

    fn empty() -> Self {
        Metrics {
            total_return: 0.0,
            cagr: 0.0,
            drawdown: Drawdown {
                max_drawdown: 0.0,
                peak_date: None,
                trough_date: None,
            },
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            calmar_ratio: 0.0,
            total_trades: 0,
            win_rate: 0.0,
            profit_factor: 0.0,
            yearly_returns: Vec::new(),
            yearly_mdd: Vec::new(),
        }
    }
}

/// Round half away from zero to `dp` decimal places.
pub fn round_dp(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

/// Single forward pass tracking the running peak. The peak moves only on a
/// strictly higher value, so equal highs keep the earlier peak date.
pub fn compute_drawdown(equity_curve: &[EquityPoint]) -> Drawdown {
    let Some(first) = equity_curve.first() else {
        return Drawdown {
            max_drawdown: 0.0,
            peak_date: None,
            trough_date: None,
        };
    };

    let mut peak = first.value;
    let mut peak_date = first.date;
    let mut max_dd = 0.0_f64;
    let mut dd_start = first.date;
    let mut dd_end = first.date;

    for point in equity_curve {
        if point.value > peak {
            peak = point.value;
            peak_date = point.date;
        }
        let dd = if peak > 0.0 {
            (point.value - peak) / peak
        } else {
            0.0
        };
        if dd < max_dd {
            max_dd = dd;
            dd_start = peak_date;
            dd_end = point.date;
        }
    }

    Drawdown {
        max_drawdown: max_dd.abs(),
        peak_date: Some(dd_start),
        trough_date: Some(dd_end),
    }
}

/// Fractional change between consecutive equity values; 0 after a zero value.
pub fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].value;
            if prev > 0.0 {
                (w[1].value - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1); `None` with fewer than two values.
fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

pub fn compute_sharpe(returns: &[f64], risk_free_rate: f64) -> f64 {
    match sample_stddev(returns) {
        Some(sd) if sd > 0.0 => {
            let annual_return = mean(returns) * TRADING_DAYS_PER_YEAR;
            let annual_vol = sd * TRADING_DAYS_PER_YEAR.sqrt();
            (annual_return - risk_free_rate) / annual_vol
        }
        _ => 0.0,
    }
}

pub fn compute_sortino(returns: &[f64], risk_free_rate: f64) -> f64 {
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let downside: Vec<f64> = excess.iter().copied().filter(|e| *e < 0.0).collect();

    match sample_stddev(&downside) {
        Some(sd) if sd > 0.0 => {
            let annual_excess = mean(&excess) * TRADING_DAYS_PER_YEAR;
            annual_excess / (sd * TRADING_DAYS_PER_YEAR.sqrt())
        }
        _ => 0.0,
    }
}

/// Per calendar year: return `(last / first - 1) * 100` and max drawdown in percent.
pub fn compute_yearly(equity_curve: &[EquityPoint]) -> (Vec<YearlyStat>, Vec<YearlyStat>) {
    let mut returns = Vec::new();
    let mut mdds = Vec::new();

    for group in equity_curve.chunk_by(|a, b| a.date.year() == b.date.year()) {
        let year = group[0].date.year();
        let start = group[0].value;
        let end = group[group.len() - 1].value;
        let ret = if start > 0.0 {
            (end / start - 1.0) * 100.0
        } else {
            0.0
        };
        returns.push(YearlyStat { year, value: ret });
        mdds.push(YearlyStat {
            year,
            value: compute_drawdown(group).max_drawdown * 100.0,
        });
    }

    (returns, mdds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::TradeKind;
    use approx::assert_relative_eq;

    fn make_equity_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                value: v,
            })
            .collect()
    }

    fn make_trade(direction: TradeKind, pnl: f64) -> Trade {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Trade {
            direction,
            entry_date: date,
            exit_date: date,
            entry_price: 100.0,
            exit_price: 100.0,
            units: 1.0,
            pnl,
            pnl_pct: 0.0,
            cash_before: None,
            cash_after: None,
            note: String::new(),
            open: false,
        }
    }

    #[test]
    fn metrics_empty_curve() {
        let metrics = Metrics::compute(&[], &[], 100_000.0);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.total_trades, 0);
        assert!(metrics.drawdown.peak_date.is_none());
        assert!(metrics.yearly_returns.is_empty());
    }

    #[test]
    fn metrics_total_return() {
        let curve = make_equity_curve(&[100_000.0, 110_000.0]);
        let metrics = Metrics::compute(&curve, &[], 100_000.0);
        assert_relative_eq!(metrics.total_return, 10.0, epsilon = 1e-9);

        let curve = make_equity_curve(&[100_000.0, 90_000.0]);
        let metrics = Metrics::compute(&curve, &[], 100_000.0);
        assert_relative_eq!(metrics.total_return, -10.0, epsilon = 1e-9);
    }

    #[test]
    fn metrics_cagr_over_one_year() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let curve = vec![
            EquityPoint {
                date: start,
                value: 100_000.0,
            },
            EquityPoint {
                date: start + chrono::Duration::days(365),
                value: 121_000.0,
            },
        ];
        let metrics = Metrics::compute(&curve, &[], 100_000.0);
        assert_relative_eq!(metrics.cagr, 21.0, epsilon = 1e-9);
    }

    #[test]
    fn metrics_cagr_zero_elapsed_days() {
        let curve = make_equity_curve(&[120_000.0]);
        let metrics = Metrics::compute(&curve, &[], 100_000.0);
        assert_eq!(metrics.cagr, 0.0);
    }

    #[test]
    fn max_drawdown_and_dates() {
        let curve = make_equity_curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        let dd = compute_drawdown(&curve);
        assert_relative_eq!(dd.max_drawdown, 30.0 / 110.0, epsilon = 1e-12);
        assert_eq!(dd.peak_date, Some(curve[1].date));
        assert_eq!(dd.trough_date, Some(curve[4].date));
    }

    #[test]
    fn drawdown_equal_peak_keeps_earlier_date() {
        let curve = make_equity_curve(&[100.0, 120.0, 110.0, 120.0, 90.0]);
        let dd = compute_drawdown(&curve);
        assert_relative_eq!(dd.max_drawdown, 0.25, epsilon = 1e-12);
        assert_eq!(dd.peak_date, Some(curve[1].date));
        assert_eq!(dd.trough_date, Some(curve[4].date));
    }

    #[test]
    fn drawdown_monotonic_rise_is_zero() {
        let curve = make_equity_curve(&[1.0, 2.0, 3.0]);
        let dd = compute_drawdown(&curve);
        assert_eq!(dd.max_drawdown, 0.0);
        assert_eq!(dd.peak_date, dd.trough_date);
    }

    #[test]
    fn drawdown_to_zero_is_full() {
        let curve = make_equity_curve(&[100.0, 50.0, 0.0]);
        assert_relative_eq!(compute_drawdown(&curve).max_drawdown, 1.0);
    }

    #[test]
    fn daily_returns_guard_zero() {
        let curve = make_equity_curve(&[100.0, 0.0, 50.0]);
        assert_eq!(daily_returns(&curve), vec![-1.0, 0.0]);
    }

    #[test]
    fn sharpe_zero_for_flat_curve() {
        assert_eq!(compute_sharpe(&[0.0; 10], RISK_FREE_RATE), 0.0);
        assert_eq!(compute_sharpe(&[0.01], RISK_FREE_RATE), 0.0);
    }

    #[test]
    fn sharpe_matches_formula() {
        let returns = [0.01, -0.005, 0.002, 0.004];
        let m = returns.iter().sum::<f64>() / 4.0;
        let var = returns.iter().map(|r| (r - m).powi(2)).sum::<f64>() / 3.0;
        let expected = (m * 252.0 - 0.02) / (var.sqrt() * 252f64.sqrt());
        assert_relative_eq!(compute_sharpe(&returns, 0.02), expected, epsilon = 1e-12);
    }

    #[test]
    fn sortino_needs_downside_spread() {
        // all positive excess returns: no downside
        assert_eq!(compute_sortino(&[0.01, 0.02, 0.03], RISK_FREE_RATE), 0.0);
        // single downside value: no spread
        assert_eq!(compute_sortino(&[0.01, -0.02, 0.03], RISK_FREE_RATE), 0.0);
        let s = compute_sortino(&[0.01, -0.02, 0.03, -0.01], RISK_FREE_RATE);
        assert!(s.is_finite());
        assert!(s != 0.0);
    }

    #[test]
    fn trade_stats_exclude_rebalance() {
        let curve = make_equity_curve(&[100_000.0, 100_250.0]);
        let trades = vec![
            make_trade(TradeKind::Long, 100.0),
            make_trade(TradeKind::Rebalance, -5.0),
            make_trade(TradeKind::Short, -50.0),
            make_trade(TradeKind::Long, 200.0),
            make_trade(TradeKind::Long, 0.0),
        ];
        let metrics = Metrics::compute(&curve, &trades, 100_000.0);
        assert_eq!(metrics.total_trades, 4);
        assert_relative_eq!(metrics.win_rate, 50.0);
        assert_relative_eq!(metrics.profit_factor, 6.0);
    }

    #[test]
    fn open_trade_counted_but_not_scored() {
        let curve = make_equity_curve(&[100_000.0, 100_300.0]);
        let mut still_open = make_trade(TradeKind::Long, 500.0);
        still_open.open = true;
        let trades = vec![make_trade(TradeKind::Long, -200.0), still_open];

        let metrics = Metrics::compute(&curve, &trades, 100_000.0);
        assert_eq!(metrics.total_trades, 2);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.profit_factor, 0.0);
    }

    #[test]
    fn sub_cent_profit_is_a_win() {
        let curve = make_equity_curve(&[100_000.0, 100_000.0]);
        let trades = vec![make_trade(TradeKind::Long, 0.004), make_trade(TradeKind::Short, -1.0)];
        let metrics = Metrics::compute(&curve, &trades, 100_000.0);
        assert_relative_eq!(metrics.win_rate, 50.0);
        assert_relative_eq!(metrics.profit_factor, 0.004);
    }

    #[test]
    fn profit_factor_zero_without_losses() {
        let curve = make_equity_curve(&[100_000.0, 100_100.0]);
        let trades = vec![make_trade(TradeKind::Long, 100.0)];
        let metrics = Metrics::compute(&curve, &trades, 100_000.0);
        assert_eq!(metrics.profit_factor, 0.0);
        assert_relative_eq!(metrics.win_rate, 100.0);
    }

    #[test]
    fn calmar_uses_percent_drawdown() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let curve = vec![
            EquityPoint { date: start, value: 100.0 },
            EquityPoint {
                date: start + chrono::Duration::days(100),
                value: 80.0,
            },
            EquityPoint {
                date: start + chrono::Duration::days(365),
                value: 110.0,
            },
        ];
        let metrics = Metrics::compute(&curve, &[], 100.0);
        assert_relative_eq!(metrics.calmar_ratio, metrics.cagr / 20.0, epsilon = 1e-9);
    }

    #[test]
    fn yearly_breakdown() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        let curve = vec![
            EquityPoint { date: d(2022, 12, 1), value: 100.0 },
            EquityPoint { date: d(2022, 12, 30), value: 120.0 },
            EquityPoint { date: d(2023, 1, 2), value: 60.0 },
            EquityPoint { date: d(2023, 6, 1), value: 90.0 },
        ];
        let (returns, mdd) = compute_yearly(&curve);
        assert_eq!(returns.len(), 2);
        assert_eq!(returns[0].year, 2022);
        assert_relative_eq!(returns[0].value, 20.0, epsilon = 1e-9);
        assert_relative_eq!(returns[1].value, 50.0, epsilon = 1e-9);
        // drawdown restricted to each year's points
        assert_eq!(mdd[0].value, 0.0);
        assert_eq!(mdd[1].value, 0.0);
    }

    #[test]
    fn round_dp_behaviour() {
        assert_eq!(round_dp(1.234, 2), 1.23);
        assert_eq!(round_dp(-1.235_1, 2), -1.24);
        assert_eq!(round_dp(2.5, 0), 3.0);
    }
}
