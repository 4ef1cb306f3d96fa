//! Buy/sell signal generation from moving-average crossovers.

use super::indicator::calculate_sma;
use super::params::{SimulationParams, StrategyMode};
use super::price_series::PricePoint;

/// Per-day crossover signals for one price window.
///
/// `buy` and `sell` have the same length as the window. Days before
/// `valid_start_index` have no fully-formed average and are not simulated.
#[derive(Debug, Clone, PartialEq)]
pub struct Signals {
    pub buy: Vec<bool>,
    pub sell: Vec<bool>,
    pub valid_start_index: usize,
}

impl Signals {
    pub fn len(&self) -> usize {
        self.buy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buy.is_empty()
    }
}

pub fn generate_signals(points: &[PricePoint], params: &SimulationParams) -> Signals {
    let n = points.len();
    let prices: Vec<f64> = points.iter().map(|p| p.price).collect();

    match params.strategy_mode {
        StrategyMode::BuyAndHold => {
            let mut buy = vec![false; n];
            if let Some(first) = buy.first_mut() {
                *first = true;
            }
            Signals {
                buy,
                sell: vec![false; n],
                valid_start_index: 0,
            }
        }
        StrategyMode::SingleMa => {
            let line: Vec<Option<f64>> = prices.iter().copied().map(Some).collect();
            let fast = calculate_sma(&prices, params.ma_fast);
            let (buy, sell) = crossovers(&line, &fast);
            Signals {
                buy,
                sell,
                valid_start_index: params.ma_fast,
            }
        }
        StrategyMode::DualMa => {
            let fast = calculate_sma(&prices, params.ma_fast);
            let slow = calculate_sma(&prices, params.ma_slow);
            let (buy, sell) = crossovers(&fast, &slow);
            Signals {
                buy,
                sell,
                valid_start_index: params.ma_slow,
            }
        }
    }
}

/// `left` crossing above / below `right`, comparing today against yesterday.
/// A day with any undefined operand never signals.
fn crossovers(left: &[Option<f64>], right: &[Option<f64>]) -> (Vec<bool>, Vec<bool>) {
    let n = left.len();
    let mut buy = vec![false; n];
    let mut sell = vec![false; n];

    for i in 1..n {
        let (Some(l_curr), Some(r_curr), Some(l_prev), Some(r_prev)) =
            (left[i], right[i], left[i - 1], right[i - 1])
        else {
            continue;
        };
        buy[i] = l_curr > r_curr && l_prev <= r_prev;
        sell[i] = l_curr < r_curr && l_prev >= r_prev;
    }

    (buy, sell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_points(prices: &[f64]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint {
                date: start + chrono::Duration::days(i as i64),
                price,
            })
            .collect()
    }

    fn params(mode: StrategyMode, fast: usize, slow: usize) -> SimulationParams {
        SimulationParams {
            strategy_mode: mode,
            ma_fast: fast,
            ma_slow: slow,
            ..SimulationParams::default()
        }
    }

    #[test]
    fn buy_and_hold_buys_on_first_day_only() {
        let points = make_points(&[10.0, 11.0, 9.0, 12.0]);
        let signals = generate_signals(&points, &params(StrategyMode::BuyAndHold, 20, 60));
        assert_eq!(signals.buy, vec![true, false, false, false]);
        assert!(signals.sell.iter().all(|s| !s));
        assert_eq!(signals.valid_start_index, 0);
    }

    #[test]
    fn buy_and_hold_empty_window() {
        let signals = generate_signals(&[], &params(StrategyMode::BuyAndHold, 20, 60));
        assert!(signals.is_empty());
    }

    #[test]
    fn single_ma_cross_above_and_below() {
        // SMA(2): -, 10, 10, 10.5, 11.5, 10.5, 9
        let points = make_points(&[10.0, 10.0, 10.0, 11.0, 12.0, 9.0, 9.0]);
        let signals = generate_signals(&points, &params(StrategyMode::SingleMa, 2, 2));

        assert_eq!(signals.valid_start_index, 2);
        // day 3: 11 > 10.5 and day 2: 10 <= 10
        assert!(signals.buy[3]);
        assert!(!signals.buy[4]);
        // day 5: 9 < 10.5 and day 4: 12 >= 11.5
        assert!(signals.sell[5]);
        assert!(!signals.sell[6]);
    }

    #[test]
    fn single_ma_no_signal_during_warmup() {
        let points = make_points(&[1.0, 5.0, 1.0, 5.0]);
        let signals = generate_signals(&points, &params(StrategyMode::SingleMa, 3, 3));
        assert!(!signals.buy[0] && !signals.buy[1] && !signals.buy[2]);
        assert!(!signals.sell[0] && !signals.sell[1] && !signals.sell[2]);
    }

    #[test]
    fn single_ma_touching_average_is_not_a_cross() {
        let points = make_points(&[10.0; 10]);
        let signals = generate_signals(&points, &params(StrategyMode::SingleMa, 3, 3));
        assert!(signals.buy.iter().all(|b| !b));
        assert!(signals.sell.iter().all(|s| !s));
    }

    #[test]
    fn dual_ma_golden_and_death_cross() {
        let mut prices = vec![10.0; 6];
        prices.extend([12.0, 14.0, 16.0]);
        prices.extend([8.0, 6.0, 4.0]);
        let points = make_points(&prices);
        let signals = generate_signals(&points, &params(StrategyMode::DualMa, 2, 4));

        assert_eq!(signals.valid_start_index, 4);
        let first_buy = signals.buy.iter().position(|&b| b).unwrap();
        let first_sell = signals.sell.iter().position(|&s| s).unwrap();
        assert_eq!(first_buy, 6);
        assert!(first_sell > first_buy);
        assert_eq!(signals.buy.iter().filter(|&&b| b).count(), 1);
        assert_eq!(signals.sell.iter().filter(|&&s| s).count(), 1);
    }

    #[test]
    fn buy_and_sell_never_fire_together() {
        let prices: Vec<f64> = (0..80).map(|i| 100.0 + ((i as f64) * 0.7).sin() * 10.0).collect();
        let points = make_points(&prices);
        for p in [
            params(StrategyMode::SingleMa, 5, 5),
            params(StrategyMode::DualMa, 3, 9),
        ] {
            let signals = generate_signals(&points, &p);
            for i in 0..signals.len() {
                assert!(!(signals.buy[i] && signals.sell[i]));
            }
        }
    }
}
