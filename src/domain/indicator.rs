//! Simple moving average.
//!
//! SMA(n)[i] = sum(P[i-j] for j in 0..n) / n
//! Warmup: the first (n-1) values are `None`.

pub fn calculate_sma(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; prices.len()];
    }

    let warmup = period - 1;
    (0..prices.len())
        .map(|i| {
            if i < warmup {
                return None;
            }
            let window = &prices[i + 1 - period..=i];
            Some(window.iter().sum::<f64>() / period as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_basic() {
        let values = calculate_sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(values.len(), 5);
        assert!(values[0].is_none());
        assert!(values[1].is_none());
        assert!((values[2].unwrap() - 2.0).abs() < 1e-12);
        assert!((values[3].unwrap() - 3.0).abs() < 1e-12);
        assert!((values[4].unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn sma_period_one_is_price() {
        let values = calculate_sma(&[7.0, 8.0], 1);
        assert_eq!(values, vec![Some(7.0), Some(8.0)]);
    }

    #[test]
    fn sma_period_longer_than_input() {
        let values = calculate_sma(&[1.0, 2.0], 5);
        assert!(values.iter().all(Option::is_none));
    }

    #[test]
    fn sma_zero_period() {
        assert!(calculate_sma(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn sma_flat_series_is_exact() {
        let values = calculate_sma(&[10.0; 50], 20);
        assert!(values[19..].iter().all(|v| *v == Some(10.0)));
    }
}
