#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use trendgrid::domain::error::TrendgridError;
use trendgrid::domain::params::SimulationParams;
pub use trendgrid::domain::price_series::{PricePoint, PriceSeries};
use trendgrid::ports::data_port::PriceDataPort;

pub struct MockPriceDataPort {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
}

impl MockPriceDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, asset: &str, series: PriceSeries) -> Self {
        self.data.insert(asset.to_string(), series);
        self
    }

    pub fn with_error(mut self, asset: &str, reason: &str) -> Self {
        self.errors.insert(asset.to_string(), reason.to_string());
        self
    }
}

impl PriceDataPort for MockPriceDataPort {
    fn fetch_series(&self, asset: &str) -> Result<PriceSeries, TrendgridError> {
        if let Some(reason) = self.errors.get(asset) {
            return Err(TrendgridError::DataSource {
                reason: reason.clone(),
            });
        }
        self.data.get(asset).cloned().ok_or_else(|| TrendgridError::NoData {
            asset: asset.to_string(),
        })
    }

    fn list_assets(&self) -> Result<Vec<String>, TrendgridError> {
        let mut assets: Vec<String> = self.data.keys().cloned().collect();
        assets.sort();
        Ok(assets)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One point per calendar day starting at `start`.
pub fn make_series(start: NaiveDate, prices: &[f64]) -> PriceSeries {
    let points = prices
        .iter()
        .enumerate()
        .map(|(i, &price)| PricePoint {
            date: start + Duration::days(i as i64),
            price,
        })
        .collect();
    PriceSeries::new(points).unwrap()
}

pub fn flat_series(days: usize, price: f64) -> PriceSeries {
    make_series(date(2023, 1, 2), &vec![price; days])
}

/// Geometric decline by `daily_drop` per day.
pub fn declining_series(days: usize, start_price: f64, daily_drop: f64) -> PriceSeries {
    let prices: Vec<f64> = (0..days)
        .map(|i| start_price * (1.0 - daily_drop).powi(i as i32))
        .collect();
    make_series(date(2023, 1, 2), &prices)
}

/// Trending sine wave: enough crossovers to exercise every transition.
pub fn wave_series(days: usize) -> PriceSeries {
    let prices: Vec<f64> = (0..days)
        .map(|i| {
            let t = i as f64;
            100.0 + (t / 9.0).sin() * 12.0 + (t / 31.0).cos() * 6.0 + t * 0.03
        })
        .collect();
    make_series(date(2021, 11, 15), &prices)
}

pub fn frictionless() -> SimulationParams {
    SimulationParams {
        leverage: 1.0,
        fee_rate: 0.0,
        slippage: 0.0,
        enable_rebalance: false,
        ..SimulationParams::default()
    }
}
