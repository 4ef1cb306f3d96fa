//! Daily price series: the read-only input shared by every simulation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::TrendgridError;

/// Minimum rows a (date-filtered) series must have before it can be simulated.
pub const MIN_PRICE_POINTS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Ordered, de-duplicated (date, price) pairs.
///
/// Dates are strictly increasing. The series is never mutated after
/// construction, so one instance can be shared by reference across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from points that are already in strictly increasing date order.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, TrendgridError> {
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(TrendgridError::InvalidSeries {
                    reason: format!(
                        "dates must be strictly increasing ({} follows {})",
                        pair[1].date, pair[0].date
                    ),
                });
            }
        }
        if let Some(bad) = points.iter().find(|p| !(p.price.is_finite() && p.price > 0.0)) {
            return Err(TrendgridError::InvalidSeries {
                reason: format!("price must be positive, got {} on {}", bad.price, bad.date),
            });
        }
        Ok(Self { points })
    }

    /// Sort by date and keep the first point seen for each date.
    pub fn from_unordered(mut points: Vec<PricePoint>) -> Result<Self, TrendgridError> {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self::new(points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Inclusive date-range view. Missing bounds leave that side open.
    pub fn window(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> &[PricePoint] {
        let lo = match start {
            Some(s) => self.points.partition_point(|p| p.date < s),
            None => 0,
        };
        let hi = match end {
            Some(e) => self.points.partition_point(|p| p.date <= e),
            None => self.points.len(),
        };
        if lo >= hi { &[] } else { &self.points[lo..hi] }
    }
}
