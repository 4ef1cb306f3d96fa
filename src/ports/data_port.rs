//! Price data access port trait.

use crate::domain::error::TrendgridError;
use crate::domain::price_series::PriceSeries;

pub trait PriceDataPort {
    /// Full history for `asset`, sorted and de-duplicated.
    fn fetch_series(&self, asset: &str) -> Result<PriceSeries, TrendgridError>;

    fn list_assets(&self) -> Result<Vec<String>, TrendgridError>;
}
