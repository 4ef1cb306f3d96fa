//! CSV price file adapter: one `<ASSET>.csv` per asset under a base directory.

use crate::domain::error::TrendgridError;
use crate::domain::price_series::{PricePoint, PriceSeries};
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, asset: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", asset))
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value.trim(), fmt).ok())
}

fn column_index(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

impl PriceDataPort for CsvPriceAdapter {
    fn fetch_series(&self, asset: &str) -> Result<PriceSeries, TrendgridError> {
        let path = self.csv_path(asset);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TrendgridError::NoData {
                    asset: asset.to_string(),
                });
            }
            Err(e) => {
                return Err(TrendgridError::DataSource {
                    reason: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| TrendgridError::DataSource {
                reason: format!("CSV header error in {}: {}", path.display(), e),
            })?
            .clone();
        let date_idx = column_index(&headers, &["date"]).ok_or_else(|| TrendgridError::DataSource {
            reason: format!("{} has no date column", path.display()),
        })?;
        let price_idx = column_index(&headers, &["close", "price"]).ok_or_else(|| TrendgridError::DataSource {
            reason: format!("{} has no close or price column", path.display()),
        })?;

        let mut points = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| TrendgridError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;

            let (Some(date_str), Some(price_str)) = (record.get(date_idx), record.get(price_idx)) else {
                continue;
            };
            // blank cells mark a missing quote
            if date_str.trim().is_empty() || price_str.trim().is_empty() {
                continue;
            }

            let date = parse_date(date_str).ok_or_else(|| TrendgridError::DataSource {
                reason: format!("row {}: invalid date '{}'", row + 1, date_str),
            })?;
            let price: f64 = price_str.trim().parse().map_err(|e| TrendgridError::DataSource {
                reason: format!("row {}: invalid price '{}': {}", row + 1, price_str, e),
            })?;

            points.push(PricePoint { date, price });
        }

        if points.is_empty() {
            return Err(TrendgridError::NoData {
                asset: asset.to_string(),
            });
        }

        debug!("loaded {} rows for {} from {}", points.len(), asset, path.display());
        PriceSeries::from_unordered(points)
    }

    fn list_assets(&self) -> Result<Vec<String>, TrendgridError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TrendgridError::DataSource {
            reason: format!("failed to read directory {}: {}", self.base_path.display(), e),
        })?;

        let mut assets = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TrendgridError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(asset) = name_str.strip_suffix(".csv") {
                assets.push(asset.to_string());
            }
        }

        assets.sort();
        Ok(assets)
    }
}
