//! Core domain types and logic.

pub mod price_series;
pub mod params;
pub mod indicator;
pub mod signal;
pub mod position;
pub mod execution;
pub mod portfolio;
pub mod simulator;
pub mod metrics;
pub mod backtest;
pub mod optimizer;
pub mod strategy;
pub mod config_validation;
pub mod error;
