//! Domain error types.

/// Top-level error type for trendgrid.
#[derive(Debug, thiserror::Error)]
pub enum TrendgridError {
    #[error("invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("insufficient data: have {rows} rows after date filtering, need {minimum}")]
    InsufficientData { rows: usize, minimum: usize },

    #[error("invalid price series: {reason}")]
    InvalidSeries { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no price data for {asset}")]
    NoData { asset: String },

    #[error("strategy store error: {reason}")]
    Store { reason: String },

    #[error("strategy not found: {id}")]
    StrategyNotFound { id: String },

    #[error("worker pool error: {reason}")]
    WorkerPool { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<&TrendgridError> for std::process::ExitCode {
    fn from(err: &TrendgridError) -> Self {
        let code: u8 = match err {
            TrendgridError::Io(_) | TrendgridError::Json(_) | TrendgridError::WorkerPool { .. } => 1,
            TrendgridError::ConfigParse { .. }
            | TrendgridError::ConfigMissing { .. }
            | TrendgridError::ConfigInvalid { .. } => 2,
            TrendgridError::DataSource { .. }
            | TrendgridError::Store { .. }
            | TrendgridError::StrategyNotFound { .. } => 3,
            TrendgridError::InvalidParams { .. } | TrendgridError::InvalidSeries { .. } => 4,
            TrendgridError::NoData { .. } | TrendgridError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
