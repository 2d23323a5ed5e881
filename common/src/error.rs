use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Invalid moving average windows: short ({short}) must be positive and less than long ({long})")]
    InvalidWindows { short: usize, long: usize },

    #[error("Invalid initial capital: {0} (must be > 0)")]
    InvalidCapital(f64),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Price series is empty")]
    EmptySeries,

    #[error("Invalid price {price} at period {index}")]
    InvalidPrice { index: usize, price: f64 },

    #[error("Timestamp at period {index} is not strictly after the previous one")]
    NonIncreasingTimestamp { index: usize },

    #[error("Series length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Data loading error: {0}")]
    DataLoadError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    CsvError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl BacktestError {
    /// Invalid strategy or run configuration, raised before any data is processed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidWindows { .. } | Self::InvalidCapital(_) | Self::InvalidParameter(_)
        )
    }

    /// Price data that cannot be used as a base for return computation.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            Self::EmptySeries
                | Self::InvalidPrice { .. }
                | Self::NonIncreasingTimestamp { .. }
                | Self::LengthMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BacktestError>;
