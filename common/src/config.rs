use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BacktestError, Result};

/// Moving average flavour used by the crossover strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovingAverage {
    /// Trailing simple average, computed over the available periods during warm-up
    #[default]
    Simple,
    /// Exponential average seeded with the first price
    Exponential,
}

/// Backtest parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestParameters {
    // Strategy windows
    pub short_window: usize,
    pub long_window: usize,
    pub moving_average: MovingAverage,
    // Capital
    pub initial_capital: f64,
    // Ratio settings
    /// Risk-free rate per period, subtracted from each period return
    pub risk_free_rate: f64,
    pub periods_per_year: u32,
}

impl Default for BacktestParameters {
    fn default() -> Self {
        Self {
            short_window: 50,
            long_window: 200,
            moving_average: MovingAverage::Simple,
            initial_capital: 100_000.0,
            risk_free_rate: 0.0,
            periods_per_year: 252,
        }
    }
}

impl BacktestParameters {
    /// Load parameters from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            BacktestError::DataLoadError(format!("{}: {}", path.display(), e))
        })?;
        let params: Self = serde_json::from_reader(BufReader::new(file))?;
        Ok(params)
    }

    pub fn with_windows(mut self, short_window: usize, long_window: usize) -> Self {
        self.short_window = short_window;
        self.long_window = long_window;
        self
    }

    pub fn with_capital(mut self, capital: f64) -> Self {
        self.initial_capital = capital;
        self
    }

    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    pub fn with_periods_per_year(mut self, periods: u32) -> Self {
        self.periods_per_year = periods;
        self
    }

    pub fn with_moving_average(mut self, kind: MovingAverage) -> Self {
        self.moving_average = kind;
        self
    }

    /// Check every field; nothing is computed with an invalid configuration.
    pub fn validate(&self) -> Result<()> {
        validate_windows(self.short_window, self.long_window)?;
        validate_capital(self.initial_capital)?;

        if self.periods_per_year == 0 {
            return Err(BacktestError::InvalidParameter(
                "periods_per_year must be > 0".to_string(),
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(BacktestError::InvalidParameter(format!(
                "risk_free_rate must be finite, got {}",
                self.risk_free_rate
            )));
        }

        Ok(())
    }
}

/// Windows must both be positive with `short < long`.
pub fn validate_windows(short: usize, long: usize) -> Result<()> {
    if short == 0 || short >= long {
        return Err(BacktestError::InvalidWindows { short, long });
    }
    Ok(())
}

pub fn validate_capital(capital: f64) -> Result<()> {
    if !capital.is_finite() || capital <= 0.0 {
        return Err(BacktestError::InvalidCapital(capital));
    }
    Ok(())
}
