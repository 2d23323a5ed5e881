use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{BacktestError, PricePoint, PriceSeries, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate a seeded random-walk daily close series for demos and tests
///
/// The same seed always yields the same series. Dates start on 2020-01-01
/// and advance one calendar day per period.
pub fn generate_synthetic_prices(days: usize, initial_price: f64, seed: u64) -> Result<PriceSeries> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(days);

    let mut price = initial_price;
    let start_date = series_start()?;

    let daily_volatility = 0.015;
    let drift = 0.0003;

    for i in 0..days {
        points.push(PricePoint {
            timestamp: start_date + Duration::days(i as i64),
            close: price,
        });

        let random_return: f64 = rng.gen_range(-1.0..1.0);
        let daily_return = drift + daily_volatility * random_return;
        price *= 1.0 + daily_return;
    }

    PriceSeries::new(points)
}

/// Generate a series that trends up, then down, then up again
///
/// Useful for exercising a full crossover cycle deterministically.
pub fn generate_trend_cycle(days_per_leg: usize, initial_price: f64, step_pct: f64) -> Result<PriceSeries> {
    let start_date = series_start()?;
    let mut price = initial_price;
    let mut points = Vec::with_capacity(days_per_leg * 3);

    for i in 0..days_per_leg * 3 {
        points.push(PricePoint {
            timestamp: start_date + Duration::days(i as i64),
            close: price,
        });
        let direction = if (days_per_leg..days_per_leg * 2).contains(&i) {
            -1.0
        } else {
            1.0
        };
        price *= 1.0 + direction * step_pct;
    }

    PriceSeries::new(points)
}

fn series_start() -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| BacktestError::InvalidParameter("invalid synthetic start date".to_string()))
}
