use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tradesage::{
    generate_synthetic_prices, load_file, BacktestEngine, BacktestParameters, BacktestResult,
    MovingAverage,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MaKind {
    Simple,
    Exponential,
}

impl From<MaKind> for MovingAverage {
    fn from(kind: MaKind) -> Self {
        match kind {
            MaKind::Simple => MovingAverage::Simple,
            MaKind::Exponential => MovingAverage::Exponential,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "tradesage")]
#[command(version = "0.1.0")]
#[command(about = "Moving average crossover backtester for daily close prices", long_about = None)]
struct Args {
    /// CSV/JSON file with Date and Close columns. If not provided, uses synthetic data.
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// JSON parameter file; command line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Short moving average window
    #[arg(long)]
    short_ma: Option<usize>,

    /// Long moving average window
    #[arg(long)]
    long_ma: Option<usize>,

    /// Starting portfolio value
    #[arg(short = 'c', long)]
    initial_capital: Option<f64>,

    /// Risk-free rate per period
    #[arg(long)]
    risk_free_rate: Option<f64>,

    /// Annualization factor
    #[arg(long)]
    periods_per_year: Option<u32>,

    /// Moving average type
    #[arg(long, value_enum)]
    ma_kind: Option<MaKind>,

    /// Number of days of synthetic data
    #[arg(short, long, default_value = "750")]
    days: usize,

    /// Initial price for synthetic data
    #[arg(long, default_value = "100.0")]
    initial_price: f64,

    /// Seed for synthetic data
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,

    /// Write the per-period series (price, signal, return, equity) to this CSV file
    #[arg(long)]
    equity_out: Option<PathBuf>,
}

impl Args {
    fn parameters(&self) -> Result<BacktestParameters> {
        let mut params = match &self.config {
            Some(path) => BacktestParameters::from_json_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => BacktestParameters::default(),
        };

        if let Some(short) = self.short_ma {
            params.short_window = short;
        }
        if let Some(long) = self.long_ma {
            params.long_window = long;
        }
        if let Some(capital) = self.initial_capital {
            params.initial_capital = capital;
        }
        if let Some(rate) = self.risk_free_rate {
            params.risk_free_rate = rate;
        }
        if let Some(periods) = self.periods_per_year {
            params.periods_per_year = periods;
        }
        if let Some(kind) = self.ma_kind {
            params.moving_average = kind.into();
        }

        Ok(params)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let params = args.parameters()?;
    let engine = BacktestEngine::new(params)?;

    let prices = if let Some(path) = &args.data_file {
        info!(path = %path.display(), "loading price data");
        load_file(path).with_context(|| format!("failed to load {}", path.display()))?
    } else {
        info!(
            days = args.days,
            initial_price = args.initial_price,
            seed = args.seed,
            "generating synthetic price data"
        );
        generate_synthetic_prices(args.days, args.initial_price, args.seed)?
    };

    info!(periods = prices.len(), "running backtest");
    let result = engine.run_crossover(&prices)?;

    match args.output {
        OutputFormat::Json => {
            let json = if args.pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{}", json);
        }
        OutputFormat::Text => print_text_report(&result),
    }

    if let Some(path) = &args.equity_out {
        write_series_csv(path, &result)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "per-period series saved");
    }

    Ok(())
}

fn print_text_report(result: &BacktestResult) {
    println!("Backtest Results: {}", result.strategy);
    println!(
        "  Period: {} to {} ({} periods)",
        result.start_date,
        result.end_date,
        result.returns.len()
    );
    for (name, value) in result.report.entries() {
        println!("  {}: {:.4}", name, value);
    }

    if let Some(open) = &result.open_position {
        println!(
            "  Open position since {} @ {:.2} (not counted as a trade)",
            open.entry_date.format("%Y-%m-%d"),
            open.entry_price
        );
    }
}

fn write_series_csv(path: &Path, result: &BacktestResult) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["date", "price", "signal", "return", "equity", "drawdown"])?;

    let rows = result
        .prices
        .points()
        .iter()
        .zip(&result.signals.signals)
        .zip(&result.returns)
        .zip(&result.equity_curve)
        .zip(&result.drawdown_curve);

    for ((((point, signal), ret), (_, equity)), (_, drawdown)) in rows {
        writer.write_record([
            point.timestamp.format("%Y-%m-%d").to_string(),
            point.close.to_string(),
            signal.value().to_string(),
            ret.to_string(),
            equity.to_string(),
            drawdown.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
