//! Horizon forecast CLI
//!
//! Trains a forecasting model on a CSV of price bars and prints JSON reports.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use horizon_forecast::{
    config::{Backend, ForecastConfig},
    data::{load_csv, BarSeries, LoadOptions},
    ml::{ForecastService, Metrics, PredictionResult},
    strategy::{MomentumStrategy, SignalRow, SignalSummary},
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "horizon-forecast")]
#[command(about = "Multi-horizon price forecasting from OHLCV bars")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "forecast.toml")]
    config: String,

    /// Date format for the timestamp column (chrono syntax)
    #[arg(long, global = true)]
    date_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Train, evaluate and forecast in one report
    Forecast {
        /// CSV file with bars
        data: String,
        /// Symbol shown in the report
        #[arg(short, long, default_value = "UNKNOWN")]
        symbol: String,
        /// Separate CSV to evaluate on (defaults to the training data)
        #[arg(long)]
        eval_data: Option<String>,
        /// Override the configured backend (forest | sequence)
        #[arg(long)]
        backend: Option<String>,
    },
    /// Train only and print the training metrics
    Train {
        /// CSV file with bars
        data: String,
    },
    /// Moving-average crossover signals
    Signals {
        /// CSV file with bars
        data: String,
        /// Print every row, not just the summary
        #[arg(long)]
        rows: bool,
    },
}

#[derive(Serialize)]
struct ForecastReport {
    symbol: String,
    current_price: Option<f64>,
    predictions: PredictionResult,
    performance: Metrics,
    training: Metrics,
    status: &'static str,
}

#[derive(Serialize)]
struct SignalReport {
    summary: Option<SignalSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<Vec<SignalRow>>,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = ForecastConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    let options = LoadOptions {
        date_format: cli.date_format.clone(),
        ..Default::default()
    };

    match cli.command {
        Commands::Forecast {
            data,
            symbol,
            eval_data,
            backend,
        } => forecast(config, &options, &data, symbol, eval_data.as_deref(), backend.as_deref()),
        Commands::Train { data } => train(config, &options, &data),
        Commands::Signals { data, rows } => signals(config, &options, &data, rows),
    }
}

fn load(path: &str, options: &LoadOptions) -> anyhow::Result<BarSeries> {
    let series = load_csv(path, options).with_context(|| format!("Failed to load bars from {}", path))?;
    tracing::info!("Loaded {} bars from {}", series.len(), path);
    Ok(series)
}

fn parse_backend(name: &str) -> anyhow::Result<Backend> {
    match name.to_lowercase().as_str() {
        "forest" => Ok(Backend::Forest),
        "sequence" => Ok(Backend::Sequence),
        other => bail!("Unknown backend '{}', expected forest or sequence", other),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn forecast(
    mut config: ForecastConfig,
    options: &LoadOptions,
    data: &str,
    symbol: String,
    eval_data: Option<&str>,
    backend: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(name) = backend {
        config.model.backend = parse_backend(name)?;
    }

    let series = load(data, options)?;
    let eval_series = eval_data.map(|path| load(path, options)).transpose()?;

    let service = ForecastService::new(config);
    let training = service.train(&series).context("Training failed")?;
    let performance = service
        .evaluate(eval_series.as_ref().unwrap_or(&series))
        .context("Evaluation failed")?;
    let predictions = service.predict(&series)?;

    let status = if predictions.is_degraded() { "degraded" } else { "success" };
    if let Some(error) = predictions.error() {
        tracing::warn!("Forecast for {} degraded: {}", symbol, error);
    }

    print_json(&ForecastReport {
        symbol,
        current_price: series.last_valid_price(),
        predictions,
        performance,
        training,
        status,
    })
}

fn train(config: ForecastConfig, options: &LoadOptions, data: &str) -> anyhow::Result<()> {
    let series = load(data, options)?;
    let service = ForecastService::new(config);
    let metrics = service.train(&series).context("Training failed")?;
    print_json(&metrics)
}

fn signals(config: ForecastConfig, options: &LoadOptions, data: &str, rows: bool) -> anyhow::Result<()> {
    let series = load(data, options)?;
    let table = MomentumStrategy::new(config.strategy).generate(&series)?;
    print_json(&SignalReport {
        summary: MomentumStrategy::summarize(&table),
        rows: rows.then_some(table),
    })
}
