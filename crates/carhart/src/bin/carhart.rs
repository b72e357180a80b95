//! Four-factor regression CLI tool.
//!
//! Regresses each ticker's excess returns on the Fama-French 3 factors plus
//! momentum and writes the coefficient table as CSV.
//!
//! Usage: `cargo run --features cli --bin carhart -- --tickers AAPL,MSFT --start 2015-01-01 --end 2024-12-31`

use std::{path::PathBuf, process, time::Duration};

use carhart::{
    io::{CsvSink, FrenchFactorFiles, FrenchLibrarySource, YahooConfig, YahooPriceSource},
    model::{BatchConfig, BatchOutput, BatchRunner, DEFAULT_INTERCEPT_LABEL},
    primitives::{Date, ResamplePeriod},
    traits::FactorSource,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "carhart")]
#[command(about = "Fama-French-Carhart four-factor regressions", long_about = None)]
#[command(version)]
struct Cli {
    /// Ticker symbols, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    tickers: Vec<String>,

    /// First price date (YYYY-MM-DD)
    #[arg(long)]
    start: Date,

    /// Last price date (YYYY-MM-DD)
    #[arg(long)]
    end: Date,

    /// Extracted 3-factor research data CSV (downloaded when omitted)
    #[arg(long, requires = "momentum")]
    three_factor: Option<PathBuf>,

    /// Extracted momentum factor CSV (downloaded when omitted)
    #[arg(long, requires = "three_factor")]
    momentum: Option<PathBuf>,

    /// Coefficient table output path
    #[arg(long, default_value = "coefficients.csv")]
    output: PathBuf,

    /// Failure report output path
    #[arg(long)]
    failures: Option<PathBuf>,

    /// Return resampling period (weekly, monthly, quarterly, annual)
    #[arg(long, default_value_t = ResamplePeriod::Monthly)]
    period: ResamplePeriod,

    /// Process tickers in parallel
    #[arg(long)]
    parallel: bool,

    /// Label for the intercept row
    #[arg(long, default_value = DEFAULT_INTERCEPT_LABEL)]
    alpha_label: String,

    /// Extra attempts per failed price request
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// Milliseconds to wait between price requests
    #[arg(long, default_value_t = 500)]
    throttle_ms: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let tickers = cli.tickers.iter().map(|t| t.trim().to_uppercase());
    let config = BatchConfig::new(tickers, cli.start, cli.end)
        .with_period(cli.period)
        .with_parallel(cli.parallel)
        .with_intercept_label(cli.alpha_label);

    tracing::info!(
        tickers = config.entities.len(),
        start = %config.start,
        end = %config.end,
        "starting four-factor batch"
    );

    let prices = YahooPriceSource::with_config(YahooConfig {
        retries: cli.retries,
        throttle: Duration::from_millis(cli.throttle_ms),
        ..YahooConfig::default()
    })?;

    let mut sink = CsvSink::new(&cli.output);
    if let Some(path) = cli.failures {
        sink = sink.with_failures(path);
    }

    let output = match (cli.three_factor, cli.momentum) {
        (Some(three_factor), Some(momentum)) => {
            execute(FrenchFactorFiles::new(three_factor, momentum), prices, &config, &mut sink)?
        }
        _ => execute(FrenchLibrarySource::new()?, prices, &config, &mut sink)?,
    };
    print_summary(&output, &config);

    Ok(())
}

fn execute<F: FactorSource>(
    factors: F,
    prices: YahooPriceSource,
    config: &BatchConfig,
    sink: &mut CsvSink,
) -> Result<BatchOutput, Box<dyn std::error::Error>> {
    tracing::info!(source = factors.name(), "using factor source");
    let runner = BatchRunner::new(factors, prices);
    Ok(runner.run_into(config, sink)?)
}

fn print_summary(output: &BatchOutput, config: &BatchConfig) {
    println!(
        "\n{} of {} tickers regressed ({} period)",
        output.n_succeeded(),
        config.entities.len(),
        config.period
    );

    if !output.fits.is_empty() {
        println!("\n{:<10} {:>12} {:>10} {:>8}", "Ticker", config.intercept_label, "R²", "Obs");
        println!("{}", "-".repeat(43));
        for (entity, fit) in &output.fits {
            let alpha = fit.coefficients.values.first().map_or(f64::NAN, |(_, v)| *v);
            println!("{entity:<10} {alpha:>12.6} {:>10.4} {:>8}", fit.r_squared, fit.n_obs);
        }
    }

    for failure in &output.failures {
        println!("skipped {} [{}]: {}", failure.entity, failure.kind, failure.reason);
    }
}
