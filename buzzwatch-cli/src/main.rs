//! BuzzWatch CLI: one-shot scans, stock lookups, and the watch loop.
//!
//! Commands:
//! - `scan`: fetch once and print price breaches, volume spikes, buzzing stocks
//! - `series <STOCK>`: fetch once and print one stock's price history
//! - `watch`: run the refresh scheduler and print signals after every cycle
//! - `alert`: fetch once and deliver the signal summary to recipients
//! - `config`: print the effective configuration as TOML

use anyhow::{bail, Context, Result};
use buzzwatch_core::{DatasetStore, PriceSeries, SignalReport, StockQuery};
use buzzwatch_runner::{
    alert_now, notifier_for, CycleEvent, CycleReport, RefreshScheduler, WatchConfig,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "buzzwatch",
    about = "BuzzWatch CLI: flags stocks with unusual price drops or volume spikes"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Price dataset location (URL or path). Overrides the config file.
    #[arg(long, global = true)]
    url: Option<String>,

    /// Per-day volume dataset location (URL or path).
    #[arg(long, global = true)]
    volume_url: Option<String>,

    /// Refresh interval in seconds.
    #[arg(long, global = true)]
    interval: Option<u64>,

    /// Print results as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch once and print the three signal sets.
    Scan,
    /// Fetch once and print one stock's price series.
    Series {
        /// Stock identifier, exactly as it appears in the dataset.
        stock: String,
    },
    /// Keep refreshing on the configured interval and print signals each cycle.
    Watch {
        /// Stop after this many cycles. Runs until interrupted when omitted.
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Fetch once and send the signal summary.
    Alert {
        /// Recipient address. Repeatable. Defaults to `alert.recipients`.
        #[arg(long = "to")]
        to: Vec<String>,
    },
    /// Print the effective configuration.
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    if !matches!(cli.command, Commands::Config) && !config.volume_spikes_enabled() {
        warn!("no source.volume_url configured, volume spikes are disabled");
    }

    match cli.command {
        Commands::Scan => run_scan(&config, cli.json),
        Commands::Series { stock } => run_series(&config, &stock, cli.json),
        Commands::Watch { cycles } => run_watch(&config, cycles, cli.json),
        Commands::Alert { to } => run_alert(&config, to),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// Merge the config file (if any) with command-line overrides.
fn resolve_config(cli: &Cli) -> Result<WatchConfig> {
    let mut config = match (&cli.config, &cli.url) {
        (Some(path), _) => WatchConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        (None, Some(url)) => WatchConfig::for_url(url.clone()),
        (None, None) => bail!("one of --config or --url is required"),
    };

    if let Some(url) = &cli.url {
        config.source.url = url.clone();
    }
    if let Some(volume_url) = &cli.volume_url {
        config.source.volume_url = Some(volume_url.clone());
    }
    if let Some(interval) = cli.interval {
        config.refresh.interval_secs = interval;
    }
    config.validate()?;
    Ok(config)
}

/// Run a single refresh cycle and return a query handle over its snapshot.
fn refresh_once(config: &WatchConfig) -> Result<(StockQuery, CycleReport)> {
    let store = Arc::new(DatasetStore::new());
    let mut scheduler =
        RefreshScheduler::new(config.build_loader()?, Arc::clone(&store), config.interval());
    let report = scheduler
        .run_cycle()
        .with_context(|| format!("refreshing from {}", config.source.url))?;
    Ok((StockQuery::new(store, config.signals), report))
}

fn run_scan(config: &WatchConfig, json: bool) -> Result<()> {
    let (query, _) = refresh_once(config)?;
    print_report(&query.signal_report(), json)
}

fn run_series(config: &WatchConfig, stock: &str, json: bool) -> Result<()> {
    let (query, _) = refresh_once(config)?;
    let series = query.price_series(stock)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
    } else {
        print_series(&series);
    }
    Ok(())
}

fn run_watch(config: &WatchConfig, cycles: Option<u64>, json: bool) -> Result<()> {
    if cycles == Some(0) {
        bail!("--cycles must be at least 1");
    }

    let store = Arc::new(DatasetStore::new());
    let query = StockQuery::new(Arc::clone(&store), config.signals);
    let (tx, rx) = mpsc::channel();
    let handle = RefreshScheduler::new(config.build_loader()?, store, config.interval())
        .with_events(tx)
        .spawn()
        .context("starting refresh scheduler")?;

    info!(
        url = %config.source.url,
        interval_secs = config.refresh.interval_secs,
        "watching"
    );

    let mut seen = 0u64;
    while let Ok(event) = rx.recv() {
        match event {
            CycleEvent::Published(report) => {
                if !json {
                    println!(
                        "cycle {}: {} stocks{}",
                        report.cycle,
                        report.stocks,
                        if report.changed { "" } else { " (unchanged)" }
                    );
                }
                print_report(&query.signal_report(), json)?;
            }
            CycleEvent::Failed { cycle, error } => {
                eprintln!("cycle {cycle} failed, serving previous data: {error}");
            }
        }

        seen += 1;
        if cycles.is_some_and(|limit| seen >= limit) {
            break;
        }
    }

    if handle.stop().is_err() {
        bail!("refresh thread panicked");
    }
    Ok(())
}

fn run_alert(config: &WatchConfig, to: Vec<String>) -> Result<()> {
    let recipients = if to.is_empty() {
        config.alert.recipients.clone()
    } else {
        to
    };

    let (query, _) = refresh_once(config)?;
    let notifier = notifier_for(config);
    println!("{}", alert_now(&query, notifier.as_ref(), &recipients));
    Ok(())
}

fn print_report(report: &SignalReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    let join = |set: &buzzwatch_core::StockSet| {
        if set.is_empty() {
            "(none)".to_string()
        } else {
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };

    println!("Price drops:   {}", join(&report.price_breaches));
    println!("Volume spikes: {}", join(&report.volume_spikes));
    println!("Buzzing:       {}", join(&report.buzzing));
    Ok(())
}

fn print_series(series: &PriceSeries) {
    println!("{} (cycle {})", series.stock, series.cycle);
    println!("  mean: {:.4}  std: {:.4}", series.mean, series.std);
    for point in &series.points {
        println!("  {:<12} {:>12.4}", point.date, point.value);
    }
}
