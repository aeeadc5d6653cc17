//! Grid Trader - Main Entry Point
//!
//! Runs the configured analyzers against a JSON-lines market feed on stdin,
//! or replays a recorded event file through each analyzer.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use grid_trader::backtest::{parse_events, Backtester};
use grid_trader::common::channels::{create_event_channel_with_size, ChannelEventSink};
use grid_trader::common::feed::JsonLinesFeed;
use grid_trader::config::{load_config, AppConfig};
use grid_trader::{AnalyzerCore, AnalyzerService, EngineEvent, SimulatedOrderSink};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "GRID_CONFIG")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Replay this event file (JSON array or JSON lines) instead of reading stdin
    #[arg(long)]
    backtest: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting grid trader");
    info!("Configuration file: {}", args.config);

    let config = load_config(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config))?;

    match args.backtest {
        Some(path) => run_backtest(&config, &path).await,
        None => run_live(&config).await,
    }
}

async fn run_backtest(config: &AppConfig, path: &str) -> Result<()> {
    let input = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path))?;
    let events = parse_events(&input)?;
    info!(events = events.len(), "Replay file loaded");

    for analyzer in config.active_analyzers() {
        let mut backtester = Backtester::from_config(analyzer, config)?;
        let report = backtester.run(events.iter().cloned());
        info!(
            analyzer = %report.analyzer_id,
            start = %report.start_money,
            end = %report.final_money,
            profit = %report.profit(),
            lifecycles = report.lifecycles,
            win_rate = %report.win_rate().round_dp(2),
            tp_exits = report.tp_exits,
            sl_exits = report.sl_exits,
            max_drawdown = %report.max_drawdown_percent.round_dp(2),
            "Backtest report"
        );
    }
    Ok(())
}

async fn run_live(config: &AppConfig) -> Result<()> {
    let (event_tx, mut event_rx) = create_event_channel_with_size(config.settings.channel_size);
    let events = Arc::new(ChannelEventSink::new(event_tx));
    let orders = Arc::new(
        SimulatedOrderSink::new().with_min_quantity(config.settings.min_order_quantity),
    );

    let core = AnalyzerCore::from_config(config, events, orders)?;
    if core.is_empty() {
        warn!("No active analyzers configured");
    }
    let service = AnalyzerService::from_core(core, config.settings.channel_size);

    // Engine events are only logged here; persistence lives elsewhere
    let logger = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match &event {
                EngineEvent::MoneyChanged { analyzer_id, old, new } => {
                    info!(analyzer = %analyzer_id, %old, %new, "Money changed");
                }
                EngineEvent::MoneyWithProfitChanged { analyzer_id, old, new } => {
                    info!(analyzer = %analyzer_id, %old, %new, "Money with profit changed");
                }
                EngineEvent::PositionChanged { analyzer_id, old, new } => {
                    info!(analyzer = %analyzer_id, ?old, ?new, "Position changed");
                }
            }
        }
    });

    let mut feed = JsonLinesFeed::new(BufReader::new(tokio::io::stdin()));
    info!("Reading market events from stdin");

    tokio::select! {
        result = service.run(&mut feed) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, cleaning up...");
        }
    }

    for metrics in service.shutdown().await? {
        info!(
            analyzer = %metrics.analyzer_id,
            money = %metrics.money,
            open_positions = metrics.open_positions,
            unrealized = %metrics.unrealized_profit,
            "Final state"
        );
    }

    // Runners are gone, so the event channel closes and the logger drains
    logger.await?;
    Ok(())
}
