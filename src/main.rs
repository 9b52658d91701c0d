use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use drift_monitor::config::{Config, ConfigOverrides};
use drift_monitor::output::csv::{events_to_csv, snapshots_to_csv};
use drift_monitor::output::json::{render_json, render_json_lines};
use drift_monitor::output::table::{
    render_events_table, render_run_table, render_snapshots_table,
};
use drift_monitor::snapshot::store::SnapshotStore;
use drift_monitor::snapshot::SnapshotRepository;
use drift_monitor::{DriftMonitor, MetricName, RunOutcome, StatisticSnapshot};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Jsonl,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "drift-monitor",
    about = "Distribution drift detection for numeric data columns"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[arg(long = "source-db")]
    source_db: Option<String>,
    #[arg(long = "store-db")]
    store_db: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Capture statistics, compare against the baseline and report drift.
    Run,
    /// Show the baseline a run would compare against right now.
    Baseline,
    History {
        #[arg(long)]
        table: String,
        #[arg(long)]
        column: String,
        #[arg(long)]
        metric: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        source_db: cli.source_db.clone(),
        store_db: cli.store_db.clone(),
    });

    match cli.command.as_ref().unwrap_or(&Commands::Run) {
        Commands::Run => {
            let monitor = DriftMonitor::from_config(&config)?;
            let outcome = monitor.run_at(Utc::now()).await?;
            print_outcome(&outcome, cli.output)?;
        }
        Commands::Baseline => {
            config.validate()?;
            let store = SnapshotStore::open(&config.resolved_store_path())?;
            let snapshots = store
                .baseline(Utc::now(), config.baseline_window())
                .map(|baseline| baseline.snapshots().cloned().collect::<Vec<_>>())
                .unwrap_or_default();
            if snapshots.is_empty() {
                info!("no baseline available yet");
            }
            print_snapshots(&snapshots, cli.output)?;
        }
        Commands::History {
            table,
            column,
            metric,
            limit,
        } => {
            let metric = metric.as_deref().map(MetricName::from_str).transpose()?;
            let store = SnapshotStore::open(&config.resolved_store_path())?;
            let history = store.history(table, column, metric, *limit)?;
            print_snapshots(&history, cli.output)?;
        }
        Commands::Config { init, show } => {
            if *init {
                Config::write_template(&config_path)?;
                println!("Wrote config template to {}", config_path.display());
            }
            if *show || !*init {
                println!("{}", render_json(&config)?);
            }
        }
    }

    Ok(())
}

fn print_outcome(outcome: &RunOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_run_table(&outcome.result));
            if !outcome.summary.events.is_empty() {
                println!("{}", render_events_table(&outcome.summary.events));
            }
            for line in outcome.report.lines() {
                println!("{line}");
            }
        }
        OutputFormat::Json => println!("{}", render_json(&outcome.result)?),
        OutputFormat::Jsonl => print!("{}", render_json_lines(&outcome.summary.events)?),
        OutputFormat::Csv => print!("{}", events_to_csv(&outcome.summary.events)?),
    }
    Ok(())
}

fn print_snapshots(snapshots: &[StatisticSnapshot], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_snapshots_table(snapshots)),
        OutputFormat::Json => println!("{}", render_json(snapshots)?),
        OutputFormat::Jsonl => print!("{}", render_json_lines(snapshots)?),
        OutputFormat::Csv => print!("{}", snapshots_to_csv(snapshots)?),
    }
    Ok(())
}
