//! Operator CLI for the decision pipeline.
//!
//! Subcommands:
//!   - `decide`       — Run one event + snapshot through the full pipeline
//!   - `identity`     — Validate an event and print its computed identity
//!   - `recent`       — List recently admitted events from the ledger
//!   - `check-config` — Validate a configuration overlay and exit

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lens_core::{decide, DecisionRecord, PipelineConfig, SignalEvent};
use lens_ledger::{Ledger, LedgerError};

#[derive(Parser)]
#[command(
    name = "lens",
    version,
    about = "Deterministic trade-decision pipeline",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Admit an event and run the decision pipeline over a snapshot
    Decide(DecideArgs),
    /// Validate an event and print its identity and canonical symbol
    Identity(IdentityArgs),
    /// List recently admitted events
    Recent(RecentArgs),
    /// Validate a configuration overlay
    CheckConfig(CheckConfigArgs),
}

#[derive(Parser)]
struct DecideArgs {
    /// Path to the signal event JSON
    #[arg(long)]
    event: PathBuf,

    /// Path to the market snapshot JSON
    #[arg(long)]
    snapshot: PathBuf,

    /// Optional YAML config overlay (defaults apply otherwise)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Admission ledger database
    #[arg(long, default_value = "lens_events.db")]
    ledger: PathBuf,

    /// Use a volatile in-memory ledger (dry run)
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Parser)]
struct IdentityArgs {
    /// Path to the signal event JSON
    #[arg(long)]
    event: PathBuf,
}

#[derive(Parser)]
struct RecentArgs {
    /// Admission ledger database
    #[arg(long, default_value = "lens_events.db")]
    ledger: PathBuf,

    /// Filter by canonical symbol (e.g. "BTC/USDT")
    #[arg(long)]
    symbol: Option<String>,

    #[arg(long, default_value_t = 50)]
    limit: u32,
}

#[derive(Parser)]
struct CheckConfigArgs {
    #[arg(long)]
    config: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("[error] {msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Decide(args) => cmd_decide(args),
        Commands::Identity(args) => cmd_identity(args),
        Commands::Recent(args) => cmd_recent(args),
        Commands::CheckConfig(args) => cmd_check_config(args),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig, String> {
    match path {
        // ConfigurationError is fatal: no pipeline without a valid config.
        Some(p) => PipelineConfig::load(p).map_err(|e| e.to_string()),
        None => {
            let cfg = PipelineConfig::default();
            cfg.validate().map_err(|e| e.to_string())?;
            Ok(cfg)
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf, what: &str) -> Result<T, String> {
    let raw =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read {what} {path:?}: {e}"))?;
    serde_json::from_str(&raw).map_err(|e| format!("invalid {what} JSON in {path:?}: {e}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{out}");
    Ok(())
}

fn cmd_decide(args: DecideArgs) -> Result<(), String> {
    let cfg = load_config(args.config.as_ref())?;
    let event: SignalEvent = read_json(&args.event, "event")?;
    let snapshot: lens_core::MarketSnapshot = read_json(&args.snapshot, "snapshot")?;

    let ledger = if args.dry_run {
        Ledger::open_in_memory()
    } else {
        Ledger::open(&args.ledger)
    }
    .map_err(|e| e.to_string())?;

    match ledger.admit(&event) {
        Ok(admitted) => {
            let record = decide(&admitted.event_id, &event, &snapshot, &cfg);
            print_json(&record)
        }
        Err(LedgerError::Validation(detail)) => {
            // A rejected event still yields an auditable NO_TRADE record.
            let record = DecisionRecord::validation_rejected(
                "",
                event.symbol.as_str(),
                event.bar_time,
                snapshot.taken_at_ms,
                detail,
            );
            print_json(&record)
        }
        Err(LedgerError::Duplicate(event_id)) => print_json(&serde_json::json!({
            "status": "ignored_duplicate",
            "event_id": event_id,
        })),
        Err(e @ LedgerError::Storage(_)) => Err(e.to_string()),
    }
}

fn cmd_identity(args: IdentityArgs) -> Result<(), String> {
    let event: SignalEvent = read_json(&args.event, "event")?;

    let symbol = lens_ledger::symbols::normalize(&event.symbol).map_err(|e| e.to_string())?;
    lens_ledger::identity::validate_bar_time(event.bar_time).map_err(|e| e.to_string())?;
    let event_id = lens_ledger::identity::event_identity(&symbol.display(), &event);

    print_json(&serde_json::json!({
        "event_id": event_id,
        "symbol": symbol.display(),
        "event_type": event.event_type,
        "bar_time": event.bar_time,
    }))
}

fn cmd_recent(args: RecentArgs) -> Result<(), String> {
    let ledger = Ledger::open(&args.ledger).map_err(|e| e.to_string())?;
    let rows = ledger
        .store()
        .recent_events(args.symbol.as_deref(), args.limit)
        .map_err(|e| e.to_string())?;

    let out: Vec<serde_json::Value> = rows
        .iter()
        .map(|r| {
            serde_json::json!({
                "event_id": r.event_id,
                "bar_time": r.bar_time,
                "symbol": r.symbol,
                "event_type": r.event_type,
            })
        })
        .collect();
    print_json(&out)
}

fn cmd_check_config(args: CheckConfigArgs) -> Result<(), String> {
    let cfg = PipelineConfig::load(&args.config).map_err(|e| e.to_string())?;
    tracing::info!("config OK");
    print_json(&serde_json::json!({
        "status": "ok",
        "capital": cfg.risk.capital,
        "risk_fraction": cfg.risk.risk_fraction,
    }))
}
