use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use core_types::{CoreError, LegPrices, TradeContext, TradeEntry, TradeExit, TradeId};
use database::{connect, run_migrations, SqliteTradeStore, TradeFilter, TradeStore};
use rust_decimal::Decimal;
use std::fs::File;
use std::path::PathBuf;

mod display;
mod journal;
mod telemetry;
mod transfer;

use journal::Journal;

/// The main entry point for the trade journal.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file, if there is one
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = configuration::load_config(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let _log_guard = telemetry::init(&config.logging)?;

    // Initialize the database connection and run migrations
    let pool = connect(&config.database)
        .await
        .context("Failed to connect to the journal database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let journal = Journal::new(SqliteTradeStore::new(pool));

    // Execute the appropriate command
    let outcome = match cli.command {
        Commands::Open(args) => handle_open(&journal, args).await,
        Commands::Close(args) => handle_close(&journal, args).await,
        Commands::List(args) => handle_list(&journal, args).await,
        Commands::Report(args) => handle_report(&journal, args).await,
        Commands::Import { path } => handle_import(&journal, path).await,
        Commands::Export { path } => handle_export(&journal, path).await,
    };

    if let Err(e) = &outcome {
        tracing::error!(error = ?e, "Command failed.");
    }
    outcome
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A personal journal for credit options trades.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new trade entry.
    Open(OpenArgs),
    /// Close an open trade and compute its metrics.
    Close(CloseArgs),
    /// List trades.
    List(ListArgs),
    /// Portfolio statistics over all closed trades.
    Report(ReportArgs),
    /// Import trades from a journal CSV file.
    Import { path: PathBuf },
    /// Export every trade to a journal CSV file.
    Export { path: PathBuf },
}

/// Leg prices, shared by entry and exit.
#[derive(Args, Default)]
struct LegArgs {
    #[arg(long)]
    short_leg: Option<Decimal>,
    #[arg(long)]
    long_leg: Option<Decimal>,
    #[arg(long)]
    short_call: Option<Decimal>,
    #[arg(long)]
    long_call: Option<Decimal>,
    #[arg(long)]
    short_put: Option<Decimal>,
    #[arg(long)]
    long_put: Option<Decimal>,
}

impl From<LegArgs> for LegPrices {
    fn from(args: LegArgs) -> Self {
        Self {
            short_leg: args.short_leg,
            long_leg: args.long_leg,
            short_call: args.short_call,
            long_call: args.long_call,
            short_put: args.short_put,
            long_put: args.long_put,
        }
    }
}

#[derive(Args)]
struct OpenArgs {
    /// Entry date (format: YYYY-MM-DD).
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    symbol: String,
    /// e.g. "Credit Spread", "Iron Condor".
    #[arg(long)]
    strategy: String,
    #[arg(long)]
    direction: Option<String>,
    #[arg(long)]
    lots: Decimal,
    /// Net spread price received at entry.
    #[arg(long)]
    price: Decimal,
    #[arg(long)]
    credit: Decimal,
    /// Risk capital committed.
    #[arg(long)]
    max_loss: Decimal,
    #[arg(long)]
    margin: Decimal,
    /// Strike width of the spread.
    #[arg(long)]
    width: Option<Decimal>,
    /// Days to expiration at entry.
    #[arg(long)]
    dte: Option<i64>,
    #[arg(long)]
    sell_strike_delta: Option<Decimal>,
    #[command(flatten)]
    legs: LegArgs,
    #[arg(long)]
    iv: Option<Decimal>,
    #[arg(long)]
    iv_percentile: Option<Decimal>,
    #[arg(long)]
    iv_hv: Option<Decimal>,
    #[arg(long)]
    vix: Option<Decimal>,
    /// Planned profit-taking exit, in percent of max profit.
    #[arg(long)]
    planned_exit: Option<Decimal>,
    /// Conviction from 1 to 5.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    confidence: Option<u8>,
    #[arg(long)]
    notes: Option<String>,
}

impl OpenArgs {
    fn into_entry(self) -> Result<TradeEntry, CoreError> {
        for (field, value) in [("Symbol", &self.symbol), ("Strategy", &self.strategy)] {
            if value.trim().is_empty() {
                return Err(CoreError::InvalidInput(
                    field.to_string(),
                    "required field is missing".to_string(),
                ));
            }
        }
        Ok(TradeEntry {
            entry_date: self.date,
            lots: self.lots,
            spread_entry_price: self.price,
            credit_received: self.credit,
            max_loss: self.max_loss,
            margin_used: self.margin,
            context: TradeContext {
                symbol: self.symbol,
                strategy: self.strategy,
                direction: self.direction,
                width: self.width,
                dte_entry: self.dte,
                sell_strike_delta: self.sell_strike_delta,
                legs: self.legs.into(),
                iv_entry: self.iv,
                iv_percentile_entry: self.iv_percentile,
                iv_hv_pct: self.iv_hv,
                vix_entry: self.vix,
                planned_exit_pct: self.planned_exit,
                entry_confidence: self.confidence,
                notes: self.notes,
            },
        })
    }
}

#[derive(Args)]
struct CloseArgs {
    /// Id of the open trade.
    id: TradeId,
    /// Exit date (format: YYYY-MM-DD).
    #[arg(long)]
    date: NaiveDate,
    /// Net spread price paid to close.
    #[arg(long)]
    price: Decimal,
    #[command(flatten)]
    legs: LegArgs,
    /// Describe any adjustment made during the trade.
    #[arg(long)]
    adjustment: Option<String>,
    #[arg(long)]
    emotion: Option<String>,
    /// Name the trading rule that was broken, if any.
    #[arg(long)]
    rule_broken: Option<String>,
}

impl From<CloseArgs> for TradeExit {
    fn from(args: CloseArgs) -> Self {
        Self {
            exit_date: args.date,
            spread_exit_price: args.price,
            legs: args.legs.into(),
            adjustment_made: args.adjustment,
            exit_emotion: args.emotion,
            rule_broken: args.rule_broken,
        }
    }
}

#[derive(Args)]
struct ListArgs {
    /// open, closed or all.
    #[arg(long, default_value = "all")]
    status: TradeFilter,
}

#[derive(Args)]
struct ReportArgs {
    /// Also print the equity curve.
    #[arg(long)]
    curve: bool,
    /// Print the report as JSON instead of tables.
    #[arg(long, conflicts_with = "curve")]
    json: bool,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_open<S: TradeStore>(journal: &Journal<S>, args: OpenArgs) -> Result<()> {
    let entry = args.into_entry()?;
    let id = journal.open_trade(&entry).await?;
    println!("Trade saved with ID {id}");
    Ok(())
}

async fn handle_close<S: TradeStore>(journal: &Journal<S>, args: CloseArgs) -> Result<()> {
    let id = args.id;
    let record = journal.close_trade(id, args.into()).await?;
    println!("Trade {id} closed.");
    if let Some(metrics) = &record.metrics {
        println!("{}", display::metrics_table(metrics));
    }
    Ok(())
}

async fn handle_list<S: TradeStore>(journal: &Journal<S>, args: ListArgs) -> Result<()> {
    let records = journal.trades(args.status).await?;
    if records.is_empty() {
        println!("No trades.");
    } else {
        println!("{}", display::trades_table(&records));
    }
    Ok(())
}

async fn handle_report<S: TradeStore>(journal: &Journal<S>, args: ReportArgs) -> Result<()> {
    let report = journal.portfolio_report().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("{}", display::portfolio_table(&report));
    if args.curve && !report.equity_curve.is_empty() {
        println!("{}", display::equity_curve_table(&report));
    }
    Ok(())
}

async fn handle_import<S: TradeStore>(journal: &Journal<S>, path: PathBuf) -> Result<()> {
    let file = File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    let summary = transfer::import_csv(journal, file).await?;
    println!(
        "Imported {} open and {} closed trade(s) from {}",
        summary.opened,
        summary.closed,
        path.display()
    );
    Ok(())
}

async fn handle_export<S: TradeStore>(journal: &Journal<S>, path: PathBuf) -> Result<()> {
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let rows = transfer::export_csv(journal, file).await?;
    println!("Exported {rows} trade(s) to {}", path.display());
    Ok(())
}
