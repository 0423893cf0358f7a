use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ndsom_client::ReqwestFetcher;
use ndsom_core::job::run_update;
use ndsom_core::models::{MarketRow, ScrapeOutcome};
use ndsom_core::{AppError, ScrapeService, SourceConfig, Strategy, TableId, UpsertService};
use ndsom_db::{Database, DatabaseConfig, MarketRepository};

#[cfg(feature = "browser")]
type BrowserFactory = ndsom_client::ChromiumLauncher;
#[cfg(not(feature = "browser"))]
type BrowserFactory = ndsom_core::NoBrowser;

/// Exit status of an update that failed transiently (EX_TEMPFAIL), so a
/// scheduler can tell "try again later" apart from a broken setup.
const EXIT_RETRYABLE: u8 = 75;
const EXIT_FAILURE: u8 = 1;

#[derive(Parser)]
#[command(name = "ndsom", version, about = "NDS-OM market watch tracker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the market table and reconcile it into the database (default)
    Update(SourceArgs),

    /// Scrape only and print the raw records as JSON
    Scrape(SourceArgs),

    /// List every security stored so far
    Securities,

    /// Show stored rows of one security
    History {
        /// Security description, e.g. "7.26% GS 2033"
        #[arg(short, long)]
        security: String,

        /// Print per-day totals of trades and TTA instead of rows
        #[arg(long, default_value_t = false)]
        daily: bool,
    },

    /// Export stored rows of one security as CSV
    Export {
        #[arg(short, long)]
        security: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Overrides for the source settings read from the environment.
#[derive(Args, Default)]
struct SourceArgs {
    /// Market watch page URL
    #[arg(short, long)]
    url: Option<String>,

    /// Table id: ndsomEntityTable, oddLotEntityTable, whenReIssuedEntityTable, whenIssuedEntityTable
    #[arg(short, long)]
    table: Option<String>,

    /// Retrieval strategy: html, direct or browser
    #[arg(long)]
    strategy: Option<String>,
}

impl SourceArgs {
    fn apply(self, mut config: SourceConfig) -> Result<SourceConfig> {
        if let Some(url) = self.url {
            config.base_url = url;
        }
        if let Some(table) = self.table {
            config.table = table.parse::<TableId>()?;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy.parse::<Strategy>()?;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ndsom=info".parse()?)
                .add_directive("ndsom_core=info".parse()?)
                .add_directive("ndsom_db=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or_else(|| Commands::Update(SourceArgs::default())) {
        Commands::Update(args) => {
            if let Err(e) = update(args).await {
                let status = failure_status(&e);
                tracing::error!(retryable = status == EXIT_RETRYABLE, "{e:#}");
                return Ok(ExitCode::from(status));
            }
        }
        Commands::Scrape(args) => {
            let config = args.apply(SourceConfig::from_env()?)?;
            cmd_scrape(&config).await?;
        }
        Commands::Securities => {
            let repo = connect_db().await?;
            cmd_securities(&repo).await?;
        }
        Commands::History { security, daily } => {
            let repo = connect_db().await?;
            let config = SourceConfig::from_env()?;
            cmd_history(&repo, &config, &security, daily).await?;
        }
        Commands::Export { security, output } => {
            let repo = connect_db().await?;
            cmd_export(&repo, &security, output.as_deref()).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn update(args: SourceArgs) -> Result<()> {
    let config = args.apply(SourceConfig::from_env()?)?;
    let repo = connect_db().await?;
    cmd_update(&config, repo).await
}

/// Map a failed update to its exit status.
fn failure_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<AppError>() {
        Some(app) if app.is_retryable() => EXIT_RETRYABLE,
        _ => EXIT_FAILURE,
    }
}

/// Connect to PostgreSQL and make sure the schema exists.
async fn connect_db() -> Result<MarketRepository> {
    let config = DatabaseConfig::from_env()?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;
    Ok(db.market_repo())
}

fn scraper(config: &SourceConfig) -> Result<ScrapeService<'_, ReqwestFetcher, BrowserFactory>> {
    let fetcher =
        ReqwestFetcher::with_timeout(config.http_timeout).context("Failed to create HTTP client")?;
    Ok(ScrapeService::new(fetcher, browser_factory(config), config))
}

#[cfg(feature = "browser")]
fn browser_factory(config: &SourceConfig) -> BrowserFactory {
    ndsom_client::ChromiumLauncher::new(config.browser.clone())
}

#[cfg(not(feature = "browser"))]
fn browser_factory(_config: &SourceConfig) -> BrowserFactory {
    ndsom_core::NoBrowser
}

async fn cmd_update(config: &SourceConfig, repo: MarketRepository) -> Result<()> {
    let scraper = scraper(config)?;
    let upserter = UpsertService::new(repo, config.calendar);

    let summary = run_update(
        &scraper,
        &upserter,
        &config.base_url,
        config.table,
        config.strategy,
    )
    .await
    .with_context(|| format!("Update of {} failed", config.table))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn cmd_scrape(config: &SourceConfig) -> Result<()> {
    let scraper = scraper(config)?;
    let outcome = scraper
        .scrape_table(&config.base_url, config.table, config.strategy)
        .await?;

    match outcome {
        ScrapeOutcome::Empty => tracing::warn!(table = %config.table, "No data scraped"),
        ScrapeOutcome::Rows(records) => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }
    Ok(())
}

async fn cmd_securities(repo: &MarketRepository) -> Result<()> {
    let securities = repo.security_descriptions().await?;
    if securities.is_empty() {
        println!("No securities stored yet");
        return Ok(());
    }

    for security in &securities {
        println!("{security}");
    }
    println!("\nTotal: {} securities", securities.len());
    Ok(())
}

async fn cmd_history(
    repo: &MarketRepository,
    config: &SourceConfig,
    security: &str,
    daily: bool,
) -> Result<()> {
    let rows = repo.history(security).await?;
    if rows.is_empty() {
        println!("No rows found for security={security}");
        return Ok(());
    }

    if daily {
        println!("Daily totals for {security} (UTC{}):\n", config.calendar.offset());
        for total in config.calendar.daily_totals(&rows) {
            println!("  {}  trades={:<8} tta={:.2}", total.date, total.trades, total.tta);
        }
        return Ok(());
    }

    println!("History for {security}:\n");
    for row in &rows {
        println!(
            "  {}  trades={:<6} tta={:<10.2} open={:<8} high={:<8} low={:<8} ltp={:<8} lty={}",
            row.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            row.trades,
            row.tta,
            row.open,
            row.high,
            row.low,
            row.ltp,
            row.lty,
        );
    }
    println!("\nTotal: {} rows", rows.len());
    Ok(())
}

async fn cmd_export(repo: &MarketRepository, security: &str, output: Option<&Path>) -> Result<()> {
    let rows = repo.history(security).await?;

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_csv(file, &rows)?;
            tracing::info!(rows = rows.len(), path = %path.display(), "Exported");
        }
        None => write_csv(std::io::stdout().lock(), &rows)?,
    }
    Ok(())
}

fn write_csv<W: Write>(writer: W, rows: &[MarketRow]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}
