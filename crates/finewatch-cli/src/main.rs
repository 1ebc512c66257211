use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use finewatch_client::{ReqwestFetcher, XPoster};
use finewatch_core::publish::{DEFAULT_HANDLE, RECENCY_WINDOW_DAYS, select_recent};
use finewatch_core::{
    Abbreviations, CachingFetcher, ListingWalker, NullRenderer, Pipeline, Publisher,
    PublisherConfig, RecordBuilder, Site, Summarizer, run_listing_pass,
};
use finewatch_db::{Database, DatabaseConfig, RecordRepository};

#[derive(Parser)]
#[command(
    name = "finewatch",
    version,
    about = "Track ICO enforcement actions and post new ones"
)]
struct Cli {
    /// SQLite database URL
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Timeout in seconds for page fetches and X API calls
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the enforcement listing, store records, and post recent unsent ones
    Run {
        /// X API user-context access token
        #[arg(long, env = "X_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,

        /// X API base URL
        #[arg(long, env = "X_API_BASE_URL", default_value = "https://api.x.com")]
        api_base_url: String,

        /// Seconds to wait before each post
        #[arg(long, env = "FINEWATCH_POST_DELAY_SECS", default_value_t = 5)]
        post_delay_secs: u64,

        /// Account handle that replaces the regulator's name in posts
        #[arg(long, default_value = DEFAULT_HANDLE)]
        handle: String,
    },

    /// Scrape and store the enforcement listing, printing the records as JSON
    Scrape,

    /// List stored records that would be posted on the next run
    Pending,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("finewatch=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout_secs);

    match cli.command {
        Commands::Run {
            access_token,
            api_base_url,
            post_delay_secs,
            handle,
        } => {
            let repo = connect_db(cli.database_url).await?;
            let poster = XPoster::with_base_url(&access_token, &api_base_url)
                .and_then(|poster| poster.with_timeout(timeout))
                .map_err(|e| anyhow::anyhow!(e))
                .context("Failed to build X client")?;
            let config = PublisherConfig::new(&Abbreviations::default(), &handle)
                .with_post_delay(Duration::from_secs(post_delay_secs));
            cmd_run(repo, poster, config, timeout).await
        }
        Commands::Scrape => {
            let repo = connect_db(cli.database_url).await?;
            cmd_scrape(&repo, timeout).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Pending => {
            let repo = connect_db(cli.database_url).await?;
            cmd_pending(&repo).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Open the database and apply migrations.
async fn connect_db(database_url: Option<String>) -> Result<RecordRepository> {
    let mut config = DatabaseConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    if let Some(url) = database_url {
        config = config.with_url(url);
    }

    let db = Database::connect(&config)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to connect to database")?;
    db.migrate()
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to run migrations")?;

    Ok(db.record_repo())
}

fn listing_walker(timeout: Duration) -> Result<ListingWalker<CachingFetcher<ReqwestFetcher>>> {
    let fetcher = ReqwestFetcher::with_timeout(timeout).map_err(|e| anyhow::anyhow!(e))?;
    let fetcher = CachingFetcher::new(fetcher);
    let builder = RecordBuilder::new(Site::default(), Summarizer::new(Abbreviations::default()));
    Ok(ListingWalker::new(fetcher, builder))
}

async fn cmd_run(
    repo: RecordRepository,
    poster: XPoster,
    config: PublisherConfig,
    timeout: Duration,
) -> Result<ExitCode> {
    let publisher = Publisher::new(repo, poster, NullRenderer, config);
    let pipeline = Pipeline::new(listing_walker(timeout)?, publisher);

    let today = chrono::Local::now().date_naive();
    let outcome = pipeline
        .run(today)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Run aborted")?;

    for failure in &outcome.report.failures {
        eprintln!("Failed to publish {}: {}", failure.url, failure.error);
    }
    eprintln!(
        "Scraped {} records; published {} of {} ({} failed)",
        outcome.scraped,
        outcome.report.published.len(),
        outcome.report.attempted,
        outcome.report.failed_count()
    );

    Ok(if outcome.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn cmd_scrape(repo: &RecordRepository, timeout: Duration) -> Result<()> {
    let walker = listing_walker(timeout)?;
    let records = run_listing_pass(&walker, repo)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Listing pass aborted")?;

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn cmd_pending(repo: &RecordRepository) -> Result<()> {
    let unsent = repo.find_unsent().await.map_err(|e| anyhow::anyhow!(e))?;
    let today = chrono::Local::now().date_naive();
    let pending = select_recent(unsent, today, RECENCY_WINDOW_DAYS);

    if pending.is_empty() {
        println!("No records waiting to be posted.");
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&pending)?);
    Ok(())
}
