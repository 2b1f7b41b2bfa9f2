//! CLI administration tool for yaturl.
//!
//! Blocks links, inspects them and prints statistics straight from the
//! database, without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Block a link
//! cargo run --bin admin -- block 3f2a --comment "phishing"
//!
//! # Inspect a link
//! cargo run --bin admin -- show 3f2a
//!
//! # Service-wide statistics, or a single query
//! cargo run --bin admin -- stats
//! cargo run --bin admin -- stats --subject redirects --range per_hour
//!
//! # Check database connection / apply migrations
//! cargo run --bin admin -- db check
//! cargo run --bin admin -- db migrate
//! ```
//!
//! # Environment Variables
//!
//! Same as the server; see `yaturl::config`.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Confirm, Input};

use yaturl::application::services::{LinkStore, PeriodCounts, StatsService};
use yaturl::config;
use yaturl::domain::fingerprint::ShortHash;
use yaturl::domain::statistics::{Statistics, StatsRange, StatsSubject};
use yaturl::infrastructure::connection::ConnectionManager;
use yaturl::infrastructure::persistence::PgConnector;

/// CLI tool for managing yaturl.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Block a short link so it no longer redirects
    Block {
        short_hash: String,

        /// Reason for the block, shown to visitors
        #[arg(short, long)]
        comment: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show a short link with its statistics
    Show { short_hash: String },

    /// Show statistics
    Stats {
        /// `links` or `redirects`
        #[arg(long, requires = "range")]
        subject: Option<StatsSubject>,

        /// e.g. `today`, `all`, `per_week`, `per_dow`
        #[arg(long, requires = "subject")]
        range: Option<StatsRange>,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Apply pending migrations
    Migrate,
}

type Store = LinkStore<PgConnector>;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env()?;

    let connector = PgConnector::from_url(&config.database_url, config.connect_timeout())
        .context("Invalid DATABASE_URL")?;
    let connections = Arc::new(ConnectionManager::new(connector, config.pool_settings()));
    let store = Arc::new(LinkStore::new(connections, config.min_short_hash_length));

    match cli.command {
        Commands::Block {
            short_hash,
            comment,
            yes,
        } => block_link(&store, &short_hash, comment, yes).await?,
        Commands::Show { short_hash } => show_link(&store, &short_hash, &config.base_url).await?,
        Commands::Stats { subject, range } => match (subject, range) {
            (Some(subject), Some(range)) => show_query(&store, subject, range).await?,
            _ => show_summary(&store).await,
        },
        Commands::Db { action } => handle_db_action(action, &store).await?,
    }

    Ok(())
}

fn parse_short_hash(raw: &str) -> Result<ShortHash> {
    ShortHash::parse(raw).with_context(|| format!("'{raw}' is not a valid short hash"))
}

/// Blocks a link after showing it and asking for confirmation.
///
/// Blocking is idempotent; an already blocked link keeps its first comment.
async fn block_link(
    store: &Store,
    short_hash: &str,
    comment: Option<String>,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "🔒 Block Link".bright_blue().bold());
    println!();

    let short_hash = parse_short_hash(short_hash)?;
    let link = store
        .link_details(&short_hash)
        .await?
        .context("Short link not found")?;

    if let Some(entry) = store.is_blocked(&short_hash).await? {
        println!("{}", "⚠️  This link is already blocked".yellow());
        println!("  Comment: {}", entry.comment.cyan());
        return Ok(());
    }

    println!("  Short hash: {}", link.short_hash.to_string().cyan());
    println!("  URL:        {}", link.url.bright_white());
    println!();

    let comment = match comment {
        Some(c) => c,
        None => Input::new()
            .with_prompt("Comment")
            .allow_empty(true)
            .interact_text()?,
    };

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Block this link?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    store.block(&short_hash, &comment).await?;

    println!();
    println!("{}", "✅ Link blocked".green().bold());
    println!();

    Ok(())
}

async fn show_link(store: &Arc<Store>, short_hash: &str, base_url: &str) -> Result<()> {
    let short_hash = parse_short_hash(short_hash)?;
    let stats = StatsService::new(Arc::clone(store))
        .link_statistics(&short_hash)
        .await?
        .context("Short link not found")?;

    println!("{}", "🔗 Link".bright_blue().bold());
    println!();
    println!(
        "  Short URL:  {}",
        format!("{}/{}", base_url.trim_end_matches('/'), stats.link.short_hash).cyan()
    );
    println!("  URL:        {}", stats.link.url.bright_white());
    println!("  Full hash:  {}", stats.link.full_hash.to_string().bright_black());
    println!(
        "  Created:    {}",
        stats.link.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Redirects:  {}",
        stats.redirects.to_string().bright_green().bold()
    );
    if let (Some(first), Some(last)) = (stats.first_redirect, stats.last_redirect) {
        println!(
            "  Accessed:   {} .. {}",
            first.format("%Y-%m-%d %H:%M"),
            last.format("%Y-%m-%d %H:%M")
        );
    }
    match stats.block {
        Some(block) => println!(
            "  Status:     {} ({})",
            "BLOCKED".red(),
            block.comment.bright_black()
        ),
        None => println!("  Status:     {}", "ACTIVE".green()),
    }
    println!();

    Ok(())
}

/// Displays the service-wide overview.
///
/// Figures that could not be queried are shown as `-`.
async fn show_summary(store: &Arc<Store>) {
    let summary = StatsService::new(Arc::clone(store)).summary().await;

    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();
    println!(
        "  {:<12} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "".bright_white(),
        "Today".bright_white().bold(),
        "Week".bright_white().bold(),
        "Month".bright_white().bold(),
        "Year".bright_white().bold(),
        "All".bright_white().bold()
    );
    println!("  {}", "─".repeat(67).bright_black());
    print_counts("Links", &summary.links);
    print_counts("Redirects", &summary.redirects);
    println!();

    if let Some(first) = summary.first_link {
        println!("  First link:     {}", first.format("%Y-%m-%d %H:%M"));
    }
    if let Some(last) = summary.last_redirect {
        println!("  Last redirect:  {}", last.format("%Y-%m-%d %H:%M"));
    }
    println!();
}

fn print_counts(label: &str, counts: &PeriodCounts) {
    let cell = |n: Option<i64>| n.map_or_else(|| "-".to_string(), |n| n.to_string());
    println!(
        "  {:<12} {:>10} {:>10} {:>10} {:>10} {:>10}",
        label.cyan(),
        cell(counts.today),
        cell(counts.this_week),
        cell(counts.this_month),
        cell(counts.this_year),
        cell(counts.all).bright_green().bold()
    );
}

async fn show_query(store: &Store, subject: StatsSubject, range: StatsRange) -> Result<()> {
    let stats = store
        .get_statistics(subject, range.as_str())
        .await
        .context("Statistics are unavailable")?;

    println!(
        "{}",
        format!("📊 {} / {}", subject.as_str(), range.as_str())
            .bright_blue()
            .bold()
    );
    println!();

    match stats {
        Statistics::Count(n) => println!("  {}", n.to_string().bright_green().bold()),
        Statistics::Grouped(buckets) if buckets.is_empty() => {
            println!("{}", "  No data".yellow());
        }
        Statistics::Grouped(buckets) => {
            for bucket in buckets {
                let label = match bucket.year {
                    Some(year) => format!("{year}-W{:02}", bucket.bucket),
                    None => bucket.bucket.to_string(),
                };
                println!(
                    "  {:<10} {}",
                    label.cyan(),
                    bucket.count.to_string().bright_white()
                );
            }
        }
    }
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, store: &Store) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            let conn = store.connections().acquire().await?;
            conn.release();
            let status = store.connections().status();

            println!("{}", "✅ Database connection OK".green().bold());
            println!(
                "  Pool: {} idle, {} in use, capacity {}",
                status.idle, status.in_use, status.capacity
            );
        }
        DbAction::Migrate => {
            println!("{}", "🛠  Applying migrations...".bright_blue());

            let mut conn = store.connections().acquire().await?;
            conn.migrate().await?;
            conn.release();

            println!("{}", "✅ Migrations applied".green().bold());
        }
    }

    Ok(())
}
