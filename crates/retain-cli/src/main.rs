//! Retain CLI
//!
//! Command-line front end for the retain flashcard scheduler.

mod review;

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use retain_core::{
    format_estimate, CollectionStats, DeckFilter, RetainConfig, ReviewItem, ReviewQueue,
    SqliteStore,
};

/// Deck used by `add` when neither `--deck` nor `default_deck` is set
const FALLBACK_DECK: &str = "default";

/// Retain - spaced repetition in the terminal
#[derive(Parser)]
#[command(name = "retain")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Review flashcards on a learning-step schedule")]
struct Cli {
    /// Config file (defaults to RETAIN_CONFIG, then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the database (overrides config and RETAIN_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new item, due immediately
    Add {
        /// Prompt side
        front: String,
        /// Answer side
        back: String,
        #[arg(long)]
        deck: Option<String>,
    },

    /// List items due now in review order
    Due {
        #[arg(long)]
        deck: Option<String>,
    },

    /// Run an interactive review session
    Review {
        #[arg(long)]
        deck: Option<String>,
    },

    /// Show an item's state and rating history
    Show {
        /// Item id or unique id prefix
        id: String,
    },

    /// Show collection statistics
    Stats {
        #[arg(long)]
        deck: Option<String>,
    },

    /// Export items with their history as JSON or JSONL
    Export {
        /// Output file path
        output: PathBuf,
        /// Export format: json or jsonl
        #[arg(long, default_value = "json")]
        format: String,
        #[arg(long)]
        deck: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

/// Loaded configuration and opened store
struct AppContext {
    config: RetainConfig,
    store: Arc<SqliteStore>,
}

impl AppContext {
    fn open(cli: &Cli) -> anyhow::Result<Self> {
        let config = load_config(cli)?;
        let store = SqliteStore::new(config.database_path()).context("failed to open database")?;
        tracing::debug!(path = %store.path().display(), "Database opened");
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    fn deck(&self, deck: Option<String>) -> DeckFilter {
        DeckFilter::from_option(deck.or_else(|| self.config.default_deck.clone()))
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<RetainConfig> {
    let mut config = RetainConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with card text
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    if let Commands::Config = cli.command {
        return run_config(&cli);
    }

    let ctx = AppContext::open(&cli)?;
    match cli.command {
        Commands::Add { front, back, deck } => run_add(&ctx, front, back, deck),
        Commands::Due { deck } => run_due(&ctx, deck),
        Commands::Review { deck } => {
            let deck = ctx.deck(deck);
            review::run_review(&ctx, deck).await
        }
        Commands::Show { id } => run_show(&ctx, &id),
        Commands::Stats { deck } => run_stats(&ctx, deck),
        Commands::Export {
            output,
            format,
            deck,
        } => run_export(&ctx, output, &format, deck),
        Commands::Config => Ok(()),
    }
}

/// Run add command
fn run_add(ctx: &AppContext, front: String, back: String, deck: Option<String>) -> anyhow::Result<()> {
    if front.trim().is_empty() || back.trim().is_empty() {
        bail!("front and back must not be empty");
    }
    let deck = deck
        .or_else(|| ctx.config.default_deck.clone())
        .unwrap_or_else(|| FALLBACK_DECK.to_string());

    let item = ReviewItem::new(deck, front, back, Utc::now());
    ctx.store.insert_item(&item)?;

    println!("{} {}", "Added".green().bold(), item.id);
    println!("{}: {}", "Deck".white().bold(), item.deck_id);
    Ok(())
}

/// Run due command
fn run_due(ctx: &AppContext, deck: Option<String>) -> anyhow::Result<()> {
    let deck = ctx.deck(deck);
    let now = Utc::now();
    let items = ctx.store.due_items(&deck, now)?;
    let queue = ReviewQueue::build(&items, &deck, now);

    println!("{}", format!("=== Due in {} ===", deck).cyan().bold());
    if queue.is_empty() {
        println!("{}", "Nothing due.".dimmed());
        return Ok(());
    }

    for (position, id) in queue.ids().iter().enumerate() {
        let Some(item) = items.iter().find(|i| &i.id == id) else {
            continue;
        };
        println!(
            "{:>3}. {} {:10} {:9} {} {}",
            position + 1,
            short_id(&item.id).dimmed(),
            item.deck_id,
            phase_label(item),
            item.front,
            format!("(overdue {})", overdue(item.state.next_review, now)).dimmed()
        );
    }
    println!();
    println!("{}: {}", "Total".white().bold(), queue.len());
    Ok(())
}

/// Run show command
fn run_show(ctx: &AppContext, id: &str) -> anyhow::Result<()> {
    let item = find_item(ctx, id)?;
    let state = &item.state;
    let now = Utc::now();

    println!("{}", "=== Item ===".cyan().bold());
    println!("{}: {}", "Id".white().bold(), item.id);
    println!("{}: {}", "Deck".white().bold(), item.deck_id);
    println!("{}: {}", "Front".white().bold(), item.front);
    println!("{}: {}", "Back".white().bold(), item.back);
    if let Some(note) = &state.note {
        println!("{}: {}", "Note".white().bold(), note);
    }
    println!();
    println!("{}: {}", "Phase".white().bold(), phase_label(&item));
    println!("{}: {:.2}", "Easiness".white().bold(), state.easiness);
    println!("{}: {}", "Repetitions".white().bold(), state.repetitions);
    println!(
        "{}: {}",
        "Interval".white().bold(),
        format_estimate(state.interval)
    );
    let due = if state.is_due_at(now) {
        "now".green().to_string()
    } else {
        format!(
            "in {}",
            format_estimate(days_between(now, state.next_review))
        )
    };
    println!(
        "{}: {} ({})",
        "Next Review".white().bold(),
        state.next_review.format("%Y-%m-%d %H:%M"),
        due
    );

    println!();
    println!("{}", "=== History ===".yellow().bold());
    if state.quality_history.is_empty() {
        println!("{}", "Never reviewed.".dimmed());
    }
    for record in &state.quality_history {
        println!(
            "  {}  q={}  ease={:.2}  next={}{}",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.quality,
            record.resulting_easiness,
            format_estimate(record.resulting_interval),
            if record.was_learning_after {
                " (learning)"
            } else {
                ""
            }
        );
    }
    Ok(())
}

/// Run stats command
fn run_stats(ctx: &AppContext, deck: Option<String>) -> anyhow::Result<()> {
    let deck = ctx.deck(deck);
    let items = ctx.store.list_items(&deck)?;
    let now = Utc::now();
    let stats = CollectionStats::compute(&items, now);

    println!("{}", format!("=== Retain Statistics: {} ===", deck).cyan().bold());
    println!();
    println!("{}: {}", "Total Items".white().bold(), stats.total_items);
    println!("{}: {}", "Due Now".white().bold(), stats.due_items);
    println!("{}: {}", "Never Reviewed".white().bold(), stats.new_items);
    print_distribution_bar("Learning", stats.learning_items, stats.total_items);
    print_distribution_bar("Mature", stats.mature_items, stats.total_items);
    if stats.mature_items > 0 {
        println!(
            "{}: {:.2}",
            "Average Easiness".white().bold(),
            stats.average_easiness
        );
    }
    if let Some(next) = stats.next_due {
        println!(
            "{}: in {}",
            "Next Due".white().bold(),
            format_estimate(days_between(now, next))
        );
    }
    Ok(())
}

/// Print a distribution bar
fn print_distribution_bar(label: &str, count: usize, total: usize) {
    let percentage = if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    let bar_width: usize = 30;
    let filled = ((percentage / 100.0) * bar_width as f64) as usize;
    let empty = bar_width.saturating_sub(filled);
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(empty));

    println!(
        "  {:10} [{:30}] {:>4} ({:>5.1}%)",
        label,
        bar.green(),
        count,
        percentage
    );
}

/// Run export command
fn run_export(
    ctx: &AppContext,
    output: PathBuf,
    format: &str,
    deck: Option<String>,
) -> anyhow::Result<()> {
    if format != "json" && format != "jsonl" {
        bail!("Invalid format '{}'. Must be 'json' or 'jsonl'.", format);
    }

    let deck = ctx.deck(deck);
    let items = ctx.store.list_items(&deck)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    if format == "json" {
        serde_json::to_writer_pretty(&mut writer, &items)?;
        writeln!(writer)?;
    } else {
        for item in &items {
            serde_json::to_writer(&mut writer, item)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;

    println!(
        "{} {} items to {}",
        "Exported".green().bold(),
        items.len(),
        output.display()
    );
    Ok(())
}

/// Run config command
fn run_config(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let db = match config.database_path() {
        Some(path) => path,
        None => SqliteStore::default_path()?,
    };
    println!("# database: {}", db.display());
    print!("{}", config.to_toml_string()?);
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

/// Resolve a full id or a unique prefix
fn find_item(ctx: &AppContext, id: &str) -> anyhow::Result<ReviewItem> {
    if let Some(item) = ctx.store.get_item(id)? {
        return Ok(item);
    }
    let mut matches: Vec<ReviewItem> = ctx
        .store
        .list_items(&DeckFilter::All)?
        .into_iter()
        .filter(|item| item.id.starts_with(id))
        .collect();
    match matches.len() {
        0 => bail!("No item with id {}", id),
        1 => Ok(matches.remove(0)),
        n => bail!("Id prefix {} is ambiguous ({} items)", id, n),
    }
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub(crate) fn phase_label(item: &ReviewItem) -> String {
    let state = &item.state;
    if state.quality_history.is_empty() {
        "new".blue().to_string()
    } else if state.is_learning_phase() {
        "learning".yellow().to_string()
    } else {
        "mature".green().to_string()
    }
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 86_400.0
}

fn overdue(due: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = days_between(due, now);
    if days <= 0.0 {
        "just now".to_string()
    } else {
        format_estimate(days)
    }
}
