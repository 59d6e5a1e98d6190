use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};

use atomfeed::config::Config;
use atomfeed::feed::{Feed, FeedParser};
use atomfeed::storage::ReadStateFile;
use atomfeed::util::single_line;

/// Column budget for item titles in the summary listing
const TITLE_WIDTH: usize = 72;

#[derive(Parser, Debug)]
#[command(
    name = "atomfeed",
    about = "Parse an Atom feed into a deduplicated list of unread items"
)]
struct Args {
    /// Atom document to parse, or `-` for stdin
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Newline-delimited IDs of items already read (overrides the config file)
    #[arg(long, value_name = "FILE")]
    read_state: Option<PathBuf>,

    /// Include entry dumps in warnings and log documents that produced them
    #[arg(long)]
    debug: bool,

    /// Print the normalized feed as JSON
    #[arg(long)]
    json: bool,
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut data = Vec::new();
        std::io::stdin()
            .read_to_end(&mut data)
            .context("Failed to read feed from stdin")?;
        return Ok(data);
    }
    std::fs::read(path).with_context(|| format!("Failed to read feed file: {}", path.display()))
}

fn print_summary(feed: &Feed) {
    println!("{}", single_line(&feed.title, TITLE_WIDTH));
    if !feed.link.is_empty() {
        println!("{}", feed.link);
    }
    println!("{} unread", feed.unread);
    for item in &feed.items {
        let date = item
            .date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "----------------".to_string());
        println!("  {}  {}", date, single_line(&item.title, TITLE_WIDTH));
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; --debug only raises the fallback level
    let default_level = if args.debug { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => Config::default(),
    };
    config.debug |= args.debug;

    let read_state = match args.read_state.as_ref().or(config.read_state_path.as_ref()) {
        Some(path) => ReadStateFile::load(path).context("Failed to load read state")?,
        None => ReadStateFile::default(),
    };

    let options = config.parse_options().context("Invalid configuration")?;
    let parser = FeedParser::new(options);

    let data = read_input(&args.input)?;
    let feed = parser
        .parse(&data, &read_state)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;

    tracing::info!(
        items = feed.items.len(),
        previously_read = read_state.len(),
        "Parsed feed"
    );

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&feed).context("Failed to serialize feed")?
        );
    } else {
        print_summary(&feed);
    }

    Ok(())
}
