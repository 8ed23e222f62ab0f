use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use reportshare::config::Config;
use reportshare::listing::search::{MemoryLocation, SearchSync};
use reportshare::listing::{
    FetchOutcome, FileFeed, FileItem, FilesClient, ListView, LocationBar,
};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Browse the files a vendor has shared.
#[derive(Parser, Debug)]
#[command(name = "reportshare", version, about)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a vendor's files, loading further pages as if scrolled to the end
    List {
        #[arg(long)]
        vendor: String,
        #[arg(long, default_value = "")]
        search: String,
        /// Pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Page size (overrides config)
        #[arg(long)]
        limit: Option<u32>,
        /// Bearer token (overrides REPORTSHARE_TOKEN)
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
    /// Show the query string a search box value produces
    Query {
        #[arg(long, default_value = "")]
        search: String,
        /// Existing query string
        #[arg(long, default_value = "")]
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reportshare=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::List {
            vendor,
            search,
            pages,
            limit,
            token,
            json,
        } => {
            let token = token.or_else(|| config.token.clone()).unwrap_or_default();
            list(&config, &vendor, &token, &search, pages, limit, json).await
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Command::Query { search, query } => {
            let mut sync = SearchSync::new(MemoryLocation::new(&query), Duration::ZERO);
            sync.apply(&search);
            let query = sync.location().query();
            if query.is_empty() {
                println!();
            } else {
                println!("?{query}");
            }
            Ok(())
        }
    }
}

async fn list(
    config: &Config,
    vendor: &str,
    token: &str,
    search: &str,
    pages: u32,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let timings = config.timings();
    let client = FilesClient::from_config(config)?;
    let feed = FileFeed::new(client, limit.unwrap_or(timings.page_size), timings.stale_time);

    feed.set_search(search).await;
    let mut loaded = match feed.set_context(vendor, token).await {
        FetchOutcome::Applied => 1,
        _ => 0,
    };
    while loaded > 0 && loaded < pages {
        match feed.on_sentinel(1.0).await {
            FetchOutcome::Applied => loaded += 1,
            _ => break,
        }
    }
    feed.close();
    info!(vendor, pages = loaded, "listing loaded");

    feed.with_list(|list| match list.view() {
        ListView::NotReady => {
            bail!("vendor and token are required (pass --token or set REPORTSHARE_TOKEN)")
        }
        ListView::Loading => bail!("listing did not finish loading"),
        ListView::Failed { message } => {
            bail!("Error loading files: {message}. Run the command again to retry.")
        }
        ListView::Empty => {
            println!("No files found");
            Ok(())
        }
        ListView::Files { files, has_more, .. } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&files)?);
            } else {
                print_table(&files);
                let total = list.pages().last().and_then(|p| p.total_files);
                match total {
                    Some(total) => println!("\nshowing {} of {}", files.len(), total),
                    None => println!("\nshowing {}", files.len()),
                }
                if has_more {
                    println!("more available: rerun with --pages {}", loaded + 1);
                }
            }
            Ok(())
        }
    })
}

fn print_table(files: &[&FileItem]) {
    println!(
        "{:<40} {:<5} {:<20} {:<20} {}",
        "NAME", "TYPE", "VENDOR", "SHARED BY", "SHARED ON"
    );
    for file in files {
        println!(
            "{:<40} {:<5} {:<20} {:<20} {}",
            truncate(&file.name, 40),
            file.kind,
            truncate(&file.vendor.name, 20),
            truncate(&file.shared_by, 20),
            file.shared_on
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
