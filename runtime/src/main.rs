use anyhow::Result;
use clap::{Parser, Subcommand};
use livemap::cli::{crawl_cmd, export_cmd, logging, status_cmd};
use livemap::config::Settings;
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// LiveMap: crawl a live traffic alert feed into a deduplicated local store.
#[derive(Parser)]
#[command(name = "livemap", version, about)]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Override DB_PATH
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Machine-readable output on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the feed over the configured area, subdividing dense regions
    Crawl {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Write stored alerts as a GeoJSON FeatureCollection
    Export {
        /// Output directory (defaults to SOURCE_PATH)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Summarize the alert store
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json {
        std::env::set_var("LIVEMAP_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("LIVEMAP_QUIET", "1");
    }
    if cli.no_color {
        std::env::set_var("LIVEMAP_NO_COLOR", "1");
    }

    // Before tracing so RUST_LOG may come from the file.
    let dotenv = match &cli.env_file {
        Some(path) => dotenvy::from_path(path).map(|_| path.clone()),
        None => dotenvy::dotenv(),
    };

    init_tracing(cli.quiet, cli.log_json);

    match dotenv {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(e) if cli.env_file.is_some() => warn!("failed to load env file: {e}"),
        Err(_) => {}
    }

    let mut settings = Settings::from_env()?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    match cli.command {
        Command::Crawl { once } => crawl_cmd::run(&settings, once).await,
        Command::Export { out } => {
            let out_dir = out.unwrap_or_else(|| settings.source_path.clone());
            export_cmd::run(&settings, &out_dir)
        }
        Command::Status => status_cmd::run(&settings),
    }
}

fn init_tracing(quiet: bool, json: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = logging::log_filter(rust_log.as_deref(), quiet);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
