//! feedgrab command line entry point.
//!
//! Fetched bodies and JSON reports go to stdout. Logging goes to stderr so
//! the output can be piped straight into a post-processor.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use feedgrab_core::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "feedgrab")]
#[command(version, about = "Cache-backed fetching for feed enrichment scripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory that holds the store namespace (default: home directory)
    #[arg(long, global = true)]
    base_path: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one session: primary uncached, secondaries cached, then cleanup
    Grab {
        /// Session name, one per feed
        session: String,
        /// Primary resource, never cached
        primary: String,
        /// Secondary resources served through the cache
        secondary: Vec<String>,
        /// Also read secondary URLs from stdin, one per line
        #[arg(long)]
        stdin: bool,
        /// Write fetched bodies into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Print one resource through the session cache (no cleanup)
    Get {
        session: String,
        url: String,
    },
    /// Print one resource fetched directly
    Fetch {
        url: String,
    },
    /// List the entries stored for a session
    Keys {
        session: String,
    },
    /// Remove every entry stored for a session
    Purge {
        session: String,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let mut config = AppConfig::load()?;
    if let Some(base_path) = cli.base_path {
        config.base_path = Some(base_path);
    }

    match cli.command {
        Commands::Grab { session, primary, secondary, stdin, out_dir } => {
            commands::grab::run(&config, &session, &primary, secondary, stdin, out_dir.as_deref()).await
        }
        Commands::Get { session, url } => commands::get::run(&config, &session, &url).await,
        Commands::Fetch { url } => commands::fetch::run(&config, &url).await,
        Commands::Keys { session } => commands::keys::run(&config, &session).await,
        Commands::Purge { session } => commands::purge::run(&config, &session).await,
    }
}
