//! CLI entry point for stripfetch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};

use stripfetch::{
    Config, Dispatcher, FsStore, HttpFetcher, LinkSink, PipelineEnv, RunContext, store,
};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    // The date and weekday are resolved once; every template and skip
    // decision uses this same context.
    let ctx = RunContext::now();

    let config = Config::load(&args.config, &ctx)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    for warning in &config.warnings {
        warn!(%warning, "config");
    }

    let comics_dir = args
        .directory
        .clone()
        .or_else(|| config.directory.clone())
        .or_else(default_comics_dir)
        .context("no comics directory configured and $HOME is not set")?;
    std::fs::create_dir_all(&comics_dir)
        .with_context(|| format!("cannot create {}", comics_dir.display()))?;

    let index_dir = args.index_dir.clone().unwrap_or_else(|| comics_dir.clone());
    std::fs::create_dir_all(&index_dir)
        .with_context(|| format!("cannot create {}", index_dir.display()))?;

    if args.clean {
        store::clean_directory(&comics_dir)?;
        if args.index_dir.is_some() {
            store::clean_directory(&index_dir)?;
        }
    }

    let links = match &args.links {
        Some(path) => Some(Arc::new(
            LinkSink::to_file(path)
                .with_context(|| format!("cannot create links file {}", path.display()))?,
        )),
        None => None,
    };

    let fetcher = HttpFetcher::new(config.timeout).context("cannot build HTTP client")?;
    let env = PipelineEnv {
        fetcher: Arc::new(fetcher),
        store: Arc::new(FsStore::new()),
        comics_dir,
        index_dir,
        links,
    };

    let threads = args.threads.unwrap_or(config.threads);
    let dispatcher = Dispatcher::new(env, threads)?;

    #[cfg(unix)]
    spawn_status_dump(dispatcher.status_board());

    let summary = dispatcher.run(config.comics, &ctx).await;

    // Final summary is plain output, independent of the log level.
    if summary.skipped > 0 {
        println!(
            "Got {} of {} (Skipped {})",
            summary.got, summary.total, summary.skipped
        );
    } else {
        println!("Got {} of {}", summary.got, summary.total);
    }
    for miss in &summary.misses {
        println!("  {} ({})", miss.url, miss.output_name);
    }

    Ok(())
}

fn default_comics_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join("comics"))
}

/// Dumps every queued or in-flight comic when the process receives SIGUSR1,
/// without blocking any pipeline.
#[cfg(unix)]
fn spawn_status_dump(board: Arc<stripfetch::StatusBoard>) {
    use stripfetch::FetchState;
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let Ok(mut usr1) = signal(SignalKind::user_defined1()) else {
            warn!("could not install SIGUSR1 handler");
            return;
        };
        while usr1.recv().await.is_some() {
            println!("Current state:");
            for (_, status) in board.snapshot() {
                match status.state {
                    FetchState::Queued => println!("  Queued  {}", status.url),
                    FetchState::Fetching | FetchState::Extracting => {
                        println!("  Running {}", status.url);
                    }
                    FetchState::Done | FetchState::Failed => {}
                }
            }
        }
    });
}
