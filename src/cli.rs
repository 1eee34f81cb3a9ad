//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch a configured set of web comics.
///
/// Reads a JSON-with-comments config describing each comic (URL template,
/// optional image-extraction regexp, weekday skip calendar) and downloads
/// today's strips concurrently.
#[derive(Parser, Debug)]
#[command(name = "stripfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Comics output directory (overrides the config's directory)
    #[arg(short = 'd', long)]
    pub directory: Option<PathBuf>,

    /// Directory for failed-extraction debug pages (defaults to the comics directory)
    #[arg(short = 'i', long)]
    pub index_dir: Option<PathBuf>,

    /// Record resolved links to this file instead of downloading
    #[arg(short = 'l', long)]
    pub links: Option<PathBuf>,

    /// Remove previously fetched files before running
    #[arg(short = 'c', long)]
    pub clean: bool,

    /// Maximum concurrent fetches (overrides the config's threads)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Config file
    #[arg(default_value = "comics.json")]
    pub config: PathBuf,
}
