//! The two-stage fetch/extract/store sequence for one comic.
//!
//! Each comic runs through `Queued -> Fetching -> (Extracting ->
//! Fetching)? -> Done | Failed`. Stage one fetches the landing page; if the
//! spec carries an extraction pattern, the matched fragment is resolved into
//! an absolute URL and stage two fetches the image itself. Every terminal
//! path produces exactly one [`Outcome`], and a failure in one comic never
//! leaks into another.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::client::Fetcher;
use super::dispatcher::StatusBoard;
use crate::comic::ComicSpec;
use crate::store::{LinkSink, Store};
use crate::{resolver, sniff};

/// Which fetch a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Stage one: the comic's landing page.
    Page,
    /// Stage two: the resolved embedded-image URL.
    Image,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// Terminal result of one comic's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Output written (or link recorded, in links-only mode).
    Fetched,
    /// The landing page did not match the extraction pattern; a debug copy
    /// of the page was saved.
    ExtractionFailed,
    /// A fetch failed. `status` is the non-200 HTTP status, or `None` when
    /// the request produced no response at all (timeout, connection error).
    HttpError {
        /// The stage that failed.
        stage: Stage,
        /// HTTP status, if a response arrived.
        status: Option<u16>,
    },
    /// The output file could not be written.
    WriteError,
}

impl Outcome {
    /// Returns true iff this outcome counts toward the run's `got` total.
    #[must_use]
    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched)
    }
}

/// Observable state of one comic's pipeline, readable at any time through
/// the [`StatusBoard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Waiting for a concurrency slot.
    Queued,
    /// Slot held, a network call is outstanding.
    Fetching,
    /// Stage-one body in hand, running the extraction pattern.
    Extracting,
    /// Finished successfully.
    Done,
    /// Finished with any non-fetched outcome.
    Failed,
}

/// Everything a pipeline touches besides its own spec. Built once per run
/// and shared read-only across all pipelines.
pub struct PipelineEnv {
    /// HTTP capability.
    pub fetcher: Arc<dyn Fetcher>,
    /// File-write capability.
    pub store: Arc<dyn Store>,
    /// Where fetched comics land.
    pub comics_dir: PathBuf,
    /// Where failed-extraction debug pages land (often the same directory).
    pub index_dir: PathBuf,
    /// When set, resolved URLs are appended here instead of fetched.
    pub links: Option<Arc<LinkSink>>,
}

/// Runs one comic to a terminal state, publishing progress to `board`.
pub async fn run(env: &PipelineEnv, spec: &ComicSpec, board: &StatusBoard) -> Outcome {
    board.set_state(spec.id, FetchState::Fetching);
    let outcome = run_stages(env, spec, board).await;
    let terminal = if outcome.is_fetched() {
        FetchState::Done
    } else {
        FetchState::Failed
    };
    board.set_state(spec.id, terminal);
    outcome
}

async fn run_stages(env: &PipelineEnv, spec: &ComicSpec, board: &StatusBoard) -> Outcome {
    let page = match env.fetcher.fetch(&spec.url, spec.referer.as_deref()).await {
        Ok(page) => page,
        Err(e) => {
            error!(url = %spec.url, error = %e, "page fetch failed");
            return Outcome::HttpError {
                stage: Stage::Page,
                status: None,
            };
        }
    };
    if !page.is_success() {
        error!(url = %spec.url, status = page.status, "page fetch returned error status");
        return Outcome::HttpError {
            stage: Stage::Page,
            status: Some(page.status),
        };
    }

    let Some(regexp) = &spec.regexp else {
        // The landing page IS the comic.
        if let Some(links) = &env.links {
            return append_link(links, &spec.url);
        }
        return write_output(env, spec, &page.body).await;
    };

    board.set_state(spec.id, FetchState::Extracting);
    let text = page.text();
    let fragment = regexp
        .captures(&text)
        .and_then(|caps| caps.get(spec.capture_index))
        .map(|m| m.as_str().to_string());

    let Some(fragment) = fragment else {
        warn!(url = %spec.url, "page did not match extraction pattern");
        save_debug_page(env, spec, &page.body).await;
        return Outcome::ExtractionFailed;
    };
    debug!(url = %spec.url, fragment, "extracted image link");

    let image_url = resolver::resolve(&fragment, spec);
    if let Some(links) = &env.links {
        return append_link(links, &image_url);
    }

    board.set_state(spec.id, FetchState::Fetching);
    let image = match env.fetcher.fetch(&image_url, spec.referer.as_deref()).await {
        Ok(image) => image,
        Err(e) => {
            error!(url = %image_url, error = %e, "image fetch failed");
            return Outcome::HttpError {
                stage: Stage::Image,
                status: None,
            };
        }
    };
    if !image.is_success() {
        error!(url = %image_url, status = image.status, "image fetch returned error status");
        return Outcome::HttpError {
            stage: Stage::Image,
            status: Some(image.status),
        };
    }

    write_output(env, spec, &image.body).await
}

/// Writes the comic bytes under the spec's output name plus the sniffed
/// extension.
async fn write_output(env: &PipelineEnv, spec: &ComicSpec, bytes: &[u8]) -> Outcome {
    let filename = format!("{}{}", spec.output_name, sniff::classify(bytes));
    match env.store.write(&env.comics_dir, &filename, bytes).await {
        Ok(()) => {
            info!(url = %spec.url, filename, bytes = bytes.len(), "comic written");
            Outcome::Fetched
        }
        Err(e) => {
            error!(error = %e, "output write failed");
            Outcome::WriteError
        }
    }
}

/// Saves the unmatched landing page for debugging, ASCII-sanitized so the
/// artifact is greppable regardless of the page's encoding. Best effort: a
/// failure here doesn't change the extraction-failed outcome.
async fn save_debug_page(env: &PipelineEnv, spec: &ComicSpec, body: &[u8]) {
    let ascii: Vec<u8> = body.iter().copied().filter(u8::is_ascii).collect();
    let filename = format!("{}.html", spec.output_name);
    if let Err(e) = env.store.write(&env.index_dir, &filename, &ascii).await {
        warn!(error = %e, "could not save debug page");
    }
}

fn append_link(links: &LinkSink, url: &str) -> Outcome {
    match links.append(url) {
        Ok(()) => {
            info!(url, "link recorded");
            Outcome::Fetched
        }
        Err(e) => {
            error!(url, error = %e, "could not record link");
            Outcome::WriteError
        }
    }
}
