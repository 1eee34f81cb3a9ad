//! The fetch side of the pipeline: HTTP capability, per-comic state machine,
//! and the bounded dispatcher.
//!
//! - [`Fetcher`] - async trait over HTTP GET, mockable in tests
//! - [`HttpFetcher`] - reqwest-backed implementation with a per-request deadline
//! - [`pipeline`] - the two-stage fetch/extract/store sequence for one comic
//! - [`Dispatcher`] - runs pipelines under a concurrency limit and aggregates
//!   counters
//! - [`StatusBoard`] - lock-protected per-comic state table backing the
//!   on-demand status dump

mod client;
mod dispatcher;
mod error;
pub mod pipeline;

pub use client::{DEFAULT_FETCH_TIMEOUT, FetchResponse, Fetcher, HttpFetcher};
pub use dispatcher::{
    ComicStatus, DEFAULT_CONCURRENCY, DispatchError, Dispatcher, Miss, RunSummary, StatusBoard,
};
pub use error::FetchError;
pub use pipeline::{FetchState, Outcome, PipelineEnv, Stage};
