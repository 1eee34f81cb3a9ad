//! Stripfetch Core Library
//!
//! This library fetches a configured set of web comics, optionally follows an
//! embedded-image link extracted from each landing page, classifies the
//! downloaded bytes by magic signature, and writes each result to disk under
//! a per-comic name.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - JSON-with-comments config loading and validation
//! - [`comic`] - Per-comic immutable specs built from config entries
//! - [`schedule`] - Run date context and the weekday skip gate
//! - [`fetch`] - HTTP fetch trait, two-stage pipeline, and the bounded dispatcher
//! - [`resolver`] - Relative/protocol-relative URL resolution for stage two
//! - [`sniff`] - Magic-byte content classification for output naming
//! - [`store`] - File-write trait and the links-only output sink

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod comic;
pub mod config;
pub mod fetch;
pub mod resolver;
pub mod schedule;
pub mod sniff;
pub mod store;

// Re-export commonly used types
pub use comic::ComicSpec;
pub use config::{Config, ConfigError};
pub use fetch::{
    DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT, DispatchError, Dispatcher, FetchError,
    FetchResponse, FetchState, Fetcher, HttpFetcher, Outcome, PipelineEnv, RunSummary, Stage,
    StatusBoard,
};
pub use schedule::RunContext;
pub use store::{FsStore, LinkSink, Store, StoreError};
