//! Magnet metadata probing over the BitTorrent DHT
//!
//! This crate provides:
//! - Keyword filtering of magnet lists
//! - Concurrent metadata resolution with a per-magnet timeout
//! - A librqbit-backed metadata source (DHT + metadata exchange, nothing downloaded)
//! - Largest-file reporting for every resolved torrent

#![allow(clippy::missing_inline_in_public_items)]

pub mod barrier;
pub mod config;
pub mod input;
pub mod keywords;
pub mod magnet;
pub mod metadata;
pub mod orchestrator;
pub mod report;
pub mod session;
pub mod source;

pub use barrier::{BarrierGuard, CompletionBarrier};
pub use keywords::{matches, KeywordSet};
pub use magnet::{Identifier, MagnetLink};
pub use metadata::{FileEntry, Metadata};
pub use orchestrator::{Orchestrator, Outcome, ResolutionResult, ResolutionSummary, ResolverConfig};
pub use report::{largest_file, Report};
pub use session::RqbitSource;
pub use source::{MetadataSource, PendingMetadata, SourceError};
