//! playcheck - M3U playlist consolidation and verification
//!
//! Merges several M3U playlists, groups their entries by channel identity
//! (`tvg-id`), probes every backup location of a channel in listed order and
//! keeps the first one that answers. The result is one working playlist with
//! each channel attributed to the source its stream came from.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`playlist`] - M3U parsing, rendering and file discovery
//! - [`checker`] - Grouping, liveness probing and consolidation
//! - [`models`] - Core data structures and types
//! - [`metrics`] - Prometheus counters for probes and groups
//! - [`server`] - HTTP server handing finished playlists to players
//! - [`utils`] - Common utilities, domain errors and retry/backoff
//!
//! # Example
//!
//! ```no_run
//! use playcheck::config::Config;
//! use playcheck::playlist::read_playlist;
//! use std::collections::HashSet;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let parsed = read_playlist(Path::new("pk.m3u"))?;
//!     let (channels, stats) = playcheck::run(&parsed.entries, &HashSet::new(), &config).await?;
//!     println!("{} of {} channels working", channels.len(), stats.total_groups);
//!     Ok(())
//! }
//! ```

pub mod checker;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod playlist;
pub mod server;
pub mod utils;

use std::collections::HashSet;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::checker::{Consolidation, Consolidator, LinkCheck};
    pub use crate::config::{Config, ProbePolicy, SourcePrefixes};
    pub use crate::error::{Error, ErrorCategory, ErrorClass, Result};
    pub use crate::models::{
        Attribute, Candidate, Entry, Group, ProbeOutcome, ResolvedChannel, RunStats,
    };
}

// Direct re-exports for convenience
pub use models::{Attribute, Entry, ResolvedChannel, RunStats};

/// Consolidate `entries` into working channels
///
/// Entries must be the concatenation of all inputs in processing order.
/// Returns the resolved channels in first-seen order together with run
/// statistics; only configuration and infrastructure failures are errors.
pub async fn run(
    entries: &[Entry],
    excluded: &HashSet<String>,
    config: &config::Config,
) -> error::Result<(Vec<ResolvedChannel>, RunStats)> {
    let result = checker::check_entries(entries, excluded, config).await?;
    Ok((result.channels, result.stats))
}
