//! Playlist consolidation engine
//!
//! Pipeline: [`grouper`] collapses entries from every input into channel
//! groups, the optional exclusion filter removes groups already covered
//! elsewhere, and the [`orchestrator`] resolves the rest concurrently through
//! the [`resolver`] and [`prober`], returning one working location per
//! channel in first-seen order.

pub mod attribution;
pub mod grouper;
pub mod link;
pub mod orchestrator;
pub mod prober;
pub mod resolver;

pub use attribution::{apply_source_prefix, attribute_group_title, prefixed_title};
pub use grouper::{exclude_identities, group_entries};
pub use link::{classify_status, HttpLinkChecker, LinkCheck};
pub use orchestrator::{Consolidation, Consolidator};
pub use prober::{LivenessProber, ProbeSlots};
pub use resolver::{GroupResolution, GroupResolver};

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::metrics;
use crate::models::Entry;

/// Group, filter and resolve `entries` with a network checker
///
/// `excluded` holds channel identities to drop before probing.
pub async fn check_entries(
    entries: &[Entry],
    excluded: &HashSet<String>,
    config: &Config,
) -> Result<Consolidation> {
    let consolidator = Consolidator::from_config(config)?;
    run_consolidation(&consolidator, entries, excluded).await
}

/// Same as [`check_entries`] with a caller-supplied [`LinkCheck`]
pub async fn check_entries_with(
    entries: &[Entry],
    excluded: &HashSet<String>,
    config: &Config,
    checker: Arc<dyn LinkCheck>,
) -> Result<Consolidation> {
    let consolidator = Consolidator::with_checker(config, checker)?;
    run_consolidation(&consolidator, entries, excluded).await
}

async fn run_consolidation(
    consolidator: &Consolidator,
    entries: &[Entry],
    excluded: &HashSet<String>,
) -> Result<Consolidation> {
    let mut groups = group_entries(entries);
    let excluded_count = exclude_identities(&mut groups, excluded);
    if excluded_count > 0 {
        tracing::info!(excluded = excluded_count, "Skipped channels already present elsewhere");
        metrics::record_groups(0, 0, excluded_count);
    }

    let mut result = consolidator.consolidate(groups).await?;
    result.stats.total_entries = entries.len();
    result.stats.excluded = excluded_count;
    Ok(result)
}
