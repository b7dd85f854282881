use anyhow::{Context, Result};
use std::path::PathBuf;

use playcheck::checker::group_entries;
use playcheck::models::GroupingSummary;
use playcheck::playlist::discover_playlists;

use super::check::load_entries;

/// Parse and group the input without probing anything
pub fn inspect(input: PathBuf) -> Result<()> {
    let files = discover_playlists(&input)
        .with_context(|| format!("Failed to open input {}", input.display()))?;
    let entries = load_entries(&files)?;
    let groups = group_entries(&entries);
    let summary = GroupingSummary::from_groups(&groups);

    println!("Playlist Overview");
    println!("=================");
    println!("Files: {}", files.len());
    println!("Entries: {}", entries.len());
    println!("Unique channels: {}", summary.identified);
    println!("Entries without tvg-id: {}", summary.anonymous);
    println!("Channels with backups: {}", summary.with_backups);
    println!("Channels spanning files: {}", summary.cross_source);

    let candidates: usize = groups.iter().map(|g| g.candidates.len()).sum();
    println!("Locations to check: {candidates}");

    Ok(())
}
