//! Cross-file channel grouping
//!
//! Entries that share a `tvg-id` collapse into one [`Group`] whose
//! candidates are the distinct locations in first-seen order. Entries
//! without identity stay on their own.

use std::collections::{HashMap, HashSet};

use crate::models::{Candidate, Entry, Group, GroupKey};

/// Group entries by channel identity
///
/// `entries` must be the concatenation of all inputs in processing order.
/// Group order follows the first appearance of each identity.
pub fn group_entries(entries: &[Entry]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut seen_locations: Vec<HashSet<String>> = Vec::new();

    for (entry_index, entry) in entries.iter().enumerate() {
        let candidate = Candidate {
            location: entry.location.clone(),
            source_tag: entry.source_tag.clone(),
        };

        if let Some(id) = entry.identity() {
            if let Some(&slot) = by_id.get(id) {
                if seen_locations[slot].insert(entry.location.clone()) {
                    groups[slot].candidates.push(candidate);
                }
                continue;
            }
            by_id.insert(id.to_string(), groups.len());
        }

        let key = match entry.identity() {
            Some(id) => GroupKey::Channel(id.to_string()),
            None => GroupKey::Anonymous(entry_index),
        };

        seen_locations.push(HashSet::from([entry.location.clone()]));
        groups.push(Group {
            key,
            first_seen_entry: entry.clone(),
            candidates: vec![candidate],
            first_seen_index: groups.len(),
        });
    }

    groups
}

/// Drop groups whose identity is in `excluded`, returning how many were removed
///
/// Surviving groups keep their `first_seen_index`, so output order is
/// unaffected by the filter.
pub fn exclude_identities(groups: &mut Vec<Group>, excluded: &HashSet<String>) -> usize {
    if excluded.is_empty() {
        return 0;
    }

    let before = groups.len();
    groups.retain(|g| g.channel_id().map_or(true, |id| !excluded.contains(id)));
    before - groups.len()
}
