// Core data structures for the playlist checker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// How an EXTINF attribute was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AttributeStyle {
    /// `key="value"`
    #[default]
    Quoted,
    /// `key=value`
    Bare,
    /// A lone token with no `=`
    Flag,
}

/// One EXTINF attribute, kept as written so it renders back unchanged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
    pub style: AttributeStyle,
}

impl Attribute {
    pub fn quoted(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            style: AttributeStyle::Quoted,
        }
    }

    pub fn bare(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            style: AttributeStyle::Bare,
        }
    }

    pub fn flag(token: impl Into<String>) -> Self {
        Self {
            key: token.into(),
            value: String::new(),
            style: AttributeStyle::Flag,
        }
    }

    /// Replace the value, quoting it when the old form can no longer hold it
    pub fn set_value(&mut self, value: String) {
        let needs_quotes = value.is_empty()
            || value.contains(|c: char| c.is_whitespace() || c == ',' || c == '"');
        if self.style == AttributeStyle::Flag
            || (self.style == AttributeStyle::Bare && needs_quotes)
        {
            self.style = AttributeStyle::Quoted;
        }
        self.value = value;
    }
}

/// One playlist record as produced by the parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Entry {
    /// Cross-file identity (`tvg-id`), trimmed; `None` when absent or blank
    pub channel_id: Option<String>,
    pub display_name: String,
    /// EXTINF duration field; `None` when the record had no EXTINF line
    pub duration: Option<String>,
    /// EXTINF attributes in source order
    pub attributes: Vec<Attribute>,
    /// Option lines (`#EXTVLCOPT:...`) kept verbatim
    pub options: Vec<String>,
    pub location: String,
    /// Originating input file (file stem)
    pub source_tag: String,
}

impl Entry {
    /// Look up an attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key && a.style != AttributeStyle::Flag)
            .map(|a| a.value.as_str())
    }

    /// Normalized identity key, if any
    pub fn identity(&self) -> Option<&str> {
        self.channel_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// One backup location of a channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub location: String,
    pub source_tag: String,
}

/// Key a group is stored under
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    /// Normalized channel identity
    Channel(String),
    /// Synthetic key for an entry without identity (its global entry index)
    Anonymous(usize),
}

/// All candidates for one logical channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub key: GroupKey,
    /// Entry whose metadata is authoritative for display fields
    pub first_seen_entry: Entry,
    /// Distinct locations in first-seen order across all inputs
    pub candidates: Vec<Candidate>,
    /// Position among all groups
    pub first_seen_index: usize,
}

impl Group {
    pub fn channel_id(&self) -> Option<&str> {
        match &self.key {
            GroupKey::Channel(id) => Some(id),
            GroupKey::Anonymous(_) => None,
        }
    }

    /// Whether candidates come from more than one input file
    pub fn spans_sources(&self) -> bool {
        let sources: HashSet<&str> = self
            .candidates
            .iter()
            .map(|c| c.source_tag.as_str())
            .collect();
        sources.len() > 1
    }
}

/// Result of probing one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub location: String,
    pub is_reachable: bool,
    pub attempt_count: u32,
    pub elapsed: Duration,
    /// Status code of the deciding response, when there was one
    pub status: Option<u16>,
    /// Last failure, for logs
    pub error: Option<String>,
}

/// One output channel with its winning location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedChannel {
    pub channel_id: Option<String>,
    pub display_name: String,
    pub duration: Option<String>,
    /// Attributes of the first-seen entry, `group-title` attributed to the winning source
    pub attributes: Vec<Attribute>,
    pub options: Vec<String>,
    pub winning_location: String,
    /// Source of the winning candidate
    pub source_tag: String,
    pub first_seen_index: usize,
    /// Number of candidates the group offered
    pub candidate_count: usize,
}

/// Shape of the grouped input, reported before probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GroupingSummary {
    /// Groups keyed by a channel identity
    pub identified: usize,
    /// Entries without identity (singleton groups)
    pub anonymous: usize,
    /// Groups with more than one candidate
    pub with_backups: usize,
    /// Groups whose candidates come from several input files
    pub cross_source: usize,
}

impl GroupingSummary {
    pub fn from_groups(groups: &[Group]) -> Self {
        let mut summary = Self::default();
        for group in groups {
            match group.key {
                GroupKey::Channel(_) => summary.identified += 1,
                GroupKey::Anonymous(_) => summary.anonymous += 1,
            }
            if group.candidates.len() > 1 {
                summary.with_backups += 1;
            }
            if group.spans_sources() {
                summary.cross_source += 1;
            }
        }
        summary
    }
}

/// Run-level statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    /// Entries read from all inputs
    pub total_entries: usize,
    /// Groups submitted for resolution (after exclusion)
    pub total_groups: usize,
    /// Groups removed by the exclusion filter
    pub excluded: usize,
    pub resolved: usize,
    /// Groups with no reachable candidate
    pub dropped: usize,
    /// Probe attempts issued
    pub probes: u64,
    pub elapsed_secs: f64,
    pub grouping: GroupingSummary,
}

impl RunStats {
    pub fn new(total_groups: usize) -> Self {
        Self {
            started_at: Utc::now(),
            total_entries: 0,
            total_groups,
            excluded: 0,
            resolved: 0,
            dropped: 0,
            probes: 0,
            elapsed_secs: 0.0,
            grouping: GroupingSummary::default(),
        }
    }

    /// Share of groups that resolved, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_groups == 0 {
            return 0.0;
        }
        self.resolved as f64 / self.total_groups as f64 * 100.0
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_secs.max(0.0))
    }
}
