//! Per-group candidate resolution
//!
//! Candidates are judged strictly in first-seen order: the earliest listed
//! reachable candidate wins even when a later one answers first. Up to
//! `lookahead` candidates are probed at once to hide latency.
//!
//! Each candidate probe runs as its own task holding owned copies of what it
//! needs. Once a winner is known the group's cancellation token fires; probes
//! still in flight stop at their next retry boundary and whatever they
//! eventually produce is dropped unread.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::prober::LivenessProber;
use crate::models::{Group, ProbeOutcome, ResolvedChannel};
use crate::utils::display_host;

/// What resolving one group produced
#[derive(Debug, Clone)]
pub struct GroupResolution {
    /// Winning channel, `None` when every candidate failed
    pub channel: Option<ResolvedChannel>,
    /// Probe attempts of the settled probes
    pub attempts: u64,
    /// Candidates whose outcome was awaited
    pub probed: usize,
}

impl GroupResolution {
    fn dropped(attempts: u64, probed: usize) -> Self {
        Self {
            channel: None,
            attempts,
            probed,
        }
    }
}

/// Drives the prober over one group's candidates
#[derive(Clone)]
pub struct GroupResolver {
    prober: Arc<LivenessProber>,
    lookahead: usize,
}

impl GroupResolver {
    pub fn new(prober: Arc<LivenessProber>, lookahead: usize) -> Self {
        Self {
            prober,
            lookahead: lookahead.max(1),
        }
    }

    pub fn prober(&self) -> &Arc<LivenessProber> {
        &self.prober
    }

    /// Resolve `group` to its first reachable candidate
    pub async fn resolve(
        &self,
        group: &Group,
        timeout: Duration,
        max_retries: u32,
    ) -> GroupResolution {
        let total = group.candidates.len();
        if total == 0 {
            tracing::debug!(index = group.first_seen_index, "Group has no candidates");
            return GroupResolution::dropped(0, 0);
        }

        let cancel = CancellationToken::new();
        let mut in_flight = FuturesUnordered::new();
        let mut outcomes: Vec<Option<ProbeOutcome>> = vec![None; total];
        let mut next_launch = 0;
        let mut next_decide = 0;
        let mut attempts = 0u64;
        let mut probed = 0usize;

        loop {
            while next_decide < total {
                match &outcomes[next_decide] {
                    Some(outcome) if outcome.is_reachable => {
                        cancel.cancel();
                        let channel = self.winner(group, next_decide);
                        tracing::debug!(
                            channel = ?group.channel_id(),
                            candidate = next_decide,
                            host = %display_host(&channel.winning_location),
                            "Group resolved"
                        );
                        return GroupResolution {
                            channel: Some(channel),
                            attempts,
                            probed,
                        };
                    }
                    Some(_) => next_decide += 1,
                    None => break,
                }
            }

            if next_decide == total {
                tracing::warn!(
                    channel = ?group.channel_id(),
                    name = %group.first_seen_entry.display_name,
                    candidates = total,
                    "No working location for channel"
                );
                return GroupResolution::dropped(attempts, probed);
            }

            while next_launch < total && next_launch < next_decide + self.lookahead {
                let index = next_launch;
                let location = group.candidates[index].location.clone();
                let prober = Arc::clone(&self.prober);
                let token = cancel.clone();

                let handle = tokio::spawn(async move {
                    prober.probe(&location, timeout, max_retries, &token).await
                });
                in_flight.push(async move { (index, handle.await) });
                next_launch += 1;
            }

            let Some((index, joined)) = in_flight.next().await else {
                return GroupResolution::dropped(attempts, probed);
            };

            probed += 1;
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(candidate = index, error = %e, "Probe task failed");
                    ProbeOutcome {
                        location: group.candidates[index].location.clone(),
                        is_reachable: false,
                        attempt_count: 0,
                        elapsed: Duration::ZERO,
                        status: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            attempts += u64::from(outcome.attempt_count);
            outcomes[index] = Some(outcome);
        }
    }

    fn winner(&self, group: &Group, index: usize) -> ResolvedChannel {
        let entry = &group.first_seen_entry;
        let candidate = &group.candidates[index];

        ResolvedChannel {
            channel_id: group.channel_id().map(str::to_string),
            display_name: entry.display_name.clone(),
            duration: entry.duration.clone(),
            attributes: entry.attributes.clone(),
            options: entry.options.clone(),
            winning_location: candidate.location.clone(),
            source_tag: candidate.source_tag.clone(),
            first_seen_index: group.first_seen_index,
            candidate_count: group.candidates.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::link::LinkCheck;
    use crate::checker::prober::ProbeSlots;
    use crate::models::{Attribute, Candidate, Entry, GroupKey};
    use crate::utils::error::ProbeError;
    use crate::utils::retry::RetryConfig;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Location -> (reachable, delay)
    struct Table {
        routes: HashMap<String, (bool, Duration)>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LinkCheck for Table {
        async fn check(&self, location: &str, _timeout: Duration) -> Result<Option<u16>, ProbeError> {
            self.calls.lock().unwrap().push(location.to_string());
            let (up, delay) = self.routes.get(location).copied().unwrap_or((false, Duration::ZERO));
            tokio::time::sleep(delay).await;
            if up {
                Ok(Some(200))
            } else {
                Err(ProbeError::Status(503))
            }
        }
    }

    fn resolver(routes: &[(&str, bool, u64)], lookahead: usize) -> (GroupResolver, Arc<Table>) {
        let table = Arc::new(Table {
            routes: routes
                .iter()
                .map(|(l, up, ms)| (l.to_string(), (*up, Duration::from_millis(*ms))))
                .collect(),
            calls: Mutex::new(Vec::new()),
        });
        let prober = LivenessProber::new(
            Arc::clone(&table) as Arc<dyn LinkCheck>,
            ProbeSlots::new(8),
            RetryConfig::with_delays(0, 10, 10),
        );
        (GroupResolver::new(Arc::new(prober), lookahead), table)
    }

    fn group(locations: &[(&str, &str)]) -> Group {
        Group {
            key: GroupKey::Channel("A".into()),
            first_seen_entry: Entry {
                channel_id: Some("A".into()),
                display_name: "Channel A".into(),
                duration: Some("-1".into()),
                attributes: vec![Attribute::quoted("group-title", "News")],
                location: locations[0].0.to_string(),
                source_tag: locations[0].1.to_string(),
                ..Default::default()
            },
            candidates: locations
                .iter()
                .map(|(l, s)| Candidate {
                    location: l.to_string(),
                    source_tag: s.to_string(),
                })
                .collect(),
            first_seen_index: 3,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_earliest_working_candidate_wins() {
        let (resolver, _) = resolver(
            &[("http://a/", false, 50), ("http://b/", true, 300), ("http://c/", true, 10)],
            3,
        );
        let g = group(&[("http://a/", "pk"), ("http://b/", "in"), ("http://c/", "global")]);

        let resolution = resolver.resolve(&g, Duration::from_secs(5), 0).await;
        let channel = resolution.channel.expect("group should resolve");
        assert_eq!(channel.winning_location, "http://b/");
        assert_eq!(channel.source_tag, "in");
        assert_eq!(channel.first_seen_index, 3);
        assert_eq!(channel.display_name, "Channel A");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_probing_stops_at_winner() {
        let (resolver, table) = resolver(
            &[("http://a/", true, 10), ("http://b/", true, 10)],
            1,
        );
        let g = group(&[("http://a/", "pk"), ("http://b/", "pk")]);

        let resolution = resolver.resolve(&g, Duration::from_secs(5), 0).await;
        assert_eq!(
            resolution.channel.unwrap().winning_location,
            "http://a/"
        );
        assert_eq!(*table.calls.lock().unwrap(), vec!["http://a/".to_string()]);
        assert_eq!(resolution.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_candidates_down_drops_group() {
        let (resolver, table) = resolver(
            &[("http://a/", false, 5), ("http://b/", false, 5), ("http://c/", false, 5)],
            2,
        );
        let g = group(&[("http://a/", "pk"), ("http://b/", "pk"), ("http://c/", "in")]);

        let resolution = resolver.resolve(&g, Duration::from_secs(5), 0).await;
        assert!(resolution.channel.is_none());
        assert_eq!(resolution.probed, 3);
        assert_eq!(table.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_group_is_dropped_without_probing() {
        let (resolver, table) = resolver(&[], 2);
        let mut g = group(&[("http://a/", "pk")]);
        g.candidates.clear();

        let resolution = resolver.resolve(&g, Duration::from_secs(5), 0).await;
        assert!(resolution.channel.is_none());
        assert!(table.calls.lock().unwrap().is_empty());
    }
}
