//! In-process stream log with consumer groups.
//!
//! Mirrors the subset of Redis stream semantics the fulfillment queue relies
//! on: monotonically increasing `ms-seq` ids, per-group delivery cursors, and
//! per-group pending lists with ownership and idle tracking.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Bound;
use std::str::FromStr;
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::StreamFields;
use crate::domain::ports::StreamMessage;

/// Stream entry id, ordered numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(super) struct EntryId {
    millis: u64,
    seq: u64,
}

impl EntryId {
    const ZERO: Self = Self { millis: 0, seq: 0 };
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

impl FromStr for EntryId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (millis, seq) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid stream id {s:?}"))?;
        Ok(Self {
            millis: millis
                .parse()
                .map_err(|_| format!("invalid stream id {s:?}"))?,
            seq: seq
                .parse()
                .map_err(|_| format!("invalid stream id {s:?}"))?,
        })
    }
}

#[derive(Debug, Clone)]
struct PendingEntry {
    consumer: String,
    delivered_at: Instant,
}

#[derive(Debug, Default)]
struct Group {
    last_delivered: Option<EntryId>,
    pending: BTreeMap<EntryId, PendingEntry>,
}

/// One stream with its consumer groups.
#[derive(Debug, Default)]
pub(super) struct StreamLog {
    entries: BTreeMap<EntryId, StreamFields>,
    last_id: Option<EntryId>,
    groups: HashMap<String, Group>,
}

impl StreamLog {
    /// Append an entry stamped with `now_millis`, keeping ids increasing.
    pub(super) fn append(&mut self, now_millis: u64, fields: StreamFields) -> EntryId {
        let id = match self.last_id {
            Some(last) if now_millis <= last.millis => EntryId {
                millis: last.millis,
                seq: last.seq + 1,
            },
            _ => EntryId {
                millis: now_millis,
                seq: 0,
            },
        };
        self.entries.insert(id, fields);
        self.last_id = Some(id);
        id
    }

    /// Create a group reading from the beginning. Returns `false` if it
    /// already existed.
    pub(super) fn create_group(&mut self, group: &str) -> bool {
        if self.groups.contains_key(group) {
            return false;
        }
        self.groups.insert(group.to_owned(), Group::default());
        true
    }

    pub(super) fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Deliver up to `count` never-delivered entries, marking them pending.
    pub(super) fn deliver_new(
        &mut self,
        group: &str,
        consumer: &str,
        count: usize,
        now: Instant,
    ) -> Vec<StreamMessage> {
        let Some(state) = self.groups.get_mut(group) else {
            return Vec::new();
        };
        let lower = match state.last_delivered {
            Some(id) => Bound::Excluded(id),
            None => Bound::Included(EntryId::ZERO),
        };
        let mut delivered = Vec::new();
        for (id, fields) in self
            .entries
            .range((lower, Bound::Unbounded))
            .take(count.max(1))
        {
            state.last_delivered = Some(*id);
            state.pending.insert(
                *id,
                PendingEntry {
                    consumer: consumer.to_owned(),
                    delivered_at: now,
                },
            );
            delivered.push(StreamMessage {
                id: id.to_string(),
                fields: fields.clone(),
            });
        }
        delivered
    }

    /// Remove an entry from a group's pending list.
    pub(super) fn ack(&mut self, group: &str, id: EntryId) {
        if let Some(state) = self.groups.get_mut(group) {
            state.pending.remove(&id);
        }
    }

    /// Transfer pending entries idle for at least `min_idle` to `consumer`.
    pub(super) fn claim_idle(
        &mut self,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        count: usize,
        now: Instant,
    ) -> Vec<StreamMessage> {
        let Some(state) = self.groups.get_mut(group) else {
            return Vec::new();
        };
        let mut claimed = Vec::new();
        let mut dangling = Vec::new();
        for (id, pending) in &mut state.pending {
            if claimed.len() >= count.max(1) {
                break;
            }
            if now.saturating_duration_since(pending.delivered_at) < min_idle {
                continue;
            }
            match self.entries.get(id) {
                Some(fields) => {
                    pending.consumer = consumer.to_owned();
                    pending.delivered_at = now;
                    claimed.push(StreamMessage {
                        id: id.to_string(),
                        fields: fields.clone(),
                    });
                }
                None => dangling.push(*id),
            }
        }
        for id in dangling {
            state.pending.remove(&id);
        }
        claimed
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn entries(&self) -> Vec<StreamMessage> {
        self.entries
            .iter()
            .map(|(id, fields)| StreamMessage {
                id: id.to_string(),
                fields: fields.clone(),
            })
            .collect()
    }

    pub(super) fn pending_count(&self, group: &str) -> usize {
        self.groups
            .get(group)
            .map_or(0, |state| state.pending.len())
    }

    /// Owner of a pending entry.
    pub(super) fn pending_owner(&self, group: &str, id: EntryId) -> Option<&str> {
        self.groups
            .get(group)
            .and_then(|state| state.pending.get(&id))
            .map(|pending| pending.consumer.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn fields(n: u32) -> StreamFields {
        StreamFields::from([("n".to_owned(), n.to_string())])
    }

    #[fixture]
    fn log() -> StreamLog {
        let mut log = StreamLog::default();
        log.create_group("g");
        for n in 0..3 {
            log.append(1_000, fields(n));
        }
        log
    }

    #[rstest]
    fn ids_increase_within_one_millisecond(log: StreamLog) {
        let ids: Vec<String> = log.entries().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["1000-0", "1000-1", "1000-2"]);
    }

    #[rstest]
    fn ids_sort_numerically() {
        let nine: EntryId = "5-9".parse().expect("valid id");
        let ten: EntryId = "5-10".parse().expect("valid id");
        assert!(nine < ten);
    }

    #[rstest]
    fn delivery_advances_the_group_cursor(mut log: StreamLog) {
        let now = Instant::now();
        let first = log.deliver_new("g", "c1", 2, now);
        let second = log.deliver_new("g", "c2", 10, now);
        let third = log.deliver_new("g", "c1", 10, now);

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert!(third.is_empty());
        assert_eq!(log.pending_count("g"), 3);
    }

    #[rstest]
    fn new_groups_start_from_the_beginning(mut log: StreamLog) {
        assert!(log.create_group("late"));
        assert!(!log.create_group("late"));
        assert_eq!(log.deliver_new("late", "c", 10, Instant::now()).len(), 3);
    }

    #[rstest]
    fn ack_clears_pending(mut log: StreamLog) {
        let delivered = log.deliver_new("g", "c1", 1, Instant::now());
        let id: EntryId = delivered[0].id.parse().expect("valid id");
        log.ack("g", id);
        log.ack("g", id);
        assert_eq!(log.pending_count("g"), 0);
    }

    #[rstest]
    fn claim_idle_only_takes_old_entries(mut log: StreamLog) {
        let start = Instant::now();
        let delivered = log.deliver_new("g", "c1", 10, start);
        let id: EntryId = delivered[0].id.parse().expect("valid id");

        let early = log.claim_idle("g", "c2", Duration::from_secs(30), 10, start);
        assert!(early.is_empty());

        let later = start + Duration::from_secs(31);
        let claimed = log.claim_idle("g", "c2", Duration::from_secs(30), 2, later);
        assert_eq!(claimed.len(), 2);
        assert_eq!(log.pending_owner("g", id), Some("c2"));
    }
}
