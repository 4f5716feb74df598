//! Record label cache state
//!
//! Each `(model, id)` entry is absent, pending, ready or failed. Requests for
//! absent entries are queued per model until the next flush.

use crate::error::MetadataError;
use indexmap::{IndexMap, IndexSet};
use sheetsync_model::{ModelName, RecordId};
use std::collections::HashMap;

/// State of one cached record label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelEntry {
    /// Requested, waiting for the next flush to settle
    Pending,
    /// Label fetched
    Ready(String),
    /// Fetch failed, memoized so reads fail fast
    Failed(MetadataError),
}

/// Outcome of a lookup against [`LabelCache`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Lookup {
    /// Entry settled or pending
    Known(LabelEntry),
    /// Entry was absent and has just been queued
    Queued {
        /// Whether the caller must schedule a flush
        schedule_flush: bool,
    },
}

#[derive(Debug, Default)]
pub(crate) struct LabelCache {
    entries: HashMap<ModelName, HashMap<RecordId, LabelEntry>>,
    pending: IndexMap<ModelName, IndexSet<RecordId>>,
    flush_scheduled: bool,
}

impl LabelCache {
    /// Read an entry, queueing it when absent
    pub(crate) fn lookup(&mut self, model: &ModelName, id: RecordId) -> Lookup {
        if let Some(entry) = self.peek(model, id) {
            return Lookup::Known(entry.clone());
        }
        self.entries
            .entry(model.clone())
            .or_default()
            .insert(id, LabelEntry::Pending);
        self.pending.entry(model.clone()).or_default().insert(id);

        let schedule_flush = !self.flush_scheduled;
        self.flush_scheduled = true;
        Lookup::Queued { schedule_flush }
    }

    /// Read an entry without side effects
    pub(crate) fn peek(&self, model: &ModelName, id: RecordId) -> Option<&LabelEntry> {
        self.entries.get(model).and_then(|labels| labels.get(&id))
    }

    /// Take every queued request, grouped by model
    pub(crate) fn take_pending(&mut self) -> IndexMap<ModelName, IndexSet<RecordId>> {
        self.flush_scheduled = false;
        std::mem::take(&mut self.pending)
    }

    /// Forget that a flush was scheduled, e.g. when scheduling failed
    pub(crate) fn unschedule(&mut self) {
        self.flush_scheduled = false;
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Whether any entry is queued or being fetched
    pub(crate) fn has_unsettled(&self) -> bool {
        self.entries
            .values()
            .flat_map(HashMap::values)
            .any(|entry| *entry == LabelEntry::Pending)
    }

    pub(crate) fn settle(&mut self, model: &ModelName, id: RecordId, entry: LabelEntry) {
        self.entries.entry(model.clone()).or_default().insert(id, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_lookup_queues_and_schedules_once() {
        let mut cache = LabelCache::default();
        let model = ModelName::new("partner");

        assert_eq!(
            cache.lookup(&model, RecordId(1)),
            Lookup::Queued { schedule_flush: true }
        );
        assert_eq!(
            cache.lookup(&model, RecordId(2)),
            Lookup::Queued { schedule_flush: false }
        );
        assert_eq!(
            cache.lookup(&model, RecordId(1)),
            Lookup::Known(LabelEntry::Pending)
        );

        let pending = cache.take_pending();
        let ids: Vec<_> = pending[&model].iter().copied().collect();
        assert_eq!(ids, vec![RecordId(1), RecordId(2)]);
        assert!(!cache.has_pending());
    }

    #[test]
    fn settled_entries_are_returned() {
        let mut cache = LabelCache::default();
        let model = ModelName::new("partner");
        cache.settle(&model, RecordId(1), LabelEntry::Ready("Alpha".to_string()));
        assert_eq!(
            cache.lookup(&model, RecordId(1)),
            Lookup::Known(LabelEntry::Ready("Alpha".to_string()))
        );
        assert!(!cache.has_pending());
    }

    #[test]
    fn taken_entries_stay_unsettled_until_settled() {
        let mut cache = LabelCache::default();
        let model = ModelName::new("partner");
        cache.lookup(&model, RecordId(1));
        cache.take_pending();
        assert!(!cache.has_pending());
        assert!(cache.has_unsettled());

        cache.settle(&model, RecordId(1), LabelEntry::Ready("Alpha".to_string()));
        assert!(!cache.has_unsettled());
    }

    #[test]
    fn take_pending_allows_next_schedule() {
        let mut cache = LabelCache::default();
        let model = ModelName::new("partner");
        cache.lookup(&model, RecordId(1));
        cache.take_pending();
        assert_eq!(
            cache.lookup(&model, RecordId(2)),
            Lookup::Queued { schedule_flush: true }
        );
    }
}
