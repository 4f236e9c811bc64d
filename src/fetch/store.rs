use crate::fetch::models::ListingRecord;
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered, deduplicated collection of fetched listings.
///
/// Insertion order is arrival order and is never reordered; the collection
/// only grows. Records without an identifier cannot be deduplicated and are
/// dropped. Not synchronized: `FetchCoordinator` serializes all access
/// behind its own lock.
pub struct ListingStore {
    records: Vec<Arc<ListingRecord>>,
    seen_ids: HashSet<String>,
}

impl ListingStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            seen_ids: HashSet::new(),
        }
    }

    /// Merge one record. Returns true only when the record was new.
    pub fn insert(&mut self, record: ListingRecord) -> bool {
        let id = match record.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                eprintln!("Skipping record: missing listing id");
                return false;
            }
        };

        if !self.seen_ids.insert(id) {
            return false;
        }

        self.records.push(Arc::new(record));
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    /// The complete current sequence, in first-seen order. Records are
    /// shared, not copied.
    pub fn snapshot(&self) -> Vec<Arc<ListingRecord>> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for ListingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> ListingRecord {
        serde_json::from_str(&format!(r#"{{"id":"{id}"}}"#)).unwrap()
    }

    fn record_without_id() -> ListingRecord {
        serde_json::from_str(r#"{"city":"Seattle"}"#).unwrap()
    }

    #[test]
    fn duplicates_are_skipped() {
        let mut store = ListingStore::new();
        assert!(store.insert(record("a")));
        assert!(store.insert(record("b")));
        assert!(!store.insert(record("a")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn order_matches_first_sighting() {
        let mut store = ListingStore::new();
        for id in ["c", "a", "b", "a", "c", "d"] {
            store.insert(record(id));
        }
        let ids: Vec<_> = store
            .snapshot()
            .iter()
            .map(|r| r.id.clone().unwrap())
            .collect();
        assert_eq!(ids, ["c", "a", "b", "d"]);
    }

    #[test]
    fn missing_or_empty_id_is_dropped() {
        let mut store = ListingStore::new();
        assert!(!store.insert(record_without_id()));
        assert!(!store.insert(record("")));
        assert!(store.is_empty());
    }

    #[test]
    fn snapshot_is_stable_across_later_inserts() {
        let mut store = ListingStore::new();
        store.insert(record("a"));
        let before = store.snapshot();
        store.insert(record("b"));
        assert_eq!(before.len(), 1);
        assert_eq!(store.len(), 2);
        assert!(store.contains("b"));
    }
}
