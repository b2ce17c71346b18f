//! Shared rental table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rentscan_protocol::{RentalStatus, TagId};

/// Rental state of one tag.
///
/// A tag with no record is treated as `AVAILABLE` with zero timestamps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RentalRecord {
    pub status: RentalStatus,
    pub rent_timestamp: u64,
    pub duration: u64,
    pub return_timestamp: u64,
}

impl RentalRecord {
    pub fn expires_at(&self) -> u64 {
        self.rent_timestamp.saturating_add(self.duration)
    }

    pub fn is_overdue(&self, now: u64) -> bool {
        self.status == RentalStatus::Rented && now > self.expires_at()
    }
}

pub(crate) type RentalTable = HashMap<TagId, RentalRecord>;

/// Handle to the rental table shared by the dispatcher, the expiration
/// monitor and the operator console. Clones share the same table.
///
/// Every read-modify-write happens under one store-wide lock, and the lock is
/// never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct RentalStore {
    inner: Arc<Mutex<RentalTable>>,
}

impl RentalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn table(&self) -> MutexGuard<'_, RentalTable> {
        // A panic while holding the lock cannot leave a record half-written:
        // every mutation replaces whole `Copy` fields.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, tag: &TagId) -> Option<RentalRecord> {
        self.table().get(tag).copied()
    }

    /// Every record, ordered by tag.
    pub fn snapshot(&self) -> Vec<(TagId, RentalRecord)> {
        let mut records: Vec<_> =
            self.table().iter().map(|(tag, record)| (tag.clone(), *record)).collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));
        records
    }

    /// Drop every record. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut table = self.table();
        let removed = table.len();
        table.clear();
        log::info!("store: cleared records={}", removed);
        removed
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(hex: &str) -> TagId {
        TagId::from_hex(hex).expect("tag")
    }

    #[test]
    fn clones_share_one_table() {
        let store = RentalStore::new();
        let other = store.clone();
        other.table().insert(tag("01"), RentalRecord::default());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&tag("01")), Some(RentalRecord::default()));
    }

    #[test]
    fn snapshot_is_sorted_and_detached() {
        let store = RentalStore::new();
        store.table().insert(tag("cc"), RentalRecord::default());
        store.table().insert(tag("0a"), RentalRecord::default());
        let snapshot = store.snapshot();
        assert_eq!(snapshot.iter().map(|(t, _)| t.to_hex()).collect::<Vec<_>>(), ["0a", "cc"]);

        store.clear();
        assert_eq!(snapshot.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn clear_reports_removed_count() {
        let store = RentalStore::new();
        assert_eq!(store.clear(), 0);
        store.table().insert(tag("01"), RentalRecord::default());
        store.table().insert(tag("02"), RentalRecord::default());
        assert_eq!(store.clear(), 2);
    }

    #[test]
    fn overdue_only_after_deadline_and_only_when_rented() {
        let record = RentalRecord {
            status: RentalStatus::Rented,
            rent_timestamp: 1_000,
            duration: 5,
            return_timestamp: 0,
        };
        assert_eq!(record.expires_at(), 1_005);
        assert!(!record.is_overdue(1_005));
        assert!(record.is_overdue(1_006));

        let expired = RentalRecord { status: RentalStatus::Expired, ..record };
        assert!(!expired.is_overdue(2_000));
    }

    #[test]
    fn deadline_saturates() {
        let record = RentalRecord {
            status: RentalStatus::Rented,
            rent_timestamp: u64::MAX - 1,
            duration: 10,
            return_timestamp: 0,
        };
        assert!(!record.is_overdue(u64::MAX));
    }
}
