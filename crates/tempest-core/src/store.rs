//! Bounded, time-ordered observation history shared across workers
//!
//! The store is the only component holding a lock. Producers call
//! [`ObservationStore::insert`]; consumers take a [`ObservationStore::snapshot`]
//! and run analytics on the copy, so derived computations never block writers.

use std::sync::RwLock;

use crate::types::{Observation, Timestamp};

/// Smallest history the store will accept
pub const MIN_HISTORY_SIZE: usize = 100;
/// Largest history the store will accept
pub const MAX_HISTORY_SIZE: usize = 100_000;

struct StoreInner {
    /// Ascending by timestamp, unique by timestamp
    history: Vec<Observation>,
    /// Most recently *arrived* observation. This follows call order, not
    /// timestamp order: a backfilled insert merges into the middle of
    /// `history` without the chronological tail being re-read as "live".
    latest: Option<Observation>,
}

/// Single source of truth for the chronological history and the live reading
pub struct ObservationStore {
    inner: RwLock<StoreInner>,
    capacity: usize,
}

impl ObservationStore {
    /// Create a store holding at most `capacity` observations.
    ///
    /// Out-of-range capacities are corrected with a logged warning rather
    /// than treated as fatal.
    pub fn new(capacity: usize) -> Self {
        let clamped = capacity.clamp(MIN_HISTORY_SIZE, MAX_HISTORY_SIZE);
        if clamped != capacity {
            tracing::warn!(
                requested = capacity,
                corrected = clamped,
                "history capacity out of range, corrected"
            );
        }

        Self {
            inner: RwLock::new(StoreInner {
                history: Vec::with_capacity(clamped.min(1024)),
                latest: None,
            }),
            capacity: clamped,
        }
    }

    /// Merge an observation into the chronological history and update the
    /// arrival-order latest reference.
    ///
    /// An existing entry with the identical timestamp is replaced in place;
    /// otherwise the observation is inserted at its sorted position. When
    /// the buffer exceeds capacity the oldest entries are evicted.
    pub fn insert(&self, obs: Observation) {
        let mut inner = self.inner.write().expect("store lock poisoned");

        match inner
            .history
            .binary_search_by_key(&obs.timestamp, |o| o.timestamp)
        {
            Ok(idx) => inner.history[idx] = obs.clone(),
            Err(idx) => inner.history.insert(idx, obs.clone()),
        }

        if inner.history.len() > self.capacity {
            let overflow = inner.history.len() - self.capacity;
            inner.history.drain(0..overflow);
        }

        inner.latest = Some(obs);
    }

    /// Independent, time-ordered copy of the full history.
    pub fn snapshot(&self) -> Vec<Observation> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.history.clone()
    }

    /// The most recently arrived observation, or `None` while empty.
    pub fn latest(&self) -> Option<Observation> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.latest.clone()
    }

    /// Number of observations currently retained.
    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured (post-correction) capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Timestamps currently retained, ascending. Mainly useful in tests and
    /// diagnostics.
    pub fn timestamps(&self) -> Vec<Timestamp> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.history.iter().map(|o| o.timestamp).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(ts: Timestamp, temp: f64) -> Observation {
        Observation {
            timestamp: ts,
            air_temperature: temp,
            ..Observation::default()
        }
    }

    #[test]
    fn test_capacity_is_clamped() {
        assert_eq!(ObservationStore::new(0).capacity(), MIN_HISTORY_SIZE);
        assert_eq!(ObservationStore::new(50).capacity(), MIN_HISTORY_SIZE);
        assert_eq!(ObservationStore::new(1000).capacity(), 1000);
        assert_eq!(
            ObservationStore::new(1_000_000).capacity(),
            MAX_HISTORY_SIZE
        );
    }

    #[test]
    fn test_insert_keeps_history_sorted() {
        let store = ObservationStore::new(1000);

        // Deliberately unsorted arrival order, including a backfill
        for ts in [500, 100, 300, 200, 400] {
            store.insert(obs(ts, 20.0));
        }

        assert_eq!(store.timestamps(), vec![100, 200, 300, 400, 500]);
    }

    #[test]
    fn test_duplicate_timestamp_replaces() {
        let store = ObservationStore::new(1000);

        store.insert(obs(100, 20.0));
        store.insert(obs(100, 25.0));

        let snap = store.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].air_temperature, 25.0);
    }

    #[test]
    fn test_trim_evicts_oldest_first() {
        // Capacity request below the floor is corrected to 100
        let store = ObservationStore::new(100);

        for ts in 0..150 {
            store.insert(obs(ts, 20.0));
        }

        let timestamps = store.timestamps();
        assert_eq!(timestamps.len(), 100);
        assert_eq!(timestamps[0], 50);
        assert_eq!(*timestamps.last().unwrap(), 149);
    }

    #[test]
    fn test_latest_tracks_arrival_order() {
        let store = ObservationStore::new(1000);

        store.insert(obs(1000, 20.0));
        // Historical backfill arrives later but is older
        store.insert(obs(500, 15.0));

        // The live reference follows call order...
        assert_eq!(store.latest().unwrap().timestamp, 500);
        // ...while the chronological record merges the backfill in place,
        // keeping t=1000 as the tail of the series
        assert_eq!(store.timestamps(), vec![500, 1000]);

        // A fresh live reading takes over both views
        store.insert(obs(1500, 21.0));
        assert_eq!(store.latest().unwrap().timestamp, 1500);
        assert_eq!(store.timestamps(), vec![500, 1000, 1500]);
    }

    #[test]
    fn test_empty_store() {
        let store = ObservationStore::new(1000);
        assert!(store.is_empty());
        assert!(store.latest().is_none());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let store = ObservationStore::new(1000);
        store.insert(obs(100, 20.0));

        let snap = store.snapshot();
        store.insert(obs(200, 21.0));

        assert_eq!(snap.len(), 1);
        assert_eq!(store.len(), 2);
    }
}
