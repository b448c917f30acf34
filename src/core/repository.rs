//! Availability repository: find-or-create-or-update keyed by
//! (event, chauffeur), with a local cache kept in step with the store.
//!
//! The store has no uniqueness constraint. At most one record per pair
//! exists only because every write here is preceded by a lookup on the
//! exact pair, and same-pair writes are serialized.

use crate::adapters::schema::{self, decode_all};
use crate::core::query::Filter;
use crate::domain::model::{AvailabilityRecord, AvailabilityStatus, PairKey};
use crate::domain::ports::{RecordStore, Table};
use crate::utils::error::{AvailabilityError, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

const AVAILABILITY: &str = "availability";

/// Which records the cache currently mirrors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheScope {
    Empty,
    All,
    Chauffeur(String),
}

impl CacheScope {
    pub fn covers(&self, chauffeur_id: &str) -> bool {
        match self {
            CacheScope::Empty => false,
            CacheScope::All => true,
            CacheScope::Chauffeur(id) => id == chauffeur_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The cache was replaced with these records.
    Applied(Vec<AvailabilityRecord>),
    /// A newer load started while this one was in flight; its response was
    /// dropped and the cache left alone.
    Stale,
}

impl LoadOutcome {
    pub fn is_stale(&self) -> bool {
        matches!(self, LoadOutcome::Stale)
    }
}

struct CacheState {
    scope: CacheScope,
    generation: u64,
    records: Vec<AvailabilityRecord>,
    /// Bumped on every confirmed write.
    write_seq: u64,
    /// Latest confirmed write per pair, tagged with its `write_seq`. A load
    /// that read the store before one of these landed re-applies it.
    confirmed: HashMap<PairKey, (u64, AvailabilityRecord)>,
}

struct LoadTicket {
    generation: u64,
    write_seq: u64,
}

enum Lookup {
    Hit(AvailabilityRecord),
    Miss,
    NotCovered,
}

type PairLocks = Mutex<HashMap<PairKey, Arc<tokio::sync::Mutex<()>>>>;

/// Holds the per-pair lock for the duration of one upsert and drops the
/// map entry once nobody else is waiting on it.
struct PairLease<'a> {
    locks: &'a PairLocks,
    key: PairKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairLease<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock();
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

pub struct AvailabilityRepository<S: RecordStore> {
    store: S,
    cache: RwLock<CacheState>,
    pair_locks: PairLocks,
}

impl<S: RecordStore> AvailabilityRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: RwLock::new(CacheState {
                scope: CacheScope::Empty,
                generation: 0,
                records: Vec::new(),
                write_seq: 0,
                confirmed: HashMap::new(),
            }),
            pair_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetches every availability record without a server-side filter and
    /// makes it the cache. Consumers must filter by the full pair locally.
    pub async fn load_all(&self) -> Result<LoadOutcome> {
        let ticket = self.begin_load();
        let records = self
            .store
            .list(Table::Availability, &Filter::All)
            .await
            .map_err(|e| AvailabilityError::fetch(AVAILABILITY, e))?;

        let decoded = decode_all(Table::Availability, &records, schema::decode_availability);
        Ok(self.finish_load(ticket, CacheScope::All, decoded))
    }

    /// Replaces the cache with one chauffeur's records. A response that
    /// arrives after a newer load has started is discarded.
    pub async fn load_for_chauffeur(&self, chauffeur_id: &str) -> Result<LoadOutcome> {
        let ticket = self.begin_load();
        let records = self
            .store
            .list(Table::Availability, &Filter::for_chauffeur(chauffeur_id))
            .await
            .map_err(|e| AvailabilityError::fetch(AVAILABILITY, e))?;

        let decoded = decode_all(Table::Availability, &records, schema::decode_availability);
        let total = decoded.len();
        let owned: Vec<AvailabilityRecord> = decoded
            .into_iter()
            .filter(|r| r.chauffeur_id == chauffeur_id)
            .collect();
        if owned.len() != total {
            tracing::warn!(
                "Dropped {} availability records not belonging to chauffeur {}",
                total - owned.len(),
                chauffeur_id
            );
        }

        Ok(self.finish_load(
            ticket,
            CacheScope::Chauffeur(chauffeur_id.to_string()),
            owned,
        ))
    }

    /// Empties the cache and invalidates any load still in flight.
    pub fn clear(&self) {
        let mut state = self.cache.write();
        state.generation += 1;
        state.scope = CacheScope::Empty;
        state.records.clear();
    }

    /// Sets the status for one (event, chauffeur) pair, updating the existing
    /// record when there is one and creating it otherwise. The cache is only
    /// touched after the store confirms the write.
    pub async fn upsert(
        &self,
        event_id: &str,
        chauffeur_id: &str,
        status: AvailabilityStatus,
    ) -> Result<AvailabilityRecord> {
        if !status.is_set() {
            return Err(AvailabilityError::UnsetNotAllowed {
                event_id: event_id.to_string(),
                chauffeur_id: chauffeur_id.to_string(),
            });
        }

        let key = PairKey::new(event_id, chauffeur_id);
        let _lease = self.lease(key.clone()).await;

        let existing = match self.lookup(&key) {
            Lookup::Hit(record) => Some(record),
            Lookup::Miss => None,
            Lookup::NotCovered => self.find_remote(&key).await?,
        };

        let fields = schema::encode_availability(event_id, chauffeur_id, status);
        let record = match existing {
            Some(current) => {
                tracing::debug!("Updating availability {} for {}", current.id, key);
                self.store
                    .update(Table::Availability, &current.id, fields)
                    .await
                    .map_err(|e| AvailabilityError::write(event_id, chauffeur_id, e))?;
                AvailabilityRecord { status, ..current }
            }
            None => {
                tracing::debug!("Creating availability for {}", key);
                let created = self
                    .store
                    .create(Table::Availability, fields)
                    .await
                    .map_err(|e| AvailabilityError::write(event_id, chauffeur_id, e))?;
                AvailabilityRecord {
                    id: created.id,
                    event_id: key.event_id.clone(),
                    chauffeur_id: key.chauffeur_id.clone(),
                    status,
                }
            }
        };

        tracing::info!("Availability {} for {} is now {}", record.id, key, status);
        self.apply_write(&record);
        Ok(record)
    }

    pub fn snapshot(&self) -> Vec<AvailabilityRecord> {
        self.cache.read().records.clone()
    }

    pub fn scope(&self) -> CacheScope {
        self.cache.read().scope.clone()
    }

    pub fn record_for(&self, event_id: &str, chauffeur_id: &str) -> Option<AvailabilityRecord> {
        self.cache
            .read()
            .records
            .iter()
            .find(|r| r.matches(event_id, chauffeur_id))
            .cloned()
    }

    /// Cached status for the pair, `Unset` when no record is cached.
    pub fn status_for(&self, event_id: &str, chauffeur_id: &str) -> AvailabilityStatus {
        self.record_for(event_id, chauffeur_id)
            .map(|r| r.status)
            .unwrap_or_default()
    }

    fn begin_load(&self) -> LoadTicket {
        let mut state = self.cache.write();
        state.generation += 1;
        LoadTicket {
            generation: state.generation,
            write_seq: state.write_seq,
        }
    }

    fn finish_load(
        &self,
        ticket: LoadTicket,
        scope: CacheScope,
        records: Vec<AvailabilityRecord>,
    ) -> LoadOutcome {
        let mut records = dedupe(records);
        let mut state = self.cache.write();
        if state.generation != ticket.generation {
            tracing::warn!(
                "Discarding stale availability response for {:?} (load {} superseded by {})",
                scope,
                ticket.generation,
                state.generation
            );
            return LoadOutcome::Stale;
        }

        // The response may predate writes confirmed while it was in flight.
        for (seq, record) in state.confirmed.values() {
            if *seq > ticket.write_seq && scope.covers(&record.chauffeur_id) {
                tracing::debug!(
                    "Re-applying availability {} confirmed during load",
                    record.id
                );
                merge_record(&mut records, record);
            }
        }

        tracing::debug!("Cache now holds {} records for {:?}", records.len(), scope);
        state.scope = scope;
        state.records = records.clone();
        LoadOutcome::Applied(records)
    }

    fn lookup(&self, key: &PairKey) -> Lookup {
        let state = self.cache.read();
        if !state.scope.covers(&key.chauffeur_id) {
            return Lookup::NotCovered;
        }
        state
            .records
            .iter()
            .find(|r| r.matches(&key.event_id, &key.chauffeur_id))
            .cloned()
            .map_or(Lookup::Miss, Lookup::Hit)
    }

    /// Existence check against the store on the exact pair, used when the
    /// cache does not mirror the chauffeur.
    async fn find_remote(&self, key: &PairKey) -> Result<Option<AvailabilityRecord>> {
        let records = self
            .store
            .list(
                Table::Availability,
                &Filter::for_pair(&key.event_id, &key.chauffeur_id),
            )
            .await
            .map_err(|e| AvailabilityError::fetch(AVAILABILITY, e))?;

        let mut found: Vec<AvailabilityRecord> =
            decode_all(Table::Availability, &records, schema::decode_availability)
                .into_iter()
                .filter(|r| r.matches(&key.event_id, &key.chauffeur_id))
                .collect();
        if found.len() > 1 {
            tracing::warn!(
                "{} availability records exist for {}; updating {}",
                found.len(),
                key,
                found[0].id
            );
        }
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    fn apply_write(&self, record: &AvailabilityRecord) {
        let mut state = self.cache.write();
        state.write_seq += 1;
        let seq = state.write_seq;
        state.confirmed.insert(record.key(), (seq, record.clone()));

        if !state.scope.covers(&record.chauffeur_id) {
            tracing::debug!(
                "Cache scope is {:?}; not caching write for chauffeur {}",
                state.scope,
                record.chauffeur_id
            );
            return;
        }

        merge_record(&mut state.records, record);
    }

    async fn lease(&self, key: PairKey) -> PairLease<'_> {
        let lock = {
            let mut locks = self.pair_locks.lock();
            // A waiter dropped before acquiring never reaches `PairLease::drop`,
            // so its entry is swept here once nothing references it.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.clone()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        PairLease {
            locks: &self.pair_locks,
            key,
            guard: Some(guard),
        }
    }
}

/// Puts `record` in place of the cached record for its pair, or appends it.
fn merge_record(records: &mut Vec<AvailabilityRecord>, record: &AvailabilityRecord) {
    match records
        .iter_mut()
        .find(|r| r.matches(&record.event_id, &record.chauffeur_id))
    {
        Some(cached) => *cached = record.clone(),
        None => records.push(record.clone()),
    }
}

/// Keeps the first record per pair.
fn dedupe(records: Vec<AvailabilityRecord>) -> Vec<AvailabilityRecord> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.key()) {
            unique.push(record);
        } else {
            tracing::warn!(
                "Duplicate availability record {} for {}; keeping the first",
                record.id,
                record.key()
            );
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::model::StoreRecord;
    use serde_json::json;

    fn seed(store: &MemoryStore, id: &str, event: &str, chauffeur: &str, status: &str) {
        let fields = serde_json::from_value(json!({
            "Event": [event],
            "Chauffeurs": [chauffeur],
            "Availability": status,
        }))
        .unwrap();
        store.seed(Table::Availability, StoreRecord::new(id, fields));
    }

    #[tokio::test]
    async fn test_unset_is_rejected_without_store_calls() {
        let repo = AvailabilityRepository::new(MemoryStore::new());
        let err = repo
            .upsert("e1", "c1", AvailabilityStatus::Unset)
            .await
            .unwrap_err();

        assert!(matches!(err, AvailabilityError::UnsetNotAllowed { .. }));
        assert_eq!(repo.store().calls().lists, 0);
        assert_eq!(repo.store().calls().creates, 0);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_unchanged() {
        let store = MemoryStore::new();
        seed(&store, "r1", "e1", "c1", "Available");
        let repo = AvailabilityRepository::new(store);
        repo.load_for_chauffeur("c1").await.unwrap();

        repo.store().set_fail_writes(true);
        let err = repo
            .upsert("e1", "c1", AvailabilityStatus::NotAvailable)
            .await
            .unwrap_err();

        assert!(matches!(err, AvailabilityError::StoreWriteFailed { .. }));
        assert_eq!(repo.status_for("e1", "c1"), AvailabilityStatus::Available);

        let err = repo
            .upsert("e2", "c1", AvailabilityStatus::Available)
            .await
            .unwrap_err();
        assert!(matches!(err, AvailabilityError::StoreWriteFailed { .. }));
        assert_eq!(repo.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_last_known_good() {
        let store = MemoryStore::new();
        seed(&store, "r1", "e1", "c1", "Maybe Available");
        let repo = AvailabilityRepository::new(store);
        repo.load_for_chauffeur("c1").await.unwrap();

        repo.store().set_fail_reads(true);
        let err = repo.load_for_chauffeur("c1").await.unwrap_err();

        assert!(matches!(err, AvailabilityError::FetchFailed { .. }));
        assert_eq!(repo.snapshot().len(), 1);
        assert_eq!(repo.scope(), CacheScope::Chauffeur("c1".to_string()));
    }

    #[tokio::test]
    async fn test_uncovered_chauffeur_checks_store_by_pair() {
        let store = MemoryStore::new();
        seed(&store, "r1", "e1", "c1", "Available");
        seed(&store, "r2", "e2", "c1", "Available");
        let repo = AvailabilityRepository::new(store);

        let record = repo
            .upsert("e2", "c1", AvailabilityStatus::NotAvailable)
            .await
            .unwrap();

        assert_eq!(record.id, "r2");
        assert_eq!(repo.store().calls().creates, 0);
        assert_eq!(repo.store().calls().updates, 1);
        // nothing cached: the cache mirrors no chauffeur yet
        assert!(repo.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_load_collapses_duplicate_pairs() {
        let store = MemoryStore::new();
        seed(&store, "r1", "e1", "c1", "Available");
        seed(&store, "r9", "e1", "c1", "Not Available");
        let repo = AvailabilityRepository::new(store);

        let outcome = repo.load_for_chauffeur("c1").await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Applied(vec![AvailabilityRecord {
                id: "r1".to_string(),
                event_id: "e1".to_string(),
                chauffeur_id: "c1".to_string(),
                status: AvailabilityStatus::Available,
            }])
        );
    }

    #[tokio::test]
    async fn test_clear_invalidates_cache() {
        let store = MemoryStore::new();
        seed(&store, "r1", "e1", "c1", "Available");
        let repo = AvailabilityRepository::new(store);
        repo.load_all().await.unwrap();
        assert_eq!(repo.scope(), CacheScope::All);

        repo.clear();
        assert_eq!(repo.scope(), CacheScope::Empty);
        assert_eq!(repo.status_for("e1", "c1"), AvailabilityStatus::Unset);
    }

    #[tokio::test]
    async fn test_pair_locks_are_released() {
        let repo = AvailabilityRepository::new(MemoryStore::new());
        repo.upsert("e1", "c1", AvailabilityStatus::Available)
            .await
            .unwrap();
        assert!(repo.pair_locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_waiter_lock_is_swept() {
        let repo = AvailabilityRepository::new(MemoryStore::new());
        let key = PairKey::new("e1", "c1");

        let held = repo.lease(key.clone()).await;
        {
            let waiter = repo.lease(key.clone());
            tokio::pin!(waiter);
            assert!(futures::poll!(waiter.as_mut()).is_pending());
            // released while the waiter is queued, then the waiter goes away
            drop(held);
        }
        assert_eq!(repo.pair_locks.lock().len(), 1);

        repo.upsert("e2", "c1", AvailabilityStatus::Available)
            .await
            .unwrap();
        assert!(repo.pair_locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_write_during_load_survives_the_response() {
        let store = MemoryStore::new();
        seed(&store, "r1", "e1", "c1", "Available");
        let repo = AvailabilityRepository::new(store);

        let ticket = repo.begin_load();
        // the load read the store here; a create lands before it returns
        let created = repo
            .upsert("e2", "c1", AvailabilityStatus::MaybeAvailable)
            .await
            .unwrap();
        let response = vec![AvailabilityRecord {
            id: "r1".to_string(),
            event_id: "e1".to_string(),
            chauffeur_id: "c1".to_string(),
            status: AvailabilityStatus::Available,
        }];
        let outcome =
            repo.finish_load(ticket, CacheScope::Chauffeur("c1".to_string()), response);

        assert!(!outcome.is_stale());
        assert_eq!(repo.record_for("e2", "c1"), Some(created));
        assert_eq!(repo.snapshot().len(), 2);
    }
}
