//! TTL cache with LRU emergency eviction
//!
//! Entries live in a slot map and are reached through a key index. Reads take
//! the shared lock only; access bookkeeping is atomic so concurrent readers
//! never queue behind each other. Structural changes (insert, evict, sweep,
//! clear) take the exclusive lock.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use farmstats_shared::{CacheConfig, Component};
use farmstats_shared::{component_debug, component_info, component_warn};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::AnalyticsResult;

new_key_type! {
    /// Slot of one cache entry
    struct EntryId;
}

struct CacheEntry<K, V> {
    key: K,
    value: V,
    created_at: Instant,
    expires_at: Instant,
    /// Microseconds since the store epoch
    last_accessed: AtomicU64,
    access_count: AtomicU64,
    /// Store-wide access sequence, breaks ties between equal timestamps
    access_seq: AtomicU64,
}

impl<K, V> CacheEntry<K, V> {
    /// Live through `expires_at` itself, expired strictly after it
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    fn touch(&self, at: u64, seq: u64) {
        self.last_accessed.store(at, Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
        self.access_seq.store(seq, Ordering::Relaxed);
    }

    fn recency(&self) -> (u64, u64, u64) {
        (
            self.last_accessed.load(Ordering::Relaxed),
            self.access_count.load(Ordering::Relaxed),
            self.access_seq.load(Ordering::Relaxed),
        )
    }
}

struct Slots<K, V> {
    entries: SlotMap<EntryId, CacheEntry<K, V>>,
    index: HashMap<K, EntryId>,
}

impl<K: Eq + Hash, V> Slots<K, V> {
    fn remove(&mut self, id: EntryId) -> Option<CacheEntry<K, V>> {
        let entry = self.entries.remove(id)?;
        self.index.remove(&entry.key);
        Some(entry)
    }

    fn expired_ids(&self, now: Instant) -> Vec<EntryId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(id, _)| id)
            .collect()
    }

    /// Ids ordered from least to most recently used
    fn ids_by_recency(&self) -> Vec<EntryId> {
        let mut ranked: Vec<(EntryId, (u64, u64, u64))> =
            self.entries.iter().map(|(id, entry)| (id, entry.recency())).collect();
        ranked.sort_by_key(|(_, recency)| *recency);
        ranked.into_iter().map(|(id, _)| id).collect()
    }
}

/// Point-in-time counters for a cache store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub entries: usize,
    pub max_size: usize,
    /// Entries past their TTL that have not been removed yet
    pub expired_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
}

/// Generic key/value store with per-entry TTL
pub struct CacheStore<K, V> {
    slots: RwLock<Slots<K, V>>,
    config: CacheConfig,
    epoch: Instant,
    sequence: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self {
            slots: RwLock::new(Slots {
                entries: SlotMap::with_key(),
                index: HashMap::new(),
            }),
            config,
            epoch: Instant::now(),
            sequence: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn offset(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.epoch).as_micros() as u64
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Look up `key`. Counts a hit or miss and refreshes access data on a hit.
    ///
    /// An expired entry is a miss. It is removed on the spot only if the
    /// write lock is free; otherwise the next sweep picks it up.
    pub async fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let expired = {
            let slots = self.slots.read().await;
            let found = slots
                .index
                .get(key)
                .and_then(|id| slots.entries.get(*id).map(|entry| (*id, entry)));

            match found {
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
                Some((id, entry)) if entry.is_expired(now) => id,
                Some((_, entry)) => {
                    entry.touch(self.offset(now), self.next_seq());
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
            }
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut slots) = self.slots.try_write() {
            // Re-check: the slot may have been overwritten since the read lock dropped
            let still_expired = slots.entries.get(expired).is_some_and(|entry| entry.is_expired(now));
            if still_expired && slots.remove(expired).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        None
    }

    /// True if a live entry exists. Does not count as an access.
    pub async fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let slots = self.slots.read().await;
        slots
            .index
            .get(key)
            .and_then(|id| slots.entries.get(*id))
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Insert with the store's default TTL
    pub async fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.config.default_ttl()).await;
    }

    /// Insert or replace `key`.
    ///
    /// Replacing keeps the access count and resets every timestamp. A new key
    /// arriving at the cleanup threshold first triggers emergency eviction.
    pub async fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        let at = self.offset(now);
        let seq = self.next_seq();
        let mut slots = self.slots.write().await;

        if let Some(id) = slots.index.get(&key).copied() {
            let access_count = slots
                .entries
                .get(id)
                .map_or(0, |entry| entry.access_count.load(Ordering::Relaxed));
            if let Some(slot) = slots.entries.get_mut(id) {
                *slot = CacheEntry {
                    key,
                    value,
                    created_at: now,
                    expires_at: now + ttl,
                    last_accessed: AtomicU64::new(at),
                    access_count: AtomicU64::new(access_count),
                    access_seq: AtomicU64::new(seq),
                };
            }
            return;
        }

        if !slots.entries.is_empty() && slots.entries.len() >= self.config.cleanup_trigger() {
            let excess = slots.entries.len().saturating_sub(self.config.eviction_floor());
            let evicted = Self::evict_locked(&mut slots, excess);
            self.evictions.fetch_add(evicted.len() as u64, Ordering::Relaxed);
            component_warn!(
                Component::Cache,
                evicted = evicted.len(),
                remaining = slots.entries.len(),
                "🧹 Emergency eviction at {} of {} entries",
                slots.entries.len() + evicted.len(),
                self.config.max_size
            );
        }

        let id = slots.entries.insert(CacheEntry {
            key: key.clone(),
            value,
            created_at: now,
            expires_at: now + ttl,
            last_accessed: AtomicU64::new(at),
            access_count: AtomicU64::new(0),
            access_seq: AtomicU64::new(seq),
        });
        slots.index.insert(key, id);
    }

    fn evict_locked(slots: &mut Slots<K, V>, count: usize) -> Vec<K> {
        slots
            .ids_by_recency()
            .into_iter()
            .take(count)
            .filter_map(|id| slots.remove(id).map(|entry| entry.key))
            .collect()
    }

    /// Remove the `count` least recently used entries, returning their keys
    pub async fn evict_least_recent(&self, count: usize) -> Vec<K> {
        let mut slots = self.slots.write().await;
        let evicted = Self::evict_locked(&mut slots, count);
        self.evictions.fetch_add(evicted.len() as u64, Ordering::Relaxed);
        evicted
    }

    /// Remove every expired entry. Removals count as evictions.
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.write().await;
        let expired = slots.expired_ids(now);
        let removed = expired.into_iter().filter(|id| slots.remove(*id).is_some()).count();
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub async fn invalidate<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut slots = self.slots.write().await;
        match slots.index.get(key).copied() {
            Some(id) => slots.remove(id).is_some(),
            None => false,
        }
    }

    /// Remove every entry whose key matches `predicate`
    pub async fn invalidate_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&K) -> bool,
    {
        let mut slots = self.slots.write().await;
        let matching: Vec<EntryId> = slots
            .entries
            .iter()
            .filter(|(_, entry)| predicate(&entry.key))
            .map(|(id, _)| id)
            .collect();
        matching.into_iter().filter(|id| slots.remove(*id).is_some()).count()
    }

    pub async fn clear(&self) -> usize {
        let mut slots = self.slots.write().await;
        let removed = slots.entries.len();
        slots.entries.clear();
        slots.index.clear();
        removed
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Age of the entry for `key`, live or not
    pub async fn entry_age<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slots = self.slots.read().await;
        slots
            .index
            .get(key)
            .and_then(|id| slots.entries.get(*id))
            .map(|entry| entry.created_at.elapsed())
    }

    pub async fn statistics(&self) -> CacheStatistics {
        let now = Instant::now();
        let slots = self.slots.read().await;
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStatistics {
            entries: slots.entries.len(),
            max_size: self.config.max_size,
            expired_entries: slots.entries.values().filter(|entry| entry.is_expired(now)).count(),
            hits,
            misses,
            hit_rate: if lookups == 0 { 0.0 } else { hits as f64 / lookups as f64 },
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Run `sweep_expired` every `sweep_interval` until `shutdown` fires or closes
    pub fn spawn_sweeper(store: Arc<Self>, mut shutdown: mpsc::Receiver<()>) -> JoinHandle<()> {
        let every = store.config.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            component_info!(Component::Cache, "🧽 Sweeper running every {:?}", every);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = store.sweep_expired().await;
                        if removed > 0 {
                            component_debug!(Component::Cache, removed, "Swept expired entries");
                        }
                    }
                    _ = shutdown.recv() => {
                        component_info!(Component::Cache, "Sweeper stopped");
                        break;
                    }
                }
            }
        })
    }
}
