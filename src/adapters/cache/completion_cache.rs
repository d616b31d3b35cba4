//! TTL cache for batched completion results.
//!
//! Keyed by the sorted, deduplicated song id set of a request plus the
//! remaining-steps flag, so two requests naming the same songs in a
//! different order share an entry. Expiry is checked lazily on read;
//! expired entries are also purged when an insert finds the map at or above
//! the cleanup threshold.
//!
//! Every invalidation bumps a generation counter. A caller that records the
//! generation before computing and stores with [`CompletionCache::set_if_generation`]
//! never reinserts results computed from data an invalidation raced with.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::models::{CacheConfig, CompletionMap, SongId};

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default entry count that triggers a purge on insert.
pub const DEFAULT_CLEANUP_THRESHOLD: usize = 100;

/// Cache key: canonical song id set plus the remaining-steps flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    song_ids: Vec<SongId>,
    include_remaining_steps: bool,
}

impl CacheKey {
    pub fn new(song_ids: &[SongId], include_remaining_steps: bool) -> Self {
        let mut song_ids = song_ids.to_vec();
        song_ids.sort_unstable();
        song_ids.dedup();
        Self {
            song_ids,
            include_remaining_steps,
        }
    }

    pub fn song_ids(&self) -> &[SongId] {
        &self.song_ids
    }

    pub fn include_remaining_steps(&self) -> bool {
        self.include_remaining_steps
    }

    fn contains(&self, song_id: SongId) -> bool {
        self.song_ids.binary_search(&song_id).is_ok()
    }
}

#[derive(Debug)]
struct CacheEntry {
    results: CompletionMap,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    generation: u64,
}

/// Process-local completion cache. Share it behind an `Arc`.
#[derive(Debug)]
pub struct CompletionCache {
    state: Mutex<CacheState>,
    default_ttl: Duration,
    cleanup_threshold: usize,
}

impl Default for CompletionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CLEANUP_THRESHOLD)
    }
}

impl CompletionCache {
    pub fn new(default_ttl: Duration, cleanup_threshold: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            default_ttl,
            cleanup_threshold,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.cleanup_threshold)
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached results for this song set, if present and not expired.
    pub fn get(&self, song_ids: &[SongId], include_remaining_steps: bool) -> Option<CompletionMap> {
        let key = CacheKey::new(song_ids, include_remaining_steps);
        let now = Instant::now();
        let mut state = self.lock();

        let expired = match state.entries.get(&key) {
            Some(entry) if !entry.is_expired(now) => {
                debug!(songs = key.song_ids.len(), "completion cache hit");
                return Some(entry.results.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.entries.remove(&key);
            debug!(songs = key.song_ids.len(), "completion cache entry expired");
        } else {
            debug!(songs = key.song_ids.len(), "completion cache miss");
        }
        None
    }

    /// Store results for this song set. `ttl` of `None` uses the default.
    pub fn set(
        &self,
        song_ids: &[SongId],
        include_remaining_steps: bool,
        results: CompletionMap,
        ttl: Option<Duration>,
    ) {
        let key = CacheKey::new(song_ids, include_remaining_steps);
        let mut state = self.lock();
        self.insert_locked(&mut state, key, results, ttl);
    }

    /// Store results only if no invalidation happened since `generation` was read.
    ///
    /// Returns whether the entry was stored.
    pub fn set_if_generation(
        &self,
        song_ids: &[SongId],
        include_remaining_steps: bool,
        results: CompletionMap,
        ttl: Option<Duration>,
        generation: u64,
    ) -> bool {
        let key = CacheKey::new(song_ids, include_remaining_steps);
        let mut state = self.lock();
        if state.generation != generation {
            debug!(
                expected = generation,
                current = state.generation,
                "discarding completion results computed before an invalidation"
            );
            return false;
        }
        self.insert_locked(&mut state, key, results, ttl);
        true
    }

    fn insert_locked(&self, state: &mut CacheState, key: CacheKey, results: CompletionMap, ttl: Option<Duration>) {
        let now = Instant::now();
        if state.entries.len() >= self.cleanup_threshold {
            let purged = purge_locked(state, now);
            if purged > 0 {
                debug!(purged, "purged expired completion cache entries");
            }
        }

        let expires_at = now + ttl.unwrap_or(self.default_ttl);
        state.entries.insert(key, CacheEntry { results, expires_at });
    }

    /// Drop every entry whose key or cached results mention `song_id`.
    ///
    /// Returns the number of entries dropped.
    pub fn invalidate_song(&self, song_id: SongId) -> usize {
        let mut state = self.lock();
        state.generation += 1;

        let doomed: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|(key, entry)| key.contains(song_id) || entry.results.contains_key(&song_id))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            state.entries.remove(key);
        }

        debug!(song_id, dropped = doomed.len(), "invalidated completion cache for song");
        doomed.len()
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.entries.clear();
    }

    /// Remove expired entries now. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.lock();
        purge_locked(&mut state, Instant::now())
    }

    /// Entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of invalidations so far.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }
}

fn purge_locked(state: &mut CacheState, now: Instant) -> usize {
    let expired: Vec<CacheKey> = state
        .entries
        .iter()
        .filter(|(_, entry)| entry.is_expired(now))
        .map(|(key, _)| key.clone())
        .collect();

    for key in &expired {
        state.entries.remove(key);
    }
    expired.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CompletionResult;

    fn results(entries: &[(SongId, u8)]) -> CompletionMap {
        entries
            .iter()
            .map(|(id, pct)| {
                (
                    *id,
                    CompletionResult {
                        completion: Some(*pct),
                        remaining_steps: Vec::new(),
                        workflow_fields: Vec::new(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_key_is_order_independent() {
        let cache = CompletionCache::default();
        cache.set(&[3, 1, 2], false, results(&[(1, 10)]), None);

        assert!(cache.get(&[1, 2, 3], false).is_some());
        assert!(cache.get(&[2, 3, 1, 1], false).is_some());
        assert!(cache.get(&[1, 2, 3], true).is_none());
        assert!(cache.get(&[1, 2], false).is_none());
    }

    #[test]
    fn test_invalidate_song_by_key() {
        let cache = CompletionCache::default();
        cache.set(&[1, 2], false, results(&[]), None);
        cache.set(&[2, 3], true, results(&[]), None);
        cache.set(&[4], false, results(&[]), None);

        assert_eq!(cache.invalidate_song(2), 2);
        assert!(cache.get(&[1, 2], false).is_none());
        assert!(cache.get(&[2, 3], true).is_none());
        assert!(cache.get(&[4], false).is_some());
    }

    #[test]
    fn test_invalidate_song_by_result() {
        let cache = CompletionCache::default();
        // Result contains a song the key does not name.
        cache.set(&[1], false, results(&[(1, 50), (9, 20)]), None);

        assert_eq!(cache.invalidate_song(9), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_all() {
        let cache = CompletionCache::default();
        cache.set(&[1], false, results(&[]), None);
        cache.set(&[2], false, results(&[]), None);

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.generation(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = CompletionCache::default();
        cache.set(&[1], false, results(&[(1, 40)]), None);

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(&[1], false).is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&[1], false).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_ttl() {
        let cache = CompletionCache::default();
        cache.set(&[1], false, results(&[]), Some(Duration::from_secs(5)));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cache.get(&[1], false).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_at_threshold_purges_expired() {
        let cache = CompletionCache::new(Duration::from_secs(10), 3);
        cache.set(&[1], false, results(&[]), None);
        cache.set(&[2], false, results(&[]), None);
        cache.set(&[3], false, results(&[]), Some(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.len(), 3);

        cache.set(&[4], false, results(&[]), None);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&[3], false).is_some());
        assert!(cache.get(&[4], false).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_below_threshold_keeps_expired_until_read() {
        let cache = CompletionCache::new(Duration::from_secs(10), 100);
        cache.set(&[1], false, results(&[]), None);

        tokio::time::advance(Duration::from_secs(11)).await;
        cache.set(&[2], false, results(&[]), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_if_generation_rejects_stale_results() {
        let cache = CompletionCache::default();
        let generation = cache.generation();

        cache.invalidate_song(1);
        assert!(!cache.set_if_generation(&[1], false, results(&[(1, 30)]), None, generation));
        assert!(cache.get(&[1], false).is_none());

        let current = cache.generation();
        assert!(cache.set_if_generation(&[1], false, results(&[(1, 30)]), None, current));
        assert!(cache.get(&[1], false).is_some());
    }

    #[test]
    fn test_from_config() {
        let config = CacheConfig {
            enabled: true,
            ttl_secs: 60,
            cleanup_threshold: 7,
        };
        let cache = CompletionCache::from_config(&config);
        assert_eq!(cache.default_ttl, Duration::from_secs(60));
        assert_eq!(cache.cleanup_threshold, 7);
    }
}
