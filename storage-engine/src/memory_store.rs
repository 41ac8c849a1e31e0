use async_trait::async_trait;
use cartcache::ports::{ListRange, ListStore};
use dashmap::DashMap;
use shared::{Error, Result};
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct ListEntry {
    items: Vec<String>,
    expires_at: Option<Instant>,
}

impl ListEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-process list store with Redis-like list and expiry semantics
///
/// Expired entries are invisible immediately and purged on the next access
/// to their key. Time comes from `tokio::time`, so paused test runtimes can
/// drive expiry deterministically.
#[derive(Default)]
pub struct MemoryListStore {
    lists: DashMap<String, ListEntry>,
    appends: AtomicUsize,
    fail_append_at: Option<usize>,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`-th append (1-based, counted across all keys) fail with a
    /// transport error.
    pub fn fail_append_at(mut self, n: usize) -> Self {
        self.fail_append_at = Some(n);
        self
    }

    /// Number of elements in the live list at `key`
    pub fn len(&self, key: &str) -> Option<usize> {
        self.purge_expired(key, Instant::now());
        self.lists.get(key).map(|entry| entry.items.len())
    }

    /// Time left before `key` expires; `None` if absent or without expiry
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.purge_expired(key, now);
        self.lists
            .get(key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    fn purge_expired(&self, key: &str, now: Instant) {
        self.lists.remove_if(key, |_, entry| entry.is_expired(now));
    }
}

#[async_trait]
impl ListStore for MemoryListStore {
    async fn append(&self, key: &str, value: String) -> Result<()> {
        let attempt = self.appends.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_append_at == Some(attempt) {
            return Err(Error::Transport(format!("injected failure on append {attempt}")));
        }

        let now = Instant::now();
        let mut entry = self.lists.entry(key.to_string()).or_default();
        if entry.is_expired(now) {
            *entry = ListEntry::default();
        }
        entry.items.push(value);
        Ok(())
    }

    async fn range(&self, key: &str) -> Result<ListRange> {
        self.purge_expired(key, Instant::now());
        Ok(match self.lists.get(key) {
            Some(entry) => ListRange::Found(entry.items.clone()),
            None => ListRange::Absent,
        })
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.purge_expired(key, Instant::now());
        Ok(self.lists.remove(key).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        self.purge_expired(key, now);
        Ok(match self.lists.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(now + ttl);
                true
            }
            None => false,
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

impl Debug for MemoryListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryListStore")
            .field("keys", &self.lists.len())
            .finish()
    }
}
