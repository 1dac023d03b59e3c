//! Sender cache for the caching sender factory.
//!
//! Keeps at most one live sender per cache key (destination + schema +
//! customizer identity) and reuses it across sends, so repeated single-item
//! sends to the same destination do not churn broker producers.
//!
//! ## Design
//!
//! The cache maintains a map of keys to sender handles:
//! - Lookups take the read lock only (fast path) and refresh the entry's
//!   freshness with a lock-free store.
//! - Insertion double-checks under the write lock: when two tasks race to
//!   create the same sender, the first insert wins and the loser's sender is
//!   closed immediately.
//! - Eviction is explicit: [`SenderCache::evict_idle`] removes entries that
//!   are both past the idle timeout and no longer referenced outside the
//!   cache, then closes them outside the lock. [`SenderCache::close_all`]
//!   drains everything on shutdown. Senders are never reclaimed by drop glue.
//!
//! ## Thread Safety
//!
//! `SenderCache` is Send + Sync and uses an `RwLock` around the map; per-entry
//! freshness uses atomics so read-path hits never take the write lock.
//!
//! ## Examples
//!
//! ```ignore
//! use courier_core::cache::{SenderCache, SenderKey};
//!
//! let cache = SenderCache::new(Duration::from_secs(60));
//! let key = SenderKey::new("orders", WireSchema::Bytes);
//!
//! if let Some(sender) = cache.get(&key).await {
//!     // reuse
//! }
//! ```

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::client::{MessageSender, SenderCustomizerFn};
use crate::schema::WireSchema;

/// Cache key: one live sender per destination + schema + customizer identity.
///
/// Customizer identity is the address of each supplied customizer callback,
/// in order. The key holds the customizer handles it compares by, so a live
/// entry pins those addresses: a customizer the caller has dropped can never
/// have its allocation recycled into a colliding key. Two calls sharing the
/// same customizer instances share a sender; ad-hoc closures built per call
/// get their own entry.
#[derive(Clone)]
pub struct SenderKey {
    topic: String,
    schema: WireSchema,
    customizers: Vec<Arc<SenderCustomizerFn>>,
}

impl SenderKey {
    pub fn new(topic: impl Into<String>, schema: WireSchema) -> Self {
        Self {
            topic: topic.into(),
            schema,
            customizers: Vec::new(),
        }
    }

    pub fn with_customizers(
        topic: impl Into<String>,
        schema: WireSchema,
        customizers: Vec<Arc<SenderCustomizerFn>>,
    ) -> Self {
        Self {
            topic: topic.into(),
            schema,
            customizers,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn schema(&self) -> &WireSchema {
        &self.schema
    }

    fn customizer_identity(customizer: &Arc<SenderCustomizerFn>) -> usize {
        Arc::as_ptr(customizer) as *const () as usize
    }
}

impl PartialEq for SenderKey {
    fn eq(&self, other: &Self) -> bool {
        self.topic == other.topic
            && self.schema == other.schema
            && self.customizers.len() == other.customizers.len()
            && self
                .customizers
                .iter()
                .zip(&other.customizers)
                .all(|(a, b)| Self::customizer_identity(a) == Self::customizer_identity(b))
    }
}

impl Eq for SenderKey {}

impl Hash for SenderKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.topic.hash(state);
        self.schema.hash(state);
        for customizer in &self.customizers {
            Self::customizer_identity(customizer).hash(state);
        }
    }
}

/// Cache entry with freshness tracking.
struct CachedSender<T> {
    sender: Arc<dyn MessageSender<T>>,

    /// Milliseconds since the cache epoch; refreshed lock-free on every hit.
    last_used_ms: AtomicU64,
}

/// Cache of destination + schema keys to live sender handles.
///
/// # Configuration
///
/// - `idle_timeout`: entries idle for at least this long become eligible for
///   [`SenderCache::evict_idle`] (default: 60s).
pub struct SenderCache<T> {
    entries: Arc<RwLock<HashMap<SenderKey, CachedSender<T>>>>,
    idle_timeout: Duration,
    epoch: Instant,
}

impl<T> SenderCache<T> {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
            epoch: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Look up a cached sender (read lock only).
    ///
    /// A hit refreshes the entry's freshness without taking the write lock.
    pub async fn get(&self, key: &SenderKey) -> Option<Arc<dyn MessageSender<T>>> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        entry.last_used_ms.store(self.now_ms(), Ordering::Relaxed);
        debug!(topic = %key.topic, "reusing cached sender");
        Some(Arc::clone(&entry.sender))
    }

    /// Insert a freshly created sender, unless another task won the race.
    ///
    /// Returns the sender that is now cached for the key. When an entry
    /// already exists, the supplied duplicate is closed and the existing
    /// sender returned, preserving at most one live sender per key.
    pub async fn insert_or_existing(
        &self,
        key: SenderKey,
        sender: Arc<dyn MessageSender<T>>,
    ) -> Arc<dyn MessageSender<T>> {
        let topic = key.topic.clone();
        let existing = {
            let mut entries = self.entries.write().await;
            match entries.get(&key) {
                Some(entry) => {
                    entry.last_used_ms.store(self.now_ms(), Ordering::Relaxed);
                    Some(Arc::clone(&entry.sender))
                }
                None => {
                    entries.insert(
                        key,
                        CachedSender {
                            sender: Arc::clone(&sender),
                            last_used_ms: AtomicU64::new(self.now_ms()),
                        },
                    );
                    None
                }
            }
        };

        match existing {
            Some(winner) => {
                debug!(topic = %topic, "sender already cached, closing duplicate");
                sender.close().await;
                winner
            }
            None => {
                debug!(topic = %topic, "added sender to cache");
                sender
            }
        }
    }

    /// Evict idle, unreferenced entries and close their senders.
    ///
    /// An entry is evicted when its last use is older than the idle timeout
    /// **and** the cache holds the last reference, so a sender is never
    /// closed under an in-flight send. Returns how many were evicted.
    pub async fn evict_idle(&self) -> usize {
        let now = self.now_ms();
        let idle_ms = self.idle_timeout.as_millis() as u64;

        let evicted: Vec<(SenderKey, Arc<dyn MessageSender<T>>)> = {
            let mut entries = self.entries.write().await;
            let keys: Vec<SenderKey> = entries
                .iter()
                .filter(|(_, entry)| {
                    now.saturating_sub(entry.last_used_ms.load(Ordering::Relaxed)) >= idle_ms
                        && Arc::strong_count(&entry.sender) == 1
                })
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| entries.remove(&key).map(|entry| (key, entry.sender)))
                .collect()
        };

        let count = evicted.len();
        for (key, sender) in evicted {
            debug!(topic = %key.topic, "closing idle sender");
            sender.close().await;
        }
        count
    }

    /// Remove and close every cached sender.
    ///
    /// Called during graceful shutdown.
    pub async fn close_all(&self) {
        let drained: Vec<Arc<dyn MessageSender<T>>> = {
            let mut entries = self.entries.write().await;
            entries.drain().map(|(_, entry)| entry.sender).collect()
        };
        debug!(closed = drained.len(), "closed all cached senders");
        for sender in drained {
            sender.close().await;
        }
    }

    /// Cache statistics for monitoring.
    ///
    /// Returns `(entries, in_use)` where `in_use` counts entries whose sender
    /// is currently referenced outside the cache.
    pub async fn stats(&self) -> (usize, usize) {
        let entries = self.entries.read().await;
        let total = entries.len();
        let in_use = entries
            .values()
            .filter(|entry| Arc::strong_count(&entry.sender) > 1)
            .count();
        (total, in_use)
    }

    /// Number of cached senders.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<T> Default for SenderCache<T> {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}
