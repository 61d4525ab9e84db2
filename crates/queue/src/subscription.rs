//! Key → consumer subscription table.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use crate::consumer::Consumer;
use crate::sync::{read, write};

/// At most one consumer per key; the last `insert` for a key wins.
///
/// Entries are shared handles. [`lookup`](Self::lookup) clones the handle
/// under the read lock and returns it, so the caller invokes the consumer with
/// no lock held while still keeping it alive for the duration of the call.
pub struct SubscriptionTable<K> {
    entries: RwLock<HashMap<K, Arc<dyn Consumer>>>,
}

impl<K> SubscriptionTable<K>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register `consumer` for `key`, returning the registration it replaced.
    pub fn insert(&self, key: K, consumer: Arc<dyn Consumer>) -> Option<Arc<dyn Consumer>> {
        write(&self.entries).insert(key, consumer)
    }

    pub fn remove(&self, key: &K) -> Option<Arc<dyn Consumer>> {
        write(&self.entries).remove(key)
    }

    pub fn lookup(&self, key: &K) -> Option<Arc<dyn Consumer>> {
        read(&self.entries).get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        read(&self.entries).contains_key(key)
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K> Default for SubscriptionTable<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> core::fmt::Debug for SubscriptionTable<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriptionTable")
            .field("len", &read(&self.entries).len())
            .finish()
    }
}
