use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keyqueue_core::MessageId;

/// A keyed message travelling through the dispatch queue.
///
/// Owned by whichever buffer currently holds it (input or pending) and
/// dropped as soon as a consumer has been invoked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message<K, V> {
    id: MessageId,
    key: K,
    value: V,
    enqueued_at: DateTime<Utc>,
}

impl<K, V> Message<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self {
            id: MessageId::new(),
            key,
            value,
            enqueued_at: Utc::now(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}
