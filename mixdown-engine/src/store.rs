//! Content-addressed audio store
//!
//! The engine never talks to object storage directly; collaborators hand it
//! a store implementation keyed by opaque locators. The in-memory
//! implementation here backs tests and the worker binary's local-file mode.
//! It is per-instance state behind a lock, not a process-wide table, so
//! concurrent jobs and tests stay isolated.

use std::collections::HashMap;
use std::sync::RwLock;

/// One stored object: raw bytes plus MIME type
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Key → bytes store interface
///
/// `get` returning None means the object does not exist; fetch failures of
/// a real backend surface the same way and are fatal for the job that
/// needed the object.
pub trait AudioStore: Send + Sync {
    fn get(&self, locator: &str) -> Option<StoredObject>;
    fn put(&self, locator: &str, bytes: Vec<u8>, mime_type: &str);
}

/// In-memory store for tests and local runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AudioStore for MemoryStore {
    fn get(&self, locator: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(locator)
            .cloned()
    }

    fn put(&self, locator: &str, bytes: Vec<u8>, mime_type: &str) {
        self.objects.write().unwrap_or_else(|e| e.into_inner()).insert(
            locator.to_string(),
            StoredObject {
                bytes,
                mime_type: mime_type.to_string(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get("tracks/a").is_none());

        store.put("tracks/a", vec![1, 2, 3], "audio/wav");
        let object = store.get("tracks/a").unwrap();
        assert_eq!(object.bytes, vec![1, 2, 3]);
        assert_eq!(object.mime_type, "audio/wav");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_instances_are_isolated() {
        let a = MemoryStore::new();
        let b = MemoryStore::new();
        a.put("x", vec![1], "audio/wav");
        assert!(b.get("x").is_none());
    }
}
