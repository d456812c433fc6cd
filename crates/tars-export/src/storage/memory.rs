//! In-memory store for tests and dry runs
//!
//! Failures can be injected per operation to exercise error paths of the
//! allocator and the pruners.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{ObjectStore, StoreError};

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, Vec<u8>>,
    fail_list: bool,
    failing_downloads: HashSet<String>,
    failing_deletes: HashSet<String>,
    failing_exists: HashSet<String>,
    deletes_attempted: Vec<String>,
}

#[derive(Debug)]
pub struct MemoryStore {
    container: String,
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Build a store pre-populated with `(name, content)` pairs
    pub fn with_objects<I, N, C>(container: impl Into<String>, objects: I) -> Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: Into<Vec<u8>>,
    {
        let store = Self::new(container);
        {
            let mut state = store.lock();
            for (name, content) in objects {
                state.objects.insert(name.into(), content.into());
            }
        }
        store
    }

    pub fn insert(&self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.lock().objects.insert(name.into(), content.into());
    }

    /// Current names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(name).cloned()
    }

    /// Every name a delete was issued for, in call order
    pub fn deletes_attempted(&self) -> Vec<String> {
        self.lock().deletes_attempted.clone()
    }

    pub fn fail_list(&self, fail: bool) {
        self.lock().fail_list = fail;
    }

    pub fn fail_download(&self, name: impl Into<String>) {
        self.lock().failing_downloads.insert(name.into());
    }

    pub fn fail_delete(&self, name: impl Into<String>) {
        self.lock().failing_deletes.insert(name.into());
    }

    pub fn fail_exists(&self, name: impl Into<String>) {
        self.lock().failing_exists.insert(name.into());
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the store from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn injected(&self, operation: &'static str, name: &str) -> StoreError {
        StoreError::unavailable(
            &self.container,
            operation,
            std::io::Error::other(format!("injected {operation} failure for {name:?}")),
        )
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn container(&self) -> &str {
        &self.container
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let state = self.lock();
        if state.fail_list {
            return Err(self.injected("list", ""));
        }
        Ok(state.objects.keys().cloned().collect())
    }

    async fn download(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let state = self.lock();
        if state.failing_downloads.contains(name) {
            return Err(self.injected("download", name));
        }
        state
            .objects
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(&self.container, name))
    }

    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.lock().objects.insert(name.to_string(), data);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.deletes_attempted.push(name.to_string());
        if state.failing_deletes.contains(name) {
            return Err(self.injected("delete", name));
        }
        state
            .objects
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(&self.container, name))
    }

    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let state = self.lock();
        if state.failing_exists.contains(name) {
            return Err(self.injected("exists", name));
        }
        Ok(state.objects.contains_key(name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryStore::with_objects("blobs", [("a", "1"), ("b", "2")]);

        assert_eq!(store.list().await.unwrap(), vec!["a", "b"]);
        assert_eq!(store.download("a").await.unwrap(), b"1");
        store.delete("a").await.unwrap();
        assert!(!store.exists("a").await.unwrap());
        assert!(store.download("a").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::with_objects("blobs", [("a", "1")]);
        store.fail_delete("a");
        store.fail_list(true);

        assert!(store.list().await.is_err());
        assert!(!store.delete("a").await.unwrap_err().is_not_found());
        assert_eq!(store.names(), vec!["a"]);
        assert_eq!(store.deletes_attempted(), vec!["a"]);
    }
}
