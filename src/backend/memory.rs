use super::{AuthProvider, AuthResult, ObjectHandle, ObjectStore, StorageError, StorageResult};
use crate::types::UserId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

const MEMORY_URL_BASE: &str = "memory://objects";

/// Auth provider that issues sequential local identities
#[derive(Default)]
pub struct MemoryAuth {
    counter: AtomicU64,
    current: RwLock<Option<UserId>>,
    sign_ins: AtomicU64,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful sign-in calls so far
    pub fn sign_in_count(&self) -> u64 {
        self.sign_ins.load(Ordering::Relaxed)
    }

    fn set_current(&self, user: UserId) -> UserId {
        if let Ok(mut current) = self.current.write() {
            *current = Some(user.clone());
        }
        self.sign_ins.fetch_add(1, Ordering::Relaxed);
        user
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AuthProvider for MemoryAuth {
    fn current_user(&self) -> Option<UserId> {
        self.current.read().ok()?.clone()
    }

    async fn sign_in_anonymously(&self) -> AuthResult<UserId> {
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(self.set_current(UserId::new(format!("anon-{id}"))))
    }

    async fn sign_in_with_custom_token(&self, token: &str) -> AuthResult<UserId> {
        Ok(self.set_current(UserId::new(format!("token-{token}"))))
    }
}

/// Object store backed by a map; later writes to a path replace earlier ones
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    writes: AtomicU64,
    url_requests: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().ok()?.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn url_request_count(&self) -> u64 {
        self.url_requests.load(Ordering::Relaxed)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ObjectStore for MemoryStore {
    async fn write(&self, path: &str, bytes: Vec<u8>) -> StorageResult<ObjectHandle> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| StorageError::Network(format!("store poisoned: {e}")))?;
        objects.insert(path.to_string(), bytes);
        Ok(ObjectHandle {
            path: path.to_string(),
            token: None,
        })
    }

    async fn public_url(&self, handle: &ObjectHandle) -> StorageResult<String> {
        self.url_requests.fetch_add(1, Ordering::Relaxed);
        let exists = self
            .objects
            .lock()
            .map(|objects| objects.contains_key(&handle.path))
            .unwrap_or(false);
        if !exists {
            return Err(StorageError::InvalidHandle(handle.path.clone()));
        }
        Ok(format!("{MEMORY_URL_BASE}/{}", handle.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_identity_is_cached() {
        let auth = MemoryAuth::new();
        assert_eq!(auth.current_user(), None);

        let first = auth.ensure_anonymous_identity().await.unwrap();
        let second = auth.ensure_anonymous_identity().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(auth.sign_in_count(), 1);
    }

    #[tokio::test]
    async fn test_same_path_overwrites() {
        let store = MemoryStore::new();
        store.write("a/b.txt", b"one".to_vec()).await.unwrap();
        store.write("a/b.txt", b"two".to_vec()).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.get("a/b.txt"), Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn test_unknown_handle_has_no_url() {
        let store = MemoryStore::new();
        let handle = ObjectHandle {
            path: "missing".to_string(),
            token: None,
        };
        assert!(matches!(
            store.public_url(&handle).await,
            Err(StorageError::InvalidHandle(_))
        ));
    }
}
