//! Backend collaborators for the upload and chat flows
//!
//! Authentication and object storage are consumed through two narrow
//! traits. `firebase` talks to the hosted REST endpoints, `memory` keeps
//! everything in-process for offline runs and tests.
mod error;
pub mod firebase;
pub mod memory;

use crate::config::{BackendConfig, BackendKind};
use crate::session::Session;
use crate::types::UserId;
use async_trait::async_trait;
use std::sync::Arc;

pub use error::{AuthError, ConfigError, StorageError, UploadError};
pub use firebase::{FirebaseAuth, FirebaseStorage};
pub use memory::{MemoryAuth, MemoryStore};

pub type AuthResult<T> = Result<T, AuthError>;
pub type StorageResult<T> = Result<T, StorageError>;

/// Reference to a stored object, as returned by [`ObjectStore::write`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectHandle {
    pub path: String,
    /// Provider specific access token for building retrieval URLs.
    pub token: Option<String>,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AuthProvider: Send + Sync {
    /// Identity of the signed-in user, if any.
    fn current_user(&self) -> Option<UserId>;

    async fn sign_in_anonymously(&self) -> AuthResult<UserId>;

    async fn sign_in_with_custom_token(&self, token: &str) -> AuthResult<UserId>;

    /// Return the cached identity, signing in anonymously the first time.
    async fn ensure_anonymous_identity(&self) -> AuthResult<UserId> {
        if let Some(user) = self.current_user() {
            return Ok(user);
        }
        self.sign_in_anonymously().await
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` at `path`. An existing object at the same path is
    /// replaced.
    async fn write(&self, path: &str, bytes: Vec<u8>) -> StorageResult<ObjectHandle>;

    async fn public_url(&self, handle: &ObjectHandle) -> StorageResult<String>;
}

/// Backend handles shared by the flows of one running app.
#[derive(Clone)]
pub struct Backend {
    pub config: Arc<BackendConfig>,
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn ObjectStore>,
    pub session: Arc<Session>,
}

impl Backend {
    pub fn new(
        config: BackendConfig,
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let config = Arc::new(config);
        let session = Arc::new(Session::new(
            auth.clone(),
            config.initial_auth_token.clone(),
        ));
        Self {
            config,
            auth,
            store,
            session,
        }
    }

    /// Build the collaborators selected by `config.kind`
    pub fn from_config(config: BackendConfig) -> Self {
        match config.kind {
            BackendKind::Firebase => {
                let auth = Arc::new(FirebaseAuth::new(config.api_key.clone()));
                let store = Arc::new(FirebaseStorage::new(
                    config.storage_bucket.clone(),
                    auth.clone(),
                ));
                Self::new(config, auth, store)
            }
            BackendKind::Memory => {
                let auth = Arc::new(MemoryAuth::new());
                let store = Arc::new(MemoryStore::new());
                Self::new(config, auth, store)
            }
        }
    }
}

