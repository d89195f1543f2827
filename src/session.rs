//! Sign-in session shared by the views of one app instance
//!
//! The session owns the auth state and publishes every change on a watch
//! channel. Views hold a [`Subscription`] and release it with
//! [`Session::unsubscribe`] when they are torn down.

use crate::backend::{AuthProvider, AuthResult};
use crate::types::{AuthState, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

pub struct Session {
    auth: Arc<dyn AuthProvider>,
    initial_token: Option<String>,
    state: watch::Sender<AuthState>,
    sign_in_lock: Mutex<()>,
}

impl Session {
    pub fn new(auth: Arc<dyn AuthProvider>, initial_token: Option<String>) -> Self {
        let initial = auth
            .current_user()
            .map(AuthState::Authenticated)
            .unwrap_or_default();
        let (state, _) = watch::channel(initial);
        Self {
            auth,
            initial_token,
            state,
            sign_in_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Sign in once and return the identity.
    ///
    /// An identity the provider already holds (from an earlier upload, say)
    /// is adopted as is. Otherwise uses the configured custom token when
    /// present, anonymous sign in when not. Concurrent callers share one
    /// provider round trip.
    pub async fn sign_in(&self) -> AuthResult<UserId> {
        if let Some(user) = self.adopt_current() {
            return Ok(user);
        }

        let _guard = self.sign_in_lock.lock().await;
        if let Some(user) = self.adopt_current() {
            return Ok(user);
        }

        let result = match self.initial_token.as_deref() {
            Some(token) => self.auth.sign_in_with_custom_token(token).await,
            None => self.auth.sign_in_anonymously().await,
        };

        match result {
            Ok(user) => Ok(self.publish(user)),
            Err(err) => {
                tracing::error!(error = %err, "sign in failed");
                Err(err)
            }
        }
    }

    /// Identity already known to the session or its provider, published if
    /// the session had not seen it yet.
    fn adopt_current(&self) -> Option<UserId> {
        if let AuthState::Authenticated(user) = self.state() {
            return Some(user);
        }
        self.auth.current_user().map(|user| self.publish(user))
    }

    fn publish(&self, user: UserId) -> UserId {
        let changed = self.state.send_if_modified(|state| {
            if state.user().is_some() {
                return false;
            }
            *state = AuthState::Authenticated(user.clone());
            true
        });
        if changed {
            tracing::info!(user = %user, "session authenticated");
        }
        self.state().user().cloned().unwrap_or(user)
    }

    /// Register for auth state changes. The current state is available
    /// immediately through [`Subscription::current`].
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.state.subscribe(),
        }
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
        tracing::debug!(remaining = self.subscriber_count(), "auth subscription released");
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }
}

/// The session is itself an auth provider, so the upload flow shares the
/// identity the chat shows and every sign in is published to subscribers.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AuthProvider for Session {
    fn current_user(&self) -> Option<UserId> {
        self.state().user().cloned().or_else(|| self.auth.current_user())
    }

    async fn sign_in_anonymously(&self) -> AuthResult<UserId> {
        let user = self.auth.sign_in_anonymously().await?;
        Ok(self.publish(user))
    }

    async fn sign_in_with_custom_token(&self, token: &str) -> AuthResult<UserId> {
        let user = self.auth.sign_in_with_custom_token(token).await?;
        Ok(self.publish(user))
    }

    async fn ensure_anonymous_identity(&self) -> AuthResult<UserId> {
        self.sign_in().await
    }
}

pub struct Subscription {
    receiver: watch::Receiver<AuthState>,
}

impl Subscription {
    pub fn current(&self) -> AuthState {
        self.receiver.borrow().clone()
    }

    /// Wait for the next state change. Returns `None` once the session is
    /// gone.
    pub async fn changed(&mut self) -> Option<AuthState> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryAuth;

    #[tokio::test]
    async fn test_sign_in_transitions_once() {
        let auth = Arc::new(MemoryAuth::new());
        let session = Session::new(auth.clone(), None);
        assert_eq!(session.state(), AuthState::Unauthenticated);

        let first = session.sign_in().await.unwrap();
        let second = session.sign_in().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(auth.sign_in_count(), 1);
        assert_eq!(session.state(), AuthState::Authenticated(first));
    }

    #[tokio::test]
    async fn test_custom_token_is_preferred() {
        let auth = Arc::new(MemoryAuth::new());
        let session = Session::new(auth, Some("abc".to_string()));

        let user = session.sign_in().await.unwrap();
        assert_eq!(user.as_str(), "token-abc");
    }

    #[tokio::test]
    async fn test_subscriber_sees_transition() {
        let session = Session::new(Arc::new(MemoryAuth::new()), None);
        let mut subscription = session.subscribe();
        assert_eq!(subscription.current(), AuthState::Unauthenticated);

        let user = session.sign_in().await.unwrap();
        let next = subscription.changed().await;

        assert_eq!(next, Some(AuthState::Authenticated(user)));
    }

    #[tokio::test]
    async fn test_sign_in_adopts_identity_from_provider() {
        let auth = Arc::new(MemoryAuth::new());
        let session = Session::new(auth.clone(), Some("abc".to_string()));
        let mut subscription = session.subscribe();

        let earlier = auth.ensure_anonymous_identity().await.unwrap();
        let user = session.sign_in().await.unwrap();

        assert_eq!(user, earlier);
        assert_eq!(auth.sign_in_count(), 1);
        assert_eq!(
            subscription.changed().await,
            Some(AuthState::Authenticated(earlier))
        );
    }

    #[tokio::test]
    async fn test_concurrent_sign_ins_share_identity() {
        let auth = Arc::new(MemoryAuth::new());
        let session = Session::new(auth.clone(), None);

        let (first, second) = tokio::join!(session.sign_in(), session.ensure_anonymous_identity());

        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(auth.sign_in_count(), 1);
    }

    #[test]
    fn test_unsubscribe_releases_receiver() {
        let session = Session::new(Arc::new(MemoryAuth::new()), None);
        let subscription = session.subscribe();
        assert_eq!(session.subscriber_count(), 1);

        session.unsubscribe(subscription);
        assert_eq!(session.subscriber_count(), 0);
    }
}
