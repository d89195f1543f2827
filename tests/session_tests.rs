//! Integration tests for backend wiring and the sign-in session

use arogya::backend::{AuthProvider, Backend};
use arogya::chat::{ChatFlow, GREETING};
use arogya::config::{BackendConfig, BackendKind};
use arogya::types::{AuthState, SelectedFile, UploadStatus};
use arogya::upload::UploadFlow;

fn memory_backend() -> Backend {
    Backend::from_config(BackendConfig {
        kind: BackendKind::Memory,
        ..BackendConfig::default()
    })
}

mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_drives_chat_greeting() {
        let backend = memory_backend();
        let mut subscription = backend.session.subscribe();
        let mut chat = ChatFlow::new();
        assert!(subscription.current().user().is_none());

        let user = backend.session.sign_in().await.unwrap();
        if let Some(AuthState::Authenticated(signed_in)) = subscription.changed().await {
            chat.on_authenticated(signed_in);
        }
        backend.session.unsubscribe(subscription);

        assert_eq!(chat.user(), Some(&user));
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].text, GREETING);
        assert_eq!(backend.session.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_session_and_upload_share_identity() {
        let backend = memory_backend();
        let user = backend.session.sign_in().await.unwrap();

        let mut upload = UploadFlow::new(&backend);
        upload.select_file(SelectedFile::new("a.txt", b"a".to_vec()));
        let status = upload.submit_upload().await.clone();

        assert_eq!(backend.auth.current_user(), Some(user.clone()));
        assert_eq!(
            status,
            UploadStatus::Success(format!("memory://objects/documents/{user}/a.txt"))
        );
    }

    #[tokio::test]
    async fn test_upload_before_chat_sign_in_keeps_one_identity() {
        let backend = memory_backend();
        let mut subscription = backend.session.subscribe();

        let mut upload = UploadFlow::new(&backend);
        upload.select_file(SelectedFile::new("a.txt", b"a".to_vec()));
        upload.submit_upload().await;
        let uploader = backend.auth.current_user().expect("upload signed in");

        assert_eq!(
            subscription.changed().await,
            Some(AuthState::Authenticated(uploader.clone()))
        );

        let chat_user = backend.session.sign_in().await.unwrap();
        assert_eq!(chat_user, uploader);
        assert_eq!(backend.auth.current_user(), Some(uploader.clone()));

        upload.select_file(SelectedFile::new("b.txt", b"b".to_vec()));
        let status = upload.submit_upload().await.clone();
        assert_eq!(
            status,
            UploadStatus::Success(format!("memory://objects/documents/{uploader}/b.txt"))
        );
    }

    #[tokio::test]
    async fn test_upload_with_token_uses_session_identity() {
        let backend = Backend::from_config(BackendConfig {
            kind: BackendKind::Memory,
            initial_auth_token: Some("seeded".to_string()),
            ..BackendConfig::default()
        });

        let mut upload = UploadFlow::new(&backend);
        upload.select_file(SelectedFile::new("a.txt", b"a".to_vec()));
        let status = upload.submit_upload().await.clone();
        let chat_user = backend.session.sign_in().await.unwrap();

        assert_eq!(chat_user.as_str(), "token-seeded");
        assert_eq!(
            status,
            UploadStatus::Success("memory://objects/documents/token-seeded/a.txt".to_string())
        );
    }

    #[tokio::test]
    async fn test_initial_token_sign_in() {
        let backend = Backend::from_config(BackendConfig {
            kind: BackendKind::Memory,
            initial_auth_token: Some("seeded".to_string()),
            ..BackendConfig::default()
        });

        let user = backend.session.sign_in().await.unwrap();
        assert_eq!(user.as_str(), "token-seeded");
        assert_eq!(backend.session.state(), AuthState::Authenticated(user));
    }
}
