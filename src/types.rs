use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    #[serde(skip)]
    pub created_at: Option<OffsetDateTime>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            created_at: Some(OffsetDateTime::now_utc()),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            created_at: Some(OffsetDateTime::now_utc()),
        }
    }
}

/// Opaque identity issued by the auth provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated(UserId),
}

impl AuthState {
    pub fn user(&self) -> Option<&UserId> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            AuthState::Unauthenticated => None,
        }
    }
}

/// A file picked by the user, already read into memory.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum UploadStatus {
    #[default]
    Idle,
    NoFileSelected,
    Uploading,
    Success(String),
    Failure,
}

impl UploadStatus {
    /// Text shown in the status region. The URL of a successful upload is
    /// rendered separately as a link.
    pub fn message(&self) -> &'static str {
        match self {
            UploadStatus::Idle => "",
            UploadStatus::NoFileSelected => "Please select a file first.",
            UploadStatus::Uploading => "Uploading...",
            UploadStatus::Success(_) => "File uploaded successfully!",
            UploadStatus::Failure => "Error uploading file. Please try again.",
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            UploadStatus::Success(url) => Some(url),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, UploadStatus::Uploading)
    }
}
