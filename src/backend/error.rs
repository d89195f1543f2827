/// Identity could not be established.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("Auth request failed: {0}")]
    Network(String),

    #[error("Auth service error {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Unexpected auth response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

/// Writing an object or resolving its URL failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Network(String),

    #[error("Storage service error {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Unexpected storage response: {0}")]
    InvalidResponse(String),

    #[error("Invalid object handle: {0}")]
    InvalidHandle(String),

    #[error("No signed-in user for storage access")]
    Unauthenticated,

    #[error("Could not refresh storage credentials: {0}")]
    TokenRefresh(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Network(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Any failure of the upload sequence, caught at the flow boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
