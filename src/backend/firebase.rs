use super::{
    AuthError, AuthProvider, AuthResult, ObjectHandle, ObjectStore, StorageError, StorageResult,
};
use crate::types::UserId;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use time::{Duration, OffsetDateTime};

const IDENTITY_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_BASE: &str = "https://securetoken.googleapis.com/v1";
const STORAGE_BASE: &str = "https://firebasestorage.googleapis.com";

/// ID tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::minutes(5);
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

// ============================================
// Auth (Identity Toolkit REST API)
// ============================================

#[derive(Clone, Debug)]
struct AuthSession {
    user_id: UserId,
    id_token: String,
    refresh_token: Option<String>,
    expires_at: OffsetDateTime,
}

impl AuthSession {
    fn needs_refresh(&self, now: OffsetDateTime) -> bool {
        now + REFRESH_MARGIN >= self.expires_at
    }
}

/// Expiry for an `expiresIn` value in seconds, one hour when absent or
/// malformed.
fn expiry_from(expires_in: Option<&str>, now: OffsetDateTime) -> OffsetDateTime {
    let secs = expires_in
        .and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    now + Duration::seconds(secs)
}

/// Anonymous and custom-token sign in against the Identity Toolkit API
pub struct FirebaseAuth {
    client: Client,
    api_key: String,
    base_url: String,
    token_url: String,
    session: RwLock<Option<AuthSession>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest {
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomTokenRequest<'a> {
    token: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
    local_id: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

/// Secure Token API answer, which is snake_case unlike Identity Toolkit.
#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Pull the human readable message out of a Google API error body.
fn service_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string())
}

fn parse_auth_body<R>(status: StatusCode, text: &str) -> AuthResult<R>
where
    R: for<'de> Deserialize<'de>,
{
    if !status.is_success() {
        return Err(AuthError::Service {
            status: status.as_u16(),
            message: service_message(text),
        });
    }
    serde_json::from_str(text).map_err(|e| AuthError::InvalidResponse(e.to_string()))
}

impl FirebaseAuth {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoints(
            api_key,
            IDENTITY_BASE.to_string(),
            SECURE_TOKEN_BASE.to_string(),
        )
    }

    /// Point at different Identity Toolkit and Secure Token hosts, e.g. the
    /// local emulator
    pub fn with_endpoints(api_key: String, base_url: String, token_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_url: token_url.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
        }
    }

    fn session_snapshot(&self) -> Option<AuthSession> {
        self.session.read().ok()?.clone()
    }

    /// ID token of the signed-in user for authorizing storage requests.
    ///
    /// Tokens close to expiry are exchanged for new ones first; the uid
    /// stays the same. `None` when nobody is signed in.
    pub async fn fresh_id_token(&self) -> AuthResult<Option<String>> {
        let Some(session) = self.session_snapshot() else {
            return Ok(None);
        };
        if !session.needs_refresh(OffsetDateTime::now_utc()) {
            return Ok(Some(session.id_token));
        }
        match session.refresh_token {
            Some(refresh_token) => self.refresh(&refresh_token).await.map(Some),
            None => {
                tracing::warn!(user = %session.user_id, "id token expired without refresh token");
                Ok(Some(session.id_token))
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<String> {
        let response = self
            .client
            .post(format!("{}/token?key={}", self.token_url, self.api_key))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        let body: RefreshResponse = parse_auth_body(status, &text)?;

        tracing::debug!(user = %body.user_id, "id token refreshed");
        self.store_session(
            UserId::new(body.user_id),
            body.id_token.clone(),
            Some(body.refresh_token),
            Some(body.expires_in.as_str()),
        );
        Ok(body.id_token)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{}?key={}", self.base_url, method, self.api_key)
    }

    async fn post<B, R>(&self, method: &str, body: &B) -> AuthResult<R>
    where
        B: Serialize + ?Sized + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        parse_auth_body(status, &text)
    }

    fn store_session(
        &self,
        user_id: UserId,
        id_token: String,
        refresh_token: Option<String>,
        expires_in: Option<&str>,
    ) -> UserId {
        if let Ok(mut session) = self.session.write() {
            *session = Some(AuthSession {
                user_id: user_id.clone(),
                id_token,
                refresh_token,
                expires_at: expiry_from(expires_in, OffsetDateTime::now_utc()),
            });
        }
        user_id
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AuthProvider for FirebaseAuth {
    fn current_user(&self) -> Option<UserId> {
        self.session
            .read()
            .ok()?
            .as_ref()
            .map(|session| session.user_id.clone())
    }

    async fn sign_in_anonymously(&self) -> AuthResult<UserId> {
        let response: TokenResponse = self
            .post(
                "signUp",
                &SignUpRequest {
                    return_secure_token: true,
                },
            )
            .await?;
        let local_id = response
            .local_id
            .ok_or_else(|| AuthError::InvalidResponse("missing localId".to_string()))?;
        tracing::info!(user = %local_id, "signed in anonymously");
        Ok(self.store_session(
            UserId::new(local_id),
            response.id_token,
            response.refresh_token,
            response.expires_in.as_deref(),
        ))
    }

    async fn sign_in_with_custom_token(&self, token: &str) -> AuthResult<UserId> {
        let response: TokenResponse = self
            .post(
                "signInWithCustomToken",
                &CustomTokenRequest {
                    token,
                    return_secure_token: true,
                },
            )
            .await?;

        // The custom token exchange does not echo the uid, look it up.
        let local_id = match response.local_id {
            Some(id) => id,
            None => {
                let lookup: LookupResponse = self
                    .post(
                        "lookup",
                        &LookupRequest {
                            id_token: &response.id_token,
                        },
                    )
                    .await?;
                lookup
                    .users
                    .into_iter()
                    .next()
                    .map(|user| user.local_id)
                    .ok_or_else(|| AuthError::InvalidResponse("no user for token".to_string()))?
            }
        };
        tracing::info!(user = %local_id, "signed in with custom token");
        Ok(self.store_session(
            UserId::new(local_id),
            response.id_token,
            response.refresh_token,
            response.expires_in.as_deref(),
        ))
    }
}

// ============================================
// Storage (Firebase Storage v0 REST API)
// ============================================

/// Object storage in a Firebase Storage bucket
pub struct FirebaseStorage {
    client: Client,
    bucket: String,
    base_url: String,
    auth: Arc<FirebaseAuth>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    name: String,
    download_tokens: Option<String>,
}

impl FirebaseStorage {
    pub fn new(bucket: String, auth: Arc<FirebaseAuth>) -> Self {
        Self::with_base_url(bucket, auth, STORAGE_BASE.to_string())
    }

    pub fn with_base_url(bucket: String, auth: Arc<FirebaseAuth>, base_url: String) -> Self {
        Self {
            client: Client::new(),
            bucket,
            base_url,
            auth,
        }
    }

    /// `{base}/v0/b/{bucket}/o[/{object}]` with the object path encoded as a
    /// single segment.
    fn object_url(&self, object: Option<&str>) -> StorageResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StorageError::InvalidResponse(format!("bad storage url: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::InvalidResponse("storage url cannot be a base".into()))?;
            segments
                .pop_if_empty()
                .extend(["v0", "b", self.bucket.as_str(), "o"]);
            if let Some(object) = object {
                segments.push(object);
            }
        }
        Ok(url)
    }

    async fn authorization(&self) -> StorageResult<String> {
        match self.auth.fresh_id_token().await {
            Ok(Some(token)) => Ok(format!("Firebase {token}")),
            Ok(None) => Err(StorageError::Unauthenticated),
            Err(err) => Err(StorageError::TokenRefresh(err.to_string())),
        }
    }

    async fn read_metadata(&self, response: reqwest::Response) -> StorageResult<ObjectMetadata> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StorageError::Service {
                status: status.as_u16(),
                message: service_message(&text),
            });
        }
        serde_json::from_str(&text).map_err(|e| StorageError::InvalidResponse(e.to_string()))
    }
}

fn first_token(tokens: Option<String>) -> Option<String> {
    tokens?
        .split(',')
        .map(str::trim)
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ObjectStore for FirebaseStorage {
    async fn write(&self, path: &str, bytes: Vec<u8>) -> StorageResult<ObjectHandle> {
        let mut url = self.object_url(None)?;
        url.query_pairs_mut().append_pair("name", path);
        let authorization = self.authorization().await?;

        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        let metadata = self.read_metadata(response).await?;

        tracing::debug!(object = %metadata.name, bucket = %self.bucket, "object written");
        Ok(ObjectHandle {
            path: metadata.name,
            token: first_token(metadata.download_tokens),
        })
    }

    async fn public_url(&self, handle: &ObjectHandle) -> StorageResult<String> {
        if handle.path.trim().is_empty() {
            return Err(StorageError::InvalidHandle("empty object path".to_string()));
        }

        let token = match handle.token.clone() {
            Some(token) => token,
            None => {
                let authorization = self.authorization().await?;
                let response = self
                    .client
                    .get(self.object_url(Some(&handle.path))?)
                    .header(reqwest::header::AUTHORIZATION, authorization)
                    .send()
                    .await?;
                let metadata = self.read_metadata(response).await?;
                first_token(metadata.download_tokens).ok_or_else(|| {
                    StorageError::InvalidHandle(format!("no download token for {}", handle.path))
                })?
            }
        };

        let mut url = self.object_url(Some(&handle.path))?;
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", &token);
        Ok(url.to_string())
    }
}
