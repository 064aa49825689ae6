use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, RequestBuilder, Response, StatusCode,
};
use serde::Deserialize;
use shared::{
    domain::UserId,
    error::{ApiError, ApiException},
    protocol::{InsertOutcome, StartupRecord, IDEMPOTENCY_COLUMN},
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use url::Url;

pub mod config;
pub mod session;
pub mod upload;

pub use config::{load_settings, load_settings_from, BackendSettings, ConfigError, UploadFailurePolicy};
pub use session::{AuthEvent, AuthSession, SessionError, UserIdentity};
pub use upload::{object_path, try_upload_file, upload_file, UploadFile};

const AUTH_EVENT_CAPACITY: usize = 16;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Asks the provider who the current session belongs to. `None` means no
    /// signed-in user.
    async fn current_user(&self) -> Result<Option<UserIdentity>>;
    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload_object(
        &self,
        path: &str,
        content: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<()>;
    fn public_url(&self, path: &str) -> Result<String>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_startup(&self, record: &StartupRecord) -> Result<InsertOutcome>;
}

pub struct MissingIdentityProvider {
    events: broadcast::Sender<AuthEvent>,
}

impl Default for MissingIdentityProvider {
    fn default() -> Self {
        let (events, _) = broadcast::channel(1);
        Self { events }
    }
}

#[async_trait]
impl IdentityProvider for MissingIdentityProvider {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        Err(anyhow!("identity provider is unavailable"))
    }

    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

pub struct MissingObjectStorage;

#[async_trait]
impl ObjectStorage for MissingObjectStorage {
    async fn upload_object(
        &self,
        path: &str,
        _content: Vec<u8>,
        _content_type: &str,
        _upsert: bool,
    ) -> Result<()> {
        Err(anyhow!("object storage is unavailable; cannot store {path}"))
    }

    fn public_url(&self, path: &str) -> Result<String> {
        Err(anyhow!("object storage is unavailable; no url for {path}"))
    }
}

#[derive(Debug, Deserialize)]
struct AuthUserResponse {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
}

/// Client for the hosted backend: auth, object storage and the REST table
/// endpoint share one HTTP client and one session.
pub struct SupabaseClient {
    http: Client,
    settings: BackendSettings,
    session: RwLock<Option<AuthSession>>,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl SupabaseClient {
    pub fn new(settings: BackendSettings) -> Arc<Self> {
        Self::with_http_client(settings, Client::new())
    }

    pub fn with_http_client(settings: BackendSettings, http: Client) -> Arc<Self> {
        let (auth_events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Arc::new(Self {
            http,
            settings,
            session: RwLock::new(None),
            auth_events,
        })
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    pub async fn install_session(&self, session: AuthSession) {
        let identity = session.identity().clone();
        info!(user_id = %identity.user_id, "auth: session installed");
        *self.session.write().await = Some(session);
        let _ = self.auth_events.send(AuthEvent::SignedIn(identity));
    }

    /// Drops the local session. The backend session itself is left alone.
    pub async fn sign_out(&self) {
        let previous = self.session.write().await.take();
        if let Some(previous) = previous {
            info!(user_id = %previous.identity().user_id, "auth: signed out");
            let _ = self.auth_events.send(AuthEvent::SignedOut);
        }
    }

    async fn bearer_token(&self) -> String {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token().to_string())
            .unwrap_or_else(|| self.settings.anon_key.clone())
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.settings.url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("backend url {} cannot be a base", self.settings.url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn object_segments(path: &str) -> impl Iterator<Item = &str> {
        path.split('/').filter(|segment| !segment.is_empty())
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.bearer_token().await))
            .map_err(|_| anyhow!("access token contains characters not allowed in a header"))?;
        Ok(request
            .header("apikey", self.settings.anon_key.as_str())
            .header(AUTHORIZATION, bearer))
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiException::from(ApiError::from_response(status.as_u16(), &body)).into())
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        if self.session.read().await.is_none() {
            debug!("auth: no session installed");
            return Ok(None);
        }

        let request = self
            .authorized(self.http.get(self.endpoint(["auth", "v1", "user"])?))
            .await?;
        let response = request.send().await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            warn!(status = %response.status(), "auth: session rejected by identity provider");
            return Ok(None);
        }

        let user: AuthUserResponse = ensure_success(response).await?.json().await?;
        Ok(Some(UserIdentity {
            user_id: user.id,
            email: user.email.filter(|e| !e.is_empty()),
        }))
    }

    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }
}

#[async_trait]
impl ObjectStorage for SupabaseClient {
    async fn upload_object(
        &self,
        path: &str,
        content: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<()> {
        let url = self.endpoint(
            ["storage", "v1", "object", self.settings.bucket.as_str()]
                .into_iter()
                .chain(Self::object_segments(path)),
        )?;

        let request = self
            .authorized(
                self.http
                    .post(url)
                    .header(CONTENT_TYPE, content_type)
                    .header("x-upsert", if upsert { "true" } else { "false" })
                    .body(content),
            )
            .await?;
        ensure_success(request.send().await?).await?;

        debug!(bucket = %self.settings.bucket, %path, upsert, "storage: object written");
        Ok(())
    }

    fn public_url(&self, path: &str) -> Result<String> {
        let url = self.endpoint(
            [
                "storage",
                "v1",
                "object",
                "public",
                self.settings.bucket.as_str(),
            ]
            .into_iter()
            .chain(Self::object_segments(path)),
        )?;
        Ok(url.to_string())
    }
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn insert_startup(&self, record: &StartupRecord) -> Result<InsertOutcome> {
        let mut url = self.endpoint(["rest", "v1", self.settings.table.as_str()])?;
        url.query_pairs_mut()
            .append_pair("on_conflict", IDEMPOTENCY_COLUMN);

        let request = self
            .authorized(
                self.http
                    .post(url)
                    .header("Prefer", "return=representation,resolution=ignore-duplicates")
                    .json(record),
            )
            .await?;
        let inserted: Vec<serde_json::Value> =
            ensure_success(request.send().await?).await?.json().await?;

        let outcome = if inserted.is_empty() {
            InsertOutcome::AlreadyRecorded
        } else {
            InsertOutcome::Created
        };
        info!(
            table = %self.settings.table,
            user_id = %record.user_id,
            idempotency_key = %record.idempotency_key,
            ?outcome,
            "records: startup insert acknowledged"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
