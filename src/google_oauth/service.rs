use super::endpoints::{BearerToken, GoogleOauthEndpoints};
use crate::error::FirebaseError;
use crate::google_oauth::credentials::{AuthorizedUserKey, CredentialKey, ServiceAccountKey};
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

/// Bearer value the Firestore emulator accepts as an admin credential.
pub const EMULATOR_TOKEN: &str = "owner";
const REFRESH_MARGIN_SECS: i64 = 60;

/// What an app authenticates with.
#[derive(Debug, Clone)]
pub enum TokenSource {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserKey),
    Emulator,
}

impl From<CredentialKey> for TokenSource {
    fn from(key: CredentialKey) -> Self {
        match key {
            CredentialKey::ServiceAccount(k) => Self::ServiceAccount(k),
            CredentialKey::AuthorizedUser(k) => Self::AuthorizedUser(k),
        }
    }
}

impl TokenSource {
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(key) => key.project_id.as_deref(),
            Self::AuthorizedUser(key) => key.quota_project_id.as_deref(),
            Self::Emulator => None,
        }
    }
}

/// Service layer to hand out access tokens, fetching a new one only when the
/// cached token is about to expire.
#[derive(Debug)]
pub struct GoogleOauthService {
    source: TokenSource,
    cached: Mutex<Option<BearerToken>>,
}

impl GoogleOauthService {
    pub fn new(source: TokenSource) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &TokenSource {
        &self.source
    }

    pub async fn access_token(&self, http_client: &reqwest::Client) -> Result<String, FirebaseError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.is_fresh(Utc::now(), Duration::seconds(REFRESH_MARGIN_SECS))
        {
            return Ok(token.value.clone());
        }

        let token = match &self.source {
            TokenSource::Emulator => return Ok(EMULATOR_TOKEN.to_string()),
            TokenSource::ServiceAccount(key) => {
                GoogleOauthEndpoints::exchange_jwt_assertion(key, http_client.clone()).await?
            }
            TokenSource::AuthorizedUser(key) => {
                GoogleOauthEndpoints::refresh_access_token(key, http_client.clone()).await?
            }
        };
        debug!(expires_at = %token.expires_at, "cached new access token");
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}
