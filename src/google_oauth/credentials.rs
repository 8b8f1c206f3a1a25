use crate::config::GOOGLE_TOKEN_URI;
use crate::error::FirebaseError;
use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const GOOGLE_APPLICATION_CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
const WELL_KNOWN_FILE: &str = "application_default_credentials.json";

/// Where a service account key comes from.
///
/// Nothing is read or validated until [`Credential::load`] runs, which happens
/// when an app is initialized.
#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    File(PathBuf),
    Inline(Map<String, Value>),
}

impl Credential {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn from_json(object: Map<String, Value>) -> Self {
        Self::Inline(object)
    }

    /// Read and validate the service account key.
    pub fn load(&self) -> Result<ServiceAccountKey, FirebaseError> {
        match self {
            Self::File(path) => {
                let value = read_json(path)?;
                ServiceAccountKey::from_payload(&value)
            }
            Self::Inline(object) => ServiceAccountKey::from_payload(&Value::Object(object.clone())),
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "service account file {}", path.display()),
            Self::Inline(_) => f.write_str("inline service account JSON"),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parse a `"type": "service_account"` key and check its private key.
    pub fn from_payload(payload: &Value) -> Result<Self, FirebaseError> {
        match payload.get("type").and_then(Value::as_str) {
            Some("service_account") => {}
            Some(other) => {
                return Err(FirebaseError::InvalidCredential(format!(
                    "expected type \"service_account\", found \"{other}\""
                )));
            }
            None => {
                return Err(FirebaseError::InvalidCredential(
                    "missing \"type\" field".to_string(),
                ));
            }
        }

        let key: ServiceAccountKey = serde_json::from_value(payload.clone())
            .map_err(|e| FirebaseError::InvalidCredential(e.to_string()))?;
        key.signing_key()?;
        Ok(key)
    }

    pub fn signing_key(&self) -> Result<EncodingKey, FirebaseError> {
        EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            FirebaseError::InvalidCredential(format!("failed to parse private key: {e}"))
        })
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// User credentials written by `gcloud auth application-default login`.
#[derive(Clone, Deserialize)]
pub struct AuthorizedUserKey {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub quota_project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for AuthorizedUserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUserKey")
            .field("client_id", &self.client_id)
            .field("quota_project_id", &self.quota_project_id)
            .finish_non_exhaustive()
    }
}

/// A key found through Application Default Credentials.
#[derive(Debug, Clone)]
pub enum CredentialKey {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserKey),
}

impl CredentialKey {
    pub fn from_payload(payload: &Value) -> Result<Self, FirebaseError> {
        match payload.get("type").and_then(Value::as_str) {
            Some("authorized_user") => serde_json::from_value(payload.clone())
                .map(Self::AuthorizedUser)
                .map_err(|e| FirebaseError::InvalidCredential(e.to_string())),
            _ => ServiceAccountKey::from_payload(payload).map(Self::ServiceAccount),
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(key) => key.project_id.as_deref(),
            Self::AuthorizedUser(key) => key.quota_project_id.as_deref(),
        }
    }
}

/// Discover Application Default Credentials from the process environment.
pub fn application_default() -> Result<CredentialKey, FirebaseError> {
    application_default_with(|name| std::env::var(name).ok())
}

/// ADC discovery over an arbitrary variable lookup.
///
/// Order: `GOOGLE_APPLICATION_CREDENTIALS`, then the gcloud well-known file.
pub fn application_default_with(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<CredentialKey, FirebaseError> {
    if let Some(path) = lookup(GOOGLE_APPLICATION_CREDENTIALS_ENV).filter(|p| !p.is_empty()) {
        let path = PathBuf::from(path);
        info!(path = %path.display(), "using {GOOGLE_APPLICATION_CREDENTIALS_ENV}");
        return CredentialKey::from_payload(&read_json(&path)?);
    }

    match well_known_file(&lookup) {
        Some(path) if path.is_file() => {
            info!(path = %path.display(), "using gcloud application default credentials");
            CredentialKey::from_payload(&read_json(&path)?)
        }
        Some(path) => {
            debug!(path = %path.display(), "gcloud credentials file not found");
            Err(FirebaseError::DefaultCredentialsNotFound)
        }
        None => Err(FirebaseError::DefaultCredentialsNotFound),
    }
}

fn well_known_file(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(dir) = lookup("CLOUDSDK_CONFIG").filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir).join(WELL_KNOWN_FILE));
    }
    if cfg!(windows) {
        lookup("APPDATA").map(|dir| PathBuf::from(dir).join("gcloud").join(WELL_KNOWN_FILE))
    } else {
        lookup("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("gcloud")
                .join(WELL_KNOWN_FILE)
        })
    }
}

fn read_json(path: &Path) -> Result<Value, FirebaseError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
