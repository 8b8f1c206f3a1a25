use crate::config::Config;
use crate::error::FirebaseError;
use crate::google_oauth::credentials::{Credential, application_default};
use crate::google_oauth::service::{GoogleOauthService, TokenSource};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_APP_NAME: &str = "[DEFAULT]";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppOptions {
    /// Used when the credential does not name a project.
    pub project_id: Option<String>,
    /// `host:port` of a Firestore emulator; requests then carry emulator auth.
    pub firestore_emulator_host: Option<String>,
    pub firestore_endpoint: Option<Url>,
    pub proxy: Option<Url>,
}

impl From<&Config> for AppOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            project_id: cfg.project_id().map(str::to_string),
            firestore_emulator_host: cfg
                .firestore_emulator_host
                .clone()
                .filter(|h| !h.is_empty()),
            firestore_endpoint: cfg.firestore_endpoint.clone(),
            proxy: cfg.proxy.clone(),
        }
    }
}

/// An initialized backend context: a named credential plus its options.
#[derive(Debug)]
pub struct FirebaseApp {
    name: String,
    project_id: Option<String>,
    options: AppOptions,
    auth: Arc<GoogleOauthService>,
}

impl FirebaseApp {
    fn new(
        name: &str,
        credential: Option<Credential>,
        options: AppOptions,
    ) -> Result<Self, FirebaseError> {
        let source = match credential {
            Some(credential) => TokenSource::ServiceAccount(credential.load()?),
            None if options.firestore_emulator_host.is_some() => TokenSource::Emulator,
            None => application_default()?.into(),
        };
        Ok(Self::with_source(name, source, options))
    }

    /// The source's project wins over `options.project_id`.
    pub(crate) fn with_source(name: &str, source: TokenSource, options: AppOptions) -> Self {
        let project_id = source
            .project_id()
            .map(str::to_string)
            .or_else(|| options.project_id.clone());

        Self {
            name: name.to_string(),
            project_id,
            options,
            auth: Arc::new(GoogleOauthService::new(source)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    pub fn auth(&self) -> Arc<GoogleOauthService> {
        self.auth.clone()
    }
}

/// Registry of initialized apps, owned by the caller.
///
/// Each registry is independent, so tests can build as many as they like.
#[derive(Debug, Default)]
pub struct FirebaseApps {
    apps: RwLock<HashMap<String, Arc<FirebaseApp>>>,
}

impl FirebaseApps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_app(&self, name: &str) -> Result<Arc<FirebaseApp>, FirebaseError> {
        self.apps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| FirebaseError::AppNotFound(name.to_string()))
    }

    /// Create and register an app. Without a credential, default discovery applies.
    pub fn initialize_app(
        &self,
        credential: Option<Credential>,
        options: AppOptions,
        name: &str,
    ) -> Result<Arc<FirebaseApp>, FirebaseError> {
        if self.contains(name) {
            return Err(FirebaseError::AppAlreadyExists(name.to_string()));
        }
        let app = Arc::new(FirebaseApp::new(name, credential, options)?);

        let mut apps = self.apps.write().unwrap_or_else(PoisonError::into_inner);
        if apps.contains_key(name) {
            return Err(FirebaseError::AppAlreadyExists(name.to_string()));
        }
        apps.insert(name.to_string(), app.clone());
        info!(
            app = %name,
            project_id = %app.project_id().unwrap_or("<none>"),
            "Firebase app initialised"
        );
        Ok(app)
    }

    pub fn delete_app(&self, name: &str) -> Result<(), FirebaseError> {
        let removed = self
            .apps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        match removed {
            Some(_) => {
                debug!(app = %name, "Firebase app deleted");
                Ok(())
            }
            None => Err(FirebaseError::AppNotFound(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.apps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.apps.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GOOGLE_TOKEN_URI;
    use crate::google_oauth::credentials::tests::service_account_json;
    use serde_json::Value;

    fn inline_credential() -> Credential {
        let Value::Object(object) = service_account_json(GOOGLE_TOKEN_URI) else {
            unreachable!()
        };
        Credential::from_json(object)
    }

    fn emulator_options() -> AppOptions {
        AppOptions {
            project_id: Some("emulated".to_string()),
            firestore_emulator_host: Some("localhost:8080".to_string()),
            ..AppOptions::default()
        }
    }

    #[test]
    fn credential_project_wins_over_options() {
        let apps = FirebaseApps::new();
        let app = apps
            .initialize_app(Some(inline_credential()), emulator_options(), DEFAULT_APP_NAME)
            .unwrap();

        assert_eq!(app.name(), DEFAULT_APP_NAME);
        assert_eq!(app.project_id(), Some("demo-project"));
        assert!(matches!(app.auth().source(), TokenSource::ServiceAccount(_)));
    }

    #[test]
    fn emulator_without_credential_uses_options_project() {
        let apps = FirebaseApps::new();
        let app = apps
            .initialize_app(None, emulator_options(), DEFAULT_APP_NAME)
            .unwrap();

        assert_eq!(app.project_id(), Some("emulated"));
        assert!(matches!(app.auth().source(), TokenSource::Emulator));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let apps = FirebaseApps::new();
        apps.initialize_app(None, emulator_options(), "probe").unwrap();
        let err = apps
            .initialize_app(None, emulator_options(), "probe")
            .unwrap_err();

        assert!(matches!(err, FirebaseError::AppAlreadyExists(ref n) if n == "probe"));
        assert_eq!(apps.len(), 1);
    }

    #[test]
    fn invalid_credential_leaves_registry_empty() {
        let mut object = serde_json::Map::new();
        object.insert("type".to_string(), Value::from("service_account"));
        let apps = FirebaseApps::new();

        let err = apps
            .initialize_app(Some(Credential::from_json(object)), AppOptions::default(), DEFAULT_APP_NAME)
            .unwrap_err();

        assert!(matches!(err, FirebaseError::InvalidCredential(_)));
        assert!(apps.is_empty());
    }

    #[test]
    fn registries_are_independent() {
        let first = FirebaseApps::new();
        let second = FirebaseApps::new();
        first.initialize_app(None, emulator_options(), DEFAULT_APP_NAME).unwrap();

        assert!(first.get_app(DEFAULT_APP_NAME).is_ok());
        assert!(matches!(
            second.get_app(DEFAULT_APP_NAME),
            Err(FirebaseError::AppNotFound(_))
        ));
    }

    #[test]
    fn delete_app_forgets_it() {
        let apps = FirebaseApps::new();
        apps.initialize_app(None, emulator_options(), DEFAULT_APP_NAME).unwrap();

        apps.delete_app(DEFAULT_APP_NAME).unwrap();
        assert!(!apps.contains(DEFAULT_APP_NAME));
        assert!(apps.delete_app(DEFAULT_APP_NAME).is_err());
    }
}
