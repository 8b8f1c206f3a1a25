use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable holding a service account key path or inline JSON.
pub const FIREBASE_CREDENTIALS_ENV: &str = "FIREBASE_CREDENTIALS";

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const FIRESTORE_API_URL: &str = "https://firestore.googleapis.com/v1";
pub const FIRESTORE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/datastore",
];

/// Collection read by the connectivity probe.
pub const TEST_COLLECTION: &str = "test_connection";

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Config {
    pub loglevel: String,
    /// `host:port` of a local Firestore emulator.
    pub firestore_emulator_host: Option<String>,
    /// Overrides the Firestore REST base URL.
    pub firestore_endpoint: Option<Url>,
    pub google_cloud_project: Option<String>,
    pub gcloud_project: Option<String>,
    pub proxy: Option<Url>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: "info".to_string(),
            firestore_emulator_host: None,
            firestore_endpoint: None,
            google_cloud_project: None,
            gcloud_project: None,
            proxy: None,
        }
    }
}

impl Config {
    /// Layer defaults, `config.toml` and environment variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw().only(&[
                "LOGLEVEL",
                "FIRESTORE_EMULATOR_HOST",
                "FIRESTORE_ENDPOINT",
                "GOOGLE_CLOUD_PROJECT",
                "GCLOUD_PROJECT",
                "PROXY",
            ]))
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// Project id from the environment, if any.
    pub fn project_id(&self) -> Option<&str> {
        self.google_cloud_project
            .as_deref()
            .or(self.gcloud_project.as_deref())
            .filter(|p| !p.is_empty())
    }

    /// Raw `FIREBASE_CREDENTIALS` value.
    ///
    /// Read verbatim from the process environment: the figment env provider
    /// would parse inline JSON into a dictionary value.
    pub fn credential_source() -> Option<String> {
        std::env::var(FIREBASE_CREDENTIALS_ENV).ok()
    }
}
