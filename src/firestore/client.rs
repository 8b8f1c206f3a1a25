use super::document::{DocumentSnapshot, RunQueryResponse};
use crate::config::FIRESTORE_API_URL;
use crate::error::{FirebaseError, error_from_response};
use crate::firebase::FirebaseApp;
use crate::google_oauth::service::{EMULATOR_TOKEN, GoogleOauthService};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

const DEFAULT_DATABASE: &str = "(default)";

/// Firestore REST client bound to one app.
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    project_id: String,
    base_url: String,
    emulator: bool,
    auth: Arc<GoogleOauthService>,
    http: reqwest::Client,
}

impl FirestoreClient {
    pub fn new(app: &FirebaseApp) -> Result<Self, FirebaseError> {
        let project_id = app
            .project_id()
            .ok_or(FirebaseError::MissingProjectId)?
            .to_string();
        let options = app.options();

        let base_url = match (&options.firestore_emulator_host, &options.firestore_endpoint) {
            (Some(host), _) => format!("http://{host}/v1"),
            (None, Some(endpoint)) => endpoint.as_str().trim_end_matches('/').to_string(),
            (None, None) => FIRESTORE_API_URL.to_string(),
        };
        Url::parse(&base_url)?;

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(proxy_url) = options.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        let http = builder.build()?;

        debug!(project_id = %project_id, base_url = %base_url, "Firestore client built");
        Ok(Self {
            project_id,
            base_url,
            emulator: options.firestore_emulator_host.is_some(),
            auth: app.auth(),
            http,
        })
    }

    /// `projects/{project}/databases/(default)/documents`
    pub fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, DEFAULT_DATABASE
        )
    }

    pub fn collection(&self, collection_id: impl Into<String>) -> CollectionReference<'_> {
        CollectionReference {
            client: self,
            collection_id: collection_id.into(),
        }
    }

    async fn bearer_token(&self) -> Result<String, FirebaseError> {
        if self.emulator {
            return Ok(EMULATOR_TOKEN.to_string());
        }
        self.auth.access_token(&self.http).await
    }

    async fn run_query(&self, query: StructuredQuery<'_>) -> Result<Vec<DocumentSnapshot>, FirebaseError> {
        let token = self.bearer_token().await?;
        let url = format!("{}/{}:runQuery", self.base_url, self.documents_root());

        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&RunQueryRequest {
                structured_query: query,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }

        let rows: Vec<RunQueryResponse> = resp.json().await?;
        let read_time = rows.iter().find_map(|r| r.read_time.as_deref()).unwrap_or("-");
        debug!(rows = rows.len(), read_time = %read_time, "runQuery completed");

        rows.into_iter()
            .filter_map(|row| row.document)
            .map(DocumentSnapshot::from_wire)
            .collect()
    }
}

pub struct CollectionReference<'a> {
    client: &'a FirestoreClient,
    collection_id: String,
}

impl<'a> CollectionReference<'a> {
    pub fn id(&self) -> &str {
        &self.collection_id
    }

    pub fn limit(self, count: u32) -> Query<'a> {
        Query {
            client: self.client,
            collection_id: self.collection_id,
            limit: count,
        }
    }
}

/// A bounded read over one collection.
pub struct Query<'a> {
    client: &'a FirestoreClient,
    collection_id: String,
    limit: u32,
}

impl Query<'_> {
    /// Run the query and collect all results before returning.
    pub async fn get(&self) -> Result<Vec<DocumentSnapshot>, FirebaseError> {
        self.client
            .run_query(StructuredQuery::new(&self.collection_id, self.limit))
            .await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryRequest<'a> {
    structured_query: StructuredQuery<'a>,
}

#[derive(Debug, Serialize)]
struct StructuredQuery<'a> {
    from: [CollectionSelector<'a>; 1],
    limit: u32,
}

impl<'a> StructuredQuery<'a> {
    fn new(collection_id: &'a str, limit: u32) -> Self {
        Self {
            from: [CollectionSelector { collection_id }],
            limit,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionSelector<'a> {
    collection_id: &'a str,
}
