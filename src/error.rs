use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum FirebaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JWT signing error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid service account credential: {0}")]
    InvalidCredential(String),

    #[error(
        "Could not find default credentials; set FIREBASE_CREDENTIALS or GOOGLE_APPLICATION_CREDENTIALS"
    )]
    DefaultCredentialsNotFound,

    #[error(
        "Failed to determine project ID; set a project ID in the credential, GOOGLE_CLOUD_PROJECT or GCLOUD_PROJECT"
    )]
    MissingProjectId,

    #[error("Firebase app named \"{0}\" already exists")]
    AppAlreadyExists(String),

    #[error("Firebase app named \"{0}\" does not exist")]
    AppNotFound(String),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("Google API error {code} {status}: {message}")]
    GoogleApi {
        code: u16,
        status: String,
        message: String,
    },

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("Failed to decode Firestore value: {0}")]
    Decode(String),
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for FirebaseError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => FirebaseError::Oauth2Server {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(req_e) => {
                FirebaseError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => {
                FirebaseError::Json(parse_err.into_inner())
            }
            RequestTokenError::Other(s) => FirebaseError::Oauth2Token(s),
        }
    }
}

/// Outcome categories of the three probe steps.
///
/// The `Display` text of each variant is the console line printed when the
/// step gives up.
#[derive(Debug, ThisError)]
pub enum ProbeError {
    #[error("FIREBASE_CREDENTIALS is not set.")]
    CredentialsNotSet,

    #[error("FIREBASE_CREDENTIALS is neither a readable file nor valid JSON: {0}")]
    MalformedCredentials(#[source] serde_json::Error),

    #[error("Firebase initialisation failed: {0}")]
    Initialization(#[source] FirebaseError),

    #[error("Unable to build Firestore client: {0}")]
    ClientBuild(#[source] FirebaseError),

    #[error("Firestore access failed: {0}")]
    Query(#[source] FirebaseError),
}

/// Google API error response structure
#[derive(Deserialize, Debug)]
pub struct GoogleApiError {
    pub error: GoogleApiErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct GoogleApiErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl From<GoogleApiError> for FirebaseError {
    fn from(value: GoogleApiError) -> Self {
        FirebaseError::GoogleApi {
            code: value.error.code,
            status: value.error.status,
            message: value.error.message,
        }
    }
}

/// OAuth2 token endpoint error body (`{"error": "...", "error_description": "..."}`).
#[derive(Deserialize, Debug)]
pub struct OauthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl From<OauthErrorResponse> for FirebaseError {
    fn from(value: OauthErrorResponse) -> Self {
        let error = match value.error_description {
            Some(desc) => format!("{}: {}", value.error, desc),
            None => value.error,
        };
        FirebaseError::Oauth2Server { error }
    }
}

/// Map a non-success response into the most specific error its body allows.
pub(crate) async fn error_from_response(resp: reqwest::Response) -> FirebaseError {
    let status = resp.status();
    match resp.bytes().await {
        Ok(body) => match serde_json::from_slice::<GoogleApiError>(&body) {
            Ok(api_err) => api_err.into(),
            Err(_) => FirebaseError::UpstreamStatus(status),
        },
        Err(e) => FirebaseError::Reqwest(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_api_error_body_maps_to_typed_error() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        let parsed: GoogleApiError = serde_json::from_str(body).unwrap();
        let err: FirebaseError = parsed.into();

        assert!(matches!(
            err,
            FirebaseError::GoogleApi { code: 403, ref status, .. } if status == "PERMISSION_DENIED"
        ));
        assert_eq!(
            err.to_string(),
            "Google API error 403 PERMISSION_DENIED: Missing or insufficient permissions."
        );
    }

    #[test]
    fn oauth_error_keeps_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid JWT Signature."}"#;
        let parsed: OauthErrorResponse = serde_json::from_str(body).unwrap();
        let err: FirebaseError = parsed.into();

        assert_eq!(
            err.to_string(),
            "OAuth2 server error: invalid_grant: Invalid JWT Signature."
        );
    }

    #[test]
    fn probe_error_messages_match_console_lines() {
        assert_eq!(
            ProbeError::CredentialsNotSet.to_string(),
            "FIREBASE_CREDENTIALS is not set."
        );
        let err = ProbeError::ClientBuild(FirebaseError::MissingProjectId);
        assert!(err.to_string().starts_with("Unable to build Firestore client: "));
    }
}
