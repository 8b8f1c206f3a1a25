use crate::config::FIRESTORE_SCOPES;
use crate::error::{FirebaseError, OauthErrorResponse};
use crate::google_oauth::credentials::{AuthorizedUserKey, ServiceAccountKey};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, Header};
use oauth2::{
    Client as OAuth2Client, ClientId, ClientSecret, EmptyExtraTokenFields, EndpointNotSet,
    EndpointSet, RefreshToken, StandardRevocableToken, StandardTokenResponse, TokenResponse,
    TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// An issued access token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl BearerToken {
    /// `expires_in` is server supplied and unbounded; lifetimes past chrono's
    /// range saturate at the latest representable instant.
    fn from_expires_in(value: String, expires_in: Option<u64>, now: DateTime<Utc>) -> Self {
        let lifetime = match expires_in {
            Some(secs) => i64::try_from(secs).ok().and_then(Duration::try_seconds),
            None => Some(Duration::seconds(ASSERTION_LIFETIME_SECS)),
        };
        Self {
            value,
            expires_at: lifetime
                .and_then(|d| now.checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Usable for at least `margin` more.
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}

/// Stateless Google OAuth Endpoints.
pub(super) struct GoogleOauthEndpoints;

impl GoogleOauthEndpoints {
    /// Trade a signed JWT assertion for an access token (RFC 7523).
    pub(super) async fn exchange_jwt_assertion(
        key: &ServiceAccountKey,
        http_client: reqwest::Client,
    ) -> Result<BearerToken, FirebaseError> {
        let assertion = sign_assertion(key, Utc::now())?;

        let resp = http_client
            .post(key.token_uri.as_str())
            .header("Accept", "application/json")
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.bytes().await?;
            return Err(serde_json::from_slice::<OauthErrorResponse>(&body)
                .map(FirebaseError::from)
                .unwrap_or(FirebaseError::UpstreamStatus(status)));
        }

        let payload: JwtTokenResponse = resp.json().await?;
        info!(
            "Client: {}, Access token issued successfully",
            key.client_email
        );
        Ok(BearerToken::from_expires_in(
            payload.access_token,
            payload.expires_in,
            Utc::now(),
        ))
    }

    /// Refresh the access token of gcloud user credentials.
    pub(super) async fn refresh_access_token(
        key: &AuthorizedUserKey,
        http_client: reqwest::Client,
    ) -> Result<BearerToken, FirebaseError> {
        let client = build_oauth2_client(key)?;
        let token_result: GoogleTokenResponse = client
            .exchange_refresh_token(&RefreshToken::new(key.refresh_token.clone()))
            .request_async(&http_client)
            .await?;
        info!("Client_ID: {}, Access token refreshed successfully", key.client_id);
        Ok(BearerToken::from_expires_in(
            token_result.access_token().secret().clone(),
            token_result.expires_in().map(|d| d.as_secs()),
            Utc::now(),
        ))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

fn sign_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String, FirebaseError> {
    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: FIRESTORE_SCOPES.join(" "),
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();
    Ok(jsonwebtoken::encode(&header, &claims, &key.signing_key()?)?)
}

/// Build the Google OAuth2 client from user credentials.
fn build_oauth2_client(key: &AuthorizedUserKey) -> Result<GoogleOauth2Client, FirebaseError> {
    let client = OAuth2Client::new(ClientId::new(key.client_id.clone()))
        .set_client_secret(ClientSecret::new(key.client_secret.clone()))
        .set_token_uri(TokenUrl::new(key.token_uri.clone())?);
    Ok(client)
}

#[derive(Debug, Deserialize)]
struct JwtTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

type GoogleTokenResponse = StandardTokenResponse<EmptyExtraTokenFields, BasicTokenType>;

type GoogleOauth2Client = OAuth2Client<
    BasicErrorResponse,
    GoogleTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;
