//! Google credentials and OAuth2 access tokens.
//!
//! Layout:
//! - `credentials.rs`: service account keys, `Credential` sources and ADC discovery
//! - `endpoints.rs`: token endpoint calls (JWT bearer and refresh token grants)
//! - `service.rs`: token source plus access token cache

pub mod credentials;
mod endpoints;
pub mod service;

pub use credentials::{Credential, CredentialKey, ServiceAccountKey};
pub use endpoints::BearerToken;
pub use service::{GoogleOauthService, TokenSource};
