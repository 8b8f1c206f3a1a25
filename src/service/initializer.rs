use crate::error::ProbeError;
use crate::firebase::{AppOptions, DEFAULT_APP_NAME, FirebaseApp, FirebaseApps};
use crate::google_oauth::Credential;
use std::sync::Arc;
use tracing::{error, warn};

/// Return the default app, creating it on first use.
///
/// A credential passed while the default app already exists is dropped with a
/// warning; the existing app keeps its own credential.
pub fn ensure_firebase_app(
    apps: &FirebaseApps,
    credential: Option<Credential>,
    options: AppOptions,
) -> Result<Arc<FirebaseApp>, ProbeError> {
    if let Ok(app) = apps.get_app(DEFAULT_APP_NAME) {
        if let Some(discarded) = credential {
            warn!(
                app = %app.name(),
                "Firebase app already initialised; ignoring {discarded}"
            );
        }
        return Ok(app);
    }

    apps.initialize_app(credential, options, DEFAULT_APP_NAME)
        .map_err(ProbeError::Initialization)
        .inspect_err(|e| error!("{e}"))
}
