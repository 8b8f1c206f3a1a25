use firestore_probe::config::Config;
use firestore_probe::firebase::{AppOptions, FirebaseApps};
use firestore_probe::service::{
    ensure_firebase_app, probe_firestore_connection, resolve_credentials,
};
use mimalloc::MiMalloc;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();

    let loaded = Config::load();
    let cfg = loaded.as_ref().cloned().unwrap_or_default();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    if let Err(e) = loaded {
        warn!(error = %e, "invalid configuration; using defaults");
    }
    debug!(
        loglevel = %cfg.loglevel,
        emulator = %cfg.firestore_emulator_host.as_deref().unwrap_or("<none>"),
        proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
    );

    let apps = FirebaseApps::new();
    let credential = resolve_credentials(Config::credential_source().as_deref()).ok();
    let app = ensure_firebase_app(&apps, credential, AppOptions::from(&cfg)).ok();
    // Every failure has already been logged; the process always exits cleanly.
    let _ = probe_firestore_connection(app.as_deref()).await;
}
