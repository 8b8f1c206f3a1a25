pub mod app;

pub use app::{AppOptions, DEFAULT_APP_NAME, FirebaseApp, FirebaseApps};
