pub mod config;
pub mod error;
pub mod firebase;
pub mod firestore;
pub mod google_oauth;
pub mod service;

pub use error::{FirebaseError, ProbeError};
pub use firebase::{AppOptions, FirebaseApp, FirebaseApps};
pub use firestore::FirestoreClient;
pub use google_oauth::Credential;
