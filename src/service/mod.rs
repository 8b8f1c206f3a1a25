//! The three probe steps, run in order by the binary.

pub mod initializer;
pub mod prober;
pub mod resolver;

pub use initializer::ensure_firebase_app;
pub use prober::{ProbeOutcome, probe_firestore_connection};
pub use resolver::resolve_credentials;
