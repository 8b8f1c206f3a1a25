//! Minimal Firestore REST client.
//!
//! Layout:
//! - `client.rs`: client construction and `collection(..).limit(..).get()` queries
//! - `document.rs`: document snapshots and `runQuery` response rows
//! - `value.rs`: typed field values and their Python-style rendering

pub mod client;
pub mod document;
pub mod value;

pub use client::{CollectionReference, FirestoreClient, Query};
pub use document::DocumentSnapshot;
pub use value::{DocumentData, FieldValue};
