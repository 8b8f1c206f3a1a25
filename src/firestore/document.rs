use super::value::{DocumentData, WireValue, decode_fields, parse_timestamp, relative_path};
use crate::error::FirebaseError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// A document read by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    /// Path relative to the database root, e.g. `test_connection/abc123`.
    pub path: String,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    data: DocumentData,
}

impl DocumentSnapshot {
    pub fn new(path: impl Into<String>, data: DocumentData) -> Self {
        let path = path.into();
        let id = path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            id,
            path,
            create_time: None,
            update_time: None,
            data,
        }
    }

    pub fn to_dict(&self) -> &DocumentData {
        &self.data
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDocument {
    name: String,
    #[serde(default)]
    fields: HashMap<String, WireValue>,
    #[serde(default)]
    create_time: Option<String>,
    #[serde(default)]
    update_time: Option<String>,
}

impl DocumentSnapshot {
    pub(crate) fn from_wire(doc: WireDocument) -> Result<Self, FirebaseError> {
        let mut snapshot = DocumentSnapshot::new(relative_path(&doc.name), decode_fields(doc.fields)?);
        snapshot.create_time = doc.create_time.as_deref().map(parse_timestamp).transpose()?;
        snapshot.update_time = doc.update_time.as_deref().map(parse_timestamp).transpose()?;
        Ok(snapshot)
    }
}

/// One element of the `runQuery` response array.
///
/// Elements without `document` only carry progress (`readTime`, `skippedResults`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunQueryResponse {
    #[serde(default)]
    pub document: Option<WireDocument>,
    #[serde(default)]
    pub read_time: Option<String>,
}
