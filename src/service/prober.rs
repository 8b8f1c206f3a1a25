use crate::config::TEST_COLLECTION;
use crate::error::ProbeError;
use crate::firebase::FirebaseApp;
use crate::firestore::{DocumentSnapshot, FirestoreClient};
use tracing::{error, info, warn};

#[derive(Debug)]
pub enum ProbeOutcome {
    /// No app was available.
    Skipped,
    /// The query succeeded and the collection is empty.
    Empty,
    /// At most one document, since the query is limited to one.
    Found(Vec<DocumentSnapshot>),
}

/// Read at most one document from `test_connection` and log what came back.
pub async fn probe_firestore_connection(
    app: Option<&FirebaseApp>,
) -> Result<ProbeOutcome, ProbeError> {
    let Some(app) = app else {
        warn!("Firestore test skipped because the Firebase app was not initialised.");
        return Ok(ProbeOutcome::Skipped);
    };

    let client = FirestoreClient::new(app)
        .map_err(ProbeError::ClientBuild)
        .inspect_err(|e| error!("{e}"))?;

    let docs = client
        .collection(TEST_COLLECTION)
        .limit(1)
        .get()
        .await
        .map_err(ProbeError::Query)
        .inspect_err(|e| error!("{e}"))?;

    info!("Firestore client initialised successfully.");
    if docs.is_empty() {
        info!(
            "No documents found in {TEST_COLLECTION} collection (this is expected if it is empty)."
        );
        return Ok(ProbeOutcome::Empty);
    }
    for doc in &docs {
        info!("Found document {}: {}", doc.id, doc.to_dict());
    }
    Ok(ProbeOutcome::Found(docs))
}
