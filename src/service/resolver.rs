use crate::error::ProbeError;
use crate::google_oauth::Credential;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

/// Turn the `FIREBASE_CREDENTIALS` value into a credential.
///
/// An existing path wins; anything else must be a JSON object.
pub fn resolve_credentials(source: Option<&str>) -> Result<Credential, ProbeError> {
    let Some(source) = source.filter(|s| !s.is_empty()) else {
        let err = ProbeError::CredentialsNotSet;
        warn!("{err}");
        return Err(err);
    };

    let path = Path::new(source);
    if path.exists() {
        info!("Using service account file: {}", path.display());
        return Ok(Credential::from_file(path));
    }

    match serde_json::from_str::<Map<String, Value>>(source) {
        Ok(object) => {
            info!("Using service account JSON provided via environment variable.");
            Ok(Credential::from_json(object))
        }
        Err(e) => {
            let err = ProbeError::MalformedCredentials(e);
            warn!("{err}");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn absent_or_empty_is_not_set() {
        for source in [None, Some("")] {
            let err = resolve_credentials(source).unwrap_err();
            assert!(matches!(err, ProbeError::CredentialsNotSet));
            assert_eq!(err.to_string(), "FIREBASE_CREDENTIALS is not set.");
        }
    }

    #[test]
    fn existing_path_is_used_without_parsing() {
        // The file content is not JSON: only the path matters here.
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not json at all").unwrap();
        let source = file.path().to_str().unwrap();

        let cred = resolve_credentials(Some(source)).unwrap();
        assert_eq!(cred, Credential::File(PathBuf::from(source)));
    }

    #[test]
    fn inline_json_object_is_used() {
        let cred = resolve_credentials(Some(r#"{"type": "service_account", "project_id": "p"}"#))
            .unwrap();
        let Credential::Inline(object) = cred else {
            panic!("expected inline credential");
        };
        assert_eq!(object.get("project_id"), Some(&Value::from("p")));
    }

    #[test]
    fn neither_path_nor_json_reports_parse_error() {
        let err = resolve_credentials(Some("not-json-and-not-a-file")).unwrap_err();
        let ProbeError::MalformedCredentials(ref parse) = err else {
            panic!("expected malformed credentials, got {err:?}");
        };
        assert!(parse.is_syntax());
        // A leading `n` is read as the start of `null`.
        assert_eq!(
            err.to_string(),
            "FIREBASE_CREDENTIALS is neither a readable file nor valid JSON: \
             expected ident at line 1 column 2"
        );

        let err = resolve_credentials(Some("{oops")).unwrap_err();
        assert!(err.to_string().starts_with(
            "FIREBASE_CREDENTIALS is neither a readable file nor valid JSON: key must be a string"
        ));
    }

    #[test]
    fn json_that_is_not_an_object_is_malformed() {
        let err = resolve_credentials(Some("[1, 2]")).unwrap_err();
        assert!(matches!(err, ProbeError::MalformedCredentials(ref e) if e.is_data()));
    }
}
