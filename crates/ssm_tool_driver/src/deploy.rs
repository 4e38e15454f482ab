use std::path::Path;

use tracing::info;

use crate::adapters::document_store::DocumentStore;
use crate::error::{DriverError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Ok(Self::Json),
            "yml" | "yaml" => Ok(Self::Yaml),
            _ => Err(DriverError::Document(format!(
                "invalid document format for {}, must be yaml or json",
                path.display()
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    Created,
    Updated { default_version: String },
}

/// Creates the document, or updates it and promotes the new version to default.
pub fn deploy_document(store: &dyn DocumentStore, name: &str, path: &Path) -> Result<DeployOutcome> {
    validate_document_name(name)?;
    let format = DocumentFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Err(DriverError::Document(format!(
            "{} is empty",
            path.display()
        )));
    }

    let exists = store
        .document_exists(name)
        .map_err(|message| DriverError::Document(format!("lookup of '{name}' failed: {message}")))?;

    if !exists {
        store
            .create_document(name, &content, format)
            .map_err(|message| DriverError::Document(format!("create of '{name}' failed: {message}")))?;
        info!(document = %name, format = format.as_str(), "document created");
        return Ok(DeployOutcome::Created);
    }

    let version = store
        .update_document(name, &content, format)
        .map_err(|message| DriverError::Document(format!("update of '{name}' failed: {message}")))?;
    store.set_default_version(name, &version).map_err(|message| {
        DriverError::Document(format!(
            "setting default version {version} of '{name}' failed: {message}"
        ))
    })?;
    info!(document = %name, version = %version, "document updated");

    Ok(DeployOutcome::Updated {
        default_version: version,
    })
}

fn validate_document_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
    if !(3..=128).contains(&name.len()) || !valid_chars {
        return Err(DriverError::Document(format!(
            "invalid document name '{name}' (3-128 characters of a-z, A-Z, 0-9, _, -, .)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct InMemoryDocuments {
        existing: bool,
        calls: Mutex<Vec<String>>,
    }

    impl InMemoryDocuments {
        fn new(existing: bool) -> Self {
            Self {
                existing,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("poisoned mutex").clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().expect("poisoned mutex").push(call);
        }
    }

    impl DocumentStore for InMemoryDocuments {
        fn document_exists(&self, name: &str) -> std::result::Result<bool, String> {
            self.record(format!("get:{name}"));
            Ok(self.existing)
        }

        fn create_document(
            &self,
            name: &str,
            _content: &str,
            format: DocumentFormat,
        ) -> std::result::Result<(), String> {
            self.record(format!("create:{name}:{}", format.as_str()));
            Ok(())
        }

        fn update_document(
            &self,
            name: &str,
            _content: &str,
            format: DocumentFormat,
        ) -> std::result::Result<String, String> {
            self.record(format!("update:{name}:{}", format.as_str()));
            Ok("4".to_string())
        }

        fn set_default_version(&self, name: &str, version: &str) -> std::result::Result<(), String> {
            self.record(format!("default:{name}:{version}"));
            Ok(())
        }
    }

    fn document_file(dir: &Path, file_name: &str) -> std::path::PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, "schemaVersion: '2.2'\nmainSteps: []\n").expect("write document");
        path
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("doc.JSON")).unwrap(),
            DocumentFormat::Json
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("doc.yml")).unwrap(),
            DocumentFormat::Yaml
        );
        assert!(DocumentFormat::from_path(Path::new("doc.txt")).is_err());
    }

    #[test]
    fn creates_missing_document() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = document_file(dir.path(), "install.yaml");
        let store = InMemoryDocuments::new(false);

        let outcome = deploy_document(&store, "FalconInstall-ubuntu", &path).expect("deploy");

        assert_eq!(outcome, DeployOutcome::Created);
        assert_eq!(
            store.calls(),
            vec!["get:FalconInstall-ubuntu", "create:FalconInstall-ubuntu:YAML"]
        );
    }

    #[test]
    fn updates_existing_document_and_promotes_version() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = document_file(dir.path(), "install.yml");
        let store = InMemoryDocuments::new(true);

        let outcome = deploy_document(&store, "FalconInstall-ubuntu", &path).expect("deploy");

        assert_eq!(
            outcome,
            DeployOutcome::Updated {
                default_version: "4".to_string()
            }
        );
        assert_eq!(
            store.calls(),
            vec![
                "get:FalconInstall-ubuntu",
                "update:FalconInstall-ubuntu:YAML",
                "default:FalconInstall-ubuntu:4"
            ]
        );
    }

    #[test]
    fn rejects_unsupported_extension_before_calling_store() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = document_file(dir.path(), "install.txt");
        let store = InMemoryDocuments::new(false);

        let error = deploy_document(&store, "FalconInstall", &path).expect_err("txt should fail");

        assert!(error.to_string().contains("must be yaml or json"));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn rejects_invalid_document_name() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = document_file(dir.path(), "install.json");
        let store = InMemoryDocuments::new(false);

        assert!(deploy_document(&store, "a b", &path).is_err());
        assert!(store.calls().is_empty());
    }
}
