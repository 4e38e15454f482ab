use crate::deploy::DocumentFormat;

pub trait DocumentStore {
    fn document_exists(&self, name: &str) -> Result<bool, String>;

    fn create_document(
        &self,
        name: &str,
        content: &str,
        format: DocumentFormat,
    ) -> Result<(), String>;

    /// Updates the document and returns the new version.
    fn update_document(
        &self,
        name: &str,
        content: &str,
        format: DocumentFormat,
    ) -> Result<String, String>;

    fn set_default_version(&self, name: &str, version: &str) -> Result<(), String>;
}
