/// Read-only view of the bucket the orchestrator writes its error reports to.
pub trait ErrorReportStore {
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, String>;
}
