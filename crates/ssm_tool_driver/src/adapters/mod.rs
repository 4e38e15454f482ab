pub mod clock;
pub mod document_store;
pub mod object_store;
pub mod orchestrator;
