//! Shared SSM tool domain primitives.
//!
//! This crate owns the job document contract consumed by the SSM tool state
//! machines, execution status interpretation, execution naming and the object
//! key layout the orchestrator writes to. It intentionally excludes AWS SDK and
//! async runtime concerns.

pub mod contract;
pub mod naming;
pub mod status;
pub mod storage_keys;
pub mod tool;
