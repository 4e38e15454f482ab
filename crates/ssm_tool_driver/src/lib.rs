//! Job submission and polling driver for the SSM tool state machines.
//!
//! This crate owns the submit/poll loop, job-file loading, stage configuration
//! and the adapter traits the `ssm_tool` binary implements with the AWS SDK.
//! Domain contracts (job schemas, statuses, key layout) live in `ssm_tool_core`.

pub mod adapters;
pub mod config;
pub mod deploy;
pub mod driver;
pub mod error;
pub mod jobs;
pub mod logging;
