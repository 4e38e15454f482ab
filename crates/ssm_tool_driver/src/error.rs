use std::path::PathBuf;
use std::time::Duration;

use ssm_tool_core::contract::ValidationError;
use ssm_tool_core::status::ExecutionStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("invalid job '{label}': {source}")]
    InvalidJob {
        label: String,
        #[source]
        source: ValidationError,
    },

    #[error("failed to submit job '{label}': {message}")]
    Submission { label: String, message: String },

    #[error("failed to query status of {execution_arn}: {message}")]
    StatusQuery {
        execution_arn: String,
        message: String,
    },

    #[error("execution {execution_arn} still RUNNING after {max_polls} polls ({waited:?})")]
    PollBudgetExceeded {
        execution_arn: String,
        max_polls: u32,
        waited: Duration,
    },

    #[error("execution {execution_arn} ended with status {status}")]
    ExecutionFailed {
        execution_arn: String,
        status: ExecutionStatus,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document deployment failed: {0}")]
    Document(String),
}

pub type Result<T> = std::result::Result<T, DriverError>;
