use std::time::Duration;

use ssm_tool_core::contract::JobDocument;
use ssm_tool_core::naming::execution_name;
use ssm_tool_core::status::ExecutionStatus;
use ssm_tool_core::storage_keys::{errors_prefix, fan_out_targets, parse_error_report_key};
use ssm_tool_core::tool::Tool;
use tracing::{debug, error, info, warn};

use crate::adapters::clock::Clock;
use crate::adapters::object_store::ErrorReportStore;
use crate::adapters::orchestrator::ExecutionEngine;
use crate::error::{DriverError, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(45);
/// 75 polls of 45s stays under the one hour lifetime of assumed-role credentials.
pub const DEFAULT_MAX_POLLS: u32 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

impl PollSettings {
    pub fn max_wait(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_polls)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionHandle {
    pub execution_arn: String,
}

/// A validated job document and the label its execution is named after.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedJob {
    pub label: String,
    pub document: JobDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobResult {
    Succeeded,
    ExecutionFailed,
    PollBudgetExceeded,
    SubmissionFailed,
    StatusQueryFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub label: String,
    pub result: JobResult,
    pub execution_arn: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub error: Option<String>,
    pub error_reports: Vec<String>,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.result == JobResult::Succeeded
    }

    /// One status line per job. CI logs grep for `Success!`, `Ended with errors` and
    /// `Max Timeout Exceeded`, so those words stay fixed.
    pub fn status_line(&self) -> String {
        match (self.result, &self.status, &self.error) {
            (JobResult::Succeeded, _, _) => format!("{} Success!", self.label),
            (JobResult::ExecutionFailed, Some(status), _) => {
                format!("{} Ended with errors ({status})", self.label)
            }
            (JobResult::ExecutionFailed, None, _) => format!("{} Ended with errors", self.label),
            (JobResult::PollBudgetExceeded, _, _) => {
                format!("{} Max Timeout Exceeded", self.label)
            }
            (_, _, Some(error)) => format!("{} {error}", self.label),
            (result, _, None) => format!("{} {result:?}", self.label),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub outcomes: Vec<JobOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(JobOutcome::succeeded)
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| !outcome.succeeded()).count()
    }
}

pub struct Driver<'a> {
    tool: Tool,
    state_machine_arn: String,
    settings: PollSettings,
    engine: &'a dyn ExecutionEngine,
    clock: &'a dyn Clock,
    error_store: Option<&'a dyn ErrorReportStore>,
}

impl<'a> Driver<'a> {
    pub fn new(
        tool: Tool,
        state_machine_arn: impl Into<String>,
        settings: PollSettings,
        engine: &'a dyn ExecutionEngine,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            tool,
            state_machine_arn: state_machine_arn.into(),
            settings,
            engine,
            clock,
            error_store: None,
        }
    }

    /// A driver that only submits. It never polls, so poll flags do not apply.
    pub fn submitter(
        tool: Tool,
        state_machine_arn: impl Into<String>,
        engine: &'a dyn ExecutionEngine,
        clock: &'a dyn Clock,
    ) -> Self {
        Self::new(tool, state_machine_arn, PollSettings::default(), engine, clock)
    }

    pub fn with_error_store(mut self, store: &'a dyn ErrorReportStore) -> Self {
        self.error_store = Some(store);
        self
    }

    /// Starts one execution with the job as its input. The job is re-validated first
    /// so nothing malformed reaches the orchestrator.
    pub fn submit(&self, job: &NamedJob) -> Result<ExecutionHandle> {
        if job.document.tool() != self.tool {
            return Err(DriverError::Submission {
                label: job.label.clone(),
                message: format!(
                    "job is a {} job but this driver submits {} jobs",
                    job.document.tool(),
                    self.tool
                ),
            });
        }
        job.document
            .validate()
            .map_err(|source| DriverError::InvalidJob {
                label: job.label.clone(),
                source,
            })?;

        let input = job
            .document
            .execution_input()
            .map_err(|error| DriverError::Submission {
                label: job.label.clone(),
                message: format!("failed to serialize job input: {error}"),
            })?;
        let name = execution_name(&job.label, &self.clock.timestamp());

        let execution_arn = self
            .engine
            .start_execution(&self.state_machine_arn, &name, &input)
            .map_err(|message| DriverError::Submission {
                label: job.label.clone(),
                message,
            })?;

        info!(
            tool = %self.tool,
            label = %job.label,
            job = %job.document.summary(),
            targets = %fan_out_targets(&job.document),
            execution_name = %name,
            execution_arn = %execution_arn,
            "execution started"
        );
        Ok(ExecutionHandle { execution_arn })
    }

    /// Queries the execution until it leaves `RUNNING`, sleeping `poll_interval` after
    /// every running answer. Gives up after `max_polls` queries without cancelling
    /// the execution.
    pub fn poll_until_terminal(&self, handle: &ExecutionHandle) -> Result<ExecutionStatus> {
        let max_polls = self.settings.max_polls;
        let mut waited = Duration::ZERO;

        for poll in 1..=max_polls {
            let status = self
                .engine
                .describe_execution(&handle.execution_arn)
                .map_err(|message| DriverError::StatusQuery {
                    execution_arn: handle.execution_arn.clone(),
                    message,
                })?;
            debug!(
                execution_arn = %handle.execution_arn,
                poll,
                max_polls,
                status = %status,
                "execution status"
            );
            if status.is_terminal() {
                return Ok(status);
            }

            info!(
                execution_arn = %handle.execution_arn,
                "Waiting {poll} of {max_polls}..."
            );
            self.clock.sleep(self.settings.poll_interval);
            waited += self.settings.poll_interval;
        }

        Err(DriverError::PollBudgetExceeded {
            execution_arn: handle.execution_arn.clone(),
            max_polls,
            waited,
        })
    }

    pub fn run_job(&self, job: &NamedJob) -> JobOutcome {
        let mut outcome = JobOutcome {
            label: job.label.clone(),
            result: JobResult::SubmissionFailed,
            execution_arn: None,
            status: None,
            error: None,
            error_reports: Vec::new(),
        };

        let handle = match self.submit(job) {
            Ok(handle) => handle,
            Err(error) => {
                error!(label = %job.label, error = %error, "submission failed");
                outcome.error = Some(error.to_string());
                return outcome;
            }
        };
        outcome.execution_arn = Some(handle.execution_arn.clone());

        match self.poll_until_terminal(&handle) {
            Ok(status) if status.is_success() => {
                info!(label = %job.label, execution_arn = %handle.execution_arn, "execution succeeded");
                outcome.result = JobResult::Succeeded;
                outcome.status = Some(status);
            }
            Ok(status) => {
                let error = DriverError::ExecutionFailed {
                    execution_arn: handle.execution_arn.clone(),
                    status: status.clone(),
                };
                error!(label = %job.label, status = %status, "execution ended with errors");
                outcome.result = JobResult::ExecutionFailed;
                outcome.status = Some(status);
                outcome.error = Some(error.to_string());
                outcome.error_reports = self.collect_error_reports();
            }
            Err(error @ DriverError::PollBudgetExceeded { .. }) => {
                error!(label = %job.label, error = %error, "max timeout exceeded");
                outcome.result = JobResult::PollBudgetExceeded;
                outcome.status = Some(ExecutionStatus::Running);
                outcome.error = Some(error.to_string());
            }
            Err(error) => {
                error!(label = %job.label, error = %error, "status query failed");
                outcome.result = JobResult::StatusQueryFailed;
                outcome.error = Some(error.to_string());
            }
        }

        outcome
    }

    /// Runs every job in input order, one at a time. A failing job never stops the
    /// jobs after it.
    pub fn run_all(&self, jobs: &[NamedJob]) -> RunReport {
        let mut report = RunReport {
            outcomes: Vec::with_capacity(jobs.len()),
        };

        for (index, job) in jobs.iter().enumerate() {
            info!(
                tool = %self.tool,
                label = %job.label,
                position = index + 1,
                total = jobs.len(),
                "job starting"
            );
            report.outcomes.push(self.run_job(job));
        }

        info!(
            tool = %self.tool,
            total = jobs.len(),
            failed = report.failed_count(),
            "run finished"
        );
        report
    }

    /// Lists the orchestrator's error files so the operator knows where to look.
    /// A listing failure is logged and otherwise ignored.
    fn collect_error_reports(&self) -> Vec<String> {
        let Some(store) = self.error_store else {
            return Vec::new();
        };

        let prefix = errors_prefix(self.tool);
        match store.list_keys(&prefix) {
            Ok(keys) => {
                for key in &keys {
                    match parse_error_report_key(self.tool, key) {
                        Some(report) => warn!(
                            caller = %report.caller,
                            file = %report.file_name,
                            key = %report.key,
                            "orchestrator error report"
                        ),
                        None => warn!(key = %key, "orchestrator error report"),
                    }
                }
                keys
            }
            Err(message) => {
                warn!(prefix = %prefix, error = %message, "failed to list error reports");
                Vec::new()
            }
        }
    }
}
