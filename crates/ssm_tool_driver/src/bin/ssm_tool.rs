use std::path::{Path, PathBuf};
use std::process::ExitCode;

use aws_sdk_sfn::error::DisplayErrorContext;
use aws_sdk_ssm::types::{DocumentFormat as SsmDocumentFormat, DocumentType};
use clap::{Args, Parser, Subcommand};
use ssm_tool_core::contract::JobDocument;
use ssm_tool_core::status::ExecutionStatus;
use ssm_tool_core::tool::Tool;
use ssm_tool_driver::adapters::clock::SystemClock;
use ssm_tool_driver::adapters::document_store::DocumentStore;
use ssm_tool_driver::adapters::object_store::ErrorReportStore;
use ssm_tool_driver::adapters::orchestrator::ExecutionEngine;
use ssm_tool_driver::config::{StageConfig, ToolConfig, DEFAULT_CONFIG_PATH};
use ssm_tool_driver::deploy::{deploy_document, DeployOutcome, DocumentFormat};
use ssm_tool_driver::driver::{Driver, NamedJob, RunReport};
use ssm_tool_driver::error::DriverError;
use ssm_tool_driver::jobs::load_jobs;
use ssm_tool_driver::logging::{init_logging, LogFormat};
use tracing::error;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "ssm_tool",
    about = "Submit SSM tool jobs to their state machines and wait for the result",
    long_about = "Submits parameter, deploy-document and run-document jobs to the SSM tool\n\
                  state machines, one execution per job, and polls each execution until it\n\
                  finishes. Exits non-zero if any job does not succeed."
)]
struct Cli {
    /// Stage configuration file
    #[arg(long, env = "SSM_TOOL_CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,
    /// Log output format
    #[arg(long, value_enum, env = "SSM_TOOL_LOG_FORMAT", default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit every job file in a folder (or a single job file) and wait for each
    Run {
        /// Stage from the configuration file, e.g. dev or prod
        stage: String,
        /// parameter, deploy_document or run_document
        #[arg(value_parser = parse_tool)]
        tool: Tool,
        /// Job folder or job file
        path: PathBuf,
        #[command(flatten)]
        poll: PollArgs,
    },
    /// Submit one inline JSON job
    Start {
        stage: String,
        #[arg(value_parser = parse_tool)]
        tool: Tool,
        /// Name for the execution
        name: String,
        /// Job document as a JSON string
        input: String,
        /// Wait for the execution to finish
        #[arg(long)]
        wait: bool,
        #[command(flatten)]
        poll: PollArgs,
    },
    /// Create or update an SSM command document from a .json/.yml/.yaml file
    DeployDocument {
        stage: String,
        /// Document name, must be unique in the account
        name: String,
        /// Path to the document content
        path: PathBuf,
    },
}

#[derive(Args)]
struct PollArgs {
    /// Seconds between status checks
    #[arg(long, env = "SSM_TOOL_POLL_INTERVAL_SECS")]
    poll_interval_secs: Option<u64>,
    /// Status checks before giving up on an execution
    #[arg(long, env = "SSM_TOOL_MAX_POLLS")]
    max_polls: Option<u32>,
}

fn parse_tool(raw: &str) -> Result<Tool, String> {
    Tool::parse(raw).map_err(|error| error.to_string())
}

// ── AWS adapters ───────────────────────────────────────────────────

struct SfnExecutionEngine {
    sfn_client: aws_sdk_sfn::Client,
}

impl ExecutionEngine for SfnExecutionEngine {
    fn start_execution(
        &self,
        state_machine_arn: &str,
        name: &str,
        input: &str,
    ) -> Result<String, String> {
        let client = self.sfn_client.clone();
        let state_machine_arn = state_machine_arn.to_string();
        let name = name.to_string();
        let input = input.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .start_execution()
                    .state_machine_arn(&state_machine_arn)
                    .name(name)
                    .input(input)
                    .send()
                    .await
                    .map(|output| output.execution_arn().to_string())
                    .map_err(|error| {
                        format!(
                            "failed to start execution of {state_machine_arn}: {}",
                            DisplayErrorContext(&error)
                        )
                    })
            })
        })
    }

    fn describe_execution(&self, execution_arn: &str) -> Result<ExecutionStatus, String> {
        let client = self.sfn_client.clone();
        let execution_arn = execution_arn.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .describe_execution()
                    .execution_arn(execution_arn)
                    .send()
                    .await
                    .map(|output| ExecutionStatus::parse(output.status().as_str()))
                    .map_err(|error| {
                        format!("failed to describe execution: {}", DisplayErrorContext(&error))
                    })
            })
        })
    }
}

struct S3ErrorReportStore {
    bucket: String,
    s3_client: aws_sdk_s3::Client,
}

impl ErrorReportStore for S3ErrorReportStore {
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, String> {
        let client = self.s3_client.clone();
        let bucket = self.bucket.clone();
        let prefix = prefix.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut pages = client
                    .list_objects_v2()
                    .bucket(bucket)
                    .prefix(prefix)
                    .into_paginator()
                    .send();

                let mut keys = Vec::new();
                while let Some(page) = pages.next().await {
                    let page = page.map_err(|error| {
                        format!("failed to list error reports: {}", DisplayErrorContext(&error))
                    })?;
                    keys.extend(
                        page.contents()
                            .iter()
                            .filter_map(|object| object.key().map(str::to_string)),
                    );
                }
                Ok(keys)
            })
        })
    }
}

struct SsmDocumentStore {
    ssm_client: aws_sdk_ssm::Client,
}

fn ssm_format(format: DocumentFormat) -> SsmDocumentFormat {
    match format {
        DocumentFormat::Json => SsmDocumentFormat::Json,
        DocumentFormat::Yaml => SsmDocumentFormat::Yaml,
    }
}

impl DocumentStore for SsmDocumentStore {
    fn document_exists(&self, name: &str) -> Result<bool, String> {
        let client = self.ssm_client.clone();
        let name = name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                match client.describe_document().name(name).send().await {
                    Ok(_) => Ok(true),
                    Err(error)
                        if error
                            .as_service_error()
                            .map(|service_error| service_error.is_invalid_document())
                            .unwrap_or(false) =>
                    {
                        Ok(false)
                    }
                    Err(error) => Err(format!(
                        "failed to describe document: {}",
                        DisplayErrorContext(&error)
                    )),
                }
            })
        })
    }

    fn create_document(
        &self,
        name: &str,
        content: &str,
        format: DocumentFormat,
    ) -> Result<(), String> {
        let client = self.ssm_client.clone();
        let name = name.to_string();
        let content = content.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .create_document()
                    .name(name)
                    .content(content)
                    .document_type(DocumentType::Command)
                    .document_format(ssm_format(format))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| {
                        format!("failed to create document: {}", DisplayErrorContext(&error))
                    })
            })
        })
    }

    fn update_document(
        &self,
        name: &str,
        content: &str,
        format: DocumentFormat,
    ) -> Result<String, String> {
        let client = self.ssm_client.clone();
        let name = name.to_string();
        let content = content.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .update_document()
                    .name(name)
                    .content(content)
                    .document_version("$LATEST")
                    .document_format(ssm_format(format))
                    .send()
                    .await
                    .map_err(|error| {
                        format!("failed to update document: {}", DisplayErrorContext(&error))
                    })?;
                output
                    .document_description()
                    .and_then(|description| description.document_version())
                    .map(str::to_string)
                    .ok_or_else(|| "update_document returned no document version".to_string())
            })
        })
    }

    fn set_default_version(&self, name: &str, version: &str) -> Result<(), String> {
        let client = self.ssm_client.clone();
        let name = name.to_string();
        let version = version.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .update_document_default_version()
                    .name(name)
                    .document_version(version)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| {
                        format!(
                            "failed to update default document version: {}",
                            DisplayErrorContext(&error)
                        )
                    })
            })
        })
    }
}

async fn load_aws_config(stage: &StageConfig) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_sdk_sfn::config::Region::new(stage.region.clone()))
        .load()
        .await
}

// ── commands ───────────────────────────────────────────────────────

async fn run_jobs(
    stage: &StageConfig,
    tool: Tool,
    jobs: &[NamedJob],
    poll: &PollArgs,
) -> Result<RunReport, DriverError> {
    let settings = stage.poll_settings(poll.poll_interval_secs, poll.max_polls)?;
    let aws_config = load_aws_config(stage).await;

    let engine = SfnExecutionEngine {
        sfn_client: aws_sdk_sfn::Client::new(&aws_config),
    };
    let error_store = stage.bucket.as_ref().map(|bucket| S3ErrorReportStore {
        bucket: bucket.clone(),
        s3_client: aws_sdk_s3::Client::new(&aws_config),
    });
    let clock = SystemClock;

    let mut driver = Driver::new(
        tool,
        stage.state_machine_arn(tool),
        settings,
        &engine,
        &clock,
    );
    if let Some(store) = &error_store {
        driver = driver.with_error_store(store);
    }

    Ok(driver.run_all(jobs))
}

async fn start_job(
    stage: &StageConfig,
    tool: Tool,
    job: NamedJob,
    wait: bool,
    poll: &PollArgs,
) -> Result<bool, DriverError> {
    if wait {
        let report = run_jobs(stage, tool, std::slice::from_ref(&job), poll).await?;
        print_report(&report);
        return Ok(report.succeeded());
    }

    let aws_config = load_aws_config(stage).await;
    let engine = SfnExecutionEngine {
        sfn_client: aws_sdk_sfn::Client::new(&aws_config),
    };
    let clock = SystemClock;
    let driver = Driver::submitter(tool, stage.state_machine_arn(tool), &engine, &clock);

    let handle = driver.submit(&job)?;
    println!("Execution_arn: {}", handle.execution_arn);
    Ok(true)
}

async fn deploy(stage: &StageConfig, name: &str, path: &Path) -> Result<bool, DriverError> {
    let aws_config = load_aws_config(stage).await;
    let store = SsmDocumentStore {
        ssm_client: aws_sdk_ssm::Client::new(&aws_config),
    };

    match deploy_document(&store, name, path)? {
        DeployOutcome::Created => println!("{name} created"),
        DeployOutcome::Updated { default_version } => {
            println!("{name} updated, default version {default_version}")
        }
    }
    Ok(true)
}

fn print_report(report: &RunReport) {
    for outcome in &report.outcomes {
        if let Some(execution_arn) = &outcome.execution_arn {
            println!("Execution_arn: {execution_arn}");
        }
        println!("{}", outcome.status_line());
        for key in &outcome.error_reports {
            println!("  error report: {key}");
        }
    }
    println!(
        "{} of {} job(s) succeeded",
        report.outcomes.len() - report.failed_count(),
        report.outcomes.len()
    );
}

async fn execute(cli: Cli) -> Result<bool, DriverError> {
    let config = ToolConfig::load(&cli.config)?;

    match cli.command {
        Commands::Run {
            stage,
            tool,
            path,
            poll,
        } => {
            let stage = config.stage(&stage)?;
            let jobs = load_jobs(tool, &path)?;
            let report = run_jobs(stage, tool, &jobs, &poll).await?;
            print_report(&report);
            Ok(report.succeeded())
        }
        Commands::Start {
            stage,
            tool,
            name,
            input,
            wait,
            poll,
        } => {
            let stage = config.stage(&stage)?;
            let document =
                JobDocument::from_json(tool, &input).map_err(|source| DriverError::InvalidJob {
                    label: name.clone(),
                    source,
                })?;
            let job = NamedJob {
                label: name,
                document,
            };
            start_job(stage, tool, job, wait, &poll).await
        }
        Commands::DeployDocument { stage, name, path } => {
            let stage = config.stage(&stage)?;
            deploy(stage, &name, &path).await
        }
    }
}

// ── main ───────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match execute(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            error!(error = %error, "ssm_tool failed");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
