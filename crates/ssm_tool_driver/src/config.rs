use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use ssm_tool_core::tool::Tool;

use crate::driver::{PollSettings, DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL};
use crate::error::{DriverError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "ssm_tool.json";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Per-stage deployment parameters, keyed by stage name (`dev`, `prod`, ...).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ToolConfig {
    stages: BTreeMap<String, StageConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Account hosting the state machines.
    pub account: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket the orchestrator writes job batches and error reports to.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Explicit state machine ARNs; tools not listed use the stack's default name.
    #[serde(default)]
    pub state_machines: BTreeMap<Tool, String>,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub max_polls: Option<u32>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl ToolConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
            .map_err(|error| DriverError::Config(format!("{}: {error}", path.display())))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: ToolConfig = serde_json::from_str(text)
            .map_err(|error| DriverError::Config(format!("malformed stage config: {error}")))?;
        for (name, stage) in &config.stages {
            stage.validate(name)?;
        }
        Ok(config)
    }

    /// Stage lookup ignores case so `DEV` and `dev` select the same stage.
    pub fn stage(&self, name: &str) -> Result<&StageConfig> {
        self.stages
            .iter()
            .find(|(stage, _)| stage.eq_ignore_ascii_case(name.trim()))
            .map(|(_, config)| config)
            .ok_or_else(|| {
                let known: Vec<&str> = self.stages.keys().map(String::as_str).collect();
                DriverError::Config(format!(
                    "unknown stage '{name}' (configured: {})",
                    known.join(", ")
                ))
            })
    }
}

impl StageConfig {
    fn validate(&self, stage: &str) -> Result<()> {
        if self.account.trim().is_empty() {
            return Err(DriverError::Config(format!(
                "stage '{stage}' must set a non-empty account"
            )));
        }
        if self.region.trim().is_empty() {
            return Err(DriverError::Config(format!(
                "stage '{stage}' must set a non-empty region"
            )));
        }
        if let Some((tool, _)) = self
            .state_machines
            .iter()
            .find(|(_, arn)| !arn.starts_with("arn:"))
        {
            return Err(DriverError::Config(format!(
                "stage '{stage}' state machine for {tool} must be an ARN"
            )));
        }
        Ok(())
    }

    pub fn state_machine_arn(&self, tool: Tool) -> String {
        self.state_machines.get(&tool).cloned().unwrap_or_else(|| {
            format!(
                "arn:aws:states:{}:{}:stateMachine:{}",
                self.region,
                self.account,
                tool.default_state_machine_name()
            )
        })
    }

    /// Command-line overrides win over the stage file, which wins over the defaults.
    pub fn poll_settings(
        &self,
        poll_interval_secs: Option<u64>,
        max_polls: Option<u32>,
    ) -> Result<PollSettings> {
        let poll_interval = poll_interval_secs
            .or(self.poll_interval_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let max_polls = max_polls.or(self.max_polls).unwrap_or(DEFAULT_MAX_POLLS);

        if max_polls == 0 {
            return Err(DriverError::Config(
                "max_polls must be a positive integer".to_string(),
            ));
        }

        Ok(PollSettings {
            poll_interval,
            max_polls,
        })
    }
}
