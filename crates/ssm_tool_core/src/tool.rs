use serde::{Deserialize, Serialize};

use crate::contract::ValidationError;

/// The SSM tool families, each backed by its own state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Parameter,
    DeployDocument,
    RunDocument,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Parameter, Tool::DeployDocument, Tool::RunDocument];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parameter => "parameter",
            Self::DeployDocument => "deploy_document",
            Self::RunDocument => "run_document",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "parameter" | "parameters" | "parameter_tool" => Ok(Self::Parameter),
            "deploy_document" => Ok(Self::DeployDocument),
            "run_document" => Ok(Self::RunDocument),
            _ => Err(ValidationError::new(format!(
                "Unsupported tool '{raw}' (expected parameter, deploy_document, or run_document)"
            ))),
        }
    }

    /// State machine name the tool's stack deploys under.
    pub fn default_state_machine_name(self) -> &'static str {
        match self {
            Self::Parameter => "pcm_ssm_parameter_tool_SM",
            Self::DeployDocument => "pcm_ssm_deploy_document_tool_SM",
            Self::RunDocument => "pcm_ssm_run_document_SM",
        }
    }

    /// Root of every object the tool's lambdas read or write.
    pub fn key_prefix(self) -> &'static str {
        match self {
            Self::Parameter => "ssm_tool",
            Self::DeployDocument => "ssm_tool/deploy_document",
            Self::RunDocument => "ssm_tool/run_document",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_cli_spellings() {
        assert_eq!(Tool::parse("run-document").unwrap(), Tool::RunDocument);
        assert_eq!(Tool::parse("Deploy_Document").unwrap(), Tool::DeployDocument);
        assert_eq!(Tool::parse("parameter").unwrap(), Tool::Parameter);
    }

    #[test]
    fn parse_rejects_unknown_tool() {
        let error = Tool::parse("get_accounts").expect_err("unknown tool should fail");
        assert!(error.message().contains("Unsupported tool 'get_accounts'"));
    }

    #[test]
    fn tool_names_round_trip_through_serde() {
        for tool in Tool::ALL {
            let encoded = serde_json::to_string(&tool).expect("tool should serialize");
            assert_eq!(encoded, format!("\"{}\"", tool.as_str()));
            let decoded: Tool = serde_json::from_str(&encoded).expect("tool should parse");
            assert_eq!(decoded, tool);
        }
    }
}
