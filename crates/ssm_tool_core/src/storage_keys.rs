use crate::contract::JobDocument;
use crate::tool::Tool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    AccountsList,
    InstanceList,
    Errors,
}

impl DatasetKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::AccountsList => "accounts_list",
            Self::InstanceList => "instance_list",
            Self::Errors => "errors",
        }
    }
}

/// The account list is shared by every tool and lives at the root prefix.
pub fn default_accounts_list_key() -> String {
    format!(
        "{}/{}",
        Tool::Parameter.key_prefix(),
        DatasetKind::AccountsList.as_str()
    )
}

pub fn default_instance_list_key() -> String {
    format!(
        "{}/{}",
        Tool::RunDocument.key_prefix(),
        DatasetKind::InstanceList.as_str()
    )
}

pub fn errors_prefix(tool: Tool) -> String {
    format!("{}/{}/", tool.key_prefix(), DatasetKind::Errors.as_str())
}

/// Where the orchestrator reads the accounts or instances a job fans out to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOutTargets {
    ListedIn(String),
    /// Deploy jobs without an `accounts_key` run in the host account, every region.
    HostAccountAllRegions,
}

impl std::fmt::Display for FanOutTargets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListedIn(key) => f.write_str(key),
            Self::HostAccountAllRegions => f.write_str("host account, all regions"),
        }
    }
}

pub fn fan_out_targets(job: &JobDocument) -> FanOutTargets {
    match job {
        JobDocument::Parameter(job) => FanOutTargets::ListedIn(
            job.accounts_key
                .clone()
                .unwrap_or_else(default_accounts_list_key),
        ),
        JobDocument::DeployDocument(job) => match &job.accounts_key {
            None => FanOutTargets::HostAccountAllRegions,
            Some(key) => FanOutTargets::ListedIn(
                key.as_deref()
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(default_accounts_list_key),
            ),
        },
        JobDocument::RunDocument(job) => FanOutTargets::ListedIn(
            job.instance_list
                .clone()
                .unwrap_or_else(default_instance_list_key),
        ),
    }
}

/// An error report written by the orchestrator, split into the step that wrote it
/// (`run_job/create/us-east-1/123456789012`) and the report file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReportKey {
    pub key: String,
    pub caller: String,
    pub file_name: String,
}

pub fn parse_error_report_key(tool: Tool, key: &str) -> Option<ErrorReportKey> {
    let prefix = errors_prefix(tool);
    let relative = key.strip_prefix(&prefix)?;
    let (caller, file_name) = relative.rsplit_once('/')?;
    if caller.is_empty() || file_name.is_empty() {
        return None;
    }

    Some(ErrorReportKey {
        key: key.to_string(),
        caller: caller.to_string(),
        file_name: file_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builds_error_prefixes_per_tool() {
        assert_eq!(errors_prefix(Tool::Parameter), "ssm_tool/errors/");
        assert_eq!(
            errors_prefix(Tool::DeployDocument),
            "ssm_tool/deploy_document/errors/"
        );
        assert_eq!(
            errors_prefix(Tool::RunDocument),
            "ssm_tool/run_document/errors/"
        );
    }

    #[test]
    fn fan_out_targets_prefer_job_override() {
        let with_override = JobDocument::from_value(
            Tool::Parameter,
            json!({"action": "init", "job_action": "remove", "args": {"names": ["p"]}, "accounts_key": "ssm_tool/canary_accounts"}),
        )
        .unwrap();
        let run_document = JobDocument::from_value(
            Tool::RunDocument,
            json!({"action": "init", "args": {"document": "doc"}}),
        )
        .unwrap();

        assert_eq!(
            fan_out_targets(&with_override),
            FanOutTargets::ListedIn("ssm_tool/canary_accounts".to_string())
        );
        assert_eq!(
            fan_out_targets(&run_document).to_string(),
            "ssm_tool/run_document/instance_list"
        );
    }

    #[test]
    fn deploy_job_targets_depend_on_accounts_key_presence() {
        let deploy = |value| JobDocument::from_value(Tool::DeployDocument, value).unwrap();

        assert_eq!(
            fan_out_targets(&deploy(json!({"action": "init"}))),
            FanOutTargets::HostAccountAllRegions
        );
        assert_eq!(
            fan_out_targets(&deploy(json!({"action": "init"}))).to_string(),
            "host account, all regions"
        );
        for blank in [json!(null), json!(""), json!("  ")] {
            assert_eq!(
                fan_out_targets(&deploy(json!({"action": "init", "accounts_key": blank}))),
                FanOutTargets::ListedIn("ssm_tool/accounts_list".to_string())
            );
        }
        assert_eq!(
            fan_out_targets(&deploy(
                json!({"action": "init", "accounts_key": "ssm_tool/canary_accounts"})
            )),
            FanOutTargets::ListedIn("ssm_tool/canary_accounts".to_string())
        );
    }

    #[test]
    fn parses_run_job_error_key() {
        let parsed = parse_error_report_key(
            Tool::Parameter,
            "ssm_tool/errors/run_job/create/us-east-1/123456789012/20240102-030405123456.txt",
        )
        .expect("key should parse");

        assert_eq!(parsed.caller, "run_job/create/us-east-1/123456789012");
        assert_eq!(parsed.file_name, "20240102-030405123456.txt");
    }

    #[test]
    fn ignores_keys_outside_tool_prefix() {
        assert!(parse_error_report_key(
            Tool::RunDocument,
            "ssm_tool/errors/run_job/us-east-1/1/a.txt"
        )
        .is_none());
        assert!(parse_error_report_key(Tool::Parameter, "ssm_tool/errors/loose.txt").is_none());
    }
}
