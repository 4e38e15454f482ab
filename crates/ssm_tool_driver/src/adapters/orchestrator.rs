use ssm_tool_core::status::ExecutionStatus;

/// Starts and describes executions of a long-running state machine.
pub trait ExecutionEngine {
    /// Returns the handle (execution ARN) of the started execution.
    fn start_execution(
        &self,
        state_machine_arn: &str,
        name: &str,
        input: &str,
    ) -> Result<String, String>;

    fn describe_execution(&self, execution_arn: &str) -> Result<ExecutionStatus, String>;
}
