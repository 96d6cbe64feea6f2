//! Command Execution Engine
//!
//! Runs validated commands as isolated OS processes. Commands are split into
//! argv by the security lexer and handed directly to process creation, never
//! to a shell. Every execution is rate-gated, bounded by a wall-clock
//! timeout with a guaranteed kill attempt, and has its output decoded
//! lossily and truncated to the configured maximum.
//!
//! Anything that is the child process's fault (non-zero exit, timeout,
//! credential failure) is reported as a [`CommandResult`] with error status
//! so the caller always receives a structured answer; only engine-internal
//! faults (a process that cannot be spawned, an orchestration failure) are
//! raised as [`ExecutionError`].

use serde::Serialize;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{AwsConfig, ExecutionConfig};
use crate::metrics;
use crate::security::{lexer, CommandValidationError, CommandValidator, AWS_PROGRAM};

use super::rate_limit::RateLimiter;
use super::timeout::ExecutionTimeout;

/// Marker appended to truncated output.
pub const TRUNCATION_MARKER: &str = "\n... (output truncated)";

/// Signatures in stderr that indicate a credential or permission problem.
const AUTH_ERROR_PATTERNS: &[&str] = &[
    "Unable to locate credentials",
    "ExpiredToken",
    "AccessDenied",
    "AuthFailure",
    "UnauthorizedOperation",
    "InvalidClientTokenId",
    "The security token included in the request is invalid",
    "The config profile",
    "could not be found",
];

const AUTH_REMEDIATION_HINT: &str =
    "Please check your AWS credentials or profile configuration (aws configure) and try again.";

/// Execution status of a completed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Success,
    Error,
}

/// Result of a command execution.
///
/// On error status the output carries a human-readable diagnostic rather
/// than command stdout.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub output: String,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Success,
            output: output.into(),
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Error,
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Success
    }
}

/// Result of a help lookup. Errors are folded into the text.
#[derive(Debug, Clone, Serialize)]
pub struct CommandHelpResult {
    pub help_text: String,
}

/// Engine-internal execution failures.
///
/// These are raised, not returned as a [`CommandResult`], so callers can
/// tell "the command failed" apart from "the engine malfunctioned".
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Failed to execute command: could not spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to execute command: {0}")]
    Internal(String),
}

/// Everything that can go wrong on the way to a [`CommandResult`].
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] CommandValidationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Captured output of one finished pipeline stage.
#[derive(Debug)]
struct StageOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Outcome of awaiting one stage under its budget.
#[derive(Debug)]
enum StageOutcome {
    Completed(StageOutput),
    TimedOut,
}

/// Executes validated commands with rate limiting, timeouts and output
/// bounding.
#[derive(Debug)]
pub struct CommandExecutor {
    validator: CommandValidator,
    limiter: RateLimiter,
    default_timeout: ExecutionTimeout,
    max_output_chars: usize,
    profile: Option<String>,
    region: Option<String>,
}

impl CommandExecutor {
    pub fn new(validator: CommandValidator, execution: &ExecutionConfig, aws: &AwsConfig) -> Self {
        Self {
            validator,
            limiter: RateLimiter::new(execution.max_calls_per_second),
            default_timeout: ExecutionTimeout::from_secs(execution.timeout_secs),
            max_output_chars: execution.max_output_chars,
            profile: aws.profile.clone(),
            region: aws.region.clone(),
        }
    }

    /// Validate and execute a command, pipeline-aware.
    ///
    /// Validation short-circuits before any child process is spawned. The
    /// optional timeout overrides the configured default for this call.
    pub async fn run(
        &self,
        command: &str,
        timeout_secs: Option<u64>,
    ) -> Result<CommandResult, CommandError> {
        let command = command.trim();
        self.validator.validate(command)?;

        let budget = timeout_secs
            .map(ExecutionTimeout::from_secs)
            .unwrap_or(self.default_timeout);

        self.limiter.acquire().await;

        let start = Instant::now();
        let result = if lexer::is_pipe_command(command) {
            self.execute_pipeline(command, budget).await?
        } else {
            self.execute_single(command, budget).await?
        };
        metrics::EXECUTION_DURATION_SECONDS.observe(start.elapsed().as_secs_f64());
        let status = if result.is_success() { "success" } else { "error" };
        metrics::EXECUTIONS_TOTAL.with_label_values(&[status]).inc();
        Ok(result)
    }

    /// Fetch help text for a service or a command within a service.
    ///
    /// Builds `aws <service> [command] help` and routes it through normal
    /// execution; every error is folded into the returned help text so this
    /// never fails.
    pub async fn get_help(&self, service: &str, command: Option<&str>) -> CommandHelpResult {
        let mut invocation = format!("{AWS_PROGRAM} {service}");
        if let Some(command) = command {
            invocation.push(' ');
            invocation.push_str(command);
        }
        invocation.push_str(" help");
        debug!("Getting command help for: {}", invocation);

        let help_text = match self.run(&invocation, None).await {
            Ok(result) if result.is_success() => result.output,
            Ok(result) => format!("Error: {}", result.output),
            Err(CommandError::Validation(e)) => {
                warn!("Command validation error while getting help: {}", e);
                format!("Command validation error: {e}")
            }
            Err(CommandError::Execution(e)) => {
                warn!("Command execution error while getting help: {}", e);
                format!("Error retrieving help: {e}")
            }
        };
        CommandHelpResult { help_text }
    }

    /// Liveness probe: can the AWS CLI be started at all?
    ///
    /// This is not a security control; it only tells the caller whether
    /// execution requests have a chance of succeeding.
    pub async fn is_installed(&self) -> bool {
        let probe = Command::new(AWS_PROGRAM)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;
        match probe {
            Ok(output) => output.status.success(),
            Err(e) => {
                debug!("AWS CLI probe failed to start: {}", e);
                false
            }
        }
    }

    /// Execute a single (non-piped) command.
    async fn execute_single(
        &self,
        command: &str,
        budget: ExecutionTimeout,
    ) -> Result<CommandResult, ExecutionError> {
        let command = self.inject_region(command);
        let argv = lexer::split_command_line(&command);
        let invocation_id = Uuid::new_v4();
        debug!("[{}] Executing: {}", invocation_id, command);

        match spawn_and_collect(&argv, None, self.profile.as_deref(), budget).await? {
            StageOutcome::TimedOut => Ok(CommandResult::error(format!(
                "Command timed out after {} seconds",
                budget.secs()
            ))),
            StageOutcome::Completed(output) => {
                debug!(
                    "[{}] Completed with exit code {:?}",
                    invocation_id,
                    output.status.code()
                );
                Ok(self.finish(output))
            }
        }
    }

    /// Execute a piped command stage by stage.
    ///
    /// The timeout is a per-stage budget: each stage may take up to the full
    /// configured duration measured from its own spawn, so a slow pipeline
    /// is killed at the offending stage. A non-zero exit at any stage aborts
    /// the pipeline immediately with that stage's stderr.
    async fn execute_pipeline(
        &self,
        command: &str,
        budget: ExecutionTimeout,
    ) -> Result<CommandResult, ExecutionError> {
        // The validator has already rejected empty stages.
        let stages = lexer::split_pipe_command(command);
        let total = stages.len();
        let invocation_id = Uuid::new_v4();
        debug!("[{}] Executing pipeline: {}", invocation_id, command);

        let mut input: Option<Vec<u8>> = None;
        let mut last: Option<StageOutput> = None;

        for (index, stage) in stages.iter().enumerate() {
            let stage_command = if index == 0 {
                self.inject_region(stage)
            } else {
                stage.clone()
            };
            let argv = lexer::split_command_line(&stage_command);
            debug!(
                "[{}] Pipeline stage {}/{}: {}",
                invocation_id,
                index + 1,
                total,
                stage_command
            );

            match spawn_and_collect(&argv, input.take(), self.profile.as_deref(), budget).await? {
                StageOutcome::TimedOut => {
                    warn!(
                        "[{}] Pipeline stage {} timed out",
                        invocation_id,
                        index + 1
                    );
                    return Ok(CommandResult::error(format!(
                        "Command timed out after {} seconds",
                        budget.secs()
                    )));
                }
                StageOutcome::Completed(mut output) => {
                    if index + 1 < total {
                        if !output.status.success() {
                            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                            warn!(
                                "[{}] Pipeline stage {} failed with exit code {:?}",
                                invocation_id,
                                index + 1,
                                output.status.code()
                            );
                            return Ok(CommandResult::error(if stderr.is_empty() {
                                "Command failed with no error output".to_string()
                            } else {
                                stderr
                            }));
                        }
                        input = Some(std::mem::take(&mut output.stdout));
                    }
                    last = Some(output);
                }
            }
        }

        match last {
            Some(output) => Ok(self.finish(output)),
            None => Err(ExecutionError::Internal("empty pipeline".to_string())),
        }
    }

    /// Decode, classify and bound the final output of an execution.
    fn finish(&self, output: StageOutput) -> CommandResult {
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            warn!(
                "Command failed with exit code {:?}",
                output.status.code()
            );
            if is_auth_error(&stderr) {
                return CommandResult::error(format!(
                    "Authentication error: {stderr}\n{AUTH_REMEDIATION_HINT}"
                ));
            }
            if stderr.is_empty() {
                return CommandResult::error("Command failed with no error output");
            }
            return CommandResult::error(stderr);
        }

        CommandResult::success(self.truncate(stdout))
    }

    /// Truncate output to the configured maximum character count.
    fn truncate(&self, text: String) -> String {
        let total = text.chars().count();
        if total <= self.max_output_chars {
            return text;
        }
        info!(
            "Output truncated from {} to {} characters",
            total, self.max_output_chars
        );
        let mut truncated: String = text.chars().take(self.max_output_chars).collect();
        truncated.push_str(TRUNCATION_MARKER);
        truncated
    }

    /// EC2 commands default to the configured region when none is given.
    fn inject_region(&self, command: &str) -> String {
        let Some(region) = self.region.as_deref().filter(|r| !r.is_empty()) else {
            return command.to_string();
        };
        let tokens = lexer::split_command_line(command);
        let is_ec2 = tokens.first().is_some_and(|t| t.eq_ignore_ascii_case(AWS_PROGRAM))
            && tokens.get(1).is_some_and(|t| t == "ec2");
        if is_ec2 && !tokens.iter().any(|t| t == "--region") {
            debug!("Adding --region {} to EC2 command", region);
            return format!("{command} --region {region}");
        }
        command.to_string()
    }
}

/// Check stderr for credential and permission failure signatures.
pub fn is_auth_error(error_output: &str) -> bool {
    AUTH_ERROR_PATTERNS
        .iter()
        .any(|pattern| error_output.contains(pattern))
}

/// Spawn one stage and collect its output under the given budget.
///
/// The child is spawned with `kill_on_drop` so that caller cancellation
/// cannot leak it. On timeout the child receives one explicit kill; a kill
/// failure is logged and does not change the reported outcome.
async fn spawn_and_collect(
    argv: &[String],
    stdin_data: Option<Vec<u8>>,
    profile: Option<&str>,
    budget: ExecutionTimeout,
) -> Result<StageOutcome, ExecutionError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(ExecutionError::Internal(
            "cannot execute an empty command".to_string(),
        ));
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(profile) = profile {
        command.env("AWS_PROFILE", profile);
    }
    command.stdin(if stdin_data.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = command.spawn().map_err(|source| ExecutionError::Spawn {
        program: program.clone(),
        source,
    })?;

    if let Some(data) = stdin_data {
        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&data).await {
                    debug!("Failed to feed stage stdin: {}", e);
                }
                // Dropping stdin closes the pipe so the stage sees EOF.
            });
        }
    }

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_task = tokio::spawn(drain(stdout));
    let stderr_task = tokio::spawn(drain(stderr));

    let waited = budget.bound(child.wait()).await;
    match waited {
        Err(elapsed) => {
            warn!(
                "Command timed out after {} seconds, killing process",
                elapsed.limit_secs
            );
            if let Err(e) = child.kill().await {
                // The timeout is already the outcome; the kill failure is
                // logged only.
                error!("Error killing timed-out process: {}", e);
            }
            stdout_task.abort();
            stderr_task.abort();
            Ok(StageOutcome::TimedOut)
        }
        Ok(wait_result) => {
            let status = wait_result.map_err(|e| {
                ExecutionError::Internal(format!("failed waiting for process: {e}"))
            })?;
            let stdout = stdout_task
                .await
                .map_err(|e| ExecutionError::Internal(format!("stdout reader failed: {e}")))?;
            let stderr = stderr_task
                .await
                .map_err(|e| ExecutionError::Internal(format!("stderr reader failed: {e}")))?;
            Ok(StageOutcome::Completed(StageOutput {
                status,
                stdout,
                stderr,
            }))
        }
    }
}

/// Read a child stream to the end, tolerating read errors.
async fn drain<R>(stream: Option<R>) -> Vec<u8>
where
    R: AsyncReadExt + Unpin + Send + 'static,
{
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            debug!("Error draining child stream: {}", e);
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityMode;
    use crate::security::PolicyStore;
    use std::sync::Arc;

    fn test_executor(max_output_chars: usize) -> CommandExecutor {
        let validator = CommandValidator::new(
            Arc::new(PolicyStore::open(None)),
            SecurityMode::Strict,
        );
        let execution = ExecutionConfig {
            timeout_secs: 30,
            max_output_chars,
            max_calls_per_second: 100,
        };
        CommandExecutor::new(validator, &execution, &AwsConfig::default())
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_spawn_and_collect_success() {
        let outcome = spawn_and_collect(
            &argv(&["echo", "hello world"]),
            None,
            None,
            ExecutionTimeout::from_secs(5),
        )
        .await
        .unwrap();
        match outcome {
            StageOutcome::Completed(output) => {
                assert!(output.status.success());
                assert_eq!(String::from_utf8_lossy(&output.stdout), "hello world\n");
            }
            StageOutcome::TimedOut => panic!("unexpected timeout"),
        }
    }

    #[tokio::test]
    async fn test_spawn_and_collect_nonzero_exit() {
        let outcome =
            spawn_and_collect(&argv(&["false"]), None, None, ExecutionTimeout::from_secs(5))
                .await
                .unwrap();
        match outcome {
            StageOutcome::Completed(output) => assert!(!output.status.success()),
            StageOutcome::TimedOut => panic!("unexpected timeout"),
        }
    }

    #[tokio::test]
    async fn test_spawn_and_collect_times_out() {
        let outcome = spawn_and_collect(
            &argv(&["sleep", "10"]),
            None,
            None,
            ExecutionTimeout::from_secs(1),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, StageOutcome::TimedOut));
    }

    #[tokio::test]
    async fn test_spawn_and_collect_feeds_stdin() {
        let outcome = spawn_and_collect(
            &argv(&["cat"]),
            Some(b"piped input".to_vec()),
            None,
            ExecutionTimeout::from_secs(5),
        )
        .await
        .unwrap();
        match outcome {
            StageOutcome::Completed(output) => {
                assert_eq!(String::from_utf8_lossy(&output.stdout), "piped input");
            }
            StageOutcome::TimedOut => panic!("unexpected timeout"),
        }
    }

    #[tokio::test]
    async fn test_spawn_failure_is_execution_error() {
        let result = spawn_and_collect(
            &argv(&["this-command-does-not-exist-12345"]),
            None,
            None,
            ExecutionTimeout::from_secs(5),
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }));
        assert!(err.to_string().contains("could not spawn"));
    }

    #[tokio::test]
    async fn test_execute_single_timeout_message_names_limit() {
        let executor = test_executor(10_000);
        let result = executor
            .execute_single("sleep 10", ExecutionTimeout::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result.status, CommandStatus::Error);
        assert!(result.output.contains("Command timed out after 1 seconds"));
    }

    #[tokio::test]
    async fn test_execute_single_truncates_output() {
        let executor = test_executor(50);
        let result = executor
            .execute_single("seq 1000", ExecutionTimeout::from_secs(10))
            .await
            .unwrap();
        assert!(result.is_success());
        assert!(result.output.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            result.output.chars().count(),
            50 + TRUNCATION_MARKER.chars().count()
        );
    }

    #[tokio::test]
    async fn test_execute_single_small_output_untouched() {
        let executor = test_executor(10_000);
        let result = executor
            .execute_single("echo hello", ExecutionTimeout::from_secs(10))
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.output, "hello\n");
    }

    #[tokio::test]
    async fn test_execute_single_failure_returns_stderr() {
        let executor = test_executor(10_000);
        let result = executor
            .execute_single(
                "cat /nonexistent-file-awsgate-test",
                ExecutionTimeout::from_secs(10),
            )
            .await
            .unwrap();
        assert_eq!(result.status, CommandStatus::Error);
        assert!(result.output.contains("No such file"));
    }

    #[tokio::test]
    async fn test_execute_pipeline_chains_stdout() {
        let executor = test_executor(10_000);
        let result = executor
            .execute_pipeline("echo hello world | cat", ExecutionTimeout::from_secs(10))
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.output, "hello world\n");
    }

    #[tokio::test]
    async fn test_execute_pipeline_three_stages() {
        let executor = test_executor(10_000);
        let result = executor
            .execute_pipeline(
                "echo one two three | cat | wc -w",
                ExecutionTimeout::from_secs(10),
            )
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.output.trim(), "3");
    }

    #[tokio::test]
    async fn test_execute_pipeline_failing_stage_aborts() {
        let executor = test_executor(10_000);
        let result = executor
            .execute_pipeline(
                "cat /nonexistent-file-awsgate-test | cat",
                ExecutionTimeout::from_secs(10),
            )
            .await
            .unwrap();
        assert_eq!(result.status, CommandStatus::Error);
        assert!(result.output.contains("No such file"));
    }

    #[tokio::test]
    async fn test_execute_pipeline_slow_stage_times_out() {
        let executor = test_executor(10_000);
        let result = executor
            .execute_pipeline("echo hi | sleep 10", ExecutionTimeout::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result.status, CommandStatus::Error);
        assert!(result.output.contains("Command timed out after 1 seconds"));
    }

    #[tokio::test]
    async fn test_run_rejects_unvalidated_command_before_spawn() {
        let executor = test_executor(10_000);
        let err = executor.run("s3 ls", None).await.unwrap_err();
        assert!(matches!(
            err,
            CommandError::Validation(CommandValidationError::MissingProgram)
        ));
    }

    #[tokio::test]
    async fn test_run_rejects_dangerous_command() {
        let executor = test_executor(10_000);
        let err = executor
            .run("aws iam create-user --user-name test", None)
            .await
            .unwrap_err();
        match err {
            CommandError::Validation(CommandValidationError::SecurityDenied(reason)) => {
                assert!(reason.contains("restricted for security reasons"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_rejects_disallowed_pipeline_stage() {
        let executor = test_executor(10_000);
        let err = executor.run("aws s3 ls | sudo", None).await.unwrap_err();
        assert!(err.to_string().contains("not allowed"));
    }

    #[tokio::test]
    async fn test_get_help_folds_validation_error_into_text() {
        let executor = test_executor(10_000);
        // The pipe smuggles a disallowed stage into the help invocation.
        let help = executor.get_help("s3 | sudo", None).await;
        assert!(help.help_text.starts_with("Command validation error:"));
        assert!(help.help_text.contains("not allowed"));
    }

    #[test]
    fn test_is_auth_error_positive_cases() {
        for message in [
            "Unable to locate credentials",
            "Some text before ExpiredToken and after",
            "Error: AccessDenied when attempting to perform operation",
            "AuthFailure: credentials could not be verified",
            "The security token included in the request is invalid",
            "The config profile could not be found",
        ] {
            assert!(is_auth_error(message), "expected auth error: {message}");
        }
    }

    #[test]
    fn test_is_auth_error_negative_cases() {
        for message in [
            "S3 bucket not found",
            "Invalid parameter value",
            "An error occurred (Throttling)",
        ] {
            assert!(!is_auth_error(message), "unexpected auth error: {message}");
        }
    }

    #[test]
    fn test_finish_wraps_auth_errors() {
        let executor = test_executor(10_000);
        let output = StageOutput {
            status: failing_status(),
            stdout: Vec::new(),
            stderr: b"Unable to locate credentials".to_vec(),
        };
        let result = executor.finish(output);
        assert_eq!(result.status, CommandStatus::Error);
        assert!(result.output.starts_with("Authentication error:"));
        assert!(result.output.contains("Unable to locate credentials"));
        assert!(result.output.contains("Please check your AWS credentials"));
    }

    #[test]
    fn test_finish_empty_stderr_gets_generic_message() {
        let executor = test_executor(10_000);
        let output = StageOutput {
            status: failing_status(),
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        let result = executor.finish(output);
        assert_eq!(result.output, "Command failed with no error output");
    }

    #[test]
    fn test_inject_region_for_ec2_without_region() {
        let mut executor = test_executor(10_000);
        executor.region = Some("us-west-2".to_string());
        assert_eq!(
            executor.inject_region("aws ec2 describe-instances"),
            "aws ec2 describe-instances --region us-west-2"
        );
    }

    #[test]
    fn test_inject_region_skips_existing_region() {
        let mut executor = test_executor(10_000);
        executor.region = Some("us-west-2".to_string());
        let command = "aws ec2 describe-instances --region eu-west-1";
        assert_eq!(executor.inject_region(command), command);
    }

    #[test]
    fn test_inject_region_skips_other_services() {
        let mut executor = test_executor(10_000);
        executor.region = Some("us-west-2".to_string());
        assert_eq!(executor.inject_region("aws s3 ls"), "aws s3 ls");
    }

    /// Build a real failing ExitStatus portably.
    fn failing_status() -> ExitStatus {
        std::process::Command::new("false")
            .status()
            .expect("failed to run 'false'")
    }

    #[test]
    fn test_command_result_serializes_lowercase_status() {
        let result = CommandResult::success("ok");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
    }
}
