//! Command Validator
//!
//! Composes the lexer and the rule engine into full validation for single
//! commands and pipelines. Stage 0 of a pipeline is validated as an AWS
//! command; every later stage must be one of a fixed set of auxiliary Unix
//! utilities so that a privileged command cannot be disguised as a
//! downstream stage.

use std::sync::Arc;
use tracing::warn;

use crate::config::SecurityMode;
use crate::metrics;

use super::engine::{self, Classification};
use super::lexer::{is_pipe_command, split_command_line, split_pipe_command};
use super::policy::PolicyStore;
use super::CommandValidationError;

/// Unix commands allowed as non-primary pipeline stages.
pub const ALLOWED_UNIX_COMMANDS: &[&str] = &[
    // File operations
    "cat", "ls", "cd", "pwd", "cp", "mv", "rm", "mkdir", "touch", "chmod", "chown",
    // Text processing
    "grep", "sed", "awk", "cut", "sort", "uniq", "wc", "head", "tail", "tr", "find",
    // System information
    "ps", "top", "df", "du", "uname", "whoami", "date", "which", "echo",
    // Networking
    "ping", "ifconfig", "netstat", "curl", "wget", "dig", "nslookup", "ssh", "scp",
    // Other utilities
    "man", "less", "tar", "gzip", "gunzip", "zip", "unzip", "xargs", "jq", "tee",
];

/// Validates commands against the current security policy snapshot.
///
/// Cloning is cheap; all clones share the same [`PolicyStore`].
#[derive(Debug, Clone)]
pub struct CommandValidator {
    policy: Arc<PolicyStore>,
    mode: SecurityMode,
}

impl CommandValidator {
    pub fn new(policy: Arc<PolicyStore>, mode: SecurityMode) -> Self {
        Self { policy, mode }
    }

    /// The security mode this validator operates in.
    pub fn mode(&self) -> SecurityMode {
        self.mode
    }

    /// Validate a command, dispatching on pipe presence.
    pub fn validate(&self, command: &str) -> Result<(), CommandValidationError> {
        let result = self.validate_inner(command.trim());
        let outcome = match &result {
            Ok(()) => "allowed",
            Err(CommandValidationError::SecurityDenied(_)) => "denied",
            Err(_) => "invalid",
        };
        metrics::VALIDATIONS_TOTAL.with_label_values(&[outcome]).inc();
        result
    }

    fn validate_inner(&self, command: &str) -> Result<(), CommandValidationError> {
        if command.is_empty() {
            return Err(CommandValidationError::Empty);
        }
        if is_pipe_command(command) {
            self.validate_pipeline(command)
        } else {
            self.validate_single(command)
        }
    }

    /// Validate a single (non-piped) command.
    ///
    /// In permissive mode a security denial is downgraded to a logged
    /// warning and the command passes; structural violations still fail
    /// regardless of mode.
    pub fn validate_single(&self, command: &str) -> Result<(), CommandValidationError> {
        let policy = self.policy.snapshot();
        match engine::classify(&policy, command)? {
            Classification::Allowed => Ok(()),
            Classification::Denied { reason } => match self.mode {
                SecurityMode::Strict => Err(CommandValidationError::SecurityDenied(reason)),
                SecurityMode::Permissive => {
                    warn!(
                        "Security warning (permissive mode, executing anyway): {}",
                        reason
                    );
                    metrics::PERMISSIVE_OVERRIDES_TOTAL.inc();
                    Ok(())
                }
            },
        }
    }

    /// Validate a piped command stage by stage.
    ///
    /// Empty stages (consecutive pipes or a trailing pipe) are reported
    /// before any allow-list check.
    pub fn validate_pipeline(&self, command: &str) -> Result<(), CommandValidationError> {
        let stages = split_pipe_command(command);
        if stages.is_empty() {
            return Err(CommandValidationError::Empty);
        }
        for (index, stage) in stages.iter().enumerate() {
            if stage.is_empty() {
                return Err(CommandValidationError::EmptyPipelineStage(index));
            }
        }

        self.validate_single(&stages[0])?;

        for stage in stages.iter().skip(1) {
            let tokens = split_command_line(stage);
            // split_pipe_command trims, so a non-empty stage tokenizes
            let Some(program) = tokens.first() else {
                return Err(CommandValidationError::Empty);
            };
            if !ALLOWED_UNIX_COMMANDS.contains(&program.as_str()) {
                return Err(CommandValidationError::UnixCommandNotAllowed(
                    program.clone(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::policy::SecurityPolicy;

    fn validator(mode: SecurityMode) -> CommandValidator {
        CommandValidator::new(Arc::new(PolicyStore::open(None)), mode)
    }

    #[test]
    fn test_validate_allows_read_only_command() {
        let v = validator(SecurityMode::Strict);
        assert!(v.validate("aws s3 ls").is_ok());
    }

    #[test]
    fn test_validate_trims_input() {
        let v = validator(SecurityMode::Strict);
        assert!(v.validate("  aws s3 ls  ").is_ok());
    }

    #[test]
    fn test_structural_error_for_missing_program() {
        // Structural failures deny in every security mode.
        for mode in [SecurityMode::Strict, SecurityMode::Permissive] {
            let v = validator(mode);
            let err = v.validate("s3 ls").unwrap_err();
            assert_eq!(err.to_string(), "Commands must start with 'aws'");
        }
    }

    #[test]
    fn test_structural_error_for_missing_service() {
        for mode in [SecurityMode::Strict, SecurityMode::Permissive] {
            let v = validator(mode);
            let err = v.validate("aws").unwrap_err();
            assert!(err.to_string().contains("must include an AWS service"));
        }
    }

    #[test]
    fn test_empty_command() {
        let v = validator(SecurityMode::Strict);
        assert!(matches!(
            v.validate(""),
            Err(CommandValidationError::Empty)
        ));
    }

    #[test]
    fn test_dangerous_command_denied_in_strict_mode() {
        let v = validator(SecurityMode::Strict);
        let err = v.validate("aws iam create-user --user-name test").unwrap_err();
        assert!(matches!(err, CommandValidationError::SecurityDenied(_)));
        assert!(err.to_string().contains("restricted for security reasons"));
    }

    #[test]
    fn test_dangerous_command_allowed_in_permissive_mode() {
        let v = validator(SecurityMode::Permissive);
        assert!(v.validate("aws iam create-user --user-name test").is_ok());
    }

    #[test]
    fn test_help_override_allowed_in_strict_mode() {
        let v = validator(SecurityMode::Strict);
        assert!(v.validate("aws iam create-user --help").is_ok());
    }

    #[test]
    fn test_pipeline_with_allowed_stages() {
        let v = validator(SecurityMode::Strict);
        assert!(v.validate("aws s3 ls | grep bucket | head -5").is_ok());
    }

    #[test]
    fn test_pipeline_stage_not_on_allow_list() {
        let v = validator(SecurityMode::Strict);
        let err = v.validate("aws s3 ls | sudo").unwrap_err();
        assert!(matches!(
            err,
            CommandValidationError::UnixCommandNotAllowed(ref cmd) if cmd == "sudo"
        ));
        assert!(err.to_string().contains("not allowed"));
    }

    #[test]
    fn test_pipeline_disallowed_stage_even_with_valid_primary() {
        // The privileged program itself is not an auxiliary utility.
        let v = validator(SecurityMode::Strict);
        let err = v.validate("aws s3 ls | aws s3 rb s3://bucket").unwrap_err();
        assert!(matches!(
            err,
            CommandValidationError::UnixCommandNotAllowed(_)
        ));
    }

    #[test]
    fn test_pipeline_empty_stage_reported_with_position() {
        let v = validator(SecurityMode::Strict);
        let err = v.validate("aws s3 ls | | grep x").unwrap_err();
        assert_eq!(err.to_string(), "Empty command at position 1 in pipe");
    }

    #[test]
    fn test_pipeline_trailing_pipe_is_empty_stage() {
        let v = validator(SecurityMode::Strict);
        let err = v.validate("aws s3 ls |").unwrap_err();
        assert!(matches!(
            err,
            CommandValidationError::EmptyPipelineStage(1)
        ));
    }

    #[test]
    fn test_pipeline_empty_stage_reported_before_allow_list() {
        let v = validator(SecurityMode::Strict);
        let err = v.validate("aws s3 ls | sudo | ").unwrap_err();
        assert!(matches!(
            err,
            CommandValidationError::EmptyPipelineStage(2)
        ));
    }

    #[test]
    fn test_pipeline_primary_stage_still_validated() {
        let v = validator(SecurityMode::Strict);
        let err = v.validate("aws iam create-user --user-name x | grep user");
        assert!(matches!(
            err,
            Err(CommandValidationError::SecurityDenied(_))
        ));
    }

    #[test]
    fn test_pipe_inside_quotes_is_single_command() {
        let v = validator(SecurityMode::Strict);
        // The quoted pipe is part of an argument, not a pipeline.
        assert!(v.validate(r#"aws s3 ls --query "a|b""#).is_ok());
    }

    #[test]
    fn test_permissive_mode_does_not_relax_allow_list() {
        let v = validator(SecurityMode::Permissive);
        assert!(matches!(
            v.validate("aws s3 ls | sudo"),
            Err(CommandValidationError::UnixCommandNotAllowed(_))
        ));
    }

    #[test]
    fn test_custom_policy_safe_override_scenario() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[dangerous_commands]
iam = ["aws iam create-user"]

[safe_patterns]
iam = ["aws iam create-user --help"]
"#
        )
        .unwrap();
        let store = Arc::new(PolicyStore::open(Some(file.path().to_path_buf())));
        let v = CommandValidator::new(store, SecurityMode::Strict);

        assert!(v.validate("aws iam create-user --user-name test").is_err());
        assert!(v.validate("aws iam create-user --help").is_ok());
    }
}
