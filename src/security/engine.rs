//! Security Rule Engine
//!
//! Classifies a single command string against the policy tables. Evaluation
//! order, first decisive rule wins:
//!
//! 1. Structural checks (program prefix, service token), reported as
//!    validation errors, not security denials.
//! 2. Regex rules: the `general` category always applies, the service's
//!    category additionally. Regex rules run before the prefix tables
//!    because they encode context-sensitive prohibitions that prefix
//!    matching cannot express.
//! 3. Dangerous-prefix table for the service.
//! 4. Safe-pattern override table; a match overrides the dangerous prefix.

use tracing::debug;

use super::lexer::split_command_line;
use super::policy::{SecurityPolicy, GENERAL_CATEGORY};
use super::CommandValidationError;

/// Program name every gateway command must start with.
pub const AWS_PROGRAM: &str = "aws";

/// Outcome of classifying a command against the policy tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Allowed,
    Denied { reason: String },
}

/// Classify one (non-piped) command string.
///
/// Structural violations come back as `Err`; policy decisions as `Ok` with
/// the classification. The caller decides how a denial interacts with the
/// configured security mode.
pub fn classify(
    policy: &SecurityPolicy,
    command: &str,
) -> Result<Classification, CommandValidationError> {
    let tokens = split_command_line(command);

    let Some(program) = tokens.first() else {
        return Err(CommandValidationError::MissingProgram);
    };
    if !program.eq_ignore_ascii_case(AWS_PROGRAM) {
        return Err(CommandValidationError::MissingProgram);
    }
    let Some(service) = tokens.get(1) else {
        return Err(CommandValidationError::MissingService);
    };

    if let Some(reason) = check_regex_rules(policy, command, service) {
        return Ok(Classification::Denied { reason });
    }

    if let Some(prefixes) = policy.dangerous_commands.get(service.as_str()) {
        let dangerous = prefixes.iter().any(|p| command.starts_with(p.as_str()));
        if dangerous && !is_service_command_safe(policy, command, &tokens, service) {
            return Ok(Classification::Denied {
                reason: format!(
                    "Command '{command}' is restricted for security reasons. \
                     Please use a more specific, read-only command or add a safe \
                     pattern override to your security policy."
                ),
            });
        }
    }

    Ok(Classification::Allowed)
}

/// Check the regex rule categories that apply to this command.
fn check_regex_rules(policy: &SecurityPolicy, command: &str, service: &str) -> Option<String> {
    for category in [GENERAL_CATEGORY, service] {
        if let Some(rules) = policy.regex_rules.get(category) {
            for rule in rules {
                if rule.matches(command) {
                    debug!(
                        "Regex rule matched in category '{}': {}",
                        category, rule.description
                    );
                    return Some(rule.error_message.clone());
                }
            }
        }
    }
    None
}

/// Check whether a safe pattern overrides a dangerous-prefix match.
///
/// General patterns match whole tokens so that a `--help` anywhere in the
/// command marks it documentation-only; per-service patterns are prefixes.
fn is_service_command_safe(
    policy: &SecurityPolicy,
    command: &str,
    tokens: &[String],
    service: &str,
) -> bool {
    if let Some(general) = policy.safe_patterns.get(GENERAL_CATEGORY) {
        if general
            .iter()
            .any(|pattern| tokens.iter().any(|token| token == pattern))
        {
            return true;
        }
    }
    if let Some(patterns) = policy.safe_patterns.get(service) {
        return patterns.iter().any(|p| command.starts_with(p.as_str()));
    }
    false
}
