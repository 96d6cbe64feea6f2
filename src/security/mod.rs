//! Security Validation Subsystem
//!
//! This module decides whether a requested AWS CLI invocation is safe to
//! execute. It is organized into:
//!
//! - `lexer.rs`: quote-aware tokenization, pipe detection, pipeline splitting
//! - `policy.rs`: the rule tables (dangerous prefixes, safe overrides, regex
//!   rules), their built-in defaults, file loading and atomic reload
//! - `engine.rs`: classification of a single command against the tables
//! - `validator.rs`: single-command and pipeline validation, the auxiliary
//!   Unix allow-list, and STRICT/PERMISSIVE mode handling
//!
//! Validation always runs before execution; a command that fails here is
//! never handed to a child process.

pub mod engine;
pub mod lexer;
pub mod policy;
pub mod validator;

pub use engine::{Classification, AWS_PROGRAM};
pub use policy::{PolicyStore, SecurityPolicy, ValidationRule};
pub use validator::{CommandValidator, ALLOWED_UNIX_COMMANDS};

/// Error types for command validation.
///
/// Structural failures, security denials and pipeline allow-list failures
/// are all surfaced through this one kind, with wording that keeps them
/// distinguishable to callers and tests.
#[derive(Debug, thiserror::Error)]
pub enum CommandValidationError {
    #[error("Commands must start with 'aws'")]
    MissingProgram,

    #[error("Command must include an AWS service (e.g., aws s3)")]
    MissingService,

    #[error("Empty command")]
    Empty,

    #[error("Empty command at position {0} in pipe")]
    EmptyPipelineStage(usize),

    #[error("Command '{0}' is not allowed in pipelines")]
    UnixCommandNotAllowed(String),

    #[error("{0}")]
    SecurityDenied(String),
}
