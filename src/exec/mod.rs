//! Command Execution Subsystem
//!
//! Runs validated commands as child processes with the guarantees the
//! gateway depends on:
//!
//! - **No shell**: argv is built by the security lexer and passed directly
//!   to process creation.
//! - **Timeouts**: every await on a child is bounded; a timed-out child is
//!   killed, and a kill failure never changes the reported outcome.
//! - **Rate limiting**: invocations are gated through a shared sliding
//!   one-second window.
//! - **Output bounding**: stdout is truncated to a configured maximum with
//!   a visible marker.
//!
//! The module is organized into:
//! - `executor.rs`: spawning, pipelines, failure classification
//! - `rate_limit.rs`: the invocation rate limiter
//! - `timeout.rs`: wall-clock budget handling

pub mod executor;
pub mod rate_limit;
pub mod timeout;

pub use executor::{
    is_auth_error, CommandError, CommandExecutor, CommandHelpResult, CommandResult,
    CommandStatus, ExecutionError, TRUNCATION_MARKER,
};
pub use rate_limit::RateLimiter;
pub use timeout::ExecutionTimeout;
