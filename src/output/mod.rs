//! Output Formatting
//!
//! Post-processing of successful command output for readability. The
//! formatter is idempotent and only ever sees the output text; result
//! status is never altered here.

mod formatter;

pub use formatter::{format_output, is_json};
