//! Formatting heuristics for AWS CLI output.

use serde_json::Value;
use tracing::debug;

/// Check whether a string is valid JSON.
pub fn is_json(text: &str) -> bool {
    !text.trim().is_empty() && serde_json::from_str::<Value>(text).is_ok()
}

/// Format command output for readability.
///
/// JSON objects and arrays are pretty-printed; space-aligned tabular output
/// gets a separator line after its header; anything else is returned
/// unchanged. Applying the formatter twice yields the same text.
pub fn format_output(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return text.to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        // Scalars like a bare instance id parse as JSON too; leave them be.
        if value.is_object() || value.is_array() {
            match serde_json::to_string_pretty(&value) {
                Ok(pretty) => return pretty,
                Err(e) => debug!("Failed to pretty-print JSON output: {}", e),
            }
        }
    }

    if looks_like_table(trimmed) {
        return format_table(trimmed);
    }

    text.to_string()
}

/// Heuristic for space-aligned tabular output: at least two lines, both the
/// header and the first row contain multi-space column gaps, and no
/// separator has been inserted yet.
fn looks_like_table(text: &str) -> bool {
    let mut lines = text.lines();
    let (Some(header), Some(first_row)) = (lines.next(), lines.next()) else {
        return false;
    };
    if first_row.chars().all(|c| c == '-') {
        return false;
    }
    header.contains("  ") && first_row.contains("  ")
}

fn format_table(text: &str) -> String {
    let mut lines = text.lines();
    let header = match lines.next() {
        Some(header) => header,
        None => return text.to_string(),
    };

    let mut formatted = Vec::with_capacity(text.lines().count() + 1);
    formatted.push(header.to_string());
    formatted.push("-".repeat(header.len()));
    formatted.extend(lines.map(str::to_string));
    formatted.join("\n")
}
