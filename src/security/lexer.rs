//! Shell-Syntax Lexer
//!
//! Quote- and escape-aware scanning of command lines. Every security and
//! execution component splits commands through this module so that argv
//! construction, pipe detection and pipeline splitting all agree on a single
//! set of quoting rules (a restricted form of POSIX shell word-splitting).
//!
//! The scanner is a single pass over the input maintaining three booleans:
//! in-single-quote, in-double-quote and escaped. A `|` is a pipe operator
//! only when neither quote state is active and the character is not escaped.
//! An unterminated quote is tolerated rather than rejected, matching the
//! permissive behavior of an interactive shell lexer.

/// Split a command line into whitespace-separated tokens.
///
/// Single and double quotes group characters into one token and are
/// stripped from the result. A backslash outside single quotes escapes the
/// next character and is consumed. Inside single quotes a backslash is a
/// literal character.
///
/// # Example
///
/// ```
/// use awsgate::security::lexer::split_command_line;
///
/// let tokens = split_command_line(r#"aws s3 cp "my file.txt" s3://bucket/"#);
/// assert_eq!(tokens, vec!["aws", "s3", "cp", "my file.txt", "s3://bucket/"]);
/// ```
pub fn split_command_line(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escaped = false;

    for ch in command.chars() {
        if escaped {
            current.push(ch);
            in_token = true;
            escaped = false;
            continue;
        }
        match ch {
            '\\' if !in_single_quote => {
                escaped = true;
                in_token = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                in_token = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                in_token = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    // A trailing backslash escapes nothing; keep it as a literal character.
    if escaped {
        current.push('\\');
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Check whether a command contains a pipe operator outside quotes.
pub fn is_pipe_command(command: &str) -> bool {
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escaped = false;

    for ch in command.chars() {
        if ch == '\\' && !escaped {
            escaped = true;
            continue;
        }
        if !escaped {
            if ch == '\'' && !in_double_quote {
                in_single_quote = !in_single_quote;
            } else if ch == '"' && !in_single_quote {
                in_double_quote = !in_double_quote;
            } else if ch == '|' && !in_single_quote && !in_double_quote {
                return true;
            }
        }
        escaped = false;
    }
    false
}

/// Split a piped command into its individual stages.
///
/// Stages are the trimmed substrings between unquoted pipe operators.
/// Backslashes are retained in the stage text (each stage is re-tokenized
/// later). Consecutive pipes and a trailing pipe produce empty stages, which
/// the validator reports; they are not an error at this layer.
pub fn split_pipe_command(pipe_command: &str) -> Vec<String> {
    let mut commands = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escaped = false;

    for ch in pipe_command.chars() {
        if ch == '\\' && !escaped {
            escaped = true;
            current.push(ch);
            continue;
        }
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                current.push(ch);
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                current.push(ch);
            }
            '|' if !in_single_quote && !in_double_quote => {
                commands.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }

    let trailing = current.trim();
    if !trailing.is_empty() || !commands.is_empty() {
        commands.push(trailing.to_string());
    }
    commands
}
