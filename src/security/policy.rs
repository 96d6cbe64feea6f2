//! Security Policy Tables
//!
//! This module holds the three rule tables the gateway validates commands
//! against: dangerous command prefixes, safe pattern overrides, and regex
//! rules for context-sensitive prohibitions that prefix matching cannot
//! express. Tables are loaded once at startup from an optional TOML policy
//! file and fall back to the built-in defaults on any problem; loading never
//! fails startup. The loaded policy is an immutable snapshot that can be
//! atomically replaced through [`PolicyStore::reload`].
//!
//! Policy file layout mirrors the three tables:
//!
//! ```toml
//! [dangerous_commands]
//! iam = ["aws iam create-user"]
//!
//! [safe_patterns]
//! iam = ["aws iam get-", "aws iam list-"]
//!
//! [[regex_rules.general]]
//! pattern = 'aws .* --profile\s+(root|admin)'
//! description = "Prevent use of sensitive profiles"
//! error_message = "Using sensitive profiles is restricted"
//! ```

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Safe-pattern category applied to every command regardless of service.
/// Entries in this category match whole tokens (help and version style
/// flags); per-service entries match as command prefixes.
pub const GENERAL_CATEGORY: &str = "general";

/// A single pattern-based validation rule.
///
/// Regex patterns are compiled once at load time and the compiled matcher is
/// cached on the rule. A rule whose pattern fails to compile is dropped at
/// load (see [`SecurityPolicy::load`]).
#[derive(Debug, Clone)]
pub struct ValidationRule {
    /// The pattern text as it appeared in the policy source.
    pub pattern: String,

    /// Short human description of what the rule prevents.
    pub description: String,

    /// Message returned to the caller when the rule matches.
    pub error_message: String,

    /// Compiled matcher; `None` means the pattern is a literal substring.
    regex: Option<Regex>,
}

impl ValidationRule {
    /// Check whether this rule matches the given command.
    pub fn matches(&self, command: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(command),
            None => command.contains(&self.pattern),
        }
    }
}

/// Raw rule shape as deserialized from the policy file.
#[derive(Debug, Clone, Deserialize)]
struct RawRule {
    pattern: String,
    #[serde(default)]
    description: String,
    error_message: String,
    #[serde(default = "default_true")]
    regex: bool,
}

fn default_true() -> bool {
    true
}

/// Raw policy document shape. Sections are optional; a missing section
/// keeps the built-in defaults for that table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawPolicy {
    dangerous_commands: Option<HashMap<String, Vec<String>>>,
    safe_patterns: Option<HashMap<String, Vec<String>>>,
    regex_rules: Option<HashMap<String, Vec<RawRule>>>,
}

/// Immutable snapshot of the security rule tables.
#[derive(Debug, Clone, Default)]
pub struct SecurityPolicy {
    /// service name -> command prefixes that require a safe override to run
    pub dangerous_commands: HashMap<String, Vec<String>>,

    /// service name -> command-start strings that override a dangerous match
    pub safe_patterns: HashMap<String, Vec<String>>,

    /// category name -> pattern rules, checked before the prefix tables
    pub regex_rules: HashMap<String, Vec<ValidationRule>>,
}

impl SecurityPolicy {
    /// The built-in default tables shipped with the gateway.
    pub fn builtin() -> Self {
        Self {
            dangerous_commands: default_dangerous_commands(),
            safe_patterns: default_safe_patterns(),
            regex_rules: compile_categories(default_regex_rules()),
        }
    }

    /// Load the policy from an optional TOML file.
    ///
    /// Never fails: a missing path, unreadable file or parse error logs a
    /// warning and returns the built-in tables. Sections present in the file
    /// replace the corresponding built-in table wholesale; absent sections
    /// keep the defaults. A regex rule whose pattern does not compile is
    /// dropped here with a warning so that classification can never observe
    /// an uncompilable rule (fail closed at load time).
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            debug!("No security policy file configured, using built-in tables");
            return Self::builtin();
        };

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Failed to read security policy from {:?}: {}. Using built-in tables.",
                    path, e
                );
                return Self::builtin();
            }
        };

        let raw: RawPolicy = match toml::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    "Failed to parse security policy from {:?}: {}. Using built-in tables.",
                    path, e
                );
                return Self::builtin();
            }
        };

        let mut policy = Self::builtin();
        if let Some(dangerous) = raw.dangerous_commands {
            policy.dangerous_commands = dangerous;
        }
        if let Some(safe) = raw.safe_patterns {
            policy.safe_patterns = safe;
        }
        if let Some(rules) = raw.regex_rules {
            policy.regex_rules = compile_categories(rules);
        }
        info!("Loaded security policy from {:?}", path);
        policy
    }
}

/// Compile raw rules, dropping any whose regex fails to compile.
fn compile_categories(
    raw: HashMap<String, Vec<RawRule>>,
) -> HashMap<String, Vec<ValidationRule>> {
    raw.into_iter()
        .map(|(category, rules)| {
            let compiled = rules
                .into_iter()
                .filter_map(|rule| compile_rule(&category, rule))
                .collect();
            (category, compiled)
        })
        .collect()
}

fn compile_rule(category: &str, rule: RawRule) -> Option<ValidationRule> {
    let regex = if rule.regex {
        match Regex::new(&rule.pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(
                    "Dropping rule '{}' in category '{}': pattern failed to compile: {}",
                    rule.pattern, category, e
                );
                return None;
            }
        }
    } else {
        None
    };
    Some(ValidationRule {
        pattern: rule.pattern,
        description: rule.description,
        error_message: rule.error_message,
        regex,
    })
}

/// Shared holder for the current policy snapshot.
///
/// Readers clone the `Arc` out and validate against a consistent snapshot;
/// [`reload`](Self::reload) re-runs the load procedure and swaps the pointer
/// so concurrent readers see either the old or the new tables, never a mix.
#[derive(Debug)]
pub struct PolicyStore {
    path: Option<PathBuf>,
    current: RwLock<Arc<SecurityPolicy>>,
}

impl PolicyStore {
    /// Load the policy from the given optional path and wrap it for sharing.
    pub fn open(path: Option<PathBuf>) -> Self {
        let policy = SecurityPolicy::load(path.as_deref());
        Self {
            path,
            current: RwLock::new(Arc::new(policy)),
        }
    }

    /// Get the current policy snapshot.
    pub fn snapshot(&self) -> Arc<SecurityPolicy> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Re-run the load procedure and atomically install the new tables.
    pub fn reload(&self) {
        let fresh = Arc::new(SecurityPolicy::load(self.path.as_deref()));
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = fresh;
        info!("Security policy reloaded");
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_dangerous_commands() -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    map.insert(
        "iam".to_string(),
        strings(&[
            "aws iam create-user",
            "aws iam create-access-key",
            "aws iam attach-user-policy",
            "aws iam attach-role-policy",
            "aws iam attach-group-policy",
            "aws iam create-policy",
            "aws iam create-login-profile",
            "aws iam deactivate-mfa-device",
            "aws iam update-assume-role-policy",
        ]),
    );
    map.insert(
        "ec2".to_string(),
        strings(&[
            "aws ec2 terminate-instances",
            "aws ec2 stop-instances",
            "aws ec2 reboot-instances",
            "aws ec2 delete-security-group",
            "aws ec2 authorize-security-group-ingress",
            "aws ec2 authorize-security-group-egress",
        ]),
    );
    map.insert(
        "s3".to_string(),
        strings(&[
            "aws s3 rb",
            "aws s3 rm",
            "aws s3api delete-bucket",
            "aws s3api delete-bucket-policy",
            "aws s3api put-bucket-acl",
        ]),
    );
    map.insert(
        "rds".to_string(),
        strings(&[
            "aws rds delete-db-instance",
            "aws rds delete-db-cluster",
            "aws rds stop-db-instance",
        ]),
    );
    map.insert(
        "cloudtrail".to_string(),
        strings(&["aws cloudtrail delete-trail", "aws cloudtrail stop-logging"]),
    );
    map.insert(
        "kms".to_string(),
        strings(&["aws kms schedule-key-deletion", "aws kms disable-key"]),
    );
    map.insert(
        "secretsmanager".to_string(),
        strings(&["aws secretsmanager delete-secret"]),
    );
    map.insert(
        "dynamodb".to_string(),
        strings(&["aws dynamodb delete-table"]),
    );
    map
}

fn default_safe_patterns() -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    // Token matches: any command carrying one of these is documentation-only.
    map.insert(
        GENERAL_CATEGORY.to_string(),
        strings(&["--help", "help", "--version", "--dry-run"]),
    );
    map.insert(
        "iam".to_string(),
        strings(&[
            "aws iam get-",
            "aws iam list-",
            "aws iam generate-credential-report",
            "aws iam simulate-custom-policy",
            "aws iam simulate-principal-policy",
        ]),
    );
    map.insert("ec2".to_string(), strings(&["aws ec2 describe-"]));
    map.insert(
        "s3".to_string(),
        strings(&[
            "aws s3 ls",
            "aws s3api get-",
            "aws s3api list-",
            "aws s3api head-",
        ]),
    );
    map.insert("rds".to_string(), strings(&["aws rds describe-"]));
    map.insert(
        "cloudtrail".to_string(),
        strings(&[
            "aws cloudtrail describe-",
            "aws cloudtrail get-",
            "aws cloudtrail list-",
            "aws cloudtrail lookup-events",
        ]),
    );
    map.insert(
        "kms".to_string(),
        strings(&["aws kms describe-", "aws kms get-", "aws kms list-"]),
    );
    map.insert(
        "secretsmanager".to_string(),
        strings(&[
            "aws secretsmanager describe-",
            "aws secretsmanager get-",
            "aws secretsmanager list-",
        ]),
    );
    map.insert(
        "dynamodb".to_string(),
        strings(&[
            "aws dynamodb describe-",
            "aws dynamodb get-",
            "aws dynamodb list-",
            "aws dynamodb scan",
            "aws dynamodb query",
        ]),
    );
    map
}

fn default_regex_rules() -> HashMap<String, Vec<RawRule>> {
    let rule = |pattern: &str, description: &str, error_message: &str| RawRule {
        pattern: pattern.to_string(),
        description: description.to_string(),
        error_message: error_message.to_string(),
        regex: true,
    };

    let mut map = HashMap::new();
    map.insert(
        GENERAL_CATEGORY.to_string(),
        vec![rule(
            r"aws .* --profile\s+(root|admin|administrator)\b",
            "Prevent use of sensitive profiles",
            "Using sensitive profiles (root, admin, administrator) is restricted",
        )],
    );
    map.insert(
        "s3".to_string(),
        vec![
            rule(
                r#"aws s3api put-bucket-policy.*"Principal":\s*"\*""#,
                "Prevent public bucket policies",
                "Creating bucket policies with a wildcard principal is restricted for security reasons",
            ),
            rule(
                r"aws s3api put-public-access-block.*false",
                "Prevent disabling public access blocks",
                "Disabling S3 public access blocks is restricted for security reasons",
            ),
        ],
    );
    map.insert(
        "ec2".to_string(),
        vec![rule(
            r"aws ec2 authorize-security-group-ingress.*--cidr\s+0\.0\.0\.0/0.*--port\s+(?:20|21|22|23|1433|3306|3389|5432|5439|6379|9200|27017)\b",
            "Prevent exposing admin and database ports to the world",
            "Opening non-web ports to 0.0.0.0/0 is restricted for security reasons",
        )],
    );
    map.insert(
        "iam".to_string(),
        vec![rule(
            r"aws iam attach-(user|role|group)-policy.*--policy-arn\s+\S*AdministratorAccess",
            "Prevent granting full administrator access",
            "Attaching the AdministratorAccess policy is restricted for security reasons",
        )],
    );
    map
}
