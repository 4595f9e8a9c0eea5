use serde::{Deserialize, Serialize};

use crate::gate::ConfirmPolicy;

/// Settings for classification and execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Hard wall-clock limit for a command, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub policy: ConfirmPolicy,
    /// Optional TOML file with additional `[[rules]]` entries.
    #[serde(default)]
    pub rules_path: Option<String>,
    #[serde(default)]
    pub blocked_patterns: Vec<String>,
    #[serde(default)]
    pub suspicious_patterns: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            policy: ConfirmPolicy::default(),
            rules_path: None,
            blocked_patterns: Vec::new(),
            suspicious_patterns: Vec::new(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Settings for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// `"stdout"` or a file path to append JSON lines to.
    #[serde(default = "default_destination")]
    pub destination: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            destination: default_destination(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_destination() -> String {
    "stdout".to_owned()
}
