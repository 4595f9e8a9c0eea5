use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditEntry, AuditLogger};
use crate::classify::{Risk, RuleSet, Verdict};
use crate::engine::{Engine, RunStatus};

/// A command proposed for execution, before any safety judgement.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub raw_text: String,
    pub explanation: String,
    /// The natural-language task the command was derived from.
    pub source_task: String,
    pub proposed_at: DateTime<Utc>,
}

impl Proposal {
    #[must_use]
    pub fn new(
        raw_text: impl Into<String>,
        explanation: impl Into<String>,
        source_task: impl Into<String>,
    ) -> Self {
        Self {
            raw_text: raw_text.into(),
            explanation: explanation.into(),
            source_task: source_task.into(),
            proposed_at: Utc::now(),
        }
    }
}

/// How the approval question was answered, or why it never was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Approved without a prompt under `AutoApproveSafe`.
    Auto,
    Approved,
    Declined,
    /// No question was asked; the command was refused outright.
    NotAsked,
}

/// Terminal state of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Executed,
    Declined,
    Blocked,
    TimedOut,
    Failed,
}

#[derive(Debug)]
pub struct ExecutionResult {
    pub outcome: Outcome,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ExecutionResult {
    fn without_run(outcome: Outcome) -> Self {
        Self {
            outcome,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }
}

/// When to ask the user before running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmPolicy {
    /// Every command prompts, safe ones included.
    #[default]
    AlwaysConfirm,
    /// Safe commands run without a prompt; suspicious ones still ask.
    AutoApproveSafe,
}

/// A reviewed proposal waiting on a decision. Execution is only reachable
/// by handing this token back to [`Gate::approve`], which consumes it.
#[derive(Debug)]
pub struct Pending {
    proposal: Proposal,
    verdict: Verdict,
}

impl Pending {
    #[must_use]
    pub fn command(&self) -> &str {
        &self.proposal.raw_text
    }

    #[must_use]
    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    #[must_use]
    pub fn proposal(&self) -> &Proposal {
        &self.proposal
    }
}

/// Result of reviewing a proposal.
#[derive(Debug)]
pub enum Review {
    /// Blocked outright; already audited. Nothing ran.
    Refused(GateOutcome),
    /// Cleared to run without asking.
    Proceed(Pending),
    /// Must be confirmed before running.
    NeedsConfirmation(Pending),
}

/// Everything known about a proposal once it reaches a terminal state.
#[derive(Debug)]
pub struct GateOutcome {
    pub proposal: Proposal,
    pub verdict: Verdict,
    pub decision: Decision,
    pub result: ExecutionResult,
}

/// Ties classification, confirmation, and execution together. Every path
/// through the gate ends in exactly one audit entry.
#[derive(Debug)]
pub struct Gate {
    rules: RuleSet,
    engine: Engine,
    policy: ConfirmPolicy,
    audit: Option<AuditLogger>,
}

impl Gate {
    #[must_use]
    pub fn new(rules: RuleSet, engine: Engine, policy: ConfirmPolicy) -> Self {
        Self {
            rules,
            engine,
            policy,
            audit: None,
        }
    }

    #[must_use]
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Classify a proposal and decide what happens next. A blocked command
    /// is refused here and never becomes runnable.
    pub async fn review(&self, proposal: Proposal) -> Review {
        let verdict = self.rules.classify(&proposal.raw_text);

        match verdict.risk {
            Risk::Blocked => {
                let outcome = GateOutcome {
                    proposal,
                    verdict,
                    decision: Decision::NotAsked,
                    result: ExecutionResult::without_run(Outcome::Blocked),
                };
                self.record(&outcome).await;
                Review::Refused(outcome)
            }
            Risk::Safe if self.policy == ConfirmPolicy::AutoApproveSafe => {
                Review::Proceed(Pending { proposal, verdict })
            }
            Risk::Safe | Risk::Suspicious => {
                Review::NeedsConfirmation(Pending { proposal, verdict })
            }
        }
    }

    /// Run an approved command and audit the result.
    pub async fn approve(&self, pending: Pending, decision: Decision) -> GateOutcome {
        let Pending { proposal, verdict } = pending;
        let run = self.engine.run(&proposal.raw_text).await;

        let result = match run.status {
            RunStatus::Exited { code } => ExecutionResult {
                outcome: Outcome::Executed,
                exit_code: code,
                stdout: run.stdout,
                stderr: run.stderr,
                duration: run.duration,
            },
            RunStatus::TimedOut => ExecutionResult {
                outcome: Outcome::TimedOut,
                exit_code: None,
                stdout: run.stdout,
                stderr: run.stderr,
                duration: run.duration,
            },
            RunStatus::SpawnFailed { error } => ExecutionResult {
                outcome: Outcome::Failed,
                exit_code: None,
                stdout: String::new(),
                stderr: error,
                duration: run.duration,
            },
        };

        let outcome = GateOutcome {
            proposal,
            verdict,
            decision,
            result,
        };
        self.record(&outcome).await;
        outcome
    }

    /// Record a declined proposal without running anything.
    pub async fn decline(&self, pending: Pending) -> GateOutcome {
        let Pending { proposal, verdict } = pending;
        let outcome = GateOutcome {
            proposal,
            verdict,
            decision: Decision::Declined,
            result: ExecutionResult::without_run(Outcome::Declined),
        };
        self.record(&outcome).await;
        outcome
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.engine.timeout()
    }

    // Audit failures are logged, not fatal: losing a log line is better
    // than losing the user's session.
    async fn record(&self, outcome: &GateOutcome) {
        let Some(ref audit) = self.audit else {
            return;
        };
        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = outcome.result.duration.as_millis() as u64;
        let entry = AuditEntry {
            timestamp: outcome.proposal.proposed_at.to_rfc3339(),
            task: outcome.proposal.source_task.clone(),
            command: outcome.proposal.raw_text.clone(),
            risk: outcome.verdict.risk,
            matched: outcome.verdict.matched.clone(),
            decision: outcome.decision,
            outcome: outcome.result.outcome,
            exit_code: outcome.result.exit_code,
            duration_ms,
        };
        if let Err(e) = audit.record(&entry).await {
            tracing::warn!(error = %e, "failed to write audit entry");
        }
    }
}
