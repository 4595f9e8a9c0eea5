//! Command-safety core: classify proposed shell commands against a rule
//! table, execute them under a confirmation gate with a hard timeout, and
//! append every terminal outcome to an audit log.

pub mod audit;
pub mod classify;
pub mod config;
pub mod engine;
pub mod gate;

pub use audit::{AuditEntry, AuditLogger};
pub use classify::{Risk, Rule, RuleLoadError, RuleSet, Verdict};
pub use config::{AuditConfig, GuardConfig};
pub use engine::{Engine, RunOutput, RunStatus};
pub use gate::{
    ConfirmPolicy, Decision, ExecutionResult, Gate, GateOutcome, Outcome, Pending, Proposal,
    Review,
};
