use crate::channel::{Channel, ChannelError};
use crate::error::SessionError;

use nlsh_guard::{Decision, Gate, GateOutcome, Outcome, Pending, Proposal, Review, Risk};
use nlsh_llm::{LlmProvider, build_messages, parse_suggestion};

/// Drives the task-to-command loop: generate a command for each incoming
/// task, route it through the gate, and report what happened.
pub struct Session<C, P> {
    channel: C,
    provider: P,
    gate: Gate,
}

impl<C: Channel, P: LlmProvider> Session<C, P> {
    #[must_use]
    pub fn new(channel: C, provider: P, gate: Gate) -> Self {
        Self {
            channel,
            provider,
            gate,
        }
    }

    /// REPL: one task per received message, until the channel closes.
    /// Task failures are reported and the loop continues; only channel
    /// failures end the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel itself fails.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        while let Some(msg) = self.channel.recv().await? {
            let task = msg.text.trim().to_owned();
            if task.is_empty() {
                continue;
            }
            if let Err(e) = self.handle_task(&task).await {
                match e {
                    SessionError::Channel(e) => return Err(e.into()),
                    other => {
                        tracing::warn!(error = %other, "task failed");
                        self.channel.send(&format!("error: {other}")).await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// One-shot: handle a single task and return.
    ///
    /// # Errors
    ///
    /// Returns an error if generation, parsing, or the channel fails.
    pub async fn ask(&mut self, task: &str) -> Result<(), SessionError> {
        self.handle_task(task).await
    }

    async fn handle_task(&mut self, task: &str) -> Result<(), SessionError> {
        let response = self.provider.chat(&build_messages(task)).await?;
        let suggestion = parse_suggestion(&response).ok_or(SessionError::EmptyProposal)?;
        let proposal = Proposal::new(suggestion.command, suggestion.explanation, task);

        self.channel.send(&format!("$ {}", proposal.raw_text)).await?;
        if !proposal.explanation.is_empty() {
            self.channel.send(&proposal.explanation).await?;
        }

        match self.gate.review(proposal).await {
            Review::Refused(outcome) => {
                let matched = outcome.verdict.matched.as_deref().unwrap_or("");
                self.channel
                    .send(&format!(
                        "refused: {} (matched \"{matched}\")",
                        outcome.verdict.rationale
                    ))
                    .await?;
            }
            Review::Proceed(pending) => {
                let outcome = self.gate.approve(pending, Decision::Auto).await;
                self.present(&outcome).await?;
            }
            Review::NeedsConfirmation(pending) => {
                let approved = self.channel.confirm(&confirm_prompt(&pending)).await?;
                if approved {
                    let outcome = self.gate.approve(pending, Decision::Approved).await;
                    self.present(&outcome).await?;
                } else {
                    self.gate.decline(pending).await;
                    self.channel.send("declined, nothing was run").await?;
                }
            }
        }
        Ok(())
    }

    async fn present(&mut self, outcome: &GateOutcome) -> Result<(), ChannelError> {
        if !outcome.result.stdout.is_empty() {
            self.channel.send(outcome.result.stdout.trim_end()).await?;
        }
        if !outcome.result.stderr.is_empty() {
            self.channel.send(outcome.result.stderr.trim_end()).await?;
        }
        match outcome.result.outcome {
            Outcome::Executed => {
                if let Some(code) = outcome.result.exit_code
                    && code != 0
                {
                    self.channel.send(&format!("exit code {code}")).await?;
                }
            }
            Outcome::TimedOut => {
                let secs = self.gate.timeout().as_secs();
                self.channel
                    .send(&format!("timed out after {secs}s, command killed"))
                    .await?;
            }
            Outcome::Failed => {
                self.channel.send("command could not be started").await?;
            }
            Outcome::Declined | Outcome::Blocked => {}
        }
        Ok(())
    }
}

fn confirm_prompt(pending: &Pending) -> String {
    match pending.verdict().risk {
        Risk::Suspicious => format!("suspicious: {}. Run anyway?", pending.verdict().rationale),
        Risk::Safe | Risk::Blocked => "Run this command?".to_owned(),
    }
}
