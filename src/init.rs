use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use nlsh_core::config::{Config, ProviderKind};
use nlsh_guard::ConfirmPolicy;

#[derive(Default)]
#[cfg_attr(test, derive(Clone))]
pub(crate) struct WizardState {
    pub(crate) provider: Option<ProviderKind>,
    pub(crate) base_url: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) timeout_secs: u64,
    pub(crate) policy: ConfirmPolicy,
    pub(crate) audit_destination: String,
}

pub fn run(output: Option<PathBuf>) -> anyhow::Result<()> {
    println!("nlsh init - configuration wizard\n");

    let mut state = WizardState {
        timeout_secs: 30,
        audit_destination: "stdout".into(),
        ..WizardState::default()
    };

    step_llm(&mut state)?;
    step_guard(&mut state)?;
    step_audit(&mut state)?;
    step_review_and_write(&state, output)?;

    Ok(())
}

fn step_llm(state: &mut WizardState) -> anyhow::Result<()> {
    println!("== Step 1/3: LLM Provider ==\n");

    let providers = ["Ollama (local)", "Claude (API)"];
    let sel = Select::new()
        .with_prompt("Provider")
        .items(providers)
        .default(0)
        .interact()?;

    match sel {
        0 => {
            state.provider = Some(ProviderKind::Ollama);
            let base_url: String = Input::new()
                .with_prompt("Ollama base URL")
                .default("http://localhost:11434".into())
                .interact_text()?;
            let model: String = Input::new()
                .with_prompt("Model name")
                .default("llama3:8b".into())
                .interact_text()?;
            state.base_url = Some(base_url);
            state.model = Some(model);
        }
        _ => {
            state.provider = Some(ProviderKind::Claude);
            let model: String = Input::new()
                .with_prompt("Model name")
                .default("claude-sonnet-4-5".into())
                .interact_text()?;
            state.model = Some(model);
        }
    }

    println!();
    Ok(())
}

fn step_guard(state: &mut WizardState) -> anyhow::Result<()> {
    println!("== Step 2/3: Safety ==\n");

    let timeout: u64 = Input::new()
        .with_prompt("Command timeout (seconds)")
        .default(30)
        .interact_text()?;
    state.timeout_secs = timeout;

    let policies = [
        "Always confirm (every command prompts)",
        "Auto-approve safe (only risky commands prompt)",
    ];
    let sel = Select::new()
        .with_prompt("Confirmation policy")
        .items(policies)
        .default(0)
        .interact()?;
    state.policy = if sel == 0 {
        ConfirmPolicy::AlwaysConfirm
    } else {
        ConfirmPolicy::AutoApproveSafe
    };

    println!();
    Ok(())
}

fn step_audit(state: &mut WizardState) -> anyhow::Result<()> {
    println!("== Step 3/3: Audit Trail ==\n");

    let destinations = ["stdout (log line per command)", "file (JSON lines)"];
    let sel = Select::new()
        .with_prompt("Audit destination")
        .items(destinations)
        .default(0)
        .interact()?;
    if sel == 0 {
        state.audit_destination = "stdout".into();
    } else {
        let path: String = Input::new()
            .with_prompt("Audit file path")
            .default("nlsh-audit.jsonl".into())
            .interact_text()?;
        state.audit_destination = path;
    }

    println!();
    Ok(())
}

pub(crate) fn build_config(state: &WizardState) -> Config {
    let mut config = Config::default();
    if let Some(provider) = state.provider {
        config.llm.provider = provider;
    }
    if let Some(ref base_url) = state.base_url {
        config.llm.base_url.clone_from(base_url);
    }
    if let Some(ref model) = state.model {
        config.llm.model.clone_from(model);
    }
    config.guard.timeout_secs = state.timeout_secs;
    config.guard.policy = state.policy;
    config.audit.destination.clone_from(&state.audit_destination);
    config
}

fn step_review_and_write(state: &WizardState, output: Option<PathBuf>) -> anyhow::Result<()> {
    println!("== Review & Write ==\n");

    let config = build_config(state);
    let toml_str = toml::to_string_pretty(&config)?;

    println!("--- Generated config ---");
    println!("{toml_str}");
    println!("------------------------\n");

    let default_path = PathBuf::from("nlsh.toml");
    let path = output.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Write config to")
            .default(default_path.display().to_string())
            .interact_text()
            .map(PathBuf::from)
            .unwrap_or(default_path)
    });

    if path.exists() {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", path.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &toml_str)?;
    println!("Config written to {}", path.display());

    println!("\nNext steps:");
    if state.provider == Some(ProviderKind::Claude) {
        println!("  1. export NLSH_CLAUDE_API_KEY=\"<your-key>\"");
        println!("  2. Run: nlsh --config {}", path.display());
    } else {
        println!("  1. Run: nlsh --config {}", path.display());
    }
    println!("  Or one-shot: nlsh ask <what you want done>");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_config_applies_wizard_choices() {
        let state = WizardState {
            provider: Some(ProviderKind::Claude),
            base_url: None,
            model: Some("claude-sonnet-4-5".into()),
            timeout_secs: 15,
            policy: ConfirmPolicy::AutoApproveSafe,
            audit_destination: "audit.jsonl".into(),
        };
        let config = build_config(&state);
        assert_eq!(config.llm.provider, ProviderKind::Claude);
        assert_eq!(config.llm.model, "claude-sonnet-4-5");
        assert_eq!(config.guard.timeout_secs, 15);
        assert_eq!(config.guard.policy, ConfirmPolicy::AutoApproveSafe);
        assert_eq!(config.audit.destination, "audit.jsonl");
    }

    #[test]
    fn build_config_keeps_defaults_when_unset() {
        let state = WizardState {
            timeout_secs: 30,
            audit_destination: "stdout".into(),
            ..WizardState::default()
        };
        let config = build_config(&state);
        assert_eq!(config.llm.provider, ProviderKind::Ollama);
        assert_eq!(config.llm.base_url, "http://localhost:11434");
    }

    #[test]
    fn generated_config_round_trips() {
        let state = WizardState {
            provider: Some(ProviderKind::Ollama),
            base_url: Some("http://localhost:11434".into()),
            model: Some("llama3:8b".into()),
            timeout_secs: 30,
            policy: ConfirmPolicy::AlwaysConfirm,
            audit_destination: "stdout".into(),
        };
        let toml_str = toml::to_string_pretty(&build_config(&state)).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.model, "llama3:8b");
        parsed.validate().unwrap();
    }
}
