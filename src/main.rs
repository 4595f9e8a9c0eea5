use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use nlsh_channels::CliChannel;
use nlsh_core::config::{Config, ProviderKind};
use nlsh_core::session::Session;
use nlsh_guard::{AuditLogger, Engine, Gate, RuleSet};
use nlsh_llm::any::AnyProvider;
use nlsh_llm::claude::ClaudeProvider;
use nlsh_llm::ollama::OllamaProvider;

mod init;

#[derive(Parser)]
#[command(name = "nlsh", version, about = "Natural-language shell assistant")]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true, default_value = "nlsh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Turn one task into a command, confirm, run, and exit
    Ask {
        /// The task in plain language
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Interactive configuration wizard
    Init {
        /// Write the config here instead of prompting for a path
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Init { output }) = &cli.command {
        return init::run(output.clone());
    }

    let config = Config::load(&cli.config)?;
    init_tracing(&config)?;

    let provider = create_provider(&config)?;
    tracing::info!(provider = provider_name(&provider), model = %config.llm.model, "starting");

    if let AnyProvider::Ollama(ref ollama) = provider
        && let Err(e) = ollama.health_check().await
    {
        tracing::warn!(error = %e, "Ollama health check failed, continuing anyway");
    }

    let gate = create_gate(&config).await?;
    let mut session = Session::new(CliChannel::new(), provider, gate);

    match cli.command {
        Some(Command::Ask { query }) => {
            let task = query.join(" ");
            if task.trim().is_empty() {
                bail!("nothing to do: the task is empty");
            }
            session.ask(&task).await?;
        }
        _ => {
            println!("{} ready. Describe a task, or 'exit' to quit.", config.agent.name);
            session.run().await?;
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(ref path) = config.log.file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {path}"))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    match config.llm.provider {
        ProviderKind::Ollama => Ok(AnyProvider::Ollama(OllamaProvider::new(
            &config.llm.base_url,
            config.llm.model.clone(),
        ))),
        ProviderKind::Claude => {
            let api_key = std::env::var("NLSH_CLAUDE_API_KEY")
                .context("NLSH_CLAUDE_API_KEY must be set for the claude provider")?;
            Ok(AnyProvider::Claude(ClaudeProvider::new(
                api_key,
                config.llm.model.clone(),
                config.llm.max_tokens,
            )))
        }
    }
}

fn provider_name(provider: &AnyProvider) -> &'static str {
    use nlsh_llm::LlmProvider;
    provider.name()
}

async fn create_gate(config: &Config) -> anyhow::Result<Gate> {
    let rules = RuleSet::from_config(&config.guard).context("failed to load safety rules")?;
    let engine = Engine::new(Duration::from_secs(config.guard.timeout_secs));
    let mut gate = Gate::new(rules, engine, config.guard.policy);

    if config.audit.enabled {
        let logger = AuditLogger::from_config(&config.audit)
            .await
            .with_context(|| {
                format!("failed to open audit destination {}", config.audit.destination)
            })?;
        gate = gate.with_audit(logger);
    }

    Ok(gate)
}
