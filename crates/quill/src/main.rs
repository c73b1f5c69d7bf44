//! Quill CLI.
//!
//! Three subcommands over the project in the current directory:
//! `agent` (interactive command-execution session), `gen` (test files for a
//! path pattern), and `docs` (a documentation tree from a menu config).
//! Exit code 0 on normal completion, non-zero on unrecoverable I/O or
//! exhausted retries.

mod agent_loop;
mod docs;
mod testgen;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quill_llm::openai::{OpenAiAuth, OpenAiConfig, OpenAiProvider};
use quill_llm::usage::UsageLedger;
use quill_llm::CompletionGateway;
use quill_settings::{ConfirmationPolicy, Settings};

#[derive(Parser)]
#[command(name = "quill", version, about = "Generate and edit project files with an LLM")]
struct Cli {
    /// Model identifier override.
    #[arg(long, global = true)]
    model: Option<String>,

    /// Apply proposed command batches without asking.
    #[arg(long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Interactive agent session over the current project.
    Agent,
    /// Generate test files for project files matching a pattern.
    Gen {
        /// Target path pattern, e.g. `src/**/*.ts`.
        pattern: String,
        /// Output directory for generated tests.
        #[arg(long)]
        out: Option<String>,
        /// Programming language of the project under test.
        #[arg(long)]
        language: Option<String>,
        /// Test framework to target.
        #[arg(long)]
        framework: Option<String>,
    },
    /// Generate a documentation tree from a menu config.
    Docs {
        /// Menu config file (JSON).
        #[arg(long, default_value = "quill-docs.json")]
        config: String,
        /// Output directory for the generated pages.
        #[arg(long, default_value = "docs")]
        out: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quill=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut settings = (*quill_settings::get_settings()).clone();
    if let Some(model) = cli.model {
        settings.model = model;
    }
    if cli.yes {
        settings.engine.confirmation = ConfirmationPolicy::AutoApprove;
    }

    let root = std::env::current_dir().context("cannot resolve current directory")?;
    let gateway = build_gateway(&settings, &root)?;

    match cli.command {
        CliCommand::Agent => agent_loop::run(gateway, &settings, &root).await,
        CliCommand::Gen {
            pattern,
            out,
            language,
            framework,
        } => {
            let options = testgen::GenOptions {
                pattern,
                out_dir: out.unwrap_or_else(|| settings.generation.out_dir.clone()),
                language: language.unwrap_or_else(|| settings.generation.language.clone()),
                framework: framework.unwrap_or_else(|| settings.generation.framework.clone()),
                concurrency: settings.concurrency.generate,
                describe_concurrency: settings.concurrency.describe,
            };
            let report = testgen::run(gateway, &root, &options).await?;
            println!(
                "Generated {} test file(s), skipped {} up-to-date.",
                report.generated.len(),
                report.skipped
            );
            Ok(())
        }
        CliCommand::Docs { config, out } => {
            let report = docs::run(
                gateway,
                &root,
                Path::new(&config),
                Path::new(&out),
                settings.concurrency.generate,
            )
            .await?;
            println!("Generated {} documentation page(s).", report.pages.len());
            Ok(())
        }
    }
}

/// Build the completion gateway from settings: provider plus usage ledger.
fn build_gateway(settings: &Settings, root: &Path) -> anyhow::Result<Arc<CompletionGateway>> {
    let api_key = std::env::var(&settings.api_key_env)
        .with_context(|| format!("{} is not set", settings.api_key_env))?;
    let provider = OpenAiProvider::new(OpenAiConfig {
        model: settings.model.clone(),
        auth: OpenAiAuth::ApiKey { api_key },
        base_url: settings.base_url.clone(),
        temperature: None,
    });
    let ledger = UsageLedger::load(root.join(".quill").join("usage.json"))
        .context("cannot load usage counters")?;
    Ok(Arc::new(CompletionGateway::new(
        Arc::new(provider),
        Arc::new(ledger),
    )))
}
