//! CLI binary: send one prompt to several LLM providers and print each
//! answer side by side.

mod config;

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};

use chorus_dispatch::{format_report, render_json, render_text, Dispatcher};
use chorus_llm::{
    build_client, AdapterRegistry, BackoffPolicy, Catalog, CredentialChain, CredentialResolver,
    EnvCredentials, GenerationOptions, PromptRequest, ProviderSpec, SecretsFile,
};

use crate::config::ChorusConfig;

#[derive(Parser)]
#[command(
    name = "chorus",
    version,
    about = "Send one prompt to several LLM providers and compare the answers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./chorus.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask every selected model the same question
    Ask {
        /// Prompt text. Read from stdin when omitted.
        prompt: Option<String>,

        /// Model to query, as vendor/variant (repeatable), e.g. anthropic/opus
        #[arg(short, long = "model", value_name = "VENDOR/VARIANT")]
        models: Vec<ProviderSpec>,

        /// Query every model in the catalog
        #[arg(long, conflicts_with = "models")]
        all: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Maximum tokens to generate per model
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Sampling temperature (0.0 to 2.0)
        #[arg(long)]
        temperature: Option<f32>,

        /// Per-model timeout in seconds. Default: 60.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout_secs: Option<u64>,

        /// Retries on transport failures. Default: 0.
        #[arg(long)]
        retries: Option<usize>,

        /// System instructions sent ahead of the prompt
        #[arg(long)]
        system: Option<String>,

        /// TOML file of API keys, checked after the environment
        #[arg(long)]
        secrets: Option<PathBuf>,
    },

    /// List the models that can be queried
    Models {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ChorusConfig::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask {
            prompt,
            models,
            all,
            format,
            max_tokens,
            temperature,
            timeout_secs,
            retries,
            system,
            secrets,
        } => {
            let mut options = config.options();
            if max_tokens.is_some() {
                options.max_tokens = max_tokens;
            }
            if temperature.is_some() {
                options.temperature = temperature;
            }
            let settings = AskSettings {
                options,
                system,
                timeout: timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| config.timeout()),
                retries: retries.unwrap_or_else(|| config.retries()),
            };
            let prompt = match prompt {
                Some(p) => p,
                None => read_prompt_from_stdin()?,
            };
            cmd_ask(
                &config,
                &prompt,
                models,
                all,
                format,
                settings,
                secrets.as_deref(),
            )
            .await?;
        }
        Commands::Models { format } => {
            cmd_models(&config, format)?;
        }
    }

    Ok(())
}

struct AskSettings {
    options: GenerationOptions,
    system: Option<String>,
    timeout: Duration,
    retries: usize,
}

fn build_catalog(config: &ChorusConfig) -> anyhow::Result<Catalog> {
    let mut catalog = Catalog::new();
    config.apply(&mut catalog)?;
    Ok(catalog)
}

fn read_prompt_from_stdin() -> anyhow::Result<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprintln!("Enter your prompt, then Ctrl-D:");
    }
    let mut prompt = String::new();
    stdin
        .read_to_string(&mut prompt)
        .context("reading prompt from stdin")?;
    Ok(prompt)
}

async fn cmd_ask(
    config: &ChorusConfig,
    prompt: &str,
    models: Vec<ProviderSpec>,
    all: bool,
    format: OutputFormat,
    settings: AskSettings,
    secrets: Option<&Path>,
) -> anyhow::Result<()> {
    let catalog = build_catalog(config)?;
    let selected = if all { catalog.specs() } else { models };
    if selected.is_empty() {
        bail!("no models selected; pass --model vendor/variant (see `chorus models`) or --all");
    }

    let mut credentials = CredentialChain::new().push(EnvCredentials);
    if let Some(path) = secrets {
        let file = SecretsFile::from_path(path)
            .with_context(|| format!("loading secrets from {}", path.display()))?;
        tracing::debug!(path = %path.display(), keys = file.len(), "Loaded secrets file");
        credentials = credentials.push(file);
    }
    let resolver = CredentialResolver::new(credentials, &catalog);

    let registry = AdapterRegistry::with_http_adapters(catalog, build_client(settings.timeout))
        .with_retries(settings.retries, BackoffPolicy::default());
    let dispatcher = Dispatcher::new(registry, resolver)
        .with_timeout(settings.timeout)
        .with_default_options(settings.options);

    let mut request = PromptRequest::new(prompt);
    if let Some(system) = settings.system {
        request = request.with_system(system);
    }
    let report = dispatcher.run(request, &selected).await?;

    let panels = format_report(&report);
    match format {
        OutputFormat::Text => print!("{}", render_text(&panels)),
        OutputFormat::Json => println!("{}", render_json(&panels)?),
    }
    Ok(())
}

fn cmd_models(config: &ChorusConfig, format: OutputFormat) -> anyhow::Result<()> {
    let catalog = build_catalog(config)?;
    let rows: Vec<(String, String, String)> = catalog
        .vendors()
        .flat_map(|profile| {
            profile.variants.iter().map(move |v| {
                (
                    format!("{}/{}", profile.vendor, v.id),
                    v.label.clone(),
                    v.model.clone(),
                )
            })
        })
        .collect();

    match format {
        OutputFormat::Text => {
            let width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0);
            for (spec, label, model) in &rows {
                println!("{spec:<width$}  {label} [{model}]");
            }
        }
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = rows
                .iter()
                .map(|(spec, label, model)| {
                    serde_json::json!({ "spec": spec, "label": label, "model": model })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}
