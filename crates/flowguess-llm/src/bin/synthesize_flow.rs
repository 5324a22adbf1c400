use anyhow::{Context, Result};
use clap::Parser;
use flowguess_core::StaticCatalog;
use flowguess_llm::synthesizer::{PromptTemplates, UnknownStepPolicy};
use flowguess_llm::{LlmConfig, SynthesisOptions, synthesize_flow};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// ── CLI ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "synthesize-flow", about = "Turn a plain-language request into a flow")]
struct Cli {
    /// What the flow should do
    question: String,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the catalog JSON file
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Override the completion endpoint base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Override model name
    #[arg(long)]
    model: Option<String>,

    /// Give up after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Directory with find_examples.txt / synthesize.txt overrides
    #[arg(long)]
    prompts_dir: Option<PathBuf>,

    /// Replace unsupported step types with no-op steps instead of failing
    #[arg(long)]
    fallback_unknown_steps: bool,

    /// Also write JSON logs to daily files in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

// ── Config types ────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    llm: LlmSection,
    catalog: CatalogSection,
    synthesis: SynthesisSection,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LlmSection {
    endpoint: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    frequency_penalty: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CatalogSection {
    path: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SynthesisSection {
    timeout_secs: Option<u64>,
    prompts_dir: Option<PathBuf>,
    fallback_unknown_steps: bool,
}

fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml_edit::de::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Defaults, then the config file, then flags. The API key falls back to
/// `OPENAI_API_KEY`.
fn llm_config(cli: &Cli, section: &LlmSection) -> LlmConfig {
    let mut config = LlmConfig::default();
    if let Some(endpoint) = cli.endpoint.as_ref().or(section.endpoint.as_ref()) {
        config.base_url = endpoint.clone();
    }
    if let Some(model) = cli.model.as_ref().or(section.model.as_ref()) {
        config.model = model.clone();
    }
    config.api_key = section
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());
    if section.temperature.is_some() {
        config.temperature = section.temperature;
    }
    if section.top_p.is_some() {
        config.top_p = section.top_p;
    }
    if section.frequency_penalty.is_some() {
        config.frequency_penalty = section.frequency_penalty;
    }
    config.max_tokens = section.max_tokens;
    config
}

// ── Logging ─────────────────────────────────────────────────────

fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log dir: {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("flowguess")
                .filename_suffix("txt")
                .build(dir)
                .context("Failed to create log file appender")?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

// ── Main ────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref())?;

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };

    let catalog_path = cli
        .catalog
        .clone()
        .or_else(|| config.catalog.path.clone())
        .context("No catalog given: pass --catalog or set [catalog] path")?;
    let catalog = StaticCatalog::load(&catalog_path)?;
    info!(
        "Loaded {} integrations from {}",
        catalog.len(),
        catalog_path.display()
    );

    let templates = match cli
        .prompts_dir
        .as_ref()
        .or(config.synthesis.prompts_dir.as_ref())
    {
        Some(dir) => PromptTemplates::load(dir)?,
        None => PromptTemplates::default(),
    };

    let unknown_step_policy =
        if cli.fallback_unknown_steps || config.synthesis.fallback_unknown_steps {
            UnknownStepPolicy::Fallback
        } else {
            UnknownStepPolicy::Reject
        };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling synthesis");
                cancel.cancel();
            }
        }
    });

    let options = SynthesisOptions {
        timeout: cli
            .timeout_secs
            .or(config.synthesis.timeout_secs)
            .map(Duration::from_secs),
        cancel: Some(cancel),
        unknown_step_policy,
        templates,
    };

    let llm = llm_config(&cli, &config.llm);
    let result = synthesize_flow(&cli.question, llm, &catalog, &options).await?;

    println!("{}", serde_json::to_string_pretty(&result.flow)?);
    Ok(())
}
