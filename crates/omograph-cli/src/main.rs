//! Omograph command-line classifier
//!
//! Reads a JSON classification request (contexts, stress-marked candidates
//! and optional occurrence sizes) from a file or stdin, picks one candidate
//! per homograph occurrence with the configured entailment model, and writes
//! the winners as JSON to stdout. Logs go to stderr.
//!
//! Usage:
//!   omograph --config omograph.yaml --input request.json
//!   echo '{"contexts": [...], "candidates": [...]}' | omograph --model-path ./model

mod config;
mod request;

use crate::request::{ClassifyRequest, ClassifyResponse};
use clap::Parser;
use omograph_classifier::{CandleBackend, HomographClassifier};
use omograph_core::{LoggingConfig, OmographConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "omograph", about = "Russian homograph stress disambiguation")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, env = "OMOGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// JSON request file. Reads stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Local model directory, overrides `model.path`.
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Pretty-print the JSON response.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => OmographConfig::default(),
    };
    if let Some(path) = cli.model_path {
        config.model.path = Some(path);
    }

    init_tracing(&config.logging);
    match &cli.config {
        Some(path) => info!(path = %path.display(), "Loaded configuration from file"),
        None => info!("No config file specified, using defaults"),
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    let request = read_request(cli.input.as_deref()).await?;

    let backend = Arc::new(
        CandleBackend::load(&config.model, config.classifier.max_length)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load model: {}", e))?,
    );
    let classifier = HomographClassifier::new(&config.classifier, backend.clone(), backend);

    let sizes = request.resolve_sizes(classifier.grouping());
    debug!(?sizes, candidates = request.candidates.len(), "Resolved occurrence sizes");

    // Inference is CPU/GPU bound; keep it off the async workers.
    let classification = tokio::task::spawn_blocking(move || {
        classifier
            .classify_detailed(&request.contexts, &request.candidates, &sizes)
            .map(|c| (c, classifier.stats()))
    })
    .await??;
    let (classification, stats) = classification;

    info!(
        path = %classification.path,
        winners = classification.winners.len(),
        inference_calls = stats.inference_calls,
        p50_ms = stats.latency.as_ref().map(|l| l.p50.as_secs_f64() * 1000.0),
        "Classification complete"
    );

    let response = ClassifyResponse::from(classification);
    println!("{}", response.to_json(cli.pretty)?);

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr so stdout
/// carries only the JSON response.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
}

/// Read the request from `path`, or from stdin when `None`.
async fn read_request(path: Option<&std::path::Path>) -> anyhow::Result<ClassifyRequest> {
    let text = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read input {}: {}", path.display(), e))?,
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            text
        }
    };
    ClassifyRequest::from_json(&text)
}
