use agents::{LlmClient, OperationMode, Pipeline, PipelineConfig};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Fast,
    Balanced,
    Accurate,
}

impl From<Mode> for OperationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Fast => OperationMode::Fast,
            Mode::Balanced => OperationMode::Balanced,
            Mode::Accurate => OperationMode::Accurate,
        }
    }
}

/// Generate a React component from a natural-language request.
#[derive(Debug, Parser)]
#[command(name = "run_pipeline", version)]
struct Args {
    /// What the component should be
    prompt: String,

    /// Where to write the generated component
    #[arg(short, long, default_value = "Component.jsx")]
    output: PathBuf,

    /// Overrides PIPELINE__MODE
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = PipelineConfig::load(args.mode.map(Into::into))?;
    info!(mode = ?config.mode, model = %config.generator.model, "Configuration loaded");

    let client = LlmClient::from_config(&config.generator)?;
    let pipeline = Pipeline::new(client, &config);

    let output = match pipeline.run(&args.prompt).await {
        Ok(output) => output,
        Err(e) => {
            error!(error = ?e, "Generation failed");
            eprintln!("Generation failed");
            std::process::exit(1);
        }
    };

    tokio::fs::write(&args.output, &output.component_code)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let summary = json!({
        "requestId": output.request_id,
        "output": args.output.display().to_string(),
        "utilization": output.utilization,
        "review": output.review,
        "stages": output.stages,
        "metrics": output.metrics,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
