use std::fs;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bg_swap_rs::{BackgroundProcessor, BackgroundSpec, Config, ProcessRequest};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = Config::parse();

    ensure!(config.model_path.exists(), "Model path does not exist");
    ensure!(config.input.exists(), "Input image does not exist");

    let image_bytes = fs::read(&config.input)
        .with_context(|| format!("Failed to read image: {}", config.input.display()))?;

    let background = match &config.background {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read background image: {}", path.display()))?;
            BackgroundSpec::from_image_bytes(&bytes)?
        }
        None => BackgroundSpec::from_hex(&config.color)?,
    };

    let processor = BackgroundProcessor::with_onnx_model(&config)?;
    let result = processor.process(&ProcessRequest {
        image_bytes: &image_bytes,
        background,
    })?;

    fs::write(&config.output, &result.png_bytes)
        .with_context(|| format!("Failed to save image: {}", config.output.display()))?;
    tracing::info!(
        "saved {}x{} result to {}",
        result.width,
        result.height,
        config.output.display()
    );

    Ok(())
}
