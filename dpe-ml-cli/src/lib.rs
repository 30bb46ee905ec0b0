use std::path::PathBuf;

use anyhow::Context;
use dpe_ml::pipeline::PipelineConfig;

/// Log to stderr, filtered by `RUST_LOG` (default: info for dpe crates).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dpe_ml=info,dpe_ml_pipeline=info,dpe_ml_model_selection=info,dpe_ml_ensemble=info,dpe_ml_io=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// The working directory and the configuration found there.
pub fn invocation() -> anyhow::Result<(PathBuf, PipelineConfig)> {
    let root = std::env::current_dir().context("cannot resolve the working directory")?;
    let config = PipelineConfig::load(&root)?;
    Ok((root, config))
}
