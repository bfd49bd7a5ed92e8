//! Run the normalization pipeline

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use permitclean_core::clock::FixedClock;
use permitclean_core::table::DATETIME_FORMAT;
use permitclean_core::{Config, Pipeline, io};
use std::path::PathBuf;

/// Run the pipeline on one input file
pub fn run(config_path: &str, input: &str, output: Option<&str>, at: Option<&str>) -> Result<()> {
    tracing::info!("Loading configuration from {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;
    let output = output
        .map(PathBuf::from)
        .or_else(|| config.output_path())
        .context("No output path given and the project has no `output` setting")?;

    let mut pipeline = Pipeline::from_config(&config).context("Failed to load project files")?;
    if let Some(at) = at {
        let at = NaiveDateTime::parse_from_str(at, DATETIME_FORMAT)
            .with_context(|| format!("Invalid --at value '{}'", at))?;
        pipeline = pipeline.with_clock(FixedClock(at));
    }

    let df = io::read_csv(input, config.project.encoding)
        .with_context(|| format!("Failed to read input {}", input))?;
    let result = pipeline.run(df).context("Pipeline failed")?;

    io::write_csv(&result.frame, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if !result.validation.valid {
        tracing::warn!(
            "Input did not match the {} schema ({} error(s)); output written anyway",
            result.validation.vendor,
            result.validation.errors.len()
        );
    }
    tracing::info!(
        "✓ Wrote {} row(s) to {}",
        result.frame.height(),
        output.display()
    );
    Ok(())
}
