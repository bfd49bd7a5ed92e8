//! Validate configuration command

use anyhow::{Context, Result};
use permitclean_core::{Config, Pipeline, io};

/// Run the validate command
///
/// Loads every file the project names. With `input`, the file is also checked
/// against the vendor schema and a mismatch fails the command regardless of
/// the configured severity.
pub fn run(config_path: &str, input: Option<&str>) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;
    let pipeline = Pipeline::from_config(&config).context("Failed to load project files")?;

    tracing::info!("✓ Project: {}", config.project.name);
    tracing::info!("✓ Vendor: {}", config.project.vendor);
    tracing::info!("✓ Cleanse rules: {}", pipeline.cleanse_rules().len());

    let Some(input) = input else {
        tracing::info!("✓ Configuration is valid");
        return Ok(());
    };

    let df = io::read_csv(input, config.project.encoding)
        .with_context(|| format!("Failed to read input {}", input))?;
    let report = pipeline
        .validate(&df)
        .context("Failed to serialize input for validation")?;
    if !report.valid {
        anyhow::bail!(
            "{} does not match the {} schema ({} error(s))",
            input,
            report.vendor,
            report.errors.len()
        );
    }

    tracing::info!("✓ {} matches the {} schema", input, report.vendor);
    Ok(())
}
