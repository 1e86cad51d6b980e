//! `tabclean validate`

use crate::config::PipelineConfig;
use crate::error::AppResult;
use std::path::Path;

/// Parse and structurally check a pipeline file
pub fn run_validate_command(path: &Path) -> AppResult<()> {
    let config = PipelineConfig::load(path)?;
    config.validate()?;

    println!(
        "{} is valid: {} clean rules, {} derivations, {} aggregations, {} charts, {} models",
        path.display(),
        config.clean.len(),
        config.derive.len(),
        config.aggregate.len(),
        config.charts.len(),
        config.models.len()
    );
    Ok(())
}
