//! `tabclean run`

use crate::app::AppConfig;
use crate::collab::{ChartRenderer, ModelFrame, VegaLiteRenderer};
use crate::config::{presets, PipelineConfig};
use crate::error::{AppResult, ErrorCode, PipelineError, Result, Stage, StageExt};
use crate::pipeline::PipelineOutput;
use crate::report::{export, render_text, write_csv, write_json, ExportFormat};
use crate::table::Table;
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rows of each aggregate printed to the terminal
const PREVIEW_ROWS: usize = 20;

/// Arguments of the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub reference_date: Option<NaiveDate>,
}

/// Run the configured pipeline, print the aggregates and write any outputs
pub fn run_pipeline_command(options: RunOptions, app: &AppConfig) -> AppResult<()> {
    let mut config = match &options.config {
        Some(path) => PipelineConfig::load(path)?,
        None => {
            let input = options.input.clone().ok_or_else(|| {
                PipelineError::invalid_rule(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    "no input file: pass --input or a --config naming input.path",
                )
            })?;
            info!("No configuration given, using the employee pipeline");
            presets::employee_pipeline(input)
        }
    };
    if let Some(input) = options.input {
        config.input.path = Some(input);
    }
    config.validate()?;

    let input = config.input.path.clone().ok_or_else(|| {
        PipelineError::invalid_rule(
            ErrorCode::CONFIG_INVALID_VALUE,
            "no input file: pass --input or set input.path in the configuration",
        )
    })?;
    let reference = options
        .reference_date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let pipeline = config.to_pipeline()?;
    let output = pipeline.run_path(&input, &config.input.load_options()?, reference)?;

    print_summary(&input, &output);
    print_aggregates(&output, app.format)?;
    print_models(&config, &output)?;

    if let Some(dir) = &app.output_dir {
        write_outputs(&config, &output, dir, app.format)?;
    }
    Ok(())
}

fn print_summary(input: &Path, output: &PipelineOutput) {
    println!(
        "{}: {} rows loaded, {} kept after cleaning, {} columns after derivation",
        input.display(),
        output.raw.len(),
        output.cleaned.len(),
        output.derived.schema().len()
    );
}

fn print_aggregates(output: &PipelineOutput, format: ExportFormat) -> AppResult<()> {
    for (name, table) in &output.aggregates {
        match format {
            ExportFormat::Text => {
                println!("\n== {} ==", name);
                print!("{}", render_text(table, Some(PREVIEW_ROWS)));
            }
            ExportFormat::Csv => {
                println!("\n# {}", name);
                write_csv(table, io::stdout().lock())?;
            }
            ExportFormat::Json => {
                println!("\n# {}", name);
                write_json(table, io::stdout().lock())?;
            }
        }
    }
    Ok(())
}

fn print_models(config: &PipelineConfig, output: &PipelineOutput) -> AppResult<()> {
    if config.models.is_empty() {
        return Ok(());
    }
    println!("\n== models ==");
    for spec in &config.models {
        let frame = ModelFrame::from_table(&output.derived, spec).in_stage(Stage::Export)?;
        println!(
            "{}: {} ({} rows, {} dropped)",
            spec.name,
            spec,
            frame.table.len(),
            frame.dropped
        );
    }
    Ok(())
}

fn write_outputs(
    config: &PipelineConfig,
    output: &PipelineOutput,
    dir: &Path,
    format: ExportFormat,
) -> AppResult<()> {
    fs::create_dir_all(dir)
        .map_err(|e| {
            PipelineError::io_with_code(
                ErrorCode::EXPORT_FAILED,
                "cannot create output directory",
                Some(dir.to_path_buf()),
            )
            .with_source(e)
        })
        .in_stage(Stage::Export)?;

    let file_format = match format {
        ExportFormat::Text => ExportFormat::Csv,
        other => other,
    };
    for (name, table) in &output.aggregates {
        if let Some(path) = export(table, dir, name, file_format).in_stage(Stage::Export)? {
            debug!("Wrote aggregate '{}' to {}", name, path.display());
        }
    }

    let renderer = VegaLiteRenderer;
    for chart in &config.charts {
        let table = chart_source(chart.table.as_deref(), output).in_stage(Stage::Export)?;
        let path = dir.join(format!("{}.{}", chart.name, renderer.extension()));
        renderer
            .render(chart, table, &path)
            .in_stage(Stage::Export)?;
    }

    if config.charts.is_empty() && output.aggregates.is_empty() {
        warn!("Nothing to write to {}", dir.display());
    } else {
        info!(
            "Wrote {} tables and {} charts to {}",
            output.aggregates.len(),
            config.charts.len(),
            dir.display()
        );
    }
    Ok(())
}

/// The table a chart reads: a named aggregate or the derived table
fn chart_source<'a>(
    name: Option<&str>,
    output: &'a PipelineOutput,
) -> Result<&'a Table> {
    match name {
        Some(name) => output.aggregate(name).ok_or_else(|| {
            PipelineError::invalid_rule(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("chart reads unknown aggregate '{}'", name),
            )
        }),
        None => Ok(&output.derived),
    }
}
