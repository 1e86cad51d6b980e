//! `tabclean inspect`

use crate::error::{AppResult, ErrorCode, PipelineError, Stage, StageExt};
use crate::loader::{load_path, LoadOptions};
use crate::report::{describe, render_schema, render_text};
use std::path::Path;

/// Load a file and print its schema and a per-column summary
pub fn run_inspect_command(input: &Path, delimiter: char) -> AppResult<()> {
    let delimiter = u8::try_from(delimiter).map_err(|_| {
        PipelineError::invalid_rule(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("delimiter {:?} is not a single-byte character", delimiter),
        )
    })?;
    let options = LoadOptions::default().with_delimiter(delimiter);
    let table = load_path(input, &options).in_stage(Stage::Load)?;

    println!(
        "{}: {} rows, {} columns\n",
        input.display(),
        table.len(),
        table.schema().len()
    );
    print!("{}", render_schema(&table));
    println!();
    print!("{}", render_text(&describe(&table)?, None));
    Ok(())
}
