use std::path::PathBuf;

use anyhow::Result;
use tracing::info_span;

use survey_cli::pipeline::{RunResult, prepare, resolve_config, run_analysis};

use crate::cli::{InputArgs, RunArgs};
use crate::summary::{print_fields, print_inspection, print_run_summary};

pub fn run_fields() -> Result<()> {
    print_fields();
    Ok(())
}

pub fn run_inspect(args: &InputArgs) -> Result<()> {
    let span = info_span!("inspect", data_dir = %args.data_dir.display());
    let _guard = span.enter();
    let config = resolve_config(&args.data_dir, args.config.as_deref(), args.weight.as_deref())?;
    let run = prepare(&args.data_dir, &config)?;
    print_inspection(&run);
    Ok(())
}

pub fn run_run(args: &RunArgs) -> Result<RunResult> {
    let input = &args.input;
    let config = resolve_config(&input.data_dir, input.config.as_deref(), input.weight.as_deref())?;
    let output_dir: PathBuf = args
        .output_dir
        .clone()
        .unwrap_or_else(|| input.data_dir.join("output"));
    let result = run_analysis(&input.data_dir, &output_dir, &config, args.dry_run)?;
    print_run_summary(&result);
    Ok(result)
}
