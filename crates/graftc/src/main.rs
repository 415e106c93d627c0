//! The graft preprocessor CLI.
//!
//! Provides the `graftc` command with the following subcommands:
//!
//! - `graftc build <input>` - Process one unit and write the generated host source
//! - `graftc check <input>` - Process one unit, report diagnostics, write nothing
//!
//! Options:
//! - `--output` - Output path for the generated file (`build` only)
//! - `--nil-safety` - Nil-scrutinee guarding in generated dispatch code (off, on, debug)
//! - `--json` - Output diagnostics as JSON (one object per line)
//! - `--no-color` - Disable colorized output

mod report;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use graft_codegen::compile_unit;
use graft_common::{NilSafety, Options};
use graft_infer::NullOracle;

use crate::report::ReportOptions;

#[derive(Parser)]
#[command(name = "graftc", version, about = "The graft preprocessor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a unit and write the generated host source
    Build {
        /// Path to the input unit (e.g. main.graft)
        input: PathBuf,

        /// Output path for the generated file (defaults to the input with a .go extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Nil-scrutinee guarding in generated dispatch code
        #[arg(long = "nil-safety", value_enum, default_value = "on")]
        nil_safety: NilSafetyArg,

        /// Output diagnostics as JSON (one object per line) instead of human-readable format
        #[arg(long)]
        json: bool,

        /// Disable colorized output
        #[arg(long = "no-color")]
        no_color: bool,
    },
    /// Process a unit and report diagnostics without writing output
    Check {
        /// Path to the input unit (e.g. main.graft)
        input: PathBuf,

        /// Nil-scrutinee guarding in generated dispatch code
        #[arg(long = "nil-safety", value_enum, default_value = "on")]
        nil_safety: NilSafetyArg,

        /// Output diagnostics as JSON (one object per line) instead of human-readable format
        #[arg(long)]
        json: bool,

        /// Disable colorized output
        #[arg(long = "no-color")]
        no_color: bool,
    },
}

/// CLI face of [`NilSafety`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NilSafetyArg {
    /// No check; a nil scrutinee faults on the tag read
    Off,
    /// Panic with a descriptive message before the tag is read
    On,
    /// Like `on`, but gated behind a runtime flag the host program can toggle
    Debug,
}

impl From<NilSafetyArg> for NilSafety {
    fn from(arg: NilSafetyArg) -> Self {
        match arg {
            NilSafetyArg::Off => NilSafety::Off,
            NilSafetyArg::On => NilSafety::On,
            NilSafetyArg::Debug => NilSafety::Debug,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let (input, output, write_output, nil_safety, json, no_color) = match cli.command {
        Commands::Build {
            input,
            output,
            nil_safety,
            json,
            no_color,
        } => (input, output, true, nil_safety, json, no_color),
        Commands::Check {
            input,
            nil_safety,
            json,
            no_color,
        } => (input, None, false, nil_safety, json, no_color),
    };

    let report_opts = ReportOptions {
        color: !no_color && !json,
        json,
    };
    let options = Options {
        nil_safety: nil_safety.into(),
        ..Options::default()
    };

    if let Err(e) = run(&input, output.as_deref(), write_output, options, &report_opts) {
        if json {
            // In JSON mode, emit the final error as JSON too.
            let msg = serde_json::json!({
                "code": "G0001",
                "severity": "error",
                "message": e,
                "file": "",
                "span": null,
            });
            eprintln!("{}", msg);
        } else {
            eprintln!("error: {}", e);
        }
        process::exit(1);
    }
}

/// Execute the pipeline: read -> extract constructs -> lower -> write output.
fn run(
    input: &Path,
    output: Option<&Path>,
    write_output: bool,
    options: Options,
    report_opts: &ReportOptions,
) -> Result<(), String> {
    if !input.exists() {
        return Err(format!("input file '{}' does not exist", input.display()));
    }

    let source = std::fs::read_to_string(input)
        .map_err(|e| format!("failed to read '{}': {}", input.display(), e))?;
    let file_name = input.display().to_string();

    let outcome = match compile_unit(&source, options, &NullOracle) {
        Ok(outcome) => outcome,
        Err(e) => {
            report::print_extract_error(&e, &source, &file_name, report_opts);
            return Err("extraction failed; no output written".to_string());
        }
    };

    let has_errors =
        report::print_diagnostics(&outcome.diagnostics, &source, &file_name, report_opts);
    if has_errors {
        return Err("processing failed due to errors above".to_string());
    }

    if !write_output {
        return Ok(());
    }

    // No errors means the pipeline produced output.
    let generated = outcome
        .output
        .ok_or_else(|| "no output produced".to_string())?;

    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => input.with_extension("go"),
    };
    std::fs::write(&output_path, generated)
        .map_err(|e| format!("failed to write '{}': {}", output_path.display(), e))?;

    eprintln!("  Emitted: {}", output_path.display());

    Ok(())
}
