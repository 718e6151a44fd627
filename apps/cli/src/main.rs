// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! step-g: converts the advanced B-rep representations of a STEP AP203
//! file into JSON boundary representations, one file per representation.
//!
//! Exit status: 0 when at least one solid was written, 1 when none of the
//! representations converted, 2 when the file has no representations and
//! 3 when the file could not be read.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use step_brep_import::config::MIN_TRIM_SAMPLES;
use step_brep_import::{ConversionSummary, Factory, ImportConfig, RootStatus, StepWrapper};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

mod writer;

use writer::{default_output_dir, JsonWriter};

/// Exit status for a file that could not be loaded
const EXIT_LOAD_FAILED: u8 = 3;

#[derive(Parser)]
#[command(name = "step-g")]
#[command(version, about = "Convert STEP AP203 solids to boundary representations", long_about = None)]
struct Cli {
    /// Input STEP file (.stp or .step)
    input: PathBuf,

    /// Output directory (default: <input stem>_breps next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// More log output; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log as JSON lines
    #[arg(long)]
    json_log: bool,

    /// Pretty-print the written JSON
    #[arg(long)]
    pretty: bool,

    /// Convert representations one after another
    #[arg(long)]
    sequential: bool,

    /// Write solids without running the validator
    #[arg(long)]
    no_validate: bool,

    /// Convert files whose schema is not a known AP203 schema
    #[arg(long)]
    lenient_schema: bool,

    /// Model tolerance in millimetres
    #[arg(long)]
    tolerance: Option<f64>,

    /// Samples per edge when computing parameter space trims
    #[arg(long)]
    trim_samples: Option<usize>,

    /// Print the wrapper tree of instance #ID instead of converting
    #[arg(long, value_name = "ID")]
    dump: Option<u32>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: step_brep_import::Error,
    },

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

impl Cli {
    fn config(&self) -> Result<ImportConfig, CliError> {
        let mut config = ImportConfig::from_env();
        if let Some(tolerance) = self.tolerance {
            if !ImportConfig::is_valid_tolerance(tolerance) {
                return Err(CliError::InvalidOption(format!(
                    "tolerance must be positive, got {}",
                    tolerance
                )));
            }
            config.tolerance = tolerance;
        }
        if let Some(samples) = self.trim_samples {
            if samples < MIN_TRIM_SAMPLES {
                return Err(CliError::InvalidOption(format!(
                    "trim samples must be at least 2, got {}",
                    samples
                )));
            }
            config.trim_samples = samples;
        }
        if self.sequential {
            config.parallel = false;
        }
        if self.no_validate {
            config.validate = false;
        }
        if self.lenient_schema {
            config.strict_schema = false;
        }
        Ok(config)
    }
}

fn init_logging(verbose: u8, json: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_summary(input: &Path, summary: &ConversionSummary) {
    for root in &summary.roots {
        match &root.status {
            RootStatus::Written { stats, warnings } => eprintln!(
                "#{} {}: {} faces, {} edges, {} vertices{}",
                root.id,
                root.name,
                stats.faces,
                stats.edges,
                stats.vertices,
                if *warnings > 0 {
                    format!(" ({} warnings)", warnings)
                } else {
                    String::new()
                }
            ),
            RootStatus::Invalid { errors } => {
                eprintln!("#{} {}: invalid B-rep, not written", root.id, root.name);
                for error in errors {
                    eprintln!("    {}", error);
                }
            }
            RootStatus::Failed { entity, message } => match entity {
                Some((name, id)) => {
                    eprintln!("#{} {}: failed at {} #{}: {}", root.id, root.name, name, id, message)
                }
                None => eprintln!("#{} {}: failed: {}", root.id, root.name, message),
            },
            RootStatus::SinkError { message } => {
                eprintln!("#{} {}: could not be written: {}", root.id, root.name, message)
            }
        }
    }
    eprintln!(
        "{}: {} of {} representations written",
        input.display(),
        summary.written(),
        summary.roots.len()
    );
}

fn run(cli: &Cli) -> Result<u8, CliError> {
    let config = cli.config()?;
    let wrapper = StepWrapper::load(&cli.input, config).map_err(|source| CliError::Load {
        path: cli.input.clone(),
        source,
    })?;

    if let Some(id) = cli.dump {
        let mut factory = Factory::new();
        return match factory.create_object(wrapper.file(), id) {
            Ok(key) => {
                print!("{}", factory.dump(key));
                Ok(0)
            }
            Err(e) => {
                eprintln!("#{}: {}", id, e);
                Ok(1)
            }
        };
    }

    let dir = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_dir(&cli.input));
    let mut sink = JsonWriter::new(dir, cli.pretty);
    let summary = wrapper.convert(&mut sink);
    print_summary(&cli.input, &summary);
    Ok(summary.exit_code() as u8)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_log);

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e @ CliError::InvalidOption(_)) => {
            eprintln!("step-g: {}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("step-g: {}", e);
            ExitCode::from(EXIT_LOAD_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "step-g",
            "part.stp",
            "--sequential",
            "--no-validate",
            "--lenient-schema",
            "--tolerance",
            "0.01",
            "--trim-samples",
            "8",
        ]);
        let config = cli.config().unwrap();
        assert!(!config.parallel);
        assert!(!config.validate);
        assert!(!config.strict_schema);
        assert_eq!(config.tolerance, 0.01);
        assert_eq!(config.trim_samples, 8);
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        let cli = Cli::parse_from(["step-g", "part.stp", "--tolerance", "0"]);
        assert!(matches!(cli.config(), Err(CliError::InvalidOption(_))));
    }

    #[test]
    fn test_missing_file_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from(["step-g", dir.path().join("missing.stp").to_str().unwrap()]);
        assert!(matches!(run(&cli), Err(CliError::Load { .. })));
    }

    const POINT_ONLY: &str = "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));\nENDSEC;\nDATA;\n#1=CARTESIAN_POINT('origin',(0.,0.,0.));\nENDSEC;\nEND-ISO-10303-21;\n";

    fn point_file(dir: &Path) -> String {
        let path = dir.join("point.stp");
        std::fs::write(&path, POINT_ONLY).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_file_without_solids_exits_with_two() {
        let dir = tempfile::tempdir().unwrap();
        let input = point_file(dir.path());
        let out = dir.path().join("out");
        let cli = Cli::parse_from(["step-g", &input, "-o", out.to_str().unwrap()]);
        assert_eq!(run(&cli).unwrap(), 2);
        assert!(!out.exists());
    }

    #[test]
    fn test_dump_instance() {
        let dir = tempfile::tempdir().unwrap();
        let input = point_file(dir.path());
        let found = Cli::parse_from(["step-g", &input, "--dump", "1"]);
        assert_eq!(run(&found).unwrap(), 0);
        let missing = Cli::parse_from(["step-g", &input, "--dump", "7"]);
        assert_eq!(run(&missing).unwrap(), 1);
    }
}
