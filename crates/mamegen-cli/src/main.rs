mod logging;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use mamegen_core::{DslError, OutputFormat, Specification};
use mamegen_dsl::parse_spec;
use mamegen_generate::{
    GenerateOptions, GenerationEngine, GenerationError, resolve_encoding, write_rows,
};
use thiserror::Error;
use tracing::{info, info_span};
use uuid::Uuid;

const EXIT_INVALID: u8 = 2;
const EXIT_IO: u8 = 3;

#[derive(Debug, Error)]
enum CliError {
    #[error("spec file not found: {}", path.display())]
    SpecNotFound { path: PathBuf },
    #[error("failed to read spec file: {} ({source})", path.display())]
    ReadSpec { path: PathBuf, source: io::Error },
    #[error("{0}")]
    Dsl(#[from] DslError),
    #[error("unknown encoding in CONFIG: {0}")]
    UnknownEncoding(String),
    #[error("generation failed: {0}")]
    Generation(GenerationError),
    #[error("failed to write output: {} ({source})", path.display())]
    WriteOutput {
        path: PathBuf,
        source: GenerationError,
    },
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::SpecNotFound { .. }
            | CliError::ReadSpec { .. }
            | CliError::WriteOutput { .. } => EXIT_IO,
            CliError::Dsl(_) | CliError::UnknownEncoding(_) | CliError::Generation(_) => {
                EXIT_INVALID
            }
            CliError::Logging(_) => 1,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "mamegen",
    version,
    about = "Generate mock data from a .mame DSL spec",
    after_help = "Examples:\n  mamegen spec.mame out.csv\n  mamegen spec.mame out.json"
)]
struct Cli {
    /// Path to the .mame DSL file.
    #[arg(value_name = "SPEC")]
    spec: PathBuf,

    /// Output path; a `.json` extension selects JSON output.
    #[arg(value_name = "OUT")]
    out: PathBuf,

    /// Output format, overriding the extension and CONFIG.type.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Number of rows, overriding CONFIG.count.
    #[arg(long)]
    count: Option<u64>,

    /// Seed for a repeatable run, overriding CONFIG.reproducible.
    #[arg(long)]
    seed: Option<u64>,

    /// Also write the assembled specification as JSON.
    #[arg(long, value_name = "PATH")]
    dump_spec: Option<PathBuf>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = logging::init_logging(cli.verbose, cli.log_json)
        .map_err(CliError::Logging)
        .and_then(|()| run(cli));
    match outcome {
        Ok(out) => {
            println!("OK -> {}", out.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<PathBuf, CliError> {
    let run_id = Uuid::new_v4();
    let span = info_span!("run", run_id = %run_id);
    let _guard = span.enter();
    let timer = Instant::now();

    let spec = load_spec(&cli.spec)?;
    info!(
        spec = %cli.spec.display(),
        columns = spec.columns.len(),
        rows = spec.row_count,
        "spec parsed"
    );

    if let Some(path) = &cli.dump_spec {
        dump_spec(&spec, path)?;
        info!(path = %path.display(), "spec dumped");
    }

    let mut options = spec.writer_options();
    options.format = resolve_format(cli.format, &cli.out, options.format);
    resolve_encoding(&options.encoding)
        .map_err(|_| CliError::UnknownEncoding(options.encoding.clone()))?;

    let engine = GenerationEngine::new(GenerateOptions {
        seed: cli.seed,
        row_count: cli.count,
        now: None,
    });
    let result = engine.run(&spec).map_err(CliError::Generation)?;
    info!(
        seed = result.report.seed,
        rows = result.report.rows,
        nulls = result.report.null_count,
        "rows generated"
    );

    let bytes = write_rows(&cli.out, &spec.header, &result.rows, &options).map_err(|err| {
        match err {
            err @ GenerationError::Io(_) => CliError::WriteOutput {
                path: cli.out.clone(),
                source: err,
            },
            other => CliError::Generation(other),
        }
    })?;
    info!(
        bytes,
        duration_ms = timer.elapsed().as_millis() as u64,
        "run finished"
    );
    Ok(cli.out)
}

fn load_spec(path: &Path) -> Result<Specification, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            CliError::SpecNotFound {
                path: path.to_path_buf(),
            }
        } else {
            CliError::ReadSpec {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    Ok(parse_spec(&text)?)
}

fn dump_spec(spec: &Specification, path: &Path) -> Result<(), CliError> {
    let write_error = |source: GenerationError| CliError::WriteOutput {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_vec_pretty(spec).map_err(|err| write_error(err.into()))?;
    std::fs::write(path, json).map_err(|err| write_error(err.into()))
}

/// `--format` first, then a `.json` output extension, then CONFIG.type.
fn resolve_format(flag: Option<FormatArg>, out: &Path, configured: OutputFormat) -> OutputFormat {
    if let Some(flag) = flag {
        return flag.into();
    }
    let is_json = out
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        OutputFormat::Json
    } else {
        configured
    }
}
