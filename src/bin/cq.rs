//! cq - decode CodeQuilt notation into Python source

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::process::ExitCode;
#[cfg(feature = "cli")]
use std::time::Duration;

#[cfg(feature = "cli")]
use codequilt::{
    CliDiagnostic, DecodeOptions, Decoder, FormatterConfig, UnresolvedPolicy,
};

/// Extension of CodeQuilt documents
#[cfg(feature = "cli")]
const NOTATION_EXT: &str = "cq";

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "cq")]
#[command(version)]
#[command(about = "CodeQuilt - decode compact CodeQuilt notation into Python source", long_about = None)]
struct Cli {
    /// Input file (.cq)
    input: PathBuf,

    /// Output file path (defaults to the input path with a .py extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the decoded source to stdout instead of a file
    #[arg(long, conflicts_with = "output")]
    stdout: bool,

    /// Skip the external formatter pass
    #[arg(long)]
    no_format: bool,

    /// Formatter command (reads Python on stdin, writes it on stdout)
    #[arg(long)]
    formatter: Option<String>,

    /// Formatter timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Fail on unresolved references instead of emitting placeholders
    #[arg(long)]
    strict: bool,

    /// Write the decode warnings as JSON to this path
    #[arg(long)]
    diagnostics_json: Option<PathBuf>,

    /// Disable colored diagnostics
    #[arg(long)]
    no_color: bool,
}

#[cfg(feature = "cli")]
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::from(1)
        }
    }
}

#[cfg(feature = "cli")]
fn run(cli: &Cli) -> Result<(), String> {
    check_extension(&cli.input)?;
    if !cli.input.is_file() {
        return Err(format!("input file not found: {}", cli.input.display()));
    }
    let input = fs::read_to_string(&cli.input)
        .map_err(|e| format!("cannot read {}: {}", cli.input.display(), e))?;

    let mut options = DecodeOptions::new();
    if cli.strict {
        options = options.with_unresolved(UnresolvedPolicy::Fail);
    }
    if !cli.no_format {
        let mut formatter = FormatterConfig::from_env().with_timeout(Duration::from_secs(cli.timeout));
        if let Some(ref cmd) = cli.formatter {
            formatter = formatter.with_command(cmd.clone());
        }
        options = options.with_formatter(formatter);
    }

    let output = Decoder::new(options)
        .decode(&input)
        .map_err(|e| format!("{}: {}", cli.input.display(), e))?;

    let diagnostics: Vec<CliDiagnostic> = output.warnings.iter().cloned().map(Into::into).collect();
    let color = !cli.no_color;
    for diag in &diagnostics {
        print_diagnostic(diag, color);
    }

    if let Some(ref path) = cli.diagnostics_json {
        let json = serde_json::to_string_pretty(&diagnostics)
            .map_err(|e| format!("cannot serialize diagnostics: {}", e))?;
        fs::write(path, json).map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
    }

    if cli.stdout {
        print!("{}", output.content);
        return Ok(());
    }

    let out_path = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("py"));
    fs::write(&out_path, &output.content)
        .map_err(|e| format!("cannot write {}: {}", out_path.display(), e))?;
    log::info!("wrote {}", out_path.display());
    Ok(())
}

/// Only `.cq` documents are decoded; Python input would need the encoder
#[cfg(feature = "cli")]
fn check_extension(path: &Path) -> Result<(), String> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(NOTATION_EXT) => Ok(()),
        Some("py") => Err(format!(
            "{}: encoding Python into CodeQuilt is not supported",
            path.display()
        )),
        _ => Err(format!(
            "{}: expected a .{} file",
            path.display(),
            NOTATION_EXT
        )),
    }
}

#[cfg(feature = "cli")]
fn print_diagnostic(diag: &CliDiagnostic, color: bool) {
    if color {
        eprintln!("{}{}\x1b[0m", diag.color_code(), diag);
    } else {
        eprintln!("{}", diag);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  cargo install codequilt --features cli");
    eprintln!("  cq [OPTIONS] <INPUT>");
}
