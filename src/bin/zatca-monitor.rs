//! # zatca-monitor
//!
//! Validates a single invoice file or a whole directory and prints a
//! compliance report.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zatca_compliance::core::{
    BatchResult, Instrumented, InvoiceValidator, ValidationResult, Validator, ValidatorConfig,
};
use zatca_compliance::parse::load_invoice;
use zatca_compliance::processing::{
    BatchProcessor, ChunkedProcessor, ConcurrentValidator, save_result,
};
use zatca_compliance::report::{csv_report, json_report, summary_report};

/// ZATCA e-invoice compliance monitor.
#[derive(Parser, Debug)]
#[command(name = "zatca-monitor", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a single invoice file (.xml or .json).
    File(FileArgs),
    /// Validate every matching invoice file in a directory.
    Directory(DirectoryArgs),
}

#[derive(Args, Debug)]
struct FileArgs {
    /// Invoice file to validate.
    path: PathBuf,
    /// Treat warnings as errors.
    #[arg(long)]
    strict: bool,
    /// Enable debug logging.
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct DirectoryArgs {
    /// Directory containing invoice files.
    #[arg(long, short)]
    input: PathBuf,
    /// Directory for summary, CSV and JSON reports.
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// File name pattern (`*` and `?` wildcards).
    #[arg(long, short, default_value = "*.xml")]
    pattern: String,
    /// Worker threads for concurrent mode (defaults to available cores).
    #[arg(long, short)]
    workers: Option<usize>,
    /// Validate on a worker pool instead of one by one.
    #[arg(long)]
    concurrent: bool,
    /// In concurrent mode, hold at most this many parsed invoices at once.
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Treat warnings as errors.
    #[arg(long)]
    strict: bool,
    /// Also write one JSON result per invoice under `<output>/invoices`.
    #[arg(long)]
    save_reports: bool,
    /// Enable debug logging.
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::File(args) => args.verbose,
        Commands::Directory(args) => args.verbose,
    };
    init_tracing(verbose);

    match cli.command {
        Commands::File(args) => run_file(&args),
        Commands::Directory(args) => run_directory(&args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn config(strict: bool) -> ValidatorConfig {
    if strict {
        ValidatorConfig::strict()
    } else {
        ValidatorConfig::default()
    }
}

fn run_file(args: &FileArgs) -> anyhow::Result<ExitCode> {
    let invoice = match load_invoice(&args.path) {
        Ok(invoice) => invoice,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let engine = Instrumented::new(Validator::new(config(args.strict)));
    let result = engine.validate(&invoice);
    print_result(&result);

    Ok(if result.is_compliant() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_result(result: &ValidationResult) {
    println!("Invoice: {}", result.invoice_number);
    println!(
        "Status:  {}",
        if result.is_compliant() {
            "COMPLIANT"
        } else {
            "NON-COMPLIANT"
        }
    );

    if !result.violations().is_empty() {
        println!();
        println!("Violations ({}):", result.violations().len());
        for v in result.violations() {
            println!("  [{}] {}", v.code, v.message);
            println!("    Field:    {}", v.field);
            println!("    Rule:     {}", v.rule);
            println!("    Severity: {}", v.severity);
        }
    }

    if let Some(ms) = result.processing_time_ms {
        println!();
        println!("Processing time: {ms:.2} ms");
    }
}

fn run_directory(args: &DirectoryArgs) -> anyhow::Result<ExitCode> {
    if !args.input.is_dir() {
        eprintln!("Error: input directory not found: {}", args.input.display());
        return Ok(ExitCode::FAILURE);
    }

    let per_invoice_dir = match (&args.output, args.save_reports) {
        (Some(out), true) => {
            let dir = out.join("invoices");
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            Some(dir)
        }
        _ => None,
    };
    let config = config(args.strict);

    let batch = if args.concurrent {
        let mut validator = ConcurrentValidator::new(config);
        if let Some(workers) = args.workers {
            validator = validator.workers(workers);
        }
        let save = |result: &ValidationResult| {
            if let Some(dir) = &per_invoice_dir {
                if let Err(e) = save_result(dir, result) {
                    tracing::error!(error = %e, "failed to write result");
                }
            }
        };
        match args.chunk_size {
            Some(size) => ChunkedProcessor::with_validator(validator)
                .chunk_size(size)
                .process_directory(&args.input, &args.pattern, save)?,
            None => validator.validate_directory(&args.input, &args.pattern, save)?,
        }
    } else {
        BatchProcessor::new(config).process_directory(
            &args.input,
            &args.pattern,
            per_invoice_dir.as_deref(),
        )?
    };

    let now = Local::now().naive_local();
    let summary = summary_report(&batch, now);
    println!("{summary}");

    if let Some(out) = &args.output {
        write_reports(out, &batch, &summary, &now.format("%Y%m%d_%H%M%S").to_string())?;
    }

    Ok(if batch.failed_count() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn write_reports(
    dir: &Path,
    batch: &BatchResult,
    summary: &str,
    stamp: &str,
) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let summary_path = dir.join(format!("summary_{stamp}.txt"));
    fs::write(&summary_path, summary)
        .with_context(|| format!("writing {}", summary_path.display()))?;

    let csv_path = dir.join(format!("results_{stamp}.csv"));
    fs::write(&csv_path, csv_report(batch.results()))
        .with_context(|| format!("writing {}", csv_path.display()))?;

    let json_path = dir.join(format!("results_{stamp}.json"));
    fs::write(&json_path, json_report(batch)?)
        .with_context(|| format!("writing {}", json_path.display()))?;

    tracing::info!(dir = %dir.display(), "reports written");
    Ok(())
}
