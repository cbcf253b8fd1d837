//! pdfbench - benchmark PDF text-extraction engines against a shared corpus
//!
//! Usage:
//!   pdfbench run --input-dir papers --output-root outputs
//!   pdfbench summarize --input-dir outputs
//!   pdfbench engines

mod progress_bar;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use pdfbench_core::extract::Extractor;
use pdfbench_core::{
    resolve_config, run_benchmark, summarize, BenchmarkPass, BenchmarkRequest, Config, Engine,
    RecordStatus, SimilarityStrategy, SummaryOutcome, SummaryRequest,
};
use progress_bar::Reporter;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "pdfbench")]
#[command(about = "Benchmark PDF text-extraction engines: coverage, consensus and table structure")]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Config file (default: ./pdfbench.toml, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every engine over a corpus directory and score the pass
    Run {
        /// Directory containing the PDF files
        #[arg(long, value_name = "DIR")]
        input_dir: PathBuf,

        /// Root directory for exports and reports
        #[arg(long, value_name = "DIR")]
        output_root: PathBuf,

        /// Engine to run (repeatable; default: all configured engines)
        #[arg(short, long = "engine", value_name = "NAME")]
        engines: Vec<String>,

        /// Run name recorded in every row (default: input directory name)
        #[arg(long, value_name = "NAME")]
        run_context: Option<String>,

        /// Similarity strategy for consensus (token-jaccard, edit-ratio)
        #[arg(long, value_name = "STRATEGY", value_parser = parse_similarity)]
        similarity: Option<SimilarityStrategy>,
    },

    /// Merge exports from earlier runs and recompute all scores
    Summarize {
        /// Directory to search for exports
        #[arg(long, value_name = "DIR")]
        input_dir: PathBuf,

        /// Where to write the combined report (default: <input-dir>/summary)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Similarity strategy for consensus (token-jaccard, edit-ratio)
        #[arg(long, value_name = "STRATEGY", value_parser = parse_similarity)]
        similarity: Option<SimilarityStrategy>,
    },

    /// List configured engines and whether they can run here
    Engines,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_similarity(value: &str) -> std::result::Result<SimilarityStrategy, String> {
    SimilarityStrategy::from_str(value)
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::WARN,
        (false, 1) => LevelFilter::INFO,
        (false, _) => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run {
            input_dir,
            output_root,
            engines,
            run_context,
            similarity,
        } => {
            let config = load(cli.config.as_ref())?;
            cmd_run(
                &config,
                input_dir,
                output_root,
                &engines,
                run_context,
                similarity,
                cli.quiet,
            )
        }
        Commands::Summarize {
            input_dir,
            output_dir,
            similarity,
        } => {
            let config = load(cli.config.as_ref())?;
            cmd_summarize(&config, input_dir, output_dir, similarity, cli.quiet)
        }
        Commands::Engines => {
            let config = load(cli.config.as_ref())?;
            cmd_engines(&config)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "pdfbench", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn load(path: Option<&PathBuf>) -> Result<Config> {
    resolve_config(path.map(PathBuf::as_path)).context("Failed to load configuration")
}

fn cmd_run(
    config: &Config,
    input_dir: PathBuf,
    output_root: PathBuf,
    engine_names: &[String],
    run_context: Option<String>,
    similarity: Option<SimilarityStrategy>,
    quiet: bool,
) -> Result<()> {
    let engines = Engine::select(config, engine_names).context("Invalid --engine selection")?;
    let request = BenchmarkRequest {
        input_dir,
        output_root,
        run_context,
        summary_dir: config.summary_dir().to_string(),
        similarity: config.similarity(similarity),
    };

    let reporter = Reporter::for_stderr(quiet);
    let result = run_benchmark(&request, &engines, reporter.as_progress());
    reporter.finish();
    let pass = result.with_context(|| {
        format!("Benchmark failed for {}", request.input_dir.display())
    })?;

    if !quiet {
        print_pass(&pass, request.similarity.strategy());
    }
    Ok(())
}

fn print_pass(pass: &BenchmarkPass, strategy: SimilarityStrategy) {
    println!("{}", "Benchmark complete!".green().bold());
    println!(
        "  Run:        {}\n  Documents:  {}\n  Similarity: {}",
        pass.run_context.cyan(),
        pass.document_count(),
        strategy
    );
    println!();
    println!(
        "{:<20} {:>4} {:>6} {:>8} {:>10} {:>10}",
        "Engine".bold(),
        "ok".bold(),
        "error".bold(),
        "skipped".bold(),
        "coverage".bold(),
        "consensus".bold()
    );
    println!("{}", "─".repeat(63).dimmed());
    for export in &pass.exports {
        let rows: Vec<_> = pass
            .records
            .iter()
            .filter(|r| r.raw().extractor_id == export.extractor_id)
            .collect();
        let count = |status: RecordStatus| rows.iter().filter(|r| r.raw().status == status).count();
        let ok: Vec<_> = rows.iter().filter(|r| r.raw().status.is_ok()).collect();
        let (coverage, consensus) = if ok.is_empty() {
            (0.0, 0.0)
        } else {
            let n = ok.len() as f64;
            (
                ok.iter().map(|r| r.coverage_pct()).sum::<f64>() / n,
                ok.iter().map(|r| r.consensus_pct()).sum::<f64>() / n,
            )
        };
        let errors = count(RecordStatus::Error);
        let skipped = count(RecordStatus::Skipped);
        println!(
            "{:<20} {:>4} {:>6} {:>8} {:>9.1}% {:>9.1}%",
            export.extractor_id,
            count(RecordStatus::Ok).to_string().green(),
            if errors > 0 {
                errors.to_string().red()
            } else {
                errors.to_string().normal()
            },
            if skipped > 0 {
                skipped.to_string().yellow()
            } else {
                skipped.to_string().normal()
            },
            coverage,
            consensus
        );
    }
    println!();
    println!("  Report: {}", pass.pass_reports.csv.display());
    println!("          {}", pass.pass_reports.markdown.display());
}

fn cmd_summarize(
    config: &Config,
    input_dir: PathBuf,
    output_dir: Option<PathBuf>,
    similarity: Option<SimilarityStrategy>,
    quiet: bool,
) -> Result<()> {
    let request = SummaryRequest {
        input_dir,
        output_dir,
        summary_dir: config.summary_dir().to_string(),
        similarity: config.similarity(similarity),
    };

    let reporter = Reporter::for_stderr(quiet);
    let result = summarize(&request, reporter.as_progress());
    reporter.finish();
    let outcome = result.with_context(|| {
        format!("Summary failed for {}", request.input_dir.display())
    })?;

    if !quiet {
        print_summary(&outcome);
    }
    Ok(())
}

fn print_summary(outcome: &SummaryOutcome) {
    println!("{}", "Summary complete!".green().bold());
    println!("  Exports: {}", outcome.exports.len());
    for export in &outcome.exports {
        let origin = if export.from_manifest {
            "manifest".green()
        } else {
            "path".yellow()
        };
        println!(
            "    {} {} ({}) {}",
            export.extractor_id.cyan(),
            export.run_context,
            origin,
            export.dir.display().to_string().dimmed()
        );
    }
    println!("  Rows:    {}", outcome.rows.len());
    println!("  Report:  {}", outcome.reports.csv.display());
    println!("           {}", outcome.reports.markdown.display());
}

fn cmd_engines(config: &Config) -> Result<()> {
    let engines = Engine::all(config).context("Invalid engine configuration")?;
    println!("{}", "Extraction Engines".cyan().bold());
    println!("{}", "═".repeat(50).dimmed());
    for engine in engines {
        let kind = match &engine {
            Engine::PdfExtract(_) | Engine::Lopdf(_) => "built-in".to_string(),
            Engine::Command(command) => format!("command: {}", command.program()),
        };
        let status = if engine.is_available() {
            "available".green()
        } else {
            "not available".red()
        };
        println!("  {:<20} {:<13} {}", engine.id().white().bold(), status, kind.dimmed());
    }
    Ok(())
}
