//! `faisc` — score, classify and explain cosmetic ingredient lists.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and initialise logging.
//! 2. Load config ([`config::load_config`]) and build the keyword table.
//! 3. Load the model artifact once, when the command needs it.
//! 4. Run the command through the [`Analyzer`] or the training pipeline.
//! 5. Render the requested report ([`report`]) or JSON.
//! 6. Exit `0`, or `1` when `--fail-below` is violated or a fatal error occurs.

mod cli;

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{AnalyzeArgs, Cli, Command, ExplainArgs, InputArgs, ReportFormat, StatsArgs, TrainArgs};
use faisc::analyzer::{AnalysisReport, Analyzer};
use faisc::attribution::AttributionResult;
use faisc::config::{load_config, Config};
use faisc::error::FaiscError;
use faisc::history::{self, HistoryRecord};
use faisc::ingredients::normalize::decode_input;
use faisc::model::corpus::load_corpus;
use faisc::model::train::train;
use faisc::model::ModelHandle;
use faisc::report;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = load_config(&base_dir, cli.config.as_deref())?;

    match &cli.command {
        Command::Analyze(args) => run_analyze(&cli, &config, args),
        Command::Train(args) => run_train(&cli, &config, args),
        Command::Explain(args) => run_explain(&cli, &config, args),
        Command::Stats(args) => run_stats(&cli, &config, args),
        Command::Labels => report::terminal::render_labels(),
    }
}

/// Structured logs go to stderr so stdout stays clean for JSON.
/// `RUST_LOG` overrides the level chosen by `--verbose` / `--quiet`.
fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "faisc=debug"
    } else if quiet {
        "faisc=error"
    } else {
        "faisc=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    #[serde(flatten)]
    report: &'a AnalysisReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    attribution: Option<&'a [AttributionResult]>,
}

fn run_analyze(cli: &Cli, config: &Config, args: &AnalyzeArgs) -> Result<()> {
    let text = read_input(&args.input)?;
    let mut analyzer = Analyzer::new(config.keyword_table()?);

    let report = if args.no_model {
        analyzer.assess(&text)
    } else {
        let model_path = args.model.as_deref().unwrap_or(&config.paths.model);
        analyzer = analyzer.with_model(load_model(model_path, cli.quiet)?);
        analyzer.analyze(&text)?
    };

    let attributions = if args.expert {
        Some(analyzer.attribute(&text, &config.attribution)?)
    } else {
        None
    };

    if args.log {
        let label = report.classification.as_ref().map(|c| c.label);
        history::append(
            &config.paths.history,
            &HistoryRecord::now(text.as_str(), label, report.score.value),
        )?;
    }

    match args.report {
        ReportFormat::Terminal => {
            report::terminal::render_analysis(&report, attributions.as_deref(), cli.verbose, cli.quiet)?;
        }
        ReportFormat::Json => {
            let output = AnalyzeOutput {
                report: &report,
                attribution: attributions.as_deref(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    if let Some(threshold) = args.fail_below {
        if report.score.value < threshold {
            if !cli.quiet {
                eprintln!(
                    " {} score {} is below the required {}",
                    "✗".red(),
                    report.score.value,
                    threshold
                );
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

fn run_train(cli: &Cli, config: &Config, args: &TrainArgs) -> Result<()> {
    let corpus_path = args.corpus.as_deref().unwrap_or(&config.paths.corpus);
    let output_path = args.output.as_deref().unwrap_or(&config.paths.model);
    let mut params = config.training.clone();
    if let Some(seed) = args.seed {
        params.seed = seed;
    }

    let corpus = load_corpus(corpus_path)?;
    if !cli.quiet {
        eprintln!(
            "  {} {} labeled rows from {}",
            "→".cyan(),
            corpus.len(),
            corpus_path.display()
        );
    }

    let pb = if !cli.quiet {
        let pb = ProgressBar::new(params.max_iter as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        pb.set_message("optimizing");
        Some(pb)
    } else {
        None
    };

    let outcome = train(&corpus, &params, |iteration| {
        if let Some(pb) = &pb {
            pb.set_position(iteration as u64);
        }
    })?;

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    outcome.model.save(output_path)?;

    match args.report {
        ReportFormat::Terminal => {
            report::terminal::render_training(&outcome, output_path, cli.quiet)?;
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome.evaluation)?);
        }
    }

    Ok(())
}

fn run_explain(cli: &Cli, config: &Config, args: &ExplainArgs) -> Result<()> {
    let text = read_input(&args.input)?;
    let model_path = args.model.as_deref().unwrap_or(&config.paths.model);
    let analyzer = Analyzer::new(config.keyword_table()?).with_model(load_model(model_path, cli.quiet)?);

    let mut params = config.attribution.clone();
    if let Some(n) = args.top_labels {
        params.top_labels = n;
    }
    if let Some(n) = args.num_features {
        params.num_features = n;
    }
    if let Some(n) = args.num_samples {
        params.num_samples = n;
    }
    if let Some(seed) = args.seed {
        params.seed = seed;
    }

    let results = analyzer.attribute(&text, &params)?;

    match args.report {
        ReportFormat::Terminal => report::terminal::render_attribution(&results, cli.quiet)?,
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
    }

    Ok(())
}

fn run_stats(cli: &Cli, config: &Config, args: &StatsArgs) -> Result<()> {
    let log_path = args.history.as_deref().unwrap_or(&config.paths.history);
    let records = history::load(log_path)
        .with_context(|| format!("reading history log {}", log_path.display()))?;
    let summary = history::summarize(&records, &config.keyword_table()?);

    match args.report {
        ReportFormat::Terminal => report::terminal::render_stats(&summary, log_path, cli.quiet)?,
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}

/// Load and validate the artifact. Any failure here ends the run.
fn load_model(path: &Path, quiet: bool) -> Result<Arc<ModelHandle>> {
    let handle = ModelHandle::load(path)?;
    if !quiet {
        eprintln!("  {} model loaded from {}", "→".cyan(), path.display());
    }
    Ok(Arc::new(handle))
}

/// Ingredient text from the positional argument, `--file`, or piped stdin.
/// Bytes that are not valid UTF-8 degrade to an empty list.
fn read_input(input: &InputArgs) -> Result<String> {
    if let Some(text) = &input.text {
        return Ok(text.clone());
    }

    let bytes = if let Some(path) = &input.file {
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
    } else {
        let stdin = std::io::stdin();
        if stdin.is_terminal() {
            return Err(FaiscError::Input(
                "no ingredient list given; pass it as an argument, with --file, or on stdin".into(),
            )
            .into());
        }
        let mut buf = Vec::new();
        stdin.lock().read_to_end(&mut buf)?;
        buf
    };

    Ok(decode_input(&bytes).into_owned())
}
