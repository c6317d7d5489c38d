use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "faisc",
    about = "Fungal-acne safety scoring and classification of cosmetic ingredient lists",
    version
)]
pub struct Cli {
    /// Config file [default: ./.faisc/config.toml, fallback ~/.config/faisc/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging and extra detail in reports
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print summary lines
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score, classify and explain an ingredient list
    Analyze(AnalyzeArgs),
    /// Train the classifier from a labeled CSV corpus
    Train(TrainArgs),
    /// Show which words drove the classifier's decision
    Explain(ExplainArgs),
    /// Summarize the analysis history log
    Stats(StatsArgs),
    /// List the classification labels
    Labels,
}

/// Where the ingredient text comes from: an argument, `--file`, or stdin.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Ingredient list text (reads stdin when neither this nor --file is given)
    #[arg(conflicts_with = "file")]
    pub text: Option<String>,

    /// Read the ingredient list from a file
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Show the full probability table and word attributions
    #[arg(long)]
    pub expert: bool,

    /// Skip the classifier; report the keyword score only
    #[arg(long, conflicts_with = "expert")]
    pub no_model: bool,

    /// Append the result to the history log
    #[arg(long)]
    pub log: bool,

    /// Exit with code 1 when the safety score is below this value
    #[arg(long, value_name = "SCORE", value_parser = clap::value_parser!(u8).range(0..=10))]
    pub fail_below: Option<u8>,

    /// Model artifact path (overrides config)
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Labeled CSV corpus (overrides config)
    #[arg(long, value_name = "FILE")]
    pub corpus: Option<PathBuf>,

    /// Where to write the model artifact (overrides config)
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Random seed for the train/test split (overrides config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,
}

#[derive(Args, Debug)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Number of most probable labels to explain
    #[arg(long)]
    pub top_labels: Option<usize>,

    /// Words reported per label
    #[arg(long)]
    pub num_features: Option<usize>,

    /// Perturbed samples to draw
    #[arg(long)]
    pub num_samples: Option<usize>,

    /// Random seed for perturbation sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Model artifact path (overrides config)
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// History log path (overrides config)
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_flags() {
        let cli = Cli::parse_from([
            "faisc",
            "analyze",
            "Aqua, Glycerin",
            "--report",
            "json",
            "--log",
            "--fail-below",
            "7",
        ]);
        match cli.command {
            Command::Analyze(args) => {
                assert_eq!(args.input.text.as_deref(), Some("Aqua, Glycerin"));
                assert_eq!(args.report, ReportFormat::Json);
                assert!(args.log);
                assert_eq!(args.fail_below, Some(7));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_fail_below_out_of_range() {
        assert!(Cli::try_parse_from(["faisc", "analyze", "x", "--fail-below", "11"]).is_err());
    }

    #[test]
    fn test_text_and_file_conflict() {
        assert!(Cli::try_parse_from(["faisc", "explain", "x", "--file", "list.txt"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["faisc", "labels", "-q"]);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Labels));
    }
}
