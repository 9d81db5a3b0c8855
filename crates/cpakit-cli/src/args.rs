use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use cpakit_core::model::{Distribution, ModelKind};

#[derive(Parser, Debug)]
#[command(
    name = "cpakit",
    about = "Fit per-table models over a relational dataset with conditional parameter aggregation",
    version,
    after_help = "Examples:\n  cpakit model --metadata data/metadata.json --output report.json\n  cpakit model                             # metadata from cpakit.toml or CPAKIT_METADATA\n  cpakit extend customers --output customers_extended.csv\n  cpakit inspect --metadata data/metadata.json\n  cpakit graph --format mermaid"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Model every table and write a parameter report
    Model(ModelArgs),

    /// Model one table and its descendants, and print its extended table
    Extend(ExtendArgs),

    /// Display tables, keys and relations from the metadata
    Inspect(InspectArgs),

    /// Visualize the parent/child table tree
    Graph(GraphArgs),
}

/// Where the metadata and table files come from.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Metadata JSON document
    /// Falls back to CPAKIT_METADATA env var, .env file or cpakit.toml
    #[arg(long, env = "CPAKIT_METADATA")]
    pub metadata: Option<PathBuf>,

    /// Directory holding the table files (default: the metadata's directory)
    #[arg(long)]
    pub data: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ModelOptions {
    /// Model fitted to every table and every group of child rows
    #[arg(long)]
    pub model: Option<ModelKindArg>,

    /// Marginal distribution fitted to every column
    #[arg(long)]
    pub distribution: Option<DistributionArg>,
}

#[derive(Parser, Debug)]
pub struct ModelArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub options: ModelOptions,

    /// Report file path (default: cpakit-report.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ExtendArgs {
    /// Table to extend
    pub table: String,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub options: ModelOptions,

    /// CSV output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: InspectFormat,

    /// Also summarize a saved report and check it against the metadata
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format for the table tree
    #[arg(long, default_value = "mermaid")]
    pub format: GraphFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModelKindArg {
    GaussianCopula,
    Independent,
}

impl From<ModelKindArg> for ModelKind {
    fn from(arg: ModelKindArg) -> Self {
        match arg {
            ModelKindArg::GaussianCopula => ModelKind::GaussianCopula,
            ModelKindArg::Independent => ModelKind::Independent,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DistributionArg {
    Gaussian,
    Uniform,
}

impl From<DistributionArg> for Distribution {
    fn from(arg: DistributionArg) -> Self {
        match arg {
            DistributionArg::Gaussian => Distribution::Gaussian,
            DistributionArg::Uniform => Distribution::Uniform,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum InspectFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_command() {
        let cli = Cli::parse_from([
            "cpakit",
            "model",
            "--metadata",
            "meta.json",
            "--model",
            "independent",
            "--distribution",
            "uniform",
            "-o",
            "out.json",
        ]);
        match cli.command {
            Command::Model(args) => {
                assert_eq!(args.source.metadata, Some(PathBuf::from("meta.json")));
                assert!(matches!(args.options.model, Some(ModelKindArg::Independent)));
                assert!(matches!(
                    args.options.distribution,
                    Some(DistributionArg::Uniform)
                ));
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_extend_with_global_verbose() {
        let cli = Cli::parse_from(["cpakit", "extend", "customers", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Extend(ref a) if a.table == "customers"));
    }

    #[test]
    fn test_model_kind_values() {
        let cli = Cli::parse_from(["cpakit", "model", "--model", "gaussian-copula"]);
        let Command::Model(args) = cli.command else {
            panic!("expected model command");
        };
        assert_eq!(
            args.options.model.map(ModelKind::from),
            Some(ModelKind::GaussianCopula)
        );
    }
}
