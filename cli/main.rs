#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::process;

use gerryfair::config::{AuditConfig, AuditorKind, FairnessDefinition};
use gerryfair::data::DatasetKind;
use gerryfair::play::{AuditOutcome, FictitiousPlay};

#[derive(Clone, Copy, ValueEnum)]
pub enum DatasetCli {
    Communities,
    Prepared,
}

impl From<DatasetCli> for DatasetKind {
    fn from(value: DatasetCli) -> Self {
        match value {
            DatasetCli::Communities => DatasetKind::Communities,
            DatasetCli::Prepared => DatasetKind::Prepared,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FairnessCli {
    AlphaBeta,
    Gamma,
}

impl From<FairnessCli> for FairnessDefinition {
    fn from(value: FairnessCli) -> Self {
        match value {
            FairnessCli::AlphaBeta => FairnessDefinition::AlphaBeta,
            FairnessCli::Gamma => FairnessDefinition::Gamma,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AuditorCli {
    Random,
    Regression,
}

impl From<AuditorCli> for AuditorKind {
    fn from(value: AuditorCli) -> Self {
        match value {
            AuditorCli::Random => AuditorKind::Random,
            AuditorCli::Regression => AuditorKind::Regression,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to the comma-separated dataset
    pub data: String,

    /// How the file is prepared into features, sensitive features and labels
    #[arg(long, value_enum)]
    pub dataset: DatasetCli,

    /// Optional TOML file with run parameters; flags below override it
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Dual-variable scale B
    #[arg(long)]
    pub budget: Option<f64>,

    /// Number of sensitive columns exposed to the auditor
    #[arg(long, value_name = "N")]
    pub num_sensitive: Option<usize>,

    /// Formulation used to decide when a group is within tolerance
    #[arg(long, value_enum)]
    pub fairness: Option<FairnessCli>,

    /// Slack tolerance
    #[arg(long)]
    pub beta: Option<f64>,

    /// Number of fictitious-play rounds
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Seed for the auditor's random draws
    #[arg(long)]
    pub seed: Option<u64>,

    /// Strategy the auditor uses to propose groups
    #[arg(long, value_enum)]
    pub auditor: Option<AuditorCli>,

    /// Stop as soon as the discovered group is within tolerance
    #[arg(long)]
    pub early_stop: bool,
}

#[derive(Parser)]
#[command(
    name = "gerryfair",
    about = "Learn a classifier that is fair across rich subgroups via fictitious play",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the fictitious-play learner on a dataset
    #[command(about = "Run fictitious play and report the mixture's error and disparity")]
    Run(RunArgs),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Run(args)) => run(args),
        None => {
            if let Err(e) = Cli::command().print_help() {
                eprintln!("Error: {e}");
            }
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Merges the optional TOML file with the command-line overrides.
fn resolve_config(args: &RunArgs) -> Result<AuditConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => AuditConfig::load(path)?,
        None => AuditConfig::default(),
    };

    if let Some(budget) = args.budget {
        config.budget = budget;
    }
    if let Some(num_sensitive) = args.num_sensitive {
        config.num_sensitive = num_sensitive;
    }
    if let Some(fairness) = args.fairness {
        config.fairness = fairness.into();
    }
    if let Some(beta) = args.beta {
        config.beta = beta;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(auditor) = args.auditor {
        config.auditor = auditor.into();
    }
    if args.early_stop {
        config.early_stop = true;
    }

    config.validate()?;
    Ok(config)
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&args)?;
    let kind = DatasetKind::from(args.dataset);
    let data = kind.load(&args.data, config.num_sensitive)?;

    let game = FictitiousPlay::new(&data, config)?;
    let (baseline_error, baseline_fp) = game.baseline()?;
    log::info!(
        "Unconstrained baseline: error {:.6}, false-positive rate {:.6}",
        baseline_error,
        baseline_fp
    );

    let outcome = game.run()?;
    print_summary(&outcome);
    Ok(())
}

fn print_summary(outcome: &AuditOutcome) {
    let Some(last) = outcome.history.last() else {
        println!("No rounds were played.");
        return;
    };

    println!("Rounds played: {}", outcome.history.len());
    println!("Mixture size: {}", outcome.classifiers.len());
    println!("Final error: {:.6}", last.error);
    println!(
        "Final false-positive rate: {:.6}",
        outcome.final_false_positive_rate
    );
    println!(
        "Final FP disparity: {:.6} (weighted {:.6})",
        last.disparity,
        last.disparity * last.group_mass_0
    );
    println!(
        "Rows covered by some discovered group: {}",
        last.cumulative_group_members
    );
}
