//! dtree CLI - Command Line Operations for Decision Tree Models
//!
//! This is the operational entry point for the decision tree library.
//!
//! # Commands
//!
//! - `dtree eval --model <file>` - Roll back a model and print the optimal strategy
//! - `dtree nodes --model <file>` - Dump the expanded tree as JSON
//! - `dtree risk-profile --model <file>` - Outcome distributions under the optimal strategy
//! - `dtree sensitivity <sweep> --model <file>` - Probability, value, or risk sweeps
//!
//! Models are JSON files; see the `model` module for the schema.

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dtree_core::utility::UtilityFn;
use dtree_engine::View;

mod commands;
mod error;
mod model;

pub use error::{CliError, Result};

use commands::sensitivity::Sweep;

/// Decision tree analysis CLI
#[derive(Parser)]
#[command(name = "dtree")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll back a model and print the root value and optimal strategy
    Eval {
        /// Path to the JSON model file
        #[arg(short, long)]
        model: String,

        /// Value reported for the root (ev, eu, ce)
        #[arg(long, default_value = "ev")]
        view: String,

        /// Utility transform (exp, log); omit for risk-neutral rollback
        #[arg(short, long)]
        utility: Option<String>,

        /// Risk tolerance for the utility transform
        #[arg(short, long, default_value = "1000.0")]
        risk_tolerance: f64,
    },

    /// Dump the expanded tree as a JSON node listing
    Nodes {
        /// Path to the JSON model file
        #[arg(short, long)]
        model: String,

        /// Roll back first so EVs and path probabilities are populated
        #[arg(long)]
        rollback: bool,
    },

    /// Outcome distributions under the optimal strategy
    RiskProfile {
        /// Path to the JSON model file
        #[arg(short, long)]
        model: String,

        /// Node index to profile
        #[arg(short, long, default_value = "0")]
        node: usize,

        /// Emit cumulative probabilities instead of masses
        #[arg(short, long)]
        cumulative: bool,

        /// One curve for the node itself instead of one per branch
        #[arg(short, long)]
        single: bool,
    },

    /// Sensitivity sweeps
    Sensitivity {
        /// Path to the JSON model file
        #[arg(short, long)]
        model: String,

        #[command(subcommand)]
        sweep: SweepCommand,
    },
}

#[derive(Subcommand)]
enum SweepCommand {
    /// Trade probability mass between the extreme branches of a chance variable
    Probability {
        /// Swept chance variable
        #[arg(short, long)]
        variable: String,
    },

    /// Sweep one branch's outcome value over a range
    Value {
        /// Variable owning the swept branch
        #[arg(short, long)]
        variable: String,

        /// Branch name within the variable
        #[arg(short, long)]
        branch: String,

        /// Lower bound of the swept value
        #[arg(long)]
        min: f64,

        /// Upper bound of the swept value
        #[arg(long)]
        max: f64,

        /// Number of samples
        #[arg(short, long, default_value = "11")]
        points: usize,
    },

    /// Sweep risk aversion from neutral to 1/risk_tolerance
    Risk {
        /// Utility transform (exp, log)
        #[arg(short, long, default_value = "exp")]
        utility: String,

        /// Base risk tolerance
        #[arg(short, long)]
        risk_tolerance: f64,
    },
}

fn parse_view(view: &str) -> Result<View> {
    match view {
        "ev" => Ok(View::Ev),
        "eu" => Ok(View::Eu),
        "ce" => Ok(View::Ce),
        other => Err(CliError::InvalidArgument(format!(
            "Unknown view: {}. Supported: ev, eu, ce",
            other
        ))),
    }
}

fn parse_utility(utility: &str) -> Result<UtilityFn> {
    match utility {
        "exp" => Ok(UtilityFn::Exponential),
        "log" => Ok(UtilityFn::Logarithmic),
        other => Err(CliError::InvalidArgument(format!(
            "Unknown utility: {}. Supported: exp, log",
            other
        ))),
    }
}

fn main() -> Result<()> {
    // Initialise tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Eval {
            model,
            view,
            utility,
            risk_tolerance,
        } => {
            let view = parse_view(&view)?;
            let utility = utility.as_deref().map(parse_utility).transpose()?;
            commands::eval::run(&model, view, utility, risk_tolerance)
        }
        Commands::Nodes { model, rollback } => commands::nodes::run(&model, rollback),
        Commands::RiskProfile {
            model,
            node,
            cumulative,
            single,
        } => commands::risk::run(&model, node, cumulative, single),
        Commands::Sensitivity { model, sweep } => {
            let sweep = match sweep {
                SweepCommand::Probability { variable } => Sweep::Probability { variable },
                SweepCommand::Value {
                    variable,
                    branch,
                    min,
                    max,
                    points,
                } => Sweep::Value {
                    variable,
                    branch,
                    min,
                    max,
                    points,
                },
                SweepCommand::Risk {
                    utility,
                    risk_tolerance,
                } => Sweep::Risk {
                    utility: parse_utility(&utility)?,
                    risk_tolerance,
                },
            };
            commands::sensitivity::run(&model, sweep)
        }
    }
}
