//! Command-line interface definitions.

pub mod check;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::application::gap::SearchMethod;

/// Netgap - adversarial gap search between network allocation policies.
#[derive(Parser, Debug)]
#[command(name = "netgap")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the configured gap search
    Run(RunArgs),

    /// Validate configuration file
    Check(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "netgap.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "netgap.toml")]
    pub config: PathBuf,

    /// Override search method (exact, random, hill_climbing, simulated_annealing)
    #[arg(long, value_parser = parse_method)]
    pub method: Option<SearchMethod>,

    /// Override random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override number of trials
    #[arg(long)]
    pub trials: Option<usize>,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}

fn parse_method(raw: &str) -> Result<SearchMethod, String> {
    match raw {
        "exact" => Ok(SearchMethod::Exact),
        "random" => Ok(SearchMethod::Random),
        "hill_climbing" => Ok(SearchMethod::HillClimbing),
        "simulated_annealing" => Ok(SearchMethod::SimulatedAnnealing),
        other => Err(format!("unknown search method `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_arguments_parse() {
        let cli = Cli::try_parse_from([
            "netgap", "run", "--config", "x.toml", "--method", "hill_climbing", "--seed", "4",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.method, Some(SearchMethod::HillClimbing));
        assert_eq!(args.seed, Some(4));
        assert_eq!(args.config, PathBuf::from("x.toml"));
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert!(Cli::try_parse_from(["netgap", "run", "--method", "greedy"]).is_err());
    }
}
