use clap::Parser;

use netgap::cli::{check, run, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run::execute(&args)?,
        Commands::Check(args) => check::execute_config(&args.config)?,
    }
    Ok(())
}
