//! Handler for the `run` command.

use tracing::info;

use crate::application::gap::{ExactConfig, NoProgress, ProgressSink, SearchMethod};
use crate::cli::RunArgs;
use crate::error::Result;
use crate::infrastructure::config::logging::LogFormat;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::factory::encoder::build_engine;
use crate::infrastructure::factory::solver::build_solver;
use crate::infrastructure::persist::{load_demands, save_demands, ProgressLog};

/// Execute the run command.
pub fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;

    if let Some(method) = args.method {
        config.search.method = method;
    }
    if let Some(seed) = args.seed {
        config.search.seed = seed;
    }
    if let Some(trials) = args.trials {
        config.search.trials = trials;
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = LogFormat::Json;
    }
    config.logging.filter()?;

    config.init_logging();
    info!(
        method = config.search.method.name(),
        heuristic = ?config.encoder.heuristic,
        seed = config.search.seed,
        "netgap starting"
    );

    let mut engine = build_engine(&config)?;
    let mut solver = build_solver(&config.solver)?;

    if config.search.method == SearchMethod::Exact {
        let exact = ExactConfig {
            rewrite: config.search.rewrite,
            quantization: config.encoder.quantization_levels.clone(),
            dual_big_m: config.solver.dual_big_m,
            verbose: config.solver.verbose,
        };
        let result = engine.exact(solver.as_mut(), &exact)?;
        if let Some(path) = &config.search.demands_output {
            save_demands(path, &result.demands)?;
        }
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let initial = config
        .search
        .initial_demands
        .as_ref()
        .map(load_demands)
        .transpose()?;
    let search = config.search.search_config(initial)?;
    let mut sink: Box<dyn ProgressSink> = match &config.search.progress_log {
        Some(path) => Box::new(ProgressLog::open(path)?),
        None => Box::new(NoProgress),
    };

    let outcome = engine.search(config.search.method, solver.as_mut(), &search, sink.as_mut())?;
    if let (Some(path), Some(best)) = (&config.search.demands_output, &outcome.best) {
        save_demands(path, &best.demands)?;
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
