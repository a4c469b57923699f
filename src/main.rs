//! Binary entry point: parses the CLI, loads the instance, resolves the run
//! [`Config`], wires a signal handler to the deadline, and runs the selected
//! [`Method`].
//!
//! This is the only file that calls `std::process::exit`: every internal
//! fallible path returns a [`Result`] so the core stays free of process
//! control — bad input fails fast with a diagnostic and a non-zero exit.

#![warn(missing_debug_implementations)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unsafe_code)]
#![warn(unused_extern_crates)]
#![warn(variant_size_differences)]

use std::rc::Rc;

use clap::Parser;

use wvcp_mcts::cli::Cli;
use wvcp_mcts::config::Config;
use wvcp_mcts::context::SearchContext;
use wvcp_mcts::dimacs;
use wvcp_mcts::driver::Method;
use wvcp_mcts::error::WvcpError;

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<(), WvcpError> {
    let wvcp = match cli.problem.as_str() {
        "wvcp" => true,
        "gcp" => false,
        other => return Err(WvcpError::UnknownEnumValue { flag: "problem".to_string(), value: other.to_string() }),
    };

    let col_path = format!("{}.col", cli.instance);
    let weight_path = format!("{}.col.w", cli.instance);
    let graph = Rc::new(dimacs::load_instance(&col_path, &weight_path, wvcp)?);
    log::info!("loaded {} ({} vertices, {} edges)", graph.name(), graph.n(), graph.m());

    let config = Config::from_cli(cli, graph.n())?;
    let ctx = SearchContext::new(graph.clone(), config.rand_seed, config.time_limit);

    // The only observable signal-based behavior is "stop soon, finish the
    // current outer turn cleanly, emit final line" — the handler only ever
    // sets the stop flag, never touches search state.
    let stop_handle = ctx.deadline.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        stop_handle.store(true, std::sync::atomic::Ordering::SeqCst);
    }) {
        log::warn!("failed to install signal handler: {e}");
    }

    let method = Method::from_config(&config);
    let assignment = method.run_with_context(graph.clone(), &config, &ctx)?;
    log::info!(
        "finished: {} colors, score {}, penalty {}",
        assignment.n_used_colors(),
        assignment.score(),
        assignment.penalty()
    );
    Ok(())
}
