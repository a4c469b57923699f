//! Turns a parsed [`Cli`](crate::cli::Cli) into a validated, strongly-typed
//! [`Config`], resolving every enum flag through its module's `FromStr` and
//! computing `max_time_local_search` when `-1` requests the `O_time`/`P_time`
//! formula. Resolves the CLI once into a single struct threaded through the
//! rest of the program rather than re-reading `ArgMatches` everywhere.

use std::time::Duration;

use crate::cli::Cli;
use crate::error::{Result, WvcpError};
use crate::initializers::Initialization;
use crate::local_search::LocalSearchKind;
use crate::mcts::{SimulationPolicy, StopPolicy};

/// Which [`crate::driver::Method`] to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Initialize once, run one local search once.
    LocalSearch,
    /// Grow an MCTS tree.
    Mcts,
}

impl std::str::FromStr for MethodKind {
    type Err = WvcpError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "local_search" => Ok(MethodKind::LocalSearch),
            "mcts" => Ok(MethodKind::Mcts),
            other => Err(WvcpError::UnknownEnumValue { flag: "method".to_string(), value: other.to_string() }),
        }
    }
}

/// Validated run configuration: every flag of [`Cli`] resolved to its typed
/// form, with `max_time_local_search` already computed.
#[derive(Debug, Clone)]
pub struct Config {
    /// echoed verbatim into the CSV run-parameters columns
    pub problem: String,
    /// instance file stem (without `.col`/`.col.w`)
    pub instance: String,
    pub(crate) method: MethodKind,
    /// global wall-clock deadline
    pub time_limit: Duration,
    pub rand_seed: u64,
    pub target: Option<i32>,
    pub nb_max_iterations: u64,
    pub initialization: Initialization,
    pub local_search: LocalSearchKind,
    pub simulation: Option<SimulationPolicy>,
    pub objective: StopPolicy,
    pub coeff_exploi_explo: f64,
    /// `-1` derives `O + ⌈P·n⌉` seconds, floored at 1
    pub max_time_local_search: Duration,
    pub nb_iter_local_search: u64,
    pub output_file: Option<String>,
}

impl Config {
    /// Validates `cli` against an instance of `n` vertices (needed only to
    /// resolve `-1`-valued `max_time_local_search`).
    pub fn from_cli(cli: &Cli, n: usize) -> Result<Self> {
        if cli.problem != "wvcp" && cli.problem != "gcp" {
            return Err(WvcpError::UnknownEnumValue { flag: "problem".to_string(), value: cli.problem.clone() });
        }
        let method: MethodKind = cli.method.parse()?;
        let initialization: Initialization = cli.initialization.parse()?;
        let local_search: LocalSearchKind = cli.local_search.parse()?;
        let simulation = cli.simulation.as_deref().map(str::parse).transpose()?;
        let objective: StopPolicy = cli.objective.parse()?;

        let max_time_local_search = if cli.max_time_local_search < 0.0 {
            let derived = cli.o_time as f64 + (cli.p_time * n as f64).ceil();
            Duration::from_secs_f64(derived.max(1.0))
        } else {
            Duration::from_secs_f64(cli.max_time_local_search.max(0.0))
        };

        Ok(Self {
            problem: cli.problem.clone(),
            instance: cli.instance.clone(),
            method,
            time_limit: Duration::from_secs_f64(cli.time_limit.max(0.0)),
            rand_seed: cli.rand_seed,
            target: cli.target,
            nb_max_iterations: cli.nb_max_iterations,
            initialization,
            local_search,
            simulation,
            objective,
            coeff_exploi_explo: cli.coeff_exploi_explo,
            max_time_local_search,
            nb_iter_local_search: cli.nb_iter_local_search,
            output_file: cli.output_file.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["wvcp-mcts"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn derives_max_time_local_search_from_o_and_p() {
        let cli = parse(&["--instance", "foo", "--max_time_local_search", "-1", "--O_time", "2", "--P_time", "0.1"]);
        let config = Config::from_cli(&cli, 100).unwrap();
        assert_eq!(config.max_time_local_search, Duration::from_secs_f64(2.0 + 10.0));
    }

    #[test]
    fn rejects_unknown_problem() {
        let cli = parse(&["--instance", "foo", "--problem", "nope"]);
        assert!(Config::from_cli(&cli, 10).is_err());
    }

    #[test]
    fn accepts_well_formed_defaults() {
        let cli = parse(&["--instance", "foo"]);
        let config = Config::from_cli(&cli, 10).unwrap();
        assert_eq!(config.local_search, LocalSearchKind::None);
        assert_eq!(config.method, MethodKind::LocalSearch);
    }
}
