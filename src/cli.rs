//! Command-line surface, implemented with `clap`'s derive API rather than a
//! YAML arg file: the flag set here is large and internally cross-validated
//! (`--max_time_local_search == -1` requires `--O_time`/`--P_time`), so a
//! typed derive struct is a better fit than a YAML subcommand file.
//! Enum-valued flags are plain `String`s here, parsed through each module's
//! own `FromStr` in [`crate::config`] so the same parsing code path serves
//! the CLI and any future config file.

use clap::Parser;

/// Parsed, not-yet-validated command line arguments.
///
/// `rename_all = "snake_case"` keeps every auto-derived long flag matching
/// its field name verbatim (`--time_limit`, `--rand_seed`, ...) instead of
/// clap's kebab-case default, since every flag here is named with
/// underscores. `O_time`/`P_time` additionally need an explicit
/// `long = "..."` override since they're capitalized (`--O_time`,
/// `--P_time`) while every other flag is all-lowercase.
#[derive(Debug, Parser)]
#[clap(
    name = "wvcp-mcts",
    author,
    version,
    about = "Weighted Vertex Coloring solver (local search + MCTS)",
    rename_all = "snake_case"
)]
pub struct Cli {
    /// `wvcp` (weighted) or `gcp` (unit weights)
    #[clap(long, default_value = "wvcp")]
    pub problem: String,

    /// instance name; resolves to `<instance>.col` and `<instance>.col.w`
    #[clap(long)]
    pub instance: String,

    /// `local_search` or `mcts`
    #[clap(long, default_value = "local_search")]
    pub method: String,

    /// wall-clock budget in seconds
    #[clap(long, default_value_t = 60.0)]
    pub time_limit: f64,

    /// seed for the single process-wide RNG stream
    #[clap(long, default_value_t = 1)]
    pub rand_seed: u64,

    /// stop early once this score (or, for `tabu_col`, this color count) is reached
    #[clap(long)]
    pub target: Option<i32>,

    /// MCTS turn budget
    #[clap(long, default_value_t = u64::MAX)]
    pub nb_max_iterations: u64,

    /// `random`, `constrained` or `deterministic`
    #[clap(long, default_value = "deterministic")]
    pub initialization: String,

    /// `none`, `hill_climbing`, `tabu_weight`, `tabu_col`, `afisa`, `afisa_original`, `redls` or `ilsts`
    #[clap(long, default_value = "none")]
    pub local_search: String,

    /// `greedy`, `fit`, `depth` or `depth_fit`; only meaningful with `--method mcts`
    #[clap(long)]
    pub simulation: Option<String>,

    /// `reached` (stop at target) or `optimality` (stop when the MCTS tree is
    /// fully explored)
    #[clap(long, default_value = "reached")]
    pub objective: String,

    /// UCB1 exploration weight `c`
    #[clap(long, default_value_t = 0.5)]
    pub coeff_exploi_explo: f64,

    /// seconds a local-search sub-method may run before yielding; `-1` to derive from `O_time`/`P_time`
    #[clap(long, default_value_t = -1.0)]
    pub max_time_local_search: f64,

    /// fixed offset (seconds) used when deriving `max_time_local_search`
    #[clap(long = "O_time", default_value_t = 1)]
    pub o_time: i64,

    /// per-vertex factor (seconds) used when deriving `max_time_local_search`
    #[clap(long = "P_time", default_value_t = 0.0)]
    pub p_time: f64,

    /// outer iteration budget passed to local searches with an inner turn counter
    #[clap(long, default_value_t = u64::MAX)]
    pub nb_iter_local_search: u64,

    /// destination CSV path; writes to `<path>.running` and renames on clean exit
    #[clap(long)]
    pub output_file: Option<String>,
}
