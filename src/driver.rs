//! The two driver methods, `LocalSearch` and `MCTS`, modeled as a tagged
//! variant rather than a trait-object hierarchy to avoid deep inheritance.
//! Owns the one piece of I/O the core algorithms never touch: CSV emission
//! through [`CsvLog`].

use std::rc::Rc;

use crate::assignment::Assignment;
use crate::config::{Config, MethodKind};
use crate::context::SearchContext;
use crate::csv_log::CsvLog;
use crate::error::Result;
use crate::graph::Graph;
use crate::local_search::{LocalSearchKind, ProgressSink};
use crate::mcts;

/// One driver run: builds the context, seeds/searches, and streams CSV rows.
#[derive(Debug)]
pub enum Method {
    /// Initialize an assignment, run one local search once, emit a
    /// header+final CSV line.
    LocalSearch,
    /// Grow an MCTS tree until termination.
    Mcts,
}

impl Method {
    /// Builds the `Method` the resolved [`Config`] selected.
    pub fn from_config(config: &Config) -> Self {
        match config.method {
            MethodKind::LocalSearch => Method::LocalSearch,
            MethodKind::Mcts => Method::Mcts,
        }
    }

    /// Runs this method to completion (deadline, iteration budget, or a
    /// method's own stopping rule) and closes the CSV log. Builds its own
    /// [`SearchContext`]; callers that need to wire a signal handler to the
    /// deadline before the run starts (the binary entry point) should use
    /// [`Method::run_with_context`] instead.
    pub fn run(&self, graph: Rc<Graph>, config: &Config) -> Result<Assignment> {
        let ctx = SearchContext::new(graph.clone(), config.rand_seed, config.time_limit);
        self.run_with_context(graph, config, &ctx)
    }

    /// Same as [`Method::run`], but against a [`SearchContext`] the caller
    /// already built (so its [`crate::context::Deadline::stop_handle`] can be
    /// registered with a signal handler beforehand).
    pub fn run_with_context(&self, graph: Rc<Graph>, config: &Config, ctx: &SearchContext) -> Result<Assignment> {
        let mut assignment = Assignment::new(&graph);
        let method_name = match self {
            Method::LocalSearch => "local_search",
            Method::Mcts => "mcts",
        };
        let mut log = CsvLog::open(config, method_name)?;

        match self {
            Method::LocalSearch => self.run_local_search(&mut assignment, &graph, ctx, config, &mut log)?,
            Method::Mcts => self.run_mcts(&mut assignment, &graph, ctx, config, &mut log)?,
        }

        log.write_line(0, &assignment, None)?;
        log.finish()?;
        Ok(assignment)
    }

    fn run_local_search(
        &self,
        assignment: &mut Assignment,
        graph: &Graph,
        ctx: &SearchContext,
        config: &Config,
        log: &mut CsvLog,
    ) -> Result<()> {
        config.initialization.run(assignment, graph, ctx);
        ctx.best.try_improve_score(assignment.score());
        log.write_line(0, assignment, None)?;

        struct CsvSink<'a> {
            log: &'a mut CsvLog,
        }
        impl ProgressSink for CsvSink<'_> {
            fn on_improvement(&mut self, turn: u64, assignment: &Assignment, _graph: &Graph) {
                let _ = self.log.write_line(turn, assignment, None);
            }
        }
        let mut sink = CsvSink { log };

        if config.local_search != LocalSearchKind::None {
            config.local_search.run(
                assignment,
                graph,
                ctx,
                config.max_time_local_search,
                config.nb_iter_local_search,
                config.target,
                &mut sink,
            );
        }
        Ok(())
    }

    fn run_mcts(
        &self,
        assignment: &mut Assignment,
        graph: &Graph,
        ctx: &SearchContext,
        config: &Config,
        log: &mut CsvLog,
    ) -> Result<()> {
        let sub_deadline = ctx.deadline.sub_deadline(config.time_limit);
        let mut write_err: Option<crate::error::WvcpError> = None;
        mcts::run(
            assignment,
            graph,
            ctx,
            config.initialization,
            config.local_search,
            config.simulation,
            config.max_time_local_search,
            config.nb_iter_local_search,
            config.coeff_exploi_explo,
            config.nb_max_iterations,
            config.target,
            config.objective,
            sub_deadline,
            |turn, best, stats| {
                if let Err(e) = log.write_line(turn, best, Some(stats)) {
                    write_err.get_or_insert(e);
                }
            },
        );
        match write_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use std::time::Duration;
    use clap::Parser;

    fn k4() -> Graph {
        Graph::new("k4", vec![vec![1, 2, 3], vec![0, 2, 3], vec![0, 1, 3], vec![0, 1, 2]], vec![1, 1, 1, 1])
    }

    /// K3, weights (3, 2, 1), already in non-increasing (weight, degree) order.
    fn triangle() -> Graph {
        Graph::new("k3", vec![vec![1, 2], vec![0, 2], vec![0, 1]], vec![3, 2, 1])
    }

    /// a-b-c-d, weights (5, 4, 3, 2).
    fn path4() -> Graph {
        Graph::new("p4", vec![vec![1], vec![0, 2], vec![1, 3], vec![2]], vec![5, 4, 3, 2])
    }

    /// 4 isolated vertices, weights (3, 3, 3, 3).
    fn empty4() -> Graph {
        Graph::new("empty4", vec![vec![], vec![], vec![], vec![]], vec![3, 3, 3, 3])
    }

    fn c4() -> Graph {
        Graph::new("c4", vec![vec![1, 3], vec![0, 2], vec![1, 3], vec![0, 2]], vec![2, 2, 2, 2])
    }

    fn clone_graph(g: &Graph) -> Graph {
        let adj: Vec<Vec<usize>> = (0..g.n()).map(|v| g.neighbors(v).to_vec()).collect();
        let w: Vec<u32> = (0..g.n()).map(|v| g.weight(v)).collect();
        Graph::new(g.name(), adj, w)
    }

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["wvcp-mcts"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn local_search_none_reports_the_seeded_assignment() {
        let cli = Cli::parse_from([
            "wvcp-mcts",
            "--instance",
            "k4",
            "--method",
            "local_search",
            "--initialization",
            "deterministic",
        ]);
        let config = Config::from_cli(&cli, 4).unwrap();
        let method = Method::from_config(&config);
        let assignment = method.run(Rc::new(k4()), &config).unwrap();
        assert_eq!(assignment.penalty(), 0);
        assert!(assignment.check_solution(&k4()));
    }

    #[test]
    fn mcts_method_runs_to_completion_on_k4() {
        let cli = Cli::parse_from([
            "wvcp-mcts",
            "--instance",
            "k4",
            "--method",
            "mcts",
            "--objective",
            "optimality",
            "--nb_max_iterations",
            "5000",
        ]);
        let config = Config::from_cli(&cli, 4).unwrap();
        let method = Method::from_config(&config);
        let assignment = method.run(Rc::new(k4()), &config).unwrap();
        assert!(assignment.check_solution(&k4()));
    }

    /// Every local search on K3 (already optimal after seeding) must hold
    /// at the optimal score of 6 and report a legal coloring.
    #[test]
    fn triangle_all_local_searches_reach_optimal_score() {
        let g = triangle();
        for ls in ["hill_climbing", "tabu_weight", "tabu_col", "afisa", "afisa_original", "redls", "ilsts"] {
            let cli = parse(&[
                "--instance",
                "k3",
                "--method",
                "local_search",
                "--rand_seed",
                "1",
                "--time_limit",
                "5",
                "--local_search",
                ls,
            ]);
            let config = Config::from_cli(&cli, g.n()).unwrap();
            let method = Method::from_config(&config);
            let assignment = method.run(Rc::new(clone_graph(&g)), &config).unwrap();
            assert_eq!(assignment.score(), 6, "local search {ls} did not hold the optimum on K3");
            assert_eq!(assignment.penalty(), 0);
            assert!(assignment.check_solution(&g));
        }
    }

    /// Hill climbing from the worst initializer on P4 must reach the
    /// optimal partition {a,c},{b,d}, score 9.
    #[test]
    fn path4_hill_climbing_from_worst_reaches_nine() {
        let g = path4();
        let cli = parse(&[
            "--instance",
            "p4",
            "--method",
            "local_search",
            "--initialization",
            "worst",
            "--local_search",
            "hill_climbing",
            "--time_limit",
            "5",
        ]);
        let config = Config::from_cli(&cli, g.n()).unwrap();
        let method = Method::from_config(&config);
        let assignment = method.run(Rc::new(clone_graph(&g)), &config).unwrap();
        assert_eq!(assignment.score(), 9);
        assert_eq!(assignment.penalty(), 0);
    }

    /// GCP on K4, tabu_col with a 5-second sub-method budget and target 4,
    /// must reach a legal 4-coloring.
    #[test]
    fn gcp_k4_tabu_col_reaches_four_colors() {
        let g = k4();
        let cli = parse(&[
            "--instance",
            "k4",
            "--problem",
            "gcp",
            "--method",
            "local_search",
            "--local_search",
            "tabu_col",
            "--max_time_local_search",
            "5",
            "--target",
            "4",
            "--rand_seed",
            "1",
        ]);
        let config = Config::from_cli(&cli, g.n()).unwrap();
        let method = Method::from_config(&config);
        let assignment = method.run(Rc::new(clone_graph(&g)), &config).unwrap();
        assert_eq!(assignment.penalty(), 0);
        assert_eq!(assignment.n_used_colors(), 4);
    }

    /// On 4 isolated vertices of equal weight 3, every method must find the
    /// optimal score of 3 (a single color covers all of them) with no
    /// search iterations needed beyond the initial seeding.
    #[test]
    fn empty_graph_all_methods_reach_optimal_score() {
        let g = empty4();
        for (method_name, ls) in [
            ("local_search", "none"),
            ("local_search", "hill_climbing"),
            ("local_search", "tabu_weight"),
            ("mcts", "none"),
        ] {
            let cli = parse(&[
                "--instance",
                "empty4",
                "--method",
                method_name,
                "--local_search",
                ls,
                "--initialization",
                "deterministic",
                "--time_limit",
                "2",
                "--target",
                "3",
                "--nb_max_iterations",
                "1000",
            ]);
            let config = Config::from_cli(&cli, g.n()).unwrap();
            let method = Method::from_config(&config);
            let assignment = method.run(Rc::new(clone_graph(&g)), &config).unwrap();
            assert_eq!(assignment.score(), 3, "method {method_name}/{ls} did not reach the optimum on the empty graph");
            assert_eq!(assignment.penalty(), 0);
            assert!(assignment.check_solution(&g), "method {method_name}/{ls} left vertices uncolored");
        }
    }

    /// MCTS on C4 must grow a tree with a single root child (the first
    /// vertex has only one possible color) and run to completion under the
    /// `optimality` stop policy in a bounded number of turns.
    #[test]
    fn mcts_c4_runs_to_completion_under_optimality() {
        let g = c4();
        let cli = parse(&[
            "--instance",
            "c4",
            "--method",
            "mcts",
            "--objective",
            "optimality",
            "--nb_max_iterations",
            "10000",
            "--initialization",
            "deterministic",
        ]);
        let config = Config::from_cli(&cli, g.n()).unwrap();
        let method = Method::from_config(&config);
        let assignment = method.run(Rc::new(clone_graph(&g)), &config).unwrap();
        assert_eq!(assignment.penalty(), 0);
        assert!(assignment.check_solution(&g));
    }

    /// A deadline that expires mid-run (standing in for a delivered
    /// SIGINT/SIGTERM) must still produce a clean, legal result — no
    /// partial-mutation state, no panic.
    #[test]
    fn expired_deadline_still_produces_a_clean_result() {
        let g = path4();
        let cli = parse(&[
            "--instance",
            "p4",
            "--method",
            "local_search",
            "--local_search",
            "tabu_weight",
            "--time_limit",
            "60",
        ]);
        let config = Config::from_cli(&cli, g.n()).unwrap();
        let graph = Rc::new(clone_graph(&g));
        let ctx = SearchContext::new(graph.clone(), config.rand_seed, Duration::from_secs(60));
        ctx.deadline.expire_now();
        let method = Method::from_config(&config);
        let assignment = method.run_with_context(graph, &config, &ctx).unwrap();
        assert!(assignment.check_solution(&g));
    }
}
