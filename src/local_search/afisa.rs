//! AFISA, in its two tabu-storage variants. Both share the same two-phase
//! outer loop (a tabu descent, then a perturbation phase with a randomly
//! chosen tabu regime) and an adaptive penalty coefficient; they differ only
//! in how tabu tenures are stored and computed.

use std::collections::HashMap;
use std::time::Instant;

use crate::assignment::{Assignment, ColorTarget};
use crate::context::SearchContext;
use crate::graph::{Graph, VertexId};

use super::{choose, colored_vertices, deadline_reached, ProgressSink};

/// Which aftereffect a phase's accepted moves leave behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Perturbation {
    /// normal tenure formula applies
    NoPerturbation,
    /// moved vertex/color locked for the rest of the phase
    Unlimited,
    /// no tabu aftereffect at all
    NoTabu,
}

/// Per-vertex tenure (`afisa`) or per-(vertex, color) tenure
/// (`afisa_original`); unified so the shared tabu loop doesn't need to know
/// which.
enum TabuStore {
    PerVertex(Vec<i64>),
    PerVertexColor(HashMap<(VertexId, i64), i64>),
}

impl TabuStore {
    fn get(&self, v: VertexId, c: i64) -> i64 {
        match self {
            TabuStore::PerVertex(t) => t[v],
            TabuStore::PerVertexColor(m) => *m.get(&(v, c)).unwrap_or(&0),
        }
    }

    fn set(&mut self, v: VertexId, c: i64, value: i64) {
        match self {
            TabuStore::PerVertex(t) => t[v] = value,
            TabuStore::PerVertexColor(m) => {
                m.insert((v, c), value);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(super) fn run(
    assignment: &mut Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    sub_deadline: Instant,
    nb_iter_local_search: u64,
    target: Option<i32>,
    original: bool,
    sink: &mut dyn ProgressSink,
) {
    let n = graph.n() as f64;
    let small_perturbation = (0.05 * n) as u64;
    let large_perturbation = (0.5 * n) as u64;
    let nb_turn_tabu = graph.n() as u64 * 10;

    let mut best_afisa_sol = assignment.clone();
    let mut penalty_coeff: i64 = 1;
    let mut no_improvement: u32 = 0;
    let mut turn_afisa: u64 = 0;
    let mut perturbation_len = small_perturbation;

    while turn_afisa < nb_iter_local_search
        && !deadline_reached(sub_deadline)
        && !target.is_some_and(|t| assignment.score() <= t)
    {
        turn_afisa += 1;
        let mut working = best_afisa_sol.clone();
        afisa_tabu(
            &mut working,
            assignment,
            &mut best_afisa_sol,
            graph,
            ctx,
            penalty_coeff,
            nb_turn_tabu,
            Perturbation::NoPerturbation,
            sub_deadline,
            target,
            original,
        );

        if best_afisa_sol.score() < assignment.score() && best_afisa_sol.penalty() == 0 {
            *assignment = best_afisa_sol.clone();
            ctx.best.try_improve_score(assignment.score());
            no_improvement = 0;
            perturbation_len = small_perturbation;
            sink.on_improvement(turn_afisa, assignment, graph);
        } else {
            no_improvement += 1;
            if no_improvement == 50 {
                perturbation_len = large_perturbation;
            }
        }

        if best_afisa_sol.penalty() != 0 {
            penalty_coeff += 1;
        } else {
            penalty_coeff -= 1;
            if penalty_coeff <= 0 {
                penalty_coeff = 1;
            }
        }

        let regime = if ctx.rng.borrow_mut().gen_range(0..100) < 50 {
            Perturbation::NoTabu
        } else {
            Perturbation::Unlimited
        };
        afisa_tabu(
            &mut working,
            assignment,
            &mut best_afisa_sol,
            graph,
            ctx,
            penalty_coeff,
            perturbation_len,
            regime,
            sub_deadline,
            target,
            original,
        );
    }
}

/// The shared tabu descent: `solution` is mutated in place for `turns`
/// rounds (or until the deadline/target), updating `best_afisa_sol` whenever
/// the penalty-weighted objective improves.
#[allow(clippy::too_many_arguments)]
fn afisa_tabu(
    solution: &mut Assignment,
    best_solution: &Assignment,
    best_afisa_sol: &mut Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    penalty_coeff: i64,
    turns: u64,
    perturbation: Perturbation,
    sub_deadline: Instant,
    target: Option<i32>,
    original: bool,
) {
    let nb_max_colors = if original {
        ((solution.n_used_colors().max(15)) as f64 * 1.15) as usize
    } else {
        usize::MAX
    };
    let turn_tabu_min = (0.2 * solution.n() as f64).ceil() as i64;
    let mut tabu = if original {
        TabuStore::PerVertexColor(HashMap::new())
    } else {
        TabuStore::PerVertex(vec![0i64; solution.n()])
    };

    let mut turn_tabu: u64 = 0;
    while turn_tabu < turns && !deadline_reached(sub_deadline) {
        turn_tabu += 1;
        let mut best_moves: Vec<(VertexId, ColorTarget, i32)> = Vec::new();
        let mut best_eval = i32::MAX;
        // Aspirating moves (zero-conflict and better than the global best)
        // override tabu status; tracked against their own minimum rather
        // than `best_eval` so one doesn't get silently pruned just because
        // some unrelated non-tabu candidate this round happened to score
        // lower.
        let mut aspiring_moves: Vec<(VertexId, ColorTarget, i32)> = Vec::new();
        let mut aspiring_eval = i32::MAX;

        let used: Vec<usize> = solution.used_colors().collect();
        let mut candidates: Vec<ColorTarget> = used.iter().copied().map(ColorTarget::Existing).collect();
        if !original || candidates.len() < nb_max_colors {
            candidates.push(ColorTarget::New);
        }

        for v in colored_vertices(solution) {
            for &c in &candidates {
                if Some(c) == solution.color_of(v).map(ColorTarget::Existing) {
                    continue;
                }
                let delta_penalty = solution.delta_conflicts(v, c);
                let delta_score = solution.delta_score(v, c, graph);
                let test_score = solution.score() + delta_score
                    + (penalty_coeff * (delta_penalty + solution.penalty()) as i64) as i32;
                let tabu_key = color_key(c);
                let tenure = tabu.get(v, tabu_key);
                let non_tabu = tenure <= turn_tabu as i64;
                let aspiration = test_score < best_solution.score() && solution.penalty() + delta_penalty == 0;

                if aspiration {
                    if test_score < aspiring_eval {
                        aspiring_moves.clear();
                        aspiring_moves.push((v, c, test_score));
                        aspiring_eval = test_score;
                    } else if test_score == aspiring_eval {
                        aspiring_moves.push((v, c, test_score));
                    }
                }
                if non_tabu {
                    if test_score < best_eval {
                        best_moves.clear();
                        best_moves.push((v, c, test_score));
                        best_eval = test_score;
                    } else if test_score == best_eval {
                        best_moves.push((v, c, test_score));
                    }
                }
            }
        }

        let pool = if !aspiring_moves.is_empty() { &aspiring_moves } else { &best_moves };
        if pool.is_empty() {
            continue;
        }
        let &(v, c, _) = choose(ctx, pool);
        let old_color = solution.delete_from(v, graph);
        solution.add_to(v, c, graph);

        match perturbation {
            Perturbation::NoPerturbation => {
                let tenure = turn_tabu as i64
                    + ctx.rng.borrow_mut().gen_range(0..=10)
                    + if original {
                        solution.score() as i64 + (0.6 * (penalty_coeff * solution.penalty() as i64) as f64) as i64
                    } else {
                        turn_tabu_min
                    };
                tabu.set(v, color_key(ColorTarget::Existing(old_color)), tenure);
            }
            Perturbation::Unlimited => {
                tabu.set(v, color_key(ColorTarget::Existing(old_color)), turns as i64 + 1);
            }
            Perturbation::NoTabu => {}
        }

        if solution.score() + (penalty_coeff * solution.penalty() as i64) as i32
            < best_afisa_sol.score() + (penalty_coeff * best_afisa_sol.penalty() as i64) as i32
        {
            *best_afisa_sol = solution.clone();
        }

        if target.is_some_and(|t| solution.score() <= t) {
            return;
        }
    }
}

/// Maps a [`ColorTarget`] to the integer key the `original` variant's
/// per-(vertex, color) tabu matrix is indexed by (`-1` for `NEW`).
fn color_key(target: ColorTarget) -> i64 {
    match target {
        ColorTarget::Existing(c) => c as i64,
        ColorTarget::New => -1,
    }
}

use rand::Rng;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initializers::Initialization;
    use std::rc::Rc;
    use std::time::Duration;

    fn path4() -> Graph {
        Graph::new("p4", vec![vec![1], vec![0, 2], vec![1, 3], vec![2]], vec![5, 4, 3, 2])
    }

    fn clone_g(g: &Graph) -> Graph {
        let adj: Vec<Vec<usize>> = (0..g.n()).map(|v| g.neighbors(v).to_vec()).collect();
        let w: Vec<u32> = (0..g.n()).map(|v| g.weight(v)).collect();
        Graph::new(g.name(), adj, w)
    }

    #[test]
    fn afisa_improves_toward_nine() {
        let g = path4();
        let ctx = SearchContext::new(Rc::new(clone_g(&g)), 1, Duration::from_secs(5));
        let mut a = Assignment::new(&g);
        Initialization::Worst.run(&mut a, &g, &ctx);
        ctx.best.try_improve_score(a.score());
        let mut sink = super::super::NullSink;
        run(&mut a, &g, &ctx, ctx.deadline.sub_deadline(Duration::from_secs(5)), 500, None, false, &mut sink);
        assert!(a.score() <= 9);
        assert_eq!(a.penalty(), 0);
        assert!(a.check_solution(&g));
    }

    #[test]
    fn afisa_original_improves_toward_nine() {
        let g = path4();
        let ctx = SearchContext::new(Rc::new(clone_g(&g)), 7, Duration::from_secs(5));
        let mut a = Assignment::new(&g);
        Initialization::Worst.run(&mut a, &g, &ctx);
        ctx.best.try_improve_score(a.score());
        let mut sink = super::super::NullSink;
        run(&mut a, &g, &ctx, ctx.deadline.sub_deadline(Duration::from_secs(5)), 500, None, true, &mut sink);
        assert!(a.score() <= 9);
        assert_eq!(a.penalty(), 0);
        assert!(a.check_solution(&g));
    }
}
