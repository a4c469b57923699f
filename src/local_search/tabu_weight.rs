//! TabuWeight. Per-vertex tabu expiry turn; each turn picks
//! an argmin resulting-score move among legal (non-tabu or aspirating)
//! candidates whose target color is empty or conflict-free for the vertex.

use std::time::Instant;

use crate::assignment::{Assignment, ColorTarget};
use crate::context::SearchContext;
use crate::graph::Graph;

use super::{choose, colored_vertices, deadline_reached, Move, ProgressSink};

#[allow(clippy::too_many_arguments)]
pub(super) fn run(
    assignment: &mut Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    sub_deadline: Instant,
    nb_iter_local_search: u64,
    target: Option<i32>,
    sink: &mut dyn ProgressSink,
) {
    let mut tabu = vec![0i64; assignment.n()];
    let mut turn: u64 = 0;
    while turn < nb_iter_local_search
        && !deadline_reached(sub_deadline)
        && !target.is_some_and(|t| assignment.score() <= t)
    {
        turn += 1;
        let mut best_moves: Vec<Move> = Vec::new();
        let mut best_score = i32::MAX;
        let used: Vec<usize> = assignment.used_colors().collect();
        for v in colored_vertices(assignment) {
            let mut candidates: Vec<ColorTarget> =
                used.iter().copied().filter(|&c| assignment.conflicts(c, v) == 0).map(ColorTarget::Existing).collect();
            candidates.push(ColorTarget::New);
            for target_color in candidates {
                if Some(target_color) == assignment.color_of(v).map(ColorTarget::Existing) {
                    continue;
                }
                let resulting_score = assignment.score() + assignment.delta_score(v, target_color, graph);
                let legal = tabu[v] <= turn as i64 || resulting_score < ctx.best.score();
                if !legal {
                    continue;
                }
                if resulting_score < best_score {
                    best_moves.clear();
                    best_moves.push(Move { vertex: v, target: target_color, resulting_score });
                    best_score = resulting_score;
                } else if resulting_score == best_score {
                    best_moves.push(Move { vertex: v, target: target_color, resulting_score });
                }
            }
        }
        if best_moves.is_empty() {
            continue;
        }
        let chosen = *choose(ctx, &best_moves);
        assignment.apply_move(chosen.vertex, chosen.target, graph);
        tabu[chosen.vertex] = turn as i64 + assignment.n_used_colors() as i64;
        if assignment.score() < ctx.best.score() {
            ctx.best.try_improve_score(assignment.score());
            sink.on_improvement(turn, assignment, graph);
        }
    }
}

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
    fn improves_toward_nine() {
        let g = path4();
        let ctx = SearchContext::new(Rc::new(clone_g(&g)), 1, Duration::from_secs(5));
        let mut a = Assignment::new(&g);
        Initialization::Worst.run(&mut a, &g, &ctx);
        ctx.best.try_improve_score(a.score());
        let mut sink = super::super::NullSink;
        run(&mut a, &g, &ctx, ctx.deadline.sub_deadline(Duration::from_secs(5)), 10_000, None, &mut sink);
        assert!(a.score() <= 9);
        assert_eq!(a.penalty(), 0);
        assert!(a.check_solution(&g));
    }
}
