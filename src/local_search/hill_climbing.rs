//! Steepest-descent hill climbing. Repeatedly applies a
//! uniformly-chosen argmin among all strictly score-decreasing,
//! conflict-free moves; stops at the first local optimum.

use std::time::Instant;

use crate::assignment::ColorTarget;
use crate::context::SearchContext;
use crate::graph::Graph;

use super::{choose, colored_vertices, deadline_reached, Move, ProgressSink};

pub(super) fn run(
    assignment: &mut crate::assignment::Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    sub_deadline: Instant,
    target: Option<i32>,
    sink: &mut dyn ProgressSink,
) {
    let mut turn: u64 = 0;
    loop {
        if deadline_reached(sub_deadline) || target.is_some_and(|t| assignment.score() <= t) {
            return;
        }
        turn += 1;
        let mut best_moves: Vec<Move> = Vec::new();
        let mut best_score = assignment.score();
        for v in colored_vertices(assignment) {
            for c in assignment.used_colors().collect::<Vec<_>>() {
                if Some(c) == assignment.color_of(v) || assignment.conflicts(c, v) != 0 {
                    continue;
                }
                let resulting_score = assignment.score() + assignment.delta_score(v, ColorTarget::Existing(c), graph);
                if resulting_score < best_score {
                    best_moves.clear();
                    best_moves.push(Move { vertex: v, target: ColorTarget::Existing(c), resulting_score });
                    best_score = resulting_score;
                } else if resulting_score == best_score && !best_moves.is_empty() {
                    best_moves.push(Move { vertex: v, target: ColorTarget::Existing(c), resulting_score });
                }
            }
        }
        if best_moves.is_empty() {
            return;
        }
        let chosen = *choose(ctx, &best_moves);
        assignment.apply_move(chosen.vertex, chosen.target, graph);
        sink.on_improvement(turn, assignment, graph);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::Assignment;
    use crate::initializers::Initialization;
    use std::rc::Rc;
    use std::time::Duration;

    fn path4() -> Graph {
        Graph::new("p4", vec![vec![1], vec![0, 2], vec![1, 3], vec![2]], vec![5, 4, 3, 2])
    }

    #[test]
    fn reaches_nine_from_worst_start() {
        let g = path4();
        let ctx = SearchContext::new(Rc::new(clone(&g)), 1, Duration::from_secs(5));
        let mut a = Assignment::new(&g);
        Initialization::Worst.run(&mut a, &g, &ctx);
        let mut sink = super::super::NullSink;
        run(&mut a, &g, &ctx, ctx.deadline.sub_deadline(Duration::from_secs(5)), None, &mut sink);
        assert_eq!(a.score(), 9);
        assert_eq!(a.penalty(), 0);
    }

    fn clone(g: &Graph) -> Graph {
        let adj: Vec<Vec<usize>> = (0..g.n()).map(|v| g.neighbors(v).to_vec()).collect();
        let w: Vec<u32> = (0..g.n()).map(|v| g.weight(v)).collect();
        Graph::new(g.name(), adj, w)
    }
}
