//! TabuCol. Forces the coloring down to `k = min(bestNColors
//! - 1, |usedColors| - 1)` colors, then runs an inner tabu loop minimizing
//! `penalty` with a (vertex, color) tabu matrix until either the sub-method
//! deadline or a legal (`penalty = 0`) coloring is reached, at which point it
//! is committed as the new best and `bestNColors` drops by one.

use std::collections::HashMap;
use std::time::Instant;

use crate::assignment::{Assignment, ColorTarget};
use crate::context::SearchContext;
use crate::graph::{Graph, VertexId};

use super::{choose, colored_vertices, deadline_reached, ProgressSink};

/// Deletes every member of the lowest-priority `|usedColors| - k` colors and
/// reinserts them, in stable vertex order, into whichever remaining used
/// color currently conflicts least.
fn reduce_colors(working: &mut Assignment, graph: &Graph, k: usize) {
    let used: Vec<usize> = working.used_colors().collect();
    if used.len() <= k {
        return;
    }
    let mut displaced: Vec<VertexId> = used[k..]
        .iter()
        .flat_map(|&c| working.members(c).to_vec())
        .collect();
    displaced.sort_unstable();
    for &v in &displaced {
        working.delete_from(v, graph);
    }
    for &v in &displaced {
        let remaining: Vec<usize> = working.used_colors().collect();
        let mut best_color = remaining[0];
        let mut best_conflicts = working.conflicts(best_color, v);
        for &c in &remaining[1..] {
            let conflicts = working.conflicts(c, v);
            if conflicts < best_conflicts {
                best_conflicts = conflicts;
                best_color = c;
            }
        }
        working.add_to(v, ColorTarget::Existing(best_color), graph);
    }
}

pub(super) fn run(
    assignment: &mut Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    sub_deadline: Instant,
    nb_iter_local_search: u64,
    sink: &mut dyn ProgressSink,
) {
    ctx.best.try_improve_n_colors(assignment.n_used_colors() as i32);
    let mut working = assignment.clone();
    let mut turn_main: u64 = 0;
    while turn_main < nb_iter_local_search && !deadline_reached(sub_deadline) {
        turn_main += 1;

        let k = if working.n_used_colors() as i32 == ctx.best.n_colors() && working.penalty() == 0 {
            ctx.best.n_colors() - 1
        } else {
            working.n_used_colors() as i32 - 1
        };
        if k < 1 {
            break;
        }
        reduce_colors(&mut working, graph, k as usize);

        let mut best_nb_conflicts = working.penalty();
        let mut tabu: HashMap<(VertexId, usize), i64> = HashMap::new();
        let mut turn: i64 = 0;
        while !deadline_reached(sub_deadline) && best_nb_conflicts != 0 {
            turn += 1;
            let mut best_moves: Vec<(VertexId, usize, i32)> = Vec::new();
            let mut best_eval = i32::MAX;
            let used: Vec<usize> = working.used_colors().collect();
            for v in colored_vertices(&working) {
                if !working.has_conflicts(v) {
                    continue;
                }
                for &c in &used {
                    if Some(c) == working.color_of(v) {
                        continue;
                    }
                    let delta_conflicts = working.delta_conflicts(v, ColorTarget::Existing(c));
                    let tenure = *tabu.get(&(v, c)).unwrap_or(&0);
                    let aspiration = working.penalty() + delta_conflicts == 0;
                    if !(tenure <= turn || aspiration) {
                        continue;
                    }
                    if delta_conflicts < best_eval {
                        best_moves.clear();
                        best_moves.push((v, c, delta_conflicts));
                        best_eval = delta_conflicts;
                    } else if delta_conflicts == best_eval {
                        best_moves.push((v, c, delta_conflicts));
                    }
                }
            }
            if best_moves.is_empty() {
                continue;
            }
            let &(v, c, _) = choose(ctx, &best_moves);
            let old_color = working.delete_from(v, graph);
            working.add_to(v, ColorTarget::Existing(c), graph);
            tabu.insert(
                (v, old_color),
                turn + ctx.rng.borrow_mut().gen_range(0..=10) + (0.6 * working.penalty() as f64) as i64,
            );
            if working.penalty() < best_nb_conflicts {
                best_nb_conflicts = working.penalty();
                sink.on_improvement(turn as u64, &working, graph);
            }
        }

        if working.penalty() == 0 {
            *assignment = working.clone();
            ctx.best.try_improve_n_colors(working.n_used_colors() as i32);
            sink.on_improvement(turn_main, assignment, graph);
        }
    }
}

use rand::Rng;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initializers::Initialization;
    use std::rc::Rc;
    use std::time::Duration;

    fn k4() -> Graph {
        Graph::new(
            "k4",
            vec![vec![1, 2, 3], vec![0, 2, 3], vec![0, 1, 3], vec![0, 1, 2]],
            vec![1, 1, 1, 1],
        )
    }

    fn clone_g(g: &Graph) -> Graph {
        let adj: Vec<Vec<usize>> = (0..g.n()).map(|v| g.neighbors(v).to_vec()).collect();
        let w: Vec<u32> = (0..g.n()).map(|v| g.weight(v)).collect();
        Graph::new(g.name(), adj, w)
    }

    #[test]
    fn reaches_four_colors_on_k4() {
        let g = k4();
        let ctx = SearchContext::new(Rc::new(clone_g(&g)), 1, Duration::from_secs(5));
        let mut a = Assignment::new(&g);
        Initialization::Worst.run(&mut a, &g, &ctx);
        let mut sink = super::super::NullSink;
        run(&mut a, &g, &ctx, ctx.deadline.sub_deadline(Duration::from_secs(5)), 10_000, &mut sink);
        assert_eq!(a.penalty(), 0);
        assert_eq!(a.n_used_colors(), 4);
        assert!(a.check_solution(&g));
    }
}
