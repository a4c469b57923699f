//! RedLS. Alternates a greedy zero-conflict-delta descent
//! (candidate set S2) with conflict-reducing moves (S1) and, failing those,
//! reopen-and-recolor moves (S3); when nothing applies it raises edge
//! weights and recolors along a random conflicting edge (selectionRule2).

use std::time::Instant;

use crate::assignment::{Assignment, ColorTarget};
use crate::context::SearchContext;
use crate::graph::{Graph, VertexId};

use super::{choose, colored_vertices, deadline_reached, ProgressSink};

/// A candidate (vertex, target color) pair, mirroring the grounding
/// source's `Coloration`.
#[derive(Debug, Clone, Copy)]
struct Coloration {
    vertex: VertexId,
    target: ColorTarget,
}

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
    let mut solution = assignment.clone();
    let mut tabu = vec![false; solution.n()];
    let mut turn: u64 = 0;

    while turn < nb_iter_local_search
        && !deadline_reached(sub_deadline)
        && !target.is_some_and(|t| assignment.score() <= t)
    {
        turn += 1;

        if solution.penalty() == 0 {
            while candidate_set_2(&mut solution, graph, ctx, false, &mut tabu) {}

            if solution.score() < assignment.score() {
                *assignment = solution.clone();
                ctx.best.try_improve_score(assignment.score());
                sink.on_improvement(turn, assignment, graph);
                if target.is_some_and(|t| assignment.score() <= t) {
                    return;
                }
            }
            tabu.iter_mut().for_each(|t| *t = false);
            selection_rule_1(&mut solution, graph);
        }

        if !candidate_set_1(&mut solution, graph, ctx, assignment.score(), &mut tabu) {
            while candidate_set_2(&mut solution, graph, ctx, true, &mut tabu) {}

            if !candidate_set_3(&mut solution, graph, ctx, assignment.score(), &mut tabu) {
                solution.increment_edge_weights(graph);
                if solution.conflict_edges().next().is_some() {
                    selection_rule_2(&mut solution, graph, ctx, assignment.score(), &mut tabu);
                }
            }
        }
    }
}

fn candidate_set_1(
    solution: &mut Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    best_local_score: i32,
    tabu: &mut [bool],
) -> bool {
    let delta_wvcp = (best_local_score - solution.score()).abs();
    let mut best_conflicts = 0;
    let mut best: Vec<Coloration> = Vec::new();

    let used: Vec<usize> = solution.used_colors().collect();
    for v in colored_vertices(solution) {
        if tabu[v] || !solution.has_conflicts(v) {
            continue;
        }
        for &c in &used {
            if Some(c) == solution.color_of(v) {
                continue;
            }
            let target = ColorTarget::Existing(c);
            let delta_conflicts = solution.delta_conflicts(v, target);
            if delta_conflicts >= 0
                || delta_conflicts > best_conflicts
                || solution.delta_score(v, target, graph) >= delta_wvcp
            {
                continue;
            }
            if delta_conflicts < best_conflicts {
                best_conflicts = delta_conflicts;
                best.clear();
            }
            best.push(Coloration { vertex: v, target });
        }
    }

    if best.is_empty() {
        return false;
    }
    let chosen = *choose(ctx, &best);
    let old_color = solution.delete_from(chosen.vertex, graph);
    solution.add_to(chosen.vertex, chosen.target, graph);
    tabu[chosen.vertex] = true;
    for &neighbor in graph.neighbors(chosen.vertex) {
        tabu[neighbor] = false;
    }
    let _ = old_color;
    true
}

fn candidate_set_2(
    solution: &mut Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    with_conflicts: bool,
    tabu: &mut [bool],
) -> bool {
    let mut best: Vec<Coloration> = Vec::new();
    let used: Vec<usize> = solution.used_colors().collect();
    for v in colored_vertices(solution) {
        if with_conflicts && tabu[v] {
            continue;
        }
        for &c in &used {
            if Some(c) == solution.color_of(v) {
                continue;
            }
            let target = ColorTarget::Existing(c);
            if solution.delta_conflicts(v, target) > 0 || solution.delta_score(v, target, graph) >= 0 {
                continue;
            }
            best.push(Coloration { vertex: v, target });
        }
    }

    if best.is_empty() {
        return false;
    }
    let chosen = *choose(ctx, &best);
    solution.delete_from(chosen.vertex, graph);
    solution.add_to(chosen.vertex, chosen.target, graph);
    if with_conflicts {
        tabu[chosen.vertex] = true;
    }
    true
}

fn candidate_set_3(
    solution: &mut Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    best_local_score: i32,
    tabu: &mut [bool],
) -> bool {
    let delta_wvcp = best_local_score - solution.score();
    let mut vertices: Vec<VertexId> = Vec::new();
    for v in colored_vertices(solution) {
        if !tabu[v] && solution.has_conflicts(v) && solution.delta_score(v, ColorTarget::New, graph) < delta_wvcp {
            vertices.push(v);
        }
    }
    if vertices.is_empty() {
        return false;
    }
    let &v = choose(ctx, &vertices);
    solution.delete_from(v, graph);
    solution.add_to(v, ColorTarget::New, graph);
    tabu[v] = true;
    true
}

/// Moves every heaviest vertex of the color maximizing `Δscore/Δconflict`
/// toward another color.
fn selection_rule_1(solution: &mut Assignment, graph: &Graph) {
    let mut best_ratio = 0.0f32;
    let mut best_color: Option<usize> = None;
    let mut best_heaviest: Vec<VertexId> = Vec::new();

    let used: Vec<usize> = solution.used_colors().collect();
    for &c1 in &used {
        let max_weight1 = solution.max_weight(c1);
        let mut second_max = 0u32;
        let mut heaviest = Vec::new();
        for &v in solution.members(c1) {
            let w = graph.weight(v);
            if w == max_weight1 {
                heaviest.push(v);
            } else if w > second_max {
                second_max = w;
            }
        }
        let delta_move = max_weight1 as i32 - second_max as i32;
        for &c2 in &used {
            if c1 == c2 {
                continue;
            }
            let delta_conflict: i32 = heaviest.iter().map(|&v| solution.conflicts(c2, v)).sum();
            let max_weight2 = solution.max_weight(c2);
            let delta_wvcp = if max_weight1 > max_weight2 {
                delta_move - max_weight1 as i32 + max_weight2 as i32
            } else {
                delta_move
            };
            let ratio = if delta_conflict != 0 {
                delta_wvcp as f32 / delta_conflict as f32
            } else {
                delta_wvcp as f32 * 2.0
            };
            if ratio > best_ratio || best_heaviest.is_empty() {
                best_ratio = ratio;
                best_heaviest = heaviest.clone();
                best_color = Some(c2);
            }
        }
    }

    let Some(best_color) = best_color else { return };
    for v in best_heaviest {
        solution.delete_from(v, graph);
        solution.add_to(v, ColorTarget::Existing(best_color), graph);
    }
}

/// Picks a uniformly random conflicting edge and recolors the endpoint that
/// most reduces conflicts while staying within `best_local_score`; falls
/// back to an arbitrary recolor of one endpoint when neither can.
fn selection_rule_2(
    solution: &mut Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    best_local_score: i32,
    tabu: &mut [bool],
) {
    let delta_wvcp = best_local_score - solution.score();
    let edges: Vec<(VertexId, VertexId)> = solution.conflict_edges().copied().collect();
    let &(v1, v2) = choose(ctx, &edges);

    let mut best: Option<Coloration> = None;
    let mut best_conflicts = 0;
    let used: Vec<usize> = solution.used_colors().collect();
    for &vertex in &[v1, v2] {
        for &c in &used {
            if Some(c) == solution.color_of(vertex) {
                continue;
            }
            let target = ColorTarget::Existing(c);
            if solution.delta_score(vertex, target, graph) >= delta_wvcp {
                continue;
            }
            let delta_conflicts = solution.delta_conflicts(vertex, target);
            if best.is_none() || delta_conflicts < best_conflicts {
                best_conflicts = delta_conflicts;
                best = Some(Coloration { vertex, target });
            }
        }
    }

    let chosen = match best {
        Some(c) => c,
        None => {
            let vertex = *choose(ctx, &[v1, v2]);
            let mut possible: Vec<ColorTarget> = vec![ColorTarget::New];
            for &c in &used {
                if Some(c) != solution.color_of(vertex) {
                    possible.push(ColorTarget::Existing(c));
                }
            }
            let target = *choose(ctx, &possible);
            Coloration { vertex, target }
        }
    };

    solution.delete_from(chosen.vertex, graph);
    solution.add_to(chosen.vertex, chosen.target, graph);
    tabu[chosen.vertex] = true;
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
    fn redls_improves_toward_nine() {
        let g = path4();
        let ctx = SearchContext::new(Rc::new(clone_g(&g)), 1, Duration::from_secs(5));
        let mut a = Assignment::new(&g);
        Initialization::Worst.run(&mut a, &g, &ctx);
        ctx.best.try_improve_score(a.score());
        let mut sink = super::super::NullSink;
        run(&mut a, &g, &ctx, ctx.deadline.sub_deadline(Duration::from_secs(5)), 1000, None, &mut sink);
        assert!(a.score() <= 9);
        assert!(a.check_solution(&g));
    }
}
