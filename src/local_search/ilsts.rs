//! Iterated local search with a
//! shake-then-repair loop. Each outer turn unassigns the heaviest vertex of
//! `force` random colors, repairs by repeatedly trying the M1-M6 move
//! families in order, and accepts the repaired assignment when it improves;
//! stagnation escalates `force` and, after `n` rounds, applies one "grenade"
//! perturbation (glossary).
//!
//! M2, M3 and M5 differ only in which vertex initiates a relocation and
//! whether one neighbor may pay a tabu cost; here they share one
//! [`try_relocate`] helper, and M6 reuses it seeded from a random unassigned
//! vertex.

use std::time::Instant;

use crate::assignment::{Assignment, ColorTarget};
use crate::context::SearchContext;
use crate::graph::{Graph, VertexId};

use super::{deadline_reached, ProgressSink};
use rand::Rng;
use rand::seq::SliceRandom;

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
    let mut working = assignment.clone();
    let mut tabu = vec![0i64; working.n()];
    let mut no_improve: u64 = 1;
    let mut force: u32 = 1;
    let mut turn: u64 = 0;
    let inner_budget = graph.n() as u64 * 10;
    let n = graph.n() as u64;

    while turn < nb_iter_local_search
        && !deadline_reached(sub_deadline)
        && !target.is_some_and(|t| assignment.score() <= t)
    {
        turn += 1;
        let mut next_s = working.clone();
        if !unassign_heaviest_of_random_colors(&mut next_s, graph, ctx, force) {
            return;
        }

        let mut iter: u64 = 0;
        while next_s.uncolored().next().is_some() && iter < inner_budget && !deadline_reached(sub_deadline) {
            iter += 1;
            if repair_step(&mut next_s, graph, ctx, &mut tabu, iter as i64) {
                continue;
            }
            break;
        }

        let next_potential = potential_score(&next_s, graph);
        let working_potential = potential_score(&working, graph);
        if next_potential < working_potential {
            no_improve = 1;
            working = next_s;
            force = 1;
        } else if no_improve <= n {
            no_improve += 1;
            force = if force == 3 { 1 } else { force + 1 };
        } else {
            grenade_step(&mut working, graph, ctx);
            no_improve = 1;
        }

        if working.uncolored().next().is_none() && working.score() < assignment.score() {
            *assignment = working.clone();
            ctx.best.try_improve_score(assignment.score());
            sink.on_improvement(turn, assignment, graph);
        }
    }
}

/// An upper-bound estimate of a possibly-incomplete assignment's eventual
/// score: the real score of its placed vertices plus the weight every
/// currently-unassigned vertex would contribute as a singleton color.
fn potential_score(assignment: &Assignment, graph: &Graph) -> i32 {
    assignment.score() + assignment.uncolored().map(|v| graph.weight(v) as i32).sum::<i32>()
}

fn unassign_heaviest_of_random_colors(
    assignment: &mut Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    force: u32,
) -> bool {
    let mut used: Vec<usize> = assignment.used_colors().collect();
    if (used.len() as u32) < force {
        return false;
    }
    used.shuffle(&mut *ctx.rng.borrow_mut());
    for &c in used.iter().take(force as usize) {
        let members = assignment.members(c);
        let max_weight = assignment.max_weight(c);
        let heaviest: Vec<VertexId> = members.iter().copied().filter(|&v| graph.weight(v) == max_weight).collect();
        if heaviest.is_empty() {
            continue;
        }
        let idx = ctx.rng.borrow_mut().gen_range(0..heaviest.len());
        assignment.delete_from(heaviest[idx], graph);
    }
    true
}

fn repair_step(assignment: &mut Assignment, graph: &Graph, ctx: &SearchContext, tabu: &mut [i64], iter: i64) -> bool {
    if m1_direct(assignment, graph, ctx) {
        return true;
    }
    let uncolored: Vec<VertexId> = assignment.uncolored().collect();
    for &v in &uncolored {
        if try_relocate(assignment, graph, ctx, tabu, iter, v) {
            return true;
        }
    }
    if m4_shuffle(assignment, graph, ctx, tabu, iter) {
        return true;
    }
    if let Some(&v) = {
        let u = assignment.uncolored().collect::<Vec<_>>();
        u.choose(&mut *ctx.rng.borrow_mut()).copied().as_ref()
    } {
        return try_relocate(assignment, graph, ctx, tabu, iter, v);
    }
    false
}

/// M1: places an unassigned vertex into a conflict-free existing color when
/// doing so stays within the remaining unassigned-weight budget.
fn m1_direct(assignment: &mut Assignment, graph: &Graph, ctx: &SearchContext) -> bool {
    let delta = assignment.uncolored().map(|v| graph.weight(v) as i32).sum::<i32>();
    let uncolored: Vec<VertexId> = assignment.uncolored().collect();
    let mut colors: Vec<usize> = assignment.used_colors().collect();
    colors.shuffle(&mut *ctx.rng.borrow_mut());
    for &v in &uncolored {
        let vw = graph.weight(v) as i32;
        for &c in &colors {
            if assignment.conflicts(c, v) == 0 && delta > (vw - assignment.max_weight(c) as i32).max(0) {
                assignment.add_to(v, ColorTarget::Existing(c), graph);
                return true;
            }
        }
    }
    false
}

/// M2/M3/M5: places `v` into a used color by relocating the (at most one,
/// tabu-paying) neighbor that blocks it, then immediately re-places every
/// displaced neighbor into a constrained-random legal color (or a fresh one
/// if none is free), mirroring [`grenade_step`]'s re-placement loop.
fn try_relocate(
    assignment: &mut Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    tabu: &mut [i64],
    iter: i64,
    v: VertexId,
) -> bool {
    let vw = graph.weight(v) as i32;
    let delta = assignment.uncolored().map(|u| graph.weight(u) as i32).sum::<i32>().max(vw);
    let colors: Vec<usize> = assignment.used_colors().collect();
    for &c in &colors {
        if delta <= (vw - assignment.max_weight(c) as i32).max(0) {
            continue;
        }
        let blockers: Vec<VertexId> =
            graph.neighbors(v).iter().copied().filter(|&u| assignment.color_of(u) == Some(c)).collect();
        if blockers.is_empty() {
            continue;
        }
        let non_free: Vec<VertexId> = blockers.iter().copied().filter(|&u| assignment.free_colors(u) == 0).collect();
        let payable = non_free.len() <= 1 && non_free.iter().all(|&u| tabu[u] < iter);
        if !payable {
            continue;
        }
        for &u in &blockers {
            assignment.delete_from(u, graph);
        }
        let target = if assignment.used_colors().any(|u| u == c) { ColorTarget::Existing(c) } else { ColorTarget::New };
        assignment.add_to(v, target, graph);
        if !non_free.is_empty() {
            tabu[v] = iter + assignment.n_used_colors() as i64;
        }
        for &u in &blockers {
            let choices = assignment.available_colors(u);
            if choices.is_empty() {
                assignment.add_to(u, ColorTarget::New, graph);
            } else {
                let idx = ctx.rng.borrow_mut().gen_range(0..choices.len());
                assignment.add_to(u, ColorTarget::Existing(choices[idx]), graph);
            }
        }
        return true;
    }
    false
}

/// M4: recolors one already-placed, non-tabu, conflict-free-elsewhere
/// vertex to a different legal color, to diversify the search without
/// touching the unassigned set.
fn m4_shuffle(assignment: &mut Assignment, graph: &Graph, ctx: &SearchContext, tabu: &mut [i64], iter: i64) -> bool {
    let mut candidates: Vec<VertexId> = (0..assignment.n())
        .filter(|&v| assignment.color_of(v).is_some() && assignment.free_colors(v) > 0 && tabu[v] < iter && !graph.neighbors(v).is_empty())
        .collect();
    candidates.shuffle(&mut *ctx.rng.borrow_mut());
    for v in candidates {
        let available = assignment.available_colors(v);
        let choices: Vec<usize> =
            available.into_iter().filter(|&c| Some(c) != assignment.color_of(v)).collect();
        if choices.is_empty() {
            continue;
        }
        let c = *choices.choose(&mut *ctx.rng.borrow_mut()).unwrap();
        assignment.delete_from(v, graph);
        assignment.add_to(v, ColorTarget::Existing(c), graph);
        tabu[v] = iter + assignment.n_used_colors() as i64;
        return true;
    }
    false
}

/// Grenade step (glossary): picks a random (vertex, color) pair, unassigns
/// the vertex and every conflicting neighbor in that color, places the
/// vertex there, then greedily re-places the displaced vertices.
fn grenade_step(assignment: &mut Assignment, graph: &Graph, ctx: &SearchContext) {
    let v = ctx.rng.borrow_mut().gen_range(0..assignment.n());
    let used: Vec<usize> = assignment.used_colors().collect();
    if used.is_empty() {
        return;
    }
    let c = *used.choose(&mut *ctx.rng.borrow_mut()).unwrap();
    if Some(c) == assignment.color_of(v) {
        return;
    }
    let mut displaced: Vec<VertexId> =
        graph.neighbors(v).iter().copied().filter(|&u| assignment.color_of(u) == Some(c)).collect();
    if assignment.color_of(v).is_some() {
        assignment.delete_from(v, graph);
        displaced.push(v);
    }
    for &u in &displaced {
        if assignment.color_of(u).is_some() {
            assignment.delete_from(u, graph);
        }
    }
    displaced.shuffle(&mut *ctx.rng.borrow_mut());
    let target = if assignment.used_colors().any(|u| u == c) { ColorTarget::Existing(c) } else { ColorTarget::New };
    assignment.add_to(v, target, graph);
    for &u in &displaced {
        if u == v {
            continue;
        }
        let choices = assignment.available_colors(u);
        if choices.is_empty() {
            assignment.add_to(u, ColorTarget::New, graph);
        } else {
            let idx = ctx.rng.borrow_mut().gen_range(0..choices.len());
            assignment.add_to(u, ColorTarget::Existing(choices[idx]), graph);
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
    fn ilsts_stays_legal_and_complete() {
        let g = path4();
        let ctx = SearchContext::new(Rc::new(clone_g(&g)), 3, Duration::from_secs(5));
        let mut a = Assignment::new(&g);
        Initialization::Deterministic.run(&mut a, &g, &ctx);
        ctx.best.try_improve_score(a.score());
        let mut sink = super::super::NullSink;
        run(&mut a, &g, &ctx, ctx.deadline.sub_deadline(Duration::from_secs(5)), 50, None, &mut sink);
        assert_eq!(a.penalty(), 0);
        assert!(a.check_solution(&g));
    }
}
