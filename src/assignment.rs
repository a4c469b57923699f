//! The incrementally maintained coloring.
//!
//! This is the core of the whole crate: every local search and every MCTS
//! playout reads its deltas through this type. `Assignment` keeps color,
//! per-class members/weights, per-class conflict counts, score, penalty,
//! conflicting edges and free-color bits consistent as literal fields,
//! updated by [`Assignment::add_to`] and [`Assignment::delete_from`] —
//! nothing here is recomputed lazily on read.

use std::collections::{BTreeSet, HashSet};

use crate::graph::{Graph, VertexId};

/// A color index, or "open a fresh color".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTarget {
    /// recolor into an already-open color
    Existing(usize),
    /// allocate (or recycle) a fresh color
    New,
}

/// Mutable mirror of a single color class: its sorted member list and the
/// sorted multiset of member weights (`weights.last()` is the max weight).
#[derive(Debug, Clone, Default)]
struct ColorClass {
    members: Vec<VertexId>,
    weights_sorted: Vec<u32>,
}

impl ColorClass {
    fn max_weight(&self) -> u32 {
        *self.weights_sorted.last().unwrap_or(&0)
    }

    fn insert(&mut self, v: VertexId, w: u32) {
        let pos = self.members.binary_search(&v).unwrap_err();
        self.members.insert(pos, v);
        let wpos = self.weights_sorted.binary_search(&w).unwrap_or_else(|e| e);
        self.weights_sorted.insert(wpos, w);
    }

    fn remove(&mut self, v: VertexId, w: u32) {
        if let Ok(pos) = self.members.binary_search(&v) {
            self.members.remove(pos);
        }
        if let Ok(wpos) = self.weights_sorted.binary_search(&w) {
            self.weights_sorted.remove(wpos);
        }
    }

    fn is_empty(&self) -> bool { self.members.is_empty() }
}

/// An incrementally-maintained coloring of a [`Graph`].
#[derive(Debug, Clone)]
pub struct Assignment {
    n: usize,
    /// color[v] = None means uncolored
    color: Vec<Option<usize>>,
    classes: Vec<ColorClass>,
    /// conflict[c][v] = sum of edge weights from v's neighbors colored c
    conflict: Vec<Vec<i32>>,
    used_colors: BTreeSet<usize>,
    freed_colors: Vec<usize>,
    next_color: usize,
    score: i32,
    penalty: i32,
    conflict_edges: HashSet<(VertexId, VertexId)>,
    free_colors: Vec<i32>,
    edge_weight: std::collections::HashMap<(VertexId, VertexId), i32>,
    uncolored: BTreeSet<VertexId>,
}

fn edge_key(u: VertexId, v: VertexId) -> (VertexId, VertexId) {
    if u < v { (u, v) } else { (v, u) }
}

impl Assignment {
    /// Builds the empty coloring over `graph`: every vertex uncolored, no
    /// colors open, edge weights all at their default of 1.
    pub fn new(graph: &Graph) -> Self {
        let n = graph.n();
        Self {
            n,
            color: vec![None; n],
            classes: vec![ColorClass::default(); n],
            conflict: vec![vec![0; n]; n],
            used_colors: BTreeSet::new(),
            freed_colors: Vec::new(),
            next_color: 0,
            score: 0,
            penalty: 0,
            conflict_edges: HashSet::new(),
            free_colors: vec![0; n],
            edge_weight: std::collections::HashMap::new(),
            uncolored: (0..n).collect(),
        }
    }

    /// Number of vertices.
    pub fn n(&self) -> usize { self.n }

    /// Current WVCP score: sum over classes of the max weight.
    pub fn score(&self) -> i32 { self.score }

    /// Current penalty: weighted count of monochromatic edges.
    pub fn penalty(&self) -> i32 { self.penalty }

    /// Color of `v`, if colored.
    pub fn color_of(&self, v: VertexId) -> Option<usize> { self.color[v] }

    /// Whether `v` has any conflicting neighbor in its current color.
    pub fn has_conflicts(&self, v: VertexId) -> bool {
        match self.color[v] {
            Some(c) => self.conflict[c][v] > 0,
            None => false,
        }
    }

    /// Weighted conflict count for coloring `v` with `c` (0 if `c` unused).
    pub fn conflicts(&self, c: usize, v: VertexId) -> i32 {
        self.conflict[c][v]
    }

    /// Max weight currently in color class `c` (0 if empty/unused).
    pub fn max_weight(&self, c: usize) -> u32 {
        self.classes[c].max_weight()
    }

    /// Members of color class `c`, sorted ascending.
    pub fn members(&self, c: usize) -> &[VertexId] { &self.classes[c].members }

    /// Number of distinct colors currently in use.
    pub fn n_used_colors(&self) -> usize { self.used_colors.len() }

    /// Total colors ever opened: currently used plus freed-and-recyclable.
    pub fn n_colors(&self) -> usize { self.used_colors.len() + self.freed_colors.len() }

    /// Used colors in ascending index order.
    pub fn used_colors(&self) -> impl Iterator<Item = usize> + '_ { self.used_colors.iter().copied() }

    /// Uncolored vertices, in the graph's pre-sorted order — vertex ids
    /// already reflect that order, so this doubles as an unassigned queue.
    pub fn uncolored(&self) -> impl Iterator<Item = VertexId> + '_ { self.uncolored.iter().copied() }

    /// First uncolored vertex in pre-sorted order, if any.
    pub fn first_uncolored(&self) -> Option<VertexId> { self.uncolored.iter().next().copied() }

    /// Weight of the edge `(u, v)`; defaults to 1 until RedLS mutates it.
    pub fn edge_weight(&self, u: VertexId, v: VertexId) -> i32 {
        *self.edge_weight.get(&edge_key(u, v)).unwrap_or(&1)
    }

    /// Conflicting edges, each direction stored once.
    pub fn conflict_edges(&self) -> impl Iterator<Item = &(VertexId, VertexId)> { self.conflict_edges.iter() }

    /// Used colors with zero conflict for `v`: candidates for a legal
    /// recolor.
    pub fn available_colors(&self, v: VertexId) -> Vec<usize> {
        self.used_colors.iter().copied().filter(|&c| self.conflict[c][v] == 0).collect()
    }

    /// First used color (in ascending order) with zero conflict for `v`, if
    /// any.
    pub fn first_available_color(&self, v: VertexId) -> Option<usize> {
        self.used_colors.iter().copied().find(|&c| self.conflict[c][v] == 0)
    }

    /// Number of used colors `c != color[v]` with zero conflict for `v` and
    /// `max_weight(c) >= w(v)`; used by ILSTS.
    pub fn free_colors(&self, v: VertexId) -> i32 { self.free_colors[v] }

    fn recompute_free_colors(&mut self, v: VertexId, graph: &Graph) {
        let wv = graph.weight(v);
        let cv = self.color[v];
        let count = self
            .used_colors
            .iter()
            .filter(|&&c| Some(c) != cv && self.conflict[c][v] == 0 && self.max_weight(c) >= wv)
            .count();
        self.free_colors[v] = count as i32;
    }

    /// The change in `score()` that coloring `v` with `target` would cause,
    /// without applying it.
    pub fn delta_score(&self, v: VertexId, target: ColorTarget, graph: &Graph) -> i32 {
        let wv = graph.weight(v) as i32;
        let mut delta = 0;
        if let Some(c0) = self.color[v] {
            let class = &self.classes[c0];
            if class.members.len() == 1 {
                delta -= wv;
            } else {
                let max = class.max_weight();
                if graph.weight(v) == max {
                    let second_max = class.weights_sorted[class.weights_sorted.len() - 2];
                    if second_max < max {
                        delta += second_max as i32 - max as i32;
                    }
                }
            }
        }
        match target {
            ColorTarget::New => delta += wv,
            ColorTarget::Existing(c) => {
                if self.classes[c].is_empty() {
                    delta += wv;
                } else {
                    let max = self.classes[c].max_weight();
                    if graph.weight(v) > max {
                        delta += wv - max as i32;
                    }
                }
            }
        }
        delta
    }

    /// The change in `penalty()` that coloring `v` with `target` would
    /// cause.
    pub fn delta_conflicts(&self, v: VertexId, target: ColorTarget) -> i32 {
        let before = match self.color[v] {
            Some(c0) => self.conflict[c0][v],
            None => 0,
        };
        let after = match target {
            ColorTarget::New => 0,
            ColorTarget::Existing(c) => self.conflict[c][v],
        };
        after - before
    }

    /// Resolves a [`ColorTarget`] to the concrete color index that
    /// [`Assignment::add_to`] would use, allocating/recycling a fresh index
    /// for `ColorTarget::New` without mutating state.
    pub fn peek_new_color_id(&self) -> usize {
        self.freed_colors.last().copied().unwrap_or(self.next_color)
    }

    /// Colors `v` with `target`; `v` must currently be uncolored. Returns
    /// the concrete color index used. Keeps every derived field consistent.
    pub fn add_to(&mut self, v: VertexId, target: ColorTarget, graph: &Graph) -> usize {
        assert!(self.color[v].is_none(), "add_to: vertex {} already colored", v);
        let delta_score = self.delta_score(v, target, graph);
        let c = match target {
            ColorTarget::Existing(c) => c,
            ColorTarget::New => {
                let c = self.freed_colors.pop().unwrap_or_else(|| {
                    let c = self.next_color;
                    self.next_color += 1;
                    c
                });
                self.used_colors.insert(c);
                c
            }
        };
        if matches!(target, ColorTarget::Existing(_)) {
            self.used_colors.insert(c);
        }
        let wv = graph.weight(v);
        let old_max = self.classes[c].max_weight();
        self.classes[c].insert(v, wv);
        let max_changed = self.classes[c].max_weight() != old_max;
        self.color[v] = Some(c);
        self.uncolored.remove(&v);
        for &u in graph.neighbors(v) {
            let ew = self.edge_weight(u, v);
            self.conflict[c][u] += ew;
            if self.color[u] == Some(c) {
                self.conflict_edges.insert((v, u));
                self.conflict_edges.insert((u, v));
                self.penalty += ew;
            }
        }
        self.score += delta_score;
        self.refresh_free_colors_after_move(v, c, max_changed, graph);
        c
    }

    /// Recomputes `freeColors` for the vertices that can possibly have
    /// changed after coloring/uncoloring `v` in class `c`: `v` itself and
    /// its neighbors always (their conflict counters moved), plus every
    /// vertex in the graph when `c`'s max weight changed (since any
    /// zero-conflict vertex's eligibility for `c` depends on that max).
    fn refresh_free_colors_after_move(&mut self, v: VertexId, _c: usize, max_changed: bool, graph: &Graph) {
        if max_changed {
            for u in 0..self.n {
                self.recompute_free_colors(u, graph);
            }
        } else {
            self.recompute_free_colors(v, graph);
            for &u in graph.neighbors(v) {
                self.recompute_free_colors(u, graph);
            }
        }
    }

    /// Uncolors `v`, returning its previous color. Inverse of
    /// [`Assignment::add_to`]; if the class becomes empty its index moves to
    /// the freed pool for recycling.
    pub fn delete_from(&mut self, v: VertexId, graph: &Graph) -> usize {
        let c = self.color[v].expect("delete_from: vertex is uncolored");
        let class = &self.classes[c];
        let wv = graph.weight(v);
        let score_delta = if class.members.len() == 1 {
            -(wv as i32)
        } else {
            let max = class.max_weight();
            if wv == max {
                let second_max = class.weights_sorted[class.weights_sorted.len() - 2];
                if second_max < max { second_max as i32 - max as i32 } else { 0 }
            } else {
                0
            }
        };
        for &u in graph.neighbors(v) {
            let ew = self.edge_weight(u, v);
            self.conflict[c][u] -= ew;
            if self.color[u] == Some(c) {
                self.conflict_edges.remove(&(v, u));
                self.conflict_edges.remove(&(u, v));
                self.penalty -= ew;
            }
        }
        let old_max = class.max_weight();
        self.classes[c].remove(v, wv);
        let max_changed = self.classes[c].max_weight() != old_max;
        self.color[v] = None;
        self.uncolored.insert(v);
        self.score += score_delta;
        if self.classes[c].is_empty() {
            self.used_colors.remove(&c);
            self.freed_colors.push(c);
        }
        self.refresh_free_colors_after_move(v, c, max_changed, graph);
        c
    }

    /// Applies a full move (uncolor then recolor); equivalent to
    /// `delete_from` followed by `add_to` but keeps the call site terse.
    pub fn apply_move(&mut self, v: VertexId, target: ColorTarget, graph: &Graph) {
        if self.color[v].is_some() {
            self.delete_from(v, graph);
        }
        self.add_to(v, target, graph);
    }

    /// Resets every edge weight to 1. Recomputes `conflict`/`penalty` from
    /// scratch since edge weight changes affect every conflicting pair at
    /// once.
    pub fn reset_edge_weights(&mut self, graph: &Graph) {
        self.edge_weight.clear();
        self.rebuild_conflicts_and_penalty(graph);
    }

    /// RedLS support: every currently-conflicting edge's weight increases by
    /// 1 (both directions), and `penalty` increases by the number of such
    /// edges.
    pub fn increment_edge_weights(&mut self, graph: &Graph) {
        let edges: Vec<(VertexId, VertexId)> =
            self.conflict_edges.iter().filter(|(u, v)| u < v).copied().collect();
        for (u, v) in edges {
            let key = edge_key(u, v);
            let w = self.edge_weight.entry(key).or_insert(1);
            *w += 1;
            if let Some(c) = self.color[u] {
                if self.color[v] == Some(c) {
                    self.conflict[c][u] += 1;
                    self.conflict[c][v] += 1;
                    self.penalty += 1;
                }
            }
        }
    }

    fn rebuild_conflicts_and_penalty(&mut self, graph: &Graph) {
        for row in &mut self.conflict {
            row.iter_mut().for_each(|x| *x = 0);
        }
        self.penalty = 0;
        self.conflict_edges.clear();
        for v in 0..self.n {
            if let Some(cv) = self.color[v] {
                for &u in graph.neighbors(v) {
                    let ew = self.edge_weight(u, v);
                    self.conflict[cv][u] += ew;
                }
            }
        }
        for &(u, v) in graph.edges() {
            if let (Some(cu), Some(cv)) = (self.color[u], self.color[v]) {
                if cu == cv {
                    self.penalty += self.edge_weight(u, v);
                    self.conflict_edges.insert((u, v));
                    self.conflict_edges.insert((v, u));
                }
            }
        }
        for v in 0..self.n {
            self.recompute_free_colors(v, graph);
        }
    }

    /// Full O(n^2) audit: recomputes every derived field from `color` alone
    /// and checks it matches the incrementally maintained state. Compiled
    /// unconditionally so tests can call it directly; call sites should
    /// gate on `cfg!(debug_assertions)`.
    pub fn check_solution(&self, graph: &Graph) -> bool {
        let mut shadow = Assignment::new(graph);
        // Replay colors in a stable order (vertex id) so colors line up
        // structurally with a from-scratch rebuild; since we only check
        // scalar invariants (score/penalty/freeColors/conflict counts),
        // absolute color *indices* need not match, only each vertex's
        // *class content*.
        let mut order: Vec<VertexId> = (0..self.n).filter(|&v| self.color[v].is_some()).collect();
        order.sort_by_key(|&v| self.color[v]);
        // Map original color id -> fresh id assigned in replay order.
        let mut remap = std::collections::HashMap::new();
        for &v in &order {
            let c0 = self.color[v].unwrap();
            let target = match remap.get(&c0) {
                Some(&c) => ColorTarget::Existing(c),
                None => ColorTarget::New,
            };
            let used = shadow.add_to(v, target, graph);
            remap.entry(c0).or_insert(used);
        }
        if shadow.score != self.score { return false; }
        if shadow.penalty != self.penalty { return false; }
        for v in 0..self.n {
            if shadow.has_conflicts(v) != self.has_conflicts(v) { return false; }
            if shadow.free_colors(v) != self.free_colors(v) { return false; }
        }
        if shadow.n_used_colors() != self.n_used_colors() { return false; }
        for (&c0, &c1) in &remap {
            for v in 0..self.n {
                if self.conflicts(c0, v) != shadow.conflicts(c1, v) { return false; }
            }
        }
        let self_edges: HashSet<(VertexId, VertexId)> = self.conflict_edges().copied().collect();
        let shadow_edges: HashSet<(VertexId, VertexId)> = shadow.conflict_edges().copied().collect();
        if self_edges != shadow_edges { return false; }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Graph {
        Graph::new("k3", vec![vec![1, 2], vec![0, 2], vec![0, 1]], vec![3, 2, 1])
    }

    fn path4() -> Graph {
        // a-b-c-d, weights (5,4,3,2)
        Graph::new("p4", vec![vec![1], vec![0, 2], vec![1, 3], vec![2]], vec![5, 4, 3, 2])
    }

    #[test]
    fn coloring_triangle_optimally_scores_six() {
        let g = triangle();
        let mut a = Assignment::new(&g);
        a.add_to(0, ColorTarget::New, &g);
        a.add_to(1, ColorTarget::New, &g);
        a.add_to(2, ColorTarget::New, &g);
        assert_eq!(a.score(), 6);
        assert_eq!(a.penalty(), 0);
        assert!(a.check_solution(&g));
    }

    #[test]
    fn partition_path4_scores_nine() {
        let g = path4();
        let mut a = Assignment::new(&g);
        a.add_to(0, ColorTarget::New, &g); // a -> color 0
        a.add_to(2, ColorTarget::Existing(0), &g); // c -> color 0 (non-adjacent to a)
        a.add_to(1, ColorTarget::New, &g); // b -> color 1
        a.add_to(3, ColorTarget::Existing(1), &g); // d -> color 1
        assert_eq!(a.penalty(), 0);
        assert_eq!(a.score(), 9);
        assert!(a.check_solution(&g));
    }

    #[test]
    fn delta_score_matches_applied_move() {
        let g = triangle();
        let mut a = Assignment::new(&g);
        a.add_to(0, ColorTarget::New, &g);
        a.add_to(1, ColorTarget::New, &g);
        let before = a.score();
        let predicted = a.delta_score(2, ColorTarget::Existing(0), &g);
        a.add_to(2, ColorTarget::Existing(0), &g);
        assert_eq!(a.score() - before, predicted);
    }

    #[test]
    fn add_then_delete_restores_state() {
        let g = triangle();
        let mut a = Assignment::new(&g);
        a.add_to(0, ColorTarget::New, &g);
        a.add_to(1, ColorTarget::New, &g);
        let score_before = a.score();
        let penalty_before = a.penalty();
        let free_before = a.free_colors(2);
        a.add_to(2, ColorTarget::Existing(0), &g);
        a.delete_from(2, &g);
        assert_eq!(a.score(), score_before);
        assert_eq!(a.penalty(), penalty_before);
        assert_eq!(a.free_colors(2), free_before);
    }

    #[test]
    fn increment_edge_weights_raises_penalty_by_conflict_count() {
        let g = triangle();
        let mut a = Assignment::new(&g);
        a.add_to(0, ColorTarget::New, &g);
        a.add_to(1, ColorTarget::Existing(0), &g); // conflict: edge (0,1) monochromatic
        assert_eq!(a.penalty(), 1);
        a.increment_edge_weights(&g);
        assert_eq!(a.penalty(), 2);
        assert_eq!(a.edge_weight(0, 1), 2);
    }

    #[test]
    fn available_colors_excludes_conflicting() {
        let g = triangle();
        let mut a = Assignment::new(&g);
        a.add_to(0, ColorTarget::New, &g);
        assert!(a.available_colors(1).is_empty()); // adjacent to 0's color
        a.add_to(1, ColorTarget::New, &g);
        assert_eq!(a.available_colors(2), Vec::<usize>::new()); // adjacent to both
    }

    #[test]
    fn free_colors_counts_nonconflicting_heavy_enough_colors() {
        let g = triangle();
        let mut a = Assignment::new(&g);
        a.add_to(0, ColorTarget::New, &g); // color 0 holds weight 3
        // vertex 2 (weight 1) is adjacent to 0, so color 0 conflicts -> not free
        assert_eq!(a.free_colors(2), 0);
    }
}
