//! The MCTS tree. An arena (`Vec<Node>` indexed by `usize`) rather than
//! `Rc<RefCell<Node>>` with parent back-references, since ownership only
//! ever flows root-to-leaves and cycles can't form.

use std::time::Instant;

use crate::assignment::{Assignment, ColorTarget};
use crate::context::SearchContext;
use crate::graph::{Graph, VertexId};
use crate::initializers::Initialization;
use crate::local_search::{LocalSearchKind, Move, NullSink};

/// `color` as an `i64` sort/tabu key: `NEW` sorts as `-1`.
fn color_key(target: ColorTarget) -> i64 {
    match target {
        ColorTarget::Existing(c) => c as i64,
        ColorTarget::New => -1,
    }
}

/// Every legal move at the next unassigned vertex whose resulting score
/// stays strictly below the current global best, sorted ascending by
/// `(score, color)` so that repeatedly
/// calling [`Vec::pop`] yields the worst move first and the single most
/// promising move last.
fn next_possible_moves(assignment: &Assignment, graph: &Graph, ctx: &SearchContext) -> Vec<Move> {
    let mut moves = Vec::new();
    let Some(v) = assignment.first_uncolored() else {
        return moves;
    };
    for c in assignment.used_colors() {
        if assignment.conflicts(c, v) != 0 {
            continue;
        }
        let resulting_score = assignment.score() + assignment.delta_score(v, ColorTarget::Existing(c), graph);
        if resulting_score < ctx.best.score() {
            moves.push(Move { vertex: v, target: ColorTarget::Existing(c), resulting_score });
        }
    }
    let new_score = assignment.score() + graph.weight(v) as i32;
    if new_score < ctx.best.score() {
        moves.push(Move { vertex: v, target: ColorTarget::New, resulting_score: new_score });
    }
    moves.sort_by(|a, b| {
        a.resulting_score.cmp(&b.resulting_score).then(color_key(a.target).cmp(&color_key(b.target)))
    });
    moves
}

/// Colors `v` (the assignment's next free vertex) with `mv`'s target.
fn apply_move(assignment: &mut Assignment, graph: &Graph, mv: Move) {
    assignment.add_to(mv.vertex, mv.target, graph);
    debug_assert_eq!(assignment.score(), mv.resulting_score);
}

/// One tree node: a weak back-reference to its parent, the move that led to
/// it, its own untried-move stack, owned children, and UCB1 statistics.
#[derive(Debug)]
struct Node {
    parent: Option<usize>,
    incoming: Move,
    untried: Vec<Move>,
    children: Vec<usize>,
    visits: u64,
    value_sum: f64,
    depth: u32,
    fully_explored: bool,
}

impl Node {
    fn terminal(&self) -> bool {
        self.untried.is_empty()
    }
}

/// Owns every [`Node`] by index; the root is always index 0.
#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn root(&self) -> &Node {
        &self.nodes[0]
    }

    fn push(&mut self, parent: Option<usize>, incoming: Move, untried: Vec<Move>, depth: u32) -> usize {
        let fully_explored = untried.is_empty();
        let idx = self.nodes.len();
        self.nodes.push(Node { parent, incoming, untried, children: Vec::new(), visits: 0, value_sum: 0.0, depth, fully_explored });
        idx
    }

    /// UCB1: exploitation normalized by the
    /// global best score, plus an exploration term weighted by `c`
    /// (`--coeff_exploi_explo`). Unvisited children always win ties so every
    /// child gets simulated at least once before any is revisited.
    fn ucb1(&self, child: usize, parent_visits: u64, best_score: i32, c: f64) -> f64 {
        let node = &self.nodes[child];
        if node.visits == 0 {
            return f64::INFINITY;
        }
        let avg = node.value_sum / node.visits as f64;
        let exploit = if best_score != 0 { (best_score as f64 - avg) / best_score as f64 } else { 0.0 };
        let explore = c * ((parent_visits as f64).ln() / node.visits as f64).sqrt();
        exploit + explore
    }

    /// Selects the best live (non-fully-explored) UCB1 child, ties broken
    /// uniformly. A fully explored child has nothing left to offer and must
    /// never be re-entered — pruning never drops a node whose incoming
    /// move's score is still below the current global best, but a fully
    /// explored live node is simply dead weight for selection.
    fn best_child(&self, idx: usize, best_score: i32, c: f64, ctx: &SearchContext) -> usize {
        let node = &self.nodes[idx];
        let parent_visits = node.visits.max(1);
        let mut best: Vec<usize> = Vec::new();
        let mut best_ucb = f64::NEG_INFINITY;
        for &child in &node.children {
            if self.nodes[child].fully_explored {
                continue;
            }
            let score = self.ucb1(child, parent_visits, best_score, c);
            if score > best_ucb {
                best_ucb = score;
                best = vec![child];
            } else if score == best_ucb {
                best.push(child);
            }
        }
        use rand::Rng;
        let i = ctx.rng.borrow_mut().gen_range(0..best.len());
        best[i]
    }

    /// Drops every child whose incoming move's score is no longer strictly
    /// below `new_best`, recomputing `fully_explored` bottom-up.
    fn clean_graph(&mut self, idx: usize, new_best: i32) {
        let children = std::mem::take(&mut self.nodes[idx].children);
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            if self.nodes[child].incoming.resulting_score >= new_best {
                continue;
            }
            self.clean_graph(child, new_best);
            kept.push(child);
        }
        self.nodes[idx].children = kept;
        self.recompute_fully_explored(idx);
    }

    fn recompute_fully_explored(&mut self, idx: usize) {
        let node = &self.nodes[idx];
        if !node.terminal() {
            return;
        }
        let fe = node.children.iter().all(|&c| self.nodes[c].fully_explored);
        if self.nodes[idx].fully_explored != fe {
            self.nodes[idx].fully_explored = fe;
            if let Some(p) = self.nodes[idx].parent {
                self.recompute_fully_explored(p);
            }
        }
    }
}

/// The simulation policy attached to the MCTS driver method (`--simulation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationPolicy {
    /// always runs the configured local search (or none, per `--local_search none`)
    Greedy,
    /// runs the local search only when the playout is far enough from every past one
    Fit,
    /// runs the local search only past a depth threshold
    Depth,
    /// combines `Depth` and `Fit`
    DepthFit,
}

impl std::str::FromStr for SimulationPolicy {
    type Err = crate::error::WvcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greedy" => Ok(SimulationPolicy::Greedy),
            "fit" => Ok(SimulationPolicy::Fit),
            "depth" => Ok(SimulationPolicy::Depth),
            "depth_fit" => Ok(SimulationPolicy::DepthFit),
            other => Err(crate::error::WvcpError::UnknownEnumValue { flag: "simulation".to_string(), value: other.to_string() }),
        }
    }
}

/// Per-run state a simulation policy needs, held in a helper owned by the
/// driver rather than at file scope.
#[derive(Debug, Default)]
struct SimulationHelper {
    past_solutions: Vec<Vec<Option<usize>>>,
    fit_condition: i32,
}

impl SimulationHelper {
    fn new() -> Self {
        Self { past_solutions: Vec::new(), fit_condition: i32::MAX }
    }

    fn far_enough(&self, assignment: &Assignment, graph: &Graph) -> bool {
        let n = graph.n() as i32;
        self.past_solutions.iter().all(|past| distance_approximation(past, assignment, graph) > n / 10)
    }

    fn remember(&mut self, assignment: &Assignment) {
        self.past_solutions.push((0..assignment.n()).map(|v| assignment.color_of(v)).collect());
    }
}

/// `n` minus the size of the greedy row-argmax alignment between two
/// colorings' co-occurrence matrix.
fn distance_approximation(past: &[Option<usize>], current: &Assignment, graph: &Graph) -> i32 {
    let max_k = past.iter().flatten().copied().max().unwrap_or(0).max(current.n_colors()).max(1) + 1;
    let mut same_color = vec![vec![0i32; max_k]; max_k];
    let mut maxi = vec![0i32; max_k];
    let mut sigma = vec![0usize; max_k];
    for v in 0..graph.n() {
        let (Some(a), Some(b)) = (past[v], current.color_of(v)) else { continue };
        same_color[a][b] += 1;
        if same_color[a][b] > maxi[a] {
            maxi[a] = same_color[a][b];
            sigma[a] = b;
        }
    }
    let matched: i32 = (0..max_k).map(|c| same_color[c][sigma[c]]).sum();
    graph.n() as i32 - matched
}

/// Whether enough of the tree path is placed to bother running local search
/// at all (`MCTS.cpp:69-71`'s `can_perform_ls`, ported to §9's depth-gated
/// guard): `depth` is the number of vertices placed by tree selection and
/// expansion alone, captured before the initializer fills in the rest, so
/// this stays meaningful even though `assignment` is always fully colored by
/// the time it reaches here.
fn can_perform_ls(depth: u32, graph: &Graph) -> bool {
    depth as f64 > graph.n() as f64 * 0.10
}

fn run_simulation(
    policy: SimulationPolicy,
    assignment: &mut Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    local_search: LocalSearchKind,
    max_local_search_time: std::time::Duration,
    nb_iter_local_search: u64,
    helper: &mut SimulationHelper,
    depth: u32,
) {
    if !can_perform_ls(depth, graph) {
        return;
    }
    let mut sink = NullSink;
    let run_ls = |assignment: &mut Assignment, sink: &mut NullSink| {
        local_search.run(assignment, graph, ctx, max_local_search_time, nb_iter_local_search, None, sink);
    };
    match policy {
        SimulationPolicy::Greedy => run_ls(assignment, &mut sink),
        SimulationPolicy::Fit => {
            if assignment.score() <= helper.fit_condition + 1 && helper.far_enough(assignment, graph) {
                helper.remember(assignment);
                helper.fit_condition = helper.fit_condition.min(assignment.score());
                run_ls(assignment, &mut sink);
            }
        }
        SimulationPolicy::Depth => {
            use rand::Rng;
            let roll = ctx.rng.borrow_mut().gen_range(0..=100);
            if ((depth as u64 * 100) / graph.n() as u64) as i32 >= roll && helper.far_enough(assignment, graph) {
                helper.remember(assignment);
                run_ls(assignment, &mut sink);
            }
        }
        SimulationPolicy::DepthFit => {
            use rand::Rng;
            let roll = ctx.rng.borrow_mut().gen_range(0..=100);
            if assignment.score() <= helper.fit_condition + 1
                && ((depth as u64 * 100) / graph.n() as u64) as i32 <= roll
                && helper.far_enough(assignment, graph)
            {
                helper.remember(assignment);
                helper.fit_condition = helper.fit_condition.min(assignment.score());
                run_ls(assignment, &mut sink);
            }
        }
    }
}

/// How MCTS decides to stop (`--objective`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// runs until `target` is reached, the turn/time budget is exhausted, or the tree is exhausted
    Reached,
    /// runs until the root is fully explored, the turn/time budget is exhausted, or `target` is moot
    Optimality,
}

impl std::str::FromStr for StopPolicy {
    type Err = crate::error::WvcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reached" => Ok(StopPolicy::Reached),
            "optimality" => Ok(StopPolicy::Optimality),
            other => Err(crate::error::WvcpError::UnknownEnumValue { flag: "objective".to_string(), value: other.to_string() }),
        }
    }
}

/// Result of one completed MCTS run, enough for the driver's CSV emission.
pub struct McstStats {
    pub turn: u64,
    pub total_nodes: usize,
    pub live_nodes: usize,
    pub tree_height: u32,
    pub depth: u32,
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    base: &mut Assignment,
    graph: &Graph,
    ctx: &SearchContext,
    initialization: Initialization,
    local_search: LocalSearchKind,
    simulation: Option<SimulationPolicy>,
    max_local_search_time: std::time::Duration,
    nb_iter_local_search: u64,
    coeff_exploi_explo: f64,
    max_iterations: u64,
    target: Option<i32>,
    objective: StopPolicy,
    sub_deadline: Instant,
    mut on_improvement: impl FnMut(u64, &Assignment, &McstStats),
) {
    // Seed `bestScore` with a full "worst" coloring's score before generating
    // any move: pruning compares every candidate's resulting score against
    // this bound, so without it the bound would stay at `i32::MAX` only
    // until the *partial* base score came in, which starves move generation
    // on any instance where later partial scores tie the first vertex's.
    let mut worst_upper_bound = base.clone();
    Initialization::Worst.run(&mut worst_upper_bound, graph, ctx);
    ctx.best.try_improve_score(worst_upper_bound.score());

    let first_moves = next_possible_moves(base, graph, ctx);
    let first_move = match first_moves.into_iter().last() {
        Some(m) => m,
        None => return,
    };
    apply_move(base, graph, first_move);

    let root_untried = next_possible_moves(base, graph, ctx);
    let mut tree = Tree { nodes: Vec::new() };
    tree.push(None, first_move, root_untried, 0);

    // `best_assignment` must start as a full legal coloring, not the
    // one-vertex `base`: the loop below only ever replaces it on a strictly
    // better full leaf score, so seeding it from a partial assignment whose
    // score happens to already match the eventual optimum would leave that
    // partial coloring as the final answer forever.
    let mut best_assignment = worst_upper_bound;
    let mut turn: u64 = 0;
    let mut helper = SimulationHelper::new();

    loop {
        let stop = turn >= max_iterations
            || Instant::now() >= sub_deadline
            || ctx.deadline.poll()
            || (objective == StopPolicy::Reached && target.is_some_and(|t| ctx.best.score() <= t))
            || tree.root().fully_explored;
        if stop {
            break;
        }
        turn += 1;

        let mut current = 0usize;
        let mut working = base.clone();

        while tree.nodes[current].terminal() && !tree.nodes[current].children.is_empty() {
            let best_score = ctx.best.score();
            current = tree.best_child(current, best_score, coeff_exploi_explo, ctx);
            apply_move(&mut working, graph, tree.nodes[current].incoming);
        }

        if let Some(mv) = tree.nodes[current].untried.pop() {
            apply_move(&mut working, graph, mv);
            let next_untried = next_possible_moves(&working, graph, ctx);
            let depth = tree.nodes[current].depth + 1;
            if !next_untried.is_empty() || working.uncolored().next().is_some() {
                let child = tree.push(Some(current), mv, next_untried, depth);
                tree.nodes[current].children.push(child);
                current = child;
            }
            tree.recompute_fully_explored(current);
        }

        let path_depth = tree.nodes[current].depth;
        initialization.run(&mut working, graph, ctx);
        if let Some(policy) = simulation {
            run_simulation(policy, &mut working, graph, ctx, local_search, max_local_search_time, nb_iter_local_search, &mut helper, path_depth);
        } else if local_search != LocalSearchKind::None && can_perform_ls(path_depth, graph) {
            let mut sink = NullSink;
            local_search.run(&mut working, graph, ctx, max_local_search_time, nb_iter_local_search, None, &mut sink);
        }

        let leaf_score = working.score();
        let mut node_idx = Some(current);
        while let Some(idx) = node_idx {
            tree.nodes[idx].visits += 1;
            tree.nodes[idx].value_sum += leaf_score as f64;
            node_idx = tree.nodes[idx].parent;
        }

        if leaf_score < best_assignment.score() {
            best_assignment = working;
            ctx.best.try_improve_score(leaf_score);
            tree.clean_graph(0, leaf_score);
            let stats = McstStats {
                turn,
                total_nodes: tree.nodes.len(),
                live_nodes: tree.nodes.iter().filter(|n| !n.fully_explored).count(),
                tree_height: tree.nodes.iter().map(|n| n.depth).max().unwrap_or(0),
                depth: tree.nodes[current].depth,
            };
            on_improvement(turn, &best_assignment, &stats);
        }
    }

    // `best_assignment` is always a full legal coloring (seeded from the
    // worst upper bound, improved only by strictly-better full leaves), while
    // `base` is still only the one-vertex root state; the caller always wants
    // the former.
    *base = best_assignment;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use std::time::Duration;

    fn c4() -> Graph {
        Graph::new("c4", vec![vec![1, 3], vec![0, 2], vec![1, 3], vec![0, 2]], vec![2, 2, 2, 2])
    }

    #[test]
    fn root_has_one_child_on_c4() {
        let g = c4();
        let ctx = SearchContext::new(Rc::new(Graph::new(g.name(), (0..g.n()).map(|v| g.neighbors(v).to_vec()).collect(), (0..g.n()).map(|v| g.weight(v)).collect())), 1, Duration::from_secs(5));
        let mut base = Assignment::new(&g);
        ctx.best.try_improve_score(i32::MAX - 1);
        let first = next_possible_moves(&base, &g, &ctx);
        assert_eq!(first.len(), 1);
        apply_move(&mut base, &g, first[0]);
    }

    #[test]
    fn mcts_finds_legal_coloring_on_c4() {
        let g = c4();
        let ctx = SearchContext::new(Rc::new(Graph::new(g.name(), (0..g.n()).map(|v| g.neighbors(v).to_vec()).collect(), (0..g.n()).map(|v| g.weight(v)).collect())), 1, Duration::from_secs(5));
        let mut base = Assignment::new(&g);
        run(
            &mut base,
            &g,
            &ctx,
            Initialization::Deterministic,
            LocalSearchKind::None,
            None,
            Duration::from_secs(1),
            1000,
            0.5,
            10_000,
            None,
            StopPolicy::Optimality,
            ctx.deadline.sub_deadline(Duration::from_secs(5)),
            |_, _, _| {},
        );
        assert_eq!(base.penalty(), 0);
        assert!(base.check_solution(&g));
    }
}
