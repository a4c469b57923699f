//! The six neighborhood-search metaheuristics sharing one [`Assignment`]:
//! HillClimbing, TabuWeight, TabuCol, AFISA (two variants), RedLS, ILSTS.
//!
//! All of them enumerate candidate moves by reading [`Assignment`] deltas
//! *without* applying them, pick one under their own rule, then apply it
//! with [`Assignment::apply_move`]. All poll a *sub-method deadline* = the
//! earlier of the global deadline and `method-start + max_local_search_time`,
//! and may report improvements through a [`ProgressSink`].

mod afisa;
mod hill_climbing;
mod ilsts;
mod redls;
mod tabu_col;
mod tabu_weight;

use std::time::Instant;

use crate::assignment::{Assignment, ColorTarget};
use crate::context::SearchContext;
use crate::graph::{Graph, VertexId};

/// A candidate move, read but not yet applied: the vertex, its target color,
/// and the score the assignment would have after applying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    /// vertex to (re)color
    pub vertex: VertexId,
    /// color target (existing or NEW)
    pub target: ColorTarget,
    /// `score()` the assignment would have after applying this move
    pub resulting_score: i32,
}

/// Receives improvement notifications from a running local search so the
/// driver can emit CSV lines without the search itself owning any I/O.
pub trait ProgressSink {
    /// Called whenever a local search finds a strictly better legal (penalty
    /// zero) solution than any previously reported in this run.
    fn on_improvement(&mut self, turn: u64, assignment: &Assignment, graph: &Graph);
}

/// A [`ProgressSink`] that does nothing; used when a local search runs as an
/// MCTS playout's simulation step, where only the final score matters.
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_improvement(&mut self, _turn: u64, _assignment: &Assignment, _graph: &Graph) {}
}

/// One of the six local searches selectable from the CLI (`--local_search`),
/// plus `none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalSearchKind {
    /// no local search: the seeded assignment is the final answer
    None,
    /// steepest-descent hill climbing
    HillClimbing,
    /// tabu search over per-vertex tenures, minimizing score directly
    TabuWeight,
    /// tabu search minimizing conflicts to reach a target color count
    TabuCol,
    /// per-(vertex,color) tabu variant
    AfisaOriginal,
    /// per-vertex tabu variant
    Afisa,
    /// weighted-edge candidate-set local search
    RedLs,
    /// iterated local search with tabu-guarded moves
    Ilsts,
}

impl std::str::FromStr for LocalSearchKind {
    type Err = crate::error::WvcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(LocalSearchKind::None),
            "hill_climbing" => Ok(LocalSearchKind::HillClimbing),
            "tabu_weight" => Ok(LocalSearchKind::TabuWeight),
            "tabu_col" => Ok(LocalSearchKind::TabuCol),
            "afisa" => Ok(LocalSearchKind::Afisa),
            "afisa_original" => Ok(LocalSearchKind::AfisaOriginal),
            "redls" => Ok(LocalSearchKind::RedLs),
            "ilsts" => Ok(LocalSearchKind::Ilsts),
            other => Err(crate::error::WvcpError::UnknownEnumValue {
                flag: "local_search".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl LocalSearchKind {
    /// Runs this local search on `assignment` until its sub-method deadline,
    /// its iteration budget, or (when not `None`) its own stopping rule
    /// fires. `max_local_search_time` bounds the sub-method deadline;
    /// `nb_iter_local_search` bounds outer-loop turns where applicable.
    /// Reports improvements through `sink`.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        self,
        assignment: &mut Assignment,
        graph: &Graph,
        ctx: &SearchContext,
        max_local_search_time: std::time::Duration,
        nb_iter_local_search: u64,
        target: Option<i32>,
        sink: &mut dyn ProgressSink,
    ) {
        let sub_deadline = ctx.deadline.sub_deadline(max_local_search_time);
        match self {
            LocalSearchKind::None => {}
            LocalSearchKind::HillClimbing => {
                hill_climbing::run(assignment, graph, ctx, sub_deadline, target, sink)
            }
            LocalSearchKind::TabuWeight => {
                tabu_weight::run(assignment, graph, ctx, sub_deadline, nb_iter_local_search, target, sink)
            }
            LocalSearchKind::TabuCol => {
                tabu_col::run(assignment, graph, ctx, sub_deadline, nb_iter_local_search, sink)
            }
            LocalSearchKind::Afisa => {
                afisa::run(assignment, graph, ctx, sub_deadline, nb_iter_local_search, target, false, sink)
            }
            LocalSearchKind::AfisaOriginal => {
                afisa::run(assignment, graph, ctx, sub_deadline, nb_iter_local_search, target, true, sink)
            }
            LocalSearchKind::RedLs => {
                redls::run(assignment, graph, ctx, sub_deadline, nb_iter_local_search, target, sink)
            }
            LocalSearchKind::Ilsts => {
                ilsts::run(assignment, graph, ctx, sub_deadline, nb_iter_local_search, target, sink)
            }
        }
    }
}

/// `true` once `now()` has passed `sub_deadline` (glossary "deadline poll").
pub(crate) fn deadline_reached(sub_deadline: Instant) -> bool {
    Instant::now() >= sub_deadline
}

/// Vertices currently colored, in ascending id order — the move generators
/// below all range over these (uncolored vertices are an MCTS/ILSTS-internal
/// concept, not something a local search ever sees once seeded).
pub(crate) fn colored_vertices(assignment: &Assignment) -> impl Iterator<Item = VertexId> + '_ {
    (0..assignment.n()).filter(move |&v| assignment.color_of(v).is_some())
}

/// Picks a uniformly random element of a non-empty slice from the context's
/// process-wide RNG stream: tabu tenures and tie-breaks all draw from this
/// single stream in call order, so seeded runs reproduce.
pub(crate) fn choose<'a, T>(ctx: &SearchContext, items: &'a [T]) -> &'a T {
    use rand::Rng;
    let idx = ctx.rng.borrow_mut().gen_range(0..items.len());
    &items[idx]
}
