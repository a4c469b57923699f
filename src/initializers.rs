//! The four greedy seed policies: each walks the graph's pre-sorted vertex
//! order and assigns one vertex at a time, differing only in how they pick
//! a color.

use crate::assignment::{Assignment, ColorTarget};
use crate::context::SearchContext;
use crate::graph::Graph;

/// One of the four seed policies selectable from the CLI
/// (`--initialization`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialization {
    /// uniform over `availableColors(v) ∪ {NEW}`
    Random,
    /// uniform over `availableColors(v)`; always falls back to `NEW` when empty
    Constrained,
    /// `firstAvailableColor(v)`, `NEW` if none
    Deterministic,
    /// always `NEW` — one color per vertex, a legal but terrible upper bound
    Worst,
}

impl Initialization {
    /// Colors every uncolored vertex of `assignment` according to this
    /// policy's rule, walking the graph's pre-sorted order.
    pub fn run(self, assignment: &mut Assignment, graph: &Graph, ctx: &SearchContext) {
        while let Some(v) = assignment.first_uncolored() {
            let target = self.choose_color(assignment, graph, ctx, v);
            assignment.add_to(v, target, graph);
        }
    }

    fn choose_color(
        self,
        assignment: &Assignment,
        _graph: &Graph,
        ctx: &SearchContext,
        v: usize,
    ) -> ColorTarget {
        match self {
            Initialization::Random => {
                let mut choices = assignment.available_colors(v);
                choices.push(usize::MAX); // sentinel for NEW, see below
                let idx = ctx.rng.borrow_mut().gen_range(0..choices.len());
                match choices[idx] {
                    usize::MAX => ColorTarget::New,
                    c => ColorTarget::Existing(c),
                }
            }
            Initialization::Constrained => {
                let choices = assignment.available_colors(v);
                if choices.is_empty() {
                    ColorTarget::New
                } else {
                    let idx = ctx.rng.borrow_mut().gen_range(0..choices.len());
                    ColorTarget::Existing(choices[idx])
                }
            }
            Initialization::Deterministic => match assignment.first_available_color(v) {
                Some(c) => ColorTarget::Existing(c),
                None => ColorTarget::New,
            },
            Initialization::Worst => ColorTarget::New,
        }
    }
}

impl std::str::FromStr for Initialization {
    type Err = crate::error::WvcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Initialization::Random),
            "constrained" => Ok(Initialization::Constrained),
            "deterministic" => Ok(Initialization::Deterministic),
            "worst" => Ok(Initialization::Worst),
            other => Err(crate::error::WvcpError::UnknownEnumValue {
                flag: "initialization".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

use rand::Rng;

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use std::time::Duration;

    fn triangle() -> Graph {
        Graph::new("k3", vec![vec![1, 2], vec![0, 2], vec![0, 1]], vec![3, 2, 1])
    }

    fn ctx(graph: &Graph) -> SearchContext {
        SearchContext::new(Rc::new(clone_graph(graph)), 1, Duration::from_secs(5))
    }

    fn clone_graph(g: &Graph) -> Graph {
        let adj: Vec<Vec<usize>> = (0..g.n()).map(|v| g.neighbors(v).to_vec()).collect();
        let w: Vec<u32> = (0..g.n()).map(|v| g.weight(v)).collect();
        Graph::new(g.name(), adj, w)
    }

    #[test]
    fn worst_opens_one_color_per_vertex() {
        let g = triangle();
        let c = ctx(&g);
        let mut a = Assignment::new(&g);
        Initialization::Worst.run(&mut a, &g, &c);
        assert_eq!(a.n_used_colors(), 3);
        assert_eq!(a.score(), 6);
        assert!(a.check_solution(&g));
    }

    #[test]
    fn deterministic_is_legal_and_complete() {
        let g = triangle();
        let c = ctx(&g);
        let mut a = Assignment::new(&g);
        Initialization::Deterministic.run(&mut a, &g, &c);
        assert_eq!(a.penalty(), 0);
        assert!(a.check_solution(&g));
    }

    #[test]
    fn constrained_never_leaves_a_conflict() {
        let g = triangle();
        let c = ctx(&g);
        let mut a = Assignment::new(&g);
        Initialization::Constrained.run(&mut a, &g, &c);
        assert_eq!(a.penalty(), 0);
    }

    #[test]
    fn random_is_always_a_legal_full_coloring() {
        let g = triangle();
        let c = ctx(&g);
        let mut a = Assignment::new(&g);
        Initialization::Random.run(&mut a, &g, &c);
        assert_eq!(a.penalty(), 0);
        assert!(a.check_solution(&g));
    }
}
