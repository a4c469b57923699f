//! Immutable, process-wide graph: vertices, weights, edges, adjacency.
//!
//! Generalizes the coloring-only `CompactInstance` this crate evolved from
//! with a per-vertex weight, giving the Weighted Vertex Coloring Problem
//! (WVCP) instance; unit weights degrade this to the classical Graph
//! Coloring Problem (GCP).

use bit_set::BitSet;

/// Vertex identifier, 0-based.
pub type VertexId = usize;

/// Immutable graph built once from an edge list and a weight list.
///
/// Vertices are expected to already be sorted in non-increasing
/// `(weight, degree)` order by the loader — initializers rely on this order
/// to produce "constrained" colorings. The loader does not re-sort;
/// [`Graph::new`] only validates the contract.
#[derive(Debug)]
pub struct Graph {
    name: String,
    n: usize,
    m: usize,
    edges: Vec<(VertexId, VertexId)>,
    adj_list: Vec<Vec<VertexId>>,
    adj_matrix: Vec<BitSet>,
    degree: Vec<usize>,
    weight: Vec<u32>,
}

impl Graph {
    /// Builds a graph from an adjacency list and a per-vertex weight list.
    ///
    /// Does not check the `(weight, degree)` sort contract itself — callers
    /// going through [`crate::dimacs`] get that validation for free; this
    /// constructor is also used directly by tests with small hand-built
    /// instances that are already in the required order.
    pub fn new(name: impl Into<String>, adj_list: Vec<Vec<VertexId>>, weight: Vec<u32>) -> Self {
        let n = adj_list.len();
        assert_eq!(weight.len(), n, "Graph::new: one weight per vertex required");
        let degree: Vec<usize> = adj_list.iter().map(Vec::len).collect();
        let m = degree.iter().sum::<usize>() / 2;
        let edges = Self::build_edges(&adj_list);
        let adj_matrix = Self::build_adj_matrix(&adj_list);
        Self { name: name.into(), n, m, edges, adj_list, adj_matrix, degree, weight }
    }

    fn build_edges(adj_list: &[Vec<VertexId>]) -> Vec<(VertexId, VertexId)> {
        let mut res = Vec::new();
        for (i, l) in adj_list.iter().enumerate() {
            for j in l {
                if i < *j {
                    res.push((i, *j));
                }
            }
        }
        res
    }

    fn build_adj_matrix(adj_list: &[Vec<VertexId>]) -> Vec<BitSet> {
        let n = adj_list.len();
        let mut res = vec![BitSet::with_capacity(n); n];
        for (u, neighbors) in adj_list.iter().enumerate() {
            for &v in neighbors {
                res[u].insert(v);
            }
        }
        res
    }

    /// Instance name, typically the file stem used for CSV telemetry.
    pub fn name(&self) -> &str { &self.name }

    /// Number of vertices.
    pub fn n(&self) -> usize { self.n }

    /// Number of edges.
    pub fn m(&self) -> usize { self.m }

    /// Stable slice of the neighbors of `v`.
    pub fn neighbors(&self, v: VertexId) -> &[VertexId] { &self.adj_list[v] }

    /// Degree of `v`.
    pub fn degree(&self, v: VertexId) -> usize { self.degree[v] }

    /// Weight of `v`.
    pub fn weight(&self, v: VertexId) -> u32 { self.weight[v] }

    /// O(1) adjacency test.
    pub fn adjacent(&self, u: VertexId, v: VertexId) -> bool { self.adj_matrix[u].contains(v) }

    /// Full edge list, each unordered edge once with `u < v`.
    pub fn edges(&self) -> &[(VertexId, VertexId)] { &self.edges }

    /// Verifies the vertices are listed in non-increasing `(weight, degree)`
    /// order, the contract every loaded instance must satisfy.
    pub fn check_sorted_contract(&self) -> bool {
        (1..self.n).all(|i| {
            let prev = (self.weight[i - 1], self.degree[i - 1]);
            let cur = (self.weight[i], self.degree[i]);
            prev >= cur
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Graph {
        // K3 with weights (3,2,1), already in non-increasing (weight,degree) order.
        Graph::new("k3", vec![vec![1, 2], vec![0, 2], vec![0, 1]], vec![3, 2, 1])
    }

    #[test]
    fn builds_adjacency_and_degree() {
        let g = triangle();
        assert_eq!(g.n(), 3);
        assert_eq!(g.m(), 3);
        assert_eq!(g.degree(0), 2);
        assert!(g.adjacent(0, 1));
        assert!(!g.adjacent(0, 0));
    }

    #[test]
    fn sorted_contract_holds_for_triangle() {
        assert!(triangle().check_sorted_contract());
    }

    #[test]
    fn sorted_contract_detects_violation() {
        let g = Graph::new("bad", vec![vec![1], vec![0]], vec![1, 2]);
        assert!(!g.check_sorted_contract());
    }
}
