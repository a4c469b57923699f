//! Weighted Vertex Coloring Problem (WVCP) solver: local search and
//! Monte-Carlo Tree Search over an incrementally maintained coloring.

#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unsafe_code)]
#![warn(unused_extern_crates)]
#![warn(variant_size_differences)]

/// the immutable instance: vertices, weights, edges, adjacency
pub mod graph;

/// the incremental coloring state shared by every search
pub mod assignment;

/// process-wide context: graph handle, deadline, best tracker, RNG stream
pub mod context;

/// typed error enum for bad input and internal arithmetic
pub mod error;

/// DIMACS `.col`/`.col.w` instance loading
pub mod dimacs;

/// the four greedy seed policies
pub mod initializers;

/// the six neighborhood-search metaheuristics
pub mod local_search;

/// the Monte-Carlo Tree Search driver
pub mod mcts;

/// command-line surface
pub mod cli;

/// validated run configuration, resolved from the CLI
pub mod config;

/// CSV telemetry emission
pub mod csv_log;

/// the two driver methods (`LocalSearch`, `MCTS`) and their wiring
pub mod driver;
