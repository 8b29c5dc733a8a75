//! # unfolding-zdd: counting edge unfoldings with decision diagrams
//!
//! **`unfolding-zdd`** counts, for a convex polyhedron given as its
//! 1-skeleton graph, three successively refined quantities over spanning
//! trees: the number of all spanning trees, the number whose induced edge
//! unfolding has no face overlap, and the number of such unfoldings that
//! are distinct up to the symmetries of the polyhedron.
//!
//! ## How it works
//!
//! A **Zero-suppressed Decision Diagram** over the ordered edge set
//! represents the whole family of spanning trees at once. The diagram is
//! built top-down from a frontier-based specification that tracks
//! connected components with state proportional to the graph's pathwidth,
//! not its size ([`spanning`]). Two subsetting filters refine the family:
//!
//! - [`unfolding`] removes the trees whose unfolding overlaps, one
//!   precomputed minimal overlapping pattern (MOPE) at a time;
//! - [`symmetry`] keeps only the trees fixed by one edge permutation,
//!   which [`burnside`] combines over the automorphism group into the
//!   non-isomorphic count.
//!
//! Counts are exact: diagram cardinality uses [`num_bigint::BigUint`] and
//! the Burnside aggregation works on decimal strings ([`decimal`]).
//!
//! ## Quick Start
//!
//! ```
//! use unfolding_zdd::graph::Graph;
//! use unfolding_zdd::spanning::SpanningTrees;
//! use unfolding_zdd::zdd::Zdd;
//!
//! // The triangle has three spanning trees.
//! let graph = Graph::from_edges(vec![(0, 1), (1, 2), (0, 2)]);
//! let dd = Zdd::build(&SpanningTrees::new(&graph)).reduce();
//! assert_eq!(dd.cardinality().to_string(), "3");
//! ```
//!
//! ## Core Components
//!
//! - **[`zdd`]**: the engine, a level-indexed node arena with the
//!   top-down builder, subsetting operator, reducer, and counting.
//! - **[`spec`]**: the recursive specification interface the engine
//!   consumes; all specifications compose through it.
//! - **[`pipeline`]**: phase drivers, the memory-partitioned variant, and
//!   the structured result.

pub mod bitmask;
pub mod burnside;
pub mod decimal;
pub mod error;
pub mod frontier;
pub mod graph;
pub mod pipeline;
pub mod restrictor;
pub mod spanning;
pub mod spec;
pub mod symmetry;
pub mod unfolding;
pub mod zdd;
