//! Frontier bookkeeping for the ordered edge list.
//!
//! While the ZDD builder sweeps the edges in input order, only the vertices
//! whose incidence range straddles the current step carry state. The
//! [`FrontierManager`] precomputes, for every edge step, the vertices that
//! enter the frontier at that step, the vertices that leave after it, and
//! the full frontier during it. Each vertex is assigned a positional slot
//! valid for its whole stay on the frontier; slots are reused once freed, so
//! the state array of the spanning-tree specification stays as small as the
//! widest frontier.

use crate::graph::Graph;

const NO_SLOT: usize = usize::MAX;

/// Per-step frontier sets and vertex slots, derived once from a [`Graph`].
#[derive(Debug, Clone)]
pub struct FrontierManager {
    entering: Vec<Vec<u32>>,
    leaving: Vec<Vec<u32>>,
    frontier: Vec<Vec<u32>>,
    slot: Vec<usize>,
    max_frontier_size: usize,
}

impl FrontierManager {
    pub fn new(graph: &Graph) -> Self {
        let e = graph.edge_count();
        let v = graph.vertex_count();

        // A vertex enters at its minimum-indexed incident edge and leaves
        // after its maximum-indexed one.
        let mut first = vec![usize::MAX; v];
        let mut last = vec![0usize; v];
        for (i, &(a, b)) in graph.edges().iter().enumerate() {
            for x in [a as usize, b as usize] {
                if first[x] == usize::MAX {
                    first[x] = i;
                }
                last[x] = i;
            }
        }

        let mut entering = vec![Vec::new(); e];
        let mut leaving = vec![Vec::new(); e];
        let mut frontier = vec![Vec::new(); e];
        let mut slot = vec![NO_SLOT; v];
        let mut occupied: Vec<bool> = Vec::new();
        let mut active: Vec<u32> = Vec::new();
        let mut max_frontier_size = 0;

        for (i, &(a, b)) in graph.edges().iter().enumerate() {
            for x in [a, b] {
                if first[x as usize] == i && slot[x as usize] == NO_SLOT {
                    let s = occupied
                        .iter()
                        .position(|&taken| !taken)
                        .unwrap_or_else(|| {
                            occupied.push(false);
                            occupied.len() - 1
                        });
                    occupied[s] = true;
                    slot[x as usize] = s;
                    entering[i].push(x);
                    active.push(x);
                }
            }

            frontier[i] = active.clone();
            max_frontier_size = max_frontier_size.max(active.len());

            for x in [a, b] {
                if last[x as usize] == i && !leaving[i].contains(&x) {
                    leaving[i].push(x);
                }
            }
            for &x in &leaving[i] {
                occupied[slot[x as usize]] = false;
                active.retain(|&w| w != x);
            }
        }

        debug_assert!(active.is_empty(), "all vertices must leave by the last edge");

        Self {
            entering,
            leaving,
            frontier,
            slot,
            max_frontier_size,
        }
    }

    /// Vertices entering the frontier at edge step `i`.
    pub fn entering(&self, i: usize) -> &[u32] {
        &self.entering[i]
    }

    /// Vertices leaving the frontier after edge step `i`.
    pub fn leaving(&self, i: usize) -> &[u32] {
        &self.leaving[i]
    }

    /// Vertices on the frontier while edge step `i` is processed, including
    /// the ones entering at `i` and the ones leaving after it.
    pub fn frontier(&self, i: usize) -> &[u32] {
        &self.frontier[i]
    }

    /// The slot of vertex `v`, valid for the steps where `v` is on the
    /// frontier. Slots are reused between vertices with disjoint stays.
    pub fn slot(&self, v: u32) -> usize {
        let s = self.slot[v as usize];
        debug_assert_ne!(s, NO_SLOT, "vertex {} never enters the frontier", v);
        s
    }

    /// The widest frontier over all steps; the state array size of the
    /// spanning-tree specification.
    pub fn max_frontier_size(&self) -> usize {
        self.max_frontier_size
    }
}
