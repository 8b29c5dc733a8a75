//! Frontier-based ZDD specification of all spanning trees.
//!
//! The state is one component representative per frontier slot. Selecting an
//! edge whose endpoints already share a representative would close a cycle
//! and prunes; otherwise the two components merge to the larger
//! representative. When a vertex leaves the frontier it must share its
//! component with some vertex that stays behind, or the partial subgraph
//! could never become connected. This witness check is what makes global
//! connectedness enforceable with only frontier-local state.

use crate::frontier::FrontierManager;
use crate::graph::Graph;
use crate::spec::{Branch, NodeSpec};

/// Component representative of a retired frontier slot.
const RETIRED: i16 = -1;

/// ZDD specification whose accepted paths are exactly the spanning trees of
/// the graph, in edge input order.
pub struct SpanningTrees<'a> {
    graph: &'a Graph,
    fm: FrontierManager,
    num_edges: usize,
}

impl<'a> SpanningTrees<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        assert!(
            graph.vertex_count() <= i16::MAX as usize,
            "vertex identifiers must fit the component state"
        );
        Self {
            graph,
            fm: FrontierManager::new(graph),
            num_edges: graph.edge_count(),
        }
    }

    fn comp(&self, state: &[i16], v: u32) -> i16 {
        state[self.fm.slot(v)]
    }

    fn set_comp(&self, state: &mut [i16], v: u32, c: i16) {
        state[self.fm.slot(v)] = c;
    }
}

impl NodeSpec for SpanningTrees<'_> {
    type State = Vec<i16>;

    fn root(&self) -> (Self::State, usize) {
        (vec![0; self.fm.max_frontier_size()], self.num_edges)
    }

    fn child(&self, state: &mut Self::State, level: usize, take: bool) -> Branch {
        let i = self.num_edges - level;
        let (a, b) = self.graph.endpoints(i);

        // Vertices entering the frontier start in their own component.
        for &x in self.fm.entering(i) {
            self.set_comp(state, x, x as i16);
        }

        if take {
            let ca = self.comp(state, a);
            let cb = self.comp(state, b);
            if ca == cb {
                // The selected edge closes a cycle.
                return Branch::Prune;
            }
            let cmin = ca.min(cb);
            let cmax = ca.max(cb);
            for &w in self.fm.frontier(i) {
                if self.comp(state, w) == cmin {
                    self.set_comp(state, w, cmax);
                }
            }
        }

        if level == 1 {
            // The whole frontier has collapsed onto the endpoints of the
            // last edge; a single shared component means the selection
            // spans the graph.
            return if self.comp(state, a) == self.comp(state, b) {
                Branch::Accept
            } else {
                Branch::Prune
            };
        }

        let leaving = self.fm.leaving(i);
        for (idx, &x) in leaving.iter().enumerate() {
            let mut witness = false;
            for &w in self.fm.frontier(i) {
                if w == x || leaving[..idx].contains(&w) {
                    continue;
                }
                if self.comp(state, x) == self.comp(state, w) {
                    witness = true;
                    break;
                }
            }
            if !witness {
                // The vertex would leave as an isolated island.
                return Branch::Prune;
            }
            self.set_comp(state, x, RETIRED);
        }

        Branch::Level(level - 1)
    }
}
