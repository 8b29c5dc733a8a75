//! Per-MOPE overlap filter.
//!
//! Each MOPE is a minimal edge set whose complete appearance among the cut
//! edges of an unfolding forces a face overlap. The filter walks the edge
//! sweep with one bit per MOPE edge whose fate is still open: refusing a
//! MOPE edge clears its bit, and once every MOPE edge has been refused the
//! path is pruned. Selecting a MOPE edge into the tree zeroes the whole
//! mask, deactivating the filter for the rest of the path.
//!
//! The prune direction is deliberate: a tree is removed exactly when its
//! cut set covers the whole MOPE. The counting tests pin this behavior.

use crate::bitmask::BitMask;
use crate::spec::{Branch, NodeSpec};

/// ZDD subsetting specification that prunes the trees overlapping via one
/// MOPE. Applied once per MOPE, as a chain of intersections.
pub struct UnfoldingFilter<M> {
    num_edges: usize,
    mask: M,
}

impl<M: BitMask> UnfoldingFilter<M> {
    /// `edges` are the 0-based edge indices of the MOPE; duplicates are
    /// harmless.
    pub fn new(num_edges: usize, edges: &[usize]) -> Self {
        debug_assert!(num_edges <= M::BITS);
        let mut mask = M::default();
        for &edge in edges {
            debug_assert!(edge < num_edges);
            mask |= M::bit(edge);
        }
        Self { num_edges, mask }
    }
}

impl<M: BitMask> NodeSpec for UnfoldingFilter<M> {
    type State = M;

    fn root(&self) -> (M, usize) {
        (self.mask, self.num_edges)
    }

    fn child(&self, state: &mut M, level: usize, take: bool) -> Branch {
        let i = self.num_edges - level;

        if !take {
            if !state.is_zero() {
                *state &= !M::bit(i);
                if state.is_zero() {
                    // Every MOPE edge has been refused.
                    return Branch::Prune;
                }
            }
        } else if !(*state & M::bit(i)).is_zero() {
            // A MOPE edge joined the tree; the MOPE can no longer complete.
            *state = M::default();
        }

        if level == 1 {
            Branch::Accept
        } else {
            Branch::Level(level - 1)
        }
    }
}
