//! The recursive specification interface consumed by the ZDD engine.
//!
//! A specification is a deterministic state machine over the edge levels:
//! [`NodeSpec::root`] yields the initial state and the root level, and
//! [`NodeSpec::child`] advances a state by one edge decision, either
//! continuing at the next level or resolving to a terminal. The engine
//! merges equal states per level, so equal states must mean equal futures.
//!
//! Levels count down: the root sits at level `E` (edge 0) and level 1
//! decides the last edge.

use std::hash::Hash;

/// Outcome of one edge decision.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Branch {
    /// Dead end; the partial selection cannot be completed. Maps to the
    /// 0-terminal.
    Prune,
    /// The path is accepted. Maps to the 1-terminal; only produced at
    /// level 1.
    Accept,
    /// Continue at the given lower level.
    Level(usize),
}

/// A recursive ZDD specification.
pub trait NodeSpec {
    /// Per-path state. States equal under `Eq` are merged by the engine.
    type State: Clone + Eq + Hash;

    /// Initial state and root level.
    fn root(&self) -> (Self::State, usize);

    /// Advances `state` across the edge at `level`, with `take` telling
    /// whether the edge is selected.
    fn child(&self, state: &mut Self::State, level: usize, take: bool) -> Branch;
}

/// Conjunction of two specifications: a path is accepted iff both accept it.
///
/// Both specifications must walk the levels in lockstep (every `child`
/// returning `Level(level - 1)` until level 1), which holds for all the
/// specifications in this crate.
pub struct Intersect<A, B>(pub A, pub B);

impl<A: NodeSpec, B: NodeSpec> NodeSpec for Intersect<A, B> {
    type State = (A::State, B::State);

    fn root(&self) -> (Self::State, usize) {
        let (sa, la) = self.0.root();
        let (sb, lb) = self.1.root();
        assert_eq!(la, lb, "intersected specifications must share the root level");
        ((sa, sb), la)
    }

    fn child(&self, state: &mut Self::State, level: usize, take: bool) -> Branch {
        let ra = self.0.child(&mut state.0, level, take);
        if ra == Branch::Prune {
            return Branch::Prune;
        }
        let rb = self.1.child(&mut state.1, level, take);
        if rb == Branch::Prune {
            return Branch::Prune;
        }
        debug_assert_eq!(ra, rb, "intersected specifications diverged at level {}", level);
        ra
    }
}
