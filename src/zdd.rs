//! The ZDD engine: a level-indexed node arena with a top-down builder, a
//! subsetting operator, a reducer, and multi-precision counting.
//!
//! # Representation
//!
//! Nodes live in per-level pools; a child is addressed by `(row, col)`,
//! never by an owning pointer. Row 0 holds the two terminals (`⊥` at
//! column 0, `⊤` at column 1). Level `E - k` decides edge `k`, so the root
//! of a freshly built diagram sits at row `E`.
//!
//! A freshly built diagram is quasi-reduced: every path steps down one
//! level at a time. [`Zdd::reduce`] then zero-suppresses (`hi = ⊥` nodes
//! collapse onto their `lo` child) and hash-conses per level, after which
//! edges may jump levels; a skipped level means the edge is not selected.
//! Accepted-path counting is preserved by reduction.
//!
//! # Counting
//!
//! Diagrams here routinely hold more than 2^64 accepted paths, so
//! cardinality is accumulated bottom-up in a [`BigUint`] per node.

use std::collections::hash_map::Entry;
use std::fmt;

use log::debug;
use num_bigint::BigUint;
use rustc_hash::FxHashMap;

use crate::spec::{Branch, NodeSpec};

/// Index of a node: level row plus column within the level pool.
///
/// Row 0 is reserved for the terminals.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NodeRef {
    row: u32,
    col: u32,
}

impl NodeRef {
    /// The 0-terminal (empty family).
    pub const ZERO: Self = NodeRef { row: 0, col: 0 };
    /// The 1-terminal (family containing only the empty set).
    pub const ONE: Self = NodeRef { row: 0, col: 1 };

    pub fn new(row: usize, col: usize) -> Self {
        debug_assert!(row > 0, "row 0 is reserved for terminals");
        Self {
            row: row as u32,
            col: col as u32,
        }
    }

    pub fn row(self) -> usize {
        self.row as usize
    }

    pub fn col(self) -> usize {
        self.col as usize
    }

    pub fn is_terminal(self) -> bool {
        self.row == 0
    }

    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    pub fn is_one(self) -> bool {
        self == Self::ONE
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            write!(f, "⊥")
        } else if self.is_one() {
            write!(f, "⊤")
        } else {
            write!(f, "{}:{}", self.row, self.col)
        }
    }
}

/// A decision node: `lo` is followed when the edge is refused, `hi` when it
/// is selected.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Node {
    pub lo: NodeRef,
    pub hi: NodeRef,
}

/// A zero-suppressed decision diagram over the ordered edge set.
///
/// Cloning produces an independent structure; diagrams are immutable once
/// built, so Burnside-style branching simply works on clones.
#[derive(Debug, Clone)]
pub struct Zdd {
    root: NodeRef,
    levels: Vec<Vec<Node>>,
}

/// Level code of the 1-terminal during descent; active levels are positive
/// and the 0-terminal is 0.
const ACCEPTED: isize = -1;

impl Zdd {
    /// A diagram with a terminal root.
    fn trivial(accept: bool) -> Self {
        Self {
            root: if accept { NodeRef::ONE } else { NodeRef::ZERO },
            levels: vec![Vec::new()],
        }
    }

    /// Expands a specification top-down into a quasi-reduced diagram,
    /// merging equal specification states per level.
    pub fn build<S: NodeSpec>(spec: &S) -> Self {
        let (root_state, root_level) = spec.root();
        assert!(root_level >= 1, "specifications must cover at least one edge");

        let mut levels: Vec<Vec<Node>> = vec![Vec::new(); root_level + 1];
        let mut states: Vec<S::State> = vec![root_state];

        for level in (1..=root_level).rev() {
            let mut next_uniq: FxHashMap<S::State, u32> = FxHashMap::default();
            let mut next_states: Vec<S::State> = Vec::new();
            let mut nodes: Vec<Node> = Vec::with_capacity(states.len());

            for state in &states {
                let mut children = [NodeRef::ZERO; 2];
                for (value, child) in children.iter_mut().enumerate() {
                    let mut s = state.clone();
                    *child = match spec.child(&mut s, level, value == 1) {
                        Branch::Prune => NodeRef::ZERO,
                        Branch::Accept => NodeRef::ONE,
                        Branch::Level(next) => {
                            debug_assert_eq!(next, level - 1, "builder requires one level per step");
                            let col = match next_uniq.entry(s) {
                                Entry::Occupied(entry) => *entry.get(),
                                Entry::Vacant(entry) => {
                                    let col = next_states.len() as u32;
                                    next_states.push(entry.key().clone());
                                    entry.insert(col);
                                    col
                                }
                            };
                            NodeRef::new(next, col as usize)
                        }
                    };
                }
                nodes.push(Node {
                    lo: children[0],
                    hi: children[1],
                });
            }

            levels[level] = nodes;
            states = next_states;
        }
        debug_assert!(states.is_empty(), "all paths resolve at level 1");

        debug!(
            "build: {} nodes over {} levels",
            levels.iter().map(Vec::len).sum::<usize>(),
            root_level
        );
        Self {
            root: NodeRef::new(root_level, 0),
            levels,
        }
    }

    /// The root reference.
    pub fn root(&self) -> NodeRef {
        self.root
    }

    /// The highest level row (0 for a terminal-rooted diagram).
    pub fn top_level(&self) -> usize {
        self.levels.len() - 1
    }

    /// Total number of decision nodes.
    pub fn node_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    fn node(&self, r: NodeRef) -> Node {
        debug_assert!(!r.is_terminal());
        self.levels[r.row()][r.col()]
    }

    /// Collapses `hi = ⊥` nodes onto their `lo` child and merges duplicate
    /// `(level, lo, hi)` nodes. The accepted-path set (and hence the
    /// cardinality) is unchanged.
    pub fn reduce(&self) -> Self {
        let top = self.top_level();
        let mut out_levels: Vec<Vec<Node>> = vec![Vec::new(); top + 1];
        let mut remap: Vec<Vec<NodeRef>> = self
            .levels
            .iter()
            .map(|level| vec![NodeRef::ZERO; level.len()])
            .collect();

        for level in 1..=top {
            let mut uniq: FxHashMap<Node, u32> = FxHashMap::default();
            for (col, node) in self.levels[level].iter().enumerate() {
                let lo = resolve(&remap, node.lo);
                let hi = resolve(&remap, node.hi);
                remap[level][col] = if hi == NodeRef::ZERO {
                    // Zero-suppression: a never-selected edge level drops out.
                    lo
                } else {
                    let reduced = Node { lo, hi };
                    match uniq.entry(reduced) {
                        Entry::Occupied(entry) => NodeRef::new(level, *entry.get() as usize),
                        Entry::Vacant(entry) => {
                            let col = out_levels[level].len() as u32;
                            out_levels[level].push(reduced);
                            entry.insert(col);
                            NodeRef::new(level, col as usize)
                        }
                    }
                };
            }
        }

        let root = resolve(&remap, self.root);
        out_levels.truncate(root.row() + 1);
        debug!(
            "reduce: {} -> {} nodes",
            self.node_count(),
            out_levels.iter().map(Vec::len).sum::<usize>()
        );

        Self {
            root,
            levels: out_levels,
        }
    }

    /// Number of accepted paths.
    pub fn cardinality(&self) -> BigUint {
        let mut counts: Vec<Vec<BigUint>> = Vec::with_capacity(self.levels.len());
        counts.push(vec![BigUint::ZERO, BigUint::from(1u32)]);

        for level in 1..=self.top_level() {
            let row: Vec<BigUint> = self.levels[level]
                .iter()
                .map(|node| {
                    &counts[node.lo.row()][node.lo.col()] + &counts[node.hi.row()][node.hi.col()]
                })
                .collect();
            counts.push(row);
        }

        counts[self.root.row()][self.root.col()].clone()
    }

    /// Intersects the accepted-path set with the language of `spec`.
    ///
    /// Parallel top-down descent keyed by `(input column, spec state)`. The
    /// input diagram may be reduced: whenever an input edge jumps levels,
    /// the specification state is advanced through 0-branches across the
    /// skipped levels, and an input side that bottoms out early forces the
    /// other side down its remaining 0-branches.
    pub fn subset<S: NodeSpec>(&self, spec: &S) -> Self {
        let (mut state, spec_level) = spec.root();
        let mut n = spec_level as isize;
        let mut f = self.root;
        let mut k = ref_level(f);

        // Synchronize the root levels.
        while n != 0 && k != 0 && n != k {
            if n < k {
                k = self.down_input(&mut f, false, n);
            } else {
                n = down_spec(spec, &mut state, n, false, k);
            }
        }
        if n <= 0 || k <= 0 {
            return Self::trivial(n != 0 && k != 0);
        }
        let top = n as usize;

        let mut maps: Vec<FxHashMap<(u32, S::State), u32>> = vec![FxHashMap::default(); top + 1];
        let mut pending: Vec<Vec<(NodeRef, S::State)>> = vec![Vec::new(); top + 1];
        maps[top].insert((f.col() as u32, state.clone()), 0);
        pending[top].push((f, state));

        let mut out_levels: Vec<Vec<Node>> = vec![Vec::new(); top + 1];

        for level in (1..=top).rev() {
            let entries = std::mem::take(&mut pending[level]);
            for (input, state) in entries {
                let mut children = [NodeRef::ZERO; 2];
                for (value, child) in children.iter_mut().enumerate() {
                    let take = value == 1;
                    let mut ff = input;
                    let mut st = state.clone();
                    let mut kk = self.down_input(&mut ff, take, level as isize - 1);
                    let mut ii = down_spec(spec, &mut st, level as isize, take, kk);

                    while ii != 0 && kk != 0 && ii != kk {
                        if ii < kk {
                            kk = self.down_input(&mut ff, false, ii);
                        } else {
                            ii = down_spec(spec, &mut st, ii, false, kk);
                        }
                    }

                    *child = if ii <= 0 || kk <= 0 {
                        if ii != 0 && kk != 0 {
                            NodeRef::ONE
                        } else {
                            NodeRef::ZERO
                        }
                    } else {
                        debug_assert_eq!(ii, kk);
                        let child_level = ii as usize;
                        match maps[child_level].entry((ff.col() as u32, st.clone())) {
                            Entry::Occupied(entry) => {
                                NodeRef::new(child_level, *entry.get() as usize)
                            }
                            Entry::Vacant(entry) => {
                                let col = pending[child_level].len() as u32;
                                entry.insert(col);
                                pending[child_level].push((ff, st));
                                NodeRef::new(child_level, col as usize)
                            }
                        }
                    };
                }
                out_levels[level].push(Node {
                    lo: children[0],
                    hi: children[1],
                });
            }
        }

        Self {
            root: NodeRef::new(top, 0),
            levels: out_levels,
        }
    }

    /// Takes the `take` branch from `*f`, then follows `lo` edges down to
    /// `stop`. Returns the resulting level code.
    fn down_input(&self, f: &mut NodeRef, take: bool, stop: isize) -> isize {
        let stop = stop.max(0) as usize;
        let node = self.node(*f);
        *f = if take { node.hi } else { node.lo };
        while !f.is_terminal() && f.row() > stop {
            *f = self.node(*f).lo;
        }
        ref_level(*f)
    }

    /// Iterator over the accepted subsets, as edge-index sets.
    ///
    /// Exists as a verification tool; counting never enumerates.
    pub fn subsets(&self, num_edges: usize) -> Subsets<'_> {
        Subsets {
            zdd: self,
            num_edges,
            stack: vec![(self.root, Vec::new())],
        }
    }
}

fn ref_level(f: NodeRef) -> isize {
    if f.is_one() {
        ACCEPTED
    } else if f.is_zero() {
        0
    } else {
        f.row() as isize
    }
}

fn resolve(remap: &[Vec<NodeRef>], r: NodeRef) -> NodeRef {
    if r.is_terminal() {
        r
    } else {
        remap[r.row()][r.col()]
    }
}

/// Advances the spec state across branch `take` at `level`, then across
/// 0-branches down to `stop`. Returns the resulting level code.
fn down_spec<S: NodeSpec>(
    spec: &S,
    state: &mut S::State,
    level: isize,
    take: bool,
    stop: isize,
) -> isize {
    let stop = stop.max(0);
    let mut i = apply_spec(spec, state, level as usize, take);
    while i > stop {
        i = apply_spec(spec, state, i as usize, false);
    }
    i
}

fn apply_spec<S: NodeSpec>(spec: &S, state: &mut S::State, level: usize, take: bool) -> isize {
    match spec.child(state, level, take) {
        Branch::Prune => 0,
        Branch::Accept => ACCEPTED,
        Branch::Level(next) => next as isize,
    }
}

/// Stack-based iterator over accepted subsets.
pub struct Subsets<'a> {
    zdd: &'a Zdd,
    num_edges: usize,
    stack: Vec<(NodeRef, Vec<usize>)>,
}

impl Iterator for Subsets<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((r, subset)) = self.stack.pop() {
            if r.is_zero() {
                continue;
            }
            if r.is_one() {
                return Some(subset);
            }

            let node = self.zdd.node(r);
            let edge = self.num_edges - r.row();

            self.stack.push((node.lo, subset.clone()));
            let mut with_edge = subset;
            with_edge.push(edge);
            self.stack.push((node.hi, with_edge));
        }
        None
    }
}
