//! Burnside aggregation over the automorphism group.
//!
//! The number of non-isomorphic unfoldings is the number of Aut(Γ)-orbits
//! on the accepted tree set, which by Burnside's lemma is the average of
//! the invariant counts |T_g| over the group. Each non-identity
//! automorphism costs one subset + reduce + cardinality pass; the identity
//! reads the cardinality directly, and zero-flagged automorphisms are
//! skipped on the producer's assertion that |T_g| = 0.

use log::{info, warn};

use crate::bitmask::BitMask;
use crate::decimal;
use crate::symmetry::{is_identity, SymmetryFilter};
use crate::zdd::Zdd;

/// A validated automorphism list.
#[derive(Debug, Clone)]
pub struct AutomorphismList {
    /// |Aut(Γ)|; the Burnside divisor.
    pub group_order: u64,
    /// Edge permutations, identity included.
    pub permutations: Vec<Vec<usize>>,
    /// Optional per-permutation assertion that |T_g| = 0.
    pub zero_flags: Option<Vec<bool>>,
}

impl AutomorphismList {
    /// True when permutation `k` is pre-certified to fix no tree.
    pub fn zero_flagged(&self, k: usize) -> bool {
        self.zero_flags.as_ref().is_some_and(|flags| flags[k])
    }
}

/// The aggregated result of a Burnside pass.
#[derive(Debug, Clone)]
pub struct BurnsideOutcome {
    /// |T_g| per automorphism, index-aligned with the input list.
    pub invariant_counts: Vec<String>,
    /// Σ |T_g| as a decimal string.
    pub sum: String,
    /// Σ |T_g| / |Aut(Γ)|, floor quotient.
    pub nonisomorphic: String,
    /// Division remainder; nonzero signals an internal inconsistency.
    pub remainder: u64,
}

impl BurnsideOutcome {
    pub fn divisible(&self) -> bool {
        self.remainder == 0
    }
}

/// Computes |T_g| for every automorphism in the list.
///
/// `dd` must be reduced. Progress marks ("automorphism k/|G|") are emitted
/// through `progress`. The partitioned driver calls this once per partition
/// and sums index-wise before aggregating.
pub fn invariant_counts<M: BitMask>(
    dd: &Zdd,
    automorphisms: &AutomorphismList,
    progress: &mut dyn FnMut(&str),
) -> Vec<String> {
    let num_edges = automorphisms
        .permutations
        .first()
        .map_or(0, |perm| perm.len());
    let total = automorphisms.permutations.len();
    let mut counts = Vec::with_capacity(total);
    let mut skipped = 0;

    for (k, perm) in automorphisms.permutations.iter().enumerate() {
        progress(&format!("automorphism {}/{}", k + 1, total));

        let count = if automorphisms.zero_flagged(k) {
            skipped += 1;
            "0".to_string()
        } else if is_identity(perm) {
            // Every tree is fixed by the identity.
            dd.cardinality().to_string()
        } else {
            let filtered = dd.subset(&SymmetryFilter::<M>::new(num_edges, perm)).reduce();
            filtered.cardinality().to_string()
        };
        counts.push(count);
    }

    if skipped > 0 {
        info!("skipped {}/{} automorphisms via zero flags", skipped, total);
    }
    counts
}

/// Sums the invariant counts and divides by the group order.
pub fn aggregate(invariant_counts: Vec<String>, group_order: u64) -> BurnsideOutcome {
    let mut sum = "0".to_string();
    for count in &invariant_counts {
        sum = decimal::add(&sum, count);
    }

    let (nonisomorphic, remainder) = decimal::div_rem(&sum, group_order);
    if remainder != 0 {
        warn!(
            "Burnside sum {} is not divisible by group order {} (remainder {})",
            sum, group_order, remainder
        );
    }

    BurnsideOutcome {
        invariant_counts,
        sum,
        nonisomorphic,
        remainder,
    }
}

/// One-shot Burnside pass: invariant counts, sum, and quotient.
pub fn burnside<M: BitMask>(
    dd: &Zdd,
    automorphisms: &AutomorphismList,
    progress: &mut dyn FnMut(&str),
) -> BurnsideOutcome {
    let counts = invariant_counts::<M>(dd, automorphisms, progress);
    aggregate(counts, automorphisms.group_order)
}
