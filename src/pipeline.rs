//! Phase drivers: build the spanning-tree ZDD, chain the overlap filters,
//! run the Burnside pass, and assemble the structured result.
//!
//! Three phases, each optional after the first:
//!
//! 1. **Build**: expand the spanning-tree specification and reduce.
//! 2. **Filter**: one subset + reduce per MOPE, chained on the same
//!    diagram.
//! 3. **Burnside**: invariant counts per automorphism, summed and divided
//!    by the group order.
//!
//! With `split_depth = k > 0` the same phases run per edge-prefix partition
//! (2^k disjoint sub-problems); counts add across partitions and every
//! partition's diagrams are dropped before the next one starts, bounding
//! peak memory to roughly 1/2^k of the direct run.
//!
//! Progress marks go through a caller-supplied sink; the drivers keep no
//! global state.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::bitmask::{BitMask, Limbs, MAX_EDGES};
use crate::burnside::{self, AutomorphismList, BurnsideOutcome};
use crate::decimal;
use crate::error::Error;
use crate::graph::Graph;
use crate::restrictor::EdgeRestrictor;
use crate::spanning::SpanningTrees;
use crate::spec::Intersect;
use crate::symmetry::is_identity;
use crate::unfolding::UnfoldingFilter;
use crate::zdd::Zdd;

/// Inputs of one counting run.
#[derive(Debug, Clone)]
pub struct Options {
    pub graph_path: PathBuf,
    pub mope_path: Option<PathBuf>,
    pub automorphism_path: Option<PathBuf>,
    /// 0 disables partitioning; k > 0 runs 2^k edge-prefix partitions.
    pub split_depth: u32,
}

/// Structured result, serialized to JSON by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub input_file: String,
    pub vertices: usize,
    pub edges: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_depth: Option<u32>,
    pub phase4: Phase4,
    pub phase5: Phase5,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase6: Option<Phase6>,
}

/// Spanning-tree construction results.
#[derive(Debug, Clone, Serialize)]
pub struct Phase4 {
    pub build_time_ms: f64,
    pub spanning_tree_count: String,
}

/// Overlap-filter results.
#[derive(Debug, Clone, Serialize)]
pub struct Phase5 {
    pub filter_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_mopes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subset_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_overlapping_count: Option<String>,
}

/// Burnside results.
#[derive(Debug, Clone, Serialize)]
pub struct Phase6 {
    pub burnside_applied: bool,
    pub group_order: u64,
    pub burnside_time_ms: f64,
    pub burnside_sum: String,
    pub nonisomorphic_count: String,
    pub invariant_counts: Vec<String>,
}

/// A finished run: the report plus the Burnside divisibility verdict.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub report: Report,
    /// False when the Burnside sum left a remainder; the report still
    /// carries the floor quotient.
    pub burnside_divisible: bool,
}

/// Loads all inputs, dispatches on the mask width, and runs the phases.
pub fn run(options: &Options, progress: &mut dyn FnMut(&str)) -> Result<RunOutput, Error> {
    let graph = Graph::from_path(&options.graph_path)?;
    let num_edges = graph.edge_count();

    if options.split_depth > 0
        && (options.split_depth > 30 || options.split_depth as usize >= num_edges)
    {
        return Err(Error::InvalidSplitDepth {
            depth: options.split_depth,
            edges: num_edges,
        });
    }

    let mopes = options
        .mope_path
        .as_deref()
        .map(|path| load_mopes(path, num_edges))
        .transpose()?;
    let automorphisms = options
        .automorphism_path
        .as_deref()
        .map(|path| load_automorphisms(path, num_edges))
        .transpose()?;

    info!(
        "loaded {} ({} vertices, {} edges)",
        options.graph_path.display(),
        graph.vertex_count(),
        num_edges
    );

    match num_edges {
        0 => unreachable!("empty graphs are rejected by the loader"),
        1..=64 => run_with::<u64>(options, &graph, mopes, automorphisms, progress),
        65..=128 => run_with::<Limbs<2>>(options, &graph, mopes, automorphisms, progress),
        129..=192 => run_with::<Limbs<3>>(options, &graph, mopes, automorphisms, progress),
        193..=256 => run_with::<Limbs<4>>(options, &graph, mopes, automorphisms, progress),
        257..=320 => run_with::<Limbs<5>>(options, &graph, mopes, automorphisms, progress),
        321..=384 => run_with::<Limbs<6>>(options, &graph, mopes, automorphisms, progress),
        385..=448 => run_with::<Limbs<7>>(options, &graph, mopes, automorphisms, progress),
        _ => Err(Error::UnsupportedWidth {
            edges: num_edges,
            max: MAX_EDGES,
        }),
    }
}

fn run_with<M: BitMask>(
    options: &Options,
    graph: &Graph,
    mopes: Option<Vec<Vec<usize>>>,
    automorphisms: Option<AutomorphismList>,
    progress: &mut dyn FnMut(&str),
) -> Result<RunOutput, Error> {
    let phases = if options.split_depth > 0 {
        run_partitioned::<M>(
            graph,
            options.split_depth,
            mopes.as_deref(),
            automorphisms.as_ref(),
            progress,
        )
    } else {
        run_direct::<M>(graph, mopes.as_deref(), automorphisms.as_ref(), progress)
    };

    let burnside_divisible = phases.burnside.as_ref().map_or(true, BurnsideOutcome::divisible);
    let report = Report {
        input_file: options.graph_path.display().to_string(),
        vertices: graph.vertex_count(),
        edges: graph.edge_count(),
        split_depth: (options.split_depth > 0).then_some(options.split_depth),
        phase4: Phase4 {
            build_time_ms: phases.build_time_ms,
            spanning_tree_count: phases.spanning_tree_count,
        },
        phase5: match (&mopes, phases.non_overlapping_count) {
            (Some(mopes), Some(count)) => Phase5 {
                filter_applied: true,
                num_mopes: Some(mopes.len()),
                subset_time_ms: Some(phases.subset_time_ms),
                non_overlapping_count: Some(count),
            },
            _ => Phase5 {
                filter_applied: false,
                num_mopes: None,
                subset_time_ms: None,
                non_overlapping_count: None,
            },
        },
        phase6: match (&automorphisms, phases.burnside) {
            (Some(automorphisms), Some(outcome)) => Some(Phase6 {
                burnside_applied: true,
                group_order: automorphisms.group_order,
                burnside_time_ms: phases.burnside_time_ms,
                burnside_sum: outcome.sum,
                nonisomorphic_count: outcome.nonisomorphic,
                invariant_counts: outcome.invariant_counts,
            }),
            _ => None,
        },
    };

    Ok(RunOutput {
        report,
        burnside_divisible,
    })
}

/// Raw phase measurements, before report assembly.
struct PhaseResults {
    build_time_ms: f64,
    spanning_tree_count: String,
    subset_time_ms: f64,
    non_overlapping_count: Option<String>,
    burnside_time_ms: f64,
    burnside: Option<BurnsideOutcome>,
}

fn run_direct<M: BitMask>(
    graph: &Graph,
    mopes: Option<&[Vec<usize>]>,
    automorphisms: Option<&AutomorphismList>,
    progress: &mut dyn FnMut(&str),
) -> PhaseResults {
    let num_edges = graph.edge_count();

    let start = Instant::now();
    let mut dd = Zdd::build(&SpanningTrees::new(graph)).reduce();
    let build_time_ms = elapsed_ms(start);
    let spanning_tree_count = dd.cardinality().to_string();
    info!(
        "spanning trees: {} ({} nodes)",
        spanning_tree_count,
        dd.node_count()
    );

    let mut subset_time_ms = 0.0;
    let mut non_overlapping_count = None;
    if let Some(mopes) = mopes {
        let start = Instant::now();
        for (i, mope) in mopes.iter().enumerate() {
            progress(&format!("MOPE {}/{}", i + 1, mopes.len()));
            dd = dd.subset(&UnfoldingFilter::<M>::new(num_edges, mope)).reduce();
        }
        subset_time_ms = elapsed_ms(start);
        let count = dd.cardinality().to_string();
        info!("non-overlapping: {} ({} nodes)", count, dd.node_count());
        non_overlapping_count = Some(count);
    }

    let mut burnside_time_ms = 0.0;
    let burnside = automorphisms.map(|automorphisms| {
        let start = Instant::now();
        let outcome = burnside::burnside::<M>(&dd, automorphisms, progress);
        burnside_time_ms = elapsed_ms(start);
        outcome
    });

    PhaseResults {
        build_time_ms,
        spanning_tree_count,
        subset_time_ms,
        non_overlapping_count,
        burnside_time_ms,
        burnside,
    }
}

fn run_partitioned<M: BitMask>(
    graph: &Graph,
    split_depth: u32,
    mopes: Option<&[Vec<usize>]>,
    automorphisms: Option<&AutomorphismList>,
    progress: &mut dyn FnMut(&str),
) -> PhaseResults {
    let num_edges = graph.edge_count();
    let num_partitions = 1u64 << split_depth;

    let mut build_time_ms = 0.0;
    let mut subset_time_ms = 0.0;
    let mut burnside_time_ms = 0.0;
    let mut spanning_tree_count = "0".to_string();
    let mut non_overlapping_count = "0".to_string();
    let mut accumulated: Option<Vec<String>> =
        automorphisms.map(|a| vec!["0".to_string(); a.permutations.len()]);

    for p in 0..num_partitions {
        progress(&format!("partition {}/{}", p + 1, num_partitions));

        let start = Instant::now();
        let spec = Intersect(
            SpanningTrees::new(graph),
            EdgeRestrictor::new(num_edges, split_depth, p),
        );
        let mut dd = Zdd::build(&spec).reduce();
        build_time_ms += elapsed_ms(start);

        let part_spanning = dd.cardinality().to_string();
        spanning_tree_count = decimal::add(&spanning_tree_count, &part_spanning);

        if let Some(mopes) = mopes {
            let start = Instant::now();
            for (i, mope) in mopes.iter().enumerate() {
                progress(&format!("MOPE {}/{}", i + 1, mopes.len()));
                dd = dd.subset(&UnfoldingFilter::<M>::new(num_edges, mope)).reduce();
            }
            subset_time_ms += elapsed_ms(start);
        }

        let part_count = dd.cardinality().to_string();
        non_overlapping_count = decimal::add(&non_overlapping_count, &part_count);

        if let (Some(automorphisms), Some(accumulated)) = (automorphisms, accumulated.as_mut()) {
            if part_count == "0" {
                continue;
            }
            let start = Instant::now();
            let counts = burnside::invariant_counts::<M>(&dd, automorphisms, progress);
            for (total, count) in accumulated.iter_mut().zip(&counts) {
                *total = decimal::add(total, count);
            }
            burnside_time_ms += elapsed_ms(start);
        }
        // The partition's diagram drops here; the next one starts fresh.
    }

    let burnside = match (automorphisms, accumulated) {
        (Some(automorphisms), Some(accumulated)) => {
            Some(burnside::aggregate(accumulated, automorphisms.group_order))
        }
        _ => None,
    };

    PhaseResults {
        build_time_ms,
        spanning_tree_count,
        subset_time_ms,
        non_overlapping_count: mopes.map(|_| non_overlapping_count),
        burnside_time_ms,
        burnside,
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1e3
}

#[derive(Deserialize)]
struct MopeLine {
    edges: Vec<usize>,
}

/// Loads the MOPE list (JSON-Lines, one `{"edges": [...]}` object per
/// line). Empty lines are skipped; empty edge sets are dropped with a
/// warning; duplicate indices within a line are deduplicated.
pub fn load_mopes(path: &Path, num_edges: usize) -> Result<Vec<Vec<usize>>, Error> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_mopes(&text, path, num_edges)
}

/// Parses MOPE JSON-Lines text. `path` is used for error reporting only.
pub fn parse_mopes(text: &str, path: &Path, num_edges: usize) -> Result<Vec<Vec<usize>>, Error> {
    let mut mopes = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parsed: MopeLine = serde_json::from_str(line).map_err(|err| Error::MopeParse {
            path: path.to_path_buf(),
            line: lineno + 1,
            msg: err.to_string(),
        })?;

        let edges: BTreeSet<usize> = parsed.edges.iter().copied().collect();
        if edges.len() < parsed.edges.len() {
            warn!("{}:{}: duplicate edges in MOPE", path.display(), lineno + 1);
        }
        if edges.is_empty() {
            warn!("{}:{}: empty MOPE skipped", path.display(), lineno + 1);
            continue;
        }
        if let Some(&bad) = edges.iter().find(|&&edge| edge >= num_edges) {
            return Err(Error::MopeParse {
                path: path.to_path_buf(),
                line: lineno + 1,
                msg: format!("edge index {} out of range (graph has {} edges)", bad, num_edges),
            });
        }

        mopes.push(edges.into_iter().collect());
    }

    info!("loaded {} MOPEs from {}", mopes.len(), path.display());
    Ok(mopes)
}

#[derive(Deserialize)]
struct AutomorphismFile {
    group_order: u64,
    edge_permutations: Vec<Vec<usize>>,
    #[serde(default)]
    zero_flags: Option<Vec<bool>>,
}

/// Loads and validates the automorphism list.
pub fn load_automorphisms(path: &Path, num_edges: usize) -> Result<AutomorphismList, Error> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_automorphisms(&text, path, num_edges)
}

/// Parses and validates automorphism JSON. `path` is used for error
/// reporting only.
pub fn parse_automorphisms(
    text: &str,
    path: &Path,
    num_edges: usize,
) -> Result<AutomorphismList, Error> {
    let parsed: AutomorphismFile =
        serde_json::from_str(text).map_err(|err| Error::AutomorphismParse {
            path: path.to_path_buf(),
            msg: err.to_string(),
        })?;

    let fail = |msg: String| Error::AutomorphismParse {
        path: path.to_path_buf(),
        msg,
    };

    if parsed.group_order == 0 {
        return Err(fail("group_order must be positive".to_string()));
    }
    if parsed.edge_permutations.is_empty() {
        return Err(fail("edge_permutations is empty".to_string()));
    }

    for (k, perm) in parsed.edge_permutations.iter().enumerate() {
        if perm.len() != num_edges {
            return Err(fail(format!(
                "permutation {} has length {} (graph has {} edges)",
                k,
                perm.len(),
                num_edges
            )));
        }
        let mut seen = vec![false; num_edges];
        for &image in perm {
            if image >= num_edges || seen[image] {
                return Err(fail(format!("permutation {} is not a permutation of 0..{}", k, num_edges)));
            }
            seen[image] = true;
        }
    }

    if !parsed.edge_permutations.iter().any(|perm| is_identity(perm)) {
        return Err(fail("the identity permutation is missing".to_string()));
    }

    if parsed.edge_permutations.len() as u64 != parsed.group_order {
        warn!(
            "{}: {} permutations but group_order = {}",
            path.display(),
            parsed.edge_permutations.len(),
            parsed.group_order
        );
    }

    let zero_flags = match parsed.zero_flags {
        Some(flags) if flags.len() == parsed.edge_permutations.len() => Some(flags),
        Some(flags) => {
            warn!(
                "{}: zero_flags length {} does not match {} permutations; ignoring",
                path.display(),
                flags.len(),
                parsed.edge_permutations.len()
            );
            None
        }
        None => None,
    };

    info!(
        "loaded {} automorphisms (group order {}) from {}",
        parsed.edge_permutations.len(),
        parsed.group_order,
        path.display()
    );

    Ok(AutomorphismList {
        group_order: parsed.group_order,
        permutations: parsed.edge_permutations,
        zero_flags,
    })
}
