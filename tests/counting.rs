//! End-to-end counting scenarios: spanning-tree counts against the
//! matrix-tree theorem, overlap filtering, Burnside aggregation, partition
//! consistency, and enumeration cross-checks.

use std::collections::BTreeSet;
use std::path::Path;

use unfolding_zdd::bitmask::Limbs;
use unfolding_zdd::burnside::{burnside, AutomorphismList};
use unfolding_zdd::graph::Graph;
use unfolding_zdd::pipeline::{self, Options};
use unfolding_zdd::restrictor::EdgeRestrictor;
use unfolding_zdd::spanning::SpanningTrees;
use unfolding_zdd::spec::Intersect;
use unfolding_zdd::unfolding::UnfoldingFilter;
use unfolding_zdd::zdd::Zdd;

// ---------------------------------------------------------------------------
// Test graphs
// ---------------------------------------------------------------------------

fn triangle() -> Graph {
    Graph::from_edges(vec![(0, 1), (1, 2), (0, 2)])
}

fn c4() -> Graph {
    Graph::from_edges(vec![(0, 1), (1, 2), (2, 3), (3, 0)])
}

fn p4() -> Graph {
    Graph::from_edges(vec![(0, 1), (1, 2), (2, 3)])
}

fn k4() -> Graph {
    Graph::from_edges(vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)])
}

fn k5() -> Graph {
    let mut edges = Vec::new();
    for u in 0..5u32 {
        for v in u + 1..5 {
            edges.push((u, v));
        }
    }
    Graph::from_edges(edges)
}

fn cube() -> Graph {
    // Q3: vertices are 3-bit strings, edges flip one bit.
    let mut edges = Vec::new();
    for v in 0..8u32 {
        for bit in 0..3 {
            let w = v ^ (1 << bit);
            if v < w {
                edges.push((v, w));
            }
        }
    }
    Graph::from_edges(edges)
}

fn petersen() -> Graph {
    let mut edges = Vec::new();
    for i in 0..5u32 {
        edges.push((i, (i + 1) % 5)); // outer cycle
    }
    for i in 0..5u32 {
        edges.push((i, i + 5)); // spokes
    }
    for i in 0..5u32 {
        edges.push((5 + i, 5 + (i + 2) % 5)); // inner pentagram
    }
    Graph::from_edges(edges)
}

fn spanning_count(graph: &Graph) -> String {
    Zdd::build(&SpanningTrees::new(graph))
        .reduce()
        .cardinality()
        .to_string()
}

// ---------------------------------------------------------------------------
// Matrix-tree oracle (Bareiss fraction-free elimination)
// ---------------------------------------------------------------------------

fn kirchhoff(graph: &Graph) -> i128 {
    let n = graph.vertex_count();
    if n <= 1 {
        return 1;
    }
    let mut lap = vec![vec![0i128; n]; n];
    for &(u, v) in graph.edges() {
        let (u, v) = (u as usize, v as usize);
        if u == v {
            continue;
        }
        lap[u][u] += 1;
        lap[v][v] += 1;
        lap[u][v] -= 1;
        lap[v][u] -= 1;
    }

    // Determinant of the minor with row/column 0 removed. The reduced
    // Laplacian of a connected graph is positive definite, so a zero pivot
    // means the determinant is zero.
    let m = n - 1;
    let mut a: Vec<Vec<i128>> = (1..n).map(|i| (1..n).map(|j| lap[i][j]).collect()).collect();
    let mut prev = 1i128;
    for k in 0..m {
        if a[k][k] == 0 {
            return 0;
        }
        for i in k + 1..m {
            for j in k + 1..m {
                a[i][j] = (a[i][j] * a[k][k] - a[i][k] * a[k][j]) / prev;
            }
            a[i][k] = 0;
        }
        prev = a[k][k];
    }
    a[m - 1][m - 1]
}

#[test]
fn spanning_counts_match_matrix_tree_theorem() {
    for (name, graph) in [
        ("triangle", triangle()),
        ("c4", c4()),
        ("p4", p4()),
        ("k4", k4()),
        ("k5", k5()),
        ("cube", cube()),
        ("petersen", petersen()),
    ] {
        assert_eq!(
            spanning_count(&graph),
            kirchhoff(&graph).to_string(),
            "spanning tree count of {} disagrees with Kirchhoff",
            name
        );
    }
}

#[test]
fn known_spanning_counts() {
    assert_eq!(spanning_count(&triangle()), "3");
    assert_eq!(spanning_count(&c4()), "4");
    assert_eq!(spanning_count(&p4()), "1");
    assert_eq!(spanning_count(&k4()), "16");
    assert_eq!(spanning_count(&k5()), "125");
    assert_eq!(spanning_count(&cube()), "384");
    assert_eq!(spanning_count(&petersen()), "2000");
}

#[test]
fn tree_graph_has_one_spanning_tree() {
    // V = E + 1: the graph is its own unique spanning tree.
    let star = Graph::from_edges(vec![(0, 1), (0, 2), (0, 3), (0, 4)]);
    assert_eq!(spanning_count(&star), "1");
}

#[test]
fn parallel_edges_are_distinct() {
    let multi = Graph::from_edges(vec![(0, 1), (0, 1)]);
    assert_eq!(spanning_count(&multi), "2");
}

#[test]
fn wide_mask_agrees_with_native_mask() {
    // The filter semantics must not depend on the limb count.
    let g = k4();
    let dd = Zdd::build(&SpanningTrees::new(&g)).reduce();
    let mope = vec![0usize, 5];
    let narrow = dd.subset(&UnfoldingFilter::<u64>::new(6, &mope)).reduce();
    let wide = dd.subset(&UnfoldingFilter::<Limbs<7>>::new(6, &mope)).reduce();
    assert_eq!(narrow.cardinality(), wide.cardinality());
}

// ---------------------------------------------------------------------------
// Overlap filtering
// ---------------------------------------------------------------------------

fn filtered(graph: &Graph, mopes: &[Vec<usize>]) -> Zdd {
    let num_edges = graph.edge_count();
    let mut dd = Zdd::build(&SpanningTrees::new(graph)).reduce();
    for mope in mopes {
        dd = dd.subset(&UnfoldingFilter::<u64>::new(num_edges, mope)).reduce();
    }
    dd
}

#[test]
fn filter_prunes_trees_whose_cut_set_covers_the_mope() {
    // Triangle trees: {0,1}, {0,2}, {1,2}. The MOPE {2} prunes exactly the
    // tree that cuts edge 2, i.e. {0,1}.
    let g = triangle();
    let dd = filtered(&g, &[vec![2]]);
    assert_eq!(dd.cardinality().to_string(), "2");

    let remaining: BTreeSet<Vec<usize>> = dd.subsets(3).map(|mut s| {
        s.sort();
        s
    }).collect();
    assert!(remaining.contains(&vec![0, 2]));
    assert!(remaining.contains(&vec![1, 2]));
}

#[test]
fn singleton_mopes_for_every_edge_prune_everything() {
    // Every triangle tree cuts exactly one edge, so the three singleton
    // patterns together cover all trees.
    let g = triangle();
    let dd = filtered(&g, &[vec![0], vec![1], vec![2]]);
    assert_eq!(dd.cardinality().to_string(), "0");
}

#[test]
fn mope_covering_no_cut_set_prunes_nothing() {
    // A P4 tree cuts nothing, so no nonempty MOPE can apply.
    let g = p4();
    assert_eq!(filtered(&g, &[vec![0]]).cardinality().to_string(), "1");
    assert_eq!(filtered(&g, &[vec![0, 1, 2]]).cardinality().to_string(), "1");
}

#[test]
fn k4_opposite_edge_pairs() {
    // Edges 0..6 of K4: (0,1),(0,2),(0,3),(1,2),(1,3),(2,3). Cutting both
    // edges of a disjoint pair leaves a 4-cycle with 4 trees, and no tree
    // cuts two disjoint pairs at once, so 16 - 3*4 = 4 trees survive: the
    // four stars.
    let g = k4();
    let pairs = vec![vec![0, 5], vec![1, 4], vec![2, 3]];
    let dd = filtered(&g, &pairs);
    assert_eq!(dd.cardinality().to_string(), "4");

    let survivors: BTreeSet<Vec<usize>> = dd.subsets(6).map(|mut s| {
        s.sort();
        s
    }).collect();
    let stars: BTreeSet<Vec<usize>> = [
        vec![0, 1, 2], // star at 0
        vec![0, 3, 4], // star at 1
        vec![1, 3, 5], // star at 2
        vec![2, 4, 5], // star at 3
    ]
    .into_iter()
    .collect();
    assert_eq!(survivors, stars);
}

#[test]
fn mope_order_does_not_change_the_count() {
    let g = k4();
    let a = filtered(&g, &[vec![0, 5], vec![1, 4], vec![2, 3]]);
    let b = filtered(&g, &[vec![2, 3], vec![0, 5], vec![1, 4]]);
    let c = filtered(&g, &[vec![1, 4], vec![2, 3], vec![0, 5]]);
    assert_eq!(a.cardinality(), b.cardinality());
    assert_eq!(b.cardinality(), c.cardinality());
}

// ---------------------------------------------------------------------------
// Burnside aggregation
// ---------------------------------------------------------------------------

/// All permutations of `0..n`, in a deterministic order.
fn permutations(n: usize) -> Vec<Vec<usize>> {
    let mut result = Vec::new();
    let mut items: Vec<usize> = (0..n).collect();
    heap_permute(&mut items, n, &mut result);
    result.sort();
    result
}

fn heap_permute(items: &mut Vec<usize>, k: usize, out: &mut Vec<Vec<usize>>) {
    if k == 1 {
        out.push(items.clone());
        return;
    }
    for i in 0..k {
        heap_permute(items, k - 1, out);
        if k % 2 == 0 {
            items.swap(i, k - 1);
        } else {
            items.swap(0, k - 1);
        }
    }
}

/// The edge permutation induced by a vertex permutation.
fn induced_edge_perm(graph: &Graph, vperm: &[usize]) -> Option<Vec<usize>> {
    let edges: Vec<(u32, u32)> = graph
        .edges()
        .iter()
        .map(|&(u, v)| (u.min(v), u.max(v)))
        .collect();
    let mut perm = Vec::with_capacity(edges.len());
    for &(u, v) in &edges {
        let (a, b) = (vperm[u as usize] as u32, vperm[v as usize] as u32);
        let image = (a.min(b), a.max(b));
        perm.push(edges.iter().position(|&e| e == image)?);
    }
    Some(perm)
}

/// Every edge permutation induced by a vertex automorphism.
fn automorphism_group(graph: &Graph) -> AutomorphismList {
    let n = graph.vertex_count();
    let permutations: Vec<Vec<usize>> = permutations(n)
        .iter()
        .filter_map(|vperm| induced_edge_perm(graph, vperm))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    AutomorphismList {
        group_order: permutations.len() as u64,
        permutations,
        zero_flags: None,
    }
}

fn no_progress() -> impl FnMut(&str) {
    |_: &str| {}
}

#[test]
fn triangle_has_one_tree_up_to_symmetry() {
    let g = triangle();
    let dd = Zdd::build(&SpanningTrees::new(&g)).reduce();
    let auts = automorphism_group(&g);
    assert_eq!(auts.group_order, 6);

    let outcome = burnside::<u64>(&dd, &auts, &mut no_progress());
    assert_eq!(outcome.sum, "6");
    assert_eq!(outcome.nonisomorphic, "1");
    assert!(outcome.divisible());
}

#[test]
fn c4_rotation_pair() {
    // Identity plus the 4-rotation, taken as a group of order 2:
    // 4 + 0 = 4 invariant trees, 2 orbits.
    let g = c4();
    let dd = Zdd::build(&SpanningTrees::new(&g)).reduce();
    let auts = AutomorphismList {
        group_order: 2,
        permutations: vec![vec![0, 1, 2, 3], vec![1, 2, 3, 0]],
        zero_flags: None,
    };
    let outcome = burnside::<u64>(&dd, &auts, &mut no_progress());
    assert_eq!(outcome.sum, "4");
    assert_eq!(outcome.nonisomorphic, "2");
}

#[test]
fn k4_stars_form_one_orbit() {
    // After the opposite-pair filter only the four stars survive; S4 acts
    // transitively on them.
    let g = k4();
    let dd = filtered(&g, &[vec![0, 5], vec![1, 4], vec![2, 3]]);
    let auts = automorphism_group(&g);
    assert_eq!(auts.group_order, 24);

    let outcome = burnside::<u64>(&dd, &auts, &mut no_progress());
    assert_eq!(outcome.sum, "24");
    assert_eq!(outcome.nonisomorphic, "1");
    assert!(outcome.divisible());
}

#[test]
fn k4_unfiltered_orbit_count() {
    // 16 trees: 4 stars (one orbit) + 12 paths (one orbit).
    let g = k4();
    let dd = Zdd::build(&SpanningTrees::new(&g)).reduce();
    let auts = automorphism_group(&g);
    let outcome = burnside::<u64>(&dd, &auts, &mut no_progress());
    assert_eq!(outcome.nonisomorphic, "2");
    assert!(outcome.divisible());
}

#[test]
fn orbit_count_matches_canonical_enumeration() {
    // Enumerate the accepted trees, canonicalize each under the group, and
    // count distinct canonical forms.
    for (graph, mopes) in [
        (k4(), vec![vec![0, 5], vec![1, 4], vec![2, 3]]),
        (k4(), vec![]),
        (triangle(), vec![]),
    ] {
        let num_edges = graph.edge_count();
        let dd = filtered(&graph, &mopes);
        let auts = automorphism_group(&graph);

        let canonical: BTreeSet<Vec<usize>> = dd
            .subsets(num_edges)
            .map(|tree| {
                auts.permutations
                    .iter()
                    .map(|perm| {
                        let mut image: Vec<usize> =
                            tree.iter().map(|&edge| perm[edge]).collect();
                        image.sort();
                        image
                    })
                    .min()
                    .expect("the group is never empty")
            })
            .collect();

        let outcome = burnside::<u64>(&dd, &auts, &mut no_progress());
        assert_eq!(outcome.nonisomorphic, canonical.len().to_string());
    }
}

// ---------------------------------------------------------------------------
// Partition consistency
// ---------------------------------------------------------------------------

#[test]
fn partitions_sum_to_the_direct_counts() {
    let g = k4();
    let num_edges = g.edge_count();
    let mopes = vec![vec![0usize, 5], vec![1, 4], vec![2, 3]];
    let auts = automorphism_group(&g);

    let direct = filtered(&g, &mopes);
    let direct_spanning = spanning_count(&g);
    let direct_filtered = direct.cardinality();
    let direct_outcome = burnside::<u64>(&direct, &auts, &mut no_progress());

    for depth in 1..=3u32 {
        let mut spanning = num_bigint::BigUint::ZERO;
        let mut filtered_total = num_bigint::BigUint::ZERO;
        let mut invariant_totals = vec![num_bigint::BigUint::ZERO; auts.permutations.len()];

        for p in 0..(1u64 << depth) {
            let spec = Intersect(
                SpanningTrees::new(&g),
                EdgeRestrictor::new(num_edges, depth, p),
            );
            let mut dd = Zdd::build(&spec).reduce();
            spanning += dd.cardinality();

            for mope in &mopes {
                dd = dd.subset(&UnfoldingFilter::<u64>::new(num_edges, mope)).reduce();
            }
            filtered_total += dd.cardinality();

            let outcome = burnside::<u64>(&dd, &auts, &mut no_progress());
            for (total, count) in invariant_totals.iter_mut().zip(&outcome.invariant_counts) {
                *total += count.parse::<num_bigint::BigUint>().unwrap();
            }
        }

        assert_eq!(spanning.to_string(), direct_spanning, "split depth {}", depth);
        assert_eq!(filtered_total, direct_filtered, "split depth {}", depth);
        for (total, direct_count) in invariant_totals.iter().zip(&direct_outcome.invariant_counts)
        {
            assert_eq!(&total.to_string(), direct_count, "split depth {}", depth);
        }
    }
}

// ---------------------------------------------------------------------------
// End-to-end runs through the pipeline
// ---------------------------------------------------------------------------

struct TempFile {
    path: std::path::PathBuf,
}

impl TempFile {
    fn new(name: &str, contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "unfolding-zdd-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::write(&path, contents).expect("temp file is writable");
        Self { path }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[test]
fn pipeline_full_run_on_the_triangle() {
    let graph = TempFile::new("triangle.grh", "0 1\n1 2\n0 2\n");
    // The MOPE family {1}, {2} is closed under the group below: it prunes
    // the trees cutting edge 1 or edge 2, leaving only {1,2}.
    let mopes = TempFile::new("triangle.jsonl", "{\"edges\": [1]}\n{\"edges\": [2]}\n");
    // Identity and the vertex swap (0 1), which fixes edge 0 and swaps
    // edges 1 and 2.
    let auts = TempFile::new(
        "triangle.json",
        r#"{
            "group_order": 2,
            "edge_permutations": [[0, 1, 2], [0, 2, 1]]
        }"#,
    );

    let options = Options {
        graph_path: graph.path.clone(),
        mope_path: Some(mopes.path.clone()),
        automorphism_path: Some(auts.path.clone()),
        split_depth: 0,
    };
    let output = pipeline::run(&options, &mut no_progress()).unwrap();
    let report = &output.report;

    assert_eq!(report.vertices, 3);
    assert_eq!(report.edges, 3);
    assert_eq!(report.phase4.spanning_tree_count, "3");
    assert!(report.phase5.filter_applied);
    assert_eq!(report.phase5.num_mopes, Some(2));
    assert_eq!(report.phase5.non_overlapping_count.as_deref(), Some("1"));

    // The survivor {1,2} is a whole orbit of the swap, so both
    // automorphisms fix it: sum 2, quotient 1.
    let phase6 = report.phase6.as_ref().unwrap();
    assert_eq!(phase6.group_order, 2);
    assert_eq!(phase6.invariant_counts, vec!["1", "1"]);
    assert_eq!(phase6.burnside_sum, "2");
    assert_eq!(phase6.nonisomorphic_count, "1");
    assert!(output.burnside_divisible);
}

#[test]
fn pipeline_split_depth_matches_direct_run() {
    let graph = TempFile::new("k4.grh", "0 1\n0 2\n0 3\n1 2\n1 3\n2 3\n");
    let mopes = TempFile::new(
        "k4.jsonl",
        "{\"edges\": [0, 5]}\n{\"edges\": [1, 4]}\n{\"edges\": [2, 3]}\n",
    );

    let direct = pipeline::run(
        &Options {
            graph_path: graph.path.clone(),
            mope_path: Some(mopes.path.clone()),
            automorphism_path: None,
            split_depth: 0,
        },
        &mut no_progress(),
    )
    .unwrap();

    let split = pipeline::run(
        &Options {
            graph_path: graph.path.clone(),
            mope_path: Some(mopes.path.clone()),
            automorphism_path: None,
            split_depth: 2,
        },
        &mut no_progress(),
    )
    .unwrap();

    assert_eq!(
        direct.report.phase4.spanning_tree_count,
        split.report.phase4.spanning_tree_count
    );
    assert_eq!(
        direct.report.phase5.non_overlapping_count,
        split.report.phase5.non_overlapping_count
    );
    assert_eq!(split.report.split_depth, Some(2));
}

#[test]
fn pipeline_rejects_bad_inputs() {
    let graph = TempFile::new("bad-p4.grh", "0 1\n1 2\n2 3\n");

    // Out-of-range MOPE edge.
    let mopes = TempFile::new("bad.jsonl", "{\"edges\": [7]}\n");
    let err = pipeline::run(
        &Options {
            graph_path: graph.path.clone(),
            mope_path: Some(mopes.path.clone()),
            automorphism_path: None,
            split_depth: 0,
        },
        &mut no_progress(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("out of range"));

    // Split depth >= edge count.
    let err = pipeline::run(
        &Options {
            graph_path: graph.path.clone(),
            mope_path: None,
            automorphism_path: None,
            split_depth: 3,
        },
        &mut no_progress(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("split depth"));
}

#[test]
fn automorphism_validation() {
    let path = Path::new("test.json");

    // Identity missing.
    let err = pipeline::parse_automorphisms(
        r#"{"group_order": 1, "edge_permutations": [[1, 2, 0]]}"#,
        path,
        3,
    )
    .unwrap_err();
    assert!(err.to_string().contains("identity"));

    // Empty list.
    let err = pipeline::parse_automorphisms(
        r#"{"group_order": 1, "edge_permutations": []}"#,
        path,
        3,
    )
    .unwrap_err();
    assert!(err.to_string().contains("empty"));

    // Wrong length.
    let err = pipeline::parse_automorphisms(
        r#"{"group_order": 1, "edge_permutations": [[0, 1]]}"#,
        path,
        3,
    )
    .unwrap_err();
    assert!(err.to_string().contains("length"));

    // Not a permutation.
    let err = pipeline::parse_automorphisms(
        r#"{"group_order": 1, "edge_permutations": [[0, 0, 1]]}"#,
        path,
        3,
    )
    .unwrap_err();
    assert!(err.to_string().contains("not a permutation"));

    // Valid, with zero flags.
    let auts = pipeline::parse_automorphisms(
        r#"{
            "group_order": 2,
            "edge_permutations": [[0, 1, 2], [0, 2, 1]],
            "zero_flags": [false, true]
        }"#,
        path,
        3,
    )
    .unwrap();
    assert_eq!(auts.group_order, 2);
    assert!(auts.zero_flagged(1));
    assert!(!auts.zero_flagged(0));
}

#[test]
fn mope_parsing() {
    let path = Path::new("test.jsonl");

    let mopes = pipeline::parse_mopes(
        "{\"edges\": [2, 0, 2]}\n\n{\"edges\": []}\n{\"edges\": [1]}\n",
        path,
        3,
    )
    .unwrap();
    // Deduplicated and sorted; the empty set is dropped.
    assert_eq!(mopes, vec![vec![0, 2], vec![1]]);

    let err = pipeline::parse_mopes("{\"edges\": \"nope\"}\n", path, 3).unwrap_err();
    assert!(err.to_string().contains("test.jsonl:1"));
}
