use neurotube_math::{Calibration, Point3};
use neurotube_path::{Path, PathEnd, PathGraph, PathId};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    SetJoin { a: u8, b: u8, start: bool, node: u8 },
    UnsetJoin { a: u8, start: bool },
    Disconnect { a: u8 },
    Append { a: u8, b: u8 },
    AddNode { a: u8, idx: u8, x: i8, y: i8 },
    RemoveNode { a: u8, idx: u8 },
    CreateCircles { a: u8 },
    Downsample { a: u8, tol: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u8>(), any::<u8>(), any::<bool>(), any::<u8>())
            .prop_map(|(a, b, start, node)| Op::SetJoin { a, b, start, node }),
        (any::<u8>(), any::<bool>()).prop_map(|(a, start)| Op::UnsetJoin { a, start }),
        any::<u8>().prop_map(|a| Op::Disconnect { a }),
        (any::<u8>(), any::<u8>()).prop_map(|(a, b)| Op::Append { a, b }),
        (any::<u8>(), any::<u8>(), any::<i8>(), any::<i8>())
            .prop_map(|(a, idx, x, y)| Op::AddNode { a, idx, x, y }),
        (any::<u8>(), any::<u8>()).prop_map(|(a, idx)| Op::RemoveNode { a, idx }),
        any::<u8>().prop_map(|a| Op::CreateCircles { a }),
        (any::<u8>(), 0u8..40).prop_map(|(a, tol)| Op::Downsample { a, tol }),
    ]
}

fn seed_graph(count: usize) -> (PathGraph, Vec<PathId>) {
    let mut graph = PathGraph::new();
    let ids = (0..count)
        .map(|k| {
            let pts: Vec<Point3> = (0..6)
                .map(|i| Point3::new(i as f64, k as f64 * 3.0, (i * k) as f64 * 0.25))
                .collect();
            graph.insert(Path::from_points(Calibration::pixels(), &pts)).unwrap()
        })
        .collect();
    (graph, ids)
}

fn pick(ids: &[PathId], n: u8) -> PathId {
    ids[n as usize % ids.len()]
}

fn end(start: bool) -> PathEnd {
    if start {
        PathEnd::Start
    } else {
        PathEnd::End
    }
}

fn apply_op(graph: &mut PathGraph, ids: &[PathId], op: Op) {
    match op {
        Op::SetJoin { a, b, start, node } => {
            let (a, b) = (pick(ids, a), pick(ids, b));
            let target = graph.path(b).unwrap();
            if target.is_empty() {
                return;
            }
            let point = target.positions()[node as usize % target.len()];
            let _ = graph.set_join(a, end(start), b, point);
        }
        Op::UnsetJoin { a, start } => {
            let _ = graph.unset_join(pick(ids, a), end(start));
        }
        Op::Disconnect { a } => {
            graph.disconnect_from_all(pick(ids, a)).unwrap();
        }
        Op::Append { a, b } => {
            let _ = graph.append(pick(ids, a), pick(ids, b));
        }
        Op::AddNode { a, idx, x, y } => {
            let path = graph.path_mut(pick(ids, a)).unwrap();
            let idx = idx as usize % (path.len() + 1);
            path.add_node(idx, Point3::new(x as f64 * 0.5, y as f64 * 0.5, 0.0))
                .unwrap();
        }
        Op::RemoveNode { a, idx } => {
            let path = graph.path_mut(pick(ids, a)).unwrap();
            if path.is_empty() {
                return;
            }
            let idx = idx as usize % path.len();
            path.remove_node(idx).unwrap();
        }
        Op::CreateCircles { a } => {
            let _ = graph.path_mut(pick(ids, a)).unwrap().create_circles(1.5);
        }
        Op::Downsample { a, tol } => {
            graph.downsample(pick(ids, a), tol as f64 * 0.05).unwrap();
        }
    }
}

fn assert_invariants(graph: &PathGraph) {
    for (id, path) in graph.iter() {
        if let Some(radii) = path.radii() {
            assert_eq!(radii.len(), path.len(), "radii length of {:?}", id);
            assert_eq!(path.tangents().unwrap().len(), path.len());
        }
        for join in path.start_join().into_iter().chain(path.end_join()) {
            assert!(
                path.somehow_joins().contains(&join.path),
                "{:?} joins {:?} without adjacency",
                id,
                join.path
            );
        }
        for &other in path.somehow_joins() {
            assert_ne!(other, id);
            let other_path = graph.path(other).unwrap();
            assert!(
                other_path.somehow_joins().contains(&id),
                "adjacency {:?} -> {:?} is not symmetric",
                id,
                other
            );
        }
        let mut seen = path.somehow_joins().to_vec();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), path.somehow_joins().len(), "duplicate adjacency");
    }
}

fn sequence_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 5..40)
}

fn point_strategy() -> impl Strategy<Value = Point3> {
    (-50i16..50, -50i16..50, -10i16..10)
        .prop_map(|(x, y, z)| Point3::new(x as f64 * 0.5, y as f64 * 0.5, z as f64))
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 512, .. ProptestConfig::default() })]
    #[test]
    fn join_edit_invariants(seq in sequence_strategy()) {
        let (mut graph, ids) = seed_graph(4);
        for op in seq {
            apply_op(&mut graph, &ids, op);
            assert_invariants(&graph);
        }
    }

    #[test]
    fn nearest_index_matches_brute_force(
        points in prop::collection::vec(point_strategy(), 0..20),
        target in point_strategy(),
        within in 0.0f64..30.0,
    ) {
        let path = Path::from_points(Calibration::pixels(), &points);
        let found = path.index_nearest_to(target.x, target.y, target.z, within);
        let dists: Vec<f64> = points.iter().map(|p| (target - p).norm_squared()).collect();
        let in_range = dists.iter().any(|&d| d < within * within);
        prop_assert_eq!(found.is_some(), in_range);
        if let Some(i) = found {
            let best = dists.iter().cloned().fold(f64::INFINITY, f64::min);
            prop_assert_eq!(dists[i], best);
            prop_assert!(dists[..i].iter().all(|&d| d > best));
        }
    }

    #[test]
    fn downsample_keeps_fixed_points(
        points in prop::collection::vec(point_strategy(), 2..30),
        branch_at in any::<u8>(),
        tol in 0.0f64..5.0,
    ) {
        let mut graph = PathGraph::new();
        let trunk = graph.insert(Path::from_points(Calibration::pixels(), &points)).unwrap();
        let anchor = points[branch_at as usize % points.len()];
        let branch = graph.insert(Path::from_points(
            Calibration::pixels(),
            &[anchor, Point3::new(anchor.x, anchor.y + 10.0, anchor.z)],
        )).unwrap();
        graph.set_start_join(branch, trunk, anchor).unwrap();
        let first = points[0];
        let last = points[points.len() - 1];

        graph.downsample(trunk, tol).unwrap();

        let path = graph.path(trunk).unwrap();
        prop_assert_eq!(path.positions()[0], first);
        prop_assert_eq!(path.positions()[path.len() - 1], last);
        prop_assert!(path.contains(&anchor));
    }
}
