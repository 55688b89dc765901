use neurotube_math::{Calibration, Point3};
use neurotube_path::{Path, PathError, PathGraph, TreeOrder};

fn line(y: f64, n: usize) -> Path {
    let pts: Vec<Point3> = (0..n).map(|i| Point3::new(i as f64, y, 0.0)).collect();
    Path::from_points(Calibration::new(0.5, 0.5, 1.0, "um"), &pts)
}

#[test]
fn end_to_start_join_then_disconnect() {
    let mut graph = PathGraph::new();
    let a = graph.insert(line(0.0, 5)).unwrap();
    let b = graph.insert(line(0.0, 3)).unwrap();
    let joint = graph.path(a).unwrap().last_point().unwrap();
    graph.set_start_join(b, a, joint).unwrap();
    assert_eq!(graph.path(a).unwrap().somehow_joins(), &[b]);

    graph.disconnect_from_all(a).unwrap();

    for id in [a, b] {
        let path = graph.path(id).unwrap();
        assert!(path.somehow_joins().is_empty());
        assert!(path.start_join().is_none());
        assert!(path.end_join().is_none());
    }
}

#[test]
fn remove_node_edge_cases() {
    let mut single = line(0.0, 1);
    single.remove_node(0).unwrap();
    assert_eq!(single.len(), 1);

    let mut path = line(0.0, 3);
    assert_eq!(
        path.remove_node(3),
        Err(PathError::InvalidIndex { index: 3, len: 3 })
    );
}

#[test]
fn removing_joined_node_moves_join_point() {
    let mut graph = PathGraph::new();
    let trunk = graph.insert(line(0.0, 6)).unwrap();
    let branch = graph.insert(line(2.0, 4)).unwrap();
    let start = graph.path(branch).unwrap().positions()[0];
    let end = graph.path(branch).unwrap().last_point().unwrap();
    graph.set_start_join(branch, trunk, start).unwrap();

    let path = graph.path_mut(branch).unwrap();
    path.remove_node(0).unwrap();
    assert_eq!(path.start_join().unwrap().point, Point3::new(1.0, 2.0, 0.0));

    graph.set_end_join(branch, trunk, end).unwrap();
    let path = graph.path_mut(branch).unwrap();
    path.remove_node(path.len() - 1).unwrap();
    assert_eq!(path.end_join().unwrap().point, Point3::new(2.0, 2.0, 0.0));
}

#[test]
fn removal_from_arena_disconnects_first() {
    let mut graph = PathGraph::new();
    let a = graph.insert(line(0.0, 5)).unwrap();
    let b = graph.insert(line(1.0, 5)).unwrap();
    let c = graph.insert(line(2.0, 5)).unwrap();
    graph.set_start_join(b, a, Point3::new(0.0, 0.0, 0.0)).unwrap();
    graph.set_start_join(c, b, Point3::new(0.0, 1.0, 0.0)).unwrap();

    let removed = graph.remove(b).unwrap();
    assert!(removed.somehow_joins().is_empty());
    assert!(graph.path(a).unwrap().somehow_joins().is_empty());
    assert!(graph.path(c).unwrap().start_join().is_none());

    let roots = graph.build_forest(TreeOrder::BreadthFirst);
    assert_eq!(roots.len(), 2);
}

#[test]
fn removing_original_disconnects_its_fitted_version() {
    let mut graph = PathGraph::new();
    let a = graph.insert(line(0.0, 5)).unwrap();
    let fitted = graph.insert(line(0.5, 5)).unwrap();
    let c = graph.insert(line(3.0, 4)).unwrap();
    graph.set_fitted(a, fitted).unwrap();
    graph.set_start_join(c, fitted, Point3::origin()).unwrap();

    graph.remove(a).unwrap();

    assert!(!graph.contains(fitted));
    let path = graph.path(c).unwrap();
    assert!(path.start_join().is_none());
    assert!(path.somehow_joins().is_empty());
    for (_, p) in graph.iter() {
        for &other in p.somehow_joins() {
            assert!(graph.contains(other));
        }
    }
}
