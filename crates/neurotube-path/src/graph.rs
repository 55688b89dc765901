//! Arena of paths and the joins between them.
//!
//! Every relationship between two paths (start/end joins, the symmetric
//! `somehow_joins` adjacency, derived children, fitted links) is edited here
//! so both sides always stay consistent.

use std::collections::{BTreeSet, HashSet, VecDeque};

use neurotube_math::{exactly_equal, Point3};
use slotmap::SlotMap;

use crate::error::{PathError, Result};
use crate::path::{Join, Path, PathEnd, EDIT_TANGENT_WINDOW};
use crate::swc::{Rgb, SwcType};
use crate::PathId;

/// Traversal order used when deriving children from the join adjacency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeOrder {
    /// Claim a path's children, then fully expand each child in turn.
    #[default]
    DepthFirst,
    /// Expand paths level by level.
    BreadthFirst,
}

/// Owner of all paths of a tracing session.
#[derive(Debug, Default)]
pub struct PathGraph {
    paths: SlotMap<PathId, Path>,
    next_id: u32,
}

impl PathGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path, assigning it the next integer id if it has none.
    ///
    /// Fails when the id leaves no room for a following one.
    pub fn insert(&mut self, mut path: Path) -> Result<PathId> {
        let id = match path.id() {
            Some(id) => id,
            None => {
                path.set_id(self.next_id);
                self.next_id
            }
        };
        let next = id
            .checked_add(1)
            .ok_or_else(|| PathError::InvalidState(format!("path id {id} is the last available")))?;
        self.next_id = self.next_id.max(next);
        Ok(self.paths.insert(path))
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if the graph holds no paths.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether `id` refers to a live path.
    pub fn contains(&self, id: PathId) -> bool {
        self.paths.contains_key(id)
    }

    /// Look up a path.
    pub fn get(&self, id: PathId) -> Option<&Path> {
        self.paths.get(id)
    }

    /// Look up a path mutably.
    ///
    /// Node edits are fine through this handle; relationships must go
    /// through the graph.
    pub fn get_mut(&mut self, id: PathId) -> Option<&mut Path> {
        self.paths.get_mut(id)
    }

    /// Look up a path, failing on an unknown handle.
    pub fn path(&self, id: PathId) -> Result<&Path> {
        self.paths.get(id).ok_or(PathError::UnknownPath(id))
    }

    /// Look up a path mutably, failing on an unknown handle.
    pub fn path_mut(&mut self, id: PathId) -> Result<&mut Path> {
        self.paths.get_mut(id).ok_or(PathError::UnknownPath(id))
    }

    /// Iterate over all paths.
    pub fn iter(&self) -> impl Iterator<Item = (PathId, &Path)> {
        self.paths.iter()
    }

    /// All handles, in arena order.
    pub fn ids(&self) -> Vec<PathId> {
        self.paths.keys().collect()
    }

    /// Remove a path after disconnecting it from every other path.
    ///
    /// Removing an original also removes its fitted version; removing a
    /// fitted version unlinks it from its original.
    pub fn remove(&mut self, id: PathId) -> Result<Path> {
        self.disconnect_from_all(id)?;
        let removed = self.paths.remove(id).ok_or(PathError::UnknownPath(id))?;
        if let Some(fitted) = removed.fitted.filter(|&f| self.paths.contains_key(f)) {
            self.disconnect_from_all(fitted)?;
            self.paths.remove(fitted);
        }
        if let Some(original) = removed.fitted_version_of.and_then(|o| self.paths.get_mut(o)) {
            original.fitted = None;
            original.use_fitted = false;
        }
        Ok(removed)
    }

    // =========================================================================
    // Joins
    // =========================================================================

    /// Attach `end` of path `id` to `other` at `point`.
    ///
    /// Fails if that end is already joined. Both adjacency lists gain the
    /// other path, without duplicates.
    pub fn set_join(&mut self, id: PathId, end: PathEnd, other: PathId, point: Point3) -> Result<()> {
        if id == other {
            return Err(PathError::InvalidState("a path cannot join itself".into()));
        }
        self.path(other)?;
        let path = self.path_mut(id)?;
        let slot = path.join_slot(end);
        if slot.is_some() {
            return Err(PathError::InvalidState(format!(
                "{end:?} join is already set"
            )));
        }
        *slot = Some(Join { path: other, point });
        if !path.somehow_joins.contains(&other) {
            path.somehow_joins.push(other);
        }
        let other_path = self.path_mut(other)?;
        if !other_path.somehow_joins.contains(&id) {
            other_path.somehow_joins.push(id);
        }
        Ok(())
    }

    /// Attach the start of `id` to `other`.
    pub fn set_start_join(&mut self, id: PathId, other: PathId, point: Point3) -> Result<()> {
        self.set_join(id, PathEnd::Start, other, point)
    }

    /// Attach the end of `id` to `other`.
    pub fn set_end_join(&mut self, id: PathId, other: PathId, point: Point3) -> Result<()> {
        self.set_join(id, PathEnd::End, other, point)
    }

    /// Detach `end` of path `id`.
    ///
    /// Adjacency is dropped only when nothing else connects the two paths:
    /// neither end of the other path lands on this one and this path's
    /// opposite end does not land on the other.
    pub fn unset_join(&mut self, id: PathId, end: PathEnd) -> Result<()> {
        let path = self.path(id)?;
        let other = match path.join(end) {
            Some(join) => join.path,
            None => {
                return Err(PathError::InvalidState(format!("{end:?} join is not set")));
            }
        };
        let opposite_on_other = path
            .join(end.opposite())
            .is_some_and(|j| j.path == other);
        let other_on_this = self.paths.get(other).is_some_and(|o| {
            o.start_join.as_ref().is_some_and(|j| j.path == id)
                || o.end_join.as_ref().is_some_and(|j| j.path == id)
        });

        if !(opposite_on_other || other_on_this) {
            if let Some(o) = self.paths.get_mut(other) {
                o.somehow_joins.retain(|&p| p != id);
            }
            self.path_mut(id)?.somehow_joins.retain(|&p| p != other);
        }
        *self.path_mut(id)?.join_slot(end) = None;
        Ok(())
    }

    /// Sever every relationship between `id` and other paths: joins of
    /// neighbours that land on `id`, both adjacency lists, and `id`'s own
    /// joins.
    pub fn disconnect_from_all(&mut self, id: PathId) -> Result<()> {
        let neighbours = std::mem::take(&mut self.path_mut(id)?.somehow_joins);
        for other in neighbours {
            let Some(o) = self.paths.get_mut(other) else {
                continue;
            };
            if o.start_join.as_ref().is_some_and(|j| j.path == id) {
                o.start_join = None;
            }
            if o.end_join.as_ref().is_some_and(|j| j.path == id) {
                o.end_join = None;
            }
            o.somehow_joins.retain(|&p| p != id);
        }
        let path = self.path_mut(id)?;
        path.start_join = None;
        path.end_join = None;
        Ok(())
    }

    /// Join points on `id`: its own start/end join points followed by the
    /// points where neighbouring paths start or end on it.
    pub fn find_joined_points(&self, id: PathId) -> Result<Vec<Point3>> {
        let path = self.path(id)?;
        let mut points: Vec<Point3> = path
            .start_join
            .iter()
            .chain(path.end_join.iter())
            .map(|j| j.point)
            .collect();
        for &other in &path.somehow_joins {
            let Some(o) = self.paths.get(other) else {
                continue;
            };
            for join in o.start_join.iter().chain(o.end_join.iter()) {
                if join.path == id {
                    points.push(join.point);
                }
            }
        }
        Ok(points)
    }

    /// Node indices nearest to each of [`PathGraph::find_joined_points`].
    pub fn find_joined_point_indices(&self, id: PathId) -> Result<BTreeSet<usize>> {
        let path = self.path(id)?;
        Ok(self
            .find_joined_points(id)?
            .iter()
            .filter_map(|p| path.nearest_index(p))
            .collect())
    }

    // =========================================================================
    // Tree derivation
    // =========================================================================

    /// Derive children below `root` from the join adjacency.
    ///
    /// Each path claims the neighbours still in `remaining`, removing them,
    /// so every path becomes a child at most once across calls sharing the
    /// same set.
    pub fn set_children(
        &mut self,
        root: PathId,
        remaining: &mut HashSet<PathId>,
        order: TreeOrder,
    ) -> Result<()> {
        self.path(root)?;
        let mut pending = VecDeque::from([root]);
        while let Some(current) = match order {
            TreeOrder::DepthFirst => pending.pop_back(),
            TreeOrder::BreadthFirst => pending.pop_front(),
        } {
            let Some(path) = self.paths.get_mut(current) else {
                continue;
            };
            let claimed: Vec<PathId> = path
                .somehow_joins
                .iter()
                .copied()
                .filter(|c| remaining.remove(c))
                .collect();
            path.children = claimed.clone();
            match order {
                TreeOrder::DepthFirst => pending.extend(claimed.into_iter().rev()),
                TreeOrder::BreadthFirst => pending.extend(claimed),
            }
        }
        Ok(())
    }

    /// Derive the tree structure of the whole graph and return the roots.
    ///
    /// Primary paths become roots first; any path left unreached afterwards
    /// roots its own tree.
    pub fn build_forest(&mut self, order: TreeOrder) -> Vec<PathId> {
        let mut remaining: HashSet<PathId> = self.paths.keys().collect();
        let mut candidates: Vec<PathId> = self
            .paths
            .iter()
            .filter(|(_, p)| p.is_primary())
            .map(|(id, _)| id)
            .collect();
        candidates.extend(self.paths.keys());

        let mut roots = Vec::new();
        for id in candidates {
            if !remaining.remove(&id) {
                continue;
            }
            roots.push(id);
            if let Err(e) = self.set_children(id, &mut remaining, order) {
                log::warn!("skipping children of {id:?}: {e}");
            }
        }
        roots
    }

    /// Clear the primary flag on every path connected to `id`, excluding
    /// `id` itself.
    pub fn unset_primary_for_connected(&mut self, id: PathId) -> Result<()> {
        self.path(id)?;
        let mut explored = HashSet::from([id]);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let neighbours = match self.paths.get(current) {
                Some(p) => p.somehow_joins.clone(),
                None => continue,
            };
            for n in neighbours {
                if explored.insert(n) {
                    if let Some(p) = self.paths.get_mut(n) {
                        p.set_primary(false);
                    }
                    stack.push(n);
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Append the nodes of `donor` to the end of `receiver`.
    ///
    /// Leading donor nodes identical to the receiver's last node are
    /// skipped. If either path has radius data the receiver ends up with
    /// radius data, defaulting missing radii to twice the minimum spacing.
    /// When the donor has an end join, it moves to the receiver and the
    /// donor is disconnected from everything.
    pub fn append(&mut self, receiver: PathId, donor: PathId) -> Result<()> {
        if receiver == donor {
            return Err(PathError::InvalidState(
                "cannot append a path to itself".into(),
            ));
        }
        let donor_path = self.path(donor)?;
        let donor_positions = donor_path.positions().to_vec();
        let donor_radii = donor_path.radii().map(<[f64]>::to_vec);
        let donor_end = donor_path.end_join.clone();

        let path = self.path_mut(receiver)?;
        if path.end_join.is_some() {
            return Err(PathError::InvalidState(
                "cannot append to a path that already has an end join".into(),
            ));
        }
        let default_radius = path.default_radius();
        if donor_radii.is_some() && !path.has_radii() {
            path.create_circles(default_radius)?;
        }

        let mut skip = 0;
        if let Some(last) = path.last_point() {
            while skip < donor_positions.len() && exactly_equal(&donor_positions[skip], &last) {
                skip += 1;
            }
        }
        let added = &donor_positions[skip..];
        let radii = match &donor_radii {
            Some(r) => r[skip..].to_vec(),
            None => vec![default_radius; added.len()],
        };
        path.extend_nodes(added, &radii);

        if let Some(join) = donor_end {
            if join.path != receiver {
                self.set_join(receiver, PathEnd::End, join.path, join.point)?;
            }
            self.disconnect_from_all(donor)?;
        }

        let path = self.path_mut(receiver)?;
        if path.has_radii() {
            path.set_guessed_tangents(EDIT_TANGENT_WINDOW)?;
        }
        Ok(())
    }

    /// Downsample path `id`, never removing endpoints or join indices.
    /// Returns the number of nodes removed.
    pub fn downsample(&mut self, id: PathId, max_deviation: f64) -> Result<usize> {
        let fixed = self.find_joined_point_indices(id)?;
        Ok(self.path_mut(id)?.downsample_with_fixed(&fixed, max_deviation))
    }

    // =========================================================================
    // Fitted versions
    // =========================================================================

    /// Record `fitted` as the fitted version of `original`.
    pub fn set_fitted(&mut self, original: PathId, fitted: PathId) -> Result<()> {
        if original == fitted {
            return Err(PathError::InvalidState(
                "a path cannot be its own fitted version".into(),
            ));
        }
        self.path(fitted)?;
        let path = self.path_mut(original)?;
        if path.fitted.is_some() {
            return Err(PathError::InvalidState(
                "path already has a fitted version".into(),
            ));
        }
        path.fitted = Some(fitted);
        self.path_mut(fitted)?.fitted_version_of = Some(original);
        Ok(())
    }

    /// Prefer (or stop preferring) the fitted version of `id`.
    pub fn set_use_fitted(&mut self, id: PathId, use_fitted: bool) -> Result<()> {
        let path = self.path_mut(id)?;
        if use_fitted && path.fitted.is_none() {
            return Err(PathError::InvalidState(
                "no fitted version to use".into(),
            ));
        }
        path.use_fitted = use_fitted;
        Ok(())
    }

    /// The fitted version of `id` when it is in use, otherwise `id`.
    pub fn version_in_use(&self, id: PathId) -> Result<PathId> {
        let path = self.path(id)?;
        Ok(match (path.use_fitted, path.fitted) {
            (true, Some(fitted)) => fitted,
            _ => id,
        })
    }

    /// Change the SWC type of `id`, and of its fitted version when
    /// `also_in_fitted` is set.
    ///
    /// With `also_in_fitted`, calling this on a fitted version with a type
    /// different from its original's is rejected.
    pub fn set_swc_type(&mut self, id: PathId, swc_type: SwcType, also_in_fitted: bool) -> Result<()> {
        let path = self.path(id)?;
        if also_in_fitted {
            if let Some(original) = path.fitted_version_of {
                if self.path(original)?.swc_type() != swc_type {
                    return Err(PathError::InvalidState(
                        "set the SWC type on the original path, not its fitted version".into(),
                    ));
                }
            }
        }
        let fitted = path.fitted;
        self.path_mut(id)?.set_swc_type_local(swc_type);
        if also_in_fitted {
            if let Some(f) = fitted.and_then(|f| self.paths.get_mut(f)) {
                f.set_swc_type_local(swc_type);
            }
        }
        Ok(())
    }

    /// Set the display color of `id` and its fitted version.
    pub fn set_color(&mut self, id: PathId, color: Option<Rgb>) -> Result<()> {
        let path = self.path_mut(id)?;
        path.set_color_local(color);
        let fitted = path.fitted;
        if let Some(f) = fitted.and_then(|f| self.paths.get_mut(f)) {
            f.set_color_local(color);
        }
        Ok(())
    }

    /// Set the display color of `id` from its SWC type.
    pub fn set_color_by_swc_type(&mut self, id: PathId) -> Result<()> {
        let color = self.path(id)?.swc_type().default_color();
        self.set_color(id, color)
    }

    /// Human-readable summary of the version of `id` in use: name, length,
    /// joins and SWC type.
    pub fn display_name(&self, id: PathId) -> Result<String> {
        let shown = self.version_in_use(id)?;
        let path = self.path(shown)?;
        let mut name = path.name();
        if path.len() == 1 {
            name.push_str(" [Single Point]");
        } else {
            name.push_str(&format!(
                " [{:.4} {}]",
                path.length(),
                path.calibration().unit
            ));
        }
        if let Some(other) = path.start_join.as_ref().and_then(|j| self.paths.get(j.path)) {
            name.push_str(&format!(", starts on {}", other.name()));
        }
        if let Some(other) = path.end_join.as_ref().and_then(|j| self.paths.get(j.path)) {
            name.push_str(&format!(", ends on {}", other.name()));
        }
        if path.swc_type() != SwcType::Undefined {
            name.push_str(&format!(" [{}]", path.swc_type().label()));
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurotube_math::Calibration;

    fn straight(graph: &mut PathGraph, from: (f64, f64), to: (f64, f64), n: usize) -> PathId {
        let pts: Vec<Point3> = (0..n)
            .map(|i| {
                let t = i as f64 / (n - 1) as f64;
                Point3::new(from.0 + t * (to.0 - from.0), from.1 + t * (to.1 - from.1), 0.0)
            })
            .collect();
        graph.insert(Path::from_points(Calibration::pixels(), &pts)).unwrap()
    }

    #[test]
    fn test_insert_assigns_ids() {
        let mut graph = PathGraph::new();
        let a = straight(&mut graph, (0.0, 0.0), (1.0, 0.0), 2);
        let b = straight(&mut graph, (0.0, 0.0), (1.0, 0.0), 2);
        assert_eq!(graph.path(a).unwrap().id(), Some(0));
        assert_eq!(graph.path(b).unwrap().name(), "Path 1");
    }

    #[test]
    fn test_set_join_twice_fails() {
        let mut graph = PathGraph::new();
        let a = straight(&mut graph, (0.0, 0.0), (10.0, 0.0), 11);
        let b = straight(&mut graph, (5.0, 0.0), (5.0, 5.0), 6);
        let c = straight(&mut graph, (7.0, 0.0), (7.0, 5.0), 6);
        graph.set_start_join(b, a, Point3::new(5.0, 0.0, 0.0)).unwrap();
        assert!(matches!(
            graph.set_start_join(b, c, Point3::new(7.0, 0.0, 0.0)),
            Err(PathError::InvalidState(_))
        ));
        assert_eq!(graph.path(a).unwrap().somehow_joins(), &[b]);
        assert_eq!(graph.path(b).unwrap().somehow_joins(), &[a]);
        assert!(graph.set_join(a, PathEnd::End, a, Point3::origin()).is_err());
    }

    #[test]
    fn test_unset_join_keeps_other_relationship() {
        let mut graph = PathGraph::new();
        let a = straight(&mut graph, (0.0, 0.0), (10.0, 0.0), 11);
        let b = straight(&mut graph, (2.0, 0.0), (8.0, 0.0), 7);
        graph.set_start_join(b, a, Point3::new(2.0, 0.0, 0.0)).unwrap();
        graph.set_end_join(b, a, Point3::new(8.0, 0.0, 0.0)).unwrap();

        graph.unset_join(b, PathEnd::Start).unwrap();
        assert!(graph.path(b).unwrap().start_join().is_none());
        assert_eq!(graph.path(a).unwrap().somehow_joins(), &[b]);

        graph.unset_join(b, PathEnd::End).unwrap();
        assert!(graph.path(a).unwrap().somehow_joins().is_empty());
        assert!(graph.path(b).unwrap().somehow_joins().is_empty());
        assert!(graph.unset_join(b, PathEnd::End).is_err());
    }

    #[test]
    fn test_disconnect_from_all() {
        let mut graph = PathGraph::new();
        let a = straight(&mut graph, (0.0, 0.0), (10.0, 0.0), 11);
        let b = straight(&mut graph, (10.0, 0.0), (10.0, 5.0), 6);
        graph.set_end_join(a, b, Point3::new(10.0, 0.0, 0.0)).unwrap();
        graph.disconnect_from_all(b).unwrap();
        for id in [a, b] {
            let p = graph.path(id).unwrap();
            assert!(p.somehow_joins().is_empty());
            assert!(p.start_join().is_none());
            assert!(p.end_join().is_none());
        }
    }

    #[test]
    fn test_children_depth_and_breadth() {
        let mut graph = PathGraph::new();
        let root = straight(&mut graph, (0.0, 0.0), (10.0, 0.0), 11);
        let b1 = straight(&mut graph, (2.0, 0.0), (2.0, 5.0), 6);
        let b2 = straight(&mut graph, (6.0, 0.0), (6.0, 5.0), 6);
        let leaf = straight(&mut graph, (2.0, 3.0), (0.0, 3.0), 3);
        graph.set_start_join(b1, root, Point3::new(2.0, 0.0, 0.0)).unwrap();
        graph.set_start_join(b2, root, Point3::new(6.0, 0.0, 0.0)).unwrap();
        graph.set_start_join(leaf, b1, Point3::new(2.0, 3.0, 0.0)).unwrap();
        // Shortcut making `leaf` reachable from `b2` as well.
        graph.set_end_join(leaf, b2, Point3::new(6.0, 3.0, 0.0)).unwrap();

        for order in [TreeOrder::DepthFirst, TreeOrder::BreadthFirst] {
            let mut remaining: HashSet<PathId> = graph.ids().into_iter().collect();
            remaining.remove(&root);
            graph.set_children(root, &mut remaining, order).unwrap();
            assert!(remaining.is_empty());
            assert_eq!(graph.path(root).unwrap().children(), &[b1, b2]);
            assert_eq!(graph.path(b1).unwrap().children(), &[leaf]);
            assert!(graph.path(b2).unwrap().children().is_empty());
        }
    }

    #[test]
    fn test_build_forest_prefers_primary() {
        let mut graph = PathGraph::new();
        let a = straight(&mut graph, (0.0, 0.0), (5.0, 0.0), 6);
        let b = straight(&mut graph, (5.0, 0.0), (5.0, 5.0), 6);
        let lone = straight(&mut graph, (20.0, 0.0), (25.0, 0.0), 6);
        graph.set_start_join(a, b, Point3::new(5.0, 0.0, 0.0)).unwrap();
        graph.path_mut(b).unwrap().set_primary(true);
        let roots = graph.build_forest(TreeOrder::default());
        assert_eq!(roots, vec![b, lone]);
        assert_eq!(graph.path(b).unwrap().children(), &[a]);
    }

    #[test]
    fn test_unset_primary_for_connected() {
        let mut graph = PathGraph::new();
        let a = straight(&mut graph, (0.0, 0.0), (5.0, 0.0), 6);
        let b = straight(&mut graph, (5.0, 0.0), (5.0, 5.0), 6);
        let c = straight(&mut graph, (5.0, 5.0), (0.0, 5.0), 6);
        graph.set_start_join(b, a, Point3::new(5.0, 0.0, 0.0)).unwrap();
        graph.set_start_join(c, b, Point3::new(5.0, 5.0, 0.0)).unwrap();
        for id in [a, b, c] {
            graph.path_mut(id).unwrap().set_primary(true);
        }
        graph.unset_primary_for_connected(a).unwrap();
        assert!(graph.path(a).unwrap().is_primary());
        assert!(!graph.path(b).unwrap().is_primary());
        assert!(!graph.path(c).unwrap().is_primary());
    }

    #[test]
    fn test_joined_point_indices() {
        let mut graph = PathGraph::new();
        let a = straight(&mut graph, (0.0, 0.0), (10.0, 0.0), 11);
        let b = straight(&mut graph, (4.0, 0.0), (4.0, 6.0), 7);
        graph.set_start_join(b, a, Point3::new(4.1, 0.0, 0.0)).unwrap();
        let idx = graph.find_joined_point_indices(a).unwrap();
        assert_eq!(idx.into_iter().collect::<Vec<_>>(), vec![4]);
        let idx_b = graph.find_joined_point_indices(b).unwrap();
        assert_eq!(idx_b.into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_append_skips_shared_node_and_moves_end_join() {
        let mut graph = PathGraph::new();
        let a = straight(&mut graph, (0.0, 0.0), (3.0, 0.0), 4);
        let b = straight(&mut graph, (3.0, 0.0), (6.0, 0.0), 4);
        let c = straight(&mut graph, (6.0, -3.0), (6.0, 3.0), 7);
        graph.set_end_join(b, c, Point3::new(6.0, 0.0, 0.0)).unwrap();
        graph.path_mut(b).unwrap().create_circles(0.5).unwrap();

        graph.append(a, b).unwrap();

        let path = graph.path(a).unwrap();
        assert_eq!(path.len(), 7);
        assert_eq!(path.radii().unwrap()[0], 2.0);
        assert_eq!(path.radii().unwrap()[6], 0.5);
        assert_eq!(path.tangents().unwrap().len(), 7);
        assert_eq!(path.end_join().unwrap().path, c);
        assert!(graph.path(c).unwrap().somehow_joins().contains(&a));
        assert!(!graph.path(c).unwrap().somehow_joins().contains(&b));
        assert!(graph.path(b).unwrap().end_join().is_none());

        let d = straight(&mut graph, (6.0, 0.0), (9.0, 0.0), 4);
        assert!(matches!(graph.append(a, d), Err(PathError::InvalidState(_))));
    }

    #[test]
    fn test_fitted_links() {
        let mut graph = PathGraph::new();
        let a = straight(&mut graph, (0.0, 0.0), (3.0, 0.0), 4);
        let f = straight(&mut graph, (0.0, 0.0), (3.0, 0.0), 4);
        let g = straight(&mut graph, (0.0, 0.0), (3.0, 0.0), 4);
        assert!(graph.set_use_fitted(a, true).is_err());
        graph.set_fitted(a, f).unwrap();
        assert!(graph.set_fitted(a, g).is_err());
        assert_eq!(graph.version_in_use(a).unwrap(), a);
        graph.set_use_fitted(a, true).unwrap();
        assert_eq!(graph.version_in_use(a).unwrap(), f);

        graph.set_swc_type(a, SwcType::Axon, true).unwrap();
        assert_eq!(graph.path(f).unwrap().swc_type(), SwcType::Axon);
        assert!(graph.set_swc_type(f, SwcType::Soma, true).is_err());
        graph.set_swc_type(f, SwcType::Axon, true).unwrap();

        graph.set_color_by_swc_type(a).unwrap();
        assert_eq!(graph.path(f).unwrap().color(), Some(Rgb::new(255, 0, 0)));

        graph.remove(f).unwrap();
        assert!(graph.path(a).unwrap().fitted().is_none());
        assert!(!graph.path(a).unwrap().use_fitted());
    }

    #[test]
    fn test_remove_original_drops_fitted() {
        let mut graph = PathGraph::new();
        let a = straight(&mut graph, (0.0, 0.0), (3.0, 0.0), 4);
        let f = straight(&mut graph, (0.0, 0.0), (3.0, 0.0), 4);
        graph.set_fitted(a, f).unwrap();
        graph.remove(a).unwrap();
        assert!(graph.is_empty());
        assert!(matches!(graph.path(a), Err(PathError::UnknownPath(_))));
    }

    #[test]
    fn test_insert_rejects_last_id() {
        let mut graph = PathGraph::new();
        let mut last = Path::from_points(Calibration::pixels(), &[Point3::origin()]);
        last.set_id(u32::MAX);
        assert!(matches!(graph.insert(last), Err(PathError::InvalidState(_))));
        assert!(graph.is_empty());

        let mut high = Path::from_points(Calibration::pixels(), &[Point3::origin()]);
        high.set_id(u32::MAX - 1);
        graph.insert(high).unwrap();
        let next = Path::from_points(Calibration::pixels(), &[Point3::origin()]);
        assert!(graph.insert(next).is_err());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_display_name() {
        let mut graph = PathGraph::new();
        let a = straight(&mut graph, (0.0, 0.0), (3.0, 0.0), 4);
        let b = straight(&mut graph, (3.0, 0.0), (3.0, 4.0), 2);
        graph.set_start_join(b, a, Point3::new(3.0, 0.0, 0.0)).unwrap();
        graph.set_swc_type(b, SwcType::Dendrite, true).unwrap();
        assert_eq!(
            graph.display_name(b).unwrap(),
            "Path 1 [4.0000 pixels], starts on Path 0 [(basal) dendrite]"
        );
        let single = graph
            .insert(Path::from_points(Calibration::pixels(), &[Point3::origin()]))
            .unwrap();
        assert_eq!(graph.display_name(single).unwrap(), "Path 2 [Single Point]");
    }

    #[test]
    fn test_downsample_keeps_join_index() {
        let mut graph = PathGraph::new();
        let a = straight(&mut graph, (0.0, 0.0), (10.0, 0.0), 11);
        let b = straight(&mut graph, (3.0, 0.0), (3.0, 4.0), 5);
        graph.set_start_join(b, a, Point3::new(3.0, 0.0, 0.0)).unwrap();
        let dropped = graph.downsample(a, 0.5).unwrap();
        assert_eq!(dropped, 8);
        let xs: Vec<f64> = graph.path(a).unwrap().positions().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 3.0, 10.0]);
    }
}
