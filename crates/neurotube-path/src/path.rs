//! A single traced path: calibrated nodes with optional radius/tangent data.

use neurotube_math::{exactly_equal, Calibration, Point3, Vec3};

use crate::error::{PathError, Result};
use crate::swc::{Rgb, SwcType};
use crate::PathId;

/// Node capacity reserved by [`Path::new`].
pub const DEFAULT_RESERVE: usize = 128;

/// Capacity multiplier applied when node storage runs out.
pub const GROWTH_FACTOR: f64 = 1.2;

/// Nodes either side used to re-guess tangents after an edit.
pub const EDIT_TANGENT_WINDOW: usize = 2;

/// Which end of a path a join is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathEnd {
    /// The first node.
    Start,
    /// The last node.
    End,
}

impl PathEnd {
    /// The other end.
    pub fn opposite(self) -> Self {
        match self {
            PathEnd::Start => PathEnd::End,
            PathEnd::End => PathEnd::Start,
        }
    }
}

/// Attachment of one end of a path to a point on another path.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// The path joined onto.
    pub path: PathId,
    /// Exact position of the join.
    pub point: Point3,
}

/// Per-node radii and tangents. Always the same length as the positions.
#[derive(Debug, Clone, PartialEq)]
struct Circles {
    radii: Vec<f64>,
    tangents: Vec<Vec3>,
}

/// Maps a path's nodes into another coordinate space.
///
/// Returning a point with a NaN coordinate drops the node.
pub trait PathTransformer {
    /// Transform one calibrated point.
    fn transform_point(&self, p: &Point3) -> Point3;
}

impl<F: Fn(&Point3) -> Point3> PathTransformer for F {
    fn transform_point(&self, p: &Point3) -> Point3 {
        self(p)
    }
}

/// An ordered sequence of calibrated 3D nodes traced through an image.
///
/// Node positions are owned by the path; join and fitted relationships are
/// stored as [`PathId`] handles and managed through [`crate::PathGraph`].
#[derive(Debug, Clone)]
pub struct Path {
    id: Option<u32>,
    name: Option<String>,
    calibration: Calibration,
    positions: Vec<Point3>,
    circles: Option<Circles>,
    swc_type: SwcType,
    color: Option<Rgb>,
    primary: bool,
    selected: bool,
    editable_node: Option<usize>,
    render_invalidated: bool,
    pub(crate) start_join: Option<Join>,
    pub(crate) end_join: Option<Join>,
    pub(crate) somehow_joins: Vec<PathId>,
    pub(crate) children: Vec<PathId>,
    pub(crate) fitted: Option<PathId>,
    pub(crate) fitted_version_of: Option<PathId>,
    pub(crate) use_fitted: bool,
}

impl Path {
    /// Create an empty path with the default node reserve.
    pub fn new(calibration: Calibration) -> Self {
        Self::with_capacity(calibration, DEFAULT_RESERVE)
    }

    /// Create an empty path reserving room for `reserve` nodes.
    pub fn with_capacity(calibration: Calibration, reserve: usize) -> Self {
        Self {
            id: None,
            name: None,
            calibration,
            positions: Vec::with_capacity(reserve),
            circles: None,
            swc_type: SwcType::Undefined,
            color: None,
            primary: false,
            selected: false,
            editable_node: None,
            render_invalidated: false,
            start_join: None,
            end_join: None,
            somehow_joins: Vec::new(),
            children: Vec::new(),
            fitted: None,
            fitted_version_of: None,
            use_fitted: false,
        }
    }

    /// Build a path from a list of points.
    pub fn from_points(calibration: Calibration, points: &[Point3]) -> Self {
        let mut path = Self::with_capacity(calibration, points.len());
        for p in points {
            path.push(*p);
        }
        path
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Integer id, if one has been assigned.
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// Assign the integer id.
    pub fn set_id(&mut self, id: u32) {
        self.id = Some(id);
    }

    /// Name of the path, `"Path <id>"` when none was given.
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.default_name(),
        }
    }

    /// Give the path an explicit name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Reset the name to `"Path <id>"`.
    pub fn set_default_name(&mut self) {
        self.name = Some(self.default_name());
    }

    fn default_name(&self) -> String {
        match self.id {
            Some(id) => format!("Path {id}"),
            None => "Path".to_string(),
        }
    }

    /// Voxel spacing of the image this path was traced in.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Smallest axis spacing.
    pub fn min_separation(&self) -> f64 {
        self.calibration.min_separation()
    }

    /// SWC type tag.
    pub fn swc_type(&self) -> SwcType {
        self.swc_type
    }

    pub(crate) fn set_swc_type_local(&mut self, swc_type: SwcType) {
        self.swc_type = swc_type;
    }

    /// Custom display color, if any.
    pub fn color(&self) -> Option<Rgb> {
        self.color
    }

    pub(crate) fn set_color_local(&mut self, color: Option<Rgb>) {
        self.color = color;
    }

    /// Whether this path is a primary (root) path.
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Mark the path as primary or not.
    pub fn set_primary(&mut self, primary: bool) {
        self.primary = primary;
    }

    /// Selection state.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Change the selection state.
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Index of the node tagged for editing.
    pub fn editable_node(&self) -> Option<usize> {
        self.editable_node
    }

    /// Tag a node for editing, or clear the tag with `None`.
    pub fn set_editable_node(&mut self, index: Option<usize>) {
        self.editable_node = index;
    }

    /// Whether a node is currently tagged for editing.
    pub fn is_being_edited(&self) -> bool {
        self.editable_node.is_some()
    }

    /// Clear the editing tag.
    pub fn stop_editing(&mut self) {
        self.editable_node = None;
    }

    /// Whether cached renderings of this path are stale.
    pub fn is_render_invalidated(&self) -> bool {
        self.render_invalidated
    }

    /// Flag cached renderings of this path as stale.
    pub fn invalidate_render(&mut self) {
        self.render_invalidated = true;
    }

    /// Acknowledge that the rendering was rebuilt.
    pub fn clear_render_invalidated(&mut self) {
        self.render_invalidated = false;
    }

    // =========================================================================
    // Relationships (read-only; edit through PathGraph)
    // =========================================================================

    /// The join at the start of the path.
    pub fn start_join(&self) -> Option<&Join> {
        self.start_join.as_ref()
    }

    /// The join at the end of the path.
    pub fn end_join(&self) -> Option<&Join> {
        self.end_join.as_ref()
    }

    /// The join at the given end.
    pub fn join(&self, end: PathEnd) -> Option<&Join> {
        match end {
            PathEnd::Start => self.start_join.as_ref(),
            PathEnd::End => self.end_join.as_ref(),
        }
    }

    pub(crate) fn join_slot(&mut self, end: PathEnd) -> &mut Option<Join> {
        match end {
            PathEnd::Start => &mut self.start_join,
            PathEnd::End => &mut self.end_join,
        }
    }

    /// Every path joined to this one in either direction.
    pub fn somehow_joins(&self) -> &[PathId] {
        &self.somehow_joins
    }

    /// Children assigned by the last tree derivation.
    pub fn children(&self) -> &[PathId] {
        &self.children
    }

    /// The fitted version of this path.
    pub fn fitted(&self) -> Option<PathId> {
        self.fitted
    }

    /// The path this one is a fitted version of.
    pub fn fitted_version_of(&self) -> Option<PathId> {
        self.fitted_version_of
    }

    /// Whether this path was produced by fitting another.
    pub fn is_fitted_version(&self) -> bool {
        self.fitted_version_of.is_some()
    }

    /// Whether the fitted version is preferred for display.
    pub fn use_fitted(&self) -> bool {
        self.use_fitted
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if the path has no nodes.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Node storage capacity.
    pub fn capacity(&self) -> usize {
        self.positions.capacity()
    }

    /// All node positions.
    pub fn positions(&self) -> &[Point3] {
        &self.positions
    }

    /// Position of node `index`.
    pub fn position(&self, index: usize) -> Result<Point3> {
        self.check_index(index)?;
        Ok(self.positions[index])
    }

    /// Position of node `index` in voxel coordinates.
    pub fn voxel_position(&self, index: usize) -> Result<Point3> {
        self.check_index(index)?;
        Ok(self.calibration.to_voxel(&self.positions[index]))
    }

    /// All node positions in voxel coordinates.
    pub fn voxel_positions(&self) -> Vec<Point3> {
        self.positions
            .iter()
            .map(|p| self.calibration.to_voxel(p))
            .collect()
    }

    /// The last node.
    pub fn last_point(&self) -> Option<Point3> {
        self.positions.last().copied()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.positions.len() {
            return Err(PathError::InvalidIndex {
                index,
                len: self.positions.len(),
            });
        }
        Ok(())
    }

    /// Radius used for nodes that acquire radius data without a fit.
    pub fn default_radius(&self) -> f64 {
        self.min_separation() * 2.0
    }

    /// Grow storage so that `needed` nodes fit.
    ///
    /// Capacity grows to `floor(capacity * 1.2) + 1`, or straight to
    /// `needed` when that is larger.
    fn ensure_capacity(&mut self, needed: usize) {
        let cap = self.positions.capacity();
        if needed <= cap {
            return;
        }
        let grown = ((cap as f64 * GROWTH_FACTOR) as usize + 1).max(needed);
        self.positions.reserve_exact(grown - self.positions.len());
        if let Some(c) = &mut self.circles {
            c.radii.reserve_exact(grown - c.radii.len());
            c.tangents.reserve_exact(grown - c.tangents.len());
        }
    }

    /// Append a node at the end of the path.
    ///
    /// With radius data present the node gets the default radius and a zero
    /// tangent; call [`Path::set_guessed_tangents`] afterwards if needed.
    pub fn push(&mut self, point: Point3) {
        self.ensure_capacity(self.positions.len() + 1);
        self.positions.push(point);
        let radius = self.default_radius();
        if let Some(c) = &mut self.circles {
            c.radii.push(radius);
            c.tangents.push(Vec3::zeros());
        }
    }

    /// Insert a node at `index` (`0..=len`).
    pub fn add_node(&mut self, index: usize, point: Point3) -> Result<()> {
        if index > self.positions.len() {
            return Err(PathError::InvalidIndex {
                index,
                len: self.positions.len(),
            });
        }
        self.ensure_capacity(self.positions.len() + 1);
        self.positions.insert(index, point);
        let radius = self.default_radius();
        if let Some(c) = &mut self.circles {
            c.radii.insert(index, radius);
            c.tangents.insert(index, Vec3::zeros());
        }
        if self.has_radii() {
            self.set_guessed_tangents(EDIT_TANGENT_WINDOW)?;
        }
        Ok(())
    }

    /// Remove the node at `index`. Does nothing on a single-node path.
    ///
    /// A join point that sat on the removed node moves to the new first
    /// (start join) or last (end join) node.
    pub fn remove_node(&mut self, index: usize) -> Result<()> {
        if self.positions.len() == 1 {
            return Ok(());
        }
        self.check_index(index)?;
        let removed = self.positions.remove(index);
        if let Some(c) = &mut self.circles {
            c.radii.remove(index);
            c.tangents.remove(index);
        }
        let first = self.positions.first().copied();
        let last = self.positions.last().copied();
        if let (Some(join), Some(first)) = (&mut self.start_join, first) {
            if exactly_equal(&join.point, &removed) {
                join.point = first;
            }
        }
        if let (Some(join), Some(last)) = (&mut self.end_join, last) {
            if exactly_equal(&join.point, &removed) {
                join.point = last;
            }
        }
        Ok(())
    }

    /// Relocate node `index`.
    pub fn move_node(&mut self, index: usize, point: Point3) -> Result<()> {
        self.check_index(index)?;
        self.positions[index] = point;
        Ok(())
    }

    /// Reverse the node order in place, including radius and tangent data.
    fn reverse_nodes(&mut self) {
        self.positions.reverse();
        if let Some(c) = &mut self.circles {
            c.radii.reverse();
            c.tangents.reverse();
        }
    }

    /// A copy of the node sequence in reverse order, with the same calibration.
    ///
    /// Only positions are copied; identity and relationships are not.
    pub fn reversed(&self) -> Path {
        let mut path = Path::from_points(self.calibration.clone(), &self.positions);
        path.reverse_nodes();
        path
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Index of the closest node strictly within `within` of `(x, y, z)`.
    ///
    /// Ties go to the earliest index.
    pub fn index_nearest_to(&self, x: f64, y: f64, z: f64, within: f64) -> Option<usize> {
        let target = Point3::new(x, y, z);
        let mut best = within * within;
        let mut index = None;
        for (i, p) in self.positions.iter().enumerate() {
            let d = (target - p).norm_squared();
            if d < best {
                best = d;
                index = Some(i);
            }
        }
        index
    }

    /// Like [`Path::index_nearest_to`], ignoring z.
    pub fn index_nearest_to_2d(&self, x: f64, y: f64, within: f64) -> Option<usize> {
        let mut best = within * within;
        let mut index = None;
        for (i, p) in self.positions.iter().enumerate() {
            let (dx, dy) = (x - p.x, y - p.y);
            let d = dx * dx + dy * dy;
            if d < best {
                best = d;
                index = Some(i);
            }
        }
        index
    }

    /// Index of the closest node with no distance limit.
    pub fn nearest_index(&self, p: &Point3) -> Option<usize> {
        self.index_nearest_to(p.x, p.y, p.z, f64::MAX)
    }

    /// First node lying within one voxel spacing of `p` along every axis.
    pub fn node_index_of(&self, p: &Point3) -> Option<usize> {
        let cal = &self.calibration;
        self.positions.iter().position(|q| {
            (q.x - p.x).abs() < cal.x && (q.y - p.y).abs() < cal.y && (q.z - p.z).abs() < cal.z
        })
    }

    /// Whether some node has exactly the coordinates of `p`.
    pub fn contains(&self, p: &Point3) -> bool {
        self.positions.iter().any(|q| exactly_equal(q, p))
    }

    /// Polyline length in calibrated units.
    pub fn length(&self) -> f64 {
        self.positions
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum()
    }

    // =========================================================================
    // Radii and tangents
    // =========================================================================

    /// Whether per-node radius data is present.
    pub fn has_radii(&self) -> bool {
        self.circles.is_some()
    }

    /// Per-node radii.
    pub fn radii(&self) -> Option<&[f64]> {
        self.circles.as_ref().map(|c| c.radii.as_slice())
    }

    /// Per-node tangents.
    pub fn tangents(&self) -> Option<&[Vec3]> {
        self.circles.as_ref().map(|c| c.tangents.as_slice())
    }

    /// Start carrying radius data, every node at `radius` with a zero tangent.
    pub fn create_circles(&mut self, radius: f64) -> Result<()> {
        if self.circles.is_some() {
            return Err(PathError::InvalidState(
                "radius data already present".into(),
            ));
        }
        let n = self.positions.len();
        let mut radii = Vec::with_capacity(self.positions.capacity());
        radii.resize(n, radius);
        let mut tangents = Vec::with_capacity(self.positions.capacity());
        tangents.resize(n, Vec3::zeros());
        self.circles = Some(Circles { radii, tangents });
        Ok(())
    }

    /// Replace all node data with fitted positions, tangents and radii.
    pub fn set_fitted_circles(
        &mut self,
        positions: Vec<Point3>,
        tangents: Vec<Vec3>,
        radii: Vec<f64>,
    ) -> Result<()> {
        if positions.len() != tangents.len() || positions.len() != radii.len() {
            return Err(PathError::InvalidState(format!(
                "fitted data lengths differ: {} positions, {} tangents, {} radii",
                positions.len(),
                tangents.len(),
                radii.len()
            )));
        }
        self.positions = positions;
        self.circles = Some(Circles { radii, tangents });
        Ok(())
    }

    pub(crate) fn replace_nodes(&mut self, positions: Vec<Point3>, radii: Option<Vec<f64>>) {
        self.positions = positions;
        self.circles = radii.map(|radii| {
            let n = radii.len();
            Circles {
                radii,
                tangents: vec![Vec3::zeros(); n],
            }
        });
    }

    pub(crate) fn extend_nodes(&mut self, positions: &[Point3], radii: &[f64]) {
        self.ensure_capacity(self.positions.len() + positions.len());
        self.positions.extend_from_slice(positions);
        if let Some(c) = &mut self.circles {
            c.radii.extend_from_slice(radii);
            c.tangents
                .extend(std::iter::repeat(Vec3::zeros()).take(radii.len()));
        }
    }

    /// Mean radius, or zero without radius data.
    pub fn mean_radius(&self) -> f64 {
        match self.radii() {
            Some(r) if !r.is_empty() => r.iter().sum::<f64>() / r.len() as f64,
            _ => 0.0,
        }
    }

    /// Unnormalised tangent at node `index`: the difference between the
    /// nodes `either_side` positions after and before it, clamped to the
    /// path ends.
    pub fn tangent_at(&self, index: usize, either_side: usize) -> Result<Vec3> {
        self.check_index(index)?;
        let min = index.saturating_sub(either_side);
        let max = (index + either_side).min(self.positions.len() - 1);
        Ok(self.positions[max] - self.positions[min])
    }

    /// Recompute every tangent with [`Path::tangent_at`].
    pub fn set_guessed_tangents(&mut self, either_side: usize) -> Result<()> {
        let tangents: Vec<Vec3> = (0..self.positions.len())
            .map(|i| self.tangent_at(i, either_side))
            .collect::<Result<_>>()?;
        match &mut self.circles {
            Some(c) => {
                c.tangents = tangents;
                Ok(())
            }
            None => Err(PathError::InvalidState(
                "cannot guess tangents without radius data".into(),
            )),
        }
    }

    /// Approximate tube volume, treating each segment as a frustum between
    /// consecutive radii. `None` without radius data.
    pub fn approximate_fitted_volume(&self) -> Option<f64> {
        let radii = self.radii()?;
        let volume = self
            .positions
            .windows(2)
            .zip(radii.windows(2))
            .map(|(p, r)| {
                let h = (p[1] - p[0]).norm();
                std::f64::consts::PI * h * (r[0] * r[0] + r[1] * r[1] + r[0] * r[1]) / 3.0
            })
            .sum();
        Some(volume)
    }

    /// Map every node through `transformer` into a new path with the given
    /// calibration. Nodes mapping to NaN are dropped; relationships and
    /// radius data are not carried over.
    pub fn transform(&self, transformer: &dyn PathTransformer, calibration: Calibration) -> Path {
        let mut result = Path::with_capacity(calibration, self.positions.len());
        for p in &self.positions {
            let q = transformer.transform_point(p);
            if q.x.is_nan() || q.y.is_nan() || q.z.is_nan() {
                continue;
            }
            result.push(q);
        }
        result.id = self.id;
        result.name = self.name.clone();
        result.primary = self.primary;
        result.selected = self.selected;
        result.swc_type = self.swc_type;
        result
    }
}
