//! CAD Kernel trait definitions
//!
//! These traits define the interface that all CAD kernels must implement.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for an edge within a solid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId {
    /// ID of the solid this edge belongs to
    pub solid_id: Uuid,
    /// Index of the edge within the solid
    pub index: u32,
}

impl EdgeId {
    /// Create a new edge ID
    pub fn new(solid_id: Uuid, index: u32) -> Self {
        Self { solid_id, index }
    }
}

/// Information about an edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeInfo {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Start point of the edge
    pub start: DVec3,
    /// End point of the edge
    pub end: DVec3,
    /// Midpoint of the edge
    pub midpoint: DVec3,
    /// Length of the edge
    pub length: f64,
    /// Closed curves (full circles) have a single vertex
    pub closed: bool,
}

impl EdgeInfo {
    /// Create a new open edge info
    pub fn new(id: EdgeId, start: DVec3, end: DVec3) -> Self {
        let midpoint = (start + end) * 0.5;
        let length = (end - start).length();
        Self {
            id,
            start,
            end,
            midpoint,
            length,
            closed: false,
        }
    }

    /// Create a closed edge (a full circle) whose only vertex is `seam`
    pub fn closed(id: EdgeId, seam: DVec3, center: DVec3, circumference: f64) -> Self {
        Self {
            id,
            start: seam,
            end: seam,
            midpoint: center,
            length: circumference,
            closed: true,
        }
    }

    /// Number of distinct vertices bounding this edge
    pub fn vertex_count(&self) -> usize {
        if self.closed { 1 } else { 2 }
    }
}

/// Error type for CAD kernel operations
#[derive(Debug, Clone, Error)]
pub enum CadError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Boolean operation failed: {0}")]
    BooleanFailed(String),

    #[error("Fillet failed: {0}")]
    FilletFailed(String),

    #[error("Tessellation failed: {0}")]
    TessellationFailed(String),

    #[error("Solid not found: {0}")]
    SolidNotFound(Uuid),

    #[error("Edge not found: {0:?}")]
    EdgeNotFound(EdgeId),

    #[error("Kernel not available: {0}")]
    KernelNotAvailable(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for CAD operations
pub type CadResult<T> = Result<T, CadError>;

/// A tessellated mesh output from the CAD kernel
#[derive(Debug, Clone, Default)]
pub struct TessellatedMesh {
    /// Vertex positions (3 floats per vertex)
    pub vertices: Vec<[f32; 3]>,
    /// Vertex normals (3 floats per vertex)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (3 indices per triangle)
    pub indices: Vec<u32>,
}

impl TessellatedMesh {
    /// Create an empty tessellated mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Enclosed volume by the divergence theorem (meaningful for closed meshes)
    pub fn signed_volume(&self) -> f64 {
        self.indices
            .chunks_exact(3)
            .map(|tri| {
                let a = DVec3::from(self.vertices[tri[0] as usize].map(f64::from));
                let b = DVec3::from(self.vertices[tri[1] as usize].map(f64::from));
                let c = DVec3::from(self.vertices[tri[2] as usize].map(f64::from));
                a.dot(b.cross(c)) / 6.0
            })
            .sum()
    }
}

/// A 2D wire (closed loop of edges) for extrusion profiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wire2D {
    /// Unique identifier
    pub id: Uuid,
    /// Points defining the wire (in order)
    pub points: Vec<DVec2>,
    /// Whether the wire is closed
    pub closed: bool,
}

impl Wire2D {
    /// Create a new wire from points
    pub fn new(points: Vec<DVec2>, closed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            closed,
        }
    }

    /// Create a closed polygon, dropping a repeated closing point
    pub fn polygon(mut points: Vec<DVec2>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self::new(points, true)
    }

    /// Create a rectangle wire
    pub fn rectangle(center: DVec2, width: f64, height: f64) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Self::new(
            vec![
                center + DVec2::new(-hw, -hh),
                center + DVec2::new(hw, -hh),
                center + DVec2::new(hw, hh),
                center + DVec2::new(-hw, hh),
            ],
            true,
        )
    }

    /// Create a circle wire (approximated with segments)
    pub fn circle(center: DVec2, radius: f64, segments: u32) -> Self {
        let points: Vec<DVec2> = (0..segments)
            .map(|i| {
                let angle = (i as f64 / segments as f64) * std::f64::consts::TAU;
                center + DVec2::new(angle.cos() * radius, angle.sin() * radius)
            })
            .collect();
        Self::new(points, true)
    }

    /// Signed area (positive for counter-clockwise loops)
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        (0..n)
            .map(|i| self.points[i].perp_dot(self.points[(i + 1) % n]))
            .sum::<f64>()
            * 0.5
    }

    /// Even-odd point containment test against this loop
    pub fn contains(&self, p: DVec2) -> bool {
        let n = self.points.len();
        let mut inside = false;
        let mut j = n.wrapping_sub(1);
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// A planar region bounded by one or more closed loops.
///
/// Containment follows the even-odd rule, so holes (and islands inside
/// holes) need no orientation bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Boundary loops; the first one is the outer contour
    pub loops: Vec<Wire2D>,
}

impl Profile {
    /// Single-loop profile
    pub fn from_outer(outer: Wire2D) -> Self {
        Self { loops: vec![outer] }
    }

    /// Multi-loop profile with even-odd fill
    pub fn from_loops(loops: Vec<Wire2D>) -> Self {
        Self { loops }
    }

    /// Even-odd containment across all loops
    pub fn contains(&self, p: DVec2) -> bool {
        self.loops.iter().filter(|l| l.contains(p)).count() % 2 == 1
    }

    /// Check the profile can bound a face: every loop closed, at least three
    /// points and non-zero area
    pub fn validate(&self) -> CadResult<()> {
        if self.loops.is_empty() {
            return Err(CadError::InvalidProfile("Profile has no loops".into()));
        }
        for wire in &self.loops {
            if !wire.closed {
                return Err(CadError::InvalidProfile("Profile loop is not closed".into()));
            }
            if wire.points.len() < 3 {
                return Err(CadError::InvalidProfile(
                    "Profile must have at least 3 points".into(),
                ));
            }
            if wire.signed_area().abs() < 1e-12 {
                return Err(CadError::InvalidProfile("Profile loop has zero area".into()));
            }
        }
        Ok(())
    }
}

/// Plane a profile is drawn in
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SketchPlane {
    /// Origin of the plane in 3D
    pub origin: DVec3,
    /// Direction of the profile's local X axis
    pub x_axis: DVec3,
    /// Direction of the profile's local Y axis
    pub y_axis: DVec3,
}

impl SketchPlane {
    /// Create a plane from an origin and two in-plane axes
    pub fn new(origin: DVec3, x_axis: DVec3, y_axis: DVec3) -> Self {
        Self {
            origin,
            x_axis: x_axis.normalize(),
            y_axis: y_axis.normalize(),
        }
    }

    /// XY plane at height `z`
    pub fn xy(z: f64) -> Self {
        Self::new(DVec3::new(0.0, 0.0, z), DVec3::X, DVec3::Y)
    }

    /// XZ plane at depth `y` (local Y maps to world Z)
    pub fn xz(y: f64) -> Self {
        Self::new(DVec3::new(0.0, y, 0.0), DVec3::X, DVec3::Z)
    }

    /// Map a local 2D point to world space
    pub fn to_world(&self, p: DVec2) -> DVec3 {
        self.origin + self.x_axis * p.x + self.y_axis * p.y
    }
}

/// A 3D solid body. The geometry itself lives in the kernel that created it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Solid {
    /// Unique identifier
    pub id: Uuid,
}

impl Solid {
    /// Create a new solid with the given ID
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

/// Boolean operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanType {
    /// Union (add)
    Union,
    /// Subtraction (cut)
    Subtract,
    /// Intersection (common)
    Intersect,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    /// The empty box (identity for `union`)
    pub const EMPTY: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all points
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |bb, p| Self {
            min: bb.min.min(p),
            max: bb.max.max(p),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn size(&self) -> DVec3 {
        if self.is_empty() {
            DVec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let bb = Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        if bb.is_empty() { Self::EMPTY } else { bb }
    }

    /// Grow the box by `margin` on every side
    pub fn expanded(&self, margin: f64) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self {
            min: self.min - DVec3::splat(margin),
            max: self.max + DVec3::splat(margin),
        }
    }

    pub fn contains_point(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Whether `other` lies entirely inside this box (within `tolerance`)
    pub fn contains_box(&self, other: &Self, tolerance: f64) -> bool {
        other.is_empty()
            || (other.min.cmpge(self.min - DVec3::splat(tolerance)).all()
                && other.max.cmple(self.max + DVec3::splat(tolerance)).all())
    }

    /// The 8 corners of the box
    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(b.x, b.y, b.z),
            DVec3::new(a.x, b.y, b.z),
        ]
    }
}

/// The main CAD kernel trait
///
/// Implementations of this trait provide the actual geometry operations
/// using different backends (CSG, Truck, etc.)
pub trait CadKernel: Send + Sync {
    /// Get the name of this kernel
    fn name(&self) -> &str;

    /// Check if the kernel is available
    fn is_available(&self) -> bool;

    /// Create an axis-aligned box with its minimum corner at `origin`
    fn create_box(&self, origin: DVec3, size: DVec3) -> CadResult<Solid>;

    /// Create a cylinder whose base circle is centered at `base`, extending
    /// `height` along `axis`
    fn create_cylinder(
        &self,
        base: DVec3,
        radius: f64,
        height: f64,
        axis: DVec3,
    ) -> CadResult<Solid>;

    /// Extrude a planar profile along a direction
    ///
    /// # Arguments
    /// * `profile` - The profile loops (even-odd fill)
    /// * `plane` - The plane the profile is drawn in
    /// * `direction` - The extrusion direction
    /// * `distance` - The extrusion distance
    fn extrude(
        &self,
        profile: &Profile,
        plane: &SketchPlane,
        direction: DVec3,
        distance: f64,
    ) -> CadResult<Solid>;

    /// Perform a boolean operation on two solids
    ///
    /// # Arguments
    /// * `a` - The first solid
    /// * `b` - The second solid
    /// * `op` - The boolean operation type
    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanType) -> CadResult<Solid>;

    /// Translate a solid by `offset`
    fn translate(&self, solid: &Solid, offset: DVec3) -> CadResult<Solid>;

    /// Mirror a solid across the plane through `point` with `normal`
    fn mirror(&self, solid: &Solid, point: DVec3, normal: DVec3) -> CadResult<Solid>;

    // ========== Edge Query Methods ==========

    /// Get all edges of a solid with their geometric information
    ///
    /// # Arguments
    /// * `solid` - The solid to query
    fn get_edges(&self, solid: &Solid) -> CadResult<Vec<EdgeInfo>>;

    // ========== Fillet Methods ==========

    /// Apply fillet (rounded edge) to selected edges
    ///
    /// # Arguments
    /// * `solid` - The solid to modify
    /// * `edges` - Edge IDs to fillet
    /// * `radius` - Fillet radius
    fn fillet(&self, solid: &Solid, edges: &[EdgeId], radius: f64) -> CadResult<Solid>;

    // ========== Measurement Methods ==========

    /// Axis-aligned bounding box of a solid (never smaller than the solid)
    fn bounding_box(&self, solid: &Solid) -> CadResult<BoundingBox>;

    /// Volume of a solid
    fn volume(&self, solid: &Solid) -> CadResult<f64>;

    /// Point membership test
    fn contains_point(&self, solid: &Solid, point: DVec3) -> CadResult<bool>;

    /// Tessellate a solid into triangles
    ///
    /// # Arguments
    /// * `solid` - The solid to tessellate
    /// * `tolerance` - The tessellation tolerance (lower = more triangles)
    fn tessellate(&self, solid: &Solid, tolerance: f64) -> CadResult<TessellatedMesh>;

    /// Fuse a list of solids left to right; `None` for an empty list
    fn fuse_all(&self, solids: &[Solid]) -> CadResult<Option<Solid>> {
        let Some((first, rest)) = solids.split_first() else {
            return Ok(None);
        };
        let mut fused = first.clone();
        for solid in rest {
            fused = self.boolean(&fused, solid, BooleanType::Union)?;
        }
        Ok(Some(fused))
    }
}

/// A null kernel that always returns errors (used when no kernel is available)
#[derive(Debug, Default)]
pub struct NullKernel;

impl NullKernel {
    fn unavailable<T>() -> CadResult<T> {
        Err(CadError::KernelNotAvailable(
            "No CAD kernel available".into(),
        ))
    }
}

impl CadKernel for NullKernel {
    fn name(&self) -> &str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn create_box(&self, _origin: DVec3, _size: DVec3) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn create_cylinder(
        &self,
        _base: DVec3,
        _radius: f64,
        _height: f64,
        _axis: DVec3,
    ) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn extrude(
        &self,
        _profile: &Profile,
        _plane: &SketchPlane,
        _direction: DVec3,
        _distance: f64,
    ) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn boolean(&self, _a: &Solid, _b: &Solid, _op: BooleanType) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn translate(&self, _solid: &Solid, _offset: DVec3) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn mirror(&self, _solid: &Solid, _point: DVec3, _normal: DVec3) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn get_edges(&self, _solid: &Solid) -> CadResult<Vec<EdgeInfo>> {
        Self::unavailable()
    }

    fn fillet(&self, _solid: &Solid, _edges: &[EdgeId], _radius: f64) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn bounding_box(&self, _solid: &Solid) -> CadResult<BoundingBox> {
        Self::unavailable()
    }

    fn volume(&self, _solid: &Solid) -> CadResult<f64> {
        Self::unavailable()
    }

    fn contains_point(&self, _solid: &Solid, _point: DVec3) -> CadResult<bool> {
        Self::unavailable()
    }

    fn tessellate(&self, _solid: &Solid, _tolerance: f64) -> CadResult<TessellatedMesh> {
        Self::unavailable()
    }
}

/// Get the default CAD kernel. The CSG kernel is the only backend that
/// fillets, so it stays the default even when other backends are compiled in.
pub fn default_kernel() -> Box<dyn CadKernel> {
    Box::new(super::CsgKernel::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_kernel_fillets() {
        let kernel = default_kernel();
        assert_eq!(kernel.name(), "csg");
        let cube = kernel.create_box(DVec3::ZERO, DVec3::splat(10.0)).unwrap();
        let edges = kernel.get_edges(&cube).unwrap();
        assert!(kernel.fillet(&cube, &[edges[0].id], 1.0).is_ok());
    }

    #[test]
    fn test_wire_contains_square() {
        let wire = Wire2D::rectangle(DVec2::ZERO, 2.0, 2.0);
        assert!(wire.contains(DVec2::new(0.5, 0.5)));
        assert!(!wire.contains(DVec2::new(1.5, 0.0)));
        assert!((wire.signed_area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_profile_even_odd_hole() {
        let outer = Wire2D::rectangle(DVec2::ZERO, 10.0, 10.0);
        let hole = Wire2D::rectangle(DVec2::ZERO, 4.0, 4.0);
        let profile = Profile::from_loops(vec![outer, hole]);
        assert!(profile.contains(DVec2::new(4.0, 4.0)));
        assert!(!profile.contains(DVec2::new(0.5, 0.5)));
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_profile_rejects_degenerate_loop() {
        let line = Wire2D::polygon(vec![DVec2::ZERO, DVec2::X, DVec2::X * 2.0]);
        let result = Profile::from_outer(line).validate();
        assert!(matches!(result, Err(CadError::InvalidProfile(_))));
    }

    #[test]
    fn test_bounding_box_union_and_intersection() {
        let a = BoundingBox::new(DVec3::ZERO, DVec3::splat(2.0));
        let b = BoundingBox::new(DVec3::splat(1.0), DVec3::splat(3.0));
        assert_eq!(a.union(&b).max, DVec3::splat(3.0));
        assert_eq!(a.intersection(&b).min, DVec3::splat(1.0));

        let far = BoundingBox::new(DVec3::splat(5.0), DVec3::splat(6.0));
        assert!(a.intersection(&far).is_empty());
        assert_eq!(a.intersection(&far).size(), DVec3::ZERO);
    }

    #[test]
    fn test_null_kernel_is_unavailable() {
        let kernel = NullKernel;
        assert!(!kernel.is_available());
        let result = kernel.create_box(DVec3::ZERO, DVec3::ONE);
        assert!(matches!(result, Err(CadError::KernelNotAvailable(_))));
    }

    #[test]
    fn test_fuse_all_empty_is_none() {
        let kernel = NullKernel;
        assert!(kernel.fuse_all(&[]).unwrap().is_none());
    }
}
