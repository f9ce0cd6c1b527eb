//! Truck CAD Kernel Backend
//!
//! Pure Rust B-Rep kernel using the Truck library.
//!
//! Note: truck has no fillet operation, so `fillet` always fails and the
//! shell pipeline keeps its sharp edges with this backend. Measurements are
//! taken on the tessellated boundary.

use glam::{DVec2, DVec3};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use truck_meshalgo::prelude::*;
use truck_meshalgo::tessellation::{MeshableShape, MeshedShape};
use truck_modeling::{Matrix4, Point3, Solid as TruckSolid, Vector3, Vertex, Wire, builder};

use super::{
    BooleanType, BoundingBox, CadError, CadKernel, CadResult, EdgeId, EdgeInfo, Profile, Solid,
    SketchPlane, TessellatedMesh, Wire2D,
};

/// Boolean tolerance passed to truck-shapeops
const BOOLEAN_TOLERANCE: f64 = 0.05;
/// Tessellation tolerance used for measurements
const MEASURE_TOLERANCE: f64 = 0.05;

/// Truck-based CAD kernel
pub struct TruckKernel {
    /// Storage for solid data (keyed by UUID)
    solids: RwLock<HashMap<Uuid, TruckSolid>>,
}

impl TruckKernel {
    /// Create a new Truck kernel
    pub fn new() -> Self {
        Self {
            solids: RwLock::new(HashMap::new()),
        }
    }

    /// Store a solid and return a Solid reference
    fn store_solid(&self, solid: TruckSolid) -> Solid {
        let id = Uuid::new_v4();
        self.solids.write().insert(id, solid);
        Solid::new(id)
    }

    /// Get a stored solid by ID
    fn get_solid(&self, solid: &Solid) -> CadResult<TruckSolid> {
        self.solids
            .read()
            .get(&solid.id)
            .cloned()
            .ok_or(CadError::SolidNotFound(solid.id))
    }

    /// Create a wire from 2D points on a plane
    fn create_wire(&self, profile: &Wire2D, plane: &SketchPlane) -> Wire {
        let vertices: Vec<Vertex> = profile
            .points
            .iter()
            .map(|p| builder::vertex(to_point(plane.to_world(*p))))
            .collect();

        let n = vertices.len();
        let edges: Vec<_> = (0..n)
            .map(|i| builder::line(&vertices[i], &vertices[(i + 1) % n]))
            .collect();

        edges.into()
    }

    fn measured_mesh(&self, solid: &Solid) -> CadResult<TessellatedMesh> {
        self.tessellate(solid, MEASURE_TOLERANCE)
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn to_point(p: DVec3) -> Point3 {
    Point3::new(p.x, p.y, p.z)
}

fn to_vector(v: DVec3) -> Vector3 {
    Vector3::new(v.x, v.y, v.z)
}

fn from_point(p: Point3) -> DVec3 {
    DVec3::new(p.x, p.y, p.z)
}

impl CadKernel for TruckKernel {
    fn name(&self) -> &str {
        "truck"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn create_box(&self, origin: DVec3, size: DVec3) -> CadResult<Solid> {
        if size.min_element() <= 0.0 {
            return Err(CadError::InvalidParameter(format!(
                "box size must be positive, got {size}"
            )));
        }
        let vertex = builder::vertex(to_point(origin));
        let edge = builder::tsweep(&vertex, Vector3::new(size.x, 0.0, 0.0));
        let face = builder::tsweep(&edge, Vector3::new(0.0, size.y, 0.0));
        let solid = builder::tsweep(&face, Vector3::new(0.0, 0.0, size.z));

        Ok(self.store_solid(solid))
    }

    fn create_cylinder(
        &self,
        base: DVec3,
        radius: f64,
        height: f64,
        axis: DVec3,
    ) -> CadResult<Solid> {
        if radius <= 0.0 || height <= 0.0 {
            return Err(CadError::InvalidParameter(format!(
                "cylinder radius and height must be positive, got {radius} and {height}"
            )));
        }
        let axis = axis
            .try_normalize()
            .ok_or_else(|| CadError::InvalidParameter("cylinder axis is zero".into()))?;
        let (x_axis, y_axis) = axis.any_orthonormal_pair();
        let plane = SketchPlane::new(base, x_axis, y_axis);
        let circle = Profile::from_outer(Wire2D::circle(DVec2::ZERO, radius, 48));

        self.extrude(&circle, &plane, axis, height)
    }

    fn extrude(
        &self,
        profile: &Profile,
        plane: &SketchPlane,
        direction: DVec3,
        distance: f64,
    ) -> CadResult<Solid> {
        profile.validate()?;
        let wires: Vec<Wire> = profile
            .loops
            .iter()
            .map(|w| self.create_wire(w, plane))
            .collect();

        let face = builder::try_attach_plane(&wires)
            .map_err(|e| CadError::OperationFailed(format!("Failed to create face: {:?}", e)))?;
        let solid = builder::tsweep(&face, to_vector(direction.normalize_or_zero() * distance));

        Ok(self.store_solid(solid))
    }

    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanType) -> CadResult<Solid> {
        let solid_a = self.get_solid(a)?;
        let mut solid_b = self.get_solid(b)?;

        let result = match op {
            BooleanType::Union => truck_shapeops::or(&solid_a, &solid_b, BOOLEAN_TOLERANCE),
            BooleanType::Intersect => truck_shapeops::and(&solid_a, &solid_b, BOOLEAN_TOLERANCE),
            BooleanType::Subtract => {
                // A - B == A & !B
                solid_b.not();
                truck_shapeops::and(&solid_a, &solid_b, BOOLEAN_TOLERANCE)
            }
        };
        let result = result.ok_or_else(|| {
            CadError::BooleanFailed(format!("truck returned no solid for {op:?}"))
        })?;
        Ok(self.store_solid(result))
    }

    fn translate(&self, solid: &Solid, offset: DVec3) -> CadResult<Solid> {
        let moved = builder::translated(&self.get_solid(solid)?, to_vector(offset));
        Ok(self.store_solid(moved))
    }

    fn mirror(&self, solid: &Solid, point: DVec3, normal: DVec3) -> CadResult<Solid> {
        let n = normal
            .try_normalize()
            .ok_or_else(|| CadError::InvalidParameter("mirror normal is zero".into()))?;
        let d = 2.0 * point.dot(n);
        #[rustfmt::skip]
        let matrix = Matrix4::new(
            1.0 - 2.0 * n.x * n.x, -2.0 * n.y * n.x, -2.0 * n.z * n.x, 0.0,
            -2.0 * n.x * n.y, 1.0 - 2.0 * n.y * n.y, -2.0 * n.z * n.y, 0.0,
            -2.0 * n.x * n.z, -2.0 * n.y * n.z, 1.0 - 2.0 * n.z * n.z, 0.0,
            d * n.x, d * n.y, d * n.z, 1.0,
        );
        let mut mirrored = builder::transformed(&self.get_solid(solid)?, matrix);
        // A reflection turns the boundary inside out
        mirrored.not();
        Ok(self.store_solid(mirrored))
    }

    fn get_edges(&self, solid: &Solid) -> CadResult<Vec<EdgeInfo>> {
        let truck_solid = self.get_solid(solid)?;
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for shell in truck_solid.boundaries() {
            for edge in shell.edge_iter() {
                if !seen.insert(edge.id()) {
                    continue;
                }
                let start = from_point(edge.front().point());
                let end = from_point(edge.back().point());
                let id = EdgeId::new(solid.id, edges.len() as u32);
                if edge.front().id() == edge.back().id() {
                    edges.push(EdgeInfo::closed(id, start, start, 0.0));
                } else {
                    edges.push(EdgeInfo::new(id, start, end));
                }
            }
        }
        Ok(edges)
    }

    fn fillet(&self, _solid: &Solid, _edges: &[EdgeId], _radius: f64) -> CadResult<Solid> {
        Err(CadError::FilletFailed(
            "Fillet is not supported in Truck kernel".into(),
        ))
    }

    fn bounding_box(&self, solid: &Solid) -> CadResult<BoundingBox> {
        let mesh = self.measured_mesh(solid)?;
        Ok(BoundingBox::from_points(
            mesh.vertices.iter().map(|v| DVec3::from(v.map(f64::from))),
        ))
    }

    fn volume(&self, solid: &Solid) -> CadResult<f64> {
        Ok(self.measured_mesh(solid)?.signed_volume().abs())
    }

    fn contains_point(&self, solid: &Solid, point: DVec3) -> CadResult<bool> {
        let mesh = self.measured_mesh(solid)?;
        // Parity of crossings along +X
        let mut inside = false;
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| DVec3::from(mesh.vertices[i as usize].map(f64::from)));
            if ray_hits_triangle(point, DVec3::X, a, b, c) {
                inside = !inside;
            }
        }
        Ok(inside)
    }

    fn tessellate(&self, solid: &Solid, tolerance: f64) -> CadResult<TessellatedMesh> {
        let truck_solid = self.get_solid(solid)?;
        let mesh = truck_solid.triangulation(tolerance).to_polygon();

        let mut out = TessellatedMesh::new();
        for tri in mesh.tri_faces() {
            for v in tri.iter() {
                let p = mesh.positions()[v.pos];
                let n = v
                    .nor
                    .map(|i| mesh.normals()[i])
                    .unwrap_or(Vector3::new(0.0, 0.0, 1.0));
                out.indices.push(out.vertices.len() as u32);
                out.vertices.push([p[0] as f32, p[1] as f32, p[2] as f32]);
                out.normals.push([n[0] as f32, n[1] as f32, n[2] as f32]);
            }
        }
        if out.is_empty() {
            return Err(CadError::TessellationFailed(
                "Truck produced an empty mesh".into(),
            ));
        }
        Ok(out)
    }
}

/// Möller–Trumbore ray/triangle test (hits at t > 0 only)
fn ray_hits_triangle(origin: DVec3, dir: DVec3, a: DVec3, b: DVec3, c: DVec3) -> bool {
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-12 {
        return false;
    }
    let s = origin - a;
    let u = s.dot(p) / det;
    if !(0.0..=1.0).contains(&u) {
        return false;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) / det;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    e2.dot(q) / det > 0.0
}
