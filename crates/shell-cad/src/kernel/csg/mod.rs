//! CSG CAD Kernel Backend
//!
//! Pure Rust kernel that keeps every solid as an immutable tree of
//! primitives and boolean operations. Membership queries are exact; volume
//! is sampled on a world-anchored grid and surfaces are extracted from the
//! signed distance of the tree.

mod edges;
mod fillet;
mod mesh;
mod node;

use std::collections::HashMap;
use std::sync::Arc;

use glam::{DAffine3, DMat3, DVec3};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    BooleanType, BoundingBox, CadError, CadKernel, CadResult, EdgeId, EdgeInfo, Profile, Solid,
    SketchPlane, TessellatedMesh,
};
use edges::EdgeRecord;
use node::{Node, Prism};

/// Sampling resolutions of the CSG kernel (millimeters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Grid cell used by `tessellate` when the caller passes no tolerance
    pub mesh_resolution: f64,
    /// Grid cell used by `volume`
    pub volume_cell: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            mesh_resolution: 0.5,
            volume_cell: 0.5,
        }
    }
}

/// CSG-based CAD kernel
pub struct CsgKernel {
    config: KernelConfig,
    /// Storage for solid trees (keyed by UUID)
    solids: RwLock<HashMap<Uuid, Arc<Node>>>,
    /// Edges already enumerated per solid, so fillets can resolve `EdgeId`s
    edges: RwLock<HashMap<Uuid, Arc<Vec<EdgeRecord>>>>,
}

impl CsgKernel {
    /// Create a new CSG kernel with default resolutions
    pub fn new() -> Self {
        Self::from_config(KernelConfig::default())
    }

    /// Create a new CSG kernel with explicit resolutions. Both cells must be
    /// positive and finite.
    pub fn with_config(config: KernelConfig) -> CadResult<Self> {
        positive(config.mesh_resolution, "mesh resolution")?;
        positive(config.volume_cell, "volume cell")?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: KernelConfig) -> Self {
        Self {
            config,
            solids: RwLock::new(HashMap::new()),
            edges: RwLock::new(HashMap::new()),
        }
    }

    /// Store a solid tree and return a Solid reference
    fn store(&self, node: Node) -> Solid {
        let id = Uuid::new_v4();
        self.solids.write().insert(id, Arc::new(node));
        Solid::new(id)
    }

    fn node(&self, solid: &Solid) -> CadResult<Arc<Node>> {
        self.solids
            .read()
            .get(&solid.id)
            .cloned()
            .ok_or(CadError::SolidNotFound(solid.id))
    }

    fn edge_records(&self, solid: &Solid) -> CadResult<Arc<Vec<EdgeRecord>>> {
        if let Some(records) = self.edges.read().get(&solid.id) {
            return Ok(records.clone());
        }
        let node = self.node(solid)?;
        let records = Arc::new(edges::enumerate(&node));
        tracing::debug!("Enumerated {} edges on solid {}", records.len(), solid.id);
        self.edges.write().insert(solid.id, records.clone());
        Ok(records)
    }

    fn transformed(&self, solid: &Solid, forward: DAffine3) -> CadResult<Solid> {
        let node = self.node(solid)?;
        Ok(self.store(Node::transformed(node, forward)))
    }
}

impl Default for CsgKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn positive(value: f64, what: &str) -> CadResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CadError::InvalidParameter(format!(
            "{what} must be positive, got {value}"
        )))
    }
}

fn unit_direction(direction: DVec3, what: &str) -> CadResult<DVec3> {
    direction
        .try_normalize()
        .ok_or_else(|| CadError::InvalidParameter(format!("{what} must be a non-zero vector")))
}

impl CadKernel for CsgKernel {
    fn name(&self) -> &str {
        "csg"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn create_box(&self, origin: DVec3, size: DVec3) -> CadResult<Solid> {
        positive(size.x, "box width")?;
        positive(size.y, "box depth")?;
        positive(size.z, "box height")?;
        Ok(self.store(Node::cuboid(origin, origin + size)))
    }

    fn create_cylinder(
        &self,
        base: DVec3,
        radius: f64,
        height: f64,
        axis: DVec3,
    ) -> CadResult<Solid> {
        positive(radius, "cylinder radius")?;
        positive(height, "cylinder height")?;
        let axis = unit_direction(axis, "cylinder axis")?;
        Ok(self.store(Node::cylinder(base, axis, radius, height)))
    }

    fn extrude(
        &self,
        profile: &Profile,
        plane: &SketchPlane,
        direction: DVec3,
        distance: f64,
    ) -> CadResult<Solid> {
        profile.validate()?;
        positive(distance, "extrusion distance")?;
        let direction = unit_direction(direction, "extrusion direction")?;

        let loops = profile.loops.iter().map(|w| w.points.clone()).collect();
        let prism = Prism::new(
            plane.origin,
            plane.x_axis,
            plane.y_axis,
            direction * distance,
            loops,
        )
        .ok_or_else(|| {
            CadError::InvalidProfile("Extrusion direction lies in the profile plane".into())
        })?;
        Ok(self.store(Node::prism(prism)))
    }

    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanType) -> CadResult<Solid> {
        let a = self.node(a)?;
        let b = self.node(b)?;
        let node = match op {
            BooleanType::Union => Node::union(a, b),
            BooleanType::Subtract => Node::difference(a, b),
            BooleanType::Intersect => Node::intersection(a, b),
        };
        Ok(self.store(node))
    }

    fn translate(&self, solid: &Solid, offset: DVec3) -> CadResult<Solid> {
        self.transformed(solid, DAffine3::from_translation(offset))
    }

    fn mirror(&self, solid: &Solid, point: DVec3, normal: DVec3) -> CadResult<Solid> {
        let n = unit_direction(normal, "mirror normal")?;
        let reflect = DMat3::from_cols(
            DVec3::X - n * (2.0 * n.x),
            DVec3::Y - n * (2.0 * n.y),
            DVec3::Z - n * (2.0 * n.z),
        );
        let forward = DAffine3::from_mat3_translation(reflect, n * (2.0 * point.dot(n)));
        self.transformed(solid, forward)
    }

    fn get_edges(&self, solid: &Solid) -> CadResult<Vec<EdgeInfo>> {
        let records = self.edge_records(solid)?;
        Ok(records
            .iter()
            .enumerate()
            .map(|(i, r)| r.info(EdgeId::new(solid.id, i as u32)))
            .collect())
    }

    fn fillet(&self, solid: &Solid, edges: &[EdgeId], radius: f64) -> CadResult<Solid> {
        positive(radius, "fillet radius")?;
        let node = self.node(solid)?;
        if edges.is_empty() {
            return Ok(solid.clone());
        }
        let records = self.edge_records(solid)?;
        let selected = edges
            .iter()
            .map(|id| {
                if id.solid_id != solid.id {
                    return Err(CadError::EdgeNotFound(*id));
                }
                records
                    .get(id.index as usize)
                    .map(|r| (id.index, r))
                    .ok_or(CadError::EdgeNotFound(*id))
            })
            .collect::<CadResult<Vec<_>>>()?;

        let rounded = fillet::fillet(&node, &selected, radius)?;
        tracing::debug!("Filleted {} edges with radius {}", selected.len(), radius);
        Ok(self.store(rounded))
    }

    fn bounding_box(&self, solid: &Solid) -> CadResult<BoundingBox> {
        Ok(self.node(solid)?.bbox)
    }

    fn volume(&self, solid: &Solid) -> CadResult<f64> {
        Ok(mesh::volume(&*self.node(solid)?, self.config.volume_cell))
    }

    fn contains_point(&self, solid: &Solid, point: DVec3) -> CadResult<bool> {
        Ok(self.node(solid)?.contains(point))
    }

    fn tessellate(&self, solid: &Solid, tolerance: f64) -> CadResult<TessellatedMesh> {
        let cell = if tolerance > 0.0 {
            tolerance
        } else {
            self.config.mesh_resolution
        };
        let node = self.node(solid)?;
        let mesh = mesh::surface_nets(&node, cell)?;
        tracing::debug!(
            "Tessellated solid {} into {} triangles at {} mm",
            solid.id,
            mesh.triangle_count(),
            cell
        );
        Ok(mesh)
    }
}
