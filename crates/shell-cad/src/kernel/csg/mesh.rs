//! Volume sampling and surface extraction
//!
//! Surfaces are extracted with surface nets over the signed distance of the
//! tree, sampled on a lattice slightly offset from the solid's bounding box.

use fast_surface_nets::SurfaceNetsBuffer;
use fast_surface_nets::ndshape::{RuntimeShape, Shape};
use glam::DVec3;

use super::node::Node;
use crate::kernel::{CadError, CadResult, TessellatedMesh};

/// Upper bound on grid samples for a single tessellation
const MAX_GRID_POINTS: usize = 400_000_000;

/// Sub-cell offset of the meshing grid, keeps samples off axis-aligned faces
const GRID_JITTER: f64 = 0.37;

/// Empty cells kept around the solid so the net closes inside the lattice
const GRID_PADDING: f64 = 2.0;

/// Volume by midpoint sampling on a grid anchored at the world origin.
///
/// The grid does not depend on the solid, so the volumes of pieces cut from
/// a solid by half-open boxes add up to the volume of the whole.
pub(crate) fn volume(node: &Node, cell: f64) -> f64 {
    let bbox = node.bbox;
    if bbox.is_empty() {
        return 0.0;
    }
    let range = |lo: f64, hi: f64| {
        let first = (lo / cell - 0.5).floor() as i64;
        let last = (hi / cell - 0.5).ceil() as i64;
        first..=last
    };
    let center = |i: i64| (i as f64 + 0.5) * cell;

    let mut count: u64 = 0;
    for i in range(bbox.min.x, bbox.max.x) {
        for j in range(bbox.min.y, bbox.max.y) {
            for k in range(bbox.min.z, bbox.max.z) {
                if node.contains(DVec3::new(center(i), center(j), center(k))) {
                    count += 1;
                }
            }
        }
    }
    count as f64 * cell.powi(3)
}

/// Signed distances sampled on a regular lattice
struct Grid {
    origin: DVec3,
    cell: f64,
    shape: RuntimeShape<u32, 3>,
    values: Vec<f32>,
}

impl Grid {
    fn sample(node: &Node, cell: f64) -> CadResult<Self> {
        let bbox = node.bbox;
        let origin = bbox.min - DVec3::splat(cell * (GRID_PADDING + GRID_JITTER));
        let extent = bbox.max + DVec3::splat(cell * GRID_PADDING) - origin;
        let dims = [
            (extent.x / cell).ceil() as usize + 1,
            (extent.y / cell).ceil() as usize + 1,
            (extent.z / cell).ceil() as usize + 1,
        ];
        let total = dims[0]
            .checked_mul(dims[1])
            .and_then(|n| n.checked_mul(dims[2]))
            .filter(|n| *n <= MAX_GRID_POINTS)
            .ok_or_else(|| {
                CadError::TessellationFailed(format!(
                    "grid of {}x{}x{} samples at {cell} mm is too large",
                    dims[0], dims[1], dims[2]
                ))
            })?;

        // Lattice order is x fastest, matching the shape's linearization
        let mut values = Vec::with_capacity(total);
        for k in 0..dims[2] {
            for j in 0..dims[1] {
                for i in 0..dims[0] {
                    let p = origin + DVec3::new(i as f64, j as f64, k as f64) * cell;
                    values.push(node.distance(p) as f32);
                }
            }
        }
        Ok(Self {
            origin,
            cell,
            shape: RuntimeShape::<u32, 3>::new([dims[0] as u32, dims[1] as u32, dims[2] as u32]),
            values,
        })
    }

    fn max_corner(&self) -> [u32; 3] {
        self.shape.as_array().map(|n| n - 1)
    }
}

/// Extract a closed triangle mesh of the solid's surface
pub(crate) fn surface_nets(node: &Node, cell: f64) -> CadResult<TessellatedMesh> {
    if node.bbox.is_empty() {
        return Ok(TessellatedMesh::new());
    }
    let grid = Grid::sample(node, cell)?;

    let mut buffer = SurfaceNetsBuffer::default();
    fast_surface_nets::surface_nets(
        &grid.values,
        &grid.shape,
        [0, 0, 0],
        grid.max_corner(),
        &mut buffer,
    );

    let mut mesh = TessellatedMesh::new();
    mesh.vertices = buffer
        .positions
        .iter()
        .map(|p| {
            let local = DVec3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2]));
            (grid.origin + local * grid.cell).as_vec3().to_array()
        })
        .collect();
    mesh.normals = buffer
        .normals
        .iter()
        .map(|n| {
            glam::Vec3::from_array(*n)
                .try_normalize()
                .unwrap_or(glam::Vec3::Z)
                .to_array()
        })
        .collect();
    mesh.indices = buffer.indices;

    // Negative distances are inside, so a closed net encloses positive volume
    // once it faces outward
    if mesh.signed_volume() < 0.0 {
        for tri in mesh.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    #[test]
    fn box_volume_is_exact_on_grid() {
        let b = Node::cuboid(DVec3::ZERO, DVec3::new(10.0, 4.0, 3.0));
        assert_relative_eq!(volume(&b, 0.5), 120.0);
    }

    #[test]
    fn split_volumes_add_up() {
        let solid = Arc::new(Node::cylinder(DVec3::new(5.0, 5.0, 0.0), DVec3::Z, 4.3, 6.0));
        let left = Node::intersection(
            solid.clone(),
            Arc::new(Node::cuboid(DVec3::new(0.0, 0.0, 0.0), DVec3::new(5.2, 10.0, 6.0))),
        );
        let right = Node::intersection(
            solid.clone(),
            Arc::new(Node::cuboid(DVec3::new(5.2, 0.0, 0.0), DVec3::new(10.0, 10.0, 6.0))),
        );
        let whole = volume(&solid, 0.25);
        assert_relative_eq!(volume(&left, 0.25) + volume(&right, 0.25), whole, epsilon = 1e-9);
        assert_relative_eq!(whole, std::f64::consts::PI * 4.3 * 4.3 * 6.0, max_relative = 0.02);
    }

    #[test]
    fn empty_node_has_no_volume_or_mesh() {
        let empty = Node::empty();
        assert_eq!(volume(&empty, 1.0), 0.0);
        assert!(surface_nets(&empty, 1.0).unwrap().is_empty());
    }

    #[test]
    fn box_mesh_encloses_its_volume() {
        let b = Node::cuboid(DVec3::ZERO, DVec3::splat(10.0));
        let mesh = surface_nets(&b, 0.5).unwrap();
        assert!(mesh.triangle_count() > 0);
        assert_eq!(mesh.vertices.len(), mesh.normals.len());
        let v = mesh.signed_volume();
        assert!(v > 0.0, "mesh must be outward facing");
        assert_relative_eq!(v, 1000.0, max_relative = 0.05);
    }

    #[test]
    fn huge_grid_is_rejected() {
        let b = Node::cuboid(DVec3::ZERO, DVec3::splat(1000.0));
        assert!(matches!(surface_nets(&b, 0.01), Err(CadError::TessellationFailed(_))));
    }
}
