//! Splitting the frame into two printable halves

use glam::{DVec2, DVec3};
use shell_cad::{BooleanType, CadKernel, Profile, SketchPlane, Solid, Wire2D};

use crate::error::ShellResult;
use crate::params::{Dimensions, WeldGroove};

/// Left and right halves of the frame
#[derive(Debug, Clone)]
pub struct Halves {
    pub left: Solid,
    pub right: Solid,
}

/// Intersect `frame` with the boxes on either side of the split plane
pub fn bisect(kernel: &dyn CadKernel, frame: &Solid, dims: &Dimensions) -> ShellResult<Halves> {
    let half_w = dims.split_x();
    let cutter_size = DVec3::new(half_w, dims.outer_h, dims.total_height);

    let left_cutter = kernel.create_box(DVec3::ZERO, cutter_size)?;
    let right_cutter = kernel.create_box(DVec3::new(half_w, 0.0, 0.0), cutter_size)?;

    let left = kernel.boolean(frame, &left_cutter, BooleanType::Intersect)?;
    let right = kernel.boolean(frame, &right_cutter, BooleanType::Intersect)?;
    tracing::debug!("Split frame at x = {}", half_w);

    Ok(Halves { left, right })
}

/// Triangle cross sections of the groove, in sketch coordinates, with the
/// plane each one is drawn on and how far it is extruded
fn groove_sections(
    groove: &WeldGroove,
    dims: &Dimensions,
) -> [(SketchPlane, [DVec2; 3], DVec3); 4] {
    let x = dims.split_x();
    let w = groove.width;
    let d = groove.depth;
    let inset = groove.inset;
    let h = dims.outer_h;
    let t = dims.total_height;
    let along_z = DVec3::new(0.0, 0.0, t);
    let along_y = DVec3::new(0.0, h - 2.0 * inset, 0.0);

    [
        // Front face
        (
            SketchPlane::xy(0.0),
            [
                DVec2::new(x, inset + d),
                DVec2::new(x - w, inset),
                DVec2::new(x + w, inset),
            ],
            along_z,
        ),
        // Back face
        (
            SketchPlane::xy(0.0),
            [
                DVec2::new(x, h - inset - d),
                DVec2::new(x - w, h - inset),
                DVec2::new(x + w, h - inset),
            ],
            along_z,
        ),
        // Top rim
        (
            SketchPlane::xz(inset),
            [
                DVec2::new(x, t - inset),
                DVec2::new(x - w, t - inset - d),
                DVec2::new(x + w, t - inset - d),
            ],
            along_y,
        ),
        // Bottom rim
        (
            SketchPlane::xz(inset),
            [
                DVec2::new(x, inset),
                DVec2::new(x - w, inset + d),
                DVec2::new(x + w, inset + d),
            ],
            along_y,
        ),
    ]
}

/// The V-groove along the seam as one solid
pub fn weld_groove(
    kernel: &dyn CadKernel,
    groove: &WeldGroove,
    dims: &Dimensions,
) -> ShellResult<Option<Solid>> {
    let mut prisms = Vec::with_capacity(4);
    for (plane, points, extrusion) in groove_sections(groove, dims) {
        let profile = Profile::from_outer(Wire2D::polygon(points.to_vec()));
        let length = extrusion.length();
        prisms.push(kernel.extrude(&profile, &plane, extrusion / length, length)?);
    }
    Ok(kernel.fuse_all(&prisms)?)
}

/// Subtract the weld groove from both halves
pub fn cut_weld_groove(
    kernel: &dyn CadKernel,
    halves: Halves,
    groove: &WeldGroove,
    dims: &Dimensions,
) -> ShellResult<Halves> {
    let Some(cutter) = weld_groove(kernel, groove, dims)? else {
        return Ok(halves);
    };
    tracing::info!("Cutting weld groove along the seam");
    Ok(Halves {
        left: kernel.boolean(&halves.left, &cutter, BooleanType::Subtract)?,
        right: kernel.boolean(&halves.right, &cutter, BooleanType::Subtract)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ShellParams;
    use approx::assert_relative_eq;
    use shell_cad::{BoundingBox, CsgKernel, KernelConfig};

    fn slab_dims() -> Dimensions {
        Dimensions {
            cavity_w: 10.0,
            cavity_h: 10.0,
            outer_w: 20.0,
            outer_h: 12.0,
            total_height: 6.0,
        }
    }

    #[test]
    fn test_halves_are_additive() {
        let kernel = CsgKernel::with_config(KernelConfig {
            volume_cell: 0.5,
            ..KernelConfig::default()
        })
        .unwrap();
        let dims = slab_dims();
        let frame = kernel
            .create_box(DVec3::ZERO, DVec3::new(20.0, 12.0, 6.0))
            .unwrap();
        let hole = kernel
            .create_cylinder(DVec3::new(9.0, 6.0, -1.0), 2.5, 8.0, DVec3::Z)
            .unwrap();
        let frame = kernel.boolean(&frame, &hole, BooleanType::Subtract).unwrap();

        let halves = bisect(&kernel, &frame, &dims).unwrap();
        let total = kernel.volume(&frame).unwrap();
        let left = kernel.volume(&halves.left).unwrap();
        let right = kernel.volume(&halves.right).unwrap();
        assert_relative_eq!(left + right, total, epsilon = 1e-9);
        assert!(left < right);

        // Points on the split plane belong to the right half only
        let p = DVec3::new(10.0, 1.0, 1.0);
        assert!(!kernel.contains_point(&halves.left, p).unwrap());
        assert!(kernel.contains_point(&halves.right, p).unwrap());
    }

    #[test]
    fn test_weld_groove_cuts_both_sides_of_seam() {
        let kernel = CsgKernel::new();
        let dims = slab_dims();
        let frame = kernel
            .create_box(DVec3::ZERO, DVec3::new(20.0, 12.0, 6.0))
            .unwrap();
        let halves = bisect(&kernel, &frame, &dims).unwrap();
        let groove = WeldGroove::default();
        let cut = cut_weld_groove(&kernel, halves, &groove, &dims).unwrap();

        // Just inside the front face, right at the seam
        let left_probe = DVec3::new(9.8, 1.7, 3.0);
        let right_probe = DVec3::new(10.2, 1.7, 3.0);
        assert!(!kernel.contains_point(&cut.left, left_probe).unwrap());
        assert!(!kernel.contains_point(&cut.right, right_probe).unwrap());
        // Away from the seam nothing changes
        assert!(kernel.contains_point(&cut.left, DVec3::new(5.0, 1.7, 3.0)).unwrap());
        // Under the top rim
        assert!(!kernel.contains_point(&cut.right, DVec3::new(10.1, 6.0, 4.3)).unwrap());
    }

    #[test]
    fn test_default_groove_fits_envelope() {
        let kernel = CsgKernel::new();
        let dims = Dimensions::from_params(&ShellParams::default());
        let groove = weld_groove(&kernel, &WeldGroove::default(), &dims)
            .unwrap()
            .unwrap();
        let bbox = kernel.bounding_box(&groove).unwrap();
        let envelope = BoundingBox::new(
            DVec3::ZERO,
            DVec3::new(dims.outer_w, dims.outer_h, dims.total_height),
        );
        assert!(envelope.contains_box(&bbox, 1e-9));
        assert_relative_eq!(bbox.min.x, dims.split_x() - 1.5, epsilon = 1e-9);
    }
}
