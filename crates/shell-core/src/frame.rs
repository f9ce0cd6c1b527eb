//! Unfilleted enclosure blank

use glam::DVec3;
use shell_cad::{BooleanType, CadKernel, Solid};

use crate::constants::{BOTTOM_CUT_OVERSHOOT, CAVITY_OVERSHOOT};
use crate::error::ShellResult;
use crate::params::{Dimensions, ShellParams};

/// The blank before filleting, plus what was actually cut
#[derive(Debug, Clone)]
pub struct FrameBlank {
    pub solid: Solid,
    pub bottom_cutout_applied: bool,
}

/// Origin and size of an axis-aligned cut
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutBox {
    pub origin: DVec3,
    pub size: DVec3,
}

impl CutBox {
    pub fn new(origin: DVec3, size: DVec3) -> Self {
        Self { origin, size }
    }

    pub fn is_degenerate(&self) -> bool {
        self.size.min_element() <= 0.0
    }

    pub fn create(&self, kernel: &dyn CadKernel) -> ShellResult<Solid> {
        Ok(kernel.create_box(self.origin, self.size)?)
    }
}

/// Pocket holding the tablet body
pub fn lower_cavity(params: &ShellParams, dims: &Dimensions) -> CutBox {
    CutBox::new(
        DVec3::splat(params.wall),
        DVec3::new(
            dims.cavity_w,
            dims.cavity_h,
            params.tablet_space + CAVITY_OVERSHOOT,
        ),
    )
}

/// Narrower opening above the pocket that leaves the retaining lip
pub fn lip_cavity(params: &ShellParams, dims: &Dimensions) -> CutBox {
    let lip = &params.lip;
    CutBox::new(
        DVec3::new(
            params.wall + lip.overhang,
            params.wall + lip.overhang_bottom,
            params.wall + params.tablet_space,
        ),
        DVec3::new(
            dims.cavity_w - 2.0 * lip.overhang,
            dims.cavity_h - lip.overhang - lip.overhang_bottom,
            lip.vertical + CAVITY_OVERSHOOT,
        ),
    )
}

/// Material-saving hole through the bottom wall
pub fn bottom_cutout(params: &ShellParams, dims: &Dimensions) -> CutBox {
    let cut = &params.bottom_cutout;
    CutBox::new(
        DVec3::new(
            params.wall + cut.margin,
            params.wall + cut.margin + cut.solid_bottom,
            -BOTTOM_CUT_OVERSHOOT,
        ),
        DVec3::new(
            dims.cavity_w - 2.0 * cut.margin,
            dims.cavity_h - 2.0 * cut.margin - cut.solid_top - cut.solid_bottom,
            params.wall + 2.0 * BOTTOM_CUT_OVERSHOOT,
        ),
    )
}

/// Centre of the webcam hole in the XY plane
pub fn webcam_center(params: &ShellParams, dims: &Dimensions) -> DVec3 {
    DVec3::new(
        params.wall + params.webcam.from_side,
        dims.outer_h - params.wall - params.webcam.from_top,
        -0.5,
    )
}

/// Build the blank: outer box minus both cavities, the bottom cutout and the
/// webcam hole
pub fn build_frame(
    kernel: &dyn CadKernel,
    params: &ShellParams,
    dims: &Dimensions,
) -> ShellResult<FrameBlank> {
    let outer = kernel.create_box(
        DVec3::ZERO,
        DVec3::new(dims.outer_w, dims.outer_h, dims.total_height),
    )?;

    let mut cuts = vec![
        lower_cavity(params, dims).create(kernel)?,
        lip_cavity(params, dims).create(kernel)?,
    ];

    let bottom = bottom_cutout(params, dims);
    let bottom_cutout_applied = !bottom.is_degenerate();
    if bottom_cutout_applied {
        cuts.push(bottom.create(kernel)?);
    } else {
        tracing::info!(
            "Bottom cutout skipped, size {:.2} x {:.2} is not positive",
            bottom.size.x,
            bottom.size.y
        );
    }

    cuts.push(kernel.create_cylinder(
        webcam_center(params, dims),
        params.webcam.radius,
        params.wall + 1.0,
        DVec3::Z,
    )?);

    let mut solid = outer;
    for cut in &cuts {
        solid = kernel.boolean(&solid, cut, BooleanType::Subtract)?;
    }

    tracing::debug!(
        "Frame blank {} x {} x {}",
        dims.outer_w,
        dims.outer_h,
        dims.total_height
    );

    Ok(FrameBlank {
        solid,
        bottom_cutout_applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use shell_cad::{CadError, CsgKernel};

    #[test]
    fn test_default_cut_boxes() {
        let params = ShellParams::default();
        let dims = Dimensions::from_params(&params);

        let lip = lip_cavity(&params, &dims);
        assert_relative_eq!(lip.origin.x, 6.0);
        assert_relative_eq!(lip.origin.y, 12.0);
        assert_relative_eq!(lip.origin.z, 18.0);
        assert_relative_eq!(lip.size.x, 295.0);
        assert_relative_eq!(lip.size.y, 193.0);

        let bottom = bottom_cutout(&params, &dims);
        assert_relative_eq!(bottom.origin.x, 13.0);
        assert_relative_eq!(bottom.origin.y, 53.0);
        assert_relative_eq!(bottom.size.x, 281.0);
        assert_relative_eq!(bottom.size.y, 105.0);
        assert_relative_eq!(bottom.size.z, 3.1);

        let cam = webcam_center(&params, &dims);
        assert_relative_eq!(cam.x, 21.0);
        assert_relative_eq!(cam.y, 190.0);
    }

    #[test]
    fn test_envelope_matches_parameters() {
        let kernel = CsgKernel::new();
        let params = ShellParams::default();
        let dims = Dimensions::from_params(&params);
        let frame = build_frame(&kernel, &params, &dims).unwrap();
        assert!(frame.bottom_cutout_applied);

        let bbox = kernel.bounding_box(&frame.solid).unwrap();
        let size = bbox.size();
        assert_relative_eq!(size.x, 307.0, epsilon = 1e-9);
        assert_relative_eq!(size.y, 211.0, epsilon = 1e-9);
        assert_relative_eq!(size.z, 21.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.min.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_frame_membership() {
        let kernel = CsgKernel::new();
        let params = ShellParams::default();
        let dims = Dimensions::from_params(&params);
        let frame = build_frame(&kernel, &params, &dims).unwrap().solid;

        let inside = |p: DVec3| kernel.contains_point(&frame, p).unwrap();
        // Bottom wall under the solid band
        assert!(inside(DVec3::new(150.0, 30.0, 1.5)));
        // Tablet pocket
        assert!(!inside(DVec3::new(150.0, 30.0, 10.0)));
        // Lip over the pocket
        assert!(inside(DVec3::new(4.5, 100.0, 19.5)));
        assert!(!inside(DVec3::new(7.0, 100.0, 19.5)));
        // Bottom cutout and webcam hole
        assert!(!inside(DVec3::new(150.0, 100.0, 1.5)));
        assert!(!inside(DVec3::new(21.0, 190.0, 1.5)));
        assert!(inside(DVec3::new(28.0, 190.0, 1.5)));
    }

    #[test]
    fn test_degenerate_bottom_cutout_is_skipped() {
        let kernel = CsgKernel::new();
        let mut params = ShellParams::default();
        params.bottom_cutout.solid_top = 100.0;
        params.bottom_cutout.solid_bottom = 100.0;
        let dims = Dimensions::from_params(&params);

        let frame = build_frame(&kernel, &params, &dims).unwrap();
        assert!(!frame.bottom_cutout_applied);
        assert!(
            kernel
                .contains_point(&frame.solid, DVec3::new(150.0, 100.0, 1.5))
                .unwrap()
        );
    }

    #[test]
    fn test_invalid_webcam_is_fatal() {
        let kernel = CsgKernel::new();
        let mut params = ShellParams::default();
        params.webcam.radius = 0.0;
        let dims = Dimensions::from_params(&params);
        let result = build_frame(&kernel, &params, &dims);
        assert!(matches!(
            result,
            Err(crate::error::ShellError::Cad(CadError::InvalidParameter(_)))
        ));
    }
}
