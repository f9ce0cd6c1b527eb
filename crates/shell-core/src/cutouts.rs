//! Port slots, kickstand notches and ventilation holes

use glam::DVec3;
use serde::{Deserialize, Serialize};
use shell_cad::{BooleanType, CadKernel, Solid};

use crate::constants::THROUGH_CUT_OVERSHOOT;
use crate::error::ShellResult;
use crate::frame::CutBox;
use crate::params::{Dimensions, ShellParams, SideLayout};

/// Which half a cutout belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn layout<'a>(&self, params: &'a ShellParams) -> &'a SideLayout {
        match self {
            Side::Left => &params.left,
            Side::Right => &params.right,
        }
    }
}

/// Slots cut through a side wall for ports and buttons
pub fn port_boxes(params: &ShellParams, dims: &Dimensions, side: Side) -> Vec<CutBox> {
    let x = match side {
        Side::Left => -THROUGH_CUT_OVERSHOOT,
        Side::Right => dims.outer_w - params.port_cut_width + THROUGH_CUT_OVERSHOOT,
    };
    side.layout(params)
        .ports
        .iter()
        .map(|slot| {
            let y = dims.cavity_h + params.wall - slot.from_top - slot.length;
            CutBox::new(
                DVec3::new(x, y, params.wall),
                DVec3::new(
                    params.port_cut_width,
                    slot.length,
                    params.tablet_space + 1.0,
                ),
            )
        })
        .collect()
}

/// Notch through the bottom wall for the kickstand hinge
pub fn kickstand_box(params: &ShellParams, dims: &Dimensions, side: Side) -> CutBox {
    let kick = side.layout(params).kickstand;
    let x = match side {
        Side::Left => params.wall,
        Side::Right => dims.outer_w - params.wall - kick.width,
    };
    CutBox::new(
        DVec3::new(x, dims.cavity_h + params.wall - kick.end, -0.5),
        DVec3::new(kick.width, kick.end - kick.start, params.wall + 1.0),
    )
}

/// Base points of the ventilation cylinders, both rows
pub fn vent_positions(params: &ShellParams, dims: &Dimensions) -> Vec<DVec3> {
    let vents = &params.vents;
    let r = vents.radius;
    let y = dims.outer_h - vents.wall_depth - 0.5;
    let z = params.wall + params.tablet_space / 2.0;

    let mut positions = Vec::new();
    let mut row = |start: f64, end: f64| {
        let mut x = start;
        while x + r < end {
            positions.push(DVec3::new(x, y, z));
            x += vents.spacing;
        }
    };
    row(vents.start + params.wall + r, vents.end + params.wall);
    row(
        dims.outer_w - vents.end - params.wall - r,
        dims.outer_w - vents.start - params.wall,
    );
    positions
}

/// Ventilation cylinders through the top wall. Built once and shared by
/// both halves.
pub fn vent_holes(
    kernel: &dyn CadKernel,
    params: &ShellParams,
    dims: &Dimensions,
) -> ShellResult<Vec<Solid>> {
    let length = params.vents.wall_depth + 1.0;
    vent_positions(params, dims)
        .into_iter()
        .map(|base| {
            Ok(kernel.create_cylinder(base, params.vents.radius, length, DVec3::Y)?)
        })
        .collect()
}

/// Port slots and kickstand notch of one side
pub fn side_cutouts(
    kernel: &dyn CadKernel,
    params: &ShellParams,
    dims: &Dimensions,
    side: Side,
) -> ShellResult<Vec<Solid>> {
    let mut solids = port_boxes(params, dims, side)
        .iter()
        .map(|b| b.create(kernel))
        .collect::<ShellResult<Vec<_>>>()?;
    solids.push(kickstand_box(params, dims, side).create(kernel)?);
    Ok(solids)
}

/// Fuse `cutouts` and subtract them from `half` in a single boolean
pub fn subtract_all(
    kernel: &dyn CadKernel,
    half: &Solid,
    cutouts: &[Solid],
) -> ShellResult<Solid> {
    match kernel.fuse_all(cutouts)? {
        Some(cutter) => Ok(kernel.boolean(half, &cutter, BooleanType::Subtract)?),
        None => Ok(half.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use shell_cad::{BoundingBox, CsgKernel};

    fn setup() -> (ShellParams, Dimensions) {
        let params = ShellParams::default();
        let dims = Dimensions::from_params(&params);
        (params, dims)
    }

    #[test]
    fn test_port_slot_placement() {
        let (params, dims) = setup();
        let left = port_boxes(&params, &dims, Side::Left);
        assert_eq!(left.len(), 2);
        assert_relative_eq!(left[0].origin.x, -1.0);
        assert_relative_eq!(left[0].origin.y, 111.0);
        assert_relative_eq!(left[0].size.y, 74.0);
        assert_relative_eq!(left[0].size.z, 16.0);
        assert_relative_eq!(left[1].origin.y, 43.0);

        let right = port_boxes(&params, &dims, Side::Right);
        assert_relative_eq!(right[0].origin.x, 300.0);
        assert_relative_eq!(right[0].origin.y, 116.0);
        assert_relative_eq!(right[1].origin.y, 33.0);
    }

    #[test]
    fn test_kickstand_placement() {
        let (params, dims) = setup();
        let left = kickstand_box(&params, &dims, Side::Left);
        assert_relative_eq!(left.origin.x, 3.0);
        assert_relative_eq!(left.origin.y, 53.0);
        assert_relative_eq!(left.origin.z, -0.5);
        assert_relative_eq!(left.size.y, 55.0);

        let right = kickstand_box(&params, &dims, Side::Right);
        assert_relative_eq!(right.origin.x, 294.0);
    }

    #[test]
    fn test_vent_rows() {
        let (params, dims) = setup();
        let positions = vent_positions(&params, &dims);
        let (left, right): (Vec<&DVec3>, Vec<&DVec3>) =
            positions.iter().partition(|p| p.x < dims.split_x());
        assert_eq!(left.len(), 8);
        assert_eq!(right.len(), 9);
        assert_relative_eq!(left[0].x, 21.0);
        assert_relative_eq!(right[0].x, 221.0);
        assert_relative_eq!(positions[0].y, 202.5);
        assert_relative_eq!(positions[0].z, 10.5);
    }

    #[test]
    fn test_cutouts_within_overshoot_of_envelope() {
        let kernel = CsgKernel::new();
        let (params, dims) = setup();
        let envelope = BoundingBox::new(
            DVec3::ZERO,
            DVec3::new(dims.outer_w, dims.outer_h, dims.total_height),
        )
        .expanded(THROUGH_CUT_OVERSHOOT);

        let mut all = vent_holes(&kernel, &params, &dims).unwrap();
        all.extend(side_cutouts(&kernel, &params, &dims, Side::Left).unwrap());
        all.extend(side_cutouts(&kernel, &params, &dims, Side::Right).unwrap());
        assert_eq!(all.len(), 17 + 3 + 3);

        for solid in &all {
            let bbox = kernel.bounding_box(solid).unwrap();
            assert!(envelope.contains_box(&bbox, 1e-9), "{:?}", bbox);
        }
    }

    #[test]
    fn test_subtract_all() {
        let kernel = CsgKernel::new();
        let slab = kernel
            .create_box(DVec3::ZERO, DVec3::new(10.0, 10.0, 2.0))
            .unwrap();
        assert_eq!(subtract_all(&kernel, &slab, &[]).unwrap().id, slab.id);

        let holes = [
            kernel
                .create_box(DVec3::new(1.0, 1.0, -1.0), DVec3::new(2.0, 2.0, 4.0))
                .unwrap(),
            kernel
                .create_box(DVec3::new(6.0, 6.0, -1.0), DVec3::new(2.0, 2.0, 4.0))
                .unwrap(),
        ];
        let cut = subtract_all(&kernel, &slab, &holes).unwrap();
        assert!(!kernel.contains_point(&cut, DVec3::new(2.0, 2.0, 1.0)).unwrap());
        assert!(!kernel.contains_point(&cut, DVec3::new(7.0, 7.0, 1.0)).unwrap());
        assert!(kernel.contains_point(&cut, DVec3::new(5.0, 5.0, 1.0)).unwrap());
    }
}
