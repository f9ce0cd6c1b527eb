//! Constant-radius fillets on axis-aligned straight and circular edges
//!
//! A convex edge is rounded by removing a wedge of material; a concave edge
//! by adding one. Each wedge is the corner square of side `r` minus the
//! rounding disc, swept along the edge.

use std::f64::consts::TAU;
use std::sync::Arc;

use glam::{DVec2, DVec3};

use super::edges::{Curve, EdgeRecord};
use super::node::{Node, Wedge, WedgePath, WedgeSection, plane_coords};
use crate::kernel::{CadError, CadResult};

/// Offset of the diagonal probes used to classify an edge
const CLASSIFY_OFFSET: f64 = 1e-3;
/// Clearance inside the rounding arc for feasibility checks
const ARC_CLEARANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Convexity {
    Convex,
    Concave,
}

/// Round the given edges of `root` with `radius`
pub(crate) fn fillet(root: &Arc<Node>, edges: &[(u32, &EdgeRecord)], radius: f64) -> CadResult<Node> {
    let mut added = Vec::new();
    let mut removed = Vec::new();

    for &(index, record) in edges {
        let (wedge, convexity) = wedge_for(root, index, record, radius)?;
        check_fits(root, index, record, &wedge, convexity)?;
        let node = Arc::new(Node::wedge(wedge));
        match convexity {
            Convexity::Convex => removed.push(node),
            Convexity::Concave => added.push(node),
        }
    }

    let mut result = root.clone();
    if !added.is_empty() {
        result = Arc::new(Node::union(result, Node::union_all(added)));
    }
    if !removed.is_empty() {
        result = Arc::new(Node::difference(result, Node::union_all(removed)));
    }
    Ok(Arc::unwrap_or_clone(result))
}

fn wedge_for(
    root: &Node,
    index: u32,
    record: &EdgeRecord,
    radius: f64,
) -> CadResult<(Wedge, Convexity)> {
    let curve = &record.curve;
    let axis = curve.world_axis().ok_or_else(|| {
        CadError::FilletFailed(format!("edge {index} is not aligned with a world axis"))
    })?;

    let (su, sv, convexity) = classify(root, curve, 0.5).ok_or_else(|| {
        CadError::FilletFailed(format!("edge {index} is neither convex nor concave"))
    })?;
    let section = WedgeSection { su, sv, radius };

    let path = match *curve {
        Curve::Segment { a, b } => {
            let (u, v) = plane_coords(a, axis);
            WedgePath::Line {
                axis,
                start: a[axis].min(b[axis]),
                end: a[axis].max(b[axis]),
                corner: DVec2::new(u, v),
            }
        }
        Curve::Arc { center, radius: arc_radius, .. } => {
            let (cu, cv) = plane_coords(center, axis);
            let c = DVec2::new(cu, cv);
            let angle_of = |p: DVec3| {
                let (u, v) = plane_coords(p, axis);
                (v - c.y).atan2(u - c.x)
            };
            let (start_angle, sweep) = if curve.is_full_circle() {
                (0.0, TAU)
            } else {
                let a0 = angle_of(curve.point(0.0));
                let a1 = angle_of(curve.point(1.0));
                let am = angle_of(curve.point(0.5));
                let ccw = (a1 - a0).rem_euclid(TAU);
                if (am - a0).rem_euclid(TAU) <= ccw {
                    (a0, ccw)
                } else {
                    (a1, TAU - ccw)
                }
            };
            WedgePath::Arc {
                axis,
                center: c,
                plane: center[axis],
                arc_radius,
                start_angle,
                sweep,
            }
        }
    };
    Ok((Wedge { path, section }, convexity))
}

/// Probe the four diagonal quadrants around the curve at `t`.
///
/// Returns the quadrant signs pointing into the material (convex) or into
/// the empty space (concave).
fn classify(root: &Node, curve: &Curve, t: f64) -> Option<(f64, f64, Convexity)> {
    let p = curve.point(t);
    let (b1, b2) = curve.normal_frame(t);
    let quadrants = [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)];
    let inside: Vec<bool> = quadrants
        .iter()
        .map(|(su, sv)| root.contains(p + (b1 * *su + b2 * *sv) * CLASSIFY_OFFSET))
        .collect();

    match inside.iter().filter(|x| **x).count() {
        1 => {
            let i = inside.iter().position(|x| *x)?;
            Some((quadrants[i].0, quadrants[i].1, Convexity::Convex))
        }
        3 => {
            let i = inside.iter().position(|x| !*x)?;
            Some((quadrants[i].0, quadrants[i].1, Convexity::Concave))
        }
        _ => None,
    }
}

/// The rounding arc must stay in material (convex) or in empty space
/// (concave) along the whole edge.
fn check_fits(
    root: &Node,
    index: u32,
    record: &EdgeRecord,
    wedge: &Wedge,
    convexity: Convexity,
) -> CadResult<()> {
    let r = wedge.section.radius;
    let (su, sv) = (wedge.section.su, wedge.section.sv);
    let samples = (record.curve.length().ceil() as usize).clamp(3, 64);
    let expected = convexity == Convexity::Convex;

    for i in 0..samples {
        let t = (i as f64 + 0.5) / samples as f64;
        let p = record.curve.point(t);
        let (b1, b2) = record.curve.normal_frame(t);
        for degrees in [15.0_f64, 45.0, 75.0] {
            let theta = degrees.to_radians();
            let du = r - (r - ARC_CLEARANCE) * theta.cos();
            let dv = r - (r - ARC_CLEARANCE) * theta.sin();
            let q = p + b1 * (su * du) + b2 * (sv * dv);
            if root.contains(q) != expected {
                return Err(CadError::FilletFailed(format!(
                    "radius {r} does not fit at edge {index}"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::csg::edges::enumerate;

    fn cuboid(min: [f64; 3], max: [f64; 3]) -> Arc<Node> {
        Arc::new(Node::cuboid(DVec3::from(min), DVec3::from(max)))
    }

    fn vertical_edge(edges: &[EdgeRecord], x: f64, y: f64) -> (u32, &EdgeRecord) {
        edges
            .iter()
            .enumerate()
            .find(|(_, e)| {
                let p = e.curve.point(0.5);
                e.curve.world_axis() == Some(2) && (p.x - x).abs() < 1e-6 && (p.y - y).abs() < 1e-6
            })
            .map(|(i, e)| (i as u32, e))
            .unwrap()
    }

    #[test]
    fn convex_corner_is_rounded() {
        let block = cuboid([0.0; 3], [10.0, 10.0, 5.0]);
        let edges = enumerate(&block);
        let edge = vertical_edge(&edges, 0.0, 0.0);
        let rounded = fillet(&block, &[edge], 2.0).unwrap();

        assert!(!rounded.contains(DVec3::new(0.1, 0.1, 2.5)));
        assert!(rounded.contains(DVec3::new(1.0, 1.0, 2.5)));
        assert!(rounded.contains(DVec3::new(0.1, 5.0, 2.5)));
        // Other corners untouched
        assert!(rounded.contains(DVec3::new(9.95, 9.95, 2.5)));
    }

    #[test]
    fn concave_corner_gains_material() {
        let pocket = Node::difference(
            cuboid([0.0; 3], [20.0, 20.0, 5.0]),
            cuboid([5.0, 5.0, 2.0], [15.0, 15.0, 6.0]),
        );
        let pocket = Arc::new(pocket);
        let edges = enumerate(&pocket);
        let edge = vertical_edge(&edges, 5.0, 5.0);
        assert!(!pocket.contains(DVec3::new(5.1, 5.1, 3.0)));

        let rounded = fillet(&pocket, &[edge], 2.0).unwrap();
        assert!(rounded.contains(DVec3::new(5.1, 5.1, 3.0)));
        assert!(!rounded.contains(DVec3::new(6.0, 6.0, 3.0)));
    }

    #[test]
    fn oversized_radius_fails() {
        let plate = cuboid([0.0; 3], [10.0, 10.0, 1.0]);
        let edges = enumerate(&plate);
        let edge = edges
            .iter()
            .enumerate()
            .find(|(_, e)| e.curve.world_axis() == Some(0))
            .map(|(i, e)| (i as u32, e))
            .unwrap();
        let result = fillet(&plate, &[edge], 3.0);
        assert!(matches!(result, Err(CadError::FilletFailed(_))));
    }

    #[test]
    fn flat_edge_is_rejected() {
        let segment = EdgeRecord {
            curve: Curve::Segment {
                a: DVec3::new(0.0, 5.0, 5.0),
                b: DVec3::new(10.0, 5.0, 5.0),
            },
            closed: false,
        };
        let block = cuboid([0.0; 3], [10.0, 10.0, 10.0]);
        let result = fillet(&block, &[(0, &segment)], 1.0);
        assert!(matches!(result, Err(CadError::FilletFailed(_))));
    }

    #[test]
    fn arc_edge_is_rounded_around_its_axis() {
        let block = cuboid([0.0; 3], [10.0, 10.0, 5.0]);
        let edges = enumerate(&block);
        let corner = vertical_edge(&edges, 0.0, 0.0);
        let rounded = Arc::new(fillet(&block, &[corner], 3.0).unwrap());

        let rim = enumerate(&rounded)
            .into_iter()
            .find(|e| matches!(e.curve, Curve::Arc { .. }) && e.curve.point(0.5).z < 1e-6)
            .unwrap();
        let smoothed = fillet(&rounded, &[(0, &rim)], 1.0).unwrap();

        let mid = rim.curve.point(0.5);
        let Curve::Arc { center, .. } = rim.curve else {
            unreachable!()
        };
        let inward = (center - mid).normalize();
        // Sharp rim corner removed, body just inside kept
        assert!(rounded.contains(mid + inward * 0.05 + DVec3::Z * 0.05));
        assert!(!smoothed.contains(mid + inward * 0.05 + DVec3::Z * 0.05));
        assert!(smoothed.contains(mid + inward * 1.0 + DVec3::Z * 1.0));
    }
}
