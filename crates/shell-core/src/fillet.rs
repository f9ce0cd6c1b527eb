//! Edge classification and the three fillet passes
//!
//! Edges are picked by where they sit, not by topology: a pass enumerates the
//! current solid's edges, keeps the ones its [`EdgeClass`] matches, and
//! fillets them all in one kernel call. A failing kernel call never aborts
//! generation; the pass hands back its input unchanged.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use shell_cad::{CadKernel, EdgeInfo, Solid};

use crate::constants::{EDGE_AXIS_TOLERANCE, EDGE_POSITION_TOLERANCE, INNER_CORNER_Z_SLACK};
use crate::params::{Dimensions, FilletRadii, ShellParams};

/// Which edges a fillet pass selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeClass {
    /// Vertical edges at the four corners of the tablet pocket
    InnerCorner,
    /// Vertical edges at the four corners of the outer box
    OuterVertical,
    /// Edges around the bottom and top rims of the outer box
    OuterHorizontal,
}

impl EdgeClass {
    pub fn label(&self) -> &'static str {
        match self {
            EdgeClass::InnerCorner => "inner corners",
            EdgeClass::OuterVertical => "outer vertical corners",
            EdgeClass::OuterHorizontal => "outer horizontal edges",
        }
    }

    /// Whether `edge` belongs to this class
    pub fn matches(&self, edge: &EdgeInfo, params: &ShellParams, dims: &Dimensions) -> bool {
        if edge.vertex_count() < 2 {
            return false;
        }
        let (p1, p2) = (edge.start, edge.end);

        match self {
            EdgeClass::InnerCorner => {
                let wall = params.wall;
                let corners_x = [wall, dims.outer_w - wall];
                let corners_y = [wall, dims.outer_h - wall];
                let z = p1.z.min(p2.z);
                is_vertical(p1, p2)
                    && at_corner(p1, &corners_x, &corners_y)
                    && z > wall - INNER_CORNER_Z_SLACK
                    && z < wall + params.tablet_space + INNER_CORNER_Z_SLACK
            }
            EdgeClass::OuterVertical => {
                is_vertical(p1, p2)
                    && at_corner(p1, &[0.0, dims.outer_w], &[0.0, dims.outer_h])
            }
            EdgeClass::OuterHorizontal => {
                if (p1.z - p2.z).abs() >= EDGE_AXIS_TOLERANCE {
                    return false;
                }
                let on_rim = near(p1.z, dims.total_height) || near(p1.z, 0.0);
                if !on_rim {
                    return false;
                }
                let lo = p1.min(p2).min(edge.midpoint);
                let hi = p1.max(p2).max(edge.midpoint);
                near(lo.x, 0.0)
                    || near(hi.x, dims.outer_w)
                    || near(lo.y, 0.0)
                    || near(hi.y, dims.outer_h)
            }
        }
    }
}

fn near(value: f64, target: f64) -> bool {
    (value - target).abs() < EDGE_POSITION_TOLERANCE
}

fn is_vertical(p1: DVec3, p2: DVec3) -> bool {
    (p1.x - p2.x).abs() < EDGE_AXIS_TOLERANCE && (p1.y - p2.y).abs() < EDGE_AXIS_TOLERANCE
}

fn at_corner(p: DVec3, xs: &[f64; 2], ys: &[f64; 2]) -> bool {
    xs.iter().any(|&x| near(p.x, x)) && ys.iter().any(|&y| near(p.y, y))
}

/// One fillet pass: an edge class and its radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilletPass {
    pub class: EdgeClass,
    pub radius: f64,
}

impl FilletPass {
    /// The passes in the order they run
    pub fn sequence(radii: &FilletRadii) -> [FilletPass; 3] {
        [
            FilletPass {
                class: EdgeClass::InnerCorner,
                radius: radii.inner_corner,
            },
            FilletPass {
                class: EdgeClass::OuterVertical,
                radius: radii.outer_corner,
            },
            FilletPass {
                class: EdgeClass::OuterHorizontal,
                radius: radii.outer_edge,
            },
        ]
    }
}

/// What happened in a fillet pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FilletOutcome {
    Applied { edges: usize },
    Skipped,
    Failed { reason: String },
}

/// Outcome of one pass, as recorded in the generation report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilletRecord {
    pub class: EdgeClass,
    pub radius: f64,
    pub outcome: FilletOutcome,
}

/// Run one pass on `solid`. Returns the filleted solid, or `solid` itself
/// when the pass was skipped or failed.
pub fn apply_pass(
    kernel: &dyn CadKernel,
    solid: &Solid,
    pass: FilletPass,
    params: &ShellParams,
    dims: &Dimensions,
) -> (Solid, FilletOutcome) {
    if pass.radius <= 0.0 {
        tracing::info!("No {} fillet, radius is {}", pass.class.label(), pass.radius);
        return (solid.clone(), FilletOutcome::Skipped);
    }

    let edges = match kernel.get_edges(solid) {
        Ok(edges) => edges,
        Err(e) => {
            tracing::warn!("Could not list edges for {}: {}", pass.class.label(), e);
            return (
                solid.clone(),
                FilletOutcome::Failed {
                    reason: e.to_string(),
                },
            );
        }
    };

    let selected: Vec<_> = edges
        .iter()
        .filter(|edge| pass.class.matches(edge, params, dims))
        .map(|edge| edge.id)
        .collect();

    if selected.is_empty() {
        tracing::info!("No {} found to fillet", pass.class.label());
        return (solid.clone(), FilletOutcome::Skipped);
    }

    tracing::info!(
        "Filleting {} {} with radius {}",
        selected.len(),
        pass.class.label(),
        pass.radius
    );

    match kernel.fillet(solid, &selected, pass.radius) {
        Ok(filleted) => (
            filleted,
            FilletOutcome::Applied {
                edges: selected.len(),
            },
        ),
        Err(e) => {
            tracing::warn!("Failed to fillet {}: {}", pass.class.label(), e);
            (
                solid.clone(),
                FilletOutcome::Failed {
                    reason: e.to_string(),
                },
            )
        }
    }
}

/// Run all three passes in order, each on the previous pass's output
pub fn apply_all(
    kernel: &dyn CadKernel,
    solid: &Solid,
    params: &ShellParams,
    dims: &Dimensions,
) -> (Solid, Vec<FilletRecord>) {
    let mut current = solid.clone();
    let mut records = Vec::with_capacity(3);
    for pass in FilletPass::sequence(&params.fillets) {
        let (next, outcome) = apply_pass(kernel, &current, pass, params, dims);
        records.push(FilletRecord {
            class: pass.class,
            radius: pass.radius,
            outcome,
        });
        current = next;
    }
    (current, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::build_frame;
    use shell_cad::{CsgKernel, EdgeId, KernelConfig, NullKernel};
    use uuid::Uuid;

    fn edge(start: DVec3, end: DVec3) -> EdgeInfo {
        EdgeInfo::new(EdgeId::new(Uuid::nil(), 0), start, end)
    }

    fn setup() -> (ShellParams, Dimensions) {
        let params = ShellParams::default();
        let dims = Dimensions::from_params(&params);
        (params, dims)
    }

    #[test]
    fn test_inner_corner_predicate() {
        let (params, dims) = setup();
        let class = EdgeClass::InnerCorner;
        assert!(class.matches(
            &edge(DVec3::new(3.0, 3.0, 3.0), DVec3::new(3.0, 3.0, 18.1)),
            &params,
            &dims
        ));
        assert!(class.matches(
            &edge(DVec3::new(304.0, 208.05, 3.0), DVec3::new(304.0, 208.05, 18.1)),
            &params,
            &dims
        ));
        // Endpoint order does not matter, the lower z is tested
        assert!(class.matches(
            &edge(DVec3::new(3.0, 3.0, 18.1), DVec3::new(3.0, 3.0, 3.0)),
            &params,
            &dims
        ));
        // Lip corner is not a pocket corner
        assert!(!class.matches(
            &edge(DVec3::new(6.0, 12.0, 18.1), DVec3::new(6.0, 12.0, 21.0)),
            &params,
            &dims
        ));
        // Pocket corner height but starting too high
        assert!(!class.matches(
            &edge(DVec3::new(3.0, 3.0, 19.0), DVec3::new(3.0, 3.0, 21.0)),
            &params,
            &dims
        ));
    }

    #[test]
    fn test_outer_predicates() {
        let (params, dims) = setup();
        let vertical = edge(DVec3::new(307.0, 0.0, 0.0), DVec3::new(307.0, 0.0, 21.0));
        assert!(EdgeClass::OuterVertical.matches(&vertical, &params, &dims));
        assert!(!EdgeClass::OuterHorizontal.matches(&vertical, &params, &dims));

        let bottom_rim = edge(DVec3::new(5.0, 0.0, 0.0), DVec3::new(302.0, 0.0, 0.0));
        assert!(EdgeClass::OuterHorizontal.matches(&bottom_rim, &params, &dims));
        assert!(!EdgeClass::OuterVertical.matches(&bottom_rim, &params, &dims));

        let top_rim = edge(DVec3::new(307.0, 5.0, 21.0), DVec3::new(307.0, 206.0, 21.0));
        assert!(EdgeClass::OuterHorizontal.matches(&top_rim, &params, &dims));

        // Lip opening edge on the top face touches no outer side
        let lip_edge = edge(DVec3::new(6.0, 12.0, 21.0), DVec3::new(301.0, 12.0, 21.0));
        assert!(!EdgeClass::OuterHorizontal.matches(&lip_edge, &params, &dims));

        // Bottom cutout rim at z = 0 is interior
        let hole_edge = edge(DVec3::new(13.0, 53.0, 0.0), DVec3::new(294.0, 53.0, 0.0));
        assert!(!EdgeClass::OuterHorizontal.matches(&hole_edge, &params, &dims));
    }

    #[test]
    fn test_closed_edges_are_skipped() {
        let (params, dims) = setup();
        let circle = EdgeInfo::closed(
            EdgeId::new(Uuid::nil(), 0),
            DVec3::new(0.0, 5.0, 0.0),
            DVec3::new(0.0, 0.0, 0.0),
            31.4,
        );
        for class in [
            EdgeClass::InnerCorner,
            EdgeClass::OuterVertical,
            EdgeClass::OuterHorizontal,
        ] {
            assert!(!class.matches(&circle, &params, &dims));
        }
    }

    #[test]
    fn test_frame_edge_counts() {
        let kernel = CsgKernel::new();
        let (params, dims) = setup();
        let frame = build_frame(&kernel, &params, &dims).unwrap().solid;
        let edges = kernel.get_edges(&frame).unwrap();

        let count = |class: EdgeClass| {
            edges
                .iter()
                .filter(|e| class.matches(e, &params, &dims))
                .count()
        };
        assert_eq!(count(EdgeClass::InnerCorner), 4);
        assert_eq!(count(EdgeClass::OuterVertical), 4);
        assert_eq!(count(EdgeClass::OuterHorizontal), 8);
    }

    #[test]
    fn test_default_passes_apply() {
        let kernel = CsgKernel::with_config(KernelConfig {
            volume_cell: 1.0,
            ..KernelConfig::default()
        })
        .unwrap();
        let (params, dims) = setup();
        let frame = build_frame(&kernel, &params, &dims).unwrap().solid;
        let (filleted, records) = apply_all(&kernel, &frame, &params, &dims);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].outcome, FilletOutcome::Applied { edges: 4 });
        assert_eq!(records[1].outcome, FilletOutcome::Applied { edges: 4 });
        assert!(matches!(
            records[2].outcome,
            FilletOutcome::Applied { edges } if edges >= 8
        ));

        // Rounded outer corner, filled inner corner
        let inside = |p: DVec3| kernel.contains_point(&filleted, p).unwrap();
        assert!(!inside(DVec3::new(0.3, 0.3, 10.0)));
        assert!(inside(DVec3::new(3.3, 3.3, 10.0)));
        assert!(!inside(DVec3::new(0.05, 100.0, 0.05)));
    }

    #[test]
    fn test_oversized_fillet_is_recovered() {
        let kernel = CsgKernel::with_config(KernelConfig {
            volume_cell: 1.0,
            ..KernelConfig::default()
        })
        .unwrap();
        let (mut params, dims) = setup();
        params.fillets.inner_corner = 0.0;
        params.fillets.outer_corner = 0.0;
        params.fillets.outer_edge = 50.0;
        let frame = build_frame(&kernel, &params, &dims).unwrap().solid;
        let (result, records) = apply_all(&kernel, &frame, &params, &dims);

        assert_eq!(records[0].outcome, FilletOutcome::Skipped);
        assert_eq!(records[1].outcome, FilletOutcome::Skipped);
        assert!(matches!(records[2].outcome, FilletOutcome::Failed { .. }));
        assert_eq!(result.id, frame.id);
    }

    #[test]
    fn test_kernel_without_edges_fails_softly() {
        let kernel = NullKernel;
        let (params, dims) = setup();
        let solid = Solid::new(Uuid::new_v4());
        let (result, outcome) = apply_pass(
            &kernel,
            &solid,
            FilletPass::sequence(&params.fillets)[0],
            &params,
            &dims,
        );
        assert!(matches!(outcome, FilletOutcome::Failed { .. }));
        assert_eq!(result.id, solid.id);
    }
}
