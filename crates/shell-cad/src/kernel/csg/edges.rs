//! Boundary edge discovery for CSG trees
//!
//! Candidate curves are generated from primitive geometry (box face pairs,
//! prism outlines, cylinder rims, fillet wedge arcs) and then traced against
//! the combined solid: a point lies on an edge when the eight probes around
//! it in the normal plane show neither a solid interior, an empty exterior
//! nor a flat face.

use std::collections::{BTreeMap, HashSet};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

use glam::{DAffine3, DMat3, DVec2, DVec3};

use super::node::{Node, Shape, WedgePath, from_plane_coords};
use crate::kernel::{EdgeId, EdgeInfo};

/// Distance between consecutive samples along a candidate curve
const SAMPLE_SPACING: f64 = 0.25;
/// Radius of the probe ring around a sample point
const PROBE_RADIUS: f64 = 1e-3;
/// Bisection steps used to locate edge endpoints
const REFINE_STEPS: usize = 40;
/// Quantization used to merge collinear candidates and duplicate edges
const QUANTUM: f64 = 1e6;

/// Geometry of a candidate or traced edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Curve {
    Segment {
        a: DVec3,
        b: DVec3,
    },
    Arc {
        center: DVec3,
        x_dir: DVec3,
        y_dir: DVec3,
        radius: f64,
        start: f64,
        sweep: f64,
    },
}

impl Curve {
    pub fn point(&self, t: f64) -> DVec3 {
        match *self {
            Curve::Segment { a, b } => a.lerp(b, t),
            Curve::Arc {
                center,
                x_dir,
                y_dir,
                radius,
                start,
                sweep,
            } => {
                let angle = start + sweep * t;
                center + (x_dir * angle.cos() + y_dir * angle.sin()) * radius
            }
        }
    }

    pub fn length(&self) -> f64 {
        match *self {
            Curve::Segment { a, b } => a.distance(b),
            Curve::Arc { radius, sweep, .. } => radius * sweep.abs(),
        }
    }

    pub fn is_full_circle(&self) -> bool {
        matches!(*self, Curve::Arc { sweep, .. } if sweep.abs() >= TAU - 1e-9)
    }

    /// World axis the curve runs along (segments) or around (arcs), if any
    pub fn world_axis(&self) -> Option<usize> {
        let dir = match *self {
            Curve::Segment { a, b } => (b - a).normalize_or_zero(),
            Curve::Arc { x_dir, y_dir, .. } => x_dir.cross(y_dir).normalize_or_zero(),
        };
        (0..3).find(|&k| dir[k].abs() > 1.0 - 1e-9)
    }

    /// Two unit vectors spanning the plane normal to the curve at `t`
    pub fn normal_frame(&self, t: f64) -> (DVec3, DVec3) {
        match *self {
            Curve::Segment { a, b } => match self.world_axis() {
                Some(k) => (unit(k + 1), unit(k + 2)),
                None => (b - a).normalize_or_zero().any_orthonormal_pair(),
            },
            Curve::Arc { center, .. } => {
                let radial = (self.point(t) - center).normalize_or_zero();
                let axis = match self.world_axis() {
                    Some(k) => unit(k),
                    None => self.arc_normal(),
                };
                (radial, axis)
            }
        }
    }

    fn arc_normal(&self) -> DVec3 {
        match *self {
            Curve::Arc { x_dir, y_dir, .. } => x_dir.cross(y_dir).normalize_or_zero(),
            Curve::Segment { .. } => DVec3::ZERO,
        }
    }

    /// Portion of the curve between parameters `t0` and `t1`
    pub fn sub(&self, t0: f64, t1: f64) -> Curve {
        match *self {
            Curve::Segment { .. } => Curve::Segment {
                a: self.point(t0),
                b: self.point(t1),
            },
            Curve::Arc {
                center,
                x_dir,
                y_dir,
                radius,
                start,
                sweep,
            } => Curve::Arc {
                center,
                x_dir,
                y_dir,
                radius,
                start: start + sweep * t0,
                sweep: sweep * (t1 - t0),
            },
        }
    }

    fn transformed(&self, xf: &DAffine3) -> Curve {
        match *self {
            Curve::Segment { a, b } => Curve::Segment {
                a: xf.transform_point3(a),
                b: xf.transform_point3(b),
            },
            Curve::Arc {
                center,
                x_dir,
                y_dir,
                radius,
                start,
                sweep,
            } => Curve::Arc {
                center: xf.transform_point3(center),
                x_dir: xf.transform_vector3(x_dir),
                y_dir: xf.transform_vector3(y_dir),
                radius,
                start,
                sweep,
            },
        }
    }
}

/// A traced boundary edge together with its exact curve
#[derive(Debug, Clone)]
pub(crate) struct EdgeRecord {
    pub curve: Curve,
    pub closed: bool,
}

impl EdgeRecord {
    pub fn info(&self, id: EdgeId) -> EdgeInfo {
        let start = self.curve.point(0.0);
        if self.closed {
            if let Curve::Arc { center, .. } = self.curve {
                return EdgeInfo::closed(id, start, center, self.curve.length());
            }
        }
        let mut info = EdgeInfo::new(id, start, self.curve.point(1.0));
        info.midpoint = self.curve.point(0.5);
        info.length = self.curve.length();
        info
    }
}

/// Axis-aligned planar face of a box in world space
#[derive(Debug, Clone, Copy)]
struct AxisFace {
    axis: usize,
    coord: f64,
    min: DVec3,
    max: DVec3,
}

#[derive(Default)]
struct Candidates {
    faces: Vec<AxisFace>,
    curves: Vec<Curve>,
    cylinders: Vec<(DVec3, DVec3, f64, f64)>,
    wedges: Vec<(WedgePath, f64, f64, f64, DAffine3)>,
}

impl Candidates {
    fn collect(&mut self, node: &Node, xf: DAffine3) {
        match &node.shape {
            Shape::Empty => {}
            Shape::Box { min, max } => self.add_box(*min, *max, &xf),
            Shape::Cylinder {
                base,
                axis,
                radius,
                height,
            } => self.cylinders.push((
                xf.transform_point3(*base),
                xf.transform_vector3(*axis),
                *radius,
                *height,
            )),
            Shape::Prism(prism) => {
                for ring in &prism.loops {
                    for (i, q) in ring.iter().enumerate() {
                        let next = ring[(i + 1) % ring.len()];
                        for t in [0.0, 1.0] {
                            self.curves.push(
                                Curve::Segment {
                                    a: prism.vertex(*q, t),
                                    b: prism.vertex(next, t),
                                }
                                .transformed(&xf),
                            );
                        }
                        self.curves.push(
                            Curve::Segment {
                                a: prism.vertex(*q, 0.0),
                                b: prism.vertex(*q, 1.0),
                            }
                            .transformed(&xf),
                        );
                    }
                }
            }
            Shape::Wedge(wedge) => {
                let s = wedge.section;
                self.wedges.push((wedge.path, s.su, s.sv, s.radius, xf));
            }
            Shape::Union(a, b) | Shape::Difference(a, b) | Shape::Intersection(a, b) => {
                self.collect(a, xf);
                self.collect(b, xf);
            }
            Shape::Transformed { child, forward, .. } => self.collect(child, xf * *forward),
        }
    }

    fn add_box(&mut self, min: DVec3, max: DVec3, xf: &DAffine3) {
        if is_axis_permutation(&xf.matrix3) {
            let a = xf.transform_point3(min);
            let b = xf.transform_point3(max);
            let (lo, hi) = (a.min(b), a.max(b));
            for axis in 0..3 {
                for coord in [lo[axis], hi[axis]] {
                    self.faces.push(AxisFace {
                        axis,
                        coord,
                        min: lo,
                        max: hi,
                    });
                }
            }
            return;
        }
        let corner = |i: usize| {
            DVec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        };
        for i in 0..8 {
            for bit in [1, 2, 4] {
                if i & bit == 0 {
                    self.curves.push(
                        Curve::Segment {
                            a: corner(i),
                            b: corner(i | bit),
                        }
                        .transformed(xf),
                    );
                }
            }
        }
    }

    fn planes(&self, axis: usize) -> Vec<f64> {
        let mut planes: Vec<f64> = self
            .faces
            .iter()
            .filter(|f| f.axis == axis)
            .map(|f| f.coord)
            .collect();
        planes.sort_by(f64::total_cmp);
        planes.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        planes
    }

    /// Resolve all candidates into a deterministic list of curves
    fn into_curves(self) -> Vec<Curve> {
        let mut lines: BTreeMap<(usize, i64, i64), (DVec2, Vec<(f64, f64)>)> = BTreeMap::new();
        for f1 in &self.faces {
            for f2 in &self.faces {
                if f1.axis >= f2.axis {
                    continue;
                }
                let k = 3 - f1.axis - f2.axis;
                let within = |f: &AxisFace, axis: usize, c: f64| {
                    c >= f.min[axis] - 1e-9 && c <= f.max[axis] + 1e-9
                };
                if !within(f2, f1.axis, f1.coord) || !within(f1, f2.axis, f2.coord) {
                    continue;
                }
                let lo = f1.min[k].max(f2.min[k]);
                let hi = f1.max[k].min(f2.max[k]);
                if hi - lo < 1e-9 {
                    continue;
                }
                let mut uv = DVec2::ZERO;
                uv[usize::from(f1.axis != (k + 1) % 3)] = f1.coord;
                uv[usize::from(f2.axis != (k + 1) % 3)] = f2.coord;
                let key = (k, quantize(uv.x), quantize(uv.y));
                lines.entry(key).or_insert_with(|| (uv, Vec::new())).1.push((lo, hi));
            }
        }

        let mut curves = Vec::new();
        for ((k, _, _), (uv, mut spans)) in lines {
            spans.sort_by(|a, b| a.0.total_cmp(&b.0));
            let mut merged: Vec<(f64, f64)> = Vec::new();
            for (lo, hi) in spans {
                match merged.last_mut() {
                    Some(last) if lo <= last.1 + 1e-9 => last.1 = last.1.max(hi),
                    _ => merged.push((lo, hi)),
                }
            }
            for (lo, hi) in merged {
                curves.push(Curve::Segment {
                    a: from_plane_coords(k, lo, uv),
                    b: from_plane_coords(k, hi, uv),
                });
            }
        }

        for &(base, axis, radius, height) in &self.cylinders {
            let (x_dir, y_dir) = axis.any_orthonormal_pair();
            let mut levels = vec![0.0, height];
            if let Some(k) = (0..3).find(|&k| axis[k].abs() > 1.0 - 1e-9) {
                levels.extend(
                    self.planes(k)
                        .into_iter()
                        .map(|c| (c - base[k]) / axis[k])
                        .filter(|t| *t > 1e-9 && *t < height - 1e-9),
                );
            }
            for t in levels {
                curves.push(Curve::Arc {
                    center: base + axis * t,
                    x_dir,
                    y_dir,
                    radius,
                    start: 0.0,
                    sweep: TAU,
                });
            }
        }

        for &(path, su, sv, r, xf) in &self.wedges {
            if let WedgePath::Line {
                axis,
                start,
                end,
                corner,
            } = path
            {
                let center = corner + DVec2::new(su, sv) * r;
                let x_dir = -su * unit(axis + 1);
                let y_dir = -sv * unit(axis + 2);
                let world_axis = xf.transform_vector3(unit(axis));
                let mut levels = vec![start, end];
                if let Some(j) = (0..3).find(|&j| world_axis[j].abs() > 1.0 - 1e-9) {
                    let w0 = xf.transform_point3(from_plane_coords(axis, start, center))[j];
                    let w1 = xf.transform_point3(from_plane_coords(axis, end, center))[j];
                    levels.extend(self.planes(j).into_iter().filter_map(|c| {
                        let s = start + (c - w0) / (w1 - w0) * (end - start);
                        (s > start + 1e-9 && s < end - 1e-9).then_some(s)
                    }));
                }
                for s in levels {
                    curves.push(
                        Curve::Arc {
                            center: from_plane_coords(axis, s, center),
                            x_dir,
                            y_dir,
                            radius: r,
                            start: 0.0,
                            sweep: FRAC_PI_2,
                        }
                        .transformed(&xf),
                    );
                }
            }
        }

        curves.extend(self.curves);
        curves
    }
}

/// Enumerate the boundary edges of a solid tree
pub(crate) fn enumerate(root: &Node) -> Vec<EdgeRecord> {
    let mut candidates = Candidates::default();
    candidates.collect(root, DAffine3::IDENTITY);

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for curve in candidates.into_curves() {
        for record in trace(root, &curve) {
            if seen.insert(record_key(&record)) {
                records.push(record);
            }
        }
    }
    records
}

/// Follow a candidate curve and return the pieces of it that are edges
fn trace(root: &Node, curve: &Curve) -> Vec<EdgeRecord> {
    let length = curve.length();
    if length < 1e-6 {
        return Vec::new();
    }
    let n = ((length / SAMPLE_SPACING).ceil() as usize).max(8);
    let masks: Vec<u8> = (0..n)
        .map(|i| probe_mask(root, curve, (i as f64 + 0.5) / n as f64))
        .collect();

    if curve.is_full_circle() {
        if masks.iter().all(|m| is_edge(*m) && *m == masks[0]) {
            return vec![EdgeRecord {
                curve: *curve,
                closed: true,
            }];
        }
        // Restart the circle where a run begins so no run wraps around
        let pivot = (0..n)
            .find(|&i| !is_edge(masks[i]))
            .or_else(|| (1..n).find(|&i| masks[i] != masks[i - 1]))
            .unwrap_or(0);
        let rotated = curve.sub(pivot as f64 / n as f64, (pivot + n) as f64 / n as f64);
        let masks: Vec<u8> = (0..n).map(|i| masks[(i + pivot) % n]).collect();
        return runs(root, &rotated, &masks);
    }
    runs(root, curve, &masks)
}

fn runs(root: &Node, curve: &Curve, masks: &[u8]) -> Vec<EdgeRecord> {
    let n = masks.len();
    let t_at = |i: usize| (i as f64 + 0.5) / n as f64;
    let mut out = Vec::new();
    let mut i = 0;
    while i < n {
        let mask = masks[i];
        if !is_edge(mask) {
            i += 1;
            continue;
        }
        let first = i;
        while i + 1 < n && masks[i + 1] == mask {
            i += 1;
        }
        let last = i;
        i += 1;

        let lo = if first == 0 { 0.0 } else { t_at(first - 1) };
        let hi = if last + 1 == n { 1.0 } else { t_at(last + 1) };
        let t0 = refine(root, curve, lo, t_at(first), mask);
        let t1 = refine(root, curve, hi, t_at(last), mask);
        if curve.sub(t0, t1).length() > 1e-6 {
            out.push(EdgeRecord {
                curve: curve.sub(t0, t1),
                closed: false,
            });
        }
    }
    out
}

/// Move from `inside` (where the mask matches) toward `outside` and return
/// the last parameter that still carries `mask`
fn refine(root: &Node, curve: &Curve, outside: f64, inside: f64, mask: u8) -> f64 {
    if probe_mask(root, curve, outside) == mask {
        return outside;
    }
    let (mut out, mut inn) = (outside, inside);
    for _ in 0..REFINE_STEPS {
        let mid = (out + inn) * 0.5;
        if probe_mask(root, curve, mid) == mask {
            inn = mid;
        } else {
            out = mid;
        }
    }
    inn
}

/// Occupancy of eight probes around the curve at `t`
fn probe_mask(root: &Node, curve: &Curve, t: f64) -> u8 {
    let p = curve.point(t);
    let (b1, b2) = curve.normal_frame(t);
    (0..8).fold(0u8, |mask, i| {
        let phi = FRAC_PI_4 * (i as f64 + 0.5);
        let q = p + (b1 * phi.cos() + b2 * phi.sin()) * PROBE_RADIUS;
        if root.contains(q) { mask | (1 << i) } else { mask }
    })
}

/// Whether a probe pattern marks a crease (not interior, exterior or a flat face)
fn is_edge(mask: u8) -> bool {
    match mask.count_ones() {
        0 | 8 => false,
        4 => !(0..8).any(|r| mask.rotate_left(r) == 0x0F),
        _ => true,
    }
}

fn record_key(record: &EdgeRecord) -> [i64; 9] {
    let q = |p: DVec3| [quantize_coarse(p.x), quantize_coarse(p.y), quantize_coarse(p.z)];
    let a = q(record.curve.point(0.0));
    let b = q(record.curve.point(1.0));
    let m = q(record.curve.point(0.5));
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    [
        lo[0], lo[1], lo[2], hi[0], hi[1], hi[2], m[0], m[1], m[2],
    ]
}

fn quantize(x: f64) -> i64 {
    (x * QUANTUM).round() as i64
}

fn quantize_coarse(x: f64) -> i64 {
    (x * 1e4).round() as i64
}

fn unit(axis: usize) -> DVec3 {
    match axis % 3 {
        0 => DVec3::X,
        1 => DVec3::Y,
        _ => DVec3::Z,
    }
}

/// True when the matrix maps each world axis onto a (signed) world axis
fn is_axis_permutation(m: &DMat3) -> bool {
    [m.x_axis, m.y_axis, m.z_axis].iter().all(|c| {
        let abs = c.abs();
        let big = abs.max_element();
        (big - 1.0).abs() < 1e-9 && abs.element_sum() - big < 1e-9
    })
}
