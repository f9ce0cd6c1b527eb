//! Constructive solid geometry tree
//!
//! Every node answers exact point membership (`contains`) and an
//! approximate signed distance (`distance`) used for meshing. Boxes are
//! half-open (`min <= p < max`) so that splitting a solid with two adjacent
//! boxes partitions space without overlap.

use std::f64::consts::TAU;
use std::sync::Arc;

use glam::{DAffine3, DMat3, DVec2, DVec3};

use crate::kernel::BoundingBox;

/// Cross-section shared by fillet wedges: the square `[0, r)²` in local
/// `(du, dv)` coordinates minus the disc of radius `r` centered at `(r, r)`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WedgeSection {
    pub su: f64,
    pub sv: f64,
    pub radius: f64,
}

impl WedgeSection {
    fn contains(&self, du: f64, dv: f64) -> bool {
        let r = self.radius;
        (0.0..r).contains(&du)
            && (0.0..r).contains(&dv)
            && (du - r).powi(2) + (dv - r).powi(2) > r * r
    }

    fn distance(&self, du: f64, dv: f64) -> f64 {
        let r = self.radius;
        let square = sdf_box_2d(DVec2::new(du, dv) - DVec2::splat(r * 0.5), DVec2::splat(r * 0.5));
        let disc = r - DVec2::new(du - r, dv - r).length();
        square.max(disc)
    }
}

/// Path a wedge cross-section is swept along
#[derive(Debug, Clone, Copy)]
pub(crate) enum WedgePath {
    /// Straight run along world axis `axis`, with the section corner at
    /// `corner` in the coordinates of the two following axes
    Line {
        axis: usize,
        start: f64,
        end: f64,
        corner: DVec2,
    },
    /// Circular run around an axis parallel to world axis `axis`; the
    /// section corner sits at radial distance `arc_radius` in the plane
    /// `plane` (coordinate along `axis`)
    Arc {
        axis: usize,
        center: DVec2,
        plane: f64,
        arc_radius: f64,
        start_angle: f64,
        sweep: f64,
    },
}

/// Material added or removed by a fillet
#[derive(Debug, Clone, Copy)]
pub(crate) struct Wedge {
    pub path: WedgePath,
    pub section: WedgeSection,
}

impl Wedge {
    fn local(&self, p: DVec3) -> Option<(f64, f64)> {
        let s = &self.section;
        match self.path {
            WedgePath::Line {
                axis,
                start,
                end,
                corner,
            } => {
                if !(start..end).contains(&p[axis]) {
                    return None;
                }
                let (u, v) = plane_coords(p, axis);
                Some((s.su * (u - corner.x), s.sv * (v - corner.y)))
            }
            WedgePath::Arc {
                axis,
                center,
                plane,
                arc_radius,
                start_angle,
                sweep,
            } => {
                let (u, v) = plane_coords(p, axis);
                let d = DVec2::new(u, v) - center;
                let angle = (d.y.atan2(d.x) - start_angle).rem_euclid(TAU);
                if angle >= sweep {
                    return None;
                }
                Some((s.su * (d.length() - arc_radius), s.sv * (p[axis] - plane)))
            }
        }
    }

    pub fn contains(&self, p: DVec3) -> bool {
        self.local(p)
            .is_some_and(|(du, dv)| self.section.contains(du, dv))
    }

    pub fn distance(&self, p: DVec3) -> f64 {
        let s = &self.section;
        match self.path {
            WedgePath::Line {
                axis,
                start,
                end,
                corner,
            } => {
                let (u, v) = plane_coords(p, axis);
                let section = s.distance(s.su * (u - corner.x), s.sv * (v - corner.y));
                let along = (start - p[axis]).max(p[axis] - end);
                section.max(along)
            }
            WedgePath::Arc {
                axis,
                center,
                plane,
                arc_radius,
                start_angle,
                sweep,
            } => {
                let (u, v) = plane_coords(p, axis);
                let d = DVec2::new(u, v) - center;
                let section = s.distance(s.su * (d.length() - arc_radius), s.sv * (p[axis] - plane));
                let a0 = DVec2::from_angle(start_angle);
                let a1 = DVec2::from_angle(start_angle + sweep);
                let sector = if sweep <= std::f64::consts::PI {
                    (-a0.perp_dot(d)).max(-d.perp_dot(a1))
                } else {
                    (-a0.perp_dot(d)).min(-d.perp_dot(a1))
                };
                section.max(sector)
            }
        }
    }

    fn bounding_box(&self) -> BoundingBox {
        let r = self.section.radius;
        match self.path {
            WedgePath::Line {
                axis,
                start,
                end,
                corner,
            } => {
                let far = corner + DVec2::new(self.section.su, self.section.sv) * r;
                let a = from_plane_coords(axis, start, corner);
                let b = from_plane_coords(axis, end, far);
                BoundingBox::from_points([a, b])
            }
            WedgePath::Arc {
                axis,
                center,
                plane,
                arc_radius,
                ..
            } => {
                let reach = arc_radius + r;
                let lo = from_plane_coords(axis, plane - r, center - DVec2::splat(reach));
                let hi = from_plane_coords(axis, plane + r, center + DVec2::splat(reach));
                BoundingBox::from_points([lo, hi])
            }
        }
    }
}

/// Right prism over an even-odd planar region
#[derive(Debug, Clone)]
pub(crate) struct Prism {
    pub origin: DVec3,
    pub u: DVec3,
    pub v: DVec3,
    pub extrusion: DVec3,
    pub loops: Vec<Vec<DVec2>>,
    to_local: DMat3,
}

impl Prism {
    /// Build a prism; `None` when the extrusion lies in the profile plane
    pub fn new(
        origin: DVec3,
        u: DVec3,
        v: DVec3,
        extrusion: DVec3,
        loops: Vec<Vec<DVec2>>,
    ) -> Option<Self> {
        let frame = DMat3::from_cols(u, v, extrusion);
        if frame.determinant().abs() < 1e-12 {
            return None;
        }
        Some(Self {
            origin,
            u,
            v,
            extrusion,
            loops,
            to_local: frame.inverse(),
        })
    }

    fn local(&self, p: DVec3) -> DVec3 {
        self.to_local * (p - self.origin)
    }

    fn region_contains(&self, q: DVec2) -> bool {
        let mut inside = false;
        for ring in &self.loops {
            let n = ring.len();
            let mut j = n.wrapping_sub(1);
            for i in 0..n {
                let (a, b) = (ring[i], ring[j]);
                if (a.y > q.y) != (b.y > q.y) && q.x < a.x + (q.y - a.y) * (b.x - a.x) / (b.y - a.y)
                {
                    inside = !inside;
                }
                j = i;
            }
        }
        inside
    }

    pub fn contains(&self, p: DVec3) -> bool {
        let l = self.local(p);
        (0.0..1.0).contains(&l.z) && self.region_contains(l.truncate())
    }

    pub fn distance(&self, p: DVec3) -> f64 {
        let l = self.local(p);
        let q = l.truncate();
        let edge = self
            .loops
            .iter()
            .flat_map(|ring| {
                ring.iter()
                    .zip(ring.iter().cycle().skip(1))
                    .map(move |(a, b)| segment_distance(q, *a, *b))
            })
            .fold(f64::INFINITY, f64::min);
        let planar = if self.region_contains(q) { -edge } else { edge };
        let height = self.extrusion.length();
        let along = (-l.z).max(l.z - 1.0) * height;
        let outside = DVec2::new(planar.max(0.0), along.max(0.0)).length();
        outside + planar.max(along).min(0.0)
    }

    /// Corners of the profile in world space at the bottom (`t = 0`) and top
    /// (`t = 1`) of the extrusion
    pub fn vertex(&self, q: DVec2, t: f64) -> DVec3 {
        self.origin + self.u * q.x + self.v * q.y + self.extrusion * t
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(
            self.loops
                .iter()
                .flatten()
                .flat_map(|q| [self.vertex(*q, 0.0), self.vertex(*q, 1.0)]),
        )
    }
}

/// A node of the solid tree
#[derive(Debug, Clone)]
pub(crate) enum Shape {
    Empty,
    Box {
        min: DVec3,
        max: DVec3,
    },
    Cylinder {
        base: DVec3,
        axis: DVec3,
        radius: f64,
        height: f64,
    },
    Prism(Prism),
    Wedge(Wedge),
    Union(Arc<Node>, Arc<Node>),
    Difference(Arc<Node>, Arc<Node>),
    Intersection(Arc<Node>, Arc<Node>),
    Transformed {
        child: Arc<Node>,
        forward: DAffine3,
        inverse: DAffine3,
    },
}

/// A shape together with its cached bounding box
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub shape: Shape,
    pub bbox: BoundingBox,
}

impl Node {
    pub fn empty() -> Self {
        Self {
            shape: Shape::Empty,
            bbox: BoundingBox::EMPTY,
        }
    }

    pub fn cuboid(min: DVec3, max: DVec3) -> Self {
        Self {
            shape: Shape::Box { min, max },
            bbox: BoundingBox::new(min, max),
        }
    }

    pub fn cylinder(base: DVec3, axis: DVec3, radius: f64, height: f64) -> Self {
        let top = base + axis * height;
        let reach = DVec3::new(
            (1.0 - axis.x * axis.x).max(0.0).sqrt(),
            (1.0 - axis.y * axis.y).max(0.0).sqrt(),
            (1.0 - axis.z * axis.z).max(0.0).sqrt(),
        ) * radius;
        Self {
            shape: Shape::Cylinder {
                base,
                axis,
                radius,
                height,
            },
            bbox: BoundingBox::new(base.min(top) - reach, base.max(top) + reach),
        }
    }

    pub fn prism(prism: Prism) -> Self {
        let bbox = prism.bounding_box();
        Self {
            shape: Shape::Prism(prism),
            bbox,
        }
    }

    pub fn wedge(wedge: Wedge) -> Self {
        Self {
            bbox: wedge.bounding_box(),
            shape: Shape::Wedge(wedge),
        }
    }

    pub fn union(a: Arc<Node>, b: Arc<Node>) -> Self {
        Self {
            bbox: a.bbox.union(&b.bbox),
            shape: Shape::Union(a, b),
        }
    }

    pub fn difference(a: Arc<Node>, b: Arc<Node>) -> Self {
        Self {
            bbox: a.bbox,
            shape: Shape::Difference(a, b),
        }
    }

    pub fn intersection(a: Arc<Node>, b: Arc<Node>) -> Self {
        Self {
            bbox: a.bbox.intersection(&b.bbox),
            shape: Shape::Intersection(a, b),
        }
    }

    pub fn transformed(child: Arc<Node>, forward: DAffine3) -> Self {
        let bbox = if child.bbox.is_empty() {
            BoundingBox::EMPTY
        } else {
            BoundingBox::from_points(
                child
                    .bbox
                    .corners()
                    .into_iter()
                    .map(|c| forward.transform_point3(c)),
            )
        };
        Self {
            shape: Shape::Transformed {
                child,
                forward,
                inverse: forward.inverse(),
            },
            bbox,
        }
    }

    /// Union of many nodes as a balanced tree
    pub fn union_all(mut nodes: Vec<Arc<Node>>) -> Arc<Node> {
        while nodes.len() > 1 {
            let mut next = Vec::with_capacity(nodes.len().div_ceil(2));
            let mut iter = nodes.into_iter();
            while let Some(a) = iter.next() {
                match iter.next() {
                    Some(b) => next.push(Arc::new(Node::union(a, b))),
                    None => next.push(a),
                }
            }
            nodes = next;
        }
        nodes.pop().unwrap_or_else(|| Arc::new(Node::empty()))
    }

    /// Exact point membership
    pub fn contains(&self, p: DVec3) -> bool {
        if !self.bbox.contains_point(p) {
            return false;
        }
        match &self.shape {
            Shape::Empty => false,
            Shape::Box { min, max } => p.cmpge(*min).all() && p.cmplt(*max).all(),
            Shape::Cylinder {
                base,
                axis,
                radius,
                height,
            } => {
                let d = p - *base;
                let t = d.dot(*axis);
                (0.0..*height).contains(&t) && (d - *axis * t).length_squared() < radius * radius
            }
            Shape::Prism(prism) => prism.contains(p),
            Shape::Wedge(wedge) => wedge.contains(p),
            Shape::Union(a, b) => a.contains(p) || b.contains(p),
            Shape::Difference(a, b) => a.contains(p) && !b.contains(p),
            Shape::Intersection(a, b) => a.contains(p) && b.contains(p),
            Shape::Transformed { child, inverse, .. } => {
                child.contains(inverse.transform_point3(p))
            }
        }
    }

    /// Approximate signed distance (negative inside)
    pub fn distance(&self, p: DVec3) -> f64 {
        match &self.shape {
            Shape::Empty => f64::INFINITY,
            Shape::Box { min, max } => {
                let half = (*max - *min) * 0.5;
                let q = (p - (*min + half)).abs() - half;
                q.max(DVec3::ZERO).length() + q.max_element().min(0.0)
            }
            Shape::Cylinder {
                base,
                axis,
                radius,
                height,
            } => {
                let d = p - *base;
                let t = d.dot(*axis);
                let radial = (d - *axis * t).length() - radius;
                let along = (t - height * 0.5).abs() - height * 0.5;
                DVec2::new(radial.max(0.0), along.max(0.0)).length() + radial.max(along).min(0.0)
            }
            Shape::Prism(prism) => prism.distance(p),
            Shape::Wedge(wedge) => wedge.distance(p),
            Shape::Union(a, b) => a.distance(p).min(b.distance(p)),
            Shape::Difference(a, b) => a.distance(p).max(-b.distance(p)),
            Shape::Intersection(a, b) => a.distance(p).max(b.distance(p)),
            Shape::Transformed { child, inverse, .. } => {
                child.distance(inverse.transform_point3(p))
            }
        }
    }
}

/// Coordinates of `p` along the two axes following `axis` (cyclically)
pub(crate) fn plane_coords(p: DVec3, axis: usize) -> (f64, f64) {
    (p[(axis + 1) % 3], p[(axis + 2) % 3])
}

/// Inverse of [`plane_coords`]
pub(crate) fn from_plane_coords(axis: usize, along: f64, uv: DVec2) -> DVec3 {
    let mut p = DVec3::ZERO;
    p[axis] = along;
    p[(axis + 1) % 3] = uv.x;
    p[(axis + 2) % 3] = uv.y;
    p
}

fn sdf_box_2d(p: DVec2, half: DVec2) -> f64 {
    let q = p.abs() - half;
    q.max(DVec2::ZERO).length() + q.max_element().min(0.0)
}

fn segment_distance(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    let t = if len2 > 0.0 {
        ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (p - (a + ab * t)).length()
}
