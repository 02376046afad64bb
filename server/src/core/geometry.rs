// tag_arena/server/src/core/geometry.rs
//! Geometry helpers shared by the obstacle model, the raycaster and the navigation graph.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use super::error::{SimError, SimResult};
use super::types::Vec2;

/// Parametric tolerance used for "open segment" tests.
pub const SEGMENT_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Aabb {
            min: Vec2::new(min.x.min(max.x), min.y.min(max.y)),
            max: Vec2::new(min.x.max(max.x), min.y.max(max.y)),
        }
    }

    pub fn from_center(center: Vec2, half_width: f64, half_height: f64) -> Self {
        Aabb::new(
            Vec2::new(center.x - half_width, center.y - half_height),
            Vec2::new(center.x + half_width, center.y + half_height),
        )
    }

    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let first = *points.first()?;
        let mut min = first;
        let mut max = first;
        for p in &points[1..] {
            min = Vec2::new(min.x.min(p.x), min.y.min(p.y));
            max = Vec2::new(max.x.max(p.x), max.y.max(p.y));
        }
        Some(Aabb { min, max })
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn expand(&self, pad: f64) -> Aabb {
        Aabb {
            min: Vec2::new(self.min.x - pad, self.min.y - pad),
            max: Vec2::new(self.max.x + pad, self.max.y + pad),
        }
    }

    pub fn shrink(&self, pad: f64) -> Aabb {
        self.expand(-pad)
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Slab test of the segment `start + t * (end - start)`, `t` in `[0, 1]`.
    /// Returns the entry and exit parameters when the segment overlaps the box.
    pub fn slab_intersect(&self, start: Vec2, end: Vec2) -> Option<(f64, f64)> {
        let d = end - start;
        let mut t_min = 0.0_f64;
        let mut t_max = 1.0_f64;

        for (origin, dir, lo, hi) in [
            (start.x, d.x, self.min.x, self.max.x),
            (start.y, d.y, self.min.y, self.max.y),
        ] {
            if dir.abs() < f64::EPSILON {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t1 = (lo - origin) * inv;
            let mut t2 = (hi - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some((t_min, t_max))
    }
}

/// Twice the signed area; positive for counter-clockwise winding.
pub fn signed_area2(vertices: &[Vec2]) -> f64 {
    let n = vertices.len();
    (0..n)
        .map(|i| vertices[i].cross(vertices[(i + 1) % n]))
        .sum()
}

/// True for a counter-clockwise, strictly convex polygon with at least three vertices.
pub fn is_convex_ccw(vertices: &[Vec2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    (0..n).all(|i| {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let c = vertices[(i + 2) % n];
        (b - a).cross(c - b) > 0.0
    })
}

pub fn polygon_centroid(vertices: &[Vec2]) -> Vec2 {
    let n = vertices.len();
    let area2 = signed_area2(vertices);
    if area2.abs() < f64::EPSILON {
        let sum = vertices.iter().fold(Vec2::ZERO, |acc, v| acc + *v);
        return sum / n.max(1) as f64;
    }
    let mut c = Vec2::ZERO;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let f = a.cross(b);
        c += (a + b) * f;
    }
    c / (3.0 * area2)
}

/// Outward unit normal of edge `a -> b` of a counter-clockwise polygon.
pub fn outward_normal(a: Vec2, b: Vec2) -> Vec2 {
    let e = b - a;
    Vec2::new(e.y, -e.x).normalize()
}

/// Cyrus–Beck clip of a segment against a convex counter-clockwise polygon.
/// Returns the overlapping parameter interval.
pub fn clip_segment_convex(start: Vec2, end: Vec2, vertices: &[Vec2]) -> Option<(f64, f64)> {
    let d = end - start;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    let n = vertices.len();

    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let e = b - a;
        let normal = Vec2::new(e.y, -e.x);
        let num = normal.dot(start - a);
        let den = normal.dot(d);
        if den.abs() < f64::EPSILON {
            if num > 0.0 {
                return None;
            }
            continue;
        }
        let t = -num / den;
        if den < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((t0, t1))
}

/// Parameter interval of a segment inside a circle.
pub fn clip_segment_circle(start: Vec2, end: Vec2, center: Vec2, radius: f64) -> Option<(f64, f64)> {
    let d = end - start;
    let f = start - center;
    let a = d.dot(d);
    let c = f.dot(f) - radius * radius;
    if a < f64::EPSILON {
        return if c <= 0.0 { Some((0.0, 1.0)) } else { None };
    }
    let b = 2.0 * f.dot(d);
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt = disc.sqrt();
    let t0 = (-b - sqrt) / (2.0 * a);
    let t1 = (-b + sqrt) / (2.0 * a);
    if t0 > 1.0 || t1 < 0.0 {
        return None;
    }
    Some((t0.max(0.0), t1.min(1.0)))
}

/// Does a clipped interval overlap the open segment `(0, 1)`?
pub fn interval_hits_open_segment(interval: Option<(f64, f64)>) -> bool {
    match interval {
        Some((t0, t1)) => t1 > SEGMENT_EPSILON && t0 < 1.0 - SEGMENT_EPSILON && t1 - t0 > SEGMENT_EPSILON,
        None => false,
    }
}

pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq < f64::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Distance from a point to a convex counter-clockwise polygon; zero inside.
pub fn point_polygon_distance(p: Vec2, vertices: &[Vec2]) -> f64 {
    let n = vertices.len();
    let inside = (0..n).all(|i| {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        (b - a).cross(p - a) >= 0.0
    });
    if inside {
        return 0.0;
    }
    (0..n)
        .map(|i| point_segment_distance(p, vertices[i], vertices[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

/// Wraps an angle into `(-PI, PI]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// Absolute angular difference in `[0, PI]`.
pub fn angle_between(a: f64, b: f64) -> f64 {
    normalize_angle(a - b).abs()
}

/// Headings come out of `atan2`, so anything non-finite or beyond a full turn is a bug upstream.
pub fn validate_heading(angle: f64) -> SimResult<f64> {
    if !angle.is_finite() || angle.abs() > TAU {
        return Err(SimError::InvalidHeading(angle));
    }
    Ok(angle)
}
