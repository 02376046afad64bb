// tag_arena/server/src/world/obstacle.rs
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::f64::consts::TAU;

use crate::core::error::{SimError, SimResult};
use crate::core::geometry::{
    clip_segment_circle, clip_segment_convex, interval_hits_open_segment, is_convex_ccw,
    point_polygon_distance, polygon_centroid, signed_area2, Aabb,
};
use crate::core::types::{ObstacleId, PropId, Vec2, VisibleShape};
use crate::world::raycast;

/// Sample count used when a circle has to be treated as a vertex set.
const CIRCLE_VERTEX_SAMPLES: usize = 8;

/// Who owns an obstacle: a static wall from the map, or a dynamic prop body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyRef {
    Wall(ObstacleId),
    Prop(PropId),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Convex polygon, counter-clockwise. Rectangles (rotated or not) land here too.
    Polygon { vertices: Vec<Vec2> },
    Circle { center: Vec2, radius: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub body: BodyRef,
    shape: Shape,
    bounds: Aabb,
    centroid: Vec2,
}

impl Obstacle {
    /// Axis-aligned rectangle from its top-left corner and size.
    pub fn rect(body: BodyRef, x: f64, y: f64, width: f64, height: f64) -> Self {
        let b = Aabb::new(Vec2::new(x, y), Vec2::new(x + width, y + height));
        Self::from_ccw(body, b.corners().to_vec())
    }

    pub fn rotated_rect(body: BodyRef, center: Vec2, half_width: f64, half_height: f64, angle: f64) -> Self {
        let axis_x = Vec2::from_angle(angle);
        let axis_y = axis_x.perp();
        let vertices = vec![
            center - axis_x * half_width - axis_y * half_height,
            center + axis_x * half_width - axis_y * half_height,
            center + axis_x * half_width + axis_y * half_height,
            center - axis_x * half_width + axis_y * half_height,
        ];
        Self::from_ccw(body, vertices)
    }

    /// Arbitrary convex polygon in either winding.
    pub fn polygon(body: BodyRef, mut vertices: Vec<Vec2>) -> SimResult<Self> {
        if vertices.len() < 3 || vertices.iter().any(|v| !v.is_finite()) {
            return Err(SimError::InvalidObstacle(format!(
                "{:?}: polygon needs at least three finite vertices",
                body
            )));
        }
        if signed_area2(&vertices) < 0.0 {
            vertices.reverse();
        }
        if !is_convex_ccw(&vertices) {
            return Err(SimError::InvalidObstacle(format!("{:?}: polygon is not convex", body)));
        }
        Ok(Self::from_ccw(body, vertices))
    }

    pub fn circle(body: BodyRef, center: Vec2, radius: f64) -> Self {
        Obstacle {
            body,
            shape: Shape::Circle { center, radius },
            bounds: Aabb::from_center(center, radius, radius),
            centroid: center,
        }
    }

    fn from_ccw(body: BodyRef, mut vertices: Vec<Vec2>) -> Self {
        if signed_area2(&vertices) < 0.0 {
            vertices.reverse();
        }
        let bounds = Aabb::from_points(&vertices).unwrap_or(Aabb::new(Vec2::ZERO, Vec2::ZERO));
        let centroid = polygon_centroid(&vertices);
        Obstacle {
            body,
            shape: Shape::Polygon { vertices },
            bounds,
            centroid,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    pub fn is_circle(&self) -> bool {
        matches!(self.shape, Shape::Circle { .. })
    }

    /// Boundary vertices. Circles are sampled.
    pub fn vertices(&self) -> Vec<Vec2> {
        match &self.shape {
            Shape::Polygon { vertices } => vertices.clone(),
            Shape::Circle { center, radius } => (0..CIRCLE_VERTEX_SAMPLES)
                .map(|i| *center + Vec2::from_angle(TAU * i as f64 / CIRCLE_VERTEX_SAMPLES as f64) * *radius)
                .collect(),
        }
    }

    /// Parameter interval of `start -> end` that lies inside the shape.
    pub fn clip_segment(&self, start: Vec2, end: Vec2) -> Option<(f64, f64)> {
        match &self.shape {
            Shape::Polygon { vertices } => clip_segment_convex(start, end, vertices),
            Shape::Circle { center, radius } => clip_segment_circle(start, end, *center, *radius),
        }
    }

    /// True when the shape overlaps the open segment (touching an endpoint does not count).
    pub fn blocks_segment(&self, start: Vec2, end: Vec2) -> bool {
        if !self.bounds.intersects(&Aabb::new(start, end)) {
            return false;
        }
        interval_hits_open_segment(self.clip_segment(start, end))
    }

    /// Distance from `p` to the shape boundary, zero inside.
    pub fn distance_to(&self, p: Vec2) -> f64 {
        match &self.shape {
            Shape::Polygon { vertices } => point_polygon_distance(p, vertices),
            Shape::Circle { center, radius } => (p.distance(*center) - radius).max(0.0),
        }
    }

    /// Can a viewer of `viewer_radius` at `viewer` see any part of this obstacle?
    pub fn visible_from<O: Borrow<Obstacle>>(&self, viewer: Vec2, viewer_radius: f64, others: &[O]) -> bool {
        match &self.shape {
            Shape::Circle { center, radius } => {
                let without_self: Vec<&Obstacle> = others
                    .iter()
                    .map(Borrow::borrow)
                    .filter(|o| o.body != self.body)
                    .collect();
                raycast::circle_shown(viewer, viewer_radius, *center, *radius, &without_self)
            }
            Shape::Polygon { .. } => raycast::polygon_visible(viewer, viewer_radius, self, others),
        }
    }

    pub fn to_visible_shape(&self) -> VisibleShape {
        match (&self.shape, self.body) {
            (Shape::Circle { center, radius }, BodyRef::Prop(id)) => VisibleShape::Prop {
                id,
                center: *center,
                radius: *radius,
            },
            (Shape::Circle { center, radius }, BodyRef::Wall(id)) => VisibleShape::Pillar {
                id,
                center: *center,
                radius: *radius,
            },
            (Shape::Polygon { vertices }, BodyRef::Wall(id)) => VisibleShape::Wall {
                id,
                vertices: vertices.clone(),
            },
            (Shape::Polygon { .. }, BodyRef::Prop(id)) => VisibleShape::Prop {
                id,
                center: self.centroid,
                radius: self.bounds.width().max(self.bounds.height()) * 0.5,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(id: u32) -> BodyRef {
        BodyRef::Wall(ObstacleId(id))
    }

    #[test]
    fn rect_exposes_box_vertices_and_centroid() {
        let o = Obstacle::rect(wall(1), 0.0, 0.0, 20.0, 10.0);
        assert_eq!(o.vertices().len(), 4);
        assert_eq!(o.centroid(), Vec2::new(10.0, 5.0));
        assert_eq!(o.bounds().width(), 20.0);
        assert!(signed_area2(&o.vertices()) > 0.0);
    }

    #[test]
    fn clockwise_polygon_is_rewound() {
        let o = Obstacle::polygon(
            wall(2),
            vec![Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0), Vec2::new(10.0, 0.0)],
        )
        .unwrap();
        assert!(signed_area2(&o.vertices()) > 0.0);
    }

    #[test]
    fn concave_polygon_is_rejected() {
        let result = Obstacle::polygon(
            wall(3),
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(10.0, 0.0),
                Vec2::new(5.0, 2.0),
                Vec2::new(10.0, 10.0),
                Vec2::new(0.0, 10.0),
            ],
        );
        assert!(matches!(result, Err(SimError::InvalidObstacle(_))));
    }

    #[test]
    fn rotated_rect_blocks_diagonal() {
        let o = Obstacle::rotated_rect(wall(4), Vec2::ZERO, 30.0, 5.0, std::f64::consts::FRAC_PI_4);
        assert!(o.blocks_segment(Vec2::new(-20.0, 20.0), Vec2::new(20.0, -20.0)));
        assert!(!o.blocks_segment(Vec2::new(-50.0, 0.0), Vec2::new(-40.0, 0.0)));
    }

    #[test]
    fn circle_distance_and_blocking() {
        let o = Obstacle::circle(BodyRef::Prop(PropId(0)), Vec2::new(10.0, 0.0), 5.0);
        assert!((o.distance_to(Vec2::new(20.0, 0.0)) - 5.0).abs() < 1e-9);
        assert_eq!(o.distance_to(Vec2::new(10.0, 1.0)), 0.0);
        assert!(o.blocks_segment(Vec2::ZERO, Vec2::new(20.0, 0.0)));
        assert!(matches!(o.to_visible_shape(), VisibleShape::Prop { .. }));
    }
}
