// tag_arena/server/src/systems/debug_draw.rs
use crate::core::config::DebugToggles;
use crate::core::geometry::Aabb;
use crate::core::types::{DebugCircle, DebugColor, DebugLabel, DebugLine, Vec2};

/// Transient overlay for the current tick. Every record is gated by its toggle, and the
/// buffer is cleared at the start of each step.
#[derive(Debug, Default)]
pub struct DebugDraw {
    toggles: DebugToggles,
    lines: Vec<DebugLine>,
    circles: Vec<DebugCircle>,
    labels: Vec<DebugLabel>,
}

impl DebugDraw {
    pub fn new(toggles: DebugToggles) -> Self {
        DebugDraw {
            toggles,
            ..Default::default()
        }
    }

    pub fn toggles(&self) -> &DebugToggles {
        &self.toggles
    }

    pub fn set_toggles(&mut self, toggles: DebugToggles) {
        self.toggles = toggles;
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.circles.clear();
        self.labels.clear();
    }

    pub fn path(&mut self, from: Vec2, points: impl IntoIterator<Item = Vec2>) {
        if !self.toggles.show_pathing {
            return;
        }
        let mut prev = from;
        for p in points {
            self.lines.push(DebugLine {
                from: prev,
                to: p,
                color: DebugColor::Path,
            });
            prev = p;
        }
    }

    pub fn exploration(&mut self, from: Vec2, to: Vec2, tight: bool) {
        if !self.toggles.show_exploration {
            return;
        }
        self.lines.push(DebugLine {
            from,
            to,
            color: DebugColor::Exploration,
        });
        if tight {
            self.labels.push(DebugLabel {
                at: to,
                text: "tight".to_string(),
            });
        }
    }

    pub fn sightline(&mut self, from: Vec2, to: Vec2) {
        if self.toggles.show_sightlines {
            self.lines.push(DebugLine {
                from,
                to,
                color: DebugColor::Sightline,
            });
        }
    }

    pub fn lost(&mut self, at: Vec2, radius: f64, text: &str) {
        if !self.toggles.show_lost {
            return;
        }
        self.circles.push(DebugCircle {
            center: at,
            radius,
            color: DebugColor::Lost,
        });
        self.labels.push(DebugLabel {
            at,
            text: text.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.circles.is_empty() && self.labels.is_empty()
    }

    /// Records touching `area`, cloned out for one viewer.
    pub fn within(&self, area: Aabb) -> (Vec<DebugLine>, Vec<DebugCircle>, Vec<DebugLabel>) {
        let lines = self
            .lines
            .iter()
            .filter(|l| area.intersects(&Aabb::new(l.from, l.to)))
            .cloned()
            .collect();
        let circles = self
            .circles
            .iter()
            .filter(|c| area.intersects(&Aabb::from_center(c.center, c.radius, c.radius)))
            .cloned()
            .collect();
        let labels = self.labels.iter().filter(|l| area.contains(l.at)).cloned().collect();
        (lines, circles, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_toggles_record_nothing() {
        let mut draw = DebugDraw::new(DebugToggles::default());
        draw.path(Vec2::ZERO, [Vec2::new(1.0, 1.0)]);
        draw.lost(Vec2::ZERO, 5.0, "lost");
        draw.sightline(Vec2::ZERO, Vec2::new(3.0, 0.0));
        assert!(draw.is_empty());
    }

    #[test]
    fn within_filters_by_area() {
        let mut draw = DebugDraw::new(DebugToggles {
            show_pathing: true,
            show_lost: true,
            ..Default::default()
        });
        draw.path(Vec2::ZERO, [Vec2::new(10.0, 0.0), Vec2::new(1000.0, 0.0)]);
        draw.lost(Vec2::new(2000.0, 0.0), 5.0, "lost");
        let (lines, circles, labels) = draw.within(Aabb::from_center(Vec2::ZERO, 50.0, 50.0));
        assert_eq!(lines.len(), 2);
        assert!(circles.is_empty());
        assert!(labels.is_empty());

        draw.clear();
        assert!(draw.is_empty());
    }
}
