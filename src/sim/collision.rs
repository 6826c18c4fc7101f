//! Axis-aligned boxes for the flight game
//!
//! Playfield units: x grows right, y grows down, both span 0..100.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Result of an obstacle check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    Clear,
    /// Touched the upper post
    Top,
    /// Touched the lower post
    Bottom,
}

impl Contact {
    pub fn hit(&self) -> bool {
        *self != Contact::Clear
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box from its top-left corner and size
    pub fn from_rect(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + w, y + h),
        }
    }

    /// Shrink every side by `margin` (never past the centre)
    pub fn shrink(&self, margin: f32) -> Self {
        let center = (self.min + self.max) * 0.5;
        Self {
            min: (self.min + Vec2::splat(margin)).min(center),
            max: (self.max - Vec2::splat(margin)).max(center),
        }
    }

    /// Strict overlap: boxes that only share an edge do not touch
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

/// Upper and lower posts of a fence with an opening from `gap_top` to
/// `gap_top + gap`
pub fn obstacle_rects(x: f32, width: f32, gap_top: f32, gap: f32) -> (Aabb, Aabb) {
    let top = Aabb::from_rect(x, 0.0, width, gap_top);
    let bottom_y = gap_top + gap;
    let bottom = Aabb::from_rect(x, bottom_y, width, (100.0 - bottom_y).max(0.0));
    (top, bottom)
}

/// Check a hitbox against both posts of a fence
pub fn obstacle_contact(hitbox: &Aabb, x: f32, width: f32, gap_top: f32, gap: f32) -> Contact {
    let (top, bottom) = obstacle_rects(x, width, gap_top, gap);
    if hitbox.overlaps(&top) {
        Contact::Top
    } else if hitbox.overlaps(&bottom) {
        Contact::Bottom
    } else {
        Contact::Clear
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Aabb::from_rect(0.0, 0.0, 10.0, 10.0);
        let b = Aabb::from_rect(10.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
        let c = Aabb::from_rect(9.9, 9.9, 5.0, 5.0);
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn shrink_pulls_every_side_in() {
        let a = Aabb::from_rect(10.0, 20.0, 8.0, 8.0).shrink(2.0);
        assert_eq!(a.min, Vec2::new(12.0, 22.0));
        assert_eq!(a.max, Vec2::new(16.0, 26.0));

        let tiny = Aabb::from_rect(0.0, 0.0, 2.0, 2.0).shrink(5.0);
        assert_eq!(tiny.min, tiny.max);
    }

    #[test]
    fn calf_inside_the_gap_is_clear() {
        let calf = Aabb::from_rect(10.0, 40.0, 8.0, 8.0).shrink(2.0);
        assert_eq!(obstacle_contact(&calf, 8.0, 15.0, 30.0, 35.0), Contact::Clear);
    }

    #[test]
    fn calf_hits_the_right_post() {
        let high = Aabb::from_rect(10.0, 20.0, 8.0, 8.0).shrink(2.0);
        assert_eq!(obstacle_contact(&high, 8.0, 15.0, 30.0, 35.0), Contact::Top);
        let low = Aabb::from_rect(10.0, 62.0, 8.0, 8.0).shrink(2.0);
        assert_eq!(obstacle_contact(&low, 8.0, 15.0, 30.0, 35.0), Contact::Bottom);
        // Fence still off to the right
        assert!(!obstacle_contact(&low, 16.0, 15.0, 30.0, 35.0).hit());
    }
}
