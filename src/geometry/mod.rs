//! Collision geometry toolkit

pub mod hull;
pub mod line;
pub mod polygon;

pub use glam::Vec2;
pub use hull::convex_hull;
pub use line::{Aabb, Intersection, Line};
pub use polygon::Polygon;

/// Unit vector for an angle given in degrees
pub fn unit_vector(degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians())
}

/// `v` turned counter-clockwise about the origin
pub fn rotate_degrees(v: Vec2, degrees: f32) -> Vec2 {
    unit_vector(degrees).rotate(v)
}

/// Sum of absolute components
pub fn manhattan(v: Vec2) -> f32 {
    v.abs().element_sum()
}

/// Two-phase overlap test between two placed shapes.
///
/// The Manhattan gap between reference points is checked against the summed nominal radii
/// first; the exact polygon test only runs when that cheap check passes.
pub fn shapes_collide(a: &Polygon, a_radius: f32, b: &Polygon, b_radius: f32) -> bool {
    let gap = manhattan(a.distance(b));
    if gap >= a_radius + b_radius {
        return false;
    }
    a.overlaps(b)
}
