//! Convex polygons that co-move with an entity

use super::hull::convex_hull;
use super::line::{Line, EPSILON};
use super::{rotate_degrees, Vec2};

/// Convex polygon kept as a base shape (centroid at the origin, orientation 0) plus the
/// world-space vertices derived from it for the current position and orientation
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    base: Vec<Vec2>,
    vertices: Vec<Vec2>,
    position: Vec2,
    orientation: f32,
}

impl Polygon {
    /// Build from any point cloud; the hull is taken and re-centred on its centroid
    pub fn from_points(points: &[Vec2]) -> Self {
        let hull = convex_hull(points);
        let centroid = centroid_of(&hull);
        let base: Vec<Vec2> = hull.into_iter().map(|p| p - centroid).collect();
        Self {
            vertices: base.clone(),
            base,
            position: Vec2::ZERO,
            orientation: 0.0,
        }
    }

    /// Axis-aligned square with the given side length
    pub fn square(side: f32) -> Self {
        let h = side / 2.0;
        Self::from_points(&[
            Vec2::new(-h, -h),
            Vec2::new(h, -h),
            Vec2::new(h, h),
            Vec2::new(-h, h),
        ])
    }

    pub fn base(&self) -> &[Vec2] {
        &self.base
    }

    /// World-space vertices in counter-clockwise order
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Reference point (the centroid in world space)
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn orientation(&self) -> f32 {
        self.orientation
    }

    /// Re-derive the vertices for a new orientation in degrees
    pub fn rotate(&mut self, orientation: f32) {
        self.orientation = orientation;
        self.refresh();
    }

    /// Re-centre the vertices on a new position
    pub fn translate(&mut self, position: Vec2) {
        self.position = position;
        self.refresh();
    }

    pub fn place(&mut self, position: Vec2, orientation: f32) {
        self.position = position;
        self.orientation = orientation;
        self.refresh();
    }

    fn refresh(&mut self) {
        let (position, orientation) = (self.position, self.orientation);
        self.vertices.clear();
        self.vertices
            .extend(self.base.iter().map(|&v| rotate_degrees(v, orientation) + position));
    }

    pub fn centroid(&self) -> Vec2 {
        centroid_of(&self.vertices)
    }

    pub fn perimeter(&self) -> f32 {
        self.edges().map(|edge| edge.length()).sum()
    }

    /// Conservative collision radius: bounds the Manhattan reach of any vertex from the
    /// centroid under every rotation
    pub fn nominal_radius(&self) -> f32 {
        self.base
            .iter()
            .map(|v| v.length())
            .fold(0.0, f32::max)
            * std::f32::consts::SQRT_2
    }

    pub fn edges(&self) -> impl Iterator<Item = Line> + '_ {
        let n = self.vertices.len();
        let count = if n < 2 { 0 } else { n };
        (0..count).map(move |i| Line::new(self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Inside or on the boundary
    pub fn contains_point(&self, point: Vec2) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        self.edges()
            .all(|edge| edge.delta().perp_dot(point - edge.p) >= -EPSILON)
    }

    /// Displacement between the two reference points
    pub fn distance(&self, other: &Polygon) -> Vec2 {
        other.position - self.position
    }

    /// Exact convex overlap: vertex containment either way, or any crossing edge pair
    pub fn overlaps(&self, other: &Polygon) -> bool {
        if self.vertices.iter().any(|&v| other.contains_point(v))
            || other.vertices.iter().any(|&v| self.contains_point(v))
        {
            return true;
        }

        self.edges()
            .any(|a| other.edges().any(|b| a.segment_intersects(&b)))
    }
}

fn centroid_of(points: &[Vec2]) -> Vec2 {
    if points.is_empty() {
        return Vec2::ZERO;
    }

    let n = points.len();
    let mut area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let (a, b) = (points[i], points[(i + 1) % n]);
        let cross = a.perp_dot(b);
        area += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }

    if area.abs() <= EPSILON {
        // Degenerate; fall back to the vertex mean
        let sum = points.iter().fold(Vec2::ZERO, |acc, &p| acc + p);
        return sum * (1.0 / n as f32);
    }

    Vec2::new(cx / (3.0 * area), cy / (3.0 * area))
}
