//! Line segments: slope/intercept form, intersection, Liang-Barsky clipping and rasterized traces

use std::collections::BTreeSet;

use glam::Vec2;

/// Tolerance used when comparing slopes, intercepts and box edges
pub const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Axis-aligned bounding box (closed on every side)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Box spanning two corners given in any order
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Touching boxes overlap; zero-width boxes (axis-aligned segments) are valid
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x + EPSILON
            && other.min.x <= self.max.x + EPSILON
            && self.min.y <= other.max.y + EPSILON
            && other.min.y <= self.max.y + EPSILON
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x - EPSILON
            && point.x <= self.max.x + EPSILON
            && point.y >= self.min.y - EPSILON
            && point.y <= self.max.y + EPSILON
    }
}

/// Result of intersecting the infinite lines through two segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intersection {
    /// The lines cross at a single point
    Point(Vec2),
    /// The lines are the same line; carries the receiving segment
    Coincident(Line),
}

/// Line segment between two endpoints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub p: Vec2,
    pub q: Vec2,
}

impl Line {
    pub fn new(p: Vec2, q: Vec2) -> Self {
        Self { p, q }
    }

    /// Slope of the segment, `None` when it is vertical
    pub fn slope(&self) -> Option<f32> {
        if self.p.x != self.q.x {
            Some((self.q.y - self.p.y) / (self.q.x - self.p.x))
        } else {
            None
        }
    }

    /// Y-intercept of the segment's line, `None` when it is vertical
    pub fn intercept(&self) -> Option<f32> {
        self.slope().map(|m| self.p.y - m * self.p.x)
    }

    /// Euclidean length
    pub fn length(&self) -> f32 {
        self.delta().length()
    }

    /// Displacement from `p` to `q`
    pub fn delta(&self) -> Vec2 {
        self.q - self.p
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_corners(self.p, self.q)
    }

    /// Intersection of the infinite lines through `self` and `other`.
    ///
    /// Segments whose bounding boxes do not overlap are rejected up front. The returned point
    /// is not guaranteed to lie on either segment; use [`Line::segment_intersects`] for that.
    pub fn intersection(&self, other: &Line) -> Option<Intersection> {
        if !self.bounds().overlaps(&other.bounds()) {
            return None;
        }

        match (self.slope(), other.slope()) {
            (Some(m1), Some(m2)) if !approx_eq(m1, m2) => {
                let b1 = self.p.y - m1 * self.p.x;
                let b2 = other.p.y - m2 * other.p.x;
                let x = (b2 - b1) / (m1 - m2);
                Some(Intersection::Point(Vec2::new(x, m1 * x + b1)))
            }
            (None, Some(m2)) => {
                let b2 = other.p.y - m2 * other.p.x;
                let x = self.p.x;
                Some(Intersection::Point(Vec2::new(x, m2 * x + b2)))
            }
            (Some(m1), None) => {
                let b1 = self.p.y - m1 * self.p.x;
                let x = other.p.x;
                Some(Intersection::Point(Vec2::new(x, m1 * x + b1)))
            }
            (Some(m1), Some(m2)) => {
                let b1 = self.p.y - m1 * self.p.x;
                let b2 = other.p.y - m2 * other.p.x;
                approx_eq(b1, b2).then_some(Intersection::Coincident(*self))
            }
            (None, None) => {
                approx_eq(self.p.x, other.p.x).then_some(Intersection::Coincident(*self))
            }
        }
    }

    /// True when the two segments themselves touch
    pub fn segment_intersects(&self, other: &Line) -> bool {
        match self.intersection(other) {
            Some(Intersection::Point(point)) => {
                self.bounds().contains(point) && other.bounds().contains(point)
            }
            Some(Intersection::Coincident(_)) => true,
            None => false,
        }
    }

    /// Clip to `rect` with Liang-Barsky. `None` when the segment lies entirely outside.
    pub fn clip(&self, rect: &Aabb) -> Option<Line> {
        let d = self.delta();
        let mut t0: f32 = 0.0;
        let mut t1: f32 = 1.0;

        let half_planes = [
            (-d.x, self.p.x - rect.min.x),
            (d.x, rect.max.x - self.p.x),
            (-d.y, self.p.y - rect.min.y),
            (d.y, rect.max.y - self.p.y),
        ];

        for (p, q) in half_planes {
            if p == 0.0 {
                // Parallel to this edge
                if q < 0.0 {
                    return None;
                }
                continue;
            }

            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }

        if t0 > t1 {
            return None;
        }

        Some(Line::new(self.p + d * t0, self.p + d * t1))
    }

    /// Integer grid cells crossed by the segment.
    ///
    /// Steps one unit at a time along the dominant axis. Steep lines use the equation rotated
    /// by 90 degrees (`x = y / m - b / m`) so the run never ends up as a divisor.
    pub fn trace(&self) -> BTreeSet<(i32, i32)> {
        let start = (self.p.x.round() as i32, self.p.y.round() as i32);
        let end = (self.q.x.round() as i32, self.q.y.round() as i32);
        let d = self.delta();

        let mut cells = BTreeSet::new();
        cells.insert(start);

        if d.y.abs() > d.x.abs() {
            let inv_m = d.x / d.y;
            let inv_b = self.p.x - inv_m * self.p.y;
            let step = (end.1 - start.1).signum();
            let mut y = start.1;
            while y != end.1 {
                y += step;
                cells.insert(((inv_m * y as f32 + inv_b).round() as i32, y));
            }
        } else if let (Some(m), Some(b)) = (self.slope(), self.intercept()) {
            let step = (end.0 - start.0).signum();
            let mut x = start.0;
            while x != end.0 {
                x += step;
                cells.insert((x, (m * x as f32 + b).round() as i32));
            }
        }

        cells
    }
}
