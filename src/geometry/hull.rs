//! Convex hull by Graham scan over lexicographically sorted points (monotone chains)

use std::cmp::Ordering;

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    Left,
    Right,
    None,
}

fn turn(p: Vec2, q: Vec2, r: Vec2) -> Turn {
    let cross = (q - p).perp_dot(r - p);
    if cross > 0.0 {
        Turn::Left
    } else if cross < 0.0 {
        Turn::Right
    } else {
        Turn::None
    }
}

/// Append `r`, first popping every tail point that would not leave a strict left turn
fn keep_left(chain: &mut Vec<Vec2>, r: Vec2) {
    while chain.len() > 1 && turn(chain[chain.len() - 2], chain[chain.len() - 1], r) != Turn::Left
    {
        chain.pop();
    }
    if chain.last() != Some(&r) {
        chain.push(r);
    }
}

fn lexicographic(a: &Vec2, b: &Vec2) -> Ordering {
    a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y))
}

/// Counter-clockwise convex hull of an unordered point set.
///
/// Starts at the lowest-x (then lowest-y) point. Fewer than three distinct points, or a
/// collinear set, yields just the extreme points.
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    // Adding +0.0 folds -0.0 into +0.0 so signed zeros still reach the y tie-break
    let mut sorted: Vec<Vec2> = points.iter().map(|&p| p + Vec2::ZERO).collect();
    sorted.sort_by(lexicographic);
    sorted.dedup();

    let mut lower = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        keep_left(&mut lower, p);
    }

    let mut upper = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        keep_left(&mut upper, p);
    }

    if upper.len() > 2 {
        lower.extend_from_slice(&upper[1..upper.len() - 1]);
    }
    lower
}
