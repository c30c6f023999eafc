// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge path geometry.
//!
//! Committed edges and the live preview edge go through the same routine.

use egui::Pos2;

/// Fraction of the horizontal distance used for the control handles
const CONTROL_RATIO: f32 = 0.5;
/// Upper bound on the control handle length (screen pixels)
pub const MAX_CONTROL_OFFSET: f32 = 150.0;
/// Segments used when flattening a path for drawing and hit-testing
pub const DEFAULT_SEGMENTS: usize = 32;

/// Horizontal handle length for a path from `from` to `to`
pub fn control_offset(from: Pos2, to: Pos2) -> f32 {
    ((to.x - from.x).abs() * CONTROL_RATIO).min(MAX_CONTROL_OFFSET)
}

/// Cubic curve between two screen points with horizontal handles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePath {
    /// Start point
    pub from: Pos2,
    /// First control point
    pub ctrl1: Pos2,
    /// Second control point
    pub ctrl2: Pos2,
    /// End point
    pub to: Pos2,
}

impl EdgePath {
    /// Route a path between two screen points
    pub fn between(from: Pos2, to: Pos2) -> Self {
        let offset = control_offset(from, to);
        Self {
            from,
            ctrl1: Pos2::new(from.x + offset, from.y),
            ctrl2: Pos2::new(to.x - offset, to.y),
            to,
        }
    }

    /// Control polygon as an array
    pub fn points(&self) -> [Pos2; 4] {
        [self.from, self.ctrl1, self.ctrl2, self.to]
    }

    /// Point on the curve at `t` in `[0, 1]`
    pub fn point_at(&self, t: f32) -> Pos2 {
        let t = t.clamp(0.0, 1.0);
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let [p0, p1, p2, p3] = self.points();
        let x = mt3 * p0.x + 3.0 * mt2 * t * p1.x + 3.0 * mt * t2 * p2.x + t3 * p3.x;
        let y = mt3 * p0.y + 3.0 * mt2 * t * p1.y + 3.0 * mt * t2 * p2.y + t3 * p3.y;
        Pos2::new(x, y)
    }

    /// Flatten into `segments + 1` points
    pub fn flatten(&self, segments: usize) -> Vec<Pos2> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32))
            .collect()
    }

    /// Approximate distance from `point` to the curve
    pub fn distance_to(&self, point: Pos2) -> f32 {
        self.flatten(DEFAULT_SEGMENTS)
            .windows(2)
            .map(|w| distance_to_segment(point, w[0], w[1]))
            .fold(f32::INFINITY, f32::min)
    }
}

fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let length_sq = ab.length_sq();
    if length_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}
