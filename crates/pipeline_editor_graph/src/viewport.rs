// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pan/zoom mapping between canvas space and screen space.

use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest allowed scale
pub const MIN_SCALE: f32 = 0.1;
/// Largest allowed scale
pub const MAX_SCALE: f32 = 3.0;
/// Scale multiplier per zoom-in step
pub const ZOOM_IN_FACTOR: f32 = 1.1;
/// Scale multiplier per zoom-out step
pub const ZOOM_OUT_FACTOR: f32 = 0.9;

/// Direction of one discrete wheel step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    /// Magnify
    In,
    /// Shrink
    Out,
}

impl ZoomDirection {
    /// Multiplicative factor for this step
    pub fn factor(self) -> f32 {
        match self {
            Self::In => ZOOM_IN_FACTOR,
            Self::Out => ZOOM_OUT_FACTOR,
        }
    }
}

/// Pan offset (screen units) and zoom scale.
///
/// `screen = canvas * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    offset: Vec2,
    scale: f32,
}

impl ViewportTransform {
    /// Identity transform
    pub fn new() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
        }
    }

    /// Transform with a given offset and scale (scale is clamped)
    pub fn with(offset: Vec2, scale: f32) -> Self {
        Self {
            offset,
            scale: scale.clamp(MIN_SCALE, MAX_SCALE),
        }
    }

    /// Current pan offset
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Current zoom scale
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Map a screen point into canvas space
    pub fn screen_to_canvas(&self, screen: Pos2) -> Pos2 {
        ((screen - self.offset).to_vec2() / self.scale).to_pos2()
    }

    /// Map a canvas point into screen space
    pub fn canvas_to_screen(&self, canvas: Pos2) -> Pos2 {
        (canvas.to_vec2() * self.scale + self.offset).to_pos2()
    }

    /// Map a canvas-space length into screen pixels
    pub fn scale_length(&self, length: f32) -> f32 {
        length * self.scale
    }

    /// Apply one discrete zoom step
    pub fn zoom(&mut self, direction: ZoomDirection) {
        self.scale = (self.scale * direction.factor()).clamp(MIN_SCALE, MAX_SCALE);
    }

    /// Shift the view by a screen-space delta (1:1, independent of scale)
    pub fn pan(&mut self, screen_delta: Vec2) {
        self.offset += screen_delta;
    }

    /// Back to the identity transform
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new()
    }
}
