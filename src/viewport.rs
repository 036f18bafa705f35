//! Screen to game unit mapping
//!
//! Tall screens show the full 14 GU width, wide screens the full 21 GU
//! height. Either way the bottom of the play area sits at y = -5 so the
//! control buttons stay on screen.

use glam::Vec2;

use crate::consts::{GRID_CENTRE_Y, VIEW_HEIGHT, VIEW_WIDTH};

/// Bottom edge of the play area in GU
const VIEW_BOTTOM: f32 = -5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Screen size in pixels
    size: Vec2,
    /// GU per pixel
    scale: f32,
    /// Game position of the top-left pixel
    origin: Vec2,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        let mut viewport = Self {
            size: Vec2::ONE,
            scale: 1.0,
            origin: Vec2::ZERO,
        };
        viewport.resize(width, height);
        viewport
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width.max(1.0), height.max(1.0));
        if self.is_portrait() {
            self.scale = VIEW_WIDTH / self.size.x;
            let height_gu = self.size.y * self.scale;
            self.origin = Vec2::new(-VIEW_WIDTH / 2.0, height_gu + VIEW_BOTTOM);
        } else {
            self.scale = VIEW_HEIGHT / self.size.y;
            let width_gu = self.size.x * self.scale;
            self.origin = Vec2::new(-width_gu / 2.0, GRID_CENTRE_Y);
        }
    }

    /// Narrower than the play area's aspect ratio
    pub fn is_portrait(&self) -> bool {
        self.size.x / self.size.y <= VIEW_WIDTH / VIEW_HEIGHT
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Game units per pixel
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Convert a screen pixel (origin top-left, y down) to game units
    pub fn to_game(&self, screen: Vec2) -> Vec2 {
        let clamped = screen.clamp(Vec2::ZERO, self.size);
        Vec2::new(clamped.x * self.scale, -clamped.y * self.scale) + self.origin
    }

    pub fn to_screen(&self, game: Vec2) -> Vec2 {
        let offset = (game - self.origin) / self.scale;
        Vec2::new(offset.x, -offset.y)
    }

    /// Visible game area as (bottom-left, top-right)
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.to_game(Vec2::new(0.0, self.size.y)), self.to_game(Vec2::new(self.size.x, 0.0)))
    }
}
