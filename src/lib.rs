//! Galactora - simulation core for a 2D arcade shoot-'em-up
//!
//! Core modules:
//! - `sim`: Deterministic simulation (collision, welds, entities, choreography, tick)
//! - `math`: Vector kernel and random helpers
//! - `settings`: Run configuration and gameplay tuning
//! - `clock`: Fixed timestep frame clock
//! - `viewport`: Screen to game unit mapping

pub mod clock;
pub mod math;
pub mod settings;
pub mod sim;
pub mod viewport;

pub use clock::FrameClock;
pub use settings::{DifficultyPreset, Settings, Tuning};
pub use viewport::Viewport;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Simulation rate
    pub const TICKS_PER_SECOND: u32 = 60;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / TICKS_PER_SECOND as f32;
    /// Update-only catch-up ticks allowed per rendered frame
    pub const MAX_FRAME_SKIPS: u32 = 5;

    /// Visible play area width in GU (portrait)
    pub const VIEW_WIDTH: f32 = 14.0;
    /// Visible play area height in GU (landscape)
    pub const VIEW_HEIGHT: f32 = 21.0;
    /// Top edge of the play area used for background spawning
    pub const VIEW_TOP: f32 = 21.0;
    /// Formation centre height
    pub const GRID_CENTRE_Y: f32 = 16.0;
    /// Projectiles further than sqrt(this) from the origin detonate
    pub const DETONATE_DISTANCE_SQ: f32 = 1600.0;

    /// Enemy linear speed (GU per tick)
    pub const ENEMY_MOVE_SPEED: f32 = 0.1;
    /// Enemy angular speed (degrees per tick)
    pub const ENEMY_ROTATE_SPEED: f32 = 5.0;
    /// Player linear speed (GU per tick)
    pub const PLAYER_MAX_MOVE: f32 = 0.2;
    /// Hard cap on projectile speed
    pub const PROJECTILE_MAX_SPEED: f32 = 0.5;
}

/// Wrap an angle in degrees to (-180, 180]
#[inline]
pub fn normalize_degrees(mut angle: f32) -> f32 {
    angle %= 360.0;
    if angle > 180.0 {
        angle -= 360.0;
    } else if angle <= -180.0 {
        angle += 360.0;
    }
    angle
}

/// Wrap an angle in degrees to [0, 360)
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Angle of a vector in degrees, measured from +x
#[inline]
pub fn angle_of(v: Vec2) -> f32 {
    v.y.atan2(v.x).to_degrees()
}

/// Rotate a vector counter-clockwise by `degrees`
#[inline]
pub fn rotate_degrees(v: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(v)
}

/// Unit direction an entity with `rotation` travels in (rotation 0 faces +y)
#[inline]
pub fn heading(rotation: f32) -> Vec2 {
    let theta = (rotation + 90.0).to_radians();
    Vec2::new(theta.cos(), theta.sin())
}
