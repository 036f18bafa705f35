//! Formation manoeuvres that keep the enemy grid moving

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::enemy::Enemy;
use crate::consts::GRID_CENTRE_Y;

/// Spacing change per tick while spreading
const SPREAD_RATE: f32 = 0.005;
/// Extra spacing at the widest point of a spread
const SPREAD_MAX: f32 = 0.4;
/// Sideways drift per tick
const DRIFT_RATE: f32 = 0.025;
/// Furthest sideways drift
const DRIFT_MAX: f32 = 2.0;

/// The manoeuvre in progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Manoeuvre {
    /// Spread out then close back up
    Spread { widening: bool },
    /// Slide to one side then back; `direction` is +1 for right, -1 for left
    Drift { direction: f32, outbound: bool },
}

/// Shared grid transform applied to every formation slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    pub manoeuvre: Option<Manoeuvre>,
    /// Extra spacing multiplier on top of 1
    pub spacing: f32,
    /// Sideways offset of the whole grid
    pub offset: f32,
    /// Lowest unmodified slot row among live enemies (never above 0)
    pub y_min: f32,
}

impl Default for Formation {
    fn default() -> Self {
        Self {
            manoeuvre: None,
            spacing: 0.0,
            offset: 0.0,
            y_min: 0.0,
        }
    }
}

impl Formation {
    /// World position of an unmodified slot under the current transform
    pub fn slot(&self, unmodified: Vec2) -> Vec2 {
        Vec2::new(
            unmodified.x * (1.0 + self.spacing) + self.offset,
            unmodified.y + GRID_CENTRE_Y,
        )
    }

    /// Advance the manoeuvre one tick, starting a new one when idle
    pub fn advance(&mut self, rng: &mut Pcg32) {
        let manoeuvre = match self.manoeuvre {
            Some(m) => m,
            None => match rng.random_range(0..3) {
                0 => Manoeuvre::Spread { widening: true },
                1 => Manoeuvre::Drift {
                    direction: 1.0,
                    outbound: true,
                },
                _ => Manoeuvre::Drift {
                    direction: -1.0,
                    outbound: true,
                },
            },
        };

        self.manoeuvre = match manoeuvre {
            Manoeuvre::Spread { widening: true } => {
                self.spacing = (self.spacing + SPREAD_RATE).min(SPREAD_MAX);
                Some(Manoeuvre::Spread {
                    widening: self.spacing < SPREAD_MAX,
                })
            }
            Manoeuvre::Spread { widening: false } => {
                self.spacing = (self.spacing - SPREAD_RATE).max(0.0);
                (self.spacing > 0.0).then_some(manoeuvre)
            }
            Manoeuvre::Drift {
                direction,
                outbound: true,
            } => {
                self.offset = (self.offset + DRIFT_RATE * direction).clamp(-DRIFT_MAX, DRIFT_MAX);
                Some(Manoeuvre::Drift {
                    direction,
                    outbound: self.offset.abs() < DRIFT_MAX,
                })
            }
            Manoeuvre::Drift {
                direction,
                outbound: false,
            } => {
                self.offset -= DRIFT_RATE * direction;
                if self.offset * direction <= 0.0 {
                    self.offset = 0.0;
                    None
                } else {
                    Some(manoeuvre)
                }
            }
        };
    }

    /// Advance and write every enemy's current slot
    pub fn update(&mut self, rng: &mut Pcg32, enemies: &mut [Enemy]) {
        self.advance(rng);
        self.y_min = enemies
            .iter()
            .map(|e| e.unmodified_grid_pos.y)
            .fold(0.0, f32::min);
        for enemy in enemies.iter_mut() {
            enemy.grid_pos = self.slot(enemy.unmodified_grid_pos);
        }
    }
}
