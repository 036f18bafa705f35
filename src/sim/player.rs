//! The player's ship

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::shield::Shield;
use super::world::{BodyKind, BodySpec, EntityId, World};
use crate::Tuning;
use crate::consts::PLAYER_MAX_MOVE;
use crate::math::Vector2;

/// Where the ship starts each game
pub const PLAYER_START: Vec2 = Vec2::new(0.0, -5.0);

/// The player's ship and its charge counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerShip {
    pub id: EntityId,
    /// Active shield, if any
    pub shield: Option<EntityId>,
    pub bolt_cooldown: u32,
    pub bolt_cooldown_max: u32,
    pub shield_charges: u32,
    pub shield_charges_max: u32,
    pub shield_lifespan: u32,
    pub bomb_charges: u32,
    pub bomb_charges_max: u32,
    pub bomb_cooldown: u32,
    pub bomb_cooldown_max: u32,
}

impl PlayerShip {
    pub fn spawn(world: &mut World, tuning: &Tuning) -> Self {
        let spec = BodySpec::new(BodyKind::Player, PLAYER_START, 0.0)
            .circle(0.25, Vec2::new(0.0, 0.5))
            .rectangle(Vec2::new(0.625, 0.5), Vec2::new(0.0, -0.25), 0.0);
        Self {
            id: world.spawn(spec),
            shield: None,
            bolt_cooldown: 0,
            bolt_cooldown_max: tuning.bolt_cooldown,
            shield_charges: tuning.shield_charges,
            shield_charges_max: tuning.shield_charges,
            shield_lifespan: tuning.shield_lifespan,
            bomb_charges: tuning.bomb_charges,
            bomb_charges_max: tuning.bomb_charges,
            bomb_cooldown: 0,
            bomb_cooldown_max: tuning.bomb_cooldown,
        }
    }

    /// Tick cooldowns and move toward `destination` by at most one step
    pub fn update(&mut self, world: &mut World, destination: Vec2) {
        self.bolt_cooldown = self.bolt_cooldown.saturating_sub(1);
        self.bomb_cooldown = self.bomb_cooldown.saturating_sub(1);

        let position = world.position(self.id);
        if position == destination {
            return;
        }
        let offset = destination - position;
        let next = if offset.magnitude_squared() <= PLAYER_MAX_MOVE * PLAYER_MAX_MOVE {
            destination
        } else {
            position + offset.unit() * PLAYER_MAX_MOVE
        };
        let rotation = world.rotation(self.id);
        world.update_state(self.id, next, rotation);
    }

    pub fn can_fire_bolt(&self) -> bool {
        self.bolt_cooldown == 0
    }

    pub fn can_fire_bomb(&self) -> bool {
        self.bomb_charges > 0 && self.bomb_cooldown == 0
    }

    /// Spend a bomb charge; the caller launches the projectile
    pub fn spend_bomb(&mut self) {
        self.bomb_charges = self.bomb_charges.saturating_sub(1);
        self.bomb_cooldown = self.bomb_cooldown_max;
    }

    /// Spend a shield charge and raise a shield if none is up
    pub fn trigger_shield(&mut self, world: &mut World, shields: &mut Vec<Shield>) {
        if self.shield.is_none() && self.shield_charges > 0 {
            self.shield_charges -= 1;
            self.raise_shield(world, shields);
        }
    }

    /// Weld a fresh shield to the ship
    pub fn raise_shield(&mut self, world: &mut World, shields: &mut Vec<Shield>) {
        let position = world.position(self.id);
        let rotation = world.rotation(self.id);
        let shield = Shield::player(world, position, rotation, self.shield_lifespan);
        world.weld(self.id, shield.id);
        self.shield = Some(shield.id);
        shields.push(shield);
    }

    /// Grant charges, capped at the maximum
    pub fn add_charges(&mut self, amount: u32) {
        self.shield_charges = (self.shield_charges + amount).min(self.shield_charges_max);
        self.bomb_charges = (self.bomb_charges + amount).min(self.bomb_charges_max);
    }
}
