//! Projectiles and the one-tick explosions they leave behind

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Collider;
use super::events::{EffectKind, GameEvent};
use super::world::{BodyKind, BodySpec, EntityId, World};
use crate::consts::{DETONATE_DISTANCE_SQ, PROJECTILE_MAX_SPEED};
use crate::math::Vector2;
use crate::{angle_of, heading, wrap_degrees};

/// Projectile types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Player auto-fire
    RedBolt,
    /// Drone and warrior fire
    GreenBolt,
    /// Player bomb, strength set by how long the button was held
    RedBomb,
    /// Queen bomb, fused to burst near the player
    YellowBomb,
}

impl ProjectileKind {
    pub fn effect(&self) -> EffectKind {
        match self {
            ProjectileKind::RedBolt => EffectKind::RedBolt,
            ProjectileKind::GreenBolt => EffectKind::GreenBolt,
            ProjectileKind::RedBomb => EffectKind::RedBomb,
            ProjectileKind::YellowBomb => EffectKind::YellowBomb,
        }
    }
}

/// A damaging circle that lives for exactly one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosion {
    pub collider: Collider,
    pub damage: i32,
}

/// A projectile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: EntityId,
    pub kind: ProjectileKind,
    pub velocity: Vec2,
    /// Change in speed per tick
    pub acceleration: f32,
    /// Ticks left before detonation; `None` means only the world bounds end it
    pub lifespan: Option<u32>,
    pub damage: i32,
    /// Explosion radius on detonation (0 = no explosion)
    pub explosion_radius: f32,
    pub owned_by_player: bool,
    /// Set when reflected this tick; exempts it from further reflection until the next update
    pub reflected: bool,
    pub detonated: bool,
}

impl Projectile {
    #[allow(clippy::too_many_arguments)]
    fn spawn(
        world: &mut World,
        spec: BodySpec,
        kind: ProjectileKind,
        speed: f32,
        acceleration: f32,
        lifespan: Option<u32>,
        damage: i32,
        explosion_radius: f32,
        owned_by_player: bool,
    ) -> Self {
        let velocity = heading(spec.rotation) * speed.min(PROJECTILE_MAX_SPEED);
        let id = world.spawn(spec);
        Self {
            id,
            kind,
            velocity,
            acceleration,
            lifespan,
            damage,
            explosion_radius,
            owned_by_player,
            reflected: false,
            detonated: false,
        }
    }

    /// Player auto-fire bolt
    pub fn red_bolt(world: &mut World, position: Vec2, rotation: f32) -> Self {
        let spec = BodySpec::new(BodyKind::Projectile, position, rotation).rectangle(
            Vec2::splat(0.17678),
            Vec2::new(0.0, 0.25),
            45.0,
        );
        Self::spawn(world, spec, ProjectileKind::RedBolt, 0.2, 0.0, None, 1, 0.0, true)
    }

    /// Enemy bolt
    pub fn green_bolt(world: &mut World, position: Vec2, rotation: f32) -> Self {
        let spec = BodySpec::new(BodyKind::Projectile, position, rotation)
            .circle(0.25, Vec2::new(0.0, 0.25));
        Self::spawn(world, spec, ProjectileKind::GreenBolt, 0.15, 0.0, None, 1, 0.0, false)
    }

    /// Player bomb; `held_ticks` is how long the bomb button was held
    pub fn red_bomb(world: &mut World, position: Vec2, rotation: f32, held_ticks: u32) -> Self {
        let strength = held_ticks.clamp(30, 60) as f32 / 60.0;
        let spec = BodySpec::new(BodyKind::Projectile, position, rotation)
            .circle(0.125, Vec2::ZERO)
            .rectangle(Vec2::new(0.125, 0.25), Vec2::new(0.0, -0.25), 0.0);
        Self::spawn(
            world,
            spec,
            ProjectileKind::RedBomb,
            strength * 0.5,
            -0.01,
            Some((strength * 50.0) as u32),
            2,
            3.0,
            true,
        )
    }

    /// Queen bomb fused to burst roughly `distance` away
    pub fn yellow_bomb(world: &mut World, position: Vec2, rotation: f32, distance: f32) -> Self {
        const SPEED: f32 = 0.1;
        let fuse = (distance / SPEED).max(35.0) as u32;
        let spec = BodySpec::new(BodyKind::Projectile, position, rotation).circle(0.25, Vec2::ZERO);
        Self::spawn(
            world,
            spec,
            ProjectileKind::YellowBomb,
            SPEED,
            0.0,
            Some(fuse),
            2,
            2.0,
            false,
        )
    }

    /// Advance one tick
    pub fn update(&mut self, world: &mut World) {
        let mut rotation = world.rotation(self.id);
        if self.reflected {
            rotation = wrap_degrees(angle_of(self.velocity) - 90.0);
            self.reflected = false;
        }
        let position = world.position(self.id) + self.velocity;
        world.update_state(self.id, position, rotation);

        if self.acceleration != 0.0 {
            let speed = (self.velocity.magnitude() + self.acceleration).clamp(0.0, PROJECTILE_MAX_SPEED);
            self.velocity = self.velocity.with_magnitude(speed);
        }

        if let Some(ticks) = self.lifespan.as_mut() {
            *ticks = ticks.saturating_sub(1);
        }
    }

    /// Fuse burnt out or left the play area
    pub fn is_ready_to_detonate(&self, world: &World) -> bool {
        let expired = self.lifespan == Some(0);
        let out_of_bounds = world.position(self.id).magnitude_squared() > DETONATE_DISTANCE_SQ;
        (expired || out_of_bounds) && !self.detonated
    }

    /// Detonate: spawn an explosion if this projectile has a blast radius, request an effect, delete
    pub fn explode(
        &mut self,
        world: &mut World,
        explosions: &mut Vec<Explosion>,
        events: &mut Vec<GameEvent>,
    ) {
        let position = world.position(self.id);
        if self.explosion_radius > 0.0 {
            explosions.push(Explosion {
                collider: Collider::circle(self.explosion_radius, position),
                damage: self.damage,
            });
        }
        events.push(GameEvent::Effect {
            effect: self.kind.effect(),
            position,
        });
        self.detonated = true;
        world.delete(self.id);
    }

    /// Bounce off a shield: mirror the velocity about `normal` and change sides
    pub fn reflect(&mut self, normal: Vec2) {
        self.velocity = super::collision::reflect_velocity(self.velocity, normal);
        self.owned_by_player = !self.owned_by_player;
        self.reflected = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bolt_travels_along_heading() {
        let mut world = World::new();
        let mut bolt = Projectile::red_bolt(&mut world, Vec2::ZERO, 0.0);
        bolt.update(&mut world);
        assert!((world.position(bolt.id) - Vec2::new(0.0, 0.2)).length() < 1e-5);

        let mut enemy_bolt = Projectile::green_bolt(&mut world, Vec2::ZERO, 180.0);
        enemy_bolt.update(&mut world);
        assert!((world.position(enemy_bolt.id) - Vec2::new(0.0, -0.15)).length() < 1e-5);
    }

    #[test]
    fn test_reflection_flips_ownership_and_clears_next_tick() {
        let mut world = World::new();
        let mut bolt = Projectile::green_bolt(&mut world, Vec2::ZERO, 180.0);
        bolt.velocity = Vec2::new(0.0, -1.0);
        bolt.reflect(Vec2::new(0.0, 1.0));

        assert!((bolt.velocity - Vec2::new(0.0, 1.0)).length() < 1e-6);
        assert!(bolt.owned_by_player);
        assert!(bolt.reflected);

        bolt.update(&mut world);
        assert!(!bolt.reflected);
        // Facing now matches the new direction of travel
        assert!(crate::normalize_degrees(world.rotation(bolt.id)).abs() < 1e-3);
    }

    #[test]
    fn test_red_bomb_strength_and_deceleration() {
        let mut world = World::new();
        let mut weak = Projectile::red_bomb(&mut world, Vec2::ZERO, 0.0, 5);
        assert_eq!(weak.lifespan, Some(25));
        assert!((weak.velocity.length() - 0.25).abs() < 1e-5);

        let full = Projectile::red_bomb(&mut world, Vec2::ZERO, 0.0, 600);
        assert_eq!(full.lifespan, Some(50));

        weak.update(&mut world);
        assert!((weak.velocity.length() - 0.24).abs() < 1e-5);
        for _ in 0..24 {
            weak.update(&mut world);
        }
        assert_eq!(weak.lifespan, Some(0));
        assert!(weak.velocity.length() <= 0.01 + 1e-5);
        assert!(weak.is_ready_to_detonate(&world));
    }

    #[test]
    fn test_explode_once() {
        let mut world = World::new();
        let mut bomb = Projectile::yellow_bomb(&mut world, Vec2::new(1.0, 1.0), 180.0, 1.0);
        assert_eq!(bomb.lifespan, Some(35));

        let mut explosions = Vec::new();
        let mut events = Vec::new();
        bomb.explode(&mut world, &mut explosions, &mut events);
        assert_eq!(explosions.len(), 1);
        assert_eq!(explosions[0].damage, 2);
        assert_eq!(events.len(), 1);
        assert!(world.is_to_be_destroyed(bomb.id));
        assert!(!bomb.is_ready_to_detonate(&world));
    }

    #[test]
    fn test_out_of_bounds_detonates() {
        let mut world = World::new();
        let bolt = Projectile::red_bolt(&mut world, Vec2::new(0.0, 40.5), 0.0);
        assert!(bolt.is_ready_to_detonate(&world));
        let bolt = Projectile::red_bolt(&mut world, Vec2::new(0.0, 39.5), 0.0);
        assert!(!bolt.is_ready_to_detonate(&world));
    }
}
