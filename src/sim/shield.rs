//! Shields and armour plates welded to ships

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::world::{BodyKind, BodySpec, EntityId, World};

/// Shield variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShieldKind {
    /// Temporary bubble around the player
    Player,
    /// Permanent bar in front of a guardian
    Guardian,
}

/// A shield reflects projectiles of the opposing side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shield {
    pub id: EntityId,
    pub kind: ShieldKind,
    /// Ticks left; `None` lasts until the host dies
    pub lifespan: Option<u32>,
    pub owned_by_player: bool,
}

impl Shield {
    /// Player bubble lasting `lifespan` ticks
    pub fn player(world: &mut World, position: Vec2, rotation: f32, lifespan: u32) -> Self {
        let spec = BodySpec::new(BodyKind::Shield, position, rotation)
            .chains_deletion(false)
            .circle(1.0, Vec2::ZERO);
        Self {
            id: world.spawn(spec),
            kind: ShieldKind::Player,
            lifespan: Some(lifespan),
            owned_by_player: true,
        }
    }

    pub fn guardian(world: &mut World, position: Vec2, rotation: f32) -> Self {
        let spec = BodySpec::new(BodyKind::Shield, position, rotation)
            .chains_deletion(false)
            .rectangle(Vec2::new(1.0, 0.125), Vec2::new(0.0, -0.5), 0.0);
        Self {
            id: world.spawn(spec),
            kind: ShieldKind::Guardian,
            lifespan: None,
            owned_by_player: false,
        }
    }

    pub fn update(&mut self, world: &mut World) {
        if let Some(ticks) = self.lifespan.as_mut() {
            *ticks = ticks.saturating_sub(1);
            if *ticks == 0 {
                world.delete(self.id);
            }
        }
    }
}

/// Which side of a queen an armour plate covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArmourSide {
    QueenLeft,
    QueenRight,
}

impl ArmourSide {
    pub fn sprite(&self) -> &'static str {
        match self {
            ArmourSide::QueenLeft => "queenleft",
            ArmourSide::QueenRight => "queenright",
        }
    }
}

/// Armour soaks damage until its hit points run out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Armour {
    pub id: EntityId,
    pub side: ArmourSide,
    pub hp: i32,
    pub owned_by_player: bool,
}

impl Armour {
    pub fn queen(world: &mut World, side: ArmourSide, position: Vec2, rotation: f32) -> Self {
        let offset_x = match side {
            ArmourSide::QueenLeft => -0.625,
            ArmourSide::QueenRight => 0.625,
        };
        let spec = BodySpec::new(BodyKind::Armour, position, rotation)
            .chains_deletion(false)
            .rectangle(Vec2::new(0.375, 0.5), Vec2::new(offset_x, -0.5), 0.0);
        Self {
            id: world.spawn(spec),
            side,
            hp: 2,
            owned_by_player: false,
        }
    }

    /// Apply a hit point change, deleting the plate once it is spent
    pub fn add_hp(&mut self, amount: i32, world: &mut World) {
        self.hp += amount;
        if self.hp <= 0 {
            self.hp = 0;
            world.delete(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_shield_expires() {
        let mut world = World::new();
        let mut shield = Shield::player(&mut world, Vec2::ZERO, 0.0, 2);
        shield.update(&mut world);
        assert!(!world.is_to_be_destroyed(shield.id));
        shield.update(&mut world);
        assert!(world.is_to_be_destroyed(shield.id));
    }

    #[test]
    fn test_guardian_shield_is_permanent() {
        let mut world = World::new();
        let mut shield = Shield::guardian(&mut world, Vec2::ZERO, 0.0);
        for _ in 0..1000 {
            shield.update(&mut world);
        }
        assert!(!world.is_to_be_destroyed(shield.id));
    }

    #[test]
    fn test_armour_breaks_at_zero() {
        let mut world = World::new();
        let mut armour = Armour::queen(&mut world, ArmourSide::QueenLeft, Vec2::ZERO, 0.0);
        armour.add_hp(-1, &mut world);
        assert!(!world.is_to_be_destroyed(armour.id));
        armour.add_hp(-5, &mut world);
        assert_eq!(armour.hp, 0);
        assert!(world.is_to_be_destroyed(armour.id));
    }
}
