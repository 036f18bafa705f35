//! Enemy ships: formation flying, path following and firing
//!
//! An enemy is either holding its formation slot (grid mode) or flying a path.
//! On a path it first homes to the start node, waits for its group to be
//! released, then consumes nodes at each node's balanced speed. Rotation 0
//! faces down the screen, so an enemy travelling along angle `a` has rotation
//! `a + 90` and fires along `rotation + 180`.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::path::{GroupId, Path};
use super::projectile::Projectile;
use super::shield::{Armour, ArmourSide, Shield};
use super::world::{BodyKind, BodySpec, EntityId, World};
use crate::Tuning;
use crate::consts::{ENEMY_MOVE_SPEED, ENEMY_ROTATE_SPEED, GRID_CENTRE_Y};
use crate::math::Vector2;
use crate::{angle_of, normalize_degrees, wrap_degrees};

/// Enemy types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    Drone,
    Warrior,
    Guardian,
    Queen,
}

impl EnemyKind {
    pub fn max_hp(&self) -> i32 {
        match self {
            EnemyKind::Drone => 1,
            EnemyKind::Warrior => 2,
            EnemyKind::Guardian => 1,
            EnemyKind::Queen => 3,
        }
    }

    pub fn score(&self, tuning: &Tuning) -> i64 {
        match self {
            EnemyKind::Drone => tuning.drone_score,
            EnemyKind::Warrior => tuning.warrior_score,
            EnemyKind::Guardian => tuning.guardian_score,
            EnemyKind::Queen => tuning.queen_score,
        }
    }

    pub fn sprite(&self) -> &'static str {
        match self {
            EnemyKind::Drone => "drone",
            EnemyKind::Warrior => "warrior",
            EnemyKind::Guardian => "guardian",
            EnemyKind::Queen => "queen",
        }
    }

    fn body(&self, position: Vec2, rotation: f32) -> BodySpec {
        let spec = BodySpec::new(BodyKind::Enemy, position, rotation);
        match self {
            EnemyKind::Drone => spec
                .rectangle(Vec2::new(0.5, 0.25), Vec2::new(0.0, -0.25), 0.0)
                .circle(0.4375, Vec2::new(0.0, -0.0625)),
            EnemyKind::Warrior => spec.circle(0.5, Vec2::ZERO),
            EnemyKind::Guardian => spec.circle(0.5, Vec2::new(0.0, 0.125)),
            EnemyKind::Queen => spec
                .rectangle(Vec2::new(0.375, 0.375), Vec2::new(0.0, 0.5), 45.0)
                .circle(0.625, Vec2::new(0.0, 0.125))
                .circle(0.3125, Vec2::new(0.0, -0.5)),
        }
    }
}

/// How a shot was lined up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shot {
    /// Player is in the firing lane or line of sight
    Aimed,
    /// Unaimed fire with a longer reload
    Bombardment,
}

/// Everything an enemy needs from the rest of the game during its update
pub struct EnemyContext<'a> {
    pub world: &'a mut World,
    pub projectiles: &'a mut Vec<Projectile>,
    pub rng: &'a mut Pcg32,
    pub tuning: &'a Tuning,
    pub player_position: Vec2,
}

/// An enemy ship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EntityId,
    pub kind: EnemyKind,
    pub hp: i32,
    pub fire_cooldown: u32,
    pub bursts_fired: u32,
    pub in_grid_mode: bool,
    /// Formation slot before spacing and drift are applied
    pub unmodified_grid_pos: Vec2,
    /// Current formation slot
    pub grid_pos: Vec2,
    pub path: Option<Path>,
    /// Next node to head for once released
    pub path_node: usize,
    pub at_start_point: bool,
    pub may_follow_path: bool,
    /// Leaving the level; deleted when its path ends
    pub exiting: bool,
    pub group: Option<GroupId>,
}

impl Enemy {
    /// Spawn an enemy along with its welded shield or armour
    pub fn spawn(
        kind: EnemyKind,
        position: Vec2,
        rotation: f32,
        fire_cooldown: u32,
        world: &mut World,
        shields: &mut Vec<Shield>,
        armours: &mut Vec<Armour>,
    ) -> Self {
        let id = world.spawn(kind.body(position, rotation));
        match kind {
            EnemyKind::Guardian => {
                let shield = Shield::guardian(world, position, rotation);
                world.weld(id, shield.id);
                shields.push(shield);
            }
            EnemyKind::Queen => {
                for side in [ArmourSide::QueenLeft, ArmourSide::QueenRight] {
                    let armour = Armour::queen(world, side, position, rotation);
                    world.weld(id, armour.id);
                    armours.push(armour);
                }
            }
            EnemyKind::Drone | EnemyKind::Warrior => {}
        }
        let home = Vec2::new(0.0, GRID_CENTRE_Y);
        Self {
            id,
            kind,
            hp: kind.max_hp(),
            fire_cooldown,
            bursts_fired: 0,
            in_grid_mode: true,
            unmodified_grid_pos: Vec2::ZERO,
            grid_pos: home,
            path: None,
            path_node: 1,
            at_start_point: false,
            may_follow_path: false,
            exiting: false,
            group: None,
        }
    }

    /// Random initial reload so a fresh wave does not fire in unison
    pub fn initial_cooldown(rng: &mut Pcg32, tuning: &Tuning) -> u32 {
        tuning.initial_fire_delay + rng.random_range(0..tuning.initial_fire_jitter.max(1))
    }

    /// Put the enemy on a new path; it homes to the start before following
    pub fn assign_path(&mut self, path: Path) {
        self.path = Some(path);
        self.path_node = 1;
        self.in_grid_mode = false;
        self.at_start_point = false;
        self.may_follow_path = false;
        self.group = None;
    }

    pub fn update(&mut self, ctx: &mut EnemyContext) {
        if self.in_grid_mode {
            self.update_grid(ctx.world);
        } else {
            self.update_path(ctx.world);
        }
        if !ctx.world.is_to_be_destroyed(self.id) {
            self.update_fire(ctx);
        }
    }

    /// Apply a hit point change, deleting the ship once it is out of hit points
    pub fn add_hp(&mut self, amount: i32, world: &mut World) {
        self.hp += amount;
        if self.hp <= 0 {
            self.hp = 0;
            world.delete(self.id);
        }
    }

    fn update_grid(&mut self, world: &mut World) {
        let position = world.position(self.id);
        let rotation = world.rotation(self.id);

        let relative = normalize_degrees(-rotation);
        let rotation = if relative.abs() < ENEMY_ROTATE_SPEED {
            0.0
        } else if relative < 0.0 {
            wrap_degrees(rotation - ENEMY_ROTATE_SPEED)
        } else {
            wrap_degrees(rotation + ENEMY_ROTATE_SPEED)
        };

        let offset = self.grid_pos - position;
        let position = if offset.magnitude_squared() <= ENEMY_MOVE_SPEED * ENEMY_MOVE_SPEED {
            self.grid_pos
        } else {
            position + offset.unit() * ENEMY_MOVE_SPEED
        };
        world.update_state(self.id, position, rotation);
    }

    fn update_path(&mut self, world: &mut World) {
        let Some(path) = self.path.as_ref() else {
            self.in_grid_mode = true;
            return;
        };
        let Some(start) = path.start() else {
            self.finish_path(world);
            return;
        };

        if !self.at_start_point {
            if move_towards(self.id, world, start, ENEMY_MOVE_SPEED, 1.0) > 0.0 {
                self.at_start_point = true;
            }
        } else if self.may_follow_path {
            let mut proportion = 1.0;
            while proportion > 0.0 {
                let Some(node) = path.nodes.get(self.path_node).copied() else {
                    self.finish_path(world);
                    return;
                };
                proportion = move_towards(self.id, world, node.position, node.travel_speed(), proportion);
                if proportion > 0.0 {
                    self.path_node += 1;
                }
            }
        }
    }

    /// Back to the formation, or gone if leaving
    fn finish_path(&mut self, world: &mut World) {
        self.path = None;
        self.path_node = 1;
        self.at_start_point = false;
        self.may_follow_path = false;
        self.in_grid_mode = true;
        self.group = None;
        if self.exiting {
            world.delete(self.id);
        }
    }

    fn update_fire(&mut self, ctx: &mut EnemyContext) {
        self.fire_cooldown = self.fire_cooldown.saturating_sub(1);
        if self.fire_cooldown > 0 || self.kind == EnemyKind::Guardian {
            return;
        }

        let position = ctx.world.position(self.id);
        let shot = if self.in_grid_mode {
            if (position.x - ctx.player_position.x).abs() < ctx.tuning.aim_lane_width {
                Some(Shot::Aimed)
            } else {
                Some(Shot::Bombardment)
            }
        } else {
            let perfect = angle_of(ctx.player_position - position) - 90.0;
            let current = ctx.world.rotation(self.id) - 180.0;
            if normalize_degrees(current - perfect).abs() < ctx.tuning.aim_tolerance {
                Some(Shot::Aimed)
            } else if self.kind == EnemyKind::Warrior && self.bursts_fired > 0 {
                Some(Shot::Bombardment)
            } else {
                None
            }
        };

        if let Some(shot) = shot {
            self.fire(shot, ctx);
        }
    }

    /// Reload scaled by a random factor in [1, 2) for aimed shots or [2, 3) for bombardment
    fn reload(base: u32, shot: Shot, rng: &mut Pcg32) -> u32 {
        let factor = match shot {
            Shot::Aimed => 1.0,
            Shot::Bombardment => 2.0,
        } + rng.random::<f32>();
        (base as f32 * factor) as u32
    }

    pub fn fire(&mut self, shot: Shot, ctx: &mut EnemyContext) {
        let position = ctx.world.position(self.id);
        let aim = wrap_degrees(ctx.world.rotation(self.id) + 180.0);
        match self.kind {
            EnemyKind::Drone => {
                ctx.projectiles.push(Projectile::green_bolt(ctx.world, position, aim));
                self.fire_cooldown = Self::reload(ctx.tuning.drone_fire_cooldown, shot, ctx.rng);
            }
            EnemyKind::Warrior => {
                ctx.projectiles.push(Projectile::green_bolt(ctx.world, position, aim));
                self.bursts_fired += 1;
                if self.bursts_fired < ctx.tuning.warrior_burst_length {
                    self.fire_cooldown = ctx.tuning.warrior_burst_cooldown;
                } else {
                    self.fire_cooldown = Self::reload(ctx.tuning.warrior_fire_cooldown, shot, ctx.rng);
                    self.bursts_fired = 0;
                }
            }
            EnemyKind::Queen => {
                // Queens only lob bombs at a visible target
                if shot == Shot::Aimed {
                    let distance = (ctx.player_position - position).magnitude();
                    ctx.projectiles
                        .push(Projectile::yellow_bomb(ctx.world, position, aim, distance));
                    self.fire_cooldown = Self::reload(ctx.tuning.queen_fire_cooldown, shot, ctx.rng);
                }
            }
            EnemyKind::Guardian => {}
        }
    }
}

/// Turn toward and advance on `destination` using `proportion` of one tick's movement.
///
/// Returns the proportion left over after arriving, or 0 if the budget ran out first.
pub fn move_towards(
    id: EntityId,
    world: &mut World,
    destination: Vec2,
    speed: f32,
    proportion: f32,
) -> f32 {
    let position = world.position(id);
    if position == destination {
        return proportion;
    }
    let rotation = world.rotation(id);

    let distance = speed.min(ENEMY_MOVE_SPEED) * proportion;
    let offset = destination - position;
    let travel_angle = angle_of(offset);
    let turn = normalize_degrees(travel_angle - (rotation - 90.0));
    let rotation = if turn.abs() < ENEMY_ROTATE_SPEED {
        wrap_degrees(travel_angle + 90.0)
    } else if turn < 0.0 {
        wrap_degrees(rotation - ENEMY_ROTATE_SPEED)
    } else {
        wrap_degrees(rotation + ENEMY_ROTATE_SPEED)
    };

    if offset.magnitude_squared() <= distance * distance {
        world.update_state(id, destination, rotation);
        let remaining = distance - offset.magnitude();
        proportion * remaining / distance
    } else {
        world.update_state(id, position + offset.unit() * distance, rotation);
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    struct Fixture {
        world: World,
        projectiles: Vec<Projectile>,
        shields: Vec<Shield>,
        armours: Vec<Armour>,
        rng: Pcg32,
        tuning: Tuning,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: World::new(),
                projectiles: Vec::new(),
                shields: Vec::new(),
                armours: Vec::new(),
                rng: Pcg32::seed_from_u64(1),
                tuning: Tuning::default(),
            }
        }

        fn spawn(&mut self, kind: EnemyKind, position: Vec2, cooldown: u32) -> Enemy {
            Enemy::spawn(
                kind,
                position,
                0.0,
                cooldown,
                &mut self.world,
                &mut self.shields,
                &mut self.armours,
            )
        }

        fn update(&mut self, enemy: &mut Enemy, player_position: Vec2) {
            let mut ctx = EnemyContext {
                world: &mut self.world,
                projectiles: &mut self.projectiles,
                rng: &mut self.rng,
                tuning: &self.tuning,
                player_position,
            };
            enemy.update(&mut ctx);
        }
    }

    #[test]
    fn test_escorts_are_welded() {
        let mut fx = Fixture::new();
        let guardian = fx.spawn(EnemyKind::Guardian, Vec2::ZERO, 100);
        let queen = fx.spawn(EnemyKind::Queen, Vec2::ZERO, 100);
        assert_eq!(fx.shields.len(), 1);
        assert_eq!(fx.armours.len(), 2);
        assert!(fx.world.welds().are_welded(guardian.id, fx.shields[0].id));

        // Killing the queen takes both plates with it
        fx.world.delete(queen.id);
        assert!(fx.armours.iter().all(|a| fx.world.is_to_be_destroyed(a.id)));
        assert!(!fx.world.is_to_be_destroyed(fx.shields[0].id));
    }

    #[test]
    fn test_grid_mode_homes_on_slot() {
        let mut fx = Fixture::new();
        let mut drone = fx.spawn(EnemyKind::Drone, Vec2::new(0.0, 15.0), 1000);
        drone.grid_pos = Vec2::new(0.0, 15.25);
        fx.update(&mut drone, Vec2::ZERO);
        assert!((fx.world.position(drone.id).y - 15.1).abs() < 1e-5);
        fx.update(&mut drone, Vec2::ZERO);
        fx.update(&mut drone, Vec2::ZERO);
        assert_eq!(fx.world.position(drone.id), Vec2::new(0.0, 15.25));
    }

    #[test]
    fn test_move_towards_returns_leftover() {
        let mut world = World::new();
        let id = world.spawn(BodySpec::new(BodyKind::Enemy, Vec2::ZERO, 0.0));
        let leftover = move_towards(id, &mut world, Vec2::new(0.05, 0.0), 0.1, 1.0);
        assert!((leftover - 0.5).abs() < 1e-5);
        assert_eq!(world.position(id), Vec2::new(0.05, 0.0));

        let leftover = move_towards(id, &mut world, Vec2::new(1.0, 0.0), 0.1, 1.0);
        assert_eq!(leftover, 0.0);
        assert!((world.position(id).x - 0.15).abs() < 1e-5);
    }

    #[test]
    fn test_path_run_returns_to_grid() {
        let mut fx = Fixture::new();
        let mut drone = fx.spawn(EnemyKind::Drone, Vec2::ZERO, 1000);
        let mut path = Path::new();
        path.add_node(0.0, 0.0);
        path.add_node(0.0, 0.25);
        drone.assign_path(path);

        fx.update(&mut drone, Vec2::ZERO);
        assert!(drone.at_start_point);
        drone.may_follow_path = true;
        for _ in 0..3 {
            fx.update(&mut drone, Vec2::ZERO);
        }
        assert!(drone.path.is_none());
        assert!(drone.in_grid_mode);
        assert_eq!(drone.path_node, 1);
    }

    #[test]
    fn test_exiting_enemy_deleted_at_path_end() {
        let mut fx = Fixture::new();
        let mut drone = fx.spawn(EnemyKind::Drone, Vec2::ZERO, 1000);
        let mut path = Path::new();
        path.add_node(0.0, 0.0);
        drone.assign_path(path);
        drone.exiting = true;
        drone.at_start_point = true;
        drone.may_follow_path = true;
        fx.update(&mut drone, Vec2::ZERO);
        assert!(fx.world.is_to_be_destroyed(drone.id));
        assert!(drone.in_grid_mode);
    }

    #[test]
    fn test_warrior_burst() {
        let mut fx = Fixture::new();
        let mut warrior = fx.spawn(EnemyKind::Warrior, Vec2::new(0.0, 16.0), 1);
        warrior.grid_pos = Vec2::new(0.0, 16.0);

        fx.update(&mut warrior, Vec2::new(0.0, -5.0));
        assert_eq!(fx.projectiles.len(), 1);
        assert_eq!(warrior.fire_cooldown, 10);
        for _ in 0..20 {
            fx.update(&mut warrior, Vec2::new(0.0, -5.0));
        }
        assert_eq!(fx.projectiles.len(), 3);
        assert_eq!(warrior.bursts_fired, 0);
        assert!(warrior.fire_cooldown >= 400);
    }

    #[test]
    fn test_queen_holds_fire_out_of_lane() {
        let mut fx = Fixture::new();
        let mut queen = fx.spawn(EnemyKind::Queen, Vec2::new(0.0, 16.0), 1);
        queen.grid_pos = Vec2::new(0.0, 16.0);
        fx.update(&mut queen, Vec2::new(5.0, -5.0));
        assert!(fx.projectiles.is_empty());

        fx.update(&mut queen, Vec2::new(0.5, -5.0));
        assert_eq!(fx.projectiles.len(), 1);
        assert!(queen.fire_cooldown >= 640);
    }

    #[test]
    fn test_guardian_never_fires() {
        let mut fx = Fixture::new();
        let mut guardian = fx.spawn(EnemyKind::Guardian, Vec2::new(0.0, 16.0), 1);
        for _ in 0..50 {
            fx.update(&mut guardian, Vec2::new(0.0, -5.0));
        }
        assert!(fx.projectiles.is_empty());
    }

    #[test]
    fn test_add_hp_kills_at_zero() {
        let mut fx = Fixture::new();
        let mut warrior = fx.spawn(EnemyKind::Warrior, Vec2::ZERO, 100);
        warrior.add_hp(-1, &mut fx.world);
        assert!(!fx.world.is_to_be_destroyed(warrior.id));
        warrior.add_hp(-3, &mut fx.world);
        assert_eq!(warrior.hp, 0);
        assert!(fx.world.is_to_be_destroyed(warrior.id));
    }
}
