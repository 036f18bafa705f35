//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically. The order of
//! the passes below is part of the game's behaviour: controls are read before
//! anything moves, every entity moves before any collision is resolved, and
//! deletions only take effect in the settle and sweep at the very end.

use glam::Vec2;

use super::enemy::EnemyContext;
use super::events::GameEvent;
use super::level::{Level, LevelContext};
use super::projectile::Projectile;
use super::state::GameState;

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState) {
    state.time_ticks += 1;
    state.buttons.update();
    apply_input(state);
    apply_controls(state);

    state.paused = state.buttons.pause.poll();
    if !state.paused {
        state.background.update(&mut state.rng);

        if state.level.as_ref().is_some_and(Level::is_complete) {
            state.load_level(state.level_index + 1);
        }
        if !state.game_over {
            advance(state);
        }
    }

    state.settle();
    state.sweep();
}

/// Route queued touches to the buttons, or steer the ship with them
fn apply_input(state: &mut GameState) {
    for event in state.drain_input() {
        if event.pressed {
            if !state.buttons.press(event.point) {
                state.set_destination(event.point);
            }
        } else {
            state.buttons.release(event.point);
        }
    }
}

fn player_pose(state: &GameState) -> (Vec2, f32) {
    (
        state.world.position(state.player.id),
        state.world.rotation(state.player.id),
    )
}

fn apply_controls(state: &mut GameState) {
    if state.buttons.shield.poll() {
        state
            .player
            .trigger_shield(&mut state.world, &mut state.shields);
    }

    if state.buttons.bomb.poll() && state.player.can_fire_bomb() {
        state.player.spend_bomb();
        let held = state.buttons.bomb.pressed_length();
        let (position, rotation) = player_pose(state);
        let bomb = Projectile::red_bomb(&mut state.world, position, rotation, held);
        state.projectiles.push(bomb);
    }

    if state.buttons.auto_fire.poll() && state.player.can_fire_bolt() {
        state.player.bolt_cooldown = state.player.bolt_cooldown_max;
        let (position, rotation) = player_pose(state);
        let bolt = Projectile::red_bolt(&mut state.world, position, rotation);
        state.projectiles.push(bolt);
    }
}

/// Move everything, then resolve hits
fn advance(state: &mut GameState) {
    state.formation.update(&mut state.rng, &mut state.enemies);
    update_level(state);
    state.player.update(&mut state.world, state.last_move);
    update_enemies(state);
    for shield in &mut state.shields {
        if !state.world.is_to_be_destroyed(shield.id) {
            shield.update(&mut state.world);
        }
    }
    update_projectiles(state);

    reflect_off_shields(state);
    hit_armour(state);
    hit_enemies(state);
    hit_player(state);
    apply_explosions(state);
}

fn update_level(state: &mut GameState) {
    let Some(level) = state.level.as_mut() else {
        return;
    };
    let mut texts = Vec::new();
    let mut ctx = LevelContext {
        world: &mut state.world,
        enemies: &mut state.enemies,
        shields: &mut state.shields,
        armours: &mut state.armours,
        rng: &mut state.rng,
        tuning: &state.tuning,
        grid_y_min: state.formation.y_min,
        score: state.score,
        texts: &mut texts,
    };
    level.update(&mut ctx);
    state
        .pending
        .extend(texts.into_iter().map(GameEvent::LevelText));
}

fn update_enemies(state: &mut GameState) {
    let player_position = state.world.position(state.player.id);
    let mut ctx = EnemyContext {
        world: &mut state.world,
        projectiles: &mut state.projectiles,
        rng: &mut state.rng,
        tuning: &state.tuning,
        player_position,
    };
    for enemy in &mut state.enemies {
        if ctx.world.is_to_be_destroyed(enemy.id) {
            continue;
        }
        enemy.update(&mut ctx);
    }
}

fn update_projectiles(state: &mut GameState) {
    for projectile in &mut state.projectiles {
        if projectile.detonated || state.world.is_to_be_destroyed(projectile.id) {
            continue;
        }
        projectile.update(&mut state.world);
        if projectile.is_ready_to_detonate(&state.world) {
            projectile.explode(&mut state.world, &mut state.explosions, &mut state.pending);
        }
    }
}

/// Shots that are still live and have not just bounced
fn is_live(projectile: &Projectile) -> bool {
    !projectile.reflected && !projectile.detonated
}

/// Shields bounce the other side's shots back
fn reflect_off_shields(state: &mut GameState) {
    for projectile in &mut state.projectiles {
        for shield in &state.shields {
            if !is_live(projectile)
                || projectile.owned_by_player == shield.owned_by_player
                || state.world.is_to_be_destroyed(shield.id)
            {
                continue;
            }
            let result = state.world.check_collision(projectile.id, shield.id);
            if result.hit {
                projectile.reflect(result.normal);
                break;
            }
        }
    }
}

fn hit_armour(state: &mut GameState) {
    for projectile in &mut state.projectiles {
        for armour in &mut state.armours {
            if !is_live(projectile)
                || projectile.owned_by_player == armour.owned_by_player
                || state.world.is_to_be_destroyed(armour.id)
            {
                continue;
            }
            if !state.world.check_collision(projectile.id, armour.id).hit {
                continue;
            }
            // Bombs do their damage through the blast
            if projectile.explosion_radius <= 0.0 {
                armour.add_hp(-projectile.damage, &mut state.world);
            }
            projectile.explode(&mut state.world, &mut state.explosions, &mut state.pending);
            break;
        }
    }
}

fn hit_enemies(state: &mut GameState) {
    for projectile in &mut state.projectiles {
        if !projectile.owned_by_player {
            continue;
        }
        for enemy in &mut state.enemies {
            if !is_live(projectile) || state.world.is_to_be_destroyed(enemy.id) {
                continue;
            }
            if !state.world.check_collision(projectile.id, enemy.id).hit {
                continue;
            }
            if projectile.explosion_radius <= 0.0 {
                enemy.add_hp(-projectile.damage, &mut state.world);
            }
            projectile.explode(&mut state.world, &mut state.explosions, &mut state.pending);
            break;
        }
    }
}

fn hit_player(state: &mut GameState) {
    let mut hits = 0;
    for projectile in &mut state.projectiles {
        if projectile.owned_by_player || !is_live(projectile) {
            continue;
        }
        if !state
            .world
            .check_collision(projectile.id, state.player.id)
            .hit
        {
            continue;
        }
        if projectile.explosion_radius <= 0.0 {
            hits += 1;
        }
        projectile.explode(&mut state.world, &mut state.explosions, &mut state.pending);
    }
    for _ in 0..hits {
        state.take_damage();
    }
}

/// Blasts last one tick and hurt everything they touch
fn apply_explosions(state: &mut GameState) {
    let mut player_hits = 0;
    for explosion in &state.explosions {
        for enemy in &mut state.enemies {
            if !state.world.is_to_be_destroyed(enemy.id)
                && state
                    .world
                    .check_collision_with(enemy.id, &explosion.collider)
                    .hit
            {
                enemy.add_hp(-explosion.damage, &mut state.world);
            }
        }
        for armour in &mut state.armours {
            if !state.world.is_to_be_destroyed(armour.id)
                && state
                    .world
                    .check_collision_with(armour.id, &explosion.collider)
                    .hit
            {
                armour.add_hp(-explosion.damage, &mut state.world);
            }
        }
        if state
            .world
            .check_collision_with(state.player.id, &explosion.collider)
            .hit
        {
            player_hits += 1;
        }
    }
    for _ in 0..player_hits {
        state.take_damage();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tuning;
    use crate::consts::GRID_CENTRE_Y;
    use crate::sim::enemy::{Enemy, EnemyKind};
    use crate::sim::world::EntityId;
    use crate::sim::events::InputEvent;
    use crate::sim::level::{ExitPhase, LevelDescriptor, MidPhase};
    use crate::sim::projectile::ProjectileKind;

    fn empty_level() -> LevelDescriptor {
        LevelDescriptor {
            name: "empty".into(),
            difficulty_rating: 1,
            on_start: Vec::new(),
            waves: Vec::new(),
            mid: MidPhase::default(),
            exit: ExitPhase::default(),
            on_end: Vec::new(),
        }
    }

    /// A level that idles in its exit phase so nothing ends the game
    fn quiet_state() -> GameState {
        let mut level = empty_level();
        level.exit.delay = 1_000_000;
        let mut state = GameState::new(12345, Tuning::default(), vec![level]);
        // Park the ship where it starts
        state.last_move = state.world.position(state.player.id);
        state
    }

    #[test]
    fn test_bolt_kills_drone() {
        let mut state = quiet_state();
        let drone = Enemy::spawn(
            EnemyKind::Drone,
            Vec2::new(0.0, 1.0),
            0.0,
            1000,
            &mut state.world,
            &mut state.shields,
            &mut state.armours,
        );
        let drone_id = drone.id;
        state.enemies.push(drone);
        let bolt = Projectile::red_bolt(&mut state.world, Vec2::new(0.0, 0.5), 0.0);
        state.projectiles.push(bolt);

        tick(&mut state);

        assert_eq!(state.score, 20);
        assert!(state.enemies.is_empty());
        assert!(state.projectiles.is_empty());
        assert!(!state.world.contains(drone_id));
        let events = state.take_events();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GameEvent::EnemyGibs { kind: EnemyKind::Drone, .. }))
        );
        assert!(events.iter().any(|e| matches!(e, GameEvent::Effect { .. })));
    }

    #[test]
    fn test_enemy_shot_costs_points_and_raises_shield() {
        let mut state = quiet_state();
        let above = state.world.position(state.player.id) + Vec2::new(0.0, 2.0);
        let bolt = Projectile::green_bolt(&mut state.world, above, 180.0);
        state.projectiles.push(bolt);

        for _ in 0..30 {
            tick(&mut state);
        }
        assert_eq!(state.score, -500);
        assert!(state.player.shield.is_some());
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_shield_reflects_enemy_shot() {
        let mut state = quiet_state();
        state
            .player
            .trigger_shield(&mut state.world, &mut state.shields);
        let above = state.world.position(state.player.id) + Vec2::new(0.0, 3.0);
        let bolt = Projectile::green_bolt(&mut state.world, above, 180.0);
        state.projectiles.push(bolt);

        for _ in 0..15 {
            tick(&mut state);
        }
        assert_eq!(state.score, 0);
        assert_eq!(state.projectiles.len(), 1);
        let bolt = &state.projectiles[0];
        assert!(bolt.owned_by_player);
        assert!(bolt.velocity.y > 0.0);
    }

    /// Enemy that holds still for the first tick and never fires
    fn parked_enemy(state: &mut GameState, kind: EnemyKind, position: Vec2) -> EntityId {
        let mut enemy = Enemy::spawn(
            kind,
            position,
            0.0,
            u32::MAX,
            &mut state.world,
            &mut state.shields,
            &mut state.armours,
        );
        enemy.in_grid_mode = false;
        let id = enemy.id;
        state.enemies.push(enemy);
        id
    }

    #[test]
    fn test_bounced_bolt_spares_ship_on_bounce_tick() {
        let mut state = quiet_state();
        let ship = state.world.position(state.player.id);
        // Guardian bar sits right over the nose of the ship
        parked_enemy(&mut state, EnemyKind::Guardian, ship + Vec2::new(0.0, 1.05));
        let bolt = Projectile::red_bolt(&mut state.world, ship, 0.0);
        state.projectiles.push(bolt);

        tick(&mut state);

        assert_eq!(state.projectiles.len(), 1);
        let bolt = &state.projectiles[0];
        assert!(!bolt.owned_by_player);
        assert!(!bolt.detonated);
        assert!(state.world.check_collision(bolt.id, state.player.id).hit);
        assert_eq!(state.score, 0);
        assert!(state.player.shield.is_none());
        assert_eq!(state.enemies.len(), 1);
    }

    #[test]
    fn test_bounced_shot_skips_armour_and_enemies() {
        let mut state = quiet_state();
        state
            .player
            .trigger_shield(&mut state.world, &mut state.shields);
        parked_enemy(&mut state, EnemyKind::Queen, Vec2::new(-0.125, -3.3));
        parked_enemy(&mut state, EnemyKind::Drone, Vec2::new(0.9, -3.95));
        // Lands on the rim of the bubble, inside the right plate and the drone
        let bolt = Projectile::green_bolt(&mut state.world, Vec2::new(0.5, -3.6), 180.0);
        state.projectiles.push(bolt);

        tick(&mut state);

        assert_eq!(state.projectiles.len(), 1);
        let bolt = &state.projectiles[0];
        assert!(bolt.owned_by_player);
        assert!(bolt.velocity.y > 0.0);
        assert!(!bolt.detonated);
        assert!(state.armours.iter().all(|a| a.hp == 2));
        assert!(
            state
                .armours
                .iter()
                .any(|a| state.world.check_collision(bolt.id, a.id).hit)
        );
        assert_eq!(state.enemies.len(), 2);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_straggler_in_exit_phase_costs_perfection_bonus() {
        let mut state = GameState::new(12345, Tuning::default(), vec![empty_level()]);
        state.last_move = state.world.position(state.player.id);
        let drone_points = (20.0 * state.difficulty_multiplier) as i64;
        let mut drone = Enemy::spawn(
            EnemyKind::Drone,
            Vec2::ZERO,
            0.0,
            u32::MAX,
            &mut state.world,
            &mut state.shields,
            &mut state.armours,
        );
        drone.exiting = true;
        state.enemies.push(drone);

        for _ in 0..100 {
            tick(&mut state);
            if state.game_over {
                break;
            }
        }
        assert!(state.game_over);
        assert!(state.level.as_ref().unwrap().enemy_escaped);
        // Kill points for the drone, no bonus
        assert_eq!(state.score, drone_points);
    }

    #[test]
    fn test_exit_flight_scores_and_keeps_bonus() {
        let mut idle = empty_level();
        idle.exit.delay = 1_000_000;
        let mut state = GameState::new(12345, Tuning::default(), vec![empty_level(), idle]);
        state.last_move = state.world.position(state.player.id);
        let drone_points = (20.0 * state.difficulty_multiplier) as i64;
        let drone = Enemy::spawn(
            EnemyKind::Drone,
            Vec2::new(0.0, GRID_CENTRE_Y),
            0.0,
            u32::MAX,
            &mut state.world,
            &mut state.shields,
            &mut state.armours,
        );
        state.enemies.push(drone);

        let mut flew = false;
        for _ in 0..5000 {
            tick(&mut state);
            flew |= state.enemies.iter().any(|e| e.exiting && !e.in_grid_mode);
            if state.level_index == 1 {
                break;
            }
        }
        assert!(flew);
        assert_eq!(state.level_index, 1);
        assert!(state.enemies.is_empty());
        assert_eq!(state.score, drone_points + state.tuning.perfection_bonus);
    }

    #[test]
    fn test_touch_steers_ship() {
        let mut state = quiet_state();
        state
            .push_input(InputEvent::press(Vec2::new(3.0, 4.0)))
            .unwrap();
        tick(&mut state);
        assert_eq!(state.last_move, Vec2::new(3.0, 5.0));
        for _ in 0..200 {
            tick(&mut state);
        }
        assert_eq!(state.world.position(state.player.id), Vec2::new(3.0, 5.0));
    }

    #[test]
    fn test_auto_fire_toggle() {
        let mut state = quiet_state();
        let button = Vec2::new(0.0, -1.0);
        state.push_input(InputEvent::press(button)).unwrap();
        state.push_input(InputEvent::release(button)).unwrap();
        tick(&mut state);
        assert_eq!(state.projectiles.len(), 1);
        assert_eq!(state.projectiles[0].kind, ProjectileKind::RedBolt);

        // One bolt per cooldown
        for _ in 0..30 {
            tick(&mut state);
        }
        assert_eq!(state.projectiles.len(), 2);
        // The touch hit a button, so the ship kept its course
        assert_eq!(state.last_move, Vec2::new(0.0, -5.0));
    }

    #[test]
    fn test_bomb_fires_on_release() {
        let mut state = quiet_state();
        let button = Vec2::new(-4.0, -2.0);
        state.push_input(InputEvent::press(button)).unwrap();
        for _ in 0..45 {
            tick(&mut state);
        }
        assert!(state.projectiles.is_empty());

        state.push_input(InputEvent::release(button)).unwrap();
        tick(&mut state);
        assert_eq!(state.projectiles.len(), 1);
        assert_eq!(state.projectiles[0].kind, ProjectileKind::RedBomb);
        assert_eq!(state.player.bomb_charges, 2);
    }

    #[test]
    fn test_tick_pause() {
        let mut state = GameState::new(12345, Tuning::default(), vec![empty_level()]);
        let button = Vec2::new(0.0, -4.0);
        state.push_input(InputEvent::press(button)).unwrap();
        state.push_input(InputEvent::release(button)).unwrap();
        tick(&mut state);
        assert!(state.paused);

        let position = state.world.position(state.player.id);
        for _ in 0..10 {
            tick(&mut state);
        }
        assert_eq!(state.world.position(state.player.id), position);
        assert_eq!(state.time_ticks, 11);

        state.push_input(InputEvent::press(button)).unwrap();
        state.push_input(InputEvent::release(button)).unwrap();
        tick(&mut state);
        assert!(!state.paused);
        assert_ne!(state.world.position(state.player.id), position);
    }

    #[test]
    fn test_empty_campaign_ends_in_victory() {
        let mut state = GameState::new(12345, Tuning::default(), vec![empty_level()]);
        for _ in 0..100 {
            tick(&mut state);
            if state.game_over {
                break;
            }
        }
        assert!(state.game_over);
        assert_eq!(state.score, 1000);
        assert!(state.take_events().iter().any(
            |e| matches!(e, GameEvent::LevelText(text) if text.command == "victory")
        ));
    }

    #[test]
    fn test_campaign_spawns_enemies() {
        let campaign = LevelDescriptor::campaign().unwrap();
        let mut state = GameState::new(7, Tuning::default(), campaign);
        for _ in 0..120 {
            tick(&mut state);
        }
        assert!(!state.enemies.is_empty());
        assert_eq!(
            state.world.len(),
            1 + state.enemies.len() + state.projectiles.len() + state.shields.len() + state.armours.len()
        );
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let campaign = LevelDescriptor::campaign().unwrap();
        let mut state1 = GameState::new(99999, Tuning::default(), campaign.clone());
        let mut state2 = GameState::new(99999, Tuning::default(), campaign);

        let script = [
            (0, InputEvent::press(Vec2::new(0.0, -1.0))),
            (1, InputEvent::release(Vec2::new(0.0, -1.0))),
            (200, InputEvent::press(Vec2::new(-3.0, 2.0))),
            (400, InputEvent::press(Vec2::new(4.0, 3.0))),
            (600, InputEvent::release(Vec2::new(4.0, 3.0))),
        ];

        for t in 0..900 {
            for (at, event) in &script {
                if *at == t {
                    state1.push_input(*event).unwrap();
                    state2.push_input(*event).unwrap();
                }
            }
            tick(&mut state1);
            tick(&mut state2);
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(state1.score, state2.score);
        assert_eq!(state1.level_index, state2.level_index);
        assert_eq!(state1.sprites(), state2.sprites());
        assert_eq!(state1.take_events(), state2.take_events());
    }
}
