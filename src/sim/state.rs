//! Game state and end-of-tick bookkeeping
//!
//! Everything the simulation mutates lives here. Entities are stored twice:
//! their bodies in the `World` arena and their behaviour in typed
//! collections holding the body's id. Deletions are only marked during a
//! tick; `settle` and `sweep` resolve them once the tick is over.

use std::collections::VecDeque;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::background::BackgroundManager;
use super::button::ControlPanel;
use super::enemy::Enemy;
use super::events::{GameEvent, InputError, InputEvent, InputQueue, InputSender, LevelText};
use super::formation::Formation;
use super::level::{Level, LevelDescriptor};
use super::player::PlayerShip;
use super::projectile::{Explosion, Projectile, ProjectileKind};
use super::shield::{Armour, Shield, ShieldKind};
use super::world::{EntityId, World};
use crate::{Settings, Tuning};

/// Where the ship heads before the first touch
pub const INITIAL_DESTINATION: Vec2 = Vec2::new(0.0, 3.0);
/// Lowest point the ship may be steered to, clear of the buttons
pub const MIN_DESTINATION_Y: f32 = 1.0;
/// Touch offset so the finger does not cover the ship
pub const TOUCH_OFFSET: Vec2 = Vec2::new(0.0, 1.0);
/// Presentation events kept for a consumer that is not draining them
const MAX_QUEUED_EVENTS: usize = 1024;

/// Render snapshot of one live body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub id: EntityId,
    pub name: &'static str,
    pub position: Vec2,
    pub rotation: f32,
    /// 0 to 1
    pub alpha: f32,
}

/// Complete game state (deterministic for a given seed and input stream)
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub world: World,
    pub player: PlayerShip,
    pub enemies: Vec<Enemy>,
    pub projectiles: Vec<Projectile>,
    pub shields: Vec<Shield>,
    pub armours: Vec<Armour>,
    /// Live for exactly one tick
    pub explosions: Vec<Explosion>,
    pub buttons: ControlPanel,
    pub background: BackgroundManager,
    pub formation: Formation,
    pub campaign: Vec<LevelDescriptor>,
    pub level: Option<Level>,
    pub level_index: usize,
    pub score: i64,
    /// Points towards the next charge refill
    pub refill: i64,
    pub difficulty_multiplier: f32,
    pub paused: bool,
    pub game_over: bool,
    /// Where the ship is steering
    pub last_move: Vec2,
    /// Simulation tick counter
    pub time_ticks: u64,
    input: InputQueue,
    /// Raised this tick, not yet shown
    pub(crate) pending: Vec<GameEvent>,
    /// Shown, waiting for an external consumer
    events: VecDeque<GameEvent>,
}

impl GameState {
    /// Create a game with the given seed and start the first level
    pub fn new(seed: u64, tuning: Tuning, campaign: Vec<LevelDescriptor>) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut world = World::new();
        let player = PlayerShip::spawn(&mut world, &tuning);
        let background = BackgroundManager::new(&mut rng);

        let mut state = Self {
            seed,
            rng,
            tuning,
            world,
            player,
            enemies: Vec::new(),
            projectiles: Vec::new(),
            shields: Vec::new(),
            armours: Vec::new(),
            explosions: Vec::new(),
            buttons: ControlPanel::default(),
            background,
            formation: Formation::default(),
            campaign,
            level: None,
            level_index: 0,
            score: 0,
            refill: 0,
            difficulty_multiplier: 1.0,
            paused: false,
            game_over: false,
            last_move: INITIAL_DESTINATION,
            time_ticks: 0,
            input: InputQueue::default(),
            pending: Vec::new(),
            events: VecDeque::new(),
        };
        state.load_level(0);
        state
    }

    /// Create a game from run settings, picking a random seed if none is fixed
    pub fn from_settings(settings: &Settings, campaign: Vec<LevelDescriptor>) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        log::info!(
            "Starting game with seed {seed} on {} difficulty",
            settings.difficulty.as_str()
        );
        Self::new(seed, settings.effective_tuning(), campaign)
    }

    /// Handle for feeding input from another thread
    pub fn input_sender(&self) -> InputSender {
        self.input.sender()
    }

    pub fn push_input(&self, event: InputEvent) -> Result<(), InputError> {
        self.input.sender().try_send(event)
    }

    pub(crate) fn drain_input(&self) -> Vec<InputEvent> {
        self.input.drain()
    }

    /// Presentation events raised since the last call, oldest first
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.pending.push(event);
    }

    fn emit_text(&mut self, command: &str, parameter: Option<String>) {
        self.emit(GameEvent::LevelText(LevelText::new(command, parameter)));
    }

    /// Change the score, refilling charges every `refill_threshold` points
    pub fn add_score(&mut self, amount: i64) {
        self.score += amount;
        self.refill += amount;
        if amount > 0 {
            self.emit_text("add_score", Some(amount.to_string()));
        } else if amount < 0 {
            self.emit_text("subtract_score", Some(amount.abs().to_string()));
        }

        self.refill = self.refill.max(0);
        let threshold = self.tuning.refill_threshold.max(1);
        if self.refill > threshold {
            self.player.add_charges(1);
            self.refill %= threshold;
            self.emit_text("add_charges", None);
        }
    }

    /// The ship was hit: lose points and get a free shield
    pub fn take_damage(&mut self) {
        self.add_score(-self.tuning.hit_penalty);
        self.player.raise_shield(&mut self.world, &mut self.shields);
    }

    /// Clear the field and start level `index`; past the last level the game is won
    pub fn load_level(&mut self, index: usize) {
        if self.game_over {
            return;
        }
        let escaped = self.level.as_ref().is_some_and(|l| l.enemy_escaped);

        for enemy in &self.enemies {
            self.world.delete(enemy.id);
        }
        for projectile in &mut self.projectiles {
            projectile.detonated = true;
            self.world.delete(projectile.id);
        }
        self.resolve_deaths();

        if index != 0 && !escaped {
            self.add_score(self.tuning.perfection_bonus);
        }

        match self.campaign.get(index) {
            Some(descriptor) => {
                self.difficulty_multiplier = descriptor.difficulty_multiplier();
                self.level = Some(Level::new(descriptor));
                self.level_index = index;
                log::info!(
                    "Loaded level {} ({}) at difficulty x{:.1}",
                    index + 1,
                    descriptor.name,
                    self.difficulty_multiplier
                );
            }
            None => {
                self.buttons.shield.set_active(false);
                self.buttons.bomb.set_active(false);
                self.game_over = true;
                self.emit_text("victory", Some(self.score.to_string()));
                log::info!("Campaign complete with score {}", self.score);
            }
        }
    }

    /// Apply the consequences of everything deleted so far this tick
    pub(crate) fn resolve_deaths(&mut self) {
        for id in self.world.take_obituaries() {
            let position = self.world.position(id);
            let rotation = self.world.rotation(id);

            if let Some(enemy) = self.enemies.iter().find(|e| e.id == id) {
                let kind = enemy.kind;
                let points = (kind.score(&self.tuning) as f32 * self.difficulty_multiplier) as i64;
                self.add_score(points);
                self.emit(GameEvent::EnemyGibs {
                    kind,
                    position,
                    rotation,
                });
            } else if let Some(armour) = self.armours.iter().find(|a| a.id == id) {
                let side = armour.side;
                self.emit(GameEvent::ArmourGibs {
                    side,
                    position,
                    rotation,
                });
            } else if self.player.shield == Some(id) {
                self.player.shield = None;
            }
        }
    }

    /// Resolve deaths and hand this tick's events to the background and the outbox
    pub fn settle(&mut self) {
        self.resolve_deaths();
        for event in std::mem::take(&mut self.pending) {
            match &event {
                GameEvent::Effect { effect, position } => {
                    self.background.add_effect(*effect, *position, &mut self.rng);
                }
                GameEvent::EnemyGibs {
                    kind,
                    position,
                    rotation,
                } => {
                    self.background
                        .add_enemy_gibs(*kind, *position, *rotation, &mut self.rng);
                }
                GameEvent::ArmourGibs {
                    side,
                    position,
                    rotation,
                } => {
                    self.background
                        .add_armour_gibs(*side, *position, *rotation, &mut self.rng);
                }
                GameEvent::LevelText(text) => {
                    self.background.add_level_effect(text, &mut self.rng);
                }
            }
            if self.events.len() == MAX_QUEUED_EVENTS {
                self.events.pop_front();
            }
            self.events.push_back(event);
        }
    }

    /// Drop everything marked for deletion: welds first, then collections, then bodies
    pub fn sweep(&mut self) {
        self.world.sweep_welds();
        let world = &self.world;
        self.enemies.retain(|e| !world.is_to_be_destroyed(e.id));
        self.shields.retain(|s| !world.is_to_be_destroyed(s.id));
        self.armours.retain(|a| !world.is_to_be_destroyed(a.id));
        self.projectiles.retain(|p| !world.is_to_be_destroyed(p.id));
        self.world.sweep_bodies();
        self.explosions.clear();
    }

    /// Steer the ship toward a touch that missed every button
    pub fn set_destination(&mut self, point: Vec2) {
        let mut destination = point + TOUCH_OFFSET;
        destination.y = destination.y.max(MIN_DESTINATION_Y);
        self.last_move = destination;
    }

    /// Live bodies for rendering, back to front
    pub fn sprites(&self) -> Vec<Sprite> {
        let mut sprites = Vec::with_capacity(
            self.armours.len() + self.enemies.len() + self.shields.len() + self.projectiles.len() + 1,
        );
        let mut push = |id: EntityId, name: &'static str, alpha: f32| {
            if let Some(body) = self.world.get(id).filter(|b| !b.is_to_be_destroyed()) {
                sprites.push(Sprite {
                    id,
                    name,
                    position: body.position(),
                    rotation: body.rotation(),
                    alpha,
                });
            }
        };

        for armour in &self.armours {
            push(armour.id, armour.side.sprite(), 1.0);
        }
        for enemy in &self.enemies {
            push(enemy.id, enemy.kind.sprite(), 1.0);
        }
        for shield in &self.shields {
            match shield.kind {
                ShieldKind::Player => {
                    // Flickers out over its last few ticks
                    let alpha = shield.lifespan.map_or(1.0, |t| (t as f32 / 20.0).min(1.0));
                    push(shield.id, "player_shield", alpha);
                }
                ShieldKind::Guardian => push(shield.id, "guardian_shield", 1.0),
            }
        }
        for projectile in &self.projectiles {
            let name = match projectile.kind {
                ProjectileKind::RedBolt => "red_bolt",
                ProjectileKind::GreenBolt => "green_bolt",
                ProjectileKind::RedBomb => "red_bomb",
                ProjectileKind::YellowBomb => "yellow_bomb",
            };
            push(projectile.id, name, 1.0);
        }
        push(self.player.id, "player", 1.0);
        sprites
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::enemy::EnemyKind;
    use crate::sim::level::{ExitPhase, MidPhase};

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

    fn spawn_enemy(state: &mut GameState, kind: EnemyKind, position: Vec2) -> EntityId {
        let enemy = Enemy::spawn(
            kind,
            position,
            0.0,
            1000,
            &mut state.world,
            &mut state.shields,
            &mut state.armours,
        );
        let id = enemy.id;
        state.enemies.push(enemy);
        id
    }

    #[test]
    fn test_refill_grants_charges() {
        let mut state = GameState::new(1, Tuning::default(), vec![empty_level()]);
        state.player.bomb_charges = 0;
        state.add_score(450);
        assert_eq!(state.player.bomb_charges, 0);
        state.add_score(100);
        assert_eq!(state.player.bomb_charges, 1);
        assert_eq!(state.refill, 50);
        assert_eq!(state.score, 550);

        // Penalties never push the refill counter below zero
        state.add_score(-500);
        assert_eq!(state.refill, 0);
        assert_eq!(state.score, 50);
    }

    #[test]
    fn test_take_damage_costs_points_and_shields() {
        let mut state = GameState::new(1, Tuning::default(), vec![empty_level()]);
        state.take_damage();
        assert_eq!(state.score, -500);
        assert!(state.player.shield.is_some());
        assert_eq!(state.shields.len(), 1);
    }

    #[test]
    fn test_killed_enemy_scores_with_multiplier() {
        let mut level = empty_level();
        level.difficulty_rating = 3;
        let mut state = GameState::new(1, Tuning::default(), vec![level]);
        assert!((state.difficulty_multiplier - 1.2).abs() < 1e-6);

        let id = spawn_enemy(&mut state, EnemyKind::Warrior, Vec2::ZERO);
        state.world.delete(id);
        state.settle();
        assert_eq!(state.score, 60);
        assert!(
            state
                .take_events()
                .iter()
                .any(|e| matches!(e, GameEvent::EnemyGibs { kind: EnemyKind::Warrior, .. }))
        );
    }

    #[test]
    fn test_exiting_enemy_still_scores() {
        let mut state = GameState::new(1, Tuning::default(), vec![empty_level()]);
        let id = spawn_enemy(&mut state, EnemyKind::Drone, Vec2::ZERO);
        state.enemies[0].exiting = true;
        state.world.delete(id);
        state.settle();
        assert_eq!(state.score, (20.0 * state.difficulty_multiplier) as i64);
        assert!(!state.level.as_ref().unwrap().enemy_escaped);
        assert!(
            state
                .take_events()
                .iter()
                .any(|e| matches!(e, GameEvent::EnemyGibs { kind: EnemyKind::Drone, .. }))
        );
    }

    #[test]
    fn test_level_load_clears_enemies_for_points() {
        let mut state = GameState::new(1, Tuning::default(), vec![empty_level(), empty_level()]);
        spawn_enemy(&mut state, EnemyKind::Drone, Vec2::ZERO);
        let drone = (20.0 * state.difficulty_multiplier) as i64;
        state.load_level(1);
        state.sweep();
        assert_eq!(state.score, drone + state.tuning.perfection_bonus);
        assert!(state.enemies.is_empty());
        assert_eq!(state.level_index, 1);
    }

    #[test]
    fn test_shield_death_frees_player_slot() {
        let mut state = GameState::new(1, Tuning::default(), vec![empty_level()]);
        state.player.trigger_shield(&mut state.world, &mut state.shields);
        let shield = state.player.shield.unwrap();
        state.world.delete(shield);
        state.settle();
        state.sweep();
        assert!(state.player.shield.is_none());
        assert!(state.shields.is_empty());
        assert!(!state.world.contains(shield));
    }

    #[test]
    fn test_finishing_campaign_is_victory() {
        let mut state = GameState::new(1, Tuning::default(), vec![empty_level()]);
        state.load_level(1);
        assert!(state.game_over);
        assert_eq!(state.score, 1000);
        assert!(!state.buttons.bomb.active && !state.buttons.shield.active);
        state.settle();
        let events = state.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::LevelText(t) if t.command == "victory" && t.parameter.as_deref() == Some("1000")
        )));
    }

    #[test]
    fn test_sweep_removes_queen_with_armour() {
        let mut state = GameState::new(1, Tuning::default(), vec![empty_level()]);
        let queen = spawn_enemy(&mut state, EnemyKind::Queen, Vec2::ZERO);
        let bodies = state.world.len();
        state.world.delete(queen);
        state.settle();
        state.sweep();
        assert!(state.enemies.is_empty());
        assert!(state.armours.is_empty());
        assert_eq!(state.world.len(), bodies - 3);
    }

    #[test]
    fn test_destination_clamped_above_buttons() {
        let mut state = GameState::new(1, Tuning::default(), vec![empty_level()]);
        state.set_destination(Vec2::new(2.0, -3.0));
        assert_eq!(state.last_move, Vec2::new(2.0, 1.0));
        state.set_destination(Vec2::new(-1.0, 5.0));
        assert_eq!(state.last_move, Vec2::new(-1.0, 6.0));
    }

    #[test]
    fn test_sprites_skip_dead_bodies() {
        let mut state = GameState::new(1, Tuning::default(), vec![empty_level()]);
        spawn_enemy(&mut state, EnemyKind::Guardian, Vec2::new(1.0, 2.0));
        assert_eq!(state.sprites().len(), 3);
        // The guardian's shield goes down with it
        let id = state.enemies[0].id;
        state.world.delete(id);
        let names: Vec<&str> = state.sprites().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["player"]);
    }
}
