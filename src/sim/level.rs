//! Level scripting: timed commands, entry waves, flybys and the exit
//!
//! A level walks through its phases in order, one phase per update:
//! on-start commands, entry waves, mid-level flybys, the exit, on-end
//! commands, then complete. Queued items count their delay down once per
//! tick; anything whose delay has reached zero fires immediately, so several
//! items with zero delay fire in the same tick.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enemy::{Enemy, EnemyKind};
use super::events::LevelText;
use super::path::{GroupId, PathGroup};
use super::path_factory::{self, EntryDirection, ExitKind, FlybyKind};
use super::shield::{Armour, Shield};
use super::world::World;
use crate::consts::GRID_CENTRE_Y;
use crate::math::weighted_index;
use crate::{Tuning, angle_of, wrap_degrees};

/// Template picks per mid-level attempt tick
const FLYBY_ATTEMPTS: usize = 10;
/// Catchment placements tried per template pick
const FLYBY_PLACEMENTS: usize = 5;
/// Fewest enemies that make a flyby
const FLYBY_MIN_GROUP: usize = 2;

/// Level loading failures
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("malformed level descriptor: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid level descriptor: {reason}")]
    Invalid { reason: String },
}

/// A timed text command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCommand {
    #[serde(default)]
    pub delay: u32,
    pub command: String,
    #[serde(default)]
    pub parameter: Option<String>,
}

/// One ship in an entry wave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySpawn {
    pub kind: EnemyKind,
    /// Extra distance before the first node so stacked ships queue
    #[serde(default)]
    pub stack_depth: f32,
    /// Lateral offset applied to the entrance curves
    #[serde(default)]
    pub offset: f32,
    pub grid_x: f32,
    pub grid_y: f32,
}

/// Ships entering together from one side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveDescriptor {
    pub direction: EntryDirection,
    #[serde(default)]
    pub delay: u32,
    pub spawns: Vec<EnemySpawn>,
}

/// A weighted flyby template with its catchment size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlybyOption {
    pub kind: FlybyKind,
    pub weight: f32,
    pub x_range: f32,
    pub y_range: f32,
}

/// Mid-level flyby schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MidPhase {
    /// Flyby attempts to make
    pub count: u32,
    /// Ticks between attempts
    pub delay: u32,
    pub options: Vec<FlybyOption>,
}

/// Exit schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitPhase {
    #[serde(default)]
    pub kind: ExitKind,
    /// Ticks before the first group leaves
    pub delay: u32,
    /// Ticks between groups
    pub step: u32,
    pub group_size: usize,
}

impl Default for ExitPhase {
    fn default() -> Self {
        Self {
            kind: ExitKind::Drift,
            delay: 0,
            step: 60,
            group_size: 1,
        }
    }
}

/// Parsed level document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    #[serde(default)]
    pub name: String,
    pub difficulty_rating: u32,
    #[serde(default)]
    pub on_start: Vec<LevelCommand>,
    #[serde(default)]
    pub waves: Vec<WaveDescriptor>,
    #[serde(default)]
    pub mid: MidPhase,
    #[serde(default)]
    pub exit: ExitPhase,
    #[serde(default)]
    pub on_end: Vec<LevelCommand>,
}

impl LevelDescriptor {
    /// Parse and validate a JSON level
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let descriptor: Self = serde_json::from_str(json)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn validate(&self) -> Result<(), LevelError> {
        let invalid = |reason: &str| {
            Err(LevelError::Invalid {
                reason: format!("{}: {reason}", self.name),
            })
        };
        if self.difficulty_rating == 0 {
            return invalid("difficulty rating starts at 1");
        }
        if self.mid.options.iter().any(|o| !(o.weight >= 0.0)) {
            return invalid("flyby weights must be non-negative");
        }
        if self.mid.count > 0 && self.mid.options.iter().map(|o| o.weight).sum::<f32>() <= 0.0 {
            return invalid("flybys are scheduled but no template has weight");
        }
        if self
            .mid
            .options
            .iter()
            .any(|o| !(0.0..=7.0).contains(&o.x_range) || o.y_range < 0.0)
        {
            return invalid("flyby catchment out of range");
        }
        if self.exit.group_size == 0 {
            return invalid("exit group size must be positive");
        }
        Ok(())
    }

    /// Difficulty score multiplier: 1.0 at rating 1, +0.1 per rating above
    pub fn difficulty_multiplier(&self) -> f32 {
        1.0 + 0.1 * (self.difficulty_rating as f32 - 1.0)
    }

    /// The built-in campaign
    pub fn campaign() -> Result<Vec<Self>, LevelError> {
        [
            include_str!("../../levels/level_01.json"),
            include_str!("../../levels/level_02.json"),
            include_str!("../../levels/level_03.json"),
        ]
        .into_iter()
        .map(Self::from_json)
        .collect()
    }
}

/// Level progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelPhase {
    OnStart,
    SpawningWaves,
    Mid,
    Exiting,
    OnEnd,
    Complete,
}

/// Everything a level touches while it runs
pub struct LevelContext<'a> {
    pub world: &'a mut World,
    pub enemies: &'a mut Vec<Enemy>,
    pub shields: &'a mut Vec<Shield>,
    pub armours: &'a mut Vec<Armour>,
    pub rng: &'a mut Pcg32,
    pub tuning: &'a Tuning,
    /// Lowest formation row in use
    pub grid_y_min: f32,
    pub score: i64,
    pub texts: &'a mut Vec<LevelText>,
}

/// A running level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    pub difficulty_rating: u32,
    phase: LevelPhase,
    on_start: VecDeque<LevelCommand>,
    waves: VecDeque<WaveDescriptor>,
    mid: MidPhase,
    mid_current_delay: u32,
    exit: ExitPhase,
    exit_current_delay: u32,
    on_end: VecDeque<LevelCommand>,
    pub groups: Vec<PathGroup>,
    next_group_id: GroupId,
    /// Set when any enemy got away; denies the perfection bonus
    pub enemy_escaped: bool,
}

impl Level {
    pub fn new(descriptor: &LevelDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            difficulty_rating: descriptor.difficulty_rating,
            phase: LevelPhase::OnStart,
            on_start: descriptor.on_start.iter().cloned().collect(),
            waves: descriptor.waves.iter().cloned().collect(),
            mid: descriptor.mid.clone(),
            mid_current_delay: descriptor.mid.delay,
            exit: descriptor.exit.clone(),
            exit_current_delay: descriptor.exit.delay,
            on_end: descriptor.on_end.iter().cloned().collect(),
            groups: Vec::new(),
            next_group_id: 1,
            enemy_escaped: false,
        }
    }

    pub fn phase(&self) -> LevelPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == LevelPhase::Complete
    }

    pub fn update(&mut self, ctx: &mut LevelContext) {
        let finished = match self.phase {
            LevelPhase::OnStart => run_commands(&mut self.on_start, ctx),
            LevelPhase::SpawningWaves => self.update_waves(ctx),
            LevelPhase::Mid => self.update_mid(ctx),
            LevelPhase::Exiting => self.update_exit(ctx),
            LevelPhase::OnEnd => run_commands(&mut self.on_end, ctx),
            LevelPhase::Complete => false,
        };
        if finished {
            self.phase = match self.phase {
                LevelPhase::OnStart => LevelPhase::SpawningWaves,
                LevelPhase::SpawningWaves => LevelPhase::Mid,
                LevelPhase::Mid => LevelPhase::Exiting,
                LevelPhase::Exiting => LevelPhase::OnEnd,
                LevelPhase::OnEnd | LevelPhase::Complete => LevelPhase::Complete,
            };
            log::debug!("{}: entering {:?}", self.name, self.phase);
        }

        for group in &mut self.groups {
            group.update(ctx.enemies, ctx.world);
        }
        self.groups.retain(|g| !g.to_be_destroyed);
    }

    fn next_group(&mut self) -> PathGroup {
        let group = PathGroup::new(self.next_group_id);
        self.next_group_id += 1;
        group
    }

    fn update_waves(&mut self, ctx: &mut LevelContext) -> bool {
        while let Some(wave) = self.waves.front_mut() {
            if wave.delay > 0 {
                wave.delay -= 1;
                return false;
            }
            if let Some(wave) = self.waves.pop_front() {
                self.spawn_wave(&wave, ctx);
            }
        }
        true
    }

    /// Spawn every ship of a wave on its entrance path, as one group
    pub fn spawn_wave(&mut self, wave: &WaveDescriptor, ctx: &mut LevelContext) {
        if wave.spawns.is_empty() {
            log::warn!("{}: skipping wave with no ships", self.name);
            return;
        }
        let mut group = self.next_group();
        for spawn in &wave.spawns {
            let path = path_factory::entrance(wave.direction, spawn.stack_depth, spawn.offset);
            let (Some(first), Some(second)) = (path.nodes.first(), path.nodes.get(1)) else {
                continue;
            };
            let start = first.position;
            let rotation = wrap_degrees(angle_of(second.position - start) + 90.0);

            let cooldown = Enemy::initial_cooldown(ctx.rng, ctx.tuning);
            let mut enemy = Enemy::spawn(
                spawn.kind,
                start,
                rotation,
                cooldown,
                ctx.world,
                ctx.shields,
                ctx.armours,
            );
            enemy.unmodified_grid_pos = Vec2::new(spawn.grid_x, spawn.grid_y);
            enemy.grid_pos = enemy.unmodified_grid_pos + Vec2::new(0.0, GRID_CENTRE_Y);
            enemy.assign_path(path);
            if let Err(e) = group.add(&mut enemy) {
                // Fly straight to the formation instead of waiting on a group that never releases
                log::warn!("{}: {e}", self.name);
                enemy.path = None;
                enemy.in_grid_mode = true;
            }
            ctx.enemies.push(enemy);
        }
        log::debug!(
            "{}: wave of {} from {:?}",
            self.name,
            group.len(),
            wave.direction
        );
        group.balance(ctx.enemies);
        self.groups.push(group);
    }

    fn update_mid(&mut self, ctx: &mut LevelContext) -> bool {
        if self.mid_current_delay > 0 {
            self.mid_current_delay -= 1;
        } else if self.mid.count > 0 {
            let total: f32 = self.mid.options.iter().map(|o| o.weight).sum();
            let mut spawned = false;
            for _ in 0..FLYBY_ATTEMPTS {
                if total <= 0.0 {
                    break;
                }
                let roll = ctx.rng.random::<f32>() * total;
                let Some(option) = weighted_index(self.mid.options.iter().map(|o| o.weight), roll)
                    .and_then(|i| self.mid.options.get(i))
                    .cloned()
                else {
                    break;
                };
                spawned = (0..FLYBY_PLACEMENTS).any(|_| self.try_spawn_flyby(&option, ctx));
                if spawned {
                    break;
                }
            }
            if !spawned {
                log::debug!("{}: no flyby this round", self.name);
            }
            self.mid.count -= 1;
            self.mid_current_delay = self.mid.delay;
        }
        self.mid.count == 0 && self.mid_current_delay == 0
    }

    /// Send the grid enemies inside a random catchment on a flyby together
    pub fn try_spawn_flyby(&mut self, option: &FlybyOption, ctx: &mut LevelContext) -> bool {
        let on_left = ctx.rng.random_bool(0.5);
        let x_span = 7.0 - option.x_range;
        let y_span = ctx.grid_y_min + option.y_range;

        let mut x_centre =
            (2.0 * (ctx.rng.random::<f32>() * x_span + 3.5 - 0.5 * x_span)).round() * 0.5;
        if on_left {
            x_centre = -x_centre;
        }
        let y_centre = (2.0
            * (ctx.rng.random::<f32>() * y_span + 0.5 * ctx.grid_y_min - 0.5 * y_span))
            .round()
            * 0.5;

        let left = x_centre - 0.5 * option.x_range;
        let right = x_centre + 0.5 * option.x_range;
        let bottom = y_centre - 0.5 * option.y_range + GRID_CENTRE_Y;
        let top = y_centre + 0.5 * option.y_range + GRID_CENTRE_Y;

        let in_range: Vec<usize> = ctx
            .enemies
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.in_grid_mode
                    && !ctx.world.is_to_be_destroyed(e.id)
                    && (left..=right).contains(&e.grid_pos.x)
                    && (bottom..=top).contains(&e.grid_pos.y)
            })
            .map(|(i, _)| i)
            .collect();
        if in_range.len() < FLYBY_MIN_GROUP {
            return false;
        }

        let mut group = self.next_group();
        for index in in_range {
            let enemy = &mut ctx.enemies[index];
            let offset = enemy.grid_pos.y - (y_centre + GRID_CENTRE_Y);
            enemy.assign_path(path_factory::flyby(option.kind, enemy.grid_pos, offset));
            if let Err(e) = group.add(enemy) {
                log::warn!("{}: {e}", self.name);
                enemy.path = None;
                enemy.in_grid_mode = true;
            }
        }
        log::debug!("{}: {:?} flyby with {} ships", self.name, option.kind, group.len());
        group.balance(ctx.enemies);
        self.groups.push(group);
        true
    }

    fn update_exit(&mut self, ctx: &mut LevelContext) -> bool {
        if self.exit_current_delay > 0 {
            self.exit_current_delay -= 1;
            return false;
        }
        if ctx.enemies.is_empty() {
            return true;
        }

        let mut candidates = Vec::new();
        for (index, enemy) in ctx.enemies.iter_mut().enumerate() {
            if !enemy.in_grid_mode || ctx.world.is_to_be_destroyed(enemy.id) {
                continue;
            }
            if enemy.exiting {
                ctx.world.delete(enemy.id);
                self.enemy_escaped = true;
            } else {
                candidates.push(index);
            }
        }

        if !candidates.is_empty() {
            let count = self.exit.group_size.min(candidates.len());
            for _ in 0..count {
                let pick = ctx.rng.random_range(0..candidates.len());
                let enemy = &mut ctx.enemies[candidates.swap_remove(pick)];
                enemy.assign_path(path_factory::exit(self.exit.kind, enemy.grid_pos));
                enemy.exiting = true;
                enemy.may_follow_path = true;
            }
            self.exit_current_delay = self.exit.step;
        }
        false
    }
}

/// Fire due commands from the front of a queue; true once the queue is empty
fn run_commands(queue: &mut VecDeque<LevelCommand>, ctx: &mut LevelContext) -> bool {
    while let Some(command) = queue.front_mut() {
        if command.delay > 0 {
            command.delay -= 1;
            return false;
        }
        if let Some(command) = queue.pop_front() {
            ctx.texts.push(parse_command(command, ctx.score));
        }
    }
    true
}

/// Commands that report the score get it as their parameter
fn parse_command(command: LevelCommand, score: i64) -> LevelText {
    let parameter = if command.command.eq_ignore_ascii_case("scorecard")
        || command.command.eq_ignore_ascii_case("victory")
    {
        Some(score.to_string())
    } else {
        command.parameter
    };
    LevelText::new(command.command, parameter)
}
