//! Background dressing and foreground effects
//!
//! None of this affects gameplay. Four parallax layers are filled by
//! constellation factories that scatter weighted sprite options around a
//! drifting centre; a foreground layer carries detonation blasts. Debris from
//! destroyed ships and level text objects ride on the background layers.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::enemy::EnemyKind;
use super::events::{EffectKind, LevelText};
use super::shield::ArmourSide;
use crate::consts::VIEW_TOP;
use crate::math::{Vector2, eased_unit, lerp, point_in_circle, weighted_index};
use crate::rotate_degrees;

/// Objects below this height are culled
const CULL_Y: f32 = -21.0;
/// Fully opaque alpha
const OPAQUE: i32 = 255;
/// How far above the top edge constellations start
const SPAWN_ABOVE_TOP: f32 = 15.0;
/// Drift of effect blasts
const BLAST_Y_VELOCITY: f32 = -0.05;
/// Drift of most level text
const TEXT_Y_VELOCITY: f32 = -0.06;
/// Drift of score popups
const SCORE_TEXT_Y_VELOCITY: f32 = -0.025;

/// Draw layers, back to front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Intergalactic,
    Interstellar,
    Planetary,
    Debris,
    Foreground,
}

impl LayerKind {
    const BACKGROUND: [LayerKind; 4] = [
        LayerKind::Intergalactic,
        LayerKind::Interstellar,
        LayerKind::Planetary,
        LayerKind::Debris,
    ];

    /// Ticks between constellations: (shortest, longest, most common)
    fn spawn_interval(&self) -> (f32, f32, f32) {
        match self {
            LayerKind::Intergalactic => (200.0, 1200.0, 800.0),
            LayerKind::Interstellar => (75.0, 200.0, 125.0),
            LayerKind::Planetary => (200.0, 800.0, 500.0),
            LayerKind::Debris => (50.0, 400.0, 150.0),
            LayerKind::Foreground => (0.0, 0.0, 0.0),
        }
    }

    fn template(&self, rng: &mut Pcg32) -> Option<ConstellationTemplate> {
        match self {
            LayerKind::Intergalactic => Some(ConstellationTemplate::intergalactic(rng)),
            LayerKind::Interstellar => Some(ConstellationTemplate::interstellar(rng)),
            LayerKind::Planetary => Some(ConstellationTemplate::planetary(rng)),
            LayerKind::Debris => Some(ConstellationTemplate::debris(rng)),
            LayerKind::Foreground => None,
        }
    }
}

/// What a background object looks like
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    /// A sprite sheet entry; `variant` picks among interchangeable frames
    Sprite { name: &'static str, variant: u8 },
    /// A line of text
    Text(String),
}

/// A purely visual object
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundObject {
    pub visual: Visual,
    pub size: Vec2,
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    /// Degrees per tick
    pub rotation_velocity: f32,
    /// 0 to 255
    pub alpha: i32,
    /// Alpha lost per tick; 0 never fades
    pub fade: i32,
    pub to_be_destroyed: bool,
}

impl BackgroundObject {
    pub fn new(visual: Visual, size: Vec2, position: Vec2, rotation: f32, y_velocity: f32) -> Self {
        Self {
            visual,
            size,
            position,
            velocity: Vec2::new(0.0, y_velocity),
            rotation,
            rotation_velocity: 0.0,
            alpha: OPAQUE,
            fade: 0,
            to_be_destroyed: false,
        }
    }

    fn sprite(name: &'static str, variant: u8, size: Vec2, position: Vec2) -> Self {
        Self::new(Visual::Sprite { name, variant }, size, position, 0.0, BLAST_Y_VELOCITY)
    }

    fn spinning(mut self, degrees_per_tick: f32) -> Self {
        self.rotation_velocity = degrees_per_tick;
        self
    }

    fn fading(mut self, per_tick: i32) -> Self {
        self.fade = per_tick;
        self
    }

    fn rotated(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn update(&mut self) {
        if self.fade > 0 {
            self.alpha -= self.fade;
            if self.alpha <= 0 {
                self.alpha = 0;
                self.to_be_destroyed = true;
            }
        }
        self.position += self.velocity;
        self.rotation = (self.rotation + self.rotation_velocity) % 360.0;
        if self.position.y < CULL_Y {
            self.to_be_destroyed = true;
        }
    }

    /// Alpha as a 0 to 1 fraction
    pub fn opacity(&self) -> f32 {
        self.alpha as f32 / OPAQUE as f32
    }
}

/// Piecewise-linear probability over some measure.
///
/// Below the first point the chance is 0, above the last it is 1, and in
/// between the neighbouring points are interpolated and rolled against.
/// Points must be sorted by `x` with distinct `x` values.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityCurve {
    points: Vec<(f32, f32)>,
}

impl ProbabilityCurve {
    pub fn new(points: &[(f32, f32)]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }

    /// Chance at `x`, without rolling
    pub fn chance(&self, x: f32) -> f32 {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return 0.0;
        };
        if x > last.0 {
            return 1.0;
        }
        if x < first.0 {
            return 0.0;
        }
        let end = self
            .points
            .iter()
            .skip(1)
            .position(|p| x <= p.0)
            .map_or(self.points.len() - 1, |i| i + 1);
        if end == 0 {
            return first.1;
        }
        let (x0, p0) = self.points[end - 1];
        let (x1, p1) = self.points[end];
        lerp(p0, p1, (x - x0) / (x1 - x0))
    }

    /// Roll against the chance at `x`. Beyond the ends no roll is made.
    pub fn passes(&self, x: f32, rng: &mut Pcg32) -> bool {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return false;
        };
        if x > last.0 {
            true
        } else if x < first.0 {
            false
        } else {
            rng.random::<f32>() < self.chance(x)
        }
    }
}

/// `base` give or take up to `variance`, uniformly
fn vary(rng: &mut Pcg32, base: f32, variance: f32) -> f32 {
    base + rng.random::<f32>() * 2.0 * variance - variance
}

/// One thing a constellation may spawn
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnOption {
    pub sprite: &'static str,
    pub variant: u8,
    pub size: Vec2,
    /// Size is scaled by 1 give or take this
    pub size_variance: f32,
    pub rotation_variance: f32,
    pub rotation_velocity: f32,
    pub rotation_velocity_variance: f32,
    pub weight: u32,
}

impl SpawnOption {
    fn new(sprite: &'static str, variant: u8, size: Vec2, weight: u32) -> Self {
        Self {
            sprite,
            variant,
            size,
            size_variance: 0.5,
            rotation_variance: 0.0,
            rotation_velocity: 0.0,
            rotation_velocity_variance: 0.0,
            weight,
        }
    }

    fn with_rotation(mut self, variance: f32) -> Self {
        self.rotation_variance = variance;
        self
    }

    fn with_spin(mut self, base: f32, variance: f32) -> Self {
        self.rotation_velocity = base;
        self.rotation_velocity_variance = variance;
        self
    }

    fn instance(&self, rng: &mut Pcg32, position: Vec2, y_velocity: f32) -> BackgroundObject {
        let scale = vary(rng, 1.0, self.size_variance);
        let rotation = vary(rng, 0.0, self.rotation_variance);
        let spin = vary(rng, self.rotation_velocity, self.rotation_velocity_variance);
        BackgroundObject::new(
            Visual::Sprite {
                name: self.sprite,
                variant: self.variant,
            },
            self.size * scale,
            position,
            rotation,
            y_velocity,
        )
        .spinning(spin)
    }
}

/// Parameters of one constellation
#[derive(Debug, Clone, PartialEq)]
pub struct ConstellationTemplate {
    pub options: Vec<SpawnOption>,
    pub y_velocity: f32,
    pub y_velocity_variance: f32,
    /// Width of the band entries are scattered over
    pub x_range: f32,
    /// Band centre movement per tick
    pub drift: f32,
    /// Chance of spawning over distance to the nearest earlier entry
    pub spawn_chance: ProbabilityCurve,
    /// Chance of finishing over number of entries
    pub end_chance: ProbabilityCurve,
}

impl ConstellationTemplate {
    /// Galaxies and wormholes; occasionally a dense supergalaxy
    pub fn intergalactic(rng: &mut Pcg32) -> Self {
        let mut options = vec![
            SpawnOption::new("galaxy", 0, Vec2::new(7.0, 4.2), 18).with_rotation(180.0),
            SpawnOption::new("wormhole", 0, Vec2::splat(4.0), 1)
                .with_rotation(180.0)
                .with_spin(0.4, 0.3),
            SpawnOption::new("wormhole", 0, Vec2::splat(8.0), 1)
                .with_rotation(180.0)
                .with_spin(0.4, 0.3),
        ];
        let drift = rng.random::<f32>() * 0.1 - 0.05;
        if rng.random_range(0..20) < 19 {
            Self {
                options,
                y_velocity: -0.02,
                y_velocity_variance: 0.0,
                x_range: 4.0,
                drift,
                spawn_chance: ProbabilityCurve::new(&[(6.0, 0.0), (10.0, 1.0)]),
                end_chance: ProbabilityCurve::new(&[(1.0, 0.9), (3.0, 1.0)]),
            }
        } else {
            options.push(SpawnOption::new("galaxy", 0, Vec2::new(3.5, 2.1), 30).with_rotation(180.0));
            Self {
                options,
                y_velocity: -0.02,
                y_velocity_variance: 0.0,
                x_range: 8.0,
                drift,
                spawn_chance: ProbabilityCurve::new(&[(3.0, 0.0), (5.0, 0.5), (8.0, 1.0)]),
                end_chance: ProbabilityCurve::new(&[(2.0, 0.0), (5.0, 0.5), (10.0, 1.0)]),
            }
        }
    }

    /// Star clusters of four sizes
    pub fn interstellar(rng: &mut Pcg32) -> Self {
        let options = vec![
            SpawnOption::new("star", 0, Vec2::splat(1.25), 1),
            SpawnOption::new("star", 1, Vec2::splat(1.0), 5),
            SpawnOption::new("star", 2, Vec2::splat(0.8), 5),
            SpawnOption::new("star", 3, Vec2::splat(0.6), 5),
        ];
        // One speed per cluster so its stars keep their shape
        let y_velocity = -0.025 + rng.random::<f32>() * 0.01 - 0.005;
        let (end, x_range): (&[(f32, f32)], f32) = match rng.random_range(0..8) {
            0..3 => (&[(3.0, 0.1), (5.0, 0.4), (8.0, 1.0)], 3.0),
            3..6 => (&[(5.0, 0.1), (9.0, 0.4), (12.0, 1.0)], 4.0),
            6 => (&[(10.0, 0.05), (15.0, 1.0)], 5.0),
            _ => (&[(15.0, 0.05), (20.0, 0.3), (25.0, 1.0)], 6.0),
        };
        Self {
            options,
            y_velocity,
            y_velocity_variance: 0.0,
            x_range,
            drift: rng.random::<f32>() * 0.1 - 0.05,
            spawn_chance: ProbabilityCurve::new(&[(1.0, 0.2), (5.0, 1.0)]),
            end_chance: ProbabilityCurve::new(end),
        }
    }

    /// A lone planet, sometimes a few
    pub fn planetary(rng: &mut Pcg32) -> Self {
        let options = (0..3)
            .map(|variant| SpawnOption::new("planet", variant, Vec2::splat(4.0), 1))
            .collect();
        let end: &[(f32, f32)] = if rng.random_range(0..3) < 2 {
            &[(0.9, 0.1), (1.0, 1.0)]
        } else {
            &[(2.0, 0.25), (5.0, 1.0)]
        };
        Self {
            options,
            y_velocity: -0.0325,
            y_velocity_variance: 0.0025,
            x_range: 4.0,
            drift: rng.random::<f32>() * 0.1 - 0.05,
            spawn_chance: ProbabilityCurve::new(&[(4.0, 0.0), (10.0, 1.0)]),
            end_chance: ProbabilityCurve::new(end),
        }
    }

    /// Tumbling rock fragments
    pub fn debris(rng: &mut Pcg32) -> Self {
        let options = (0..30)
            .map(|variant| {
                SpawnOption::new("debris", variant, Vec2::splat(0.75), 1)
                    .with_rotation(180.0)
                    .with_spin(0.0, 1.0)
            })
            .collect();
        let end: &[(f32, f32)] = match rng.random_range(0..25) {
            0..2 => &[(2.0, 0.25), (5.0, 1.0)],
            2..4 => &[(5.0, 0.1), (10.0, 0.75)],
            _ => &[(10.0, 0.1), (15.0, 0.75)],
        };
        Self {
            options,
            y_velocity: -0.05,
            y_velocity_variance: 0.005,
            x_range: 4.0,
            drift: rng.random::<f32>() * 0.2 - 0.01,
            spawn_chance: ProbabilityCurve::new(&[(1.0, 0.0), (3.0, 0.75), (4.0, 1.0)]),
            end_chance: ProbabilityCurve::new(end),
        }
    }
}

/// Spawns one constellation over several ticks
#[derive(Debug, Clone, PartialEq)]
pub struct ConstellationFactory {
    template: ConstellationTemplate,
    total_weight: u32,
    spawn_y: f32,
    centre: f32,
    /// Where earlier entries are now, and how they move
    entries: Vec<(Vec2, Vec2)>,
    pub finished: bool,
}

impl ConstellationFactory {
    /// Start a constellation with one entry at a random centre
    pub fn start(
        template: ConstellationTemplate,
        rng: &mut Pcg32,
        out: &mut Vec<BackgroundObject>,
    ) -> Self {
        let total_weight = template.options.iter().map(|o| o.weight).sum();
        let mut factory = Self {
            template,
            total_weight,
            spawn_y: VIEW_TOP + SPAWN_ABOVE_TOP,
            centre: rng.random::<f32>() * 14.0 - 7.0,
            entries: Vec::new(),
            finished: false,
        };
        let at = Vec2::new(factory.centre, factory.spawn_y);
        factory.spawn(at, rng, out);
        factory
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn update(&mut self, rng: &mut Pcg32, out: &mut Vec<BackgroundObject>) {
        for (position, velocity) in &mut self.entries {
            *position += *velocity;
        }
        self.centre += self.template.drift;

        let mut offset = eased_unit(rng);
        if rng.random_bool(0.5) {
            offset = -offset;
        }
        let at = Vec2::new(offset * self.template.x_range * 0.5 + self.centre, self.spawn_y);
        if !self.finished && self.should_spawn_at(at, rng) {
            self.spawn(at, rng, out);
        }
    }

    fn should_spawn_at(&self, at: Vec2, rng: &mut Pcg32) -> bool {
        let nearest = self
            .entries
            .iter()
            .map(|(p, _)| (*p - at).magnitude_squared())
            .fold(1_000_000.0f32, f32::min)
            .sqrt();
        self.template.spawn_chance.passes(nearest, rng)
    }

    fn spawn(&mut self, at: Vec2, rng: &mut Pcg32, out: &mut Vec<BackgroundObject>) {
        if self.total_weight == 0 {
            self.finished = true;
            return;
        }
        let y_velocity = vary(rng, self.template.y_velocity, self.template.y_velocity_variance);
        let roll = rng.random_range(0..self.total_weight) as f32;
        let Some(option) = weighted_index(self.template.options.iter().map(|o| o.weight as f32), roll)
            .and_then(|i| self.template.options.get(i))
        else {
            return;
        };
        let object = option.instance(rng, at, y_velocity);
        self.entries.push((object.position, object.velocity));
        out.push(object);
        self.finished = self.template.end_chance.passes(self.entries.len() as f32, rng);
    }
}

/// One parallax layer with its running constellations
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub kind: LayerKind,
    pub objects: Vec<BackgroundObject>,
    factories: Vec<ConstellationFactory>,
    ticks_to_spawn: i32,
}

impl Layer {
    fn new(kind: LayerKind, rng: &mut Pcg32) -> Self {
        Self {
            kind,
            objects: Vec::new(),
            factories: Vec::new(),
            ticks_to_spawn: rng.random_range(0..100),
        }
    }

    pub fn factory_count(&self) -> usize {
        self.factories.len()
    }

    fn update(&mut self, rng: &mut Pcg32) {
        self.ticks_to_spawn -= 1;
        for object in &mut self.objects {
            object.update();
        }
        for factory in &mut self.factories {
            factory.update(rng, &mut self.objects);
        }

        if self.ticks_to_spawn <= 0 {
            if let Some(template) = self.kind.template(rng) {
                let factory = ConstellationFactory::start(template, rng, &mut self.objects);
                self.factories.push(factory);
            }
            self.ticks_to_spawn = next_interval(self.kind.spawn_interval(), rng) as i32;
        }

        self.factories.retain(|f| !f.finished);
        self.objects.retain(|o| !o.to_be_destroyed);
    }
}

/// A random interval that clusters around the common value
fn next_interval((shortest, longest, common): (f32, f32, f32), rng: &mut Pcg32) -> f32 {
    let p = eased_unit(rng);
    let side = if rng.random_bool(0.5) {
        shortest - common
    } else {
        longest - common
    };
    p * side + common
}

/// (offset from the ship's centre, size) of each debris piece
type Part = (Vec2, Vec2);

const DRONE_PARTS: [Part; 6] = [
    (Vec2::new(-0.125, 0.375), Vec2::new(0.25, 0.25)),
    (Vec2::new(0.125, 0.375), Vec2::new(0.25, 0.25)),
    (Vec2::new(-0.25, 0.25), Vec2::new(0.25, 0.5)),
    (Vec2::new(0.25, 0.25), Vec2::new(0.25, 0.5)),
    (Vec2::new(-0.25, 0.0), Vec2::new(0.5, 1.0)),
    (Vec2::new(0.25, 0.0), Vec2::new(0.5, 1.0)),
];

const WARRIOR_PARTS: [Part; 6] = [
    (Vec2::new(-0.375, 0.25), Vec2::new(0.5, 0.5)),
    (Vec2::new(0.375, 0.25), Vec2::new(0.5, 0.5)),
    (Vec2::new(-0.125, -0.0625), Vec2::new(0.375, 0.75)),
    (Vec2::new(0.125, -0.0625), Vec2::new(0.375, 0.75)),
    (Vec2::new(-0.25, -0.125), Vec2::new(0.5, 1.0)),
    (Vec2::new(0.25, -0.125), Vec2::new(0.5, 1.0)),
];

const GUARDIAN_PARTS: [Part; 6] = [
    (Vec2::new(-0.25, 0.375), Vec2::new(0.25, 0.25)),
    (Vec2::new(0.25, 0.375), Vec2::new(0.25, 0.25)),
    (Vec2::new(-0.375, 0.25), Vec2::new(0.25, 0.5)),
    (Vec2::new(0.375, 0.25), Vec2::new(0.25, 0.5)),
    (Vec2::new(0.0, 0.25), Vec2::new(0.5, 0.25)),
    (Vec2::new(0.0, 0.0625), Vec2::new(0.5, 0.25)),
];

const QUEEN_PARTS: [Part; 10] = [
    (Vec2::new(-0.375, 0.875), Vec2::new(0.25, 0.5)),
    (Vec2::new(0.375, 0.875), Vec2::new(0.25, 0.5)),
    (Vec2::new(-0.625, 0.75), Vec2::new(0.5, 0.75)),
    (Vec2::new(0.625, 0.75), Vec2::new(0.5, 0.75)),
    (Vec2::new(-0.875, 0.625), Vec2::new(0.5, 1.0)),
    (Vec2::new(0.875, 0.625), Vec2::new(0.5, 1.0)),
    (Vec2::new(-0.1875, -0.375), Vec2::new(0.25, 0.25)),
    (Vec2::new(-0.125, -0.5), Vec2::new(0.25, 0.25)),
    (Vec2::new(0.1875, -0.375), Vec2::new(0.25, 0.25)),
    (Vec2::new(0.125, -0.5), Vec2::new(0.25, 0.25)),
];

/// Splatter offsets left by a queen
const QUEEN_SPLATTERS: [Vec2; 3] = [Vec2::new(0.0, 0.75), Vec2::new(0.0, -0.75), Vec2::ZERO];

/// Random sideways and downward drift for a piece of debris
fn debris_velocity(rng: &mut Pcg32) -> Vec2 {
    let x = -0.01 + rng.random::<f32>() * 0.02;
    let y = -0.06 + rng.random::<f32>() * 0.02;
    Vec2::new(x, y)
}

/// Owner of every layer
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundManager {
    layers: [Layer; 4],
    foreground: Vec<BackgroundObject>,
}

impl BackgroundManager {
    pub fn new(rng: &mut Pcg32) -> Self {
        Self {
            layers: LayerKind::BACKGROUND.map(|kind| Layer::new(kind, rng)),
            foreground: Vec::new(),
        }
    }

    pub fn update(&mut self, rng: &mut Pcg32) {
        for layer in &mut self.layers {
            layer.update(rng);
        }
        for object in &mut self.foreground {
            object.update();
        }
        self.foreground.retain(|o| !o.to_be_destroyed);
    }

    pub fn layer(&self, kind: LayerKind) -> &[BackgroundObject] {
        match self.layers.iter().find(|l| l.kind == kind) {
            Some(layer) => &layer.objects,
            None => &self.foreground,
        }
    }

    fn layer_mut(&mut self, kind: LayerKind) -> &mut Vec<BackgroundObject> {
        match self.layers.iter_mut().find(|l| l.kind == kind) {
            Some(layer) => &mut layer.objects,
            None => &mut self.foreground,
        }
    }

    /// Every object in draw order
    pub fn objects(&self) -> impl Iterator<Item = (LayerKind, &BackgroundObject)> {
        self.layers
            .iter()
            .flat_map(|l| l.objects.iter().map(move |o| (l.kind, o)))
            .chain(self.foreground.iter().map(|o| (LayerKind::Foreground, o)))
    }

    /// Blast for a detonated projectile
    pub fn add_effect(&mut self, effect: EffectKind, position: Vec2, rng: &mut Pcg32) {
        let out = &mut self.foreground;
        match effect {
            EffectKind::RedBolt => {
                let variant = rng.random_range(0..4);
                let rotation = rng.random::<f32>() * 360.0;
                let spin = rng.random::<f32>() * 4.0 - 2.0;
                out.push(
                    BackgroundObject::sprite("red_blast", variant, Vec2::ONE, position)
                        .rotated(rotation)
                        .spinning(spin)
                        .fading(8),
                );
            }
            EffectKind::GreenBolt => {
                out.push(BackgroundObject::sprite("green_blast", 0, Vec2::ONE, position).fading(4));
            }
            EffectKind::RedBomb => {
                let rotation = rng.random::<f32>() * 360.0;
                let spin = rng.random::<f32>() * 2.0 - 1.0;
                out.push(
                    BackgroundObject::sprite("red_bomb_blast", 0, Vec2::splat(6.0), position)
                        .rotated(rotation)
                        .spinning(spin)
                        .fading(4),
                );
                for _ in 0..rng.random_range(5..9) {
                    let scale = 0.75 + rng.random::<f32>() * 0.5;
                    let at = position + point_in_circle(rng, 3.0);
                    let variant = rng.random_range(0..4);
                    let rotation = rng.random::<f32>() * 360.0;
                    let spin = rng.random::<f32>() * 4.0 - 2.0;
                    out.push(
                        BackgroundObject::sprite("red_blast", variant, Vec2::splat(scale), at)
                            .rotated(rotation)
                            .spinning(spin)
                            .fading(8),
                    );
                }
            }
            EffectKind::YellowBomb => {
                out.push(
                    BackgroundObject::sprite("yellow_bomb_blast", 0, Vec2::splat(4.0), position)
                        .fading(4),
                );
                for _ in 0..rng.random_range(4..7) {
                    let scale = 0.75 + rng.random::<f32>() * 0.5;
                    let at = position + point_in_circle(rng, 2.0);
                    let variant = rng.random_range(0..4);
                    out.push(
                        BackgroundObject::sprite("yellow_blast", variant, Vec2::splat(0.5 * scale), at)
                            .fading(8),
                    );
                }
            }
        }
    }

    /// Break a destroyed ship into pieces on the debris layer
    pub fn add_enemy_gibs(
        &mut self,
        kind: EnemyKind,
        position: Vec2,
        rotation: f32,
        rng: &mut Pcg32,
    ) {
        let (parts, count, splatters): (&[Part], usize, &[Vec2]) = match kind {
            EnemyKind::Drone => (&DRONE_PARTS, 3 + rng.random_range(0..2), &[Vec2::ZERO]),
            EnemyKind::Warrior => (&WARRIOR_PARTS, 3 + rng.random_range(0..2), &[Vec2::ZERO]),
            EnemyKind::Guardian => (&GUARDIAN_PARTS, 3 + rng.random_range(0..2), &[Vec2::ZERO]),
            EnemyKind::Queen => (&QUEEN_PARTS, 4 + rng.random_range(0..3), &QUEEN_SPLATTERS),
        };
        let name = kind.sprite();
        let out = self.layer_mut(LayerKind::Debris);

        let mut remaining: Vec<usize> = (0..parts.len()).collect();
        for _ in 0..count.min(parts.len()) {
            let index = remaining.swap_remove(rng.random_range(0..remaining.len()));
            let (offset, size) = parts[index];
            let at = position + rotate_degrees(offset, rotation);
            let mut piece = BackgroundObject::new(
                Visual::Sprite {
                    name,
                    variant: index as u8,
                },
                size,
                at,
                rotation,
                0.0,
            );
            piece.velocity = debris_velocity(rng);
            piece.rotation_velocity = rng.random::<f32>() * 2.0 - 1.0;
            out.push(piece);
        }

        for offset in splatters {
            let scale = 1.0 + rng.random::<f32>() * 0.5;
            let variant = rng.random_range(0..4);
            let at = position + rotate_degrees(*offset, rotation);
            out.push(
                BackgroundObject::sprite("splatter", variant, Vec2::splat(1.25 * scale), at)
                    .rotated(rotation)
                    .fading(4),
            );
        }
    }

    /// A shot-off armour plate tumbles away
    pub fn add_armour_gibs(
        &mut self,
        side: ArmourSide,
        position: Vec2,
        rotation: f32,
        rng: &mut Pcg32,
    ) {
        let mut plate = BackgroundObject::new(
            Visual::Sprite {
                name: side.sprite(),
                variant: 0,
            },
            Vec2::new(0.75, 1.25),
            position,
            rotation,
            0.0,
        );
        plate.velocity = debris_velocity(rng);
        self.layer_mut(LayerKind::Debris).push(plate);
    }

    /// Text for a level command; score popups go behind the planets
    pub fn add_level_effect(&mut self, text: &LevelText, rng: &mut Pcg32) {
        let parameter = text.parameter.as_deref().unwrap_or("");
        let command = text.command.to_ascii_lowercase();
        let lines: Vec<(String, f32)> = match command.as_str() {
            "add_score" | "subtract_score" => {
                let sign = if command == "add_score" { '+' } else { '-' };
                let x = rng.random::<f32>() * 10.0 - 5.0;
                let popup = BackgroundObject::new(
                    Visual::Text(format!("{sign}{parameter}")),
                    Vec2::new(4.0, 0.5),
                    Vec2::new(x, VIEW_TOP),
                    0.0,
                    SCORE_TEXT_Y_VELOCITY,
                );
                self.layer_mut(LayerKind::Interstellar).push(popup);
                return;
            }
            "level_victory" => vec![("LEVEL COMPLETE!".into(), 21.0)],
            "scorecard" => vec![(format!("SCORE: {parameter}"), 21.0)],
            "game_over" => vec![("GAME OVER".into(), 21.0)],
            "add_charges" => vec![("CHARGES ADDED!".into(), 10.0)],
            "victory" => vec![
                ("VICTORY!".into(), 27.0),
                (format!("FINAL SCORE: {parameter}"), 29.0),
            ],
            "level_01_start" => vec![
                ("Activate AUTO to shoot.".into(), 21.0),
                ("Bomb and shield are limited!".into(), 23.0),
                ("Clear all enemies!".into(), 25.0),
                ("LEVEL 1".into(), 28.0),
            ],
            "level_02_start" => vec![
                ("Being hit costs you score.".into(), 21.0),
                ("Don't get hit!".into(), 23.0),
                ("LEVEL 2".into(), 25.0),
            ],
            "level_03_start" => vec![
                ("Get more charges every 500 points!".into(), 21.0),
                ("Kill all enemies for a perfection bonus!".into(), 23.0),
                ("LEVEL 3".into(), 25.0),
            ],
            _ => {
                log::debug!("no visual for level command {:?}", text.command);
                Vec::new()
            }
        };

        let out = self.layer_mut(LayerKind::Debris);
        for (line, y) in lines {
            out.push(BackgroundObject::new(
                Visual::Text(line),
                Vec2::new(8.0, 1.0),
                Vec2::new(0.0, y),
                0.0,
                TEXT_Y_VELOCITY,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_curve_interpolates_between_points() {
        let curve = ProbabilityCurve::new(&[(1.0, 0.0), (3.0, 0.75), (4.0, 1.0)]);
        assert_eq!(curve.chance(0.5), 0.0);
        assert_eq!(curve.chance(5.0), 1.0);
        assert!((curve.chance(2.0) - 0.375).abs() < 1e-6);
        assert!((curve.chance(3.5) - 0.875).abs() < 1e-6);
        assert_eq!(curve.chance(1.0), 0.0);
    }

    #[test]
    fn test_curve_ends_are_certain() {
        let mut rng = Pcg32::seed_from_u64(0);
        let curve = ProbabilityCurve::new(&[(1.0, 0.9), (3.0, 1.0)]);
        for _ in 0..50 {
            assert!(curve.passes(3.5, &mut rng));
            assert!(!curve.passes(0.5, &mut rng));
        }
        assert!(!ProbabilityCurve::new(&[]).passes(1.0, &mut rng));
    }

    #[test]
    fn test_object_fades_out() {
        let mut object = BackgroundObject::sprite("green_blast", 0, Vec2::ONE, Vec2::ZERO).fading(4);
        let mut ticks = 0;
        while !object.to_be_destroyed {
            object.update();
            ticks += 1;
        }
        assert_eq!(ticks, 64);
        assert_eq!(object.alpha, 0);
    }

    #[test]
    fn test_object_culled_below_screen() {
        let mut object = BackgroundObject::new(
            Visual::Text("x".into()),
            Vec2::ONE,
            Vec2::new(0.0, -20.99),
            0.0,
            -0.05,
        );
        object.update();
        assert!(object.to_be_destroyed);
    }

    #[test]
    fn test_constellation_starts_with_one_entry() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut out = Vec::new();
        let template = ConstellationTemplate::debris(&mut rng);
        let factory = ConstellationFactory::start(template, &mut rng, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(factory.len(), 1);
        assert_eq!(out[0].position.y, VIEW_TOP + SPAWN_ABOVE_TOP);
    }

    #[test]
    fn test_single_planet_constellation_finishes() {
        let mut rng = Pcg32::seed_from_u64(8);
        let mut template = ConstellationTemplate::planetary(&mut rng);
        template.end_chance = ProbabilityCurve::new(&[(0.9, 0.1), (1.0, 1.0)]);
        let mut out = Vec::new();
        let factory = ConstellationFactory::start(template, &mut rng, &mut out);
        assert!(factory.finished);
    }

    #[test]
    fn test_interval_stays_in_range() {
        let mut rng = Pcg32::seed_from_u64(2);
        for _ in 0..500 {
            let t = next_interval(LayerKind::Debris.spawn_interval(), &mut rng);
            assert!((50.0..=400.0).contains(&t));
        }
    }

    #[test]
    fn test_layers_fill_over_time() {
        let mut rng = Pcg32::seed_from_u64(13);
        let mut manager = BackgroundManager::new(&mut rng);
        for _ in 0..600 {
            manager.update(&mut rng);
        }
        assert!(!manager.layer(LayerKind::Debris).is_empty());
        assert!(!manager.layer(LayerKind::Interstellar).is_empty());
        assert!(manager.objects().all(|(_, o)| o.position.y >= CULL_Y - 1.0));
    }

    #[test]
    fn test_red_bomb_has_sub_blasts() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut manager = BackgroundManager::new(&mut rng);
        manager.add_effect(EffectKind::RedBomb, Vec2::new(1.0, 2.0), &mut rng);
        let blasts = manager.layer(LayerKind::Foreground);
        assert!((6..=9).contains(&blasts.len()));
        assert!(
            blasts[1..]
                .iter()
                .all(|b| (b.position - Vec2::new(1.0, 2.0)).length() <= 3.0 + 1e-4)
        );
    }

    #[test]
    fn test_queen_gibs_use_distinct_parts() {
        let mut rng = Pcg32::seed_from_u64(6);
        let mut manager = BackgroundManager::new(&mut rng);
        manager.add_enemy_gibs(EnemyKind::Queen, Vec2::ZERO, 90.0, &mut rng);
        let debris = manager.layer(LayerKind::Debris);
        let mut parts: Vec<u8> = debris
            .iter()
            .filter_map(|o| match o.visual {
                Visual::Sprite { name: "queen", variant } => Some(variant),
                _ => None,
            })
            .collect();
        let count = parts.len();
        parts.sort();
        parts.dedup();
        assert_eq!(parts.len(), count);
        assert!((4..=6).contains(&count));
        assert_eq!(debris.len(), count + QUEEN_SPLATTERS.len());
    }

    #[test]
    fn test_level_texts() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut manager = BackgroundManager::new(&mut rng);
        manager.add_level_effect(&LevelText::new("victory", Some("4200".into())), &mut rng);
        let texts: Vec<&Visual> = manager.layer(LayerKind::Debris).iter().map(|o| &o.visual).collect();
        assert_eq!(texts[1], &Visual::Text("FINAL SCORE: 4200".into()));

        manager.add_level_effect(&LevelText::new("subtract_score", Some("500".into())), &mut rng);
        let popup = manager.layer(LayerKind::Interstellar).last().unwrap();
        assert_eq!(popup.visual, Visual::Text("-500".into()));
        assert!(popup.position.x.abs() <= 5.0);
    }
}
