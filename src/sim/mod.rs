//! Galactora game simulation
//!
//! Everything here runs on the fixed 60 Hz tick and draws randomness only
//! from the game's seeded generator, so a seed plus an input script replays
//! exactly. Bodies live in the `World` arena keyed by entity id. Deleting a
//! body follows its welds to everything that chains deletion, and the
//! deletion hooks run from the world's obituaries when the tick settles. Marked bodies are only dropped by the
//! sweep at the end of the tick.

pub mod background;
pub mod button;
pub mod collision;
pub mod enemy;
pub mod events;
pub mod formation;
pub mod level;
pub mod path;
pub mod path_factory;
pub mod player;
pub mod projectile;
pub mod shield;
pub mod state;
pub mod tick;
pub mod weld;
pub mod world;

pub use background::{BackgroundManager, BackgroundObject, LayerKind, Visual};
pub use button::{Button, ButtonBehaviour, ControlPanel};
pub use collision::{Collider, CollisionResult, Shape, check_collision};
pub use enemy::{Enemy, EnemyKind};
pub use events::{EffectKind, GameEvent, InputError, InputEvent, InputSender, LevelText};
pub use level::{Level, LevelDescriptor, LevelError, LevelPhase};
pub use player::PlayerShip;
pub use projectile::{Explosion, Projectile, ProjectileKind};
pub use shield::{Armour, ArmourSide, Shield, ShieldKind};
pub use state::{GameState, Sprite};
pub use tick::tick;
pub use world::{BodyKind, EntityId, World};
