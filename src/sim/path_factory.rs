//! Path templates: entrances, flybys and exits
//!
//! Templates are built from sampled arcs and straight runs, then mirrored for
//! the opposite side. Small offsets fan out enemies that share a template.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::path::Path;

/// Degrees between samples on an arc
const CURVE_INCREMENT: i32 = 5;

/// Where an entering wave appears from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    Left,
    Right,
    TopLeft,
    TopRight,
}

/// Flyby templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlybyKind {
    /// A loop with a fixed curved end and in/out legs that slide along x
    Trombone,
    /// A loop at either end
    Bicycle,
}

/// Exit templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExitKind {
    /// Meanders down and out
    #[default]
    Drift,
}

/// Sample an arc from `from` to `to` degrees inclusive in `CURVE_INCREMENT` steps
fn arc(path: &mut Path, centre: Vec2, radius: f32, from: i32, to: i32) {
    let step = if to >= from { CURVE_INCREMENT } else { -CURVE_INCREMENT };
    let mut degrees = from;
    while (step > 0 && degrees <= to) || (step < 0 && degrees >= to) {
        let theta = (degrees as f32).to_radians();
        path.add_node(centre.x + theta.cos() * radius, centre.y + theta.sin() * radius);
        degrees += step;
    }
}

/// Path from off-screen into the formation area.
///
/// `stack_depth` pushes the first node further out so stacked ships queue up;
/// `offset` shifts the curves so parallel ships do not overlap.
pub fn entrance(direction: EntryDirection, stack_depth: f32, offset: f32) -> Path {
    let mut path = Path::new();
    match direction {
        EntryDirection::TopLeft | EntryDirection::TopRight => {
            path.add_node(3.0 - offset, 23.0 + stack_depth);
            path.add_node_synced(3.0 - offset, 18.0, false);
            // Swing inward
            arc(&mut path, Vec2::new(-2.0, 18.0), 5.0 - offset, 360 - CURVE_INCREMENT, 315);
            arc(&mut path, Vec2::new(2.0, 8.0), 5.0 + offset, 135, 180);
            // Half loop under the formation
            arc(&mut path, Vec2::new(0.0, 8.0), 3.0 + offset, 180 + CURVE_INCREMENT, 360);
            if direction == EntryDirection::TopLeft {
                path.mirror_x();
            }
        }
        EntryDirection::Left | EntryDirection::Right => {
            path.add_node(12.0 + stack_depth, 5.0 + offset);
            path.add_node_synced(7.0, 5.0 + offset, false);
            arc(&mut path, Vec2::new(7.0, 9.0), 4.0 - offset, 270 - CURVE_INCREMENT, 180);
            arc(&mut path, Vec2::new(5.0, 9.0), 2.0 - offset, 180 - CURVE_INCREMENT, 0);
            arc(&mut path, Vec2::new(4.0, 9.0), 3.0 - offset, 360 - CURVE_INCREMENT, 270);
            arc(&mut path, Vec2::new(4.0, 10.0), 4.0 - offset, 270 - CURVE_INCREMENT, 180);
            if direction == EntryDirection::Left {
                path.mirror_x();
            }
        }
    }
    path
}

/// Path from a formation slot down through the lower screen and back
pub fn flyby(kind: FlybyKind, grid_pos: Vec2, offset: f32) -> Path {
    let mut path = Path::new();
    match kind {
        FlybyKind::Trombone => {
            let x = grid_pos.x.abs();
            path.add_node(x, grid_pos.y);
            path.add_node(x, 7.0 + offset);
            arc(&mut path, Vec2::new(x - 1.0, 7.0 + offset), 1.0, 360 - CURVE_INCREMENT, 270);
            path.add_node_synced(-0.5, 6.0 + offset, false);
            arc(&mut path, Vec2::new(-2.5, 7.0), 1.0 - offset, 270 - CURVE_INCREMENT, 180);
            arc(&mut path, Vec2::new(-3.5, 7.0), 2.0 + offset, CURVE_INCREMENT, 90);
            arc(&mut path, Vec2::new(-3.5, 6.0), 3.0 + offset, 90, 270);
            path.add_node_synced(x - 4.0, 3.0 - offset, false);
            arc(&mut path, Vec2::new(x - 4.0, 7.0), 4.0 + offset, 270 + CURVE_INCREMENT, 360);
            if grid_pos.x < 0.0 {
                path.mirror_x();
            }
        }
        FlybyKind::Bicycle => {
            // Built for the left side
            let x = -grid_pos.x.abs();
            path.add_node(x, grid_pos.y);
            path.add_node(x, 6.0 + offset);
            arc(&mut path, Vec2::new(x - 2.0, 6.0 + offset), 2.0, 360 - CURVE_INCREMENT, 270);
            path.add_node_synced(-7.0, 4.0 + offset, false);
            arc(&mut path, Vec2::new(-7.0, 6.0), 2.0 - offset, 270 - CURVE_INCREMENT, 90);
            path.add_node_synced(4.0, 8.0 - offset, true);
            // One and a half turns
            arc(&mut path, Vec2::new(4.0, 5.0), 3.0 - offset, 450, -90);
            path.add_node_synced(x + 4.0, 2.0 + offset, false);
            arc(&mut path, Vec2::new(x + 4.0, 6.0 + offset), 4.0, 270, 180);
            path.add_node(x, 8.0 + offset);
            if grid_pos.x > 0.0 {
                path.mirror_x();
            }
        }
    }
    path
}

/// Path from a formation slot off the bottom of the screen
pub fn exit(kind: ExitKind, grid_pos: Vec2) -> Path {
    let mut path = Path::new();
    match kind {
        ExitKind::Drift => {
            let Vec2 { x, y } = grid_pos;
            path.add_node(x, y);
            arc(&mut path, Vec2::new(x + 2.0, y), 2.0, 180 + CURVE_INCREMENT, 225);
            arc(&mut path, Vec2::new(x + 0.5, y - 4.0), 2.0, 45, -45);
            arc(&mut path, Vec2::new(x - 0.5, y - 10.0), 2.0, 135, 225);
            arc(&mut path, Vec2::new(x + 0.5, y - 16.0), 2.0, 45, -45);
        }
    }
    path
}
