//! Narrow-phase overlap tests between circles and oriented rectangles
//!
//! Every test first rejects on the sum of check radii. Normals point in the
//! direction shape A would have to move to escape shape B.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::math::Vector2;
use crate::rotate_degrees;

/// Geometry of a collision shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    /// Rectangle given by half its width and height
    Rectangle { half_extents: Vec2 },
}

impl Shape {
    /// Radius of a circle around the shape's centre that contains all of it
    pub fn check_radius(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => radius,
            Shape::Rectangle { half_extents } => half_extents.length(),
        }
    }
}

/// A shape placed in the world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: Shape,
    pub position: Vec2,
    /// Degrees; only meaningful for rectangles
    pub rotation: f32,
}

impl Collider {
    pub fn circle(radius: f32, position: Vec2) -> Self {
        Self {
            shape: Shape::Circle { radius },
            position,
            rotation: 0.0,
        }
    }

    pub fn rectangle(half_extents: Vec2, position: Vec2, rotation: f32) -> Self {
        Self {
            shape: Shape::Rectangle { half_extents },
            position,
            rotation,
        }
    }

    #[inline]
    pub fn check_radius(&self) -> f32 {
        self.shape.check_radius()
    }

    /// Corners in world space, counter-clockwise from bottom-left. Circles have none.
    pub fn corners(&self) -> Option<[Vec2; 4]> {
        match self.shape {
            Shape::Circle { .. } => None,
            Shape::Rectangle { half_extents: h } => {
                let local = [
                    Vec2::new(-h.x, -h.y),
                    Vec2::new(h.x, -h.y),
                    Vec2::new(h.x, h.y),
                    Vec2::new(-h.x, h.y),
                ];
                Some(local.map(|c| rotate_degrees(c, self.rotation) + self.position))
            }
        }
    }
}

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether the shapes overlap
    pub hit: bool,
    /// Unit escape direction for shape A (zero when unknown or on a miss)
    pub normal: Vec2,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
        }
    }

    pub fn hit(normal: Vec2) -> Self {
        Self { hit: true, normal }
    }

    fn flipped(self) -> Self {
        Self {
            hit: self.hit,
            normal: -self.normal,
        }
    }
}

/// Broad-phase rejection on bounding circles
#[inline]
fn within_check_radius(a: &Collider, b: &Collider) -> bool {
    let reach = a.check_radius() + b.check_radius();
    (a.position - b.position).magnitude_squared() <= reach * reach
}

/// Test two colliders for overlap
pub fn check_collision(a: &Collider, b: &Collider) -> CollisionResult {
    if !within_check_radius(a, b) {
        return CollisionResult::miss();
    }
    match (a.shape, b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.position, ra, b.position, rb)
        }
        (Shape::Rectangle { half_extents }, Shape::Circle { radius }) => {
            rectangle_circle(a, half_extents, b.position, radius)
        }
        (Shape::Circle { radius }, Shape::Rectangle { half_extents }) => {
            rectangle_circle(b, half_extents, a.position, radius).flipped()
        }
        (Shape::Rectangle { half_extents: ha }, Shape::Rectangle { half_extents: hb }) => {
            rectangle_rectangle(a, ha, b, hb)
        }
    }
}

fn circle_circle(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> CollisionResult {
    let offset = pos_a - pos_b;
    let reach = radius_a + radius_b;
    if offset.magnitude_squared() <= reach * reach {
        CollisionResult::hit(offset.unit())
    } else {
        CollisionResult::miss()
    }
}

/// Rectangle (A) against circle (B)
fn rectangle_circle(
    rect: &Collider,
    half_extents: Vec2,
    centre: Vec2,
    radius: f32,
) -> CollisionResult {
    // Circle centre in the rectangle's frame
    let local = rotate_degrees(centre - rect.position, -rect.rotation);
    let clamped = local.clamp(-half_extents, half_extents);
    let diff = local - clamped;

    if diff.magnitude_squared() > radius * radius {
        return CollisionResult::miss();
    }

    let local_normal = if diff.y == 0.0 && diff.x > 0.0 {
        Vec2::new(-1.0, 0.0)
    } else if diff.y == 0.0 && diff.x < 0.0 {
        Vec2::new(1.0, 0.0)
    } else if diff.x == 0.0 && diff.y > 0.0 {
        Vec2::new(0.0, -1.0)
    } else if diff.x == 0.0 && diff.y < 0.0 {
        Vec2::new(0.0, 1.0)
    } else {
        // Centre inside the rectangle gives a zero vector here
        -diff.unit()
    };

    CollisionResult::hit(rotate_degrees(local_normal, rect.rotation))
}

/// Interval of `points` projected onto `axis`
fn project(points: &[Vec2; 4], axis: Vec2) -> (f32, f32) {
    points.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

/// Smallest axis-aligned move that takes `point` out of a centred box, if it is strictly inside
fn escape_vector(point: Vec2, half_extents: Vec2) -> Option<Vec2> {
    if point.x.abs() >= half_extents.x || point.y.abs() >= half_extents.y {
        return None;
    }
    let escape_x = if point.x >= 0.0 {
        half_extents.x - point.x
    } else {
        -half_extents.x - point.x
    };
    let escape_y = if point.y >= 0.0 {
        half_extents.y - point.y
    } else {
        -half_extents.y - point.y
    };
    if escape_x.abs() < escape_y.abs() {
        Some(Vec2::new(escape_x, 0.0))
    } else {
        Some(Vec2::new(0.0, escape_y))
    }
}

/// Separating axis test on A's edge normals, then a corner escape heuristic for the normal
fn rectangle_rectangle(a: &Collider, ha: Vec2, b: &Collider, hb: Vec2) -> CollisionResult {
    let to_local = |p: Vec2, frame: &Collider| rotate_degrees(p - frame.position, -frame.rotation);

    let Some(b_world) = b.corners() else {
        return CollisionResult::miss();
    };
    let Some(a_world) = a.corners() else {
        return CollisionResult::miss();
    };
    let b_in_a = b_world.map(|c| to_local(c, a));

    // A's two distinct edge normals; in A's frame these are the coordinate axes
    for (axis, extent) in [(Vec2::X, ha.x), (Vec2::Y, ha.y)] {
        let (lo, hi) = project(&b_in_a, axis);
        if lo > extent || hi < -extent {
            return CollisionResult::miss();
        }
    }
    // Same test from B's side catches rotated near misses
    let a_in_b = a_world.map(|c| to_local(c, b));
    for (axis, extent) in [(Vec2::X, hb.x), (Vec2::Y, hb.y)] {
        let (lo, hi) = project(&a_in_b, axis);
        if lo > extent || hi < -extent {
            return CollisionResult::miss();
        }
    }

    let mut total = Vec2::ZERO;
    // B's corners inside A: A escapes against the corner's escape
    for corner in b_in_a {
        if let Some(escape) = escape_vector(corner, ha) {
            total -= rotate_degrees(escape, a.rotation);
        }
    }
    // A's corners inside B: A escapes along the corner's escape
    for corner in a_in_b {
        if let Some(escape) = escape_vector(corner, hb) {
            total += rotate_degrees(escape, b.rotation);
        }
    }

    CollisionResult::hit(total.unit())
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}
