//! Body arena and pose propagation
//!
//! Every simulated object is a `Body` addressed by a stable `EntityId`. Bodies
//! carry their attached colliders; welds live in a separate edge list so moving
//! or deleting one body can reach its partners without ownership cycles.
//! Deletion only marks bodies. Removal happens in the end-of-tick sweep.

use std::collections::{BTreeMap, HashSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{CollisionResult, Collider, Shape, check_collision};
use super::weld::WeldRegistry;
use crate::{rotate_degrees, wrap_degrees};

/// Stable handle for a body
pub type EntityId = u32;

/// What a body belongs to, used by deletion hooks and renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    Player,
    Enemy,
    Projectile,
    Shield,
    Armour,
}

/// Rigid offset of a collider from its body's origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalTransform {
    pub offset: Vec2,
    /// Degrees
    pub rotation: f32,
}

/// A collider and its placement on the body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub local: LocalTransform,
    /// World-space collider, recomputed on every pose change
    pub collider: Collider,
}

/// A simulated object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: EntityId,
    pub kind: BodyKind,
    position: Vec2,
    rotation: f32,
    attachments: Vec<Attachment>,
    welded: bool,
    /// Deleting this body also deletes its weld partners
    pub chains_deletion: bool,
    to_be_destroyed: bool,
}

impl Body {
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn colliders(&self) -> impl Iterator<Item = &Collider> {
        self.attachments.iter().map(|a| &a.collider)
    }

    pub fn is_welded(&self) -> bool {
        self.welded
    }

    pub fn is_to_be_destroyed(&self) -> bool {
        self.to_be_destroyed
    }

    /// Set the pose and recompute every collider's world placement
    fn set_pose(&mut self, position: Vec2, rotation: f32) {
        self.position = position;
        self.rotation = rotation;
        for attachment in &mut self.attachments {
            attachment.collider.position = position + rotate_degrees(attachment.local.offset, rotation);
            attachment.collider.rotation = wrap_degrees(rotation + attachment.local.rotation);
        }
    }
}

/// Builder used by entity factories to describe a body before spawning it
#[derive(Debug, Clone)]
pub struct BodySpec {
    pub kind: BodyKind,
    pub position: Vec2,
    pub rotation: f32,
    pub chains_deletion: bool,
    shapes: Vec<(Shape, LocalTransform)>,
}

impl BodySpec {
    pub fn new(kind: BodyKind, position: Vec2, rotation: f32) -> Self {
        Self {
            kind,
            position,
            rotation,
            chains_deletion: true,
            shapes: Vec::new(),
        }
    }

    pub fn chains_deletion(mut self, chains: bool) -> Self {
        self.chains_deletion = chains;
        self
    }

    pub fn circle(mut self, radius: f32, offset: Vec2) -> Self {
        self.shapes.push((
            Shape::Circle { radius },
            LocalTransform {
                offset,
                rotation: 0.0,
            },
        ));
        self
    }

    pub fn rectangle(mut self, half_extents: Vec2, offset: Vec2, rotation: f32) -> Self {
        self.shapes.push((
            Shape::Rectangle { half_extents },
            LocalTransform { offset, rotation },
        ));
        self
    }
}

/// Arena of bodies plus the weld graph between them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    bodies: BTreeMap<EntityId, Body>,
    welds: WeldRegistry,
    next_id: EntityId,
    /// Bodies marked for deletion since the last drain, in marking order
    #[serde(skip)]
    obituaries: Vec<EntityId>,
}

impl World {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Allocate a new entity ID
    fn next_entity_id(&mut self) -> EntityId {
        // Default-constructed worlds start at zero; keep ids non-zero
        self.next_id = self.next_id.max(1);
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create a body from a spec, placing its colliders at the initial pose
    pub fn spawn(&mut self, spec: BodySpec) -> EntityId {
        let id = self.next_entity_id();
        let attachments = spec
            .shapes
            .into_iter()
            .map(|(shape, local)| Attachment {
                local,
                collider: Collider {
                    shape,
                    position: Vec2::ZERO,
                    rotation: 0.0,
                },
            })
            .collect();
        let mut body = Body {
            id,
            kind: spec.kind,
            position: spec.position,
            rotation: spec.rotation,
            attachments,
            welded: false,
            chains_deletion: spec.chains_deletion,
            to_be_destroyed: false,
        };
        body.set_pose(spec.position, spec.rotation);
        self.bodies.insert(id, body);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.bodies.contains_key(&id)
    }

    pub fn position(&self, id: EntityId) -> Vec2 {
        self.bodies.get(&id).map_or(Vec2::ZERO, |b| b.position)
    }

    pub fn rotation(&self, id: EntityId) -> f32 {
        self.bodies.get(&id).map_or(0.0, |b| b.rotation)
    }

    /// True for bodies marked for deletion and for ids no longer in the arena
    pub fn is_to_be_destroyed(&self, id: EntityId) -> bool {
        self.bodies.get(&id).is_none_or(|b| b.to_be_destroyed)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn welds(&self) -> &WeldRegistry {
        &self.welds
    }

    /// Couple two bodies so they share one pose
    pub fn weld(&mut self, a: EntityId, b: EntityId) {
        if !self.contains(a) || !self.contains(b) || !self.welds.weld(a, b) {
            return;
        }
        for id in [a, b] {
            if let Some(body) = self.bodies.get_mut(&id) {
                body.welded = true;
            }
        }
    }

    pub fn welded_partners(&self, id: EntityId) -> Vec<EntityId> {
        self.welds.partners(id)
    }

    /// Move a body and everything welded to it to the same world pose
    pub fn update_state(&mut self, id: EntityId, position: Vec2, rotation: f32) {
        let mut visited = HashSet::new();
        self.update_state_visiting(id, position, rotation, &mut visited);
    }

    /// Pose update carrying the set of bodies already moved in this propagation
    pub fn update_state_visiting(
        &mut self,
        id: EntityId,
        position: Vec2,
        rotation: f32,
        visited: &mut HashSet<EntityId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        let Some(body) = self.bodies.get_mut(&id) else {
            return;
        };
        body.set_pose(position, rotation);
        if !body.welded {
            return;
        }
        for partner in self.welds.partners(id) {
            if !visited.contains(&partner) {
                self.update_state_visiting(partner, position, rotation, visited);
            }
        }
    }

    /// Mark a body for deletion, cascading through welds if it chains deletion
    pub fn delete(&mut self, id: EntityId) {
        let Some(body) = self.bodies.get_mut(&id) else {
            return;
        };
        if body.to_be_destroyed {
            return;
        }
        body.to_be_destroyed = true;
        let chains = body.chains_deletion;
        self.obituaries.push(id);

        if chains {
            for partner in self.welds.partners(id) {
                if !self.is_to_be_destroyed(partner) {
                    self.delete(partner);
                }
            }
            self.welds.mark_touching(id);
        }
    }

    /// Bodies marked since the last call, in marking order
    pub fn take_obituaries(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.obituaries)
    }

    /// Drop dead welds and clear the welded flag of bodies left without any
    pub fn sweep_welds(&mut self) {
        let bodies = &self.bodies;
        let touched = self
            .welds
            .sweep(|id| bodies.get(&id).is_none_or(|b| b.to_be_destroyed));
        for id in touched {
            let still_welded = self.welds.has_welds(id);
            if let Some(body) = self.bodies.get_mut(&id) {
                body.welded = still_welded;
            }
        }
    }

    /// Remove every body marked for deletion, returning their ids
    pub fn sweep_bodies(&mut self) -> Vec<EntityId> {
        let dead: Vec<EntityId> = self
            .bodies
            .values()
            .filter(|b| b.to_be_destroyed)
            .map(|b| b.id)
            .collect();
        for id in &dead {
            self.bodies.remove(id);
        }
        dead
    }

    /// Test every collider pair of two bodies, stopping at the first hit
    pub fn check_collision(&self, a: EntityId, b: EntityId) -> CollisionResult {
        let (Some(body_a), Some(body_b)) = (self.bodies.get(&a), self.bodies.get(&b)) else {
            return CollisionResult::miss();
        };
        for ca in body_a.colliders() {
            for cb in body_b.colliders() {
                let result = check_collision(ca, cb);
                if result.hit {
                    return result;
                }
            }
        }
        CollisionResult::miss()
    }

    /// Test a body against a free-standing collider
    pub fn check_collision_with(&self, id: EntityId, other: &Collider) -> CollisionResult {
        let Some(body) = self.bodies.get(&id) else {
            return CollisionResult::miss();
        };
        body.colliders()
            .map(|c| check_collision(c, other))
            .find(|r| r.hit)
            .unwrap_or_else(CollisionResult::miss)
    }
}
