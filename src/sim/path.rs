//! Waypoint paths and formation groups
//!
//! A `PathGroup` ties together enemies that set off together. Sync nodes are
//! balanced so every member takes the slowest member's time to reach them,
//! which keeps the formation's shape while the paths differ in length.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enemy::Enemy;
use super::world::{EntityId, World};
use crate::consts::ENEMY_MOVE_SPEED;

/// A waypoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    pub position: Vec2,
    /// Distance from the previous node (0 for the first node)
    pub length: f32,
    /// Whether parallel paths should arrive here together
    pub sync: bool,
    travel_time: f32,
    travel_speed: f32,
}

impl PathNode {
    fn new(position: Vec2, length: f32, sync: bool) -> Self {
        let mut node = Self {
            position,
            length,
            sync,
            travel_time: 0.0,
            travel_speed: ENEMY_MOVE_SPEED,
        };
        node.set_travel_time(length / ENEMY_MOVE_SPEED);
        node
    }

    /// Ticks needed to reach this node from the previous one
    pub fn travel_time(&self) -> f32 {
        self.travel_time
    }

    /// GU per tick needed to match the travel time
    pub fn travel_speed(&self) -> f32 {
        self.travel_speed
    }

    pub fn set_travel_time(&mut self, ticks: f32) {
        self.travel_time = ticks;
        self.travel_speed = if ticks > 0.0 {
            self.length / ticks
        } else {
            ENEMY_MOVE_SPEED
        };
    }
}

/// An ordered run of waypoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub nodes: Vec<PathNode>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sync node
    pub fn add_node(&mut self, x: f32, y: f32) {
        self.add_node_synced(x, y, true);
    }

    pub fn add_node_synced(&mut self, x: f32, y: f32, sync: bool) {
        let position = Vec2::new(x, y);
        let length = self
            .nodes
            .last()
            .map_or(0.0, |last| (position - last.position).length());
        self.nodes.push(PathNode::new(position, length, sync));
    }

    /// Mirror across the vertical axis
    pub fn mirror_x(&mut self) {
        for node in &mut self.nodes {
            node.position.x = -node.position.x;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn start(&self) -> Option<Vec2> {
        self.nodes.first().map(|n| n.position)
    }
}

/// Make every parallel sync segment take the slowest path's time.
///
/// Returns false, leaving the paths untouched, if there are none or their node counts differ.
/// The sync flag of the first path decides which indices are balanced.
pub fn balance_paths(paths: &mut [&mut Path]) -> bool {
    let Some(first) = paths.first() else {
        return false;
    };
    let size = first.len();
    if paths.iter().any(|p| p.len() != size) {
        return false;
    }

    for i in 1..size {
        if !paths[0].nodes[i].sync {
            continue;
        }
        let slowest = paths
            .iter()
            .map(|p| p.nodes[i].travel_time())
            .fold(0.0f32, f32::max);
        if slowest <= 0.0 {
            continue;
        }
        for path in paths.iter_mut() {
            path.nodes[i].set_travel_time(slowest);
        }
    }
    true
}

/// Group identifier, unique within a level
pub type GroupId = u32;

/// Reasons a group refuses a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathGroupError {
    #[error("enemy {0} has no path to follow")]
    MissingPath(EntityId),
    #[error("path has {found} nodes but the group's paths have {expected}")]
    NodeCountMismatch { expected: usize, found: usize },
}

/// Enemies travelling their paths in formation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathGroup {
    pub id: GroupId,
    members: Vec<EntityId>,
    node_count: Option<usize>,
    /// All members reached their start points and were released
    pub has_begun: bool,
    pub to_be_destroyed: bool,
}

impl PathGroup {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            members: Vec::new(),
            node_count: None,
            has_begun: false,
            to_be_destroyed: false,
        }
    }

    pub fn members(&self) -> &[EntityId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Enrol an enemy whose path is already assigned
    pub fn add(&mut self, enemy: &mut Enemy) -> Result<(), PathGroupError> {
        let found = enemy
            .path
            .as_ref()
            .map(Path::len)
            .ok_or(PathGroupError::MissingPath(enemy.id))?;
        match self.node_count {
            Some(expected) if expected != found => {
                return Err(PathGroupError::NodeCountMismatch { expected, found });
            }
            _ => {}
        }
        self.node_count = Some(found);
        self.members.push(enemy.id);
        enemy.group = Some(self.id);
        Ok(())
    }

    /// Balance the members' paths against each other
    pub fn balance(&self, enemies: &mut [Enemy]) -> bool {
        let mut paths: Vec<&mut Path> = enemies
            .iter_mut()
            .filter(|e| self.members.contains(&e.id))
            .filter_map(|e| e.path.as_mut())
            .collect();
        balance_paths(&mut paths)
    }

    /// Drop members that died or left the group, then release the formation once assembled
    pub fn update(&mut self, enemies: &mut [Enemy], world: &World) {
        let id = self.id;
        let before = self.members.len();
        self.members.retain(|member| {
            enemies.iter().any(|e| {
                e.id == *member
                    && e.group == Some(id)
                    && e.path.is_some()
                    && !world.is_to_be_destroyed(e.id)
            })
        });
        if self.members.len() != before {
            self.balance(enemies);
        }
        if self.members.is_empty() {
            self.to_be_destroyed = true;
            return;
        }

        if !self.has_begun {
            let in_group = |e: &&mut Enemy| self.members.contains(&e.id);
            let all_ready = enemies
                .iter_mut()
                .filter(in_group)
                .all(|e| e.at_start_point);
            if all_ready {
                self.has_begun = true;
                for enemy in enemies.iter_mut().filter(in_group) {
                    enemy.may_follow_path = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(length: f32) -> Path {
        let mut path = Path::new();
        path.add_node(0.0, 0.0);
        path.add_node(0.0, length);
        path.add_node_synced(0.0, length + 1.0, false);
        path
    }

    #[test]
    fn test_travel_time_from_length() {
        let path = straight(1.0);
        assert!((path.nodes[1].travel_time() - 10.0).abs() < 1e-4);
        assert!((path.nodes[1].travel_speed() - ENEMY_MOVE_SPEED).abs() < 1e-6);
    }

    #[test]
    fn test_balance_uses_slowest_segment() {
        // 1.0 GU takes 10 ticks, 0.6 GU takes 6 ticks
        let mut a = straight(1.0);
        let mut b = straight(0.6);
        let b_unsynced = b.nodes[2].travel_time();

        assert!(balance_paths(&mut [&mut a, &mut b]));
        assert!((a.nodes[1].travel_time() - 10.0).abs() < 1e-4);
        assert!((b.nodes[1].travel_time() - 10.0).abs() < 1e-4);
        assert!((b.nodes[1].travel_speed() - 0.06).abs() < 1e-5);
        // Unsynced nodes keep their own timing
        assert_eq!(b.nodes[2].travel_time(), b_unsynced);
    }

    #[test]
    fn test_balance_rejects_mismatched_paths() {
        let mut a = straight(1.0);
        let mut b = Path::new();
        b.add_node(0.0, 0.0);
        assert!(!balance_paths(&mut [&mut a, &mut b]));
        assert!(!balance_paths(&mut []));
    }

    #[test]
    fn test_zero_length_segment_has_finite_speed() {
        let mut path = Path::new();
        path.add_node(1.0, 1.0);
        path.add_node(1.0, 1.0);
        assert_eq!(path.nodes[1].travel_time(), 0.0);
        assert!(path.nodes[1].travel_speed().is_finite());
    }

    #[test]
    fn test_mirror() {
        let mut path = straight(1.0);
        path.add_node(2.0, 0.0);
        path.mirror_x();
        assert_eq!(path.nodes[3].position, Vec2::new(-2.0, 0.0));
    }
}
