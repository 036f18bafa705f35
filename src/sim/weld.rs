//! Undirected weld edges between bodies

use serde::{Deserialize, Serialize};

use super::world::EntityId;

/// A rigid pose coupling between two bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weld {
    pub a: EntityId,
    pub b: EntityId,
    /// Marked during a deletion cascade, removed at the next sweep
    pub to_be_destroyed: bool,
}

impl Weld {
    /// The other end of the weld, if `id` is one of its ends
    #[inline]
    pub fn partner_of(&self, id: EntityId) -> Option<EntityId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }

    #[inline]
    pub fn touches(&self, id: EntityId) -> bool {
        self.a == id || self.b == id
    }
}

/// Edge list of every weld in a world
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeldRegistry {
    welds: Vec<Weld>,
}

impl WeldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge. Self-welds and duplicates are ignored; returns whether an edge was added.
    pub fn weld(&mut self, a: EntityId, b: EntityId) -> bool {
        if a == b || self.are_welded(a, b) {
            return false;
        }
        self.welds.push(Weld {
            a,
            b,
            to_be_destroyed: false,
        });
        true
    }

    pub fn are_welded(&self, a: EntityId, b: EntityId) -> bool {
        self.welds.iter().any(|w| w.partner_of(a) == Some(b))
    }

    /// Directly welded neighbours, in weld creation order
    pub fn partners(&self, id: EntityId) -> Vec<EntityId> {
        self.welds.iter().filter_map(|w| w.partner_of(id)).collect()
    }

    pub fn has_welds(&self, id: EntityId) -> bool {
        self.welds.iter().any(|w| w.touches(id))
    }

    /// Mark every weld touching `id` for removal
    pub fn mark_touching(&mut self, id: EntityId) {
        for weld in self.welds.iter_mut().filter(|w| w.touches(id)) {
            weld.to_be_destroyed = true;
        }
    }

    /// Remove marked welds and welds touching a body for which `is_dead` holds.
    /// Returns the ends of every removed weld.
    pub fn sweep(&mut self, is_dead: impl Fn(EntityId) -> bool) -> Vec<EntityId> {
        let mut touched = Vec::new();
        self.welds.retain(|w| {
            let remove = w.to_be_destroyed || is_dead(w.a) || is_dead(w.b);
            if remove {
                touched.push(w.a);
                touched.push(w.b);
            }
            !remove
        });
        touched
    }

    pub fn len(&self) -> usize {
        self.welds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.welds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Weld> {
        self.welds.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weld_rejects_duplicates() {
        let mut registry = WeldRegistry::new();
        assert!(registry.weld(1, 2));
        assert!(!registry.weld(2, 1));
        assert!(!registry.weld(3, 3));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.partners(2), vec![1]);
    }

    #[test]
    fn test_sweep_reports_touched_ends() {
        let mut registry = WeldRegistry::new();
        registry.weld(1, 2);
        registry.weld(1, 3);
        registry.weld(4, 5);
        registry.mark_touching(2);

        let touched = registry.sweep(|id| id == 5);
        assert_eq!(registry.len(), 1);
        assert!(registry.are_welded(1, 3));
        assert!(touched.contains(&2) && touched.contains(&4));
    }
}
