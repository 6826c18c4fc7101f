//! Transient targets and the registry that owns them
//!
//! Pigs, notes and fences all share the same small lifecycle. The per-game
//! payload (hole index, lane, fence geometry) lives in the generic body.

use serde::{Deserialize, Serialize};

/// Unique within a session, assigned in increasing order
pub type EntityId = u32;

/// How an entity left play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Player got it
    Hit,
    /// It got away from the player
    Missed,
    /// Timed out without anyone caring (an untouched hazard)
    Expired,
}

/// Per-entity state machine. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    Hidden,
    Approaching,
    Active,
    Resolved(Resolution),
}

impl Lifecycle {
    fn rank(&self) -> u8 {
        match self {
            Lifecycle::Hidden => 0,
            Lifecycle::Approaching => 1,
            Lifecycle::Active => 2,
            Lifecycle::Resolved(_) => 3,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Lifecycle::Resolved(_))
    }
}

/// A transient target with a per-game body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity<B> {
    pub id: EntityId,
    /// Exact audio time to align with the hit line, or the expiry deadline
    pub anchor: f64,
    state: Lifecycle,
    pub body: B,
}

impl<B> Entity<B> {
    pub fn new(id: EntityId, anchor: f64, body: B) -> Self {
        Self {
            id,
            anchor,
            state: Lifecycle::Hidden,
            body,
        }
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == Lifecycle::Active
    }

    pub fn is_resolved(&self) -> bool {
        self.state.is_resolved()
    }

    /// Hidden -> Approaching. Returns false if the entity is already further along.
    pub fn approach(&mut self) -> bool {
        self.advance(Lifecycle::Approaching)
    }

    /// Hidden/Approaching -> Active
    pub fn activate(&mut self) -> bool {
        self.advance(Lifecycle::Active)
    }

    /// Active -> Resolved. Entities that never became active, or that are
    /// already resolved, are left alone and this returns false.
    pub fn resolve(&mut self, how: Resolution) -> bool {
        self.advance(Lifecycle::Resolved(how))
    }

    fn advance(&mut self, next: Lifecycle) -> bool {
        if next.rank() <= self.state.rank() {
            return false;
        }
        if next.is_resolved() && self.state != Lifecycle::Active {
            return false;
        }
        self.state = next;
        true
    }
}

/// Owns every live entity of one session, kept sorted by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRegistry<B> {
    entities: Vec<Entity<B>>,
    next_id: EntityId,
}

impl<B> Default for EntityRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> EntityRegistry<B> {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            next_id: 1,
        }
    }

    /// Add a new hidden entity and return its id
    pub fn spawn(&mut self, anchor: f64, body: B) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.entities.push(Entity::new(id, anchor, body));
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity<B>> {
        self.entities
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|i| &self.entities[i])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity<B>> {
        self.entities
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|i| &mut self.entities[i])
    }

    pub fn find(&self, mut pred: impl FnMut(&Entity<B>) -> bool) -> Option<&Entity<B>> {
        self.entities.iter().find(|e| pred(e))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity<B>> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity<B>> {
        self.entities.iter_mut()
    }

    pub fn retain(&mut self, keep: impl FnMut(&Entity<B>) -> bool) {
        self.entities.retain(keep);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity<B>> {
        let idx = self.entities.binary_search_by_key(&id, |e| e.id).ok()?;
        Some(self.entities.remove(idx))
    }

    pub fn last(&self) -> Option<&Entity<B>> {
        self.entities.last()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Drop every entity. Ids keep counting up.
    pub fn clear(&mut self) {
        self.entities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_only_moves_forward() {
        let mut e = Entity::new(1, 0.0, ());
        assert_eq!(e.state(), Lifecycle::Hidden);
        assert!(e.approach());
        assert!(e.activate());
        assert!(!e.approach());
        assert!(e.resolve(Resolution::Hit));
        assert!(!e.activate());
        assert_eq!(e.state(), Lifecycle::Resolved(Resolution::Hit));
    }

    #[test]
    fn slot_entities_may_pop_straight_up() {
        let mut e = Entity::new(1, 0.0, ());
        assert!(e.activate());
        assert!(e.is_active());
    }

    #[test]
    fn resolving_twice_is_a_no_op() {
        let mut e = Entity::new(7, 0.0, ());
        e.activate();
        assert!(e.resolve(Resolution::Missed));
        assert!(!e.resolve(Resolution::Hit));
        assert_eq!(e.state(), Lifecycle::Resolved(Resolution::Missed));
    }

    #[test]
    fn only_active_entities_resolve() {
        let mut e = Entity::new(3, 0.0, ());
        assert!(!e.resolve(Resolution::Hit));
        e.approach();
        assert!(!e.resolve(Resolution::Missed));
        assert_eq!(e.state(), Lifecycle::Approaching);
        assert!(e.activate());
        assert!(e.resolve(Resolution::Hit));
    }

    #[test]
    fn registry_ids_are_monotonic_across_clear() {
        let mut reg: EntityRegistry<u8> = EntityRegistry::new();
        let a = reg.spawn(0.0, 1);
        let b = reg.spawn(0.0, 2);
        assert!(b > a);
        assert_eq!(reg.get(b).map(|e| e.body), Some(2));

        reg.clear();
        let c = reg.spawn(0.0, 3);
        assert!(c > b);
        assert_eq!(reg.len(), 1);
        assert!(reg.get(a).is_none());
        assert_eq!(reg.remove(c).map(|e| e.body), Some(3));
        assert!(reg.is_empty());
    }
}
