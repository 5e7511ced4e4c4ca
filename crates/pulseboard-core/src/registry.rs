//! Session registry: the owner of participant record lifetimes.
//!
//! Records are created when a connection is accepted and removed when it
//! closes. Handlers and the tick sweep borrow records through this API;
//! nothing else holds onto them.
//!
//! Iteration follows the order in which `create` was called, not id
//! order. Ids are minted by the socket tasks, so two connections can
//! reach the presence loop in the opposite order to their ids. Each
//! record therefore gets an arrival slot, and the records are keyed by
//! slot.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use pulseboard_types::structs::MAX_TINT;
use pulseboard_types::{ConnectionId, Participant, Position};
use rand::Rng;

use crate::config::PresenceConfig;

/// In-memory map from connection id to participant record.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    records: BTreeMap<u64, Participant>,
    slots: HashMap<ConnectionId, u64>,
    next_slot: u64,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record for `id` with a random tint and a random
    /// position inside the configured spawn square.
    ///
    /// An existing record under the same id is overwritten in place and
    /// keeps its position in iteration order. Connection ids are unique
    /// per process, so this only happens if the transport reuses one.
    pub fn create(
        &mut self,
        id: ConnectionId,
        now: u64,
        rules: &PresenceConfig,
        rng: &mut impl Rng,
    ) -> &Participant {
        let tint = rng.random_range(0..=MAX_TINT);
        let position = Position::new(
            spawn_coordinate(rules, rng),
            spawn_coordinate(rules, rng),
        );
        let record = Participant::new(id, tint, position, now);

        let next = &mut self.next_slot;
        let slot = *self.slots.entry(id).or_insert_with(|| {
            let slot = *next;
            *next = next.saturating_add(1);
            slot
        });
        match self.records.entry(slot) {
            Entry::Occupied(mut existing) => {
                existing.insert(record);
                existing.into_mut()
            }
            Entry::Vacant(empty) => empty.insert(record),
        }
    }

    /// Look up a record.
    pub fn get(&self, id: ConnectionId) -> Option<&Participant> {
        self.slots.get(&id).and_then(|slot| self.records.get(slot))
    }

    /// Look up a record for mutation.
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Participant> {
        let slot = self.slots.get(&id)?;
        self.records.get_mut(slot)
    }

    /// Remove a record. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Participant> {
        let slot = self.slots.remove(&id)?;
        self.records.remove(&slot)
    }

    /// Whether a record exists for `id`.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.slots.contains_key(&id)
    }

    /// All records in connection order.
    pub fn values(&self) -> impl Iterator<Item = &Participant> {
        self.records.values()
    }

    /// All records in connection order, mutably. Used by the tick sweep.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.records.values_mut()
    }

    /// Number of connected participants, named or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no participant is connected.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn spawn_coordinate(rules: &PresenceConfig, rng: &mut impl Rng) -> f64 {
    if rules.spawn_max > rules.spawn_min {
        rng.random_range(rules.spawn_min..rules.spawn_max)
    } else {
        rules.spawn_min
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(11)
    }

    #[test]
    fn create_uses_defaults_and_spawn_region() {
        let rules = PresenceConfig::default();
        let mut registry = SessionRegistry::new();
        let id = ConnectionId::new();

        let record = registry.create(id, 500, &rules, &mut rng()).clone();

        assert_eq!(record.id, id);
        assert!(!record.is_named());
        assert_eq!(record.last_movement_at, 500);
        assert!(record.tint <= MAX_TINT);
        for coord in [record.position.x, record.position.y] {
            assert!((200.0..500.0).contains(&coord), "spawned at {coord}");
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn degenerate_spawn_region_uses_lower_bound() {
        let rules = PresenceConfig {
            spawn_min: 42.0,
            spawn_max: 42.0,
            ..PresenceConfig::default()
        };
        let mut registry = SessionRegistry::new();
        let record = registry.create(ConnectionId::new(), 0, &rules, &mut rng());
        assert!((record.position.x - 42.0).abs() < f64::EPSILON);
        assert!((record.position.y - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn create_overwrites_existing_id() {
        let rules = PresenceConfig::default();
        let mut registry = SessionRegistry::new();
        let id = ConnectionId::new();
        let mut rng = rng();

        registry.create(id, 0, &rules, &mut rng);
        if let Some(p) = registry.get_mut(id) {
            p.display_name = Some(String::from("Ann"));
        }
        registry.create(id, 10, &rules, &mut rng);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(id).map(Participant::is_named), Some(false));
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut registry = SessionRegistry::new();
        assert!(registry.remove(ConnectionId::new()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn values_follow_connection_order() {
        let rules = PresenceConfig::default();
        let mut registry = SessionRegistry::new();
        let mut rng = rng();
        let ids: Vec<ConnectionId> = (0..5).map(|_| ConnectionId::new()).collect();
        for id in &ids {
            registry.create(*id, 0, &rules, &mut rng);
        }
        registry.remove(ids[2]);

        let order: Vec<ConnectionId> = registry.values().map(|p| p.id).collect();
        assert_eq!(order, vec![ids[0], ids[1], ids[3], ids[4]]);
    }

    #[test]
    fn order_is_arrival_not_id_order() {
        let rules = PresenceConfig::default();
        let mut registry = SessionRegistry::new();
        let mut rng = rng();
        let minted_first = ConnectionId::new();
        let minted_second = ConnectionId::new();
        assert!(minted_first < minted_second);

        // The later id reaches the loop first.
        registry.create(minted_second, 0, &rules, &mut rng);
        registry.create(minted_first, 1, &rules, &mut rng);

        let order: Vec<ConnectionId> = registry.values().map(|p| p.id).collect();
        assert_eq!(order, vec![minted_second, minted_first]);
    }

    #[test]
    fn reconnect_after_remove_goes_last() {
        let rules = PresenceConfig::default();
        let mut registry = SessionRegistry::new();
        let mut rng = rng();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        registry.create(a, 0, &rules, &mut rng);
        registry.create(b, 0, &rules, &mut rng);

        registry.remove(a);
        registry.create(a, 5, &rules, &mut rng);

        let order: Vec<ConnectionId> = registry.values().map(|p| p.id).collect();
        assert_eq!(order, vec![b, a]);
        assert!(registry.contains(a));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn overwrite_keeps_position_in_order() {
        let rules = PresenceConfig::default();
        let mut registry = SessionRegistry::new();
        let mut rng = rng();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        registry.create(a, 0, &rules, &mut rng);
        registry.create(b, 0, &rules, &mut rng);
        registry.create(a, 9, &rules, &mut rng);

        let order: Vec<ConnectionId> = registry.values().map(|p| p.id).collect();
        assert_eq!(order, vec![a, b]);
        assert_eq!(registry.get(a).map(|p| p.last_movement_at), Some(9));
    }
}
