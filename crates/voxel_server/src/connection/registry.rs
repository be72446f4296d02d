//! Slot table of connected sessions.
//!
//! Slot indices are the public session ids. A new session takes the lowest
//! free slot, so an id freed by a disconnect is handed to the next client
//! that connects.

use super::session::{OutboundSender, Pose, Session, SessionId};
use tracing::trace;

/// Ordered table of live sessions.
///
/// Each slot is either empty or holds exactly one session. Inserts scan the
/// table linearly, which is fine for the tens to low hundreds of sessions a
/// single relay serves.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    slots: Vec<Option<Session>>,
    live: usize,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session in the first empty slot, appending one if the
    /// table is full, and returns the slot index as its id.
    pub fn insert(&mut self, pose: Pose, outbound: OutboundSender) -> SessionId {
        let id = self
            .slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.slots.len());

        let session = Session::new(id, pose, outbound);
        if id == self.slots.len() {
            self.slots.push(Some(session));
        } else {
            self.slots[id] = Some(session);
        }
        self.live += 1;

        trace!("Session {} assigned slot ({} live)", id, self.live);
        id
    }

    /// Empties the slot, leaving every other id untouched.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        let session = self.slots.get_mut(id)?.take()?;
        self.live -= 1;

        // Trailing empty slots carry no information for first-fit reuse.
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }

        Some(session)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.slots.get(id)?.as_ref()
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.slots.get_mut(id)?.as_mut()
    }

    /// Live sessions in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.slots.iter().flatten()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::outbound_channel;

    fn connect(registry: &mut ClientRegistry) -> SessionId {
        let (tx, _rx) = outbound_channel();
        registry.insert(Pose::default(), tx)
    }

    #[test]
    fn test_ids_are_assigned_in_order() {
        let mut registry = ClientRegistry::new();
        assert_eq!(connect(&mut registry), 0);
        assert_eq!(connect(&mut registry), 1);
        assert_eq!(connect(&mut registry), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_freed_slot_is_reused() {
        let mut registry = ClientRegistry::new();
        let a = connect(&mut registry);
        let b = connect(&mut registry);
        assert_eq!((a, b), (0, 1));

        assert!(registry.remove(a).is_some());
        let c = connect(&mut registry);
        assert_eq!(c, a);
        assert_eq!(registry.get(b).map(Session::id), Some(1));
    }

    #[test]
    fn test_lowest_free_slot_wins() {
        let mut registry = ClientRegistry::new();
        for _ in 0..4 {
            connect(&mut registry);
        }
        registry.remove(2);
        registry.remove(1);

        assert_eq!(connect(&mut registry), 1);
        assert_eq!(connect(&mut registry), 2);
        assert_eq!(connect(&mut registry), 4);
    }

    #[test]
    fn test_remove_does_not_renumber() {
        let mut registry = ClientRegistry::new();
        for _ in 0..3 {
            connect(&mut registry);
        }
        registry.remove(1);

        let ids: Vec<_> = registry.iter().map(Session::id).collect();
        assert_eq!(ids, vec![0, 2]);
        assert!(registry.get(1).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_unknown_or_twice() {
        let mut registry = ClientRegistry::new();
        let id = connect(&mut registry);
        assert!(registry.remove(7).is_none());
        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_trailing_slots_trimmed() {
        let mut registry = ClientRegistry::new();
        for _ in 0..3 {
            connect(&mut registry);
        }
        registry.remove(1);
        registry.remove(2);
        assert_eq!(connect(&mut registry), 1);
        assert_eq!(connect(&mut registry), 2);
    }
}
