//! Latest-snapshot store on the render side.
//!
//! The store keeps exactly one snapshot and overwrites it on every update;
//! intermediate frames that were never rendered are simply gone. Readers take
//! an `Arc` to the current snapshot, so a render pass always iterates one
//! complete snapshot even if an update lands while it runs.

use crate::simulation::EntityState;
use std::sync::Arc;

/// Handle returned by [`StateStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&[EntityState])>;

pub struct StateStore {
    current: Arc<[EntityState]>,
    cleared: bool,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    updates: u64,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            current: Arc::from(Vec::new()),
            cleared: true,
            subscribers: Vec::new(),
            next_subscription: 0,
            updates: 0,
        }
    }

    /// Replace the stored snapshot and notify every subscriber.
    pub fn update(&mut self, snapshot: Vec<EntityState>) {
        let snapshot: Arc<[EntityState]> = snapshot.into();
        self.current = Arc::clone(&snapshot);
        self.cleared = false;
        self.updates += 1;
        self.notify(&snapshot);
    }

    /// Drop the stored snapshot immediately and notify every subscriber.
    pub fn clear(&mut self) {
        if !self.current.is_empty() {
            self.current = Arc::from(Vec::new());
        }
        self.cleared = true;
        self.notify(&[]);
    }

    fn notify(&mut self, entities: &[EntityState]) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber(entities);
        }
    }

    /// The current snapshot, or an empty one after a clear.
    pub fn current(&self) -> Arc<[EntityState]> {
        Arc::clone(&self.current)
    }

    /// True from a clear (or creation) until the next update.
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    /// Total number of updates since creation.
    pub fn update_count(&self) -> u64 {
        self.updates
    }

    /// Register a callback fired on every update and clear.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&[EntityState]) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Dimensions;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn entities(n: u32) -> Vec<EntityState> {
        (0..n)
            .map(|id| EntityState {
                id,
                position: Vec3::splat(id as f32),
                dimensions: Dimensions::new(1.0, 2.0, 3.0),
                rotation_y: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_starts_empty() {
        let store = StateStore::new();
        assert!(store.is_cleared());
        assert!(store.current().is_empty());
        assert_eq!(store.update_count(), 0);
    }

    #[test]
    fn test_update_overwrites() {
        let mut store = StateStore::new();
        store.update(entities(5));
        store.update(entities(2));

        assert_eq!(store.current().len(), 2);
        assert_eq!(store.update_count(), 2);
        assert!(!store.is_cleared());
    }

    #[test]
    fn test_clear_is_immediate() {
        let mut store = StateStore::new();
        store.update(entities(3));
        store.clear();

        assert!(store.is_cleared());
        assert!(store.current().is_empty());
        assert!(store.current().is_empty());
    }

    #[test]
    fn test_captured_snapshot_survives_update() {
        let mut store = StateStore::new();
        store.update(entities(4));
        let captured = store.current();

        store.update(entities(1));
        store.clear();

        assert_eq!(captured.len(), 4);
        assert_eq!(captured[3].id, 3);
    }

    #[test]
    fn test_subscribers_see_updates_and_clears() {
        let mut store = StateStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let id = store.subscribe(move |entities| sink.borrow_mut().push(entities.len()));

        store.update(entities(3));
        store.clear();
        store.update(entities(7));
        assert_eq!(*seen.borrow(), vec![3, 0, 7]);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.update(entities(1));
        assert_eq!(seen.borrow().len(), 3);
    }
}
