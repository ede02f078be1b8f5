//! Synchronous, registration-ordered publish/subscribe channel.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::types::{Event, EventType};

/// A subscriber callback. Listeners receive the event by shared reference.
pub type Listener = Rc<dyn Fn(&Event)>;

/// Handle returned by [`EventBus::add`], used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: BTreeMap<EventType, Vec<(ListenerId, Listener)>>,
}

/// Fan-out of [`Event`]s to listeners keyed by [`EventType`].
///
/// Cloning the bus yields another handle onto the same listener table, so the
/// undo stack, the layer manager and the application can all publish on it.
/// Delivery is immediate: listeners run inside [`EventBus::fire`], in the order
/// they were added. The listener list is captured before delivery starts, so a
/// listener may add or remove listeners; the change applies to the next fire.
///
/// A panicking listener is not caught and stops delivery to later listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<ListenerTable>>,
}

impl EventBus {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one event type.
    pub fn add<F>(&self, event_type: EventType, listener: F) -> ListenerId
    where
        F: Fn(&Event) + 'static,
    {
        let mut table = self.inner.borrow_mut();
        let id = ListenerId(table.next_id);
        table.next_id += 1;
        log::trace!("EventBus: add listener {:?} for '{}'", id, event_type);
        table
            .listeners
            .entry(event_type)
            .or_default()
            .push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered for this type.
    pub fn remove(&self, event_type: &EventType, id: ListenerId) -> bool {
        let mut table = self.inner.borrow_mut();
        let Some(list) = table.listeners.get_mut(event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|(listener_id, _)| *listener_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            table.listeners.remove(event_type);
        }
        removed
    }

    /// Deliver an event to every listener of its type.
    pub fn fire(&self, event: &Event) {
        let event_type = event.event_type();
        let snapshot: Vec<Listener> = {
            let table = self.inner.borrow();
            match table.listeners.get(&event_type) {
                Some(list) => list.iter().map(|(_, l)| Rc::clone(l)).collect(),
                None => return,
            }
        };
        for listener in snapshot {
            listener(event);
        }
    }

    /// Number of listeners registered for a type.
    pub fn listener_count(&self, event_type: &EventType) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Whether two handles share the same listener table.
    pub fn same_bus(&self, other: &EventBus) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("types", &table.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadType;

    fn load_event() -> Event {
        Event::Load {
            load_type: LoadType::Image,
        }
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Rc::clone(&seen);
            bus.add(EventType::Load, move |_| seen.borrow_mut().push(tag));
        }

        bus.fire(&load_event());
        assert_eq!(*seen.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_only_matching_type_is_called() {
        let bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        bus.add(EventType::LoadEnd, move |_| *c.borrow_mut() += 1);

        bus.fire(&load_event());
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn test_remove_listener() {
        let bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = bus.add(EventType::Load, move |_| *c.borrow_mut() += 1);

        bus.fire(&load_event());
        assert!(bus.remove(&EventType::Load, id));
        assert!(!bus.remove(&EventType::Load, id));
        bus.fire(&load_event());

        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.listener_count(&EventType::Load), 0);
    }

    #[test]
    fn test_listener_added_during_fire_waits_for_next_fire() {
        let bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));

        let inner_bus = bus.clone();
        let c = Rc::clone(&count);
        bus.add(EventType::Load, move |_| {
            let c = Rc::clone(&c);
            inner_bus.add(EventType::Load, move |_| *c.borrow_mut() += 1);
        });

        bus.fire(&load_event());
        assert_eq!(*count.borrow(), 0);
        bus.fire(&load_event());
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_clones_share_listeners() {
        let bus = EventBus::new();
        let other = bus.clone();
        other.add(EventType::Load, |_| {});
        assert!(bus.same_bus(&other));
        assert_eq!(bus.listener_count(&EventType::Load), 1);
        assert!(!bus.same_bus(&EventBus::new()));
    }
}
