//! Synchronous, single-threaded event delivery.
//!
//! A [`EventBus`] is a typed subscription target. Listeners run in
//! subscription order on the thread that emits; a panicking listener is
//! caught and logged so the remaining listeners still run.

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::log_warn;

/// Token returned by [`EventBus::subscribe`], usable to unsubscribe.
pub type ListenerId = u64;

type Listener<E> = Rc<dyn Fn(&E)>;

/// An ordered set of listeners for one event type.
pub struct EventBus<E> {
    listeners: RefCell<Vec<(ListenerId, Listener<E>)>>,
    next_id: Cell<ListenerId>,
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listener_count", &self.listeners.borrow().len())
            .finish()
    }
}

impl<E> EventBus<E> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Register a listener, returning a token for [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(&self, listener: impl Fn(&E) + 'static) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener. Returns whether the token was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Deliver `event` to every listener, in subscription order.
    ///
    /// The listener list is snapshotted first, so a listener may subscribe
    /// or unsubscribe without deadlocking the bus; changes take effect for
    /// the next emission. A panicking listener does not stop delivery.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| (*listener)(event))).is_err() {
                log_warn!("event listener panicked; continuing delivery");
            }
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_subscription_order() {
        let bus: EventBus<&str> = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s1 = Rc::clone(&seen);
        bus.subscribe(move |e: &&str| s1.borrow_mut().push(format!("first:{e}")));
        let s2 = Rc::clone(&seen);
        bus.subscribe(move |e: &&str| s2.borrow_mut().push(format!("second:{e}")));

        bus.emit(&"x");
        assert_eq!(&*seen.borrow(), &["first:x", "second:x"]);
    }

    #[test]
    fn unsubscribe_removes_listener() {
        let bus: EventBus<u32> = EventBus::new();
        let count = Rc::new(Cell::new(0u32));

        let c = Rc::clone(&count);
        let id = bus.subscribe(move |_| c.set(c.get() + 1));

        bus.emit(&1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(&2);

        assert_eq!(count.get(), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn panicking_listener_does_not_stop_delivery() {
        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let bus: EventBus<()> = EventBus::new();
        let reached = Rc::new(Cell::new(false));

        bus.subscribe(|_: &()| panic!("listener failure"));
        let r = Rc::clone(&reached);
        bus.subscribe(move |_| r.set(true));

        bus.emit(&());
        std::panic::set_hook(prev_hook);

        assert!(reached.get());
    }

    #[test]
    fn listener_may_subscribe_during_emit() {
        let bus: Rc<EventBus<()>> = Rc::new(EventBus::new());
        let count = Rc::new(Cell::new(0u32));

        let inner_bus = Rc::clone(&bus);
        let inner_count = Rc::clone(&count);
        bus.subscribe(move |_| {
            let c = Rc::clone(&inner_count);
            inner_bus.subscribe(move |_| c.set(c.get() + 1));
        });

        // First emit registers the counter; only the second emit bumps it.
        bus.emit(&());
        assert_eq!(count.get(), 0);
        bus.emit(&());
        assert_eq!(count.get(), 1);
    }
}
