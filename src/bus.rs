//! Typed, synchronous publish/subscribe.
//!
//! Handlers are registered per event kind and invoked on the emitting call,
//! in registration order. A handler that returns an error or panics is logged
//! and skipped; the emitter and the remaining handlers are unaffected.
//!
//! The bus is single-threaded: it is built on `Rc`, so every handler and
//! every emit live on the thread that owns the store.

use log::{error, warn};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

/// An event that can be dispatched through an [`EventBus`].
///
/// `Kind` is the subscription key: handlers registered for a kind receive
/// every event whose [`kind`](BusEvent::kind) equals it.
pub trait BusEvent: 'static {
    type Kind: Copy + Eq + Hash + fmt::Debug + 'static;

    fn kind(&self) -> Self::Kind;
}

/// Error type handlers may return.
pub type HandlerError = Box<dyn std::error::Error>;

/// Return type of every handler.
pub type HandlerResult = Result<(), HandlerError>;

type Handler<E> = Rc<RefCell<dyn FnMut(&E) -> HandlerResult>>;

/// Identity of one registration, returned by [`EventBus::on`] and used by
/// [`EventBus::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registry<E: BusEvent> {
    next_id: u64,
    handlers: HashMap<E::Kind, Vec<(SubscriptionId, Handler<E>)>>,
}

impl<E: BusEvent> Registry<E> {
    fn allocate(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// A handle to a shared handler registry.
///
/// Cloning the bus yields another handle to the same registry, so a handler
/// can hold a clone and subscribe or unsubscribe while an event is being
/// dispatched. Changes made during a dispatch take effect from the next
/// [`emit`](EventBus::emit).
///
/// # Examples
///
/// ```
/// use paddock::bus::{BusEvent, EventBus};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// struct Ping;
/// impl BusEvent for Ping {
///     type Kind = ();
///     fn kind(&self) {}
/// }
///
/// let bus = EventBus::<Ping>::new();
/// let hits = Rc::new(Cell::new(0));
/// let counter = hits.clone();
/// bus.once((), move |_| {
///     counter.set(counter.get() + 1);
///     Ok(())
/// });
///
/// bus.emit(&Ping);
/// bus.emit(&Ping);
/// assert_eq!(hits.get(), 1);
/// ```
pub struct EventBus<E: BusEvent> {
    inner: Rc<RefCell<Registry<E>>>,
}

impl<E: BusEvent> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        EventBus {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.borrow();
        let mut map = f.debug_map();
        for (kind, handlers) in &registry.handlers {
            map.entry(kind, &handlers.len());
        }
        map.finish()
    }
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        EventBus {
            inner: Rc::new(RefCell::new(Registry {
                next_id: 0,
                handlers: HashMap::new(),
            })),
        }
    }

    /// Register `handler` for events of `kind`.
    pub fn on<F>(&self, kind: E::Kind, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) -> HandlerResult + 'static,
    {
        let handler: Handler<E> = Rc::new(RefCell::new(handler));
        let mut registry = self.inner.borrow_mut();
        let id = registry.allocate();
        registry.handlers.entry(kind).or_default().push((id, handler));
        id
    }

    /// Register `handler` for a single invocation.
    ///
    /// The handler is wrapped in an ordinary subscription that removes itself
    /// when first called, so it fires in the same position as an
    /// [`on`](Self::on) registration made at the same time.
    pub fn once<F>(&self, kind: E::Kind, handler: F) -> SubscriptionId
    where
        F: FnOnce(&E) -> HandlerResult + 'static,
    {
        let registry: Weak<RefCell<Registry<E>>> = Rc::downgrade(&self.inner);
        let id = self.inner.borrow_mut().allocate();
        let mut pending = Some(handler);

        let wrapper = move |event: &E| -> HandlerResult {
            let Some(handler) = pending.take() else {
                return Ok(());
            };
            if let Some(inner) = registry.upgrade() {
                EventBus { inner }.off(kind, id);
            }
            handler(event)
        };

        let wrapper: Handler<E> = Rc::new(RefCell::new(wrapper));
        self.inner
            .borrow_mut()
            .handlers
            .entry(kind)
            .or_default()
            .push((id, wrapper));
        id
    }

    /// Remove the registration `id` for `kind`. Returns `false` if it was not
    /// registered.
    pub fn off(&self, kind: E::Kind, id: SubscriptionId) -> bool {
        let mut registry = self.inner.borrow_mut();
        let Some(handlers) = registry.handlers.get_mut(&kind) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(sub, _)| *sub != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            registry.handlers.remove(&kind);
        }
        removed
    }

    /// Dispatch `event` to every handler registered for its kind.
    ///
    /// Runs synchronously. Handler errors and panics are logged and never
    /// propagate to the caller.
    pub fn emit(&self, event: &E) {
        let kind = event.kind();
        let handlers: Vec<(SubscriptionId, Handler<E>)> =
            match self.inner.borrow().handlers.get(&kind) {
                Some(handlers) => handlers.clone(),
                None => return,
            };

        for (id, handler) in handlers {
            let Ok(mut handler) = handler.try_borrow_mut() else {
                warn!("paddock: handler {id:?} for {kind:?} re-entered its dispatch, skipping");
                continue;
            };

            match panic::catch_unwind(AssertUnwindSafe(|| (*handler)(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("paddock: handler {id:?} for {kind:?} failed: {e}");
                }
                Err(payload) => {
                    error!(
                        "paddock: handler {id:?} for {kind:?} panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
    }

    /// Number of handlers currently registered for `kind`.
    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.inner
            .borrow()
            .handlers
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Remove every registration.
    pub fn clear(&self) {
        self.inner.borrow_mut().handlers.clear();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug)]
    struct Note(&'static str);

    impl BusEvent for Note {
        type Kind = &'static str;
        fn kind(&self) -> &'static str {
            self.0
        }
    }

    #[test]
    fn off_unknown_kind_is_false() {
        let bus = EventBus::<Note>::new();
        let id = bus.on("a", |_| Ok(()));
        assert!(!bus.off("b", id));
        assert!(bus.off("a", id));
        assert!(!bus.off("a", id));
        assert_eq!(bus.handler_count("a"), 0);
    }

    #[test]
    fn subscribe_during_dispatch_applies_to_next_emit() {
        let bus = EventBus::<Note>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let handle = bus.clone();
        let log = seen.clone();
        bus.once("a", move |_| {
            let log = log.clone();
            handle.on("a", move |_| {
                log.borrow_mut().push("late");
                Ok(())
            });
            Ok(())
        });

        bus.emit(&Note("a"));
        assert!(seen.borrow().is_empty());
        bus.emit(&Note("a"));
        assert_eq!(*seen.borrow(), vec!["late"]);
    }

    #[test]
    fn panic_message_extracts_strings() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
