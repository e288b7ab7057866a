use crate::bus::BusEvent;
use crate::record::{Record, RecordId};

/// A change notification emitted by the [`Store`](crate::Store).
///
/// Every mutating store operation emits exactly two events: first the
/// operation-specific variant, then [`StoreEvent::Change`] describing the same
/// operation. Subscribers that only care about one kind of change (a toast on
/// `ItemAdded`) and subscribers that re-render on anything (`Change`) can
/// coexist without inspecting each other's payloads.
///
/// # Examples
///
/// ```
/// use paddock::bus::BusEvent;
/// use paddock::{EventKind, Store, StoreEvent, NewRecord};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let store = Store::in_memory();
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// for kind in [EventKind::ItemAdded, EventKind::Change] {
///     let seen = seen.clone();
///     store.on(kind, move |event: &StoreEvent| {
///         seen.borrow_mut().push(event.kind());
///         Ok(())
///     });
/// }
///
/// store.add(NewRecord::new("Luigi", "Fiat 500", "#FFD700", "Tire shop owner."));
/// assert_eq!(*seen.borrow(), vec![EventKind::ItemAdded, EventKind::Change]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A record was appended by [`Store::add`](crate::Store::add).
    ItemAdded(Record),

    /// A record was patched by [`Store::update`](crate::Store::update).
    ItemUpdated { old: Record, new: Record },

    /// A record was removed by [`Store::remove`](crate::Store::remove).
    ItemRemoved(Record),

    /// The collection was replaced by [`Store::reset`](crate::Store::reset).
    Reset(Vec<Record>),

    /// The collection was emptied by [`Store::clear`](crate::Store::clear);
    /// carries the records that were dropped.
    Cleared(Vec<Record>),

    /// The collection was replaced from durable storage.
    Loaded(Vec<Record>),

    /// Generic notification, always emitted after the specific event.
    Change(Change),
}

/// What a [`StoreEvent::Change`] describes.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Add { item: Record },
    Update { id: RecordId, old: Record, new: Record },
    Remove { item: Record },
    Reset { data: Vec<Record> },
    Clear { old: Vec<Record> },
    Load { data: Vec<Record> },
}

impl Change {
    /// Short name of the operation (`"add"`, `"update"`, ...).
    pub fn op(&self) -> &'static str {
        match self {
            Change::Add { .. } => "add",
            Change::Update { .. } => "update",
            Change::Remove { .. } => "remove",
            Change::Reset { .. } => "reset",
            Change::Clear { .. } => "clear",
            Change::Load { .. } => "load",
        }
    }
}

/// Subscription key for [`StoreEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ItemAdded,
    ItemUpdated,
    ItemRemoved,
    Reset,
    Cleared,
    Loaded,
    Change,
}

impl BusEvent for StoreEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            StoreEvent::ItemAdded(_) => EventKind::ItemAdded,
            StoreEvent::ItemUpdated { .. } => EventKind::ItemUpdated,
            StoreEvent::ItemRemoved(_) => EventKind::ItemRemoved,
            StoreEvent::Reset(_) => EventKind::Reset,
            StoreEvent::Cleared(_) => EventKind::Cleared,
            StoreEvent::Loaded(_) => EventKind::Loaded,
            StoreEvent::Change(_) => EventKind::Change,
        }
    }
}
