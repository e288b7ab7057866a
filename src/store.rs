use crate::bus::{EventBus, HandlerResult, SubscriptionId};
use crate::event::{Change, EventKind, StoreEvent};
use crate::record::{NewRecord, Record, RecordField, RecordId, RecordPatch};
use crate::remote::RemoteSource;
use crate::storage::{Storage, keys};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

struct State {
    records: Vec<Record>,
    /// `None` once an id of `u64::MAX` has been handed out or loaded.
    next_id: Option<u64>,
    last_stamp: Option<DateTime<Utc>>,
}

impl State {
    fn new() -> Self {
        State {
            records: Vec::new(),
            next_id: Some(1),
            last_stamp: None,
        }
    }

    fn allocate_id(&mut self) -> RecordId {
        match self.next_id {
            Some(id) => {
                self.next_id = id.checked_add(1);
                RecordId(id)
            }
            None => {
                let id = self.smallest_unused_id();
                warn!("paddock: id space exhausted, reusing free id {id}");
                id
            }
        }
    }

    /// Raise `next_id` above every id currently held.
    fn sync_next_id(&mut self) {
        let max = self.records.iter().map(|r| r.id.0).max().unwrap_or(0);
        self.next_id = match (self.next_id, max.checked_add(1)) {
            (Some(next), Some(floor)) => Some(next.max(floor)),
            _ => None,
        };
    }

    fn smallest_unused_id(&self) -> RecordId {
        let used: HashSet<u64> = self.records.iter().map(|r| r.id.0).collect();
        (1..=u64::MAX)
            .find(|id| !used.contains(id))
            .map_or(RecordId(0), RecordId)
    }

    /// A timestamp strictly after every stamp this store has issued and
    /// strictly after `after`.
    fn stamp(&mut self, after: Option<DateTime<Utc>>) -> DateTime<Utc> {
        let mut now = Utc::now();
        for floor in [self.last_stamp, after].into_iter().flatten() {
            if now <= floor {
                now = floor + Duration::milliseconds(1);
            }
        }
        self.last_stamp = Some(now);
        now
    }

    fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }
}

/// Summary counts over the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total: usize,
    pub favorites: usize,
    pub unique_types: usize,
    pub unique_hometowns: usize,
}

/// The reactive, persisted record collection.
///
/// `Store` is the only path through which the collection changes. Every
/// mutating operation updates the in-memory collection, emits the
/// operation-specific [`StoreEvent`], emits [`StoreEvent::Change`], and then
/// writes the full snapshot through the [`Storage`] gateway, in that order.
/// A handler reacting to either event therefore sees the collection already
/// updated.
///
/// `Store` is a cheap handle: clones share the collection, the event bus and
/// the storage, so a handler can capture a clone and read the store while an
/// event is being dispatched.
///
/// Lookup misses are not errors: [`update`](Self::update) and
/// [`remove`](Self::remove) return `None` for an unknown id and emit nothing.
///
/// # Examples
///
/// ```
/// use paddock::{NewRecord, RecordPatch, Store};
///
/// let store = Store::in_memory();
/// let doc = store.add(NewRecord::new(
///     "Doc Hudson",
///     "Hudson Hornet 1951",
///     "#2F4F4F",
///     "Town doctor and former champion.",
/// ));
///
/// let updated = store.update(doc.id, RecordPatch::new().with_favorite(true)).unwrap();
/// assert!(updated.is_favorite);
/// assert_eq!(updated.created_at, doc.created_at);
/// assert!(updated.updated_at > doc.updated_at);
///
/// assert_eq!(store.search("hornet", &[]).len(), 1);
/// assert!(store.remove(doc.id).is_some());
/// assert!(store.remove(doc.id).is_none());
/// ```
#[derive(Clone)]
pub struct Store {
    state: Rc<RefCell<State>>,
    bus: EventBus<StoreEvent>,
    storage: Storage,
    key: Rc<str>,
    mirror: Option<Rc<dyn RemoteSource>>,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Store")
            .field("key", &self.key)
            .field("records", &state.records.len())
            .field("next_id", &state.next_id)
            .field("bus", &self.bus)
            .finish()
    }
}

impl Store {
    /// Create an empty store persisting under [`keys::RECORDS`].
    ///
    /// Nothing is read from storage until
    /// [`load_from_storage`](Self::load_from_storage) is called, so handlers
    /// can be attached first and observe the `Loaded` event.
    pub fn new(storage: Storage) -> Self {
        Store {
            state: Rc::new(RefCell::new(State::new())),
            bus: EventBus::new(),
            storage,
            key: Rc::from(keys::RECORDS),
            mirror: None,
        }
    }

    /// A store over fresh in-memory storage.
    pub fn in_memory() -> Self {
        Store::new(Storage::in_memory())
    }

    /// Persist under `key` instead of [`keys::RECORDS`].
    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Rc::from(key);
        self
    }

    /// Push every snapshot to `mirror` after the local save. Mirror failures
    /// are logged and otherwise ignored.
    pub fn with_mirror(mut self, mirror: Rc<dyn RemoteSource>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Append a record, assigning its id and timestamps.
    pub fn add(&self, new: NewRecord) -> Record {
        let record = {
            let mut state = self.state.borrow_mut();
            let id = state.allocate_id();
            let now = state.stamp(None);
            let record = new.into_record(id, now);
            state.records.push(record.clone());
            record
        };
        debug!("paddock: added record {}", record.id);

        self.commit(
            StoreEvent::ItemAdded(record.clone()),
            Change::Add {
                item: record.clone(),
            },
        );
        record
    }

    /// Shallow-merge `patch` into the record `id` and refresh its
    /// `updatedAt`. Returns `None` if no such record exists.
    pub fn update(&self, id: RecordId, patch: RecordPatch) -> Option<Record> {
        let (old, new) = {
            let mut state = self.state.borrow_mut();
            let index = state.position(id)?;
            let old = state.records[index].clone();
            let stamp = state.stamp(old.updated_at);

            let record = &mut state.records[index];
            record.apply(patch);
            record.updated_at = Some(stamp);
            (old, record.clone())
        };
        debug!("paddock: updated record {id}");

        self.commit(
            StoreEvent::ItemUpdated {
                old: old.clone(),
                new: new.clone(),
            },
            Change::Update {
                id,
                old,
                new: new.clone(),
            },
        );
        Some(new)
    }

    /// Flip `isFavorite` on the record `id`.
    pub fn toggle_favorite(&self, id: RecordId) -> Option<Record> {
        let current = self.get_by_id(id)?;
        self.update(id, RecordPatch::new().with_favorite(!current.is_favorite))
    }

    /// Remove the record `id`. Returns the removed record, or `None` if no
    /// such record exists.
    pub fn remove(&self, id: RecordId) -> Option<Record> {
        let removed = {
            let mut state = self.state.borrow_mut();
            let index = state.position(id)?;
            state.records.remove(index)
        };
        debug!("paddock: removed record {id}");

        self.commit(
            StoreEvent::ItemRemoved(removed.clone()),
            Change::Remove {
                item: removed.clone(),
            },
        );
        Some(removed)
    }

    /// Replace the whole collection with copies of `records`.
    ///
    /// Records sharing an id with an earlier record in `records` are dropped
    /// with a warning.
    pub fn reset(&self, records: &[Record]) {
        let data = dedup_ids(records);
        {
            let mut state = self.state.borrow_mut();
            state.records = data.clone();
            state.sync_next_id();
        }
        debug!("paddock: reset to {} records", data.len());

        self.commit(
            StoreEvent::Reset(data.clone()),
            Change::Reset { data },
        );
    }

    /// Remove every record.
    pub fn clear(&self) {
        let old = std::mem::take(&mut self.state.borrow_mut().records);
        debug!("paddock: cleared {} records", old.len());

        self.commit(
            StoreEvent::Cleared(old.clone()),
            Change::Clear { old },
        );
    }

    /// Replace the in-memory collection with the stored snapshot, if a
    /// non-empty one exists. Emits `Loaded` then `Change`; does not write
    /// back. Returns whether anything was loaded.
    pub fn load_from_storage(&self) -> bool {
        let saved: Vec<Record> = self.storage.load(&self.key, Vec::new());
        if saved.is_empty() {
            return false;
        }

        let data = dedup_ids(&saved);
        {
            let mut state = self.state.borrow_mut();
            state.records = data.clone();
            state.sync_next_id();
        }
        debug!("paddock: loaded {} records from {:?}", data.len(), self.key);

        self.bus.emit(&StoreEvent::Loaded(data.clone()));
        self.bus.emit(&StoreEvent::Change(Change::Load { data }));
        true
    }

    /// Write the full snapshot to storage, then push it to the mirror if one
    /// is configured. Runs after every mutation; returns whether the local
    /// write succeeded.
    pub fn save_to_storage(&self) -> bool {
        let snapshot = self.state.borrow().records.clone();
        let saved = self.storage.save(&self.key, &snapshot);

        if let Some(mirror) = &self.mirror {
            match mirror.save_records(&snapshot) {
                Ok(count) => debug!("paddock: mirrored {count} records"),
                Err(e) => warn!("paddock: mirror save failed: {e}"),
            }
        }
        saved
    }

    fn commit(&self, specific: StoreEvent, change: Change) {
        self.bus.emit(&specific);
        self.bus.emit(&StoreEvent::Change(change));
        self.save_to_storage();
    }

    /// A copy of every record, in insertion order.
    pub fn get_all(&self) -> Vec<Record> {
        self.state.borrow().records.clone()
    }

    pub fn get_by_id(&self, id: RecordId) -> Option<Record> {
        let state = self.state.borrow();
        state.records.iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().records.is_empty()
    }

    /// Records where any of `fields` contains `query`, case-insensitively.
    ///
    /// An empty `fields` searches every string-typed field. An empty query
    /// returns the whole collection.
    pub fn search(&self, query: &str, fields: &[RecordField]) -> Vec<Record> {
        if query.is_empty() {
            return self.get_all();
        }

        let needle = query.to_lowercase();
        let all = RecordField::ALL;
        let fields = if fields.is_empty() { &all[..] } else { fields };

        self.filter(|record| {
            fields.iter().any(|&field| {
                record
                    .field(field)
                    .is_some_and(|value| value.to_lowercase().contains(&needle))
            })
        })
    }

    /// Records matching `predicate`, in insertion order.
    pub fn filter(&self, predicate: impl Fn(&Record) -> bool) -> Vec<Record> {
        let state = self.state.borrow();
        state
            .records
            .iter()
            .filter(|r| predicate(*r))
            .cloned()
            .collect()
    }

    /// Records whose type contains `kind`, case-insensitively. An empty
    /// `kind` matches everything.
    pub fn filter_by_type(&self, kind: &str) -> Vec<Record> {
        let needle = kind.to_lowercase();
        self.filter(|r| r.kind.to_lowercase().contains(&needle))
    }

    pub fn favorites(&self) -> Vec<Record> {
        self.filter(|r| r.is_favorite)
    }

    pub fn stats(&self) -> CatalogStats {
        let state = self.state.borrow();
        let records = &state.records;
        CatalogStats {
            total: records.len(),
            favorites: records.iter().filter(|r| r.is_favorite).count(),
            unique_types: records.iter().map(|r| &r.kind).collect::<HashSet<_>>().len(),
            unique_hometowns: records
                .iter()
                .filter_map(|r| r.hometown.as_ref())
                .collect::<HashSet<_>>()
                .len(),
        }
    }

    /// Subscribe to events of `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) -> HandlerResult + 'static,
    {
        self.bus.on(kind, handler)
    }

    /// Subscribe to the next event of `kind` only.
    pub fn once<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnOnce(&StoreEvent) -> HandlerResult + 'static,
    {
        self.bus.once(kind, handler)
    }

    pub fn off(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.bus.off(kind, id)
    }

    /// A handle to the store's event bus.
    pub fn bus(&self) -> EventBus<StoreEvent> {
        self.bus.clone()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The storage key snapshots are written under.
    pub fn key(&self) -> &str {
        &self.key
    }
}

fn dedup_ids(records: &[Record]) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| {
            let fresh = seen.insert(r.id);
            if !fresh {
                warn!("paddock: dropping record with duplicate id {}", r.id);
            }
            fresh
        })
        .cloned()
        .collect()
}
