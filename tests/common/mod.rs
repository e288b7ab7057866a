#![allow(dead_code)]

use paddock::bus::BusEvent;
use paddock::{EventKind, NewRecord, Record, RecordId, Store, StoreEvent};
use std::cell::RefCell;
use std::rc::Rc;

pub fn seed_record(id: u64, name: &str, kind: &str, color: &str) -> Record {
    Record {
        id: RecordId(id),
        name: name.to_string(),
        kind: kind.to_string(),
        color: color.to_string(),
        description: format!("{name} lives in Radiator Springs."),
        hometown: Some("Radiator Springs".to_string()),
        specialty: None,
        image_url: None,
        year: Some(2006),
        is_favorite: false,
        created_at: None,
        updated_at: None,
    }
}

pub fn seed_records() -> Vec<Record> {
    vec![
        seed_record(1, "Lightning McQueen", "Race car", "#FF0000"),
        seed_record(2, "Mater", "Tow truck", "#8B4513"),
        seed_record(3, "Sally Carrera", "Porsche 911", "#4169E1"),
        seed_record(4, "Doc Hudson", "Hudson Hornet 1951", "#2F4F4F"),
    ]
}

pub fn new_record(name: &str) -> NewRecord {
    NewRecord::new(name, "Race car", "#00AA00", "A fast car from the Piston Cup.")
}

pub const ALL_KINDS: [EventKind; 7] = [
    EventKind::ItemAdded,
    EventKind::ItemUpdated,
    EventKind::ItemRemoved,
    EventKind::Reset,
    EventKind::Cleared,
    EventKind::Loaded,
    EventKind::Change,
];

/// Subscribe to every event kind and collect the kinds in dispatch order.
pub fn record_kinds(store: &Store) -> Rc<RefCell<Vec<EventKind>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    for kind in ALL_KINDS {
        let seen = seen.clone();
        store.on(kind, move |event: &StoreEvent| {
            seen.borrow_mut().push(event.kind());
            Ok(())
        });
    }
    seen
}
