mod common;

use common::{new_record, seed_records};
use paddock::storage::keys;
use paddock::theme::{Theme, ThemePreference};
use paddock::{
    Catalog, RecordId, RemoteError, RemoteSource, Record, StaticAsset, StaticRecords, Storage,
    ViewFilter,
};
use std::cell::Cell;
use std::fs;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tempfile::tempdir;

struct CountingMirror {
    pushes: Rc<Cell<usize>>,
    fail: bool,
}

impl RemoteSource for CountingMirror {
    fn fetch_records(&self) -> Result<Vec<Record>, RemoteError> {
        Ok(Vec::new())
    }

    fn save_records(&self, records: &[Record]) -> Result<usize, RemoteError> {
        self.pushes.set(self.pushes.get() + 1);
        if self.fail {
            Err(RemoteError::Rejected("offline".to_string()))
        } else {
            Ok(records.len())
        }
    }
}

#[test]
fn test_open_seeds_empty_storage_from_asset() {
    let dir = tempdir().unwrap();
    let asset = dir.path().join("characters.json");
    fs::write(&asset, serde_json::to_string(&seed_records()).unwrap()).unwrap();

    let catalog = Catalog::builder(dir.path().join("data"))
        .seed(StaticAsset::new(&asset))
        .open()
        .unwrap();
    assert_eq!(catalog.store().get_all(), seed_records());
    // seeding persists the snapshot
    assert!(dir.path().join("data/cars_characters.json").exists());
}

#[test]
fn test_open_prefers_stored_snapshot_over_seed() {
    let dir = tempdir().unwrap();
    {
        let catalog = Catalog::builder(dir.path())
            .seed(StaticRecords(seed_records()))
            .open()
            .unwrap();
        catalog.store().remove(RecordId(1));
        catalog.store().add(new_record("Fillmore"));
    }

    let catalog = Catalog::builder(dir.path())
        .seed(StaticRecords(seed_records()))
        .open()
        .unwrap();
    let names: Vec<String> = catalog.store().get_all().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Mater", "Sally Carrera", "Doc Hudson", "Fillmore"]);
    assert_eq!(catalog.store().add(new_record("Sarge")).id, RecordId(6));
}

#[test]
fn test_missing_seed_asset_starts_empty() {
    let dir = tempdir().unwrap();
    let catalog = Catalog::builder(dir.path())
        .seed(StaticAsset::new(dir.path().join("missing.json")))
        .open()
        .unwrap();
    assert!(catalog.store().is_empty());
}

#[test]
fn test_static_asset_reports_parse_errors() {
    let dir = tempdir().unwrap();
    let asset = dir.path().join("broken.json");
    fs::write(&asset, "{\"not\": \"a list\"}").unwrap();
    assert!(matches!(
        StaticAsset::new(&asset).fetch_records(),
        Err(RemoteError::Parse { .. })
    ));
}

#[test]
fn test_mirror_failure_is_silent() {
    let pushes = Rc::new(Cell::new(0));
    let catalog = Catalog::builder("unused")
        .mirror(CountingMirror {
            pushes: pushes.clone(),
            fail: true,
        })
        .open_with(Storage::in_memory());

    let record = catalog.store().add(new_record("Mia"));
    catalog.store().toggle_favorite(record.id);
    assert_eq!(pushes.get(), 2);
    assert!(catalog.store().get_by_id(record.id).unwrap().is_favorite);
}

#[test]
fn test_search_view_combines_filters() {
    let catalog = Catalog::builder("unused")
        .seed(StaticRecords(seed_records()))
        .open_with(Storage::in_memory());
    catalog.store().toggle_favorite(RecordId(3));
    catalog.store().toggle_favorite(RecordId(4));

    let by_query = catalog.search_view(&ViewFilter {
        query: "HUDSON".to_string(),
        ..ViewFilter::default()
    });
    assert_eq!(by_query.len(), 1);

    // description is not one of the search fields
    let by_description = catalog.search_view(&ViewFilter {
        query: "lives in".to_string(),
        ..ViewFilter::default()
    });
    assert!(by_description.is_empty());

    let favorites_of_type = catalog.search_view(&ViewFilter {
        kind: "porsche".to_string(),
        favorites_only: true,
        ..ViewFilter::default()
    });
    assert_eq!(favorites_of_type.len(), 1);
    assert_eq!(favorites_of_type[0].id, RecordId(3));

    assert_eq!(catalog.visible().len(), 4);
}

#[test]
fn test_debounced_query_applies_last_value() {
    let mut catalog = Catalog::builder("unused")
        .seed(StaticRecords(seed_records()))
        .search_delay(Duration::from_millis(300))
        .open_with(Storage::in_memory());

    let t0 = Instant::now();
    catalog.type_query("m", t0);
    catalog.type_query("ma", t0 + Duration::from_millis(50));
    catalog.type_query("mat", t0 + Duration::from_millis(100));

    assert!(catalog.tick(t0 + Duration::from_millis(200)).is_none());
    let visible = catalog.tick(t0 + Duration::from_millis(400)).unwrap();
    assert_eq!(catalog.filter().query, "mat");
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].name, "Mater");
    assert!(catalog.tick(t0 + Duration::from_millis(1000)).is_none());
}

#[test]
fn test_filter_toggles() {
    let mut catalog = Catalog::builder("unused")
        .seed(StaticRecords(seed_records()))
        .open_with(Storage::in_memory());
    catalog.store().toggle_favorite(RecordId(2));

    assert_eq!(catalog.toggle_favorites_only().len(), 1);
    assert_eq!(catalog.set_type_filter("race").len(), 0);
    assert_eq!(catalog.toggle_favorites_only().len(), 1);
    assert_eq!(catalog.set_type_filter("").len(), 4);
}

#[test]
fn test_theme_defaults_to_system_and_persists() {
    let storage = Storage::in_memory();
    let mut catalog = Catalog::builder("unused")
        .system_prefers_dark(true)
        .open_with(storage.clone());
    assert_eq!(catalog.theme().preference(), ThemePreference::Dark);

    assert_eq!(catalog.theme_mut().toggle(true), Theme::Light);
    assert_eq!(storage.load_raw(keys::THEME).as_deref(), Some("light"));

    catalog.theme_mut().set(ThemePreference::Auto);
    assert_eq!(catalog.theme().effective(true), Theme::Dark);
    assert_eq!(catalog.theme().effective(false), Theme::Light);
    assert_eq!(catalog.theme_mut().toggle(false), Theme::Dark);
}

#[test]
fn test_invalid_stored_theme_falls_back() {
    let storage = Storage::in_memory();
    storage.save_raw(keys::THEME, "sepia");
    let catalog = Catalog::builder("unused").open_with(storage);
    assert_eq!(catalog.theme().preference(), ThemePreference::Light);
}

#[test]
fn test_export_and_reset_to_defaults() {
    let storage = Storage::in_memory();
    let mut catalog = Catalog::builder("unused")
        .seed(StaticRecords(seed_records()))
        .open_with(storage.clone());
    catalog.store().toggle_favorite(RecordId(1));
    catalog.store().add(new_record("Chick Hicks"));
    catalog.theme_mut().set(ThemePreference::Dark);
    catalog.set_type_filter("tow");

    let export = catalog.export();
    assert_eq!(export.characters.len(), 5);
    assert_eq!(export.stats.favorites, 1);
    assert_eq!(export.theme, ThemePreference::Dark);
    let json = serde_json::to_value(&export).unwrap();
    assert!(json.get("exportedAt").is_some());
    assert_eq!(json["stats"]["uniqueTypes"], 4);

    catalog.reset_to_defaults(&seed_records());
    assert_eq!(catalog.store().get_all(), seed_records());
    assert_eq!(catalog.theme().preference(), ThemePreference::Light);
    assert_eq!(catalog.theme().effective(true), Theme::Light);
    assert!(!storage.exists(keys::THEME));
    assert_eq!(catalog.filter(), &ViewFilter::default());
}
