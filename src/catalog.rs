use crate::debounce::{self, Debouncer};
use crate::error::StorageError;
use crate::record::{Record, RecordField};
use crate::remote::RemoteSource;
use crate::storage::{Storage, keys};
use crate::store::{CatalogStats, Store};
use crate::theme::{ThemePreference, ThemeSettings};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Fields the search box matches against.
pub const SEARCH_FIELDS: [RecordField; 4] = [
    RecordField::Name,
    RecordField::Type,
    RecordField::Hometown,
    RecordField::Specialty,
];

/// The filters applied to the visible record list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    /// Free-text query over [`SEARCH_FIELDS`].
    pub query: String,
    /// Case-insensitive substring of the record type.
    pub kind: String,
    pub favorites_only: bool,
}

/// Everything needed to back up or inspect a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    pub characters: Vec<Record>,
    pub theme: ThemePreference,
    pub stats: CatalogStats,
    pub exported_at: DateTime<Utc>,
}

/// Builder for a [`Catalog`].
///
/// ```no_run
/// use paddock::{Catalog, StaticAsset};
///
/// let catalog = Catalog::builder("./data")
///     .seed(StaticAsset::new("assets/characters.json"))
///     .open()
///     .unwrap();
/// println!("{} records", catalog.store().len());
/// ```
pub struct CatalogBuilder {
    dir: PathBuf,
    records_key: String,
    seed: Option<Rc<dyn RemoteSource>>,
    mirror: Option<Rc<dyn RemoteSource>>,
    search_delay: Duration,
    system_prefers_dark: bool,
}

impl CatalogBuilder {
    fn new(dir: &Path) -> Self {
        CatalogBuilder {
            dir: dir.to_path_buf(),
            records_key: keys::RECORDS.to_string(),
            seed: None,
            mirror: None,
            search_delay: debounce::DEFAULT_DELAY,
            system_prefers_dark: false,
        }
    }

    /// Storage key for the record snapshot.
    pub fn records_key(mut self, key: impl Into<String>) -> Self {
        self.records_key = key.into();
        self
    }

    /// Where to fetch initial records when storage holds none.
    pub fn seed(mut self, source: impl RemoteSource + 'static) -> Self {
        self.seed = Some(Rc::new(source));
        self
    }

    /// Where to push every snapshot after it is saved locally.
    pub fn mirror(mut self, mirror: impl RemoteSource + 'static) -> Self {
        self.mirror = Some(Rc::new(mirror));
        self
    }

    /// Quiet period before a typed search query is applied.
    pub fn search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = delay;
        self
    }

    /// The OS color-scheme preference, used when no theme is stored.
    pub fn system_prefers_dark(mut self, dark: bool) -> Self {
        self.system_prefers_dark = dark;
        self
    }

    /// Open file storage in the builder's directory and build the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage directory cannot be created.
    pub fn open(self) -> Result<Catalog, StorageError> {
        let storage = Storage::open(&self.dir)?;
        Ok(self.open_with(storage))
    }

    /// Build the catalog over an existing storage gateway.
    ///
    /// Loads the stored snapshot; if that leaves the store empty and a seed
    /// source is configured, resets the store from the seed. A failing seed
    /// leaves the store empty.
    pub fn open_with(self, storage: Storage) -> Catalog {
        let mut store = Store::new(storage.clone()).with_key(&self.records_key);
        if let Some(mirror) = self.mirror {
            store = store.with_mirror(mirror);
        }

        if !store.load_from_storage() {
            if let Some(seed) = &self.seed {
                match seed.fetch_records() {
                    Ok(records) if !records.is_empty() => store.reset(&records),
                    Ok(_) => info!("paddock: seed source returned no records"),
                    Err(e) => warn!("paddock: seeding failed, starting empty: {e}"),
                }
            }
        }

        Catalog {
            store,
            theme: ThemeSettings::load(storage, self.system_prefers_dark),
            search: Debouncer::new(self.search_delay),
            filter: ViewFilter::default(),
        }
    }
}

/// The application context: one store, its theme settings and the list view
/// state, constructed once at startup and handed to whatever needs it.
#[derive(Debug)]
pub struct Catalog {
    store: Store,
    theme: ThemeSettings,
    search: Debouncer<String>,
    filter: ViewFilter,
}

impl Catalog {
    pub fn builder(dir: impl AsRef<Path>) -> CatalogBuilder {
        CatalogBuilder::new(dir.as_ref())
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn theme(&self) -> &ThemeSettings {
        &self.theme
    }

    pub fn theme_mut(&mut self) -> &mut ThemeSettings {
        &mut self.theme
    }

    pub fn filter(&self) -> &ViewFilter {
        &self.filter
    }

    /// Records passing `filter`, in insertion order.
    pub fn search_view(&self, filter: &ViewFilter) -> Vec<Record> {
        let records = if filter.query.is_empty() {
            self.store.get_all()
        } else {
            self.store.search(&filter.query, &SEARCH_FIELDS)
        };
        let kind = filter.kind.to_lowercase();

        records
            .into_iter()
            .filter(|r| kind.is_empty() || r.kind.to_lowercase().contains(&kind))
            .filter(|r| !filter.favorites_only || r.is_favorite)
            .collect()
    }

    /// Records passing the current filter.
    pub fn visible(&self) -> Vec<Record> {
        self.search_view(&self.filter)
    }

    /// Record a keystroke in the search box. The query is applied by
    /// [`tick`](Self::tick) once typing pauses.
    pub fn type_query(&mut self, query: impl Into<String>, now: Instant) {
        self.search.schedule(query.into(), now);
    }

    /// Apply a pending search query if its quiet period has elapsed and
    /// return the new visible list.
    pub fn tick(&mut self, now: Instant) -> Option<Vec<Record>> {
        let query = self.search.poll(now)?;
        self.filter.query = query;
        Some(self.visible())
    }

    pub fn set_type_filter(&mut self, kind: impl Into<String>) -> Vec<Record> {
        self.filter.kind = kind.into();
        self.visible()
    }

    pub fn toggle_favorites_only(&mut self) -> Vec<Record> {
        self.filter.favorites_only = !self.filter.favorites_only;
        self.visible()
    }

    pub fn export(&self) -> Export {
        Export {
            characters: self.store.get_all(),
            theme: self.theme.preference(),
            stats: self.store.stats(),
            exported_at: Utc::now(),
        }
    }

    /// Replace every record with `defaults`, forget the stored theme (the
    /// session switches to light) and clear the view filters.
    pub fn reset_to_defaults(&mut self, defaults: &[Record]) {
        self.store.reset(defaults);
        self.theme.reset();
        self.search.cancel();
        self.filter = ViewFilter::default();
    }
}
