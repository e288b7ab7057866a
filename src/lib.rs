pub mod bus;
mod catalog;
mod debounce;
mod error;
mod event;
pub mod form;
mod record;
mod remote;
pub mod storage;
mod store;
pub mod theme;
pub mod validation;

pub use catalog::{Catalog, CatalogBuilder, Export, SEARCH_FIELDS, ViewFilter};
pub use debounce::Debouncer;
pub use error::{RemoteError, StorageError};
pub use event::{Change, EventKind, StoreEvent};
pub use record::{NewRecord, Record, RecordField, RecordId, RecordPatch};
pub use remote::{RemoteSource, StaticAsset, StaticRecords};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageBackend};
pub use store::{CatalogStats, Store};
pub use validation::{ErrorSet, Validator};
