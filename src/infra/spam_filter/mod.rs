// Infrastructure for the username spam filter.

pub mod sqlite_filter_store;

pub use sqlite_filter_store::SqliteFilterStore;
