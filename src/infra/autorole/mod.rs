pub mod sqlite_autorole_store;
pub mod sqlite_statistics_store;

pub use sqlite_autorole_store::SqliteAutoroleStore;
pub use sqlite_statistics_store::SqliteStatisticsStore;
