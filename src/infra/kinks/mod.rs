pub mod flist_client;
pub mod sqlite_kink_store;

pub use flist_client::FlistClient;
pub use sqlite_kink_store::SqliteKinkStore;
