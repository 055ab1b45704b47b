pub mod manager;
pub mod memory;
pub mod postgres;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryResourceStore;
pub use postgres::PgResourceStore;
pub use store::{new_etag, Document, ResourceStore, StoreError, StoreResult, StoredResource};
