pub mod sqlite;
pub mod supabase;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{EventRecord, StoredEvent};

pub use sqlite::SqliteStore;
pub use supabase::SupabaseStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(String),
    #[error("storage api error: {0}")]
    Api(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// CRUD facade over the remote events table. Every call stands alone; no
/// transaction spans several calls.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<StoredEvent>, StoreError>;

    async fn insert_one(&self, record: &EventRecord) -> Result<StoredEvent, StoreError>;

    /// Deleting an id that does not exist is not an error.
    async fn delete_by_id(&self, id: i64) -> Result<Vec<StoredEvent>, StoreError>;
}
