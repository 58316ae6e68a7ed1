use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use rusqlite::{params, Connection, Row};

use super::{EventStore, StoreError};
use crate::models::{EventRecord, StoredEvent};
use crate::utils;

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        utils::ensure_parent(path);
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> rusqlite::Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Decode("sqlite connection mutex poisoned".to_string()))?;
            op(&*guard).map_err(StoreError::from)
        })
        .await
        .map_err(|err| StoreError::Decode(err.to_string()))?
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS events(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            college_name TEXT NOT NULL,
            category TEXT NOT NULL,
            date TEXT,
            description TEXT NOT NULL,
            link TEXT NOT NULL,
            created_at_utc TEXT NOT NULL
        );",
    )
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<StoredEvent> {
    Ok(StoredEvent {
        id: row.get(0)?,
        record: EventRecord {
            title: row.get(1)?,
            college_name: row.get(2)?,
            category: row.get(3)?,
            date: row.get(4)?,
            description: row.get(5)?,
            link: row.get(6)?,
        },
    })
}

const SELECT_COLUMNS: &str = "id, title, college_name, category, date, description, link";

#[async_trait]
impl EventStore for SqliteStore {
    async fn list_all(&self) -> Result<Vec<StoredEvent>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM events"))?;
            let rows = stmt.query_map([], row_to_event)?;

            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
    }

    async fn insert_one(&self, record: &EventRecord) -> Result<StoredEvent, StoreError> {
        let record = record.clone();
        self.with_conn(move |conn| {
            let now = chrono::Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO events (title, college_name, category, date, description, link, created_at_utc)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.title,
                    record.college_name,
                    record.category,
                    record.date,
                    record.description,
                    record.link,
                    now
                ],
            )?;
            Ok(StoredEvent {
                id: conn.last_insert_rowid(),
                record,
            })
        })
        .await
    }

    async fn delete_by_id(&self, id: i64) -> Result<Vec<StoredEvent>, StoreError> {
        self.with_conn(move |conn| {
            let existing = conn
                .prepare(&format!("SELECT {SELECT_COLUMNS} FROM events WHERE id = ?1"))?
                .query_map(params![id], row_to_event)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            conn.execute("DELETE FROM events WHERE id = ?1", params![id])?;
            Ok(existing)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, date: Option<&str>) -> EventRecord {
        EventRecord {
            title: title.to_string(),
            college_name: "CBIT".to_string(),
            category: "technical".to_string(),
            date: date.map(str::to_string),
            description: String::new(),
            link: String::new(),
        }
    }

    #[tokio::test]
    async fn insert_then_list_round_trips_nullable_date() {
        let store = SqliteStore::open_in_memory().expect("open store");
        let first = store
            .insert_one(&record("Hackathon", Some("Feb 17")))
            .await
            .expect("insert first");
        let second = store
            .insert_one(&record("Workshop", None))
            .await
            .expect("insert second");
        assert_ne!(first.id, second.id);

        let mut listed = store.list_all().await.expect("list");
        listed.sort_by_key(|event| event.id);
        assert_eq!(listed, vec![first, second]);
        assert_eq!(listed[1].record.date, None);
    }

    #[tokio::test]
    async fn duplicate_records_are_kept() {
        let store = SqliteStore::open_in_memory().expect("open store");
        store.insert_one(&record("Fest", None)).await.expect("insert");
        store.insert_one(&record("Fest", None)).await.expect("insert");
        assert_eq!(store.list_all().await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn delete_missing_id_is_not_an_error() {
        let store = SqliteStore::open_in_memory().expect("open store");
        let kept = store.insert_one(&record("Fest", None)).await.expect("insert");

        let deleted = store.delete_by_id(kept.id + 100).await.expect("delete missing");
        assert!(deleted.is_empty());

        let deleted = store.delete_by_id(kept.id).await.expect("delete existing");
        assert_eq!(deleted, vec![kept]);
        assert!(store.list_all().await.expect("list").is_empty());
    }
}
