//! SQLite-backed [`EventStore`].
//!
//! All statements run on the blocking pool. The connection is shared behind a
//! mutex, so one store handle serializes its own writes; separate processes
//! racing on the same file are handled by the tag insert fallback.

use super::{EventStore, StoreError};
use crate::model::{Jurisdiction, NormalizedEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS events (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  title TEXT NOT NULL,
  description TEXT NOT NULL,
  date TEXT NOT NULL,
  starts_at TEXT NOT NULL,
  location TEXT NOT NULL,
  jurisdiction TEXT NOT NULL,
  agency TEXT NOT NULL,
  url TEXT,
  is_virtual INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tags (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS event_tags (
  event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
  tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_events_url_date ON events(url, date);
CREATE INDEX IF NOT EXISTS idx_event_tags_event ON event_tags(event_id);
"#;

const SELECT_EVENTS: &str = r#"
SELECT e.id, e.title, e.description, e.starts_at, e.location, e.jurisdiction,
       e.agency, e.url, e.is_virtual, t.name
FROM events e
LEFT JOIN event_tags et ON et.event_id = e.id
LEFT JOIN tags t ON t.id = et.tag_id
"#;

pub struct SqliteEventStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEventStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

// ============================================================================
// Row helpers
// ============================================================================

fn load_tag_ids(conn: &Connection) -> rusqlite::Result<HashMap<String, i64>> {
    let mut stmt = conn.prepare("SELECT id, name FROM tags")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)?)))?;
    rows.collect()
}

fn event_exists(conn: &Connection, event: &NormalizedEvent) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM events WHERE url IS ?1 AND date = ?2 AND title = ?3 LIMIT 1",
        params![event.url, event.day().to_string(), event.title],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

/// Tag id for `name`, inserting the tag if needed.
///
/// A failed insert means someone else created it first, so the tag is read back.
fn resolve_tag(
    conn: &Connection,
    known: &mut HashMap<String, i64>,
    name: &str,
) -> rusqlite::Result<Option<i64>> {
    if let Some(&id) = known.get(name) {
        return Ok(Some(id));
    }
    let id = match conn.execute("INSERT INTO tags (name) VALUES (?1)", params![name]) {
        Ok(_) => Some(conn.last_insert_rowid()),
        Err(e) => {
            debug!(tag = name, error = %e, "Tag insert failed, re-reading");
            conn.query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| row.get(0))
                .optional()?
        }
    };
    if let Some(id) = id {
        known.insert(name.to_string(), id);
    }
    Ok(id)
}

/// Writes one event and its tag links in a single transaction.
///
/// Tag ids created here only reach `known` once the transaction commits.
fn insert_event(
    conn: &mut Connection,
    known: &mut HashMap<String, i64>,
    event: &NormalizedEvent,
) -> rusqlite::Result<bool> {
    let tx = conn.transaction()?;
    if event_exists(&tx, event)? {
        debug!(title = %event.title, day = %event.day(), "Event already stored");
        return Ok(false);
    }

    tx.execute(
        r#"
        INSERT INTO events (
          title, description, date, starts_at, location, jurisdiction, agency, url, is_virtual
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            event.title,
            event.description,
            event.day().to_string(),
            event.date.to_rfc3339(),
            event.location,
            event.jurisdiction.as_str(),
            event.agency,
            event.url,
            event.is_virtual,
        ],
    )?;
    let event_id = tx.last_insert_rowid();

    let mut staged = known.clone();
    for tag in &event.tags {
        match resolve_tag(&tx, &mut staged, tag)? {
            Some(tag_id) => {
                tx.execute(
                    "INSERT INTO event_tags (event_id, tag_id) VALUES (?1, ?2)",
                    params![event_id, tag_id],
                )?;
            }
            None => warn!(tag = %tag, "Could not create or find tag"),
        }
    }
    tx.commit()?;
    *known = staged;
    Ok(true)
}

fn parse_instant(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

/// Folds joined event/tag rows into events, one per id, keeping row order.
fn collect_events(conn: &Connection, filter: &str, args: &[i64]) -> rusqlite::Result<Vec<NormalizedEvent>> {
    let sql = format!("{SELECT_EVENTS} {filter} ORDER BY e.id, et.rowid");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(args.iter()))?;
    let mut events: Vec<NormalizedEvent> = Vec::new();

    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let tag: Option<String> = row.get(9)?;
        if let Some(last) = events.last_mut().filter(|last| last.id == id) {
            last.tags.extend(tag);
            continue;
        }
        let jurisdiction: String = row.get(5)?;
        events.push(NormalizedEvent {
            id,
            title: row.get(1)?,
            description: row.get(2)?,
            date: parse_instant(row, 3)?,
            location: row.get(4)?,
            jurisdiction: Jurisdiction::parse(&jurisdiction),
            agency: row.get(6)?,
            url: row.get(7)?,
            is_virtual: row.get(8)?,
            tags: tag.into_iter().collect(),
        });
    }
    Ok(events)
}

// ============================================================================
// EventStore
// ============================================================================

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn save_events(&self, events: &[NormalizedEvent]) -> Result<usize, StoreError> {
        if events.is_empty() {
            return Ok(0);
        }
        let events = events.to_vec();
        self.with_conn(move |conn| {
            let mut known = load_tag_ids(conn)?;
            info!(count = events.len(), "Saving events");

            let mut saved = 0;
            for event in &events {
                match insert_event(conn, &mut known, event) {
                    Ok(true) => saved += 1,
                    Ok(false) => {}
                    Err(e) => warn!(title = %event.title, error = %e, "Failed to save event"),
                }
            }
            Ok(saved)
        })
        .await
    }

    async fn get_all_events(&self) -> Result<Vec<NormalizedEvent>, StoreError> {
        self.with_conn(|conn| Ok(collect_events(conn, "", &[])?)).await
    }

    async fn get_event_by_id(&self, id: i64) -> Result<Option<NormalizedEvent>, StoreError> {
        self.with_conn(move |conn| Ok(collect_events(conn, "WHERE e.id = ?1", &[id])?.pop()))
            .await
    }

    async fn get_all_tags(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM tags ORDER BY name")?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
        .await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "DELETE FROM event_tags; DELETE FROM events; DELETE FROM tags;",
            )?;
            Ok(())
        })
        .await
    }
}
