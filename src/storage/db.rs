// 🗄️ Database Storage - SQLite tables behind a session-style transaction
//
// Lifecycle:
// - reload() opens the connection, creates the schema if absent, BEGINs
//   (in the test environment the first reload drops every table beforehand)
// - new()/delete() stage changes; all() flushes them into the open transaction
// - save() flushes and COMMITs, then BEGINs again
// - close() drops staged changes, ROLLs BACK, closes the connection

use std::path::{Path, PathBuf};

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection};
use serde_json::{Map, Number, Value};

use super::{Objects, Storage};
use crate::entities::{Entity, EntityKind, CLASS_KEY};
use crate::error::{StorageError, StorageResult};

/// Mapped columns per kind, `id` first. Place.amenity_ids lives in place_amenity.
fn columns(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::BaseModel => &[],
        EntityKind::User => &[
            "id", "created_at", "updated_at", "email", "password", "first_name", "last_name",
        ],
        EntityKind::State => &["id", "created_at", "updated_at", "name"],
        EntityKind::City => &["id", "created_at", "updated_at", "state_id", "name"],
        EntityKind::Amenity => &["id", "created_at", "updated_at", "name"],
        EntityKind::Place => &[
            "id",
            "created_at",
            "updated_at",
            "city_id",
            "user_id",
            "name",
            "description",
            "number_rooms",
            "number_bathrooms",
            "max_guest",
            "price_by_night",
            "latitude",
            "longitude",
        ],
        EntityKind::Review => &["id", "created_at", "updated_at", "place_id", "user_id", "text"],
    }
}

pub fn setup_database(conn: &Connection) -> StorageResult<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS states (
            id VARCHAR(60) PRIMARY KEY NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            name VARCHAR(128) NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cities (
            id VARCHAR(60) PRIMARY KEY NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            state_id VARCHAR(60) NOT NULL REFERENCES states(id) ON DELETE CASCADE,
            name VARCHAR(128) NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id VARCHAR(60) PRIMARY KEY NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            email VARCHAR(128) NOT NULL,
            password VARCHAR(128) NOT NULL,
            first_name VARCHAR(128),
            last_name VARCHAR(128)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS amenities (
            id VARCHAR(60) PRIMARY KEY NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            name VARCHAR(128) NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS places (
            id VARCHAR(60) PRIMARY KEY NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            city_id VARCHAR(60) NOT NULL REFERENCES cities(id) ON DELETE CASCADE,
            user_id VARCHAR(60) NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name VARCHAR(128) NOT NULL,
            description VARCHAR(1024),
            number_rooms INTEGER NOT NULL DEFAULT 0,
            number_bathrooms INTEGER NOT NULL DEFAULT 0,
            max_guest INTEGER NOT NULL DEFAULT 0,
            price_by_night INTEGER NOT NULL DEFAULT 0,
            latitude REAL,
            longitude REAL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS reviews (
            id VARCHAR(60) PRIMARY KEY NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            place_id VARCHAR(60) NOT NULL REFERENCES places(id) ON DELETE CASCADE,
            user_id VARCHAR(60) NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            text VARCHAR(1024) NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS place_amenity (
            place_id VARCHAR(60) NOT NULL REFERENCES places(id) ON DELETE CASCADE,
            amenity_id VARCHAR(60) NOT NULL REFERENCES amenities(id) ON DELETE CASCADE,
            PRIMARY KEY (place_id, amenity_id)
        )",
        [],
    )?;

    Ok(())
}

/// Children first so foreign keys never point at a dropped table
pub fn drop_tables(conn: &Connection) -> StorageResult<()> {
    for table in ["place_amenity", "reviews", "places", "cities", "amenities", "users", "states"] {
        conn.execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;
    }
    Ok(())
}

fn to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: SqlValue) -> Option<Value> {
    match value {
        SqlValue::Null | SqlValue::Blob(_) => None,
        SqlValue::Integer(i) => Some(Value::from(i)),
        SqlValue::Real(f) => Number::from_f64(f).map(Value::Number),
        SqlValue::Text(s) => Some(Value::String(s)),
    }
}

/// Insert or update one row; Place also rewrites its place_amenity links
fn upsert(conn: &Connection, entity: &Entity) -> StorageResult<()> {
    let kind = entity.kind();
    let table = kind.table().ok_or(StorageError::Unmapped(kind))?;
    let cols = columns(kind);
    let dict = entity.to_dict()?;

    let values: Vec<SqlValue> = cols.iter().map(|col| to_sql(dict.get(*col))).collect();
    let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{}", i)).collect();
    let updates: Vec<String> = cols[1..]
        .iter()
        .map(|col| format!("{col} = excluded.{col}"))
        .collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    );
    conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;

    if let Entity::Place(place) = entity {
        conn.execute(
            "DELETE FROM place_amenity WHERE place_id = ?1",
            params![place.base.id],
        )?;
        for amenity_id in &place.amenity_ids {
            conn.execute(
                "INSERT OR IGNORE INTO place_amenity (place_id, amenity_id) VALUES (?1, ?2)",
                params![place.base.id, amenity_id],
            )?;
        }
    }

    Ok(())
}

fn delete_row(conn: &Connection, kind: EntityKind, id: &str) -> StorageResult<()> {
    if let Some(table) = kind.table() {
        conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])?;
    }
    Ok(())
}

fn amenity_ids(conn: &Connection, place_id: &str) -> StorageResult<Vec<Value>> {
    let mut stmt =
        conn.prepare("SELECT amenity_id FROM place_amenity WHERE place_id = ?1 ORDER BY rowid")?;

    let ids = stmt
        .query_map(params![place_id], |row| row.get::<_, String>(0))?
        .map(|id| id.map(Value::String))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ids)
}

/// Every row of one kind, rebuilt through the same dictionary shape the
/// file backend uses
fn load_kind(conn: &Connection, kind: EntityKind) -> StorageResult<Vec<Entity>> {
    let Some(table) = kind.table() else {
        return Ok(Vec::new());
    };
    let cols = columns(kind);

    let mut stmt = conn.prepare(&format!("SELECT {} FROM {}", cols.join(", "), table))?;
    let dicts = stmt
        .query_map([], |row| {
            let mut dict = Map::new();
            dict.insert(CLASS_KEY.to_string(), Value::from(kind.as_str()));
            for (i, col) in cols.iter().enumerate() {
                if let Some(value) = from_sql(row.get(i)?) {
                    dict.insert(col.to_string(), value);
                }
            }
            Ok(dict)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut entities = Vec::with_capacity(dicts.len());
    for mut dict in dicts {
        if kind == EntityKind::Place {
            let id = dict.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            dict.insert("amenity_ids".to_string(), Value::Array(amenity_ids(conn, &id)?));
        }
        entities.push(Entity::from_dict(dict)?);
    }

    Ok(entities)
}

// ============================================================================
// DB STORAGE
// ============================================================================

enum Pending {
    Upsert(Entity),
    Delete(EntityKind, String),
}

pub struct DbStorage {
    path: PathBuf,
    drop_on_reload: bool,
    conn: Option<Connection>,
    pending: Vec<Pending>,
}

impl DbStorage {
    /// Closed storage bound to `path`; call reload() to open it
    pub fn new(path: impl AsRef<Path>, drop_on_reload: bool) -> Self {
        DbStorage {
            path: path.as_ref().to_path_buf(),
            drop_on_reload,
            conn: None,
            pending: Vec::new(),
        }
    }

    /// Private in-memory database; its contents do not survive close()
    pub fn in_memory() -> Self {
        Self::new(":memory:", false)
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Write staged changes into the open transaction. A failing batch is
    /// undone as a whole; the session keeps only earlier flushes.
    fn flush(&mut self) -> StorageResult<()> {
        if self.conn.is_none() {
            return Err(StorageError::NotOpen);
        }
        if self.pending.is_empty() {
            return Ok(());
        }

        let pending = std::mem::take(&mut self.pending);
        let conn = self.conn.as_ref().ok_or(StorageError::NotOpen)?;

        conn.execute_batch("SAVEPOINT flush")?;
        let applied = pending.iter().try_for_each(|op| match op {
            Pending::Upsert(entity) => upsert(conn, entity),
            Pending::Delete(kind, id) => delete_row(conn, *kind, id),
        });

        match applied {
            Ok(()) => conn.execute_batch("RELEASE flush")?,
            Err(e) => {
                tracing::warn!(error = %e, staged = pending.len(), "flush failed, discarding batch");
                conn.execute_batch("ROLLBACK TO flush; RELEASE flush")?;
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Storage for DbStorage {
    fn all(&mut self, kind: Option<EntityKind>) -> StorageResult<Objects> {
        self.flush()?;
        let conn = self.conn.as_ref().ok_or(StorageError::NotOpen)?;

        let kinds: Vec<EntityKind> = match kind {
            Some(kind) => vec![kind],
            None => EntityKind::all().to_vec(),
        };

        let mut objects = Objects::new();
        for kind in kinds {
            for entity in load_kind(conn, kind)? {
                objects.insert(entity.key(), entity);
            }
        }
        Ok(objects)
    }

    fn new(&mut self, entity: Entity) -> StorageResult<()> {
        if !self.is_open() {
            return Err(StorageError::NotOpen);
        }
        if entity.kind().table().is_none() {
            return Err(StorageError::Unmapped(entity.kind()));
        }

        tracing::debug!(key = %entity.key(), "staging upsert");
        self.pending.push(Pending::Upsert(entity));
        Ok(())
    }

    fn save(&mut self) -> StorageResult<()> {
        self.flush()?;
        let conn = self.conn.as_ref().ok_or(StorageError::NotOpen)?;

        conn.execute_batch("COMMIT")?;
        conn.execute_batch("BEGIN")?;

        tracing::info!(path = %self.path.display(), "committed session");
        Ok(())
    }

    fn reload(&mut self) -> StorageResult<()> {
        self.close()?;

        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        // Once per storage: later reloads must keep what the session saved
        if std::mem::take(&mut self.drop_on_reload) {
            tracing::warn!(path = %self.path.display(), "test environment, dropping all tables");
            drop_tables(&conn)?;
        }
        setup_database(&conn)?;
        conn.execute_batch("BEGIN")?;

        tracing::info!(path = %self.path.display(), "opened database session");
        self.conn = Some(conn);
        Ok(())
    }

    fn delete(&mut self, entity: &Entity) -> StorageResult<()> {
        if !self.is_open() {
            return Err(StorageError::NotOpen);
        }
        if entity.kind().table().is_none() {
            return Ok(());
        }

        tracing::debug!(key = %entity.key(), "staging delete");
        self.pending
            .push(Pending::Delete(entity.kind(), entity.id().to_string()));
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        self.pending.clear();

        if let Some(conn) = self.conn.take() {
            if !conn.is_autocommit() {
                conn.execute_batch("ROLLBACK")?;
            }
            tracing::debug!(path = %self.path.display(), "closed database session");
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
