// 📄 File Storage - every instance in a single JSON document
//
// Document shape: { "<ClassName>.<id>": { ...attributes, "__class__": "<ClassName>" } }
// save() rewrites the whole document. No locking: a second writer will race.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::{Objects, Storage};
use crate::entities::{Entity, EntityKind};
use crate::error::{StorageError, StorageResult};

pub struct FileStorage {
    path: PathBuf,
    objects: Objects,
}

impl FileStorage {
    /// Empty storage bound to `path`; call reload() to read the document
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileStorage {
            path: path.as_ref().to_path_buf(),
            objects: Objects::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Storage for FileStorage {
    fn all(&mut self, kind: Option<EntityKind>) -> StorageResult<Objects> {
        Ok(self
            .objects
            .iter()
            .filter(|(_, entity)| kind.map_or(true, |k| entity.kind() == k))
            .map(|(key, entity)| (key.clone(), entity.clone()))
            .collect())
    }

    fn new(&mut self, entity: Entity) -> StorageResult<()> {
        tracing::debug!(key = %entity.key(), "registering instance");
        self.objects.insert(entity.key(), entity);
        Ok(())
    }

    fn save(&mut self) -> StorageResult<()> {
        let mut document = Map::new();
        for (key, entity) in &self.objects {
            document.insert(key.clone(), Value::Object(entity.to_dict()?));
        }

        let bytes = serde_json::to_vec(&Value::Object(document))?;
        fs::write(&self.path, bytes).map_err(|e| self.io_error(e))?;

        tracing::info!(path = %self.path.display(), count = self.objects.len(), "saved JSON document");
        Ok(())
    }

    fn reload(&mut self) -> StorageResult<()> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no JSON document yet");
                return Ok(());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let document: Map<String, Value> = serde_json::from_slice(&raw)?;
        let mut objects = Objects::new();
        for (key, value) in document {
            let entity: Entity = serde_json::from_value(value)?;
            objects.insert(key, entity);
        }

        tracing::info!(path = %self.path.display(), count = objects.len(), "reloaded JSON document");
        self.objects = objects;
        Ok(())
    }

    fn delete(&mut self, entity: &Entity) -> StorageResult<()> {
        if self.objects.remove(&entity.key()).is_some() {
            tracing::debug!(key = %entity.key(), "deleted instance");
        }
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Place, State, User};
    use crate::storage::contract;
    use serde_json::json;
    use tempfile::TempDir;

    fn temp_storage() -> (TempDir, FileStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("file.json"));
        (dir, storage)
    }

    #[test]
    fn test_file_storage_contract() {
        let dir = tempfile::tempdir().unwrap();
        let mut n = 0;

        contract::run_all(|| {
            n += 1;
            Box::new(FileStorage::new(dir.path().join(format!("file{}.json", n)))) as Box<dyn Storage>
        });
    }

    #[test]
    fn test_reload_missing_file_is_noop() {
        let (_dir, mut storage) = temp_storage();

        storage.reload().unwrap();
        assert!(storage.all(None).unwrap().is_empty());
    }

    #[test]
    fn test_save_writes_document_shape() {
        let (_dir, mut storage) = temp_storage();
        let state = Entity::from(State::new("California"));
        storage.new(state.clone()).unwrap();
        storage.save().unwrap();

        let raw = fs::read_to_string(storage.path()).unwrap();
        let document: Value = serde_json::from_str(&raw).unwrap();
        let stored = &document[state.key()];

        assert_eq!(stored["__class__"], json!("State"));
        assert_eq!(stored["name"], json!("California"));
        assert_eq!(stored["id"], json!(state.id()));
        assert_eq!(Value::Object(state.to_dict().unwrap()), *stored);
    }

    #[test]
    fn test_round_trip_preserves_dicts() {
        let (dir, mut storage) = temp_storage();

        let mut place = Place::new("0001", "u1", "My house");
        place.number_rooms = 4;
        place.latitude = 37.77;
        place.extra.insert("color".to_string(), json!("blue"));
        let user = User::new("a@b.c", "pwd");
        let entities = [Entity::from(place), Entity::from(user)];

        for entity in &entities {
            storage.new(entity.clone()).unwrap();
        }
        storage.save().unwrap();

        let mut reloaded = FileStorage::new(dir.path().join("file.json"));
        reloaded.reload().unwrap();
        let objects = reloaded.all(None).unwrap();

        assert_eq!(objects.len(), 2);
        for entity in &entities {
            let back = &objects[&entity.key()];
            assert_eq!(back.to_dict().unwrap(), entity.to_dict().unwrap());
            assert_eq!(back, entity);
        }
    }

    #[test]
    fn test_reload_replaces_memory() {
        let (dir, mut storage) = temp_storage();
        storage.new(State::new("Saved").into()).unwrap();
        storage.save().unwrap();

        storage.new(State::new("Unsaved").into()).unwrap();
        assert_eq!(storage.count(None).unwrap(), 2);

        storage.reload().unwrap();
        assert_eq!(storage.count(None).unwrap(), 1);
        drop(dir);
    }

    #[test]
    fn test_delete_is_durable_after_save() {
        let (dir, mut storage) = temp_storage();
        let state = Entity::from(State::new("Gone"));
        storage.new(state.clone()).unwrap();
        storage.save().unwrap();

        storage.delete(&state).unwrap();
        storage.save().unwrap();

        let mut reloaded = FileStorage::new(dir.path().join("file.json"));
        reloaded.reload().unwrap();
        assert!(reloaded.get(EntityKind::State, state.id()).unwrap().is_none());
    }

    #[test]
    fn test_reload_orders_partial_timestamps() {
        let (_dir, mut storage) = temp_storage();
        fs::write(
            storage.path(),
            br#"{"State.x": {"__class__": "State", "id": "x", "updated_at": "2017-09-28T21:05:54.119427", "name": "CA"}}"#,
        )
        .unwrap();

        storage.reload().unwrap();
        let state = storage.get(EntityKind::State, "x").unwrap().unwrap();
        assert!(state.base().created_at <= state.base().updated_at);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let (_dir, mut storage) = temp_storage();
        fs::write(storage.path(), b"{not json").unwrap();

        assert!(matches!(storage.reload(), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("missing").join("file.json"));
        storage.new(State::new("X").into()).unwrap();

        assert!(matches!(storage.save(), Err(StorageError::Io { .. })));
    }
}
