// Storage abstraction - one interface, two backends
//
//   FileStorage  every instance in one JSON document, rewritten on save
//   DbStorage    SQLite tables behind a session-style transaction
//
// The backend is picked once at startup from StorageConfig; callers only
// ever see `Box<dyn Storage>`.

pub mod db;
pub mod file;

use std::collections::BTreeMap;

use crate::config::{StorageConfig, StorageKind};
use crate::entities::{storage_key, Entity, EntityKind};
use crate::error::StorageResult;

pub use db::DbStorage;
pub use file::FileStorage;

/// Instances keyed by `<ClassName>.<id>`
pub type Objects = BTreeMap<String, Entity>;

pub trait Storage: Send {
    /// Every persisted instance, optionally only those of one kind
    fn all(&mut self, kind: Option<EntityKind>) -> StorageResult<Objects>;

    /// Register an instance for the next save. Registering an instance that
    /// is already known replaces it.
    fn new(&mut self, entity: Entity) -> StorageResult<()>;

    /// Persist everything registered or changed since the last save
    fn save(&mut self) -> StorageResult<()>;

    /// Repopulate in-memory state from the backing store
    fn reload(&mut self) -> StorageResult<()>;

    /// Remove an instance. Unknown instances are ignored.
    fn delete(&mut self, entity: &Entity) -> StorageResult<()>;

    /// Release backend resources
    fn close(&mut self) -> StorageResult<()>;

    /// One instance by kind and id
    fn get(&mut self, kind: EntityKind, id: &str) -> StorageResult<Option<Entity>> {
        let key = storage_key(kind, id);
        Ok(self.all(Some(kind))?.remove(&key))
    }

    /// Number of instances, optionally of one kind
    fn count(&mut self, kind: Option<EntityKind>) -> StorageResult<usize> {
        Ok(self.all(kind)?.len())
    }
}

/// Build the configured backend and load its current contents
pub fn open(config: &StorageConfig) -> StorageResult<Box<dyn Storage>> {
    let mut storage: Box<dyn Storage> = match config.kind {
        StorageKind::File => Box::new(FileStorage::new(&config.file_path)),
        StorageKind::Db => Box::new(DbStorage::new(&config.db_path, config.drop_on_reload)),
    };

    tracing::info!(backend = ?config.kind, "opening storage");
    storage.reload()?;

    Ok(storage)
}

// ============================================================================
// TESTS
// ============================================================================

/// Contract shared by both backends, run against each of them
#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use crate::entities::{Amenity, City, Place, Review, State, User};

    pub fn new_then_save_is_listed(storage: &mut dyn Storage) {
        let state = Entity::from(State::new("California"));
        let key = format!("State.{}", state.id());

        storage.new(state.clone()).unwrap();
        storage.save().unwrap();

        let states = storage.all(Some(EntityKind::State)).unwrap();
        assert_eq!(states.get(&key), Some(&state));
        assert_eq!(storage.count(Some(EntityKind::State)).unwrap(), 1);
    }

    pub fn all_filters_by_kind(storage: &mut dyn Storage) {
        let state = State::new("Nevada");
        let city = City::new(&state.base.id, "Reno");
        let user = User::new("a@b.c", "pwd");
        storage.new(state.into()).unwrap();
        storage.new(city.into()).unwrap();
        storage.new(user.into()).unwrap();
        storage.save().unwrap();

        assert_eq!(storage.count(None).unwrap(), 3);
        assert_eq!(storage.count(Some(EntityKind::City)).unwrap(), 1);
        assert_eq!(storage.count(Some(EntityKind::Amenity)).unwrap(), 0);

        for (key, entity) in storage.all(Some(EntityKind::User)).unwrap() {
            assert!(key.starts_with("User."));
            assert_eq!(entity.kind(), EntityKind::User);
        }
    }

    pub fn delete_unknown_is_noop(storage: &mut dyn Storage) {
        storage.new(State::new("Oregon").into()).unwrap();
        storage.save().unwrap();
        let before = storage.all(None).unwrap();

        let stranger = Entity::from(State::new("Nowhere"));
        storage.delete(&stranger).unwrap();
        storage.save().unwrap();

        assert_eq!(storage.all(None).unwrap(), before);
    }

    pub fn delete_known_removes(storage: &mut dyn Storage) {
        let amenity = Entity::from(Amenity::new("Wifi"));
        storage.new(amenity.clone()).unwrap();
        storage.save().unwrap();

        storage.delete(&amenity).unwrap();
        storage.save().unwrap();

        assert!(storage.get(EntityKind::Amenity, amenity.id()).unwrap().is_none());
    }

    pub fn save_keeps_timestamps_ordered(storage: &mut dyn Storage) {
        let mut entity = Entity::from(User::new("x@y.z", "pwd"));
        entity.save(storage).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        entity.set_attribute("first_name", "Betty".into()).unwrap();
        entity.save(storage).unwrap();

        let stored = storage.get(EntityKind::User, entity.id()).unwrap().unwrap();
        assert!(stored.base().created_at < stored.base().updated_at);
        assert_eq!(stored, entity);
    }

    pub fn relationships_follow_foreign_keys(storage: &mut dyn Storage) {
        let state = State::new("California");
        let other_state = State::new("Arizona");
        let sf = City::new(&state.base.id, "San Francisco");
        let la = City::new(&state.base.id, "Los Angeles");
        let phoenix = City::new(&other_state.base.id, "Phoenix");
        let owner = User::new("owner@hbnb.io", "pwd");
        let wifi = Amenity::new("Wifi");
        let mut lodge = Place::new(&sf.base.id, &owner.base.id, "Lodge");
        lodge.add_amenity(&wifi);
        let review = Review::new(&lodge.base.id, &owner.base.id, "Great");

        for entity in [
            Entity::from(state.clone()),
            other_state.into(),
            sf.clone().into(),
            la.into(),
            phoenix.into(),
            owner.clone().into(),
            wifi.clone().into(),
            lodge.clone().into(),
            review.clone().into(),
        ] {
            storage.new(entity).unwrap();
        }
        storage.save().unwrap();

        let mut names: Vec<String> = state
            .cities(storage)
            .unwrap()
            .into_iter()
            .map(|city| city.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Los Angeles", "San Francisco"]);

        assert_eq!(sf.places(storage).unwrap(), vec![lodge.clone()]);
        assert_eq!(owner.places(storage).unwrap().len(), 1);
        assert_eq!(owner.reviews(storage).unwrap(), vec![review.clone()]);
        assert_eq!(lodge.reviews(storage).unwrap(), vec![review]);
        assert_eq!(lodge.amenities(storage).unwrap(), vec![wifi]);
    }

    pub fn run_all<F>(mut fresh: F)
    where
        F: FnMut() -> Box<dyn Storage>,
    {
        new_then_save_is_listed(fresh().as_mut());
        all_filters_by_kind(fresh().as_mut());
        delete_unknown_is_noop(fresh().as_mut());
        delete_known_removes(fresh().as_mut());
        save_keeps_timestamps_ordered(fresh().as_mut());
        relationships_follow_foreign_keys(fresh().as_mut());
    }
}
