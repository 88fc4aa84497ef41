// Entity Models
//
// Each entity has:
// - Stable identity (UUID) and created/updated timestamps (see base.rs)
// - Declared attributes, plus an open map for attributes set from the shell
// - One definition for both backends: the storage trait decides how it is kept

pub mod amenity;
pub mod base;
pub mod city;
pub mod place;
pub mod review;
pub mod state;
pub mod user;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use amenity::Amenity;
pub use base::{Base, BaseModel};
pub use city::City;
pub use place::Place;
pub use review::Review;
pub use state::State;
pub use user::User;

use crate::error::{AttributeError, StorageResult};
use crate::storage::Storage;

/// Key holding the class name inside a serialized entity
pub const CLASS_KEY: &str = "__class__";

/// Attributes the shell is never allowed to assign
pub const READ_ONLY: &[&str] = &["id", "created_at", "updated_at", CLASS_KEY];

// ============================================================================
// ENTITY KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    BaseModel,
    User,
    State,
    City,
    Amenity,
    Place,
    Review,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::BaseModel => "BaseModel",
            EntityKind::User => "User",
            EntityKind::State => "State",
            EntityKind::City => "City",
            EntityKind::Amenity => "Amenity",
            EntityKind::Place => "Place",
            EntityKind::Review => "Review",
        }
    }

    /// Every kind, in the order the shell lists them
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::BaseModel,
            EntityKind::User,
            EntityKind::State,
            EntityKind::City,
            EntityKind::Amenity,
            EntityKind::Place,
            EntityKind::Review,
        ]
    }

    /// Relational table, None for kinds that are not mapped
    pub fn table(&self) -> Option<&'static str> {
        match self {
            EntityKind::BaseModel => None,
            EntityKind::User => Some("users"),
            EntityKind::State => Some("states"),
            EntityKind::City => Some("cities"),
            EntityKind::Amenity => Some("amenities"),
            EntityKind::Place => Some("places"),
            EntityKind::Review => Some("reviews"),
        }
    }

    /// Fresh instance with default attributes
    pub fn instantiate(&self) -> Entity {
        match self {
            EntityKind::BaseModel => Entity::BaseModel(BaseModel::default()),
            EntityKind::User => Entity::User(User::default()),
            EntityKind::State => Entity::State(State::default()),
            EntityKind::City => Entity::City(City::default()),
            EntityKind::Amenity => Entity::Amenity(Amenity::default()),
            EntityKind::Place => Entity::Place(Place::default()),
            EntityKind::Review => Entity::Review(Review::default()),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown class name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown class: {}", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

// ============================================================================
// ENTITY
// ============================================================================

/// Any persisted record. Serializes as the flat attribute dictionary with
/// the class name under `__class__`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__class__")]
pub enum Entity {
    BaseModel(BaseModel),
    User(User),
    State(State),
    City(City),
    Amenity(Amenity),
    Place(Place),
    Review(Review),
}

macro_rules! each_entity {
    ($entity:expr, $model:ident => $body:expr) => {
        match $entity {
            Entity::BaseModel($model) => $body,
            Entity::User($model) => $body,
            Entity::State($model) => $body,
            Entity::City($model) => $body,
            Entity::Amenity($model) => $body,
            Entity::Place($model) => $body,
            Entity::Review($model) => $body,
        }
    };
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::BaseModel(_) => EntityKind::BaseModel,
            Entity::User(_) => EntityKind::User,
            Entity::State(_) => EntityKind::State,
            Entity::City(_) => EntityKind::City,
            Entity::Amenity(_) => EntityKind::Amenity,
            Entity::Place(_) => EntityKind::Place,
            Entity::Review(_) => EntityKind::Review,
        }
    }

    pub fn base(&self) -> &Base {
        each_entity!(self, model => &model.base)
    }

    pub fn base_mut(&mut self) -> &mut Base {
        each_entity!(self, model => &mut model.base)
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    /// Storage key: `<ClassName>.<id>`
    pub fn key(&self) -> String {
        storage_key(self.kind(), self.id())
    }

    /// Refresh updated_at
    pub fn touch(&mut self) {
        self.base_mut().touch();
    }

    /// Full attribute dictionary, `__class__` included
    pub fn to_dict(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    /// Rebuild an entity from its attribute dictionary.
    /// Missing attributes take their defaults; a missing id is generated.
    pub fn from_dict(dict: Map<String, Value>) -> Result<Entity, serde_json::Error> {
        serde_json::from_value(Value::Object(dict))
    }

    /// Assign one attribute by name, coercing the value to the declared type
    pub fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
        if READ_ONLY.contains(&name) {
            return Err(AttributeError::ReadOnly(name.to_string()));
        }

        each_entity!(self, model => model.set_attribute(name, value))
    }

    /// Refresh updated_at, register with the storage, and persist
    pub fn save(&mut self, storage: &mut dyn Storage) -> StorageResult<()> {
        self.touch();
        storage.new(self.clone())?;
        storage.save()
    }
}

impl fmt::Display for Entity {
    /// `[Place] (<id>) {'city_id': '0001', 'name': 'My house', ...}`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dict = self.to_dict().map_err(|_| fmt::Error)?;
        dict.remove(CLASS_KEY);

        write!(
            f,
            "[{}] ({}) {}",
            self.kind(),
            self.id(),
            base::py_repr(&Value::Object(dict))
        )
    }
}

pub fn storage_key(kind: EntityKind, id: &str) -> String {
    format!("{}.{}", kind.as_str(), id)
}

// ============================================================================
// TYPED ACCESS
// ============================================================================

/// A concrete entity type that can be pulled back out of an [`Entity`]
pub trait Model: Sized + Into<Entity> + TryFrom<Entity, Error = Entity> {
    const KIND: EntityKind;

    fn base(&self) -> &Base;
}

macro_rules! impl_model {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Entity {
                fn from(model: $variant) -> Self {
                    Entity::$variant(model)
                }
            }

            impl TryFrom<Entity> for $variant {
                type Error = Entity;

                fn try_from(entity: Entity) -> Result<Self, Entity> {
                    match entity {
                        Entity::$variant(model) => Ok(model),
                        other => Err(other),
                    }
                }
            }

            impl Model for $variant {
                const KIND: EntityKind = EntityKind::$variant;

                fn base(&self) -> &Base {
                    &self.base
                }
            }
        )*
    };
}

impl_model!(BaseModel, User, State, City, Amenity, Place, Review);

/// Every stored `T` matching the predicate: a linear scan over `all(T::KIND)`.
/// Foreign keys are plain strings, nothing checks that the target exists.
pub fn related<T, F>(storage: &mut dyn Storage, predicate: F) -> StorageResult<Vec<T>>
where
    T: Model,
    F: Fn(&T) -> bool,
{
    let found = storage.all(Some(T::KIND))?;

    Ok(found
        .into_values()
        .filter_map(|entity| T::try_from(entity).ok())
        .filter(|model| predicate(model))
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_round_trip_names() {
        for kind in EntityKind::all() {
            assert_eq!(kind.as_str().parse::<EntityKind>(), Ok(*kind));
        }

        assert!("Galaxy".parse::<EntityKind>().is_err());
        assert!("user".parse::<EntityKind>().is_err(), "class names are case-sensitive");
    }

    #[test]
    fn test_only_base_model_is_unmapped() {
        let unmapped: Vec<_> = EntityKind::all()
            .iter()
            .filter(|kind| kind.table().is_none())
            .collect();

        assert_eq!(unmapped, vec![&EntityKind::BaseModel]);
    }

    #[test]
    fn test_to_dict_shape() {
        let entity = Entity::from(State::new("California"));
        let dict = entity.to_dict().unwrap();

        assert_eq!(dict.get(CLASS_KEY), Some(&json!("State")));
        assert_eq!(dict.get("name"), Some(&json!("California")));
        assert_eq!(dict.get("id"), Some(&json!(entity.id())));
        assert!(dict["created_at"].as_str().unwrap().contains('T'));
        assert_eq!(entity.key(), format!("State.{}", entity.id()));
    }

    #[test]
    fn test_from_dict_keeps_identity_and_extras() {
        let mut place = Place::new("0001", "u1", "My house");
        place.extra.insert("color".to_string(), json!("blue"));
        let entity = Entity::from(place);

        let dict = entity.to_dict().unwrap();
        let back = Entity::from_dict(dict).unwrap();

        assert_eq!(back, entity);
        match back {
            Entity::Place(place) => assert_eq!(place.extra.get("color"), Some(&json!("blue"))),
            other => panic!("expected a Place, got {}", other.kind()),
        }
    }

    #[test]
    fn test_from_dict_fills_missing_fields() {
        let mut dict = Map::new();
        dict.insert(CLASS_KEY.to_string(), json!("City"));
        dict.insert("name".to_string(), json!("San Francisco"));

        let entity = Entity::from_dict(dict).unwrap();

        assert_eq!(entity.kind(), EntityKind::City);
        assert!(!entity.id().is_empty());
        assert!(entity.base().created_at <= entity.base().updated_at);
    }

    #[test]
    fn test_from_dict_missing_created_at_keeps_order() {
        let mut dict = Map::new();
        dict.insert(CLASS_KEY.to_string(), json!("State"));
        dict.insert("id".to_string(), json!("x"));
        dict.insert("updated_at".to_string(), json!("2017-09-28T21:05:54.119427"));

        let entity = Entity::from_dict(dict).unwrap();

        assert_eq!(entity.id(), "x");
        assert!(entity.base().created_at <= entity.base().updated_at);
        assert_eq!(
            entity.to_dict().unwrap()["created_at"],
            json!("2017-09-28T21:05:54.119427")
        );
    }

    #[test]
    fn test_read_only_attributes() {
        let mut entity = Entity::from(User::default());
        let id = entity.id().to_string();

        for name in READ_ONLY {
            assert_eq!(
                entity.set_attribute(name, json!("x")),
                Err(AttributeError::ReadOnly(name.to_string()))
            );
        }
        assert_eq!(entity.id(), id);
    }

    #[test]
    fn test_display_format() {
        let mut place = Place::new("0001", "", "My house");
        place.number_rooms = 4;
        place.latitude = 37.77;
        let entity = Entity::from(place);
        let shown = entity.to_string();

        assert!(shown.starts_with(&format!("[Place] ({}) {{", entity.id())));
        assert!(shown.contains("'city_id': '0001'"));
        assert!(shown.contains("'name': 'My house'"));
        assert!(shown.contains("'number_rooms': 4"));
        assert!(shown.contains("'latitude': 37.77"));
        assert!(!shown.contains(CLASS_KEY));
    }

    #[test]
    fn test_try_from_wrong_variant() {
        let entity = Entity::from(Amenity::new("Wifi"));

        let back = State::try_from(entity.clone());
        assert_eq!(back, Err(entity));
    }
}
