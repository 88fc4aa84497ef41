// 🏠 Place Entity - a listing in a City, owned by a User
//
// Reviews and amenities are not stored on the place itself:
// - reviews are found by scanning Review.place_id
// - amenities are found through amenity_ids (place_amenity in the database)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::base::{coerce_float, coerce_int, coerce_string, coerce_string_list, Base};
use super::{related, Amenity, Review};
use crate::error::{AttributeError, StorageResult};
use crate::storage::Storage;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Place {
    #[serde(flatten)]
    pub base: Base,

    pub city_id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub number_rooms: i64,
    pub number_bathrooms: i64,
    pub max_guest: i64,
    pub price_by_night: i64,
    pub latitude: f64,
    pub longitude: f64,

    /// Linked Amenity ids, kept unique and in insertion order
    pub amenity_ids: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Place {
    pub fn new(
        city_id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Place {
            city_id: city_id.into(),
            user_id: user_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn reviews(&self, storage: &mut dyn Storage) -> StorageResult<Vec<Review>> {
        related(storage, |review: &Review| review.place_id == self.base.id)
    }

    pub fn amenities(&self, storage: &mut dyn Storage) -> StorageResult<Vec<Amenity>> {
        related(storage, |amenity: &Amenity| {
            self.amenity_ids.contains(&amenity.base.id)
        })
    }

    /// Link an amenity; linking the same one twice is a no-op
    pub fn add_amenity(&mut self, amenity: &Amenity) {
        if !self.amenity_ids.contains(&amenity.base.id) {
            self.amenity_ids.push(amenity.base.id.clone());
        }
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
        match name {
            "city_id" => self.city_id = coerce_string(name, value)?,
            "user_id" => self.user_id = coerce_string(name, value)?,
            "name" => self.name = coerce_string(name, value)?,
            "description" => self.description = coerce_string(name, value)?,
            "number_rooms" => self.number_rooms = coerce_int(name, value)?,
            "number_bathrooms" => self.number_bathrooms = coerce_int(name, value)?,
            "max_guest" => self.max_guest = coerce_int(name, value)?,
            "price_by_night" => self.price_by_night = coerce_int(name, value)?,
            "latitude" => self.latitude = coerce_float(name, value)?,
            "longitude" => self.longitude = coerce_float(name, value)?,
            "amenity_ids" => self.amenity_ids = coerce_string_list(name, value)?,
            _ => {
                self.extra.insert(name.to_string(), value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_place_defaults() {
        let place = Place::new("city-1", "user-1", "Lodge");

        assert_eq!(place.number_rooms, 0);
        assert_eq!(place.latitude, 0.0);
        assert!(place.amenity_ids.is_empty());
        assert_eq!(place.description, "");
    }

    #[test]
    fn test_place_add_amenity_once() {
        let mut place = Place::default();
        let wifi = Amenity::new("Wifi");

        place.add_amenity(&wifi);
        place.add_amenity(&wifi);
        place.add_amenity(&Amenity::new("Cable"));

        assert_eq!(place.amenity_ids.len(), 2);
        assert_eq!(place.amenity_ids[0], wifi.base.id);
    }

    #[test]
    fn test_place_typed_attributes() {
        let mut place = Place::default();

        place.set_attribute("number_rooms", json!("4")).unwrap();
        place.set_attribute("latitude", json!(37.77)).unwrap();
        place.set_attribute("price_by_night", json!(100)).unwrap();

        assert_eq!(place.number_rooms, 4);
        assert_eq!(place.latitude, 37.77);
        assert_eq!(place.price_by_night, 100);

        // Malformed values leave the field untouched
        assert!(place.set_attribute("longitude", json!("a")).is_err());
        assert_eq!(place.longitude, 0.0);
        assert!(place.set_attribute("max_guest", json!("many")).is_err());
        assert_eq!(place.max_guest, 0);
    }
}
