// 🏙️ City Entity - belongs to a State, hosts places

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::base::{coerce_string, Base};
use super::{related, Place};
use crate::error::{AttributeError, StorageResult};
use crate::storage::Storage;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct City {
    #[serde(flatten)]
    pub base: Base,

    /// Foreign key to State.id (not enforced by the file backend)
    pub state_id: String,
    pub name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl City {
    pub fn new(state_id: impl Into<String>, name: impl Into<String>) -> Self {
        City {
            state_id: state_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn places(&self, storage: &mut dyn Storage) -> StorageResult<Vec<Place>> {
        related(storage, |place: &Place| place.city_id == self.base.id)
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
        match name {
            "state_id" => self.state_id = coerce_string(name, value)?,
            "name" => self.name = coerce_string(name, value)?,
            _ => {
                self.extra.insert(name.to_string(), value);
            }
        }
        Ok(())
    }
}
