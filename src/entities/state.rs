// 🗺️ State Entity - groups cities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::base::{coerce_string, Base};
use super::{related, City};
use crate::error::{AttributeError, StorageResult};
use crate::storage::Storage;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
    #[serde(flatten)]
    pub base: Base,

    pub name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        State {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Cities whose state_id is this state, in storage key order
    pub fn cities(&self, storage: &mut dyn Storage) -> StorageResult<Vec<City>> {
        related(storage, |city: &City| city.state_id == self.base.id)
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
        match name {
            "name" => self.name = coerce_string(name, value)?,
            _ => {
                self.extra.insert(name.to_string(), value);
            }
        }
        Ok(())
    }
}
