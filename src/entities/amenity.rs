// 🛁 Amenity Entity

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::base::{coerce_string, Base};
use crate::error::AttributeError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Amenity {
    #[serde(flatten)]
    pub base: Base,

    pub name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Amenity {
    pub fn new(name: impl Into<String>) -> Self {
        Amenity {
            name: name.into(),
            ..Self::default()
        }
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
