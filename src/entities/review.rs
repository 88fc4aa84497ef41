// ✍️ Review Entity - a user's text about a place

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::base::{coerce_string, Base};
use crate::error::AttributeError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Review {
    #[serde(flatten)]
    pub base: Base,

    pub place_id: String,
    pub user_id: String,
    pub text: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Review {
    pub fn new(
        place_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Review {
            place_id: place_id.into(),
            user_id: user_id.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
        match name {
            "place_id" => self.place_id = coerce_string(name, value)?,
            "user_id" => self.user_id = coerce_string(name, value)?,
            "text" => self.text = coerce_string(name, value)?,
            _ => {
                self.extra.insert(name.to_string(), value);
            }
        }
        Ok(())
    }
}
