// 👤 User Entity - owns places and writes reviews

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::base::{coerce_string, Base};
use super::{related, Place, Review};
use crate::error::{AttributeError, StorageResult};
use crate::storage::Storage;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(flatten)]
    pub base: Base,

    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,

    /// Attributes set from the shell that the model does not declare
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        User {
            email: email.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Display name used by the listing pages
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Places whose user_id is this user
    pub fn places(&self, storage: &mut dyn Storage) -> StorageResult<Vec<Place>> {
        related(storage, |place: &Place| place.user_id == self.base.id)
    }

    /// Reviews written by this user
    pub fn reviews(&self, storage: &mut dyn Storage) -> StorageResult<Vec<Review>> {
        related(storage, |review: &Review| review.user_id == self.base.id)
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
        match name {
            "email" => self.email = coerce_string(name, value)?,
            "password" => self.password = coerce_string(name, value)?,
            "first_name" => self.first_name = coerce_string(name, value)?,
            "last_name" => self.last_name = coerce_string(name, value)?,
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
    fn test_user_creation() {
        let user = User::new("betty@holberton.io", "pwd");

        assert!(!user.base.id.is_empty());
        assert_eq!(user.email, "betty@holberton.io");
        assert_eq!(user.first_name, "");
        assert!(user.extra.is_empty());
    }

    #[test]
    fn test_user_full_name() {
        let mut user = User::default();
        assert_eq!(user.full_name(), "");

        user.first_name = "Betty".to_string();
        assert_eq!(user.full_name(), "Betty");

        user.last_name = "Bar".to_string();
        assert_eq!(user.full_name(), "Betty Bar");
    }

    #[test]
    fn test_user_unknown_attribute_goes_to_extra() {
        let mut user = User::default();
        user.set_attribute("name", json!("men")).unwrap();
        user.set_attribute("first_name", json!(89)).unwrap();

        assert_eq!(user.extra.get("name"), Some(&json!("men")));
        assert_eq!(user.first_name, "89");
    }
}
