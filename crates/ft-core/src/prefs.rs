//! Preferences document shared by the category store and URL normalizer.
//!
//! The document is an ordered mapping from key to raw JSON. Each component
//! reads and writes only its own keys, so sibling configuration survives a
//! save untouched.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;

/// Errors reading or writing a preferences key.
#[derive(Debug, Error)]
pub enum PrefsError {
    /// The stored value does not have the expected shape.
    #[error("invalid value for preferences key {key}")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Error returned by a [`PreferencesSink`].
#[derive(Debug, Error)]
#[error("failed to persist preferences: {message}")]
pub struct PersistError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PersistError {
    /// Wraps an underlying error.
    pub fn new<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Raw preferences document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences {
    entries: BTreeMap<String, Box<RawValue>>,
}

impl Preferences {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        // Round-trip through Value so raw entries are re-indented.
        let value: serde_json::Value = serde_json::to_value(self)?;
        serde_json::to_string_pretty(&value)
    }

    /// Decodes the value stored under `key`, if present.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PrefsError> {
        self.entries
            .get(key)
            .map(|raw| {
                serde_json::from_str(raw.get()).map_err(|source| PrefsError::InvalidValue {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Encodes `value` under `key`, replacing any previous value.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), PrefsError> {
        let raw = serde_json::value::to_raw_value(value).map_err(|source| {
            PrefsError::InvalidValue {
                key: key.to_string(),
                source,
            }
        })?;
        self.entries.insert(key.to_string(), raw);
        Ok(())
    }

    /// Returns the raw JSON text stored under `key`.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|raw| raw.get())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns a document holding only the listed keys that are present.
    pub fn subset(&self, keys: &[&str]) -> Self {
        let entries = keys
            .iter()
            .filter_map(|key| {
                self.entries
                    .get_key_value(*key)
                    .map(|(k, v)| (k.clone(), v.clone()))
            })
            .collect();
        Self { entries }
    }

    /// Copies every entry of `other` into this document, overwriting on conflict.
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }
}

/// Durable persistence hook invoked after every category store mutation.
pub trait PreferencesSink: Send + Sync {
    /// Persists the keys owned by the caller; other keys must be preserved.
    fn save(&self, prefs: &Preferences) -> Result<(), PersistError>;
}

/// Sink that discards every save.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PreferencesSink for NullSink {
    fn save(&self, _prefs: &Preferences) -> Result<(), PersistError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_survive_roundtrip() {
        let mut prefs =
            Preferences::from_json(r##"{"theme":{"dark":true,"accent":"#ff0"},"categories":{}}"##)
                .unwrap();
        prefs.set("category_order", &["Work"]).unwrap();

        let json = prefs.to_json_pretty().unwrap();
        let reparsed = Preferences::from_json(&json).unwrap();

        let theme: serde_json::Value = reparsed.get("theme").unwrap().unwrap();
        assert_eq!(theme, serde_json::json!({"dark": true, "accent": "#ff0"}));
        let order: Vec<String> = reparsed.get("category_order").unwrap().unwrap();
        assert_eq!(order, vec!["Work".to_string()]);
    }

    #[test]
    fn get_missing_key_is_none() {
        let prefs = Preferences::new();
        let value: Option<Vec<String>> = prefs.get("category_order").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn get_wrong_shape_errors() {
        let prefs = Preferences::from_json(r#"{"category_order": 5}"#).unwrap();
        let err = prefs.get::<Vec<String>>("category_order").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for preferences key category_order"
        );
    }

    #[test]
    fn merge_overwrites_only_given_keys() {
        let mut base = Preferences::from_json(r#"{"a":1,"b":2}"#).unwrap();
        let update = Preferences::from_json(r#"{"b":3}"#).unwrap();
        base.merge_from(&update);

        assert_eq!(base.raw("a"), Some("1"));
        assert_eq!(base.raw("b"), Some("3"));
    }

    #[test]
    fn subset_keeps_listed_keys_only() {
        let prefs = Preferences::from_json(r#"{"a":1,"b":2,"c":3}"#).unwrap();
        let subset = prefs.subset(&["a", "c", "missing"]);

        assert_eq!(subset.keys().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(subset.raw("c"), Some("3"));
    }
}
