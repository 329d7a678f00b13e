//! # Configuration Tree
//!
//! Opaque, immutable key/value configuration addressed by dotted keys
//! (`databases.hive.table_manager_type`). Backends read the subtree they are
//! bound to; nothing here knows what the keys mean.

use errors::{FixtureError, FixtureResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Hierarchical configuration flattened to dotted keys.
///
/// A subconfiguration remembers the prefix it was taken from so errors for
/// missing or malformed keys name the full key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    prefix: Option<String>,
    values: BTreeMap<String, String>
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>
    {
        Self {
            prefix: None,
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect()
        }
    }

    /// Flattens a JSON document. Nested objects become dotted keys, arrays
    /// use their index as key segment and scalars are stored as strings.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let mut values = BTreeMap::new();
        flatten_into(&mut values, None, value);
        Self {
            prefix: None,
            values
        }
    }

    /// Returns a copy with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_string_mandatory(&self, key: &str) -> FixtureResult<&str> {
        self.get_string(key)
            .ok_or_else(|| FixtureError::MissingSetting {
                key: self.full_key(key)
            })
    }

    pub fn get_bool(&self, key: &str) -> FixtureResult<Option<bool>> {
        match self.get_string(key) {
            None => Ok(None),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Some(true)),
                "false" | "no" | "off" | "0" => Ok(Some(false)),
                _ => Err(FixtureError::configuration(format!(
                    "{} is not a boolean: {}",
                    self.full_key(key),
                    raw
                )))
            }
        }
    }

    pub fn get_int(&self, key: &str) -> FixtureResult<Option<i64>> {
        match self.get_string(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<i64>().map(Some).map_err(|e| {
                FixtureError::configuration(format!(
                    "{} is not an integer ({}): {}",
                    self.full_key(key),
                    e,
                    raw
                ))
            })
        }
    }

    /// All leaf keys, sorted.
    pub fn list_keys(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    /// First key segments that have nested keys below them.
    pub fn list_prefixes(&self) -> BTreeSet<String> {
        self.values
            .keys()
            .filter_map(|key| key.split_once('.').map(|(head, _)| head.to_string()))
            .collect()
    }

    /// Keys nested under `prefix`, with the prefix stripped.
    pub fn subconfiguration(&self, prefix: &str) -> Configuration {
        let needle = format!("{prefix}.");
        let values = self
            .values
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&needle)
                    .map(|rest| (rest.to_string(), value.clone()))
            })
            .collect();
        Configuration {
            prefix: Some(self.full_key(prefix)),
            values
        }
    }

    /// Layers `other` on top of `self`; keys present in both take `other`'s
    /// value.
    pub fn overlay(&self, other: &Configuration) -> Configuration {
        let mut values = self.values.clone();
        values.extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        Configuration {
            prefix: self.prefix.clone(),
            values
        }
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&String, &String)> {
        self.values.iter()
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.to_string()
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.values {
            writeln!(f, "{} -> {}", self.full_key(key), value)?;
        }
        Ok(())
    }
}

fn flatten_into(
    values: &mut BTreeMap<String, String>,
    prefix: Option<&str>,
    value: &serde_json::Value
) {
    let join = |segment: &str| match prefix {
        Some(p) => format!("{p}.{segment}"),
        None => segment.to_string()
    };

    match value {
        serde_json::Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(values, Some(&join(key)), nested);
            }
        }
        serde_json::Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten_into(values, Some(&join(&index.to_string())), nested);
            }
        }
        serde_json::Value::Null => {}
        serde_json::Value::String(s) => {
            if let Some(key) = prefix {
                values.insert(key.to_string(), s.clone());
            }
        }
        scalar => {
            if let Some(key) = prefix {
                values.insert(key.to_string(), scalar.to_string());
            }
        }
    }
}
