//! # Configuration Precedence
//!
//! Merges configuration from multiple sources with precedence rules.
//!
//! # Precedence Order
//! Later layers win: defaults < file < environment < explicit overrides.

use crate::config::Configuration;
use tracing::debug;

/// Merge named configuration layers, lowest precedence first.
///
/// ## Usage
/// ```rust
/// use config::{Configuration, merge_configs};
///
/// let defaults = Configuration::from_pairs([("tests.data_path", "/tmp")]);
/// let env = Configuration::from_pairs([("tests.data_path", "/data")]);
/// let merged = merge_configs(vec![("defaults", defaults), ("env", env)]);
/// assert_eq!(merged.get_string("tests.data_path"), Some("/data"));
/// ```
pub fn merge_configs(layers: Vec<(&str, Configuration)>) -> Configuration {
    let mut merged = Configuration::new();
    for (source_name, layer) in layers {
        merged = merge_with_logging(merged, &layer, source_name);
    }
    merged
}

fn merge_with_logging(base: Configuration, layer: &Configuration, source_name: &str) -> Configuration {
    for (key, value) in layer.entries() {
        match base.get_string(key) {
            Some(previous) if previous != value.as_str() => {
                debug!(key = %key, source = source_name, "configuration value overridden");
            }
            None => {
                debug!(key = %key, source = source_name, "configuration value set");
            }
            _ => {}
        }
    }
    base.overlay(layer)
}
