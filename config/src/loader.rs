//! # Environment Variable Loader
//!
//! Maps prefixed environment variables onto configuration keys.
//!
//! # Naming Convention
//! `FIXTURE__DATABASES__HIVE__TABLE_MANAGER_TYPE=hive` becomes
//! `databases.hive.table_manager_type = hive`: the prefix is stripped, `__`
//! separates key segments and segments are lowercased.

use crate::config::Configuration;
use std::env;

pub const DEFAULT_ENV_PREFIX: &str = "FIXTURE__";

/// Load configuration from the process environment.
pub fn load_from_env(prefix: &str) -> Configuration {
    load_from_vars(prefix, env::vars())
}

/// Load configuration from an explicit set of variables.
pub fn load_from_vars<I>(prefix: &str, vars: I) -> Configuration
where
    I: IntoIterator<Item = (String, String)>
{
    Configuration::from_pairs(vars.into_iter().filter_map(|(name, value)| {
        let rest = name.strip_prefix(prefix)?;
        if rest.is_empty() {
            return None;
        }
        let key = rest
            .split("__")
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(".");
        Some((key, value))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_load_from_vars_maps_segments() {
        let config = load_from_vars(
            DEFAULT_ENV_PREFIX,
            vec![
                (
                    "FIXTURE__DATABASES__HIVE__TABLE_MANAGER_TYPE".to_string(),
                    "hive".to_string()
                ),
                ("UNRELATED".to_string(), "x".to_string()),
                ("FIXTURE__".to_string(), "ignored".to_string())
            ]
        );
        assert_eq!(
            config.get_string("databases.hive.table_manager_type"),
            Some("hive")
        );
        assert_eq!(config.list_keys().len(), 1);
    }

    #[test]
    #[serial]
    fn test_load_from_env_overrides() {
        unsafe {
            env::set_var("FIXTURE__TESTS__DATA_PATH", "/data/fixtures");
        }

        let config = load_from_env(DEFAULT_ENV_PREFIX);
        assert_eq!(config.get_string("tests.data_path"), Some("/data/fixtures"));

        unsafe {
            env::remove_var("FIXTURE__TESTS__DATA_PATH");
        }
    }
}
