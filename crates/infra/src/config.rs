//! Configuration loading and representation.

use serde::{Deserialize, Serialize};

use handreceipt_inventory::{NormalizeOptions, UNKNOWN_GROUP};

pub const ENV_UNKNOWN_GROUP: &str = "HANDRECEIPT_UNKNOWN_GROUP";
pub const ENV_CANDIDATE_LIMIT: &str = "HANDRECEIPT_CANDIDATE_LIMIT";
pub const ENV_LOG: &str = "HANDRECEIPT_LOG";
pub const ENV_LOG_FORMAT: &str = "HANDRECEIPT_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Settings for one editing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Group label for catalog records without a name.
    pub unknown_group: String,
    /// Maximum number of candidates returned per search.
    pub candidate_limit: Option<usize>,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            unknown_group: UNKNOWN_GROUP.to_string(),
            candidate_limit: None,
            log_filter: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl EditorConfig {
    /// Read `HANDRECEIPT_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. Blank or unparsable values fall
    /// back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let candidate_limit = match get(ENV_CANDIDATE_LIMIT) {
            None => defaults.candidate_limit,
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) | Err(_) => {
                    tracing::warn!(value = %raw, "{ENV_CANDIDATE_LIMIT} must be a positive integer; ignoring");
                    defaults.candidate_limit
                }
                Ok(limit) => Some(limit),
            },
        };

        let log_format = match get(ENV_LOG_FORMAT).map(|v| v.to_ascii_lowercase()) {
            None => defaults.log_format,
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) if v == "pretty" => LogFormat::Pretty,
            Some(v) => {
                tracing::warn!(value = %v, "unknown {ENV_LOG_FORMAT}; using json");
                defaults.log_format
            }
        };

        Self {
            unknown_group: get(ENV_UNKNOWN_GROUP).unwrap_or(defaults.unknown_group),
            candidate_limit,
            log_filter: get(ENV_LOG).unwrap_or(defaults.log_filter),
            log_format,
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            unknown_group: self.unknown_group.clone(),
        }
    }

    /// Install process-wide logging with this configuration.
    pub fn init_observability(&self) {
        handreceipt_observability::init_with(&self.log_filter, self.log_format == LogFormat::Json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(EditorConfig::from_lookup(lookup(&[])), EditorConfig::default());
    }

    #[test]
    fn reads_every_setting() {
        let config = EditorConfig::from_lookup(lookup(&[
            (ENV_UNKNOWN_GROUP, " unsorted "),
            (ENV_CANDIDATE_LIMIT, "50"),
            (ENV_LOG, "handreceipt=debug"),
            (ENV_LOG_FORMAT, "Pretty"),
        ]));

        assert_eq!(config.unknown_group, "unsorted");
        assert_eq!(config.candidate_limit, Some(50));
        assert_eq!(config.log_filter, "handreceipt=debug");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.normalize_options().unknown_group, "unsorted");
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = EditorConfig::from_lookup(lookup(&[
            (ENV_UNKNOWN_GROUP, "   "),
            (ENV_CANDIDATE_LIMIT, "zero"),
            (ENV_LOG_FORMAT, "xml"),
        ]));
        assert_eq!(config, EditorConfig::default());

        let zero = EditorConfig::from_lookup(lookup(&[(ENV_CANDIDATE_LIMIT, "0")]));
        assert_eq!(zero.candidate_limit, None);
    }
}
