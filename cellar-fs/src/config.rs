use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;

use cellar_common::Error;

/// Driver configuration, decoded from the host's config file section.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the catalog API.
    pub api_url: String,
    /// Bearer token for the catalog API.
    pub token: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum number of cached catalog responses.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Seconds a cached catalog response stays valid.
    #[serde(default = "default_cache_expiration")]
    pub cache_expiration_secs: u64,
    /// Template remapping catalog source paths into the virtual
    /// filesystem view. The path is available as `{{ path }}`.
    #[serde(default = "default_template")]
    pub template_to_storage: String,
    /// Inverse template, virtual filesystem view back to catalog paths.
    #[serde(default = "default_template")]
    pub template_to_catalog: String,
    /// strftime format used to render and parse the snapshot segment of
    /// virtual paths.
    #[serde(default = "default_time_format")]
    pub snapshot_time_format: String,
}

fn default_timeout() -> u64 {
    10
}

fn default_cache_size() -> usize {
    10_000
}

fn default_cache_expiration() -> u64 {
    300
}

fn default_template() -> String {
    "{{ path }}".to_string()
}

fn default_time_format() -> String {
    "%Y-%m-%dT%H:%M:%S".to_string()
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if self.api_url.is_empty() {
            return Err(Error::InvalidConfig("api_url must not be empty".to_string()));
        }
        if self.token.is_empty() {
            return Err(Error::InvalidConfig("token must not be empty".to_string()));
        }
        if self.cache_size == 0 {
            return Err(Error::InvalidConfig("cache_size must not be zero".to_string()));
        }
        if StrftimeItems::new(&self.snapshot_time_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::InvalidConfig(format!(
                "invalid snapshot_time_format: {}",
                self.snapshot_time_format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config: Config = toml::from_str(
            r#"
api_url = "https://catalog.example.org/api"
token = "secret"
"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.cache_size, 10_000);
        assert_eq!(config.cache_expiration_secs, 300);
        assert_eq!(config.template_to_storage, "{{ path }}");
        assert_eq!(config.snapshot_time_format, "%Y-%m-%dT%H:%M:%S");
    }

    #[test]
    fn test_missing_token_rejected() {
        let config: Config = toml::from_str(
            r#"
api_url = "https://catalog.example.org/api"
token = ""
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cache_size_rejected() {
        let config: Config = toml::from_str(
            r#"
api_url = "https://catalog.example.org/api"
token = "secret"
cache_size = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_time_format_rejected() {
        let config: Config = toml::from_str(
            r#"
api_url = "https://catalog.example.org/api"
token = "secret"
snapshot_time_format = "%Q"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
