use serde::Deserialize;

use cellar_common::Error;

/// Restore-service configuration, decoded from the host's config file
/// section.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Mount prefix the host serves this plugin under.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Base URL of the catalog API.
    pub api_url: String,
    /// Bearer token for the catalog API.
    pub token: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Storage ID the companion driver registers under. Restores are
    /// only accepted for resources living in that namespace.
    #[serde(default = "default_storage_id")]
    pub storage_id: String,
    /// Template remapping catalog paths into the virtual filesystem
    /// view, matching the companion driver's configuration.
    #[serde(default = "default_template")]
    pub template_to_storage: String,
    /// Inverse template, virtual filesystem view back to catalog paths.
    #[serde(default = "default_template")]
    pub template_to_catalog: String,
}

fn default_prefix() -> String {
    "cellar".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_storage_id() -> String {
    "cellar".to_string()
}

fn default_template() -> String {
    "{{ path }}".to_string()
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if self.prefix.is_empty() {
            return Err(Error::InvalidConfig("prefix must not be empty".to_string()));
        }
        if self.api_url.is_empty() {
            return Err(Error::InvalidConfig("api_url must not be empty".to_string()));
        }
        if self.token.is_empty() {
            return Err(Error::InvalidConfig("token must not be empty".to_string()));
        }
        Ok(())
    }
}
