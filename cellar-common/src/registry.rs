//! Plugin registry: maps stable driver identifiers to factories.
//!
//! The host populates one registry at process start (each plugin crate
//! exposes a `register` function) and later instantiates plugins from
//! its configuration file by identifier.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::error::Error;
use crate::gateway::Gateway;
use crate::http::HttpService;
use crate::storage::StorageDriver;

/// Host-side collaborators handed to plugin factories.
#[derive(Clone)]
pub struct HostContext {
    pub gateway: Arc<dyn Gateway>,
}

pub type StorageDriverFactory =
    fn(&HostContext, &toml::Value) -> Result<Arc<dyn StorageDriver>, Error>;
pub type HttpServiceFactory = fn(&HostContext, &toml::Value) -> Result<Arc<dyn HttpService>, Error>;

#[derive(Default)]
pub struct PluginRegistry {
    storage: HashMap<String, StorageDriverFactory>,
    http: HashMap<String, HttpServiceFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_storage(&mut self, id: &str, factory: StorageDriverFactory) {
        if self.storage.insert(id.to_string(), factory).is_some() {
            warn!(id, "Storage driver registration replaced");
        }
    }

    pub fn register_http(&mut self, id: &str, factory: HttpServiceFactory) {
        if self.http.insert(id.to_string(), factory).is_some() {
            warn!(id, "HTTP service registration replaced");
        }
    }

    pub fn new_storage(
        &self,
        id: &str,
        host: &HostContext,
        config: &toml::Value,
    ) -> Result<Arc<dyn StorageDriver>, Error> {
        let factory = self
            .storage
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("storage driver {id} not registered")))?;
        factory(host, config)
    }

    pub fn new_http(
        &self,
        id: &str,
        host: &HostContext,
        config: &toml::Value,
    ) -> Result<Arc<dyn HttpService>, Error> {
        let factory = self
            .http
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("http service {id} not registered")))?;
        factory(host, config)
    }

    pub fn storage_ids(&self) -> Vec<&str> {
        self.storage.keys().map(String::as_str).collect()
    }

    pub fn http_ids(&self) -> Vec<&str> {
        self.http.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Reference, ResourceInfo};
    use crate::user::RequestContext;

    struct NoGateway;

    #[async_trait::async_trait]
    impl Gateway for NoGateway {
        async fn stat(
            &self,
            _ctx: &RequestContext,
            reference: &Reference,
        ) -> Result<ResourceInfo, Error> {
            Err(Error::NotFound(reference.path.clone()))
        }
    }

    fn host() -> HostContext {
        HostContext {
            gateway: Arc::new(NoGateway),
        }
    }

    #[test]
    fn test_unknown_driver_id() {
        let registry = PluginRegistry::new();
        let config = toml::Value::Table(toml::value::Table::new());
        let err = registry.new_storage("nope", &host(), &config).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_factory_error_propagates() {
        let mut registry = PluginRegistry::new();
        registry.register_storage("broken", |_, _| {
            Err(Error::InvalidConfig("missing token".to_string()))
        });
        let config = toml::Value::Table(toml::value::Table::new());
        let err = registry.new_storage("broken", &host(), &config).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
