//! Restore-management HTTP service plugin.
//!
//! Lets users trigger and follow restore jobs for paths they are
//! browsing through the companion storage driver. Routes are mounted by
//! the host under the configured prefix, behind its authentication
//! middleware.

pub mod config;
pub mod service;

use std::sync::Arc;

use cellar_catalog::{CatalogHttpClient, ClientConfig};
use cellar_common::{Error, HostContext, HttpService, PluginRegistry};

pub use config::Config;
pub use service::{RestoreService, RestoreOut};

/// Identifier the service registers under.
pub const SERVICE_ID: &str = "cellar";

pub fn register(registry: &mut PluginRegistry) {
    registry.register_http(SERVICE_ID, new_service);
}

fn new_service(
    host: &HostContext,
    config: &toml::Value,
) -> Result<Arc<dyn HttpService>, Error> {
    let config: Config = config
        .clone()
        .try_into()
        .map_err(|e| Error::InvalidConfig(format!("cellar http config: {e}")))?;
    let client = CatalogHttpClient::new(&ClientConfig {
        url: config.api_url.clone(),
        token: config.token.clone(),
        timeout_secs: config.timeout_secs,
    })
    .map_err(|e| Error::InvalidConfig(e.to_string()))?;
    let service = RestoreService::new(config, Arc::new(client), host.gateway.clone())?;
    Ok(Arc::new(service))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_common::{Gateway, Reference, RequestContext, ResourceInfo};

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

    fn minimal_config() -> toml::Value {
        toml::from_str(
            r#"
api_url = "https://catalog.example.org/api"
token = "secret"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_factory_builds_service_with_defaults() {
        let mut registry = PluginRegistry::new();
        register(&mut registry);
        let service = registry
            .new_http(SERVICE_ID, &host(), &minimal_config())
            .unwrap();
        // The defaulted prefix shows through the built service.
        assert_eq!(service.prefix(), "cellar");
        assert!(service.unprotected().is_empty());
    }

    #[test]
    fn test_unknown_service_id_rejected() {
        let mut registry = PluginRegistry::new();
        register(&mut registry);
        let err = registry
            .new_http("nope", &host(), &minimal_config())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_factory_rejects_missing_token() {
        let mut registry = PluginRegistry::new();
        register(&mut registry);
        let config: toml::Value =
            toml::from_str(r#"api_url = "https://catalog.example.org/api""#).unwrap();
        let err = registry
            .new_http(SERVICE_ID, &host(), &config)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
