//! Read-only storage driver exposing cellar backup snapshots as a
//! virtual filesystem.
//!
//! Virtual paths resolve to `{backup source}/{snapshot}/{relative path}`
//! triples against the backup list of the requesting user. Metadata and
//! listings come from the backup catalog through a bounded, expiring
//! cache; everything that would mutate storage returns "not supported".

pub mod cache;
pub mod config;
pub mod driver;
pub mod resolve;
pub mod resource_id;
pub mod template;

use std::sync::Arc;

use cellar_common::{Error, HostContext, PluginRegistry, StorageDriver};
use cellar_catalog::{CatalogError, CatalogHttpClient, ClientConfig};

pub use config::Config;
pub use driver::CellarFs;
pub use resource_id::STORAGE_ID;

/// Register the driver with the host's plugin registry under its fixed
/// identifier.
pub fn register(registry: &mut PluginRegistry) {
    registry.register_storage(STORAGE_ID, new_driver);
}

fn new_driver(
    _host: &HostContext,
    config: &toml::Value,
) -> Result<Arc<dyn StorageDriver>, Error> {
    let config: Config = config
        .clone()
        .try_into()
        .map_err(|e| Error::InvalidConfig(format!("cellar driver config: {e}")))?;
    config.validate()?;
    let client = CatalogHttpClient::new(&ClientConfig {
        url: config.api_url.clone(),
        token: config.token.clone(),
        timeout_secs: config.timeout_secs,
    })
    .map_err(|e| Error::InvalidConfig(e.to_string()))?;
    Ok(Arc::new(CellarFs::new(config, Arc::new(client))?))
}

/// Map a catalog failure into the driver error taxonomy, naming the
/// operation that failed.
pub(crate) fn catalog_error(operation: &str, err: CatalogError) -> Error {
    match err {
        CatalogError::NotFound(what) => Error::NotFound(what),
        err => Error::internal(format!("{operation} failed"), err),
    }
}
