use crate::error::Error;
use crate::resource::{Reference, ResourceInfo};
use crate::user::RequestContext;

/// The host's gateway client, as seen by plugins.
///
/// HTTP plugins go through the gateway rather than a specific driver so
/// that path resolution honors the host's mount table. Only the calls
/// plugins actually issue are part of this contract.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    async fn stat(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
    ) -> Result<ResourceInfo, Error>;
}
