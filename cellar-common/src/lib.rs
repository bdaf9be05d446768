//! Shared host-contract types for the cellar gateway plugins.
//!
//! The storage-gateway host instantiates plugins from its configuration
//! file; this crate carries the contracts both sides agree on: the
//! resource-metadata model, the storage-driver and HTTP-service traits,
//! the per-request user context, the error taxonomy, and the plugin
//! registry the host resolves driver identifiers against.

pub mod error;
pub mod gateway;
pub mod http;
pub mod registry;
pub mod resource;
pub mod storage;
pub mod user;

pub use error::Error;
pub use gateway::Gateway;
pub use http::HttpService;
pub use registry::{HostContext, PluginRegistry};
pub use resource::{Reference, ResourceId, ResourceInfo, ResourceType, Timestamp};
pub use storage::{ByteStream, StorageDriver};
pub use user::{RequestContext, User, UserId};
