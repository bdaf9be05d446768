//! Client for the cellar backup-catalog service.
//!
//! The catalog tracks backup jobs, their snapshots, and the files inside
//! each snapshot. This crate carries the typed records the catalog
//! returns, the [`CatalogClient`] trait the storage driver and the
//! restore service consume, and the reqwest-based implementation.

mod client;
mod records;

pub use client::{CatalogHttpClient, ClientConfig};
pub use records::{Backup, CatalogTime, Group, Resource, ResourceKind, Restore, Snapshot};

use cellar_common::ByteStream;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("catalog returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// The four read operations plus the restore-management calls exposed by
/// the catalog. The service token is authorized to impersonate; the
/// acting username is passed explicitly on every call.
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_backups(&self, username: &str) -> Result<Vec<Backup>, CatalogError>;

    async fn list_snapshots(
        &self,
        username: &str,
        backup_id: i64,
    ) -> Result<Vec<Snapshot>, CatalogError>;

    async fn stat(
        &self,
        username: &str,
        backup_id: i64,
        snapshot: &str,
        path: &str,
    ) -> Result<Resource, CatalogError>;

    async fn list_folder(
        &self,
        username: &str,
        backup_id: i64,
        snapshot: &str,
        path: &str,
    ) -> Result<Vec<Resource>, CatalogError>;

    async fn download(
        &self,
        username: &str,
        backup_id: i64,
        snapshot: &str,
        path: &str,
    ) -> Result<ByteStream, CatalogError>;

    async fn list_restores(&self, username: &str) -> Result<Vec<Restore>, CatalogError>;

    async fn get_restore(&self, username: &str, restore_id: i64)
        -> Result<Restore, CatalogError>;

    async fn create_restore(
        &self,
        username: &str,
        backup_id: i64,
        pattern: &str,
        snapshot: &str,
    ) -> Result<Restore, CatalogError>;
}
