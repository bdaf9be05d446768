//! Storage-driver contract required by the host framework.

use std::collections::HashMap;

use tokio::io::AsyncRead;

use crate::error::Error;
use crate::resource::{
    ArbitraryMetadata, CreateStorageSpaceRequest, FileVersion, Grant, Grantee,
    ListStorageSpacesFilter, Lock, Quota, RecycleItem, Reference, ResourceId, ResourceInfo,
    StorageSpace, Timestamp, UpdateStorageSpaceRequest,
};
use crate::user::RequestContext;

/// Byte stream returned by download operations.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// The full method set the host requires from a storage driver.
///
/// Every method must be implemented; drivers that do not support an
/// operation return [`Error::NotSupported`] rather than omitting it, so
/// the host can always dispatch.
impl std::fmt::Debug for dyn StorageDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StorageDriver")
    }
}

#[async_trait::async_trait]
pub trait StorageDriver: Send + Sync {
    async fn get_md(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        md_keys: &[String],
    ) -> Result<ResourceInfo, Error>;

    async fn list_folder(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        md_keys: &[String],
    ) -> Result<Vec<ResourceInfo>, Error>;

    async fn download(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
    ) -> Result<ByteStream, Error>;

    async fn get_home(&self, ctx: &RequestContext) -> Result<String, Error>;

    async fn create_home(&self, ctx: &RequestContext) -> Result<(), Error>;

    async fn create_dir(&self, ctx: &RequestContext, reference: &Reference) -> Result<(), Error>;

    async fn touch_file(&self, ctx: &RequestContext, reference: &Reference) -> Result<(), Error>;

    async fn delete(&self, ctx: &RequestContext, reference: &Reference) -> Result<(), Error>;

    async fn move_resource(
        &self,
        ctx: &RequestContext,
        old_ref: &Reference,
        new_ref: &Reference,
    ) -> Result<(), Error>;

    async fn list_revisions(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
    ) -> Result<Vec<FileVersion>, Error>;

    async fn download_revision(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        key: &str,
    ) -> Result<ByteStream, Error>;

    async fn restore_revision(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        key: &str,
    ) -> Result<(), Error>;

    async fn get_path_by_id(&self, ctx: &RequestContext, id: &ResourceId)
        -> Result<String, Error>;

    async fn add_grant(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        grant: &Grant,
    ) -> Result<(), Error>;

    async fn remove_grant(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        grant: &Grant,
    ) -> Result<(), Error>;

    async fn update_grant(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        grant: &Grant,
    ) -> Result<(), Error>;

    async fn deny_grant(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        grantee: &Grantee,
    ) -> Result<(), Error>;

    async fn list_grants(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
    ) -> Result<Vec<Grant>, Error>;

    async fn get_quota(&self, ctx: &RequestContext, reference: &Reference)
        -> Result<Quota, Error>;

    async fn create_reference(
        &self,
        ctx: &RequestContext,
        path: &str,
        target_uri: &str,
    ) -> Result<(), Error>;

    async fn shutdown(&self, ctx: &RequestContext) -> Result<(), Error>;

    async fn set_arbitrary_metadata(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        md: &ArbitraryMetadata,
    ) -> Result<(), Error>;

    async fn unset_arbitrary_metadata(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        keys: &[String],
    ) -> Result<(), Error>;

    async fn empty_recycle(&self, ctx: &RequestContext) -> Result<(), Error>;

    async fn list_recycle(
        &self,
        ctx: &RequestContext,
        base_path: &str,
        key: &str,
        relative_path: &str,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<RecycleItem>, Error>;

    async fn restore_recycle_item(
        &self,
        ctx: &RequestContext,
        base_path: &str,
        key: &str,
        relative_path: &str,
        restore_ref: &Reference,
    ) -> Result<(), Error>;

    async fn purge_recycle_item(
        &self,
        ctx: &RequestContext,
        base_path: &str,
        key: &str,
        relative_path: &str,
    ) -> Result<(), Error>;

    async fn create_storage_space(
        &self,
        ctx: &RequestContext,
        request: &CreateStorageSpaceRequest,
    ) -> Result<StorageSpace, Error>;

    async fn list_storage_spaces(
        &self,
        ctx: &RequestContext,
        filters: &[ListStorageSpacesFilter],
    ) -> Result<Vec<StorageSpace>, Error>;

    async fn update_storage_space(
        &self,
        ctx: &RequestContext,
        request: &UpdateStorageSpaceRequest,
    ) -> Result<StorageSpace, Error>;

    async fn set_lock(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        lock: &Lock,
    ) -> Result<(), Error>;

    async fn get_lock(&self, ctx: &RequestContext, reference: &Reference) -> Result<Lock, Error>;

    async fn refresh_lock(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        lock: &Lock,
        existing_lock_id: &str,
    ) -> Result<(), Error>;

    async fn unlock(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        lock: &Lock,
    ) -> Result<(), Error>;

    async fn upload(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        data: ByteStream,
        metadata: &HashMap<String, String>,
    ) -> Result<(), Error>;

    async fn initiate_upload(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        upload_length: i64,
        metadata: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, Error>;
}
