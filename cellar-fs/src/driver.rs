//! The storage-driver facade.
//!
//! Composes the path resolver, the resource-ID codec and the cache-aside
//! layer into the host's metadata model. Three operations are real
//! (`get_md`, `list_folder`, `download`); the rest of the contract is
//! read-only by design and returns "not supported" unconditionally.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use cellar_catalog::{CatalogClient, Resource, Snapshot};
use cellar_common::resource::{
    ArbitraryMetadata, CreateStorageSpaceRequest, FileVersion, Grant, Grantee,
    ListStorageSpacesFilter, Lock, Quota, RecycleItem, ResourcePermissions, StorageSpace,
    UpdateStorageSpaceRequest,
};
use cellar_common::{
    ByteStream, Error, Reference, RequestContext, ResourceId, ResourceInfo, ResourceType,
    StorageDriver, Timestamp,
};
use cellar_common::user::UserId;

use crate::cache::{parse_snapshot_time, CatalogCache};
use crate::catalog_error;
use crate::config::Config;
use crate::resolve;
use crate::resource_id::{self, DecodedId, STORAGE_ID};
use crate::template::PathTemplate;

pub struct CellarFs {
    pub(crate) conf: Config,
    pub(crate) client: Arc<dyn CatalogClient>,
    pub(crate) cache: CatalogCache,
    pub(crate) tpl_storage: PathTemplate,
    pub(crate) tpl_catalog: PathTemplate,
}

impl CellarFs {
    pub fn new(conf: Config, client: Arc<dyn CatalogClient>) -> Result<Self, Error> {
        conf.validate()?;
        let tpl_storage = PathTemplate::compile(&conf.template_to_storage)?;
        let tpl_catalog = PathTemplate::compile(&conf.template_to_catalog)?;
        let cache = CatalogCache::new(
            conf.cache_size,
            Duration::from_secs(conf.cache_expiration_secs),
        );
        Ok(Self {
            conf,
            client,
            cache,
            tpl_storage,
            tpl_catalog,
        })
    }

    fn convert_to_resource_info(
        &self,
        resource: &Resource,
        path: &str,
        id: ResourceId,
        parent_id: ResourceId,
        owner: &UserId,
    ) -> ResourceInfo {
        let (rtype, permissions) = if resource.is_dir() {
            (ResourceType::Container, ResourcePermissions::directory())
        } else {
            (ResourceType::File, ResourcePermissions::file())
        };
        // mtime and etag come from the resource's ctime; the catalog's
        // ctime reflects ingestion and is what browsing exposes.
        let ctime = resource.ctime as u64;
        ResourceInfo {
            rtype,
            id,
            checksum: None,
            etag: ctime.to_string(),
            mime_type: detect_mime(resource.is_dir(), path),
            mtime: Timestamp::from_seconds(ctime),
            path: path.to_string(),
            permissions,
            size: resource.size,
            owner: Some(owner.clone()),
            parent_id: Some(parent_id),
        }
    }

    /// Directory record for a path segment that has no catalog entry:
    /// an ancestor of a backup source, or a snapshot shown as a folder.
    fn placeholder_resource_info(
        &self,
        path: &str,
        owner: &UserId,
        mtime: Option<Timestamp>,
        id: Option<ResourceId>,
    ) -> ResourceInfo {
        ResourceInfo {
            rtype: ResourceType::Container,
            id: id.unwrap_or_else(|| ResourceId {
                storage_id: STORAGE_ID.to_string(),
                opaque_id: path.to_string(),
            }),
            checksum: None,
            etag: String::new(),
            mime_type: "httpd/unix-directory".to_string(),
            mtime: mtime.unwrap_or_default(),
            path: path.to_string(),
            permissions: ResourcePermissions::directory(),
            size: 0,
            owner: Some(owner.clone()),
            parent_id: None,
        }
    }

    /// Find the snapshot whose (truncated) capture time matches the
    /// rendered timestamp segment of a virtual path.
    async fn get_snapshot(
        &self,
        username: &str,
        backup_id: i64,
        timestamp: &str,
    ) -> Result<Snapshot, Error> {
        let snapshots = self.snapshots(username, backup_id).await?;
        let wanted = parse_snapshot_time(timestamp, &self.conf.snapshot_time_format)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "snapshot {timestamp} from backup {backup_id} not found"
                ))
            })?;
        snapshots
            .iter()
            .find(|snapshot| snapshot.time.0 == wanted)
            .cloned()
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "snapshot {timestamp} from backup {backup_id} not found"
                ))
            })
    }

    /// Metadata for an already resolved `(source, snapshot, path)`.
    async fn resolved_md(
        &self,
        username: &str,
        owner: &UserId,
        resolved: DecodedId,
    ) -> Result<ResourceInfo, Error> {
        let DecodedId {
            source,
            snapshot,
            path,
            backup_id,
        } = resolved;
        if !snapshot.is_empty() && !path.is_empty() {
            // A concrete resource inside a snapshot: stat it in the
            // catalog under the source-relative location.
            let resource = self
                .stat_resource(username, backup_id, &snapshot, &path_join(&[&source, &path]))
                .await?;
            Ok(self.convert_to_resource_info(
                &resource,
                &path_join(&[&source, &snapshot, &path]),
                resource_id::encode(backup_id, &snapshot, &source, &path),
                resource_id::encode(backup_id, &snapshot, &source, parent_path(&path)),
                owner,
            ))
        } else if !snapshot.is_empty() {
            // The snapshot itself, shown as a directory named after its
            // capture time.
            let snap = self.get_snapshot(username, backup_id, &snapshot).await?;
            Ok(self.placeholder_resource_info(
                &path_join(&[&source, &snapshot]),
                owner,
                Some(Timestamp::from(snap.time.0)),
                Some(resource_id::encode(backup_id, &snapshot, &source, "")),
            ))
        } else {
            // The backup source itself.
            Ok(self.placeholder_resource_info(&source, owner, None, None))
        }
    }
}

#[async_trait::async_trait]
impl StorageDriver for CellarFs {
    async fn get_md(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        _md_keys: &[String],
    ) -> Result<ResourceInfo, Error> {
        let user = ctx.user()?;

        if let Some(id) = &reference.resource_id {
            // ID-based addressing bypasses path resolution entirely.
            let mut decoded = resource_id::decode(id).ok_or_else(|| {
                Error::BadRequest("resource id does not belong to the cellar driver".to_string())
            })?;
            if !reference.path.is_empty() {
                decoded.path = path_join(&[&decoded.path, &reference.path]);
            }
            return self.resolved_md(&user.username, &user.id, decoded).await;
        }

        let backups = self.backups(&user.username).await?;
        if let Some(resolved) = resolve::split_path(&reference.path, &backups) {
            let decoded = DecodedId {
                source: resolved.source,
                snapshot: resolved.snapshot,
                path: resolved.path,
                backup_id: resolved.backup_id,
            };
            return self.resolved_md(&user.username, &user.id, decoded).await;
        }

        // Not inside any backup; the path may still be an intermediate
        // folder on the way down to one.
        if resolve::is_parent_of_backup(&reference.path, &backups) {
            return Ok(self.placeholder_resource_info(&reference.path, &user.id, None, None));
        }

        Err(Error::NotFound(format!(
            "path {} does not exist",
            reference.path
        )))
    }

    async fn list_folder(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
        _md_keys: &[String],
    ) -> Result<Vec<ResourceInfo>, Error> {
        let user = ctx.user()?;
        let backups = self.backups(&user.username).await?;

        if let Some(resolved) = resolve::split_path(&reference.path, &backups) {
            if !resolved.snapshot.is_empty() {
                // Inside a snapshot: list the catalog folder.
                let content = self
                    .folder_contents(
                        &user.username,
                        resolved.backup_id,
                        &resolved.snapshot,
                        &path_join(&[&resolved.source, &resolved.path]),
                    )
                    .await?;
                let parent_id = resource_id::encode(
                    resolved.backup_id,
                    &resolved.snapshot,
                    &resolved.source,
                    &resolved.path,
                );
                return Ok(content
                    .iter()
                    .map(|entry| {
                        let base = file_name(&entry.name);
                        self.convert_to_resource_info(
                            entry,
                            &path_join(&[
                                &resolved.source,
                                &resolved.snapshot,
                                &resolved.path,
                                base,
                            ]),
                            resource_id::encode(
                                resolved.backup_id,
                                &resolved.snapshot,
                                &resolved.source,
                                &path_join(&[&resolved.path, base]),
                            ),
                            parent_id.clone(),
                            &user.id,
                        )
                    })
                    .collect());
            }

            // The backup source itself: its snapshots, one synthetic
            // directory per snapshot, named by the configured format.
            let snapshots = self
                .snapshots(&user.username, resolved.backup_id)
                .await?;
            debug!(
                username = %user.username,
                backup_id = resolved.backup_id,
                count = snapshots.len(),
                "Listing snapshots as folders"
            );
            return Ok(snapshots
                .iter()
                .map(|snapshot| {
                    let name = snapshot
                        .time
                        .0
                        .format(&self.conf.snapshot_time_format)
                        .to_string();
                    self.placeholder_resource_info(
                        &path_join(&[&resolved.source, &name]),
                        &user.id,
                        Some(Timestamp::from(snapshot.time.0)),
                        Some(resource_id::encode(
                            resolved.backup_id,
                            &name,
                            &resolved.source,
                            "",
                        )),
                    )
                })
                .collect());
        }

        // Ancestor of one or more backup sources: one synthetic entry
        // per distinct next segment.
        let children = resolve::backup_children(&reference.path, &backups);
        if !children.is_empty() {
            return Ok(children
                .iter()
                .map(|child| self.placeholder_resource_info(child, &user.id, None, None))
                .collect());
        }

        Err(Error::NotFound(format!(
            "path {} does not exist",
            reference.path
        )))
    }

    async fn download(
        &self,
        ctx: &RequestContext,
        reference: &Reference,
    ) -> Result<ByteStream, Error> {
        let user = ctx.user()?;

        let info = self.get_md(ctx, reference, &[]).await?;
        if info.rtype != ResourceType::File {
            return Err(Error::BadRequest("can only download files".to_string()));
        }

        let decoded = resource_id::decode(&info.id)
            .ok_or_else(|| Error::BadRequest("can only download files".to_string()))?;
        let remote_path = self
            .tpl_catalog
            .render(&path_join(&[&decoded.source, &decoded.path]))?;
        self.client
            .download(
                &user.username,
                decoded.backup_id,
                &decoded.snapshot,
                &remote_path,
            )
            .await
            .map_err(|e| catalog_error("download", e))
    }

    async fn get_home(&self, _ctx: &RequestContext) -> Result<String, Error> {
        Err(Error::not_supported())
    }

    async fn create_home(&self, _ctx: &RequestContext) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn create_dir(&self, _ctx: &RequestContext, _reference: &Reference) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn touch_file(&self, _ctx: &RequestContext, _reference: &Reference) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn delete(&self, _ctx: &RequestContext, _reference: &Reference) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn move_resource(
        &self,
        _ctx: &RequestContext,
        _old_ref: &Reference,
        _new_ref: &Reference,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn list_revisions(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
    ) -> Result<Vec<FileVersion>, Error> {
        Err(Error::not_supported())
    }

    async fn download_revision(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _key: &str,
    ) -> Result<ByteStream, Error> {
        Err(Error::not_supported())
    }

    async fn restore_revision(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _key: &str,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn get_path_by_id(
        &self,
        _ctx: &RequestContext,
        _id: &ResourceId,
    ) -> Result<String, Error> {
        Err(Error::not_supported())
    }

    async fn add_grant(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _grant: &Grant,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn remove_grant(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _grant: &Grant,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn update_grant(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _grant: &Grant,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn deny_grant(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _grantee: &Grantee,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn list_grants(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
    ) -> Result<Vec<Grant>, Error> {
        Err(Error::not_supported())
    }

    async fn get_quota(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
    ) -> Result<Quota, Error> {
        Err(Error::not_supported())
    }

    async fn create_reference(
        &self,
        _ctx: &RequestContext,
        _path: &str,
        _target_uri: &str,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn shutdown(&self, _ctx: &RequestContext) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn set_arbitrary_metadata(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _md: &ArbitraryMetadata,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn unset_arbitrary_metadata(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _keys: &[String],
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn empty_recycle(&self, _ctx: &RequestContext) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn list_recycle(
        &self,
        _ctx: &RequestContext,
        _base_path: &str,
        _key: &str,
        _relative_path: &str,
        _from: Option<Timestamp>,
        _to: Option<Timestamp>,
    ) -> Result<Vec<RecycleItem>, Error> {
        Err(Error::not_supported())
    }

    async fn restore_recycle_item(
        &self,
        _ctx: &RequestContext,
        _base_path: &str,
        _key: &str,
        _relative_path: &str,
        _restore_ref: &Reference,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn purge_recycle_item(
        &self,
        _ctx: &RequestContext,
        _base_path: &str,
        _key: &str,
        _relative_path: &str,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn create_storage_space(
        &self,
        _ctx: &RequestContext,
        _request: &CreateStorageSpaceRequest,
    ) -> Result<StorageSpace, Error> {
        Err(Error::not_supported())
    }

    async fn list_storage_spaces(
        &self,
        _ctx: &RequestContext,
        _filters: &[ListStorageSpacesFilter],
    ) -> Result<Vec<StorageSpace>, Error> {
        Err(Error::not_supported())
    }

    async fn update_storage_space(
        &self,
        _ctx: &RequestContext,
        _request: &UpdateStorageSpaceRequest,
    ) -> Result<StorageSpace, Error> {
        Err(Error::not_supported())
    }

    async fn set_lock(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _lock: &Lock,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn get_lock(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
    ) -> Result<Lock, Error> {
        Err(Error::not_supported())
    }

    async fn refresh_lock(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _lock: &Lock,
        _existing_lock_id: &str,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn unlock(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _lock: &Lock,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn upload(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _data: ByteStream,
        _metadata: &HashMap<String, String>,
    ) -> Result<(), Error> {
        Err(Error::not_supported())
    }

    async fn initiate_upload(
        &self,
        _ctx: &RequestContext,
        _reference: &Reference,
        _upload_length: i64,
        _metadata: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, Error> {
        Err(Error::not_supported())
    }
}

fn detect_mime(is_dir: bool, path: &str) -> String {
    if is_dir {
        return "httpd/unix-directory".to_string();
    }
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Join path fragments with single slashes, preserving the absoluteness
/// of the first non-empty fragment. Empty fragments are skipped.
pub(crate) fn path_join(parts: &[&str]) -> String {
    let mut joined = String::new();
    let mut absolute = false;
    let mut first = true;
    for part in parts {
        if part.is_empty() {
            continue;
        }
        if first {
            absolute = part.starts_with('/');
            first = false;
        }
        for segment in part.split('/').filter(|s| !s.is_empty()) {
            if !joined.is_empty() {
                joined.push('/');
            }
            joined.push_str(segment);
        }
    }
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Parent of a relative path; the empty string for a single segment.
pub(crate) fn parent_path(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((parent, _)) => parent,
        None => "",
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
