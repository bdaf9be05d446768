//! Resource-metadata model used by the host's storage-driver contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    File,
    Container,
}

/// Storage-provider-scoped identifier for a resource. The `storage_id`
/// routes subsequent host calls back to the driver that minted the ID;
/// the `opaque_id` is meaningful only to that driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceId {
    pub storage_id: String,
    pub opaque_id: String,
}

/// Seconds-precision timestamp of the host metadata model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: u64,
}

impl Timestamp {
    pub fn from_seconds(seconds: u64) -> Self {
        Self { seconds }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(t: DateTime<Utc>) -> Self {
        Self {
            seconds: t.timestamp().max(0) as u64,
        }
    }
}

/// Capability set reported per resource. All mutation bits stay false
/// for read-only drivers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePermissions {
    pub stat: bool,
    pub get_path: bool,
    pub get_quota: bool,
    pub initiate_file_download: bool,
    pub list_container: bool,
    pub list_file_versions: bool,
    pub list_grants: bool,
    pub list_recycle: bool,
    pub create_container: bool,
    pub delete: bool,
    pub move_resource: bool,
    pub add_grant: bool,
    pub remove_grant: bool,
    pub update_grant: bool,
    pub deny_grant: bool,
    pub restore_file_version: bool,
    pub restore_recycle_item: bool,
    pub purge_recycle: bool,
    pub initiate_file_upload: bool,
}

impl ResourcePermissions {
    /// Read-only permissions for a file.
    pub fn file() -> Self {
        Self {
            stat: true,
            get_path: true,
            initiate_file_download: true,
            ..Self::default()
        }
    }

    /// Read-only permissions for a directory.
    pub fn directory() -> Self {
        Self {
            stat: true,
            get_path: true,
            list_container: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChecksum {
    pub algo: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceInfo {
    #[serde(rename = "type")]
    pub rtype: ResourceType,
    pub id: ResourceId,
    /// `None` means checksum unset.
    pub checksum: Option<ResourceChecksum>,
    pub etag: String,
    pub mime_type: String,
    pub mtime: Timestamp,
    pub path: String,
    pub permissions: ResourcePermissions,
    pub size: u64,
    pub owner: Option<super::user::UserId>,
    pub parent_id: Option<ResourceId>,
}

/// Reference to a resource, either by path or by a previously minted ID.
/// When both are set, the path is relative to the identified resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reference {
    pub resource_id: Option<ResourceId>,
    #[serde(default)]
    pub path: String,
}

impl Reference {
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            resource_id: None,
            path: path.into(),
        }
    }

    pub fn from_id(id: ResourceId) -> Self {
        Self {
            resource_id: Some(id),
            path: String::new(),
        }
    }
}

// Supporting types for the advanced-feature methods of the driver
// contract. Read-only drivers never produce these; they exist so the
// trait can state the full method set.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileVersion {
    pub key: String,
    pub size: u64,
    pub mtime: Timestamp,
    pub etag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GranteeType {
    User,
    Group,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grantee {
    pub gtype: GranteeType,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub grantee: Grantee,
    pub permissions: ResourcePermissions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    pub lock_id: String,
    pub holder: String,
    pub expiration: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecycleItem {
    pub key: String,
    pub path: String,
    pub size: u64,
    pub deletion_time: Timestamp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArbitraryMetadata {
    pub metadata: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Quota {
    pub total: u64,
    pub used: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSpace {
    pub id: String,
    pub name: String,
    pub space_type: String,
    pub owner: Option<super::user::UserId>,
    pub root: Option<ResourceId>,
    pub quota: Option<Quota>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStorageSpaceRequest {
    pub name: String,
    pub space_type: String,
    pub owner: Option<super::user::UserId>,
    pub quota: Option<Quota>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStorageSpaceRequest {
    pub space: StorageSpace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListStorageSpacesFilter {
    pub space_type: Option<String>,
    pub id: Option<String>,
    pub owner: Option<super::user::UserId>,
}
