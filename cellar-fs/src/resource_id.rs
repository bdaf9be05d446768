//! Opaque resource-ID codec.
//!
//! The host addresses resources by ID across requests, so the resolved
//! `(backup, snapshot, source, relative path)` tuple is encoded into the
//! opaque part of a [`ResourceId`]: `#`-joined, then base64. The decode
//! side splits at most four times so `#` inside the trailing path field
//! survives; anything malformed decodes to `None` ("not mine"), never an
//! error, since foreign IDs routinely reach a driver.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use cellar_common::ResourceId;

/// Fixed identifier this driver registers under; the host routes calls
/// carrying IDs with this storage ID back to the driver.
pub const STORAGE_ID: &str = "cellar";

const SEPARATOR: char = '#';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedId {
    pub source: String,
    pub snapshot: String,
    pub path: String,
    pub backup_id: i64,
}

pub fn encode(backup_id: i64, snapshot: &str, source: &str, path: &str) -> ResourceId {
    let joined = format!("{backup_id}{SEPARATOR}{snapshot}{SEPARATOR}{source}{SEPARATOR}{path}");
    ResourceId {
        storage_id: STORAGE_ID.to_string(),
        opaque_id: BASE64.encode(joined),
    }
}

pub fn decode(id: &ResourceId) -> Option<DecodedId> {
    let data = BASE64.decode(&id.opaque_id).ok()?;
    let data = String::from_utf8(data).ok()?;
    let mut parts = data.splitn(4, SEPARATOR);
    let backup_id = parts.next()?.parse().ok()?;
    let snapshot = parts.next()?;
    let source = parts.next()?;
    let path = parts.next()?;
    Some(DecodedId {
        source: source.to_string(),
        snapshot: snapshot.to_string(),
        path: path.to_string(),
        backup_id,
    })
}

/// The restore view of an ID: full path (source joined with the
/// relative path), snapshot and backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub path: String,
    pub snapshot: String,
    pub backup_id: i64,
}

pub fn backup_info(id: &ResourceId) -> Option<BackupInfo> {
    let decoded = decode(id)?;
    Some(BackupInfo {
        path: crate::driver::path_join(&[&decoded.source, &decoded.path]),
        snapshot: decoded.snapshot,
        backup_id: decoded.backup_id,
    })
}
