//! Typed records returned by the catalog API.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

/// One configured backup job. `source` is the absolute path on the
/// origin filesystem that the job covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub id: i64,
    pub group: Group,
    pub repository: String,
    pub username: String,
    pub name: String,
    pub source: String,
}

/// A point-in-time capture within a backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub time: CatalogTime,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Dir,
    File,
    #[serde(other)]
    Other,
}

/// A file or directory inside a snapshot. Timestamps are floating-point
/// seconds since the epoch, as the catalog reports them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub mode: u64,
    pub mtime: f64,
    pub atime: f64,
    pub ctime: f64,
    pub inode: u64,
    pub size: u64,
}

impl Resource {
    pub fn is_dir(&self) -> bool {
        self.kind == ResourceKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == ResourceKind::File
    }
}

/// A restore job submitted against a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restore {
    pub id: i64,
    pub backup_id: i64,
    #[serde(rename = "snapshot")]
    pub snapshot_id: String,
    pub destination: String,
    pub pattern: String,
    pub status: i64,
    pub created: CatalogTime,
}

/// Timestamp as the catalog renders it: `%Y-%m-%dT%H:%M:%S` without a
/// zone, with an RFC 3339 fallback. Serializes as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogTime(pub DateTime<Utc>);

const CATALOG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

impl<'de> Deserialize<'de> for CatalogTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        if let Ok(naive) = NaiveDateTime::parse_from_str(&value, CATALOG_TIME_FORMAT) {
            return Ok(CatalogTime(Utc.from_utc_datetime(&naive)));
        }
        DateTime::parse_from_rfc3339(&value)
            .map(|t| CatalogTime(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}

impl Serialize for CatalogTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}
