//! Cache-aside layer over the four catalog read operations.
//!
//! One bounded, expiring cache per driver instance, shared by all
//! requests. Concurrent misses for the same key both fetch and the last
//! insert wins; values are read-only snapshots of remote state within
//! the expiration window, so duplicate fetches are wasteful but never
//! incorrect. Remote failures propagate and are never cached.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use cellar_catalog::{Backup, CatalogTime, Resource, Snapshot};
use cellar_common::Error;

use crate::catalog_error;
use crate::driver::CellarFs;

#[derive(Clone)]
pub enum CacheValue {
    Backups(Arc<Vec<Backup>>),
    Resource(Arc<Resource>),
    Folder(Arc<Vec<Resource>>),
    Snapshots(Arc<Vec<Snapshot>>),
}

struct Entry {
    value: CacheValue,
    expires_at: Instant,
    last_access: u64,
}

struct Inner {
    map: HashMap<String, Entry>,
    tick: u64,
}

/// Bounded key-value cache with per-entry expiration and LRU eviction
/// on overflow. Entries past their deadline are treated as absent on
/// read; a full cache evicts the least recently accessed entry
/// regardless of its expiration status.
pub struct CatalogCache {
    inner: RwLock<Inner>,
    capacity: usize,
    ttl: Duration,
}

impl CatalogCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner {
                map: HashMap::new(),
                tick: 0,
            }),
            capacity,
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<CacheValue> {
        let now = Instant::now();
        let mut inner = self.inner.write().unwrap();
        inner.tick += 1;
        let tick = inner.tick;
        let expired = match inner.map.get_mut(key) {
            Some(entry) => {
                if entry.expires_at > now {
                    entry.last_access = tick;
                    return Some(entry.value.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            inner.map.remove(key);
        }
        None
    }

    pub fn insert(&self, key: String, value: CacheValue) {
        let now = Instant::now();
        let mut inner = self.inner.write().unwrap();
        inner.tick += 1;
        let tick = inner.tick;
        if !inner.map.contains_key(&key) && inner.map.len() >= self.capacity {
            inner.map.retain(|_, entry| entry.expires_at > now);
            if inner.map.len() >= self.capacity {
                let lru = inner
                    .map
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_access)
                    .map(|(key, _)| key.clone());
                if let Some(lru) = lru {
                    inner.map.remove(&lru);
                }
            }
        }
        inner.map.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
                last_access: tick,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse a rendered snapshot timestamp back with the same strftime
/// format. Date-only formats parse at midnight.
pub(crate) fn parse_snapshot_time(value: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = NaiveDateTime::parse_from_str(value, format) {
        return Some(Utc.from_utc_datetime(&t));
    }
    NaiveDate::parse_from_str(value, format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| Utc.from_utc_datetime(&t))
}

impl CellarFs {
    /// Backups of a user, with sources already remapped into the
    /// virtual filesystem view. The remapped list is what gets cached.
    pub(crate) async fn backups(&self, username: &str) -> Result<Arc<Vec<Backup>>, Error> {
        let key = format!("backups:{username}");
        if let Some(CacheValue::Backups(backups)) = self.cache.get(&key) {
            return Ok(backups);
        }
        let mut backups = self
            .client
            .list_backups(username)
            .await
            .map_err(|e| catalog_error("list backups", e))?;
        for backup in &mut backups {
            backup.source = self.tpl_storage.render(&backup.source)?;
        }
        debug!(username, count = backups.len(), "Backup list fetched");
        let backups = Arc::new(backups);
        self.cache
            .insert(key, CacheValue::Backups(backups.clone()));
        Ok(backups)
    }

    /// Stat a path inside a snapshot. The key carries the storage-view
    /// path; the catalog-view remapping happens at the remote call only.
    pub(crate) async fn stat_resource(
        &self,
        username: &str,
        backup_id: i64,
        snapshot: &str,
        path: &str,
    ) -> Result<Arc<Resource>, Error> {
        let key = format!("stat:{username}:{backup_id}:{snapshot}:{path}");
        if let Some(CacheValue::Resource(resource)) = self.cache.get(&key) {
            return Ok(resource);
        }
        let remote_path = self.tpl_catalog.render(path)?;
        let resource = self
            .client
            .stat(username, backup_id, snapshot, &remote_path)
            .await
            .map_err(|e| catalog_error("stat", e))?;
        let resource = Arc::new(resource);
        self.cache
            .insert(key, CacheValue::Resource(resource.clone()));
        Ok(resource)
    }

    /// List a folder inside a snapshot; same key and template policy as
    /// [`Self::stat_resource`].
    pub(crate) async fn folder_contents(
        &self,
        username: &str,
        backup_id: i64,
        snapshot: &str,
        path: &str,
    ) -> Result<Arc<Vec<Resource>>, Error> {
        let key = format!("list:{username}:{backup_id}:{snapshot}:{path}");
        if let Some(CacheValue::Folder(content)) = self.cache.get(&key) {
            return Ok(content);
        }
        let remote_path = self.tpl_catalog.render(path)?;
        let content = self
            .client
            .list_folder(username, backup_id, snapshot, &remote_path)
            .await
            .map_err(|e| catalog_error("list folder", e))?;
        let content = Arc::new(content);
        self.cache
            .insert(key, CacheValue::Folder(content.clone()));
        Ok(content)
    }

    /// Snapshots of a backup, with times truncated to the granularity
    /// of the configured format so that matching a snapshot by its
    /// rendered path segment is exact.
    pub(crate) async fn snapshots(
        &self,
        username: &str,
        backup_id: i64,
    ) -> Result<Arc<Vec<Snapshot>>, Error> {
        let key = format!("snapshots:{username}:{backup_id}");
        if let Some(CacheValue::Snapshots(snapshots)) = self.cache.get(&key) {
            return Ok(snapshots);
        }
        let mut snapshots = self
            .client
            .list_snapshots(username, backup_id)
            .await
            .map_err(|e| catalog_error("list snapshots", e))?;
        let format = &self.conf.snapshot_time_format;
        for snapshot in &mut snapshots {
            let rendered = snapshot.time.0.format(format).to_string();
            if let Some(truncated) = parse_snapshot_time(&rendered, format) {
                snapshot.time = CatalogTime(truncated);
            }
        }
        let snapshots = Arc::new(snapshots);
        self.cache
            .insert(key, CacheValue::Snapshots(snapshots.clone()));
        Ok(snapshots)
    }
}
