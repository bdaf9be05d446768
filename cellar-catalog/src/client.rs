//! Reqwest-based implementation of [`CatalogClient`].

use std::time::Duration;

use futures_util::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::io::StreamReader;
use tracing::debug;

use cellar_common::ByteStream;

use crate::records::{Backup, Resource, Restore, Snapshot};
use crate::{CatalogClient, CatalogError};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub url: String,
    pub token: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

pub struct CatalogHttpClient {
    client: Client,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl CatalogHttpClient {
    /// The configured timeout bounds every metadata request. Downloads
    /// only get the connect timeout so large transfers are not killed
    /// mid-stream.
    pub fn new(config: &ClientConfig) -> Result<Self, CatalogError> {
        if config.url.is_empty() {
            return Err(CatalogError::InvalidConfig(
                "catalog url must not be empty".to_string(),
            ));
        }
        if config.token.is_empty() {
            return Err(CatalogError::InvalidConfig(
                "catalog token must not be empty".to_string(),
            ));
        }
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = self.url(path);
        debug!(%url, "Catalog request");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(CatalogError::NotFound(url)),
            status if status.is_success() => Ok(resp.json().await?),
            status => Err(CatalogError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl CatalogClient for CatalogHttpClient {
    async fn list_backups(&self, username: &str) -> Result<Vec<Backup>, CatalogError> {
        self.get_json("/backups", &[("username", username)]).await
    }

    async fn list_snapshots(
        &self,
        username: &str,
        backup_id: i64,
    ) -> Result<Vec<Snapshot>, CatalogError> {
        self.get_json(
            &format!("/backups/{backup_id}/snapshots"),
            &[("username", username)],
        )
        .await
    }

    async fn stat(
        &self,
        username: &str,
        backup_id: i64,
        snapshot: &str,
        path: &str,
    ) -> Result<Resource, CatalogError> {
        let snapshot = urlencoding::encode(snapshot);
        self.get_json(
            &format!("/backups/{backup_id}/snapshots/{snapshot}/stat"),
            &[("username", username), ("path", path)],
        )
        .await
    }

    async fn list_folder(
        &self,
        username: &str,
        backup_id: i64,
        snapshot: &str,
        path: &str,
    ) -> Result<Vec<Resource>, CatalogError> {
        let snapshot = urlencoding::encode(snapshot);
        self.get_json(
            &format!("/backups/{backup_id}/snapshots/{snapshot}/ls"),
            &[("username", username), ("path", path)],
        )
        .await
    }

    async fn download(
        &self,
        username: &str,
        backup_id: i64,
        snapshot: &str,
        path: &str,
    ) -> Result<ByteStream, CatalogError> {
        let snapshot = urlencoding::encode(snapshot);
        let url = self.url(&format!("/backups/{backup_id}/snapshots/{snapshot}/download"));
        debug!(%url, path, "Catalog download");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("username", username), ("path", path)])
            .send()
            .await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(CatalogError::NotFound(url)),
            status if status.is_success() => {
                let stream = resp
                    .bytes_stream()
                    .map_err(std::io::Error::other)
                    .boxed();
                Ok(Box::new(StreamReader::new(stream)))
            }
            status => Err(CatalogError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn list_restores(&self, username: &str) -> Result<Vec<Restore>, CatalogError> {
        self.get_json("/restores", &[("username", username)]).await
    }

    async fn get_restore(
        &self,
        username: &str,
        restore_id: i64,
    ) -> Result<Restore, CatalogError> {
        self.get_json(&format!("/restores/{restore_id}"), &[("username", username)])
            .await
    }

    async fn create_restore(
        &self,
        username: &str,
        backup_id: i64,
        pattern: &str,
        snapshot: &str,
    ) -> Result<Restore, CatalogError> {
        let url = self.url("/restores");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .query(&[("username", username)])
            .json(&serde_json::json!({
                "backup_id": backup_id,
                "pattern": pattern,
                "snapshot": snapshot,
            }))
            .timeout(self.timeout)
            .send()
            .await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(CatalogError::NotFound(url)),
            status if status.is_success() => Ok(resp.json().await?),
            status => Err(CatalogError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }),
        }
    }
}
