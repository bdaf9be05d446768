//! The restore-management HTTP service.
//!
//! Mounted by the host behind its authentication middleware; handlers
//! read the authenticated user from request extensions. Restores are
//! created against the catalog after resolving the requested path
//! through the host gateway, so the request addresses the same virtual
//! filesystem the companion storage driver exposes.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use cellar_catalog::{CatalogClient, CatalogError, CatalogTime, Restore};
use cellar_common::{Error, Gateway, HttpService, Reference, RequestContext, User};
use cellar_fs::resource_id;
use cellar_fs::template::PathTemplate;

use crate::config::Config;

pub struct RestoreService {
    pub(crate) conf: Config,
    pub(crate) client: Arc<dyn CatalogClient>,
    pub(crate) gateway: Arc<dyn Gateway>,
    pub(crate) tpl_storage: PathTemplate,
    pub(crate) tpl_catalog: PathTemplate,
}

impl RestoreService {
    pub fn new(
        conf: Config,
        client: Arc<dyn CatalogClient>,
        gateway: Arc<dyn Gateway>,
    ) -> Result<Self, Error> {
        conf.validate()?;
        let tpl_storage = PathTemplate::compile(&conf.template_to_storage)?;
        let tpl_catalog = PathTemplate::compile(&conf.template_to_catalog)?;
        Ok(Self {
            conf,
            client,
            gateway,
            tpl_storage,
            tpl_catalog,
        })
    }

    fn restore_out(&self, restore: &Restore) -> RestoreOut {
        RestoreOut {
            id: restore.id,
            path: restore.pattern.clone(),
            destination: self
                .tpl_storage
                .render(&restore.destination)
                .unwrap_or_default(),
            status: restore.status,
            created: restore.created.clone(),
        }
    }
}

impl HttpService for RestoreService {
    fn prefix(&self) -> &str {
        &self.conf.prefix
    }

    fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/backups", get(list_backups))
            .route("/restores", get(list_restores).post(create_restore))
            .route("/restores/{id}", get(get_restore))
            .with_state(self)
    }
}

/// Restore job as rendered to clients; the destination is remapped to
/// the virtual filesystem view and `path` carries the restore pattern.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreOut {
    pub id: i64,
    pub path: String,
    pub destination: String,
    pub status: i64,
    pub created: CatalogTime,
}

#[derive(Deserialize)]
struct CreateRestoreQuery {
    path: Option<String>,
}

async fn list_backups(
    State(svc): State<Arc<RestoreService>>,
    user: Option<Extension<Arc<User>>>,
) -> Response {
    let Some(Extension(user)) = user else {
        return error_json(StatusCode::UNAUTHORIZED, "authentication required");
    };
    match svc.client.list_backups(&user.username).await {
        Ok(backups) => {
            // Sources that fail to remap are skipped rather than shown
            // under a path the driver would not resolve.
            let sources: Vec<String> = backups
                .iter()
                .filter_map(|backup| svc.tpl_storage.render(&backup.source).ok())
                .collect();
            Json(sources).into_response()
        }
        Err(err) => catalog_error_json("list backups", err),
    }
}

async fn list_restores(
    State(svc): State<Arc<RestoreService>>,
    user: Option<Extension<Arc<User>>>,
) -> Response {
    let Some(Extension(user)) = user else {
        return error_json(StatusCode::UNAUTHORIZED, "authentication required");
    };
    match svc.client.list_restores(&user.username).await {
        Ok(restores) => {
            let out: Vec<RestoreOut> = restores.iter().map(|r| svc.restore_out(r)).collect();
            Json(out).into_response()
        }
        Err(err) => catalog_error_json("list restores", err),
    }
}

async fn get_restore(
    State(svc): State<Arc<RestoreService>>,
    user: Option<Extension<Arc<User>>>,
    Path(restore_id): Path<i64>,
) -> Response {
    let Some(Extension(user)) = user else {
        return error_json(StatusCode::UNAUTHORIZED, "authentication required");
    };
    match svc.client.get_restore(&user.username, restore_id).await {
        Ok(restore) => Json(svc.restore_out(&restore)).into_response(),
        Err(err) => catalog_error_json("get restore", err),
    }
}

async fn create_restore(
    State(svc): State<Arc<RestoreService>>,
    user: Option<Extension<Arc<User>>>,
    Query(query): Query<CreateRestoreQuery>,
) -> Response {
    let Some(Extension(user)) = user else {
        return error_json(StatusCode::UNAUTHORIZED, "authentication required");
    };
    let Some(path) = query.path else {
        return error_json(StatusCode::BAD_REQUEST, "path query parameter is required");
    };

    let ctx = RequestContext::with_user(user.clone());
    let info = match svc.gateway.stat(&ctx, &Reference::from_path(&path)).await {
        Ok(info) => info,
        Err(err) if err.is_not_found() => {
            return error_json(StatusCode::NOT_FOUND, &format!("path {path} not found"));
        }
        Err(err) => {
            error!(%path, error = %err, "Gateway stat failed");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
        }
    };

    if info.id.storage_id != svc.conf.storage_id {
        return error_json(
            StatusCode::BAD_REQUEST,
            &format!("path {path} is not served by the backup driver"),
        );
    }
    let Some(backup) = resource_id::backup_info(&info.id) else {
        return error_json(
            StatusCode::BAD_REQUEST,
            &format!("path {path} does not identify a backed-up resource"),
        );
    };

    let pattern = match svc.tpl_catalog.render(&backup.path) {
        Ok(pattern) => pattern,
        Err(err) => {
            error!(%path, error = %err, "Path template rendering failed");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
        }
    };

    debug!(
        username = %user.username,
        backup_id = backup.backup_id,
        snapshot = %backup.snapshot,
        %pattern,
        "Creating restore"
    );
    match svc
        .client
        .create_restore(&user.username, backup.backup_id, &pattern, &backup.snapshot)
        .await
    {
        Ok(restore) => Json(svc.restore_out(&restore)).into_response(),
        Err(err) => catalog_error_json("create restore", err),
    }
}

fn error_json(code: StatusCode, message: &str) -> Response {
    (
        code,
        Json(serde_json::json!({
            "error": {
                "code": code.as_u16(),
                "message": message,
            }
        })),
    )
        .into_response()
}

fn catalog_error_json(operation: &str, err: CatalogError) -> Response {
    match err {
        CatalogError::NotFound(what) => error_json(StatusCode::NOT_FOUND, &what),
        err => {
            error!(operation, error = %err, "Catalog request failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use cellar_catalog::{Backup, Group, Resource, Snapshot};
    use cellar_common::resource::{ResourceId, ResourceInfo, ResourcePermissions, ResourceType};
    use cellar_common::user::UserId;
    use cellar_common::{ByteStream, Timestamp};

    fn test_user() -> Arc<User> {
        Arc::new(User {
            id: UserId {
                opaque_id: "gdelmont".to_string(),
                idp: "https://idp.example.org".to_string(),
            },
            username: "gdelmont".to_string(),
            display_name: None,
        })
    }

    struct StubCatalog {
        backups: Vec<Backup>,
        restores: Vec<Restore>,
    }

    #[async_trait::async_trait]
    impl CatalogClient for StubCatalog {
        async fn list_backups(&self, _username: &str) -> Result<Vec<Backup>, CatalogError> {
            Ok(self.backups.clone())
        }

        async fn list_snapshots(
            &self,
            _username: &str,
            _backup_id: i64,
        ) -> Result<Vec<Snapshot>, CatalogError> {
            Ok(Vec::new())
        }

        async fn stat(
            &self,
            _username: &str,
            _backup_id: i64,
            _snapshot: &str,
            path: &str,
        ) -> Result<Resource, CatalogError> {
            Err(CatalogError::NotFound(path.to_string()))
        }

        async fn list_folder(
            &self,
            _username: &str,
            _backup_id: i64,
            _snapshot: &str,
            _path: &str,
        ) -> Result<Vec<Resource>, CatalogError> {
            Ok(Vec::new())
        }

        async fn download(
            &self,
            _username: &str,
            _backup_id: i64,
            _snapshot: &str,
            path: &str,
        ) -> Result<ByteStream, CatalogError> {
            Err(CatalogError::NotFound(path.to_string()))
        }

        async fn list_restores(&self, _username: &str) -> Result<Vec<Restore>, CatalogError> {
            Ok(self.restores.clone())
        }

        async fn get_restore(
            &self,
            _username: &str,
            restore_id: i64,
        ) -> Result<Restore, CatalogError> {
            self.restores
                .iter()
                .find(|r| r.id == restore_id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(format!("restore {restore_id}")))
        }

        async fn create_restore(
            &self,
            _username: &str,
            backup_id: i64,
            pattern: &str,
            snapshot: &str,
        ) -> Result<Restore, CatalogError> {
            Ok(Restore {
                id: 7,
                backup_id,
                snapshot_id: snapshot.to_string(),
                destination: "/tape/restores/out".to_string(),
                pattern: pattern.to_string(),
                status: 0,
                created: CatalogTime(Utc.with_ymd_and_hms(2023, 5, 17, 10, 0, 0).unwrap()),
            })
        }
    }

    struct StubGateway {
        info: Option<ResourceInfo>,
    }

    #[async_trait::async_trait]
    impl Gateway for StubGateway {
        async fn stat(
            &self,
            _ctx: &RequestContext,
            reference: &Reference,
        ) -> Result<ResourceInfo, Error> {
            self.info
                .clone()
                .ok_or_else(|| Error::NotFound(reference.path.clone()))
        }
    }

    fn file_info(id: ResourceId) -> ResourceInfo {
        ResourceInfo {
            rtype: ResourceType::File,
            id,
            checksum: None,
            etag: "1".to_string(),
            mime_type: "text/plain".to_string(),
            mtime: Timestamp::from_seconds(1),
            path: "/eos/home-g/gdelmont/snap1/docs/report.txt".to_string(),
            permissions: ResourcePermissions::file(),
            size: 1,
            owner: None,
            parent_id: None,
        }
    }

    fn config() -> Config {
        toml::from_str(
            r#"
api_url = "https://catalog.example.org/api"
token = "secret"
"#,
        )
        .unwrap()
    }

    fn router(conf: Config, catalog: StubCatalog, gateway: StubGateway) -> Router {
        let service =
            RestoreService::new(conf, Arc::new(catalog), Arc::new(gateway)).unwrap();
        Arc::new(service).router()
    }

    fn restore(id: i64) -> Restore {
        Restore {
            id,
            backup_id: 42,
            snapshot_id: "snap1".to_string(),
            destination: "/tape/restores/docs".to_string(),
            pattern: "/tape/home-g/gdelmont/docs".to_string(),
            status: 1,
            created: CatalogTime(Utc.with_ymd_and_hms(2023, 5, 17, 10, 0, 0).unwrap()),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthenticated_is_401() {
        let app = router(
            config(),
            StubCatalog {
                backups: Vec::new(),
                restores: Vec::new(),
            },
            StubGateway { info: None },
        );
        let response = app
            .oneshot(Request::builder().uri("/restores").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], 401);
    }

    #[tokio::test]
    async fn test_list_restores_remaps_destination() {
        let mut conf = config();
        conf.template_to_storage =
            "{{ path | replace(from=\"/tape/\", to=\"/eos/\") }}".to_string();
        let app = router(
            conf,
            StubCatalog {
                backups: Vec::new(),
                restores: vec![restore(3)],
            },
            StubGateway { info: None },
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/restores")
                    .extension(test_user())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body[0]["id"], 3);
        assert_eq!(body[0]["destination"], "/eos/restores/docs");
        // The out path is the restore's pattern, untouched.
        assert_eq!(body[0]["path"], "/tape/home-g/gdelmont/docs");
    }

    #[tokio::test]
    async fn test_get_restore_unknown_is_404() {
        let app = router(
            config(),
            StubCatalog {
                backups: Vec::new(),
                restores: Vec::new(),
            },
            StubGateway { info: None },
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/restores/99")
                    .extension(test_user())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_backups_remaps_sources() {
        let mut conf = config();
        conf.template_to_storage =
            "{{ path | replace(from=\"/tape/\", to=\"/eos/\") }}".to_string();
        let app = router(
            conf,
            StubCatalog {
                backups: vec![Backup {
                    id: 42,
                    group: Group {
                        id: 1,
                        name: "cernbox".to_string(),
                    },
                    repository: "repo".to_string(),
                    username: "gdelmont".to_string(),
                    name: "home".to_string(),
                    source: "/tape/home-g/gdelmont".to_string(),
                }],
                restores: Vec::new(),
            },
            StubGateway { info: None },
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/backups")
                    .extension(test_user())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!(["/eos/home-g/gdelmont"]));
    }

    #[tokio::test]
    async fn test_create_restore_requires_path() {
        let app = router(
            config(),
            StubCatalog {
                backups: Vec::new(),
                restores: Vec::new(),
            },
            StubGateway { info: None },
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/restores")
                    .extension(test_user())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_restore_unknown_path_is_404() {
        let app = router(
            config(),
            StubCatalog {
                backups: Vec::new(),
                restores: Vec::new(),
            },
            StubGateway { info: None },
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/restores?path=/eos/nope")
                    .extension(test_user())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_restore_foreign_storage_is_400() {
        let app = router(
            config(),
            StubCatalog {
                backups: Vec::new(),
                restores: Vec::new(),
            },
            StubGateway {
                info: Some(file_info(ResourceId {
                    storage_id: "someotherdriver".to_string(),
                    opaque_id: "whatever".to_string(),
                })),
            },
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/restores?path=/eos/home-g/gdelmont/snap1/docs")
                    .extension(test_user())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_restore_happy_path() {
        let mut conf = config();
        conf.template_to_storage =
            "{{ path | replace(from=\"/tape/\", to=\"/eos/\") }}".to_string();
        conf.template_to_catalog =
            "{{ path | replace(from=\"/eos/\", to=\"/tape/\") }}".to_string();
        let id = resource_id::encode(42, "snap1", "/eos/home-g/gdelmont", "docs");
        let app = router(
            conf,
            StubCatalog {
                backups: Vec::new(),
                restores: Vec::new(),
            },
            StubGateway {
                info: Some(file_info(id)),
            },
        );

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/restores?path=/eos/home-g/gdelmont/snap1/docs")
                    .extension(test_user())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 7);
        // The pattern sent to the catalog was remapped to the catalog
        // view, and the returned destination back to the storage view.
        assert_eq!(body["path"], "/tape/home-g/gdelmont/docs");
        assert_eq!(body["destination"], "/eos/restores/out");
    }
}
