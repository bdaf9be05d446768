use std::sync::Arc;

/// Contract for HTTP service plugins.
///
/// The host mounts the service's router under its prefix, behind the
/// host's authentication middleware. Paths returned by `unprotected`
/// (relative to the prefix) are excluded from authentication. Handlers
/// read the authenticated user from request extensions as an
/// `Arc<User>`.
pub trait HttpService: Send + Sync {
    fn prefix(&self) -> &str;

    fn unprotected(&self) -> Vec<String> {
        Vec::new()
    }

    fn router(self: Arc<Self>) -> axum::Router;
}

impl std::fmt::Debug for dyn HttpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpService")
            .field("prefix", &self.prefix())
            .finish()
    }
}
