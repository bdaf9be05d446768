//! Authenticated-user context handed to plugins by the host.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserId {
    pub opaque_id: String,
    pub idp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Per-request context. The host authenticates the request and attaches
/// the user before invoking a driver; a missing user is a per-request
/// fatal error, never retried.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    user: Option<Arc<User>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: Arc<User>) -> Self {
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Result<&User, Error> {
        self.user
            .as_deref()
            .ok_or_else(|| Error::UserRequired("user not found in context".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn test_user(username: &str) -> Arc<User> {
        Arc::new(User {
            id: UserId {
                opaque_id: username.to_string(),
                idp: "https://idp.example.org".to_string(),
            },
            username: username.to_string(),
            display_name: None,
        })
    }

    #[test]
    fn test_context_with_user() {
        let ctx = RequestContext::with_user(test_user("alice"));
        assert_eq!(ctx.user().unwrap().username, "alice");
    }

    #[test]
    fn test_context_without_user() {
        let ctx = RequestContext::new();
        assert!(matches!(ctx.user(), Err(Error::UserRequired(_))));
    }
}
