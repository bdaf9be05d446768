/// Error taxonomy shared by all cellar plugins.
///
/// The host maps these onto its own status codes; plugins only need to
/// pick the right variant. Upstream failures (catalog HTTP calls) are
/// wrapped in `Internal` together with the operation that failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("user required: {0}")]
    UserRequired(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("{context}: {source}")]
    Internal {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Wrap an upstream error with the context of the failed operation.
    pub fn internal(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Internal {
            context: context.into(),
            source: source.into(),
        }
    }

    /// The error every unsupported driver operation returns.
    pub fn not_supported() -> Self {
        Error::NotSupported("operation not permitted".to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, Error::NotSupported(_))
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::BadRequest(_))
    }
}
