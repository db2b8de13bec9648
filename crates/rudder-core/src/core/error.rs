use thiserror::Error;

pub type RudderResult<T> = Result<T, RudderError>;

/// The distinguishing class of an error.
///
/// Callers branch on this (for example "not found" versus a generic store
/// failure), so wrapping an error with context never changes its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    VersionConflict,
    Validation,
    TransientIo,
    Fatal,
    Internal,
}

#[derive(Error, Debug)]
pub enum RudderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    /// The durable store rejected a write carrying a stale version token.
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transient error: {0}")]
    Transient(String),

    /// Terminates the background reconciliation task.
    #[error("Fatal: {0}")]
    Fatal(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<RudderError>,
    },

    /// Every failure of a best-effort batch, in processing order.
    #[error("{} change(s) failed: {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<RudderError>),
}

fn join_errors(errors: &[RudderError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl RudderError {
    /// Classify this error, looking through any context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RudderError::NotFound(_) => ErrorKind::NotFound,
            RudderError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            RudderError::VersionConflict(_) => ErrorKind::VersionConflict,
            RudderError::Validation(_)
            | RudderError::Yaml(_)
            | RudderError::Json(_)
            | RudderError::Config(_) => ErrorKind::Validation,
            RudderError::Io(_) | RudderError::Http(_) | RudderError::Transient(_) => {
                ErrorKind::TransientIo
            }
            RudderError::Fatal(_) => ErrorKind::Fatal,
            RudderError::Internal(_) | RudderError::Path(_) | RudderError::Aggregate(_) => {
                ErrorKind::Internal
            }
            RudderError::Context { source, .. } => source.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Wrap with operation context, keeping the kind.
    pub fn context(self, context: impl Into<String>) -> Self {
        RudderError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Re-classify as fatal, keeping the message.
    pub fn into_fatal(self) -> Self {
        match self {
            RudderError::Fatal(_) => self,
            other => RudderError::Fatal(other.to_string()),
        }
    }
}

/// Context helpers for `RudderResult`.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> RudderResult<T>;

    fn with_context<C, F>(self, f: F) -> RudderResult<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<RudderError>,
{
    fn context(self, context: impl Into<String>) -> RudderResult<T> {
        self.map_err(|e| e.into().context(context))
    }

    fn with_context<C, F>(self, f: F) -> RudderResult<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().context(f()))
    }
}
