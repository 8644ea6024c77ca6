//! Classified error types shared by every backend.

use std::fmt;

use thiserror::Error;

/// The three abstract failure kinds every facade operation reports.
///
/// Callers branch on this: retry on [`ChainError::Network`], treat
/// [`ChainError::Failed`] as an absent entity, alert on
/// [`ChainError::UnexpectedApi`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Transport or reachability failure, no interpretable response.
    #[error("{0}")]
    Network(String),
    /// The backend answered, but the entity does not exist or a domain
    /// precondition does not hold.
    #[error("{0}")]
    Failed(String),
    /// The backend answered with something that violates its own contract.
    #[error("{0}")]
    UnexpectedApi(String),
}

/// Discriminant of a [`ChainError`], used for labels and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Failed,
    UnexpectedApi,
}

impl ErrorKind {
    /// Returns the metric/log label for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Failed => "failed",
            ErrorKind::UnexpectedApi => "unexpected_api",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ChainError {
    pub fn network(message: impl Into<String>) -> Self {
        ChainError::Network(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ChainError::Failed(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        ChainError::UnexpectedApi(message.into())
    }

    /// Error raised when a normalizer meets a null or absent required field.
    pub fn missing_field(field: &str) -> Self {
        ChainError::UnexpectedApi(format!("required field `{field}` is missing"))
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChainError::Network(_) => ErrorKind::Network,
            ChainError::Failed(_) => ErrorKind::Failed,
            ChainError::UnexpectedApi(_) => ErrorKind::UnexpectedApi,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ChainError::Network(msg) | ChainError::Failed(msg) | ChainError::UnexpectedApi(msg) => {
                msg
            }
        }
    }

    /// Only transport failures are worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChainError::Network(_))
    }

    /// Prefixes the message with operation context, keeping the kind.
    #[must_use]
    pub fn with_context(self, context: &str) -> Self {
        match self {
            ChainError::Network(msg) => ChainError::Network(format!("{context}{msg}")),
            ChainError::Failed(msg) => ChainError::Failed(format!("{context}{msg}")),
            ChainError::UnexpectedApi(msg) => ChainError::UnexpectedApi(format!("{context}{msg}")),
        }
    }
}

/// Errors raised by the local transaction-observation store.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Query execution failed: {0}")]
    Query(String),
    #[error("Migration failed: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(err.to_string())
            }
            sqlx::Error::Database(db_err) => StoreError::Query(db_err.message().to_string()),
            _ => StoreError::Query(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(err.to_string())
    }
}

// The store is consulted while answering chain queries, so its failures are
// reported in the same taxonomy.
impl From<StoreError> for ChainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connection(_) => ChainError::Network(err.to_string()),
            StoreError::Query(_) | StoreError::Migration(_) => {
                ChainError::UnexpectedApi(err.to_string())
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<&str> for ConfigError {
    fn from(s: &str) -> Self {
        ConfigError::ParseError(s.to_string())
    }
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(err: validator::ValidationErrors) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
