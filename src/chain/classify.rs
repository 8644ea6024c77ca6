//! Classification of backend failures into [`ChainError`] kinds.
//!
//! Transport clients never return [`ChainError`] directly. They report a
//! [`BackendFailure`], a tagged description of what was observed on the
//! wire, and the facade classifies it exactly once, at the point where it
//! first sees the outcome, prefixing the operation context:
//!
//! 1. an already classified [`ChainError`] keeps its kind, only the context
//!    is prepended;
//! 2. [`BackendFailure::NoResponse`] becomes [`ChainError::Network`];
//! 3. [`BackendFailure::Rejected`] (a declared application-level rejection)
//!    becomes [`ChainError::Failed`];
//! 4. [`BackendFailure::Malformed`] (a response without discernible
//!    structure, or one that breaks the backend contract) becomes
//!    [`ChainError::UnexpectedApi`].
//!
//! Which payloads count as declared rejections is backend-specific and
//! decided by each client when it builds the [`BackendFailure`].

use std::fmt;

use crate::domain::ChainError;

/// Failure signal of a backend call, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendFailure {
    /// The request was sent but no response was received: connection
    /// refused, DNS failure, timeout or an externally aborted call.
    NoResponse(String),
    /// The backend answered with a structured rejection.
    Rejected {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },
    /// The backend answered, but the answer cannot be interpreted.
    Malformed(String),
}

impl BackendFailure {
    pub fn no_response(message: impl Into<String>) -> Self {
        BackendFailure::NoResponse(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        BackendFailure::Malformed(message.into())
    }

    /// Rejection carried by an HTTP status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        BackendFailure::Rejected {
            status: Some(status),
            code: None,
            message: message.into(),
        }
    }

    /// Rejection carried by a backend-specific error code.
    pub fn coded(code: impl Into<String>, message: impl Into<String>) -> Self {
        BackendFailure::Rejected {
            status: None,
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendFailure::NoResponse(msg) => write!(f, "no response: {msg}"),
            BackendFailure::Rejected {
                status,
                code,
                message,
            } => {
                f.write_str("rejected")?;
                if let Some(status) = status {
                    write!(f, " with HTTP {status}")?;
                }
                if let Some(code) = code {
                    write!(f, " [{code}]")?;
                }
                write!(f, ": {message}")
            }
            BackendFailure::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for BackendFailure {}

/// Conversion of a failure signal into a classified error.
pub trait Classify {
    fn classify(self, context: &str) -> ChainError;
}

impl Classify for ChainError {
    fn classify(self, context: &str) -> ChainError {
        self.with_context(context)
    }
}

impl Classify for BackendFailure {
    fn classify(self, context: &str) -> ChainError {
        match self {
            BackendFailure::NoResponse(_) => ChainError::Network(format!("{context}{self}")),
            BackendFailure::Rejected { .. } => ChainError::Failed(format!("{context}{self}")),
            BackendFailure::Malformed(_) => ChainError::UnexpectedApi(format!("{context}{self}")),
        }
    }
}

// Lets backend helpers use `?`; the public operation adds the context.
impl From<BackendFailure> for ChainError {
    fn from(failure: BackendFailure) -> Self {
        failure.classify("")
    }
}

/// Classifies the error side of a result.
pub trait ClassifyExt<T> {
    fn classify_err(self, context: &str) -> Result<T, ChainError>;

    /// Lazy variant for contexts that need formatting.
    fn classify_with<F>(self, context: F) -> Result<T, ChainError>
    where
        F: FnOnce() -> String;
}

impl<T, E: Classify> ClassifyExt<T> for Result<T, E> {
    fn classify_err(self, context: &str) -> Result<T, ChainError> {
        self.map_err(|e| e.classify(context))
    }

    fn classify_with<F>(self, context: F) -> Result<T, ChainError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.classify(&context()))
    }
}
