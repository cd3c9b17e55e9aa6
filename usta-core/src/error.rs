//! Unified error handling system
//!
//! Every failure in the marketplace core maps onto one of six stable kinds
//! that callers (HTTP layer, CLI, tests) can match on without parsing text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

pub type UstaResult<T> = Result<T, UstaError>;

/// Error context providing additional information for debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }
}

/// Stable, machine-readable error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    InvalidInput,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the Usta system
#[derive(Error, Debug)]
pub enum UstaError {
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        message: String,
        context: ErrorContext,
    },

    #[error("Forbidden: {message}")]
    Forbidden {
        message: String,
        context: ErrorContext,
    },

    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Resource not found: {resource}")]
    NotFound {
        resource: String,
        context: ErrorContext,
    },

    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        context: ErrorContext,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },
}

impl UstaError {
    pub fn unauthenticated(message: impl Into<String>, component: &str) -> Self {
        UstaError::Unauthenticated {
            message: message.into(),
            context: ErrorContext::new(component),
        }
    }

    pub fn forbidden(message: impl Into<String>, component: &str) -> Self {
        UstaError::Forbidden {
            message: message.into(),
            context: ErrorContext::new(component),
        }
    }

    pub fn invalid_input(message: impl Into<String>, field: &str, component: &str) -> Self {
        UstaError::InvalidInput {
            message: message.into(),
            field: Some(field.to_string()),
            context: ErrorContext::new(component),
        }
    }

    pub fn not_found(resource: impl Into<String>, component: &str) -> Self {
        UstaError::NotFound {
            resource: resource.into(),
            context: ErrorContext::new(component),
        }
    }

    pub fn conflict(message: impl Into<String>, component: &str) -> Self {
        UstaError::Conflict {
            message: message.into(),
            context: ErrorContext::new(component),
        }
    }

    pub fn internal(message: impl Into<String>, component: &str) -> Self {
        UstaError::Internal {
            message: message.into(),
            source: None,
            context: ErrorContext::new(component),
        }
    }

    /// Wrap a lower-level failure (storage, IO) as an internal error
    pub fn internal_from<E>(message: impl Into<String>, component: &str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        UstaError::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
            context: ErrorContext::new(component),
        }
    }

    /// Attach the operation name to the error context
    pub fn in_operation(mut self, operation: &str) -> Self {
        if let Some(context) = self.context_mut() {
            context.operation = Some(operation.to_string());
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            UstaError::Unauthenticated { .. } => ErrorKind::Unauthenticated,
            UstaError::Forbidden { .. } => ErrorKind::Forbidden,
            UstaError::InvalidInput { .. } => ErrorKind::InvalidInput,
            UstaError::NotFound { .. } => ErrorKind::NotFound,
            UstaError::Conflict { .. } => ErrorKind::Conflict,
            UstaError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Field the error refers to, for input validation failures
    pub fn field(&self) -> Option<&str> {
        match self {
            UstaError::InvalidInput { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            UstaError::Unauthenticated { context, .. }
            | UstaError::Forbidden { context, .. }
            | UstaError::InvalidInput { context, .. }
            | UstaError::NotFound { context, .. }
            | UstaError::Conflict { context, .. }
            | UstaError::Internal { context, .. } => Some(context),
        }
    }

    fn context_mut(&mut self) -> Option<&mut ErrorContext> {
        match self {
            UstaError::Unauthenticated { context, .. }
            | UstaError::Forbidden { context, .. }
            | UstaError::InvalidInput { context, .. }
            | UstaError::NotFound { context, .. }
            | UstaError::Conflict { context, .. }
            | UstaError::Internal { context, .. } => Some(context),
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        let error_id = self.context().map(|c| c.error_id.as_str());
        match self.kind() {
            ErrorKind::Internal => {
                error!(error_id = ?error_id, kind = %self.kind(), error = %self, "Internal error occurred");
            }
            ErrorKind::Forbidden | ErrorKind::Conflict => {
                warn!(error_id = ?error_id, kind = %self.kind(), error = %self, "Request rejected");
            }
            _ => {
                debug!(error_id = ?error_id, kind = %self.kind(), error = %self, "Request rejected");
            }
        }
    }
}
