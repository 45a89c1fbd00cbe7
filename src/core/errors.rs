//! Error types for the trellis-rs library.
//!
//! Every failure that leaves the engine carries a symbolic [`ErrorKind`] so a
//! protocol layer can map it onto its own error codes without inspecting
//! internal state. Per-file and per-signature failures are recorded as
//! diagnostics by the extractor; only build-level failures surface here.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main result type for trellis operations.
pub type Result<T> = std::result::Result<T, TrellisError>;

/// Comprehensive error type for all trellis operations.
#[derive(Error, Debug)]
pub enum TrellisError {
    /// A language identifier that maps to no supported grammar
    #[error("Unsupported language: {identifier}")]
    UnsupportedLanguage {
        /// The identifier as supplied by the caller
        identifier: String,
    },

    /// A grammar could not be compiled; the cache slot stays empty
    #[error("Failed to load grammar for {language}: {message}")]
    GrammarLoad {
        /// Canonical language key
        language: String,
        /// Error description
        message: String,
    },

    /// A signature could not be analyzed because its syntax is malformed
    #[error("Partial parse failure in {file}: {message}")]
    PartialParse {
        /// File containing the signature
        file: String,
        /// Signature name (if known)
        signature: Option<String>,
        /// 1-based line of the failure (if known)
        line: Option<usize>,
        /// Error description
        message: String,
    },

    /// A source file exceeds the configured size cap
    #[error("File {file} is {size} bytes, above the {limit} byte limit")]
    FileTooLarge {
        /// Offending file
        file: String,
        /// File size in bytes
        size: usize,
        /// Configured limit
        limit: usize,
    },

    /// Syntax tree nesting exceeded the configured traversal cap
    #[error("Syntax tree depth {depth} exceeds limit {limit}")]
    TreeDepthExceeded {
        /// Depth at which traversal stopped
        depth: usize,
        /// Configured limit
        limit: usize,
    },

    /// Duplicate ids or dangling edges detected after a merge
    #[error("Graph integrity violation: {message}")]
    GraphIntegrity {
        /// Error description
        message: String,
        /// Offending node or edge
        element: Option<String>,
    },

    /// An internal lock was poisoned by a panicking writer
    #[error("Lock inconsistency in {component}: {message}")]
    LockInconsistency {
        /// Component owning the lock
        component: String,
        /// Error description
        message: String,
    },

    /// A node id that does not exist in the current graph
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// The requested node id
        node_id: String,
    },

    /// No graph has been published yet
    #[error("Project not indexed")]
    NotIndexed,

    /// The token budget cannot hold even the seed node
    #[error("Token budget {budget} is smaller than the seed entry ({required} tokens)")]
    BudgetTooSmall {
        /// Budget supplied by the caller
        budget: usize,
        /// Tokens needed for the seed-only bundle
        required: usize,
    },

    /// A build was abandoned before publishing
    #[error("Build cancelled during {phase}")]
    BuildCancelled {
        /// Build phase that observed the cancellation
        phase: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// Validation errors for input data
    #[error("Validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Field or input that failed validation
        field: Option<String>,
    },

    /// I/O related errors
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Data format being processed
        data_type: Option<String>,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal errors that should not normally occur
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
        /// Additional context
        context: Option<String>,
    },
}

/// Symbolic error classes exposed to collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedLanguage,
    GrammarLoadError,
    PartialParseFailure,
    TreeDepthExceeded,
    FileTooLarge,
    UnresolvedReference,
    GraphIntegrityViolation,
    LockInconsistency,
    NodeNotFound,
    NotIndexed,
    BudgetTooSmall,
    BuildCancelled,
    InvalidConfig,
    Io,
    Internal,
}

impl TrellisError {
    /// Create an unsupported-language error
    pub fn unsupported_language(identifier: impl Into<String>) -> Self {
        Self::UnsupportedLanguage {
            identifier: identifier.into(),
        }
    }

    /// Create a grammar load error
    pub fn grammar_load(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GrammarLoad {
            language: language.into(),
            message: message.into(),
        }
    }

    /// Create a partial parse error with location
    pub fn partial_parse(
        file: impl Into<String>,
        signature: Option<String>,
        line: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        Self::PartialParse {
            file: file.into(),
            signature,
            line,
            message: message.into(),
        }
    }

    /// Create a graph integrity error
    pub fn integrity(message: impl Into<String>, element: impl Into<String>) -> Self {
        Self::GraphIntegrity {
            message: message.into(),
            element: Some(element.into()),
        }
    }

    /// Create a lock inconsistency error
    pub fn lock_inconsistency(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LockInconsistency {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a node-not-found error
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            node_id: node_id.into(),
        }
    }

    /// Create a cancellation error for the given phase
    pub fn cancelled(phase: impl Into<String>) -> Self {
        Self::BuildCancelled {
            phase: phase.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: None,
        }
    }

    /// Add context to an existing error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        if let Self::Internal { context: ctx, .. } = &mut self {
            *ctx = Some(context.into());
        }
        self
    }

    /// Symbolic class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedLanguage { .. } => ErrorKind::UnsupportedLanguage,
            Self::GrammarLoad { .. } => ErrorKind::GrammarLoadError,
            Self::PartialParse { .. } => ErrorKind::PartialParseFailure,
            Self::TreeDepthExceeded { .. } => ErrorKind::TreeDepthExceeded,
            Self::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            Self::GraphIntegrity { .. } => ErrorKind::GraphIntegrityViolation,
            Self::LockInconsistency { .. } => ErrorKind::LockInconsistency,
            Self::NodeNotFound { .. } => ErrorKind::NodeNotFound,
            Self::NotIndexed => ErrorKind::NotIndexed,
            Self::BudgetTooSmall { .. } => ErrorKind::BudgetTooSmall,
            Self::BuildCancelled { .. } => ErrorKind::BuildCancelled,
            Self::Config { .. } | Self::Validation { .. } => ErrorKind::InvalidConfig,
            Self::Io { .. } => ErrorKind::Io,
            Self::Serialization { .. } | Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether this error signals a programming bug rather than a caller problem.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::LockInconsistency { .. } | Self::GraphIntegrity { .. }
        )
    }
}

impl From<io::Error> for TrellisError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for TrellisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            data_type: Some("JSON".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for TrellisError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML serialization failed: {err}"),
            data_type: Some("YAML".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TrellisError::config("Invalid configuration");
        assert!(matches!(err, TrellisError::Config { .. }));

        let err = TrellisError::unsupported_language("cobol");
        assert!(matches!(err, TrellisError::UnsupportedLanguage { .. }));
        assert_eq!(err.to_string(), "Unsupported language: cobol");
    }

    #[test]
    fn test_error_kinds_are_symbolic() {
        assert_eq!(
            TrellisError::node_not_found("a.py::f").kind(),
            ErrorKind::NodeNotFound
        );
        assert_eq!(TrellisError::NotIndexed.kind(), ErrorKind::NotIndexed);
        assert_ne!(
            TrellisError::node_not_found("x").kind(),
            TrellisError::NotIndexed.kind()
        );
        assert_eq!(
            TrellisError::TreeDepthExceeded { depth: 9, limit: 8 }.kind(),
            ErrorKind::TreeDepthExceeded
        );
        assert_ne!(
            TrellisError::partial_parse("a.py", None, Some(3), "unexpected token").kind(),
            ErrorKind::TreeDepthExceeded
        );
        assert_eq!(
            TrellisError::grammar_load("py", "abi mismatch").kind(),
            ErrorKind::GrammarLoadError
        );
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::GraphIntegrityViolation).unwrap();
        assert_eq!(json, "\"graph_integrity_violation\"");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TrellisError::lock_inconsistency("grammar_registry", "poisoned").is_fatal());
        assert!(TrellisError::integrity("dangling edge", "a -> b").is_fatal());
        assert!(!TrellisError::unsupported_language("x").is_fatal());
        assert!(!TrellisError::cancelled("merge").is_fatal());
    }

    #[test]
    fn test_error_with_context() {
        let err = TrellisError::internal("Something went wrong").with_context("During merge");

        if let TrellisError::Internal { context, .. } = err {
            assert_eq!(context, Some("During merge".to_string()));
        } else {
            panic!("Expected Internal error");
        }
    }

    #[test]
    fn test_io_error_creation() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Access denied");
        let err = TrellisError::io("Failed to read source", io_err);

        if let TrellisError::Io { message, source } = &err {
            assert_eq!(message, "Failed to read source");
            assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
        } else {
            panic!("Expected Io error");
        }
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_from_yaml_error() {
        let yaml_err = serde_yaml::from_str::<u32>("[not a number").unwrap_err();
        let err: TrellisError = yaml_err.into();
        assert!(matches!(
            err,
            TrellisError::Serialization {
                data_type: Some(ref t),
                ..
            } if t == "YAML"
        ));
    }

    #[test]
    fn test_budget_error_display() {
        let err = TrellisError::BudgetTooSmall {
            budget: 3,
            required: 40,
        };
        assert_eq!(
            err.to_string(),
            "Token budget 3 is smaller than the seed entry (40 tokens)"
        );
    }
}
