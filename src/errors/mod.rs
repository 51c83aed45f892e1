//! # Error Handling
//!
//! Error types for the edgeplane remap compiler, built on `thiserror`.
//! Policy-parser and certificate errors live in their own sub-enums so the
//! assembler can tell recoverable conditions apart from structural ones.

mod certificates;
mod policy;

pub use certificates::CertificateError;
pub use policy::{AclError, HeaderRewriteError};

/// Custom result type for edgeplane operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the edgeplane remap compiler
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A referenced entity is absent from the snapshot
    #[error("{entity} '{name}' not found in snapshot")]
    NotFound { entity: &'static str, name: String },

    /// Allow-list policy could not be parsed
    #[error("Allow-list policy error: {0}")]
    Acl(#[from] AclError),

    /// Header-rewrite policy could not be parsed; structural, aborts the run
    #[error("Header-rewrite policy error for delivery service '{xml_id}': {source}")]
    HeaderRewrite {
        xml_id: String,
        #[source]
        source: HeaderRewriteError,
    },

    /// Certificate material could not be decoded or written
    #[error("Certificate error: {0}")]
    Certificate(#[from] CertificateError),

    /// Serialization of the rule document failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violations
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a not-found error for a snapshot entity
    pub fn not_found<S: Into<String>>(entity: &'static str, name: S) -> Self {
        Self::NotFound { entity, name: name.into() }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::Config(format!("Validation failed: {}", message))
    }
}
