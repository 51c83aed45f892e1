use std::path::PathBuf;

use thiserror::Error;

/// Certificate-specific error variants surfaced while planning and writing
/// per-delivery-service TLS material.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// The base64 certificate payload could not be decoded.
    #[error("Failed to decode certificate for {path}: {source}")]
    DecodeCertificate {
        path: PathBuf,
        #[source]
        source: base64::DecodeError,
    },

    /// The base64 private-key payload could not be decoded.
    #[error("Failed to decode certificate key for {path}: {source}")]
    DecodeKey {
        path: PathBuf,
        #[source]
        source: base64::DecodeError,
    },

    /// The certificate directory could not be created.
    #[error("Failed to create certificate directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A certificate or key file could not be written.
    #[error("Failed to write certificate file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
