//! # Certificate Materialization
//!
//! Turns per-delivery-service TLS records into `.crt`/`.key` files under the
//! certificate directory. Planning (file naming + base64 decoding) is pure;
//! writing is the crate's only filesystem side effect and happens after
//! rule assembly has succeeded.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::errors::CertificateError;
use crate::snapshot::CdnSslKeys;

/// A certificate or key file planned for materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// Derive the certificate file path: the record's hostname with wildcard
/// labels stripped, suffixed `.crt`.
pub fn cert_file_path(keys: &CdnSslKeys, dir: &Path) -> PathBuf {
    dir.join(format!("{}.crt", strip_wildcard(&keys.hostname)))
}

/// Derive the key file path, suffixed `.key`.
pub fn key_file_path(keys: &CdnSslKeys, dir: &Path) -> PathBuf {
    dir.join(format!("{}.key", strip_wildcard(&keys.hostname)))
}

fn strip_wildcard(hostname: &str) -> String {
    hostname.replace("*.", "")
}

/// Decode a TLS record into its two planned files.
///
/// Decode failure is fatal: a certificate that cannot be materialized would
/// leave the proxy serving routes it cannot terminate.
pub fn plan_certificate_files(
    keys: &CdnSslKeys,
    dir: &Path,
) -> Result<Vec<CertificateFile>, CertificateError> {
    let cert_path = cert_file_path(keys, dir);
    let crt = BASE64
        .decode(&keys.certificate.crt)
        .map_err(|source| CertificateError::DecodeCertificate { path: cert_path.clone(), source })?;

    let key_path = key_file_path(keys, dir);
    let key = BASE64
        .decode(&keys.certificate.key)
        .map_err(|source| CertificateError::DecodeKey { path: key_path.clone(), source })?;

    Ok(vec![
        CertificateFile { path: cert_path, contents: crt },
        CertificateFile { path: key_path, contents: key },
    ])
}

/// Write the planned files, creating the certificate directory if needed.
pub fn write_certificate_files(files: &[CertificateFile]) -> Result<(), CertificateError> {
    for file in files {
        if let Some(parent) = file.path.parent() {
            fs::create_dir_all(parent).map_err(|source| CertificateError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&file.path, &file.contents).map_err(|source| CertificateError::WriteFile {
            path: file.path.clone(),
            source,
        })?;
    }
    Ok(())
}
