//! # Configuration Management
//!
//! Compiler configuration: the target edge hostname and the directory
//! certificate files are materialized into. Everything else the compiler
//! needs arrives in the snapshot itself.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::Result;

/// Default directory for materialized certificate and key files
pub const DEFAULT_CERTIFICATE_DIR: &str = "/etc/edgeplane/ssl";

/// Compiler configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    /// Hostname of the edge server whose configuration is generated
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Directory certificate and key files are written to
    pub certificate_dir: PathBuf,
}

impl Config {
    /// Create a configuration for the given edge hostname with the default
    /// certificate directory.
    pub fn for_host<S: Into<String>>(host: S) -> Self {
        Self { host: host.into(), certificate_dir: PathBuf::from(DEFAULT_CERTIFICATE_DIR) }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("EDGEPLANE_HOST").unwrap_or_default();

        let certificate_dir = std::env::var("EDGEPLANE_CERTIFICATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CERTIFICATE_DIR));

        let config = Self { host, certificate_dir };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self)?;
        Ok(())
    }
}
