//! # Edgeplane
//!
//! Edgeplane is the configuration-generation core of a CDN control plane: it
//! compiles a relational snapshot of CDN topology and per-delivery-service
//! policy into the ordered remap-rule document a caching proxy consumes.
//!
//! ## Architecture
//!
//! ```text
//! Snapshot → Entity Index → Topology / Protocol / ACL / Header-Rewrite
//!                                ↓
//!                          Rule Assembler → Rule Document (JSON)
//!                                ↓
//!                        Certificate Files (side effect)
//! ```
//!
//! Snapshot retrieval, config write-back, and process concerns stay with the
//! embedding application. The compiler itself is pure and deterministic:
//! two runs over an unchanged snapshot produce byte-identical output.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use edgeplane::{Compiler, Config, Result};
//!
//! fn main() -> Result<()> {
//!     let data = std::fs::read_to_string("snapshot.json")?;
//!     let snapshot = serde_json::from_str(&data)?;
//!     let compiler = Compiler::new(Config::for_host("edge-01"))?;
//!     let compiled = compiler.compile(&snapshot)?;
//!     compiled.write_certificates()?;
//!     println!("{}", compiled.rules.to_json_pretty()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod observability;
pub mod remap;
pub mod snapshot;
pub mod topology;
pub mod utils;

// Re-export commonly used types and traits
pub use config::Config;
pub use errors::{Error, Result};
pub use observability::{init_logging, LoggingConfig};
pub use remap::{CompiledConfig, RemapRules};
pub use snapshot::Snapshot;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Compiler facade tying the pipeline together.
pub struct Compiler {
    config: Config,
}

impl Compiler {
    /// Create a compiler with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Compile the snapshot into the rule document and its certificate
    /// file plan. Performs no I/O.
    pub fn compile(&self, snapshot: &Snapshot) -> Result<CompiledConfig> {
        tracing::info!(
            host = %self.config.host,
            delivery_services = snapshot.delivery_services.len(),
            "Compiling remap rules"
        );
        let index = snapshot::SnapshotIndex::new(snapshot);
        remap::assemble(&index, &self.config)
    }

    /// Get a reference to the compiler configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
