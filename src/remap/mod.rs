//! # Remap-Rule Compilation
//!
//! The rule-compilation pipeline: protocol expansion, the two legacy policy
//! parsers (allow-list directives and header-rewrite directives), rule
//! assembly, and the serialized rule document.

pub mod acl;
pub mod assembler;
pub mod header_rewrite;
pub mod protocol;
pub mod rules;

pub use assembler::{assemble, CompiledConfig};
pub use rules::RemapRules;
