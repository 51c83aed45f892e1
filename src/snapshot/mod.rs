//! # Snapshot Model
//!
//! The relational input snapshot the compiler consumes: flat entity lists as
//! retrieved from the control plane, plus the keyed index built over them.
//! Entities are read-only for the duration of a run.

mod index;
mod model;

pub use index::SnapshotIndex;
pub use model::{
    CacheGroup, Cdn, CdnSslKeys, DeliveryService, DeliveryServiceRegex, DeliveryServiceRegexes,
    Parameter, Protocol, Server, Snapshot, SslCertificate, AVAILABLE_STATUSES,
};
