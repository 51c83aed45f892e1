//! # Topology Resolution
//!
//! Resolves which caches are parents of a given edge node: the servers whose
//! cache group is named as the parent of the edge node's own cache group.
//! Candidates walk the snapshot's server order so downstream output stays
//! stable across runs.

use crate::errors::Result;
use crate::snapshot::{Server, SnapshotIndex};

/// Resolve the candidate parent set for the given edge hostname.
///
/// A parent name matching no cache group yields an empty vector, not an
/// error: a delivery service with zero parents still gets rules, just with
/// no mid-tier destinations. A missing hostname or cache group is a lookup
/// error.
pub fn resolve_parents<'a>(host_name: &str, index: &SnapshotIndex<'a>) -> Result<Vec<&'a Server>> {
    let server = index.server(host_name)?;
    let cache_group = index.cache_group(&server.cachegroup)?;

    let parent_name = match &cache_group.parent_name {
        Some(name) => name,
        None => return Ok(Vec::new()),
    };

    Ok(index
        .snapshot()
        .servers
        .iter()
        .filter(|candidate| candidate.cachegroup == *parent_name)
        .collect())
}

/// Keep only the parents matching the given predicate.
///
/// The availability and same-CDN filters are independent; applying them in
/// either order gives the same result.
pub fn filter_parents<'a, F>(parents: Vec<&'a Server>, include: F) -> Vec<&'a Server>
where
    F: Fn(&Server) -> bool,
{
    parents.into_iter().filter(|parent| include(parent)).collect()
}
