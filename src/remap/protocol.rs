//! # Protocol Expansion
//!
//! Maps a delivery service's protocol policy onto concrete
//! (client-scheme, origin-scheme) pairs and turns its regex patterns into
//! request-match expressions. Patterns wrapped in the `.*\.` / `\..*`
//! convention are literal domain fragments, not regexes, and get stitched
//! into a hostname under the CDN domain.

use std::fmt;

use serde::Serialize;

use crate::snapshot::Protocol;

/// A URI scheme on either side of a remap rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (client-scheme, origin-scheme) expansion of a protocol policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemePair {
    pub from: Scheme,
    pub to: Scheme,
}

impl Protocol {
    /// The scheme pairs this protocol policy expands to, in emission order.
    pub fn scheme_pairs(self) -> &'static [SchemePair] {
        match self {
            Protocol::Http => &[SchemePair { from: Scheme::Http, to: Scheme::Http }],
            Protocol::Https => &[SchemePair { from: Scheme::Https, to: Scheme::Https }],
            Protocol::HttpAndHttps => &[
                SchemePair { from: Scheme::Http, to: Scheme::Http },
                SchemePair { from: Scheme::Https, to: Scheme::Https },
            ],
            Protocol::HttpToHttps => &[
                SchemePair { from: Scheme::Http, to: Scheme::Https },
                SchemePair { from: Scheme::Https, to: Scheme::Https },
            ],
        }
    }

    /// Whether any expansion of this policy serves an encrypted client scheme.
    pub fn uses_https(self) -> bool {
        self.scheme_pairs().iter().any(|pair| pair.from == Scheme::Https)
    }
}

/// Routing semantics selected by a delivery service's type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingKind {
    Http,
    Dns,
}

impl RoutingKind {
    /// Classify a type string by its lowercase prefix. Returns `None` for
    /// anything that is neither HTTP- nor DNS-routed; such delivery services
    /// are skipped by the assembler.
    pub fn from_type(ds_type: &str) -> Option<Self> {
        let lowered = ds_type.to_lowercase();
        if lowered.starts_with("http") {
            Some(RoutingKind::Http)
        } else if lowered.starts_with("dns") {
            Some(RoutingKind::Dns)
        } else {
            None
        }
    }
}

const LITERAL_PREFIX: &str = r".*\.";
const LITERAL_SUFFIX: &str = r"\..*";

/// Strip the literal-match wrapper from a pattern.
///
/// Delivery-service regexes of the form `.*\.foo\..*` are not really
/// regexes; the wrapper marks `foo` as a literal domain fragment. Returns
/// the trimmed pattern and whether the wrapper was present.
pub fn trim_literal_pattern(pattern: &str) -> (&str, bool) {
    match pattern.strip_prefix(LITERAL_PREFIX).and_then(|rest| rest.strip_suffix(LITERAL_SUFFIX)) {
        Some(trimmed) => (trimmed, true),
        None => (pattern, false),
    }
}

/// Build the "from" match expression of one rule.
///
/// Literal patterns become a concrete hostname under the CDN domain: the
/// edge host's own name for HTTP routing, the fixed `edge` label for DNS
/// routing. True regexes pass through verbatim.
pub fn build_from(
    scheme: Scheme,
    pattern: &str,
    is_literal: bool,
    edge_host: &str,
    kind: RoutingKind,
    cdn_domain: &str,
) -> String {
    if !is_literal {
        return format!("{}://{}", scheme, pattern);
    }

    match kind {
        RoutingKind::Http => format!("{}://{}.{}.{}", scheme, edge_host, pattern, cdn_domain),
        RoutingKind::Dns => format!("{}://edge.{}.{}", scheme, pattern, cdn_domain),
    }
}

/// Delivery-service types bypassing the mid tier outright.
const NO_MID_TYPES: &[&str] = &["http_no_cache", "http_live", "dns_live"];

/// Whether this delivery-service type routes straight to the origin,
/// skipping parent caches.
pub fn skips_mid(ds_type: &str) -> bool {
    let lowered = ds_type.to_lowercase();
    if NO_MID_TYPES.contains(&lowered.as_str()) {
        return true;
    }
    lowered.contains("live") && !lowered.contains("natnl")
}
