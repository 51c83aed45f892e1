//! # Remap-Rule Document
//!
//! The proxy-ready output model and its JSON rendering. Every collection in
//! the document is ordered (`Vec`/`BTreeSet`), so serialization is
//! byte-stable across runs over an unchanged snapshot; the write-back
//! collaborator relies on that for no-op detection.

use std::collections::BTreeSet;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::remap::header_rewrite::HeaderOps;

/// Relative weight of a destination within one rule.
pub const DEFAULT_RULE_WEIGHT: f64 = 1.0;

/// Retry budget per rule and per destination.
pub const DEFAULT_RETRY_NUM: u32 = 5;

/// Destination timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Rules never force connection close under this policy.
pub const DEFAULT_CONNECTION_CLOSE: bool = false;

/// Load-distribution strategy among a rule's destinations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParentSelection {
    #[default]
    #[serde(rename = "consistent-hash")]
    ConsistentHash,
    #[serde(rename = "round-robin")]
    RoundRobin,
}

/// Whether the query string participates in remapping and cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStringRule {
    pub remap: bool,
    pub cache: bool,
}

/// One weighted destination of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemapRuleTo {
    /// Origin URL requests are rewritten to
    pub url: String,
    pub weight: f64,
    pub retry_num: u32,
    pub timeout_ms: u64,
    pub retry_codes: BTreeSet<u16>,
    /// Parent proxy relaying the request; absent for routes that bypass the
    /// mid tier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

/// Per-rule plugin blocks: header operations split by direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePlugins {
    /// Headers rewritten on the response to the client
    pub modify_headers: HeaderOps,
    /// Headers rewritten on the request to the parent/origin
    pub modify_parent_request_headers: HeaderOps,
}

/// Plugin state shared across a rule's destinations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginsShared {
    /// Raw remap policy text, passed through for plugins that still parse it
    pub remap_text: String,
}

/// One compiled routing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemapRule {
    pub name: String,
    /// Request match expression
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_key_file: Option<String>,
    pub to: Vec<RemapRuleTo>,
    pub retry_num: u32,
    pub timeout_ms: u64,
    pub retry_codes: BTreeSet<u16>,
    pub query_string: QueryStringRule,
    pub dscp: i64,
    pub connection_close: bool,
    pub parent_selection: ParentSelection,
    /// Client IP allow list; empty means unrestricted
    pub allow: Vec<IpNet>,
    pub plugins: RulePlugins,
    pub plugins_shared: PluginsShared,
}

/// Server-wide stats policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemapRulesStats {
    pub allow: Vec<IpNet>,
}

/// Global plugin block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalPlugins {
    /// Headers set on every response, identifying the serving proxy
    pub modify_response_headers_global: HeaderOps,
}

/// The complete rule document handed to the proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemapRules {
    pub rules: Vec<RemapRule>,
    pub retry_codes: BTreeSet<u16>,
    pub timeout_ms: u64,
    pub parent_selection: ParentSelection,
    pub stats: RemapRulesStats,
    pub plugins: GlobalPlugins,
}

impl RemapRules {
    /// Render the document as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Render the document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
