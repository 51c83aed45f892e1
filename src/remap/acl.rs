//! # Allow-List Compilation
//!
//! Two legacy allow-list sources compile to CIDR blocks here: the
//! per-delivery-service `@action=allow` directive embedded in remap text,
//! and the `allow_ip`/`allow_ip6` profile parameters feeding the global
//! stats allow list.
//!
//! Range tokens widen to the smallest single CIDR block whose masked start
//! equals its masked end. The block always contains both endpoints but may
//! exceed the range when it is not CIDR-aligned; downstream consumers rely
//! on that over-approximation, so it is preserved as-is.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::errors::AclError;
use crate::snapshot::Parameter;

/// Directive prefix that turns remap text into an allow list.
const ALLOW_DIRECTIVE: &str = "@action=allow";

/// Optional per-token prefix naming the matched field.
const SRC_IP_PREFIX: &str = "@src_ip=";

/// Parameter names carrying global allow-list entries.
const ALLOW_IP_PARAMS: &[&str] = &["allow_ip", "allow_ip6"];

/// Config-file scope of the global allow-list parameters.
const STATS_CONFIG_FILE: &str = "astats.config";

/// Compile a remap-text allow directive into CIDR blocks.
///
/// Text not starting with `@action=allow` compiles to no restriction (an
/// empty list). A directive with no tokens, or with a token that is neither
/// an address nor a `start-end` range, is a parse error.
pub fn compile_allow_list(remap_text: &str) -> Result<Vec<IpNet>, AclError> {
    let normalized = remap_text.split_whitespace().collect::<Vec<_>>().join(" ");
    if !normalized.starts_with(ALLOW_DIRECTIVE) {
        return Ok(Vec::new());
    }

    let tokens: Vec<&str> = normalized.split(' ').collect();
    if tokens.len() < 2 {
        return Err(AclError::MissingTokens { directive: normalized.clone() });
    }

    let mut allow = Vec::with_capacity(tokens.len() - 1);
    for token in &tokens[1..] {
        let entry = token.strip_prefix(SRC_IP_PREFIX).unwrap_or(token);
        match entry.split_once('-') {
            Some((start, end)) => allow.push(compile_range(start, end, token)?),
            None => {
                let addr: IpAddr = entry
                    .parse()
                    .map_err(|_| AclError::InvalidAddress { token: token.to_string() })?;
                allow.push(host_net(addr));
            }
        }
    }
    Ok(allow)
}

/// Compile the global allow list from profile parameters.
///
/// Consumes the comma-separated values of `allow_ip`/`allow_ip6` parameters
/// scoped to the stats config file; bare addresses become host CIDRs.
pub fn allow_list_from_params(parameters: &[Parameter]) -> Result<Vec<IpNet>, AclError> {
    let mut allow = Vec::new();
    for parameter in parameters {
        if !ALLOW_IP_PARAMS.contains(&parameter.name.as_str())
            || parameter.config_file != STATS_CONFIG_FILE
        {
            continue;
        }
        for entry in parameter.value.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            allow.push(parse_cidr_entry(entry)?);
        }
    }
    Ok(allow)
}

fn parse_cidr_entry(entry: &str) -> Result<IpNet, AclError> {
    if entry.contains('/') {
        return entry
            .parse()
            .map_err(|_| AclError::InvalidParameter { value: entry.to_string() });
    }
    let addr: IpAddr =
        entry.parse().map_err(|_| AclError::InvalidParameter { value: entry.to_string() })?;
    Ok(host_net(addr))
}

/// The host CIDR of a single address: /32 for IPv4, /128 for IPv6.
fn host_net(addr: IpAddr) -> IpNet {
    match addr {
        IpAddr::V4(v4) => IpNet::V4(Ipv4Net::new_assert(v4, 32)),
        IpAddr::V6(v6) => IpNet::V6(Ipv6Net::new_assert(v6, 128)),
    }
}

fn compile_range(start: &str, end: &str, token: &str) -> Result<IpNet, AclError> {
    let start: IpAddr =
        start.parse().map_err(|_| AclError::InvalidAddress { token: token.to_string() })?;
    let end: IpAddr =
        end.parse().map_err(|_| AclError::InvalidAddress { token: token.to_string() })?;

    match (start, end) {
        (IpAddr::V4(start), IpAddr::V4(end)) => Ok(IpNet::V4(covering_net_v4(start, end))),
        (IpAddr::V6(start), IpAddr::V6(end)) => Ok(IpNet::V6(covering_net_v6(start, end))),
        _ => Err(AclError::MixedFamilies { token: token.to_string() }),
    }
}

/// Widen from the full mask until the masked endpoints coincide, then emit
/// the network containing `start`.
fn covering_net_v4(start: Ipv4Addr, end: Ipv4Addr) -> Ipv4Net {
    let start = u32::from(start);
    let end = u32::from(end);
    let mut prefix = 32u8;
    loop {
        let mask = v4_mask(prefix);
        if start & mask == end & mask {
            return Ipv4Net::new_assert(Ipv4Addr::from(start & mask), prefix);
        }
        prefix -= 1;
    }
}

fn covering_net_v6(start: Ipv6Addr, end: Ipv6Addr) -> Ipv6Net {
    let start = u128::from(start);
    let end = u128::from(end);
    let mut prefix = 128u8;
    loop {
        let mask = v6_mask(prefix);
        if start & mask == end & mask {
            return Ipv6Net::new_assert(Ipv6Addr::from(start & mask), prefix);
        }
        prefix -= 1;
    }
}

fn v4_mask(prefix: u8) -> u32 {
    match prefix {
        0 => 0,
        _ => u32::MAX << (32 - u32::from(prefix)),
    }
}

fn v6_mask(prefix: u8) -> u128 {
    match prefix {
        0 => 0,
        _ => u128::MAX << (128 - u32::from(prefix)),
    }
}
