use serde::{Deserialize, Serialize};

/// Server status values that count as operationally available, compared
/// case-insensitively.
pub const AVAILABLE_STATUSES: &[&str] = &["reported", "online"];

/// A cache server in the CDN topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub host_name: String,
    pub domain_name: String,
    pub ip_address: String,
    pub interface_name: String,
    /// Name of the cache group this server belongs to
    pub cachegroup: String,
    pub cdn_name: String,
    pub tcp_port: u16,
    /// Operational status string; see [`AVAILABLE_STATUSES`]
    pub status: String,
    /// Owning profile, scopes which parameters apply to this server
    pub profile: String,
}

impl Server {
    /// Whether this server's status marks it available for parent traffic.
    pub fn is_available(&self) -> bool {
        let status = self.status.to_lowercase();
        AVAILABLE_STATUSES.contains(&status.as_str())
    }
}

/// A named collection of cache servers forming one level of the routing
/// hierarchy. Roots have no parent name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheGroup {
    pub name: String,
    #[serde(default)]
    pub parent_name: Option<String>,
}

/// Protocol policy of a delivery service.
///
/// The control plane encodes this as an integer; any value outside the
/// defined range is rejected at the deserialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Protocol {
    /// HTTP only
    Http,
    /// HTTPS only
    Https,
    /// Both HTTP and HTTPS, served as-is
    HttpAndHttps,
    /// HTTP upgraded to HTTPS at the origin side
    HttpToHttps,
}

impl TryFrom<u8> for Protocol {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Protocol::Http),
            1 => Ok(Protocol::Https),
            2 => Ok(Protocol::HttpAndHttps),
            3 => Ok(Protocol::HttpToHttps),
            other => Err(format!("unknown protocol value '{}'", other)),
        }
    }
}

impl From<Protocol> for u8 {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Http => 0,
            Protocol::Https => 1,
            Protocol::HttpAndHttps => 2,
            Protocol::HttpToHttps => 3,
        }
    }
}

/// A logical CDN-routed service and its per-route policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryService {
    pub id: i64,
    /// Human-assigned unique identifier, the join key for regexes and
    /// certificates
    pub xml_id: String,
    pub cdn_name: String,
    pub protocol: Protocol,
    /// Type string; the lowercase `http`/`dns` prefix selects routing
    /// semantics, anything else makes the service unroutable
    #[serde(rename = "type")]
    pub ds_type: String,
    /// Tri-state query-string policy in the legacy integer encoding
    pub qstring_ignore: i64,
    /// Origin URI requests are remapped to
    pub org_server_fqdn: String,
    pub dscp: i64,
    /// Legacy header-rewrite policy text, empty when unset
    #[serde(default)]
    pub edge_header_rewrite: String,
    /// Legacy remap/ACL policy text, empty when unset
    #[serde(default)]
    pub remap_text: String,
}

/// One request-matching pattern owned by a delivery service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryServiceRegex {
    pub pattern: String,
}

/// The ordered regex group of one delivery service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryServiceRegexes {
    /// XML id of the owning delivery service
    pub ds_name: String,
    pub regexes: Vec<DeliveryServiceRegex>,
}

/// A CDN and the domain suffix appended to literal-pattern hostnames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cdn {
    pub name: String,
    pub domain_name: String,
}

/// A profile-scoped parameter. Only `allow_ip`/`allow_ip6` entries scoped to
/// the stats config file feed the compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub config_file: String,
    pub value: String,
}

/// Base64-encoded certificate and key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SslCertificate {
    pub crt: String,
    pub key: String,
}

/// TLS material for one delivery service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdnSslKeys {
    /// XML id of the owning delivery service
    pub deliveryservice: String,
    /// Certificate hostname; a `*.` wildcard prefix is stripped when file
    /// names are derived
    pub hostname: String,
    pub certificate: SslCertificate,
}

/// The full relational snapshot a compiler run consumes.
///
/// Record order is meaningful: rule output follows delivery-service order,
/// parent destinations follow server order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub servers: Vec<Server>,
    pub cache_groups: Vec<CacheGroup>,
    pub delivery_services: Vec<DeliveryService>,
    pub delivery_service_regexes: Vec<DeliveryServiceRegexes>,
    pub cdns: Vec<Cdn>,
    pub parameters: Vec<Parameter>,
    pub ssl_keys: Vec<CdnSslKeys>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_roundtrip() {
        for value in 0u8..=3 {
            let protocol = Protocol::try_from(value).unwrap();
            assert_eq!(u8::from(protocol), value);
        }
        assert!(Protocol::try_from(4).is_err());
    }

    #[test]
    fn test_protocol_deserializes_from_integer() {
        let protocol: Protocol = serde_json::from_str("2").unwrap();
        assert_eq!(protocol, Protocol::HttpAndHttps);
        assert!(serde_json::from_str::<Protocol>("9").is_err());
    }

    #[test]
    fn test_server_availability() {
        let mut server = sample_server();
        for status in ["REPORTED", "reported", "Online"] {
            server.status = status.to_string();
            assert!(server.is_available(), "status {status}");
        }
        for status in ["OFFLINE", "admin_down", ""] {
            server.status = status.to_string();
            assert!(!server.is_available(), "status {status}");
        }
    }

    #[test]
    fn test_delivery_service_policy_text_defaults_empty() {
        let ds: DeliveryService = serde_json::from_value(serde_json::json!({
            "id": 1,
            "xmlId": "ds-one",
            "cdnName": "cdn",
            "protocol": 0,
            "type": "HTTP",
            "qstringIgnore": 0,
            "orgServerFqdn": "http://origin.example.net",
            "dscp": 40
        }))
        .unwrap();
        assert!(ds.edge_header_rewrite.is_empty());
        assert!(ds.remap_text.is_empty());
    }

    fn sample_server() -> Server {
        Server {
            host_name: "edge-01".to_string(),
            domain_name: "cdn.example.net".to_string(),
            ip_address: "192.0.2.10".to_string(),
            interface_name: "eth0".to_string(),
            cachegroup: "edge-east".to_string(),
            cdn_name: "cdn-a".to_string(),
            tcp_port: 80,
            status: "REPORTED".to_string(),
            profile: "EDGE_PROFILE".to_string(),
        }
    }
}
