use std::collections::HashMap;

use crate::errors::{Error, Result};
use crate::snapshot::model::{
    CacheGroup, Cdn, CdnSslKeys, DeliveryService, DeliveryServiceRegex, Server, Snapshot,
};

/// Keyed lookup maps over a snapshot.
///
/// Built once per run; lookups are fallible so missing cross-entity
/// references surface as tagged errors instead of panics. Anything
/// order-sensitive iterates the snapshot's input-ordered lists, never these
/// maps.
pub struct SnapshotIndex<'a> {
    snapshot: &'a Snapshot,
    servers_by_host: HashMap<&'a str, &'a Server>,
    cache_groups_by_name: HashMap<&'a str, &'a CacheGroup>,
    ds_by_xml_id: HashMap<&'a str, &'a DeliveryService>,
    ds_by_id: HashMap<i64, &'a DeliveryService>,
    cdns_by_name: HashMap<&'a str, &'a Cdn>,
    regexes_by_ds: HashMap<&'a str, &'a [DeliveryServiceRegex]>,
    certs_by_ds: HashMap<&'a str, &'a CdnSslKeys>,
}

impl<'a> SnapshotIndex<'a> {
    /// Build the index over the given snapshot.
    pub fn new(snapshot: &'a Snapshot) -> Self {
        let servers_by_host =
            snapshot.servers.iter().map(|s| (s.host_name.as_str(), s)).collect();
        let cache_groups_by_name =
            snapshot.cache_groups.iter().map(|cg| (cg.name.as_str(), cg)).collect();
        let ds_by_xml_id =
            snapshot.delivery_services.iter().map(|ds| (ds.xml_id.as_str(), ds)).collect();
        let ds_by_id = snapshot.delivery_services.iter().map(|ds| (ds.id, ds)).collect();
        let cdns_by_name = snapshot.cdns.iter().map(|cdn| (cdn.name.as_str(), cdn)).collect();
        let regexes_by_ds = snapshot
            .delivery_service_regexes
            .iter()
            .map(|group| (group.ds_name.as_str(), group.regexes.as_slice()))
            .collect();
        let certs_by_ds =
            snapshot.ssl_keys.iter().map(|keys| (keys.deliveryservice.as_str(), keys)).collect();

        Self {
            snapshot,
            servers_by_host,
            cache_groups_by_name,
            ds_by_xml_id,
            ds_by_id,
            cdns_by_name,
            regexes_by_ds,
            certs_by_ds,
        }
    }

    /// The snapshot this index was built over.
    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    /// Look up a server by hostname.
    pub fn server(&self, host_name: &str) -> Result<&'a Server> {
        self.servers_by_host
            .get(host_name)
            .copied()
            .ok_or_else(|| Error::not_found("Server", host_name))
    }

    /// Look up a cache group by name.
    pub fn cache_group(&self, name: &str) -> Result<&'a CacheGroup> {
        self.cache_groups_by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::not_found("Cache group", name))
    }

    /// Look up a CDN by name.
    pub fn cdn(&self, name: &str) -> Result<&'a Cdn> {
        self.cdns_by_name.get(name).copied().ok_or_else(|| Error::not_found("CDN", name))
    }

    /// Look up a delivery service by XML id.
    pub fn delivery_service(&self, xml_id: &str) -> Option<&'a DeliveryService> {
        self.ds_by_xml_id.get(xml_id).copied()
    }

    /// Look up a delivery service by numeric id.
    pub fn delivery_service_by_id(&self, id: i64) -> Option<&'a DeliveryService> {
        self.ds_by_id.get(&id).copied()
    }

    /// The ordered regex group of a delivery service, if any.
    pub fn regexes(&self, xml_id: &str) -> Option<&'a [DeliveryServiceRegex]> {
        self.regexes_by_ds.get(xml_id).copied()
    }

    /// The certificate record of a delivery service, if any.
    pub fn certificate(&self, xml_id: &str) -> Option<&'a CdnSslKeys> {
        self.certs_by_ds.get(xml_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::model::{
        DeliveryServiceRegexes, Parameter, Protocol, Server, SslCertificate,
    };

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            servers: vec![Server {
                host_name: "edge-01".to_string(),
                domain_name: "cdn.example.net".to_string(),
                ip_address: "192.0.2.10".to_string(),
                interface_name: "eth0".to_string(),
                cachegroup: "edge-east".to_string(),
                cdn_name: "cdn-a".to_string(),
                tcp_port: 80,
                status: "REPORTED".to_string(),
                profile: "EDGE_PROFILE".to_string(),
            }],
            cache_groups: vec![CacheGroup {
                name: "edge-east".to_string(),
                parent_name: Some("mid-east".to_string()),
            }],
            delivery_services: vec![DeliveryService {
                id: 7,
                xml_id: "ds-one".to_string(),
                cdn_name: "cdn-a".to_string(),
                protocol: Protocol::Http,
                ds_type: "HTTP".to_string(),
                qstring_ignore: 0,
                org_server_fqdn: "http://origin.example.net".to_string(),
                dscp: 40,
                edge_header_rewrite: String::new(),
                remap_text: String::new(),
            }],
            delivery_service_regexes: vec![DeliveryServiceRegexes {
                ds_name: "ds-one".to_string(),
                regexes: vec![
                    DeliveryServiceRegex { pattern: r".*\.first\..*".to_string() },
                    DeliveryServiceRegex { pattern: r".*\.second\..*".to_string() },
                ],
            }],
            cdns: vec![Cdn {
                name: "cdn-a".to_string(),
                domain_name: "cdn.example.net".to_string(),
            }],
            parameters: vec![Parameter {
                name: "allow_ip".to_string(),
                config_file: "astats.config".to_string(),
                value: "192.0.2.0/24".to_string(),
            }],
            ssl_keys: vec![CdnSslKeys {
                deliveryservice: "ds-one".to_string(),
                hostname: "*.one.cdn.example.net".to_string(),
                certificate: SslCertificate { crt: "Y3J0".to_string(), key: "a2V5".to_string() },
            }],
        }
    }

    #[test]
    fn test_lookups_find_entities() {
        let snapshot = sample_snapshot();
        let index = SnapshotIndex::new(&snapshot);

        assert_eq!(index.server("edge-01").unwrap().cachegroup, "edge-east");
        assert_eq!(index.cache_group("edge-east").unwrap().parent_name.as_deref(), Some("mid-east"));
        assert_eq!(index.cdn("cdn-a").unwrap().domain_name, "cdn.example.net");
        assert_eq!(index.delivery_service("ds-one").unwrap().id, 7);
        assert_eq!(index.delivery_service_by_id(7).unwrap().xml_id, "ds-one");
        assert!(index.certificate("ds-one").is_some());
    }

    #[test]
    fn test_missing_lookups_are_tagged_errors() {
        let snapshot = sample_snapshot();
        let index = SnapshotIndex::new(&snapshot);

        assert!(matches!(
            index.server("edge-99"),
            Err(Error::NotFound { entity: "Server", .. })
        ));
        assert!(matches!(
            index.cache_group("mid-west"),
            Err(Error::NotFound { entity: "Cache group", .. })
        ));
        assert!(matches!(index.cdn("cdn-b"), Err(Error::NotFound { entity: "CDN", .. })));
        assert!(index.delivery_service("ds-two").is_none());
        assert!(index.certificate("ds-two").is_none());
    }

    #[test]
    fn test_regex_group_preserves_order() {
        let snapshot = sample_snapshot();
        let index = SnapshotIndex::new(&snapshot);

        let regexes = index.regexes("ds-one").unwrap();
        assert_eq!(regexes.len(), 2);
        assert_eq!(regexes[0].pattern, r".*\.first\..*");
        assert_eq!(regexes[1].pattern, r".*\.second\..*");
    }
}
