//! # Rule Assembly
//!
//! The orchestrator: walks every delivery service and composes one rule per
//! protocol pair x regex, each carrying its destinations, certificate
//! references, and per-rule policy. Delivery services compile independently
//! (an unroutable type or an unparseable allow list skips that service with
//! a warning), except for header-rewrite failures and entity lookups, which
//! are structural and abort the run.

use std::collections::BTreeSet;

use tracing::warn;
use url::Url;

use crate::config::Config;
use crate::errors::{Error, Result};
use crate::remap::acl;
use crate::remap::header_rewrite::{self, Header, HeaderOps};
use crate::remap::protocol::{self, RoutingKind, Scheme};
use crate::remap::rules::{
    GlobalPlugins, ParentSelection, PluginsShared, QueryStringRule, RemapRule, RemapRuleTo,
    RemapRules, RemapRulesStats, RulePlugins, DEFAULT_CONNECTION_CLOSE, DEFAULT_RETRY_NUM,
    DEFAULT_RULE_WEIGHT, DEFAULT_TIMEOUT_MS,
};
use crate::snapshot::{DeliveryService, Server, SnapshotIndex};
use crate::topology;
use crate::utils::certificates::{self, CertificateFile};

/// Query-string policy value meaning neither cache nor remap considers the
/// query string. Every other value keeps both behaviors on.
const QSTRING_NO_CACHE_NO_REMAP: i64 = 2;

/// The assembled output of one compiler run: the rule document plus the
/// certificate files it references.
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub rules: RemapRules,
    pub certificates: Vec<CertificateFile>,
}

impl CompiledConfig {
    /// Materialize the planned certificate files. Write failure is fatal.
    pub fn write_certificates(&self) -> Result<()> {
        certificates::write_certificate_files(&self.certificates)?;
        Ok(())
    }
}

/// Assemble the rule document for the configured edge host.
pub fn assemble(index: &SnapshotIndex<'_>, config: &Config) -> Result<CompiledConfig> {
    let target = index.server(&config.host)?;

    let parents = topology::resolve_parents(&config.host, index)?;
    let parents = topology::filter_parents(parents, |p| p.cdn_name == target.cdn_name);
    let parents = topology::filter_parents(parents, Server::is_available);

    let global_allow = acl::allow_list_from_params(&index.snapshot().parameters)?;

    let mut compiled = Vec::new();
    let mut certificate_files = Vec::new();

    for ds in &index.snapshot().delivery_services {
        let kind = match RoutingKind::from_type(&ds.ds_type) {
            Some(kind) => kind,
            None => {
                warn!(
                    xml_id = %ds.xml_id,
                    ds_type = %ds.ds_type,
                    "skipping delivery service with unknown type"
                );
                continue;
            }
        };

        let cdn = index.cdn(&ds.cdn_name)?;

        let allow = match acl::compile_allow_list(&ds.remap_text) {
            Ok(allow) => allow,
            Err(error) => {
                warn!(
                    xml_id = %ds.xml_id,
                    %error,
                    "skipping delivery service with unsupported allow-list policy"
                );
                continue;
            }
        };

        // Header policy is a structural contract of the input; a parse
        // failure here aborts the whole run.
        let headers = header_rewrite::compile_header_rewrite(&ds.edge_header_rewrite)
            .map_err(|source| Error::HeaderRewrite { xml_id: ds.xml_id.clone(), source })?;

        let certificate = index.certificate(&ds.xml_id);
        if ds.protocol.uses_https() {
            match certificate {
                Some(keys) => {
                    certificate_files
                        .extend(certificates::plan_certificate_files(keys, &config.certificate_dir)?);
                }
                None => {
                    warn!(xml_id = %ds.xml_id, "encrypted delivery service has no certificate");
                }
            }
        }

        let regexes = match index.regexes(&ds.xml_id) {
            Some(regexes) => regexes,
            None => {
                warn!(xml_id = %ds.xml_id, "skipping delivery service with no regexes");
                continue;
            }
        };

        for pair in ds.protocol.scheme_pairs() {
            for regex in regexes {
                let (pattern, is_literal) = protocol::trim_literal_pattern(&regex.pattern);

                let (certificate_file, certificate_key_file) = match (pair.from, certificate) {
                    (Scheme::Https, Some(keys)) => (
                        Some(
                            certificates::cert_file_path(keys, &config.certificate_dir)
                                .display()
                                .to_string(),
                        ),
                        Some(
                            certificates::key_file_path(keys, &config.certificate_dir)
                                .display()
                                .to_string(),
                        ),
                    ),
                    _ => (None, None),
                };

                let mut to = Vec::with_capacity(parents.len());
                for parent in &parents {
                    to.push(RemapRuleTo {
                        url: ds.org_server_fqdn.clone(),
                        weight: DEFAULT_RULE_WEIGHT,
                        retry_num: DEFAULT_RETRY_NUM,
                        timeout_ms: DEFAULT_TIMEOUT_MS,
                        retry_codes: BTreeSet::new(),
                        proxy_url: build_proxy_url(ds, parent)?,
                    });
                }

                compiled.push(RemapRule {
                    name: format!("{}.{}.{}.{}", ds.xml_id, pair.from, pair.to, pattern),
                    from: protocol::build_from(
                        pair.from,
                        pattern,
                        is_literal,
                        &target.host_name,
                        kind,
                        &cdn.domain_name,
                    ),
                    certificate_file,
                    certificate_key_file,
                    to,
                    retry_num: DEFAULT_RETRY_NUM,
                    timeout_ms: DEFAULT_TIMEOUT_MS,
                    retry_codes: BTreeSet::new(),
                    query_string: query_string_rule(ds.qstring_ignore),
                    dscp: ds.dscp,
                    connection_close: DEFAULT_CONNECTION_CLOSE,
                    parent_selection: ParentSelection::default(),
                    allow: allow.clone(),
                    plugins: RulePlugins {
                        modify_headers: headers.client.clone(),
                        modify_parent_request_headers: headers.origin.clone(),
                    },
                    plugins_shared: PluginsShared { remap_text: ds.remap_text.clone() },
                });
            }
        }
    }

    let rules = RemapRules {
        rules: compiled,
        retry_codes: BTreeSet::new(),
        timeout_ms: DEFAULT_TIMEOUT_MS,
        parent_selection: ParentSelection::default(),
        stats: RemapRulesStats { allow: global_allow },
        plugins: GlobalPlugins {
            modify_response_headers_global: HeaderOps {
                set: vec![Header {
                    name: "Server".to_string(),
                    value: format!("{}/{}", crate::APP_NAME, crate::VERSION),
                }],
                drop: vec![],
            },
        },
    };

    Ok(CompiledConfig { rules, certificates: certificate_files })
}

/// The parent proxy URL of one destination, or `None` for types that bypass
/// the mid tier.
fn build_proxy_url(ds: &DeliveryService, parent: &Server) -> Result<Option<String>> {
    if protocol::skips_mid(&ds.ds_type) {
        return Ok(None);
    }
    let proxy = format!("http://{}.{}:{}", parent.host_name, parent.domain_name, parent.tcp_port);
    Url::parse(&proxy).map_err(|error| {
        Error::internal(format!(
            "delivery service '{}' parent '{}' proxy URL '{}': {}",
            ds.xml_id, parent.host_name, proxy, error
        ))
    })?;
    Ok(Some(proxy))
}

fn query_string_rule(qstring_ignore: i64) -> QueryStringRule {
    if qstring_ignore == QSTRING_NO_CACHE_NO_REMAP {
        QueryStringRule { remap: false, cache: false }
    } else {
        QueryStringRule { remap: true, cache: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{
        CacheGroup, Cdn, CdnSslKeys, DeliveryService, DeliveryServiceRegex,
        DeliveryServiceRegexes, Parameter, Protocol, Snapshot, SslCertificate,
    };
    use std::path::PathBuf;

    fn server(host: &str, cachegroup: &str, cdn: &str, status: &str) -> Server {
        Server {
            host_name: host.to_string(),
            domain_name: "cdn.example.net".to_string(),
            ip_address: "192.0.2.10".to_string(),
            interface_name: "eth0".to_string(),
            cachegroup: cachegroup.to_string(),
            cdn_name: cdn.to_string(),
            tcp_port: 8080,
            status: status.to_string(),
            profile: "EDGE_PROFILE".to_string(),
        }
    }

    fn delivery_service(xml_id: &str, protocol: Protocol, ds_type: &str) -> DeliveryService {
        DeliveryService {
            id: 1,
            xml_id: xml_id.to_string(),
            cdn_name: "cdn-a".to_string(),
            protocol,
            ds_type: ds_type.to_string(),
            qstring_ignore: 0,
            org_server_fqdn: "http://origin.example.net".to_string(),
            dscp: 40,
            edge_header_rewrite: String::new(),
            remap_text: String::new(),
        }
    }

    fn regexes(xml_id: &str, patterns: &[&str]) -> DeliveryServiceRegexes {
        DeliveryServiceRegexes {
            ds_name: xml_id.to_string(),
            regexes: patterns
                .iter()
                .map(|p| DeliveryServiceRegex { pattern: p.to_string() })
                .collect(),
        }
    }

    fn base_snapshot() -> Snapshot {
        Snapshot {
            servers: vec![
                server("edge-01", "edge-east", "cdn-a", "REPORTED"),
                server("mid-01", "mid-east", "cdn-a", "REPORTED"),
                server("mid-02", "mid-east", "cdn-a", "ONLINE"),
                server("mid-03", "mid-east", "cdn-b", "REPORTED"),
                server("mid-04", "mid-east", "cdn-a", "OFFLINE"),
            ],
            cache_groups: vec![
                CacheGroup {
                    name: "edge-east".to_string(),
                    parent_name: Some("mid-east".to_string()),
                },
                CacheGroup { name: "mid-east".to_string(), parent_name: None },
            ],
            delivery_services: vec![delivery_service("ds-one", Protocol::Http, "HTTP")],
            delivery_service_regexes: vec![regexes("ds-one", &[r".*\.one\..*"])],
            cdns: vec![Cdn {
                name: "cdn-a".to_string(),
                domain_name: "cdn.example.net".to_string(),
            }],
            parameters: vec![],
            ssl_keys: vec![],
        }
    }

    fn config() -> Config {
        Config { host: "edge-01".to_string(), certificate_dir: PathBuf::from("/etc/edgeplane/ssl") }
    }

    fn assemble_snapshot(snapshot: &Snapshot) -> Result<CompiledConfig> {
        let index = SnapshotIndex::new(snapshot);
        assemble(&index, &config())
    }

    #[test]
    fn test_dual_protocol_with_two_regexes_emits_four_rules() {
        let mut snapshot = base_snapshot();
        snapshot.delivery_services =
            vec![delivery_service("ds-one", Protocol::HttpAndHttps, "HTTP")];
        snapshot.delivery_service_regexes =
            vec![regexes("ds-one", &[r".*\.one\..*", r".*\.two\..*"])];

        let compiled = assemble_snapshot(&snapshot).unwrap();
        let names: Vec<&str> =
            compiled.rules.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "ds-one.http.http.one",
                "ds-one.http.http.two",
                "ds-one.https.https.one",
                "ds-one.https.https.two",
            ]
        );
    }

    #[test]
    fn test_rule_carries_filtered_parents_in_order() {
        let compiled = assemble_snapshot(&base_snapshot()).unwrap();
        let rule = &compiled.rules.rules[0];
        assert_eq!(rule.from, "http://edge-01.one.cdn.example.net");
        let proxies: Vec<&str> =
            rule.to.iter().filter_map(|t| t.proxy_url.as_deref()).collect();
        // mid-03 is on another CDN, mid-04 is offline.
        assert_eq!(
            proxies,
            vec!["http://mid-01.cdn.example.net:8080", "http://mid-02.cdn.example.net:8080"]
        );
        assert!(rule.to.iter().all(|t| t.url == "http://origin.example.net"));
    }

    #[test]
    fn test_dns_type_uses_edge_label() {
        let mut snapshot = base_snapshot();
        snapshot.delivery_services = vec![delivery_service("ds-one", Protocol::Http, "DNS")];
        let compiled = assemble_snapshot(&snapshot).unwrap();
        assert_eq!(compiled.rules.rules[0].from, "http://edge.one.cdn.example.net");
    }

    #[test]
    fn test_non_literal_pattern_passes_through() {
        let mut snapshot = base_snapshot();
        snapshot.delivery_service_regexes = vec![regexes("ds-one", &[r"^/assets/.*"])];
        let compiled = assemble_snapshot(&snapshot).unwrap();
        assert_eq!(compiled.rules.rules[0].from, r"http://^/assets/.*");
    }

    #[test]
    fn test_unknown_type_skips_only_that_service() {
        let mut snapshot = base_snapshot();
        snapshot.delivery_services.insert(0, delivery_service("ds-odd", Protocol::Http, "UNKNOWN_TYPE"));
        snapshot.delivery_service_regexes.push(regexes("ds-odd", &[r".*\.odd\..*"]));

        let compiled = assemble_snapshot(&snapshot).unwrap();
        let names: Vec<&str> = compiled.rules.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ds-one.http.http.one"]);
    }

    #[test]
    fn test_unparseable_acl_skips_only_that_service() {
        let mut snapshot = base_snapshot();
        let mut bad = delivery_service("ds-bad", Protocol::Http, "HTTP");
        bad.remap_text = "@action=allow not-an-address".to_string();
        snapshot.delivery_services.insert(0, bad);
        snapshot.delivery_service_regexes.push(regexes("ds-bad", &[r".*\.bad\..*"]));

        let compiled = assemble_snapshot(&snapshot).unwrap();
        let names: Vec<&str> = compiled.rules.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ds-one.http.http.one"]);
    }

    #[test]
    fn test_acl_is_attached_to_every_rule_of_the_service() {
        let mut snapshot = base_snapshot();
        snapshot.delivery_services[0].remap_text = "@action=allow 10.0.0.1-10.0.0.6".to_string();
        let compiled = assemble_snapshot(&snapshot).unwrap();
        let rule = &compiled.rules.rules[0];
        assert_eq!(rule.allow, vec!["10.0.0.0/29".parse().unwrap()]);
        assert_eq!(rule.plugins_shared.remap_text, "@action=allow 10.0.0.1-10.0.0.6");
    }

    #[test]
    fn test_malformed_header_policy_aborts_the_run() {
        let mut snapshot = base_snapshot();
        snapshot.delivery_services[0].edge_header_rewrite = "set-header X-Test".to_string();
        assert!(matches!(assemble_snapshot(&snapshot), Err(Error::HeaderRewrite { .. })));
    }

    #[test]
    fn test_header_ops_split_by_direction() {
        let mut snapshot = base_snapshot();
        snapshot.delivery_services[0].edge_header_rewrite =
            "cond %{SEND_RESPONSE_HDR_HOOK} set-header X-Test foo __RETURN__ \
             cond %{SEND_REQUEST_HDR_HOOK} rm-header X-Internal"
                .to_string();
        let compiled = assemble_snapshot(&snapshot).unwrap();
        let plugins = &compiled.rules.rules[0].plugins;
        assert_eq!(plugins.modify_headers.set.len(), 1);
        assert_eq!(plugins.modify_headers.set[0].name, "X-Test");
        assert_eq!(plugins.modify_parent_request_headers.drop, vec!["X-Internal".to_string()]);
    }

    #[test]
    fn test_https_route_without_certificate_still_emits() {
        let mut snapshot = base_snapshot();
        snapshot.delivery_services = vec![delivery_service("ds-one", Protocol::Https, "HTTP")];
        let compiled = assemble_snapshot(&snapshot).unwrap();
        let rule = &compiled.rules.rules[0];
        assert_eq!(rule.name, "ds-one.https.https.one");
        assert!(rule.certificate_file.is_none());
        assert!(rule.certificate_key_file.is_none());
        assert!(compiled.certificates.is_empty());
    }

    #[test]
    fn test_certificate_binds_to_https_scheme_only() {
        let mut snapshot = base_snapshot();
        snapshot.delivery_services =
            vec![delivery_service("ds-one", Protocol::HttpToHttps, "HTTP")];
        snapshot.ssl_keys = vec![CdnSslKeys {
            deliveryservice: "ds-one".to_string(),
            hostname: "*.one.cdn.example.net".to_string(),
            certificate: SslCertificate {
                crt: "Y2VydC1ieXRlcw==".to_string(),
                key: "a2V5LWJ5dGVz".to_string(),
            },
        }];

        let compiled = assemble_snapshot(&snapshot).unwrap();
        // The http client scheme carries no certificate references; https does.
        let http_rule = &compiled.rules.rules[0];
        assert_eq!(http_rule.name, "ds-one.http.https.one");
        assert!(http_rule.certificate_file.is_none());

        let https_rule = &compiled.rules.rules[1];
        assert_eq!(https_rule.name, "ds-one.https.https.one");
        assert_eq!(
            https_rule.certificate_file.as_deref(),
            Some("/etc/edgeplane/ssl/one.cdn.example.net.crt")
        );
        assert_eq!(
            https_rule.certificate_key_file.as_deref(),
            Some("/etc/edgeplane/ssl/one.cdn.example.net.key")
        );

        // Both files are planned for materialization once.
        assert_eq!(compiled.certificates.len(), 2);
        assert_eq!(compiled.certificates[0].contents, b"cert-bytes");
    }

    #[test]
    fn test_undecodable_certificate_is_fatal() {
        let mut snapshot = base_snapshot();
        snapshot.delivery_services = vec![delivery_service("ds-one", Protocol::Https, "HTTP")];
        snapshot.ssl_keys = vec![CdnSslKeys {
            deliveryservice: "ds-one".to_string(),
            hostname: "one.cdn.example.net".to_string(),
            certificate: SslCertificate {
                crt: "not base64!".to_string(),
                key: "a2V5LWJ5dGVz".to_string(),
            },
        }];
        assert!(matches!(assemble_snapshot(&snapshot), Err(Error::Certificate(_))));
    }

    #[test]
    fn test_live_type_omits_proxy_urls() {
        let mut snapshot = base_snapshot();
        snapshot.delivery_services = vec![delivery_service("ds-one", Protocol::Http, "HTTP_LIVE")];
        let compiled = assemble_snapshot(&snapshot).unwrap();
        let rule = &compiled.rules.rules[0];
        assert_eq!(rule.to.len(), 2);
        assert!(rule.to.iter().all(|t| t.proxy_url.is_none()));
    }

    #[test]
    fn test_no_parents_yields_rule_with_no_destinations() {
        let mut snapshot = base_snapshot();
        snapshot.servers.retain(|s| s.cachegroup != "mid-east");
        let compiled = assemble_snapshot(&snapshot).unwrap();
        assert!(compiled.rules.rules[0].to.is_empty());
    }

    #[test]
    fn test_no_regexes_skips_service() {
        let mut snapshot = base_snapshot();
        snapshot.delivery_service_regexes.clear();
        let compiled = assemble_snapshot(&snapshot).unwrap();
        assert!(compiled.rules.rules.is_empty());
    }

    #[test]
    fn test_missing_cdn_is_fatal() {
        let mut snapshot = base_snapshot();
        snapshot.cdns.clear();
        assert!(matches!(
            assemble_snapshot(&snapshot),
            Err(Error::NotFound { entity: "CDN", .. })
        ));
    }

    #[test]
    fn test_missing_host_is_fatal() {
        let mut snapshot = base_snapshot();
        snapshot.servers.remove(0);
        assert!(matches!(
            assemble_snapshot(&snapshot),
            Err(Error::NotFound { entity: "Server", .. })
        ));
    }

    #[test]
    fn test_query_string_policy_mapping() {
        assert_eq!(query_string_rule(0), QueryStringRule { remap: true, cache: true });
        assert_eq!(query_string_rule(1), QueryStringRule { remap: true, cache: true });
        assert_eq!(query_string_rule(2), QueryStringRule { remap: false, cache: false });
        // Out-of-range legacy values keep both behaviors on.
        assert_eq!(query_string_rule(7), QueryStringRule { remap: true, cache: true });
    }

    #[test]
    fn test_global_block_and_stats_allow_list() {
        let mut snapshot = base_snapshot();
        snapshot.parameters = vec![Parameter {
            name: "allow_ip".to_string(),
            config_file: "astats.config".to_string(),
            value: "192.0.2.0/24,198.51.100.7".to_string(),
        }];
        let compiled = assemble_snapshot(&snapshot).unwrap();
        assert_eq!(
            compiled.rules.stats.allow,
            vec!["192.0.2.0/24".parse().unwrap(), "198.51.100.7/32".parse().unwrap()]
        );
        let global = &compiled.rules.plugins.modify_response_headers_global;
        assert_eq!(global.set.len(), 1);
        assert_eq!(global.set[0].name, "Server");
        assert!(global.set[0].value.starts_with(crate::APP_NAME));
    }
}
