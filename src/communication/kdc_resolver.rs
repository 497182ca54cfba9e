use crate::error::{Error, Result};
use crate::kerberos::krb5conf::Krb5Config;
use crate::logger::Logger;
use std::collections::BTreeMap;
use trust_dns_resolver::Resolver;

pub const DEFAULT_KDC_PORT: u16 = 88;

/// KDC addresses (`host:port`) keyed by priority, starting at 1.
pub type Kdcs = BTreeMap<usize, String>;

/// A DNS SRV record: priority, port and target host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    pub priority: u16,
    pub port: u16,
    pub target: String,
}

/// Source of SRV records used to discover the KDCs of a realm.
pub trait SrvResolver {
    fn lookup_srv(&self, name: &str) -> std::result::Result<Vec<SrvRecord>, String>;
}

/// Resolver built from the system DNS configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSrvResolver;

impl SrvResolver for SystemSrvResolver {
    fn lookup_srv(&self, name: &str) -> std::result::Result<Vec<SrvRecord>, String> {
        let resolver = Resolver::from_system_conf().map_err(|err| {
            format!("Unable to use dns system configuration: {}", err)
        })?;

        let lookup = resolver.srv_lookup(name).map_err(|err| err.to_string())?;
        Ok(lookup
            .iter()
            .map(|srv| SrvRecord {
                priority: srv.priority(),
                port: srv.port(),
                target: srv.target().to_utf8(),
            })
            .collect())
    }
}

/// Resolves the KDCs of a realm. Explicit `kdc =` entries in the
/// configuration win; otherwise DNS SRV records are used when
/// `dns_lookup_kdc` is set.
pub fn resolve_kdcs(
    config: &Krb5Config,
    realm: &str,
    logger: &Logger,
) -> Result<Kdcs> {
    resolve_kdcs_with(config, realm, &SystemSrvResolver, logger)
}

pub fn resolve_kdcs_with(
    config: &Krb5Config,
    realm: &str,
    resolver: &dyn SrvResolver,
    logger: &Logger,
) -> Result<Kdcs> {
    let explicit = config.get_kdcs(realm);

    let addresses = if !explicit.is_empty() {
        explicit
            .iter()
            .map(|kdc| normalize_kdc_address(kdc))
            .collect()
    } else if config.lib_defaults.dns_lookup_kdc {
        logger.debug(format!("Looking up KDC SRV records for {}", realm));
        lookup_kdc_srv(resolver, realm, logger)
    } else {
        Vec::new()
    };

    let kdcs: Kdcs = addresses
        .into_iter()
        .enumerate()
        .map(|(i, address)| (i + 1, address))
        .collect();

    if kdcs.is_empty() {
        return Err(Error::Config(format!(
            "Couldn't find any KDCs for realm {}. Please specify a Domain Controller",
            realm
        )));
    }

    for (priority, kdc) in kdcs.iter() {
        logger.debug(format!("KDC {}: {}", priority, kdc));
    }

    Ok(kdcs)
}

/// Appends the default Kerberos port when the address has none. Bare IPv6
/// addresses are bracketed.
pub fn normalize_kdc_address(kdc: &str) -> String {
    let kdc = kdc.trim();

    if kdc.starts_with('[') {
        if kdc.contains("]:") {
            return kdc.to_string();
        }
        return format!("{}:{}", kdc, DEFAULT_KDC_PORT);
    }

    match kdc.matches(':').count() {
        0 => format!("{}:{}", kdc, DEFAULT_KDC_PORT),
        1 => kdc.to_string(),
        _ => format!("[{}]:{}", kdc, DEFAULT_KDC_PORT),
    }
}

fn lookup_kdc_srv(
    resolver: &dyn SrvResolver,
    realm: &str,
    logger: &Logger,
) -> Vec<String> {
    for proto in &["udp", "tcp"] {
        let name = format!("_kerberos._{}.{}.", proto, realm);
        match resolver.lookup_srv(&name) {
            Ok(records) => {
                let mut records: Vec<SrvRecord> = records
                    .into_iter()
                    .map(|mut srv| {
                        srv.target = srv.target.trim_end_matches('.').to_string();
                        srv
                    })
                    .filter(|srv| !srv.target.is_empty())
                    .collect();

                if records.is_empty() {
                    continue;
                }

                records.sort_by_key(|srv| srv.priority);
                return records
                    .into_iter()
                    .map(|srv| format_host_port(&srv.target, srv.port))
                    .collect();
            }
            Err(err) => {
                logger.debug(format!("Error resolving '{}': {}", name, err));
            }
        }
    }

    Vec::new()
}

fn format_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kerberos::krb5conf::render_krb5_conf;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeResolver {
        records: HashMap<String, Vec<SrvRecord>>,
        queries: RefCell<Vec<String>>,
    }

    impl SrvResolver for FakeResolver {
        fn lookup_srv(&self, name: &str) -> std::result::Result<Vec<SrvRecord>, String> {
            self.queries.borrow_mut().push(name.to_string());
            self.records
                .get(name)
                .cloned()
                .ok_or_else(|| "no records found".to_string())
        }
    }

    fn srv(priority: u16, port: u16, target: &str) -> SrvRecord {
        SrvRecord {
            priority,
            port,
            target: target.to_string(),
        }
    }

    fn dns_config() -> Krb5Config {
        Krb5Config::parse(&render_krb5_conf("EXAMPLE.COM", None)).unwrap()
    }

    #[test]
    fn test_srv_records_sorted_by_priority() {
        let mut resolver = FakeResolver::default();
        resolver.records.insert(
            "_kerberos._udp.EXAMPLE.COM.".into(),
            vec![srv(10, 88, "dc2.example.com."), srv(0, 88, "dc1.example.com.")],
        );

        let kdcs =
            resolve_kdcs_with(&dns_config(), "EXAMPLE.COM", &resolver, &Logger::default())
                .unwrap();

        assert_eq!(kdcs.get(&1).unwrap(), "dc1.example.com:88");
        assert_eq!(kdcs.get(&2).unwrap(), "dc2.example.com:88");
        assert_eq!(*resolver.queries.borrow(), vec!["_kerberos._udp.EXAMPLE.COM."]);
    }

    #[test]
    fn test_srv_falls_back_to_tcp_records() {
        let mut resolver = FakeResolver::default();
        resolver.records.insert(
            "_kerberos._tcp.EXAMPLE.COM.".into(),
            vec![srv(0, 1088, "dc1.example.com.")],
        );

        let kdcs =
            resolve_kdcs_with(&dns_config(), "EXAMPLE.COM", &resolver, &Logger::default())
                .unwrap();

        assert_eq!(kdcs.get(&1).unwrap(), "dc1.example.com:1088");
        assert_eq!(
            *resolver.queries.borrow(),
            vec!["_kerberos._udp.EXAMPLE.COM.", "_kerberos._tcp.EXAMPLE.COM."]
        );
    }

    #[test]
    fn test_no_srv_records_is_config_error() {
        let resolver = FakeResolver::default();
        let err =
            resolve_kdcs_with(&dns_config(), "EXAMPLE.COM", &resolver, &Logger::default())
                .unwrap_err();

        assert!(err.is_config_error());
        assert!(err.to_string().contains("EXAMPLE.COM"));
        assert_eq!(resolver.queries.borrow().len(), 2);
    }

    #[test]
    fn test_explicit_kdc_skips_dns() {
        let resolver = FakeResolver::default();
        let config =
            Krb5Config::parse(&render_krb5_conf("EXAMPLE.COM", Some("10.0.0.1"))).unwrap();
        let kdcs =
            resolve_kdcs_with(&config, "EXAMPLE.COM", &resolver, &Logger::default())
                .unwrap();

        assert_eq!(kdcs.get(&1).unwrap(), "10.0.0.1:88");
        assert!(resolver.queries.borrow().is_empty());
    }

    #[test]
    fn test_normalize_kdc_address() {
        assert_eq!(normalize_kdc_address("dc1.example.com"), "dc1.example.com:88");
        assert_eq!(normalize_kdc_address("10.0.0.1:1088"), "10.0.0.1:1088");
        assert_eq!(normalize_kdc_address("::1"), "[::1]:88");
        assert_eq!(normalize_kdc_address("[::1]"), "[::1]:88");
        assert_eq!(normalize_kdc_address("[::1]:750"), "[::1]:750");
    }

    #[test]
    fn test_resolve_explicit_kdc() {
        let text = render_krb5_conf("EXAMPLE.COM", Some("dc1.example.com"));
        let config = Krb5Config::parse(&text).unwrap();
        let kdcs = resolve_kdcs(&config, "EXAMPLE.COM", &Logger::default())
            .unwrap();

        assert_eq!(kdcs.len(), 1);
        assert_eq!(kdcs.get(&1).unwrap(), "dc1.example.com:88");
    }

    #[test]
    fn test_no_kdc_without_dns_is_config_error() {
        let config = Krb5Config::parse(
            "[libdefaults]\ndns_lookup_kdc = false\ndefault_realm = EXAMPLE.COM\n",
        )
        .unwrap();

        let err = resolve_kdcs(&config, "EXAMPLE.COM", &Logger::default())
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("EXAMPLE.COM"));
        assert!(err.to_string().contains("Domain Controller"));
    }
}
