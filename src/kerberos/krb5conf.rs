//! Minimal krb5.conf handling: render the realm configuration used by a
//! session and parse it back into a [`Krb5Config`].

use crate::communication::Socks5Proxy;
use crate::error::{Error, Result};
use kerberos_constants::etypes;

pub const DEFAULT_UDP_PREFERENCE_LIMIT: usize = 1465;

/// Renders the configuration for a realm. Without a domain controller the
/// KDCs are discovered through DNS SRV records. A blank domain controller
/// counts as none.
pub fn render_krb5_conf(realm: &str, domain_controller: Option<&str>) -> String {
    match domain_controller.map(str::trim).filter(|dc| !dc.is_empty()) {
        None => format!(
            "[libdefaults]\n\
             dns_lookup_kdc = true\n\
             default_realm = {realm}\n",
            realm = realm
        ),
        Some(dc) => format!(
            "[libdefaults]\n\
             default_realm = {realm}\n\
             [realms]\n\
             {realm} = {{\n\
             \tkdc = {dc}\n\
             \tadmin_server = {dc}\n\
             }}\n",
            realm = realm,
            dc = dc
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibDefaults {
    pub default_realm: Option<String>,
    pub dns_lookup_kdc: bool,
    pub default_tkt_enctype_ids: Vec<i32>,
    pub udp_preference_limit: usize,
}

impl Default for LibDefaults {
    fn default() -> Self {
        Self {
            default_realm: None,
            dns_lookup_kdc: false,
            default_tkt_enctype_ids: vec![
                etypes::AES256_CTS_HMAC_SHA1_96,
                etypes::AES128_CTS_HMAC_SHA1_96,
                etypes::RC4_HMAC,
            ],
            udp_preference_limit: DEFAULT_UDP_PREFERENCE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RealmConfig {
    pub realm: String,
    pub kdc: Vec<String>,
    pub admin_server: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Krb5Config {
    pub lib_defaults: LibDefaults,
    pub realms: Vec<RealmConfig>,
    pub socks5: Option<Socks5Proxy>,
}

impl Krb5Config {
    pub fn parse(text: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut section: Option<String> = None;
        let mut realm_block: Option<RealmConfig> = None;

        for (i, raw_line) in text.lines().enumerate() {
            let lineno = i + 1;
            let line = raw_line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';')
            {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                if realm_block.is_some() {
                    return Err(invalid_line(lineno, line, "unterminated realm block"));
                }
                section = Some(line[1..line.len() - 1].trim().to_lowercase());
                continue;
            }

            if line == "}" {
                match realm_block.take() {
                    Some(realm) => config.realms.push(realm),
                    None => return Err(invalid_line(lineno, line, "unexpected '}'")),
                }
                continue;
            }

            let (key, value) = match line.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => return Err(invalid_line(lineno, line, "expected 'key = value'")),
            };

            let section_name = match &section {
                Some(name) => name.as_str(),
                None => return Err(invalid_line(lineno, line, "key outside of any section")),
            };

            if value == "{" {
                if realm_block.is_some() {
                    return Err(invalid_line(lineno, line, "nested block"));
                }
                realm_block = Some(RealmConfig {
                    realm: key.to_string(),
                    ..Default::default()
                });
                continue;
            }

            if let Some(realm) = realm_block.as_mut() {
                if section_name == "realms" {
                    match key {
                        "kdc" => realm.kdc.push(value.to_string()),
                        "admin_server" => realm.admin_server.push(value.to_string()),
                        _ => {}
                    }
                }
                continue;
            }

            if section_name == "libdefaults" {
                config
                    .lib_defaults
                    .set(key, value)
                    .map_err(|msg| invalid_line(lineno, line, &msg))?;
            }
        }

        if let Some(realm) = realm_block {
            return Err(Error::Config(format!(
                "Invalid krb5.conf: unterminated block for realm {}",
                realm.realm
            )));
        }

        Ok(config)
    }

    /// Explicit KDCs configured for the realm (realm names compare
    /// case-insensitively).
    pub fn get_kdcs(&self, realm: &str) -> Vec<String> {
        self.realms
            .iter()
            .filter(|r| r.realm.eq_ignore_ascii_case(realm))
            .flat_map(|r| r.kdc.iter().cloned())
            .collect()
    }

    /// Route all KDC traffic through a SOCKS5 proxy. This implies TCP.
    pub fn enable_socks5(&mut self, proxy: Socks5Proxy) {
        self.socks5 = Some(proxy);
    }

    /// Restricts the permitted encryption types to RC4-HMAC, so captured
    /// material is keyed with the NT hash of the password.
    pub fn downgrade_to_rc4(&mut self) {
        self.lib_defaults.default_tkt_enctype_ids = vec![etypes::RC4_HMAC];
    }

    pub fn permitted_etypes(&self) -> &[i32] {
        &self.lib_defaults.default_tkt_enctype_ids
    }
}

impl LibDefaults {
    fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "default_realm" => self.default_realm = Some(value.to_string()),
            "dns_lookup_kdc" => self.dns_lookup_kdc = parse_bool(value)?,
            "default_tkt_enctypes" => {
                self.default_tkt_enctype_ids = parse_enctypes(value)?
            }
            "udp_preference_limit" => {
                self.udp_preference_limit = value
                    .parse()
                    .map_err(|_| format!("invalid number '{}'", value))?
            }
            _ => {}
        }
        Ok(())
    }
}

fn invalid_line(lineno: usize, line: &str, reason: &str) -> Error {
    Error::Config(format!(
        "Invalid krb5.conf line {} ('{}'): {}",
        lineno, line, reason
    ))
}

fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(format!("invalid boolean '{}'", value)),
    }
}

fn parse_enctypes(value: &str) -> std::result::Result<Vec<i32>, String> {
    let enctypes = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|name| !name.is_empty())
        .map(|name| {
            enctype_from_name(name).ok_or(format!("unknown enctype '{}'", name))
        })
        .collect::<std::result::Result<Vec<i32>, String>>()?;

    if enctypes.is_empty() {
        return Err("empty enctype list".to_string());
    }
    Ok(enctypes)
}

pub fn enctype_from_name(name: &str) -> Option<i32> {
    if let Ok(id) = name.parse::<i32>() {
        return Some(id);
    }

    match name.to_lowercase().as_str() {
        "aes256-cts-hmac-sha1-96" | "aes256-cts" | "aes256-sha1" => {
            Some(etypes::AES256_CTS_HMAC_SHA1_96)
        }
        "aes128-cts-hmac-sha1-96" | "aes128-cts" | "aes128-sha1" => {
            Some(etypes::AES128_CTS_HMAC_SHA1_96)
        }
        "arcfour-hmac" | "arcfour-hmac-md5" | "rc4-hmac" => Some(etypes::RC4_HMAC),
        _ => None,
    }
}

pub fn enctype_name(etype: i32) -> &'static str {
    match etype {
        etypes::AES256_CTS_HMAC_SHA1_96 => "aes256-cts-hmac-sha1-96",
        etypes::AES128_CTS_HMAC_SHA1_96 => "aes128-cts-hmac-sha1-96",
        etypes::RC4_HMAC => "arcfour-hmac-md5",
        _ => "unknown",
    }
}
