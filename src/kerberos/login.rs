use crate::communication::KdcTransport;
use crate::error::{Error, Result};
use crate::kerberos::kdc_req::{
    build_as_req, new_pa_data_encrypted_timestamp, raw_timestamp,
};
use crate::kerberos::senders::{send_recv_as, Rep};
use crate::logger::Logger;
use kerberos_asn1::{
    AsRep, AsReq, Asn1Object, EncAsRepPart, EncTgsRepPart, EtypeInfo2, KrbError,
    MethodData,
};
use kerberos_constants::error_codes;
use kerberos_constants::key_usages::{
    KEY_USAGE_AS_REP_ENC_PART, KEY_USAGE_AS_REQ_TIMESTAMP,
};
use kerberos_constants::pa_data_types::PA_ETYPE_INFO2;
use kerberos_crypto::{new_kerberos_cipher, supported_etypes, KerberosCipher};

/// Pre-authenticated login. When the KDC refuses the first attempt and
/// advertises, through ETYPE-INFO2, a salt or etype other than the one
/// used, the key is derived again with them and the request resent once.
pub fn login(
    realm: &str,
    username: &str,
    password: &str,
    permitted_etypes: &[i32],
    transport: &KdcTransport,
    logger: &Logger,
) -> Result<bool> {
    let client = LoginClient::new(realm, username, password, permitted_etypes)?;

    let krb_error = match client.login(transport, logger) {
        Err(Error::Kerberos(krb_error)) => krb_error,
        result => return result,
    };

    let hint = match etype_info2_hint(&krb_error, permitted_etypes) {
        Some(hint) => hint,
        None => return Err(Error::Kerberos(krb_error)),
    };

    let (etype, salt) = match hint {
        (etype, Some(salt)) => (etype, salt),
        (etype, None) => {
            let cipher = new_cipher(etype)?;
            (etype, cipher.generate_salt(realm, username))
        }
    };

    if etype == client.etype() && salt == client.salt {
        return Err(Error::Kerberos(krb_error));
    }

    logger.debug(format!(
        "{}@{} - Retrying login with etype {} and KDC provided salt",
        username, realm, etype
    ));
    LoginClient::with_salt(realm, username, password, etype, salt)?
        .login(transport, logger)
}

/// First ETYPE-INFO2 entry of a pre-authentication refusal whose etype is
/// permitted and supported, with its salt if the KDC sent one.
pub fn etype_info2_hint(
    krb_error: &KrbError,
    permitted_etypes: &[i32],
) -> Option<(i32, Option<Vec<u8>>)> {
    match krb_error.error_code {
        error_codes::KDC_ERR_PREAUTH_FAILED
        | error_codes::KDC_ERR_PREAUTH_REQUIRED
        | error_codes::KDC_ERR_ETYPE_NOSUPP => {}
        _ => return None,
    }

    let (_, method_data) = MethodData::parse(krb_error.e_data.as_ref()?).ok()?;
    let supported = supported_etypes();

    method_data
        .iter()
        .filter(|padata| padata.padata_type == PA_ETYPE_INFO2)
        .filter_map(|padata| EtypeInfo2::parse(&padata.padata_value).ok())
        .flat_map(|(_, entries)| entries)
        .find(|entry| {
            permitted_etypes.contains(&entry.etype)
                && supported.contains(&entry.etype)
        })
        .map(|entry| (entry.etype, entry.salt.map(|salt| salt.into_bytes())))
}

fn new_cipher(etype: i32) -> Result<Box<dyn KerberosCipher>> {
    new_kerberos_cipher(etype).map_err(|err| {
        Error::Config(format!("Unable to use etype {}: {}", etype, err))
    })
}

/// Pre-authenticated AS exchange for a single username/password pair.
/// Holds the password derived key, which is wiped when dropped.
pub struct LoginClient {
    realm: String,
    username: String,
    cipher: Box<dyn KerberosCipher>,
    salt: Vec<u8>,
    key: Vec<u8>,
}

impl LoginClient {
    pub fn new(
        realm: &str,
        username: &str,
        password: &str,
        permitted_etypes: &[i32],
    ) -> Result<Self> {
        let etype = select_etype(permitted_etypes)?;
        let salt = new_cipher(etype)?.generate_salt(realm, username);
        Self::with_salt(realm, username, password, etype, salt)
    }

    /// Client keyed with an explicit etype and salt, as advertised by the
    /// KDC in ETYPE-INFO2.
    pub fn with_salt(
        realm: &str,
        username: &str,
        password: &str,
        etype: i32,
        salt: Vec<u8>,
    ) -> Result<Self> {
        if username.trim().is_empty() {
            return Err(Error::Config("Empty username".into()));
        }

        let cipher = new_cipher(etype)?;
        let key = cipher.generate_key_from_string(password, &salt);

        Ok(Self {
            realm: realm.to_string(),
            username: username.to_string(),
            cipher,
            salt,
            key,
        })
    }

    pub fn etype(&self) -> i32 {
        self.cipher.etype()
    }

    pub fn build_as_req(&self) -> Result<AsReq> {
        let encrypted_timestamp = self.cipher.encrypt(
            &self.key,
            KEY_USAGE_AS_REQ_TIMESTAMP,
            &raw_timestamp(),
        );
        let padata =
            new_pa_data_encrypted_timestamp(self.etype(), encrypted_timestamp);

        build_as_req(&self.realm, &self.username, &[self.etype()], Some(padata))
    }

    /// `Ok(true)` when the KDC issued a TGT that opens with the derived key.
    pub fn login(&self, transport: &KdcTransport, logger: &Logger) -> Result<bool> {
        let as_req = self.build_as_req()?;

        match send_recv_as(transport, &as_req, logger)? {
            Rep::KrbError(krb_error) => Err(Error::Kerberos(krb_error)),
            Rep::AsRep(as_rep) => {
                self.decrypt_as_rep(&as_rep)?;
                Ok(true)
            }
        }
    }

    fn decrypt_as_rep(&self, as_rep: &AsRep) -> Result<()> {
        if as_rep.enc_part.etype != self.etype() {
            return Err(Error::Credentials(format!(
                "AS-REP encrypted with etype {} instead of {}",
                as_rep.enc_part.etype,
                self.etype()
            )));
        }

        let plaintext = self
            .cipher
            .decrypt(&self.key, KEY_USAGE_AS_REP_ENC_PART, &as_rep.enc_part.cipher)
            .map_err(|err| {
                Error::Credentials(format!("Unable to decrypt AS-REP: {}", err))
            })?;

        // Some KDCs tag the AS-REP encrypted part as EncTGSRepPart.
        if EncAsRepPart::parse(&plaintext).is_ok()
            || EncTgsRepPart::parse(&plaintext).is_ok()
        {
            return Ok(());
        }

        Err(Error::Credentials(
            "Decrypted AS-REP part is not valid".into(),
        ))
    }
}

impl Drop for LoginClient {
    fn drop(&mut self) {
        self.key.iter_mut().for_each(|byte| *byte = 0);
        std::hint::black_box(&self.key);
    }
}

fn select_etype(permitted_etypes: &[i32]) -> Result<i32> {
    let supported = supported_etypes();
    permitted_etypes
        .iter()
        .copied()
        .find(|etype| supported.contains(etype))
        .ok_or_else(|| {
            Error::Config(format!(
                "None of the permitted etypes {:?} is supported",
                permitted_etypes
            ))
        })
}
