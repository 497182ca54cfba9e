use crate::error::{Error, Result};
use chrono::{Duration, Utc};
use kerberos_asn1::{
    AsReq, Asn1Object, EncryptedData, KdcReq, KerbPaPacRequest, KerberosTime,
    PaData, PaEncTsEnc, PrincipalName,
};
use kerberos_constants::{kdc_options, pa_data_types, principal_names};
use rand::Rng;

pub struct KdcReqBuilder {
    realm: String,
    sname: Option<PrincipalName>,
    etypes: Vec<i32>,
    kdc_options: u32,
    cname: Option<PrincipalName>,
    padatas: Vec<PaData>,
    nonce: u32,
    till: KerberosTime,
}

impl KdcReqBuilder {
    /// Builder for a request of a TGT (`krbtgt/REALM`) of the given realm
    pub fn new(realm: &str) -> Self {
        let realm = realm.to_uppercase();
        Self {
            sname: Some(PrincipalName {
                name_type: principal_names::NT_SRV_INST,
                name_string: vec!["krbtgt".into(), realm.clone()],
            }),
            realm,
            etypes: Vec::new(),
            kdc_options: kdc_options::FORWARDABLE
                | kdc_options::RENEWABLE
                | kdc_options::CANONICALIZE
                | kdc_options::RENEWABLE_OK,
            cname: None,
            padatas: Vec::new(),
            nonce: rand::thread_rng().gen(),
            till: (Utc::now() + Duration::hours(24)).into(),
        }
    }

    pub fn etypes(mut self, etypes: Vec<i32>) -> Self {
        self.etypes = etypes;
        self
    }

    pub fn username(mut self, username: &str) -> Self {
        self.cname = Some(PrincipalName {
            name_type: principal_names::NT_PRINCIPAL,
            name_string: vec![username.to_string()],
        });
        self
    }

    pub fn push_padata(mut self, padata: PaData) -> Self {
        self.padatas.push(padata);
        self
    }

    pub fn request_pac(self) -> Self {
        self.push_padata(PaData::new(
            pa_data_types::PA_PAC_REQUEST,
            KerbPaPacRequest::new(true).build(),
        ))
    }

    pub fn build(self) -> KdcReq {
        let mut req = KdcReq::default();

        req.req_body.kdc_options = self.kdc_options.into();
        req.req_body.cname = self.cname;
        req.req_body.realm = self.realm;
        req.req_body.sname = self.sname;
        req.req_body.till = self.till.clone();
        req.req_body.rtime = Some(self.till);
        req.req_body.nonce = self.nonce;
        req.req_body.etypes = self.etypes;

        if !self.padatas.is_empty() {
            req.padata = Some(self.padatas);
        }

        req
    }

    pub fn build_as_req(self) -> AsReq {
        self.build().into()
    }
}

/// PA-ENC-TIMESTAMP with an already encrypted PA-ENC-TS-ENC
pub fn new_pa_data_encrypted_timestamp(
    etype: i32,
    encrypted_timestamp: Vec<u8>,
) -> PaData {
    PaData::new(
        pa_data_types::PA_ENC_TIMESTAMP,
        EncryptedData::new(etype, None, encrypted_timestamp).build(),
    )
}

/// Current time as the DER encoded PA-ENC-TS-ENC to be encrypted
pub fn raw_timestamp() -> Vec<u8> {
    PaEncTsEnc::from(Utc::now()).build()
}

/// AS-REQ asking a TGT for `username`. With `padata` the request carries
/// pre-authentication, without it the KDC is expected to challenge.
pub fn build_as_req(
    realm: &str,
    username: &str,
    etypes: &[i32],
    padata: Option<PaData>,
) -> Result<AsReq> {
    if username.trim().is_empty() {
        return Err(Error::Config("Empty username".into()));
    }
    if etypes.is_empty() {
        return Err(Error::Config("No encryption types permitted".into()));
    }

    let mut builder = KdcReqBuilder::new(realm)
        .username(username)
        .etypes(etypes.to_vec());

    if let Some(padata) = padata {
        builder = builder.push_padata(padata);
    }

    Ok(builder.request_pac().build_as_req())
}
