use kerberos_asn1::KrbError;
use kerberos_constants::error_codes;
use std::io;
use std::result;
use thiserror::Error;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Session construction or input problems. Fatal to the session.
    #[error("{0}")]
    Config(String),

    /// Errors reaching a KDC over the network.
    #[error("{0}: {1}")]
    Transport(String, #[source] io::Error),

    /// Response bytes that are not a known Kerberos reply.
    #[error("{0}")]
    Protocol(String),

    /// A well-formed KRB-ERROR sent by the KDC.
    #[error("{}", create_krb_error_msg(.0))]
    Kerberos(KrbError),

    /// AS-REP received but the password derived key could not open it.
    #[error("{0}")]
    Credentials(String),

    /// Local file errors (hash sink, wordlists, output files).
    #[error("{0}: {1}")]
    Io(String, #[source] io::Error),
}

impl Error {
    pub fn kdc_error_kind(&self) -> Option<KdcErrorKind> {
        if let Error::Kerberos(krb_error) = self {
            return Some(KdcErrorKind::from(krb_error.error_code));
        }
        None
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Transport(_, _))
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl From<KrbError> for Error {
    fn from(error: KrbError) -> Self {
        Self::Kerberos(error)
    }
}

fn create_krb_error_msg(krb_error: &KrbError) -> String {
    let error_string = error_codes::error_code_to_string(krb_error.error_code);
    format!("Error {}: {}", krb_error.error_code, error_string)
}

/// Meaning of the KRB-ERROR codes a probe can run into.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum KdcErrorKind {
    PreauthRequired,
    PrincipalUnknown,
    PreauthFailed,
    KeyExpired,
    ClientRevoked,
    ClockSkew,
    WrongRealm,
    EtypeNotSupported,
    PolicyRejected,
    Other(i32),
}

impl KdcErrorKind {
    /// The KDC only answers these after the encrypted timestamp has been
    /// checked, so the password was right.
    pub fn confirms_password(&self) -> bool {
        matches!(self, Self::KeyExpired | Self::ClockSkew)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::PreauthRequired => "pre-authentication required",
            Self::PrincipalUnknown => "user does not exist",
            Self::PreauthFailed => "bad password",
            Self::KeyExpired => "password expired",
            Self::ClientRevoked => "user locked out or disabled",
            Self::ClockSkew => "clock skew too great",
            Self::WrongRealm => "wrong realm, try adjusting the domain",
            Self::EtypeNotSupported => "encryption type not supported by KDC",
            Self::PolicyRejected => "rejected by KDC policy",
            Self::Other(_) => "unexpected KDC error",
        }
    }
}

impl From<i32> for KdcErrorKind {
    fn from(code: i32) -> Self {
        match code {
            error_codes::KDC_ERR_PREAUTH_REQUIRED => Self::PreauthRequired,
            error_codes::KDC_ERR_C_PRINCIPAL_UNKNOWN => Self::PrincipalUnknown,
            error_codes::KDC_ERR_PREAUTH_FAILED => Self::PreauthFailed,
            error_codes::KDC_ERR_KEY_EXPIRED => Self::KeyExpired,
            error_codes::KDC_ERR_CLIENT_REVOKED => Self::ClientRevoked,
            error_codes::KRB_AP_ERR_SKEW => Self::ClockSkew,
            error_codes::KDC_ERR_WRONG_REALM => Self::WrongRealm,
            error_codes::KDC_ERR_ETYPE_NOSUPP => Self::EtypeNotSupported,
            error_codes::KDC_ERR_POLICY => Self::PolicyRejected,
            other => Self::Other(other),
        }
    }
}

/// Per call classification of a probe result. Never stored.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProbeOutcome {
    Success,
    NeedsPreauth,
    InvalidUser,
    BadCredentials,
    Error,
}

impl ProbeOutcome {
    pub fn from_result(result: &Result<bool>) -> Self {
        match result {
            Ok(true) => Self::Success,
            Ok(false) => Self::Error,
            Err(err) => Self::from_error(err),
        }
    }

    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::Credentials(_) => Self::BadCredentials,
            Error::Kerberos(_) => match err.kdc_error_kind() {
                Some(KdcErrorKind::PreauthRequired) => Self::NeedsPreauth,
                Some(KdcErrorKind::PrincipalUnknown) => Self::InvalidUser,
                Some(KdcErrorKind::PreauthFailed) => Self::BadCredentials,
                _ => Self::Error,
            },
            _ => Self::Error,
        }
    }
}
