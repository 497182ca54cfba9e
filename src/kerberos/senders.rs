use crate::communication::KdcTransport;
use crate::error::{Error, Result};
use crate::logger::Logger;
use kerberos_asn1::{AsRep, AsReq, Asn1Object, KrbError};

pub enum Rep {
    AsRep(AsRep),
    KrbError(KrbError),
}

/// Parses a KDC reply into a known Kerberos response
pub fn parse_rep(raw_rep: &[u8]) -> Result<Rep> {
    if let Ok((_, krb_error)) = KrbError::parse(raw_rep) {
        return Ok(Rep::KrbError(krb_error));
    }

    if let Ok((_, as_rep)) = AsRep::parse(raw_rep) {
        return Ok(Rep::AsRep(as_rep));
    }

    Err(Error::Protocol(format!(
        "Error parsing response: {} bytes that are neither AS-REP nor KRB-ERROR",
        raw_rep.len()
    )))
}

/// Sends an AS-REQ to the realm KDCs and returns the parsed reply.
/// KRB-ERROR replies are returned as `Rep::KrbError`, not as errors.
/// Anything else is an `Error::Protocol`.
pub fn send_recv_as(
    transport: &KdcTransport,
    req: &AsReq,
    logger: &Logger,
) -> Result<Rep> {
    let raw_rep = transport
        .send_recv(&req.build(), logger)
        .map_err(|err| Error::Transport("Error sending AS-REQ".into(), err))?;

    parse_rep(&raw_rep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_krb_error() {
        let mut krb_error = KrbError::default();
        krb_error.error_code = 25;
        match parse_rep(&krb_error.build()).unwrap() {
            Rep::KrbError(parsed) => assert_eq!(parsed.error_code, 25),
            _ => panic!("expected KRB-ERROR"),
        }
    }

    #[test]
    fn test_parse_as_rep() {
        let mut as_rep = AsRep::default();
        as_rep.crealm = "EXAMPLE.COM".into();
        match parse_rep(&as_rep.build()).unwrap() {
            Rep::AsRep(parsed) => assert_eq!(parsed.crealm, "EXAMPLE.COM"),
            _ => panic!("expected AS-REP"),
        }
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_rep(&[0xff, 0x00, 0x13]),
            Err(Error::Protocol(_))
        ));
    }
}
