//! Module to provide means to transport Kerberos messages
//!

use crate::logger::Logger;
use kerberos_asn1::{Asn1Object, KrbError};
use kerberos_constants::error_codes;
use std::io;
use std::time::Duration;

mod channel_trait;
pub use channel_trait::KrbChannel;

mod tcp_channel;
pub use tcp_channel::TcpChannel;

mod udp_channel;
pub use udp_channel::UdpChannel;

mod socks_channel;
pub use socks_channel::{Socks5Channel, Socks5Proxy};

pub mod kdc_resolver;
pub use kdc_resolver::{
    resolve_kdcs, resolve_kdcs_with, Kdcs, SrvRecord, SrvResolver, SystemSrvResolver,
};

/// Connect, read and write timeout applied to every KDC socket.
pub const KDC_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport protocols available to send Kerberos messages
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum TransportProtocol {
    TCP,
    UDP,
}

/// Generates a channel for the given KDC. A proxy always yields a TCP
/// channel, UDP is not tunnelled.
pub fn new_krb_channel(
    kdc: &str,
    transport_protocol: TransportProtocol,
    proxy: Option<&Socks5Proxy>,
) -> Box<dyn KrbChannel> {
    if let Some(proxy) = proxy {
        return Box::new(Socks5Channel::new(kdc, proxy.clone()));
    }

    match transport_protocol {
        TransportProtocol::TCP => Box::new(TcpChannel::new(kdc)),
        TransportProtocol::UDP => Box::new(UdpChannel::new(kdc)),
    }
}

/// Delivers raw Kerberos messages to the KDCs of a realm, in priority
/// order, until one of them answers.
#[derive(Debug, Clone)]
pub struct KdcTransport {
    kdcs: Kdcs,
    udp_preference_limit: usize,
    socks5: Option<Socks5Proxy>,
}

impl KdcTransport {
    pub fn new(
        kdcs: Kdcs,
        udp_preference_limit: usize,
        socks5: Option<Socks5Proxy>,
    ) -> Self {
        Self {
            kdcs,
            udp_preference_limit,
            socks5,
        }
    }

    pub fn kdcs(&self) -> &Kdcs {
        &self.kdcs
    }

    /// Protocol used for the first attempt of a message of this size.
    pub fn preferred_protocol(&self, message_len: usize) -> TransportProtocol {
        if self.socks5.is_some() || message_len > self.udp_preference_limit {
            TransportProtocol::TCP
        } else {
            TransportProtocol::UDP
        }
    }

    pub fn send_recv(&self, raw: &[u8], logger: &Logger) -> io::Result<Vec<u8>> {
        let mut last_error = None;

        for kdc in self.kdcs.values() {
            match self.send_recv_kdc(kdc, raw, logger) {
                Ok(response) => return Ok(response),
                Err(err) => {
                    logger.debug(format!("Error contacting KDC {}: {}", kdc, err));
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "No KDC available")
        }))
    }

    fn send_recv_kdc(
        &self,
        kdc: &str,
        raw: &[u8],
        logger: &Logger,
    ) -> io::Result<Vec<u8>> {
        let protocol = self.preferred_protocol(raw.len());
        let channel = new_krb_channel(kdc, protocol, self.socks5.as_ref());

        if channel.protocol() == TransportProtocol::TCP {
            return channel.send_recv(raw);
        }

        match channel.send_recv(raw) {
            Ok(response) if !is_response_too_big(&response) => Ok(response),
            Ok(_) => {
                logger.debug(format!(
                    "Response from {} too big for UDP, retrying over TCP",
                    kdc
                ));
                new_krb_channel(kdc, TransportProtocol::TCP, None).send_recv(raw)
            }
            Err(err) => {
                logger.debug(format!(
                    "UDP exchange with {} failed ({}), retrying over TCP",
                    kdc, err
                ));
                new_krb_channel(kdc, TransportProtocol::TCP, None).send_recv(raw)
            }
        }
    }
}

fn is_response_too_big(raw: &[u8]) -> bool {
    match KrbError::parse(raw) {
        Ok((_, krb_error)) => {
            krb_error.error_code == error_codes::KRB_ERR_RESPONSE_TOO_BIG
        }
        Err(_) => false,
    }
}
