use crate::communication::tcp_channel::send_recv_framed;
use crate::communication::{KrbChannel, TransportProtocol, KDC_TIMEOUT};
use socks::Socks5Stream;
use std::fmt;
use std::io;

/// SOCKS5 proxy used to reach the KDCs. Only TCP is tunnelled.
#[derive(Clone, PartialEq, Eq)]
pub struct Socks5Proxy {
    pub address: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Socks5Proxy {
    pub fn new(
        address: &str,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            address: address.to_string(),
            username,
            password,
        }
    }
}

impl fmt::Debug for Socks5Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socks5Proxy")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

/// Send Kerberos messages over TCP through a SOCKS5 proxy
#[derive(Debug)]
pub struct Socks5Channel {
    kdc: String,
    proxy: Socks5Proxy,
}

impl Socks5Channel {
    pub fn new(kdc: &str, proxy: Socks5Proxy) -> Self {
        Self {
            kdc: kdc.to_string(),
            proxy,
        }
    }

    fn connect(&self) -> io::Result<Socks5Stream> {
        let target = self.kdc.as_str();
        let stream = match (&self.proxy.username, &self.proxy.password) {
            (Some(username), password) => Socks5Stream::connect_with_password(
                self.proxy.address.as_str(),
                target,
                username,
                password.as_deref().unwrap_or(""),
            )?,
            (None, _) => {
                Socks5Stream::connect(self.proxy.address.as_str(), target)?
            }
        };

        stream.get_ref().set_read_timeout(Some(KDC_TIMEOUT))?;
        stream.get_ref().set_write_timeout(Some(KDC_TIMEOUT))?;
        Ok(stream)
    }
}

impl KrbChannel for Socks5Channel {
    fn send_recv(&self, raw: &[u8]) -> io::Result<Vec<u8>> {
        let mut stream = self.connect()?;
        send_recv_framed(&mut stream, raw)
    }

    fn protocol(&self) -> TransportProtocol {
        TransportProtocol::TCP
    }

    fn kdc(&self) -> &str {
        &self.kdc
    }
}
