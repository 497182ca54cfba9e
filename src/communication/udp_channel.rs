use crate::communication::{KrbChannel, TransportProtocol, KDC_TIMEOUT};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

// Largest payload a single UDP datagram can carry.
const MAX_DATAGRAM_SIZE: usize = 65507;

/// Send Kerberos messages over UDP
#[derive(Debug)]
pub struct UdpChannel {
    kdc: String,
}

impl UdpChannel {
    pub fn new(kdc: &str) -> Self {
        Self {
            kdc: kdc.to_string(),
        }
    }
}

impl KrbChannel for UdpChannel {
    fn send_recv(&self, raw: &[u8]) -> io::Result<Vec<u8>> {
        send_recv_udp(&self.kdc, raw)
    }

    fn protocol(&self) -> TransportProtocol {
        TransportProtocol::UDP
    }

    fn kdc(&self) -> &str {
        &self.kdc
    }
}

pub fn send_recv_udp(kdc: &str, raw_request: &[u8]) -> io::Result<Vec<u8>> {
    let peer = kdc.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("Unable to resolve KDC address {}", kdc),
        )
    })?;

    let udp_socket = UdpSocket::bind(local_address(&peer))?;
    udp_socket.set_read_timeout(Some(KDC_TIMEOUT))?;
    udp_socket.set_write_timeout(Some(KDC_TIMEOUT))?;
    udp_socket.connect(peer)?;

    udp_socket.send(raw_request)?;

    let mut raw_response = vec![0; MAX_DATAGRAM_SIZE];
    let data_length = udp_socket.recv(&mut raw_response)?;
    raw_response.truncate(data_length);

    Ok(raw_response)
}

// Wildcard address of the same family as the KDC.
fn local_address(peer: &SocketAddr) -> &'static str {
    match peer {
        SocketAddr::V4(_) => "0.0.0.0:0",
        SocketAddr::V6(_) => "[::]:0",
    }
}
