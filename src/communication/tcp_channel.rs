use crate::communication::{KrbChannel, TransportProtocol, KDC_TIMEOUT};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

// Upper bound for a KDC reply over a stream transport.
pub const MAX_RESPONSE_SIZE: u32 = 1024 * 1024;

/// Send Kerberos messages over TCP
#[derive(Debug)]
pub struct TcpChannel {
    kdc: String,
}

impl TcpChannel {
    pub fn new(kdc: &str) -> Self {
        Self {
            kdc: kdc.to_string(),
        }
    }
}

impl KrbChannel for TcpChannel {
    fn send_recv(&self, raw: &[u8]) -> io::Result<Vec<u8>> {
        let mut tcp_stream = connect_tcp(&self.kdc)?;
        send_recv_framed(&mut tcp_stream, raw)
    }

    fn protocol(&self) -> TransportProtocol {
        TransportProtocol::TCP
    }

    fn kdc(&self) -> &str {
        &self.kdc
    }
}

fn connect_tcp(kdc: &str) -> io::Result<TcpStream> {
    let mut last_error = None;

    for addr in kdc.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, KDC_TIMEOUT) {
            Ok(stream) => {
                stream.set_read_timeout(Some(KDC_TIMEOUT))?;
                stream.set_write_timeout(Some(KDC_TIMEOUT))?;
                return Ok(stream);
            }
            Err(err) => last_error = Some(err),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("No address found for {}", kdc),
        )
    }))
}

/// Kerberos over a byte stream: each message is preceded by its length
/// as a 4 byte big endian integer (RFC 4120 section 7.2.2).
pub fn send_recv_framed<S: Read + Write>(
    stream: &mut S,
    raw: &[u8],
) -> io::Result<Vec<u8>> {
    let mut raw_sized_request = Vec::with_capacity(raw.len() + 4);
    raw_sized_request.write_u32::<BigEndian>(raw.len() as u32)?;
    raw_sized_request.extend_from_slice(raw);
    stream.write_all(&raw_sized_request)?;
    stream.flush()?;

    let data_length = stream.read_u32::<BigEndian>()?;
    if data_length > MAX_RESPONSE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("KDC response too large ({} bytes)", data_length),
        ));
    }

    let mut raw_response: Vec<u8> = vec![0; data_length as usize];
    stream.read_exact(&mut raw_response)?;

    Ok(raw_response)
}
