//! Local-network datagram source.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;

/// Largest datagram read in one receive; longer payloads are truncated.
pub const MAX_DATAGRAM: usize = 1024;

/// Where local-network alert payloads come from.
#[async_trait]
pub trait DatagramSource: Send {
    /// Wait for the next datagram.
    async fn receive_datagram(&mut self) -> io::Result<Vec<u8>>;
}

/// UDP listener on all interfaces.
pub struct UdpListener {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl UdpListener {
    pub async fn bind(port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        Ok(Self {
            socket,
            buf: vec![0; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl DatagramSource for UdpListener {
    async fn receive_datagram(&mut self) -> io::Result<Vec<u8>> {
        let (len, _from) = self.socket.recv_from(&mut self.buf).await?;
        Ok(self.buf[..len].to_vec())
    }
}
