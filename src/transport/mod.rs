//! UDP transport for the agent.
//!
//! The engine itself is transport-agnostic; this module supplies the one
//! loop an agent daemon needs: bind a UDP socket, feed each datagram to
//! [`Agent::process`], and send back whatever response it yields. One
//! datagram is processed to completion before the next is read, matching
//! the engine's serial execution model.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

use crate::agent::Agent;

/// Largest datagram the serve loop will read.
const RECV_BUF_LEN: usize = 65535;

/// Create and bind a UDP socket with proper IPv6 configuration.
///
/// For IPv6 sockets, sets `IPV6_V6ONLY = true` so the socket only handles
/// IPv6 traffic and does not accept IPv4-mapped addresses.
pub async fn bind_udp_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
    let domain = if addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    if addr.is_ipv6() {
        socket.set_only_v6(true)?;
    }

    // Allow address reuse for quick restarts
    socket.set_reuse_address(true)?;

    // Set non-blocking before converting to tokio socket
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;

    UdpSocket::from_std(socket.into())
}

/// Serve an agent on a bound socket until the task is cancelled.
pub async fn serve(socket: UdpSocket, agent: Arc<Agent>) -> io::Result<()> {
    debug!(local = %socket.local_addr()?, "agent serving");
    let mut buf = vec![0u8; RECV_BUF_LEN];

    loop {
        let (len, peer) = socket.recv_from(&mut buf).await?;
        trace!(%peer, len, "datagram received");

        match agent.process(&buf[..len]) {
            Some(response) => {
                if let Err(err) = socket.send_to(&response, peer).await {
                    warn!(%peer, %err, "failed to send response");
                }
            }
            None => trace!(%peer, "datagram dropped"),
        }
    }
}

/// Bind `addr` and serve `agent` on it.
pub async fn serve_on(addr: SocketAddr, agent: Arc<Agent>) -> io::Result<()> {
    let socket = bind_udp_socket(addr).await?;
    serve(socket, agent).await
}
