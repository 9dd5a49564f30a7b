//! Platform integration.
//!
//! The engine owns no sockets and no clock: everything it needs from the
//! environment comes through [`Platform`]. Inbound events (timer fires,
//! received datagrams, TCP stream events) are delivered by the embedder
//! calling the corresponding `handle_*` entry point on the client, from
//! the same event loop thread that drives the API.

use crate::Result;
use std::net::SocketAddrV6;

#[cfg(feature = "nat64")]
use std::net::Ipv6Addr;

/// Services the resolver requires from its environment.
pub trait Platform {
    /// A monotonic millisecond clock.
    fn now_ms(&self) -> u64;

    /// Binds the UDP socket to an ephemeral local port.
    fn udp_bind(&mut self) -> Result<()>;

    /// Closes the UDP socket.
    fn udp_close(&mut self);

    /// Sends a single datagram to `dst`.
    fn udp_send(&mut self, dst: &SocketAddrV6, msg: &[u8]) -> Result<()>;

    /// Arms the retransmission timer for the given absolute deadline,
    /// replacing any earlier deadline. The embedder calls
    /// `Client::handle_timer` once the deadline passes.
    fn arm_timer(&mut self, deadline_ms: u64);

    /// Cancels the retransmission timer.
    fn cancel_timer(&mut self);

    /// The NAT64 translation prefix currently known to the stack, if any.
    #[cfg(feature = "nat64")]
    #[cfg_attr(docsrs, doc(cfg(feature = "nat64")))]
    fn nat64_prefix(&self) -> Option<Nat64Prefix> {
        None
    }

    /// The DNS server selected by a sibling service-registration client,
    /// if one is active. Consulted when the default config is populated
    /// and the user has not pinned a server address.
    fn preferred_server(&self) -> Option<SocketAddrV6> {
        None
    }
}

/// TCP endpoint services, required only when queries use the TCP
/// transport.
///
/// The engine frames messages itself (2-byte length prefix per
/// [RFC 1035 section 4.2.2](https://www.rfc-editor.org/rfc/rfc1035.html#section-4.2.2));
/// the platform moves opaque bytes. Connection lifecycle events are
/// delivered through `Client::handle_tcp_*`.
#[cfg(feature = "tcp")]
#[cfg_attr(docsrs, doc(cfg(feature = "tcp")))]
pub trait TcpPlatform: Platform {
    /// Starts a connection attempt to `dst`.
    fn tcp_connect(&mut self, dst: &SocketAddrV6) -> Result<()>;

    /// Sends bytes on the established connection.
    fn tcp_send(&mut self, data: &[u8]) -> Result<()>;

    /// Closes the connection, dropping any buffered data.
    fn tcp_close(&mut self);
}

/// An IPv6 /96 prefix used to synthesize IPv6 addresses from IPv4
/// addresses.
///
/// [RFC 6052 section 2.2](https://www.rfc-editor.org/rfc/rfc6052.html#section-2.2)
#[cfg(feature = "nat64")]
#[cfg_attr(docsrs, doc(cfg(feature = "nat64")))]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Nat64Prefix {
    octets: [u8; 16],
}

#[cfg(feature = "nat64")]
impl Nat64Prefix {
    /// Creates a prefix from an IPv6 address whose upper 96 bits carry
    /// the prefix.
    pub fn new(prefix: Ipv6Addr) -> Self {
        let mut octets = prefix.octets();
        octets[12..].fill(0);
        Nat64Prefix { octets }
    }

    /// Embeds an IPv4 address in the low 32 bits of the prefix.
    pub fn synthesize(&self, v4: [u8; 4]) -> Ipv6Addr {
        let mut octets = self.octets;
        octets[12..].copy_from_slice(&v4);
        Ipv6Addr::from(octets)
    }
}
