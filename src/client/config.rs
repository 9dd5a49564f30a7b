//! Query configuration.

use std::net::{Ipv6Addr, SocketAddrV6};

/// The "Recursion Desired" flag of a query.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum RecursionFlag {
    /// Not specified; the default config value is used.
    #[default]
    Unspecified,
    /// The server may resolve the query recursively.
    Desired,
    /// The server must not resolve the query recursively.
    NoRecursion,
}

/// NAT64 address synthesis mode for IPv4 resolution.
#[cfg(feature = "nat64")]
#[cfg_attr(docsrs, doc(cfg(feature = "nat64")))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Nat64Mode {
    /// Not specified; the default config value is used.
    #[default]
    Unspecified,
    /// Allow NAT64 address translation.
    Allow,
    /// Disallow NAT64 address translation.
    Disallow,
}

/// How SRV and TXT records are queried during service resolution.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ServiceMode {
    /// Not specified; the default config value is used. The stored
    /// default is always concrete.
    #[default]
    Unspecified,
    /// Query SRV only.
    Srv,
    /// Query TXT only.
    Txt,
    /// Query SRV and TXT in the same two-question message.
    SrvTxt,
    /// Query SRV and TXT in two separate messages, sent together.
    SrvTxtSeparate,
    /// Try the two-question message first; fall back to separate
    /// messages for servers that reject it.
    SrvTxtOptimize,
}

/// Transport protocol selection for a query.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Transport {
    /// Not specified; the default config value is used.
    #[default]
    Unspecified,
    /// Send the query over UDP.
    Udp,
    /// Send the query over TCP.
    Tcp,
}

/// A DNS query configuration.
///
/// A default-constructed config leaves every field unspecified. At query
/// start, unspecified fields are replaced from the client's default
/// config, so a caller only sets what it wants to override:
///
/// ```rust
/// # use stubdns::QueryConfig;
/// let config = QueryConfig {
///     response_timeout_ms: 500,
///     max_tx_attempts: 2,
///     ..QueryConfig::default()
/// };
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct QueryConfig {
    /// Server socket address. The unspecified address or port zero means
    /// "use the default".
    pub server_sock_addr: SocketAddrV6,
    /// Time to wait for a response before retransmitting, in
    /// milliseconds. Zero means "use the default".
    pub response_timeout_ms: u32,
    /// Maximum number of transmissions before the query fails with
    /// `ResponseTimeout`. Zero means "use the default".
    pub max_tx_attempts: u8,
    /// Recursion desired flag.
    pub recursion_flag: RecursionFlag,
    /// NAT64 synthesis mode.
    #[cfg(feature = "nat64")]
    #[cfg_attr(docsrs, doc(cfg(feature = "nat64")))]
    pub nat64_mode: Nat64Mode,
    /// Service resolution mode.
    pub service_mode: ServiceMode,
    /// Transport protocol.
    pub transport: Transport,
}

const DEFAULT_SERVER_ADDRESS: Ipv6Addr = Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888);
const DEFAULT_SERVER_PORT: u16 = 53;
const DEFAULT_RESPONSE_TIMEOUT_MS: u32 = 6000;
const DEFAULT_MAX_TX_ATTEMPTS: u8 = 3;

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            server_sock_addr: SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0),
            response_timeout_ms: 0,
            max_tx_attempts: 0,
            recursion_flag: RecursionFlag::Unspecified,
            #[cfg(feature = "nat64")]
            nat64_mode: Nat64Mode::Unspecified,
            service_mode: ServiceMode::Unspecified,
            transport: Transport::Unspecified,
        }
    }
}

impl QueryConfig {
    /// The build-time default configuration. Every field is concrete.
    pub fn built_in() -> Self {
        QueryConfig {
            server_sock_addr: SocketAddrV6::new(DEFAULT_SERVER_ADDRESS, DEFAULT_SERVER_PORT, 0, 0),
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            max_tx_attempts: DEFAULT_MAX_TX_ATTEMPTS,
            recursion_flag: RecursionFlag::Desired,
            #[cfg(feature = "nat64")]
            nat64_mode: Nat64Mode::Allow,
            service_mode: ServiceMode::SrvTxtOptimize,
            transport: Transport::Udp,
        }
    }

    /// Returns a config with every unspecified field replaced from
    /// `defaults`.
    pub(crate) fn merged_with(&self, defaults: &QueryConfig) -> QueryConfig {
        let mut out = *self;

        if out.server_sock_addr.ip().is_unspecified() {
            out.server_sock_addr
                .set_ip(*defaults.server_sock_addr.ip());
        }
        if out.server_sock_addr.port() == 0 {
            out.server_sock_addr
                .set_port(defaults.server_sock_addr.port());
        }
        if out.response_timeout_ms == 0 {
            out.response_timeout_ms = defaults.response_timeout_ms;
        }
        if out.max_tx_attempts == 0 {
            out.max_tx_attempts = defaults.max_tx_attempts;
        }
        if out.recursion_flag == RecursionFlag::Unspecified {
            out.recursion_flag = defaults.recursion_flag;
        }
        #[cfg(feature = "nat64")]
        if out.nat64_mode == Nat64Mode::Unspecified {
            out.nat64_mode = defaults.nat64_mode;
        }
        if out.service_mode == ServiceMode::Unspecified {
            out.service_mode = defaults.service_mode;
        }
        if out.transport == Transport::Unspecified {
            out.transport = defaults.transport;
        }

        out
    }
}
