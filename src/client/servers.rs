//! Per-server capability tracking.

use arrayvec::ArrayVec;
use std::net::Ipv6Addr;

const CAPACITY: usize = 3;

/// Servers observed to answer only single-question messages.
///
/// A server that returns `FORMERR` to a two-question SRV+TXT message is
/// recorded here; the planner then splits composite service queries for
/// it. Bounded: the oldest entry is displaced when full.
#[derive(Debug, Default)]
pub(crate) struct LimitedServers {
    servers: ArrayVec<Ipv6Addr, CAPACITY>,
}

impl LimitedServers {
    pub fn is_limited(&self, addr: &Ipv6Addr) -> bool {
        self.servers.contains(addr)
    }

    /// Records `addr` as limited to single-question messages.
    pub fn note_limited(&mut self, addr: Ipv6Addr) {
        if self.servers.contains(&addr) {
            return;
        }
        if self.servers.is_full() {
            self.servers.remove(0);
        }
        self.servers.push(addr);
    }

    /// Removes `addr`: it answered a two-question message.
    pub fn note_capable(&mut self, addr: &Ipv6Addr) {
        self.servers.retain(|s| s != addr);
    }
}
